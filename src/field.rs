//! Definition of record fields: the per-field configuration given to the
//! [crate::schema::SchemaBuilder] and the [FieldSpec] entries it registers.

use std::{fmt, sync::Arc};

use crate::{
    codec::{Codec, FieldCodec},
    options::{Endian, Int64Mode},
    value::Value,
};

/// Name of a field: a caller-chosen name, or the declaration ordinal of an unnamed filler.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldName {
    Named(String),
    /// Reserved or padding bytes, never part of a decoded record.
    Filler(usize),
}

impl FieldName {
    pub fn as_named(&self) -> Option<&str> {
        match self {
            FieldName::Named(name) => Some(name),
            FieldName::Filler(_) => None,
        }
    }

    pub fn is_filler(&self) -> bool {
        matches!(self, FieldName::Filler(_))
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldName::Named(name) => f.write_str(name),
            FieldName::Filler(ordinal) => write!(f, "#{ordinal}"),
        }
    }
}

/// Type tag of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Unsigned integer of 1, 2, 4 or 8 bytes.
    UInt(usize),
    /// Signed integer of 1, 2, 4 or 8 bytes.
    Int(usize),
    Float32,
    Float64,
    /// Opaque byte block of the given length.
    Bytes(usize),
    /// UTF-8 text, NUL-padded to the given length.
    Text(usize),
}

impl FieldType {
    /// Declared width in bytes.
    pub fn size(&self) -> usize {
        match *self {
            FieldType::UInt(n) | FieldType::Int(n) => n,
            FieldType::Float32 => 4,
            FieldType::Float64 => 8,
            FieldType::Bytes(n) | FieldType::Text(n) => n,
        }
    }

    /// Same type with a new length; only block and text types are resizable.
    pub fn with_size(self, size: usize) -> Self {
        match self {
            FieldType::Bytes(_) => FieldType::Bytes(size),
            FieldType::Text(_) => FieldType::Text(size),
            other => other,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, FieldType::UInt(_) | FieldType::Int(_))
    }

    /// Block and text fields may take their size from another field.
    pub fn is_resizable(&self) -> bool {
        matches!(self, FieldType::Bytes(_) | FieldType::Text(_))
    }

    /// Parses a definer name such as `uint16le`, `int32`, `float64be`, `bytes` or `text`.
    ///
    /// Returns the type together with the byte order the name pins, if any.
    /// `bytes` and `text` come back with length 0; the caller supplies the size.
    pub fn from_name(name: &str) -> Option<(FieldType, Option<Endian>)> {
        let (base, endian) = if let Some(base) = name.strip_suffix("le") {
            (base, Some(Endian::Little))
        } else if let Some(base) = name.strip_suffix("be") {
            (base, Some(Endian::Big))
        } else {
            (name, None)
        };

        let ty = match base {
            "uint8" => FieldType::UInt(1),
            "uint16" => FieldType::UInt(2),
            "uint32" => FieldType::UInt(4),
            "uint64" => FieldType::UInt(8),
            "int8" => FieldType::Int(1),
            "int16" => FieldType::Int(2),
            "int32" => FieldType::Int(4),
            "int64" => FieldType::Int(8),
            "float32" => FieldType::Float32,
            "float64" => FieldType::Float64,
            "bytes" if endian.is_none() => FieldType::Bytes(0),
            "text" if endian.is_none() => FieldType::Text(0),
            _ => return None,
        };

        // Single bytes have no byte order.
        if endian.is_some() && ty.size() == 1 {
            return None;
        }

        Some((ty, endian))
    }
}

/// Length of a block or text field: literal, or taken from an earlier integer field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Size {
    Fixed(usize),
    Ref(String),
}

impl From<usize> for Size {
    fn from(n: usize) -> Self {
        Size::Fixed(n)
    }
}

impl From<&str> for Size {
    fn from(name: &str) -> Self {
        Size::Ref(name.to_string())
    }
}

impl From<String> for Size {
    fn from(name: String) -> Self {
        Size::Ref(name)
    }
}

/// Per-field configuration passed to every definer call.
///
/// Anything `Into<FieldConfig>` is accepted, so a bare name works:
/// `builder.uint16le("len")`.
#[derive(Debug, Clone, Default)]
pub struct FieldConfig {
    /// Field name; `None` declares a filler.
    pub name: Option<String>,
    /// Value written by `write_values` and used by `pack` when the input omits the field.
    pub default: Option<Value<'static>>,
    /// Byte order override.
    pub endian: Option<Endian>,
    /// 64-bit mode override.
    pub int64_mode: Option<Int64Mode>,
    /// Name of an earlier integer field holding this field's length.
    pub size_ref: Option<String>,
    /// Replaces the built-in codec.
    pub codec: Option<Arc<dyn FieldCodec>>,
}

impl FieldConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Unnamed filler field.
    pub fn filler() -> Self {
        Self::default()
    }

    pub fn default_value(mut self, value: impl Into<Value<'static>>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn endian(mut self, endian: Endian) -> Self {
        self.endian = Some(endian);
        self
    }

    pub fn int64_mode(mut self, mode: Int64Mode) -> Self {
        self.int64_mode = Some(mode);
        self
    }

    pub fn size_ref(mut self, name: impl Into<String>) -> Self {
        self.size_ref = Some(name.into());
        self
    }

    pub fn codec(mut self, codec: Arc<dyn FieldCodec>) -> Self {
        self.codec = Some(codec);
        self
    }
}

impl From<&str> for FieldConfig {
    fn from(name: &str) -> Self {
        FieldConfig::named(name)
    }
}

impl From<String> for FieldConfig {
    fn from(name: String) -> Self {
        FieldConfig::named(name)
    }
}

impl From<()> for FieldConfig {
    fn from(_: ()) -> Self {
        FieldConfig::filler()
    }
}

/// A registered field: type, placement, effective codec and default.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: FieldName,
    pub ty: FieldType,
    /// Width in bytes; 0 while a variable-length field is unresolved.
    pub size: usize,
    /// Byte position relative to the start of the record.
    pub offset: usize,
    /// Effective byte order (field override, else schema default).
    pub endian: Endian,
    pub codec: Codec,
    pub default: Option<Value<'static>>,
    /// Earlier integer field supplying this field's size.
    pub size_ref: Option<String>,
}

impl FieldSpec {
    /// True for a field whose size is taken from another field.
    pub fn is_deferred(&self) -> bool {
        self.size_ref.is_some()
    }

    /// True for fields left out of decoded records.
    pub fn is_hidden(&self) -> bool {
        self.name.is_filler() || self.codec.is_skipped()
    }

    /// Byte just past the field.
    pub fn end(&self) -> usize {
        self.offset + self.size
    }
}
