//! Schema: the declared fields of a record, built once with a [SchemaBuilder].
//!
//! A schema whose fields all have a literal width is *static*: its layout is
//! fixed at build time. A schema with a variable-length field (a block or text
//! field whose size is read from an earlier integer field) is *dynamic*: every
//! pack, unpack or view resolves a fresh [Layout] for the size at hand, and the
//! schema itself is never mutated.

use std::borrow::Cow;

use crate::{
    accessor::Accessor,
    codec::Codec,
    errors::{CheckError, ConfigError, ReadError, WriteError},
    field::{FieldConfig, FieldName, FieldSpec, FieldType, Size},
    options::{Endian, SchemaOptions},
    registry::FieldRegistry,
    value::{DecodedRecord, Value},
};

/// A built record schema. Immutable, cheap to share across threads.
#[derive(Debug, Clone)]
pub struct Schema {
    options: SchemaOptions,
    registry: FieldRegistry,
    /// Index of the variable-length field, if any.
    deferred: Option<usize>,
}

/// Field placement for one concrete record size.
#[derive(Debug, Clone)]
pub struct Layout<'s> {
    registry: Cow<'s, FieldRegistry>,
}

impl<'s> Layout<'s> {
    /// Total record size in bytes.
    pub fn size(&self) -> usize {
        self.registry.size()
    }

    pub fn fields(&self) -> &[FieldSpec] {
        self.registry.fields()
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.registry.get(name)
    }

    /// Accessor for the named field of a record starting at `base`.
    pub fn accessor(&self, name: &str, base: usize, checked: bool) -> Option<Accessor<'_>> {
        self.field(name)
            .map(|spec| Accessor::new(spec, base, checked))
    }

    /// Accessors for every field, in declaration order.
    pub fn accessors(&self, base: usize, checked: bool) -> impl Iterator<Item = Accessor<'_>> {
        self.fields()
            .iter()
            .map(move |spec| Accessor::new(spec, base, checked))
    }
}

impl Schema {
    pub fn builder(options: SchemaOptions) -> SchemaBuilder {
        SchemaBuilder::new(options)
    }

    pub fn options(&self) -> &SchemaOptions {
        &self.options
    }

    pub fn name(&self) -> Option<&str> {
        self.options.name.as_deref()
    }

    /// Declared fields; a variable-length field appears with size 0.
    pub fn fields(&self) -> &[FieldSpec] {
        self.registry.fields()
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.registry.get(name)
    }

    /// The variable-length field, if the schema has one.
    pub fn deferred_field(&self) -> Option<&FieldSpec> {
        self.deferred.map(|index| &self.registry.fields()[index])
    }

    pub fn is_static(&self) -> bool {
        self.deferred.is_none()
    }

    /// Record size, or `None` if it depends on a variable-length field.
    pub fn static_size(&self) -> Option<usize> {
        self.is_static().then(|| self.registry.size())
    }

    /// Fails unless the schema is static and exactly `expected` bytes long.
    pub fn check_size(&self, expected: usize) -> Result<(), CheckError> {
        match self.static_size() {
            Some(size) if size == expected => Ok(()),
            actual => Err(CheckError::SizeMismatch { expected, actual }),
        }
    }

    /// Layout with the variable-length field sized to `deferred_size` bytes.
    ///
    /// For a static schema this borrows the built layout and ignores the size.
    /// Returns `None` if the record would not fit in `usize`.
    pub fn resolve_layout(&self, deferred_size: usize) -> Option<Layout<'_>> {
        let Some(deferred) = self.deferred_field() else {
            return Some(Layout {
                registry: Cow::Borrowed(&self.registry),
            });
        };

        let mut resolved = deferred.clone();
        resolved.ty = deferred.ty.with_size(deferred_size);
        resolved.size = deferred_size;
        if !matches!(resolved.codec, Codec::Custom(_)) {
            resolved.codec = Codec::for_type(resolved.ty, self.options.int64_mode);
        }

        let mut registry = self.registry.clone();
        registry.register(resolved)?;

        Some(Layout {
            registry: Cow::Owned(registry),
        })
    }

    /// Resolves the layout of the record stored at `base` in `data`.
    pub(crate) fn layout_in(
        &self,
        data: &[u8],
        base: usize,
        checked: bool,
    ) -> Result<Layout<'_>, ReadError> {
        let Some((size_ref, source)) = self.size_source() else {
            return Ok(self.static_layout());
        };

        let value = Accessor::new(source, base, checked).get(data)?;
        as_length(&value)
            .and_then(|size| self.resolve_layout(size))
            .ok_or_else(|| ReadError::InvalidSize(size_ref.to_string()))
    }

    /// Resolves the layout for packing `record`: the length comes from the
    /// record, else the size field's default, else 0.
    ///
    /// The length must fit the size field, and a block given for the
    /// variable-length field must match it, before anything is allocated.
    pub(crate) fn layout_for(&self, record: &DecodedRecord<'_>) -> Result<Layout<'_>, WriteError> {
        let Some((size_ref, source)) = self.size_source() else {
            return Ok(self.static_layout());
        };
        let invalid = || WriteError::InvalidSize(size_ref.to_string());

        let size = match record.get(size_ref).or(source.default.as_ref()) {
            Some(value) => {
                let mut scratch = vec![0u8; source.size];
                source
                    .codec
                    .write(&source.name, &mut scratch, source.endian, value, true)?;
                as_length(value).ok_or_else(invalid)?
            }
            None => 0,
        };

        if let Some(deferred) = self.deferred_field() {
            let block = deferred
                .name
                .as_named()
                .and_then(|name| record.get(name))
                .and_then(|value| match value {
                    Value::Bytes(block) => Some(block.len()),
                    _ => None,
                });
            if let Some(actual) = block.filter(|actual| *actual != size) {
                return Err(WriteError::SizeMismatch {
                    field: deferred.name.to_string(),
                    expected: size,
                    actual,
                });
            }
        }

        self.resolve_layout(size).ok_or_else(invalid)
    }

    fn static_layout(&self) -> Layout<'_> {
        Layout {
            registry: Cow::Borrowed(&self.registry),
        }
    }

    /// Name and spec of the field that holds the variable-length field's size.
    fn size_source(&self) -> Option<(&str, &FieldSpec)> {
        let size_ref = self.deferred_field()?.size_ref.as_deref()?;
        self.registry.get(size_ref).map(|source| (size_ref, source))
    }
}

fn as_length(value: &Value<'_>) -> Option<usize> {
    value.as_u64().and_then(|v| usize::try_from(v).ok())
}

/// Collects field definitions; [SchemaBuilder::build] validates them into a [Schema].
///
/// Every definer takes anything `Into<FieldConfig>`: a field name, `()` for
/// an unnamed filler, or a full [FieldConfig]. The first configuration error
/// is kept and returned by `build`.
///
/// ```
/// use structcraft::field::FieldConfig;
/// use structcraft::options::SchemaOptions;
/// use structcraft::schema::Schema;
///
/// let schema = Schema::builder(SchemaOptions::named("greeting"))
///     .uint32be(FieldConfig::named("magic").default_value(0xcafe_u32))
///     .uint16le("len")
///     .uint8(())
///     .text("name", "len")
///     .build()
///     .unwrap();
///
/// assert_eq!(schema.static_size(), None);
/// assert_eq!(schema.field("name").unwrap().offset, 7);
/// ```
#[derive(Debug)]
pub struct SchemaBuilder {
    options: SchemaOptions,
    registry: FieldRegistry,
    deferred: Option<usize>,
    error: Option<ConfigError>,
}

macro_rules! definers {
    ($($name:ident => $ty:expr, $endian:expr;)*) => {
        $(
            pub fn $name(self, config: impl Into<FieldConfig>) -> Self {
                let mut config = config.into();
                if let Some(endian) = $endian {
                    config.endian = Some(endian);
                }
                self.define($ty, config)
            }
        )*
    };
}

impl SchemaBuilder {
    pub fn new(options: SchemaOptions) -> Self {
        Self {
            options,
            registry: FieldRegistry::new(),
            deferred: None,
            error: None,
        }
    }

    definers! {
        uint8 => FieldType::UInt(1), None::<Endian>;
        int8 => FieldType::Int(1), None::<Endian>;
        uint16 => FieldType::UInt(2), None::<Endian>;
        uint16le => FieldType::UInt(2), Some(Endian::Little);
        uint16be => FieldType::UInt(2), Some(Endian::Big);
        int16 => FieldType::Int(2), None::<Endian>;
        int16le => FieldType::Int(2), Some(Endian::Little);
        int16be => FieldType::Int(2), Some(Endian::Big);
        uint32 => FieldType::UInt(4), None::<Endian>;
        uint32le => FieldType::UInt(4), Some(Endian::Little);
        uint32be => FieldType::UInt(4), Some(Endian::Big);
        int32 => FieldType::Int(4), None::<Endian>;
        int32le => FieldType::Int(4), Some(Endian::Little);
        int32be => FieldType::Int(4), Some(Endian::Big);
        uint64 => FieldType::UInt(8), None::<Endian>;
        uint64le => FieldType::UInt(8), Some(Endian::Little);
        uint64be => FieldType::UInt(8), Some(Endian::Big);
        int64 => FieldType::Int(8), None::<Endian>;
        int64le => FieldType::Int(8), Some(Endian::Little);
        int64be => FieldType::Int(8), Some(Endian::Big);
        float32 => FieldType::Float32, None::<Endian>;
        float32le => FieldType::Float32, Some(Endian::Little);
        float32be => FieldType::Float32, Some(Endian::Big);
        float64 => FieldType::Float64, None::<Endian>;
        float64le => FieldType::Float64, Some(Endian::Little);
        float64be => FieldType::Float64, Some(Endian::Big);
    }

    /// Opaque byte block of a literal size or sized by an earlier integer field.
    pub fn bytes(self, config: impl Into<FieldConfig>, size: impl Into<Size>) -> Self {
        self.define_sized(FieldType::Bytes(0), config.into(), size.into())
    }

    /// NUL-padded UTF-8 text of a literal size or sized by an earlier integer field.
    pub fn text(self, config: impl Into<FieldConfig>, size: impl Into<Size>) -> Self {
        self.define_sized(FieldType::Text(0), config.into(), size.into())
    }

    fn define_sized(self, ty: FieldType, mut config: FieldConfig, size: Size) -> Self {
        match size {
            Size::Fixed(n) => self.define(ty.with_size(n), config),
            Size::Ref(name) => {
                config.size_ref = Some(name);
                self.define(ty, config)
            }
        }
    }

    /// Defines a field of any type. Re-defining an existing name updates that
    /// field's type, size and codec in place.
    pub fn define(mut self, ty: FieldType, config: impl Into<FieldConfig>) -> Self {
        if self.error.is_none() {
            if let Err(err) = self.try_define(ty, config.into()) {
                self.error = Some(err);
            }
        }
        self
    }

    /// Records an error unless the fields defined so far are static and exactly `expected` bytes.
    pub fn check_size(mut self, expected: usize) -> Self {
        if self.error.is_none() {
            let actual = self.deferred.is_none().then(|| self.registry.size());
            if actual != Some(expected) {
                self.error = Some(CheckError::SizeMismatch { expected, actual }.into());
            }
        }
        self
    }

    pub fn build(self) -> Result<Schema, ConfigError> {
        if let Some(err) = self.error {
            return Err(err);
        }

        Ok(Schema {
            options: self.options,
            registry: self.registry,
            deferred: self.deferred,
        })
    }

    fn try_define(&mut self, ty: FieldType, config: FieldConfig) -> Result<(), ConfigError> {
        let name = match config.name {
            Some(name) => FieldName::Named(name),
            None => FieldName::Filler(self.registry.len()),
        };

        if let FieldType::UInt(n) | FieldType::Int(n) = ty {
            if !matches!(n, 1 | 2 | 4 | 8) {
                return Err(ConfigError::InvalidFieldSize {
                    field: name.to_string(),
                    size: n,
                });
            }
        }

        let size_ref = match config.size_ref {
            Some(size_ref) => Some(self.check_size_ref(&name, ty, size_ref)?),
            None => None,
        };
        let size = if size_ref.is_some() { 0 } else { ty.size() };
        let ty = ty.with_size(size);

        let endian = config.endian.unwrap_or(self.options.endian);
        let int64_mode = config.int64_mode.unwrap_or(self.options.int64_mode);
        let codec = match config.codec {
            Some(custom) => Codec::Custom(custom),
            None => Codec::for_type(ty, int64_mode),
        };

        if let Some(default) = &config.default {
            check_default(&name, &codec, size, endian, default, size_ref.is_some())?;
        }

        let deferred = size_ref.is_some();
        let field = name.to_string();
        let index = self.registry.register(FieldSpec {
            name,
            ty,
            size,
            offset: 0,
            endian,
            codec,
            default: config.default,
            size_ref,
        });
        let index = index.ok_or(ConfigError::InvalidFieldSize { field, size })?;

        if deferred {
            self.deferred = Some(index);
        }

        Ok(())
    }

    fn check_size_ref(
        &self,
        name: &FieldName,
        ty: FieldType,
        size_ref: String,
    ) -> Result<String, ConfigError> {
        let Some(field) = name.as_named() else {
            return Err(ConfigError::UnnamedDeferredField);
        };

        let source = self.registry.get(&size_ref);
        let valid_source = source.is_some_and(|s| s.ty.is_integer() && !s.is_deferred());
        if !ty.is_resizable() || !valid_source || size_ref == field {
            return Err(ConfigError::InvalidSizeRef {
                field: field.to_string(),
                size_ref,
            });
        }

        if let Some(index) = self.deferred {
            if self.registry.fields()[index].name != *name {
                return Err(ConfigError::MultipleDeferredFields(field.to_string()));
            }
        }

        Ok(size_ref)
    }
}

/// Validates a default by encoding it into a scratch span of the field's width.
fn check_default(
    name: &FieldName,
    codec: &Codec,
    size: usize,
    endian: Endian,
    default: &Value<'_>,
    deferred: bool,
) -> Result<(), ConfigError> {
    let invalid = || ConfigError::InvalidDefault(name.to_string());

    // Skipped 64-bit fields only ever take a raw block.
    if codec.is_skipped() && !matches!(default, Value::Bytes(_)) {
        return Err(invalid());
    }

    if deferred {
        // Length is unknown until packing; only the kind of value can be checked.
        return match default {
            Value::Text(_) | Value::Bytes(_) => Ok(()),
            _ => Err(invalid()),
        };
    }

    let mut scratch = vec![0u8; size];
    codec
        .write(name, &mut scratch, endian, default, true)
        .map_err(|_| invalid())
}
