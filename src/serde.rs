//! JSON-deserializable schema description.
//!
//! These types describe a record layout as data, for example a schema file
//! shipped with an application, and are converted into a [Schema] with
//! `Schema::try_from(def)`.
//!
//! ```
//! # #[cfg(feature = "serde")]
//! # {
//! use structcraft::schema::Schema;
//! use structcraft::serde::{FieldDef, SchemaDef};
//!
//! let def = SchemaDef {
//!     name: Some("greeting".to_string()),
//!     little_endian: true,
//!     bounds_check: true,
//!     int64_mode: None,
//!     fields: vec![
//!         FieldDef::new("uint16", Some("len")),
//!         FieldDef::new("text", Some("name")).with_size_ref("len"),
//!     ],
//! };
//! let schema = Schema::try_from(def).unwrap();
//! assert!(!schema.is_static());
//! # }
//! ```

use serde::{Deserialize, Serialize};

use crate::{
    errors::ConfigError,
    field::{FieldConfig, FieldType, Size},
    options::{Endian, Int64Mode, SchemaOptions},
    schema::Schema,
    value::Value,
};

/// Top-level schema definition.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SchemaDef {
    /// Optional label for the schema.
    #[serde(default)]
    pub name: Option<String>,
    /// Default byte order; big-endian when false.
    #[serde(default)]
    pub little_endian: bool,
    /// Validate buffer lengths and integer ranges.
    #[serde(default = "enabled")]
    pub bounds_check: bool,
    /// Default 64-bit mode: `strict`, `lossy`, `copy`, `slice`, `int64` or `skip`.
    #[serde(default)]
    pub int64_mode: Option<String>,
    /// Fields in record order.
    pub fields: Vec<FieldDef>,
}

fn enabled() -> bool {
    true
}

/// Description of a single field.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FieldDef {
    /// Field name; omitted for filler bytes.
    #[serde(default)]
    pub name: Option<String>,
    /// Definer name, e.g. `uint16le`, `int64`, `float32be`, `bytes`, `text`.
    #[serde(rename = "type")]
    pub ty: String,
    /// Length of a `bytes` or `text` field.
    #[serde(default)]
    pub size: Option<usize>,
    /// Earlier integer field holding the length of a `bytes` or `text` field.
    #[serde(default)]
    pub size_ref: Option<String>,
    /// Declared default value.
    #[serde(default)]
    pub default: Option<DefaultDef>,
    /// Byte order override for types whose name does not pin one.
    #[serde(default)]
    pub little_endian: Option<bool>,
    /// 64-bit mode override.
    #[serde(default)]
    pub int64_mode: Option<String>,
}

impl FieldDef {
    pub fn new(ty: &str, name: Option<&str>) -> Self {
        FieldDef {
            name: name.map(str::to_string),
            ty: ty.to_string(),
            size: None,
            size_ref: None,
            default: None,
            little_endian: None,
            int64_mode: None,
        }
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_size_ref(mut self, size_ref: &str) -> Self {
        self.size_ref = Some(size_ref.to_string());
        self
    }
}

/// A default value as written in JSON.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum DefaultDef {
    UInt(u64),
    Int(i64),
    Float(f64),
    Text(String),
    /// Array of byte values, for block, text and 64-bit fields.
    Bytes(Vec<u8>),
}

impl From<DefaultDef> for Value<'static> {
    fn from(value: DefaultDef) -> Self {
        match value {
            DefaultDef::UInt(v) => Value::UInt(v),
            DefaultDef::Int(v) => Value::Int(v),
            DefaultDef::Float(v) => Value::Float(v),
            DefaultDef::Text(v) => Value::from(v),
            DefaultDef::Bytes(v) => Value::from(v),
        }
    }
}

impl TryFrom<SchemaDef> for Schema {
    type Error = ConfigError;

    fn try_from(def: SchemaDef) -> Result<Self, Self::Error> {
        let mut options = SchemaOptions {
            name: def.name,
            bounds_check: def.bounds_check,
            ..Default::default()
        };
        if def.little_endian {
            options.endian = Endian::Little;
        }
        if let Some(mode) = def.int64_mode {
            options.int64_mode = mode.parse()?;
        }

        let mut builder = Schema::builder(options);
        for field in def.fields {
            let (ty, pinned) = FieldType::from_name(&field.ty)
                .ok_or_else(|| ConfigError::UnknownFieldType(field.ty.clone()))?;

            let mut config = FieldConfig {
                name: field.name,
                default: field.default.map(Value::from),
                ..Default::default()
            };
            config.endian = pinned.or(field.little_endian.map(|little| {
                if little { Endian::Little } else { Endian::Big }
            }));
            if let Some(mode) = field.int64_mode {
                config.int64_mode = Some(mode.parse::<Int64Mode>()?);
            }

            builder = if ty.is_resizable() {
                let size = match (field.size_ref, field.size) {
                    (Some(size_ref), _) => Size::Ref(size_ref),
                    (None, Some(size)) => Size::Fixed(size),
                    (None, None) => {
                        return Err(ConfigError::InvalidFieldSize {
                            field: config.name.unwrap_or_default(),
                            size: 0,
                        });
                    }
                };
                match ty {
                    FieldType::Text(_) => builder.text(config, size),
                    _ => builder.bytes(config, size),
                }
            } else {
                builder.define(ty, config)
            };
        }

        builder.build()
    }
}
