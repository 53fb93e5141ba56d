//! Schema-wide configuration: byte order, 64-bit handling and bounds checking.

use std::{fmt, str::FromStr};

use crate::errors::ConfigError;

/// Byte order of a multi-byte field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    #[default]
    Big,
    Little,
}

/// How 64-bit integer fields are decoded and encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Int64Mode {
    /// Exact integer, error if the magnitude exceeds 2^53 - 1.
    ///
    /// The limit is symmetric: -2^53 is rejected too, although an `f64`
    /// holds it exactly, since its neighbour -2^53 - 1 is not.
    #[default]
    Strict,
    /// Exact integer, or an infinite float when the magnitude exceeds 2^53 - 1.
    Lossy,
    /// Owned copy of the raw 8 bytes.
    Copy,
    /// Borrowed view of the raw 8 bytes.
    Slice,
    /// Exact integer over the full 64-bit range.
    Int64,
    /// Left out of decoded records; span stays reserved.
    Skip,
}

impl Int64Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Int64Mode::Strict => "strict",
            Int64Mode::Lossy => "lossy",
            Int64Mode::Copy => "copy",
            Int64Mode::Slice => "slice",
            Int64Mode::Int64 => "int64",
            Int64Mode::Skip => "skip",
        }
    }
}

impl FromStr for Int64Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(Int64Mode::Strict),
            "lossy" => Ok(Int64Mode::Lossy),
            "copy" => Ok(Int64Mode::Copy),
            "slice" => Ok(Int64Mode::Slice),
            "int64" => Ok(Int64Mode::Int64),
            "skip" => Ok(Int64Mode::Skip),
            other => Err(ConfigError::UnsupportedInt64Mode(other.to_string())),
        }
    }
}

impl fmt::Display for Int64Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options fixed when a schema is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaOptions {
    /// Optional label, only used for display.
    pub name: Option<String>,
    /// Byte order for fields that do not override it.
    pub endian: Endian,
    /// Validate buffer lengths and integer ranges.
    pub bounds_check: bool,
    /// 64-bit handling for fields that do not override it.
    pub int64_mode: Int64Mode,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            name: None,
            endian: Endian::Big,
            bounds_check: true,
            int64_mode: Int64Mode::Strict,
        }
    }
}

impl SchemaOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn little_endian(mut self) -> Self {
        self.endian = Endian::Little;
        self
    }

    pub fn bounds_check(mut self, enabled: bool) -> Self {
        self.bounds_check = enabled;
        self
    }

    pub fn int64_mode(mut self, mode: Int64Mode) -> Self {
        self.int64_mode = mode;
        self
    }
}

/// Where a record sits in a buffer for one pack/unpack call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Placement {
    /// Byte offset of the record's first field.
    pub offset: usize,
    /// Overrides [SchemaOptions::bounds_check] for this call.
    pub bounds_check: Option<bool>,
}

impl Placement {
    pub fn at(offset: usize) -> Self {
        Self {
            offset,
            bounds_check: None,
        }
    }

    pub fn unchecked(mut self) -> Self {
        self.bounds_check = Some(false);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int64_mode_from_str() {
        for mode in [
            Int64Mode::Strict,
            Int64Mode::Lossy,
            Int64Mode::Copy,
            Int64Mode::Slice,
            Int64Mode::Int64,
            Int64Mode::Skip,
        ] {
            assert_eq!(mode.as_str().parse::<Int64Mode>(), Ok(mode));
        }
    }

    #[test]
    fn test_int64_mode_unsupported() {
        assert_eq!(
            "bigint".parse::<Int64Mode>(),
            Err(ConfigError::UnsupportedInt64Mode("bigint".to_string()))
        );
    }

    #[test]
    fn test_default_options() {
        let options = SchemaOptions::default();
        assert_eq!(options.endian, Endian::Big);
        assert!(options.bounds_check);
        assert_eq!(options.int64_mode, Int64Mode::Strict);
    }
}
