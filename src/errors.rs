//! Error types for schema construction, field reads, field writes and record checks.

use thiserror::Error;

/// Errors produced while building a [crate::schema::Schema].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// 64-bit mode name is not one of `strict`, `lossy`, `copy`, `slice`, `int64`, `skip`.
    #[error("unsupported int64 mode `{0}`")]
    UnsupportedInt64Mode(String),
    /// Field type name is not part of the definer surface.
    #[error("unknown field type `{0}`")]
    UnknownFieldType(String),
    /// Size reference does not name an earlier integer field.
    #[error("field `{field}` refers to `{size_ref}`, which is not an earlier integer field")]
    InvalidSizeRef { field: String, size_ref: String },
    /// Only one deferred field is supported per schema.
    #[error("field `{0}` is a second variable-length field")]
    MultipleDeferredFields(String),
    /// Declared default does not fit the field's type or width.
    #[error("invalid default for field `{0}`")]
    InvalidDefault(String),
    /// Width is not valid for the field type (e.g. a 3-byte float).
    #[error("invalid size {size} for field `{field}`")]
    InvalidFieldSize { field: String, size: usize },
    /// A variable-length field must have a name.
    #[error("variable-length fields must be named")]
    UnnamedDeferredField,
    /// `check_size` failed while the schema was being defined.
    #[error(transparent)]
    Check(#[from] CheckError),
}

/// Errors produced when decoding fields from a byte buffer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReadError {
    /// Field span lies outside the buffer.
    #[error("{size} bytes at offset {offset} exceed buffer of {len} bytes")]
    OutOfBounds { offset: usize, size: usize, len: usize },
    /// Buffer is shorter than the record it should hold.
    #[error("buffer of {len} bytes is too short for a {needed}-byte record")]
    BufferTooShort { needed: usize, len: usize },
    /// 64-bit value cannot be represented without loss (strict mode).
    #[error("64-bit value in field `{0}` is not exactly representable")]
    Overflow(String),
    /// No field with this name in the schema.
    #[error("unknown field `{0}`")]
    UnknownField(String),
    /// A record is missing a field required by [crate::value::FromRecord].
    #[error("missing field `{0}`")]
    MissingField(String),
    /// A decoded value does not have the type the caller asked for.
    #[error("field `{field}` is not {expected}")]
    TypeMismatch { field: String, expected: &'static str },
    /// Size-reference field holds a value that cannot be used as a length.
    #[error("field `{0}` does not hold a valid length")]
    InvalidSize(String),
    /// Failure reported by a custom codec.
    #[error("{0}")]
    Custom(String),
}

/// Errors produced when encoding fields into a byte buffer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WriteError {
    /// Field span lies outside the buffer.
    #[error("{size} bytes at offset {offset} exceed buffer of {len} bytes")]
    OutOfBounds { offset: usize, size: usize, len: usize },
    /// Destination buffer is shorter than the record.
    #[error("buffer of {len} bytes is too short for a {needed}-byte record")]
    BufferTooShort { needed: usize, len: usize },
    /// A buffer for the record at this offset cannot be allocated.
    #[error("cannot allocate a {size}-byte record at offset {offset}")]
    RecordTooLarge { offset: usize, size: usize },
    /// Supplied byte block does not match the declared size.
    #[error("field `{field}` expects {expected} bytes, got {actual}")]
    SizeMismatch { field: String, expected: usize, actual: usize },
    /// Value has the wrong type or is out of range for the field.
    #[error("invalid value for field `{0}`")]
    InvalidValue(String),
    /// No field with this name in the schema.
    #[error("unknown field `{0}`")]
    UnknownField(String),
    /// Size-reference value cannot be used as a length.
    #[error("field `{0}` does not hold a valid length")]
    InvalidSize(String),
    /// Failure reported by a custom codec.
    #[error("{0}")]
    Custom(String),
}

/// Assertion failures from [crate::view::RecordView::check_values] and `check_size`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CheckError {
    /// Field does not hold its declared default.
    #[error("field `{field}`: expected {expected}, found {actual}")]
    ValueMismatch {
        field: String,
        expected: String,
        actual: String,
    },
    /// Static record size differs from the expected one (`None` for variable-length schemas).
    #[error("expected record size {expected}, found {actual:?}")]
    SizeMismatch {
        expected: usize,
        actual: Option<usize>,
    },
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Write(#[from] WriteError),
}
