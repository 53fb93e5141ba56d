//! Per-type read/write of a single field span.
//!
//! Every codec operates on a span that is exactly the field's width; the
//! [crate::accessor::Accessor] slices it out of the buffer first.
//!
//! ## 64-bit integers
//!
//! A 64-bit field is read as a (high, low) pair of 32-bit halves placed
//! according to the field's byte order. What happens next depends on the
//! field's [Int64Mode]:
//!
//! | mode     | decode                                        | encode                         |
//! |----------|-----------------------------------------------|--------------------------------|
//! | `Strict` | exact integer, [ReadError::Overflow] past 2^53 - 1 | integer split into halves |
//! | `Lossy`  | exact integer, `±∞` past 2^53 - 1             | integer split into halves      |
//! | `Copy`   | owned copy of the 8 bytes                     | 8-byte block copied verbatim   |
//! | `Slice`  | borrowed view of the 8 bytes                  | 8-byte block copied verbatim   |
//! | `Int64`  | exact integer over the full range             | integer split into halves      |
//! | `Skip`   | not decoded                                   | no-op unless given raw bytes   |

use std::{borrow::Cow, fmt, sync::Arc};

use crate::{
    bytes,
    errors::{ReadError, WriteError},
    field::{FieldName, FieldType},
    options::{Endian, Int64Mode},
    value::Value,
};

/// Every integer whose magnitude is at most this is exactly representable as an `f64`.
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// A caller-supplied codec replacing the built-in one for a field.
pub trait FieldCodec: fmt::Debug + Send + Sync {
    /// Decodes the field's span.
    fn read<'a>(&self, span: &'a [u8], endian: Endian) -> Result<Value<'a>, ReadError>;

    /// Encodes `value` into the field's span.
    fn write(&self, span: &mut [u8], value: &Value<'_>, endian: Endian) -> Result<(), WriteError>;
}

/// Effective read/write behaviour of a registered field.
#[derive(Debug, Clone)]
pub enum Codec {
    UInt,
    Int,
    Float,
    Int64 { signed: bool, mode: Int64Mode },
    Bytes,
    Text,
    Custom(Arc<dyn FieldCodec>),
}

impl Codec {
    /// Built-in codec for a field type.
    pub fn for_type(ty: FieldType, int64_mode: Int64Mode) -> Self {
        match ty {
            FieldType::UInt(8) => Codec::Int64 {
                signed: false,
                mode: int64_mode,
            },
            FieldType::Int(8) => Codec::Int64 {
                signed: true,
                mode: int64_mode,
            },
            FieldType::UInt(_) => Codec::UInt,
            FieldType::Int(_) => Codec::Int,
            FieldType::Float32 | FieldType::Float64 => Codec::Float,
            FieldType::Bytes(_) => Codec::Bytes,
            FieldType::Text(_) => Codec::Text,
        }
    }

    /// True for 64-bit fields in [Int64Mode::Skip].
    pub fn is_skipped(&self) -> bool {
        matches!(
            self,
            Codec::Int64 {
                mode: Int64Mode::Skip,
                ..
            }
        )
    }

    pub fn read<'a>(
        &self,
        field: &FieldName,
        span: &'a [u8],
        endian: Endian,
    ) -> Result<Value<'a>, ReadError> {
        match self {
            Codec::UInt => Ok(Value::UInt(bytes::get_uint(span, endian))),
            Codec::Int => Ok(Value::Int(bytes::get_int(span, endian))),
            Codec::Float => Ok(Value::Float(read_float(span, endian))),
            Codec::Int64 { signed, mode } => read_int64(field, span, endian, *signed, *mode),
            Codec::Bytes => Ok(Value::Bytes(Cow::Borrowed(span))),
            Codec::Text => Ok(Value::Text(String::from_utf8_lossy(span))),
            Codec::Custom(codec) => codec.read(span, endian),
        }
    }

    /// Encodes `value` into `span`. On error the span is left untouched.
    ///
    /// With `checked` set, integers outside the field's range are rejected;
    /// otherwise they are truncated to the field's width.
    pub fn write(
        &self,
        field: &FieldName,
        span: &mut [u8],
        endian: Endian,
        value: &Value<'_>,
        checked: bool,
    ) -> Result<(), WriteError> {
        match self {
            Codec::UInt | Codec::Int => {
                let signed = matches!(self, Codec::Int);
                let bits = integer_bits(value, signed, span.len() * 8, checked)
                    .ok_or_else(|| invalid(field))?;
                bytes::set_uint(span, endian, bits);
                Ok(())
            }
            Codec::Float => {
                let v = value.as_f64().ok_or_else(|| invalid(field))?;
                match span.len() {
                    4 => bytes::set_f32(span, endian, v as f32),
                    _ => bytes::set_f64(span, endian, v),
                }
                Ok(())
            }
            Codec::Int64 { signed, mode } => {
                write_int64(field, span, endian, value, *signed, *mode, checked)
            }
            Codec::Bytes => {
                let block = value.as_bytes().ok_or_else(|| invalid(field))?;
                copy_exact(field, span, block)
            }
            Codec::Text => write_text(field, span, value),
            Codec::Custom(codec) => codec.write(span, value, endian),
        }
    }

    /// Writes the field's empty value: zero bytes, except skipped 64-bit fields, which stay untouched.
    pub fn clear(&self, span: &mut [u8]) {
        if !self.is_skipped() {
            span.fill(0);
        }
    }
}

fn invalid(field: &FieldName) -> WriteError {
    WriteError::InvalidValue(field.to_string())
}

fn read_float(span: &[u8], endian: Endian) -> f64 {
    match span.len() {
        4 => bytes::get_f32(span, endian) as f64,
        _ => bytes::get_f64(span, endian),
    }
}

/// Two's complement bits of an integer value for a `width`-bit field.
fn integer_bits(value: &Value<'_>, signed: bool, width: usize, checked: bool) -> Option<u64> {
    if !checked {
        return match *value {
            Value::UInt(v) => Some(v),
            Value::Int(v) => Some(v as u64),
            Value::Float(v) if signed => Some(v as i64 as u64),
            Value::Float(v) => Some(v as u64),
            _ => None,
        };
    }

    if signed {
        let v = value.as_i64()?;
        if width < 64 {
            let limit = 1i64 << (width - 1);
            if v < -limit || v >= limit {
                return None;
            }
        }
        Some(v as u64)
    } else {
        let v = value.as_u64()?;
        if width < 64 && v >> width != 0 {
            return None;
        }
        Some(v)
    }
}

/// True if an `f64` holds the value exactly and so do all integers of smaller magnitude.
fn is_safe_integer(bits: u64, signed: bool) -> bool {
    if signed {
        (bits as i64).unsigned_abs() <= MAX_SAFE_INTEGER
    } else {
        bits <= MAX_SAFE_INTEGER
    }
}

fn read_int64<'a>(
    field: &FieldName,
    span: &'a [u8],
    endian: Endian,
    signed: bool,
    mode: Int64Mode,
) -> Result<Value<'a>, ReadError> {
    match mode {
        Int64Mode::Copy => return Ok(Value::Bytes(Cow::Owned(span.to_vec()))),
        Int64Mode::Slice | Int64Mode::Skip => return Ok(Value::Bytes(Cow::Borrowed(span))),
        Int64Mode::Strict | Int64Mode::Lossy | Int64Mode::Int64 => {}
    }

    let (high, low) = bytes::get_halves(span, endian);
    let bits = ((high as u64) << 32) | low as u64;
    let value = if signed {
        Value::Int(bits as i64)
    } else {
        Value::UInt(bits)
    };

    if mode == Int64Mode::Int64 || is_safe_integer(bits, signed) {
        return Ok(value);
    }

    match mode {
        Int64Mode::Lossy if signed && (bits as i64) < 0 => Ok(Value::Float(f64::NEG_INFINITY)),
        Int64Mode::Lossy => Ok(Value::Float(f64::INFINITY)),
        _ => Err(ReadError::Overflow(field.to_string())),
    }
}

fn write_int64(
    field: &FieldName,
    span: &mut [u8],
    endian: Endian,
    value: &Value<'_>,
    signed: bool,
    mode: Int64Mode,
    checked: bool,
) -> Result<(), WriteError> {
    if let Value::Bytes(raw) = value {
        return copy_exact(field, span, raw);
    }

    match mode {
        Int64Mode::Skip => Ok(()),
        Int64Mode::Copy | Int64Mode::Slice => Err(invalid(field)),
        Int64Mode::Strict | Int64Mode::Lossy | Int64Mode::Int64 => {
            let bits = integer_bits(value, signed, 64, checked).ok_or_else(|| invalid(field))?;
            bytes::set_halves(span, endian, (bits >> 32) as u32, bits as u32);
            Ok(())
        }
    }
}

fn copy_exact(field: &FieldName, span: &mut [u8], block: &[u8]) -> Result<(), WriteError> {
    if block.len() != span.len() {
        return Err(WriteError::SizeMismatch {
            field: field.to_string(),
            expected: span.len(),
            actual: block.len(),
        });
    }

    span.copy_from_slice(block);
    Ok(())
}

fn write_text(field: &FieldName, span: &mut [u8], value: &Value<'_>) -> Result<(), WriteError> {
    match value {
        Value::Text(text) => {
            let mut n = text.len().min(span.len());
            while !text.is_char_boundary(n) {
                n -= 1;
            }

            span.fill(0);
            span[..n].copy_from_slice(&text.as_bytes()[..n]);
            Ok(())
        }
        Value::Bytes(block) => copy_exact(field, span, block),
        _ => Err(invalid(field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name() -> FieldName {
        FieldName::Named("f".to_string())
    }

    fn int64(signed: bool, mode: Int64Mode) -> Codec {
        Codec::Int64 { signed, mode }
    }

    #[test]
    fn test_max_safe_integer_is_exact() {
        assert_eq!(MAX_SAFE_INTEGER as f64 as u64, MAX_SAFE_INTEGER);
        assert_eq!((MAX_SAFE_INTEGER - 1) as f64 as u64, MAX_SAFE_INTEGER - 1);
        // 2^53 + 1 is the first integer an f64 cannot hold.
        assert_ne!((MAX_SAFE_INTEGER + 2) as f64 as u64, MAX_SAFE_INTEGER + 2);
    }

    #[test]
    fn test_strict_boundary() {
        let codec = int64(false, Int64Mode::Strict);
        let ok = MAX_SAFE_INTEGER.to_be_bytes();
        let over = (MAX_SAFE_INTEGER + 1).to_be_bytes();

        assert_eq!(
            codec.read(&name(), &ok, Endian::Big),
            Ok(Value::UInt(9_007_199_254_740_991))
        );
        assert_eq!(
            codec.read(&name(), &over, Endian::Big),
            Err(ReadError::Overflow("f".to_string()))
        );
    }

    #[test]
    fn test_strict_signed_boundary() {
        let codec = int64(true, Int64Mode::Strict);
        let min_ok = (-(MAX_SAFE_INTEGER as i64)).to_le_bytes();
        let min_over = (-(MAX_SAFE_INTEGER as i64) - 1).to_le_bytes();

        assert_eq!(
            codec.read(&name(), &min_ok, Endian::Little),
            Ok(Value::Int(-9_007_199_254_740_991))
        );
        assert!(codec.read(&name(), &min_over, Endian::Little).is_err());
    }

    #[test]
    fn test_lossy_overflow() {
        let unsigned = int64(false, Int64Mode::Lossy);
        let signed = int64(true, Int64Mode::Lossy);
        let big = (1u64 << 53).to_be_bytes();
        let negative = (-(1i64 << 53)).to_be_bytes();

        assert_eq!(
            unsigned.read(&name(), &big, Endian::Big),
            Ok(Value::Float(f64::INFINITY))
        );
        assert_eq!(
            signed.read(&name(), &big, Endian::Big),
            Ok(Value::Float(f64::INFINITY))
        );
        assert_eq!(
            signed.read(&name(), &negative, Endian::Big),
            Ok(Value::Float(f64::NEG_INFINITY))
        );
        assert_eq!(
            unsigned.read(&name(), &42u64.to_be_bytes(), Endian::Big),
            Ok(Value::UInt(42))
        );
    }

    #[test]
    fn test_int64_full_range() {
        let codec = int64(true, Int64Mode::Int64);
        let mut span = [0u8; 8];
        codec
            .write(&name(), &mut span, Endian::Big, &Value::Int(i64::MIN), true)
            .unwrap();
        assert_eq!(span, i64::MIN.to_be_bytes());
        assert_eq!(
            codec.read(&name(), &span, Endian::Big),
            Ok(Value::Int(i64::MIN))
        );

        let codec = int64(false, Int64Mode::Int64);
        let span = u64::MAX.to_le_bytes();
        assert_eq!(
            codec.read(&name(), &span, Endian::Little),
            Ok(Value::UInt(u64::MAX))
        );
    }

    #[test]
    fn test_copy_and_slice() {
        let data = [1u8, 2, 3, 4, 5, 6, 7, 8];

        let copied = int64(false, Int64Mode::Copy)
            .read(&name(), &data, Endian::Big)
            .unwrap();
        assert!(matches!(copied, Value::Bytes(Cow::Owned(ref b)) if b == &data));

        let sliced = int64(false, Int64Mode::Slice)
            .read(&name(), &data, Endian::Big)
            .unwrap();
        match sliced {
            Value::Bytes(Cow::Borrowed(b)) => assert!(std::ptr::eq(b, &data[..])),
            other => panic!("expected a borrowed slice, got {other:?}"),
        }
    }

    #[test]
    fn test_copy_requires_block() {
        let codec = int64(false, Int64Mode::Copy);
        let mut span = [0u8; 8];
        assert_eq!(
            codec.write(&name(), &mut span, Endian::Big, &Value::UInt(1), true),
            Err(WriteError::InvalidValue("f".to_string()))
        );
        assert_eq!(
            codec.write(&name(), &mut span, Endian::Big, &Value::from(&[1u8; 4]), true),
            Err(WriteError::SizeMismatch {
                field: "f".to_string(),
                expected: 8,
                actual: 4
            })
        );
        codec
            .write(&name(), &mut span, Endian::Big, &Value::from(&[9u8; 8]), true)
            .unwrap();
        assert_eq!(span, [9u8; 8]);
    }

    #[test]
    fn test_skip_write_is_noop() {
        let codec = int64(false, Int64Mode::Skip);
        let mut span = [7u8; 8];
        codec
            .write(&name(), &mut span, Endian::Big, &Value::UInt(1), true)
            .unwrap();
        codec.clear(&mut span);
        assert_eq!(span, [7u8; 8]);
    }

    #[test]
    fn test_halves_follow_endianness() {
        let codec = int64(false, Int64Mode::Strict);
        let mut span = [0u8; 8];
        codec
            .write(&name(), &mut span, Endian::Little, &Value::UInt(0x1_0000_0002), true)
            .unwrap();
        assert_eq!(span, [2, 0, 0, 0, 1, 0, 0, 0]);
    }

    #[test]
    fn test_integer_range_checks() {
        let mut span = [0u8; 1];
        assert!(
            Codec::UInt
                .write(&name(), &mut span, Endian::Big, &Value::UInt(256), true)
                .is_err()
        );
        assert!(
            Codec::Int
                .write(&name(), &mut span, Endian::Big, &Value::Int(-129), true)
                .is_err()
        );
        Codec::Int
            .write(&name(), &mut span, Endian::Big, &Value::Int(-128), true)
            .unwrap();
        assert_eq!(span, [0x80]);

        Codec::UInt
            .write(&name(), &mut span, Endian::Big, &Value::UInt(0x1ff), false)
            .unwrap();
        assert_eq!(span, [0xff]);
    }

    #[test]
    fn test_text_padding_and_truncation() {
        let mut span = [0xaau8; 6];
        Codec::Text
            .write(&name(), &mut span, Endian::Big, &Value::from("hi"), true)
            .unwrap();
        assert_eq!(span, *b"hi\0\0\0\0");

        let mut span = [0u8; 2];
        Codec::Text
            .write(&name(), &mut span, Endian::Big, &Value::from("é!"), true)
            .unwrap();
        assert_eq!(&span, "é".as_bytes());

        let mut span = [0u8; 2];
        Codec::Text
            .write(&name(), &mut span, Endian::Big, &Value::from("aé"), true)
            .unwrap();
        assert_eq!(span, *b"a\0");
    }

    #[test]
    fn test_block_size_mismatch_leaves_span() {
        let mut span = [5u8; 4];
        let err = Codec::Bytes
            .write(&name(), &mut span, Endian::Big, &Value::from(&[1u8, 2, 3]), true)
            .unwrap_err();
        assert_eq!(
            err,
            WriteError::SizeMismatch {
                field: "f".to_string(),
                expected: 4,
                actual: 3
            }
        );
        assert_eq!(span, [5u8; 4]);
    }

    #[test]
    fn test_block_read_borrows() {
        let data = [1u8, 2, 3];
        let value = Codec::Bytes.read(&name(), &data, Endian::Big).unwrap();
        assert!(matches!(value, Value::Bytes(Cow::Borrowed(_))));
    }
}
