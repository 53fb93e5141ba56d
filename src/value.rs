//! Decoded field values and the name-to-value records produced by unpacking.

use std::{
    borrow::Cow,
    collections::{BTreeMap, btree_map},
};

use crate::errors::ReadError;

/// A value read from or written to a single field.
///
/// Borrowed variants alias the buffer they were decoded from.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(Cow<'a, str>),
    Bytes(Cow<'a, [u8]>),
}

impl<'a> Value<'a> {
    /// Detaches the value from the buffer it may borrow.
    pub fn into_owned(self) -> Value<'static> {
        match self {
            Value::Int(v) => Value::Int(v),
            Value::UInt(v) => Value::UInt(v),
            Value::Float(v) => Value::Float(v),
            Value::Text(s) => Value::Text(Cow::Owned(s.into_owned())),
            Value::Bytes(b) => Value::Bytes(Cow::Owned(b.into_owned())),
        }
    }

    /// True if the value is one of the numeric variants.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::UInt(_) | Value::Float(_))
    }

    /// The value as an unsigned integer, if it is a non-negative whole number that fits.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::UInt(v) => Some(v),
            Value::Int(v) => u64::try_from(v).ok(),
            Value::Float(v) if v.fract() == 0.0 && v >= 0.0 && v < 18_446_744_073_709_551_616.0 => {
                Some(v as u64)
            }
            _ => None,
        }
    }

    /// The value as a signed integer, if it is a whole number that fits.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(v) => Some(v),
            Value::UInt(v) => i64::try_from(v).ok(),
            Value::Float(v)
                if v.fract() == 0.0
                    && v >= -9_223_372_036_854_775_808.0
                    && v < 9_223_372_036_854_775_808.0 =>
            {
                Some(v as i64)
            }
            _ => None,
        }
    }

    /// The value as a float; integers are converted, possibly rounding.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Int(v) => Some(v as f64),
            Value::UInt(v) => Some(v as f64),
            Value::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Raw bytes of a `Bytes` or `Text` value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            Value::Text(s) => Some(s.as_bytes()),
            _ => None,
        }
    }
}

macro_rules! value_from {
    ($variant:ident, $target:ty: $($t:ty),*) => {
        $(
            impl From<$t> for Value<'_> {
                fn from(v: $t) -> Self {
                    Value::$variant(v as $target)
                }
            }
        )*
    };
}

value_from!(UInt, u64: u8, u16, u32, u64);
value_from!(Int, i64: i8, i16, i32, i64);
value_from!(Float, f64: f32, f64);

impl<'a> From<&'a str> for Value<'a> {
    fn from(v: &'a str) -> Self {
        Value::Text(Cow::Borrowed(v))
    }
}

impl From<String> for Value<'_> {
    fn from(v: String) -> Self {
        Value::Text(Cow::Owned(v))
    }
}

impl<'a> From<&'a [u8]> for Value<'a> {
    fn from(v: &'a [u8]) -> Self {
        Value::Bytes(Cow::Borrowed(v))
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for Value<'a> {
    fn from(v: &'a [u8; N]) -> Self {
        Value::Bytes(Cow::Borrowed(&v[..]))
    }
}

impl From<Vec<u8>> for Value<'_> {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(Cow::Owned(v))
    }
}

/// Field name to value mapping: the output of unpacking and the input of packing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedRecord<'a> {
    values: BTreeMap<String, Value<'a>>,
}

impl<'a> DecodedRecord<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for pack inputs.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value<'a>>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<Value<'a>>,
    ) -> Option<Value<'a>> {
        self.values.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value<'a>> {
        self.values.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value<'a>> {
        self.values.remove(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value<'a>> {
        self.values.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn into_map(self) -> BTreeMap<String, Value<'a>> {
        self.values
    }

    /// Detaches every value from the source buffer.
    pub fn into_owned(self) -> DecodedRecord<'static> {
        DecodedRecord {
            values: self
                .values
                .into_iter()
                .map(|(k, v)| (k, v.into_owned()))
                .collect(),
        }
    }

    /// Looks up a field that must be present.
    pub fn field(&self, name: &str) -> Result<&Value<'a>, ReadError> {
        self.get(name)
            .ok_or_else(|| ReadError::MissingField(name.to_string()))
    }

    pub fn u64(&self, name: &str) -> Result<u64, ReadError> {
        self.field(name)?
            .as_u64()
            .ok_or_else(|| mismatch(name, "an unsigned integer"))
    }

    pub fn i64(&self, name: &str) -> Result<i64, ReadError> {
        self.field(name)?
            .as_i64()
            .ok_or_else(|| mismatch(name, "a signed integer"))
    }

    pub fn f64(&self, name: &str) -> Result<f64, ReadError> {
        self.field(name)?
            .as_f64()
            .ok_or_else(|| mismatch(name, "a number"))
    }

    pub fn str(&self, name: &str) -> Result<&str, ReadError> {
        self.field(name)?
            .as_str()
            .ok_or_else(|| mismatch(name, "text"))
    }

    pub fn bytes(&self, name: &str) -> Result<&[u8], ReadError> {
        self.field(name)?
            .as_bytes()
            .ok_or_else(|| mismatch(name, "a byte block"))
    }
}

fn mismatch(field: &str, expected: &'static str) -> ReadError {
    ReadError::TypeMismatch {
        field: field.to_string(),
        expected,
    }
}

impl<'a> From<BTreeMap<String, Value<'a>>> for DecodedRecord<'a> {
    fn from(values: BTreeMap<String, Value<'a>>) -> Self {
        Self { values }
    }
}

impl<'a, K: Into<String>> FromIterator<(K, Value<'a>)> for DecodedRecord<'a> {
    fn from_iter<I: IntoIterator<Item = (K, Value<'a>)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl<'a> IntoIterator for DecodedRecord<'a> {
    type Item = (String, Value<'a>);
    type IntoIter = btree_map::IntoIter<String, Value<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl<'r, 'a> IntoIterator for &'r DecodedRecord<'a> {
    type Item = (&'r String, &'r Value<'a>);
    type IntoIter = btree_map::Iter<'r, String, Value<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// Types built from a decoded record by field name.
///
/// ```
/// use structcraft::errors::ReadError;
/// use structcraft::value::{DecodedRecord, FromRecord};
///
/// struct Header {
///     version: u8,
///     length: u32,
/// }
///
/// impl FromRecord for Header {
///     fn from_record(record: DecodedRecord<'_>) -> Result<Self, ReadError> {
///         Ok(Header {
///             version: record.u64("version")? as u8,
///             length: record.u64("length")? as u32,
///         })
///     }
/// }
/// ```
pub trait FromRecord: Sized {
    fn from_record(record: DecodedRecord<'_>) -> Result<Self, ReadError>;
}

impl FromRecord for DecodedRecord<'static> {
    fn from_record(record: DecodedRecord<'_>) -> Result<Self, ReadError> {
        Ok(record.into_owned())
    }
}
