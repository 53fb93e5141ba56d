//! Field accessors: a [FieldSpec] bound to the position of a record in a buffer.
//!
//! Accessors are the single get/set entry point used by [crate::view::RecordView]
//! and by pack/unpack; they slice the field's span out of the buffer and hand it
//! to the field's codec.

use crate::{
    bytes,
    errors::{CheckError, ReadError, WriteError},
    field::{FieldName, FieldSpec},
    value::Value,
};

/// Reads and writes one field of a record starting at `base` in a buffer.
#[derive(Debug, Clone, Copy)]
pub struct Accessor<'s> {
    spec: &'s FieldSpec,
    base: usize,
    checked: bool,
}

impl<'s> Accessor<'s> {
    /// Binds `spec` to a record starting at byte `base`.
    ///
    /// `checked` enables integer range validation on writes.
    pub fn new(spec: &'s FieldSpec, base: usize, checked: bool) -> Self {
        Self {
            spec,
            base,
            checked,
        }
    }

    pub fn spec(&self) -> &'s FieldSpec {
        self.spec
    }

    pub fn name(&self) -> &'s FieldName {
        &self.spec.name
    }

    /// Absolute offset of the field in the buffer.
    pub fn offset(&self) -> usize {
        self.base + self.spec.offset
    }

    pub fn size(&self) -> usize {
        self.spec.size
    }

    /// The field's undecoded bytes.
    pub fn raw<'a>(&self, data: &'a [u8]) -> Result<&'a [u8], ReadError> {
        bytes::span(data, self.offset(), self.size())
    }

    pub fn get<'a>(&self, data: &'a [u8]) -> Result<Value<'a>, ReadError> {
        let span = self.raw(data)?;
        self.spec.codec.read(&self.spec.name, span, self.spec.endian)
    }

    pub fn set(&self, data: &mut [u8], value: &Value<'_>) -> Result<(), WriteError> {
        let span = bytes::span_mut(data, self.offset(), self.size())?;
        self.spec
            .codec
            .write(&self.spec.name, span, self.spec.endian, value, self.checked)
    }

    /// Writes the field's empty value (zero bytes).
    pub fn clear(&self, data: &mut [u8]) -> Result<(), WriteError> {
        let span = bytes::span_mut(data, self.offset(), self.size())?;
        self.spec.codec.clear(span);
        Ok(())
    }

    /// Writes the declared default, if any. Returns whether one was written.
    pub fn write_default(&self, data: &mut [u8]) -> Result<bool, WriteError> {
        match &self.spec.default {
            Some(default) => self.set(data, default).map(|_| true),
            None => Ok(false),
        }
    }

    /// Fails unless the field holds its declared default. Fields without one always pass.
    pub fn check_default(&self, data: &[u8]) -> Result<(), CheckError> {
        let Some(default) = &self.spec.default else {
            return Ok(());
        };

        let mut expected = vec![0u8; self.size()];
        self.spec.codec.write(
            &self.spec.name,
            &mut expected,
            self.spec.endian,
            default,
            self.checked,
        )?;

        let raw = self.raw(data)?;
        if raw == expected.as_slice() {
            return Ok(());
        }

        let actual = match self.get(data) {
            Ok(value) => format!("{value:?}"),
            Err(_) => format!("{raw:?}"),
        };

        Err(CheckError::ValueMismatch {
            field: self.spec.name.to_string(),
            expected: format!("{default:?}"),
            actual,
        })
    }
}
