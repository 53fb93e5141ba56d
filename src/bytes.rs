//! Low-level byte-buffer primitives: bounds-checked spans and fixed-width
//! integer/float access in either byte order.
//!
//! Every function that takes a `span` expects it to be exactly the field's
//! width (1 to 8 bytes for integers).

use crate::{
    errors::{ReadError, WriteError},
    options::Endian,
};

/// Returns `size` bytes starting at `offset`.
pub fn span(data: &[u8], offset: usize, size: usize) -> Result<&[u8], ReadError> {
    match offset.checked_add(size) {
        Some(end) if end <= data.len() => Ok(&data[offset..end]),
        _ => Err(ReadError::OutOfBounds {
            offset,
            size,
            len: data.len(),
        }),
    }
}

/// Mutable counterpart of [span].
pub fn span_mut(data: &mut [u8], offset: usize, size: usize) -> Result<&mut [u8], WriteError> {
    match offset.checked_add(size) {
        Some(end) if end <= data.len() => Ok(&mut data[offset..end]),
        _ => Err(WriteError::OutOfBounds {
            offset,
            size,
            len: data.len(),
        }),
    }
}

/// Reads the span as an unsigned integer.
pub fn get_uint(span: &[u8], endian: Endian) -> u64 {
    let fold = |acc: u64, b: &u8| (acc << 8) | *b as u64;
    match endian {
        Endian::Big => span.iter().fold(0, fold),
        Endian::Little => span.iter().rev().fold(0, fold),
    }
}

/// Reads the span as a two's complement signed integer.
pub fn get_int(span: &[u8], endian: Endian) -> i64 {
    sign_extend(get_uint(span, endian), span.len() * 8)
}

/// Writes the low `span.len()` bytes of `value`.
pub fn set_uint(span: &mut [u8], endian: Endian, value: u64) {
    let width = span.len();
    for (i, byte) in span.iter_mut().enumerate() {
        let shift = match endian {
            Endian::Big => (width - 1 - i) * 8,
            Endian::Little => i * 8,
        };
        *byte = (value >> shift) as u8;
    }
}

pub fn get_f32(span: &[u8], endian: Endian) -> f32 {
    f32::from_bits(get_uint(span, endian) as u32)
}

pub fn get_f64(span: &[u8], endian: Endian) -> f64 {
    f64::from_bits(get_uint(span, endian))
}

pub fn set_f32(span: &mut [u8], endian: Endian, value: f32) {
    set_uint(span, endian, value.to_bits() as u64)
}

pub fn set_f64(span: &mut [u8], endian: Endian, value: f64) {
    set_uint(span, endian, value.to_bits())
}

/// Splits an 8-byte span into its (high, low) 32-bit halves.
pub fn get_halves(span: &[u8], endian: Endian) -> (u32, u32) {
    let (first, second) = span.split_at(4);
    match endian {
        Endian::Big => (get_uint(first, endian) as u32, get_uint(second, endian) as u32),
        Endian::Little => (get_uint(second, endian) as u32, get_uint(first, endian) as u32),
    }
}

/// Writes (high, low) 32-bit halves into an 8-byte span.
pub fn set_halves(span: &mut [u8], endian: Endian, high: u32, low: u32) {
    let (first, second) = span.split_at_mut(4);
    match endian {
        Endian::Big => {
            set_uint(first, endian, high as u64);
            set_uint(second, endian, low as u64);
        }
        Endian::Little => {
            set_uint(first, endian, low as u64);
            set_uint(second, endian, high as u64);
        }
    }
}

/// Sign-extends the low `bits` of `value` to a full `i64`.
pub fn sign_extend(value: u64, bits: usize) -> i64 {
    let shift = 64 - bits;
    ((value << shift) as i64) >> shift
}
