//! Whole-record encode ([Schema::pack]) and decode ([Schema::unpack]).

use crate::{
    errors::{ReadError, WriteError},
    options::Placement,
    schema::{Layout, Schema},
    value::{DecodedRecord, FromRecord},
};

impl Schema {
    fn checked(&self, placement: Placement) -> bool {
        placement.bounds_check.unwrap_or(self.options().bounds_check)
    }

    /// Decodes the record at the start of `data`.
    pub fn unpack<'a>(&self, data: &'a [u8]) -> Result<DecodedRecord<'a>, ReadError> {
        self.unpack_at(data, Placement::default())
    }

    /// Decodes the record at `placement.offset`.
    ///
    /// Filler fields and 64-bit fields in skip mode are not part of the result.
    /// Block fields and 64-bit fields in slice mode borrow from `data`.
    pub fn unpack_at<'a>(
        &self,
        data: &'a [u8],
        placement: Placement,
    ) -> Result<DecodedRecord<'a>, ReadError> {
        let checked = self.checked(placement);
        let layout = self.layout_in(data, placement.offset, checked)?;

        if checked {
            match placement.offset.checked_add(layout.size()) {
                Some(needed) if needed <= data.len() => {}
                Some(needed) => {
                    return Err(ReadError::BufferTooShort {
                        needed,
                        len: data.len(),
                    });
                }
                None => {
                    return Err(ReadError::OutOfBounds {
                        offset: placement.offset,
                        size: layout.size(),
                        len: data.len(),
                    });
                }
            }
        }

        let mut record = DecodedRecord::new();
        for accessor in layout.accessors(placement.offset, checked) {
            let spec = accessor.spec();
            if spec.is_hidden() {
                continue;
            }
            if let Some(name) = spec.name.as_named() {
                record.insert(name, accessor.get(data)?);
            }
        }

        Ok(record)
    }

    /// Decodes the record at the start of `data` into `T`.
    pub fn unpack_as<T: FromRecord>(&self, data: &[u8]) -> Result<T, ReadError> {
        T::from_record(self.unpack(data)?)
    }

    /// Encodes `record` into a new buffer of exactly the record's size.
    pub fn pack(&self, record: &DecodedRecord<'_>) -> Result<Vec<u8>, WriteError> {
        self.pack_at(record, Placement::default())
    }

    /// Encodes `record` into a new zeroed buffer of `placement.offset` plus the record's size.
    pub fn pack_at(
        &self,
        record: &DecodedRecord<'_>,
        placement: Placement,
    ) -> Result<Vec<u8>, WriteError> {
        let layout = self.layout_for(record)?;
        let too_large = || WriteError::RecordTooLarge {
            offset: placement.offset,
            size: layout.size(),
        };

        let len = placement.offset.checked_add(layout.size()).ok_or_else(too_large)?;
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|_| too_large())?;
        data.resize(len, 0);

        self.write_record(&layout, record, &mut data, placement)?;
        Ok(data)
    }

    /// Encodes `record` into `data` at `placement.offset`.
    ///
    /// Returns the number of bytes the record occupies.
    pub fn pack_into(
        &self,
        record: &DecodedRecord<'_>,
        data: &mut [u8],
        placement: Placement,
    ) -> Result<usize, WriteError> {
        let layout = self.layout_for(record)?;

        if self.checked(placement) {
            match placement.offset.checked_add(layout.size()) {
                Some(needed) if needed <= data.len() => {}
                Some(needed) => {
                    return Err(WriteError::BufferTooShort {
                        needed,
                        len: data.len(),
                    });
                }
                None => {
                    return Err(WriteError::OutOfBounds {
                        offset: placement.offset,
                        size: layout.size(),
                        len: data.len(),
                    });
                }
            }
        }

        self.write_record(&layout, record, data, placement)?;
        Ok(layout.size())
    }

    /// Writes every field: the record's value, else the declared default, else zeros.
    fn write_record(
        &self,
        layout: &Layout<'_>,
        record: &DecodedRecord<'_>,
        data: &mut [u8],
        placement: Placement,
    ) -> Result<(), WriteError> {
        for accessor in layout.accessors(placement.offset, self.checked(placement)) {
            let spec = accessor.spec();
            let value = spec
                .name
                .as_named()
                .and_then(|name| record.get(name))
                .or(spec.default.as_ref());

            match value {
                Some(value) => accessor.set(data, value)?,
                None => accessor.clear(data)?,
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use crate::{
        field::FieldConfig,
        options::{Int64Mode, SchemaOptions},
        value::Value,
    };

    use super::*;

    fn header() -> Schema {
        Schema::builder(SchemaOptions::default())
            .uint32be(FieldConfig::named("magic").default_value(0xfeed_u32))
            .uint8("version")
            .uint8(())
            .int16le("delta")
            .float32("ratio")
            .build()
            .unwrap()
    }

    #[test]
    fn test_pack_fills_defaults_and_zeros() {
        let data = header()
            .pack(&DecodedRecord::new().with("version", 2u8))
            .unwrap();
        assert_eq!(data, vec![0, 0, 0xfe, 0xed, 2, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_round_trip() {
        let schema = header();
        let record = DecodedRecord::new()
            .with("magic", 1u32)
            .with("version", 3u8)
            .with("delta", -2i16)
            .with("ratio", 0.5f32);

        let data = schema.pack(&record).unwrap();
        let decoded = schema.unpack(&data).unwrap();

        assert_eq!(decoded.u64("magic"), Ok(1));
        assert_eq!(decoded.u64("version"), Ok(3));
        assert_eq!(decoded.i64("delta"), Ok(-2));
        assert_eq!(decoded.f64("ratio"), Ok(0.5));
        assert_eq!(decoded.len(), 4);
        assert_eq!(schema.pack(&decoded).unwrap(), data);
    }

    #[test]
    fn test_fillers_are_hidden() {
        let schema = header();
        let mut data = schema.pack(&DecodedRecord::new()).unwrap();
        data[5] = 0xff;

        let decoded = schema.unpack(&data).unwrap();
        assert!(decoded.keys().all(|k| !k.starts_with('#')));
        assert_eq!(decoded.keys().collect::<Vec<_>>(), vec!["delta", "magic", "ratio", "version"]);
    }

    #[test]
    fn test_fillers_take_defaults() {
        let schema = Schema::builder(SchemaOptions::default())
            .uint8(FieldConfig::filler().default_value(0xaau8))
            .uint8("x")
            .build()
            .unwrap();

        assert_eq!(schema.pack(&DecodedRecord::new()).unwrap(), vec![0xaa, 0]);
    }

    #[test]
    fn test_unpack_at_offset() {
        let schema = header();
        let data = schema
            .pack_at(&DecodedRecord::new().with("version", 9u8), Placement::at(3))
            .unwrap();
        assert_eq!(data.len(), 15);
        assert_eq!(&data[..3], &[0, 0, 0]);

        let decoded = schema.unpack_at(&data, Placement::at(3)).unwrap();
        assert_eq!(decoded.u64("version"), Ok(9));
        assert_eq!(decoded.u64("magic"), Ok(0xfeed));
    }

    #[test]
    fn test_unpack_short_buffer() {
        let schema = header();
        assert_eq!(
            schema.unpack(&[0u8; 11]),
            Err(ReadError::BufferTooShort { needed: 12, len: 11 })
        );

        // Unchecked, fields that fit are still decoded up to the first that does not.
        assert_eq!(
            schema.unpack_at(&[0u8; 11], Placement::default().unchecked()),
            Err(ReadError::OutOfBounds {
                offset: 8,
                size: 4,
                len: 11
            })
        );
    }

    #[test]
    fn test_pack_into_existing_buffer() {
        let schema = header();
        let mut data = vec![0x55u8; 14];
        let written = schema
            .pack_into(&DecodedRecord::new().with("version", 1u8), &mut data, Placement::at(2))
            .unwrap();

        assert_eq!(written, 12);
        assert_eq!(&data[..2], &[0x55, 0x55]);
        assert_eq!(&data[2..], &[0, 0, 0xfe, 0xed, 1, 0, 0, 0, 0, 0, 0, 0]);

        assert_eq!(
            schema.pack_into(&DecodedRecord::new(), &mut data, Placement::at(3)),
            Err(WriteError::BufferTooShort { needed: 15, len: 14 })
        );
    }

    #[test]
    fn test_unchecked_pack_truncates() {
        let schema = Schema::builder(SchemaOptions::default().bounds_check(false))
            .uint8("x")
            .build()
            .unwrap();
        assert_eq!(
            schema.pack(&DecodedRecord::new().with("x", 0x1ffu16)).unwrap(),
            vec![0xff]
        );

        let checked = Schema::builder(SchemaOptions::default()).uint8("x").build().unwrap();
        assert_eq!(
            checked.pack(&DecodedRecord::new().with("x", 0x1ffu16)),
            Err(WriteError::InvalidValue("x".to_string()))
        );
    }

    #[test]
    fn test_int64_modes_in_records() {
        let schema = Schema::builder(SchemaOptions::default().int64_mode(Int64Mode::Skip))
            .uint64("skipped")
            .uint64(FieldConfig::named("raw").int64_mode(Int64Mode::Slice))
            .uint64(FieldConfig::named("exact").int64_mode(Int64Mode::Int64))
            .build()
            .unwrap();

        let record = DecodedRecord::new()
            .with("skipped", 5u64)
            .with("raw", &[1u8, 2, 3, 4, 5, 6, 7, 8])
            .with("exact", u64::MAX);
        let data = schema.pack(&record).unwrap();

        assert_eq!(&data[..8], &[0u8; 8]);
        let decoded = schema.unpack(&data).unwrap();
        assert!(!decoded.contains_key("skipped"));
        assert!(matches!(decoded.get("raw"), Some(Value::Bytes(Cow::Borrowed(_)))));
        assert_eq!(decoded.bytes("raw"), Ok(&[1u8, 2, 3, 4, 5, 6, 7, 8][..]));
        assert_eq!(decoded.u64("exact"), Ok(u64::MAX));
    }

    #[test]
    fn test_skip_writes_raw_block() {
        let schema = Schema::builder(SchemaOptions::default().int64_mode(Int64Mode::Skip))
            .uint64("id")
            .build()
            .unwrap();

        let data = schema
            .pack(&DecodedRecord::new().with("id", vec![1u8; 8]))
            .unwrap();
        assert_eq!(data, vec![1u8; 8]);
    }

    #[test]
    fn test_strict_overflow_fails_unpack() {
        let schema = Schema::builder(SchemaOptions::default())
            .uint64("id")
            .build()
            .unwrap();
        let data = (1u64 << 53).to_be_bytes();

        assert_eq!(
            schema.unpack(&data),
            Err(ReadError::Overflow("id".to_string()))
        );
    }

    fn sized_by_u64() -> Schema {
        Schema::builder(SchemaOptions::default().int64_mode(Int64Mode::Int64))
            .uint64("len")
            .bytes("data", "len")
            .uint8("tail")
            .build()
            .unwrap()
    }

    #[test]
    fn test_huge_length_is_rejected() {
        let schema = sized_by_u64();
        assert_eq!(
            schema.unpack(&[0xff; 16]),
            Err(ReadError::InvalidSize("len".to_string()))
        );
        assert_eq!(
            schema.pack(&DecodedRecord::new().with("len", u64::MAX)),
            Err(WriteError::InvalidSize("len".to_string()))
        );

        let mut data = [0u8; 16];
        data[..8].copy_from_slice(&(1u64 << 40).to_be_bytes());
        assert_eq!(
            schema.unpack(&data),
            Err(ReadError::BufferTooShort {
                needed: (1 << 40) + 9,
                len: 16
            })
        );
    }

    #[test]
    fn test_block_checked_against_length_before_allocating() {
        let schema = sized_by_u64();
        let record = DecodedRecord::new().with("len", 1u64 << 40).with("data", &[1u8, 2]);
        assert_eq!(
            schema.pack(&record),
            Err(WriteError::SizeMismatch {
                field: "data".to_string(),
                expected: 1 << 40,
                actual: 2
            })
        );
    }

    #[test]
    fn test_offset_overflow() {
        let schema = header();
        assert_eq!(
            schema.unpack_at(&[0u8; 12], Placement::at(usize::MAX)),
            Err(ReadError::OutOfBounds {
                offset: usize::MAX,
                size: 12,
                len: 12
            })
        );
        assert_eq!(
            schema.pack_at(&DecodedRecord::new(), Placement::at(usize::MAX - 4)),
            Err(WriteError::RecordTooLarge {
                offset: usize::MAX - 4,
                size: 12
            })
        );
        assert_eq!(
            schema.pack_into(&DecodedRecord::new(), &mut [0u8; 12], Placement::at(usize::MAX)),
            Err(WriteError::OutOfBounds {
                offset: usize::MAX,
                size: 12,
                len: 12
            })
        );
    }

    #[derive(Debug, PartialEq)]
    struct Header {
        version: u8,
        delta: i16,
    }

    impl FromRecord for Header {
        fn from_record(record: DecodedRecord<'_>) -> Result<Self, ReadError> {
            Ok(Header {
                version: record.u64("version")? as u8,
                delta: record.i64("delta")? as i16,
            })
        }
    }

    #[test]
    fn test_unpack_as() {
        let schema = header();
        let data = schema
            .pack(&DecodedRecord::new().with("version", 4u8).with("delta", -7i16))
            .unwrap();

        assert_eq!(
            schema.unpack_as::<Header>(&data),
            Ok(Header {
                version: 4,
                delta: -7
            })
        );
    }
}
