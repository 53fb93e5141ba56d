//! Ordered field table with offset bookkeeping.

use crate::field::FieldSpec;

/// Fields of a schema in declaration order.
///
/// Each new field is placed at the running size; the running size then
/// grows by the field's width, so consecutive fields never overlap or leave gaps.
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    fields: Vec<FieldSpec>,
    size: usize,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `spec`, or re-registers it if a field with the same name exists.
    ///
    /// Re-registration keeps the existing entry's position and offset and only
    /// replaces its type, size and codec; later fields and the running size
    /// move by the size difference. Returns the field's index, or `None` if
    /// the running size would overflow; the registry is unchanged then.
    pub fn register(&mut self, mut spec: FieldSpec) -> Option<usize> {
        let existing = spec.name.as_named().and_then(|name| self.position(name));

        if let Some(index) = existing {
            let (old, new) = (self.fields[index].size, spec.size);
            // Later offsets never exceed the running size.
            let size = (self.size - old).checked_add(new)?;

            let field = &mut self.fields[index];
            field.ty = spec.ty;
            field.size = spec.size;
            field.codec = spec.codec;

            for later in &mut self.fields[index + 1..] {
                later.offset = later.offset - old + new;
            }
            self.size = size;

            return Some(index);
        }

        let size = self.size.checked_add(spec.size)?;
        spec.offset = self.size;
        self.size = size;
        self.fields.push(spec);

        Some(self.fields.len() - 1)
    }

    /// Index of the named field.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|field| field.name.as_named() == Some(name))
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.position(name).map(|index| &self.fields[index])
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldSpec> {
        self.fields.iter()
    }

    /// Running size: sum of all field widths.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        codec::Codec,
        field::{FieldName, FieldType},
        options::{Endian, Int64Mode},
    };

    use super::*;

    fn spec(name: FieldName, ty: FieldType) -> FieldSpec {
        FieldSpec {
            name,
            ty,
            size: ty.size(),
            offset: 0,
            endian: Endian::Big,
            codec: Codec::for_type(ty, Int64Mode::Strict),
            default: None,
            size_ref: None,
        }
    }

    fn named(name: &str, ty: FieldType) -> FieldSpec {
        spec(FieldName::Named(name.to_string()), ty)
    }

    #[test]
    fn test_register_sequential_offsets() {
        let mut registry = FieldRegistry::new();
        registry.register(named("a", FieldType::UInt(1)));
        registry.register(named("b", FieldType::UInt(4)));
        registry.register(spec(FieldName::Filler(2), FieldType::UInt(2)));
        registry.register(named("c", FieldType::Bytes(3)));

        let offsets: Vec<usize> = registry.iter().map(|f| f.offset).collect();
        assert_eq!(offsets, vec![0, 1, 5, 7]);
        assert_eq!(registry.size(), 10);
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_reregister_keeps_offset_and_shifts_followers() {
        let mut registry = FieldRegistry::new();
        registry.register(named("len", FieldType::UInt(2)));
        registry.register(named("name", FieldType::Text(0)));
        registry.register(named("crc", FieldType::UInt(4)));
        assert_eq!(registry.get("crc").unwrap().offset, 2);

        let index = registry.register(named("name", FieldType::Text(5)));

        assert_eq!(index, Some(1));
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get("name").unwrap().offset, 2);
        assert_eq!(registry.get("name").unwrap().size, 5);
        assert_eq!(registry.get("crc").unwrap().offset, 7);
        assert_eq!(registry.size(), 11);

        registry.register(named("name", FieldType::Text(1)));
        assert_eq!(registry.get("crc").unwrap().offset, 3);
        assert_eq!(registry.size(), 7);
    }

    #[test]
    fn test_fillers_are_never_reregistered() {
        let mut registry = FieldRegistry::new();
        registry.register(spec(FieldName::Filler(0), FieldType::UInt(1)));
        registry.register(spec(FieldName::Filler(1), FieldType::UInt(1)));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.size(), 2);
        assert_eq!(registry.position("#0"), None);
    }

    #[test]
    fn test_register_rejects_overflow() {
        let mut registry = FieldRegistry::new();
        registry.register(named("len", FieldType::UInt(8)));
        registry.register(named("data", FieldType::Bytes(0)));
        registry.register(named("crc", FieldType::UInt(4)));

        assert_eq!(registry.register(named("data", FieldType::Bytes(usize::MAX))), None);
        assert_eq!(registry.get("data").unwrap().size, 0);
        assert_eq!(registry.get("crc").unwrap().offset, 8);
        assert_eq!(registry.size(), 12);

        assert_eq!(registry.register(named("tail", FieldType::Bytes(usize::MAX - 4))), None);
        assert_eq!(registry.len(), 3);
    }
}
