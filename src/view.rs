//! Live, field-at-a-time access to a record stored in a caller-owned buffer.

use crate::{
    accessor::Accessor,
    errors::{CheckError, ReadError, WriteError},
    schema::{Layout, Schema},
    value::Value,
};

/// A [Schema] bound to one buffer.
///
/// The view owns no record data: every `get` decodes from the buffer and
/// every `set` encodes into it. `B` is anything that derefs to bytes, e.g.
/// `&[u8]`, `&mut [u8]` or `Vec<u8>`; writing requires `AsMut<[u8]>`.
///
/// ```
/// use structcraft::options::SchemaOptions;
/// use structcraft::schema::Schema;
/// use structcraft::view::RecordView;
/// use structcraft::value::Value;
///
/// let schema = Schema::builder(SchemaOptions::default())
///     .uint8("kind")
///     .uint16le("count")
///     .build()
///     .unwrap();
///
/// let mut buf = [0u8; 3];
/// let mut view = RecordView::new(&schema, &mut buf[..]).unwrap();
/// view.set("count", &Value::UInt(513)).unwrap();
/// assert_eq!(view.get("count").unwrap(), Value::UInt(513));
/// assert_eq!(buf, [0, 1, 2]);
/// ```
#[derive(Debug)]
pub struct RecordView<'s, B> {
    schema: &'s Schema,
    layout: Layout<'s>,
    data: B,
    base: usize,
    checked: bool,
}

impl<'s, B: AsRef<[u8]>> RecordView<'s, B> {
    /// Views the record at the start of `data`.
    pub fn new(schema: &'s Schema, data: B) -> Result<Self, ReadError> {
        Self::at(schema, data, 0)
    }

    /// Views the record starting at `offset` in `data`.
    ///
    /// For a variable-length schema the layout is resolved from the size field
    /// currently stored in the buffer.
    pub fn at(schema: &'s Schema, data: B, offset: usize) -> Result<Self, ReadError> {
        let checked = schema.options().bounds_check;
        let layout = schema.layout_in(data.as_ref(), offset, checked)?;

        Ok(Self {
            schema,
            layout,
            data,
            base: offset,
            checked,
        })
    }

    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    /// Field placement currently in effect for this buffer.
    pub fn layout(&self) -> &Layout<'s> {
        &self.layout
    }

    pub fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    pub fn into_inner(self) -> B {
        self.data
    }

    /// Accessor for the named field, bound to this view's offset.
    pub fn accessor(&self, name: &str) -> Option<Accessor<'_>> {
        self.layout.accessor(name, self.base, self.checked)
    }

    pub fn get(&self, name: &str) -> Result<Value<'_>, ReadError> {
        let accessor = self
            .accessor(name)
            .ok_or_else(|| ReadError::UnknownField(name.to_string()))?;
        accessor.get(self.data.as_ref())
    }

    /// The named field's undecoded bytes.
    pub fn raw(&self, name: &str) -> Result<&[u8], ReadError> {
        let accessor = self
            .accessor(name)
            .ok_or_else(|| ReadError::UnknownField(name.to_string()))?;
        accessor.raw(self.data.as_ref())
    }

    /// Fails on the first field that does not hold its declared default.
    pub fn check_values(&self) -> Result<(), CheckError> {
        for accessor in self.layout.accessors(self.base, self.checked) {
            accessor.check_default(self.data.as_ref())?;
        }
        Ok(())
    }
}

impl<'s, B: AsRef<[u8]> + AsMut<[u8]>> RecordView<'s, B> {
    pub fn data_mut(&mut self) -> &mut [u8] {
        self.data.as_mut()
    }

    /// Encodes `value` into the named field.
    ///
    /// Writing the size field of a variable-length schema re-resolves the layout.
    pub fn set(&mut self, name: &str, value: &Value<'_>) -> Result<(), WriteError> {
        let index = self
            .layout
            .fields()
            .iter()
            .position(|spec| spec.name.as_named() == Some(name))
            .ok_or_else(|| WriteError::UnknownField(name.to_string()))?;

        self.set_at(index, value)
    }

    /// Stamps every declared default into the buffer.
    pub fn write_values(&mut self) -> Result<(), WriteError> {
        for index in 0..self.layout.fields().len() {
            if let Some(default) = self.layout.fields()[index].default.clone() {
                self.set_at(index, &default)?;
            }
        }
        Ok(())
    }

    fn set_at(&mut self, index: usize, value: &Value<'_>) -> Result<(), WriteError> {
        let spec = &self.layout.fields()[index];
        Accessor::new(spec, self.base, self.checked).set(self.data.as_mut(), value)?;

        if self.is_size_source(index) {
            let field = self.layout.fields()[index].name.to_string();
            let layout = self
                .schema
                .layout_in(self.data.as_ref(), self.base, self.checked);
            self.layout = layout.map_err(|_| WriteError::InvalidSize(field))?;
        }

        Ok(())
    }

    fn is_size_source(&self, index: usize) -> bool {
        let name = self.layout.fields()[index].name.as_named();
        let size_ref = self
            .schema
            .deferred_field()
            .and_then(|spec| spec.size_ref.as_deref());
        name.is_some() && name == size_ref
    }
}
