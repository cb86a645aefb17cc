//! Schemas and the records they decode.
//!
//! A [`Schema`] is an ordered list of named [`Field`]s bound to decoding [`Params`]. When
//! every field has a width known up front the schema is *fixed*: its records are decoded from
//! one bounds-checked slice. Otherwise the schema is *variable*: fields are decoded in order,
//! each starting where the previous one stopped, and the record remembers how many bytes it
//! consumed.
//!
//! The name → position table is built once per schema and shared by every record it decodes.

use crate::error::{slice_at, Result, StructerError};
use crate::schema::enums::Symbol;
use crate::schema::field::{Field, Value};
use crate::schema::params::Params;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
struct Layout {
    schema: String,
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Layout {
    fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }
}

#[derive(Debug)]
struct SchemaInner {
    params: Params,
    fields: Vec<Field>,
    layout: Arc<Layout>,
    width: Option<usize>,
}

/// An immutable, cheaply clonable record layout.
#[derive(Debug, Clone)]
pub struct Schema(Arc<SchemaInner>);

/// Collects fields in declaration order.
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    name: String,
    params: Params,
    fields: Vec<(String, Field)>,
}

impl SchemaBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            params: Params::NATIVE,
            fields: Vec::new(),
        }
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn field(mut self, name: &str, field: Field) -> Self {
        self.fields.push((name.to_string(), field));
        self
    }

    /// Several consecutive fields sharing one descriptor.
    pub fn fields(mut self, names: &[&str], field: Field) -> Self {
        for name in names {
            self.fields.push((name.to_string(), field.clone()));
        }
        self
    }

    /// Append every field of `schema`, in order.
    pub fn inherit(mut self, schema: &Schema) -> Self {
        let names = schema.0.layout.names.iter();
        for (name, field) in names.zip(schema.0.fields.iter()) {
            self.fields.push((name.clone(), field.clone()));
        }
        self
    }

    pub fn build(self) -> Result<Schema> {
        let mut names = Vec::with_capacity(self.fields.len());
        let mut index = HashMap::with_capacity(self.fields.len());
        let mut fields = Vec::with_capacity(self.fields.len());

        for (position, (name, field)) in self.fields.into_iter().enumerate() {
            if let Some(source) = field.depends_on() {
                if !index.contains_key(source) {
                    return Err(StructerError::UnknownField {
                        schema: self.name,
                        field: source.to_string(),
                    });
                }
            }
            if index.insert(name.clone(), position).is_some() {
                return Err(StructerError::DuplicateDefinition {
                    scope: self.name,
                    name,
                });
            }
            names.push(name);
            fields.push(field);
        }

        let width = fixed_width(&fields, self.params);
        debug!(schema = %self.name, fields = fields.len(), width = ?width, "Built schema");

        Ok(Schema(Arc::new(SchemaInner {
            params: self.params,
            fields,
            layout: Arc::new(Layout {
                schema: self.name,
                names,
                index,
            }),
            width,
        })))
    }
}

fn fixed_width(fields: &[Field], params: Params) -> Option<usize> {
    fields.iter().map(|f| f.fixed_width(params)).sum()
}

impl Schema {
    pub fn builder(name: &str) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.0.layout.schema
    }

    pub fn params(&self) -> Params {
        self.0.params
    }

    /// Total width for fixed schemas; `None` when any field is data dependent.
    pub fn fixed_width(&self) -> Option<usize> {
        self.0.width
    }

    pub fn is_fixed(&self) -> bool {
        self.0.width.is_some()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.0.layout.names.iter().map(String::as_str)
    }

    /// The same fields under different parameters. Records of both share one layout.
    pub fn with_params(&self, params: Params) -> Schema {
        if params == self.0.params {
            return self.clone();
        }
        Schema(Arc::new(SchemaInner {
            params,
            fields: self.0.fields.clone(),
            layout: Arc::clone(&self.0.layout),
            width: fixed_width(&self.0.fields, params),
        }))
    }

    /// Decode a record at the start of `buf`.
    pub fn decode<'a>(&self, buf: &'a [u8]) -> Result<Record<'a>> {
        self.decode_at(buf, 0)
    }

    /// Decode a record at `offset` within `buf`.
    pub fn decode_at<'a>(&self, buf: &'a [u8], offset: usize) -> Result<Record<'a>> {
        let inner = &self.0;
        let result = match inner.width {
            Some(width) => self.decode_fixed(buf, offset, width),
            None => self.decode_variable(buf, offset),
        };
        result.map_err(|e| e.within(&inner.layout.schema))
    }

    fn decode_fixed<'a>(&self, buf: &'a [u8], offset: usize, width: usize) -> Result<Record<'a>> {
        let inner = &self.0;
        let bytes = slice_at(buf, offset, width)?;
        let mut values = Vec::with_capacity(inner.fields.len());
        let mut cursor = 0;
        for (name, field) in inner.layout.names.iter().zip(&inner.fields) {
            let len = field.fixed_width(inner.params).unwrap_or_default();
            values.push(field.decode_fixed(name, &bytes[cursor..cursor + len], inner.params)?);
            cursor += len;
        }
        Ok(Record {
            layout: Arc::clone(&inner.layout),
            values,
            len: width,
        })
    }

    fn decode_variable<'a>(&self, buf: &'a [u8], offset: usize) -> Result<Record<'a>> {
        let inner = &self.0;
        let layout = &inner.layout;
        let mut values: Vec<Value<'a>> = Vec::with_capacity(inner.fields.len());
        let mut cursor = offset;
        for (name, field) in layout.names.iter().zip(&inner.fields) {
            let (value, len) = {
                let prior = |source: &str| {
                    layout
                        .position(source)
                        .and_then(|i| values.get(i))
                        .and_then(Value::as_u64)
                };
                field.decode_at(name, buf, cursor, inner.params, &prior)?
            };
            values.push(value);
            cursor += len;
        }
        Ok(Record {
            layout: Arc::clone(layout),
            values,
            len: cursor - offset,
        })
    }
}

/// Decoded values of one schema application.
#[derive(Debug, Clone)]
pub struct Record<'a> {
    layout: Arc<Layout>,
    values: Vec<Value<'a>>,
    len: usize,
}

impl<'a> Record<'a> {
    pub fn schema_name(&self) -> &str {
        &self.layout.schema
    }

    pub fn get(&self, name: &str) -> Option<&Value<'a>> {
        self.layout.position(name).map(|i| &self.values[i])
    }

    pub fn value(&self, name: &str) -> Result<&Value<'a>> {
        self.get(name).ok_or_else(|| StructerError::UnknownField {
            schema: self.layout.schema.clone(),
            field: name.to_string(),
        })
    }

    fn kind_error(&self, name: &str, expected: &str, value: &Value<'_>) -> StructerError {
        StructerError::violation(
            format!("{}.{}", self.layout.schema, name),
            expected,
            value.to_string(),
        )
    }

    pub fn u64(&self, name: &str) -> Result<u64> {
        let value = self.value(name)?;
        value
            .as_u64()
            .ok_or_else(|| self.kind_error(name, "unsigned integer", value))
    }

    pub fn i64(&self, name: &str) -> Result<i64> {
        let value = self.value(name)?;
        value
            .as_i64()
            .ok_or_else(|| self.kind_error(name, "signed integer", value))
    }

    /// Byte string or sub-region.
    pub fn bytes(&self, name: &str) -> Result<&'a [u8]> {
        let value = self.value(name)?;
        value
            .as_bytes()
            .ok_or_else(|| self.kind_error(name, "bytes", value))
    }

    pub fn text(&self, name: &str) -> Result<&str> {
        let value = self.value(name)?;
        value
            .as_str()
            .ok_or_else(|| self.kind_error(name, "text", value))
    }

    pub fn symbol(&self, name: &str) -> Result<&Symbol> {
        let value = self.value(name)?;
        value
            .as_symbol()
            .ok_or_else(|| self.kind_error(name, "enumerated value", value))
    }

    pub fn time(&self, name: &str) -> Result<DateTime<Utc>> {
        let value = self.value(name)?;
        value
            .as_time()
            .ok_or_else(|| self.kind_error(name, "timestamp", value))
    }

    /// Bytes consumed from the buffer.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn values(&self) -> &[Value<'a>] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value<'a>)> {
        self.layout
            .names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

impl PartialEq for Record<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len
            && self.values == other.values
            && self.layout.names == other.layout.names
    }
}

impl fmt::Display for Record<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.layout.schema)?;
        let mut first = true;
        for (name, value) in self.iter().filter(|(_, v)| !v.is_null()) {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{}={}", name, value)?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::enums::EnumDomain;
    use crate::schema::params::{ByteOrder, IntKind, WordSize};

    fn ident() -> Schema {
        let class =
            EnumDomain::ints("WordSize", IntKind::U8, &[("bits32", 1), ("bits64", 2)]).unwrap();
        Schema::builder("Ident")
            .field("magic", Field::magic(b"\x7fELF"))
            .field("wordsize", Field::enumerated(&class))
            .fields(&["byteorder", "version", "osabi", "abiversion"], Field::u8())
            .field("padding", Field::nulls(7))
            .build()
            .unwrap()
    }

    #[test]
    fn test_fixed_schema_width_and_decode() {
        let schema = ident();
        assert_eq!(schema.fixed_width(), Some(16));

        let mut data = vec![0u8; 20];
        data[..8].copy_from_slice(b"\x7fELF\x02\x01\x01\x03");
        let record = schema.decode(&data).unwrap();
        assert_eq!(record.len(), 16);
        assert_eq!(record.symbol("wordsize").unwrap().name(), "bits64");
        assert_eq!(record.u64("osabi").unwrap(), 3);
        assert!(record.get("padding").unwrap().is_null());
        assert_eq!(record.schema_name(), "Ident");
    }

    #[test]
    fn test_word_fields_follow_params() {
        let schema = Schema::builder("Span")
            .fields(&["start", "end", "offset"], Field::word())
            .build()
            .unwrap();
        let narrow = schema.with_params(Params::new(ByteOrder::Big, WordSize::Bits32));
        let wide = schema.with_params(Params::new(ByteOrder::Little, WordSize::Bits64));
        assert_eq!(narrow.fixed_width(), Some(12));
        assert_eq!(wide.fixed_width(), Some(24));

        let data = [0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 3];
        let record = narrow.decode(&data).unwrap();
        assert_eq!(record.u64("end").unwrap(), 2);
    }

    #[test]
    fn test_violation_names_schema_and_field() {
        let mut data = vec![0u8; 16];
        data[..4].copy_from_slice(b"\x7fELF");
        data[4] = 2;
        data[12] = 1;
        match ident().decode(&data).unwrap_err() {
            StructerError::SchemaViolation { field, .. } => assert_eq!(field, "Ident.padding"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_truncated_fixed_record() {
        let err = ident().decode(b"\x7fELF\x02").unwrap_err();
        assert!(matches!(err, StructerError::Truncated { needed: 16, .. }));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let err = Schema::builder("Dup")
            .field("a", Field::u8())
            .field("a", Field::u16())
            .build()
            .unwrap_err();
        assert!(matches!(err, StructerError::DuplicateDefinition { .. }));
    }

    #[test]
    fn test_dependency_must_be_declared_first() {
        let err = Schema::builder("Note")
            .field("desc", Field::payload_from("descsz", 1))
            .field("descsz", Field::u32())
            .build()
            .unwrap_err();
        assert!(matches!(err, StructerError::UnknownField { .. }));
    }

    #[test]
    fn test_variable_record_tracks_length() {
        let schema = Schema::builder("Note")
            .params(Params::with_order(ByteOrder::Little))
            .fields(&["namesz", "descsz", "type"], Field::u32())
            .field("name", Field::text_from("namesz"))
            .field("namepad", Field::pad(4))
            .field("desc", Field::payload_from("descsz", 1))
            .field("descpad", Field::pad(4))
            .build()
            .unwrap();
        assert!(!schema.is_fixed());

        let mut data = Vec::new();
        for v in [4u32, 3, 1] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.extend_from_slice(b"GNU\0\xaa\xbb\xcc\0trailing");
        let record = schema.decode(&data).unwrap();
        assert_eq!(record.text("name").unwrap(), "GNU");
        assert_eq!(record.bytes("desc").unwrap(), &[0xaa, 0xbb, 0xcc]);
        assert_eq!(record.len(), 12 + 4 + 4);
    }

    #[test]
    fn test_accessor_kind_mismatch() {
        let schema = Schema::builder("T").field("n", Field::u8()).build().unwrap();
        let record = schema.decode(&[5]).unwrap();
        assert!(record.text("n").is_err());
        assert!(matches!(
            record.u64("missing"),
            Err(StructerError::UnknownField { .. })
        ));
        assert_eq!(record.to_string(), "T(n=5)");
    }

    #[test]
    fn test_records_compare_by_value() {
        let schema = Schema::builder("T").field("n", Field::u8()).build().unwrap();
        let a = schema.decode(&[5]).unwrap();
        let b = schema.decode_at(&[1, 5], 1).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, schema.decode(&[6]).unwrap());
    }
}
