//! RPM packages
//!
//! A package is a fixed 96-byte lead, a signature header, padding to eight bytes, the main
//! header, and the compressed payload. Both headers share one layout: an index of
//! `(tag, type, offset, count)` entries followed by a data store the offsets point into.
//! Entry values are decoded on first access and kept per entry.

pub mod enums;

use crate::error::{slice_at, Result, StructerError};
use crate::schema::{
    strings, ByteOrder, EnumDomain, Field, FieldElement, IntKind, Params, Record, Schema,
    StructArray, Value, WordSize,
};
use once_cell::unsync::OnceCell;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

const PARAMS: Params = Params {
    byte_order: ByteOrder::Big,
    word_size: WordSize::Bits32,
};

catalog! {
    pub fn lead_schema() -> Schema {
        Schema::builder("Lead")
            .params(PARAMS)
            .field("magic", Field::constant(enums::lead_magic()?))
            .fields(&["major", "minor"], Field::u8())
            .field("type", Field::enumerated(enums::package_type()?))
            .field("arch", Field::u16())
            .field("name", Field::cstring(66))
            .field("osnum", Field::enumerated(enums::os_num()?))
            .field("sig", Field::enumerated(enums::sig_type()?))
            .field("pad", Field::nulls(16))
            .build()
    }
}

catalog! {
    pub fn header_schema() -> Schema {
        Schema::builder("Header")
            .params(PARAMS)
            .field("magic", Field::constant(enums::header_magic()?))
            .field("version", Field::constant(enums::header_version()?))
            .field("reserved", Field::nulls(4))
            .fields(&["nindex", "hsize"], Field::u32())
            .field("entries", Field::payload_from("nindex", 16))
            .field("store", Field::payload_from("hsize", 1))
            .build()
    }
}

catalog! {
    pub fn entry_schema() -> Schema {
        Schema::builder("Entry")
            .params(PARAMS)
            .field("tag", Field::u32())
            .field("type", Field::enumerated(enums::tag_type()?))
            .fields(&["offset", "count"], Field::u32())
            .build()
    }
}

/// A decoded header entry.
#[derive(Debug, Clone)]
pub enum TagValue<'a> {
    Ints(StructArray<'a, FieldElement>),
    String(Cow<'a, str>),
    Binary(&'a [u8]),
    StringArray(Vec<Cow<'a, str>>),
}

impl<'a> TagValue<'a> {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TagValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// First integer of an integer array.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            TagValue::Ints(array) => array.get(0).ok().and_then(|v| v.as_u64()),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&'a [u8]> {
        match self {
            TagValue::Binary(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_strings(&self) -> Option<&[Cow<'a, str>]> {
        match self {
            TagValue::StringArray(s) => Some(s),
            _ => None,
        }
    }
}

/// The signature header or the main header of a package.
pub struct RpmHeader<'a> {
    record: Record<'a>,
    tags: Arc<EnumDomain>,
    entries: StructArray<'a, Schema>,
    store: &'a [u8],
    by_tag: OnceCell<HashMap<u64, usize>>,
    values: Vec<OnceCell<TagValue<'a>>>,
}

impl<'a> RpmHeader<'a> {
    /// Decode a header at `offset`, resolving tag names through `tags`.
    pub fn decode_at(buf: &'a [u8], offset: usize, tags: &Arc<EnumDomain>) -> Result<Self> {
        let record = header_schema()?.decode_at(buf, offset)?;
        let entries = StructArray::new(entry_schema()?.clone(), record.bytes("entries")?)?;
        let store = record.bytes("store")?;
        debug!(
            tags = tags.name(),
            entries = entries.len(),
            store = store.len(),
            "Decoded RPM header"
        );
        Ok(Self {
            values: (0..entries.len()).map(|_| OnceCell::new()).collect(),
            record,
            tags: Arc::clone(tags),
            entries,
            store,
            by_tag: OnceCell::new(),
        })
    }

    /// Bytes the header occupies.
    pub fn size(&self) -> usize {
        self.record.len()
    }

    pub fn entries(&self) -> &StructArray<'a, Schema> {
        &self.entries
    }

    fn index(&self) -> Result<&HashMap<u64, usize>> {
        self.by_tag.get_or_try_init(|| {
            let mut index = HashMap::with_capacity(self.entries.len());
            for (i, entry) in self.entries.iter().enumerate() {
                index.entry(entry?.u64("tag")?).or_insert(i);
            }
            Ok(index)
        })
    }

    /// True when the header carries tag `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.tags
            .by_name(name)
            .ok()
            .and_then(|tag| tag.value())
            .zip(self.index().ok())
            .is_some_and(|(tag, index)| index.contains_key(&tag))
    }

    /// Value of tag `name`, decoded on first access.
    pub fn get(&self, name: &str) -> Result<&TagValue<'a>> {
        let tag = self.tags.by_name(name)?.value().unwrap_or_default();
        let i = *self
            .index()?
            .get(&tag)
            .ok_or_else(|| StructerError::UnknownField {
                schema: self.tags.name().to_string(),
                field: name.to_string(),
            })?;
        self.values[i].get_or_try_init(|| self.decode_entry(name, i))
    }

    /// Text of a string tag.
    pub fn string(&self, name: &str) -> Result<&str> {
        let value = self.get(name)?;
        value
            .as_str()
            .ok_or_else(|| StructerError::violation(name, "string", format!("{:?}", value)))
    }

    fn decode_entry(&self, name: &str, i: usize) -> Result<TagValue<'a>> {
        let entry = self.entries.get(i as isize)?;
        let kind = entry.symbol("type")?;
        let offset = entry.u64("offset")? as usize;
        let count = entry.u64("count")? as usize;
        let rest = self
            .store
            .get(offset..)
            .ok_or_else(|| StructerError::truncated(offset, 1, self.store.len()))?;

        let int = |kind: IntKind| -> Result<TagValue<'a>> {
            let element = FieldElement::new(name, Field::int(kind), PARAMS);
            let width = kind.width(PARAMS);
            let region = slice_at(rest, 0, count.saturating_mul(width))?;
            Ok(TagValue::Ints(StructArray::new(element, region)?))
        };
        let string = |rest: &'a [u8]| -> Result<Cow<'a, str>> {
            match strings(rest).get(0)? {
                Value::Text(text) => Ok(text),
                other => Ok(Cow::Owned(other.to_string())),
            }
        };

        match kind.name() {
            "char" | "int8" => int(IntKind::U8),
            "int16" => int(IntKind::U16),
            "int32" => int(IntKind::U32),
            "int64" => int(IntKind::U64),
            "string" if count != 1 => Err(StructerError::violation(
                name,
                "string count 1",
                count.to_string(),
            )),
            // Only the default locale of an i18n string is decoded.
            "string" | "i18n" => string(rest).map(TagValue::String),
            "binary" => Ok(TagValue::Binary(slice_at(rest, 0, count)?)),
            "stringarray" => {
                let mut values = Vec::with_capacity(count);
                for value in strings(rest).into_iter().take(count) {
                    values.push(match value? {
                        Value::Text(text) => text,
                        other => Cow::Owned(other.to_string()),
                    });
                }
                if values.len() < count {
                    return Err(StructerError::truncated(offset, count, self.store.len()));
                }
                Ok(TagValue::StringArray(values))
            }
            other => Err(StructerError::violation(name, "value type", other)),
        }
    }
}

/// An RPM package over a borrowed buffer.
pub struct Rpm<'a> {
    lead: Record<'a>,
    signature: RpmHeader<'a>,
    header: RpmHeader<'a>,
    payload: &'a [u8],
}

impl<'a> Rpm<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let lead = lead_schema()?.decode(data)?;
        let mut offset = lead.len();

        let signature = RpmHeader::decode_at(data, offset, enums::signature_tag()?)?;
        offset += signature.size();

        let no_fields = |_: &str| -> Option<u64> { None };
        let (_, pad) = Field::pad(8).decode_at("SignaturePad", data, offset, PARAMS, &no_fields)?;
        offset += pad;

        let header = RpmHeader::decode_at(data, offset, enums::header_tag()?)?;
        offset += header.size();

        debug!(
            name = %lead.value("name")?,
            payload_offset = offset,
            payload_size = data.len() - offset,
            "Parsed RPM"
        );

        Ok(Self {
            lead,
            signature,
            header,
            payload: &data[offset..],
        })
    }

    pub fn lead(&self) -> &Record<'a> {
        &self.lead
    }

    pub fn signature(&self) -> &RpmHeader<'a> {
        &self.signature
    }

    pub fn header(&self) -> &RpmHeader<'a> {
        &self.header
    }

    /// `name-version-release`.
    pub fn nevr(&self) -> Result<String> {
        Ok(format!(
            "{}-{}-{}",
            self.header.string("name")?,
            self.header.string("version")?,
            self.header.string("release")?
        ))
    }

    /// Archive format of the payload, e.g. `cpio`.
    pub fn payload_format(&self) -> Result<&str> {
        self.header.string("payloadformat")
    }

    /// Compressor of the payload, e.g. `xz` or `gzip`.
    pub fn payload_compressor(&self) -> Result<&str> {
        self.header.string("payloadcompressor")
    }

    /// The compressed payload, left as stored.
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }
}
