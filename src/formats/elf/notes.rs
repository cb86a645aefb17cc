//! Note and auxiliary vector views

use crate::error::Result;
use crate::formats::elf::enums;
use crate::schema::{Record, Schema, StructArray, Symbol};

/// A decoded note: owner name, type code and descriptor bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Note<'a> {
    record: Record<'a>,
}

impl<'a> Note<'a> {
    pub(crate) fn new(record: Record<'a>) -> Self {
        Self { record }
    }

    pub fn owner(&self) -> &str {
        self.record.text("name").unwrap_or_default()
    }

    pub fn raw_type(&self) -> u64 {
        self.record.u64("type").unwrap_or_default()
    }

    /// Type resolved through the catalog registered for the owner.
    pub fn kind(&self) -> Result<Symbol> {
        enums::note_type()?
            .for_context(self.owner())
            .resolve(self.raw_type())
    }

    pub fn desc(&self) -> &'a [u8] {
        self.record.bytes("desc").unwrap_or_default()
    }

    /// True when this note is `kind` as named by `owner`'s catalog.
    pub fn matches(&self, owner: &str, kind: &str) -> bool {
        self.owner() == owner && self.kind().is_ok_and(|k| k.is(kind))
    }

    pub fn record(&self) -> &Record<'a> {
        &self.record
    }
}

/// The process auxiliary vector, in entry order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuxVector {
    entries: Vec<(Symbol, u64)>,
}

impl AuxVector {
    pub(crate) fn parse(desc: &[u8], schema: &Schema) -> Result<Self> {
        let array = StructArray::new(schema.clone(), desc)?;
        let mut entries = Vec::with_capacity(array.len());
        for record in array.iter() {
            let record = record?;
            let kind = record.symbol("type")?.clone();
            if kind.is("Null") {
                break;
            }
            entries.push((kind, record.u64("val")?));
        }
        Ok(Self { entries })
    }

    /// Value of the first entry named `kind`.
    pub fn get(&self, kind: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|(k, _)| k.is(kind))
            .map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, u64)> {
        self.entries.iter().map(|(k, v)| (k, *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::elf::headers::ElfSchemas;
    use crate::schema::{ByteOrder, Params, WordSize};

    fn schemas() -> ElfSchemas {
        ElfSchemas::new(Params::new(ByteOrder::Little, WordSize::Bits64), "X86_64").unwrap()
    }

    fn note_bytes(owner: &[u8], kind: u32, desc: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&(owner.len() as u32 + 1).to_le_bytes());
        data.extend_from_slice(&(desc.len() as u32).to_le_bytes());
        data.extend_from_slice(&kind.to_le_bytes());
        data.extend_from_slice(owner);
        data.push(0);
        while data.len() % 4 != 0 {
            data.push(0);
        }
        data.extend_from_slice(desc);
        while data.len() % 4 != 0 {
            data.push(0);
        }
        data
    }

    #[test]
    fn test_note_kind_by_owner() {
        let data = note_bytes(b"GNU", 3, &[1, 2, 3, 4, 5]);
        let note = Note::new(schemas().note.decode(&data).unwrap());
        assert_eq!(note.owner(), "GNU");
        assert_eq!(note.kind().unwrap().name(), "BuildId");
        assert!(note.matches("GNU", "BuildId"));
        assert!(!note.matches("CORE", "BuildId"));
        assert_eq!(note.desc(), &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_unknown_owner_type_fails() {
        let data = note_bytes(b"Go", 4, b"abcd");
        let note = Note::new(schemas().note.decode(&data).unwrap());
        assert!(note.kind().is_err());
        assert_eq!(note.raw_type(), 4);
    }

    #[test]
    fn test_auxv_stops_at_null() {
        let mut desc = Vec::new();
        for v in [3u64, 0x400040, 4, 56, 5, 9, 0, 0, 3, 0xdead] {
            desc.extend_from_slice(&v.to_le_bytes());
        }
        let auxv = AuxVector::parse(&desc, &schemas().auxv).unwrap();
        assert_eq!(auxv.len(), 3);
        assert_eq!(auxv.get("Phdr"), Some(0x400040));
        assert_eq!(auxv.get("PhNum"), Some(9));
        assert_eq!(auxv.get("Entry"), None);
    }
}
