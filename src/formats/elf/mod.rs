//! ELF (Executable and Linkable Format) images and core dumps
//!
//! [`Elf`] decodes the identification block to learn the image's byte order and word size,
//! binds every layout in [`headers`] to those parameters, and then exposes program headers,
//! notes and the virtual address space lazily. [`Core`] adds what only a crash dump has:
//! file mappings, embedded images and the dynamic linker's object chain.

pub mod core;
pub mod enums;
pub mod headers;
pub mod notes;
pub mod segments;

pub use self::core::{Core, FileMapping, LinkMapEntry, LinkMapIter, LoadedObject};
pub use headers::{ElfSchemas, ProgramHeaderKind};
pub use notes::{AuxVector, Note};
pub use segments::{Segment, SegmentFlags};

use crate::config::WalkLimits;
use crate::error::{slice_at, Result, StructerError};
use crate::intervals::{IntervalIndex, Span};
use crate::schema::{ByteOrder, Params, Record, Schema, StructArray, Symbol, VarArray, WordSize};
use once_cell::unsync::OnceCell;
use tracing::{debug, warn};

/// `e_phnum` value announcing that the real count lives in section header 0.
const PN_XNUM: u64 = 0xffff;

pub(crate) fn to_usize(value: u64, offset: usize, len: usize) -> Result<usize> {
    usize::try_from(value).map_err(|_| StructerError::truncated(offset, usize::MAX, len))
}

/// A parsed ELF image over a borrowed buffer.
pub struct Elf<'a> {
    data: &'a [u8],
    schemas: ElfSchemas,
    header: Record<'a>,
    limits: WalkLimits,
    segments: OnceCell<Vec<Segment>>,
    index: OnceCell<IntervalIndex>,
    auxv: OnceCell<Option<AuxVector>>,
}

impl<'a> Elf<'a> {
    /// Parse with default walk limits.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        Self::with_limits(data, WalkLimits::default())
    }

    pub fn with_limits(data: &'a [u8], limits: WalkLimits) -> Result<Self> {
        let ident = headers::ident()?.decode(data)?;
        let word_size = if ident.symbol("wordsize")?.is("Bits32") {
            WordSize::Bits32
        } else {
            WordSize::Bits64
        };
        let byte_order = if ident.symbol("byteorder")?.is("Lsb") {
            ByteOrder::Little
        } else {
            ByteOrder::Big
        };
        let params = Params::new(byte_order, word_size);

        let header = headers::header(params)?.decode(data)?;
        let machine = header.symbol("machine")?.name().to_string();
        let schemas = ElfSchemas::new(params, &machine)?;

        debug!(
            machine = %machine,
            file_type = %header.value("type")?,
            word_size = word_size.bytes() * 8,
            "Parsed ELF header"
        );

        Ok(Self {
            data,
            schemas,
            header,
            limits,
            segments: OnceCell::new(),
            index: OnceCell::new(),
            auxv: OnceCell::new(),
        })
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn params(&self) -> Params {
        self.schemas.params
    }

    pub fn header(&self) -> &Record<'a> {
        &self.header
    }

    pub fn schemas(&self) -> &ElfSchemas {
        &self.schemas
    }

    pub fn limits(&self) -> &WalkLimits {
        &self.limits
    }

    pub fn file_type(&self) -> Result<&Symbol> {
        self.header.symbol("type")
    }

    pub fn machine(&self) -> Result<&Symbol> {
        self.header.symbol("machine")
    }

    pub fn is_core(&self) -> bool {
        self.file_type().is_ok_and(|t| t.is("Core"))
    }

    /// Section headers as a lazy array. Empty when the image has none.
    pub fn sections(&self) -> Result<StructArray<'a, Schema>> {
        let count = self.header.u64("shnum")?;
        self.table(&self.schemas.shdr, "shoff", "shentsize", count)
    }

    fn segment_count(&self) -> Result<u64> {
        let count = self.header.u64("phnum")?;
        if count != PN_XNUM {
            return Ok(count);
        }
        let first = self.table(&self.schemas.shdr, "shoff", "shentsize", 1)?.get(0)?;
        first.u64("info")
    }

    /// Program headers as a lazy array.
    pub fn program_headers(&self) -> Result<StructArray<'a, Schema>> {
        let count = self.segment_count()?;
        self.table(&self.schemas.phdr, "phoff", "phentsize", count)
    }

    fn table(
        &self,
        schema: &Schema,
        offset: &str,
        entry_size: &str,
        count: u64,
    ) -> Result<StructArray<'a, Schema>> {
        if count == 0 {
            return StructArray::new(schema.clone(), &self.data[..0]);
        }
        let width = self.header.u64(entry_size)?;
        if Some(width) != schema.fixed_width().map(|w| w as u64) {
            return Err(StructerError::violation(
                format!("Header.{}", entry_size),
                format!("{:?}", schema.fixed_width()),
                width.to_string(),
            ));
        }
        let len = self.data.len();
        let start = to_usize(self.header.u64(offset)?, 0, len)?;
        let size = to_usize(count.saturating_mul(width), start, len)?;
        StructArray::new(schema.clone(), slice_at(self.data, start, size)?)
    }

    /// Every program header, decoded once.
    pub fn segments(&self) -> Result<&[Segment]> {
        self.segments
            .get_or_try_init(|| {
                self.program_headers()?
                    .iter()
                    .map(|record| Segment::from_record(&record?))
                    .collect()
            })
            .map(Vec::as_slice)
    }

    /// Address index over the file-backed part of every loadable segment.
    pub fn address_index(&self) -> Result<&IntervalIndex> {
        self.index.get_or_try_init(|| {
            let spans = self
                .segments()?
                .iter()
                .filter(|s| s.is("Load"))
                .map(|s| Span::new(s.vaddr, s.offset, s.filesz));
            IntervalIndex::new(spans)
        })
    }

    /// Bytes at virtual `address`. A `size` of zero, or one running past the mapped run,
    /// yields everything up to the end of the run.
    pub fn fetch(&self, address: u64, size: u64) -> Result<&'a [u8]> {
        let span = self.address_index()?.get(address)?;
        let size = if size == 0 || size > span.length {
            span.length
        } else {
            size
        };
        let len = self.data.len();
        let start = to_usize(span.start, 0, len)?;
        slice_at(self.data, start, to_usize(size, start, len)?)
    }

    /// Notes of every note segment, in file order.
    pub fn notes(&self) -> Result<impl Iterator<Item = Result<Note<'a>>> + '_> {
        let len = self.data.len();
        let mut regions = Vec::new();
        for segment in self.segments()?.iter().filter(|s| s.is("Note")) {
            let start = to_usize(segment.offset, 0, len)?;
            regions.push(slice_at(self.data, start, to_usize(segment.filesz, start, len)?)?);
        }

        let max = self.limits.max_notes;
        let schema = self.schemas.note.clone();
        Ok(regions
            .into_iter()
            .flat_map(move |region| VarArray::new(schema.clone(), region))
            .take(max.saturating_add(1))
            .enumerate()
            .map(move |(i, note)| {
                if i == max {
                    warn!(limit = max, "Note walk limit reached");
                    return Err(StructerError::violation(
                        "Note",
                        format!("at most {} notes", max),
                        "more",
                    ));
                }
                note.map(Note::new)
            }))
    }

    /// First note from `owner` whose type is `kind`.
    pub fn note(&self, owner: &str, kind: &str) -> Result<Option<Note<'a>>> {
        for note in self.notes()? {
            let note = note?;
            if note.matches(owner, kind) {
                return Ok(Some(note));
            }
        }
        Ok(None)
    }

    /// Descriptor of the GNU build-id note.
    pub fn build_id(&self) -> Result<Option<&'a [u8]>> {
        Ok(self.note("GNU", "BuildId")?.map(|note| note.desc()))
    }

    /// Auxiliary vector from the core's `Auxv` note.
    pub fn auxv(&self) -> Result<Option<&AuxVector>> {
        self.auxv
            .get_or_try_init(|| match self.note("CORE", "Auxv")? {
                Some(note) => AuxVector::parse(note.desc(), &self.schemas.auxv).map(Some),
                None => Ok(None),
            })
            .map(Option::as_ref)
    }
}
