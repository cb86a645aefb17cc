//! ELF crash dumps
//!
//! A core dump is an ELF image whose loadable segments are snapshots of process memory. Besides
//! the generic [`Elf`] view it carries a file note listing which files were mapped where, the
//! auxiliary vector, and (in memory) the dynamic linker's `r_debug` chain of loaded objects.

use crate::config::WalkLimits;
use crate::error::{slice_at, Result, StructerError};
use crate::formats::elf::segments::Segment;
use crate::formats::elf::{to_usize, Elf};
use crate::schema::field::text;
use crate::schema::{strings, Record, StructArray, Value};
use once_cell::unsync::OnceCell;
use std::borrow::Cow;
use std::ops::Deref;
use tracing::{debug, warn};

const ELF_MAGIC: &[u8] = b"\x7fELF";

/// One entry of the file note: `[start, end)` maps `name` from byte `offset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMapping<'a> {
    pub name: Cow<'a, str>,
    pub start: u64,
    pub end: u64,
    pub offset: u64,
}

/// A mapped ELF image found in the dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedObject<'a> {
    pub name: Cow<'a, str>,
    pub address: u64,
    pub build_id: Option<&'a [u8]>,
}

impl LoadedObject<'_> {
    pub fn build_id_hex(&self) -> Option<String> {
        self.build_id.map(hex::encode)
    }
}

/// One node of the dynamic linker's object chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkMapEntry<'a> {
    /// Address of the node itself.
    pub node: u64,
    /// Load bias (`l_addr`).
    pub address: u64,
    pub name: Cow<'a, str>,
    /// Address of the object's dynamic section (`l_ld`).
    pub dynamic: u64,
}

/// An ELF core dump.
pub struct Core<'a> {
    elf: Elf<'a>,
    mappings: OnceCell<Vec<FileMapping<'a>>>,
}

impl<'a> Deref for Core<'a> {
    type Target = Elf<'a>;

    fn deref(&self) -> &Elf<'a> {
        &self.elf
    }
}

impl<'a> Core<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        Self::new(Elf::parse(data)?)
    }

    pub fn with_limits(data: &'a [u8], limits: WalkLimits) -> Result<Self> {
        Self::new(Elf::with_limits(data, limits)?)
    }

    /// Wrap an image whose type is `Core`.
    pub fn new(elf: Elf<'a>) -> Result<Self> {
        let kind = elf.file_type()?;
        if !kind.is("Core") {
            return Err(StructerError::violation("Header.type", "Core", kind.name()));
        }
        Ok(Self {
            elf,
            mappings: OnceCell::new(),
        })
    }

    pub fn elf(&self) -> &Elf<'a> {
        &self.elf
    }

    /// File size implied by the loadable segments.
    pub fn expected_size(&self) -> Result<u64> {
        Ok(self.address_index()?.end())
    }

    /// Fail with [`StructerError::Truncated`] when the dump is shorter than its segments say.
    pub fn check_complete(&self) -> Result<()> {
        let expected = self.expected_size()?;
        let actual = self.data().len() as u64;
        if actual < expected {
            warn!(expected, actual, "Core dump is truncated");
            return Err(StructerError::Truncated {
                offset: 0,
                needed: expected,
                available: actual,
            });
        }
        Ok(())
    }

    /// Entries of the `CORE`/`File` note, empty when the dump has none.
    pub fn file_mappings(&self) -> Result<&[FileMapping<'a>]> {
        self.mappings
            .get_or_try_init(|| match self.note("CORE", "File")? {
                Some(note) => self.parse_file_note(note.desc()),
                None => {
                    debug!("Core has no file note");
                    Ok(Vec::new())
                }
            })
            .map(Vec::as_slice)
    }

    fn parse_file_note(&self, desc: &'a [u8]) -> Result<Vec<FileMapping<'a>>> {
        let schemas = self.schemas();
        let header = schemas.file_note.decode(desc)?;
        let count = header.u64("count")?;
        let page_size = header.u64("page_size")?;
        let tail = header.bytes("tail")?;

        let width = schemas.file_span.fixed_width().unwrap_or_default() as u64;
        let table_len = to_usize(count.saturating_mul(width), 0, tail.len())?;
        let spans = StructArray::new(schemas.file_span.clone(), slice_at(tail, 0, table_len)?)?;
        let mut names = strings(&tail[table_len..]).into_iter();

        let mut mappings = Vec::with_capacity(spans.len());
        for span in spans.iter() {
            let span = span?;
            let name = match names.next() {
                Some(name) => name?,
                None => return Err(StructerError::truncated(tail.len(), 1, tail.len())),
            };
            let name = match name {
                Value::Text(name) => name,
                other => Cow::Owned(other.to_string()),
            };
            mappings.push(FileMapping {
                name,
                start: span.u64("start")?,
                end: span.u64("end")?,
                offset: span.u64("offset")?.saturating_mul(page_size),
            });
        }
        debug!(count = mappings.len(), page_size, "Parsed file note");
        Ok(mappings)
    }

    /// Mapped files whose first page holds an ELF image, with that image's build id.
    pub fn loaded_objects(&self) -> Result<Vec<LoadedObject<'a>>> {
        let mut objects = Vec::new();
        for mapping in self.file_mappings()?.iter().filter(|m| m.offset == 0) {
            let image = match self.fetch(mapping.start, 0) {
                Ok(image) => image,
                Err(e) if e.is_absence() => {
                    debug!(name = %mapping.name, start = mapping.start, "Mapping not in dump");
                    continue;
                }
                Err(e) => return Err(e),
            };
            if !image.starts_with(ELF_MAGIC) {
                continue;
            }
            let build_id = match Elf::with_limits(image, self.limits().clone())
                .and_then(|elf| elf.build_id())
            {
                Ok(build_id) => build_id,
                Err(e) => {
                    warn!(name = %mapping.name, error = %e, "Could not read build id");
                    None
                }
            };
            objects.push(LoadedObject {
                name: mapping.name.clone(),
                address: mapping.start,
                build_id,
            });
        }
        Ok(objects)
    }

    fn required(&self, kind: &str) -> Result<u64> {
        self.auxv()?
            .and_then(|auxv| auxv.get(kind))
            .ok_or_else(|| StructerError::violation("Auxv", format!("{} entry", kind), "none"))
    }

    /// Walk the dynamic linker's list of loaded objects.
    ///
    /// The executable's program headers are found through the auxiliary vector, its dynamic
    /// section through them, and the `r_debug` structure through the section's `Debug` entry.
    pub fn link_map(&self) -> Result<LinkMapIter<'_, 'a>> {
        let schemas = self.schemas();
        let phdr = self.required("Phdr")?;
        let entry_size = self.required("PhEnt")?;
        let count = self.required("PhNum")?;
        if Some(entry_size) != schemas.phdr.fixed_width().map(|w| w as u64) {
            return Err(StructerError::violation(
                "Auxv.PhEnt",
                format!("{:?}", schemas.phdr.fixed_width()),
                entry_size.to_string(),
            ));
        }

        // A zero size asks `fetch` for the whole run.
        let table = match count {
            0 => &[][..],
            _ => self.fetch(phdr, entry_size.saturating_mul(count))?,
        };
        let segments = StructArray::new(schemas.phdr.clone(), table)?
            .iter()
            .map(|record| Segment::from_record(&record?))
            .collect::<Result<Vec<_>>>()?;

        // Position independent executables run at a bias from their link-time addresses.
        let bias = segments
            .iter()
            .find(|s| s.is("Phdr"))
            .map_or(0, |s| phdr.wrapping_sub(s.vaddr));
        let dynamic = segments
            .iter()
            .find(|s| s.is("Dynamic"))
            .ok_or_else(|| StructerError::violation("Phdr", "dynamic segment", "none"))?;

        let entries = self.fetch(dynamic.vaddr.wrapping_add(bias), dynamic.filesz)?;
        let width = schemas.dynamic.fixed_width().unwrap_or(1);
        let entries = &entries[..entries.len() - entries.len() % width];
        let mut r_debug = None;
        for entry in StructArray::new(schemas.dynamic.clone(), entries)?.iter() {
            let entry = entry?;
            let tag = entry.symbol("tag")?;
            if tag.is("Null") {
                break;
            }
            if tag.is("Debug") {
                r_debug = Some(entry.u64("val")?);
                break;
            }
        }
        let r_debug = r_debug
            .filter(|&address| address != 0)
            .ok_or_else(|| StructerError::violation("Dyn", "Debug entry with an address", "none"))?;

        let width = schemas.r_debug.fixed_width().unwrap_or_default() as u64;
        let r_debug = schemas.r_debug.decode(self.fetch(r_debug, width)?)?;
        let head = r_debug.u64("map")?;
        debug!(head, state = %r_debug.value("state")?, "Found r_debug");
        Ok(LinkMapIter::new(self, head))
    }
}

/// Iterator over the link-map chain, validating every node's back pointer.
///
/// The head node (the executable) is not yielded, and neither are nodes without a name.
pub struct LinkMapIter<'c, 'a> {
    core: &'c Core<'a>,
    /// Address of the node visited last.
    current: u64,
    next: Option<u64>,
    visited: usize,
    failed: bool,
}

impl<'c, 'a> LinkMapIter<'c, 'a> {
    fn new(core: &'c Core<'a>, head: u64) -> Self {
        Self {
            core,
            current: head,
            next: None,
            visited: 0,
            failed: false,
        }
    }

    fn node(&self, address: u64) -> Result<Record<'a>> {
        let schema = &self.core.schemas().link_map;
        let width = schema.fixed_width().unwrap_or_default() as u64;
        schema.decode(self.core.fetch(address, width)?)
    }

    fn name(&self, address: u64) -> Result<Cow<'a, str>> {
        if address == 0 {
            return Ok(Cow::Borrowed(""));
        }
        match self.core.fetch(address, 0) {
            Ok(bytes) => Ok(text(bytes)),
            Err(e) if e.is_absence() => Ok(Cow::Borrowed("")),
            Err(e) => Err(e),
        }
    }

    fn advance(&mut self) -> Result<Option<LinkMapEntry<'a>>> {
        let mut next = match self.next {
            Some(next) => next,
            None if self.current == 0 => return Ok(None),
            None => self.node(self.current)?.u64("next")?,
        };
        let limit = self.core.limits().max_link_map_entries;

        while next != 0 {
            if self.visited >= limit {
                return Err(StructerError::ChainBroken {
                    address: next,
                    message: format!("more than {} entries", limit),
                });
            }
            self.visited += 1;

            let node = self.node(next)?;
            let prev = node.u64("prev")?;
            if prev != self.current {
                return Err(StructerError::ChainBroken {
                    address: next,
                    message: format!("prev {:#x} does not point back to {:#x}", prev, self.current),
                });
            }
            let address = next;
            self.current = address;
            next = node.u64("next")?;
            self.next = Some(next);

            let name = self.name(node.u64("name")?)?;
            if !name.is_empty() {
                return Ok(Some(LinkMapEntry {
                    node: address,
                    address: node.u64("addr")?,
                    name,
                    dynamic: node.u64("ld")?,
                }));
            }
        }
        self.next = Some(0);
        Ok(None)
    }
}

impl<'a> Iterator for LinkMapIter<'_, 'a> {
    type Item = Result<LinkMapEntry<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.advance() {
            Ok(entry) => entry.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
