//! Program header views

use crate::error::Result;
use crate::schema::{Record, Symbol};
use bitflags::bitflags;

bitflags! {
    /// `p_flags` permission bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SegmentFlags: u32 {
        const EXECUTE = 1;
        const WRITE = 2;
        const READ = 4;
    }
}

/// One decoded program header.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub kind: Symbol,
    pub flags: SegmentFlags,
    pub offset: u64,
    pub vaddr: u64,
    pub paddr: u64,
    pub filesz: u64,
    pub memsz: u64,
    pub align: u64,
}

impl Segment {
    pub fn from_record(record: &Record<'_>) -> Result<Self> {
        Ok(Self {
            kind: record.symbol("type")?.clone(),
            flags: SegmentFlags::from_bits_retain(record.u64("flags")? as u32),
            offset: record.u64("offset")?,
            vaddr: record.u64("vaddr")?,
            paddr: record.u64("paddr")?,
            filesz: record.u64("filesz")?,
            memsz: record.u64("memsz")?,
            align: record.u64("align")?,
        })
    }

    pub fn is(&self, kind: &str) -> bool {
        self.kind.is(kind)
    }

    /// Virtual address just past the file-backed part.
    pub fn file_end(&self) -> u64 {
        self.vaddr.saturating_add(self.filesz)
    }

    pub fn permissions(&self) -> String {
        let flag = |f: SegmentFlags, c: char| if self.flags.contains(f) { c } else { '-' };
        [
            flag(SegmentFlags::READ, 'r'),
            flag(SegmentFlags::WRITE, 'w'),
            flag(SegmentFlags::EXECUTE, 'x'),
        ]
        .iter()
        .collect()
    }
}
