//! cpio archives in the "newc" and "crc" ASCII formats
//!
//! Every member is a 110-byte header of hexadecimal ASCII numbers, the member name, padding to
//! four bytes, the file data and padding to four bytes again. The archive ends with a member
//! named `TRAILER!!!`.

use crate::config::WalkLimits;
use crate::error::{Result, StructerError};
use crate::schema::{EnumDomain, Field, IntKind, Record, Schema, Symbol, TimeEncoding, VarArray};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

const TRAILER: &str = "TRAILER!!!";

catalog! {
    pub fn magic() -> Arc<EnumDomain> {
        EnumDomain::patterns(
            "CpioMagic",
            6,
            &[("new", &b"070701"[..]), ("crc", &b"070702"[..])],
        )
    }
}

catalog! {
    /// File type bits of `mode`.
    pub fn file_type() -> Arc<EnumDomain> {
        EnumDomain::ints(
            "FileType",
            IntKind::U32,
            &[
                ("Fifo", 0o010000),
                ("CharDevice", 0o020000),
                ("Directory", 0o040000),
                ("BlockDevice", 0o060000),
                ("File", 0o100000),
                ("Symlink", 0o120000),
                ("Socket", 0o140000),
            ],
        )
    }
}

catalog! {
    pub fn member_schema() -> Schema {
        let number = Field::ascii_int(8, 16);
        Schema::builder("CpioMember")
            .field("magic", Field::constant(magic()?))
            .fields(&["inode", "mode", "uid", "gid", "nlink"], number.clone())
            .field("mtime", Field::timestamp(TimeEncoding::Ascii { len: 8, radix: 16 }))
            .fields(&["filesize", "major", "minor", "rmajor", "rminor"], number.clone())
            .fields(&["namesize", "check"], number)
            .field("name", Field::text_from("namesize"))
            .field("namepad", Field::pad(4))
            .field("data", Field::payload_from("filesize", 1))
            .field("datapad", Field::pad(4))
            .build()
    }
}

/// One archive member.
#[derive(Debug, Clone, PartialEq)]
pub struct Member<'a> {
    record: Record<'a>,
}

impl<'a> Member<'a> {
    pub fn name(&self) -> &str {
        self.record.text("name").unwrap_or_default()
    }

    pub fn mode(&self) -> u64 {
        self.record.u64("mode").unwrap_or_default()
    }

    pub fn mtime(&self) -> Option<DateTime<Utc>> {
        self.record.time("mtime").ok()
    }

    /// File type from the `S_IFMT` bits of the mode.
    pub fn file_type(&self) -> Result<Symbol> {
        file_type()?.resolve(self.mode() & 0o170000)
    }

    pub fn is_file(&self) -> bool {
        self.file_type().is_ok_and(|t| t.is("File"))
    }

    /// The member's data, without padding.
    pub fn contents(&self) -> &'a [u8] {
        self.record.bytes("data").unwrap_or_default()
    }

    pub fn record(&self) -> &Record<'a> {
        &self.record
    }
}

/// A cpio archive over a borrowed buffer.
pub struct Archive<'a> {
    data: &'a [u8],
    limits: WalkLimits,
}

impl<'a> Archive<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_limits(data, WalkLimits::default())
    }

    pub fn with_limits(data: &'a [u8], limits: WalkLimits) -> Self {
        Self { data, limits }
    }

    /// Members up to, not including, the trailer. Running out of data before the trailer
    /// yields [`StructerError::Truncated`].
    pub fn members(&self) -> Result<Members<'a>> {
        Ok(Members {
            inner: VarArray::new(member_schema()?.clone(), self.data).into_iter(),
            len: self.data.len(),
            seen: 0,
            limit: self.limits.max_archive_members,
            done: false,
        })
    }

    /// The member called `name`.
    pub fn find(&self, name: &str) -> Result<Option<Member<'a>>> {
        for member in self.members()? {
            let member = member?;
            if member.name() == name {
                return Ok(Some(member));
            }
        }
        Ok(None)
    }
}

/// Iterator over archive members.
pub struct Members<'a> {
    inner: crate::schema::VarIntoIter<'a, Schema>,
    len: usize,
    seen: usize,
    limit: usize,
    done: bool,
}

impl<'a> Iterator for Members<'a> {
    type Item = Result<Member<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let record = match self.inner.next() {
            Some(Ok(record)) => record,
            Some(Err(e)) => {
                self.done = true;
                return Some(Err(e));
            }
            None => {
                self.done = true;
                warn!(members = self.seen, "cpio archive ends without a trailer");
                return Some(Err(StructerError::truncated(self.len, 1, self.len)));
            }
        };
        let member = Member { record };
        if member.name() == TRAILER {
            debug!(members = self.seen, "Reached cpio trailer");
            self.done = true;
            return None;
        }
        self.seen += 1;
        if self.seen > self.limit {
            self.done = true;
            return Some(Err(StructerError::violation(
                "CpioMember",
                format!("at most {} members", self.limit),
                "more",
            )));
        }
        Some(Ok(member))
    }
}
