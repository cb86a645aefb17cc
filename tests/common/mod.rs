//! Common test utilities and helpers.
//!
//! Builders for synthetic inputs: a small 64-bit little-endian core dump with two embedded
//! images and a dynamic linker chain, cpio archives, and RPM packages.

#![allow(dead_code)]

/// Addresses and names baked into [`core_dump`].
pub mod layout {
    pub const EXE_BASE: u64 = 0x400000;
    pub const LIB_BASE: u64 = 0x7f00_0000_0000;
    pub const EXE_NAME: &str = "/usr/bin/app";
    pub const LIB_NAME: &str = "/usr/lib/libfoo.so";
    pub const EXE_BUILD_ID: [u8; 8] = [0xde, 0xad, 0xbe, 0xef, 0x00, 0x11, 0x22, 0x33];
    pub const LIB_BUILD_ID: [u8; 4] = [0xca, 0xfe, 0xf0, 0x0d];
    pub const PAGE: u64 = 0x1000;
    /// File size of the finished dump.
    pub const CORE_SIZE: usize = 0x3000;

    pub const EXE_DYNAMIC: u64 = 0x800;
    pub const EXE_R_DEBUG: u64 = 0x900;
    pub const EXE_LINK_HEAD: u64 = 0xa00;
    pub const EXE_STRINGS: u64 = 0xb00;
}

use layout::*;

/// Little-endian byte writer addressed by absolute offset.
#[derive(Default)]
pub struct Image {
    pub data: Vec<u8>,
}

impl Image {
    pub fn new(len: usize) -> Self {
        Self { data: vec![0; len] }
    }

    pub fn put(&mut self, offset: usize, bytes: &[u8]) -> &mut Self {
        if self.data.len() < offset + bytes.len() {
            self.data.resize(offset + bytes.len(), 0);
        }
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        self
    }

    pub fn u16(&mut self, offset: usize, v: u16) -> &mut Self {
        self.put(offset, &v.to_le_bytes())
    }

    pub fn u32(&mut self, offset: usize, v: u32) -> &mut Self {
        self.put(offset, &v.to_le_bytes())
    }

    pub fn u64(&mut self, offset: usize, v: u64) -> &mut Self {
        self.put(offset, &v.to_le_bytes())
    }

    /// Consecutive 64-bit words.
    pub fn words(&mut self, offset: usize, words: &[u64]) -> &mut Self {
        for (i, w) in words.iter().enumerate() {
            self.u64(offset + i * 8, *w);
        }
        self
    }
}

/// Program header values: `(type, flags, offset, vaddr, filesz)`.
pub type Phdr = (u32, u32, u64, u64, u64);

pub const PT_LOAD: u32 = 1;
pub const PT_DYNAMIC: u32 = 2;
pub const PT_NOTE: u32 = 4;
pub const PT_PHDR: u32 = 6;

/// Write a 64-bit ELF header at `base` followed by its program headers at `base + 64`.
pub fn elf_header(image: &mut Image, base: usize, e_type: u16, phdrs: &[Phdr]) {
    image
        .put(base, b"\x7fELF\x02\x01\x01\x00")
        .u16(base + 16, e_type)
        .u16(base + 18, 62)
        .u32(base + 20, 1)
        .u64(base + 32, 64)
        .u16(base + 52, 64)
        .u16(base + 54, 56)
        .u16(base + 56, phdrs.len() as u16)
        .u16(base + 58, 64);
    for (i, &(kind, flags, offset, vaddr, filesz)) in phdrs.iter().enumerate() {
        let at = base + 64 + i * 56;
        image
            .u32(at, kind)
            .u32(at + 4, flags)
            .words(at + 8, &[offset, vaddr, vaddr, filesz, filesz, 0x1000]);
    }
}

/// One ELF note with 4-byte alignment.
pub fn note(owner: &str, kind: u32, desc: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(owner.len() as u32 + 1).to_le_bytes());
    out.extend_from_slice(&(desc.len() as u32).to_le_bytes());
    out.extend_from_slice(&kind.to_le_bytes());
    out.extend_from_slice(owner.as_bytes());
    out.push(0);
    pad(&mut out, 4);
    out.extend_from_slice(desc);
    pad(&mut out, 4);
    out
}

pub fn pad(out: &mut Vec<u8>, align: usize) {
    while out.len() % align != 0 {
        out.push(0);
    }
}

fn words(values: &[u64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// An executable image of one page: header, program headers, build id, dynamic section,
/// `r_debug`, three link-map nodes and the names they point at.
fn executable() -> Image {
    let mut image = Image::new(PAGE as usize);
    let build_id = note("GNU", 3, &EXE_BUILD_ID);
    elf_header(
        &mut image,
        0,
        2,
        &[
            (PT_PHDR, 4, 64, EXE_BASE + 64, 4 * 56),
            (PT_LOAD, 5, 0, EXE_BASE, PAGE),
            (PT_DYNAMIC, 6, EXE_DYNAMIC, EXE_BASE + EXE_DYNAMIC, 32),
            (PT_NOTE, 4, 0x300, EXE_BASE + 0x300, build_id.len() as u64),
        ],
    );
    image.put(0x300, &build_id);

    // DT_DEBUG then DT_NULL.
    image.words(EXE_DYNAMIC as usize, &[21, EXE_BASE + EXE_R_DEBUG, 0, 0]);

    let head = EXE_BASE + EXE_LINK_HEAD;
    let vdso = head + 0x40;
    let lib = head + 0x80;
    let lib_name = EXE_BASE + EXE_STRINGS;
    image.words(EXE_R_DEBUG as usize, &[1, head, 0, 0, 0]);
    // addr, name, ld, next, prev
    image.words(EXE_LINK_HEAD as usize, &[0, 0, EXE_BASE + EXE_DYNAMIC, vdso, 0]);
    image.words(EXE_LINK_HEAD as usize + 0x40, &[0x7fff_0000_0000, 0, 0, lib, head]);
    image.words(EXE_LINK_HEAD as usize + 0x80, &[LIB_BASE, lib_name, 0, 0, vdso]);
    image.put(EXE_STRINGS as usize, LIB_NAME.as_bytes());
    image
}

fn library() -> Image {
    let mut image = Image::new(PAGE as usize);
    let build_id = note("GNU", 3, &LIB_BUILD_ID);
    elf_header(
        &mut image,
        0,
        3,
        &[(PT_NOTE, 4, 0x100, 0x100, build_id.len() as u64)],
    );
    image.put(0x100, &build_id);
    image
}

/// The embedded images, for writing them to disk next to the dump.
pub fn executable_bytes() -> Vec<u8> {
    executable().data
}

pub fn library_bytes() -> Vec<u8> {
    library().data
}

/// A core dump whose two loadable segments hold [`executable`] and [`library`].
pub fn core_dump() -> Vec<u8> {
    let mut file_note = words(&[2, PAGE]);
    file_note.extend(words(&[EXE_BASE, EXE_BASE + PAGE, 0]));
    file_note.extend(words(&[LIB_BASE, LIB_BASE + PAGE, 0]));
    file_note.extend_from_slice(EXE_NAME.as_bytes());
    file_note.push(0);
    file_note.extend_from_slice(LIB_NAME.as_bytes());
    file_note.push(0);

    let auxv = words(&[3, EXE_BASE + 64, 4, 56, 5, 4, 6, PAGE, 0, 0]);

    let mut notes = note("CORE", 0x46494c45, &file_note);
    notes.extend(note("CORE", 6, &auxv));

    let mut image = Image::new(CORE_SIZE);
    elf_header(
        &mut image,
        0,
        4,
        &[
            (PT_NOTE, 0, 0x100, 0, notes.len() as u64),
            (PT_LOAD, 5, PAGE, EXE_BASE, PAGE),
            (PT_LOAD, 5, 2 * PAGE, LIB_BASE, PAGE),
        ],
    );
    image.put(0x100, &notes);
    image.put(PAGE as usize, &executable().data);
    image.put(2 * PAGE as usize, &library().data);
    image.data
}

/// A cpio "newc" member.
pub fn cpio_member(name: &str, mode: u32, mtime: u32, data: &[u8]) -> Vec<u8> {
    let fields = [
        1,
        mode,
        0,
        0,
        1,
        mtime,
        data.len() as u32,
        0,
        0,
        0,
        0,
        name.len() as u32 + 1,
        0,
    ];
    let mut out = b"070701".to_vec();
    for field in fields {
        out.extend_from_slice(format!("{:08x}", field).as_bytes());
    }
    out.extend_from_slice(name.as_bytes());
    out.push(0);
    pad(&mut out, 4);
    out.extend_from_slice(data);
    pad(&mut out, 4);
    out
}

/// A cpio archive of `(name, mode, data)` members, trailer included.
pub fn cpio_archive(members: &[(&str, u32, &[u8])]) -> Vec<u8> {
    let mut out = Vec::new();
    for (name, mode, data) in members {
        out.extend(cpio_member(name, *mode, 1_600_000_000, data));
    }
    out.extend(cpio_member("TRAILER!!!", 0, 0, b""));
    out
}

/// An RPM header entry value.
pub enum Tag<'a> {
    Str(&'a str),
    Int32(&'a [u32]),
    Bin(&'a [u8]),
    StrArray(&'a [&'a str]),
}

/// A big-endian RPM header structure.
pub fn rpm_header(entries: &[(u32, Tag)]) -> Vec<u8> {
    let mut index = Vec::new();
    let mut store: Vec<u8> = Vec::new();
    for (tag, value) in entries {
        let (kind, count) = match value {
            Tag::Int32(v) => {
                pad(&mut store, 4);
                (4u32, v.len())
            }
            Tag::Str(_) => (6, 1),
            Tag::Bin(b) => (7, b.len()),
            Tag::StrArray(s) => (8, s.len()),
        };
        for v in [*tag, kind, store.len() as u32, count as u32] {
            index.extend_from_slice(&v.to_be_bytes());
        }
        match value {
            Tag::Int32(v) => v.iter().for_each(|i| store.extend_from_slice(&i.to_be_bytes())),
            Tag::Str(s) => {
                store.extend_from_slice(s.as_bytes());
                store.push(0);
            }
            Tag::Bin(b) => store.extend_from_slice(b),
            Tag::StrArray(list) => {
                for s in list.iter() {
                    store.extend_from_slice(s.as_bytes());
                    store.push(0);
                }
            }
        }
    }

    let mut out = vec![0x8e, 0xad, 0xe8, 0x01, 0, 0, 0, 0];
    out.extend_from_slice(&(entries.len() as u32).to_be_bytes());
    out.extend_from_slice(&(store.len() as u32).to_be_bytes());
    out.extend(index);
    out.extend(store);
    out
}

/// A binary package whose payload is `payload`.
pub fn rpm_package(name: &str, payload: &[u8]) -> Vec<u8> {
    let mut out = vec![0xed, 0xab, 0xee, 0xdb, 3, 0, 0, 0, 0, 1];
    let mut lead_name = name.as_bytes().to_vec();
    lead_name.resize(66, 0);
    out.extend(lead_name);
    out.extend_from_slice(&[0, 1, 0, 5]);
    out.extend_from_slice(&[0; 16]);
    assert_eq!(out.len(), 96);

    out.extend(rpm_header(&[
        (1000, Tag::Int32(&[payload.len() as u32])),
        (1004, Tag::Bin(&[0x11; 16])),
    ]));
    pad(&mut out, 8);

    out.extend(rpm_header(&[
        (1000, Tag::Str(name)),
        (1001, Tag::Str("1.0")),
        (1002, Tag::Str("3.el9")),
        (1009, Tag::Int32(&[4096])),
        (1117, Tag::StrArray(&["app", "libfoo.so"])),
        (1124, Tag::Str("cpio")),
        (1125, Tag::Str("xz")),
    ]));
    out.extend_from_slice(payload);
    out
}
