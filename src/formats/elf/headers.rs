//! ELF record layouts.
//!
//! Templates are declared once with native parameters and rebound to an image's byte order
//! and word size with [`Schema::with_params`].

use crate::error::Result;
use crate::formats::elf::enums;
use crate::schema::{Field, IntKind, Params, Schema, WordSize};

catalog! {
    /// The first sixteen bytes of every image. Byte-sized fields only, so valid under any
    /// parameters.
    pub fn ident() -> Schema {
        Schema::builder("Ident")
            .field("magic", Field::constant(enums::magic()?))
            .field("wordsize", Field::enumerated(enums::word_size()?))
            .field("byteorder", Field::enumerated(enums::byte_order()?))
            .field("version", Field::constant(enums::ident_version()?))
            .field("osabi", Field::enumerated(enums::os_abi()?))
            .field("abiversion", Field::u8())
            .field("padding", Field::nulls(7))
            .build()
    }
}

catalog! {
    fn header_template() -> Schema {
        Schema::builder("Header")
            .inherit(ident()?)
            .field("type", Field::enumerated(enums::file_type()?))
            .field("machine", Field::enumerated(enums::machine()?))
            .field("file_version", Field::constant(enums::file_version()?))
            .fields(&["entry", "phoff", "shoff"], Field::word())
            .field("flags", Field::u32())
            .fields(&["ehsize", "phentsize", "phnum"], Field::u16())
            .fields(&["shentsize", "shnum", "shstrndx"], Field::u16())
            .build()
    }
}

/// ELF file header, identification block included.
pub fn header(params: Params) -> Result<Schema> {
    Ok(header_template()?.with_params(params))
}

catalog! {
    fn phdr32() -> Schema {
        Schema::builder("Phdr32")
            .field("type", Field::enumerated(enums::segment_type()?))
            .fields(&["offset", "vaddr", "paddr", "filesz", "memsz"], Field::word())
            .field("flags", Field::u32())
            .field("align", Field::word())
            .build()
    }
}

catalog! {
    fn phdr64() -> Schema {
        Schema::builder("Phdr64")
            .field("type", Field::enumerated(enums::segment_type()?))
            .field("flags", Field::u32())
            .fields(&["offset", "vaddr", "paddr", "filesz", "memsz", "align"], Field::word())
            .build()
    }
}

/// The two program header layouts. The field order differs between them, not just the
/// widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramHeaderKind {
    Elf32,
    Elf64,
}

impl ProgramHeaderKind {
    pub fn for_word_size(word_size: WordSize) -> Self {
        match word_size.bytes() {
            4 => ProgramHeaderKind::Elf32,
            _ => ProgramHeaderKind::Elf64,
        }
    }

    pub fn schema(self, params: Params) -> Result<Schema> {
        let template = match self {
            ProgramHeaderKind::Elf32 => phdr32()?,
            ProgramHeaderKind::Elf64 => phdr64()?,
        };
        Ok(template.with_params(params))
    }
}

catalog! {
    fn shdr_template() -> Schema {
        Schema::builder("Shdr")
            .field("name", Field::u32())
            .field("type", Field::enumerated(enums::section_type()?))
            .fields(&["flags", "addr", "offset", "size"], Field::word())
            .fields(&["link", "info"], Field::u32())
            .fields(&["addralign", "entsize"], Field::word())
            .build()
    }
}

catalog! {
    fn note_template() -> Schema {
        Schema::builder("Note")
            .fields(&["namesz", "descsz", "type"], Field::u32())
            .field("name", Field::text_from("namesz"))
            .field("namepad", Field::pad(4))
            .field("desc", Field::payload_from("descsz", 1))
            .field("descpad", Field::pad(4))
            .build()
    }
}

catalog! {
    fn auxv_template() -> Schema {
        Schema::builder("Auxv")
            .field("type", Field::enumerated(enums::auxv_type()?))
            .field("val", Field::word())
            .build()
    }
}

catalog! {
    fn r_debug_template() -> Schema {
        Schema::builder("RDebug")
            .fields(&["version", "map", "brk"], Field::word())
            .field("state", Field::enumerated(enums::debug_state()?))
            .field("ldbase", Field::word())
            .build()
    }
}

catalog! {
    fn link_map_template() -> Schema {
        Schema::builder("LinkMap")
            .fields(&["addr", "name", "ld", "next", "prev"], Field::word())
            .build()
    }
}

catalog! {
    fn file_note_template() -> Schema {
        Schema::builder("FileNote")
            .fields(&["count", "page_size"], Field::word())
            .field("tail", Field::tail())
            .build()
    }
}

catalog! {
    fn file_span_template() -> Schema {
        Schema::builder("FileSpan")
            .fields(&["start", "end", "offset"], Field::word())
            .build()
    }
}

/// Every layout an image needs, bound to its parameters and machine.
#[derive(Debug, Clone)]
pub struct ElfSchemas {
    pub params: Params,
    pub header: Schema,
    pub phdr: Schema,
    pub shdr: Schema,
    pub note: Schema,
    pub auxv: Schema,
    pub dynamic: Schema,
    pub r_debug: Schema,
    pub link_map: Schema,
    pub file_note: Schema,
    pub file_span: Schema,
}

impl ElfSchemas {
    pub fn new(params: Params, machine: &str) -> Result<Self> {
        Ok(Self {
            params,
            header: header(params)?,
            phdr: ProgramHeaderKind::for_word_size(params.word_size).schema(params)?,
            shdr: shdr_template()?.with_params(params),
            note: note_template()?.with_params(params),
            auxv: auxv_template()?.with_params(params),
            dynamic: dynamic(params, machine)?,
            r_debug: r_debug_template()?.with_params(params),
            link_map: link_map_template()?.with_params(params),
            file_note: file_note_template()?.with_params(params),
            file_span: file_span_template()?.with_params(params),
        })
    }
}

/// Dynamic section entry, with tags resolved for `machine`.
pub fn dynamic(params: Params, machine: &str) -> Result<Schema> {
    Schema::builder("Dyn")
        .params(params)
        .field("tag", Field::enumerated(enums::dtag()?.for_context(machine)))
        .field("val", Field::int(IntKind::WORD))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ByteOrder;

    const LE64: Params = Params {
        byte_order: ByteOrder::Little,
        word_size: WordSize::Bits64,
    };
    const BE32: Params = Params {
        byte_order: ByteOrder::Big,
        word_size: WordSize::Bits32,
    };

    #[test]
    fn test_header_widths() {
        assert_eq!(ident().unwrap().fixed_width(), Some(16));
        assert_eq!(header(LE64).unwrap().fixed_width(), Some(64));
        assert_eq!(header(BE32).unwrap().fixed_width(), Some(52));
    }

    #[test]
    fn test_program_header_kinds() {
        let narrow = ProgramHeaderKind::for_word_size(WordSize::Bits32);
        let wide = ProgramHeaderKind::for_word_size(WordSize::Bits64);
        assert_eq!(narrow, ProgramHeaderKind::Elf32);
        assert_eq!(narrow.schema(BE32).unwrap().fixed_width(), Some(32));
        assert_eq!(wide.schema(LE64).unwrap().fixed_width(), Some(56));
        let wide_schema = wide.schema(LE64).unwrap();
        let order: Vec<&str> = wide_schema.field_names().take(2).collect();
        assert_eq!(order, ["type", "flags"]);
    }

    #[test]
    fn test_schema_set_widths() {
        let schemas = ElfSchemas::new(LE64, "X86_64").unwrap();
        assert_eq!(schemas.shdr.fixed_width(), Some(64));
        assert_eq!(schemas.auxv.fixed_width(), Some(16));
        assert_eq!(schemas.dynamic.fixed_width(), Some(16));
        assert_eq!(schemas.link_map.fixed_width(), Some(40));
        assert_eq!(schemas.file_span.fixed_width(), Some(24));
        assert!(!schemas.note.is_fixed());
        assert!(!schemas.file_note.is_fixed());
    }

    #[test]
    fn test_note_decodes_payload() {
        let schemas = ElfSchemas::new(LE64, "X86_64").unwrap();
        let mut data = Vec::new();
        for v in [4u32, 2, 3] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.extend_from_slice(b"GNU\0\xab\xcd\0\0");
        let note = schemas.note.decode(&data).unwrap();
        assert_eq!(note.text("name").unwrap(), "GNU");
        assert_eq!(note.bytes("desc").unwrap(), &[0xab, 0xcd]);
        assert_eq!(note.len(), data.len());
    }
}
