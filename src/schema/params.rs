//! Byte order, word size, and integer encodings shared by every descriptor.

use crate::schema::field::Value;

/// Byte order a schema is decoded under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ByteOrder {
    /// Whatever the host uses.
    #[default]
    Native,
    Little,
    Big,
}

impl ByteOrder {
    /// Collapse `Native` into the concrete host order.
    pub fn resolve(self) -> Self {
        match self {
            ByteOrder::Native if cfg!(target_endian = "big") => ByteOrder::Big,
            ByteOrder::Native => ByteOrder::Little,
            other => other,
        }
    }

    pub fn is_little_endian(self) -> bool {
        self.resolve() == ByteOrder::Little
    }

    /// Assemble up to eight bytes into an unsigned integer.
    pub fn read_uint(self, bytes: &[u8]) -> u64 {
        debug_assert!(bytes.len() <= 8);
        if self.is_little_endian() {
            bytes
                .iter()
                .rev()
                .fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
        } else {
            bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
        }
    }
}

/// Width of the target's native word (ELF class).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WordSize {
    #[default]
    Native,
    Bits32,
    Bits64,
}

impl WordSize {
    pub fn bytes(self) -> usize {
        match self {
            WordSize::Native => std::mem::size_of::<usize>(),
            WordSize::Bits32 => 4,
            WordSize::Bits64 => 8,
        }
    }
}

/// Decoding parameters a schema is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Params {
    pub byte_order: ByteOrder,
    pub word_size: WordSize,
}

impl Params {
    pub const NATIVE: Params = Params {
        byte_order: ByteOrder::Native,
        word_size: WordSize::Native,
    };

    pub fn new(byte_order: ByteOrder, word_size: WordSize) -> Self {
        Self {
            byte_order,
            word_size,
        }
    }

    /// Native word size with an explicit byte order.
    pub fn with_order(byte_order: ByteOrder) -> Self {
        Self {
            byte_order,
            word_size: WordSize::Native,
        }
    }
}

/// Fixed integer widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    W1 = 1,
    W2 = 2,
    W4 = 4,
    W8 = 8,
}

/// How an integer field is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntKind {
    Fixed { width: IntWidth, signed: bool },
    /// Width follows [`Params::word_size`].
    Word { signed: bool },
}

impl IntKind {
    pub const U8: IntKind = IntKind::Fixed { width: IntWidth::W1, signed: false };
    pub const U16: IntKind = IntKind::Fixed { width: IntWidth::W2, signed: false };
    pub const U32: IntKind = IntKind::Fixed { width: IntWidth::W4, signed: false };
    pub const U64: IntKind = IntKind::Fixed { width: IntWidth::W8, signed: false };
    pub const I8: IntKind = IntKind::Fixed { width: IntWidth::W1, signed: true };
    pub const I16: IntKind = IntKind::Fixed { width: IntWidth::W2, signed: true };
    pub const I32: IntKind = IntKind::Fixed { width: IntWidth::W4, signed: true };
    pub const I64: IntKind = IntKind::Fixed { width: IntWidth::W8, signed: true };
    pub const WORD: IntKind = IntKind::Word { signed: false };
    pub const SWORD: IntKind = IntKind::Word { signed: true };

    pub fn width(self, params: Params) -> usize {
        match self {
            IntKind::Fixed { width, .. } => width as usize,
            IntKind::Word { .. } => params.word_size.bytes(),
        }
    }

    pub fn is_signed(self) -> bool {
        match self {
            IntKind::Fixed { signed, .. } | IntKind::Word { signed } => signed,
        }
    }

    /// Raw bits of `bytes` (already sliced to [`IntKind::width`]).
    pub fn read_bits(self, bytes: &[u8], params: Params) -> u64 {
        params.byte_order.read_uint(bytes)
    }

    /// Decode `bytes` as a [`Value::Uint`] or sign-extended [`Value::Int`].
    pub fn read(self, bytes: &[u8], params: Params) -> Value<'static> {
        let bits = self.read_bits(bytes, params);
        if self.is_signed() {
            let shift = 64 - 8 * bytes.len() as u32;
            Value::Int(((bits << shift) as i64) >> shift)
        } else {
            Value::Uint(bits)
        }
    }
}
