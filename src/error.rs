//! Error types for the structer decoding engine.
//!
//! Every failure the engine can report is a variant of [`StructerError`]. Decoding never
//! panics on malformed input; callers decide whether a missing optional structure is fatal.

use thiserror::Error;

/// Main error type for structer operations.
#[derive(Debug, Error)]
pub enum StructerError {
    /// Decoded bytes do not match the layout a schema demands.
    #[error("Schema violation in {field}: expected {expected}, found {actual}")]
    SchemaViolation {
        field: String,
        expected: String,
        actual: String,
    },

    /// A raw value has no symbolic name in its enumeration domain.
    #[error("Unrecognized {domain} value: {value}")]
    UnrecognizedEnumValue { domain: String, value: String },

    /// An interval index lookup landed in a gap or beyond the mapped range.
    #[error("Address {address:#x} is not mapped")]
    AddressNotMapped { address: u64 },

    /// A slice would extend beyond the buffer.
    #[error("Truncated at offset {offset:#x}: needed {needed} bytes, {available} available")]
    Truncated {
        offset: u64,
        needed: u64,
        available: u64,
    },

    /// Lazy array access past its last element.
    #[error("Index {index} out of range for {len} elements")]
    IndexOutOfRange { index: i64, len: usize },

    /// Schema-authoring error: a name or value was declared twice.
    #[error("Duplicate definition in {scope}: {name}")]
    DuplicateDefinition { scope: String, name: String },

    /// A record was asked for a field its schema lacks, or a schema refers to one it
    /// has not declared yet.
    #[error("Unknown field {field} in {schema}")]
    UnknownField { schema: String, field: String },

    /// A pointer chain in target memory is inconsistent.
    #[error("Chain broken at {address:#x}: {message}")]
    ChainBroken { address: u64, message: String },

    /// Memory-mapping errors
    #[error("I/O error: {0}")]
    Io(#[from] crate::io::error::IoError),

    /// Configuration could not be parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

impl StructerError {
    pub(crate) fn violation(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::SchemaViolation {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub(crate) fn truncated(offset: usize, needed: usize, len: usize) -> Self {
        Self::Truncated {
            offset: offset as u64,
            needed: needed as u64,
            available: len.saturating_sub(offset) as u64,
        }
    }

    /// Qualify a bare field name in a violation with the schema it belongs to.
    pub(crate) fn within(self, schema: &str) -> Self {
        match self {
            Self::SchemaViolation {
                field,
                expected,
                actual,
            } if !field.contains('.') => Self::SchemaViolation {
                field: format!("{}.{}", schema, field),
                expected,
                actual,
            },
            other => other,
        }
    }

    /// True for errors a schema layer may read as "structure absent".
    pub fn is_absence(&self) -> bool {
        matches!(self, Self::AddressNotMapped { .. })
    }
}

/// Result type alias for structer operations
pub type Result<T> = std::result::Result<T, StructerError>;

/// Borrow `len` bytes at `offset`, or fail with [`StructerError::Truncated`].
pub(crate) fn slice_at(buf: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    offset
        .checked_add(len)
        .and_then(|end| buf.get(offset..end))
        .ok_or_else(|| StructerError::truncated(offset, len, buf.len()))
}
