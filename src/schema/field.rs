//! Leaf decoders.
//!
//! A [`Field`] either has a width known from the schema parameters alone (integers, byte
//! strings, enumerations, ...) or computes its extent from the buffer and the running offset
//! (padding, length-prefixed strings, payloads, the rest of the region). Fixed fields decode
//! from a slice of exactly their width; variable fields decode from `(buffer, offset)` and
//! report how many bytes they consumed.
//!
//! "Text" throughout means the bytes up to the first NUL, decoded as UTF-8 with invalid
//! sequences replaced.

use crate::error::{slice_at, Result, StructerError};
use crate::schema::enums::{EnumBase, EnumDomain, RawValue, Symbol};
use crate::schema::params::{IntKind, Params};
use chrono::{DateTime, Utc};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// A decoded field.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    /// Reserved or padding bytes; carries no information.
    Null,
    Uint(u64),
    Int(i64),
    /// Fixed-width byte string; displayed as lowercase hex.
    Bytes(&'a [u8]),
    Text(Cow<'a, str>),
    Symbol(Symbol),
    Time(DateTime<Utc>),
    /// A sub-region of the buffer handed on to nested decoders.
    Slice(&'a [u8]),
}

impl<'a> Value<'a> {
    /// Integer view; symbols yield their underlying value.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Uint(v) => Some(*v),
            Value::Int(v) => u64::try_from(*v).ok(),
            Value::Symbol(s) => s.value(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Uint(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&'a [u8]> {
        match self {
            Value::Bytes(b) | Value::Slice(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self {
            Value::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Time(t) => Some(*t),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("-"),
            Value::Uint(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Bytes(b) => f.write_str(&hex::encode(b)),
            Value::Text(t) => f.write_str(t),
            Value::Symbol(s) => write!(f, "{}", s),
            Value::Time(t) => write!(f, "{}", t.to_rfc3339()),
            Value::Slice(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

/// How many bytes a [`Field::Sized`] consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extent {
    /// Known when the schema is built.
    Bytes(usize),
    /// The value of an earlier field of the same record, times `scale`.
    Field { name: String, scale: usize },
}

/// Where a timestamp's seconds come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeEncoding {
    Int(IntKind),
    Ascii { len: usize, radix: u32 },
}

/// A decoding rule for one named field.
#[derive(Debug, Clone)]
pub enum Field {
    Int(IntKind),
    /// Byte string of fixed width.
    Bytes(usize),
    /// Fixed width, truncated at the first NUL, decoded as text.
    CString(usize),
    /// Reserved bytes that must all be zero.
    Nulls(usize),
    /// A fixed pattern that must match exactly.
    Magic(Cow<'static, [u8]>),
    /// ASCII digits in `radix`, e.g. cpio's eight hex characters.
    AsciiInt { len: usize, radix: u32 },
    /// Seconds since the epoch.
    Timestamp(TimeEncoding),
    /// Translated through a domain.
    Enum(Arc<EnumDomain>),
    /// A domain of accepted constants; anything else breaks the layout.
    Constant(Arc<EnumDomain>),
    /// Zero bytes up to the next multiple of the alignment.
    Pad(usize),
    /// Integer length prefix followed by that many bytes of text.
    PString(IntKind),
    /// A payload whose length is not found at its own position.
    Sized { extent: Extent, text: bool },
    /// NUL-terminated text of unknown length; the terminator is consumed.
    Terminated,
    /// Everything left in the visible region.
    Tail,
}

impl Field {
    pub fn int(kind: IntKind) -> Self {
        Field::Int(kind)
    }

    pub fn u8() -> Self {
        Field::Int(IntKind::U8)
    }

    pub fn u16() -> Self {
        Field::Int(IntKind::U16)
    }

    pub fn u32() -> Self {
        Field::Int(IntKind::U32)
    }

    pub fn u64() -> Self {
        Field::Int(IntKind::U64)
    }

    /// Native-width unsigned word.
    pub fn word() -> Self {
        Field::Int(IntKind::WORD)
    }

    pub fn bytes(len: usize) -> Self {
        Field::Bytes(len)
    }

    pub fn cstring(len: usize) -> Self {
        Field::CString(len)
    }

    pub fn nulls(len: usize) -> Self {
        Field::Nulls(len)
    }

    pub fn magic(pattern: &'static [u8]) -> Self {
        Field::Magic(Cow::Borrowed(pattern))
    }

    pub fn ascii_int(len: usize, radix: u32) -> Self {
        Field::AsciiInt { len, radix }
    }

    pub fn timestamp(encoding: TimeEncoding) -> Self {
        Field::Timestamp(encoding)
    }

    pub fn enumerated(domain: &Arc<EnumDomain>) -> Self {
        Field::Enum(Arc::clone(domain))
    }

    /// Like [`Field::enumerated`], but an unlisted value is a [`StructerError::SchemaViolation`]
    /// naming the field. For magic numbers and format versions.
    pub fn constant(domain: &Arc<EnumDomain>) -> Self {
        Field::Constant(Arc::clone(domain))
    }

    pub fn pad(align: usize) -> Self {
        Field::Pad(align.max(1))
    }

    pub fn pstring(prefix: IntKind) -> Self {
        Field::PString(prefix)
    }

    /// Raw payload of a size fixed when the schema is built.
    pub fn payload(len: usize) -> Self {
        Field::Sized {
            extent: Extent::Bytes(len),
            text: false,
        }
    }

    /// Raw payload of `scale` bytes per unit counted by the earlier field `name`.
    pub fn payload_from(name: &str, scale: usize) -> Self {
        Field::Sized {
            extent: Extent::Field {
                name: name.to_string(),
                scale,
            },
            text: false,
        }
    }

    /// Text whose byte length is the value of the earlier field `name`.
    pub fn text_from(name: &str) -> Self {
        Field::Sized {
            extent: Extent::Field {
                name: name.to_string(),
                scale: 1,
            },
            text: true,
        }
    }

    pub fn terminated() -> Self {
        Field::Terminated
    }

    pub fn tail() -> Self {
        Field::Tail
    }

    /// Width in bytes, if it can be known without looking at data.
    pub fn fixed_width(&self, params: Params) -> Option<usize> {
        match self {
            Field::Int(kind) => Some(kind.width(params)),
            Field::Bytes(len) | Field::CString(len) | Field::Nulls(len) => Some(*len),
            Field::Magic(pattern) => Some(pattern.len()),
            Field::AsciiInt { len, .. } => Some(*len),
            Field::Timestamp(TimeEncoding::Int(kind)) => Some(kind.width(params)),
            Field::Timestamp(TimeEncoding::Ascii { len, .. }) => Some(*len),
            Field::Enum(domain) | Field::Constant(domain) => Some(match domain.base() {
                EnumBase::Int(kind) => kind.width(params),
                EnumBase::Bytes(len) => len,
            }),
            Field::Pad(_)
            | Field::PString(_)
            | Field::Sized { .. }
            | Field::Terminated
            | Field::Tail => None,
        }
    }

    /// Name of the earlier field this one takes its size from.
    pub(crate) fn depends_on(&self) -> Option<&str> {
        match self {
            Field::Sized {
                extent: Extent::Field { name, .. },
                ..
            } => Some(name),
            _ => None,
        }
    }

    /// Decode a fixed field from a slice of exactly its width.
    pub fn decode_fixed<'a>(
        &self,
        name: &str,
        bytes: &'a [u8],
        params: Params,
    ) -> Result<Value<'a>> {
        Ok(match self {
            Field::Int(kind) => kind.read(bytes, params),
            Field::Bytes(_) => Value::Bytes(bytes),
            Field::CString(_) => Value::Text(text(bytes)),
            Field::Nulls(_) => {
                if bytes.iter().any(|&b| b != 0) {
                    return Err(StructerError::violation(
                        name,
                        hex::encode(vec![0u8; bytes.len()]),
                        hex::encode(bytes),
                    ));
                }
                Value::Null
            }
            Field::Magic(pattern) => {
                if bytes != pattern.as_ref() {
                    return Err(StructerError::violation(
                        name,
                        hex::encode(pattern),
                        hex::encode(bytes),
                    ));
                }
                Value::Bytes(bytes)
            }
            Field::AsciiInt { radix, .. } => Value::Uint(parse_ascii(name, bytes, *radix)?),
            Field::Timestamp(encoding) => {
                let seconds = match encoding {
                    TimeEncoding::Int(kind) => match kind.read(bytes, params) {
                        Value::Int(v) => v,
                        other => other.as_i64().unwrap_or(i64::MAX),
                    },
                    TimeEncoding::Ascii { radix, .. } => {
                        let raw = parse_ascii(name, bytes, *radix)?;
                        i64::try_from(raw).unwrap_or(i64::MAX)
                    }
                };
                let time = DateTime::from_timestamp(seconds, 0).ok_or_else(|| {
                    StructerError::violation(name, "representable timestamp", seconds.to_string())
                })?;
                Value::Time(time)
            }
            Field::Enum(domain) => Value::Symbol(domain.resolve(raw_value(domain, bytes, params))?),
            Field::Constant(domain) => {
                let raw = raw_value(domain, bytes, params);
                match domain.resolve(raw.clone()) {
                    Ok(symbol) => Value::Symbol(symbol),
                    Err(_) => {
                        let expected: Vec<String> =
                            domain.members().map(|(_, v)| v.to_string()).collect();
                        return Err(StructerError::violation(
                            name,
                            expected.join(" or "),
                            raw.to_string(),
                        ));
                    }
                }
            }
            Field::Pad(_)
            | Field::PString(_)
            | Field::Sized { .. }
            | Field::Terminated
            | Field::Tail => {
                return Err(StructerError::violation(
                    name,
                    "fixed-width field",
                    "variable-width field",
                ))
            }
        })
    }

    /// Decode at `offset` within `buf`, returning the value and the bytes consumed.
    ///
    /// `prior` answers the integer value of fields decoded earlier in the same record.
    pub fn decode_at<'a>(
        &self,
        name: &str,
        buf: &'a [u8],
        offset: usize,
        params: Params,
        prior: &dyn Fn(&str) -> Option<u64>,
    ) -> Result<(Value<'a>, usize)> {
        match self {
            Field::Pad(align) => {
                let len = (align - offset % align) % align;
                let bytes = slice_at(buf, offset, len)?;
                Field::Nulls(len).decode_fixed(name, bytes, params)?;
                Ok((Value::Null, len))
            }
            Field::PString(prefix) => {
                let width = prefix.width(params);
                let len = prefix.read_bits(slice_at(buf, offset, width)?, params);
                let len = usize::try_from(len)
                    .map_err(|_| StructerError::truncated(offset, usize::MAX, buf.len()))?;
                let bytes = slice_at(buf, offset + width, len)?;
                Ok((Value::Text(text(bytes)), width + len))
            }
            Field::Sized { extent, text: as_text } => {
                let len = match extent {
                    Extent::Bytes(len) => *len,
                    Extent::Field { name: source, scale } => {
                        let count = prior(source).ok_or_else(|| {
                            let expected = format!("integer field {}", source);
                            StructerError::violation(name, expected, "none")
                        })?;
                        usize::try_from(count)
                            .ok()
                            .and_then(|c| c.checked_mul(*scale))
                            .ok_or_else(|| {
                                StructerError::truncated(offset, usize::MAX, buf.len())
                            })?
                    }
                };
                let bytes = slice_at(buf, offset, len)?;
                let value = if *as_text {
                    Value::Text(text(bytes))
                } else {
                    Value::Slice(bytes)
                };
                Ok((value, len))
            }
            Field::Terminated => {
                let rest = buf
                    .get(offset..)
                    .ok_or_else(|| StructerError::truncated(offset, 1, buf.len()))?;
                let end = memchr::memchr(0, rest)
                    .ok_or_else(|| StructerError::truncated(offset, rest.len() + 1, buf.len()))?;
                Ok((Value::Text(String::from_utf8_lossy(&rest[..end])), end + 1))
            }
            Field::Tail => {
                let rest = buf
                    .get(offset..)
                    .ok_or_else(|| StructerError::truncated(offset, 0, buf.len()))?;
                Ok((Value::Slice(rest), rest.len()))
            }
            fixed => {
                let width = fixed.fixed_width(params).unwrap_or_default();
                let bytes = slice_at(buf, offset, width)?;
                Ok((fixed.decode_fixed(name, bytes, params)?, width))
            }
        }
    }
}

/// Bytes up to the first NUL as text.
pub(crate) fn text(bytes: &[u8]) -> Cow<'_, str> {
    let end = memchr::memchr(0, bytes).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end])
}

fn raw_value(domain: &EnumDomain, bytes: &[u8], params: Params) -> RawValue {
    match domain.base() {
        EnumBase::Int(kind) => RawValue::Int(kind.read_bits(bytes, params)),
        EnumBase::Bytes(_) => RawValue::from(bytes),
    }
}

fn parse_ascii(name: &str, bytes: &[u8], radix: u32) -> Result<u64> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| u64::from_str_radix(s.trim_matches(|c| c == ' ' || c == '\0'), radix).ok())
        .ok_or_else(|| {
            StructerError::violation(
                name,
                format!("base-{} digits", radix),
                String::from_utf8_lossy(bytes).into_owned(),
            )
        })
}
