//! Closed symbolic domains over integers or fixed byte patterns.
//!
//! A domain is built once, validated for duplicate names and values, and shared behind an
//! `Arc`. Decoding a value yields a [`Symbol`]: a cheap handle naming one member. Domains can
//! be extended for a context (an architecture, a note owner); the extension resolves both its
//! own members and every member of the base.

use crate::error::{Result, StructerError};
use crate::schema::params::IntKind;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The underlying value of an enumeration member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RawValue {
    Int(u64),
    Bytes(Vec<u8>),
}

impl RawValue {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            RawValue::Int(v) => Some(*v),
            RawValue::Bytes(_) => None,
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Int(v) => write!(f, "{:#x}", v),
            RawValue::Bytes(b) => f.write_str(&hex::encode(b)),
        }
    }
}

impl From<u64> for RawValue {
    fn from(v: u64) -> Self {
        RawValue::Int(v)
    }
}

impl From<&[u8]> for RawValue {
    fn from(v: &[u8]) -> Self {
        RawValue::Bytes(v.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for RawValue {
    fn from(v: &[u8; N]) -> Self {
        RawValue::Bytes(v.to_vec())
    }
}

/// Storage type a domain decodes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumBase {
    Int(IntKind),
    Bytes(usize),
}

/// A closed name/value mapping.
#[derive(Debug)]
pub struct EnumDomain {
    name: String,
    /// Name of the domain this one was extended from, or its own name.
    family: String,
    base: EnumBase,
    members: Vec<(String, RawValue)>,
    by_value: HashMap<RawValue, usize>,
    by_name: HashMap<String, usize>,
}

impl EnumDomain {
    /// Build a domain, rejecting duplicate names or values.
    pub fn new<N, V, I>(name: &str, base: EnumBase, members: I) -> Result<Arc<Self>>
    where
        N: Into<String>,
        V: Into<RawValue>,
        I: IntoIterator<Item = (N, V)>,
    {
        let mut domain = EnumDomain {
            name: name.to_string(),
            family: name.to_string(),
            base,
            members: Vec::new(),
            by_value: HashMap::new(),
            by_name: HashMap::new(),
        };
        domain.insert_all(members)?;
        Ok(Arc::new(domain))
    }

    /// Integer domain from `(name, value)` pairs.
    pub fn ints(name: &str, kind: IntKind, members: &[(&str, u64)]) -> Result<Arc<Self>> {
        Self::new(name, EnumBase::Int(kind), members.iter().copied())
    }

    /// Byte-pattern domain; every pattern must be exactly `len` bytes.
    pub fn patterns(name: &str, len: usize, members: &[(&str, &[u8])]) -> Result<Arc<Self>> {
        if let Some((member, pattern)) = members.iter().find(|(_, p)| p.len() != len) {
            return Err(StructerError::violation(
                format!("{}.{}", name, member),
                format!("{} byte pattern", len),
                format!("{} bytes", pattern.len()),
            ));
        }
        Self::new(name, EnumBase::Bytes(len), members.iter().copied())
    }

    /// A domain scoped to `context` that sees the base members plus `extra`.
    pub fn extend<N, V, I>(self: &Arc<Self>, context: &str, extra: I) -> Result<Arc<Self>>
    where
        N: Into<String>,
        V: Into<RawValue>,
        I: IntoIterator<Item = (N, V)>,
    {
        let mut domain = EnumDomain {
            name: format!("{}[{}]", self.name, context),
            family: self.family.clone(),
            base: self.base,
            members: self.members.clone(),
            by_value: self.by_value.clone(),
            by_name: self.by_name.clone(),
        };
        domain.insert_all(extra)?;
        Ok(Arc::new(domain))
    }

    fn insert_all<N, V, I>(&mut self, members: I) -> Result<()>
    where
        N: Into<String>,
        V: Into<RawValue>,
        I: IntoIterator<Item = (N, V)>,
    {
        for (name, value) in members {
            let (name, value) = (name.into(), value.into());
            if self.by_name.contains_key(&name) {
                return Err(StructerError::DuplicateDefinition {
                    scope: self.name.clone(),
                    name,
                });
            }
            if self.by_value.contains_key(&value) {
                return Err(StructerError::DuplicateDefinition {
                    scope: self.name.clone(),
                    name: format!("{} = {}", name, value),
                });
            }
            let index = self.members.len();
            self.by_value.insert(value.clone(), index);
            self.by_name.insert(name.clone(), index);
            self.members.push((name, value));
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> EnumBase {
        self.base
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Look up the member whose underlying value is `raw`.
    pub fn resolve(self: &Arc<Self>, raw: impl Into<RawValue>) -> Result<Symbol> {
        let raw = raw.into();
        match self.by_value.get(&raw) {
            Some(&index) => Ok(Symbol {
                domain: Arc::clone(self),
                index,
            }),
            None => Err(StructerError::UnrecognizedEnumValue {
                domain: self.name.clone(),
                value: raw.to_string(),
            }),
        }
    }

    /// Look up a member by its symbolic name.
    pub fn by_name(self: &Arc<Self>, name: &str) -> Result<Symbol> {
        match self.by_name.get(name) {
            Some(&index) => Ok(Symbol {
                domain: Arc::clone(self),
                index,
            }),
            None => Err(StructerError::UnrecognizedEnumValue {
                domain: self.name.clone(),
                value: name.to_string(),
            }),
        }
    }

    /// Accept an existing member unchanged, otherwise resolve a raw value.
    pub fn coerce(self: &Arc<Self>, input: impl Into<EnumInput>) -> Result<Symbol> {
        match input.into() {
            EnumInput::Symbol(symbol) if self.contains(&symbol) => Ok(symbol),
            EnumInput::Symbol(symbol) => self.resolve(symbol.raw().clone()),
            EnumInput::Raw(raw) => self.resolve(raw),
        }
    }

    /// True when `symbol` names a member of this domain (including inherited members).
    pub fn contains(&self, symbol: &Symbol) -> bool {
        symbol.domain.family == self.family
            && self
                .by_name
                .get(symbol.name())
                .is_some_and(|&i| self.members[i].1 == *symbol.raw())
    }

    pub fn members(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.members.iter().map(|(n, v)| (n.as_str(), v))
    }
}

/// Input accepted by [`EnumDomain::coerce`].
pub enum EnumInput {
    Symbol(Symbol),
    Raw(RawValue),
}

impl From<Symbol> for EnumInput {
    fn from(s: Symbol) -> Self {
        EnumInput::Symbol(s)
    }
}

impl From<RawValue> for EnumInput {
    fn from(r: RawValue) -> Self {
        EnumInput::Raw(r)
    }
}

impl From<u64> for EnumInput {
    fn from(v: u64) -> Self {
        EnumInput::Raw(RawValue::Int(v))
    }
}

/// One member of a domain.
#[derive(Clone)]
pub struct Symbol {
    domain: Arc<EnumDomain>,
    index: usize,
}

impl Symbol {
    pub fn name(&self) -> &str {
        &self.domain.members[self.index].0
    }

    pub fn raw(&self) -> &RawValue {
        &self.domain.members[self.index].1
    }

    /// Underlying integer, if the domain is integer based.
    pub fn value(&self) -> Option<u64> {
        self.raw().as_u64()
    }

    pub fn domain(&self) -> &Arc<EnumDomain> {
        &self.domain
    }

    /// True when this symbol is the member `name`.
    pub fn is(&self, name: &str) -> bool {
        self.name() == name
    }
}

// Members compare by family, name and value so that a symbol decoded through an extended
// domain equals the same member decoded through its base.
impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.domain.family == other.domain.family
            && self.name() == other.name()
            && self.raw() == other.raw()
    }
}

impl Eq for Symbol {}

impl std::hash::Hash for Symbol {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.domain.family.hash(state);
        self.raw().hash(state);
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.domain.name, self.name())
    }
}

/// A base domain plus per-context extensions.
#[derive(Debug, Clone)]
pub struct EnumFamily {
    base: Arc<EnumDomain>,
    contexts: HashMap<String, Arc<EnumDomain>>,
}

impl EnumFamily {
    pub fn new(base: Arc<EnumDomain>) -> Self {
        Self {
            base,
            contexts: HashMap::new(),
        }
    }

    /// Register an extension of the base for `context`.
    pub fn with_context(mut self, context: &str, extra: &[(&str, u64)]) -> Result<Self> {
        if self.contexts.contains_key(context) {
            return Err(StructerError::DuplicateDefinition {
                scope: self.base.name().to_string(),
                name: context.to_string(),
            });
        }
        let domain = self.base.extend(context, extra.iter().copied())?;
        self.contexts.insert(context.to_string(), domain);
        Ok(self)
    }

    /// Make `alias` resolve to the same domain as `context`.
    pub fn with_alias(mut self, alias: &str, context: &str) -> Result<Self> {
        let domain = self
            .contexts
            .get(context)
            .cloned()
            .ok_or_else(|| StructerError::UnrecognizedEnumValue {
                domain: self.base.name().to_string(),
                value: context.to_string(),
            })?;
        if self.contexts.insert(alias.to_string(), domain).is_some() {
            return Err(StructerError::DuplicateDefinition {
                scope: self.base.name().to_string(),
                name: alias.to_string(),
            });
        }
        Ok(self)
    }

    pub fn base(&self) -> &Arc<EnumDomain> {
        &self.base
    }

    /// The domain registered for `context`, if any.
    pub fn context(&self, context: &str) -> Option<&Arc<EnumDomain>> {
        self.contexts.get(context)
    }

    /// The domain for `context`, falling back to the base.
    pub fn for_context(&self, context: &str) -> &Arc<EnumDomain> {
        self.contexts.get(context).unwrap_or(&self.base)
    }
}
