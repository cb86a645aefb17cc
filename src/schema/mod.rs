//! The schema-driven decoding engine.
//!
//! Leaf [`Field`] descriptors are grouped into a [`Schema`], which decodes [`Record`]s
//! straight out of a borrowed buffer. Repeated structures are exposed through the lazy
//! [`StructArray`] and [`VarArray`], and integer codes are translated through
//! [`EnumDomain`]s.

pub mod array;
pub mod enums;
pub mod field;
pub mod params;
pub mod record;

pub use array::{strings, Element, FieldElement, StructArray, VarArray, VarIntoIter, VarIter};
pub use enums::{EnumBase, EnumDomain, EnumFamily, EnumInput, RawValue, Symbol};
pub use field::{Extent, Field, TimeEncoding, Value};
pub use params::{ByteOrder, IntKind, IntWidth, Params, WordSize};
pub use record::{Record, Schema, SchemaBuilder};
