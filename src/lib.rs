//! Declarative decoding of binary container formats.
//!
//! Layouts are described once as [`schema::Schema`] values and decoded zero-copy over borrowed
//! buffers. [`intervals::IntervalIndex`] translates virtual addresses to file offsets, and
//! [`formats`] instantiates the engine for ELF images and core dumps, RPM packages and cpio
//! archives.

pub mod config;
pub mod error;
pub mod formats;
pub mod intervals;
pub mod io;
pub mod logging;
pub mod schema;

pub use config::{IoConfig, StructerConfig, WalkLimits};
pub use error::{Result, StructerError};
pub use intervals::{IntervalIndex, Span};
