//! Schema instances for concrete container formats.
//!
//! Each format declares its enumeration catalogs and record layouts once per process and
//! exposes a typed view over a borrowed buffer.

/// Declare a lazily built, process-wide catalog entry.
///
/// The builder runs on first use; a builder error is returned to every caller until one
/// succeeds.
macro_rules! catalog {
    ($(#[$meta:meta])* $vis:vis fn $name:ident() -> $ty:ty $build:block) => {
        $(#[$meta])*
        $vis fn $name() -> $crate::error::Result<&'static $ty> {
            static CELL: ::once_cell::sync::OnceCell<$ty> = ::once_cell::sync::OnceCell::new();
            CELL.get_or_try_init(|| $build)
        }
    };
}

pub mod cpio;
pub mod elf;
pub mod rpm;

/// Expand `(first_value, names)` runs into consecutive `(name, value)` members.
pub(crate) fn members(runs: &[(u64, &[&'static str])]) -> Vec<(&'static str, u64)> {
    runs.iter()
        .flat_map(|(first, names)| names.iter().zip(*first..).map(|(name, v)| (*name, v)))
        .collect()
}
