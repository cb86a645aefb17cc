//! Sparse address → buffer offset index.
//!
//! Built once per address space from the loadable segments of an image. Spans contiguous in
//! both address and buffer offset are merged into one run, and the runs are stored as three
//! parallel sorted columns so memory tracks the segment count rather than the address range.

use crate::error::{Result, StructerError};
use once_cell::sync::OnceCell;
use std::fmt;
use tracing::debug;

/// One contiguous mapped range: `length` bytes at virtual `address`, found at `start` in the
/// buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub address: u64,
    pub start: u64,
    pub length: u64,
}

impl Span {
    pub fn new(address: u64, start: u64, length: u64) -> Self {
        Self {
            address,
            start,
            length,
        }
    }

    /// Buffer offset just past the span.
    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.length)
    }

    fn address_end(&self) -> u64 {
        self.address.saturating_add(self.length)
    }

    /// True when `next` continues this span in both axes.
    fn joins(&self, next: &Span) -> bool {
        next.address.wrapping_sub(self.address) == self.length
            && self.start.checked_add(self.length) == Some(next.start)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:#x}..{:#x} @ {:#x}",
            self.address,
            self.address_end(),
            self.start
        )
    }
}

/// Merge contiguous neighbours of an address-sorted run of spans.
pub fn coalesce(spans: &[Span]) -> Vec<Span> {
    let mut merged: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        if let Some(last) = merged.last_mut().filter(|last| last.joins(span)) {
            if let Some(length) = last.length.checked_add(span.length) {
                last.length = length;
                continue;
            }
        }
        merged.push(*span);
    }
    merged
}

/// Point lookup over coalesced spans.
#[derive(Debug, Default)]
pub struct IntervalIndex {
    addresses: Vec<u64>,
    starts: Vec<u64>,
    lengths: Vec<u64>,
    end: OnceCell<u64>,
}

impl IntervalIndex {
    /// Sort and coalesce `spans`. Empty spans are dropped; spans overlapping in address,
    /// including two beginning at the same address, are rejected, as are spans whose end
    /// does not fit in a `u64` on either axis.
    pub fn new(spans: impl IntoIterator<Item = Span>) -> Result<Self> {
        let mut spans: Vec<Span> = spans.into_iter().filter(|s| s.length > 0).collect();
        if let Some(bad) = spans.iter().find(|s| {
            s.start.checked_add(s.length).is_none() || s.address.checked_add(s.length).is_none()
        }) {
            return Err(StructerError::violation(
                "IntervalIndex",
                "span ending below 2^64",
                bad.to_string(),
            ));
        }
        spans.sort_unstable();

        for pair in spans.windows(2) {
            let (low, high) = (&pair[0], &pair[1]);
            if high.address < low.address_end() {
                return Err(StructerError::violation(
                    "IntervalIndex",
                    format!("span starting at or after {:#x}", low.address_end()),
                    high.to_string(),
                ));
            }
        }

        let merged = coalesce(&spans);
        debug!(spans = spans.len(), runs = merged.len(), "Built interval index");

        Ok(Self {
            addresses: merged.iter().map(|s| s.address).collect(),
            starts: merged.iter().map(|s| s.start).collect(),
            lengths: merged.iter().map(|s| s.length).collect(),
            end: OnceCell::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    fn span(&self, index: usize) -> Span {
        Span::new(
            self.addresses[index],
            self.starts[index],
            self.lengths[index],
        )
    }

    /// The coalesced run containing `address`.
    pub fn entry(&self, address: u64) -> Result<Span> {
        let index = self.addresses.partition_point(|&a| a <= address);
        let entry = index
            .checked_sub(1)
            .map(|i| self.span(i))
            .ok_or(StructerError::AddressNotMapped { address })?;
        if address - entry.address > entry.length {
            return Err(StructerError::AddressNotMapped { address });
        }
        Ok(entry)
    }

    /// Span beginning exactly at `address` and running to the end of its run.
    ///
    /// The address one past the end of a run still resolves, with zero length remaining.
    pub fn get(&self, address: u64) -> Result<Span> {
        let entry = self.entry(address)?;
        // `new` guarantees `start + length` fits, and `delta <= length`.
        let delta = address - entry.address;
        Ok(Span::new(address, entry.start + delta, entry.length - delta))
    }

    pub fn contains(&self, address: u64) -> bool {
        self.entry(address).is_ok()
    }

    /// Buffer offset just past the furthest run. Offsets need not follow address order.
    pub fn end(&self) -> u64 {
        *self.end.get_or_init(|| {
            self.starts
                .iter()
                .zip(&self.lengths)
                .map(|(start, length)| start.saturating_add(*length))
                .max()
                .unwrap_or(0)
        })
    }

    /// Runs in address order.
    pub fn iter(&self) -> impl Iterator<Item = Span> + '_ {
        (0..self.len()).map(move |i| self.span(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> IntervalIndex {
        IntervalIndex::new([
            Span::new(0x2000, 0x500, 0x50),
            Span::new(0x1100, 0x100, 0x100),
            Span::new(0x1000, 0, 0x100),
        ])
        .unwrap()
    }

    #[test]
    fn test_contiguous_spans_merge() {
        let index = scenario();
        let runs: Vec<Span> = index.iter().collect();
        assert_eq!(
            runs,
            vec![Span::new(0x1000, 0, 0x200), Span::new(0x2000, 0x500, 0x50)]
        );
    }

    #[test]
    fn test_lookup_anchors_at_address() {
        let index = scenario();
        assert_eq!(index.get(0x1050).unwrap(), Span::new(0x1050, 0x50, 0x1b0));
        assert!(matches!(
            index.get(0x1fff),
            Err(StructerError::AddressNotMapped { address: 0x1fff })
        ));
        assert!(index.get(0xfff).is_err());
        assert!(index.get(0x2051).is_err());
    }

    #[test]
    fn test_one_past_end_resolves_empty() {
        let index = scenario();
        assert_eq!(index.get(0x1200).unwrap().length, 0);
        assert!(index.contains(0x2050));
    }

    #[test]
    fn test_gap_in_offsets_blocks_merge() {
        let index =
            IntervalIndex::new([Span::new(0x1000, 0, 0x100), Span::new(0x1100, 0x180, 0x100)])
                .unwrap();
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_end_ignores_address_order() {
        let index =
            IntervalIndex::new([Span::new(0x1000, 0x900, 0x100), Span::new(0x8000, 0x40, 0x10)])
                .unwrap();
        assert_eq!(index.end(), 0xa00);
        assert_eq!(IntervalIndex::default().end(), 0);
    }

    #[test]
    fn test_overlapping_spans_rejected() {
        let same_address =
            IntervalIndex::new([Span::new(0x1000, 0, 0x10), Span::new(0x1000, 0x40, 0x10)]);
        assert!(matches!(
            same_address,
            Err(StructerError::SchemaViolation { .. })
        ));
        let overlap =
            IntervalIndex::new([Span::new(0x1000, 0, 0x20), Span::new(0x1010, 0x40, 0x10)]);
        assert!(overlap.is_err());
    }

    #[test]
    fn test_spans_past_u64_rejected() {
        for span in [
            Span::new(0x1000, u64::MAX - 0x10, 0x100),
            Span::new(u64::MAX - 0x10, 0, 0x100),
        ] {
            assert!(matches!(
                IntervalIndex::new([span]),
                Err(StructerError::SchemaViolation { ref field, .. }) if field == "IntervalIndex"
            ));
        }

        let index = IntervalIndex::new([Span::new(0x1000, u64::MAX - 0x100, 0x100)]).unwrap();
        assert_eq!(index.end(), u64::MAX);
        assert_eq!(index.get(0x1080).unwrap().start, u64::MAX - 0x80);
    }

    #[test]
    fn test_coalesce_stops_at_length_overflow() {
        let half = 1u64 << 63;
        let spans = [Span::new(0, 0, half), Span::new(half, half, half)];
        assert_eq!(coalesce(&spans).len(), 2);
    }

    #[test]
    fn test_coalesce_is_idempotent() {
        let spans = [
            Span::new(0x0, 0x0, 0x10),
            Span::new(0x10, 0x10, 0x10),
            Span::new(0x30, 0x20, 0x10),
            Span::new(0x40, 0x30, 0x8),
        ];
        let once = coalesce(&spans);
        assert_eq!(once.len(), 2);
        assert_eq!(coalesce(&once), once);
    }

    #[test]
    fn test_affine_relation_preserved() {
        let index = scenario();
        for address in (0x1000..=0x1200).step_by(0x17).chain(0x2000..0x2050) {
            let span = index.get(address).unwrap();
            let entry = index.entry(address).unwrap();
            assert_eq!(
                span.start.wrapping_sub(span.address),
                entry.start.wrapping_sub(entry.address)
            );
        }
    }
}
