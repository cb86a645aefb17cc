//! Lazily decoded arrays over a buffer region.
//!
//! [`StructArray`] holds fixed-width elements: length and element offsets are plain arithmetic
//! and nothing is decoded until asked for. [`VarArray`] holds variable-width elements: the
//! start offset of each element is discovered by decoding its predecessor, so offsets are
//! cached as they are found and the cache only ever grows.

use crate::error::{Result, StructerError};
use crate::schema::field::{Field, Value};
use crate::schema::params::Params;
use crate::schema::record::{Record, Schema};
use std::cell::RefCell;
use std::ops::{Bound, RangeBounds};
use tracing::{debug, trace};

/// Something an array can decode repeatedly.
pub trait Element<'a> {
    type Item;

    fn name(&self) -> &str;

    /// Width shared by every element, when there is one.
    fn fixed_width(&self) -> Option<usize>;

    /// Decode one element at `offset`, returning it and the bytes consumed.
    fn decode_at(&self, buf: &'a [u8], offset: usize) -> Result<(Self::Item, usize)>;
}

impl<'a> Element<'a> for Schema {
    type Item = Record<'a>;

    fn name(&self) -> &str {
        Schema::name(self)
    }

    fn fixed_width(&self) -> Option<usize> {
        Schema::fixed_width(self)
    }

    fn decode_at(&self, buf: &'a [u8], offset: usize) -> Result<(Record<'a>, usize)> {
        let record = Schema::decode_at(self, buf, offset)?;
        let len = record.len();
        Ok((record, len))
    }
}

/// A bare field used as an array element, e.g. a table of words or strings.
#[derive(Debug, Clone)]
pub struct FieldElement {
    name: String,
    field: Field,
    params: Params,
}

impl FieldElement {
    pub fn new(name: &str, field: Field, params: Params) -> Self {
        Self {
            name: name.to_string(),
            field,
            params,
        }
    }
}

impl<'a> Element<'a> for FieldElement {
    type Item = Value<'a>;

    fn name(&self) -> &str {
        &self.name
    }

    fn fixed_width(&self) -> Option<usize> {
        self.field.fixed_width(self.params)
    }

    fn decode_at(&self, buf: &'a [u8], offset: usize) -> Result<(Value<'a>, usize)> {
        self.field
            .decode_at(&self.name, buf, offset, self.params, &|_: &str| None)
    }
}

fn normalize(index: isize, len: usize) -> Option<usize> {
    if index < 0 {
        len.checked_sub(index.unsigned_abs())
    } else {
        Some(index as usize).filter(|&i| i < len)
    }
}

fn clamp(index: isize, len: usize) -> usize {
    if index < 0 {
        len.saturating_sub(index.unsigned_abs())
    } else {
        (index as usize).min(len)
    }
}

/// Fixed-width elements packed back to back.
#[derive(Debug, Clone)]
pub struct StructArray<'a, E> {
    element: E,
    region: &'a [u8],
    width: usize,
}

impl<'a, E: Element<'a> + Clone> StructArray<'a, E> {
    /// View `region` as consecutive elements. The region must hold a whole number of them.
    pub fn new(element: E, region: &'a [u8]) -> Result<Self> {
        let width = match element.fixed_width() {
            Some(0) | None => {
                return Err(StructerError::violation(
                    element.name(),
                    "non-empty fixed-width element",
                    "variable or empty element",
                ))
            }
            Some(width) => width,
        };
        if region.len() % width != 0 {
            return Err(StructerError::violation(
                element.name(),
                format!("multiple of {} bytes", width),
                format!("{} bytes", region.len()),
            ));
        }
        Ok(Self {
            element,
            region,
            width,
        })
    }

    pub fn len(&self) -> usize {
        self.region.len() / self.width
    }

    pub fn is_empty(&self) -> bool {
        self.region.is_empty()
    }

    pub fn element_width(&self) -> usize {
        self.width
    }

    /// Element `index`; negative indices count from the end.
    pub fn get(&self, index: isize) -> Result<E::Item> {
        let len = self.len();
        let i = normalize(index, len).ok_or(StructerError::IndexOutOfRange {
            index: index as i64,
            len,
        })?;
        self.decode(i)
    }

    fn decode(&self, i: usize) -> Result<E::Item> {
        self.element
            .decode_at(self.region, i * self.width)
            .map(|(item, _)| item)
    }

    /// A lazy sub-array. Bounds clamp to the array and may be negative.
    pub fn slice(&self, range: impl RangeBounds<isize>) -> Self {
        let len = self.len();
        let start = match range.start_bound() {
            Bound::Included(&i) => clamp(i, len),
            Bound::Excluded(&i) => clamp(i, len).saturating_add(1).min(len),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&i) => clamp(i, len).saturating_add(1).min(len),
            Bound::Excluded(&i) => clamp(i, len),
            Bound::Unbounded => len,
        }
        .max(start);
        Self {
            element: self.element.clone(),
            region: &self.region[start * self.width..end * self.width],
            width: self.width,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Result<E::Item>> + '_ {
        (0..self.len()).map(move |i| self.decode(i))
    }
}

/// Variable-width elements, located by scanning forward from the start of the region.
#[derive(Debug)]
pub struct VarArray<'a, E> {
    element: E,
    region: &'a [u8],
    /// Start offsets of the elements found so far; the last entry is where scanning resumes.
    offsets: RefCell<Vec<usize>>,
}

impl<'a, E: Element<'a>> VarArray<'a, E> {
    pub fn new(element: E, region: &'a [u8]) -> Self {
        Self {
            element,
            region,
            offsets: RefCell::new(vec![0]),
        }
    }

    pub fn region(&self) -> &'a [u8] {
        self.region
    }

    fn is_complete(&self) -> bool {
        self.offsets
            .borrow()
            .last()
            .is_some_and(|&last| last >= self.region.len())
    }

    /// Decode the element starting at cached offset `index`, recording where the next one
    /// starts. `None` once the region is exhausted.
    fn step(&self, index: usize) -> Option<Result<E::Item>> {
        let start = *self.offsets.borrow().get(index)?;
        if start >= self.region.len() {
            return None;
        }
        let (item, consumed) = match self.element.decode_at(self.region, start) {
            Ok(decoded) => decoded,
            Err(e) => return Some(Err(e)),
        };
        if consumed == 0 {
            return Some(Err(StructerError::violation(
                self.element.name(),
                "element of at least one byte",
                "zero-length element",
            )));
        }
        let mut offsets = self.offsets.borrow_mut();
        if offsets.len() == index + 1 {
            offsets.push(start + consumed);
            trace!(element = self.element.name(), index, start, consumed, "Cached offset");
        }
        Some(Ok(item))
    }

    /// Scan until element `index` is located or the region ends.
    fn scan_to(&self, index: usize) -> Result<()> {
        loop {
            let known = self.offsets.borrow().len();
            if known > index + 1 || self.is_complete() {
                return Ok(());
            }
            match self.step(known - 1) {
                Some(Err(e)) => return Err(e),
                Some(Ok(_)) => {}
                None => return Ok(()),
            }
        }
    }

    /// Number of elements. Forces a full scan the first time.
    pub fn len(&self) -> Result<usize> {
        while !self.is_complete() {
            let known = self.offsets.borrow().len();
            if let Some(Err(e)) = self.step(known - 1) {
                return Err(e);
            }
        }
        let count = self.offsets.borrow().len() - 1;
        debug!(element = self.element.name(), count, "Scanned variable array");
        Ok(count)
    }

    pub fn is_empty(&self) -> bool {
        self.region.is_empty()
    }

    /// Element `index`; negative indices count from the end and force a full scan.
    pub fn get(&self, index: isize) -> Result<E::Item> {
        let i = if index < 0 {
            let len = self.len()?;
            normalize(index, len).ok_or(StructerError::IndexOutOfRange {
                index: index as i64,
                len,
            })?
        } else {
            index as usize
        };
        self.scan_to(i)?;
        if self.offsets.borrow().len() <= i + 1 {
            let len = self.offsets.borrow().len() - 1;
            return Err(StructerError::IndexOutOfRange {
                index: index as i64,
                len,
            });
        }
        let start = self.offsets.borrow()[i];
        self.element.decode_at(self.region, start).map(|(item, _)| item)
    }

    /// Offsets discovered so far, including the resume point.
    pub fn cached_offsets(&self) -> Vec<usize> {
        self.offsets.borrow().clone()
    }

    /// Walk the elements in order, extending the offset cache as it goes.
    pub fn iter(&self) -> VarIter<'_, 'a, E> {
        VarIter {
            array: self,
            index: 0,
            failed: false,
        }
    }
}

/// Iterator over a [`VarArray`].
pub struct VarIter<'s, 'a, E> {
    array: &'s VarArray<'a, E>,
    index: usize,
    failed: bool,
}

impl<'a, E: Element<'a>> Iterator for VarIter<'_, 'a, E> {
    type Item = Result<E::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.array.step(self.index)?;
        self.failed = item.is_err();
        self.index += 1;
        Some(item)
    }
}

/// Owning iterator over a [`VarArray`].
pub struct VarIntoIter<'a, E> {
    array: VarArray<'a, E>,
    index: usize,
    failed: bool,
}

impl<'a, E: Element<'a>> Iterator for VarIntoIter<'a, E> {
    type Item = Result<E::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.array.step(self.index)?;
        self.failed = item.is_err();
        self.index += 1;
        Some(item)
    }
}

impl<'a, E: Element<'a>> IntoIterator for VarArray<'a, E> {
    type Item = Result<E::Item>;
    type IntoIter = VarIntoIter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        VarIntoIter {
            array: self,
            index: 0,
            failed: false,
        }
    }
}

/// NUL-terminated strings packed back to back, as in a string table.
pub fn strings(region: &[u8]) -> VarArray<'_, FieldElement> {
    VarArray::new(
        FieldElement::new("string", Field::terminated(), Params::NATIVE),
        region,
    )
}
