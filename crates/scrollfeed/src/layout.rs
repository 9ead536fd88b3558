#![forbid(unsafe_code)]

//! Layout model: cumulative pixel offsets.
//!
//! Every item gets the pixel offset at which its slot begins. A slot is the
//! item's own height plus, when a fetch is anchored at that item, one loader
//! placeholder: *before* the item for a top fetch, *after* it for a bottom
//! fetch.
//!
//! ```text
//!   offset[i] ──► ┌──────────────┐
//!                 │ loader (top) │  only if key == fetch_before
//!                 ├──────────────┤
//!                 │   item i     │  height_of(item)
//!                 ├──────────────┤
//!                 │loader(bottom)│  only if key == fetch_after
//! offset[i+1] ──► └──────────────┘
//! ```
//!
//! # Invariants
//!
//! 1. `offsets.len() == sequence.len()`.
//! 2. Offsets are non-decreasing.
//! 3. `offset[i+1] == offset[i] + height(i) + loaders attributed to item i`.
//! 4. A height that is negative or non-finite fails the whole computation.

use crate::error::LayoutError;
use crate::item::FeedItem;

/// Per-item height function supplied by the host.
pub type HeightFn<T> = Box<dyn Fn(&T) -> f64 + Send + Sync>;

/// Offsets of every item, plus the loader placement they were computed with.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OffsetTable {
    offsets: Vec<f64>,
    heights: Vec<f64>,
    loader_before: Option<usize>,
    loader_after: Option<usize>,
    loader_height: f64,
    total: f64,
}

impl OffsetTable {
    /// Number of entries (equals the sequence length).
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Whether the table is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// The raw offsets.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.offsets
    }

    /// Slot start of item `index`.
    #[must_use]
    pub fn offset_of(&self, index: usize) -> Option<f64> {
        self.offsets.get(index).copied()
    }

    /// Measured height of item `index`.
    #[must_use]
    pub fn height_of(&self, index: usize) -> Option<f64> {
        self.heights.get(index).copied()
    }

    /// Where item `index` itself is drawn, past any leading loader.
    #[must_use]
    pub fn item_top(&self, index: usize) -> Option<f64> {
        let offset = self.offset_of(index)?;
        if self.loader_before == Some(index) {
            Some(offset + self.loader_height)
        } else {
            Some(offset)
        }
    }

    /// Pixel span `[start, end)` of item `index`'s slot.
    #[must_use]
    pub fn item_span(&self, index: usize) -> Option<(f64, f64)> {
        let start = self.offset_of(index)?;
        let end = self.offset_of(index + 1).unwrap_or(self.total);
        Some((start, end))
    }

    /// Index carrying the leading loader, if a top fetch is in flight.
    #[must_use]
    pub fn loader_before(&self) -> Option<usize> {
        self.loader_before
    }

    /// Index carrying the trailing loader, if a bottom fetch is in flight.
    #[must_use]
    pub fn loader_after(&self) -> Option<usize> {
        self.loader_after
    }

    /// Height used for each loader placeholder.
    #[must_use]
    pub fn loader_height(&self) -> f64 {
        self.loader_height
    }

    /// Total scrollable content height, loaders included.
    #[must_use]
    pub fn content_height(&self) -> f64 {
        self.total
    }
}

fn checked_height(index: usize, height: f64) -> Result<f64, LayoutError> {
    if height.is_finite() && height >= 0.0 {
        Ok(height)
    } else {
        Err(LayoutError { index, height })
    }
}

/// Compute the offset table for `items` in display order.
///
/// Pure: same inputs, same table. An empty sequence yields an empty table.
/// Accepts any ordered item iterator so a merge can be laid out before it is
/// committed; pass `&sequence` for the materialized sequence.
pub fn compute_offsets<'a, T, I>(
    items: I,
    height_of: &dyn Fn(&T) -> f64,
    fetch_before: Option<&T::Key>,
    fetch_after: Option<&T::Key>,
    loader_height: f64,
) -> Result<OffsetTable, LayoutError>
where
    T: FeedItem + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let items = items.into_iter();
    let (capacity, _) = items.size_hint();
    let _span = tracing::trace_span!("compute_offsets", items = capacity).entered();

    // Negative and NaN loader heights collapse to zero.
    let loader_height = loader_height.max(0.0);
    let mut offsets = Vec::with_capacity(capacity);
    let mut heights = Vec::with_capacity(capacity);
    let mut loader_before = None;
    let mut loader_after = None;
    let mut offset = 0.0;

    for (index, item) in items.enumerate() {
        offsets.push(offset);
        let key = item.key();
        if fetch_before == Some(key) {
            offset += loader_height;
            loader_before = Some(index);
        }
        let height = checked_height(index, height_of(item))?;
        heights.push(height);
        offset += height;
        if fetch_after == Some(key) {
            offset += loader_height;
            loader_after = Some(index);
        }
    }

    Ok(OffsetTable {
        offsets,
        heights,
        loader_before,
        loader_after,
        loader_height,
        total: offset,
    })
}
