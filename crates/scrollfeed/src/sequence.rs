#![forbid(unsafe_code)]

//! The materialized item sequence.
//!
//! Grows at either end, never reorders or removes. Keys are indexed by a
//! logical position that survives prepends: position `p` lives at index
//! `p - front`, and a prepend of `n` items moves `front` back by `n` without
//! touching existing entries.

use std::collections::VecDeque;
use std::collections::vec_deque;

use ahash::{AHashMap, AHashSet};

use crate::error::ValidationError;
use crate::item::FeedItem;

/// Which optional item fields must be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Requirements {
    /// Items must declare prev/next links.
    pub links: bool,
    /// Items must carry a timestamp.
    pub timestamps: bool,
}

/// Ordered, duplicate-free list of fetched items.
#[derive(Debug, Clone)]
pub struct Sequence<T: FeedItem> {
    items: VecDeque<T>,
    positions: AHashMap<T::Key, i64>,
    front: i64,
}

impl<T: FeedItem> Default for Sequence<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FeedItem> Sequence<T> {
    /// An empty sequence.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
            positions: AHashMap::new(),
            front: 0,
        }
    }

    /// Build from an initial list, validating every item.
    pub fn from_items(items: Vec<T>, requirements: Requirements) -> Result<Self, ValidationError> {
        let mut seq = Self::new();
        seq.validate(&items, requirements)?;
        seq.append(items);
        Ok(seq)
    }

    /// Check a batch against the requirements and against existing keys.
    ///
    /// Nothing is modified; a batch either passes entirely or not at all.
    pub fn validate(&self, batch: &[T], requirements: Requirements) -> Result<(), ValidationError> {
        let mut seen: AHashSet<&T::Key> = AHashSet::with_capacity(batch.len());
        for item in batch {
            let key = item.key();
            if requirements.links && item.links().is_none() {
                return Err(ValidationError::missing_links(key));
            }
            if requirements.timestamps && item.timestamp().is_none() {
                return Err(ValidationError::missing_timestamp(key));
            }
            if self.positions.contains_key(key) || !seen.insert(key) {
                return Err(ValidationError::duplicate_key(key));
            }
        }
        Ok(())
    }

    /// Add items after the last one. Callers validate first.
    pub(crate) fn append(&mut self, batch: Vec<T>) {
        let mut pos = self.front + self.items.len() as i64;
        self.items.reserve(batch.len());
        for item in batch {
            self.positions.insert(item.key().clone(), pos);
            self.items.push_back(item);
            pos += 1;
        }
    }

    /// Add items before the first one, keeping their order. Callers validate first.
    pub(crate) fn prepend(&mut self, batch: Vec<T>) {
        let n = batch.len() as i64;
        self.front -= n;
        self.items.reserve(batch.len());
        for (i, item) in batch.into_iter().enumerate().rev() {
            self.positions
                .insert(item.key().clone(), self.front + i as i64);
            self.items.push_front(item);
        }
    }

    /// Number of items.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the sequence is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// First item.
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.items.front()
    }

    /// Last item.
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.items.back()
    }

    /// Current index of `key`. O(1).
    #[must_use]
    pub fn index_of(&self, key: &T::Key) -> Option<usize> {
        self.positions
            .get(key)
            .map(|&pos| (pos - self.front) as usize)
    }

    /// Whether `key` is materialized.
    #[must_use]
    pub fn contains_key(&self, key: &T::Key) -> bool {
        self.positions.contains_key(key)
    }

    /// Iterate in display order.
    pub fn iter(&self) -> vec_deque::Iter<'_, T> {
        self.items.iter()
    }

    /// Iterate over `range` (clamped to the sequence).
    pub fn range(&self, range: std::ops::Range<usize>) -> vec_deque::Iter<'_, T> {
        let end = range.end.min(self.items.len());
        let start = range.start.min(end);
        self.items.range(start..end)
    }
}

impl<'a, T: FeedItem> IntoIterator for &'a Sequence<T> {
    type Item = &'a T;
    type IntoIter = vec_deque::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Links;
    use scrollfeed_core::Timestamp;

    #[derive(Debug, Clone)]
    struct Row {
        id: u32,
        linked: bool,
        ts: Option<u64>,
    }

    impl Row {
        fn plain(id: u32) -> Self {
            Self {
                id,
                linked: true,
                ts: Some(id as u64),
            }
        }
    }

    impl FeedItem for Row {
        type Key = u32;
        fn key(&self) -> &u32 {
            &self.id
        }
        fn links(&self) -> Option<Links<u32>> {
            self.linked.then(Links::isolated)
        }
        fn timestamp(&self) -> Option<Timestamp> {
            self.ts.map(Timestamp)
        }
    }

    fn rows(ids: impl IntoIterator<Item = u32>) -> Vec<Row> {
        ids.into_iter().map(Row::plain).collect()
    }

    fn keys(seq: &Sequence<Row>) -> Vec<u32> {
        seq.iter().map(|r| r.id).collect()
    }

    #[test]
    fn prepend_keeps_batch_order_and_indexes() {
        let mut seq = Sequence::from_items(rows(10..13), Requirements::default()).unwrap();
        seq.prepend(rows([7, 8, 9]));
        seq.append(rows([13]));
        assert_eq!(keys(&seq), vec![7, 8, 9, 10, 11, 12, 13]);
        for (i, row) in seq.iter().enumerate() {
            assert_eq!(seq.index_of(&row.id), Some(i));
        }
        assert_eq!(seq.first().map(|r| r.id), Some(7));
        assert_eq!(seq.last().map(|r| r.id), Some(13));
    }

    #[test]
    fn repeated_prepends_stay_consistent() {
        let mut seq = Sequence::from_items(rows([100]), Requirements::default()).unwrap();
        for chunk in (0..5).rev() {
            seq.prepend(rows(chunk * 10..chunk * 10 + 3));
        }
        assert_eq!(seq.len(), 16);
        assert_eq!(seq.index_of(&0), Some(0));
        assert_eq!(seq.index_of(&42), Some(14));
        assert_eq!(seq.index_of(&100), Some(15));
        assert_eq!(seq.index_of(&99), None);
    }

    #[test]
    fn duplicate_against_existing_is_rejected() {
        let seq = Sequence::from_items(rows(0..3), Requirements::default()).unwrap();
        let err = seq.validate(&rows([5, 2]), Requirements::default()).unwrap_err();
        assert_eq!(err, ValidationError::duplicate_key(&2u32));
    }

    #[test]
    fn duplicate_within_batch_is_rejected() {
        let err = Sequence::from_items(rows([1, 2, 1]), Requirements::default()).unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateKey { .. }));
    }

    #[test]
    fn requirements_are_checked() {
        let mut unlinked = Row::plain(4);
        unlinked.linked = false;
        let req = Requirements {
            links: true,
            timestamps: false,
        };
        let err = Sequence::from_items(vec![Row::plain(1), unlinked.clone()], req).unwrap_err();
        assert!(matches!(err, ValidationError::MissingLinks { .. }));
        assert!(Sequence::from_items(vec![unlinked], Requirements::default()).is_ok());

        let mut untimed = Row::plain(9);
        untimed.ts = None;
        let req = Requirements {
            links: false,
            timestamps: true,
        };
        let err = Sequence::from_items(vec![untimed], req).unwrap_err();
        assert!(matches!(err, ValidationError::MissingTimestamp { .. }));
    }

    #[test]
    fn range_clamps() {
        let seq = Sequence::from_items(rows(0..5), Requirements::default()).unwrap();
        let ids: Vec<u32> = seq.range(3..99).map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 4]);
        assert_eq!(seq.range(9..12).count(), 0);
    }
}
