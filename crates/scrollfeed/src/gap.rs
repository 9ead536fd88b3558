#![forbid(unsafe_code)]

//! Gap detection.
//!
//! An item's declared neighbor that is absent from the sequence marks a hole.
//! Only the edges of the focus range are inspected: a hole at the top of the
//! screen anchors a top fetch at the first focused item, a hole at the bottom
//! anchors a bottom fetch at the last one. Sequence ends are excluded because
//! missing content there is already covered by edge triggers.

use crate::item::FeedItem;
use crate::range::VisibleRange;
use crate::sequence::Sequence;

/// Holes found at the edges of the focus range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GapReport<K> {
    /// Anchor for a top fetch: the first focused item, whose `prev` is missing.
    pub before: Option<K>,
    /// Anchor for a bottom fetch: the last focused item, whose `next` is missing.
    pub after: Option<K>,
}

impl<K> Default for GapReport<K> {
    fn default() -> Self {
        Self {
            before: None,
            after: None,
        }
    }
}

impl<K> GapReport<K> {
    /// No hole on either side.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.before.is_none() && self.after.is_none()
    }
}

/// Inspect the edges of `focus` for missing neighbors.
///
/// Items without links never report a gap.
pub fn detect_gaps<T: FeedItem>(sequence: &Sequence<T>, focus: VisibleRange) -> GapReport<T::Key> {
    let mut report = GapReport::default();
    let last = match sequence.len().checked_sub(1) {
        Some(last) => last,
        None => return report,
    };

    if focus.start != 0
        && let Some(first) = sequence.get(focus.start)
        && let Some(prev) = first.links().and_then(|l| l.prev)
        && !sequence.contains_key(&prev)
    {
        report.before = Some(first.key().clone());
    }

    if focus.end < last
        && let Some(end) = sequence.get(focus.end)
        && let Some(next) = end.links().and_then(|l| l.next)
        && !sequence.contains_key(&next)
    {
        report.after = Some(end.key().clone());
    }

    if !report.is_empty() {
        tracing::trace!(before = ?report.before, after = ?report.after, "gap detected");
    }
    report
}
