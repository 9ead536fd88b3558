#![forbid(unsafe_code)]

//! Paged message source with page budgets and failure injection.
//!
//! Top pages hold history older than anything already served; bottom pages
//! hold fresh messages. Each page links to its anchor on the inner side and
//! declares no neighbor on the outer side, so served pages never open holes.

use std::future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use scrollfeed::{
    FetchDirection, FetchError, FetchFuture, FetchPage, FetchResult, FetchSource, ManualClock,
    Timestamp, WallClock,
};

use crate::message::{Message, SEED_SPACING_MS};

/// Items per page.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// How far behind the clock history pages are stamped.
const HISTORY_AGE_MS: u64 = 86_400_000;

/// A deterministic [`FetchSource`] for [`Message`]s.
///
/// All counters are atomics so the source can be shared by reference with an
/// in-flight future.
#[derive(Debug)]
pub struct SimulatedSource {
    page_size: usize,
    top_pages: AtomicUsize,
    bottom_pages: AtomicUsize,
    fail_next: AtomicUsize,
    served: AtomicUsize,
    clock: Arc<ManualClock>,
}

impl SimulatedSource {
    /// Unlimited pages of [`DEFAULT_PAGE_SIZE`] items, stamped from `clock`.
    #[must_use]
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            top_pages: AtomicUsize::new(usize::MAX),
            bottom_pages: AtomicUsize::new(usize::MAX),
            fail_next: AtomicUsize::new(0),
            served: AtomicUsize::new(0),
            clock,
        }
    }

    /// Set the number of items per page.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Limit how many non-empty pages `direction` can serve.
    #[must_use]
    pub fn with_page_budget(self, direction: FetchDirection, pages: usize) -> Self {
        self.budget(direction).store(pages, Ordering::SeqCst);
        self
    }

    /// Items per page.
    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Make the next `count` fetches fail.
    pub fn fail_next(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Non-empty pages served so far.
    #[must_use]
    pub fn pages_served(&self) -> usize {
        self.served.load(Ordering::SeqCst)
    }

    /// Serve one page synchronously.
    pub fn page(&self, direction: FetchDirection, anchor: &str) -> FetchResult<Message> {
        if self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(FetchError::new(format!("simulated failure fetching {direction} of {anchor}")));
        }

        let Ok(before) = self
            .budget(direction)
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        else {
            return Ok(Some(FetchPage::last(Vec::new())));
        };
        let page_no = self.served.fetch_add(1, Ordering::SeqCst);
        let items = match direction {
            FetchDirection::Top => self.history(page_no, anchor),
            FetchDirection::Bottom => self.fresh(page_no, anchor),
        };
        Ok(Some(FetchPage::new(items, before > 1)))
    }

    fn budget(&self, direction: FetchDirection) -> &AtomicUsize {
        match direction {
            FetchDirection::Top => &self.top_pages,
            FetchDirection::Bottom => &self.bottom_pages,
        }
    }

    fn history(&self, page_no: usize, anchor: &str) -> Vec<Message> {
        let n = self.page_size;
        let oldest = self
            .clock
            .now()
            .as_millis()
            .saturating_sub(HISTORY_AGE_MS + (page_no * n) as u64 * SEED_SPACING_MS);
        let id = |k: usize| format!("older-{page_no}-{k}");
        (0..n)
            .map(|k| {
                let ts = Timestamp(oldest.saturating_sub((n - k) as u64 * SEED_SPACING_MS));
                let prev = (k > 0).then(|| id(k - 1));
                let next = if k + 1 < n { id(k + 1) } else { anchor.to_owned() };
                Message::new(id(k), format!("History {page_no}.{k}"), ts).with_links(prev, Some(next))
            })
            .collect()
    }

    fn fresh(&self, page_no: usize, anchor: &str) -> Vec<Message> {
        let n = self.page_size;
        let now = self.clock.now();
        let id = |k: usize| format!("newer-{page_no}-{k}");
        (0..n)
            .map(|k| {
                let prev = if k > 0 { id(k - 1) } else { anchor.to_owned() };
                let next = (k + 1 < n).then(|| id(k + 1));
                Message::new(id(k), format!("Update {page_no}.{k}"), now).with_links(Some(prev), next)
            })
            .collect()
    }
}

impl FetchSource<Message> for SimulatedSource {
    fn fetch<'a>(&'a self, direction: FetchDirection, anchor: &'a String) -> FetchFuture<'a, Message> {
        Box::pin(future::ready(self.page(direction, anchor)))
    }
}
