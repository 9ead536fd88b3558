#![forbid(unsafe_code)]

//! The feed engine.
//!
//! [`Feed`] owns the sequence, its layout, and the four controllers that act
//! on them (range, anchoring, pagination, arrivals). The host drives it with
//! plain method calls and never blocks inside it:
//!
//! ```text
//!  host scroll event ──► on_scroll ──► range refreshed, debounce armed
//!  host frame tick  ───► poll ───────► Option<FetchRequest>   (host fetches)
//!  fetch settles    ───► complete ───► FetchOutcome           (merge / recover)
//!  after host layout ──► layout ─────► Option<AnchorAction>   (scroll fixed up)
//!  paint            ───► render_plan / render
//! ```
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Fetch fails | Reported; state idle; the same trigger may fire again |
//! | Fetched page fails validation | Whole page skipped as `Rejected`; reported |
//! | Fetched item has an invalid height | Whole page skipped as `Unmeasurable`; reported |
//! | Ticket from before an unmount | Discarded; nothing changes |
//! | Viewport unmounted | Evaluation and anchoring are no-ops |
//! | `start_at_item` key missing | Warned once; mode default placement |

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use scrollfeed_core::{DebounceAction, ScrollDebouncer, ScrollMetrics, SystemClock, Viewport, WallClock};
use tracing::{debug, debug_span, info, trace, warn};
use web_time::Instant;

use crate::anchor::{AnchorAction, AnchorInput, ScrollAnchor};
use crate::arrival::ArrivalTracker;
use crate::config::FeedConfig;
use crate::error::{FeedError, FetchError};
use crate::gap::{GapReport, detect_gaps};
use crate::item::{FeedItem, FetchDirection, FetchPage};
use crate::layout::{HeightFn, OffsetTable, compute_offsets};
use crate::pagination::{
    FetchMarkers, FetchOutcome, FetchRequest, FetchTicket, Pagination, PaginationState, Trigger,
    trigger_candidates,
};
use crate::range::{VisibleRange, compute_visible_range};
use crate::render::{FeedRenderer, RenderPlan, RenderSlot};
use crate::sequence::Sequence;
use crate::source::FetchSource;

/// Callback receiving every error the engine recovers from.
pub type ErrorReporter = Box<dyn FnMut(&FeedError) + Send>;

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`Feed`].
pub struct FeedBuilder<T: FeedItem> {
    initial: Vec<T>,
    height_of: HeightFn<T>,
    config: FeedConfig,
    start_at_item: Option<T::Key>,
    clock: Arc<dyn WallClock>,
    reporter: Option<ErrorReporter>,
}

impl<T: FeedItem> FeedBuilder<T> {
    /// Start from the initial items and a height function.
    #[must_use]
    pub fn new(initial: Vec<T>, height_of: impl Fn(&T) -> f64 + Send + Sync + 'static) -> Self {
        Self {
            initial,
            height_of: Box::new(height_of),
            config: FeedConfig::default(),
            start_at_item: None,
            clock: Arc::new(SystemClock),
            reporter: None,
        }
    }

    /// Use `config`.
    #[must_use]
    pub fn config(mut self, config: FeedConfig) -> Self {
        self.config = config;
        self
    }

    /// Place the viewport at this item on first layout.
    #[must_use]
    pub fn start_at_item(mut self, key: T::Key) -> Self {
        self.start_at_item = Some(key);
        self
    }

    /// Clock used for arrival thresholds.
    #[must_use]
    pub fn wall_clock(mut self, clock: Arc<dyn WallClock>) -> Self {
        self.clock = clock;
        self
    }

    /// Receive recovered errors (failed fetches, rejected pages).
    #[must_use]
    pub fn error_reporter(mut self, reporter: impl FnMut(&FeedError) + Send + 'static) -> Self {
        self.reporter = Some(Box::new(reporter));
        self
    }

    /// Validate the initial items, lay them out, and build the engine.
    pub fn build(self) -> Result<Feed<T>, FeedError> {
        let Self {
            initial,
            height_of,
            config,
            start_at_item,
            clock,
            reporter,
        } = self;

        let sequence = Sequence::from_items(initial, config.requirements())?;
        let offsets = compute_offsets(&sequence, &*height_of, None, None, config.loader_height)?;
        let visible = VisibleRange::initial(sequence.len());

        debug!(
            items = sequence.len(),
            inverse = config.inverse,
            gap_detection = config.gap_detection,
            new_items_count = config.show_new_items_count,
            "feed built"
        );

        Ok(Feed {
            debouncer: ScrollDebouncer::new(config.debounce),
            anchor: ScrollAnchor::new(config.inverse),
            arrivals: ArrivalTracker::new(config.show_new_items_count),
            pagination: Pagination::new(),
            config,
            height_of,
            start_at_item,
            start_missing_warned: false,
            sequence,
            offsets,
            visible,
            focus: visible,
            last_metrics: None,
            layout_changed: true,
            clock,
            reporter,
            liveness: Arc::new(()),
        })
    }
}

impl<T: FeedItem> fmt::Debug for FeedBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedBuilder")
            .field("initial", &self.initial.len())
            .field("config", &self.config)
            .field("start_at_item", &self.start_at_item)
            .finish()
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Windowed rendering engine for one feed.
pub struct Feed<T: FeedItem> {
    config: FeedConfig,
    height_of: HeightFn<T>,
    start_at_item: Option<T::Key>,
    start_missing_warned: bool,

    sequence: Sequence<T>,
    offsets: OffsetTable,
    /// Buffered range handed to the renderer.
    visible: Option<VisibleRange>,
    /// Unbuffered range inspected for gaps.
    focus: Option<VisibleRange>,
    last_metrics: Option<ScrollMetrics>,
    /// Offsets changed since the last anchoring pass.
    layout_changed: bool,

    pagination: Pagination<T::Key>,
    anchor: ScrollAnchor,
    arrivals: ArrivalTracker<T::Key>,
    debouncer: ScrollDebouncer,

    clock: Arc<dyn WallClock>,
    reporter: Option<ErrorReporter>,
    /// Outstanding tickets hold weak references; replaced on unmount.
    liveness: Arc<()>,
}

impl<T: FeedItem> fmt::Debug for Feed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Feed")
            .field("items", &self.sequence.len())
            .field("state", &self.pagination.state())
            .field("visible", &self.visible)
            .field("content_height", &self.offsets.content_height())
            .field("anchor", &self.anchor)
            .field("new_items", &self.arrivals.count())
            .finish_non_exhaustive()
    }
}

impl<T: FeedItem> Feed<T> {
    /// Shorthand for [`FeedBuilder::new`].
    #[must_use]
    pub fn builder(initial: Vec<T>, height_of: impl Fn(&T) -> f64 + Send + Sync + 'static) -> FeedBuilder<T> {
        FeedBuilder::new(initial, height_of)
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// The materialized items.
    #[must_use]
    pub fn items(&self) -> &Sequence<T> {
        &self.sequence
    }

    /// Current offset table.
    #[must_use]
    pub fn offsets(&self) -> &OffsetTable {
        &self.offsets
    }

    /// Total scrollable height the host should give its inner content.
    #[must_use]
    pub fn content_height(&self) -> f64 {
        self.offsets.content_height()
    }

    /// Range to render, buffer included.
    #[must_use]
    pub fn visible_range(&self) -> Option<VisibleRange> {
        self.visible
    }

    /// Pagination state.
    #[must_use]
    pub fn state(&self) -> PaginationState {
        self.pagination.state()
    }

    /// Loader placement.
    #[must_use]
    pub fn markers(&self) -> &FetchMarkers<T::Key> {
        self.pagination.markers()
    }

    /// Whether `direction` may still have content.
    #[must_use]
    pub fn has_more(&self, direction: FetchDirection) -> bool {
        self.pagination.has_more(direction)
    }

    /// Unseen items since the reader left the live edge.
    #[must_use]
    pub fn new_items_count(&self) -> usize {
        self.arrivals.count()
    }

    /// First unseen item, if one is latched.
    #[must_use]
    pub fn arrival_target(&self) -> Option<&T::Key> {
        self.arrivals.target()
    }

    /// Whether an inverse feed is held at the live edge.
    #[must_use]
    pub fn is_pinned(&self) -> bool {
        self.config.inverse && self.anchor.at_live_edge()
    }

    /// Whether initial placement has happened.
    #[must_use]
    pub fn initial_placement_done(&self) -> bool {
        self.anchor.initial_placement_done()
    }

    /// Time until the pending scroll evaluation is due.
    #[must_use]
    pub fn time_until_evaluation(&self, now: Instant) -> Option<Duration> {
        self.debouncer.time_until_apply(now)
    }

    // ------------------------------------------------------------------------
    // Scroll handling
    // ------------------------------------------------------------------------

    /// Record a scroll event: refresh the range now, defer pagination.
    pub fn on_scroll<V: Viewport + ?Sized>(&mut self, viewport: &V) {
        self.on_scroll_at(viewport, Instant::now());
    }

    /// [`on_scroll`](Self::on_scroll) with an explicit timestamp.
    pub fn on_scroll_at<V: Viewport + ?Sized>(&mut self, viewport: &V, now: Instant) {
        if let Some(metrics) = viewport.metrics() {
            self.refresh_range(metrics);
        }
        self.debouncer.handle_scroll_at(now);
    }

    /// Run the debounced evaluation if it is due.
    pub fn poll<V: Viewport + ?Sized>(&mut self, viewport: &V) -> Option<FetchRequest<T::Key>> {
        self.poll_at(viewport, Instant::now())
    }

    /// [`poll`](Self::poll) with an explicit timestamp.
    pub fn poll_at<V: Viewport + ?Sized>(&mut self, viewport: &V, now: Instant) -> Option<FetchRequest<T::Key>> {
        match self.debouncer.tick_at(now) {
            DebounceAction::None => None,
            DebounceAction::Evaluate {
                coalesced,
                forced_by_deadline,
                ..
            } => {
                trace!(coalesced, forced_by_deadline, "scroll evaluation due");
                self.evaluate(viewport)
            }
        }
    }

    /// Evaluate triggers immediately, bypassing the debouncer.
    ///
    /// Returns the fetch the host should perform, if any.
    pub fn evaluate<V: Viewport + ?Sized>(&mut self, viewport: &V) -> Option<FetchRequest<T::Key>> {
        let metrics = viewport.metrics()?;
        let _span = debug_span!(
            "feed_evaluate",
            scroll_top = metrics.scroll_top,
            scroll_height = metrics.scroll_height,
            state = self.pagination.state().as_str()
        )
        .entered();

        self.refresh_range(metrics);
        if !self.anchor.initial_placement_done() {
            trace!("initial placement pending; triggers ignored");
            return None;
        }
        self.observe_live_edge(metrics);

        if self.pagination.state() != PaginationState::Idle {
            trace!("fetch in flight; triggers ignored");
            return None;
        }

        let trigger = self.next_trigger(metrics)?;
        Some(self.begin_fetch(trigger, metrics))
    }

    fn observe_live_edge(&mut self, metrics: ScrollMetrics) {
        let at_edge = metrics.is_at_bottom(self.config.live_edge_tolerance);
        if at_edge && self.arrivals.count() > 0 {
            debug!(cleared = self.arrivals.count(), "live edge reached; new-item count reset");
        }
        self.anchor.set_at_live_edge(at_edge);
        self.arrivals.observe_edge(at_edge, self.clock.now());
    }

    fn next_trigger(&self, metrics: ScrollMetrics) -> Option<Trigger<T::Key>> {
        let gaps = match self.focus {
            Some(focus) if self.config.gap_detection => detect_gaps(&self.sequence, focus),
            _ => GapReport::default(),
        };
        let candidates = trigger_candidates(
            metrics,
            self.config.inverse,
            self.config.threshold_ratio,
            self.sequence.first().map(FeedItem::key),
            self.sequence.last().map(FeedItem::key),
            gaps,
        );
        self.pagination
            .select(candidates, self.sequence.len(), self.config.total_count)
    }

    fn begin_fetch(&mut self, trigger: Trigger<T::Key>, metrics: ScrollMetrics) -> FetchRequest<T::Key> {
        self.anchor.record_fetch(trigger.direction, metrics.scroll_height);
        let request = self.pagination.begin(trigger, &self.liveness);
        info!(
            direction = request.direction.as_str(),
            reason = request.reason.as_str(),
            anchor = ?request.anchor,
            ticket = request.ticket.id(),
            "fetch issued"
        );
        self.relayout();
        request
    }

    // ------------------------------------------------------------------------
    // Fetch completion
    // ------------------------------------------------------------------------

    /// Settle the fetch identified by `ticket`.
    ///
    /// `Ok(Some(page))` merges the page and records its `has_more`;
    /// `Ok(None)` returns to idle without changes; `Err` is reported and the
    /// trigger becomes eligible again.
    pub fn complete(&mut self, ticket: FetchTicket, result: Result<Option<FetchPage<T>>, FetchError>) -> FetchOutcome {
        let _span = debug_span!(
            "feed_complete",
            ticket = ticket.id(),
            direction = ticket.direction().as_str()
        )
        .entered();

        if !ticket.is_live() {
            debug!("fetch settled after unmount; discarded");
            return FetchOutcome::Discarded;
        }
        let Some(direction) = self.pagination.settle(&ticket) else {
            debug!("fetch is not in flight; discarded");
            return FetchOutcome::Discarded;
        };

        let outcome = match result {
            Err(err) => {
                warn!(error = %err, "fetch failed");
                self.report(FeedError::Fetch(err));
                FetchOutcome::Failed { direction }
            }
            Ok(None) => {
                debug!("fetch returned no page");
                FetchOutcome::Empty { direction }
            }
            Ok(Some(page)) => match self.merge(direction, page.items) {
                Ok(count) => {
                    self.pagination.set_has_more(direction, page.has_more);
                    FetchOutcome::Merged { direction, count }
                }
                Err(FeedError::Layout(err)) => {
                    warn!(error = %err, "fetched page has an unmeasurable item");
                    let index = err.index;
                    self.report(FeedError::Layout(err));
                    FetchOutcome::Unmeasurable { direction, index }
                }
                Err(err) => {
                    warn!(error = %err, "fetched page rejected");
                    self.report(err);
                    FetchOutcome::Rejected { direction }
                }
            },
        };

        self.relayout();
        if direction == FetchDirection::Top {
            match outcome.merged() {
                0 => self.anchor.cancel_compensation(),
                count => {
                    let page_height = self
                        .offsets
                        .offset_of(count)
                        .unwrap_or_else(|| self.offsets.content_height());
                    self.anchor.settle_top(page_height, self.config.loader_height);
                }
            }
        }
        debug!(outcome = outcome.as_str(), count = outcome.merged(), "fetch settled");
        outcome
    }

    /// Perform `request` through `source` and settle it.
    pub async fn fetch_with<S: FetchSource<T> + ?Sized>(
        &mut self,
        request: FetchRequest<T::Key>,
        source: &S,
    ) -> FetchOutcome {
        let result = source.fetch(request.direction, &request.anchor).await;
        self.complete(request.ticket, result)
    }

    /// Push live items onto the end of the feed (e.g. from a socket).
    ///
    /// Validated and measured like a fetched page; on error nothing changes.
    pub fn append(&mut self, items: Vec<T>) -> Result<usize, FeedError> {
        let count = self.merge(FetchDirection::Bottom, items)?;
        debug!(count, total = self.sequence.len(), "items appended");
        Ok(count)
    }

    /// Insert items above the first one (e.g. history restored from a cache).
    ///
    /// Once placed, the reader's position is held: the next [`layout`](Self::layout)
    /// shifts the viewport by the inserted height.
    pub fn prepend(&mut self, items: Vec<T>) -> Result<usize, FeedError> {
        let before = self.offsets.content_height();
        let count = self.merge(FetchDirection::Top, items)?;
        if count > 0 && self.anchor.initial_placement_done() {
            self.anchor.queue_shift(self.offsets.content_height() - before);
        }
        debug!(count, total = self.sequence.len(), "items prepended");
        Ok(count)
    }

    fn merge(&mut self, direction: FetchDirection, batch: Vec<T>) -> Result<usize, FeedError> {
        if batch.is_empty() {
            return Ok(0);
        }
        self.sequence.validate(&batch, self.config.requirements())?;

        let markers = self.pagination.markers();
        let (before, after) = (markers.before.as_ref(), markers.after.as_ref());
        let height_of = &*self.height_of;
        let loader = self.config.loader_height;
        let offsets = match direction {
            FetchDirection::Top => compute_offsets(batch.iter().chain(&self.sequence), height_of, before, after, loader),
            FetchDirection::Bottom => compute_offsets(self.sequence.iter().chain(&batch), height_of, before, after, loader),
        }?;

        if self.anchor.initial_placement_done() && !self.anchor.at_live_edge() {
            let counted = self
                .arrivals
                .observe_merge(batch.iter().map(|item| (item.key(), item.timestamp())));
            if counted > 0 {
                debug!(counted, total = self.arrivals.count(), "new items arrived off-screen");
            }
        }

        let count = batch.len();
        match direction {
            FetchDirection::Top => self.sequence.prepend(batch),
            FetchDirection::Bottom => self.sequence.append(batch),
        }
        self.install(offsets);
        Ok(count)
    }

    // ------------------------------------------------------------------------
    // Layout and anchoring
    // ------------------------------------------------------------------------

    /// Run anchoring after the host has applied [`content_height`](Self::content_height).
    ///
    /// Must be called after every change that affects layout and before the
    /// frame is shown. Returns what was done to the viewport.
    pub fn layout<V: Viewport + ?Sized>(&mut self, viewport: &mut V) -> Option<AnchorAction> {
        viewport.metrics()?;

        let start_offset = if self.anchor.initial_placement_done() {
            None
        } else {
            self.resolve_start_offset()
        };
        let input = AnchorInput {
            inverse: self.config.inverse,
            start_offset,
            loader_height: self.config.loader_height,
            live_edge_tolerance: self.config.live_edge_tolerance,
            layout_changed: self.layout_changed,
            has_items: !self.sequence.is_empty(),
        };

        let action = self.anchor.apply(viewport, &input);
        match action {
            Some(AnchorAction::Deferred { grown }) => trace!(grown, "prepend compensation deferred"),
            Some(a) => {
                debug!(action = a.as_str(), "anchor applied");
                self.layout_changed = false;
            }
            None if self.anchor.initial_placement_done() => self.layout_changed = false,
            None => {}
        }
        if let Some(metrics) = viewport.metrics() {
            self.refresh_range(metrics);
        }
        action
    }

    fn resolve_start_offset(&mut self) -> Option<f64> {
        let key = self.start_at_item.as_ref()?;
        let offset = self
            .sequence
            .index_of(key)
            .and_then(|index| self.offsets.offset_of(index));
        if offset.is_none() && !self.start_missing_warned {
            warn!(key = ?key, "start item not in the feed; using default placement");
            self.start_missing_warned = true;
        }
        offset
    }

    /// Jump to the first unseen item, or to the bottom if none is latched.
    ///
    /// Clears the new-item count. Returns the target offset, or `None` if the
    /// viewport is unmounted.
    pub fn scroll_to_latest<V: Viewport + ?Sized>(&mut self, viewport: &mut V) -> Option<f64> {
        let metrics = viewport.metrics()?;
        let latched = self
            .arrivals
            .take_target()
            .and_then(|key| self.sequence.index_of(&key))
            .and_then(|index| self.offsets.offset_of(index));

        let target = match latched {
            Some(offset) => offset.min(metrics.max_scroll_top()),
            None => {
                self.anchor.set_at_live_edge(true);
                metrics.max_scroll_top()
            }
        };
        debug!(target, latched = latched.is_some(), "scroll to latest");
        viewport.scroll_to(target);
        self.arrivals.reset();
        if let Some(metrics) = viewport.metrics() {
            self.refresh_range(metrics);
        }
        Some(target)
    }

    // ------------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------------

    /// Slots to draw this frame.
    #[must_use]
    pub fn render_plan(&self) -> RenderPlan {
        let new_items = self.arrivals.is_enabled().then(|| self.arrivals.count());
        RenderPlan::build(&self.offsets, self.visible, new_items)
    }

    /// Draw the current frame through `renderer`.
    ///
    /// Slots come first in display order, followed by the arrival indicator
    /// when there is something to show.
    pub fn render<R: FeedRenderer<T>>(&self, renderer: &mut R) -> Vec<R::Output> {
        let plan = self.render_plan();
        let mut out = Vec::with_capacity(plan.slots.len() + 1);
        for slot in &plan.slots {
            match *slot {
                RenderSlot::Loader { direction, top, height } => {
                    out.push(renderer.render_loader(direction, top, height));
                }
                RenderSlot::Item { index, top, height } => {
                    if let Some(item) = self.sequence.get(index) {
                        out.push(renderer.render_item(item, index, top, height));
                    }
                }
            }
        }
        if let Some(count) = plan.new_items {
            out.push(renderer.render_arrival_indicator(count));
        }
        out
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Detach from the host.
    ///
    /// Outstanding tickets become stale and their completions are discarded.
    /// Pagination returns to idle with loaders removed, and pending scroll
    /// evaluation is dropped.
    pub fn unmount(&mut self) {
        self.liveness = Arc::new(());
        if let Some(direction) = self.pagination.abandon() {
            info!(direction = direction.as_str(), "in-flight fetch abandoned on unmount");
            if direction == FetchDirection::Top {
                self.anchor.cancel_compensation();
            }
        }
        self.debouncer.cancel();
        self.relayout();
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn refresh_range(&mut self, metrics: ScrollMetrics) {
        self.last_metrics = Some(metrics);
        let offsets = self.offsets.as_slice();
        let inverse = self.config.inverse;
        self.visible = compute_visible_range(
            offsets,
            metrics.scroll_top,
            metrics.client_height,
            self.config.buffer,
            inverse,
        );
        self.focus = compute_visible_range(offsets, metrics.scroll_top, metrics.client_height, 0, inverse);
    }

    /// Recompute offsets for the current sequence and markers.
    fn relayout(&mut self) {
        let markers = self.pagination.markers();
        let result = compute_offsets(
            &self.sequence,
            &*self.height_of,
            markers.before.as_ref(),
            markers.after.as_ref(),
            self.config.loader_height,
        );
        match result {
            Ok(offsets) => self.install(offsets),
            Err(err) => {
                warn!(error = %err, "relayout failed; keeping previous offsets");
                self.report(err.into());
            }
        }
    }

    fn install(&mut self, offsets: OffsetTable) {
        self.offsets = offsets;
        self.layout_changed = true;
        match self.last_metrics {
            Some(metrics) => self.refresh_range(metrics),
            None => {
                self.visible = VisibleRange::initial(self.sequence.len());
                self.focus = self.visible;
            }
        }
    }

    fn report(&mut self, err: FeedError) {
        if let Some(reporter) = self.reporter.as_mut() {
            reporter(&err);
        }
    }
}
