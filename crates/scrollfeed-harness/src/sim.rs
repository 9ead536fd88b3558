#![forbid(unsafe_code)]

//! Frame-stepped feed simulation on a virtual clock.
//!
//! [`FeedSim`] plays the host: it owns a [`SimViewport`], drives the engine's
//! scroll, poll, complete, and layout calls in the order a browser frame
//! would, and delivers fetches from a [`SimulatedSource`] after a fixed
//! latency. Both clocks are virtual, so runs are reproducible.
//!
//! # Frame order
//!
//! ```text
//! advance(dt) ─► per 16ms step:
//!     due fetch?   ─► complete ─► frame
//!     poll_at      ─► fetch issued ─► frame
//! frame        ─► sync content height ─► layout ─► scroll event if moved
//! ```

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use scrollfeed::{
    AnchorAction, Feed, FeedBuilder, FeedConfig, FeedError, FetchDirection, FetchOutcome,
    FetchRequest, ManualClock, Timestamp, TriggerReason, Viewport, WallClock,
};
use tracing::{debug, info};
use web_time::Instant;

use crate::message::{Message, seed_messages};
use crate::render::TextRenderer;
use crate::source::SimulatedSource;
use crate::viewport::SimViewport;

/// Virtual frame length.
pub const FRAME: Duration = Duration::from_millis(16);

/// Wall-clock reading at the start of every run.
pub const START_TIME: Timestamp = Timestamp(1_700_000_000_000);

// ============================================================================
// Options
// ============================================================================

/// Parameters for one simulated run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimOptions {
    /// Items present before the first frame.
    pub initial_items: usize,
    /// Visible height of the scroll container.
    pub client_height: f64,
    /// Height of every message.
    pub item_height: f64,
    /// Time between issuing a fetch and its result arriving.
    pub latency: Duration,
    /// Items per fetched page.
    pub page_size: usize,
    /// Engine configuration.
    pub config: FeedConfig,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            initial_items: 100,
            client_height: 600.0,
            item_height: 50.0,
            latency: Duration::from_secs(1),
            page_size: crate::source::DEFAULT_PAGE_SIZE,
            config: FeedConfig::inverse()
                .with_total_count(Some(200))
                .with_new_items_count(true)
                .with_gap_detection(true),
        }
    }
}

impl SimOptions {
    /// Set the engine configuration.
    #[must_use]
    pub fn with_config(mut self, config: FeedConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the fetch latency.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Set the number of seeded items.
    #[must_use]
    pub fn with_initial_items(mut self, count: usize) -> Self {
        self.initial_items = count;
        self
    }
}

// ============================================================================
// Events
// ============================================================================

/// Something observable that happened during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    /// The engine asked for a page.
    Issued {
        /// Virtual time since the run started.
        at: Duration,
        /// Where.
        direction: FetchDirection,
        /// Item fetched from.
        anchor: String,
        /// Why.
        reason: TriggerReason,
    },
    /// A fetch result was handed back.
    Settled {
        /// Virtual time since the run started.
        at: Duration,
        /// What the engine made of it.
        outcome: FetchOutcome,
    },
    /// A layout pass moved or held the viewport.
    Anchored {
        /// Virtual time since the run started.
        at: Duration,
        /// What was done.
        action: AnchorAction,
    },
}

#[derive(Debug)]
struct InFlight {
    due: Instant,
    request: FetchRequest<String>,
}

// ============================================================================
// Simulation
// ============================================================================

/// A feed, its viewport, and its source, stepped on virtual time.
#[derive(Debug)]
pub struct FeedSim {
    feed: Feed<Message>,
    viewport: SimViewport,
    source: SimulatedSource,
    clock: Arc<ManualClock>,
    origin: Instant,
    elapsed: Duration,
    latency: Duration,
    in_flight: Option<InFlight>,
    events: Vec<SimEvent>,
    errors: Arc<Mutex<Vec<String>>>,
    live_seq: usize,
}

impl FeedSim {
    /// Seed the feed, build the engine, and run the first frame.
    pub fn new(options: SimOptions) -> Result<Self, FeedError> {
        let clock = Arc::new(ManualClock::new(START_TIME));
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        let item_height = options.item_height;

        let feed = FeedBuilder::new(seed_messages(options.initial_items, clock.now()), move |_: &Message| {
            item_height
        })
        .config(options.config)
        .wall_clock(clock.clone())
        .error_reporter(move |err| {
            sink.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(err.to_string());
        })
        .build()?;

        let source = SimulatedSource::new(Arc::clone(&clock)).with_page_size(options.page_size);
        let mut sim = Self {
            feed,
            viewport: SimViewport::new(options.client_height),
            source,
            clock,
            origin: Instant::now(),
            elapsed: Duration::ZERO,
            latency: options.latency,
            in_flight: None,
            events: Vec::new(),
            errors,
            live_seq: 0,
        };
        sim.frame();
        Ok(sim)
    }

    /// Reconfigure the source, e.g. to set page budgets.
    #[must_use]
    pub fn with_source(mut self, configure: impl FnOnce(SimulatedSource) -> SimulatedSource) -> Self {
        self.source = configure(self.source);
        self
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// The engine.
    #[must_use]
    pub fn feed(&self) -> &Feed<Message> {
        &self.feed
    }

    /// The scroll container.
    #[must_use]
    pub fn viewport(&self) -> &SimViewport {
        &self.viewport
    }

    /// The page source.
    #[must_use]
    pub fn source(&self) -> &SimulatedSource {
        &self.source
    }

    /// Virtual time since the run started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Whether a fetch is waiting on its latency.
    #[must_use]
    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Everything observed so far.
    #[must_use]
    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    /// Drain the event log.
    pub fn take_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    /// Errors the engine reported.
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn now(&self) -> Instant {
        self.origin + self.elapsed
    }

    // ------------------------------------------------------------------------
    // Host actions
    // ------------------------------------------------------------------------

    /// User scroll to an absolute offset.
    pub fn scroll_to(&mut self, offset: f64) {
        self.viewport.scroll_to(offset);
        self.feed.on_scroll_at(&self.viewport, self.now());
    }

    /// User scroll by a relative amount.
    pub fn scroll_by(&mut self, dy: f64) {
        self.viewport.scroll_by(dy);
        self.feed.on_scroll_at(&self.viewport, self.now());
    }

    /// Push `count` live messages onto the end of the feed.
    pub fn push_live(&mut self, count: usize) -> Result<usize, FeedError> {
        let stamp = self.clock.now().saturating_add_millis(1);
        let mut prev = self.feed.items().last().map(|m| m.id.clone());
        let first = self.live_seq;
        let mut batch = Vec::with_capacity(count);
        for k in 0..count {
            let id = format!("live-{}", first + k);
            let next = (k + 1 < count).then(|| format!("live-{}", first + k + 1));
            batch.push(Message::new(id.clone(), format!("Live {}", first + k), stamp).with_links(prev, next));
            prev = Some(id);
        }
        let merged = self.feed.append(batch)?;
        self.live_seq += count;
        debug!(merged, "live messages pushed");
        self.frame();
        Ok(merged)
    }

    /// Jump to the first unseen message, or the bottom.
    pub fn scroll_to_latest(&mut self) -> Option<f64> {
        let target = self.feed.scroll_to_latest(&mut self.viewport)?;
        self.feed.on_scroll_at(&self.viewport, self.now());
        Some(target)
    }

    /// Detach the viewport. A fetch still in flight settles later and is discarded.
    pub fn unmount(&mut self) {
        self.feed.unmount();
        self.viewport.set_mounted(false);
    }

    // ------------------------------------------------------------------------
    // Time
    // ------------------------------------------------------------------------

    /// Advance virtual time by `dt`, one frame at a time.
    pub fn advance(&mut self, dt: Duration) {
        let mut remaining = dt;
        while !remaining.is_zero() {
            let step = remaining.min(FRAME);
            remaining -= step;
            self.elapsed += step;
            self.clock.advance_millis(step.as_millis() as u64);
            self.tick();
        }
    }

    /// Advance until no fetch is in flight and no evaluation is pending, or
    /// until `limit` has passed. Returns whether the run went quiet.
    pub fn settle(&mut self, limit: Duration) -> bool {
        let deadline = self.elapsed + limit;
        while self.elapsed < deadline {
            let idle = self.in_flight.is_none() && self.feed.time_until_evaluation(self.now()).is_none();
            if idle {
                return true;
            }
            self.advance(FRAME);
        }
        self.in_flight.is_none()
    }

    /// Let any fetch in flight land, then scroll to the top repeatedly until
    /// the engine stops asking for history. Returns the number of fetches
    /// issued along the way.
    pub fn load_history(&mut self, max_rounds: usize) -> usize {
        let mut issued = 0;
        let limit = self.latency * 2 + Duration::from_secs(1);
        self.settle(limit);
        for _ in 0..max_rounds {
            let before = self.issued_count();
            self.scroll_to(0.0);
            self.settle(limit);
            let fresh = self.issued_count() - before;
            if fresh == 0 {
                break;
            }
            issued += fresh;
        }
        info!(issued, items = self.feed.items().len(), "history loaded");
        issued
    }

    fn issued_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, SimEvent::Issued { .. }))
            .count()
    }

    fn tick(&mut self) {
        let now = self.now();

        if let Some(done) = self.in_flight.take_if(|f| f.due <= now) {
            let request = done.request;
            let result = self.source.page(request.direction, &request.anchor);
            let outcome = self.feed.complete(request.ticket, result);
            self.events.push(SimEvent::Settled {
                at: self.elapsed,
                outcome,
            });
            self.frame();
        }

        if let Some(request) = self.feed.poll_at(&self.viewport, now) {
            self.events.push(SimEvent::Issued {
                at: self.elapsed,
                direction: request.direction,
                anchor: request.anchor.clone(),
                reason: request.reason,
            });
            self.in_flight = Some(InFlight {
                due: now + self.latency,
                request,
            });
            self.frame();
        }
    }

    /// One layout pass: hand the engine's content height to the container,
    /// then let the engine anchor the scroll position.
    pub fn frame(&mut self) -> Option<AnchorAction> {
        let before = self.viewport.scroll_top();
        self.viewport.set_content_height(self.feed.content_height());
        let action = self.feed.layout(&mut self.viewport);
        if let Some(action) = action {
            self.events.push(SimEvent::Anchored {
                at: self.elapsed,
                action,
            });
        }
        if self.viewport.is_mounted() && self.viewport.scroll_top() != before {
            self.feed.on_scroll_at(&self.viewport, self.now());
        }
        action
    }

    // ------------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------------

    /// The current frame as text, one line per slot.
    #[must_use]
    pub fn render_text(&self) -> Vec<String> {
        self.feed.render(&mut TextRenderer)
    }
}
