#![forbid(unsafe_code)]

//! Deterministic host simulation for `scrollfeed`.
//!
//! - **Viewport**: an in-memory scroll container that clamps like a browser element.
//! - **Source**: a paged message source with latency, page budgets, and failure injection.
//! - **Simulation**: a frame-stepped driver on virtual time that records what the engine did.
//!
//! # Quick Start
//!
//! ```
//! use scrollfeed_harness::{FeedSim, SimOptions};
//!
//! let mut sim = FeedSim::new(SimOptions::default()).unwrap();
//! assert_eq!(sim.viewport().scroll_top(), 4400.0);
//!
//! sim.load_history(10);
//! assert_eq!(sim.feed().items().len(), 200);
//! ```

pub mod message;
pub mod render;
pub mod sim;
pub mod source;
pub mod viewport;

pub use message::{Message, seed_messages};
pub use render::TextRenderer;
pub use sim::{FRAME, FeedSim, START_TIME, SimEvent, SimOptions};
pub use source::{DEFAULT_PAGE_SIZE, SimulatedSource};
pub use viewport::SimViewport;
