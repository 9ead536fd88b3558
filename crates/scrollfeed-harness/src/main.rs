#![forbid(unsafe_code)]

//! Scripted chat-feed walkthrough.
//!
//! Seeds 100 messages in an inverse feed capped at 200, scrolls up until all
//! history is loaded, receives live messages while away from the bottom, and
//! jumps back with "scroll to latest". Each stage prints the rendered frame.
//!
//! # Running
//!
//! ```sh
//! cargo run -p scrollfeed-harness --bin feed_demo
//! RUST_LOG=scrollfeed=debug cargo run -p scrollfeed-harness --bin feed_demo
//! ```

use std::process::ExitCode;
use std::time::Duration;

use scrollfeed_harness::{FeedSim, SimEvent, SimOptions};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("feed_demo: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), scrollfeed::FeedError> {
    let mut sim = FeedSim::new(SimOptions::default())?;
    print_frame("initial placement", &sim);

    sim.scroll_to(0.0);
    sim.advance(Duration::from_millis(500));
    print_frame("loading history", &sim);

    sim.load_history(16);
    print_frame("history loaded", &sim);

    sim.advance(Duration::from_secs(2));
    sim.push_live(3)?;
    print_frame("live messages while away", &sim);

    sim.scroll_to_latest();
    sim.settle(Duration::from_secs(1));
    print_frame("scrolled to latest", &sim);

    sim.push_live(2)?;
    print_frame("live messages at the bottom", &sim);

    for event in sim.events() {
        print_event(event);
    }
    Ok(())
}

fn print_frame(title: &str, sim: &FeedSim) {
    let vp = sim.viewport();
    println!(
        "== {title} (t={}ms, scroll {:.0}/{:.0}, items {}, state {})",
        sim.elapsed().as_millis(),
        vp.scroll_top(),
        vp.max_scroll_top(),
        sim.feed().items().len(),
        sim.feed().state(),
    );
    for line in sim.render_text() {
        println!("{line}");
    }
    println!();
}

fn print_event(event: &SimEvent) {
    match event {
        SimEvent::Issued {
            at,
            direction,
            anchor,
            reason,
        } => println!(
            "{:>7}ms  issue   {direction} from {anchor} ({})",
            at.as_millis(),
            reason.as_str()
        ),
        SimEvent::Settled { at, outcome } => println!(
            "{:>7}ms  settle  {} ({} items)",
            at.as_millis(),
            outcome.as_str(),
            outcome.merged()
        ),
        SimEvent::Anchored { at, action } => println!("{:>7}ms  anchor  {action:?}", at.as_millis()),
    }
}
