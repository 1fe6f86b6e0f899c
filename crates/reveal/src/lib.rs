//! Incremental reveal for infinite-scroll lists.
//!
//! This crate exposes a growing prefix of an in-memory collection as the
//! user scrolls, featuring:
//!
//! - **Controller**: [`RevealController`] pages through a collection whenever
//!   its sentinel becomes visible, with a simulated fetch delay
//! - **Observation**: the [`VisibilityObserver`] capability and a geometric
//!   [`ViewportObserver`] driven by layout rectangles
//! - **Root margins**: CSS margin shorthand parsed into a [`RootMargin`]
//! - **Configuration**: [`RevealConfig`] built in code or loaded from TOML
//!
//! Time is injected through [`reveal_core::Deferred`], so tests and
//! simulations can drive the controller with a virtual clock.
//!
//! # Example
//!
//! ```
//! use reveal::{Rect, RevealController, ViewportObserver};
//! use reveal_core::{ManualClock, TaskScheduler};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let clock = ManualClock::new();
//! let scheduler = Arc::new(TaskScheduler::new(Arc::new(clock.clone())));
//! let viewport = Arc::new(ViewportObserver::new(Rect::new(0.0, 0.0, 400.0, 800.0)));
//!
//! let titles: Vec<String> = (1..=30).map(|n| format!("Job #{n}")).collect();
//! let controller = RevealController::with_defaults(titles, scheduler.clone());
//! controller.attach_sentinel(viewport.clone());
//! assert_eq!(controller.displayed_items().len(), 20);
//!
//! viewport.set_target_rect(controller.sentinel(), Rect::new(0.0, 780.0, 400.0, 40.0));
//! clock.advance(Duration::from_millis(500));
//! scheduler.process_ready();
//!
//! assert_eq!(controller.displayed_items().last().map(String::as_str), Some("Job #30"));
//! assert!(!controller.has_more());
//! ```

pub mod config;
pub mod controller;
mod error;
pub mod geometry;
pub mod margin;
pub mod observer;
mod sentinel;

pub use config::RevealConfig;
pub use controller::{DisplayedItems, RevealController, RevealPhase, RevealSnapshot};
pub use error::{Result, RevealError};
pub use geometry::Rect;
pub use margin::{MarginLength, RootMargin};
pub use observer::{
    IntersectionCallback, IntersectionEntry, ObservationId, ObserverOptions, ViewportObserver,
    VisibilityObserver,
};
pub use sentinel::SentinelHandle;

/// Tracing targets for filtering log output by subsystem.
///
/// ```bash
/// RUST_LOG=reveal::controller=debug cargo run --example scroll_simulation
/// ```
pub mod targets {
    /// Reveal state transitions.
    pub const CONTROLLER: &str = "reveal::controller";
    /// Intersection delivery.
    pub const OBSERVER: &str = "reveal::observer";
    /// Configuration loading.
    pub const CONFIG: &str = "reveal::config";
}
