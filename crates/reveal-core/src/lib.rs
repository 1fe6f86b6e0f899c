//! Core systems for reveal.
//!
//! This crate provides the event-loop primitives the reveal controller is
//! built on:
//!
//! - **Clocks**: a [`Clock`] capability with wall-clock and virtual implementations
//! - **Scheduler**: clock-driven one-shot tasks, and the narrower
//!   [`Deferred`] "run this later" capability
//! - **Signal/Slot System**: type-safe change notifications
//! - **Properties**: values with change detection
//!
//! # Deterministic time
//!
//! ```
//! use reveal_core::{Deferred, ManualClock, TaskScheduler};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::time::Duration;
//!
//! let clock = ManualClock::new();
//! let scheduler: Arc<TaskScheduler> = Arc::new(TaskScheduler::new(Arc::new(clock.clone())));
//! let deferred: Arc<dyn Deferred> = scheduler.clone();
//!
//! let done = Arc::new(AtomicBool::new(false));
//! let done_clone = done.clone();
//! deferred.schedule_once(
//!     Duration::from_millis(500),
//!     Box::new(move || done_clone.store(true, Ordering::SeqCst)),
//! );
//!
//! clock.advance(Duration::from_millis(500));
//! scheduler.process_ready();
//! assert!(done.load(Ordering::SeqCst));
//! ```

mod clock;
mod error;
pub mod logging;
pub mod property;
mod scheduler;
pub mod signal;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CoreError, Result, SchedulerError};
pub use property::Property;
pub use scheduler::{Deferred, ScheduledTaskId, TaskScheduler};
pub use signal::{ConnectionId, Signal};
