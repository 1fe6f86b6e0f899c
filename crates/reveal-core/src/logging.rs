//! Tracing targets used throughout reveal.
//!
//! reveal instruments itself with the `tracing` crate but never installs a
//! subscriber. Applications choose one:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("reveal=debug,reveal_core::scheduler=trace")
//!     .init();
//! ```

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "reveal_core";
    /// Deferred task scheduler target.
    pub const SCHEDULER: &str = "reveal_core::scheduler";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "reveal_core::signal";
}
