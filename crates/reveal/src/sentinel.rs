//! Sentinel handles.

use std::fmt;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SENTINEL: AtomicU64 = AtomicU64::new(1);

/// Opaque handle for the "load more" placeholder rendered after a list.
///
/// Each controller owns exactly one. The consumer binds it to whatever
/// element sits at the end of the rendered list; for a
/// [`ViewportObserver`](crate::ViewportObserver) that means reporting the
/// element's layout rectangle under this handle.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SentinelHandle(NonZeroU64);

impl SentinelHandle {
    /// Allocate a handle no other sentinel in this process shares.
    pub fn allocate() -> Self {
        let raw = NEXT_SENTINEL.fetch_add(1, Ordering::Relaxed);
        Self(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
    }

    /// The raw numeric value, for logging.
    pub fn as_u64(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Debug for SentinelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SentinelHandle({})", self.0)
    }
}
