//! Viewport intersection observation.
//!
//! [`VisibilityObserver`] is the capability the reveal controller needs from
//! its host: "tell me whenever this sentinel crosses the visibility
//! threshold". [`ViewportObserver`] implements it geometrically from layout
//! rectangles the host reports, which also makes it a convenient test double.
//!
//! # Delivery rules
//!
//! - An entry is delivered when an observation is registered (if its target
//!   has been laid out), when [`VisibilityObserver::refresh`] is called, and
//!   whenever the target's intersecting state flips.
//! - Targets without a layout rectangle produce no entries.
//! - Callbacks run after internal locks are released.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use reveal_core::Property;
use slotmap::{SlotMap, new_key_type};

use crate::geometry::Rect;
use crate::margin::RootMargin;
use crate::sentinel::SentinelHandle;
use crate::targets;

new_key_type! {
    /// Identifies one registered observation.
    pub struct ObservationId;
}

/// Parameters of an observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObserverOptions {
    /// Margin applied to the viewport before testing.
    pub root_margin: RootMargin,
    /// Minimum visible fraction of the target, in `0.0..=1.0`.
    pub threshold: f32,
}

impl ObserverOptions {
    /// Create options. The threshold is clamped into `0.0..=1.0`.
    pub fn new(root_margin: RootMargin, threshold: f32) -> Self {
        let threshold = if threshold.is_nan() {
            0.0
        } else {
            threshold.clamp(0.0, 1.0)
        };
        Self {
            root_margin,
            threshold,
        }
    }
}

impl Default for ObserverOptions {
    fn default() -> Self {
        Self::new(RootMargin::default(), crate::config::DEFAULT_THRESHOLD)
    }
}

/// One visibility report for a target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    /// The observed sentinel.
    pub target: SentinelHandle,
    /// Whether at least `threshold` of the target is within the margin-adjusted viewport.
    pub is_intersecting: bool,
    /// Fraction of the target inside the margin-adjusted viewport.
    pub intersection_ratio: f32,
}

/// Callback invoked with each delivered entry.
pub type IntersectionCallback = Arc<dyn Fn(&IntersectionEntry) + Send + Sync>;

/// Host capability for watching a sentinel's visibility.
pub trait VisibilityObserver: Send + Sync {
    /// Start observing `target`.
    fn observe(
        &self,
        target: SentinelHandle,
        options: ObserverOptions,
        callback: IntersectionCallback,
    ) -> ObservationId;

    /// Stop an observation. Returns `false` if it was already gone.
    fn disconnect(&self, id: ObservationId) -> bool;

    /// Re-deliver the current state of an observation, as a newly created
    /// observation would on registration. No-op for unknown IDs or targets
    /// that are not laid out.
    fn refresh(&self, id: ObservationId);
}

struct Observation {
    target: SentinelHandle,
    options: ObserverOptions,
    callback: IntersectionCallback,
    /// Last delivered intersecting state.
    last: Option<bool>,
}

#[derive(Default)]
struct ObserverTable {
    targets: HashMap<SentinelHandle, Rect>,
    observations: SlotMap<ObservationId, Observation>,
}

type Delivery = (IntersectionCallback, IntersectionEntry);

/// Computes intersections from viewport and target rectangles.
///
/// # Example
///
/// ```
/// use reveal::{
///     IntersectionEntry, ObserverOptions, Rect, RootMargin, SentinelHandle, ViewportObserver,
///     VisibilityObserver,
/// };
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// let observer = ViewportObserver::new(Rect::new(0.0, 0.0, 400.0, 800.0));
/// let sentinel = SentinelHandle::allocate();
/// let visible = Arc::new(AtomicBool::new(false));
///
/// let visible_clone = visible.clone();
/// observer.observe(
///     sentinel,
///     ObserverOptions::new(RootMargin::px(100.0), 0.1),
///     Arc::new(move |entry: &IntersectionEntry| {
///         visible_clone.store(entry.is_intersecting, Ordering::SeqCst)
///     }),
/// );
///
/// // Laid out 50px below the fold: inside the 100px root margin.
/// observer.set_target_rect(sentinel, Rect::new(0.0, 850.0, 400.0, 40.0));
/// assert!(visible.load(Ordering::SeqCst));
/// ```
pub struct ViewportObserver {
    viewport: Property<Rect>,
    table: Mutex<ObserverTable>,
}

impl std::fmt::Debug for ViewportObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let table = self.table.lock();
        f.debug_struct("ViewportObserver")
            .field("viewport", &self.viewport.get())
            .field("targets", &table.targets.len())
            .field("observations", &table.observations.len())
            .finish()
    }
}

impl ViewportObserver {
    /// Create an observer for a viewport rectangle.
    pub fn new(viewport: Rect) -> Self {
        Self {
            viewport: Property::new(viewport),
            table: Mutex::new(ObserverTable::default()),
        }
    }

    /// The current viewport rectangle.
    pub fn viewport(&self) -> Rect {
        self.viewport.get()
    }

    /// Report a new viewport rectangle (resize or scroll).
    pub fn set_viewport(&self, viewport: Rect) {
        if self.viewport.set(viewport) {
            let deliveries = self.evaluate(|_| true, false);
            deliver(deliveries);
        }
    }

    /// Scroll the viewport vertically to `offset`.
    pub fn scroll_to(&self, offset: f32) {
        let viewport = self.viewport.get();
        self.set_viewport(Rect::new(viewport.x, offset, viewport.width, viewport.height));
    }

    /// Report the layout rectangle of a target element.
    pub fn set_target_rect(&self, target: SentinelHandle, rect: Rect) {
        let changed = self.table.lock().targets.insert(target, rect) != Some(rect);
        if changed {
            let deliveries = self.evaluate(|obs| obs.target == target, false);
            deliver(deliveries);
        }
    }

    /// Report that a target element left the layout.
    ///
    /// Its observations stay registered but go silent until it is laid out
    /// again, at which point they deliver a fresh entry.
    pub fn remove_target(&self, target: SentinelHandle) {
        let mut table = self.table.lock();
        if table.targets.remove(&target).is_some() {
            for (_, observation) in table.observations.iter_mut() {
                if observation.target == target {
                    observation.last = None;
                }
            }
        }
    }

    /// Number of live observations.
    pub fn observation_count(&self) -> usize {
        self.table.lock().observations.len()
    }

    /// Compute the current entry for a target under the given options.
    pub fn compute_entry(
        &self,
        target: SentinelHandle,
        options: &ObserverOptions,
    ) -> Option<IntersectionEntry> {
        let rect = *self.table.lock().targets.get(&target)?;
        Some(self.entry_for(target, rect, options))
    }

    fn entry_for(
        &self,
        target: SentinelHandle,
        rect: Rect,
        options: &ObserverOptions,
    ) -> IntersectionEntry {
        let root = options.root_margin.apply(self.viewport.get());
        let (is_intersecting, intersection_ratio) = match rect.visible_fraction(&root) {
            Some(ratio) => (ratio >= options.threshold, ratio),
            None => (false, 0.0),
        };
        IntersectionEntry {
            target,
            is_intersecting,
            intersection_ratio,
        }
    }

    /// Collect deliveries for matching observations. With `force`, entries
    /// are delivered even when the intersecting state is unchanged.
    fn evaluate<F>(&self, mut matches: F, force: bool) -> Vec<Delivery>
    where
        F: FnMut(&Observation) -> bool,
    {
        let mut table = self.table.lock();
        let ObserverTable {
            targets: rects,
            observations,
        } = &mut *table;

        let mut deliveries = Vec::new();
        for (id, observation) in observations.iter_mut() {
            if !matches(observation) {
                continue;
            }
            let Some(&rect) = rects.get(&observation.target) else {
                continue;
            };
            let entry = self.entry_for(observation.target, rect, &observation.options);
            if force || observation.last != Some(entry.is_intersecting) {
                observation.last = Some(entry.is_intersecting);
                tracing::trace!(
                    target: targets::OBSERVER,
                    ?id,
                    sentinel = observation.target.as_u64(),
                    is_intersecting = entry.is_intersecting,
                    ratio = entry.intersection_ratio,
                    "delivering intersection entry"
                );
                deliveries.push((observation.callback.clone(), entry));
            }
        }
        deliveries
    }

    fn evaluate_one(&self, id: ObservationId) -> Vec<Delivery> {
        let mut table = self.table.lock();
        let ObserverTable {
            targets: rects,
            observations,
        } = &mut *table;

        let Some(observation) = observations.get_mut(id) else {
            return Vec::new();
        };
        let Some(&rect) = rects.get(&observation.target) else {
            return Vec::new();
        };
        let entry = self.entry_for(observation.target, rect, &observation.options);
        observation.last = Some(entry.is_intersecting);
        vec![(observation.callback.clone(), entry)]
    }
}

fn deliver(deliveries: Vec<Delivery>) {
    for (callback, entry) in deliveries {
        callback(&entry);
    }
}

impl VisibilityObserver for ViewportObserver {
    fn observe(
        &self,
        target: SentinelHandle,
        options: ObserverOptions,
        callback: IntersectionCallback,
    ) -> ObservationId {
        let id = self.table.lock().observations.insert(Observation {
            target,
            options,
            callback,
            last: None,
        });
        tracing::debug!(
            target: targets::OBSERVER,
            ?id,
            sentinel = target.as_u64(),
            root_margin = %options.root_margin,
            threshold = options.threshold,
            "observing sentinel"
        );
        deliver(self.evaluate_one(id));
        id
    }

    fn disconnect(&self, id: ObservationId) -> bool {
        let removed = self.table.lock().observations.remove(id).is_some();
        if removed {
            tracing::debug!(target: targets::OBSERVER, ?id, "observation disconnected");
        }
        removed
    }

    fn refresh(&self, id: ObservationId) {
        deliver(self.evaluate_one(id));
    }
}
