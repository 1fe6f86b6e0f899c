//! The incremental reveal controller.
//!
//! A [`RevealController`] owns no data of its own. It is handed a complete,
//! already-loaded collection and exposes a growing prefix of it: one page at
//! first, one more page each time the sentinel at the end of the rendered
//! list becomes visible, after an artificial delay that stands in for fetch
//! latency.
//!
//! # State machine
//!
//! ```text
//!            intersecting && has_more && no pending load
//!   Idle ─────────────────────────────────────────────────▶ Loading
//!    ▲                                                        │
//!    └──────── delay elapsed: count = min(count + page, len) ─┘
//! ```
//!
//! - While a load is pending, further intersection entries are ignored.
//! - Replacing the collection (by identity) or changing the page size resets
//!   the count to one page and clears the loading flag. A load already in
//!   flight is not cancelled: when it fires it still adds one page, clamped
//!   to whatever collection is current at that time.
//! - After every reveal and every reset the observation is refreshed, so a
//!   sentinel that is still in view keeps pulling in pages.
//!
//! # Teardown
//!
//! [`RevealController::dispose`] (also run on drop) disconnects the
//! observation and cancels the pending timer. Scheduled callbacks only hold
//! a weak reference to the controller state, so a timer that fires anyway
//! changes nothing.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use reveal_core::{Deferred, Property, ScheduledTaskId, Signal};

use crate::config::RevealConfig;
use crate::margin::RootMargin;
use crate::observer::{
    IntersectionCallback, IntersectionEntry, ObservationId, ObserverOptions, VisibilityObserver,
};
use crate::sentinel::SentinelHandle;
use crate::targets;

/// Whether a simulated fetch is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealPhase {
    /// No load in progress.
    Idle,
    /// Waiting for the load delay to elapse.
    Loading,
}

/// A consistent view of the controller's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealSnapshot {
    /// Number of items currently exposed.
    pub display_count: usize,
    /// Length of the source collection.
    pub total_count: usize,
    /// Whether the loading flag is set.
    pub is_loading: bool,
    /// Whether more items remain to be revealed.
    pub has_more: bool,
}

impl fmt::Display for RevealSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Showing {} of {}", self.display_count, self.total_count)
    }
}

/// The exposed prefix of the source collection.
///
/// Shares the collection's allocation; dereferences to `[T]`.
pub struct DisplayedItems<T> {
    items: Arc<[T]>,
    len: usize,
}

impl<T> DisplayedItems<T> {
    /// The full source collection this prefix was taken from.
    pub fn source(&self) -> &Arc<[T]> {
        &self.items
    }
}

impl<T> Deref for DisplayedItems<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items[..self.len]
    }
}

impl<T> Clone for DisplayedItems<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            len: self.len,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for DisplayedItems<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingLoad {
    token: u64,
    task: Option<ScheduledTaskId>,
}

struct RevealState<T> {
    items: Arc<[T]>,
    items_per_page: usize,
    /// Unclamped; exposure is `min(display_count, items.len())`.
    display_count: usize,
    is_loading: bool,
    pending: Option<PendingLoad>,
    next_token: u64,
    disposed: bool,
}

impl<T> RevealState<T> {
    fn has_more(&self) -> bool {
        self.display_count < self.items.len()
    }

    fn visible_count(&self) -> usize {
        self.display_count.min(self.items.len())
    }

    fn observable(&self) -> (usize, bool) {
        (self.visible_count(), self.is_loading)
    }

    fn snapshot(&self) -> RevealSnapshot {
        RevealSnapshot {
            display_count: self.visible_count(),
            total_count: self.items.len(),
            is_loading: self.is_loading,
            has_more: self.has_more(),
        }
    }
}

struct Attachment {
    observer: Arc<dyn VisibilityObserver>,
    id: ObservationId,
}

/// Notifications computed under the state lock and emitted after it.
#[derive(Debug)]
struct Changes {
    display_count: Option<usize>,
    loading: Option<bool>,
}

impl Changes {
    fn between(before: (usize, bool), after: (usize, bool)) -> Self {
        Self {
            display_count: (before.0 != after.0).then_some(after.0),
            loading: (before.1 != after.1).then_some(after.1),
        }
    }
}

#[derive(Debug, Default)]
struct RefreshState {
    running: bool,
    owed: bool,
}

struct Shared<T> {
    sentinel: SentinelHandle,
    scheduler: Arc<dyn Deferred>,
    state: Mutex<RevealState<T>>,
    load_more_delay: Property<Duration>,
    observer_options: Property<ObserverOptions>,
    attachment: Mutex<Option<Attachment>>,
    refresh: Mutex<RefreshState>,
    display_count_changed: Signal<usize>,
    loading_changed: Signal<bool>,
}

impl<T> Shared<T> {
    fn emit(&self, changes: Changes) {
        if let Some(count) = changes.display_count {
            self.display_count_changed.emit(count);
        }
        if let Some(loading) = changes.loading {
            self.loading_changed.emit(loading);
        }
    }

    /// Ask the observer to re-deliver the sentinel's visibility.
    ///
    /// A refresh requested while another one is being delivered is left to
    /// that call, which keeps looping until none is owed. Delivery can
    /// complete a load synchronously, so this keeps the stack flat.
    fn refresh_observation(&self) {
        {
            let mut refresh = self.refresh.lock();
            refresh.owed = true;
            if refresh.running {
                return;
            }
            refresh.running = true;
        }

        loop {
            {
                let mut refresh = self.refresh.lock();
                if !refresh.owed {
                    refresh.running = false;
                    return;
                }
                refresh.owed = false;
            }

            let attachment = self
                .attachment
                .lock()
                .as_ref()
                .map(|a| (a.observer.clone(), a.id));
            if let Some((observer, id)) = attachment {
                observer.refresh(id);
            }
        }
    }

    fn detach(&self) -> bool {
        let attachment = self.attachment.lock().take();
        match attachment {
            Some(Attachment { observer, id }) => {
                observer.disconnect(id);
                true
            }
            None => false,
        }
    }

    fn dispose(&self) {
        let pending = {
            let mut state = self.state.lock();
            if state.disposed {
                return;
            }
            state.disposed = true;
            state.pending.take()
        };

        if let Some(PendingLoad {
            task: Some(task), ..
        }) = pending
        {
            self.scheduler.cancel(task);
        }
        self.detach();
        self.display_count_changed.disconnect_all();
        self.loading_changed.disconnect_all();

        tracing::debug!(
            target: targets::CONTROLLER,
            sentinel = self.sentinel.as_u64(),
            cancelled_load = pending.is_some(),
            "reveal controller disposed"
        );
    }

    /// Apply a configuration change and, if it took effect, reset the count.
    fn reset_with<F>(&self, reason: &'static str, update: F)
    where
        F: FnOnce(&mut RevealState<T>) -> bool,
    {
        let changes = {
            let mut state = self.state.lock();
            if state.disposed {
                return;
            }
            let before = state.observable();
            if !update(&mut *state) {
                return;
            }
            state.display_count = state.items_per_page;
            state.is_loading = false;

            tracing::debug!(
                target: targets::CONTROLLER,
                sentinel = self.sentinel.as_u64(),
                reason,
                display_count = state.visible_count(),
                total = state.items.len(),
                load_in_flight = state.pending.is_some(),
                "reveal state reset"
            );
            Changes::between(before, state.observable())
        };

        self.emit(changes);
        self.refresh_observation();
    }

    fn complete_load(&self, token: u64) {
        let changes = {
            let mut state = self.state.lock();
            if state.disposed {
                tracing::trace!(target: targets::CONTROLLER, token, "load fired after teardown");
                return;
            }
            match state.pending {
                Some(pending) if pending.token == token => {}
                _ => return,
            }
            state.pending = None;

            let before = state.observable();
            let total = state.items.len();
            state.display_count = state
                .display_count
                .saturating_add(state.items_per_page)
                .min(total);
            state.is_loading = false;

            tracing::debug!(
                target: targets::CONTROLLER,
                sentinel = self.sentinel.as_u64(),
                display_count = state.display_count,
                total,
                has_more = state.has_more(),
                "revealed next page"
            );
            Changes::between(before, state.observable())
        };

        self.emit(changes);
        self.refresh_observation();
    }
}

impl<T: Send + Sync + 'static> Shared<T> {
    fn handle_intersection(self: &Arc<Self>, entry: &IntersectionEntry) {
        if !entry.is_intersecting {
            return;
        }

        let token = {
            let mut state = self.state.lock();
            if state.disposed {
                return;
            }
            if state.pending.is_some() {
                tracing::trace!(target: targets::CONTROLLER, "load pending, ignoring intersection");
                return;
            }
            if !state.has_more() {
                tracing::trace!(target: targets::CONTROLLER, "fully revealed, ignoring intersection");
                return;
            }
            let token = state.next_token;
            state.next_token += 1;
            state.pending = Some(PendingLoad { token, task: None });
            state.is_loading = true;
            token
        };

        let delay = self.load_more_delay.get();
        tracing::debug!(
            target: targets::CONTROLLER,
            sentinel = self.sentinel.as_u64(),
            ratio = entry.intersection_ratio,
            delay_ms = delay.as_millis() as u64,
            "sentinel visible, loading next page"
        );
        self.loading_changed.emit(true);

        let weak = Arc::downgrade(self);
        let task = self.scheduler.schedule_once(
            delay,
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.complete_load(token);
                }
            }),
        );

        // The task may already have run, or a slot may have torn us down.
        let orphaned = {
            let mut state = self.state.lock();
            match state.pending.as_mut() {
                Some(pending) if pending.token == token => {
                    pending.task = Some(task);
                    false
                }
                _ => state.disposed,
            }
        };
        if orphaned {
            self.scheduler.cancel(task);
        }
    }
}

/// Exposes a growing prefix of a collection as a sentinel scrolls into view.
///
/// # Example
///
/// ```
/// use reveal::{Rect, RevealConfig, RevealController, ViewportObserver};
/// use reveal_core::{ManualClock, TaskScheduler};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let clock = ManualClock::new();
/// let scheduler = Arc::new(TaskScheduler::new(Arc::new(clock.clone())));
/// let observer = Arc::new(ViewportObserver::new(Rect::new(0.0, 0.0, 400.0, 800.0)));
///
/// let jobs: Vec<u32> = (0..50).collect();
/// let controller = RevealController::new(jobs, RevealConfig::default(), scheduler.clone());
/// controller.attach_sentinel(observer.clone());
/// assert_eq!(controller.snapshot().to_string(), "Showing 20 of 50");
///
/// // The sentinel is rendered just below the fold.
/// observer.set_target_rect(controller.sentinel(), Rect::new(0.0, 820.0, 400.0, 40.0));
/// assert!(controller.is_loading());
///
/// clock.advance(Duration::from_millis(500));
/// // Re-layout pushes the sentinel further down before the next frame.
/// controller.display_count_changed().connect({
///     let observer = observer.clone();
///     let sentinel = controller.sentinel();
///     move |&count| observer.set_target_rect(sentinel, Rect::new(0.0, count as f32 * 40.0, 400.0, 40.0))
/// });
/// scheduler.process_ready();
///
/// assert_eq!(controller.display_count(), 40);
/// assert!(!controller.is_loading());
/// assert!(controller.has_more());
/// ```
pub struct RevealController<T> {
    shared: Arc<Shared<T>>,
}

impl<T> fmt::Debug for RevealController<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("RevealController")
            .field("sentinel", &self.shared.sentinel)
            .field("snapshot", &state.snapshot())
            .field("items_per_page", &state.items_per_page)
            .field("disposed", &state.disposed)
            .finish()
    }
}

impl<T: Send + Sync + 'static> RevealController<T> {
    /// Create a controller over `items`.
    ///
    /// Nothing is revealed beyond the first page until a sentinel is attached
    /// with [`attach_sentinel`](Self::attach_sentinel).
    pub fn new(items: impl Into<Arc<[T]>>, config: RevealConfig, scheduler: Arc<dyn Deferred>) -> Self {
        let items = items.into();
        let sentinel = SentinelHandle::allocate();

        if config.items_per_page == 0 {
            tracing::warn!(
                target: targets::CONTROLLER,
                sentinel = sentinel.as_u64(),
                "items_per_page is zero; nothing will ever be revealed"
            );
        }
        tracing::debug!(
            target: targets::CONTROLLER,
            sentinel = sentinel.as_u64(),
            total = items.len(),
            items_per_page = config.items_per_page,
            "reveal controller created"
        );

        let state = RevealState {
            items,
            items_per_page: config.items_per_page,
            display_count: config.items_per_page,
            is_loading: false,
            pending: None,
            next_token: 0,
            disposed: false,
        };

        Self {
            shared: Arc::new(Shared {
                sentinel,
                scheduler,
                state: Mutex::new(state),
                load_more_delay: Property::new(config.load_more_delay),
                observer_options: Property::new(config.observer_options()),
                attachment: Mutex::new(None),
                refresh: Mutex::new(RefreshState::default()),
                display_count_changed: Signal::new(),
                loading_changed: Signal::new(),
            }),
        }
    }

    /// Create a controller with the default configuration.
    pub fn with_defaults(items: impl Into<Arc<[T]>>, scheduler: Arc<dyn Deferred>) -> Self {
        Self::new(items, RevealConfig::default(), scheduler)
    }

    /// The handle to bind to the loader element after the list.
    pub fn sentinel(&self) -> SentinelHandle {
        self.shared.sentinel
    }

    /// Start observing the sentinel through `observer`.
    ///
    /// Any previous observation is disconnected first.
    pub fn attach_sentinel(&self, observer: Arc<dyn VisibilityObserver>) {
        self.shared.detach();
        if self.is_disposed() {
            return;
        }

        let options = self.shared.observer_options.get();
        let weak = Arc::downgrade(&self.shared);
        let callback: IntersectionCallback = Arc::new(move |entry: &IntersectionEntry| {
            if let Some(shared) = weak.upgrade() {
                shared.handle_intersection(entry);
            }
        });

        // `observe` may deliver the initial entry before it returns.
        let id = observer.observe(self.shared.sentinel, options, callback);
        *self.shared.attachment.lock() = Some(Attachment { observer, id });

        if self.is_disposed() {
            self.shared.detach();
        }
    }

    /// Stop observing the sentinel. Returns `false` if nothing was attached.
    pub fn detach_sentinel(&self) -> bool {
        self.shared.detach()
    }

    /// Whether a sentinel observation is active.
    pub fn is_attached(&self) -> bool {
        self.shared.attachment.lock().is_some()
    }

    /// Replace the source collection.
    ///
    /// Collections are compared by identity: passing the same `Arc` again is
    /// a no-op, while any other collection resets the count to one page.
    pub fn set_items(&self, items: impl Into<Arc<[T]>>) {
        let items = items.into();
        self.shared.reset_with("items replaced", move |state| {
            if Arc::ptr_eq(&state.items, &items) {
                return false;
            }
            state.items = items;
            true
        });
    }

    /// Change the page size. Resets the count to one page if it differs.
    pub fn set_items_per_page(&self, items_per_page: usize) {
        self.shared.reset_with("page size changed", move |state| {
            if state.items_per_page == items_per_page {
                return false;
            }
            state.items_per_page = items_per_page;
            true
        });
    }

    /// Change the simulated fetch latency for loads started from now on.
    pub fn set_load_more_delay(&self, delay: Duration) {
        self.shared.load_more_delay.set(delay);
    }

    /// Change the root margin and threshold, re-creating the observation.
    pub fn set_observer_options(&self, root_margin: RootMargin, threshold: f32) {
        let options = ObserverOptions::new(root_margin, threshold);
        if !self.shared.observer_options.set(options) {
            return;
        }
        let observer = self
            .shared
            .attachment
            .lock()
            .as_ref()
            .map(|a| a.observer.clone());
        if let Some(observer) = observer {
            self.attach_sentinel(observer);
        }
    }
}

impl<T> RevealController<T> {
    /// The currently exposed prefix of the collection.
    pub fn displayed_items(&self) -> DisplayedItems<T> {
        let state = self.shared.state.lock();
        DisplayedItems {
            items: state.items.clone(),
            len: state.visible_count(),
        }
    }

    /// The full source collection.
    pub fn items(&self) -> Arc<[T]> {
        self.shared.state.lock().items.clone()
    }

    /// Number of items currently exposed.
    pub fn display_count(&self) -> usize {
        self.shared.state.lock().visible_count()
    }

    /// Length of the source collection.
    pub fn total_count(&self) -> usize {
        self.shared.state.lock().items.len()
    }

    /// Whether a simulated fetch is in progress.
    pub fn is_loading(&self) -> bool {
        self.shared.state.lock().is_loading
    }

    /// Whether items remain to be revealed.
    pub fn has_more(&self) -> bool {
        self.shared.state.lock().has_more()
    }

    /// The current phase.
    pub fn phase(&self) -> RevealPhase {
        if self.is_loading() {
            RevealPhase::Loading
        } else {
            RevealPhase::Idle
        }
    }

    /// All counters, read atomically.
    pub fn snapshot(&self) -> RevealSnapshot {
        self.shared.state.lock().snapshot()
    }

    /// The page size.
    pub fn items_per_page(&self) -> usize {
        self.shared.state.lock().items_per_page
    }

    /// The simulated fetch latency.
    pub fn load_more_delay(&self) -> Duration {
        self.shared.load_more_delay.get()
    }

    /// The options used for the sentinel observation.
    pub fn observer_options(&self) -> ObserverOptions {
        self.shared.observer_options.get()
    }

    /// Emitted with the new exposed count whenever it changes.
    pub fn display_count_changed(&self) -> &Signal<usize> {
        &self.shared.display_count_changed
    }

    /// Emitted whenever the loading flag flips.
    pub fn loading_changed(&self) -> &Signal<bool> {
        &self.shared.loading_changed
    }

    /// Tear the controller down: disconnect the observation, cancel the
    /// pending load and drop all signal connections. Idempotent.
    ///
    /// The counters stay readable but never change again.
    pub fn dispose(&self) {
        self.shared.dispose();
    }

    /// Whether [`dispose`](Self::dispose) has run.
    pub fn is_disposed(&self) -> bool {
        self.shared.state.lock().disposed
    }
}

impl<T> Drop for RevealController<T> {
    fn drop(&mut self) {
        self.shared.dispose();
    }
}
