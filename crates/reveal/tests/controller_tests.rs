//! Integration tests for the reveal controller.
//!
//! Time is virtual throughout: a `ManualClock` drives a `TaskScheduler`, and
//! visibility comes either from a scripted observer or from a
//! `ViewportObserver` fed with layout rectangles.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use reveal::{
    IntersectionCallback, IntersectionEntry, ObservationId, ObserverOptions, Rect, RevealConfig,
    RevealController, RevealPhase, RootMargin, SentinelHandle, ViewportObserver,
    VisibilityObserver,
};
use reveal_core::{Deferred, ManualClock, ScheduledTaskId, TaskScheduler};
use slotmap::SlotMap;

// ============================================================================
// Test doubles
// ============================================================================

/// Observer whose visibility is set directly by the test.
#[derive(Default)]
struct ScriptedObserver {
    observations: Mutex<SlotMap<ObservationId, (SentinelHandle, IntersectionCallback)>>,
    visible: Mutex<Option<bool>>,
    refreshes: Mutex<usize>,
}

impl ScriptedObserver {
    fn show(&self) {
        self.set_visible(true);
    }

    fn hide(&self) {
        self.set_visible(false);
    }

    fn set_visible(&self, visible: bool) {
        *self.visible.lock() = Some(visible);
        let callbacks: Vec<_> = self
            .observations
            .lock()
            .values()
            .map(|(target, callback)| (*target, callback.clone()))
            .collect();
        for (target, callback) in callbacks {
            callback(&entry(target, visible));
        }
    }

    fn observation_count(&self) -> usize {
        self.observations.lock().len()
    }

    fn refresh_count(&self) -> usize {
        *self.refreshes.lock()
    }
}

fn entry(target: SentinelHandle, visible: bool) -> IntersectionEntry {
    IntersectionEntry {
        target,
        is_intersecting: visible,
        intersection_ratio: if visible { 1.0 } else { 0.0 },
    }
}

impl VisibilityObserver for ScriptedObserver {
    fn observe(
        &self,
        target: SentinelHandle,
        _options: ObserverOptions,
        callback: IntersectionCallback,
    ) -> ObservationId {
        self.observations.lock().insert((target, callback))
    }

    fn disconnect(&self, id: ObservationId) -> bool {
        self.observations.lock().remove(id).is_some()
    }

    fn refresh(&self, id: ObservationId) {
        *self.refreshes.lock() += 1;
        let visible = *self.visible.lock();
        let observation = self.observations.lock().get(id).cloned();
        if let (Some(visible), Some((target, callback))) = (visible, observation) {
            callback(&entry(target, visible));
        }
    }
}

/// Deferred whose `cancel` is a no-op, so teardown cannot stop a timer.
struct UncancellableDeferred(Arc<TaskScheduler>);

impl Deferred for UncancellableDeferred {
    fn schedule_once(
        &self,
        delay: Duration,
        task: Box<dyn FnOnce() + Send + 'static>,
    ) -> ScheduledTaskId {
        self.0.schedule_once(delay, task)
    }

    fn cancel(&self, _id: ScheduledTaskId) -> bool {
        false
    }
}

/// Deferred that runs every task before `schedule_once` returns.
struct ImmediateDeferred;

impl Deferred for ImmediateDeferred {
    fn schedule_once(
        &self,
        _delay: Duration,
        task: Box<dyn FnOnce() + Send + 'static>,
    ) -> ScheduledTaskId {
        task();
        ScheduledTaskId::default()
    }

    fn cancel(&self, _id: ScheduledTaskId) -> bool {
        false
    }
}

struct Fixture {
    clock: ManualClock,
    scheduler: Arc<TaskScheduler>,
    observer: Arc<ScriptedObserver>,
}

impl Fixture {
    fn new() -> Self {
        let clock = ManualClock::new();
        Self {
            scheduler: Arc::new(TaskScheduler::new(Arc::new(clock.clone()))),
            clock,
            observer: Arc::new(ScriptedObserver::default()),
        }
    }

    fn controller(&self, len: u32) -> RevealController<u32> {
        let controller = RevealController::new(
            (0..len).collect::<Vec<_>>(),
            RevealConfig::default(),
            self.scheduler.clone(),
        );
        controller.attach_sentinel(self.observer.clone());
        controller
    }

    fn elapse(&self, ms: u64) -> usize {
        self.clock.advance(Duration::from_millis(ms));
        self.scheduler.process_ready()
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_fifty_items_end_to_end() {
    let fx = Fixture::new();
    let controller = fx.controller(50);

    assert_eq!(controller.display_count(), 20);
    assert!(!controller.is_loading());

    fx.observer.show();
    assert!(controller.is_loading());
    assert_eq!(controller.display_count(), 20);

    // Re-layout pushes the sentinel out of view.
    fx.observer.hide();
    fx.elapse(500);
    assert_eq!(controller.display_count(), 40);
    assert!(!controller.is_loading());
    assert!(controller.has_more());

    fx.observer.show();
    fx.elapse(500);
    assert_eq!(controller.display_count(), 50);
    assert!(!controller.has_more());
    assert_eq!(&*controller.displayed_items(), &(0..50).collect::<Vec<_>>()[..]);

    fx.observer.show();
    assert!(!controller.is_loading());
    assert_eq!(fx.scheduler.active_count(), 0);
    fx.elapse(500);
    assert_eq!(controller.display_count(), 50);
}

#[test]
fn test_signals_while_loading_do_not_stack() {
    let fx = Fixture::new();
    let controller = fx.controller(100);

    fx.observer.show();
    fx.observer.show();
    fx.observer.hide();
    fx.observer.show();
    assert_eq!(fx.scheduler.active_count(), 1);

    fx.observer.hide();
    fx.elapse(500);
    assert_eq!(controller.display_count(), 40);
    assert_eq!(fx.scheduler.active_count(), 0);
}

#[test]
fn test_display_count_is_monotonic_for_one_collection() {
    let fx = Fixture::new();
    let controller = fx.controller(95);
    let seen = Arc::new(Mutex::new(vec![controller.display_count()]));

    let seen_clone = seen.clone();
    controller
        .display_count_changed()
        .connect(move |&count| seen_clone.lock().push(count));

    fx.observer.show();
    for _ in 0..10 {
        fx.elapse(500);
    }

    let seen = seen.lock();
    assert_eq!(*seen, vec![20, 40, 60, 80, 95]);
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_replacement_resets_and_clamps_inflight_load() {
    let fx = Fixture::new();
    let controller = fx.controller(100);

    fx.observer.show();
    assert!(controller.is_loading());

    controller.set_items(vec![1, 2, 3, 4, 5]);
    assert_eq!(controller.display_count(), 5);
    assert!(!controller.is_loading());
    assert_eq!(controller.phase(), RevealPhase::Idle);
    assert!(!controller.has_more());

    // The timer from before the replacement still fires, clamped.
    fx.elapse(500);
    assert_eq!(controller.display_count(), 5);
    assert_eq!(controller.displayed_items().len(), 5);
}

#[test]
fn test_replacement_with_longer_collection_keeps_inflight_timer() {
    let fx = Fixture::new();
    let controller = fx.controller(30);

    fx.observer.show();
    controller.set_items((100..200).collect::<Vec<_>>());
    assert_eq!(controller.display_count(), 20);
    assert!(!controller.is_loading());

    // Still visible, but the old timer is pending: no second timer.
    assert_eq!(fx.scheduler.active_count(), 1);

    fx.observer.hide();
    fx.elapse(500);
    assert_eq!(controller.display_count(), 40);
    assert_eq!(controller.displayed_items()[0], 100);
}

#[test]
fn test_reset_refreshes_observation() {
    let fx = Fixture::new();
    let controller = fx.controller(100);
    let before = fx.observer.refresh_count();

    controller.set_items_per_page(10);
    assert_eq!(controller.display_count(), 10);
    assert_eq!(fx.observer.refresh_count(), before + 1);

    controller.set_items_per_page(10);
    assert_eq!(fx.observer.refresh_count(), before + 1);
}

#[test]
fn test_dispose_while_loading_freezes_state() {
    let fx = Fixture::new();
    let deferred = Arc::new(UncancellableDeferred(fx.scheduler.clone()));
    let controller =
        RevealController::new((0..50).collect::<Vec<u32>>(), RevealConfig::default(), deferred);
    controller.attach_sentinel(fx.observer.clone());

    fx.observer.show();
    assert!(controller.is_loading());

    controller.dispose();
    controller.dispose();
    assert!(controller.is_disposed());
    assert_eq!(fx.observer.observation_count(), 0);

    // The timer could not be cancelled and runs anyway.
    assert_eq!(fx.elapse(500), 1);
    assert_eq!(controller.display_count(), 20);
    assert!(controller.is_loading());

    controller.set_items(vec![1, 2, 3]);
    assert_eq!(controller.total_count(), 50);
}

#[test]
fn test_drop_while_loading_is_harmless() {
    let fx = Fixture::new();
    let deferred = Arc::new(UncancellableDeferred(fx.scheduler.clone()));
    let controller =
        RevealController::new((0..50).collect::<Vec<u32>>(), RevealConfig::default(), deferred);
    controller.attach_sentinel(fx.observer.clone());

    fx.observer.show();
    drop(controller);
    assert_eq!(fx.observer.observation_count(), 0);
    assert_eq!(fx.elapse(500), 1);
}

#[test]
fn test_dispose_cancels_pending_timer() {
    let fx = Fixture::new();
    let controller = fx.controller(50);

    fx.observer.show();
    assert_eq!(fx.scheduler.active_count(), 1);

    controller.dispose();
    assert_eq!(fx.scheduler.active_count(), 0);
    assert_eq!(fx.elapse(500), 0);
}

#[test]
fn test_synchronous_deferred_reveals_to_the_end() {
    let observer = Arc::new(ScriptedObserver::default());
    let controller = RevealController::new(
        (0..50).collect::<Vec<u32>>(),
        RevealConfig::default(),
        Arc::new(ImmediateDeferred),
    );
    controller.attach_sentinel(observer.clone());

    observer.show();
    assert_eq!(controller.display_count(), 50);
    assert!(!controller.is_loading());
}

#[test]
fn test_synchronous_deferred_single_item_pages_keep_stack_flat() {
    let viewport = Arc::new(ViewportObserver::new(Rect::new(0.0, 0.0, 400.0, 800.0)));
    let controller = RevealController::new(
        (0..50_000).collect::<Vec<u32>>(),
        RevealConfig::default().with_items_per_page(1),
        Arc::new(ImmediateDeferred),
    );
    controller.attach_sentinel(viewport.clone());

    // A sentinel that never leaves the viewport pulls in every page.
    viewport.set_target_rect(controller.sentinel(), Rect::new(0.0, 400.0, 400.0, 40.0));

    assert_eq!(controller.display_count(), 50_000);
    assert!(!controller.has_more());
    assert!(!controller.is_loading());
    assert_eq!(controller.displayed_items().last(), Some(&49_999));
}

#[test]
fn test_slots_may_read_controller() {
    let fx = Fixture::new();
    let controller = Arc::new(fx.controller(50));
    let observed = Arc::new(Mutex::new(Vec::new()));

    let weak = Arc::downgrade(&controller);
    let observed_clone = observed.clone();
    controller.loading_changed().connect(move |&loading| {
        if let Some(controller) = weak.upgrade() {
            observed_clone.lock().push((loading, controller.display_count()));
        }
    });

    fx.observer.show();
    fx.observer.hide();
    fx.elapse(500);

    assert_eq!(*observed.lock(), vec![(true, 20), (false, 40)]);
}

#[test]
fn test_empty_collection_never_loads() {
    let fx = Fixture::new();
    let controller = fx.controller(0);

    assert_eq!(controller.display_count(), 0);
    assert!(!controller.has_more());
    fx.observer.show();
    assert!(!controller.is_loading());
    assert_eq!(controller.snapshot().to_string(), "Showing 0 of 0");
}

// ============================================================================
// Geometric observation
// ============================================================================

const ROW_HEIGHT: f32 = 50.0;

#[test]
fn test_scrolling_a_laid_out_list() {
    let clock = ManualClock::new();
    let scheduler = Arc::new(TaskScheduler::new(Arc::new(clock.clone())));
    let viewport = Arc::new(ViewportObserver::new(Rect::new(0.0, 0.0, 400.0, 500.0)));

    let config = RevealConfig::from_toml_str(
        r#"
        items_per_page = 10
        load_more_delay_ms = 100
        root_margin = "0px"
        "#,
    )
    .unwrap();
    let controller = RevealController::new((0..35).collect::<Vec<u32>>(), config, scheduler.clone());
    assert_eq!(controller.observer_options().root_margin, RootMargin::ZERO);

    let sentinel = controller.sentinel();
    let layout = {
        let viewport = viewport.clone();
        move |count: usize| {
            let top = count as f32 * ROW_HEIGHT;
            viewport.set_target_rect(sentinel, Rect::new(0.0, top, 400.0, 40.0));
        }
    };
    layout(controller.display_count());
    controller.display_count_changed().connect(move |&count| layout(count));
    controller.attach_sentinel(viewport.clone());

    // Sentinel touches the bottom edge only.
    assert!(!controller.is_loading());

    let step = |offset: f32| {
        viewport.scroll_to(offset);
        clock.advance(Duration::from_millis(100));
        scheduler.process_ready();
    };

    step(100.0);
    assert_eq!(controller.display_count(), 20);
    assert!(!controller.is_loading());

    step(600.0);
    assert_eq!(controller.display_count(), 30);

    step(1100.0);
    assert_eq!(controller.display_count(), 35);
    assert!(!controller.has_more());

    step(1400.0);
    assert_eq!(controller.display_count(), 35);
    assert_eq!(scheduler.active_count(), 0);
}
