//! Deferred task scheduling driven by a [`Clock`].
//!
//! The scheduler runs one-shot tasks after a delay. It never spawns threads
//! or sleeps: the owning event loop calls [`TaskScheduler::process_ready`] to
//! run whatever has come due. With a [`ManualClock`](crate::ManualClock) that
//! makes timing fully deterministic.
//!
//! Components that only need "run this later, maybe cancel it" should take
//! the narrower [`Deferred`] capability instead of the concrete scheduler.
//!
//! # Example
//!
//! ```
//! use reveal_core::{ManualClock, TaskScheduler};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::time::Duration;
//!
//! let clock = ManualClock::new();
//! let scheduler = TaskScheduler::new(Arc::new(clock.clone()));
//! let fired = Arc::new(AtomicUsize::new(0));
//!
//! let fired_clone = fired.clone();
//! scheduler.schedule_once(Duration::from_millis(500), move || {
//!     fired_clone.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! clock.advance(Duration::from_millis(499));
//! assert_eq!(scheduler.process_ready(), 0);
//!
//! clock.advance(Duration::from_millis(1));
//! assert_eq!(scheduler.process_ready(), 1);
//! assert_eq!(fired.load(Ordering::SeqCst), 1);
//! ```

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::clock::Clock;
use crate::error::{Result, SchedulerError};
use crate::logging::targets;

new_key_type! {
    /// Identifies a pending task.
    pub struct ScheduledTaskId;
}

/// The "run this later" capability.
///
/// This is the seam for injecting time into components: production code
/// hands them a [`TaskScheduler`] on a [`SystemClock`](crate::SystemClock),
/// tests hand them one on a [`ManualClock`](crate::ManualClock).
pub trait Deferred: Send + Sync {
    /// Run `task` once after `delay`.
    fn schedule_once(
        &self,
        delay: Duration,
        task: Box<dyn FnOnce() + Send + 'static>,
    ) -> ScheduledTaskId;

    /// Cancel a pending task. Returns `false` if it already ran or was cancelled.
    fn cancel(&self, id: ScheduledTaskId) -> bool;
}

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Heap entry; the heap yields the earliest deadline, oldest first on ties.
#[derive(Debug, Clone, Copy)]
struct Deadline {
    id: ScheduledTaskId,
    at: Duration,
    seq: u64,
}

impl PartialEq for Deadline {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for Deadline {}

impl PartialOrd for Deadline {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Deadline {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap.
        other.at.cmp(&self.at).then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
struct PendingTasks {
    tasks: SlotMap<ScheduledTaskId, Task>,
    deadlines: BinaryHeap<Deadline>,
    next_seq: u64,
}

impl PendingTasks {
    fn insert(&mut self, at: Duration, task: Task) -> ScheduledTaskId {
        let id = self.tasks.insert(task);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.deadlines.push(Deadline { id, at, seq });
        id
    }

    /// Discard deadlines whose task was cancelled.
    fn skip_cancelled(&mut self) {
        while let Some(deadline) = self.deadlines.peek() {
            if self.tasks.contains_key(deadline.id) {
                break;
            }
            self.deadlines.pop();
        }
    }

    /// Take the next task due at `now` that was queued before `seq_limit`.
    fn pop_due(&mut self, now: Duration, seq_limit: u64) -> Option<(ScheduledTaskId, Task)> {
        self.skip_cancelled();
        let deadline = *self.deadlines.peek()?;
        if deadline.at > now || deadline.seq >= seq_limit {
            return None;
        }
        self.deadlines.pop();
        let task = self.tasks.remove(deadline.id)?;
        Some((deadline.id, task))
    }
}

/// Clock-driven scheduler for one-shot tasks.
///
/// All methods take `&self`; the scheduler is meant to be shared behind an
/// `Arc` between the event loop that drains it and the components that
/// schedule onto it. Tasks run on the thread that calls
/// [`process_ready`](Self::process_ready), with no internal lock held, so a
/// task may schedule or cancel other tasks.
pub struct TaskScheduler {
    clock: Arc<dyn Clock>,
    pending: Mutex<PendingTasks>,
}

impl std::fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("now", &self.clock.now())
            .field("active_count", &self.active_count())
            .finish()
    }
}

impl TaskScheduler {
    /// Create a scheduler reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            pending: Mutex::new(PendingTasks::default()),
        }
    }

    /// Run `task` once, `delay` from now.
    pub fn schedule_once<F>(&self, delay: Duration, task: F) -> ScheduledTaskId
    where
        F: FnOnce() + Send + 'static,
    {
        let at = self.clock.now() + delay;
        let id = self.pending.lock().insert(at, Box::new(task));
        tracing::trace!(target: targets::SCHEDULER, ?id, ?delay, "scheduled task");
        id
    }

    /// Cancel a pending task.
    ///
    /// Fails with [`SchedulerError::InvalidTaskId`] if it already ran or was
    /// cancelled before.
    pub fn cancel(&self, id: ScheduledTaskId) -> Result<()> {
        if self.pending.lock().tasks.remove(id).is_some() {
            tracing::trace!(target: targets::SCHEDULER, ?id, "cancelled task");
            Ok(())
        } else {
            Err(SchedulerError::InvalidTaskId.into())
        }
    }

    /// Whether a task is still waiting to run.
    pub fn is_active(&self, id: ScheduledTaskId) -> bool {
        self.pending.lock().tasks.contains_key(id)
    }

    /// Time until the earliest pending task is due, if any.
    pub fn time_until_next(&self) -> Option<Duration> {
        let mut pending = self.pending.lock();
        pending.skip_cancelled();
        let now = self.clock.now();
        pending
            .deadlines
            .peek()
            .map(|deadline| deadline.at.saturating_sub(now))
    }

    /// Number of tasks waiting to run.
    pub fn active_count(&self) -> usize {
        self.pending.lock().tasks.len()
    }

    /// Run every task that is due.
    ///
    /// Tasks scheduled while this call is running wait for the next call,
    /// even with a zero delay. Returns the number of tasks executed.
    #[tracing::instrument(skip(self), target = "reveal_core::scheduler", level = "trace")]
    pub fn process_ready(&self) -> usize {
        let now = self.clock.now();
        let seq_limit = self.pending.lock().next_seq;
        let mut executed = 0;

        loop {
            let due = self.pending.lock().pop_due(now, seq_limit);
            let Some((id, task)) = due else {
                break;
            };
            tracing::trace!(target: targets::SCHEDULER, ?id, "running task");
            task();
            executed += 1;
        }

        executed
    }
}

impl Deferred for TaskScheduler {
    fn schedule_once(
        &self,
        delay: Duration,
        task: Box<dyn FnOnce() + Send + 'static>,
    ) -> ScheduledTaskId {
        TaskScheduler::schedule_once(self, delay, task)
    }

    fn cancel(&self, id: ScheduledTaskId) -> bool {
        TaskScheduler::cancel(self, id).is_ok()
    }
}
