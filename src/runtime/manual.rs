use super::context::{SchedulerId, enter_context, is_current};
use super::operation::{Cancel, DelayedOperation, OperationId, Tag, TaggedOperation, Work};
use super::schedule::Schedule;
use super::scheduler::Scheduler;
use crate::error::Result;

use parking_lot::{Mutex, ReentrantMutex};

use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::time::Duration;

struct Shared {
    id: SchedulerId,
    state: Mutex<State>,
}

struct State {
    /// Virtual time elapsed since the scheduler was created.
    now: Duration,
    immediate: VecDeque<Work>,
    schedule: Schedule<Duration>,
}

impl Cancel for Shared {
    fn cancel(&self, id: OperationId) -> bool {
        let removed = self.state.lock().schedule.remove(id);
        removed.is_some()
    }

    fn is_pending(&self, id: OperationId) -> bool {
        self.state.lock().schedule.contains(id)
    }
}

/// A deterministic scheduler driven by hand.
///
/// Nothing runs on its own: immediate work waits for
/// [`run_until_idle`](Self::run_until_idle) and delayed work waits for the
/// virtual clock to be moved with [`advance`](Self::advance). All work runs
/// on the thread that drives the scheduler, inside its context, so
/// ordering properties can be checked without real delays.
///
/// Driving is serialized: if two threads drive the same scheduler, one
/// waits for the other. Work may drive the scheduler reentrantly.
///
/// Panics raised by work propagate to the driving caller.
pub struct ManualScheduler {
    shared: Arc<Shared>,

    /// Held while running work; reentrant so work can drive the scheduler.
    drive: ReentrantMutex<()>,
}

impl ManualScheduler {
    /// Creates an idle scheduler with its clock at zero.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                id: SchedulerId::next(),
                state: Mutex::new(State {
                    now: Duration::ZERO,
                    immediate: VecDeque::new(),
                    schedule: Schedule::new(),
                }),
            }),
            drive: ReentrantMutex::new(()),
        }
    }

    /// Returns the identity of this scheduler.
    pub fn id(&self) -> SchedulerId {
        self.shared.id
    }

    /// Current virtual time, measured from the scheduler's creation.
    pub fn now(&self) -> Duration {
        self.shared.state.lock().now
    }

    /// Number of immediate operations waiting to run.
    pub fn pending_immediate(&self) -> usize {
        self.shared.state.lock().immediate.len()
    }

    /// Number of delayed operations in the schedule.
    pub fn scheduled_len(&self) -> usize {
        self.shared.state.lock().schedule.len()
    }

    /// Runs immediate work until the queue is empty.
    ///
    /// Work enqueued while draining runs as well. Returns the number of
    /// operations that ran.
    pub fn run_until_idle(&self) -> usize {
        let _driving = self.drive.lock();
        let mut ran = 0;

        loop {
            let next = self.shared.state.lock().immediate.pop_front();
            let Some(work) = next else {
                break;
            };

            enter_context(self.shared.id, work);
            ran += 1;
        }

        ran
    }

    /// Moves the virtual clock forward by `by`, running everything that
    /// becomes due on the way.
    ///
    /// Pending immediate work runs first. Then delayed operations fire in
    /// deadline order, with the clock set to each deadline as it fires and
    /// immediate work drained after each one. Returns the number of
    /// operations that ran.
    pub fn advance(&self, by: Duration) -> usize {
        let _driving = self.drive.lock();
        let target = self.now().saturating_add(by);
        let mut ran = self.run_until_idle();

        while let Some(operation) = self.fire_next(|due| due <= target) {
            tracing::trace!(scheduler = %self.shared.id, tag = %operation.tag, "firing delayed operation");

            enter_context(self.shared.id, operation.work);
            ran += 1 + self.run_until_idle();
        }

        let mut state = self.shared.state.lock();
        state.now = state.now.max(target);

        ran
    }

    /// Fires delayed operations in deadline order, regardless of how far
    /// away they are, until one tagged `tag` has run.
    ///
    /// The clock follows each fired deadline. Returns the number of
    /// operations that ran, immediate work included.
    ///
    /// # Panics
    ///
    /// Panics if no pending operation carries `tag`.
    pub fn run_delayed_until(&self, tag: Tag) -> usize {
        let _driving = self.drive.lock();
        assert!(
            self.has_pending(tag),
            "run_delayed_until: no pending operation tagged {tag}"
        );

        let mut ran = self.run_until_idle();

        while let Some(operation) = self.fire_next(|_| true) {
            let fired = operation.tag;

            enter_context(self.shared.id, operation.work);
            ran += 1 + self.run_until_idle();

            if fired == tag {
                break;
            }
        }

        ran
    }

    /// Pops the earliest operation if `ready` accepts its deadline, and
    /// moves the clock to that deadline.
    fn fire_next(&self, ready: impl FnOnce(Duration) -> bool) -> Option<TaggedOperation> {
        let mut state = self.shared.state.lock();
        let due = state.schedule.next_due().filter(|due| ready(*due))?;

        let (_, operation) = state.schedule.pop_earliest()?;
        state.now = state.now.max(due);

        Some(operation)
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for ManualScheduler {
    fn execute_now(&self, work: Work) {
        self.shared.state.lock().immediate.push_back(work);
    }

    /// Runs the pending immediate work and then `work` on the calling
    /// thread, inside this scheduler's context.
    fn execute_blocking(&self, work: Work) -> Result<()> {
        let _driving = self.drive.lock();

        self.run_until_idle();
        enter_context(self.shared.id, work);

        Ok(())
    }

    fn schedule(&self, delay: Duration, operation: TaggedOperation) -> DelayedOperation {
        let tag = operation.tag;
        let id = {
            let mut state = self.shared.state.lock();
            let due = state.now.saturating_add(delay);
            state.schedule.push(due, operation)
        };

        tracing::trace!(scheduler = %self.shared.id, %tag, ?delay, "scheduled delayed operation");

        let scheduler: Weak<Shared> = Arc::downgrade(&self.shared);
        DelayedOperation::new(scheduler, id)
    }

    fn is_executing_context(&self) -> bool {
        is_current(self.shared.id)
    }

    fn has_pending(&self, tag: Tag) -> bool {
        self.shared.state.lock().schedule.has_tag(tag)
    }

    fn is_schedule_empty(&self) -> bool {
        self.shared.state.lock().schedule.is_empty()
    }

    fn pop_earliest(&self) -> TaggedOperation {
        let popped = self.shared.state.lock().schedule.pop_earliest();

        match popped {
            Some((_, operation)) => operation,
            None => panic!("pop_earliest called on an empty schedule"),
        }
    }
}
