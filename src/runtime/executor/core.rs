use super::worker::Worker;
use crate::error::{Result, SchedulerError};
use crate::runtime::context::{SchedulerId, is_current};
use crate::runtime::operation::{Cancel, DelayedOperation, OperationId, Tag, TaggedOperation, Work};
use crate::runtime::schedule::Schedule;
use crate::runtime::scheduler::Scheduler;

use parking_lot::{Condvar, Mutex};

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Deadline used for delays too large to be represented as an [`Instant`].
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// State shared between a [`ThreadScheduler`] and its worker thread.
pub(crate) struct Shared {
    pub(crate) id: SchedulerId,

    pub(crate) state: Mutex<State>,

    /// Wakes the worker when work arrives or the earliest deadline moves.
    pub(crate) condvar: Condvar,
}

pub(crate) struct State {
    /// Work submitted for immediate execution, in submission order.
    pub(crate) immediate: VecDeque<Work>,

    /// Pending delayed operations.
    pub(crate) schedule: Schedule<Instant>,

    /// Set once the owning scheduler is being dropped.
    pub(crate) shutdown: bool,
}

impl Shared {
    fn new() -> Self {
        Self {
            id: SchedulerId::next(),
            state: Mutex::new(State {
                immediate: VecDeque::new(),
                schedule: Schedule::new(),
                shutdown: false,
            }),
            condvar: Condvar::new(),
        }
    }
}

impl Cancel for Shared {
    fn cancel(&self, id: OperationId) -> bool {
        // Dropped outside of the lock: the work's captures may run
        // arbitrary code on drop.
        let removed = self.state.lock().schedule.remove(id);
        removed.is_some()
    }

    fn is_pending(&self, id: OperationId) -> bool {
        self.state.lock().schedule.contains(id)
    }
}

/// A timer-backed scheduler running all work on one dedicated thread.
///
/// `ThreadScheduler` is responsible for:
/// - running immediate work in FIFO order,
/// - firing delayed operations once their deadline passes,
/// - keeping track of pending operations for cancellation and
///   introspection.
///
/// Dropping the scheduler stops the worker and discards any work that has
/// not started yet. Use [`SchedulerBuilder`](crate::SchedulerBuilder) to
/// configure the worker thread.
pub struct ThreadScheduler {
    shared: Arc<Shared>,

    /// Join handle of the worker thread.
    worker: Option<JoinHandle<()>>,
}

impl ThreadScheduler {
    /// Creates a scheduler with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Spawn`] if the worker thread cannot be
    /// started.
    pub fn new() -> Result<Self> {
        crate::SchedulerBuilder::new().build()
    }

    /// Spawns the worker thread from a prepared thread builder.
    pub(crate) fn spawn(builder: thread::Builder) -> Result<Self> {
        let shared = Arc::new(Shared::new());

        let worker = builder.spawn({
            let shared = shared.clone();
            move || Worker::new(shared).run()
        })?;

        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    /// Returns the identity of this scheduler.
    pub fn id(&self) -> SchedulerId {
        self.shared.id
    }

    /// Runs immediate work on the calling thread until the queue is empty.
    ///
    /// Only valid from inside this scheduler's context, where the worker
    /// is busy running the caller and serialization is preserved.
    fn drain_immediate(&self) {
        loop {
            let next = self.shared.state.lock().immediate.pop_front();
            let Some(work) = next else {
                break;
            };

            work();
        }
    }
}

impl Scheduler for ThreadScheduler {
    fn execute_now(&self, work: Work) {
        {
            let mut state = self.shared.state.lock();

            // Work submitted after shutdown has begun is silently dropped.
            if state.shutdown {
                return;
            }

            state.immediate.push_back(work);
        }

        self.shared.condvar.notify_one();
    }

    fn execute_blocking(&self, work: Work) -> Result<()> {
        if self.is_executing_context() {
            self.drain_immediate();
            work();
            return Ok(());
        }

        let (transmitter, receiver) = mpsc::channel();

        self.execute_now(Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(work));
            let _ = transmitter.send(outcome.is_ok());

            if let Err(payload) = outcome {
                panic::resume_unwind(payload);
            }
        }));

        match receiver.recv() {
            Ok(true) => Ok(()),
            Ok(false) => Err(SchedulerError::WorkPanicked),
            Err(_) => Err(SchedulerError::ShutDown),
        }
    }

    fn schedule(&self, delay: Duration, operation: TaggedOperation) -> DelayedOperation {
        let now = Instant::now();
        let deadline = now
            .checked_add(delay)
            .unwrap_or_else(|| now + FAR_FUTURE);
        let tag = operation.tag;

        let id = self.shared.state.lock().schedule.push(deadline, operation);
        self.shared.condvar.notify_one();

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

impl Drop for ThreadScheduler {
    /// Shuts down the scheduler.
    ///
    /// This performs the following steps:
    /// 1. Flags shutdown and takes every operation that has not started
    /// 2. Wakes the worker so it can observe the flag
    /// 3. Joins the worker, unless the drop happens on the worker itself
    fn drop(&mut self) {
        let (immediate, scheduled) = {
            let mut state = self.shared.state.lock();
            state.shutdown = true;

            (std::mem::take(&mut state.immediate), state.schedule.drain())
        };

        tracing::debug!(
            scheduler = %self.shared.id,
            immediate = immediate.len(),
            scheduled = scheduled.len(),
            "shutting down, discarding unstarted work"
        );
        drop((immediate, scheduled));

        self.shared.condvar.notify_all();

        if let Some(worker) = self.worker.take() {
            if worker.thread().id() != thread::current().id() {
                let _ = worker.join();
            }
        }
    }
}
