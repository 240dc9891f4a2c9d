//! A checked serial queue on top of a [`Scheduler`].
//!
//! [`SerialQueue`] is what higher layers (streams, idle timers, online
//! state tracking) submit their work to. On top of the scheduler it adds:
//! - assertions that operations never nest inside each other,
//! - [`TimerId`]-tagged delayed operations, at most one per id,
//! - a way for tests to run delayed operations early.

mod timer_id;

pub use timer_id::TimerId;

use crate::error::Result;
use crate::runtime::{DelayedOperation, Scheduler, Tag, TaggedOperation, Work};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

struct Inner {
    scheduler: Arc<dyn Scheduler>,

    /// Set while an operation submitted through this queue is running.
    operation_in_progress: AtomicBool,
}

impl Inner {
    fn verify_is_current_queue(&self) {
        assert!(
            self.scheduler.is_executing_context(),
            "expected to be called on the serial queue (invoker: {})",
            self.scheduler.current_context_id()
        );
    }

    fn verify_sequential_order(&self) {
        assert!(
            !self.operation_in_progress.load(Ordering::Acquire)
                || !self.scheduler.is_executing_context(),
            "enforcing sequential order failed: currently executing operations \
             cannot enqueue nested operations (invoker: {})",
            self.scheduler.current_context_id()
        );
    }

    /// Runs `operation` with the in-progress flag raised.
    fn start_execution(&self, operation: impl FnOnce()) {
        struct Finished<'a>(&'a AtomicBool);

        impl Drop for Finished<'_> {
            fn drop(&mut self) {
                self.0.store(false, Ordering::Release);
            }
        }

        self.verify_is_current_queue();
        assert!(
            !self.operation_in_progress.swap(true, Ordering::AcqRel),
            "start_execution may not be called before the previous operation finishes"
        );

        let _finished = Finished(&self.operation_in_progress);
        operation();
    }
}

/// A serial queue that enforces sequential, non-nested execution.
///
/// Cloning a `SerialQueue` yields another handle to the same queue.
/// Operations that are still pending when the last handle is dropped never
/// run.
///
/// # Examples
///
/// ```rust,ignore
/// let queue = SerialQueue::new(Arc::new(ThreadScheduler::new()?));
///
/// queue.enqueue_blocking(|| println!("on the queue"))?;
/// ```
#[derive(Clone)]
pub struct SerialQueue {
    inner: Arc<Inner>,
}

impl SerialQueue {
    pub fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            inner: Arc::new(Inner {
                scheduler,
                operation_in_progress: AtomicBool::new(false),
            }),
        }
    }

    /// The scheduler this queue submits its operations to.
    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.inner.scheduler
    }

    /// Panics unless called from the queue's execution context.
    pub fn verify_is_current_queue(&self) {
        self.inner.verify_is_current_queue();
    }

    /// Panics unless called from inside an operation of this queue.
    pub fn verify_called_from_operation(&self) {
        self.inner.verify_is_current_queue();
        assert!(
            self.inner.operation_in_progress.load(Ordering::Acquire),
            "verify_called_from_operation called when no operation is executing (invoker: {})",
            self.inner.scheduler.current_context_id()
        );
    }

    /// Submits `operation` for asynchronous execution.
    ///
    /// # Panics
    ///
    /// Panics if called from inside an operation of this queue; use
    /// [`enqueue_allowing_nesting`](Self::enqueue_allowing_nesting) there.
    pub fn enqueue<F>(&self, operation: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.verify_sequential_order();
        self.enqueue_allowing_nesting(operation);
    }

    /// Like [`enqueue`](Self::enqueue), but may be called from inside an
    /// operation of this queue.
    pub fn enqueue_allowing_nesting<F>(&self, operation: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.scheduler.execute_now(self.wrap(operation));
    }

    /// Submits `operation` and blocks until it has run.
    ///
    /// # Panics
    ///
    /// Panics if called from inside an operation of this queue.
    ///
    /// # Errors
    ///
    /// Propagates the scheduler's [`execute_blocking`](Scheduler::execute_blocking)
    /// errors.
    pub fn enqueue_blocking<F>(&self, operation: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.verify_sequential_order();
        self.inner.scheduler.execute_blocking(self.wrap(operation))
    }

    /// Schedules `operation` to run after `delay` under `timer_id`.
    ///
    /// # Panics
    ///
    /// Panics if not called from the queue's context, or if an operation
    /// with the same `timer_id` is already scheduled.
    pub fn enqueue_after_delay<F>(
        &self,
        delay: Duration,
        timer_id: TimerId,
        operation: F,
    ) -> DelayedOperation
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.verify_is_current_queue();
        assert!(
            !self.inner.scheduler.has_pending(timer_id.into()),
            "attempted to schedule multiple operations with id {timer_id:?}"
        );

        self.inner.scheduler.schedule(
            delay,
            TaggedOperation {
                tag: timer_id.into(),
                work: self.wrap(operation),
            },
        )
    }

    /// Returns `true` if an operation is scheduled under `timer_id`.
    ///
    /// # Panics
    ///
    /// Panics if not called from the queue's context.
    pub fn is_scheduled(&self, timer_id: TimerId) -> bool {
        self.inner.verify_is_current_queue();
        self.inner.scheduler.has_pending(timer_id.into())
    }

    /// Runs scheduled operations early, in deadline order, until the one
    /// scheduled under `last` has run, or until the schedule is empty for
    /// [`TimerId::All`]. Blocks until done.
    ///
    /// # Panics
    ///
    /// Panics if called from the queue's own context. On the queue, the
    /// operation also fails if nothing is scheduled or if `last` is not
    /// scheduled.
    ///
    /// # Errors
    ///
    /// Propagates the scheduler's [`execute_blocking`](Scheduler::execute_blocking)
    /// errors.
    pub fn run_scheduled_operations_until(&self, last: TimerId) -> Result<()> {
        assert!(
            !self.inner.scheduler.is_executing_context(),
            "run_scheduled_operations_until may not be called from the serial queue"
        );

        let inner = Arc::downgrade(&self.inner);

        self.inner.scheduler.execute_blocking(Box::new(move || {
            let Some(inner) = inner.upgrade() else {
                return;
            };
            let scheduler = &inner.scheduler;
            let last_tag = Tag::from(last);

            assert!(
                last == TimerId::All || scheduler.has_pending(last_tag),
                "attempted to run scheduled operations until missing timer {last:?}"
            );
            assert!(
                !scheduler.is_schedule_empty(),
                "attempted to run scheduled operations with an empty schedule"
            );

            loop {
                let operation = scheduler.pop_earliest();
                let tag = operation.tag;

                tracing::debug!(%tag, "running scheduled operation early");
                operation.run();

                if scheduler.is_schedule_empty() || (last != TimerId::All && tag == last_tag) {
                    break;
                }
            }
        }))
    }

    /// Wraps `operation` so it runs under the queue's sequencing checks.
    ///
    /// The wrapper only holds a weak reference to the queue, so pending
    /// work never keeps the queue and its scheduler alive.
    fn wrap<F>(&self, operation: F) -> Work
    where
        F: FnOnce() + Send + 'static,
    {
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);

        Box::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.start_execution(operation);
            }
        })
    }
}
