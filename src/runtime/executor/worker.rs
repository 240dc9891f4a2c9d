use super::core::Shared;
use crate::runtime::context::enter_context;
use crate::runtime::operation::Work;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

/// The worker thread of a [`ThreadScheduler`](super::ThreadScheduler).
///
/// A single worker drains both queues of its scheduler, which is what
/// makes the scheduler serial. The selection order is:
/// 1. Pop from the immediate queue
/// 2. Pop the earliest scheduled operation, if it is due
/// 3. Park until the earliest deadline or until new work arrives
pub(crate) struct Worker {
    shared: Arc<Shared>,
}

impl Worker {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Runs the worker loop until the scheduler shuts down.
    ///
    /// Work is always run with the state lock released, so it may freely
    /// submit, schedule or cancel further work on the same scheduler.
    pub(crate) fn run(&self) {
        tracing::debug!(scheduler = %self.shared.id, "worker started");

        while let Some(work) = self.next_work() {
            run_work(&self.shared, work);
        }

        tracing::debug!(scheduler = %self.shared.id, "worker stopped");
    }

    /// Blocks until there is something to run, or returns `None` once the
    /// scheduler is shutting down.
    fn next_work(&self) -> Option<Work> {
        let mut state = self.shared.state.lock();

        loop {
            if state.shutdown {
                return None;
            }

            if let Some(work) = state.immediate.pop_front() {
                return Some(work);
            }

            if let Some((_, operation)) = state.schedule.pop_due(Instant::now()) {
                tracing::trace!(scheduler = %self.shared.id, tag = %operation.tag, "firing delayed operation");
                return Some(operation.work);
            }

            match state.schedule.next_due() {
                Some(deadline) => {
                    self.shared.condvar.wait_until(&mut state, deadline);
                }
                None => self.shared.condvar.wait(&mut state),
            }
        }
    }
}

/// Runs one piece of work inside the scheduler's context.
///
/// A panicking operation is logged and swallowed so that the worker keeps
/// serving the rest of the queue.
fn run_work(shared: &Shared, work: Work) {
    let outcome = enter_context(shared.id, || panic::catch_unwind(AssertUnwindSafe(work)));

    if outcome.is_err() {
        tracing::error!(scheduler = %shared.id, "operation panicked on the scheduler worker");
    }
}
