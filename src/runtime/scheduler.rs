use super::context::ContextId;
use super::operation::{DelayedOperation, Tag, TaggedOperation, Work};
use crate::error::Result;

use std::time::Duration;

/// A serialized executor of immediate and delayed work.
///
/// Every implementation presents one logical serial context per instance:
/// no two operations submitted to the same scheduler ever run
/// concurrently with each other, whatever thread they end up on.
///
/// Apart from [`DelayedOperation::cancel`], callers are expected to use a
/// scheduler from a single logical context of their own (typically from
/// inside the scheduler's work). None of the introspection methods below
/// are meant to be raced against each other.
pub trait Scheduler: Send + Sync {
    /// Submits `work` to run as soon as possible.
    ///
    /// Work submitted through this method runs in submission order.
    /// Nothing is promised about its order relative to delayed operations
    /// that become due at the same moment.
    fn execute_now(&self, work: Work);

    /// Submits `work` and blocks until it has run.
    ///
    /// When called from inside this scheduler's own context, the pending
    /// immediate work and then `work` are run on the calling thread
    /// instead of waiting, so the call cannot deadlock on itself.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::ShutDown`](crate::SchedulerError::ShutDown)
    /// if the scheduler is torn down before `work` runs, and
    /// [`SchedulerError::WorkPanicked`](crate::SchedulerError::WorkPanicked)
    /// if `work` panics on another thread.
    fn execute_blocking(&self, work: Work) -> Result<()>;

    /// Schedules `operation` to run once `delay` has elapsed.
    ///
    /// Use [`execute_now`](Self::execute_now) for work that should run
    /// immediately; a zero delay still goes through the schedule.
    fn schedule(&self, delay: Duration, operation: TaggedOperation) -> DelayedOperation;

    /// Returns `true` if the caller is running as work of this scheduler.
    fn is_executing_context(&self) -> bool;

    /// Returns a diagnostic identifier of the caller's context.
    ///
    /// The value differs depending on whether the caller runs inside this
    /// scheduler or not. Never use it for control flow.
    fn current_context_id(&self) -> ContextId {
        ContextId::current()
    }

    /// Returns `true` if a pending scheduled operation carries `tag`.
    fn has_pending(&self, tag: Tag) -> bool;

    /// Returns `true` if no delayed operation is pending.
    ///
    /// Immediate work is not counted, even if it has not run yet.
    fn is_schedule_empty(&self) -> bool;

    /// Removes the operation due first and returns it without running it.
    ///
    /// Ties are broken by submission order. Typically used to force a
    /// delayed operation to run early by resubmitting it through
    /// [`execute_now`](Self::execute_now).
    ///
    /// # Panics
    ///
    /// Panics if the schedule is empty.
    fn pop_earliest(&self) -> TaggedOperation;
}
