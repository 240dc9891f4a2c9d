use crate::utils::SlabKey;

use std::fmt;
use std::sync::Weak;

/// A unit of work submitted to a [`Scheduler`](super::Scheduler).
pub type Work = Box<dyn FnOnce() + Send + 'static>;

/// An opaque label attached to scheduled work.
///
/// Tags are not required to be unique. They only exist so that a caller
/// can later ask whether something with the tag is still pending, or pull
/// it off the schedule to run it early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Tag(pub u32);

impl From<u32> for Tag {
    fn from(value: u32) -> Self {
        Tag(value)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A scheduled unit of work together with its [`Tag`].
pub struct TaggedOperation {
    pub tag: Tag,
    pub work: Work,
}

impl TaggedOperation {
    /// Creates a tagged operation from any `Send` closure.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let op = TaggedOperation::new(7, || println!("fired"));
    /// ```
    pub fn new<F>(tag: impl Into<Tag>, work: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            tag: tag.into(),
            work: Box::new(work),
        }
    }

    /// Consumes the operation and runs its work on the current thread.
    pub fn run(self) {
        (self.work)()
    }
}

impl fmt::Debug for TaggedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaggedOperation")
            .field("tag", &self.tag)
            .finish_non_exhaustive()
    }
}

/// Identifier of a pending scheduled operation inside its scheduler.
pub(crate) type OperationId = SlabKey;

/// Removal of a pending operation by id.
///
/// Implemented by the shared state of each scheduler. Handles only ever
/// reach it through a [`Weak`] reference, so a handle cannot keep a
/// scheduler alive nor touch it after teardown.
pub(crate) trait Cancel: Send + Sync {
    /// Removes the operation if it is still pending. Returns whether
    /// anything was removed.
    fn cancel(&self, id: OperationId) -> bool;

    /// Returns whether the operation has neither fired nor been removed.
    fn is_pending(&self, id: OperationId) -> bool;
}

/// A handle to an operation scheduled for future execution.
///
/// The handle may be freely moved across threads and may outlive both the
/// operation and the scheduler that created it. Cancelling is idempotent:
/// it is a no-op once the operation has fired, once it has already been
/// cancelled, on a default (empty) handle, and after the scheduler has been
/// dropped.
#[derive(Default)]
pub struct DelayedOperation {
    target: Option<(Weak<dyn Cancel>, OperationId)>,
}

impl DelayedOperation {
    pub(crate) fn new(scheduler: Weak<dyn Cancel>, id: OperationId) -> Self {
        Self {
            target: Some((scheduler, id)),
        }
    }

    /// Cancels the operation if it has not started yet.
    ///
    /// Cancellation is best-effort: work that is already running is not
    /// interrupted.
    pub fn cancel(&self) {
        let Some((scheduler, id)) = &self.target else {
            return;
        };

        if let Some(scheduler) = scheduler.upgrade() {
            if scheduler.cancel(*id) {
                tracing::debug!(?id, "cancelled delayed operation");
            }
        }
    }

    /// Returns `true` while the operation is still waiting to run.
    ///
    /// Becomes `false` once the operation fires, is cancelled, or is
    /// popped off the schedule, and is always `false` for an empty handle.
    pub fn is_pending(&self) -> bool {
        self.target
            .as_ref()
            .and_then(|(scheduler, id)| scheduler.upgrade().map(|s| s.is_pending(*id)))
            .unwrap_or(false)
    }
}

impl fmt::Debug for DelayedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelayedOperation")
            .field("id", &self.target.as_ref().map(|(_, id)| id))
            .finish()
    }
}
