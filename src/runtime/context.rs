use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, ThreadId};

/// Process-unique identity of a scheduler instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SchedulerId(u64);

impl SchedulerId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        SchedulerId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SchedulerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scheduler-{}", self.0)
    }
}

/// Identifies the execution context a piece of code runs in.
///
/// Only meant for diagnostics: the one guarantee is that the value
/// observed from inside a scheduler's dispatched work differs from the
/// value observed anywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextId {
    /// Running as work dispatched by the given scheduler.
    Scheduler(SchedulerId),

    /// Running outside of any scheduler, on the given thread.
    Thread(ThreadId),
}

impl ContextId {
    /// Returns the identifier of the calling context.
    pub fn current() -> Self {
        match CURRENT_SCHEDULER.get() {
            Some(id) => ContextId::Scheduler(id),
            None => ContextId::Thread(thread::current().id()),
        }
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextId::Scheduler(id) => write!(f, "{id}"),
            ContextId::Thread(id) => write!(f, "{id:?}"),
        }
    }
}

thread_local! {
    /// Thread-local identity of the scheduler whose work is running.
    ///
    /// This is set for the duration of every dispatched operation and
    /// lets schedulers detect reentrant calls without threading a handle
    /// through user closures.
    static CURRENT_SCHEDULER: Cell<Option<SchedulerId>> = const { Cell::new(None) };
}

/// Returns `true` if the calling code runs as work of scheduler `id`.
pub(crate) fn is_current(id: SchedulerId) -> bool {
    CURRENT_SCHEDULER.get() == Some(id)
}

/// Enters the execution context of scheduler `id` for the current thread.
///
/// The previous context is restored after `f` returns or unwinds, so a
/// manual scheduler driven from inside another scheduler's work still
/// reports the right context once it is done.
pub(crate) fn enter_context<R>(id: SchedulerId, f: impl FnOnce() -> R) -> R {
    struct Restore(Option<SchedulerId>);

    impl Drop for Restore {
        fn drop(&mut self) {
            CURRENT_SCHEDULER.set(self.0);
        }
    }

    let _restore = Restore(CURRENT_SCHEDULER.replace(Some(id)));
    f()
}
