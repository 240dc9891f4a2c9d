//! Error types for sequent.
//!
//! Only conditions a correct caller can run into are reported here.
//! Precondition violations (dequeuing without an active write, popping an
//! empty schedule, nesting operations on a [`SerialQueue`](crate::queue::SerialQueue))
//! are caller bugs and panic instead.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SchedulerError>;

#[derive(Error, Debug)]
pub enum SchedulerError {
    /// The scheduler was torn down before the submitted work could run.
    #[error("scheduler shut down before the operation ran")]
    ShutDown,

    /// The submitted work panicked while running on the scheduler.
    #[error("operation panicked while running on the scheduler")]
    WorkPanicked,

    #[error("failed to spawn scheduler worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}
