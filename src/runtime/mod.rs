//! Serialized scheduling of immediate and delayed work.
//!
//! This module contains the [`Scheduler`] abstraction and its two
//! implementations:
//! - [`ThreadScheduler`], a timer-backed scheduler running on a dedicated
//!   worker thread,
//! - [`ManualScheduler`], a deterministic scheduler with a virtual clock,
//!   driven by hand from tests.
//!
//! It is responsible for:
//! - running immediate work in FIFO order,
//! - running delayed work once due, with stable ordering for equal deadlines,
//! - tracking pending operations for cancellation and introspection,
//! - detecting whether code runs inside a given scheduler.

mod context;
mod executor;
mod manual;
mod operation;
mod schedule;
mod scheduler;

pub(crate) mod builder;

pub use builder::{SchedulerBuilder, SchedulerConfig};
pub use context::{ContextId, SchedulerId};
pub use executor::ThreadScheduler;
pub use manual::ManualScheduler;
pub use operation::{DelayedOperation, Tag, TaggedOperation, Work};
pub use scheduler::Scheduler;
