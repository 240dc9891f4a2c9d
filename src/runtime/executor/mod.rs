//! Thread-backed scheduler implementation.
//!
//! This module contains the real, timer-backed [`Scheduler`](super::Scheduler):
//! - [`core`]: the scheduler handle, its shared state and shutdown logic,
//! - [`worker`]: the dedicated thread draining immediate and delayed work.
//!
//! Together, these components provide a serial execution context backed by
//! a single operating system thread.

pub(crate) mod core;
pub(crate) mod worker;

pub use self::core::ThreadScheduler;
