//! # Sequent
//!
//! **Sequent** provides the serialized-execution backbone of a bidirectional
//! network stream client: the pieces that decide *when* and *in which order*
//! things happen, while the transport, the framing and the retry policy live
//! elsewhere.
//!
//! It offers:
//!
//! - A **scheduler abstraction** with immediate FIFO execution, delayed and
//!   cancellable execution, and introspection of pending delayed work
//! - A **thread-backed scheduler** running everything on one worker thread
//! - A **manual scheduler** with a virtual clock for deterministic tests
//! - A **serial queue** that enforces non-nested, sequential operations and
//!   tags stream timers with well-known ids
//! - A **buffered writer** keeping at most one write in flight on a transport
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sequent::{Scheduler, TaggedOperation, ThreadScheduler};
//! use std::time::Duration;
//!
//! let scheduler = ThreadScheduler::new()?;
//!
//! scheduler.execute_now(Box::new(|| println!("runs first")));
//!
//! let idle = scheduler.schedule(
//!     Duration::from_secs(60),
//!     TaggedOperation::new(1, || println!("idle timeout")),
//! );
//!
//! // The stream saw traffic: the idle timeout no longer applies.
//! idle.cancel();
//! ```
//!
//! ## Modules
//!
//! - [`runtime`]: The scheduler trait and its implementations
//! - [`queue`]: The checked serial queue and timer ids
//! - [`writer`]: Single-active-write buffering

mod error;
mod utils;

pub mod queue;
pub mod runtime;
pub mod writer;

pub use error::{Result, SchedulerError};
pub use queue::{SerialQueue, TimerId};
pub use runtime::{
    ContextId, DelayedOperation, ManualScheduler, Scheduler, SchedulerBuilder, SchedulerConfig,
    SchedulerId, Tag, TaggedOperation, ThreadScheduler, Work,
};
pub use writer::{BufferedWriter, Transport, WriteHandle, WriterState};
