//! Utilities for memory-efficient data structures.
//!
//! This module provides low-level utilities used internally by the
//! schedulers. In particular, it exposes a generational [`Slab`] used to
//! key pending operations for cancellation.

mod slab;

pub(crate) use slab::{Slab, SlabKey};
