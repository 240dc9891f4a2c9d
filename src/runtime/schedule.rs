use super::operation::{OperationId, Tag, TaggedOperation};
use crate::utils::Slab;

use std::collections::BTreeMap;

/// Ordering key of a pending entry.
///
/// Entries are ordered by deadline first and by submission sequence
/// second, so two operations due at the same moment fire in the order
/// they were scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct ScheduleKey<D> {
    /// The time at which the operation becomes due.
    pub(crate) due: D,

    /// Monotonic submission counter used as a tie-break.
    seq: u64,
}

struct Entry {
    id: OperationId,
    operation: TaggedOperation,
}

/// Pending delayed operations of one scheduler.
///
/// `D` is the scheduler's notion of time: [`Instant`](std::time::Instant)
/// for the threaded scheduler, virtual elapsed time for the manual one.
///
/// Fired, popped and cancelled operations are removed eagerly, so the
/// schedule only ever holds operations that may still run.
pub(crate) struct Schedule<D> {
    entries: BTreeMap<ScheduleKey<D>, Entry>,

    /// Maps live operation ids back to their ordering key.
    ids: Slab<ScheduleKey<D>>,

    next_seq: u64,
}

impl<D: Ord + Copy> Schedule<D> {
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            ids: Slab::new(16),
            next_seq: 0,
        }
    }

    /// Adds `operation` to the schedule, due at `due`.
    pub(crate) fn push(&mut self, due: D, operation: TaggedOperation) -> OperationId {
        let key = ScheduleKey {
            due,
            seq: self.next_seq,
        };
        self.next_seq += 1;

        let id = self.ids.insert(key);
        self.entries.insert(key, Entry { id, operation });

        id
    }

    /// Removes the operation registered under `id`, if it is still pending.
    pub(crate) fn remove(&mut self, id: OperationId) -> Option<TaggedOperation> {
        let key = self.ids.remove(id)?;
        self.entries.remove(&key).map(|entry| entry.operation)
    }

    pub(crate) fn contains(&self, id: OperationId) -> bool {
        self.ids.get(id).is_some()
    }

    /// Deadline of the earliest pending operation.
    pub(crate) fn next_due(&self) -> Option<D> {
        self.entries.keys().next().map(|key| key.due)
    }

    /// Removes the earliest operation regardless of its deadline.
    pub(crate) fn pop_earliest(&mut self) -> Option<(D, TaggedOperation)> {
        let (key, entry) = self.entries.pop_first()?;
        self.ids.remove(entry.id);

        Some((key.due, entry.operation))
    }

    /// Removes the earliest operation if it is due at or before `now`.
    pub(crate) fn pop_due(&mut self, now: D) -> Option<(D, TaggedOperation)> {
        match self.next_due() {
            Some(due) if due <= now => self.pop_earliest(),
            _ => None,
        }
    }

    pub(crate) fn has_tag(&self, tag: Tag) -> bool {
        self.entries.values().any(|entry| entry.operation.tag == tag)
    }

    pub(crate) fn len(&self) -> usize {
        self.ids.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Removes every pending operation, earliest first.
    pub(crate) fn drain(&mut self) -> Vec<TaggedOperation> {
        std::iter::from_fn(|| self.pop_earliest())
            .map(|(_, operation)| operation)
            .collect()
    }
}
