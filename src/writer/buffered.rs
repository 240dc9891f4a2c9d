use bytes::Bytes;

use std::collections::VecDeque;

/// The stream a [`BufferedWriter`] feeds.
///
/// A transport may only have one write in flight at a time. It is told
/// to start a write with [`start_write`](Self::start_write) and later
/// reports its completion to its owner by some means of its own, at which
/// point the owner calls [`BufferedWriter::dequeue_next_write`].
pub trait Transport {
    /// The in-flight write object created for a payload.
    type Write;

    /// Creates and begins an in-flight write for `payload`.
    fn start_write(&mut self, payload: Bytes) -> Self::Write;
}

/// Outcome of [`BufferedWriter::enqueue_write`].
#[derive(Debug, PartialEq, Eq)]
pub enum WriteHandle<W> {
    /// The payload became the active write right away.
    Active(W),

    /// The payload was buffered behind the active write.
    Buffered {
        /// Index of the payload among the buffered writes, `0` being next.
        position: usize,
    },
}

impl<W> WriteHandle<W> {
    /// Returns the in-flight write if the payload started immediately.
    pub fn active(self) -> Option<W> {
        match self {
            WriteHandle::Active(write) => Some(write),
            WriteHandle::Buffered { .. } => None,
        }
    }

    pub fn is_buffered(&self) -> bool {
        matches!(self, WriteHandle::Buffered { .. })
    }
}

/// State of a [`BufferedWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// No write is in flight.
    Idle,

    /// One write is in flight, with zero or more buffered behind it.
    Writing,
}

/// Serializes outbound payloads so a [`Transport`] never sees two
/// concurrent writes.
///
/// Writes are put on the queue using [`enqueue_write`](Self::enqueue_write);
/// if no other write is in flight the payload becomes active immediately,
/// otherwise it is buffered. A write stays active until the caller reports
/// its completion through [`dequeue_next_write`](Self::dequeue_next_write),
/// which starts the next buffered payload, if any. Payloads start in
/// exactly the order they were enqueued.
///
/// The writer does not hold on to its transport: every call that may start
/// a write borrows it, and the caller must always pass the same transport.
/// All calls are expected to come from one serialized context.
#[derive(Debug, Default)]
pub struct BufferedWriter {
    /// Payloads that have not started yet, in submission order.
    queue: VecDeque<Bytes>,

    has_active_write: bool,
}

impl BufferedWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submits `payload` for writing.
    ///
    /// Returns [`WriteHandle::Active`] with the transport's in-flight write
    /// if the writer was idle, [`WriteHandle::Buffered`] otherwise.
    pub fn enqueue_write<T: Transport>(
        &mut self,
        transport: &mut T,
        payload: impl Into<Bytes>,
    ) -> WriteHandle<T::Write> {
        self.queue.push_back(payload.into());

        match self.try_start_write(transport) {
            Some(write) => WriteHandle::Active(write),
            None => {
                tracing::trace!(buffered = self.queue.len(), "write buffered");
                WriteHandle::Buffered {
                    position: self.queue.len() - 1,
                }
            }
        }
    }

    /// Marks the active write as finished and starts the next buffered
    /// payload, if there is one.
    ///
    /// Must be called exactly once per completed write, whether it
    /// succeeded or not.
    ///
    /// # Panics
    ///
    /// Panics if no write is active.
    pub fn dequeue_next_write<T: Transport>(&mut self, transport: &mut T) -> Option<T::Write> {
        assert!(
            self.has_active_write,
            "dequeue_next_write called without an active write"
        );

        self.has_active_write = false;
        self.try_start_write(transport)
    }

    /// Drops every payload that has not started yet.
    ///
    /// The active write, if any, is not affected.
    pub fn discard_unstarted_writes(&mut self) {
        let discarded = self.queue.len();
        self.queue.clear();

        if discarded > 0 {
            tracing::debug!(discarded, "discarded unstarted writes");
        }
    }

    /// Returns `true` if no payload is buffered.
    ///
    /// Says nothing about whether a write is currently active.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of buffered payloads, not counting the active write.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn has_active_write(&self) -> bool {
        self.has_active_write
    }

    pub fn state(&self) -> WriterState {
        if self.has_active_write {
            WriterState::Writing
        } else {
            WriterState::Idle
        }
    }

    fn try_start_write<T: Transport>(&mut self, transport: &mut T) -> Option<T::Write> {
        if self.has_active_write {
            return None;
        }

        let payload = self.queue.pop_front()?;
        self.has_active_write = true;

        tracing::trace!(len = payload.len(), buffered = self.queue.len(), "starting write");
        Some(transport.start_write(payload))
    }
}
