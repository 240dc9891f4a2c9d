use crate::runtime::Tag;

/// Well-known ids of the timers scheduled on a [`SerialQueue`](super::SerialQueue).
///
/// Tests use them to check for the presence of delayed operations and to
/// run them early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    /// Matches every timer in
    /// [`run_scheduled_operations_until`](super::SerialQueue::run_scheduled_operations_until).
    All,

    /// Closes the listen stream after a period of inactivity.
    ListenStreamIdle,
    /// Restarts the listen stream once its backoff delay has elapsed.
    ListenStreamConnectionBackoff,
    /// Closes the write stream after a period of inactivity.
    WriteStreamIdle,
    /// Restarts the write stream once its backoff delay has elapsed.
    WriteStreamConnectionBackoff,

    /// Gives up on an unknown online state and reports the client offline.
    OnlineStateTimeout,
}

impl From<TimerId> for Tag {
    fn from(id: TimerId) -> Self {
        Tag(id as u32)
    }
}
