use voxlobby_protocol::{MessageId, RoomId};

use crate::Operation;

/// Errors returned by platform calls.
///
/// None of these are retried by the engine. A failed call fails the
/// listener invocation that made it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    /// The platform refused the call (permissions, validation, outage).
    #[error("{operation} rejected: {reason}")]
    Rejected {
        operation: Operation,
        reason: String,
    },

    /// The room does not exist (never created, or already deleted).
    #[error("room {0} not found")]
    UnknownRoom(RoomId),

    /// The message does not exist (never posted, or already deleted).
    #[error("message {0} not found")]
    UnknownMessage(MessageId),

    /// The target room has no free slot.
    #[error("room {0} is full")]
    RoomFull(RoomId),
}
