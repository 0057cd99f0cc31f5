//! Error types for the lobby layer.

use voxlobby_platform::PlatformError;
use voxlobby_protocol::{ParticipantId, RoomId};

/// Errors that can occur during lobby operations.
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    /// The participant is already in this lobby.
    #[error("participant {0} already in lobby {1}")]
    AlreadyPresent(ParticipantId, RoomId),

    /// The participant is not in this lobby.
    #[error("participant {0} not in lobby {1}")]
    NotPresent(ParticipantId, RoomId),

    /// The lobby has no free slot.
    #[error("lobby {0} is full")]
    Full(RoomId),

    /// The lobby was deleted.
    #[error("lobby {0} is closed")]
    Closed(RoomId),

    /// A creation event named a room that is not a configured trigger.
    #[error("room {0} is not a configured trigger room")]
    UnknownTrigger(RoomId),

    /// The lobby's command channel is closed (the actor is gone).
    #[error("lobby {0} is unavailable")]
    Unavailable(RoomId),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Contract violations on the lobby store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A lobby is already registered under this room.
    #[error("a lobby is already registered for room {0}")]
    AlreadyRegistered(RoomId),

    /// No lobby is registered under this room.
    #[error("no lobby registered for room {0}")]
    NotRegistered(RoomId),

    /// Another registered lobby already holds this index.
    #[error("lobby index {0} is already in use")]
    IndexInUse(u32),
}
