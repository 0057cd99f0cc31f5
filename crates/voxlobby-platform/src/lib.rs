//! Chat platform abstraction for voxlobby.
//!
//! Provides the [`Platform`] trait: the outbound calls the lobby engine
//! makes (create rooms, post status messages, move participants, …) and the
//! inbound membership event stream it subscribes to.
//!
//! # Feature Flags
//!
//! - `memory` (default) — [`MemoryPlatform`], an in-process platform that
//!   keeps rooms and messages in a map. Used by tests and the demo.

mod error;
#[cfg(feature = "memory")]
mod memory;

pub use error::PlatformError;
#[cfg(feature = "memory")]
pub use memory::{MemoryPlatform, MemoryRoom, PostedMessage};

use std::fmt;
use std::future::Future;

use tokio::sync::broadcast;
use voxlobby_protocol::{
    ChannelId, GroupId, LinkHandle, MembershipTransition, MessageHandle, ParticipantId, RoomHandle,
    StatusContent,
};

/// Names each outbound call. Used in errors and for fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateRoom,
    CreateJoinLink,
    PostMessage,
    EditMessage,
    RenameRoom,
    DeleteRoom,
    DeleteMessage,
    MoveParticipant,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CreateRoom => "createRoom",
            Self::CreateJoinLink => "createJoinLink",
            Self::PostMessage => "postMessage",
            Self::EditMessage => "editMessage",
            Self::RenameRoom => "renameRoom",
            Self::DeleteRoom => "deleteRoom",
            Self::DeleteMessage => "deleteMessage",
            Self::MoveParticipant => "moveParticipant",
        };
        f.write_str(name)
    }
}

/// The chat platform as seen by the lobby engine.
///
/// Every call is a suspension point: the engine never holds a lock across
/// one. Calls return `Send` futures so lobby actors can run on any Tokio
/// worker thread.
///
/// Authentication, handle caching, and rate limiting belong to the
/// implementation, not to the engine.
pub trait Platform: Send + Sync + 'static {
    /// Creates a voice room named `name`, limited to `capacity`
    /// participants, parented under `group`.
    fn create_room(
        &self,
        name: &str,
        capacity: usize,
        group: GroupId,
    ) -> impl Future<Output = Result<RoomHandle, PlatformError>> + Send;

    /// Creates an invite link that joins `room`.
    fn create_join_link(
        &self,
        room: &RoomHandle,
    ) -> impl Future<Output = Result<LinkHandle, PlatformError>> + Send;

    /// Posts a new message to `channel`.
    fn post_message(
        &self,
        channel: ChannelId,
        content: &StatusContent,
    ) -> impl Future<Output = Result<MessageHandle, PlatformError>> + Send;

    /// Replaces the full content of an existing message.
    fn edit_message(
        &self,
        message: &MessageHandle,
        content: &StatusContent,
    ) -> impl Future<Output = Result<MessageHandle, PlatformError>> + Send;

    /// Renames a room and returns the updated handle.
    fn rename_room(
        &self,
        room: &RoomHandle,
        name: &str,
    ) -> impl Future<Output = Result<RoomHandle, PlatformError>> + Send;

    /// Deletes a room.
    fn delete_room(
        &self,
        room: &RoomHandle,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Deletes a message.
    fn delete_message(
        &self,
        message: &MessageHandle,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Moves a connected participant into `room`.
    fn move_participant(
        &self,
        participant: ParticipantId,
        room: &RoomHandle,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Subscribes to membership transitions.
    ///
    /// Each call returns an independent receiver that sees every event
    /// emitted after the call. Dropping the receiver unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<MembershipTransition>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_display() {
        assert_eq!(Operation::CreateRoom.to_string(), "createRoom");
        assert_eq!(Operation::MoveParticipant.to_string(), "moveParticipant");
    }

    #[test]
    fn test_rejected_error_message() {
        let err = PlatformError::Rejected {
            operation: Operation::DeleteRoom,
            reason: "missing permission".into(),
        };
        assert_eq!(err.to_string(), "deleteRoom rejected: missing permission");
    }

    #[test]
    fn test_operation_works_as_map_key() {
        use std::collections::HashMap;
        let mut counts = HashMap::new();
        *counts.entry(Operation::EditMessage).or_insert(0) += 1;
        *counts.entry(Operation::EditMessage).or_insert(0) += 1;
        assert_eq!(counts[&Operation::EditMessage], 2);
    }
}
