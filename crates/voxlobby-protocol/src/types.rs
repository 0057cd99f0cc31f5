//! Identity types and the handles returned by platform calls.
//!
//! Every identifier on the chat platform is a 64-bit snowflake. We wrap
//! each kind in its own newtype so a `RoomId` can never be passed where a
//! `ChannelId` is expected, even though both are `u64` underneath.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A platform member who can join and leave rooms.
///
/// `#[serde(transparent)]` keeps the JSON form a plain number, which is
/// what settings files and event logs use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub u64);

impl ParticipantId {
    /// Returns the mention string the platform renders as a clickable tag.
    ///
    /// This is the value substituted for `{tag}` in member-line templates.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.0)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

/// A voice room. Trigger rooms and lobby rooms share this id space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

/// A group (category) that new rooms are parented under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G-{}", self.0)
    }
}

/// A text channel where status messages are posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C-{}", self.0)
    }
}

/// A posted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Handles: opaque references returned by platform calls
// ---------------------------------------------------------------------------

/// A room created on the platform.
///
/// A handle is owned by exactly one lobby. The lobby passes it back to the
/// platform when it renames or deletes the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomHandle {
    /// The room's platform id.
    pub id: RoomId,
    /// Display name the room was created (or last renamed) with.
    pub name: String,
    /// Participant limit enforced by the platform.
    pub capacity: usize,
    /// Group the room is parented under.
    pub group: GroupId,
}

/// An invite link scoped to a single room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkHandle {
    /// The room the link joins.
    pub room: RoomId,
    /// Short invite code.
    pub code: String,
    /// Full URL rendered into status messages as `{link}`.
    pub url: String,
}

/// A message posted to a text channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHandle {
    /// Channel the message lives in.
    pub channel: ChannelId,
    /// The message's platform id.
    pub id: MessageId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_as_plain_numbers() {
        assert_eq!(serde_json::to_string(&RoomId(42)).unwrap(), "42");
        assert_eq!(serde_json::to_string(&ParticipantId(7)).unwrap(), "7");
        let group: GroupId = serde_json::from_str("10").unwrap();
        assert_eq!(group, GroupId(10));
    }

    #[test]
    fn test_id_display_prefixes() {
        assert_eq!(ParticipantId(1).to_string(), "U-1");
        assert_eq!(RoomId(2).to_string(), "R-2");
        assert_eq!(GroupId(3).to_string(), "G-3");
        assert_eq!(ChannelId(4).to_string(), "C-4");
        assert_eq!(MessageId(5).to_string(), "M-5");
    }

    #[test]
    fn test_participant_mention() {
        assert_eq!(ParticipantId(1234).mention(), "<@1234>");
    }

    #[test]
    fn test_room_handle_json_shape() {
        let room = RoomHandle {
            id: RoomId(9),
            name: "Room #1".into(),
            capacity: 2,
            group: GroupId(10),
        };
        let json: serde_json::Value = serde_json::to_value(&room).unwrap();
        assert_eq!(json["id"], 9);
        assert_eq!(json["name"], "Room #1");
        assert_eq!(json["group"], 10);
    }
}
