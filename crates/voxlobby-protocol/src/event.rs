//! The inbound membership event and the outbound status payload.

use serde::{Deserialize, Serialize};

use crate::{ParticipantId, RoomId};

// ---------------------------------------------------------------------------
// MembershipTransition
// ---------------------------------------------------------------------------

/// A participant moved between rooms.
///
/// `None` on either side means "not in any room": connecting produces
/// `previous: None`, disconnecting produces `current: None`, and a move
/// between two rooms carries both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipTransition {
    /// The room the participant was in before the transition.
    pub previous: Option<RoomId>,
    /// The room the participant is in after the transition.
    pub current: Option<RoomId>,
    /// Who moved.
    pub participant: ParticipantId,
}

impl MembershipTransition {
    /// A participant entered `room` without having been anywhere before.
    pub fn connect(participant: ParticipantId, room: RoomId) -> Self {
        Self {
            previous: None,
            current: Some(room),
            participant,
        }
    }

    /// A participant left `room` and is no longer in any room.
    pub fn disconnect(participant: ParticipantId, room: RoomId) -> Self {
        Self {
            previous: Some(room),
            current: None,
            participant,
        }
    }

    /// A participant moved directly from one room into another.
    pub fn moved(participant: ParticipantId, from: RoomId, to: RoomId) -> Self {
        Self {
            previous: Some(from),
            current: Some(to),
            participant,
        }
    }

    /// Returns `true` when the room did not change (mute, deafen, stream
    /// toggles and similar state updates all arrive this way).
    pub fn is_noop(&self) -> bool {
        self.previous == self.current
    }
}

// ---------------------------------------------------------------------------
// StatusContent
// ---------------------------------------------------------------------------

/// The rendered text of a lobby status message.
///
/// Every edit replaces the whole message, so this is always the complete
/// content, never a diff.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusContent {
    /// Heading line (occupancy summary).
    pub title: String,
    /// Member lines followed by the join-link line.
    pub body: String,
}
