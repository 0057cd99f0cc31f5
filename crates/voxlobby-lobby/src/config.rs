//! Lobby configuration and state machine.

use voxlobby_protocol::{ChannelId, GroupId, RoomId};
use voxlobby_template::{LinkTemplate, MemberTemplate, TitleTemplate};

// ---------------------------------------------------------------------------
// LobbyConfig
// ---------------------------------------------------------------------------

/// Resolved configuration for one kind of lobby.
///
/// Built once at startup (see `Settings::resolve` in the `voxlobby` crate)
/// and shared by every lobby spawned from the same trigger room. Never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct LobbyConfig {
    /// Joining this room asks for a new lobby.
    pub trigger: RoomId,

    /// Human-readable name, used in logs.
    pub name: String,

    /// Maximum participants per lobby.
    pub capacity: usize,

    /// Group new rooms are parented under.
    pub group: GroupId,

    /// Text channel the status message is posted to.
    pub status_channel: ChannelId,

    /// Room names and status text.
    pub templates: LobbyTemplates,
}

/// The templates a lobby renders its room name and status message with.
///
/// The `*_full` variants are optional. When one is configured it replaces
/// its base template while the lobby is at capacity.
#[derive(Debug, Clone, PartialEq)]
pub struct LobbyTemplates {
    pub channel_title: TitleTemplate,
    pub channel_title_full: Option<TitleTemplate>,
    pub message_title: TitleTemplate,
    pub message_title_full: Option<TitleTemplate>,
    pub member_line: MemberTemplate,
    pub link: LinkTemplate,
    pub link_full: Option<LinkTemplate>,
}

impl LobbyTemplates {
    /// Base title templates only; member and link lines use the built-in
    /// defaults and no full variants are configured.
    pub fn new(channel_title: TitleTemplate, message_title: TitleTemplate) -> Self {
        Self {
            channel_title,
            channel_title_full: None,
            message_title,
            message_title_full: None,
            member_line: MemberTemplate::default(),
            link: LinkTemplate::default(),
            link_full: None,
        }
    }

    /// Room name template for the given fullness.
    pub fn channel_title(&self, full: bool) -> &TitleTemplate {
        pick(full, &self.channel_title, self.channel_title_full.as_ref())
    }

    /// Status heading template for the given fullness.
    pub fn message_title(&self, full: bool) -> &TitleTemplate {
        pick(full, &self.message_title, self.message_title_full.as_ref())
    }

    /// Join-link line template for the given fullness.
    pub fn link(&self, full: bool) -> &LinkTemplate {
        pick(full, &self.link, self.link_full.as_ref())
    }
}

fn pick<'a, T>(full: bool, base: &'a T, full_variant: Option<&'a T>) -> &'a T {
    match full_variant {
        Some(variant) if full => variant,
        _ => base,
    }
}

// ---------------------------------------------------------------------------
// LobbyState
// ---------------------------------------------------------------------------

/// The lifecycle state of a lobby.
///
/// ```text
/// Active → Closed
/// ```
///
/// - **Active**: the room and status message exist; participants come
///   and go (0..=capacity).
/// - **Closed**: terminal. The lobby was deleted and its resources were
///   released (or their release was attempted). Every command except
///   inspection fails with `LobbyError::Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyState {
    Active,
    Closed,
}

impl LobbyState {
    /// Returns `true` if the lobby still accepts membership changes.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl std::fmt::Display for LobbyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "Active"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}
