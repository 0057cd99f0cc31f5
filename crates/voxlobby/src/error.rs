//! Error types for the voxlobby facade.

use std::fmt;

use voxlobby_lobby::{LobbyError, StoreError};
use voxlobby_platform::PlatformError;
use voxlobby_protocol::{ParticipantId, RoomId};
use voxlobby_template::TemplateError;

use crate::dispatcher::Pathway;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `voxlobby` crate, you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant lets `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum VoxlobbyError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Lobby(#[from] LobbyError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Startup configuration is unusable. Raised before any event is handled.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no lobbies configured")]
    NoLobbies,

    /// Neither the lobby nor the process-wide settings name a group.
    #[error("lobby {lobby:?} has no group and no default group is set")]
    MissingGroup { lobby: String },

    /// Neither the lobby nor the process-wide settings name a status channel.
    #[error("lobby {lobby:?} has no status channel and no default is set")]
    MissingStatusChannel { lobby: String },

    #[error("lobby {lobby:?} has zero capacity")]
    ZeroCapacity { lobby: String },

    /// Two lobbies share a trigger room.
    #[error("trigger room {0} is configured more than once")]
    DuplicateTrigger(RoomId),

    /// Malformed JSON, a missing field, or a template with an unknown
    /// placeholder.
    #[error("invalid settings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors reported by the [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("dispatcher is already running")]
    AlreadyRunning,

    /// One or more listeners failed while handling a single event.
    #[error("{}", ListenerFailures(.0.as_slice()))]
    Listeners(Vec<ListenerFailure>),
}

/// A listener invocation that failed.
#[derive(Debug)]
pub struct ListenerFailure {
    pub pathway: Pathway,
    pub participant: ParticipantId,
    pub error: LobbyError,
}

impl fmt::Display for ListenerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} listener failed for {}: {}",
            self.pathway, self.participant, self.error
        )
    }
}

struct ListenerFailures<'a>(&'a [ListenerFailure]);

impl fmt::Display for ListenerFailures<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}
