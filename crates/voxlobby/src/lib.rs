//! # Voxlobby
//!
//! Ephemeral voice lobbies for chat platforms.
//!
//! A participant who joins a configured trigger room gets a fresh lobby:
//! a capacity-bounded room with a numbered name, a join link, and a status
//! message listing who is inside. The lobby follows its members as they
//! come and go and is deleted when the last one leaves.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use voxlobby::{LobbyKeeperBuilder, Settings};
//! use voxlobby_platform::MemoryPlatform;
//!
//! # async fn run(json: &str) -> Result<(), voxlobby::VoxlobbyError> {
//! let keeper = LobbyKeeperBuilder::new()
//!     .settings(Settings::from_json(json)?)
//!     .build(Arc::new(MemoryPlatform::new()))?;
//! keeper.start()?;
//! // ... later
//! keeper.stop().await;
//! # Ok(())
//! # }
//! ```

mod dispatcher;
mod error;
mod keeper;
mod settings;

pub use dispatcher::{Dispatcher, Pathway};
pub use error::{ConfigError, DispatchError, ListenerFailure, VoxlobbyError};
pub use keeper::{KeeperOptions, LobbyKeeper, LobbyKeeperBuilder};
pub use settings::{LobbyDefinition, Settings, validate};

/// Re-exports for building on voxlobby without naming every sub-crate.
pub mod prelude {
    pub use crate::{LobbyKeeper, Settings, VoxlobbyError};
    pub use voxlobby_lobby::{
        CreateListener, JoinListener, LeaveListener, LobbyConfig, LobbyHandle, LobbyTemplates,
    };
    pub use voxlobby_platform::Platform;
    pub use voxlobby_protocol::{MembershipTransition, ParticipantId, RoomId};
}
