//! Lobby lifecycle engine for voxlobby.
//!
//! Each lobby runs as an isolated Tokio task (actor model) that owns its
//! participant list, its room and its status message.
//!
//! # Key types
//!
//! - [`LobbyStore`] — index allocation and the room → lobby registry
//! - [`LobbyHandle`] — send commands to a running lobby actor
//! - [`LobbyFactory`] — provisions the platform resources of a new lobby
//! - [`CreateListener`], [`JoinListener`], [`LeaveListener`] — the three
//!   event pathways, with default implementations
//! - [`LobbyState`] — lifecycle state machine
//! - [`LobbyConfig`] — capacity, bindings and templates

mod config;
mod error;
mod factory;
mod listener;
mod lobby;
mod store;

pub use config::{LobbyConfig, LobbyState, LobbyTemplates};
pub use error::{LobbyError, StoreError};
pub use factory::{DEFAULT_CHANNEL_SIZE, LobbyFactory, Provision};
pub use listener::{
    CreateListener, JoinListener, LeaveListener, MembershipJoinListener, ProvisioningListener,
    TeardownLeaveListener,
};
pub use lobby::{
    LobbyHandle, LobbyInfo, LobbyResources, render_room_name, render_status, spawn_lobby,
};
pub use store::LobbyStore;
