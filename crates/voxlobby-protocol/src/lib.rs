//! Shared vocabulary for voxlobby.
//!
//! This crate defines the types every other layer speaks:
//!
//! - **Identities** ([`ParticipantId`], [`RoomId`], [`GroupId`],
//!   [`ChannelId`], [`MessageId`]): newtypes over platform snowflakes.
//! - **Handles** ([`RoomHandle`], [`LinkHandle`], [`MessageHandle`]):
//!   references to resources a lobby owns on the platform.
//! - **Events** ([`MembershipTransition`]): the single inbound event the
//!   engine reacts to.
//!
//! # Architecture
//!
//! ```text
//! Platform (events, calls) → Protocol (types) → Lobby engine → Dispatcher
//! ```

mod event;
mod types;

pub use event::{MembershipTransition, StatusContent};
pub use types::{
    ChannelId, GroupId, LinkHandle, MessageHandle, MessageId, ParticipantId, RoomHandle, RoomId,
};
