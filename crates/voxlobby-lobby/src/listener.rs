//! Listener traits for the three event pathways, and the default
//! listeners that implement the lobby lifecycle.
//!
//! - [`ProvisioningListener`]: a participant entered a trigger room:
//!   reserve an index, provision a lobby, register it, move them in.
//! - [`MembershipJoinListener`]: a participant entered a lobby room.
//! - [`TeardownLeaveListener`]: a participant left a lobby room; the
//!   last one out closes it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use voxlobby_protocol::{ParticipantId, RoomId};

use crate::{LobbyError, LobbyHandle, LobbyStore, Provision};

/// Called when a participant enters a configured trigger room.
#[async_trait]
pub trait CreateListener: Send + Sync {
    async fn on_create(&self, participant: ParticipantId, trigger: RoomId)
    -> Result<(), LobbyError>;
}

/// Called when a participant enters a room that belongs to a lobby.
#[async_trait]
pub trait JoinListener: Send + Sync {
    async fn on_join(&self, participant: ParticipantId, lobby: &LobbyHandle)
    -> Result<(), LobbyError>;
}

/// Called when a participant leaves a room that belongs to a lobby.
#[async_trait]
pub trait LeaveListener: Send + Sync {
    async fn on_leave(&self, participant: ParticipantId, lobby: &LobbyHandle)
    -> Result<(), LobbyError>;
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

/// Provisions a new lobby for the trigger room the participant entered.
pub struct ProvisioningListener {
    store: Arc<LobbyStore>,
    factories: HashMap<RoomId, Arc<dyn Provision>>,
}

impl ProvisioningListener {
    pub fn new(store: Arc<LobbyStore>) -> Self {
        Self {
            store,
            factories: HashMap::new(),
        }
    }

    /// Registers the factory for its configured trigger room, replacing
    /// any factory already registered for that room.
    pub fn with_factory(mut self, factory: Arc<dyn Provision>) -> Self {
        self.factories.insert(factory.config().trigger, factory);
        self
    }

    /// The trigger rooms this listener can provision for.
    pub fn triggers(&self) -> impl Iterator<Item = RoomId> + '_ {
        self.factories.keys().copied()
    }
}

#[async_trait]
impl CreateListener for ProvisioningListener {
    async fn on_create(
        &self,
        participant: ParticipantId,
        trigger: RoomId,
    ) -> Result<(), LobbyError> {
        let factory = self
            .factories
            .get(&trigger)
            .ok_or(LobbyError::UnknownTrigger(trigger))?;

        // Reservation must happen before the first suspension point so
        // concurrent creations never see the same free index.
        let index = self.store.reserve_index();
        let lobby = match factory.create(participant, index).await {
            Ok(lobby) => lobby,
            Err(e) => {
                self.store.release_index(index);
                return Err(e);
            }
        };

        self.store.save(lobby.clone())?;
        if let Err(error) = factory.place(participant, &lobby).await {
            tracing::warn!(
                room_id = %lobby.room_id(),
                index = lobby.index(),
                %participant,
                %error,
                "could not move participant into new lobby; it stays empty"
            );
            return Err(error);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

/// Adds the participant to the lobby they entered.
#[derive(Debug, Default)]
pub struct MembershipJoinListener;

#[async_trait]
impl JoinListener for MembershipJoinListener {
    async fn on_join(
        &self,
        participant: ParticipantId,
        lobby: &LobbyHandle,
    ) -> Result<(), LobbyError> {
        lobby.add(participant).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Leave
// ---------------------------------------------------------------------------

/// Removes the participant from the lobby they left, and closes the
/// lobby once it is empty.
pub struct TeardownLeaveListener {
    store: Arc<LobbyStore>,
}

impl TeardownLeaveListener {
    pub fn new(store: Arc<LobbyStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl LeaveListener for TeardownLeaveListener {
    async fn on_leave(
        &self,
        participant: ParticipantId,
        lobby: &LobbyHandle,
    ) -> Result<(), LobbyError> {
        let remaining = lobby.remove(participant).await?;
        if remaining > 0 {
            return Ok(());
        }

        // Unregister first: later events for this room must not find a
        // lobby that is being torn down.
        self.store.remove(lobby)?;
        lobby.delete().await
    }
}
