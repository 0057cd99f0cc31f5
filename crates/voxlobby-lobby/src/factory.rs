//! Provisioning: turning a reserved index into a live lobby.

use std::sync::Arc;

use async_trait::async_trait;
use voxlobby_platform::Platform;
use voxlobby_protocol::ParticipantId;

use crate::lobby::{render_room_name, render_status, spawn_lobby};
use crate::{LobbyConfig, LobbyError, LobbyHandle, LobbyResources};

/// Default command channel size for lobby actors.
pub const DEFAULT_CHANNEL_SIZE: usize = 32;

/// Creates lobbies for one trigger room.
///
/// Object safe so the create listener can hold one per trigger as
/// `Arc<dyn Provision>`.
#[async_trait]
pub trait Provision: Send + Sync {
    /// The configuration lobbies are created with.
    fn config(&self) -> &LobbyConfig;

    /// Allocates the room, join link and status message for a new lobby
    /// with the given index, and starts its actor.
    ///
    /// Any platform failure is returned as is. Resources created before
    /// the failing step are not cleaned up.
    async fn create(&self, participant: ParticipantId, index: u32)
    -> Result<LobbyHandle, LobbyError>;

    /// Moves the participant who triggered the creation into the lobby.
    async fn place(&self, participant: ParticipantId, lobby: &LobbyHandle)
    -> Result<(), LobbyError>;
}

/// The [`Provision`] implementation backed by a [`Platform`].
pub struct LobbyFactory<P> {
    platform: Arc<P>,
    config: Arc<LobbyConfig>,
    channel_size: usize,
}

impl<P: Platform> LobbyFactory<P> {
    pub fn new(platform: Arc<P>, config: LobbyConfig) -> Self {
        Self {
            platform,
            config: Arc::new(config),
            channel_size: DEFAULT_CHANNEL_SIZE,
        }
    }

    /// Sets the command buffer of spawned lobby actors.
    pub fn with_channel_size(mut self, channel_size: usize) -> Self {
        self.channel_size = channel_size.max(1);
        self
    }
}

#[async_trait]
impl<P: Platform> Provision for LobbyFactory<P> {
    fn config(&self) -> &LobbyConfig {
        &self.config
    }

    async fn create(
        &self,
        participant: ParticipantId,
        index: u32,
    ) -> Result<LobbyHandle, LobbyError> {
        let config = &self.config;

        let name = render_room_name(config, index, 0);
        let room = self
            .platform
            .create_room(&name, config.capacity, config.group)
            .await?;
        let link = self.platform.create_join_link(&room).await?;

        let status = render_status(config, index, &link.url, &[]);
        let message = self
            .platform
            .post_message(config.status_channel, &status)
            .await?;

        tracing::info!(
            room_id = %room.id,
            index,
            lobby = %config.name,
            %participant,
            "lobby created"
        );

        Ok(spawn_lobby(
            Arc::clone(&self.platform),
            Arc::clone(&self.config),
            index,
            LobbyResources {
                room,
                link,
                message,
                status,
            },
            self.channel_size,
        ))
    }

    async fn place(
        &self,
        participant: ParticipantId,
        lobby: &LobbyHandle,
    ) -> Result<(), LobbyError> {
        self.platform
            .move_participant(participant, lobby.room())
            .await?;
        Ok(())
    }
}
