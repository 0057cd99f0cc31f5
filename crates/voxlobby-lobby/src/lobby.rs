//! Lobby actor: an isolated Tokio task that owns one lobby's state.
//!
//! Each lobby runs in its own task and owns its participant list and the
//! room, link and message handles it was provisioned with. The outside
//! world talks to it through a [`LobbyHandle`]: commands go in over an
//! mpsc channel and replies come back on a oneshot. Membership changes
//! are therefore serialized per lobby without any shared lock, even while
//! the actor is suspended on a platform call.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use voxlobby_platform::{Platform, PlatformError};
use voxlobby_protocol::{
    LinkHandle, MessageHandle, ParticipantId, RoomHandle, RoomId, StatusContent,
};
use voxlobby_template::{LinkArgs, MemberArgs, TitleArgs};

use crate::{LobbyConfig, LobbyError, LobbyState};

/// Commands sent to a lobby actor through its channel.
pub(crate) enum LobbyCommand {
    Add {
        participant: ParticipantId,
        reply: oneshot::Sender<Result<usize, LobbyError>>,
    },

    Remove {
        participant: ParticipantId,
        reply: oneshot::Sender<Result<usize, LobbyError>>,
    },

    Contains {
        participant: ParticipantId,
        reply: oneshot::Sender<bool>,
    },

    Info {
        reply: oneshot::Sender<LobbyInfo>,
    },

    /// Close the lobby and release its room and status message.
    Delete {
        reply: oneshot::Sender<Result<(), LobbyError>>,
    },
}

/// A snapshot of a lobby.
#[derive(Debug, Clone)]
pub struct LobbyInfo {
    /// The room as last created or renamed.
    pub room: RoomHandle,
    pub index: u32,
    /// Participants in join order.
    pub participants: Vec<ParticipantId>,
    pub capacity: usize,
    pub state: LobbyState,
    /// The content the status message was last set to.
    pub status: StatusContent,
    pub link: LinkHandle,
    pub message: MessageHandle,
}

impl LobbyInfo {
    /// Returns `true` if the lobby is at capacity.
    pub fn is_full(&self) -> bool {
        self.participants.len() >= self.capacity
    }
}

/// The platform resources a lobby is built on.
///
/// Produced by the provisioning factory, consumed by [`spawn_lobby`].
#[derive(Debug, Clone)]
pub struct LobbyResources {
    pub room: RoomHandle,
    pub link: LinkHandle,
    pub message: MessageHandle,
    /// What the status message was posted with.
    pub status: StatusContent,
}

/// Handle to a running lobby actor.
///
/// Cheap to clone. The [`LobbyStore`](crate::LobbyStore) keeps one per
/// lobby and listeners receive clones.
#[derive(Clone)]
pub struct LobbyHandle {
    index: u32,
    room: Arc<RoomHandle>,
    sender: mpsc::Sender<LobbyCommand>,
}

impl LobbyHandle {
    /// Returns the id of the lobby's room.
    pub fn room_id(&self) -> RoomId {
        self.room.id
    }

    /// Returns the lobby's index.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Returns the room handle the lobby was created with.
    pub fn room(&self) -> &RoomHandle {
        &self.room
    }

    /// Adds a participant and republishes the status message.
    ///
    /// Returns the participant count afterwards. Fails with
    /// [`LobbyError::AlreadyPresent`] or [`LobbyError::Full`] without
    /// changing anything.
    pub async fn add(&self, participant: ParticipantId) -> Result<usize, LobbyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(LobbyCommand::Add {
            participant,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Removes a participant and republishes the status message, unless
    /// the lobby is now empty.
    ///
    /// Returns the participant count afterwards. Fails with
    /// [`LobbyError::NotPresent`] without changing anything.
    pub async fn remove(&self, participant: ParticipantId) -> Result<usize, LobbyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(LobbyCommand::Remove {
            participant,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Returns `true` if the participant is in the lobby.
    pub async fn contains(&self, participant: ParticipantId) -> Result<bool, LobbyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(LobbyCommand::Contains {
            participant,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Requests a snapshot of the lobby.
    pub async fn info(&self) -> Result<LobbyInfo, LobbyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(LobbyCommand::Info { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Closes the lobby and deletes its room and status message.
    ///
    /// The lobby is `Closed` once this returns, whether or not the
    /// platform calls succeeded. Both deletions are attempted; if either
    /// fails the first failure is returned (room before message).
    pub async fn delete(&self) -> Result<(), LobbyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(LobbyCommand::Delete { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    async fn send(&self, command: LobbyCommand) -> Result<(), LobbyError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> LobbyError {
        LobbyError::Unavailable(self.room.id)
    }
}

impl std::fmt::Debug for LobbyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LobbyHandle")
            .field("room_id", &self.room.id)
            .field("index", &self.index)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Status rendering
// ---------------------------------------------------------------------------

/// Renders the complete status message for a lobby.
///
/// The title uses the full-variant template when the lobby is at capacity
/// and one is configured. The body is one line per participant (1-based,
/// in join order) followed by the join-link line.
pub fn render_status(
    config: &LobbyConfig,
    index: u32,
    link_url: &str,
    participants: &[ParticipantId],
) -> StatusContent {
    let current = participants.len();
    let full = current >= config.capacity;
    let templates = &config.templates;

    let title = templates
        .message_title(full)
        .render(&TitleArgs::new(index, config.capacity, current));

    let mut lines: Vec<String> = participants
        .iter()
        .enumerate()
        .map(|(i, participant)| {
            let line = templates.member_line.render(&MemberArgs {
                index: i + 1,
                tag: participant.mention(),
            });
            line.trim_end_matches('\n').to_string()
        })
        .collect();
    lines.push(templates.link(full).render(&LinkArgs {
        link: link_url.to_string(),
    }));

    StatusContent {
        title,
        body: lines.join("\n"),
    }
}

/// Renders the room name for a lobby with `current` participants.
pub fn render_room_name(config: &LobbyConfig, index: u32, current: usize) -> String {
    let full = current >= config.capacity;
    config
        .templates
        .channel_title(full)
        .render(&TitleArgs::new(index, config.capacity, current))
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// The internal lobby actor state. Runs inside a Tokio task.
struct LobbyActor<P: Platform> {
    platform: Arc<P>,
    config: Arc<LobbyConfig>,
    index: u32,
    room: RoomHandle,
    link: LinkHandle,
    message: MessageHandle,
    status: StatusContent,
    participants: Vec<ParticipantId>,
    state: LobbyState,
    /// Whether the room currently carries the full-variant name.
    named_full: bool,
    receiver: mpsc::Receiver<LobbyCommand>,
}

impl<P: Platform> LobbyActor<P> {
    /// Runs the actor loop until every handle is dropped.
    async fn run(mut self) {
        tracing::info!(room_id = %self.room.id, index = self.index, "lobby actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                LobbyCommand::Add { participant, reply } => {
                    let result = self.handle_add(participant).await;
                    let _ = reply.send(result);
                }
                LobbyCommand::Remove { participant, reply } => {
                    let result = self.handle_remove(participant).await;
                    let _ = reply.send(result);
                }
                LobbyCommand::Contains { participant, reply } => {
                    let _ = reply.send(self.participants.contains(&participant));
                }
                LobbyCommand::Info { reply } => {
                    let _ = reply.send(self.info());
                }
                LobbyCommand::Delete { reply } => {
                    let result = self.handle_delete().await;
                    let _ = reply.send(result);
                }
            }
        }

        tracing::debug!(room_id = %self.room.id, "lobby actor stopped");
    }

    async fn handle_add(&mut self, participant: ParticipantId) -> Result<usize, LobbyError> {
        self.ensure_active()?;
        if self.participants.contains(&participant) {
            return Err(LobbyError::AlreadyPresent(participant, self.room.id));
        }
        if self.participants.len() >= self.config.capacity {
            return Err(LobbyError::Full(self.room.id));
        }

        self.participants.push(participant);
        tracing::info!(
            room_id = %self.room.id,
            %participant,
            participants = self.participants.len(),
            "participant joined lobby"
        );

        self.publish().await?;
        Ok(self.participants.len())
    }

    async fn handle_remove(&mut self, participant: ParticipantId) -> Result<usize, LobbyError> {
        self.ensure_active()?;
        let Some(pos) = self.participants.iter().position(|p| *p == participant) else {
            return Err(LobbyError::NotPresent(participant, self.room.id));
        };

        self.participants.remove(pos);
        tracing::info!(
            room_id = %self.room.id,
            %participant,
            participants = self.participants.len(),
            "participant left lobby"
        );

        // An empty lobby is about to be torn down; its status message is
        // deleted rather than re-rendered.
        if self.participants.is_empty() {
            return Ok(0);
        }
        self.publish().await?;
        Ok(self.participants.len())
    }

    async fn handle_delete(&mut self) -> Result<(), LobbyError> {
        self.ensure_active()?;
        self.state = LobbyState::Closed;

        let (room, message) = tokio::join!(
            self.platform.delete_room(&self.room),
            self.platform.delete_message(&self.message),
        );
        log_release_failure(self.room.id, "room", &room);
        log_release_failure(self.room.id, "status message", &message);

        tracing::info!(room_id = %self.room.id, index = self.index, "lobby closed");
        room?;
        message?;
        Ok(())
    }

    /// Re-renders the status message and, when a full-variant room name
    /// is configured and fullness flipped, renames the room.
    async fn publish(&mut self) -> Result<(), PlatformError> {
        let status = render_status(&self.config, self.index, &self.link.url, &self.participants);
        self.message = self.platform.edit_message(&self.message, &status).await?;
        self.status = status;

        let full = self.participants.len() >= self.config.capacity;
        if self.config.templates.channel_title_full.is_some() && full != self.named_full {
            let name = render_room_name(&self.config, self.index, self.participants.len());
            self.room = self.platform.rename_room(&self.room, &name).await?;
            self.named_full = full;
            tracing::debug!(room_id = %self.room.id, name = %self.room.name, "room renamed");
        }
        Ok(())
    }

    fn ensure_active(&self) -> Result<(), LobbyError> {
        if self.state.is_active() {
            Ok(())
        } else {
            Err(LobbyError::Closed(self.room.id))
        }
    }

    fn info(&self) -> LobbyInfo {
        LobbyInfo {
            room: self.room.clone(),
            index: self.index,
            participants: self.participants.clone(),
            capacity: self.config.capacity,
            state: self.state,
            status: self.status.clone(),
            link: self.link.clone(),
            message: self.message,
        }
    }
}

fn log_release_failure(room_id: RoomId, what: &str, result: &Result<(), PlatformError>) {
    if let Err(error) = result {
        tracing::warn!(%room_id, %error, "failed to delete lobby {what}");
    }
}

/// Spawns a lobby actor task and returns a handle to communicate with it.
///
/// `channel_size` bounds the command queue; senders wait when it is full.
pub fn spawn_lobby<P: Platform>(
    platform: Arc<P>,
    config: Arc<LobbyConfig>,
    index: u32,
    resources: LobbyResources,
    channel_size: usize,
) -> LobbyHandle {
    let (tx, rx) = mpsc::channel(channel_size);
    let room = Arc::new(resources.room.clone());

    let actor = LobbyActor {
        platform,
        config,
        index,
        room: resources.room,
        link: resources.link,
        message: resources.message,
        status: resources.status,
        participants: Vec::new(),
        state: LobbyState::Active,
        named_full: false,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    LobbyHandle {
        index,
        room,
        sender: tx,
    }
}
