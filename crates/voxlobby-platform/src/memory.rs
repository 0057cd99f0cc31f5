//! In-memory platform: rooms, messages and participant locations in a map.
//!
//! `MemoryPlatform` behaves like a single-guild chat server. Rooms have a
//! participant limit, messages can be edited and deleted, and every change
//! of a participant's room is published as a [`MembershipTransition`] to
//! all subscribers, exactly as a real gateway would.
//!
//! Test code drives it with [`connect`](MemoryPlatform::connect),
//! [`move_to`](MemoryPlatform::move_to) and
//! [`disconnect`](MemoryPlatform::disconnect), and can make the next call
//! of any [`Operation`] fail with [`fail_next`](MemoryPlatform::fail_next).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::Rng;
use tokio::sync::broadcast;
use voxlobby_protocol::{
    ChannelId, GroupId, LinkHandle, MembershipTransition, MessageHandle, MessageId, ParticipantId,
    RoomHandle, RoomId, StatusContent,
};

use crate::{Operation, Platform, PlatformError};

/// Buffered events per subscriber before it starts lagging.
const EVENT_BUFFER: usize = 1024;

/// First id handed out for rooms and messages created at runtime.
/// Kept far above the small ids tests use for static rooms.
const FIRST_DYNAMIC_ID: u64 = 1_000_000;

/// Base URL for generated join links.
const LINK_BASE: &str = "https://voxlobby.invalid/";

/// A room as the memory platform sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRoom {
    pub handle: RoomHandle,
    /// Participants currently in the room, in arrival order.
    pub members: Vec<ParticipantId>,
}

/// A message as the memory platform sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub handle: MessageHandle,
    pub content: StatusContent,
    /// How many times the content was replaced.
    pub edits: usize,
}

#[derive(Default)]
struct MemoryState {
    rooms: HashMap<RoomId, MemoryRoom>,
    messages: HashMap<MessageId, PostedMessage>,
    links: HashMap<String, RoomId>,
    locations: HashMap<ParticipantId, RoomId>,
    pending_failures: Vec<Operation>,
    calls: Vec<Operation>,
}

impl MemoryState {
    /// Records the call and consumes a pending failure for it, if any.
    fn begin(&mut self, operation: Operation) -> Result<(), PlatformError> {
        self.calls.push(operation);
        if let Some(pos) = self.pending_failures.iter().position(|op| *op == operation) {
            self.pending_failures.remove(pos);
            return Err(PlatformError::Rejected {
                operation,
                reason: "injected failure".into(),
            });
        }
        Ok(())
    }

    /// Moves `participant` to `target` (or out of every room) and returns
    /// the transition to publish, if the room actually changed.
    fn relocate(
        &mut self,
        participant: ParticipantId,
        target: Option<RoomId>,
    ) -> Option<MembershipTransition> {
        let previous = self.locations.get(&participant).copied();
        if previous == target {
            return None;
        }
        if let Some(prev) = previous {
            if let Some(room) = self.rooms.get_mut(&prev) {
                room.members.retain(|m| *m != participant);
            }
            self.locations.remove(&participant);
        }
        if let Some(next) = target {
            if let Some(room) = self.rooms.get_mut(&next) {
                room.members.push(participant);
            }
            self.locations.insert(participant, next);
        }
        Some(MembershipTransition {
            previous,
            current: target,
            participant,
        })
    }

    fn check_capacity(&self, room: RoomId) -> Result<(), PlatformError> {
        let entry = self.rooms.get(&room).ok_or(PlatformError::UnknownRoom(room))?;
        if entry.handle.capacity > 0 && entry.members.len() >= entry.handle.capacity {
            return Err(PlatformError::RoomFull(room));
        }
        Ok(())
    }
}

/// A [`Platform`] that lives entirely in process memory.
pub struct MemoryPlatform {
    state: Mutex<MemoryState>,
    events: broadcast::Sender<MembershipTransition>,
    next_id: AtomicU64,
    latency: Option<Duration>,
}

impl MemoryPlatform {
    /// Creates an empty platform with no rooms.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            state: Mutex::new(MemoryState::default()),
            events,
            next_id: AtomicU64::new(FIRST_DYNAMIC_ID),
            latency: None,
        }
    }

    /// Makes every outbound call sleep for `latency` before it takes
    /// effect, so callers actually suspend.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Registers a pre-existing room, such as a trigger room.
    /// A `capacity` of 0 means unlimited.
    pub fn add_room(&self, id: RoomId, name: &str, capacity: usize, group: GroupId) {
        let handle = RoomHandle {
            id,
            name: name.to_string(),
            capacity,
            group,
        };
        self.lock().rooms.insert(
            id,
            MemoryRoom {
                handle,
                members: Vec::new(),
            },
        );
    }

    /// A participant connects directly into `room`.
    pub fn connect(&self, participant: ParticipantId, room: RoomId) -> Result<(), PlatformError> {
        self.move_to(participant, room)
    }

    /// A participant switches to `room` on their own.
    pub fn move_to(&self, participant: ParticipantId, room: RoomId) -> Result<(), PlatformError> {
        let event = {
            let mut state = self.lock();
            state.check_capacity(room)?;
            state.relocate(participant, Some(room))
        };
        self.publish(event);
        Ok(())
    }

    /// A participant leaves voice entirely.
    pub fn disconnect(&self, participant: ParticipantId) {
        let event = self.lock().relocate(participant, None);
        self.publish(event);
    }

    /// Makes the next call of `operation` fail with
    /// [`PlatformError::Rejected`]. Queued failures are consumed in order.
    pub fn fail_next(&self, operation: Operation) {
        self.lock().pending_failures.push(operation);
    }

    /// Returns a snapshot of a room.
    pub fn room(&self, id: RoomId) -> Option<MemoryRoom> {
        self.lock().rooms.get(&id).cloned()
    }

    /// Returns every room whose name equals `name`.
    pub fn rooms_named(&self, name: &str) -> Vec<MemoryRoom> {
        self.lock()
            .rooms
            .values()
            .filter(|room| room.handle.name == name)
            .cloned()
            .collect()
    }

    /// Number of rooms currently on the platform, static ones included.
    pub fn room_count(&self) -> usize {
        self.lock().rooms.len()
    }

    /// Returns a snapshot of a message.
    pub fn message(&self, id: MessageId) -> Option<PostedMessage> {
        self.lock().messages.get(&id).cloned()
    }

    /// Returns every message posted to `channel`.
    pub fn messages_in(&self, channel: ChannelId) -> Vec<PostedMessage> {
        let mut found: Vec<PostedMessage> = self
            .lock()
            .messages
            .values()
            .filter(|m| m.handle.channel == channel)
            .cloned()
            .collect();
        found.sort_by_key(|m| m.handle.id.0);
        found
    }

    /// The room a participant is currently in.
    pub fn location(&self, participant: ParticipantId) -> Option<RoomId> {
        self.lock().locations.get(&participant).copied()
    }

    /// The room an invite code joins, if the link is still valid.
    pub fn link_target(&self, code: &str) -> Option<RoomId> {
        self.lock().links.get(code).copied()
    }

    /// Every outbound call made so far, in order.
    pub fn calls(&self) -> Vec<Operation> {
        self.lock().calls.clone()
    }

    /// How many times `operation` has been called.
    pub fn call_count(&self, operation: Operation) -> usize {
        self.lock().calls.iter().filter(|op| **op == operation).count()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn publish(&self, event: Option<MembershipTransition>) {
        if let Some(event) = event {
            tracing::trace!(
                participant = %event.participant,
                previous = ?event.previous,
                current = ?event.current,
                "membership transition"
            );
            // No subscribers is fine: nobody is listening yet.
            let _ = self.events.send(event);
        }
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

impl Default for MemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for MemoryPlatform {
    async fn create_room(
        &self,
        name: &str,
        capacity: usize,
        group: GroupId,
    ) -> Result<RoomHandle, PlatformError> {
        self.delay().await;
        let mut state = self.lock();
        state.begin(Operation::CreateRoom)?;
        let handle = RoomHandle {
            id: RoomId(self.next_id()),
            name: name.to_string(),
            capacity,
            group,
        };
        state.rooms.insert(
            handle.id,
            MemoryRoom {
                handle: handle.clone(),
                members: Vec::new(),
            },
        );
        tracing::debug!(room_id = %handle.id, name, "room created");
        Ok(handle)
    }

    async fn create_join_link(&self, room: &RoomHandle) -> Result<LinkHandle, PlatformError> {
        self.delay().await;
        let mut state = self.lock();
        state.begin(Operation::CreateJoinLink)?;
        if !state.rooms.contains_key(&room.id) {
            return Err(PlatformError::UnknownRoom(room.id));
        }
        let code = generate_code();
        state.links.insert(code.clone(), room.id);
        Ok(LinkHandle {
            room: room.id,
            url: format!("{LINK_BASE}{code}"),
            code,
        })
    }

    async fn post_message(
        &self,
        channel: ChannelId,
        content: &StatusContent,
    ) -> Result<MessageHandle, PlatformError> {
        self.delay().await;
        let mut state = self.lock();
        state.begin(Operation::PostMessage)?;
        let handle = MessageHandle {
            channel,
            id: MessageId(self.next_id()),
        };
        state.messages.insert(
            handle.id,
            PostedMessage {
                handle,
                content: content.clone(),
                edits: 0,
            },
        );
        Ok(handle)
    }

    async fn edit_message(
        &self,
        message: &MessageHandle,
        content: &StatusContent,
    ) -> Result<MessageHandle, PlatformError> {
        self.delay().await;
        let mut state = self.lock();
        state.begin(Operation::EditMessage)?;
        let posted = state
            .messages
            .get_mut(&message.id)
            .ok_or(PlatformError::UnknownMessage(message.id))?;
        posted.content = content.clone();
        posted.edits += 1;
        Ok(posted.handle)
    }

    async fn rename_room(&self, room: &RoomHandle, name: &str) -> Result<RoomHandle, PlatformError> {
        self.delay().await;
        let mut state = self.lock();
        state.begin(Operation::RenameRoom)?;
        let entry = state
            .rooms
            .get_mut(&room.id)
            .ok_or(PlatformError::UnknownRoom(room.id))?;
        entry.handle.name = name.to_string();
        Ok(entry.handle.clone())
    }

    async fn delete_room(&self, room: &RoomHandle) -> Result<(), PlatformError> {
        self.delay().await;
        let events: Vec<MembershipTransition> = {
            let mut state = self.lock();
            state.begin(Operation::DeleteRoom)?;
            let removed = state
                .rooms
                .remove(&room.id)
                .ok_or(PlatformError::UnknownRoom(room.id))?;
            state.links.retain(|_, target| *target != room.id);
            // Anyone still inside is dropped from voice.
            removed
                .members
                .iter()
                .filter_map(|member| state.relocate(*member, None))
                .collect()
        };
        tracing::debug!(room_id = %room.id, "room deleted");
        for event in events {
            self.publish(Some(event));
        }
        Ok(())
    }

    async fn delete_message(&self, message: &MessageHandle) -> Result<(), PlatformError> {
        self.delay().await;
        let mut state = self.lock();
        state.begin(Operation::DeleteMessage)?;
        state
            .messages
            .remove(&message.id)
            .map(|_| ())
            .ok_or(PlatformError::UnknownMessage(message.id))
    }

    async fn move_participant(
        &self,
        participant: ParticipantId,
        room: &RoomHandle,
    ) -> Result<(), PlatformError> {
        self.delay().await;
        let event = {
            let mut state = self.lock();
            state.begin(Operation::MoveParticipant)?;
            state.check_capacity(room.id)?;
            if !state.locations.contains_key(&participant) {
                // The platform can only move members who are in voice.
                return Err(PlatformError::Rejected {
                    operation: Operation::MoveParticipant,
                    reason: format!("{participant} is not connected"),
                });
            }
            state.relocate(participant, Some(room.id))
        };
        self.publish(event);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<MembershipTransition> {
        self.events.subscribe()
    }
}

/// Generates an 8-character alphanumeric invite code.
fn generate_code() -> String {
    rand::rng()
        .sample_iter(rand::distr::Alphanumeric)
        .take(8)
        .map(char::from)
        .collect()
}
