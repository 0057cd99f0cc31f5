//! Event dispatcher: classifies membership transitions into the creation,
//! join and leave pathways and runs the registered listeners.
//!
//! The dispatcher is the only subscriber to the platform's event stream.
//! Events are handled one at a time in arrival order. For each event the
//! pathways are evaluated in a fixed order:
//!
//! 1. **create**: the participant entered a configured trigger room
//! 2. **join**: the participant entered a room owned by a lobby
//! 3. **leave**: the participant left a room owned by a lobby
//!
//! A failing pathway does not stop the ones after it. Within a pathway,
//! listeners run in registration order and the first failure ends the
//! pathway.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use voxlobby_lobby::{CreateListener, JoinListener, LeaveListener, LobbyError, LobbyStore};
use voxlobby_protocol::{MembershipTransition, ParticipantId, RoomId};

use crate::{DispatchError, ListenerFailure};

/// Which pathway a listener belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pathway {
    Create,
    Join,
    Leave,
}

impl fmt::Display for Pathway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Join => write!(f, "join"),
            Self::Leave => write!(f, "leave"),
        }
    }
}

/// The background task consuming the event stream.
struct Running {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Routes membership transitions to lobby listeners.
///
/// Build with [`Dispatcher::new`] and the `with_*` methods, wrap in an
/// `Arc`, then [`start`](Self::start) it on a subscription.
pub struct Dispatcher {
    store: Arc<LobbyStore>,
    triggers: HashSet<RoomId>,
    create: Vec<Arc<dyn CreateListener>>,
    join: Vec<Arc<dyn JoinListener>>,
    leave: Vec<Arc<dyn LeaveListener>>,
    running: Mutex<Option<Running>>,
}

impl Dispatcher {
    /// Creates a dispatcher with no triggers and no listeners.
    pub fn new(store: Arc<LobbyStore>) -> Self {
        Self {
            store,
            triggers: HashSet::new(),
            create: Vec::new(),
            join: Vec::new(),
            leave: Vec::new(),
            running: Mutex::new(None),
        }
    }

    /// Marks `room` as a trigger room.
    pub fn with_trigger(mut self, room: RoomId) -> Self {
        self.triggers.insert(room);
        self
    }

    pub fn with_create_listener(mut self, listener: Arc<dyn CreateListener>) -> Self {
        self.create.push(listener);
        self
    }

    pub fn with_join_listener(mut self, listener: Arc<dyn JoinListener>) -> Self {
        self.join.push(listener);
        self
    }

    pub fn with_leave_listener(mut self, listener: Arc<dyn LeaveListener>) -> Self {
        self.leave.push(listener);
        self
    }

    /// Returns `true` if `room` is a configured trigger room.
    pub fn is_trigger(&self, room: RoomId) -> bool {
        self.triggers.contains(&room)
    }

    /// Handles one event: runs every applicable pathway and reports the
    /// listeners that failed.
    pub async fn dispatch(&self, event: MembershipTransition) -> Result<(), DispatchError> {
        if event.is_noop() {
            return Ok(());
        }
        let participant = event.participant;
        let mut failures = Vec::new();

        if let Some(trigger) = event.current.filter(|room| self.is_trigger(*room)) {
            tracing::debug!(%participant, %trigger, "creation pathway");
            for listener in &self.create {
                if let Err(error) = listener.on_create(participant, trigger).await {
                    failures.push(failure(Pathway::Create, participant, error));
                    break;
                }
            }
        }

        if let Some(lobby) = event.current.and_then(|room| self.store.find(room)) {
            tracing::debug!(%participant, room_id = %lobby.room_id(), "join pathway");
            for listener in &self.join {
                if let Err(error) = listener.on_join(participant, &lobby).await {
                    failures.push(failure(Pathway::Join, participant, error));
                    break;
                }
            }
        }

        if let Some(lobby) = event.previous.and_then(|room| self.store.find(room)) {
            tracing::debug!(%participant, room_id = %lobby.room_id(), "leave pathway");
            for listener in &self.leave {
                if let Err(error) = listener.on_leave(participant, &lobby).await {
                    failures.push(failure(Pathway::Leave, participant, error));
                    break;
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DispatchError::Listeners(failures))
        }
    }

    /// Starts consuming `events` on a background task.
    ///
    /// Fails with [`DispatchError::AlreadyRunning`] if the dispatcher was
    /// started and not stopped since.
    pub fn start(
        self: &Arc<Self>,
        events: broadcast::Receiver<MembershipTransition>,
    ) -> Result<(), DispatchError> {
        let mut running = self.lock_running();
        if running.is_some() {
            return Err(DispatchError::AlreadyRunning);
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(Arc::clone(self).run(events, shutdown_rx));
        *running = Some(Running { shutdown, task });

        tracing::info!(
            triggers = self.triggers.len(),
            create = self.create.len(),
            join = self.join.len(),
            leave = self.leave.len(),
            "dispatcher started"
        );
        Ok(())
    }

    /// Stops the background task and waits for the event in flight, if
    /// any, to finish. Stopping a dispatcher that is not running does
    /// nothing.
    pub async fn stop(&self) {
        let Some(running) = self.lock_running().take() else {
            return;
        };
        let _ = running.shutdown.send(true);
        if let Err(e) = running.task.await {
            tracing::error!(error = %e, "dispatcher task panicked");
        }
        tracing::info!("dispatcher stopped");
    }

    /// Returns `true` between [`start`](Self::start) and
    /// [`stop`](Self::stop).
    pub fn is_running(&self) -> bool {
        self.lock_running().is_some()
    }

    async fn run(
        self: Arc<Self>,
        mut events: broadcast::Receiver<MembershipTransition>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            let event = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                received = events.recv() => match received {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "event stream lagged, transitions dropped");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("event stream closed");
                        break;
                    }
                },
            };

            if let Err(e) = self.dispatch(event).await {
                tracing::error!(
                    participant = %event.participant,
                    previous = ?event.previous,
                    current = ?event.current,
                    error = %e,
                    "event handling failed"
                );
            }
        }
    }

    fn lock_running(&self) -> MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn failure(pathway: Pathway, participant: ParticipantId, error: LobbyError) -> ListenerFailure {
    ListenerFailure {
        pathway,
        participant,
        error,
    }
}
