//! Integration tests for the keeper: settings → dispatcher → lobbies,
//! driven by membership events from the in-memory platform.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use voxlobby::prelude::*;
use voxlobby::{ConfigError, KeeperOptions, LobbyKeeperBuilder};
use voxlobby_lobby::{LobbyError, LobbyInfo};
use voxlobby_platform::{MemoryPlatform, Operation};
use voxlobby_protocol::{ChannelId, GroupId};

// =========================================================================
// Helpers
// =========================================================================

const TRIGGER: RoomId = RoomId(100);
const SQUAD_TRIGGER: RoomId = RoomId(101);
const GROUP: GroupId = GroupId(10);
const STATUS: ChannelId = ChannelId(20);

const SETTINGS: &str = r#"{
    "group": 10,
    "status_channel": 20,
    "lobbies": [{
        "trigger_room": 100,
        "display_name": "Duo",
        "capacity": 2,
        "channel_title": "Room #{index}",
        "message_title": "{current}/{limit} #{index}"
    }]
}"#;

fn pid(id: u64) -> ParticipantId {
    ParticipantId(id)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn platform() -> Arc<MemoryPlatform> {
    let platform = MemoryPlatform::new().with_latency(Duration::from_millis(1));
    platform.add_room(TRIGGER, "Create duo", 0, GROUP);
    platform.add_room(SQUAD_TRIGGER, "Create squad", 0, GROUP);
    Arc::new(platform)
}

fn builder(json: &str) -> LobbyKeeperBuilder {
    LobbyKeeper::<MemoryPlatform>::builder().settings(Settings::from_json(json).unwrap())
}

fn started(json: &str) -> LobbyKeeper<MemoryPlatform> {
    init_tracing();
    let keeper = builder(json).build(platform()).unwrap();
    keeper.start().unwrap();
    keeper
}

/// Polls `check` until it holds, failing the test after two seconds.
async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let waited = tokio::time::timeout(Duration::from_secs(2), async {
        while !check().await {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for: {what}");
}

async fn lobby_info(keeper: &LobbyKeeper<MemoryPlatform>, room: RoomId) -> Option<LobbyInfo> {
    let lobby = keeper.store().find(room)?;
    lobby.info().await.ok()
}

/// Waits until `participant` sits in a lobby room and is listed by it.
async fn wait_listed(keeper: &LobbyKeeper<MemoryPlatform>, participant: ParticipantId) -> LobbyInfo {
    eventually("participant listed in a lobby", || async {
        match keeper.platform().location(participant) {
            Some(room) => lobby_info(keeper, room)
                .await
                .is_some_and(|info| info.participants.contains(&participant)),
            None => false,
        }
    })
    .await;
    let room = keeper.platform().location(participant).unwrap();
    lobby_info(keeper, room).await.unwrap()
}

fn status(keeper: &LobbyKeeper<MemoryPlatform>, info: &LobbyInfo) -> (String, String) {
    let posted = keeper.platform().message(info.message.id).unwrap();
    (posted.content.title, posted.content.body)
}

// =========================================================================
// Lifecycle
// =========================================================================

#[tokio::test]
async fn test_full_lobby_lifecycle() {
    let keeper = started(SETTINGS);
    let platform = Arc::clone(keeper.platform());

    // P1 enters the trigger room: a lobby is created and P1 is moved in.
    platform.connect(pid(1), TRIGGER).unwrap();
    let info = wait_listed(&keeper, pid(1)).await;
    let room = info.room.id;
    let url = info.link.url.clone();
    assert_eq!(info.index, 1);
    assert_eq!(info.room.name, "Room #1");
    assert_eq!(platform.location(pid(1)), Some(room));
    assert_eq!(
        status(&keeper, &info),
        ("1/2 #1".to_string(), format!("[1] - <@1>\nJoin - {url}"))
    );

    // P2 joins the same room: the lobby is full.
    platform.connect(pid(2), room).unwrap();
    let info = wait_listed(&keeper, pid(2)).await;
    assert_eq!(info.participants, vec![pid(1), pid(2)]);
    assert_eq!(
        status(&keeper, &info),
        (
            "2/2 #1".to_string(),
            format!("[1] - <@1>\n[2] - <@2>\nJoin - {url}")
        )
    );

    // P1 leaves: P2 stays, index 1 stays reserved.
    platform.disconnect(pid(1));
    eventually("P1 removed", || async {
        lobby_info(&keeper, room)
            .await
            .is_some_and(|info| info.participants == vec![pid(2)])
    })
    .await;
    let info = lobby_info(&keeper, room).await.unwrap();
    assert_eq!(
        status(&keeper, &info),
        ("1/2 #1".to_string(), format!("[1] - <@2>\nJoin - {url}"))
    );
    assert_eq!(keeper.store().reserved_indices(), vec![1]);

    // P2 leaves: everything is released.
    let message = info.message.id;
    platform.disconnect(pid(2));
    eventually("lobby torn down", || async { platform.room(room).is_none() }).await;
    eventually("message deleted", || async { platform.message(message).is_none() }).await;
    assert!(keeper.store().is_empty());
    assert!(keeper.store().reserved_indices().is_empty());

    // The next trigger reuses index 1.
    platform.connect(pid(3), TRIGGER).unwrap();
    let info = wait_listed(&keeper, pid(3)).await;
    assert_eq!(info.index, 1);
    assert_eq!(info.room.name, "Room #1");

    keeper.stop().await;
}

#[tokio::test]
async fn test_full_message_title_variant() {
    let json = SETTINGS.replace(
        "\"message_title\": \"{current}/{limit} #{index}\"",
        "\"message_title\": \"{current}/{limit} #{index}\", \"message_title_full\": \"#{index} full\"",
    );
    let keeper = started(&json);
    let platform = Arc::clone(keeper.platform());

    platform.connect(pid(1), TRIGGER).unwrap();
    let info = wait_listed(&keeper, pid(1)).await;
    platform.connect(pid(2), info.room.id).unwrap();
    let info = wait_listed(&keeper, pid(2)).await;

    assert_eq!(status(&keeper, &info).0, "#1 full");
    keeper.stop().await;
}

#[tokio::test]
async fn test_parallel_lobbies_get_distinct_indices() {
    let keeper = started(SETTINGS);
    let platform = Arc::clone(keeper.platform());

    platform.connect(pid(1), TRIGGER).unwrap();
    platform.connect(pid(2), TRIGGER).unwrap();
    platform.connect(pid(3), TRIGGER).unwrap();
    let mut indices = Vec::new();
    for p in [1, 2, 3] {
        indices.push(wait_listed(&keeper, pid(p)).await.index);
    }
    indices.sort_unstable();

    assert_eq!(indices, vec![1, 2, 3]);
    assert_eq!(keeper.store().len(), 3);
    assert_eq!(platform.messages_in(STATUS).len(), 3);
    keeper.stop().await;
}

#[tokio::test]
async fn test_moving_from_lobby_to_trigger_creates_and_leaves() {
    let keeper = started(SETTINGS);
    let platform = Arc::clone(keeper.platform());

    platform.connect(pid(1), TRIGGER).unwrap();
    let first = wait_listed(&keeper, pid(1)).await;

    // Back to the trigger: the old lobby empties and a new one is made.
    platform.move_to(pid(1), TRIGGER).unwrap();
    eventually("old lobby gone", || async { platform.room(first.room.id).is_none() }).await;
    let second = wait_listed(&keeper, pid(1)).await;

    assert_ne!(second.room.id, first.room.id);
    assert_eq!(keeper.store().len(), 1);
    keeper.stop().await;
}

#[tokio::test]
async fn test_failed_creation_does_not_leak_index() {
    let keeper = started(SETTINGS);
    let platform = Arc::clone(keeper.platform());
    platform.fail_next(Operation::CreateJoinLink);

    platform.connect(pid(1), TRIGGER).unwrap();
    eventually("creation attempted", || async {
        platform.call_count(Operation::CreateJoinLink) == 1
    })
    .await;
    // Nothing to place, so the participant stays in the trigger room.
    platform.disconnect(pid(1));
    platform.connect(pid(2), TRIGGER).unwrap();
    let info = wait_listed(&keeper, pid(2)).await;

    assert_eq!(info.index, 1);
    keeper.stop().await;
}

// =========================================================================
// Start / stop
// =========================================================================

#[tokio::test]
async fn test_stopped_keeper_ignores_events() {
    let keeper = started(SETTINGS);
    let platform = Arc::clone(keeper.platform());
    assert!(keeper.is_running());

    keeper.stop().await;
    keeper.stop().await;
    assert!(!keeper.is_running());

    platform.connect(pid(1), TRIGGER).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(keeper.store().is_empty());
    assert_eq!(platform.call_count(Operation::CreateRoom), 0);
}

#[tokio::test]
async fn test_start_twice_fails() {
    let keeper = started(SETTINGS);
    let err = keeper.start().unwrap_err();
    assert!(matches!(
        err,
        VoxlobbyError::Dispatch(voxlobby::DispatchError::AlreadyRunning)
    ));
    keeper.stop().await;
}

// =========================================================================
// Builder
// =========================================================================

#[tokio::test]
async fn test_builder_rejects_empty_configuration() {
    let result = LobbyKeeper::<MemoryPlatform>::builder().build(platform());
    assert!(matches!(
        result,
        Err(VoxlobbyError::Config(ConfigError::NoLobbies))
    ));
}

#[tokio::test]
async fn test_builder_rejects_duplicate_trigger_across_sources() {
    let settings = Settings::from_json(SETTINGS).unwrap();
    let duplicate = settings.resolve().unwrap().remove(0);
    let result = LobbyKeeper::<MemoryPlatform>::builder()
        .settings(settings)
        .lobby(duplicate)
        .build(platform());
    assert!(matches!(
        result,
        Err(VoxlobbyError::Config(ConfigError::DuplicateTrigger(TRIGGER)))
    ));
}

/// Counts join events and fails on every one.
#[derive(Default)]
struct CountingJoin {
    seen: AtomicUsize,
}

#[async_trait]
impl JoinListener for CountingJoin {
    async fn on_join(&self, _participant: ParticipantId, _lobby: &LobbyHandle) -> Result<(), LobbyError> {
        self.seen.fetch_add(1, Ordering::SeqCst);
        Err(LobbyError::UnknownTrigger(RoomId(0)))
    }
}

#[tokio::test]
async fn test_extra_listener_runs_after_builtin_and_failure_is_contained() {
    init_tracing();
    let counter = Arc::new(CountingJoin::default());
    let keeper = builder(SETTINGS)
        .options(KeeperOptions { command_buffer: 4 })
        .join_listener(Arc::clone(&counter) as Arc<dyn JoinListener>)
        .build(platform())
        .unwrap();
    keeper.start().unwrap();
    let platform = Arc::clone(keeper.platform());

    platform.connect(pid(1), TRIGGER).unwrap();
    let info = wait_listed(&keeper, pid(1)).await;
    eventually("extra listener ran", || async { counter.seen.load(Ordering::SeqCst) == 1 }).await;

    // The failing listener does not stop later events.
    platform.connect(pid(2), info.room.id).unwrap();
    wait_listed(&keeper, pid(2)).await;
    eventually("extra listener ran again", || async { counter.seen.load(Ordering::SeqCst) == 2 }).await;
    keeper.stop().await;
}
