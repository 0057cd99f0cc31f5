//! Runs a scripted voice session against the in-memory platform.
//!
//! ```text
//! RUST_LOG=info cargo run -p simulated-guild [-- path/to/settings.json]
//! ```
//!
//! Without a path the bundled `settings.json` is used.

use std::sync::Arc;
use std::time::Duration;

use voxlobby::{LobbyKeeper, LobbyKeeperBuilder, Settings};
use voxlobby_platform::MemoryPlatform;
use voxlobby_protocol::{GroupId, ParticipantId, RoomId};
use tracing_subscriber::EnvFilter;

const BUNDLED_SETTINGS: &str = include_str!("../settings.json");

const DUO_TRIGGER: RoomId = RoomId(100);
const SQUAD_TRIGGER: RoomId = RoomId(101);

/// Time for the keeper to react to one step of the script.
const STEP: Duration = Duration::from_millis(50);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let json = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(path)?,
        None => BUNDLED_SETTINGS.to_string(),
    };
    let settings = Settings::from_json(&json)?;

    let platform = MemoryPlatform::new().with_latency(Duration::from_millis(5));
    platform.add_room(DUO_TRIGGER, "+ New duo", 0, GroupId(10));
    platform.add_room(SQUAD_TRIGGER, "+ New squad", 0, GroupId(10));
    let platform = Arc::new(platform);

    let keeper = LobbyKeeperBuilder::new()
        .settings(settings)
        .build(Arc::clone(&platform))?;
    keeper.start()?;

    let alice = ParticipantId(1);
    let bob = ParticipantId(2);
    let carol = ParticipantId(3);

    tracing::info!("alice opens a duo");
    platform.connect(alice, DUO_TRIGGER)?;
    settle().await;
    let Some(duo) = platform.location(alice) else {
        return Err("alice was not moved into a lobby".into());
    };
    report(&keeper).await;

    tracing::info!("bob joins alice");
    platform.connect(bob, duo)?;
    settle().await;
    report(&keeper).await;

    tracing::info!("carol opens a squad");
    platform.connect(carol, SQUAD_TRIGGER)?;
    settle().await;
    report(&keeper).await;

    tracing::info!("alice leaves, then bob");
    platform.disconnect(alice);
    settle().await;
    report(&keeper).await;
    platform.disconnect(bob);
    settle().await;
    report(&keeper).await;

    tracing::info!("carol switches to a new duo");
    platform.move_to(carol, DUO_TRIGGER)?;
    settle().await;
    report(&keeper).await;

    platform.disconnect(carol);
    settle().await;
    keeper.stop().await;

    tracing::info!(
        lobbies = keeper.store().len(),
        rooms = platform.room_count(),
        "session over"
    );
    Ok(())
}

async fn settle() {
    tokio::time::sleep(STEP).await;
}

/// Prints every live lobby's status message.
async fn report(keeper: &LobbyKeeper<MemoryPlatform>) {
    let mut lobbies = keeper.store().lobbies();
    lobbies.sort_by_key(|lobby| lobby.index());
    if lobbies.is_empty() {
        println!("(no lobbies)\n");
        return;
    }
    for lobby in lobbies {
        match lobby.info().await {
            Ok(info) => {
                println!("[{}] {}", info.room.name, info.status.title);
                println!("{}\n", info.status.body);
            }
            Err(e) => tracing::warn!(error = %e, "lobby did not answer"),
        }
    }
}
