//! Lobby store: index allocation and the room → lobby registry.
//!
//! The store is the only shared mutable state in the engine. Every method
//! is synchronous and holds the lock only for the duration of a map
//! operation, so reserving an index can never interleave with another
//! reservation, and a lobby leaves the registry before any asynchronous
//! teardown of its room begins.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use voxlobby_protocol::RoomId;

use crate::{LobbyHandle, StoreError};

#[derive(Default)]
struct StoreInner {
    lobbies: HashMap<RoomId, LobbyHandle>,
    /// Reserved indices. Every live lobby's index is in here, plus any
    /// index reserved for a lobby still being provisioned.
    reserved: BTreeSet<u32>,
}

/// Tracks every live lobby and the indices they occupy.
///
/// Shared as `Arc<LobbyStore>` between the dispatcher and the listeners.
#[derive(Default)]
pub struct LobbyStore {
    inner: Mutex<StoreInner>,
}

impl LobbyStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves and returns the smallest positive index not in use.
    pub fn reserve_index(&self) -> u32 {
        let mut inner = self.lock();
        // The reserved set is sorted: the first gap is the answer.
        let mut candidate = 1;
        for index in &inner.reserved {
            if *index != candidate {
                break;
            }
            candidate += 1;
        }
        inner.reserved.insert(candidate);
        candidate
    }

    /// Returns a reserved index to the free set without touching the
    /// registry. Used when provisioning fails after reservation.
    pub fn release_index(&self, index: u32) {
        self.lock().reserved.remove(&index);
    }

    /// Registers a lobby under its room id.
    ///
    /// Fails if the room is already registered or another registered lobby
    /// holds the same index.
    pub fn save(&self, lobby: LobbyHandle) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let room_id = lobby.room_id();
        if inner.lobbies.contains_key(&room_id) {
            return Err(StoreError::AlreadyRegistered(room_id));
        }
        let index = lobby.index();
        if inner.lobbies.values().any(|other| other.index() == index) {
            return Err(StoreError::IndexInUse(index));
        }
        inner.reserved.insert(index);
        tracing::debug!(%room_id, index = lobby.index(), "lobby registered");
        inner.lobbies.insert(room_id, lobby);
        Ok(())
    }

    /// Looks up the lobby that owns `room_id`.
    pub fn find(&self, room_id: RoomId) -> Option<LobbyHandle> {
        self.lock().lobbies.get(&room_id).cloned()
    }

    /// Unregisters a lobby and releases its index.
    pub fn remove(&self, lobby: &LobbyHandle) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let room_id = lobby.room_id();
        let removed = inner
            .lobbies
            .remove(&room_id)
            .ok_or(StoreError::NotRegistered(room_id))?;
        inner.reserved.remove(&removed.index());
        tracing::debug!(%room_id, index = removed.index(), "lobby unregistered");
        Ok(())
    }

    /// Number of registered lobbies.
    pub fn len(&self) -> usize {
        self.lock().lobbies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().lobbies.is_empty()
    }

    /// Currently reserved indices, ascending.
    pub fn reserved_indices(&self) -> Vec<u32> {
        self.lock().reserved.iter().copied().collect()
    }

    /// Handles to every registered lobby, in no particular order.
    pub fn lobbies(&self) -> Vec<LobbyHandle> {
        self.lock().lobbies.values().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_starts_at_one() {
        let store = LobbyStore::new();
        assert_eq!(store.reserve_index(), 1);
        assert_eq!(store.reserve_index(), 2);
        assert_eq!(store.reserve_index(), 3);
    }

    #[test]
    fn test_released_index_is_reused_first() {
        let store = LobbyStore::new();
        for _ in 0..4 {
            store.reserve_index();
        }
        store.release_index(2);
        assert_eq!(store.reserve_index(), 2);
        assert_eq!(store.reserve_index(), 5);
    }

    #[test]
    fn test_smallest_gap_wins() {
        let store = LobbyStore::new();
        for _ in 0..5 {
            store.reserve_index();
        }
        store.release_index(4);
        store.release_index(1);
        assert_eq!(store.reserve_index(), 1);
        assert_eq!(store.reserve_index(), 4);
        assert_eq!(store.reserved_indices(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_releasing_unreserved_index_is_harmless() {
        let store = LobbyStore::new();
        store.release_index(9);
        assert_eq!(store.reserve_index(), 1);
    }

    #[test]
    fn test_concurrent_reservations_are_unique() {
        use std::sync::Arc;

        let store = Arc::new(LobbyStore::new());
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || (0..50).map(|_| store.reserve_index()).collect::<Vec<_>>())
            })
            .collect();

        let mut all: Vec<u32> = threads
            .into_iter()
            .flat_map(|t| t.join().unwrap())
            .collect();
        all.sort_unstable();
        assert_eq!(all, (1..=400).collect::<Vec<_>>());
    }

    #[test]
    fn test_empty_store() {
        let store = LobbyStore::new();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
        assert!(store.find(RoomId(1)).is_none());
    }
}
