//! Concurrency-safe map from connection id to player state.
//!
//! A single mutex guards the map. Every operation holds the guard only for
//! the map access itself; `snapshot` hands back an owned copy so callers can
//! encode, send or draw it without blocking the network or tick threads.
//! Snapshot cost is O(players), which is fine for the small populations this
//! game runs with.

use crate::{ConnectionId, PlayerData};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
pub struct PlayerStateStore {
    players: Mutex<HashMap<ConnectionId, PlayerData>>,
}

impl PlayerStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the entry for `id`.
    pub fn upsert(&self, id: ConnectionId, data: PlayerData) {
        self.lock().insert(id, data);
    }

    /// Removes the entry for `id`, returning it if it was present.
    pub fn remove(&self, id: ConnectionId) -> Option<PlayerData> {
        self.lock().remove(&id)
    }

    /// Returns an independent copy of the whole map.
    pub fn snapshot(&self) -> HashMap<ConnectionId, PlayerData> {
        self.lock().clone()
    }

    /// Swaps the whole map for `players` in one step.
    pub fn replace_all(&self, players: HashMap<ConnectionId, PlayerData>) {
        *self.lock() = players;
    }

    pub fn get(&self, id: ConnectionId) -> Option<PlayerData> {
        self.lock().get(&id).copied()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // Entries are plain `Copy` data, so a writer that panicked cannot have
    // left one half-written; recover the guard instead of propagating poison.
    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, PlayerData>> {
        self.players.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Vec2;
    use rand::Rng;
    use std::sync::Arc;
    use std::thread;

    fn player(px: f32, py: f32, vx: f32, vy: f32) -> PlayerData {
        PlayerData::new(Vec2::new(px, py), Vec2::new(vx, vy))
    }

    #[test]
    fn test_snapshot_returns_exact_entries() {
        let store = PlayerStateStore::new();
        store.upsert(1, player(0.0, 0.0, 1.0, 0.0));
        store.upsert(2, player(5.0, 5.0, 0.0, 0.0));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[&1], player(0.0, 0.0, 1.0, 0.0));
        assert_eq!(snapshot[&2], player(5.0, 5.0, 0.0, 0.0));
    }

    #[test]
    fn test_upsert_overwrites_wholesale() {
        let store = PlayerStateStore::new();
        store.upsert(3, player(1.0, 1.0, 1.0, 1.0));
        store.upsert(3, player(9.0, 8.0, 0.0, 0.0));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(3), Some(player(9.0, 8.0, 0.0, 0.0)));
    }

    #[test]
    fn test_snapshot_is_independent_copy() {
        let store = PlayerStateStore::new();
        store.upsert(1, player(1.0, 2.0, 0.0, 0.0));

        let mut snapshot = store.snapshot();
        snapshot.insert(2, PlayerData::default());
        store.upsert(1, player(7.0, 7.0, 0.0, 0.0));

        assert_eq!(snapshot[&1], player(1.0, 2.0, 0.0, 0.0));
        assert!(store.get(2).is_none());
    }

    #[test]
    fn test_remove() {
        let store = PlayerStateStore::new();
        store.upsert(7, PlayerData::at_spawn());

        assert_eq!(store.remove(7), Some(PlayerData::at_spawn()));
        assert_eq!(store.remove(7), None);
        assert!(!store.snapshot().contains_key(&7));
        assert!(store.is_empty());
    }

    #[test]
    fn test_replace_all() {
        let store = PlayerStateStore::new();
        store.upsert(1, PlayerData::default());
        store.upsert(2, PlayerData::default());

        let mut next = HashMap::new();
        next.insert(5, player(5.0, 5.0, 5.0, 5.0));
        store.replace_all(next);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[&5], player(5.0, 5.0, 5.0, 5.0));

        store.clear();
        assert!(store.is_empty());
    }

    /// Writers only ever store entries whose four fields are equal, so any
    /// snapshot entry with differing fields would be a torn write.
    #[test]
    fn test_concurrent_upserts_never_tear() {
        const WRITERS: u32 = 8;
        const WRITES_PER_THREAD: usize = 2_000;
        const IDS: u32 = 4;

        let store = Arc::new(PlayerStateStore::new());

        let writers: Vec<_> = (0..WRITERS)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let mut rng = rand::thread_rng();
                    for _ in 0..WRITES_PER_THREAD {
                        let id = rng.gen_range(0..IDS);
                        let value: f32 = rng.gen_range(-1000.0..1000.0);
                        if rng.gen_bool(0.05) {
                            store.remove(id);
                        } else {
                            store.upsert(id, player(value, value, value, value));
                        }
                        if rng.gen_bool(0.1) {
                            thread::yield_now();
                        }
                    }
                })
            })
            .collect();

        let reader = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let mut snapshots = 0;
                for _ in 0..WRITES_PER_THREAD {
                    for (id, data) in store.snapshot() {
                        assert!(id < IDS);
                        let v = data.position.x;
                        assert_eq!(data.position.y, v, "torn entry for {}", id);
                        assert_eq!(data.velocity.x, v, "torn entry for {}", id);
                        assert_eq!(data.velocity.y, v, "torn entry for {}", id);
                    }
                    snapshots += 1;
                }
                snapshots
            })
        };

        for writer in writers {
            writer.join().unwrap();
        }
        assert_eq!(reader.join().unwrap(), WRITES_PER_THREAD);
        assert!(store.len() <= IDS as usize);
    }
}
