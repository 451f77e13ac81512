//! Room registry shared by all connections.
//!
//! Each room sits behind its own async mutex, so messages for one room are
//! applied one at a time while unrelated rooms never wait on each other.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::room::GameRoom;
use crate::store::RoomRecord;

pub type SharedRoom = Arc<Mutex<GameRoom>>;

#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<String, SharedRoom>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the room for `record`, creating it on first use
    pub fn get_or_create(&self, record: &RoomRecord) -> SharedRoom {
        self.rooms
            .entry(record.id.clone())
            .or_insert_with(|| {
                info!("Creating game for room {}", record.id);
                Arc::new(Mutex::new(GameRoom::new(record)))
            })
            .value()
            .clone()
    }

    #[cfg(test)]
    pub fn get(&self, room_id: &str) -> Option<SharedRoom> {
        self.rooms.get(room_id).map(|r| Arc::clone(r.value()))
    }

    /// Forget a room. Connections still holding it keep their handle.
    pub fn remove(&self, room_id: &str) -> bool {
        self.rooms.remove(room_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ClientMessage, ServerMessage};
    use binareversi_core::Color;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    #[test]
    fn test_lazy_creation_reuses_room() {
        let registry = RoomRegistry::new();
        assert!(registry.is_empty());

        let record = RoomRecord::new("r1", "alice");
        let first = registry.get_or_create(&record);
        let second = registry.get_or_create(&record);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);

        registry.get_or_create(&RoomRecord::new("r2", "carol"));
        assert_eq!(registry.len(), 2);

        assert!(registry.remove("r1"));
        assert!(!registry.remove("r1"));
        assert!(registry.get("r1").is_none());
        assert!(registry.get("r2").is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_messages_serialize_per_room() {
        let registry = Arc::new(RoomRegistry::new());
        let record = RoomRecord::new("busy", "alice").with_player2("bob");
        let room = registry.get_or_create(&record);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let alice = Uuid::new_v4();
        room.lock().await.connect(alice, "alice", tx).unwrap();

        // Many racing copies of the same operation: only the quota's worth may
        // land, and each one that lands hands the turn to white.
        let mut tasks = Vec::new();
        for _ in 0..16 {
            let registry = Arc::clone(&registry);
            let record = record.clone();
            tasks.push(tokio::spawn(async move {
                let room = registry.get_or_create(&record);
                let mut guard = room.lock().await;
                guard.handle(
                    alice,
                    ClientMessage::Operation {
                        row: 0,
                        value: 1,
                        operator: "+".into(),
                    },
                )
            }));
        }

        let mut accepted = 0;
        for task in tasks {
            if task.await.unwrap().is_ok() {
                accepted += 1;
            }
        }

        // The first success passes the turn, so every later attempt is refused
        assert_eq!(accepted, 1);
        let guard = room.lock().await;
        assert_eq!(guard.game().turn(), Color::White);
        assert_eq!(guard.game().turn_count(), 16);
        assert_eq!(guard.player("alice").unwrap().quota.plus, 1);
        drop(guard);

        let mut updates = 0;
        while let Ok(msg) = rx.try_recv() {
            assert!(matches!(msg, ServerMessage::BoardUpdate { .. }));
            updates += 1;
        }
        assert_eq!(updates, 1);
    }
}
