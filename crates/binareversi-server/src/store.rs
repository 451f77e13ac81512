//! Room and player records owned by the lobby side of the system.
//!
//! The game server only reads these records (and deletes rooms on request).
//! `MemoryRoomStore` is the in-process implementation used by the binary,
//! optionally seeded from a JSON file.

use anyhow::Context;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("room not found: {0}")]
    RoomNotFound(String),

    #[error("player not found: {0}")]
    PlayerNotFound(String),
}

/// A two-seat room as created by the lobby
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    pub id: String,
    /// Room creator; plays black
    pub player1: String,
    /// Second seat; plays white once filled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player2: Option<String>,
    #[serde(default)]
    pub is_full: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl RoomRecord {
    #[cfg(test)]
    pub fn new(id: impl Into<String>, player1: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            player1: player1.into(),
            player2: None,
            is_full: false,
            created_at: Utc::now(),
        }
    }

    /// Fill the second seat
    #[cfg(test)]
    pub fn with_player2(mut self, player2: impl Into<String>) -> Self {
        self.player2 = Some(player2.into());
        self.is_full = true;
        self
    }

    /// Whether `player_id` holds one of the two seats
    pub fn has_player(&self, player_id: &str) -> bool {
        self.player1 == player_id || self.player2.as_deref() == Some(player_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    pub id: String,
    pub name: String,
    #[serde(default = "Utc::now")]
    pub last_used_at: DateTime<Utc>,
}

impl PlayerRecord {
    #[cfg(test)]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            last_used_at: Utc::now(),
        }
    }
}

/// Lookup and deletion of lobby records.
///
/// Calls are synchronous; an unknown identifier yields the matching
/// `NotFound` variant.
pub trait RoomStore: Send + Sync {
    fn room(&self, id: &str) -> Result<RoomRecord, StoreError>;

    fn player(&self, id: &str) -> Result<PlayerRecord, StoreError>;

    fn delete_room(&self, id: &str) -> Result<(), StoreError>;
}

/// Contents of a seed file
#[derive(Debug, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub players: Vec<PlayerRecord>,
    #[serde(default)]
    pub rooms: Vec<RoomRecord>,
}

/// `RoomStore` kept in memory
#[derive(Debug, Default)]
pub struct MemoryRoomStore {
    rooms: DashMap<String, RoomRecord>,
    players: DashMap<String, PlayerRecord>,
}

impl MemoryRoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: Seed) -> Self {
        let store = Self::new();
        for player in seed.players {
            store.insert_player(player);
        }
        for room in seed.rooms {
            store.insert_room(room);
        }
        store
    }

    /// Read a JSON seed file of `{"players": [...], "rooms": [...]}`
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let seed: Seed = serde_json::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(Self::from_seed(seed))
    }

    pub fn insert_room(&self, room: RoomRecord) {
        self.rooms.insert(room.id.clone(), room);
    }

    pub fn insert_player(&self, player: PlayerRecord) {
        self.players.insert(player.id.clone(), player);
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

impl RoomStore for MemoryRoomStore {
    fn room(&self, id: &str) -> Result<RoomRecord, StoreError> {
        self.rooms
            .get(id)
            .map(|r| r.clone())
            .ok_or_else(|| StoreError::RoomNotFound(id.to_string()))
    }

    fn player(&self, id: &str) -> Result<PlayerRecord, StoreError> {
        self.players
            .get(id)
            .map(|p| p.clone())
            .ok_or_else(|| StoreError::PlayerNotFound(id.to_string()))
    }

    fn delete_room(&self, id: &str) -> Result<(), StoreError> {
        self.rooms
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::RoomNotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_membership() {
        let room = RoomRecord::new("r1", "alice");
        assert!(room.has_player("alice"));
        assert!(!room.has_player("bob"));
        assert!(!room.is_full);

        let room = room.with_player2("bob");
        assert!(room.has_player("bob"));
        assert!(room.is_full);
    }

    #[test]
    fn test_lookup_and_delete() {
        let store = MemoryRoomStore::new();
        store.insert_room(RoomRecord::new("r1", "alice"));
        store.insert_player(PlayerRecord::new("alice", "Alice"));

        assert_eq!(store.room("r1").unwrap().player1, "alice");
        assert_eq!(store.player("alice").unwrap().name, "Alice");
        assert_eq!(
            store.room("nope"),
            Err(StoreError::RoomNotFound("nope".to_string()))
        );
        assert_eq!(
            store.player("bob"),
            Err(StoreError::PlayerNotFound("bob".to_string()))
        );

        store.delete_room("r1").unwrap();
        assert!(store.room("r1").is_err());
        assert!(store.delete_room("r1").is_err());
    }

    #[test]
    fn test_seed_format() {
        let json = r#"{
            "players": [{"id": "p1", "name": "Alice"}],
            "rooms": [
                {"id": "r1", "player1": "p1", "player2": "p2", "isFull": true,
                 "createdAt": "2024-05-01T12:00:00Z"},
                {"id": "r2", "player1": "p3"}
            ]
        }"#;
        let seed: Seed = serde_json::from_str(json).unwrap();
        let store = MemoryRoomStore::from_seed(seed);

        assert_eq!(store.room_count(), 2);
        let r1 = store.room("r1").unwrap();
        assert_eq!(r1.player2.as_deref(), Some("p2"));
        assert!(r1.is_full);
        assert_eq!(r1.created_at.to_rfc3339(), "2024-05-01T12:00:00+00:00");
        assert_eq!(store.room("r2").unwrap().player2, None);
    }
}
