//! Room storage.
//!
//! The session driver never holds rooms in memory between actions: each
//! action loads the room, mutates it and saves it back. Rooms are stored as
//! their JSON serialization, the same bytes a shared key-value store would
//! hold.

use dashmap::DashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::room::Room;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Corrupt room record: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Keyed storage for room records
pub trait Directory: Send + Sync {
    fn load(&self, room_id: Uuid) -> Result<Option<Room>, DirectoryError>;

    fn save(&self, room: &Room) -> Result<(), DirectoryError>;

    fn delete(&self, room_id: Uuid) -> Result<(), DirectoryError>;

    fn list(&self) -> Result<Vec<Room>, DirectoryError>;
}

/// Process-local directory backed by a concurrent map
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    rooms: DashMap<Uuid, String>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Directory for InMemoryDirectory {
    fn load(&self, room_id: Uuid) -> Result<Option<Room>, DirectoryError> {
        match self.rooms.get(&room_id) {
            Some(json) => Ok(Some(serde_json::from_str(json.value())?)),
            None => Ok(None),
        }
    }

    fn save(&self, room: &Room) -> Result<(), DirectoryError> {
        let json = serde_json::to_string(room)?;
        self.rooms.insert(room.id, json);
        Ok(())
    }

    fn delete(&self, room_id: Uuid) -> Result<(), DirectoryError> {
        self.rooms.remove(&room_id);
        Ok(())
    }

    fn list(&self) -> Result<Vec<Room>, DirectoryError> {
        self.rooms
            .iter()
            .map(|entry| serde_json::from_str::<Room>(entry.value()).map_err(DirectoryError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_save_load_delete() {
        let directory = InMemoryDirectory::new();
        let mut room = Room::new(Uuid::new_v4(), "host", "Host", 8);
        room.add_player("p2", "Player 2").unwrap();
        room.start_game("host").unwrap();

        directory.save(&room).unwrap();
        assert_eq!(directory.load(room.id).unwrap(), Some(room.clone()));
        assert_eq!(directory.list().unwrap().len(), 1);

        directory.delete(room.id).unwrap();
        assert_eq!(directory.load(room.id).unwrap(), None);
        assert!(directory.list().unwrap().is_empty());
    }

    #[test]
    fn test_missing_room() {
        let directory = InMemoryDirectory::new();
        assert_eq!(directory.load(Uuid::new_v4()).unwrap(), None);
        // Deleting twice is fine
        directory.delete(Uuid::new_v4()).unwrap();
    }

    #[test]
    fn test_corrupt_record() {
        let directory = InMemoryDirectory::new();
        let id = Uuid::new_v4();
        directory.rooms.insert(id, "{not json".to_string());

        assert!(matches!(directory.load(id), Err(DirectoryError::Serde(_))));
        assert!(directory.list().is_err());
    }
}
