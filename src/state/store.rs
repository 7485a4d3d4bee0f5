//! Durable room snapshots.
//!
//! Stores are synchronous on purpose: the registry calls `save` while it holds
//! a room's exclusive section, right after a transition succeeded.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::room::GameRoom;
use crate::types::RoomCode;

/// Schema version for stored room documents
/// Version 1: initial layout
pub const STORE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("stored schema version {found} is newer than supported version {supported}")]
    SchemaTooNew { found: u32, supported: u32 },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One persisted room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRoom {
    pub schema_version: u32,
    /// ISO8601 time of the write
    pub saved_at: String,
    pub room: GameRoom,
}

impl StoredRoom {
    pub fn new(room: GameRoom) -> Self {
        Self {
            schema_version: STORE_SCHEMA_VERSION,
            saved_at: chrono::Utc::now().to_rfc3339(),
            room,
        }
    }

    fn validate(self) -> StoreResult<GameRoom> {
        if self.schema_version > STORE_SCHEMA_VERSION {
            return Err(StoreError::SchemaTooNew {
                found: self.schema_version,
                supported: STORE_SCHEMA_VERSION,
            });
        }
        Ok(self.room)
    }
}

pub trait RoomStore: Send + Sync {
    fn save(&self, room: &GameRoom) -> StoreResult<()>;

    fn load(&self, code: &RoomCode) -> StoreResult<Option<GameRoom>>;

    fn load_all(&self) -> StoreResult<Vec<GameRoom>>;

    fn delete(&self, code: &RoomCode) -> StoreResult<()>;
}

/// Keeps serialized snapshots in memory. Good enough for a single process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rooms: Mutex<HashMap<RoomCode, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<RoomCode, String>> {
        // A poisoned map still holds complete JSON documents
        self.rooms.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl RoomStore for MemoryStore {
    fn save(&self, room: &GameRoom) -> StoreResult<()> {
        let json = serde_json::to_string(&StoredRoom::new(room.clone()))?;
        self.lock().insert(room.code.clone(), json);
        Ok(())
    }

    fn load(&self, code: &RoomCode) -> StoreResult<Option<GameRoom>> {
        match self.lock().get(code) {
            Some(json) => Ok(Some(serde_json::from_str::<StoredRoom>(json)?.validate()?)),
            None => Ok(None),
        }
    }

    fn load_all(&self) -> StoreResult<Vec<GameRoom>> {
        self.lock()
            .values()
            .map(|json| serde_json::from_str::<StoredRoom>(json)?.validate())
            .collect()
    }

    fn delete(&self, code: &RoomCode) -> StoreResult<()> {
        self.lock().remove(code);
        Ok(())
    }
}

/// One `<CODE>.json` document per room in a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, code: &RoomCode) -> PathBuf {
        self.dir.join(format!("{}.json", code))
    }

    fn read(path: &Path) -> StoreResult<GameRoom> {
        let bytes = fs::read(path)?;
        serde_json::from_slice::<StoredRoom>(&bytes)?.validate()
    }
}

impl RoomStore for FileStore {
    fn save(&self, room: &GameRoom) -> StoreResult<()> {
        let json = serde_json::to_vec_pretty(&StoredRoom::new(room.clone()))?;
        let target = self.path_for(&room.code);
        let tmp = target.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &target)?;
        Ok(())
    }

    fn load(&self, code: &RoomCode) -> StoreResult<Option<GameRoom>> {
        let path = self.path_for(code);
        if !path.exists() {
            return Ok(None);
        }
        Self::read(&path).map(Some)
    }

    fn load_all(&self) -> StoreResult<Vec<GameRoom>> {
        let mut rooms = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read(&path) {
                Ok(room) => rooms.push(room),
                Err(e) => {
                    tracing::warn!(path = %path.display(), "Skipping unreadable room snapshot: {}", e);
                }
            }
        }
        Ok(rooms)
    }

    fn delete(&self, code: &RoomCode) -> StoreResult<()> {
        match fs::remove_file(self.path_for(code)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GameSettings;

    fn room(code: &str) -> GameRoom {
        GameRoom::new(code.parse().unwrap(), "host".to_string(), GameSettings::default())
    }

    #[test]
    fn test_memory_store_save_load_delete() {
        let store = MemoryStore::new();
        let r = room("ABCD");
        store.save(&r).unwrap();
        assert_eq!(store.load(&r.code).unwrap(), Some(r.clone()));
        assert_eq!(store.load_all().unwrap().len(), 1);

        store.delete(&r.code).unwrap();
        assert_eq!(store.load(&r.code).unwrap(), None);
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let mut r = room("WXYZ");
        r.join("guest", 8).unwrap();
        store.save(&r).unwrap();

        assert!(dir.path().join("WXYZ.json").exists());
        assert!(!dir.path().join("WXYZ.json.tmp").exists());
        assert_eq!(store.load(&r.code).unwrap(), Some(r.clone()));

        // Overwrite in place
        r.join("third", 8).unwrap();
        store.save(&r).unwrap();
        assert_eq!(store.load(&r.code).unwrap().unwrap().players.len(), 3);
    }

    #[test]
    fn test_file_store_load_all_skips_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.save(&room("AAAA")).unwrap();
        store.save(&room("BBBB")).unwrap();
        fs::write(dir.path().join("CCCC.json"), b"not json").unwrap();
        fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let mut codes: Vec<String> = store
            .load_all()
            .unwrap()
            .into_iter()
            .map(|r| r.code.to_string())
            .collect();
        codes.sort();
        assert_eq!(codes, vec!["AAAA", "BBBB"]);
    }

    #[test]
    fn test_file_store_delete_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(store.delete(&"QQQQ".parse().unwrap()).is_ok());
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let mut stored = StoredRoom::new(room("ABCD"));
        stored.schema_version = STORE_SCHEMA_VERSION + 1;
        fs::write(
            dir.path().join("ABCD.json"),
            serde_json::to_vec(&stored).unwrap(),
        )
        .unwrap();

        let err = store.load(&"ABCD".parse().unwrap()).unwrap_err();
        assert!(matches!(err, StoreError::SchemaTooNew { .. }));
    }

    #[test]
    fn test_documents_carry_first_schema_version() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.save(&room("ABCD")).unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&fs::read(dir.path().join("ABCD.json")).unwrap()).unwrap();
        assert_eq!(raw["schema_version"], 1);
        assert!(raw["room"]["version"].is_u64());
    }
}
