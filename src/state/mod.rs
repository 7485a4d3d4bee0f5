pub mod connections;
pub mod registry;
pub mod store;
pub mod timer;

pub use connections::{ConnectionId, ConnectionTable};
pub use registry::{Committed, RoomGuard, RoomRegistry};
pub use store::{FileStore, MemoryStore, RoomStore, StoreError};
pub use timer::DayTimers;

use crate::config::AppConfig;
use crate::directory::{MemoryDirectory, UserDirectory};
use crate::words::WordSelector;
use std::sync::Arc;

/// Shared application state, built once in `main` and handed to every
/// handler behind an `Arc`
pub struct AppState {
    pub config: AppConfig,
    pub registry: RoomRegistry,
    pub connections: ConnectionTable,
    pub directory: Arc<dyn UserDirectory>,
    pub words: WordSelector,
    pub timers: DayTimers,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self::with_parts(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryDirectory::new()),
        )
    }

    pub fn with_parts(
        config: AppConfig,
        store: Arc<dyn RoomStore>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            config,
            registry: RoomRegistry::new(store),
            connections: ConnectionTable::new(),
            directory,
            words: WordSelector::default(),
            timers: DayTimers::new(),
        }
    }

    /// State backed by the store `config` asks for
    pub fn from_config(config: AppConfig) -> Result<Self, StoreError> {
        let store: Arc<dyn RoomStore> = match &config.store_dir {
            Some(dir) => {
                tracing::info!("Persisting rooms to {}", dir.display());
                Arc::new(FileStore::open(dir)?)
            }
            None => {
                tracing::info!("Keeping rooms in memory only");
                Arc::new(MemoryStore::new())
            }
        };
        Ok(Self::with_parts(
            config,
            store,
            Arc::new(MemoryDirectory::new()),
        ))
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GameSettings;

    #[tokio::test]
    async fn test_independent_states_do_not_share_rooms() {
        let a = AppState::default();
        let b = AppState::default();
        let room = a.registry.create("alice", GameSettings::default()).await.unwrap();
        assert!(a.registry.get(&room.code).await.is_ok());
        assert!(b.registry.get(&room.code).await.is_err());
    }

    #[tokio::test]
    async fn test_file_backed_state_survives_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            store_dir: Some(dir.path().to_path_buf()),
            ..AppConfig::default()
        };

        let first = AppState::from_config(config.clone()).unwrap();
        let room = first
            .registry
            .create("alice", GameSettings::default())
            .await
            .unwrap();

        let second = AppState::from_config(config).unwrap();
        second.registry.restore().await.unwrap();
        assert_eq!(second.registry.get(&room.code).await.unwrap().host, "alice");
    }
}
