use crate::errors::CoreError;

use super::format;
use super::memory::{InMemoryStore, StoreSnapshot};

/// Save/load store snapshots to/from bytes or files.
pub struct StorageManager;

impl StorageManager {
    /// Serialize a snapshot to raw bytes (portable, platform-independent).
    ///
    /// Flow: StoreSnapshot → bincode → WLDG format bytes
    pub fn save_to_bytes(snapshot: &StoreSnapshot) -> Result<Vec<u8>, CoreError> {
        let payload = bincode::serialize(snapshot)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize snapshot: {e}")))?;
        Ok(format::write_file(format::CURRENT_VERSION, &payload))
    }

    /// Flow: WLDG bytes → parse header → bincode → StoreSnapshot
    pub fn load_from_bytes(data: &[u8]) -> Result<StoreSnapshot, CoreError> {
        let (_header, payload) = format::read_file(data)?;
        bincode::deserialize(payload)
            .map_err(|e| CoreError::Deserialization(format!("Failed to deserialize snapshot: {e}")))
    }

    /// Snapshot a live store and serialize it.
    pub fn save_store(store: &InMemoryStore) -> Result<Vec<u8>, CoreError> {
        Self::save_to_bytes(&store.snapshot()?)
    }

    pub fn load_store(data: &[u8]) -> Result<InMemoryStore, CoreError> {
        Ok(InMemoryStore::from_snapshot(Self::load_from_bytes(data)?))
    }

    /// Save a store to a file on disk (native only).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_file(store: &InMemoryStore, path: &str) -> Result<(), CoreError> {
        let bytes = Self::save_store(store)?;
        std::fs::write(path, bytes)?;
        log::info!("Saved store snapshot to {path}");
        Ok(())
    }

    /// Load a store from a file on disk (native only).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_file(path: &str) -> Result<InMemoryStore, CoreError> {
        let bytes = std::fs::read(path)?;
        Self::load_store(&bytes)
    }
}
