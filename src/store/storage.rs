//! Key-value storage collaborator interface

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;
use uuid::Uuid;

/// Owner of system-owned storage rows (registry, result archive)
pub const SYSTEM_OWNER_ID: Uuid = Uuid::nil();

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("failed to decode stored value: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Host-provided persistent key-value storage.
/// Rows are JSON values addressed by (collection, key, owner). The backend
/// must tolerate concurrent access from many match actors; callers performing
/// read-modify-write cycles get no atomicity guarantee.
pub trait StorageClient: Send + Sync {
    fn read(&self, collection: &str, key: &str, owner: Uuid) -> Result<Option<Value>, StorageError>;

    fn write(
        &self,
        collection: &str,
        key: &str,
        owner: Uuid,
        value: Value,
    ) -> Result<(), StorageError>;
}

/// In-memory storage backend for the dev host and tests
#[derive(Default)]
pub struct InMemoryStorage {
    rows: RwLock<HashMap<(String, String, Uuid), Value>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageClient for InMemoryStorage {
    fn read(&self, collection: &str, key: &str, owner: Uuid) -> Result<Option<Value>, StorageError> {
        let rows = self.rows.read();
        Ok(rows
            .get(&(collection.to_string(), key.to_string(), owner))
            .cloned())
    }

    fn write(
        &self,
        collection: &str,
        key: &str,
        owner: Uuid,
        value: Value,
    ) -> Result<(), StorageError> {
        self.rows
            .write()
            .insert((collection.to_string(), key.to_string(), owner), value);
        Ok(())
    }
}
