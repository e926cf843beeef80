//! Waiting-match registry client

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::storage::{StorageClient, StorageError, SYSTEM_OWNER_ID};

const MATCHES_COLLECTION: &str = "matches";
const WAITING_MATCHES_KEY: &str = "waiting_matches";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WaitingMatches {
    ids: Vec<Uuid>,
}

/// Client for the shared list of joinable matches.
///
/// Every mutation is a read-modify-write cycle against shared storage and is
/// NOT atomic across match actors: two actors updating concurrently can lose
/// one of the updates. The discovery path self-heals stale entries, which
/// bounds the damage to a transiently wrong list.
#[derive(Clone)]
pub struct WaitingMatchRegistry {
    storage: Arc<dyn StorageClient>,
}

impl WaitingMatchRegistry {
    pub fn new(storage: Arc<dyn StorageClient>) -> Self {
        Self { storage }
    }

    fn load(&self) -> Result<WaitingMatches, StorageError> {
        match self
            .storage
            .read(MATCHES_COLLECTION, WAITING_MATCHES_KEY, SYSTEM_OWNER_ID)?
        {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(WaitingMatches::default()),
        }
    }

    fn save(&self, matches: &WaitingMatches) -> Result<(), StorageError> {
        self.storage.write(
            MATCHES_COLLECTION,
            WAITING_MATCHES_KEY,
            SYSTEM_OWNER_ID,
            serde_json::to_value(matches)?,
        )
    }

    /// Add a match id; a duplicate add is a no-op
    pub fn add(&self, match_id: Uuid) -> Result<(), StorageError> {
        let mut matches = self.load()?;
        if !matches.ids.contains(&match_id) {
            matches.ids.push(match_id);
        }
        self.save(&matches)
    }

    /// Remove a match id; removing an absent id is a no-op
    pub fn remove(&self, match_id: Uuid) -> Result<(), StorageError> {
        let mut matches = self.load()?;
        matches.ids.retain(|id| *id != match_id);
        self.save(&matches)
    }

    /// All currently waiting match ids, oldest first
    pub fn list(&self) -> Result<Vec<Uuid>, StorageError> {
        Ok(self.load()?.ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStorage;

    fn registry() -> WaitingMatchRegistry {
        WaitingMatchRegistry::new(Arc::new(InMemoryStorage::new()))
    }

    #[test]
    fn add_is_idempotent() {
        let registry = registry();
        let id = Uuid::new_v4();

        registry.add(id).unwrap();
        registry.add(id).unwrap();

        assert_eq!(registry.list().unwrap(), vec![id]);
    }

    #[test]
    fn remove_of_absent_id_leaves_list_unchanged() {
        let registry = registry();
        let id = Uuid::new_v4();
        registry.add(id).unwrap();

        registry.remove(Uuid::new_v4()).unwrap();

        assert_eq!(registry.list().unwrap(), vec![id]);
    }

    #[test]
    fn list_preserves_insertion_order() {
        let registry = registry();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let third = Uuid::new_v4();

        registry.add(first).unwrap();
        registry.add(second).unwrap();
        registry.add(third).unwrap();
        registry.remove(second).unwrap();

        assert_eq!(registry.list().unwrap(), vec![first, third]);
    }

    #[test]
    fn empty_registry_lists_nothing() {
        assert!(registry().list().unwrap().is_empty());
    }
}
