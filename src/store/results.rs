//! Match result archive client

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::storage::{StorageClient, StorageError, SYSTEM_OWNER_ID};

const RESULTS_COLLECTION: &str = "match_results";

/// One row of the final score sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerScore {
    pub player_id: Uuid,
    pub score: u32,
}

/// Final score sheet persisted when a match finishes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub initialized_at: u64,
    pub started_at: u64,
    pub finished_at: u64,
    /// Descending by score; equal scores keep map-enumeration order
    pub scores: Vec<PlayerScore>,
}

/// Result archive errors
#[derive(Debug, thiserror::Error)]
pub enum ResultStoreError {
    #[error("match result not found")]
    NotFound,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Client for the finished-match archive
#[derive(Clone)]
pub struct MatchResultStore {
    storage: Arc<dyn StorageClient>,
}

impl MatchResultStore {
    pub fn new(storage: Arc<dyn StorageClient>) -> Self {
        Self { storage }
    }

    /// Persist a match's final score sheet; called once per match
    pub fn persist(&self, match_id: Uuid, result: &MatchResult) -> Result<(), StorageError> {
        self.storage.write(
            RESULTS_COLLECTION,
            &match_id.to_string(),
            SYSTEM_OWNER_ID,
            serde_json::to_value(result)?,
        )
    }

    /// Fetch a match's result; unknown ids are an explicit `NotFound`
    pub fn fetch(&self, match_id: Uuid) -> Result<MatchResult, ResultStoreError> {
        match self
            .storage
            .read(RESULTS_COLLECTION, &match_id.to_string(), SYSTEM_OWNER_ID)
            .map_err(ResultStoreError::Storage)?
        {
            Some(value) => Ok(serde_json::from_value(value).map_err(StorageError::from)?),
            None => Err(ResultStoreError::NotFound),
        }
    }
}
