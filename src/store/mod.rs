//! Storage collaborators: waiting-match registry and result archive

pub mod registry;
pub mod results;
pub mod storage;

pub use registry::WaitingMatchRegistry;
pub use results::{MatchResult, MatchResultStore, PlayerScore, ResultStoreError};
pub use storage::{InMemoryStorage, StorageClient, StorageError, SYSTEM_OWNER_ID};
