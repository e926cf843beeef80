//! Thin query surface over the stores, consumed by the hosting RPC layer

use serde::Serialize;
use uuid::Uuid;

use crate::actor::{AccountDirectory, MatchDirectory};
use crate::game::MatchConfig;
use crate::store::{MatchResultStore, ResultStoreError, StorageError, WaitingMatchRegistry};

/// First waiting match the scheduler confirms live.
/// Stale registry entries discovered along the way are removed (self-healing).
pub fn get_waiting_match(
    registry: &WaitingMatchRegistry,
    directory: &dyn MatchDirectory,
) -> Result<Option<Uuid>, StorageError> {
    let mut first_live = None;
    for match_id in registry.list()? {
        if directory.is_live(match_id) {
            if first_live.is_none() {
                first_live = Some(match_id);
            }
        } else {
            registry.remove(match_id)?;
        }
    }
    Ok(first_live)
}

/// One score row with the player identity resolved
#[derive(Debug, Clone, Serialize)]
pub struct ScoreView {
    pub user_id: Uuid,
    pub display_name: String,
    pub score: u32,
}

/// Match result enriched with player identities
#[derive(Debug, Clone, Serialize)]
pub struct MatchResultView {
    pub initialized_at: u64,
    pub started_at: u64,
    pub finished_at: u64,
    pub scores: Vec<ScoreView>,
}

/// Fetch a match result and resolve display names.
/// An unknown match id surfaces as `ResultStoreError::NotFound`.
pub fn get_match_result(
    results: &MatchResultStore,
    accounts: &dyn AccountDirectory,
    match_id: Uuid,
) -> Result<MatchResultView, ResultStoreError> {
    let result = results.fetch(match_id)?;
    let scores = result
        .scores
        .iter()
        .map(|row| ScoreView {
            user_id: row.player_id,
            display_name: accounts.display_name(row.player_id).unwrap_or_default(),
            score: row.score,
        })
        .collect();
    Ok(MatchResultView {
        initialized_at: result.initialized_at,
        started_at: result.started_at,
        finished_at: result.finished_at,
        scores,
    })
}

/// Static tuning exposed to clients
#[derive(Debug, Clone, Serialize)]
pub struct ServerConfigView {
    pub tick_rate: u32,
    pub minimum_players: usize,
    pub base_waiting_ms: u64,
}

pub fn get_server_config(config: &MatchConfig) -> ServerConfigView {
    ServerConfigView {
        tick_rate: config.tick_rate,
        minimum_players: config.minimum_players,
        base_waiting_ms: config.base_waiting_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::game::testutil::{StubAccounts, StubDirectory};
    use crate::store::{InMemoryStorage, MatchResult, PlayerScore, StorageClient};

    fn stores() -> (WaitingMatchRegistry, MatchResultStore) {
        let storage: Arc<dyn StorageClient> = Arc::new(InMemoryStorage::new());
        (
            WaitingMatchRegistry::new(storage.clone()),
            MatchResultStore::new(storage),
        )
    }

    #[test]
    fn discovery_skips_and_heals_stale_entries() {
        let (registry, _) = stores();
        let stale = Uuid::new_v4();
        let live = Uuid::new_v4();
        registry.add(stale).unwrap();
        registry.add(live).unwrap();

        let directory = StubDirectory::default();
        directory.live.lock().push(live);

        let found = get_waiting_match(&registry, &directory).unwrap();
        assert_eq!(found, Some(live));
        assert_eq!(registry.list().unwrap(), vec![live]);
    }

    #[test]
    fn discovery_with_empty_registry_finds_nothing() {
        let (registry, _) = stores();
        let directory = StubDirectory::default();
        assert_eq!(get_waiting_match(&registry, &directory).unwrap(), None);
    }

    #[test]
    fn result_view_resolves_identities_in_order() {
        let (_, results) = stores();
        let match_id = Uuid::new_v4();
        let winner = Uuid::new_v4();
        let runner_up = Uuid::new_v4();
        results
            .persist(
                match_id,
                &MatchResult {
                    initialized_at: 1,
                    started_at: 2,
                    finished_at: 3,
                    scores: vec![
                        PlayerScore {
                            player_id: winner,
                            score: 10,
                        },
                        PlayerScore {
                            player_id: runner_up,
                            score: 5,
                        },
                    ],
                },
            )
            .unwrap();

        let view = get_match_result(&results, &StubAccounts, match_id).unwrap();
        assert_eq!(view.scores.len(), 2);
        assert_eq!(view.scores[0].user_id, winner);
        assert_eq!(view.scores[0].score, 10);
        assert!(!view.scores[0].display_name.is_empty());
    }

    #[test]
    fn unknown_result_id_propagates_not_found() {
        let (_, results) = stores();
        let err = get_match_result(&results, &StubAccounts, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, ResultStoreError::NotFound));
    }

    #[test]
    fn server_config_reflects_tuning() {
        let view = get_server_config(&MatchConfig::default());
        assert_eq!(view.tick_rate, 40);
        assert_eq!(view.minimum_players, 2);
        assert_eq!(view.base_waiting_ms, 30_000);
    }
}
