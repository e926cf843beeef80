//! Per-tick incremental state updates

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::PlayingState;

/// One observable state change, the smallest unit clients apply.
/// Consumers match exhaustively; adding a variant is a protocol change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MicroDiff {
    /// Respawn countdown elapsed; the player is back at its stored position
    PlayerSpawned {
        user_id: Uuid,
        x: f32,
        y: f32,
    },

    /// Player left idle and entered the course
    PlayerStarted {
        user_id: Uuid,
        velocity_x: f32,
        playing_state: PlayingState,
    },

    /// Jump input applied
    PlayerJumped {
        user_id: Uuid,
        velocity_y: f32,
    },

    /// Integration result for one playing player
    PlayerMoved {
        user_id: Uuid,
        x: f32,
        y: f32,
        velocity_x: f32,
        velocity_y: f32,
    },

    /// Death: carries both where the player died and where it will respawn
    PlayerDied {
        user_id: Uuid,
        old_x: f32,
        old_y: f32,
        new_x: f32,
        new_y: f32,
        spawn_countdown_ms: f32,
        died_count: u32,
    },

    /// Score increment
    PlayerScored {
        user_id: Uuid,
        score: u32,
    },

    /// Respawn countdown still running
    PlayerSpawnCountdownTick {
        user_id: Uuid,
        remaining_ms: f32,
    },
}

/// The wire envelope broadcast once per running tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchDiffBatch {
    pub tick_number: u64,
    /// Stamped after all diffs for the tick are collected
    pub tick_timestamp: u64,
    pub diffs: Vec<MicroDiff>,
}
