//! Full-state snapshots for (re)synchronization
//!
//! A snapshot is self-sufficient: a client that missed every diff can
//! reconstruct exact match state from the latest snapshot plus whatever
//! diffs follow it. Sent on welcome, on kick, on match start, and on an
//! explicit resync request.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::{MatchPhase, MatchState, PlayerState};

/// Complete serialization of one match's authoritative state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub phase: MatchPhase,
    pub tick_rate: u32,
    pub tick_number: u64,
    pub initialized_at: u64,
    pub runs_at: u64,
    pub finishes_at: u64,
    pub obstacle_spacing: f32,
    pub hole_gap: f32,
    pub vertical_range: f32,
    pub obstacle_width: f32,
    pub gravity_y: f32,
    pub initial_x_speed: f32,
    pub respawn_delay_ms: f32,
    pub obstacle_offsets: Vec<f32>,
    pub players: HashMap<Uuid, PlayerState>,
    pub present_user_ids: Vec<Uuid>,
}

impl MatchSnapshot {
    /// Build a snapshot from the authoritative state
    pub fn of(state: &MatchState) -> Self {
        Self {
            phase: state.phase,
            tick_rate: state.tick_rate,
            tick_number: state.tick_number,
            initialized_at: state.initialized_at,
            runs_at: state.runs_at,
            finishes_at: state.finishes_at,
            obstacle_spacing: state.obstacle_spacing,
            hole_gap: state.hole_gap,
            vertical_range: state.vertical_range,
            obstacle_width: state.obstacle_width,
            gravity_y: state.gravity_y,
            initial_x_speed: state.initial_x_speed,
            respawn_delay_ms: state.respawn_delay_ms,
            obstacle_offsets: state.obstacle_offsets.clone(),
            players: state.players.clone(),
            present_user_ids: state.presences.iter().map(|p| p.user_id).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::MatchConfig;

    #[test]
    fn snapshot_captures_state_and_round_trips() {
        let config = MatchConfig::default();
        let mut state = MatchState::new(&config, 1_000, 7);
        state.players.insert(
            Uuid::nil(),
            PlayerState::new(Uuid::nil(), "tester".to_string()),
        );
        state.obstacle_offsets = vec![0.5, -0.25, 0.0];

        let snapshot = MatchSnapshot::of(&state);
        assert_eq!(snapshot.phase, MatchPhase::Waiting);
        assert_eq!(snapshot.tick_rate, config.tick_rate);
        assert_eq!(snapshot.obstacle_offsets.len(), 3);
        assert_eq!(snapshot.players.len(), 1);

        let json = serde_json::to_string(&snapshot).unwrap();
        let decoded: MatchSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.players[&Uuid::nil()].display_name, "tester");
        assert_eq!(decoded.obstacle_offsets, snapshot.obstacle_offsets);
    }
}
