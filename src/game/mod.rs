//! Game simulation modules

pub mod lobby;
pub mod r#match;
pub mod simulation;

#[cfg(test)]
pub mod testutil;

pub use r#match::{DashMatchHandler, MatchPhase, MatchState, PlayerState, PlayingState};

/// Tuning for a single match; defaults mirror production values
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Ready players required before the match may start
    pub minimum_players: usize,
    /// Initial waiting period before the scheduled start
    pub base_waiting_ms: u64,
    /// Window before `runs_at` in which an understaffed lobby extends the wait
    pub extend_check_window_ms: u64,
    /// Grace period a finished match lingers before teardown
    pub remove_finished_after_ms: u64,
    /// Grace period an empty running match survives before teardown
    pub terminate_empty_after_ms: u64,
    /// Respawn countdown after a death
    pub respawn_delay_ms: f32,

    // World tuning, installed into match state at start
    pub gravity_y: f32,
    pub initial_x_speed: f32,
    pub obstacle_spacing: f32,
    pub hole_gap: f32,
    pub vertical_range: f32,
    pub obstacle_width: f32,
    pub jump_impulse: f32,
    pub min_obstacles: usize,
    pub max_obstacles: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            tick_rate: 40,
            minimum_players: 2,
            base_waiting_ms: 30_000,
            extend_check_window_ms: 10_000,
            remove_finished_after_ms: 10_000,
            terminate_empty_after_ms: 10_000,
            respawn_delay_ms: 5_000.0,
            gravity_y: 1400.0,
            initial_x_speed: 160.0,
            obstacle_spacing: 420.0,
            hole_gap: 240.0,
            vertical_range: 300.0,
            obstacle_width: 82.0,
            jump_impulse: -500.0,
            min_obstacles: 3,
            max_obstacles: 42,
        }
    }
}

impl MatchConfig {
    /// Match length tiered by ready-lobby size; small lobbies get shorter matches
    pub fn duration_for_lobby(&self, ready_players: usize) -> u64 {
        if ready_players <= 3 {
            120_000
        } else if ready_players <= 5 {
            150_000
        } else {
            180_000
        }
    }
}
