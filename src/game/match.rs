//! Match state and the lifecycle state machine

use std::collections::HashMap;
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::actor::{
    AccountDirectory, Dispatcher, InboundMessage, JoinDecision, MatchActor, MatchContext,
    MatchDirectory, MatchSetup, Presence, TickOutcome,
};
use crate::notify::{format_match_result_message, Notifier};
use crate::protocol::diff::{MatchDiffBatch, MicroDiff};
use crate::protocol::{encode, MatchSnapshot, OpCode, WaitingTimeIncreased};
use crate::store::registry::WaitingMatchRegistry;
use crate::store::results::{MatchResult, MatchResultStore, PlayerScore};
use crate::util::time::unix_millis;

use super::{simulation, MatchConfig};

/// Label reported to the scheduler for discovery
pub const MATCH_LABEL: &str = "Flappy Dash Match";

/// Match phase; strictly ordered, never regresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    /// Accepting joins, waiting for enough ready players
    Waiting,
    /// Simulation running
    Running,
    /// Result persisted, lingering until teardown
    Finished,
}

/// What a player is currently doing inside the match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayingState {
    Idle,
    Playing,
    Died,
}

/// Per-player authoritative state; survives disconnects within a match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerState {
    pub user_id: Uuid,
    pub display_name: String,
    pub in_lobby: bool,
    pub x: f32,
    pub y: f32,
    pub velocity_x: f32,
    pub velocity_y: f32,
    pub score: u32,
    pub died_count: u32,
    pub playing_state: PlayingState,
    /// Milliseconds until respawn; positive only while `Died`
    pub spawn_countdown_ms: f32,
    /// Round-trip time the client last reported
    pub last_ping: u32,
    pub jump_impulse: f32,
}

impl PlayerState {
    pub fn new(user_id: Uuid, display_name: String) -> Self {
        Self {
            user_id,
            display_name,
            in_lobby: false,
            x: 0.0,
            y: 0.0,
            velocity_x: 0.0,
            velocity_y: 0.0,
            score: 0,
            died_count: 0,
            playing_state: PlayingState::Idle,
            spawn_countdown_ms: 0.0,
            last_ping: 0,
            jump_impulse: 0.0,
        }
    }
}

/// Match state (exclusively owned by the match actor)
pub struct MatchState {
    pub tick_rate: u32,
    pub tick_number: u64,
    pub phase: MatchPhase,
    pub initialized_at: u64,
    /// Earliest scheduled start; extendable while `Waiting`
    pub runs_at: u64,
    /// Computed once, at the Waiting -> Running transition
    pub finishes_at: u64,

    // World geometry; zero until the match starts
    pub obstacle_spacing: f32,
    pub hole_gap: f32,
    pub vertical_range: f32,
    pub obstacle_width: f32,
    pub gravity_y: f32,
    pub initial_x_speed: f32,
    pub respawn_delay_ms: f32,
    /// Normalized vertical gap offsets in [-1, 1], one per obstacle
    pub obstacle_offsets: Vec<f32>,

    pub players: HashMap<Uuid, PlayerState>,
    pub presences: Vec<Presence>,
    /// Set only while `Running` with nobody connected
    pub empty_since: Option<u64>,
    /// Guards the one-shot standings notification
    pub result_notification_sent: bool,

    pub rng: ChaCha8Rng,
}

impl MatchState {
    pub fn new(config: &MatchConfig, now: u64, seed: u64) -> Self {
        Self {
            tick_rate: config.tick_rate,
            tick_number: 0,
            phase: MatchPhase::Waiting,
            initialized_at: now,
            runs_at: now + config.base_waiting_ms,
            finishes_at: 0,
            obstacle_spacing: 0.0,
            hole_gap: 0.0,
            vertical_range: 0.0,
            obstacle_width: 0.0,
            gravity_y: 0.0,
            initial_x_speed: 0.0,
            respawn_delay_ms: config.respawn_delay_ms,
            obstacle_offsets: Vec::new(),
            players: HashMap::new(),
            presences: Vec::new(),
            empty_since: None,
            result_notification_sent: false,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Fixed timestep in seconds
    pub fn tick_delta(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }

    /// Total course width; horizontal positions wrap at this bound
    pub fn world_width(&self) -> f32 {
        self.obstacle_spacing * self.obstacle_offsets.len() as f32
    }

    pub fn in_lobby_presences(&self) -> Vec<Presence> {
        self.presences
            .iter()
            .filter(|p| {
                self.players
                    .get(&p.user_id)
                    .map(|player| player.in_lobby)
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    pub fn out_of_lobby_presences(&self) -> Vec<Presence> {
        self.presences
            .iter()
            .filter(|p| {
                !self
                    .players
                    .get(&p.user_id)
                    .map(|player| player.in_lobby)
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    /// Fresh position at a random obstacle gap
    pub fn random_gap_position(&mut self) -> (f32, f32) {
        let upper = self.obstacle_offsets.len().saturating_sub(1).max(1);
        let index = self.rng.gen_range(0..upper);
        let x = (index as f32 + 1.0) * self.obstacle_spacing;
        let y = self.obstacle_offsets.get(index).copied().unwrap_or(0.0) * self.vertical_range;
        (x, y)
    }
}

/// The authoritative Flappy Dash match handler
pub struct DashMatchHandler {
    pub(super) config: MatchConfig,
    pub(super) app_base_url: String,
    pub(super) registry: WaitingMatchRegistry,
    pub(super) results: MatchResultStore,
    pub(super) accounts: Arc<dyn AccountDirectory>,
    pub(super) directory: Arc<dyn MatchDirectory>,
    pub(super) notifier: Arc<dyn Notifier>,
}

impl DashMatchHandler {
    pub fn new(
        config: MatchConfig,
        app_base_url: String,
        registry: WaitingMatchRegistry,
        results: MatchResultStore,
        accounts: Arc<dyn AccountDirectory>,
        directory: Arc<dyn MatchDirectory>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            app_base_url,
            registry,
            results,
            accounts,
            directory,
            notifier,
        }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    fn waiting_tick(
        &self,
        ctx: &MatchContext,
        dispatcher: &dyn Dispatcher,
        state: &mut MatchState,
        messages: &[InboundMessage],
    ) {
        self.process_lobby_messages(ctx, dispatcher, state, messages);

        let now = unix_millis();
        let ready = state.in_lobby_presences();

        if now > state.runs_at && ready.len() >= self.config.minimum_players {
            self.start_match(ctx, dispatcher, state, &ready, now);
            return;
        }

        // Understaffed close to the deadline: push the start out and tell everyone.
        // This can repeat indefinitely.
        if ready.len() < self.config.minimum_players
            && now > state.runs_at.saturating_sub(self.config.extend_check_window_ms)
        {
            state.runs_at += self.config.extend_check_window_ms * 3 / 2;
            dispatcher.broadcast(
                OpCode::MatchWaitingTimeIncreased,
                encode(&WaitingTimeIncreased {
                    new_runs_at: state.runs_at,
                }),
                None,
                None,
            );
            debug!(match_id = %ctx.match_id, runs_at = state.runs_at, "waiting time extended");
        }
    }

    fn start_match(
        &self,
        ctx: &MatchContext,
        dispatcher: &dyn Dispatcher,
        state: &mut MatchState,
        ready: &[Presence],
        now: u64,
    ) {
        if let Err(err) = self.registry.remove(ctx.match_id) {
            error!(match_id = %ctx.match_id, error = %err, "failed to deregister waiting match");
        }

        state.phase = MatchPhase::Running;
        state.finishes_at = now + self.config.duration_for_lobby(ready.len());

        // Everyone connected but never readied up gets kicked; they alone
        // receive this message.
        let kicked = state.out_of_lobby_presences();
        if !kicked.is_empty() {
            dispatcher.broadcast(
                OpCode::PlayerKickedFromLobby,
                encode(&MatchSnapshot::of(state)),
                Some(&kicked),
                None,
            );
        }

        state.gravity_y = self.config.gravity_y;
        state.initial_x_speed = self.config.initial_x_speed;
        state.obstacle_spacing = self.config.obstacle_spacing;
        state.hole_gap = self.config.hole_gap;
        state.vertical_range = self.config.vertical_range;
        state.obstacle_width = self.config.obstacle_width;

        // Course length scales with the lobby, clamped to [3, 42].
        // Regenerated exactly once, here.
        let count = ready
            .len()
            .clamp(self.config.min_obstacles, self.config.max_obstacles);
        let mut offsets = Vec::with_capacity(count);
        for _ in 0..count {
            offsets.push(state.rng.gen_range(-1.0f32..1.0));
        }
        state.obstacle_offsets = offsets;

        for presence in ready {
            let (x, y) = state.random_gap_position();
            if let Some(player) = state.players.get_mut(&presence.user_id) {
                player.x = x;
                player.y = y;
                player.velocity_x = 0.0;
                player.velocity_y = 0.0;
                player.score = 0;
                player.died_count = 0;
                player.playing_state = PlayingState::Idle;
                player.spawn_countdown_ms = 0.0;
                player.jump_impulse = self.config.jump_impulse;
            }
        }

        dispatcher.broadcast(
            OpCode::MatchStarted,
            encode(&MatchSnapshot::of(state)),
            Some(ready),
            None,
        );

        // A joinable match must always exist; ask the host for a successor.
        match self.directory.create_match() {
            Some(id) => {
                info!(match_id = %ctx.match_id, successor = %id, "successor match created")
            }
            None => warn!(match_id = %ctx.match_id, "host did not create a successor match"),
        }

        info!(
            match_id = %ctx.match_id,
            players = ready.len(),
            finishes_at = state.finishes_at,
            "match started"
        );
    }

    fn running_tick(
        &self,
        ctx: &MatchContext,
        dispatcher: &dyn Dispatcher,
        state: &mut MatchState,
        messages: &[InboundMessage],
    ) -> TickOutcome {
        let now = unix_millis();

        if state.presences.is_empty() {
            if state.empty_since.is_none() {
                state.empty_since = Some(now);
            }
        } else {
            state.empty_since = None;
        }
        if let Some(since) = state.empty_since {
            if now > since + self.config.terminate_empty_after_ms {
                debug!(match_id = %ctx.match_id, empty_since = since, "match empty past grace period, terminating");
                return TickOutcome::Terminal;
            }
        }

        if now > state.finishes_at {
            self.finish_match(ctx, dispatcher, state);
            return TickOutcome::Continue;
        }

        state.tick_number += 1;

        let mut diffs: Vec<MicroDiff> = Vec::new();
        simulation::integrate_players(state, &mut diffs);
        simulation::advance_respawn_timers(state, &mut diffs);
        for message in messages {
            simulation::apply_gameplay_message(state, message, dispatcher, &mut diffs);
        }

        let batch = MatchDiffBatch {
            tick_number: state.tick_number,
            tick_timestamp: unix_millis(),
            diffs,
        };
        dispatcher.broadcast(OpCode::PlayerTickUpdate, encode(&batch), None, None);

        TickOutcome::Continue
    }

    fn finish_match(&self, ctx: &MatchContext, dispatcher: &dyn Dispatcher, state: &mut MatchState) {
        state.phase = MatchPhase::Finished;

        let mut scores: Vec<PlayerScore> = state
            .players
            .iter()
            .map(|(user_id, player)| PlayerScore {
                player_id: *user_id,
                score: player.score,
            })
            .collect();
        // Descending by score; ties keep whatever order the map yielded.
        scores.sort_by(|a, b| b.score.cmp(&a.score));

        let result = MatchResult {
            initialized_at: state.initialized_at,
            started_at: state.runs_at,
            finished_at: state.finishes_at,
            scores,
        };
        if let Err(err) = self.results.persist(ctx.match_id, &result) {
            error!(match_id = %ctx.match_id, error = %err, "failed to persist match result");
        }

        dispatcher.broadcast(OpCode::MatchFinished, None, None, None);
        info!(match_id = %ctx.match_id, "match finished");
    }

    fn finished_tick(&self, ctx: &MatchContext, state: &mut MatchState) -> TickOutcome {
        if !state.result_notification_sent {
            state.result_notification_sent = true;
            self.notifier
                .notify(&format_match_result_message(ctx.match_id, state));
        }
        if unix_millis() > state.finishes_at + self.config.remove_finished_after_ms {
            return TickOutcome::Terminal;
        }
        TickOutcome::Continue
    }
}

impl MatchActor for DashMatchHandler {
    type State = MatchState;

    fn init(&self, ctx: &MatchContext) -> MatchSetup<MatchState> {
        let now = unix_millis();
        let state = MatchState::new(&self.config, now, rand::random());

        if let Err(err) = self.registry.add(ctx.match_id) {
            error!(match_id = %ctx.match_id, error = %err, "failed to register waiting match");
        }
        info!(match_id = %ctx.match_id, runs_at = state.runs_at, "match initialized");

        MatchSetup {
            state,
            tick_rate: self.config.tick_rate,
            label: MATCH_LABEL.to_string(),
        }
    }

    fn join_attempt(
        &self,
        _ctx: &MatchContext,
        _dispatcher: &dyn Dispatcher,
        state: &mut MatchState,
        presence: &Presence,
    ) -> JoinDecision {
        self.lobby_join_attempt(state, presence)
    }

    fn join(
        &self,
        ctx: &MatchContext,
        dispatcher: &dyn Dispatcher,
        state: &mut MatchState,
        presences: &[Presence],
    ) {
        self.lobby_join(ctx, dispatcher, state, presences)
    }

    fn leave(
        &self,
        ctx: &MatchContext,
        dispatcher: &dyn Dispatcher,
        state: &mut MatchState,
        presences: &[Presence],
    ) {
        self.lobby_leave(ctx, dispatcher, state, presences)
    }

    fn tick(
        &self,
        ctx: &MatchContext,
        dispatcher: &dyn Dispatcher,
        state: &mut MatchState,
        messages: &[InboundMessage],
    ) -> TickOutcome {
        // Pings are answered every tick, whatever the phase.
        simulation::process_ping_messages(state, messages, dispatcher);

        match state.phase {
            MatchPhase::Waiting => {
                self.waiting_tick(ctx, dispatcher, state, messages);
                TickOutcome::Continue
            }
            MatchPhase::Running => self.running_tick(ctx, dispatcher, state, messages),
            MatchPhase::Finished => self.finished_tick(ctx, state),
        }
    }

    fn terminate(
        &self,
        ctx: &MatchContext,
        _dispatcher: &dyn Dispatcher,
        state: &mut MatchState,
        grace_seconds: u64,
    ) {
        if let Err(err) = self.registry.remove(ctx.match_id) {
            error!(match_id = %ctx.match_id, error = %err, "failed to deregister waiting match");
        }
        info!(
            match_id = %ctx.match_id,
            phase = ?state.phase,
            grace_seconds,
            "match terminated by host"
        );
    }

    fn signal(&self, ctx: &MatchContext, state: &mut MatchState) {
        let waiting_remaining_ms = state.runs_at.saturating_sub(unix_millis());
        info!(
            match_id = %ctx.match_id,
            phase = ?state.phase,
            waiting_remaining_ms,
            "match signal"
        );
    }
}
