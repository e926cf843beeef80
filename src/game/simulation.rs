//! Per-tick simulation: motion integration, respawn timers, gameplay inputs

use crate::actor::{Dispatcher, InboundMessage};
use crate::protocol::diff::MicroDiff;
use crate::protocol::{encode, MatchSnapshot, OpCode, PingEnvelope, PongPayload};
use crate::util::time::unix_millis;

use super::r#match::{MatchState, PlayingState};

/// Answer ping messages; runs every tick regardless of phase.
/// The reply goes to the sender only.
pub(super) fn process_ping_messages(
    state: &mut MatchState,
    messages: &[InboundMessage],
    dispatcher: &dyn Dispatcher,
) {
    for message in messages {
        if OpCode::from_u16(message.op_code) != Some(OpCode::MatchPing) {
            continue;
        }
        let Ok(envelope) = serde_json::from_slice::<PingEnvelope>(&message.data) else {
            continue;
        };
        if let Some(player) = state.players.get_mut(&message.sender.user_id) {
            player.last_ping = envelope.previous_ping;
        }
        let pong = PongPayload {
            server_receive_time: unix_millis(),
            ping_id: envelope.ping_id,
        };
        dispatcher.broadcast(
            OpCode::MatchPong,
            encode(&pong),
            Some(std::slice::from_ref(&message.sender)),
            None,
        );
    }
}

/// Semi-implicit Euler over every `Playing` player.
/// Horizontal positions wrap at the total course width.
pub(super) fn integrate_players(state: &mut MatchState, diffs: &mut Vec<MicroDiff>) {
    let dt = state.tick_delta();
    let gravity = state.gravity_y;
    let width = state.world_width();

    for (user_id, player) in state.players.iter_mut() {
        if player.playing_state != PlayingState::Playing {
            continue;
        }
        player.velocity_y += gravity * dt;
        player.y += player.velocity_y * dt;
        player.x += player.velocity_x * dt;
        if width > 0.0 {
            player.x = player.x.rem_euclid(width);
        }
        diffs.push(MicroDiff::PlayerMoved {
            user_id: *user_id,
            x: player.x,
            y: player.y,
            velocity_x: player.velocity_x,
            velocity_y: player.velocity_y,
        });
    }
}

/// Count down towards respawn for every `Died` player
pub(super) fn advance_respawn_timers(state: &mut MatchState, diffs: &mut Vec<MicroDiff>) {
    let dt_ms = state.tick_delta() * 1000.0;

    for (user_id, player) in state.players.iter_mut() {
        if player.playing_state != PlayingState::Died {
            continue;
        }
        player.spawn_countdown_ms -= dt_ms;
        if player.spawn_countdown_ms <= 0.0 {
            player.spawn_countdown_ms = 0.0;
            player.playing_state = PlayingState::Idle;
            player.velocity_x = 0.0;
            player.velocity_y = 0.0;
            diffs.push(MicroDiff::PlayerSpawned {
                user_id: *user_id,
                x: player.x,
                y: player.y,
            });
        } else {
            diffs.push(MicroDiff::PlayerSpawnCountdownTick {
                user_id: *user_id,
                remaining_ms: player.spawn_countdown_ms,
            });
        }
    }
}

/// Apply one inbound gameplay message.
/// Messages from users without player state and unrecognized op codes are
/// ignored without mutating state or emitting a diff.
pub(super) fn apply_gameplay_message(
    state: &mut MatchState,
    message: &InboundMessage,
    dispatcher: &dyn Dispatcher,
    diffs: &mut Vec<MicroDiff>,
) {
    let user_id = message.sender.user_id;

    match OpCode::from_u16(message.op_code) {
        Some(OpCode::PlayerStarted) => {
            let initial_x_speed = state.initial_x_speed;
            let Some(player) = state.players.get_mut(&user_id) else {
                return;
            };
            player.playing_state = PlayingState::Playing;
            player.velocity_x = initial_x_speed;
            diffs.push(MicroDiff::PlayerStarted {
                user_id,
                velocity_x: initial_x_speed,
                playing_state: PlayingState::Playing,
            });
        }
        Some(OpCode::PlayerJumped) => {
            let Some(player) = state.players.get_mut(&user_id) else {
                return;
            };
            player.velocity_y = player.jump_impulse;
            diffs.push(MicroDiff::PlayerJumped {
                user_id,
                velocity_y: player.velocity_y,
            });
        }
        Some(OpCode::PlayerScored) => {
            let Some(player) = state.players.get_mut(&user_id) else {
                return;
            };
            player.score += 1;
            diffs.push(MicroDiff::PlayerScored {
                user_id,
                score: player.score,
            });
        }
        Some(OpCode::PlayerDied) => {
            if !state.players.contains_key(&user_id) {
                return;
            }
            let (new_x, new_y) = state.random_gap_position();
            let respawn_delay = state.respawn_delay_ms;
            let Some(player) = state.players.get_mut(&user_id) else {
                return;
            };
            let old_x = player.x;
            let old_y = player.y;
            player.died_count += 1;
            player.playing_state = PlayingState::Died;
            player.spawn_countdown_ms = respawn_delay;
            player.x = new_x;
            player.y = new_y;
            diffs.push(MicroDiff::PlayerDied {
                user_id,
                old_x,
                old_y,
                new_x,
                new_y,
                spawn_countdown_ms: respawn_delay,
                died_count: player.died_count,
            });
        }
        Some(OpCode::PlayerFullStateNeeded) => {
            dispatcher.broadcast(
                OpCode::PlayerFullStateNeeded,
                encode(&MatchSnapshot::of(state)),
                Some(std::slice::from_ref(&message.sender)),
                None,
            );
        }
        // Pings are handled before phase dispatch; everything else is noise.
        _ => {}
    }
}
