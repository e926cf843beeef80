//! Lobby admission and pre-start readiness

use std::collections::HashMap;

use tracing::info;
use uuid::Uuid;

use crate::actor::{Dispatcher, InboundMessage, JoinDecision, MatchContext, Presence};
use crate::notify::format_player_joined_message;
use crate::protocol::{encode, DisplayNameUpdated, MatchSnapshot, OpCode};

use super::r#match::{DashMatchHandler, MatchPhase, MatchState, PlayerState};

impl DashMatchHandler {
    pub(super) fn lobby_join_attempt(
        &self,
        state: &MatchState,
        presence: &Presence,
    ) -> JoinDecision {
        info!(user_id = %presence.user_id, "match join attempt");

        // A user with surviving player state is rejoining after a disconnect.
        if state.players.contains_key(&presence.user_id) {
            return JoinDecision::Accept;
        }

        if state.phase != MatchPhase::Waiting {
            info!(user_id = %presence.user_id, "join rejected, joining phase over");
            return JoinDecision::Reject {
                reason: "Match joining phase is already over.".to_string(),
            };
        }

        JoinDecision::Accept
    }

    pub(super) fn lobby_join(
        &self,
        ctx: &MatchContext,
        dispatcher: &dyn Dispatcher,
        state: &mut MatchState,
        presences: &[Presence],
    ) {
        let mut joined: HashMap<Uuid, PlayerState> = HashMap::new();
        for presence in presences {
            let player = state.players.entry(presence.user_id).or_insert_with(|| {
                let display_name = self
                    .accounts
                    .display_name(presence.user_id)
                    .unwrap_or_default();
                PlayerState::new(presence.user_id, display_name)
            });
            joined.insert(presence.user_id, player.clone());
        }
        state.presences.extend(presences.iter().cloned());

        dispatcher.broadcast(
            OpCode::MatchWelcome,
            encode(&MatchSnapshot::of(state)),
            Some(presences),
            None,
        );
        dispatcher.broadcast(OpCode::MatchPlayersJoined, encode(&joined), None, None);

        info!(
            match_id = %ctx.match_id,
            joined = presences.len(),
            total_players = state.players.len(),
            "presences joined"
        );
    }

    pub(super) fn lobby_leave(
        &self,
        ctx: &MatchContext,
        dispatcher: &dyn Dispatcher,
        state: &mut MatchState,
        presences: &[Presence],
    ) {
        // Player state is purged only before the match starts; afterwards it is
        // retained so scores and history survive the disconnect.
        if state.phase == MatchPhase::Waiting {
            for presence in presences {
                state.players.remove(&presence.user_id);
            }
        }

        state
            .presences
            .retain(|p| !presences.iter().any(|left| left.user_id == p.user_id));

        let left: Vec<Uuid> = presences.iter().map(|p| p.user_id).collect();
        dispatcher.broadcast(OpCode::MatchPlayersLeft, encode(&left), None, None);

        info!(match_id = %ctx.match_id, left = left.len(), "presences left");
    }

    pub(super) fn process_lobby_messages(
        &self,
        ctx: &MatchContext,
        dispatcher: &dyn Dispatcher,
        state: &mut MatchState,
        messages: &[InboundMessage],
    ) {
        for message in messages {
            match OpCode::from_u16(message.op_code) {
                Some(OpCode::PlayerJoinedTheLobby) => {
                    let Some(player) = state.players.get_mut(&message.sender.user_id) else {
                        continue;
                    };
                    player.in_lobby = true;
                    let summary = player.clone();
                    dispatcher.broadcast(
                        OpCode::PlayerJoinedTheLobby,
                        encode(&summary),
                        None,
                        Some(&message.sender),
                    );
                    self.notifier.notify(&format_player_joined_message(
                        &self.app_base_url,
                        ctx.match_id,
                        state,
                        message.sender.user_id,
                    ));
                }
                Some(OpCode::MatchPlayerNameUpdated) => {
                    let Some(player) = state.players.get_mut(&message.sender.user_id) else {
                        continue;
                    };
                    player.display_name = self
                        .accounts
                        .display_name(message.sender.user_id)
                        .unwrap_or_default();
                    dispatcher.broadcast(
                        OpCode::MatchPlayerNameUpdated,
                        encode(&DisplayNameUpdated {
                            new_display_name: player.display_name.clone(),
                        }),
                        None,
                        Some(&message.sender),
                    );
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::MatchActor;
    use crate::game::testutil::{fixture, message, presence, running_match};
    use crate::game::PlayingState;

    #[test]
    fn join_creates_player_and_welcomes_new_presences_only() {
        let fx = fixture();
        let mut state = fx.handler.init(&fx.ctx).state;
        let newcomer = presence(Uuid::new_v4());

        fx.dispatcher.take();
        fx.handler.join(
            &fx.ctx,
            &fx.dispatcher,
            &mut state,
            std::slice::from_ref(&newcomer),
        );

        let player = &state.players[&newcomer.user_id];
        assert!(!player.in_lobby);
        assert!(!player.display_name.is_empty());
        assert_eq!(player.playing_state, PlayingState::Idle);
        assert_eq!(state.presences.len(), 1);

        let sent = fx.dispatcher.take();
        let welcome = sent
            .iter()
            .find(|b| b.op == OpCode::MatchWelcome)
            .expect("welcome broadcast");
        assert_eq!(welcome.to.as_deref(), Some(&[newcomer.user_id][..]));
        let joined = sent
            .iter()
            .find(|b| b.op == OpCode::MatchPlayersJoined)
            .expect("players joined broadcast");
        assert!(joined.to.is_none());
        assert!(joined
            .data
            .as_ref()
            .unwrap()
            .contains(&newcomer.user_id.to_string()));
    }

    #[test]
    fn rejoin_is_accepted_in_any_phase() {
        let fx = fixture();
        let players = vec![presence(Uuid::new_v4()), presence(Uuid::new_v4())];
        let mut state = running_match(&fx, &players);

        let decision =
            fx.handler
                .join_attempt(&fx.ctx, &fx.dispatcher, &mut state, &players[0]);
        assert_eq!(decision, JoinDecision::Accept);
    }

    #[test]
    fn unknown_user_is_rejected_once_running() {
        let fx = fixture();
        let players = vec![presence(Uuid::new_v4()), presence(Uuid::new_v4())];
        let mut state = running_match(&fx, &players);

        let stranger = presence(Uuid::new_v4());
        let decision = fx
            .handler
            .join_attempt(&fx.ctx, &fx.dispatcher, &mut state, &stranger);
        assert_eq!(
            decision,
            JoinDecision::Reject {
                reason: "Match joining phase is already over.".to_string()
            }
        );
    }

    #[test]
    fn rejoin_keeps_accumulated_score() {
        let fx = fixture();
        let players = vec![presence(Uuid::new_v4()), presence(Uuid::new_v4())];
        let mut state = running_match(&fx, &players);

        let msgs = vec![
            message(&players[0], OpCode::PlayerScored, b""),
            message(&players[0], OpCode::PlayerScored, b""),
        ];
        fx.handler.tick(&fx.ctx, &fx.dispatcher, &mut state, &msgs);
        assert_eq!(state.players[&players[0].user_id].score, 2);

        fx.handler
            .leave(&fx.ctx, &fx.dispatcher, &mut state, &players[..1]);
        assert!(state.players.contains_key(&players[0].user_id));

        fx.handler
            .join(&fx.ctx, &fx.dispatcher, &mut state, &players[..1]);
        assert_eq!(state.players[&players[0].user_id].score, 2);
    }

    #[test]
    fn leave_while_waiting_purges_player_state() {
        let fx = fixture();
        let mut state = fx.handler.init(&fx.ctx).state;
        let players = vec![presence(Uuid::new_v4()), presence(Uuid::new_v4())];
        fx.handler
            .join(&fx.ctx, &fx.dispatcher, &mut state, &players);
        assert_eq!(state.players.len(), 2);

        fx.dispatcher.take();
        fx.handler
            .leave(&fx.ctx, &fx.dispatcher, &mut state, &players[..1]);

        assert_eq!(state.players.len(), 1);
        assert!(!state.players.contains_key(&players[0].user_id));
        assert_eq!(state.presences.len(), 1);

        let sent = fx.dispatcher.take();
        let left = sent
            .iter()
            .find(|b| b.op == OpCode::MatchPlayersLeft)
            .expect("players left broadcast");
        let ids: Vec<Uuid> = serde_json::from_str(left.data.as_ref().unwrap()).unwrap();
        assert_eq!(ids, vec![players[0].user_id]);
    }

    #[test]
    fn readiness_broadcasts_to_everyone_but_sender_and_notifies() {
        let fx = fixture();
        let mut state = fx.handler.init(&fx.ctx).state;
        let player = presence(Uuid::new_v4());
        fx.handler.join(
            &fx.ctx,
            &fx.dispatcher,
            &mut state,
            std::slice::from_ref(&player),
        );
        fx.dispatcher.take();

        let ready = message(&player, OpCode::PlayerJoinedTheLobby, b"");
        fx.handler
            .tick(&fx.ctx, &fx.dispatcher, &mut state, &[ready]);

        assert!(state.players[&player.user_id].in_lobby);
        let sent = fx.dispatcher.take();
        let announce = sent
            .iter()
            .find(|b| b.op == OpCode::PlayerJoinedTheLobby)
            .expect("readiness broadcast");
        assert!(announce.to.is_none());
        assert_eq!(announce.exclude, Some(player.user_id));

        let notifications = fx.notifier.messages.lock();
        assert_eq!(notifications.len(), 1);
        assert!(notifications[0].contains("joined the match"));
    }

    #[test]
    fn display_name_refresh_broadcasts_new_name() {
        let fx = fixture();
        let mut state = fx.handler.init(&fx.ctx).state;
        let player = presence(Uuid::new_v4());
        fx.handler.join(
            &fx.ctx,
            &fx.dispatcher,
            &mut state,
            std::slice::from_ref(&player),
        );
        fx.dispatcher.take();

        let refresh = message(&player, OpCode::MatchPlayerNameUpdated, b"");
        fx.handler
            .tick(&fx.ctx, &fx.dispatcher, &mut state, &[refresh]);

        let sent = fx.dispatcher.take();
        let update = sent
            .iter()
            .find(|b| b.op == OpCode::MatchPlayerNameUpdated)
            .expect("name update broadcast");
        let payload: DisplayNameUpdated =
            serde_json::from_str(update.data.as_ref().unwrap()).unwrap();
        assert_eq!(
            payload.new_display_name,
            state.players[&player.user_id].display_name
        );
        assert_eq!(update.exclude, Some(player.user_id));
    }

    #[test]
    fn readiness_from_unknown_sender_is_ignored() {
        let fx = fixture();
        let mut state = fx.handler.init(&fx.ctx).state;
        let stranger = presence(Uuid::new_v4());

        let ready = message(&stranger, OpCode::PlayerJoinedTheLobby, b"");
        fx.handler
            .tick(&fx.ctx, &fx.dispatcher, &mut state, &[ready]);

        assert!(state.players.is_empty());
        assert!(fx.notifier.messages.lock().is_empty());
    }
}
