//! Best-effort notification relay
//!
//! Notifications are fire-and-forget free text; a failure here must never
//! reach match state.

pub mod telegram;

pub use telegram::TelegramNotifier;

use uuid::Uuid;

use crate::game::{MatchState, PlayerState};
use crate::util::time::format_millis;

/// Outbound free-text notifications
pub trait Notifier: Send + Sync {
    fn notify(&self, text: &str);
}

/// Relay that drops everything; used when no relay is configured
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _text: &str) {}
}

/// Final standings summary sent once per finished match
pub fn format_match_result_message(match_id: Uuid, state: &MatchState) -> String {
    let duration_ms = state.finishes_at.saturating_sub(state.runs_at);
    let minutes = duration_ms / 60_000;
    let seconds = (duration_ms % 60_000) / 1_000;

    let mut players: Vec<&PlayerState> = state.players.values().collect();
    players.sort_by(|a, b| b.score.cmp(&a.score));
    let rankings = players
        .iter()
        .enumerate()
        .map(|(rank, player)| format!("{} - {} ({})", rank + 1, player.display_name, player.score))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "🏆 Match Results\n\nMatch ID: {match_id}\nMatch Finish Time: {}\nMatch Duration: {minutes} minutes and {seconds} seconds\nPlayers Count: {}\n\nPlayer Rankings:\n{rankings}",
        format_millis(state.finishes_at),
        state.players.len(),
    )
}

/// Announcement sent when a player readies up in the lobby
pub fn format_player_joined_message(
    base_url: &str,
    match_id: Uuid,
    state: &MatchState,
    user_id: Uuid,
) -> String {
    let display_name = state
        .players
        .get(&user_id)
        .map(|p| p.display_name.as_str())
        .unwrap_or("");
    let in_lobby = state
        .players
        .values()
        .filter(|p| p.in_lobby)
        .map(|p| p.display_name.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "👤 {display_name} joined the match!\nPlayers in the lobby:\n{in_lobby}\n\nClick to join:\n{base_url}/#/lobby/{match_id}"
    )
}
