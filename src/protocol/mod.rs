//! Wire protocol: op codes and payload definitions
//! These are the message types exchanged between the match core and clients

pub mod diff;
pub mod snapshot;

pub use diff::{MatchDiffBatch, MicroDiff};
pub use snapshot::MatchSnapshot;

use serde::{Deserialize, Serialize};
use tracing::error;

/// Stable op codes for match messages.
///
/// The catalog is append-only: codes are never renumbered or reused, so older
/// clients keep decoding newer servers. Match-scoped codes live in 100-1xx,
/// player-scoped codes in 200-2xx.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum OpCode {
    // Match
    MatchWelcome = 100,
    MatchWaitingTimeIncreased = 101,
    MatchPlayersJoined = 102,
    MatchPlayersLeft = 103,
    MatchPlayerNameUpdated = 104,
    MatchStarted = 105,
    MatchFinished = 106,
    MatchPing = 107,
    MatchPong = 108,

    // Player
    PlayerJoinedTheLobby = 200,
    PlayerTickUpdate = 201,
    PlayerStarted = 202,
    PlayerJumped = 203,
    PlayerScored = 204,
    PlayerDied = 205,
    PlayerKickedFromLobby = 206,
    PlayerFullStateNeeded = 207,
}

impl OpCode {
    /// Decode a raw inbound op code; unknown values return `None` and are
    /// ignored by the match handler.
    pub fn from_u16(raw: u16) -> Option<Self> {
        match raw {
            100 => Some(Self::MatchWelcome),
            101 => Some(Self::MatchWaitingTimeIncreased),
            102 => Some(Self::MatchPlayersJoined),
            103 => Some(Self::MatchPlayersLeft),
            104 => Some(Self::MatchPlayerNameUpdated),
            105 => Some(Self::MatchStarted),
            106 => Some(Self::MatchFinished),
            107 => Some(Self::MatchPing),
            108 => Some(Self::MatchPong),
            200 => Some(Self::PlayerJoinedTheLobby),
            201 => Some(Self::PlayerTickUpdate),
            202 => Some(Self::PlayerStarted),
            203 => Some(Self::PlayerJumped),
            204 => Some(Self::PlayerScored),
            205 => Some(Self::PlayerDied),
            206 => Some(Self::PlayerKickedFromLobby),
            207 => Some(Self::PlayerFullStateNeeded),
            _ => None,
        }
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

/// Inbound ping envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingEnvelope {
    /// Round-trip time the client measured for the previous ping
    pub previous_ping: u32,
    /// Client-chosen identifier echoed back in the pong
    pub ping_id: u64,
}

/// Pong reply, sent to the pinging client only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PongPayload {
    pub server_receive_time: u64,
    pub ping_id: u64,
}

/// Broadcast when the waiting phase is extended below minimum players
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitingTimeIncreased {
    pub new_runs_at: u64,
}

/// Broadcast after a player refreshes their display name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayNameUpdated {
    pub new_display_name: String,
}

/// Serialize a payload for the dispatcher.
/// Serialization of our own derive types cannot realistically fail; if it ever
/// does, the message goes out without a payload and the error is logged.
pub fn encode<T: Serialize>(payload: &T) -> Option<String> {
    match serde_json::to_string(payload) {
        Ok(json) => Some(json),
        Err(err) => {
            error!(error = %err, "failed to encode outbound payload");
            None
        }
    }
}
