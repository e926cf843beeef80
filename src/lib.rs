//! Authoritative match core for Flappy Dash, a real-time multiplayer reflex
//! game.
//!
//! Each match is an isolated single-threaded actor: the hosting scheduler
//! invokes its operations one at a time at a fixed tick rate, and the actor
//! answers with broadcasts and (eventually) a terminal tick outcome. This
//! crate owns the match lifecycle state machine, the per-tick simulation, and
//! the diff/snapshot protocol; storage, identity lookup, and the notification
//! relay are collaborator seams implemented by the host.

pub mod actor;
pub mod config;
pub mod game;
pub mod host;
pub mod notify;
pub mod protocol;
pub mod rpc;
pub mod store;
pub mod util;
