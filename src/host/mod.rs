//! In-process development host: a minimal scheduler for match actors
//!
//! Real deployments embed the actors in a hosting scheduler; this one exists
//! so the server binary can run matches locally and so tests can drive full
//! lifecycles. It implements the collaborator seams an actor needs from its
//! host: successor-match creation and the liveness probe.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use crate::actor::{
    AccountDirectory, Dispatcher, MatchActor, MatchContext, MatchDirectory, Presence, TickOutcome,
};
use crate::game::{DashMatchHandler, MatchState};
use crate::protocol::OpCode;

/// Dispatcher that logs instead of sending; the dev host has no transport
pub struct LogDispatcher;

impl Dispatcher for LogDispatcher {
    fn broadcast(
        &self,
        op: OpCode,
        data: Option<String>,
        to: Option<&[Presence]>,
        exclude: Option<&Presence>,
    ) {
        debug!(
            op = ?op,
            bytes = data.as_deref().map(str::len).unwrap_or(0),
            targets = to.map(|p| p.len()),
            excluded = exclude.is_some(),
            "broadcast"
        );
    }
}

/// Account directory that derives names from the user id
pub struct StaticAccounts;

impl AccountDirectory for StaticAccounts {
    fn display_name(&self, user_id: Uuid) -> Option<String> {
        Some(format!("Player_{}", &user_id.to_string()[..8]))
    }
}

struct MatchCell {
    state: MatchState,
}

/// Owns live matches and drives their tick loops
pub struct LocalHost {
    matches: DashMap<Uuid, MatchCell>,
    /// Successor requests made mid-tick; instantiated after the tick pass
    pending_spawns: Mutex<Vec<Uuid>>,
    dispatcher: LogDispatcher,
}

impl LocalHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            matches: DashMap::new(),
            pending_spawns: Mutex::new(Vec::new()),
            dispatcher: LogDispatcher,
        })
    }

    /// Instantiate a match immediately; used for bootstrapping
    pub fn spawn_now(&self, handler: &DashMatchHandler) -> Uuid {
        let match_id = Uuid::new_v4();
        self.instantiate(handler, match_id);
        match_id
    }

    fn instantiate(&self, handler: &DashMatchHandler, match_id: Uuid) {
        let ctx = MatchContext { match_id };
        let setup = handler.init(&ctx);
        info!(match_id = %match_id, label = %setup.label, tick_rate = setup.tick_rate, "match spawned");
        self.matches.insert(match_id, MatchCell { state: setup.state });
    }

    /// One scheduler pass: tick every live match, tear down terminals,
    /// then instantiate queued successors.
    pub fn tick_all(&self, handler: &DashMatchHandler) {
        let mut terminal = Vec::new();
        for mut entry in self.matches.iter_mut() {
            let match_id = *entry.key();
            let ctx = MatchContext { match_id };
            if handler.tick(&ctx, &self.dispatcher, &mut entry.state, &[]) == TickOutcome::Terminal
            {
                terminal.push(match_id);
            }
        }
        for match_id in terminal {
            self.matches.remove(&match_id);
            info!(match_id = %match_id, "match torn down");
        }

        let pending: Vec<Uuid> = std::mem::take(&mut *self.pending_spawns.lock());
        for match_id in pending {
            self.instantiate(handler, match_id);
        }
    }

    /// Drive all matches at the given tick rate until the future is dropped
    pub async fn run(self: Arc<Self>, handler: Arc<DashMatchHandler>, tick_rate: u32) {
        let mut ticker = interval(Duration::from_micros(1_000_000 / tick_rate.max(1) as u64));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.tick_all(&handler);
        }
    }

    /// Graceful shutdown: terminate every live match
    pub fn shutdown(&self, handler: &DashMatchHandler, grace_seconds: u64) {
        for mut entry in self.matches.iter_mut() {
            let match_id = *entry.key();
            let ctx = MatchContext { match_id };
            handler.terminate(&ctx, &self.dispatcher, &mut entry.state, grace_seconds);
        }
        self.matches.clear();
    }

    pub fn live_matches(&self) -> usize {
        self.matches.len()
    }
}

impl MatchDirectory for LocalHost {
    fn create_match(&self) -> Option<Uuid> {
        let match_id = Uuid::new_v4();
        self.pending_spawns.lock().push(match_id);
        Some(match_id)
    }

    fn is_live(&self, match_id: Uuid) -> bool {
        self.matches.contains_key(&match_id) || self.pending_spawns.lock().contains(&match_id)
    }
}
