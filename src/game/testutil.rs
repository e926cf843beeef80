//! Shared test fixtures: recording fakes for the host collaborator seams

use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::actor::{
    AccountDirectory, Dispatcher, InboundMessage, MatchActor, MatchContext, MatchDirectory,
    Presence,
};
use crate::game::{DashMatchHandler, MatchConfig, MatchPhase, MatchState};
use crate::notify::Notifier;
use crate::protocol::OpCode;
use crate::store::{InMemoryStorage, MatchResultStore, StorageClient, WaitingMatchRegistry};
use crate::util::time::unix_millis;

/// One recorded dispatcher call, with presences reduced to user ids
#[derive(Debug, Clone)]
pub struct Broadcast {
    pub op: OpCode,
    pub data: Option<String>,
    /// `None` means everyone
    pub to: Option<Vec<Uuid>>,
    pub exclude: Option<Uuid>,
}

#[derive(Default)]
pub struct RecordingDispatcher {
    pub sent: Mutex<Vec<Broadcast>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything recorded so far
    pub fn take(&self) -> Vec<Broadcast> {
        std::mem::take(&mut *self.sent.lock())
    }
}

impl Dispatcher for RecordingDispatcher {
    fn broadcast(
        &self,
        op: OpCode,
        data: Option<String>,
        to: Option<&[Presence]>,
        exclude: Option<&Presence>,
    ) {
        self.sent.lock().push(Broadcast {
            op,
            data,
            to: to.map(|presences| presences.iter().map(|p| p.user_id).collect()),
            exclude: exclude.map(|p| p.user_id),
        });
    }
}

pub struct StubAccounts;

impl AccountDirectory for StubAccounts {
    fn display_name(&self, user_id: Uuid) -> Option<String> {
        Some(format!("user-{}", &user_id.to_string()[..4]))
    }
}

#[derive(Default)]
pub struct StubDirectory {
    pub created: Mutex<Vec<Uuid>>,
    pub live: Mutex<Vec<Uuid>>,
}

impl MatchDirectory for StubDirectory {
    fn create_match(&self) -> Option<Uuid> {
        let match_id = Uuid::new_v4();
        self.created.lock().push(match_id);
        Some(match_id)
    }

    fn is_live(&self, match_id: Uuid) -> bool {
        self.live.lock().contains(&match_id)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<String>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, text: &str) {
        self.messages.lock().push(text.to_string());
    }
}

pub struct Fixture {
    pub handler: DashMatchHandler,
    pub dispatcher: RecordingDispatcher,
    pub registry: WaitingMatchRegistry,
    pub results: MatchResultStore,
    pub directory: Arc<StubDirectory>,
    pub notifier: Arc<RecordingNotifier>,
    pub ctx: MatchContext,
}

pub fn fixture() -> Fixture {
    let storage: Arc<dyn StorageClient> = Arc::new(InMemoryStorage::new());
    let registry = WaitingMatchRegistry::new(storage.clone());
    let results = MatchResultStore::new(storage);
    let directory = Arc::new(StubDirectory::default());
    let notifier = Arc::new(RecordingNotifier::default());

    let handler = DashMatchHandler::new(
        MatchConfig::default(),
        "https://dash.example".to_string(),
        registry.clone(),
        results.clone(),
        Arc::new(StubAccounts),
        directory.clone(),
        notifier.clone(),
    );

    Fixture {
        handler,
        dispatcher: RecordingDispatcher::new(),
        registry,
        results,
        directory,
        notifier,
        ctx: MatchContext {
            match_id: Uuid::new_v4(),
        },
    }
}

pub fn presence(user_id: Uuid) -> Presence {
    Presence {
        user_id,
        session_id: Uuid::new_v4(),
        username: format!("user-{}", &user_id.to_string()[..4]),
    }
}

pub fn message(sender: &Presence, op: OpCode, data: &[u8]) -> InboundMessage {
    InboundMessage {
        sender: sender.clone(),
        op_code: op.as_u16(),
        data: data.to_vec(),
        received_at: unix_millis(),
    }
}

/// A match driven into the Running phase with the given players all ready
pub fn running_match(fx: &Fixture, players: &[Presence]) -> MatchState {
    let mut state = fx.handler.init(&fx.ctx).state;
    fx.handler.join(&fx.ctx, &fx.dispatcher, &mut state, players);

    let ready_msgs: Vec<InboundMessage> = players
        .iter()
        .map(|p| message(p, OpCode::PlayerJoinedTheLobby, b""))
        .collect();
    state.runs_at = 0;
    fx.handler
        .tick(&fx.ctx, &fx.dispatcher, &mut state, &ready_msgs);
    assert_eq!(state.phase, MatchPhase::Running);
    state
}
