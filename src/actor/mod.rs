//! The host contract: operations a match actor exposes to the hosting
//! scheduler, and the collaborator seams the host provides back.
//!
//! A match actor is a single-threaded cooperative unit. The scheduler invokes
//! one operation at a time, never concurrently, at a fixed tick rate; state is
//! exclusively owned by the actor and mutated in place. The only cancellation
//! mechanism is a terminal tick outcome, after which the scheduler tears the
//! actor down and never calls it again.

use uuid::Uuid;

use crate::protocol::OpCode;

/// A connected client attached to a match.
/// Distinct from player state, which persists across disconnects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presence {
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub username: String,
}

/// Per-match context handed to every actor operation
#[derive(Debug, Clone)]
pub struct MatchContext {
    pub match_id: Uuid,
}

/// One inbound client message, as delivered by the host
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub sender: Presence,
    /// Raw op code; values outside the catalog are ignored by the actor
    pub op_code: u16,
    pub data: Vec<u8>,
    pub received_at: u64,
}

/// Everything `init` hands back to the scheduler
pub struct MatchSetup<S> {
    pub state: S,
    pub tick_rate: u32,
    pub label: String,
}

/// Admission verdict for a join attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinDecision {
    Accept,
    Reject { reason: String },
}

/// Outcome of a tick; `Terminal` tells the scheduler to tear the actor down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Terminal,
}

/// Outbound fan-out, implemented by the host transport
pub trait Dispatcher {
    /// Send `data` under `op` to the `to` presences (everyone when `None`),
    /// skipping `exclude`.
    fn broadcast(
        &self,
        op: OpCode,
        data: Option<String>,
        to: Option<&[Presence]>,
        exclude: Option<&Presence>,
    );
}

/// Identity lookup collaborator
pub trait AccountDirectory: Send + Sync {
    fn display_name(&self, user_id: Uuid) -> Option<String>;
}

/// Scheduler-side match operations an actor may invoke
pub trait MatchDirectory: Send + Sync {
    /// Ask the host to create a fresh match running this handler.
    /// Returns the new match id.
    fn create_match(&self) -> Option<Uuid>;

    /// Whether the given match is still live on the host
    fn is_live(&self, match_id: Uuid) -> bool;
}

/// The six-operation contract the hosting scheduler drives.
/// Operations mutate state in place; `tick` signals teardown via its outcome.
pub trait MatchActor {
    type State;

    fn init(&self, ctx: &MatchContext) -> MatchSetup<Self::State>;

    fn join_attempt(
        &self,
        ctx: &MatchContext,
        dispatcher: &dyn Dispatcher,
        state: &mut Self::State,
        presence: &Presence,
    ) -> JoinDecision;

    fn join(
        &self,
        ctx: &MatchContext,
        dispatcher: &dyn Dispatcher,
        state: &mut Self::State,
        presences: &[Presence],
    );

    fn leave(
        &self,
        ctx: &MatchContext,
        dispatcher: &dyn Dispatcher,
        state: &mut Self::State,
        presences: &[Presence],
    );

    fn tick(
        &self,
        ctx: &MatchContext,
        dispatcher: &dyn Dispatcher,
        state: &mut Self::State,
        messages: &[InboundMessage],
    ) -> TickOutcome;

    fn terminate(
        &self,
        ctx: &MatchContext,
        dispatcher: &dyn Dispatcher,
        state: &mut Self::State,
        grace_seconds: u64,
    );

    /// Diagnostic probe; no side effects beyond logging
    fn signal(&self, ctx: &MatchContext, state: &mut Self::State);
}
