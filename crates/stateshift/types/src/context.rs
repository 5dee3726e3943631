//! Transition contexts: the single source of truth for one transition
//!
//! A TransitionContext tracks everything about one transition attempt:
//! the evolving state, the requested delta, the append-only histories
//! of gate verdicts, action executions, and skips, the held lock, and
//! the lifecycle status. The orchestrator mutates it while executing;
//! everyone else reads it.

use crate::{
    ActionExecutionRecord, ActionSkipRecord, Delta, EntityState, GateEvaluationRecord, LockState,
    StateMapping,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

// ── Transition Identifier ────────────────────────────────────────────

/// Unique identifier for a transition attempt
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransitionId(pub String);

impl TransitionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn short(&self) -> &str {
        &self.0[..8.min(self.0.len())]
    }
}

impl std::fmt::Display for TransitionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Transition Status ────────────────────────────────────────────────

/// The lifecycle status of a transition
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TransitionStatus {
    /// Actively executing (the status every transition starts in)
    #[default]
    InProgress,
    /// All actions ran and continued
    Completed,
    /// Suspended by an action; resumable
    Paused,
    /// Ended early: a transition gate refused, or an action signalled stop
    Stopped,
    /// A gate or action failed with an error
    Failed,
    /// Never started because the lock was contended under the skip strategy
    SkippedDueToLock,
}

impl TransitionStatus {
    /// Check if this is a terminal status.
    ///
    /// Paused is not terminal: a paused transition can still resume.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Stopped | Self::Failed | Self::SkippedDueToLock
        )
    }
}

impl std::fmt::Display for TransitionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::InProgress => "in progress",
            Self::Completed => "completed",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
            Self::SkippedDueToLock => "skipped due to lock",
        };
        write!(f, "{}", label)
    }
}

// ── Transition Context ───────────────────────────────────────────────

/// The execution ledger of one transition attempt
#[derive(Clone, Debug)]
pub struct TransitionContext<S: EntityState> {
    /// Unique attempt identifier
    pub id: TransitionId,
    /// The state as of the latest executed action
    pub current_state: S,
    /// The delta this transition was asked to apply
    pub delta: Delta,
    /// Current lifecycle status
    pub status: TransitionStatus,
    /// Every gate verdict, in evaluation order
    pub gate_history: Vec<GateEvaluationRecord>,
    /// Every executed action, in execution order
    pub action_history: Vec<ActionExecutionRecord>,
    /// Every action skipped by its guard, in order
    pub skip_history: Vec<ActionSkipRecord>,
    /// The lock this transition holds, if any
    pub lock: LockState,
    /// Metadata from the action that paused or stopped the transition
    pub outcome_metadata: Option<Value>,
    /// When the attempt was created
    pub created_at: DateTime<Utc>,
    /// When the context last changed
    pub updated_at: DateTime<Utc>,
    /// When the attempt reached a terminal status
    pub completed_at: Option<DateTime<Utc>>,
}

impl<S: EntityState> TransitionContext<S> {
    /// Create a fresh context for one transition attempt
    pub fn new(initial_state: S, delta: Delta) -> Self {
        let now = Utc::now();
        Self {
            id: TransitionId::generate(),
            current_state: initial_state,
            delta,
            status: TransitionStatus::InProgress,
            gate_history: Vec::new(),
            action_history: Vec::new(),
            skip_history: Vec::new(),
            lock: LockState::unlocked(),
            outcome_metadata: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    // ── Ledger appends ───────────────────────────────────────────────

    /// Append a gate verdict
    pub fn record_gate(&mut self, record: GateEvaluationRecord) {
        self.gate_history.push(record);
        self.updated_at = Utc::now();
    }

    /// Append an action execution
    pub fn record_action(&mut self, record: ActionExecutionRecord) {
        self.action_history.push(record);
        self.updated_at = Utc::now();
    }

    /// Append a guarded skip
    pub fn record_skip(&mut self, record: ActionSkipRecord) {
        self.skip_history.push(record);
        self.updated_at = Utc::now();
    }

    /// Replace the current state with one an action produced
    pub fn replace_state(&mut self, state: S) {
        self.current_state = state;
        self.updated_at = Utc::now();
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Mark the transition completed
    pub fn complete(&mut self) {
        self.status = TransitionStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }

    /// Suspend the transition; it keeps its lock and can resume later
    pub fn pause(&mut self, metadata: Option<Value>) {
        self.status = TransitionStatus::Paused;
        self.outcome_metadata = metadata;
        self.updated_at = Utc::now();
    }

    /// Resume a paused transition
    pub fn resume(&mut self) {
        self.status = TransitionStatus::InProgress;
        self.outcome_metadata = None;
        self.updated_at = Utc::now();
    }

    /// End the transition early without running remaining actions
    pub fn stop(&mut self, metadata: Option<Value>) {
        self.status = TransitionStatus::Stopped;
        self.outcome_metadata = metadata;
        self.completed_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }

    /// Mark the transition failed
    pub fn fail(&mut self) {
        self.status = TransitionStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }

    /// Finish without starting: lock contention under the skip strategy
    pub fn skip_due_to_lock(&mut self) {
        self.status = TransitionStatus::SkippedDueToLock;
        self.completed_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }

    // ── Lock bookkeeping ─────────────────────────────────────────────

    /// Record lock acquisition
    pub fn lock_acquired(&mut self, key: impl Into<String>, ttl: Duration) {
        self.lock = LockState::acquired(key, ttl);
        self.updated_at = Utc::now();
    }

    /// Record a successful lock renewal
    pub fn lock_renewed(&mut self, ttl: Duration) {
        self.lock.mark_renewed(ttl);
        self.updated_at = Utc::now();
    }

    /// Record lock release
    pub fn lock_released(&mut self) {
        self.lock.clear();
        self.updated_at = Utc::now();
    }

    // ── Query methods ────────────────────────────────────────────────

    /// Check if the transition has finished for good
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Check if the transition is suspended
    pub fn is_paused(&self) -> bool {
        self.status == TransitionStatus::Paused
    }

    /// How many actions have been consumed, executed or skipped.
    ///
    /// Execution is strictly sequential, so this count is also the
    /// index of the next action to run when resuming.
    pub fn actions_consumed(&self) -> usize {
        self.action_history.len() + self.skip_history.len()
    }

    /// Flat mapping of the current state
    pub fn state_mapping(&self) -> StateMapping {
        self.current_state.to_mapping()
    }

    /// The most recent gate verdict, if any
    pub fn last_gate(&self) -> Option<&GateEvaluationRecord> {
        self.gate_history.last()
    }

    /// The most recent executed action, if any
    pub fn last_action(&self) -> Option<&ActionExecutionRecord> {
        self.action_history.last()
    }
}
