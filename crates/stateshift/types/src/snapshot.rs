//! Context snapshots: the serializable form of a transition context
//!
//! Contexts are generic over the domain state type, so they cannot be
//! serialized directly. A snapshot carries the same ledger with the
//! state projected to its flat mapping. Restoring goes through a
//! [`StateFactory`] that rebuilds the typed state from the mapping,
//! which is how paused transitions survive process boundaries.

use crate::{
    ActionExecutionRecord, ActionSkipRecord, Delta, EntityState, GateEvaluationRecord, LockState,
    StateFactory, StateMapping, TransitionContext, TransitionError, TransitionId, TransitionResult,
    TransitionStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Serializable snapshot of a [`TransitionContext`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    /// Attempt identifier, preserved across restore
    pub id: TransitionId,
    /// Mapping form of the current state
    pub state: StateMapping,
    /// The requested delta
    pub delta: Delta,
    /// Lifecycle status at snapshot time
    pub status: TransitionStatus,
    /// Gate verdicts so far
    pub gate_history: Vec<GateEvaluationRecord>,
    /// Executed actions so far
    pub action_history: Vec<ActionExecutionRecord>,
    /// Guarded skips so far
    pub skip_history: Vec<ActionSkipRecord>,
    /// The lock held at snapshot time
    pub lock: LockState,
    /// Pause or stop metadata, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome_metadata: Option<Value>,
    /// When the attempt was created
    pub created_at: DateTime<Utc>,
    /// When the context last changed
    pub updated_at: DateTime<Utc>,
    /// When the attempt reached a terminal status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl<S: EntityState> TransitionContext<S> {
    /// Capture a serializable snapshot of this context
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            id: self.id.clone(),
            state: self.current_state.to_mapping(),
            delta: self.delta.clone(),
            status: self.status,
            gate_history: self.gate_history.clone(),
            action_history: self.action_history.clone(),
            skip_history: self.skip_history.clone(),
            lock: self.lock.clone(),
            outcome_metadata: self.outcome_metadata.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            completed_at: self.completed_at,
        }
    }

    /// Rebuild a context from a snapshot.
    ///
    /// The factory turns the stored mapping back into the typed state;
    /// everything else carries over verbatim, including the identifier
    /// and the held lock.
    pub fn restore(
        snapshot: &ContextSnapshot,
        states: &dyn StateFactory<S>,
    ) -> TransitionResult<Self> {
        let current_state =
            states
                .from_mapping(&snapshot.state)
                .map_err(|e| TransitionError::InvalidSnapshot {
                    reason: e.to_string(),
                })?;
        Ok(Self {
            id: snapshot.id.clone(),
            current_state,
            delta: snapshot.delta.clone(),
            status: snapshot.status,
            gate_history: snapshot.gate_history.clone(),
            action_history: snapshot.action_history.clone(),
            skip_history: snapshot.skip_history.clone(),
            lock: snapshot.lock.clone(),
            outcome_metadata: snapshot.outcome_metadata.clone(),
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
            completed_at: snapshot.completed_at,
        })
    }
}
