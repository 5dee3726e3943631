//! History records: the append-only ledger entries of a transition
//!
//! Every gate verdict, action execution, and guarded skip leaves one
//! record. Records store states in flat mapping form so the ledger
//! serializes without knowing the domain type.

use crate::{ActionOutcome, EntityState, ExecutionSignal, GateResult, StateMapping};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Gate Evaluations ─────────────────────────────────────────────────

/// One gate evaluation: verdict, explanation, and where it ran
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GateEvaluationRecord {
    /// Identity of the gate
    pub gate: String,
    /// The verdict
    pub result: GateResult,
    /// Explanation supplied by the gate, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// True when the gate guarded a single action rather than the transition
    pub action_gate: bool,
    /// When the evaluation happened
    pub evaluated_at: DateTime<Utc>,
}

impl GateEvaluationRecord {
    pub fn new(
        gate: impl Into<String>,
        result: GateResult,
        message: Option<String>,
        action_gate: bool,
    ) -> Self {
        Self {
            gate: gate.into(),
            result,
            message,
            action_gate,
            evaluated_at: Utc::now(),
        }
    }
}

// ── Action Executions ────────────────────────────────────────────────

/// One action execution: signal, state change, and metadata
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionExecutionRecord {
    /// Identity of the action
    pub action: String,
    /// The flow signal the action returned
    pub signal: ExecutionSignal,
    /// Mapping form of the replacement state, if the action changed it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacement_state: Option<StateMapping>,
    /// Metadata the action attached to this execution
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
    /// When the execution happened
    pub executed_at: DateTime<Utc>,
}

impl ActionExecutionRecord {
    pub fn new(
        action: impl Into<String>,
        signal: ExecutionSignal,
        replacement_state: Option<StateMapping>,
        metadata: Value,
    ) -> Self {
        Self {
            action: action.into(),
            signal,
            replacement_state,
            metadata,
            executed_at: Utc::now(),
        }
    }

    /// Build the record for an outcome, projecting the state to its mapping
    pub fn from_outcome<S: EntityState>(
        action: impl Into<String>,
        outcome: &ActionOutcome<S>,
    ) -> Self {
        Self::new(
            action,
            outcome.signal,
            outcome.replacement_state.as_ref().map(|s| s.to_mapping()),
            outcome.metadata.clone(),
        )
    }
}

// ── Action Skips ─────────────────────────────────────────────────────

/// One skipped action: which one, and the guard verdict that skipped it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionSkipRecord {
    /// Identity of the skipped action
    pub action: String,
    /// The guard verdict that caused the skip
    pub reason: GateResult,
    /// When the skip happened
    pub skipped_at: DateTime<Utc>,
}

impl ActionSkipRecord {
    pub fn new(action: impl Into<String>, reason: GateResult) -> Self {
        Self {
            action: action.into(),
            reason,
            skipped_at: Utc::now(),
        }
    }
}
