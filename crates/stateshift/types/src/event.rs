//! Observability events: what the engine tells the outside world
//!
//! The engine emits one event at every step boundary: transition
//! lifecycle, each gate verdict, each action execution or skip, and
//! every lock interaction. Events are fire-and-forget; a sink that
//! panics or blocks is the sink's problem, never the transition's.

use crate::{ExecutionSignal, GateResult, TransitionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

// ── Event Record ─────────────────────────────────────────────────────

/// One engine event, stamped with its transition and time
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// The transition this event belongs to
    pub transition_id: TransitionId,
    /// When the event was emitted
    pub timestamp: DateTime<Utc>,
    /// What happened
    pub kind: EventKind,
}

impl EventRecord {
    pub fn new(transition_id: &TransitionId, kind: EventKind) -> Self {
        Self {
            transition_id: transition_id.clone(),
            timestamp: Utc::now(),
            kind,
        }
    }
}

// ── Event Kind ───────────────────────────────────────────────────────

/// Everything the engine reports
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    /// A transition attempt is about to execute
    TransitionStarting,
    /// All actions ran and continued
    TransitionCompleted,
    /// An action suspended the transition
    TransitionPaused,
    /// A gate refused, or an action signalled stop
    TransitionStopped,
    /// A gate or action failed with an error
    TransitionFailed,

    /// A transition gate or action guard is about to run
    GateEvaluating { gate: String },
    /// A gate returned its verdict
    GateEvaluated { gate: String, result: GateResult },

    /// An action is about to execute
    ActionExecuting { action: String },
    /// An action finished with a signal
    ActionExecuted {
        action: String,
        signal: ExecutionSignal,
    },
    /// An action guard skipped its action
    ActionSkipped { action: String, reason: GateResult },

    /// Lock acquisition is being attempted
    LockAcquiring { key: String },
    /// The lock was acquired
    LockAcquired { key: String },
    /// The lock was released
    LockReleased { key: String },
    /// The lock could not be acquired
    LockAcquireFailed { key: String },
    /// A resuming transition still owns its lock
    LockRestored { key: String },
    /// A resuming transition found its lock gone
    LockLost { key: String },
}

impl EventKind {
    /// Short stable label, used for log fields and filtering
    pub fn label(&self) -> &'static str {
        match self {
            Self::TransitionStarting => "transition_starting",
            Self::TransitionCompleted => "transition_completed",
            Self::TransitionPaused => "transition_paused",
            Self::TransitionStopped => "transition_stopped",
            Self::TransitionFailed => "transition_failed",
            Self::GateEvaluating { .. } => "gate_evaluating",
            Self::GateEvaluated { .. } => "gate_evaluated",
            Self::ActionExecuting { .. } => "action_executing",
            Self::ActionExecuted { .. } => "action_executed",
            Self::ActionSkipped { .. } => "action_skipped",
            Self::LockAcquiring { .. } => "lock_acquiring",
            Self::LockAcquired { .. } => "lock_acquired",
            Self::LockReleased { .. } => "lock_released",
            Self::LockAcquireFailed { .. } => "lock_acquire_failed",
            Self::LockRestored { .. } => "lock_restored",
            Self::LockLost { .. } => "lock_lost",
        }
    }
}

// ── Event Sink ───────────────────────────────────────────────────────

/// Receives engine events.
///
/// Dispatch happens synchronously on the executing thread, so sinks
/// should return quickly and must never panic into the engine.
pub trait EventSink: Send + Sync {
    /// Handle one event
    fn dispatch(&self, record: &EventRecord);
}

/// Sink that drops every event
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn dispatch(&self, _record: &EventRecord) {}
}

/// Sink that buffers events in memory, mostly for tests and debugging
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<EventRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything dispatched so far, in order
    pub fn records(&self) -> Vec<EventRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Labels of everything dispatched so far, in order
    pub fn labels(&self) -> Vec<&'static str> {
        self.records().iter().map(|r| r.kind.label()).collect()
    }

    /// Number of buffered events
    pub fn len(&self) -> usize {
        self.records().len()
    }

    /// Check whether nothing has been dispatched
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for MemorySink {
    fn dispatch(&self, record: &EventRecord) {
        // A poisoned buffer still accepts events; observability must
        // not take the engine down with it.
        let mut records = match self.records.lock() {
            Ok(records) => records,
            Err(poisoned) => poisoned.into_inner(),
        };
        records.push(record.clone());
    }
}
