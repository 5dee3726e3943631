//! Action execution
//!
//! Runs a single action: evaluates its guard if it has one, executes
//! it, and packages the result as a disposition the orchestrator can
//! apply to the context. The runner reads the context but never
//! writes it; all ledger appends happen in one place, the
//! orchestrator.

use crate::{EventEmitter, GateEvaluator};
use stateshift_types::{
    Action, ActionExecutionRecord, ActionOutcome, ActionSkipRecord, EntityState, EventKind,
    GateEvaluationRecord, TransitionContext, TransitionError, TransitionResult,
};

/// What happened to one action
#[derive(Debug)]
pub enum ActionDisposition<S: EntityState> {
    /// The action ran; apply its record and outcome
    Executed {
        /// Guard verdict, when the action had a guard that allowed
        guard_record: Option<GateEvaluationRecord>,
        /// Ledger record of the execution
        record: ActionExecutionRecord,
        /// The outcome, still carrying the typed replacement state
        outcome: ActionOutcome<S>,
    },
    /// The action's guard refused; the action never ran
    Skipped {
        /// The refusing guard verdict
        guard_record: GateEvaluationRecord,
        /// Ledger record of the skip
        skip_record: ActionSkipRecord,
    },
}

/// Executes actions one at a time, guard first
#[derive(Clone, Copy, Debug, Default)]
pub struct ActionRunner {
    gates: GateEvaluator,
}

impl ActionRunner {
    pub fn new() -> Self {
        Self {
            gates: GateEvaluator::new(),
        }
    }

    /// Run one action against the current context.
    ///
    /// The guard, if present, is evaluated against the context's
    /// current state and delta. A non-allow verdict skips the action;
    /// execution errors become [`TransitionError::ActionFailed`].
    pub fn run<S: EntityState>(
        &self,
        action: &dyn Action<S>,
        context: &TransitionContext<S>,
        emitter: &EventEmitter,
    ) -> TransitionResult<ActionDisposition<S>> {
        let name = action.name().to_string();

        let guard_record = match action.guard() {
            Some(guard) => {
                emitter.emit(
                    &context.id,
                    EventKind::GateEvaluating {
                        gate: guard.name().to_string(),
                    },
                );
                let (result, record) =
                    self.gates
                        .evaluate(guard, &context.current_state, &context.delta, true)?;
                emitter.emit(
                    &context.id,
                    EventKind::GateEvaluated {
                        gate: record.gate.clone(),
                        result,
                    },
                );

                if result.halts() {
                    emitter.emit(
                        &context.id,
                        EventKind::ActionSkipped {
                            action: name.clone(),
                            reason: result,
                        },
                    );
                    tracing::debug!(
                        transition_id = %context.id,
                        action = %name,
                        reason = %result,
                        "Action skipped by its guard"
                    );
                    return Ok(ActionDisposition::Skipped {
                        guard_record: record,
                        skip_record: ActionSkipRecord::new(name, result),
                    });
                }
                Some(record)
            }
            None => None,
        };

        emitter.emit(
            &context.id,
            EventKind::ActionExecuting {
                action: name.clone(),
            },
        );
        let outcome = action
            .execute(&context.current_state, &context.delta, context)
            .map_err(|source| TransitionError::ActionFailed {
                action: name.clone(),
                source,
            })?;
        emitter.emit(
            &context.id,
            EventKind::ActionExecuted {
                action: name.clone(),
                signal: outcome.signal,
            },
        );
        tracing::debug!(
            transition_id = %context.id,
            action = %name,
            signal = %outcome.signal,
            replaced_state = outcome.replacement_state.is_some(),
            "Action executed"
        );

        let record = ActionExecutionRecord::from_outcome(name, &outcome);
        Ok(ActionDisposition::Executed {
            guard_record,
            record,
            outcome,
        })
    }
}
