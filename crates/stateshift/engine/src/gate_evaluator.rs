//! Gate evaluation
//!
//! Evaluates one gate at a time and pairs each verdict with its
//! history record. The evaluator is pure: no events, no context
//! mutation. The orchestrator decides what a verdict means for the
//! transition; an action runner decides what it means for one action.

use stateshift_types::{
    Delta, EntityState, Gate, GateEvaluationRecord, GateResult, TransitionError, TransitionResult,
};

/// Evaluates gates and produces their ledger records
#[derive(Clone, Copy, Debug, Default)]
pub struct GateEvaluator;

impl GateEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate a single gate against a state and delta.
    ///
    /// `action_gate` marks whether the gate guards one action rather
    /// than the whole transition; it lands in the record unchanged.
    /// A gate error becomes [`TransitionError::GateFailed`], naming
    /// the gate that raised it.
    pub fn evaluate<S: EntityState>(
        &self,
        gate: &dyn Gate<S>,
        state: &S,
        delta: &Delta,
        action_gate: bool,
    ) -> TransitionResult<(GateResult, GateEvaluationRecord)> {
        let result = gate
            .evaluate(state, delta)
            .map_err(|source| TransitionError::GateFailed {
                gate: gate.name().to_string(),
                source,
            })?;

        let record = GateEvaluationRecord::new(gate.name(), result, gate.message(), action_gate);
        tracing::debug!(
            gate = gate.name(),
            result = %result,
            action_gate,
            "Gate evaluated"
        );
        Ok((result, record))
    }
}
