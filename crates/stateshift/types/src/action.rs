//! Actions: the ordered units of work a transition executes
//!
//! Once gates allow a transition, its actions run strictly one after
//! another. Each action sees the current state, the requested delta,
//! and the execution ledger so far, and answers with an
//! [`ActionOutcome`]: a flow signal, an optional replacement state,
//! and optional metadata for the record.

use crate::{BoxedError, Delta, EntityState, Gate, TransitionContext};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Execution Signal ─────────────────────────────────────────────────

/// Flow-control signal returned by an action
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionSignal {
    /// Proceed to the next action
    Continue,
    /// Suspend the transition; it can resume later from this point
    Pause,
    /// End the transition early without running remaining actions
    Stop,
}

impl ExecutionSignal {
    /// Check whether execution moves on to the next action
    pub fn proceeds(&self) -> bool {
        matches!(self, Self::Continue)
    }
}

impl std::fmt::Display for ExecutionSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Continue => "continue",
            Self::Pause => "pause",
            Self::Stop => "stop",
        };
        write!(f, "{}", label)
    }
}

// ── Action Outcome ───────────────────────────────────────────────────

/// What an action hands back to the orchestrator
#[derive(Clone, Debug)]
pub struct ActionOutcome<S> {
    /// How execution should proceed after this action
    pub signal: ExecutionSignal,
    /// Full replacement for the current state, if the action changed it
    pub replacement_state: Option<S>,
    /// Free-form metadata recorded with this execution
    pub metadata: Value,
}

impl<S> ActionOutcome<S> {
    /// Continue to the next action
    pub fn advance() -> Self {
        Self {
            signal: ExecutionSignal::Continue,
            replacement_state: None,
            metadata: Value::Null,
        }
    }

    /// Suspend the transition after this action
    pub fn pause() -> Self {
        Self {
            signal: ExecutionSignal::Pause,
            replacement_state: None,
            metadata: Value::Null,
        }
    }

    /// End the transition after this action
    pub fn stop() -> Self {
        Self {
            signal: ExecutionSignal::Stop,
            replacement_state: None,
            metadata: Value::Null,
        }
    }

    /// Attach a replacement state
    pub fn with_state(mut self, state: S) -> Self {
        self.replacement_state = Some(state);
        self
    }

    /// Attach metadata for the execution record
    pub fn with_metadata(mut self, metadata: impl Into<Value>) -> Self {
        self.metadata = metadata.into();
        self
    }
}

// ── Action Trait ─────────────────────────────────────────────────────

/// A unit of work executed during a transition.
///
/// Actions run sequentially and never concurrently within one attempt.
/// An action that fails with an error fails the whole transition; flow
/// decisions that are not failures go through the returned signal.
pub trait Action<S: EntityState>: Send + Sync {
    /// Stable identity of this action, recorded in history
    fn name(&self) -> &str;

    /// Optional gate evaluated immediately before this action runs.
    ///
    /// A non-allow verdict skips only this action; execution proceeds
    /// with the next one.
    fn guard(&self) -> Option<&dyn Gate<S>> {
        None
    }

    /// Execute against the current state, delta, and ledger so far
    fn execute(
        &self,
        state: &S,
        delta: &Delta,
        context: &TransitionContext<S>,
    ) -> Result<ActionOutcome<S>, BoxedError>;
}

impl<S: EntityState> std::fmt::Debug for dyn Action<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action").field("name", &self.name()).finish()
    }
}

// ── Ready-Made Actions ───────────────────────────────────────────────

/// Action that applies the transition's own delta to the state.
///
/// For most transitions this is the first action in the list: gates
/// have allowed the delta, so fold it into the state.
#[derive(Clone, Copy, Debug, Default)]
pub struct ApplyDelta;

impl<S: EntityState> Action<S> for ApplyDelta {
    fn name(&self) -> &str {
        "ApplyDelta"
    }

    fn execute(
        &self,
        state: &S,
        delta: &Delta,
        _context: &TransitionContext<S>,
    ) -> Result<ActionOutcome<S>, BoxedError> {
        Ok(ActionOutcome::advance().with_state(state.with_changes(delta)))
    }
}

/// Action that sets a fixed group of fields on the state
#[derive(Clone, Debug)]
pub struct SetFields {
    fields: Delta,
}

impl SetFields {
    pub fn new(fields: Delta) -> Self {
        Self { fields }
    }

    /// Convenience for setting a single field
    pub fn single(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(Delta::new().set(field, value))
    }
}

impl<S: EntityState> Action<S> for SetFields {
    fn name(&self) -> &str {
        "SetFields"
    }

    fn execute(
        &self,
        state: &S,
        _delta: &Delta,
        _context: &TransitionContext<S>,
    ) -> Result<ActionOutcome<S>, BoxedError> {
        Ok(ActionOutcome::advance().with_state(state.with_changes(&self.fields)))
    }
}

/// Action that suspends the transition, carrying resume metadata
#[derive(Clone, Debug, Default)]
pub struct PauseWith {
    metadata: Value,
}

impl PauseWith {
    pub fn new(metadata: impl Into<Value>) -> Self {
        Self {
            metadata: metadata.into(),
        }
    }
}

impl<S: EntityState> Action<S> for PauseWith {
    fn name(&self) -> &str {
        "PauseWith"
    }

    fn execute(
        &self,
        _state: &S,
        _delta: &Delta,
        _context: &TransitionContext<S>,
    ) -> Result<ActionOutcome<S>, BoxedError> {
        Ok(ActionOutcome::pause().with_metadata(self.metadata.clone()))
    }
}

/// Action that ends the transition early, carrying outcome metadata
#[derive(Clone, Debug, Default)]
pub struct StopWith {
    metadata: Value,
}

impl StopWith {
    pub fn new(metadata: impl Into<Value>) -> Self {
        Self {
            metadata: metadata.into(),
        }
    }
}

impl<S: EntityState> Action<S> for StopWith {
    fn name(&self) -> &str {
        "StopWith"
    }

    fn execute(
        &self,
        _state: &S,
        _delta: &Delta,
        _context: &TransitionContext<S>,
    ) -> Result<ActionOutcome<S>, BoxedError> {
        Ok(ActionOutcome::stop().with_metadata(self.metadata.clone()))
    }
}

/// Action that does nothing and continues.
///
/// Mostly a placeholder for tests and for wiring up configurations
/// before real actions exist. Supports a custom name so several
/// instances can appear in one configuration with distinct identities.
#[derive(Clone, Debug)]
pub struct NoOp {
    name: String,
}

impl NoOp {
    pub fn new() -> Self {
        Self::named("NoOp")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for NoOp {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: EntityState> Action<S> for NoOp {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(
        &self,
        _state: &S,
        _delta: &Delta,
        _context: &TransitionContext<S>,
    ) -> Result<ActionOutcome<S>, BoxedError> {
        Ok(ActionOutcome::advance())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FlatState;
    use serde_json::json;

    fn make_context() -> TransitionContext<FlatState> {
        TransitionContext::new(FlatState::new().set("status", "draft"), Delta::new())
    }

    #[test]
    fn test_outcome_constructors() {
        let outcome: ActionOutcome<FlatState> = ActionOutcome::advance();
        assert_eq!(outcome.signal, ExecutionSignal::Continue);
        assert!(outcome.replacement_state.is_none());
        assert!(outcome.metadata.is_null());

        let outcome: ActionOutcome<FlatState> = ActionOutcome::pause()
            .with_metadata(json!({"job_id": 42}))
            .with_state(FlatState::new());
        assert_eq!(outcome.signal, ExecutionSignal::Pause);
        assert!(outcome.replacement_state.is_some());
        assert_eq!(outcome.metadata["job_id"], 42);
    }

    #[test]
    fn test_apply_delta_action() {
        let ctx = make_context();
        let delta = Delta::new().set("status", "review");
        let state = FlatState::new().set("status", "draft");

        let outcome = ApplyDelta.execute(&state, &delta, &ctx).unwrap();
        let next = outcome.replacement_state.unwrap();
        assert_eq!(next.get("status"), Some(&json!("review")));
    }

    #[test]
    fn test_set_fields_action() {
        let ctx = make_context();
        let state = FlatState::new();
        let action = SetFields::single("charged", true);

        let outcome = action.execute(&state, &Delta::new(), &ctx).unwrap();
        assert!(outcome.signal.proceeds());
        let next = outcome.replacement_state.unwrap();
        assert_eq!(next.get("charged"), Some(&json!(true)));
    }

    #[test]
    fn test_pause_and_stop_actions() {
        let ctx = make_context();
        let state = FlatState::new();

        let pause = PauseWith::new(json!({"job_id": 7}));
        let outcome = pause.execute(&state, &Delta::new(), &ctx).unwrap();
        assert_eq!(outcome.signal, ExecutionSignal::Pause);
        assert_eq!(outcome.metadata["job_id"], 7);

        let stop = StopWith::new(json!({"reason": "budget"}));
        let outcome = stop.execute(&state, &Delta::new(), &ctx).unwrap();
        assert_eq!(outcome.signal, ExecutionSignal::Stop);
    }

    #[test]
    fn test_noop_names() {
        let plain = NoOp::new();
        let named = NoOp::named("warm_cache");
        assert_eq!(Action::<FlatState>::name(&plain), "NoOp");
        assert_eq!(Action::<FlatState>::name(&named), "warm_cache");
    }

    #[test]
    fn test_default_guard_is_absent() {
        let action = NoOp::new();
        assert!(Action::<FlatState>::guard(&action).is_none());
    }
}
