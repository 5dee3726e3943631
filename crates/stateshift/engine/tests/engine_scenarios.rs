//! End-to-end engine behavior: full transitions through gates, actions,
//! locks, pause and resume, observed through the event sink and the
//! context ledger.

use proptest::prelude::*;
use serde_json::json;
use stateshift_engine::{ActionStep, TransitionEngine};
use stateshift_locks::{FileLockBackend, LockBackend, MemoryLockBackend};
use stateshift_types::{
    Action, ActionOutcome, ApplyDelta, BoxedError, ContextSnapshot, Delta, EntityState,
    ExecutionSignal, FieldEquals, FlatState, FlatStateFactory, Gate, GateResult, LockSettings,
    LockStrategy, MemorySink, PauseWith, SetFields, SkipIfNoChange, StopWith,
    TransitionConfiguration, TransitionContext, TransitionError, TransitionStatus,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Action that appends its name to a shared log and continues.
struct Recording {
    name: String,
    log: Arc<Mutex<Vec<String>>>,
}

impl Recording {
    fn new(name: impl Into<String>, log: &Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.into(),
            log: Arc::clone(log),
        }
    }
}

impl Action<FlatState> for Recording {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(
        &self,
        _state: &FlatState,
        _delta: &Delta,
        _context: &TransitionContext<FlatState>,
    ) -> Result<ActionOutcome<FlatState>, BoxedError> {
        self.log.lock().unwrap().push(self.name.clone());
        Ok(ActionOutcome::advance())
    }
}

/// Action that always fails.
struct Explode;

impl Action<FlatState> for Explode {
    fn name(&self) -> &str {
        "Explode"
    }

    fn execute(
        &self,
        _state: &FlatState,
        _delta: &Delta,
        _context: &TransitionContext<FlatState>,
    ) -> Result<ActionOutcome<FlatState>, BoxedError> {
        Err("disk full".into())
    }
}

/// Re-applies the transition delta, but its guard skips the action
/// when the state already carries every requested value.
#[derive(Default)]
struct ReapplyDelta {
    guard: SkipIfNoChange,
}

impl Action<FlatState> for ReapplyDelta {
    fn name(&self) -> &str {
        "ReapplyDelta"
    }

    fn guard(&self) -> Option<&dyn Gate<FlatState>> {
        Some(&self.guard)
    }

    fn execute(
        &self,
        state: &FlatState,
        delta: &Delta,
        _context: &TransitionContext<FlatState>,
    ) -> Result<ActionOutcome<FlatState>, BoxedError> {
        Ok(ActionOutcome::advance().with_state(state.with_changes(delta)))
    }
}

fn draft_state() -> FlatState {
    FlatState::new().set("status", "draft").set("id", "doc-1")
}

fn review_delta() -> Delta {
    Delta::new().set("status", "review")
}

fn provider_for(
    configuration: TransitionConfiguration<FlatState>,
) -> impl Fn(&FlatState, &Delta) -> TransitionConfiguration<FlatState> {
    move |_: &FlatState, _: &Delta| configuration.clone()
}

fn fixed_key(key: &'static str) -> impl Fn(&FlatState, &Delta) -> String {
    move |_: &FlatState, _: &Delta| key.to_string()
}

fn action_names(context: &TransitionContext<FlatState>) -> Vec<String> {
    context
        .action_history
        .iter()
        .map(|record| record.action.clone())
        .collect()
}

// ---------------------------------------------------------------------------
// Full transitions
// ---------------------------------------------------------------------------

#[test]
fn test_happy_path_reports_every_step_in_order() {
    let backend = Arc::new(MemoryLockBackend::new());
    let sink = Arc::new(MemorySink::new());
    let configuration = TransitionConfiguration::new()
        .with_gate(FieldEquals::new("status", "draft"))
        .with_action(SetFields::single("stage", "routed"))
        .with_action(ApplyDelta);
    let engine = TransitionEngine::new(provider_for(configuration))
        .with_locking(backend.clone(), fixed_key("doc-1"), LockSettings::default())
        .with_event_sink(sink.clone());

    let mut attempt = engine.transition(draft_state(), review_delta()).unwrap();
    let status = attempt.run().unwrap();

    assert_eq!(status, TransitionStatus::Completed);
    assert_eq!(
        sink.labels(),
        vec![
            "transition_starting",
            "lock_acquiring",
            "lock_acquired",
            "gate_evaluating",
            "gate_evaluated",
            "action_executing",
            "action_executed",
            "action_executing",
            "action_executed",
            "lock_released",
            "transition_completed",
        ]
    );

    let context = attempt.context();
    assert_eq!(context.gate_history.len(), 1);
    assert_eq!(context.gate_history[0].result, GateResult::Allow);
    assert_eq!(action_names(context), ["SetFields", "ApplyDelta"]);
    assert!(context.completed_at.is_some());
    assert!(!context.lock.is_locked());
    assert!(!backend.exists("doc-1"));

    let mapping = context.state_mapping();
    assert_eq!(mapping.get("status"), Some(&json!("review")));
    assert_eq!(mapping.get("stage"), Some(&json!("routed")));
    assert_eq!(mapping.get("id"), Some(&json!("doc-1")));
}

#[test]
fn test_gate_refusal_stops_without_running_actions() {
    let backend = Arc::new(MemoryLockBackend::new());
    let sink = Arc::new(MemorySink::new());
    let log = Arc::new(Mutex::new(Vec::new()));
    let configuration = TransitionConfiguration::new()
        .with_gate(FieldEquals::new("status", "draft"))
        .with_action(Recording::new("must_not_run", &log));
    let engine = TransitionEngine::new(provider_for(configuration))
        .with_locking(backend.clone(), fixed_key("doc-1"), LockSettings::default())
        .with_event_sink(sink.clone());

    let archived = FlatState::new().set("status", "archived");
    let mut attempt = engine.transition(archived, review_delta()).unwrap();
    let status = attempt.run().unwrap();

    assert_eq!(status, TransitionStatus::Stopped);
    assert_eq!(
        sink.labels(),
        vec![
            "transition_starting",
            "lock_acquiring",
            "lock_acquired",
            "gate_evaluating",
            "gate_evaluated",
            "lock_released",
            "transition_stopped",
        ]
    );

    let context = attempt.context();
    assert!(log.lock().unwrap().is_empty());
    assert!(context.action_history.is_empty());
    assert_eq!(context.gate_history.len(), 1);
    assert_eq!(context.gate_history[0].result, GateResult::Deny);
    assert!(context.gate_history[0].message.is_some());
    assert!(context.is_terminal());
    assert!(!backend.exists("doc-1"));
}

#[test]
fn test_redundant_delta_is_skipped_idempotently() {
    let configuration = TransitionConfiguration::new()
        .with_gate(SkipIfNoChange)
        .with_action(ApplyDelta);
    let engine = TransitionEngine::new(provider_for(configuration));

    // The state already says review; the delta changes nothing.
    let current = FlatState::new().set("status", "review");
    let mut attempt = engine.transition(current, review_delta()).unwrap();
    let status = attempt.run().unwrap();

    assert_eq!(status, TransitionStatus::Stopped);
    let context = attempt.context();
    assert_eq!(context.gate_history[0].result, GateResult::SkipIdempotent);
    assert!(context.action_history.is_empty());
}

#[test]
fn test_guard_skips_one_action_and_the_rest_continue() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let configuration = TransitionConfiguration::new()
        .with_action(ApplyDelta)
        .with_action(ReapplyDelta::default())
        .with_action(Recording::new("after", &log));
    let engine = TransitionEngine::new(provider_for(configuration));

    let mut attempt = engine.transition(draft_state(), review_delta()).unwrap();
    let status = attempt.run().unwrap();

    // ApplyDelta made the delta redundant, so ReapplyDelta's guard
    // skipped it; the transition still completed.
    assert_eq!(status, TransitionStatus::Completed);
    let context = attempt.context();
    assert_eq!(context.skip_history.len(), 1);
    assert_eq!(context.skip_history[0].action, "ReapplyDelta");
    assert_eq!(context.skip_history[0].reason, GateResult::SkipIdempotent);
    assert_eq!(action_names(context), ["ApplyDelta", "after"]);
    assert_eq!(context.actions_consumed(), 3);
    // The guard verdict is in the gate history, flagged as an action gate
    assert_eq!(context.gate_history.len(), 1);
    assert!(context.gate_history[0].action_gate);
    assert_eq!(*log.lock().unwrap(), ["after"]);
}

#[test]
fn test_stop_action_ends_with_outcome_metadata() {
    let backend = Arc::new(MemoryLockBackend::new());
    let log = Arc::new(Mutex::new(Vec::new()));
    let configuration = TransitionConfiguration::new()
        .with_action(StopWith::new(json!({"reason": "limit reached"})))
        .with_action(Recording::new("never", &log));
    let engine = TransitionEngine::new(provider_for(configuration)).with_locking(
        backend.clone(),
        fixed_key("doc-1"),
        LockSettings::default(),
    );

    let mut attempt = engine.transition(draft_state(), review_delta()).unwrap();
    let status = attempt.run().unwrap();

    assert_eq!(status, TransitionStatus::Stopped);
    assert_eq!(
        attempt.context().outcome_metadata,
        Some(json!({"reason": "limit reached"}))
    );
    assert!(log.lock().unwrap().is_empty());
    assert!(!backend.exists("doc-1"));
}

#[test]
fn test_action_failure_marks_failed_and_keeps_prior_history() {
    let backend = Arc::new(MemoryLockBackend::new());
    let sink = Arc::new(MemorySink::new());
    let log = Arc::new(Mutex::new(Vec::new()));
    let configuration = TransitionConfiguration::new()
        .with_action(Recording::new("prepare", &log))
        .with_action(Explode)
        .with_action(Recording::new("finish", &log));
    let engine = TransitionEngine::new(provider_for(configuration))
        .with_locking(backend.clone(), fixed_key("doc-1"), LockSettings::default())
        .with_event_sink(sink.clone());

    let mut attempt = engine.transition(draft_state(), review_delta()).unwrap();
    let err = attempt.run().unwrap_err();

    match err {
        TransitionError::ActionFailed { action, .. } => assert_eq!(action, "Explode"),
        other => panic!("unexpected error: {other}"),
    }
    let context = attempt.context();
    assert_eq!(context.status, TransitionStatus::Failed);
    assert_eq!(action_names(context), ["prepare"]);
    assert_eq!(*log.lock().unwrap(), ["prepare"]);
    assert!(context.completed_at.is_some());
    // The lock never outlives a failure
    assert!(!backend.exists("doc-1"));
    assert_eq!(
        sink.labels().last(),
        Some(&"transition_failed"),
        "failure must be the final event"
    );
}

// ---------------------------------------------------------------------------
// Pause, snapshot, resume
// ---------------------------------------------------------------------------

#[test]
fn test_pause_snapshot_resume_completes_remaining_actions() {
    let backend = Arc::new(MemoryLockBackend::new());
    let sink = Arc::new(MemorySink::new());
    let configuration = TransitionConfiguration::new()
        .with_action(SetFields::single("stage", "exported"))
        .with_action(PauseWith::new(json!({"job_id": 42})))
        .with_action(ApplyDelta);
    let engine = TransitionEngine::new(provider_for(configuration))
        .with_locking(backend.clone(), fixed_key("doc-1"), LockSettings::default())
        .with_event_sink(sink.clone());

    let mut attempt = engine.transition(draft_state(), review_delta()).unwrap();
    let status = attempt.run().unwrap();

    assert_eq!(status, TransitionStatus::Paused);
    let paused = attempt.context();
    assert_eq!(paused.actions_consumed(), 2);
    assert_eq!(paused.outcome_metadata, Some(json!({"job_id": 42})));
    assert!(paused.completed_at.is_none());
    // A paused transition keeps its lock
    assert!(backend.exists("doc-1"));

    // Park the context as JSON, as an application would between processes
    let stored = serde_json::to_string(&paused.snapshot()).unwrap();
    let snapshot: ContextSnapshot = serde_json::from_str(&stored).unwrap();
    assert_eq!(snapshot.id, paused.id);

    let events_before_resume = sink.len();
    let mut resumed = engine.from_snapshot(&snapshot, &FlatStateFactory).unwrap();
    let status = resumed.resume().unwrap();

    assert_eq!(status, TransitionStatus::Completed);
    let context = resumed.context();
    assert_eq!(context.id, paused.id);
    assert_eq!(
        action_names(context),
        ["SetFields", "PauseWith", "ApplyDelta"]
    );
    assert!(context.outcome_metadata.is_none());
    let mapping = context.state_mapping();
    assert_eq!(mapping.get("stage"), Some(&json!("exported")));
    assert_eq!(mapping.get("status"), Some(&json!("review")));
    assert!(!backend.exists("doc-1"));

    // Only the remaining work ran after resume
    assert_eq!(
        sink.labels()[events_before_resume..].to_vec(),
        vec![
            "lock_restored",
            "action_executing",
            "action_executed",
            "lock_released",
            "transition_completed",
        ]
    );
}

#[test]
fn test_resume_fails_when_the_lock_is_gone() {
    let backend = Arc::new(MemoryLockBackend::new());
    let configuration = TransitionConfiguration::new()
        .with_action(PauseWith::new(json!({"await": "callback"})))
        .with_action(ApplyDelta);
    let engine = TransitionEngine::new(provider_for(configuration)).with_locking(
        backend.clone(),
        fixed_key("doc-1"),
        LockSettings::default(),
    );

    let mut attempt = engine.transition(draft_state(), review_delta()).unwrap();
    assert_eq!(attempt.run().unwrap(), TransitionStatus::Paused);

    // The lease evaporates while the transition is parked
    assert!(backend.release("doc-1"));

    let paused = attempt.into_context();
    let mut resumed = engine.from_context(&paused).unwrap();
    let err = resumed.resume().unwrap_err();

    match err {
        TransitionError::LockLost { key } => assert_eq!(key, "doc-1"),
        other => panic!("unexpected error: {other}"),
    }
    // The context is still paused; nothing was replayed or rolled back
    assert_eq!(resumed.context().status, TransitionStatus::Paused);
    assert_eq!(resumed.context().actions_consumed(), 1);
}

#[test]
fn test_resume_targets_the_key_recorded_at_pause() {
    let backend = Arc::new(MemoryLockBackend::new());
    let configuration = TransitionConfiguration::new()
        .with_action(PauseWith::new(serde_json::Value::Null))
        .with_action(ApplyDelta);
    // The key provider reads the state, which changes between runs;
    // resume must still verify the key recorded in the context.
    let keys = |state: &FlatState, _: &Delta| {
        state
            .get("id")
            .and_then(|value| value.as_str())
            .map(|id| format!("entity:{id}"))
            .unwrap_or_else(|| "entity:unknown".to_string())
    };
    let engine = TransitionEngine::new(provider_for(configuration)).with_locking(
        backend.clone(),
        keys,
        LockSettings::default(),
    );

    let mut attempt = engine.transition(draft_state(), review_delta()).unwrap();
    assert_eq!(attempt.run().unwrap(), TransitionStatus::Paused);
    assert_eq!(attempt.context().lock.key(), Some("entity:doc-1"));

    let paused = attempt.into_context();
    let mut resumed = engine.from_context(&paused).unwrap();
    assert_eq!(resumed.lock_key(), Some("entity:doc-1"));
    assert_eq!(resumed.resume().unwrap(), TransitionStatus::Completed);
    assert!(!backend.exists("entity:doc-1"));
}

// ---------------------------------------------------------------------------
// Lock strategies
// ---------------------------------------------------------------------------

#[test]
fn test_contended_key_fails_fast_and_leaves_no_trace() {
    let backend = Arc::new(MemoryLockBackend::new());
    assert!(backend.acquire("order:9", Duration::from_secs(60)));

    let sink = Arc::new(MemorySink::new());
    let configuration = TransitionConfiguration::new().with_action(ApplyDelta);
    let engine = TransitionEngine::new(provider_for(configuration))
        .with_locking(backend.clone(), fixed_key("order:9"), LockSettings::default())
        .with_event_sink(sink.clone());

    let mut attempt = engine.transition(draft_state(), review_delta()).unwrap();
    let err = attempt.run().unwrap_err();

    match err {
        TransitionError::LockUnavailable { key } => assert_eq!(key, "order:9"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        sink.labels(),
        vec!["transition_starting", "lock_acquiring", "lock_acquire_failed"]
    );
    // The attempt never started: no records, not terminal
    let context = attempt.context();
    assert_eq!(context.status, TransitionStatus::InProgress);
    assert!(context.gate_history.is_empty());
    assert!(context.action_history.is_empty());
    assert!(context.completed_at.is_none());

    // Once the holder lets go, the same attempt can be retried
    assert!(backend.release("order:9"));
    assert_eq!(attempt.run().unwrap(), TransitionStatus::Completed);
    let starts = sink
        .labels()
        .iter()
        .filter(|label| **label == "transition_starting")
        .count();
    assert_eq!(starts, 1, "a retry must not announce a second start");
}

#[test]
fn test_skip_strategy_parks_the_attempt_without_error() {
    let backend = Arc::new(MemoryLockBackend::new());
    assert!(backend.acquire("order:9", Duration::from_secs(60)));

    let sink = Arc::new(MemorySink::new());
    let configuration = TransitionConfiguration::new().with_action(ApplyDelta);
    let engine = TransitionEngine::new(provider_for(configuration))
        .with_locking(
            backend.clone(),
            fixed_key("order:9"),
            LockSettings::default().with_strategy(LockStrategy::Skip),
        )
        .with_event_sink(sink.clone());

    let mut attempt = engine.transition(draft_state(), review_delta()).unwrap();
    let status = attempt.run().unwrap();

    assert_eq!(status, TransitionStatus::SkippedDueToLock);
    assert!(attempt.context().is_terminal());
    assert!(attempt.context().completed_at.is_some());
    assert!(attempt.context().action_history.is_empty());
    assert_eq!(
        sink.labels(),
        vec!["transition_starting", "lock_acquiring", "lock_acquire_failed"]
    );
    // The holder's lease is untouched
    assert!(backend.exists("order:9"));
}

#[test]
fn test_wait_strategy_blocks_until_the_holder_finishes() {
    let backend = Arc::new(MemoryLockBackend::new());
    let pausing = TransitionConfiguration::new()
        .with_action(PauseWith::new(serde_json::Value::Null))
        .with_action(ApplyDelta);
    let holder_engine = TransitionEngine::new(provider_for(pausing)).with_locking(
        backend.clone(),
        fixed_key("order:9"),
        LockSettings::default(),
    );
    let mut holder = holder_engine
        .transition(draft_state(), review_delta())
        .unwrap();
    assert_eq!(holder.run().unwrap(), TransitionStatus::Paused);

    let waiting = TransitionConfiguration::new().with_action(ApplyDelta);
    let waiter_engine = TransitionEngine::new(provider_for(waiting)).with_locking(
        backend.clone(),
        fixed_key("order:9"),
        LockSettings::default()
            .with_strategy(LockStrategy::Wait)
            .with_wait_timeout(Duration::from_secs(2))
            .with_poll_interval(Duration::from_millis(10)),
    );
    let mut waiter = waiter_engine
        .transition(draft_state(), review_delta())
        .unwrap();

    std::thread::scope(|scope| {
        scope.spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            holder.resume().unwrap();
        });
        assert_eq!(waiter.run().unwrap(), TransitionStatus::Completed);
    });
    assert!(!backend.exists("order:9"));
}

#[test]
fn test_one_key_admits_one_attempt_at_a_time() {
    let backend = Arc::new(MemoryLockBackend::new());
    let pausing = TransitionConfiguration::new()
        .with_action(PauseWith::new(serde_json::Value::Null))
        .with_action(ApplyDelta);
    let first_engine = TransitionEngine::new(provider_for(pausing)).with_locking(
        backend.clone(),
        fixed_key("order:9"),
        LockSettings::default(),
    );
    let second_engine = TransitionEngine::new(provider_for(
        TransitionConfiguration::new().with_action(ApplyDelta),
    ))
    .with_locking(backend.clone(), fixed_key("order:9"), LockSettings::default());

    let mut first = first_engine
        .transition(draft_state(), review_delta())
        .unwrap();
    assert_eq!(first.run().unwrap(), TransitionStatus::Paused);

    // While the first holds the key (even paused), the second cannot enter
    let mut second = second_engine
        .transition(draft_state(), review_delta())
        .unwrap();
    assert!(matches!(
        second.run().unwrap_err(),
        TransitionError::LockUnavailable { .. }
    ));

    assert_eq!(first.resume().unwrap(), TransitionStatus::Completed);

    // The key is free again; the same second attempt now goes through
    assert_eq!(second.run().unwrap(), TransitionStatus::Completed);
}

#[test]
fn test_file_backed_locks_exclude_across_engines() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pausing = TransitionConfiguration::new()
        .with_action(PauseWith::new(serde_json::Value::Null))
        .with_action(ApplyDelta);
    let first_engine = TransitionEngine::new(provider_for(pausing)).with_locking(
        Arc::new(FileLockBackend::new(dir.path()).expect("backend")),
        fixed_key("doc:1"),
        LockSettings::default(),
    );
    // A separate backend over the same directory, as a second process would open it
    let second_engine = TransitionEngine::new(provider_for(
        TransitionConfiguration::new().with_action(ApplyDelta),
    ))
    .with_locking(
        Arc::new(FileLockBackend::new(dir.path()).expect("backend")),
        fixed_key("doc:1"),
        LockSettings::default(),
    );

    let mut first = first_engine
        .transition(draft_state(), review_delta())
        .unwrap();
    assert_eq!(first.run().unwrap(), TransitionStatus::Paused);

    let mut second = second_engine
        .transition(draft_state(), review_delta())
        .unwrap();
    assert!(matches!(
        second.run().unwrap_err(),
        TransitionError::LockUnavailable { .. }
    ));

    assert_eq!(first.resume().unwrap(), TransitionStatus::Completed);
    assert_eq!(second.run().unwrap(), TransitionStatus::Completed);
}

// ---------------------------------------------------------------------------
// Event attribution and stepwise drive
// ---------------------------------------------------------------------------

#[test]
fn test_events_carry_their_transition_id() {
    let sink = Arc::new(MemorySink::new());
    let configuration = TransitionConfiguration::new()
        .with_gate(FieldEquals::new("status", "draft"))
        .with_action(ApplyDelta);
    let engine =
        TransitionEngine::new(provider_for(configuration)).with_event_sink(sink.clone());

    let mut first = engine.transition(draft_state(), review_delta()).unwrap();
    first.run().unwrap();
    let mut second = engine.transition(draft_state(), review_delta()).unwrap();
    second.run().unwrap();

    let first_id = first.context().id.clone();
    let second_id = second.context().id.clone();
    assert_ne!(first_id, second_id);

    for id in [&first_id, &second_id] {
        let labels: Vec<_> = sink
            .records()
            .iter()
            .filter(|record| record.transition_id == *id)
            .map(|record| record.kind.label())
            .collect();
        assert_eq!(
            labels,
            vec![
                "transition_starting",
                "gate_evaluating",
                "gate_evaluated",
                "action_executing",
                "action_executed",
                "transition_completed",
            ]
        );
    }
}

#[test]
fn test_stepwise_drive_through_the_engine() {
    let configuration = TransitionConfiguration::new()
        .with_gate(FieldEquals::new("status", "draft"))
        .with_action(SetFields::single("stage", "routed"))
        .with_action(ApplyDelta);
    let engine = TransitionEngine::new(provider_for(configuration));

    let mut attempt = engine.transition(draft_state(), review_delta()).unwrap();
    assert_eq!(attempt.run_gates().unwrap(), TransitionStatus::InProgress);
    assert_eq!(attempt.pending_actions(), 2);

    let step = attempt.run_next_action().unwrap();
    assert_eq!(
        step,
        Some(ActionStep::Executed {
            action: "SetFields".to_string(),
            signal: ExecutionSignal::Continue,
        })
    );
    assert_eq!(attempt.status(), TransitionStatus::InProgress);

    let step = attempt.run_next_action().unwrap();
    assert_eq!(
        step,
        Some(ActionStep::Executed {
            action: "ApplyDelta".to_string(),
            signal: ExecutionSignal::Continue,
        })
    );
    assert_eq!(attempt.status(), TransitionStatus::Completed);
    assert_eq!(attempt.run_next_action().unwrap(), None);
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    /// Every configured action runs exactly once, in configured order.
    #[test]
    fn actions_run_in_configured_order_exactly_once(count in 1usize..8) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut configuration = TransitionConfiguration::new();
        let mut expected = Vec::new();
        for i in 0..count {
            let name = format!("step_{i}");
            configuration = configuration.with_action(Recording::new(name.clone(), &log));
            expected.push(name);
        }

        let engine = TransitionEngine::new(provider_for(configuration));
        let mut attempt = engine.transition(draft_state(), review_delta()).unwrap();
        let status = attempt.run().unwrap();

        prop_assert_eq!(status, TransitionStatus::Completed);
        prop_assert_eq!(log.lock().unwrap().clone(), expected.clone());
        prop_assert_eq!(action_names(attempt.context()), expected);
    }

    /// Completing a transition folds every delta entry into the state
    /// and keeps fields the delta never mentioned.
    #[test]
    fn applied_delta_lands_in_the_final_state(
        base in prop::collection::btree_map("[a-j]{1,6}", "[a-z0-9]{1,8}", 1..5),
        changes in prop::collection::btree_map("[k-t]{1,6}", "[a-z0-9]{1,8}", 1..5),
    ) {
        let mut state = FlatState::new();
        for (field, value) in &base {
            state = state.set(field.clone(), value.clone());
        }
        let mut delta = Delta::new();
        for (field, value) in &changes {
            delta = delta.set(field.clone(), value.clone());
        }

        let configuration = TransitionConfiguration::new().with_action(ApplyDelta);
        let engine = TransitionEngine::new(provider_for(configuration));
        let mut attempt = engine.transition(state, delta).unwrap();
        attempt.run().unwrap();

        let mapping = attempt.context().state_mapping();
        for (field, value) in &changes {
            prop_assert_eq!(mapping.get(field), Some(&json!(value)));
        }
        for (field, value) in &base {
            prop_assert_eq!(mapping.get(field), Some(&json!(value)));
        }
    }

    /// A snapshot round trip through JSON loses nothing a resume needs.
    #[test]
    fn snapshot_round_trip_preserves_the_ledger(
        base in prop::collection::btree_map("[a-j]{1,6}", "[a-z0-9]{1,8}", 1..5),
        job in any::<u32>(),
    ) {
        let mut state = FlatState::new();
        for (field, value) in &base {
            state = state.set(field.clone(), value.clone());
        }

        let configuration = TransitionConfiguration::new()
            .with_action(SetFields::single("stage", "prepped"))
            .with_action(PauseWith::new(json!({ "job": job })))
            .with_action(ApplyDelta);
        let engine = TransitionEngine::new(provider_for(configuration));
        let mut attempt = engine
            .transition(state, Delta::new().set("status", "review"))
            .unwrap();
        prop_assert_eq!(attempt.run().unwrap(), TransitionStatus::Paused);
        let original = attempt.into_context();

        let stored = serde_json::to_string(&original.snapshot()).unwrap();
        let snapshot: ContextSnapshot = serde_json::from_str(&stored).unwrap();
        let restored = engine.from_snapshot(&snapshot, &FlatStateFactory).unwrap();
        let context = restored.context();

        prop_assert_eq!(&context.id, &original.id);
        prop_assert_eq!(context.status, original.status);
        prop_assert_eq!(context.state_mapping(), original.state_mapping());
        prop_assert_eq!(&context.delta, &original.delta);
        prop_assert_eq!(&context.gate_history, &original.gate_history);
        prop_assert_eq!(&context.action_history, &original.action_history);
        prop_assert_eq!(&context.skip_history, &original.skip_history);
        prop_assert_eq!(&context.lock, &original.lock);
        prop_assert_eq!(&context.outcome_metadata, &original.outcome_metadata);
        prop_assert_eq!(context.created_at, original.created_at);
        prop_assert_eq!(context.updated_at, original.updated_at);
        prop_assert_eq!(context.completed_at, original.completed_at);
    }
}
