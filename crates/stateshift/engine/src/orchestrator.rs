//! Transition orchestration: one attempt, driven phase by phase
//!
//! The orchestrator owns the context for one transition attempt and
//! drives it through its phases: acquire the lock, evaluate the
//! transition gates, execute the actions in order, finish. Callers
//! choose the granularity: [`run`](TransitionOrchestrator::run) drives
//! everything, [`run_gates`](TransitionOrchestrator::run_gates) stops
//! after the gate phase, and
//! [`run_next_action`](TransitionOrchestrator::run_next_action)
//! advances one action at a time. All three follow the same rules;
//! the entry points only decide where to hand control back.
//!
//! A paused orchestrator keeps its lock. Resuming verifies the lock
//! is still owned, then continues with the first action the ledger
//! has not consumed yet.

use crate::{
    ActionDisposition, ActionRunner, EventEmitter, GateEvaluator, LockAcquisition, LockBinding,
};
use serde_json::Value;
use stateshift_types::{
    EntityState, EventKind, ExecutionSignal, GateResult, TransitionConfiguration,
    TransitionContext, TransitionError, TransitionResult, TransitionStatus,
};
use std::time::Duration;

// ── Phase ────────────────────────────────────────────────────────────

/// Where the orchestrator is in one attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Nothing has run yet
    Initializing,
    /// The lock is being acquired
    LockAcquisition,
    /// Transition gates are being evaluated
    GateEvaluation,
    /// Actions are executing sequentially
    ActionExecution,
    /// The attempt is inert: terminal, or paused awaiting resume
    Finished,
}

// ── Action Step ──────────────────────────────────────────────────────

/// What one call to `run_next_action` did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionStep {
    /// An action executed and returned a signal
    Executed {
        action: String,
        signal: ExecutionSignal,
    },
    /// An action's guard refused; the action was skipped
    Skipped { action: String, reason: GateResult },
}

// ── Orchestrator ─────────────────────────────────────────────────────

/// Drives one transition attempt against its configuration
#[derive(Debug)]
pub struct TransitionOrchestrator<S: EntityState> {
    /// The ledger of this attempt
    context: TransitionContext<S>,
    /// Gates and actions, in order
    configuration: TransitionConfiguration<S>,
    /// The lock this attempt acquires, when the engine locks at all
    lock: Option<LockBinding>,
    /// Event dispatch
    emitter: EventEmitter,
    /// Gate evaluation
    gates: GateEvaluator,
    /// Action execution
    actions: ActionRunner,
    /// Current phase
    phase: Phase,
    /// Index of the next action to run
    next_action: usize,
}

impl<S: EntityState> TransitionOrchestrator<S> {
    /// Bind a context to its configuration and lock.
    ///
    /// Fresh contexts start at the beginning; anything else (a paused
    /// context being rebound, or a terminal one) starts inert.
    pub(crate) fn new(
        context: TransitionContext<S>,
        configuration: TransitionConfiguration<S>,
        lock: Option<LockBinding>,
        emitter: EventEmitter,
    ) -> Self {
        let phase = match context.status {
            TransitionStatus::InProgress => Phase::Initializing,
            _ => Phase::Finished,
        };
        let next_action = context.actions_consumed();
        Self {
            context,
            configuration,
            lock,
            emitter,
            gates: GateEvaluator::new(),
            actions: ActionRunner::new(),
            phase,
            next_action,
        }
    }

    // ── Entry points ─────────────────────────────────────────────────

    /// Drive the attempt to completion, pause, or stop.
    ///
    /// Returns the resulting status. Lock contention under the
    /// fail-fast and wait strategies surfaces as an error and leaves
    /// the context untouched, so the caller may retry the same call
    /// later. A paused transition is not resumed by `run`; that is
    /// what [`resume`](Self::resume) is for.
    pub fn run(&mut self) -> TransitionResult<TransitionStatus> {
        if self.advance_to_actions()? {
            while self.phase == Phase::ActionExecution {
                self.step_action()?;
            }
        }
        Ok(self.context.status)
    }

    /// Run the lock and gate phases without executing any action.
    ///
    /// Afterwards the status tells the story: still in progress means
    /// every gate allowed and actions are ready to run; stopped means
    /// a gate refused; skipped-due-to-lock means contention under the
    /// skip strategy.
    pub fn run_gates(&mut self) -> TransitionResult<TransitionStatus> {
        self.advance_to_actions()?;
        Ok(self.context.status)
    }

    /// Advance by exactly one action (running lock and gate phases
    /// first if they have not run yet).
    ///
    /// Returns what the step did, or `None` when there was nothing
    /// left to do; completing the final action also finishes the
    /// transition within the same call.
    pub fn run_next_action(&mut self) -> TransitionResult<Option<ActionStep>> {
        if !self.advance_to_actions()? {
            return Ok(None);
        }
        self.step_action()
    }

    /// Resume a paused transition and drive it to its next rest.
    ///
    /// Verifies lock ownership first: if the key has expired or been
    /// claimed by someone else, this fails with
    /// [`TransitionError::LockLost`] and the context stays paused.
    /// Execution continues with the first action not yet consumed by
    /// the ledger; actions that already ran are never replayed.
    pub fn resume(&mut self) -> TransitionResult<TransitionStatus> {
        if self.context.status != TransitionStatus::Paused {
            return Err(TransitionError::NotPaused {
                status: self.context.status,
            });
        }
        if let Some(binding) = &self.lock {
            binding.verify(&self.context.id, &self.context.lock, &self.emitter)?;
        }

        self.context.resume();
        self.next_action = self.context.actions_consumed();
        self.phase = Phase::ActionExecution;
        tracing::info!(
            transition_id = %self.context.id,
            next_action = self.next_action,
            "Transition resumed"
        );

        while self.phase == Phase::ActionExecution {
            self.step_action()?;
        }
        Ok(self.context.status)
    }

    /// Extend the held lock's TTL, e.g. from a long-running action's
    /// caller between steps. Returns false when no lock is held or the
    /// backend refused.
    pub fn renew_lock(&mut self, ttl: Duration) -> bool {
        let Some(binding) = &self.lock else {
            return false;
        };
        if !self.context.lock.is_locked() {
            return false;
        }
        if binding.renew(&self.context.id, &self.context.lock, ttl) {
            self.context.lock_renewed(ttl);
            true
        } else {
            false
        }
    }

    // ── Observation ──────────────────────────────────────────────────

    /// The ledger of this attempt
    pub fn context(&self) -> &TransitionContext<S> {
        &self.context
    }

    /// Take the ledger out of the orchestrator
    pub fn into_context(self) -> TransitionContext<S> {
        self.context
    }

    /// Current lifecycle status
    pub fn status(&self) -> TransitionStatus {
        self.context.status
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The configuration this attempt runs
    pub fn configuration(&self) -> &TransitionConfiguration<S> {
        &self.configuration
    }

    /// Actions not yet consumed
    pub fn pending_actions(&self) -> usize {
        self.configuration
            .actions
            .len()
            .saturating_sub(self.next_action)
    }

    /// The key this attempt locks under, if locking is configured
    pub fn lock_key(&self) -> Option<&str> {
        self.lock.as_ref().map(|binding| binding.key())
    }

    // ── Phase drivers ────────────────────────────────────────────────

    /// Bring the attempt to the action phase. Returns whether actions
    /// may run; false means the attempt halted (or had already
    /// finished) along the way.
    fn advance_to_actions(&mut self) -> TransitionResult<bool> {
        if !self.ensure_lock()? {
            return Ok(false);
        }
        if self.phase != Phase::GateEvaluation {
            return Ok(self.phase == Phase::ActionExecution);
        }

        let gates = self.configuration.gates.clone();
        for gate in gates {
            self.emitter.emit(
                &self.context.id,
                EventKind::GateEvaluating {
                    gate: gate.name().to_string(),
                },
            );
            let evaluated = self.gates.evaluate(
                gate.as_ref(),
                &self.context.current_state,
                &self.context.delta,
                false,
            );
            let (result, record) = match evaluated {
                Ok(pair) => pair,
                Err(err) => return Err(self.fail_with(err)),
            };
            self.context.record_gate(record);
            self.emitter.emit(
                &self.context.id,
                EventKind::GateEvaluated {
                    gate: gate.name().to_string(),
                    result,
                },
            );
            if result.halts() {
                self.halt_on_gate(gate.name(), result);
                return Ok(false);
            }
        }

        self.phase = Phase::ActionExecution;
        Ok(true)
    }

    /// Emit the starting event and acquire the lock if one is
    /// configured. Returns whether the attempt may continue.
    fn ensure_lock(&mut self) -> TransitionResult<bool> {
        if self.phase == Phase::Initializing {
            self.emitter
                .emit(&self.context.id, EventKind::TransitionStarting);
            tracing::info!(
                transition_id = %self.context.id,
                gates = self.configuration.gates.len(),
                actions = self.configuration.actions.len(),
                "Transition starting"
            );
            self.phase = Phase::LockAcquisition;
        }
        if self.phase != Phase::LockAcquisition {
            return Ok(true);
        }

        let Some(binding) = &self.lock else {
            self.phase = Phase::GateEvaluation;
            return Ok(true);
        };

        // Contention errors propagate without touching the context:
        // the attempt has not started, and the caller may retry.
        match binding.acquire(&self.context.id, &self.emitter)? {
            LockAcquisition::Acquired { key, ttl } => {
                self.context.lock_acquired(key, ttl);
                self.phase = Phase::GateEvaluation;
                Ok(true)
            }
            LockAcquisition::NotRequired => {
                self.phase = Phase::GateEvaluation;
                Ok(true)
            }
            LockAcquisition::Skipped { key } => {
                self.context.skip_due_to_lock();
                tracing::info!(
                    transition_id = %self.context.id,
                    key = %key,
                    "Transition skipped: lock contended"
                );
                self.phase = Phase::Finished;
                Ok(false)
            }
        }
    }

    /// Run the next action, if any. Consuming the last action (by
    /// execution or skip) completes the transition in the same call.
    fn step_action(&mut self) -> TransitionResult<Option<ActionStep>> {
        if self.phase != Phase::ActionExecution {
            return Ok(None);
        }
        let total = self.configuration.actions.len();
        if self.next_action >= total {
            self.finish_completed();
            return Ok(None);
        }

        let action = self.configuration.actions[self.next_action].clone();
        let disposition = match self.actions.run(action.as_ref(), &self.context, &self.emitter) {
            Ok(disposition) => disposition,
            Err(err) => return Err(self.fail_with(err)),
        };

        let step = match disposition {
            ActionDisposition::Skipped {
                guard_record,
                skip_record,
            } => {
                self.context.record_gate(guard_record);
                let step = ActionStep::Skipped {
                    action: skip_record.action.clone(),
                    reason: skip_record.reason,
                };
                self.context.record_skip(skip_record);
                self.next_action += 1;
                if self.next_action >= total {
                    self.finish_completed();
                }
                step
            }
            ActionDisposition::Executed {
                guard_record,
                record,
                outcome,
            } => {
                if let Some(guard_record) = guard_record {
                    self.context.record_gate(guard_record);
                }
                // Replacement state lands before the record does, so
                // the ledger never gets ahead of the state.
                if let Some(state) = outcome.replacement_state {
                    self.context.replace_state(state);
                }
                let step = ActionStep::Executed {
                    action: record.action.clone(),
                    signal: record.signal,
                };
                self.context.record_action(record);
                self.next_action += 1;
                match outcome.signal {
                    ExecutionSignal::Continue => {
                        if self.next_action >= total {
                            self.finish_completed();
                        }
                    }
                    ExecutionSignal::Pause => self.finish_paused(as_metadata(outcome.metadata)),
                    ExecutionSignal::Stop => self.finish_stopped(as_metadata(outcome.metadata)),
                }
                step
            }
        };
        Ok(Some(step))
    }

    // ── Finishers ────────────────────────────────────────────────────

    fn finish_completed(&mut self) {
        self.release_lock();
        self.context.complete();
        self.emitter
            .emit(&self.context.id, EventKind::TransitionCompleted);
        tracing::info!(
            transition_id = %self.context.id,
            executed = self.context.action_history.len(),
            skipped = self.context.skip_history.len(),
            "Transition completed"
        );
        self.phase = Phase::Finished;
    }

    /// Pausing keeps the lock: the resumed attempt must still own it.
    fn finish_paused(&mut self, metadata: Option<Value>) {
        self.context.pause(metadata);
        self.emitter
            .emit(&self.context.id, EventKind::TransitionPaused);
        tracing::info!(
            transition_id = %self.context.id,
            consumed = self.context.actions_consumed(),
            "Transition paused"
        );
        self.phase = Phase::Finished;
    }

    fn finish_stopped(&mut self, metadata: Option<Value>) {
        self.release_lock();
        self.context.stop(metadata);
        self.emitter
            .emit(&self.context.id, EventKind::TransitionStopped);
        tracing::info!(transition_id = %self.context.id, "Transition stopped by action");
        self.phase = Phase::Finished;
    }

    fn halt_on_gate(&mut self, gate: &str, result: GateResult) {
        self.release_lock();
        self.context.stop(None);
        self.emitter
            .emit(&self.context.id, EventKind::TransitionStopped);
        tracing::info!(
            transition_id = %self.context.id,
            gate,
            result = %result,
            "Transition stopped by gate"
        );
        self.phase = Phase::Finished;
    }

    fn fail_with(&mut self, err: TransitionError) -> TransitionError {
        self.release_lock();
        self.context.fail();
        self.emitter
            .emit(&self.context.id, EventKind::TransitionFailed);
        tracing::error!(
            transition_id = %self.context.id,
            error = %err,
            "Transition failed"
        );
        self.phase = Phase::Finished;
        err
    }

    fn release_lock(&mut self) {
        let Some(binding) = &self.lock else {
            return;
        };
        if self.context.lock.is_locked() {
            binding.release(&self.context.id, &self.context.lock, &self.emitter);
            self.context.lock_released();
        }
    }
}

/// Null metadata stays out of the context entirely
fn as_metadata(metadata: Value) -> Option<Value> {
    if metadata.is_null() {
        None
    } else {
        Some(metadata)
    }
}
