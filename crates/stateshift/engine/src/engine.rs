//! The transition engine: configuration, locking, and entry points
//!
//! [`TransitionEngine`] is the long-lived object an application builds
//! once and reuses for every transition. It holds the configuration
//! provider (which gates and actions apply to a given state and
//! delta), the optional lock backend with its key provider and
//! settings, and the event sink. Each call to
//! [`transition`](TransitionEngine::transition) produces a fresh
//! [`TransitionOrchestrator`] that the caller then drives; the
//! `from_*` entry points rebind paused work, from a live context or
//! from a snapshot that crossed a process boundary.

use crate::{EventEmitter, LockBinding, LockCoordinator, TransitionOrchestrator};
use stateshift_locks::LockBackend;
use stateshift_types::{
    ConfigurationProvider, ContextSnapshot, Delta, EntityState, EventSink, LockKeyProvider,
    LockSettings, NullSink, StateFactory, TransitionConfiguration, TransitionContext,
    TransitionError, TransitionResult, TransitionStatus,
};
use std::sync::Arc;

// ── Engine ───────────────────────────────────────────────────────────

/// Entry point for running transitions over states of type `S`
pub struct TransitionEngine<S: EntityState> {
    /// Resolves which gates and actions apply to a state and delta
    provider: Arc<dyn ConfigurationProvider<S>>,
    /// Lock backend, key derivation, and strategy; `None` runs unlocked
    locking: Option<LockingConfig<S>>,
    /// Receives every observability event
    sink: Arc<dyn EventSink>,
}

struct LockingConfig<S: EntityState> {
    backend: Arc<dyn LockBackend>,
    keys: Arc<dyn LockKeyProvider<S>>,
    settings: LockSettings,
}

impl<S: EntityState> TransitionEngine<S> {
    /// Build an engine around a configuration provider.
    ///
    /// Locking is off and events go nowhere until
    /// [`with_locking`](Self::with_locking) and
    /// [`with_event_sink`](Self::with_event_sink) say otherwise.
    pub fn new(provider: impl ConfigurationProvider<S> + 'static) -> Self {
        Self {
            provider: Arc::new(provider),
            locking: None,
            sink: Arc::new(NullSink),
        }
    }

    /// Enable locking: keys come from the key provider, leases live in
    /// the backend, and the settings pick the contention strategy.
    pub fn with_locking(
        mut self,
        backend: Arc<dyn LockBackend>,
        keys: impl LockKeyProvider<S> + 'static,
        settings: LockSettings,
    ) -> Self {
        self.locking = Some(LockingConfig {
            backend,
            keys: Arc::new(keys),
            settings,
        });
        self
    }

    /// Send observability events to a sink
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    // ── Entry points ─────────────────────────────────────────────────

    /// Start a transition: resolve the configuration for this state
    /// and delta and hand back an orchestrator ready to run.
    ///
    /// Nothing executes here. The lock is acquired and the first event
    /// fires when the caller drives the orchestrator.
    pub fn transition(
        &self,
        state: S,
        delta: Delta,
    ) -> TransitionResult<TransitionOrchestrator<S>> {
        let configuration = self
            .provider
            .provide(&state, &delta)
            .map_err(|source| TransitionError::Configuration { source })?;
        let lock = self.binding_for(&state, &delta);
        let context = TransitionContext::new(state, delta);
        tracing::debug!(
            transition_id = %context.id,
            gates = configuration.gates.len(),
            actions = configuration.actions.len(),
            locked = lock.is_some(),
            "Transition prepared"
        );
        Ok(TransitionOrchestrator::new(
            context,
            configuration,
            lock,
            self.emitter(),
        ))
    }

    /// Rebind a paused context so it can be resumed.
    ///
    /// The configuration is resolved again from the context's current
    /// state and delta; the lock binding targets the key recorded in
    /// the context. The context is cloned, so the caller keeps theirs
    /// if this fails.
    pub fn from_context(
        &self,
        context: &TransitionContext<S>,
    ) -> TransitionResult<TransitionOrchestrator<S>> {
        Self::ensure_resumable(context)?;
        let configuration = self
            .provider
            .provide(&context.current_state, &context.delta)
            .map_err(|source| TransitionError::Configuration { source })?;
        Ok(self.rebind(context.clone(), configuration))
    }

    /// Rebind a paused context with an explicit configuration,
    /// bypassing the provider. The action list must line up with the
    /// one the context was paused under, or resume will pick up at the
    /// wrong step.
    pub fn from_context_with(
        &self,
        context: &TransitionContext<S>,
        configuration: TransitionConfiguration<S>,
    ) -> TransitionResult<TransitionOrchestrator<S>> {
        Self::ensure_resumable(context)?;
        Ok(self.rebind(context.clone(), configuration))
    }

    /// Restore a snapshot into a context and rebind it for resume.
    /// The factory rebuilds the domain state from its stored mapping.
    pub fn from_snapshot(
        &self,
        snapshot: &ContextSnapshot,
        states: &dyn StateFactory<S>,
    ) -> TransitionResult<TransitionOrchestrator<S>> {
        let context = TransitionContext::restore(snapshot, states)?;
        Self::ensure_resumable(&context)?;
        let configuration = self
            .provider
            .provide(&context.current_state, &context.delta)
            .map_err(|source| TransitionError::Configuration { source })?;
        Ok(self.rebind(context, configuration))
    }

    /// Restore a snapshot and rebind it with an explicit configuration
    pub fn from_snapshot_with(
        &self,
        snapshot: &ContextSnapshot,
        states: &dyn StateFactory<S>,
        configuration: TransitionConfiguration<S>,
    ) -> TransitionResult<TransitionOrchestrator<S>> {
        let context = TransitionContext::restore(snapshot, states)?;
        Self::ensure_resumable(&context)?;
        Ok(self.rebind(context, configuration))
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn emitter(&self) -> EventEmitter {
        EventEmitter::new(self.sink.clone())
    }

    fn rebind(
        &self,
        context: TransitionContext<S>,
        configuration: TransitionConfiguration<S>,
    ) -> TransitionOrchestrator<S> {
        let lock = self.binding_for_resume(&context);
        tracing::debug!(
            transition_id = %context.id,
            consumed = context.actions_consumed(),
            "Transition rebound"
        );
        TransitionOrchestrator::new(context, configuration, lock, self.emitter())
    }

    fn binding_for(&self, state: &S, delta: &Delta) -> Option<LockBinding> {
        let locking = self.locking.as_ref()?;
        let key = locking.keys.key_for(state, delta);
        Some(LockBinding::new(
            LockCoordinator::new(locking.backend.clone(), locking.settings.clone()),
            key,
        ))
    }

    /// A resumed attempt must target the key it paused under; the key
    /// provider is only consulted when the context never locked.
    fn binding_for_resume(&self, context: &TransitionContext<S>) -> Option<LockBinding> {
        let locking = self.locking.as_ref()?;
        let key = match context.lock.key() {
            Some(key) => key.to_string(),
            None => locking.keys.key_for(&context.current_state, &context.delta),
        };
        Some(LockBinding::new(
            LockCoordinator::new(locking.backend.clone(), locking.settings.clone()),
            key,
        ))
    }

    fn ensure_resumable(context: &TransitionContext<S>) -> TransitionResult<()> {
        match context.status {
            TransitionStatus::Paused => Ok(()),
            TransitionStatus::InProgress => Err(TransitionError::NotPaused {
                status: context.status,
            }),
            status => Err(TransitionError::AlreadyTerminal { status }),
        }
    }
}

impl<S: EntityState> Clone for TransitionEngine<S> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            locking: self.locking.clone(),
            sink: self.sink.clone(),
        }
    }
}

impl<S: EntityState> Clone for LockingConfig<S> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            keys: self.keys.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl<S: EntityState> std::fmt::Debug for TransitionEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionEngine")
            .field("locking", &self.locking.is_some())
            .finish_non_exhaustive()
    }
}
