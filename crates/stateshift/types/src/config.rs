//! Transition configurations: which gates and actions a transition runs
//!
//! A configuration is resolved fresh for every attempt by a
//! [`ConfigurationProvider`], so the rules can depend on the current
//! state and the requested delta. Ordering is meaningful: gates are
//! evaluated and actions executed exactly in declaration order.

use crate::{Action, BoxedError, Delta, EntityState, Gate, TransitionError, TransitionResult};
use std::collections::HashMap;
use std::sync::Arc;

// ── Transition Configuration ─────────────────────────────────────────

/// Ordered gates and actions for one transition
#[derive(Clone)]
pub struct TransitionConfiguration<S: EntityState> {
    /// Gates evaluated before any action runs, in order
    pub gates: Vec<Arc<dyn Gate<S>>>,
    /// Actions executed sequentially after all gates allow, in order
    pub actions: Vec<Arc<dyn Action<S>>>,
}

impl<S: EntityState> TransitionConfiguration<S> {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self {
            gates: Vec::new(),
            actions: Vec::new(),
        }
    }

    /// Build from already-shared gates and actions
    pub fn from_parts(gates: Vec<Arc<dyn Gate<S>>>, actions: Vec<Arc<dyn Action<S>>>) -> Self {
        Self { gates, actions }
    }

    /// Append a gate
    pub fn with_gate(mut self, gate: impl Gate<S> + 'static) -> Self {
        self.gates.push(Arc::new(gate));
        self
    }

    /// Append an action
    pub fn with_action(mut self, action: impl Action<S> + 'static) -> Self {
        self.actions.push(Arc::new(action));
        self
    }

    /// Identities of all gates, in order
    pub fn gate_names(&self) -> Vec<&str> {
        self.gates.iter().map(|g| g.name()).collect()
    }

    /// Identities of all actions, in order
    pub fn action_names(&self) -> Vec<&str> {
        self.actions.iter().map(|a| a.name()).collect()
    }

    /// Check whether the configuration has neither gates nor actions.
    ///
    /// Empty configurations are legal: the transition completes
    /// vacuously.
    pub fn is_empty(&self) -> bool {
        self.gates.is_empty() && self.actions.is_empty()
    }
}

impl<S: EntityState> Default for TransitionConfiguration<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: EntityState> std::fmt::Debug for TransitionConfiguration<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionConfiguration")
            .field("gates", &self.gate_names())
            .field("actions", &self.action_names())
            .finish()
    }
}

// ── Configuration Provider ───────────────────────────────────────────

/// Resolves the configuration for a transition attempt.
///
/// Called once per attempt, before any lock is taken. Plain closures
/// of `(&state, &delta) -> TransitionConfiguration` implement this
/// trait; implement it by hand when resolution itself can fail.
pub trait ConfigurationProvider<S: EntityState>: Send + Sync {
    /// Resolve the gates and actions for this state and delta
    fn provide(&self, state: &S, delta: &Delta)
        -> Result<TransitionConfiguration<S>, BoxedError>;
}

impl<S, F> ConfigurationProvider<S> for F
where
    S: EntityState,
    F: Fn(&S, &Delta) -> TransitionConfiguration<S> + Send + Sync,
{
    fn provide(
        &self,
        state: &S,
        delta: &Delta,
    ) -> Result<TransitionConfiguration<S>, BoxedError> {
        Ok(self(state, delta))
    }
}

// ── Action Registry ──────────────────────────────────────────────────

/// Actions registered by name, for assembling configurations from data.
///
/// Providers that read their rules from configuration files hold the
/// actual action instances here and look them up by identity.
pub struct ActionRegistry<S: EntityState> {
    actions: HashMap<String, Arc<dyn Action<S>>>,
}

impl<S: EntityState> ActionRegistry<S> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
        }
    }

    /// Register an action under its own name, replacing any previous entry
    pub fn register(&mut self, action: impl Action<S> + 'static) {
        let action: Arc<dyn Action<S>> = Arc::new(action);
        self.actions.insert(action.name().to_string(), action);
    }

    /// Look up an action by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Action<S>>> {
        self.actions.get(name).cloned()
    }

    /// Check whether a name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Number of registered actions
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Check whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// All registered names, unordered
    pub fn names(&self) -> Vec<&str> {
        self.actions.keys().map(|k| k.as_str()).collect()
    }

    /// Resolve a list of names into action instances, in the given order
    pub fn resolve(&self, names: &[&str]) -> TransitionResult<Vec<Arc<dyn Action<S>>>> {
        names
            .iter()
            .map(|name| {
                self.get(name).ok_or_else(|| TransitionError::UnknownAction {
                    action: name.to_string(),
                })
            })
            .collect()
    }

    /// Assemble a configuration from action names; gates are added by the caller
    pub fn assemble(&self, names: &[&str]) -> TransitionResult<TransitionConfiguration<S>> {
        Ok(TransitionConfiguration::from_parts(
            Vec::new(),
            self.resolve(names)?,
        ))
    }
}

impl<S: EntityState> Default for ActionRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: EntityState> std::fmt::Debug for ActionRegistry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.names())
            .finish()
    }
}
