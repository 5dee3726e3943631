//! Entity states and deltas: the inputs every transition starts from
//!
//! A transition takes a current state plus a delta (the fields the
//! caller wants changed) and runs gates and actions against the pair.
//! The engine never reaches into domain objects directly; it sees them
//! through the [`EntityState`] trait, which projects any state into a
//! flat field mapping and applies deltas immutably.

use crate::BoxedError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Flat projection of an entity state: field name to JSON value
pub type StateMapping = HashMap<String, Value>;

// ── Entity State ─────────────────────────────────────────────────────

/// A domain state the engine can transition.
///
/// Implementations stay immutable from the engine's point of view:
/// [`with_changes`](EntityState::with_changes) returns a new instance
/// and must never mutate the receiver. The mapping produced by
/// [`to_mapping`](EntityState::to_mapping) is what gets persisted in
/// history records and snapshots, so it should cover every field a
/// gate might inspect.
pub trait EntityState: Clone + std::fmt::Debug + Send + Sync + 'static {
    /// Project this state into a flat field mapping
    fn to_mapping(&self) -> StateMapping;

    /// Return a new state with the delta applied over this one
    fn with_changes(&self, changes: &Delta) -> Self;
}

// ── Delta ────────────────────────────────────────────────────────────

/// The partial mapping of fields a transition wants to change
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Delta(pub StateMapping);

impl Delta {
    /// Create an empty delta
    pub fn new() -> Self {
        Self(StateMapping::new())
    }

    /// Set a field, consuming and returning the delta
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Look up a field by name
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Check whether a field is present
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Iterate over the changed fields
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Number of changed fields
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check whether the delta changes nothing
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume the delta, yielding the underlying mapping
    pub fn into_mapping(self) -> StateMapping {
        self.0
    }
}

impl From<StateMapping> for Delta {
    fn from(mapping: StateMapping) -> Self {
        Self(mapping)
    }
}

impl FromIterator<(String, Value)> for Delta {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ── Flat State ───────────────────────────────────────────────────────

/// Ready-made state backed by a plain field mapping.
///
/// Useful for tests and for callers whose entities are already
/// map-shaped. Domain crates with richer types implement
/// [`EntityState`] on their own structs instead.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FlatState(pub StateMapping);

impl FlatState {
    /// Create an empty state
    pub fn new() -> Self {
        Self(StateMapping::new())
    }

    /// Create a state from an existing mapping
    pub fn from_mapping(mapping: StateMapping) -> Self {
        Self(mapping)
    }

    /// Set a field, consuming and returning the state
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Look up a field by name
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }
}

impl EntityState for FlatState {
    fn to_mapping(&self) -> StateMapping {
        self.0.clone()
    }

    fn with_changes(&self, changes: &Delta) -> Self {
        let mut next = self.0.clone();
        for (field, value) in changes.iter() {
            next.insert(field.clone(), value.clone());
        }
        Self(next)
    }
}

// ── State Factory ────────────────────────────────────────────────────

/// Rebuilds a typed state from the flat mapping stored in a snapshot.
///
/// Snapshots carry states in mapping form so they stay serializable
/// regardless of the domain type. Resuming a paused transition needs
/// the reverse direction, which only the caller can provide.
pub trait StateFactory<S: EntityState>: Send + Sync {
    /// Reconstruct a state from its flat mapping
    fn from_mapping(&self, mapping: &StateMapping) -> Result<S, BoxedError>;
}

impl<S, F> StateFactory<S> for F
where
    S: EntityState,
    F: Fn(&StateMapping) -> Result<S, BoxedError> + Send + Sync,
{
    fn from_mapping(&self, mapping: &StateMapping) -> Result<S, BoxedError> {
        self(mapping)
    }
}

/// Factory for [`FlatState`]: the mapping is the state
#[derive(Clone, Copy, Debug, Default)]
pub struct FlatStateFactory;

impl StateFactory<FlatState> for FlatStateFactory {
    fn from_mapping(&self, mapping: &StateMapping) -> Result<FlatState, BoxedError> {
        Ok(FlatState::from_mapping(mapping.clone()))
    }
}
