//! Gates: the conditions a transition must satisfy before acting
//!
//! Gates are evaluated in declaration order against the current state
//! and the requested delta. They decide whether execution proceeds but
//! never change state themselves. A gate attached to a whole transition
//! halts everything on a non-allow verdict; a gate attached to a single
//! action only skips that action.

use crate::{BoxedError, Delta, EntityState};
use serde::{Deserialize, Serialize};

// ── Gate Result ──────────────────────────────────────────────────────

/// Verdict of a single gate evaluation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateResult {
    /// The transition may proceed
    Allow,
    /// The transition is refused
    Deny,
    /// The transition is refused because it would change nothing
    SkipIdempotent,
}

impl GateResult {
    /// Check whether this verdict lets execution proceed
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Check whether this verdict halts execution.
    ///
    /// `SkipIdempotent` halts exactly like `Deny`; the distinct variant
    /// only exists so history records can tell refusal from redundancy.
    pub fn halts(&self) -> bool {
        !self.is_allow()
    }

    /// Check whether this verdict flags a redundant transition
    pub fn is_skip_idempotent(&self) -> bool {
        matches!(self, Self::SkipIdempotent)
    }
}

impl std::fmt::Display for GateResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
            Self::SkipIdempotent => "skip_idempotent",
        };
        write!(f, "{}", label)
    }
}

// ── Gate Trait ───────────────────────────────────────────────────────

/// A condition evaluated against a state and a delta.
///
/// Evaluation must be side-effect free. Failures (as opposed to `Deny`
/// verdicts) propagate as errors and fail the whole transition.
pub trait Gate<S: EntityState>: Send + Sync {
    /// Stable identity of this gate, recorded in history
    fn name(&self) -> &str;

    /// Evaluate the gate against the current state and requested delta
    fn evaluate(&self, state: &S, delta: &Delta) -> Result<GateResult, BoxedError>;

    /// Optional human-readable explanation, recorded alongside the verdict
    fn message(&self) -> Option<String> {
        None
    }
}

// ── Ready-Made Gates ─────────────────────────────────────────────────

/// Gate that allows every transition
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAll;

impl<S: EntityState> Gate<S> for AllowAll {
    fn name(&self) -> &str {
        "AllowAll"
    }

    fn evaluate(&self, _state: &S, _delta: &Delta) -> Result<GateResult, BoxedError> {
        Ok(GateResult::Allow)
    }
}

/// Gate that denies every transition
#[derive(Clone, Debug, Default)]
pub struct DenyAll {
    message: Option<String>,
}

impl DenyAll {
    pub fn new() -> Self {
        Self { message: None }
    }

    /// Attach an explanation to the denial
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<S: EntityState> Gate<S> for DenyAll {
    fn name(&self) -> &str {
        "DenyAll"
    }

    fn evaluate(&self, _state: &S, _delta: &Delta) -> Result<GateResult, BoxedError> {
        Ok(GateResult::Deny)
    }

    fn message(&self) -> Option<String> {
        self.message.clone()
    }
}

/// Gate that allows only when a state field holds an expected value
#[derive(Clone, Debug)]
pub struct FieldEquals {
    field: String,
    expected: serde_json::Value,
}

impl FieldEquals {
    pub fn new(field: impl Into<String>, expected: impl Into<serde_json::Value>) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
        }
    }
}

impl<S: EntityState> Gate<S> for FieldEquals {
    fn name(&self) -> &str {
        "FieldEquals"
    }

    fn evaluate(&self, state: &S, _delta: &Delta) -> Result<GateResult, BoxedError> {
        let mapping = state.to_mapping();
        match mapping.get(&self.field) {
            Some(value) if *value == self.expected => Ok(GateResult::Allow),
            _ => Ok(GateResult::Deny),
        }
    }

    fn message(&self) -> Option<String> {
        Some(format!("field '{}' must equal {}", self.field, self.expected))
    }
}

/// Gate that skips transitions whose delta changes nothing.
///
/// Returns `SkipIdempotent` when the delta is empty or every field it
/// sets already holds the requested value in the current state. The
/// engine has no built-in idempotency handling; install this gate (or
/// a domain-specific equivalent) where redundant requests are expected.
#[derive(Clone, Copy, Debug, Default)]
pub struct SkipIfNoChange;

impl<S: EntityState> Gate<S> for SkipIfNoChange {
    fn name(&self) -> &str {
        "SkipIfNoChange"
    }

    fn evaluate(&self, state: &S, delta: &Delta) -> Result<GateResult, BoxedError> {
        let mapping = state.to_mapping();
        let redundant = delta
            .iter()
            .all(|(field, value)| mapping.get(field) == Some(value));
        if redundant {
            Ok(GateResult::SkipIdempotent)
        } else {
            Ok(GateResult::Allow)
        }
    }

    fn message(&self) -> Option<String> {
        Some("delta would not change the current state".to_string())
    }
}
