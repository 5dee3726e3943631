//! Lock policy and lock state: how a transition holds its mutex
//!
//! Locking is optional. When an engine is built with a lock backend,
//! every transition derives a key from its state and delta, acquires
//! the key under a TTL before gates run, and releases it when the
//! attempt finishes. A paused transition keeps its lock so the resumed
//! attempt still owns the key.

use crate::{Delta, EntityState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ── Lock State ───────────────────────────────────────────────────────

/// The lock a transition currently holds, if any
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LockState {
    /// Key the lock was acquired under
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// When the lock was acquired
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquired_at: Option<DateTime<Utc>>,
    /// TTL granted at acquisition or last renewal, in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl_secs: Option<u64>,
}

impl LockState {
    /// Lock state for a transition that holds nothing
    pub fn unlocked() -> Self {
        Self::default()
    }

    /// Lock state recorded at acquisition time
    pub fn acquired(key: impl Into<String>, ttl: Duration) -> Self {
        Self {
            key: Some(key.into()),
            acquired_at: Some(Utc::now()),
            ttl_secs: Some(ttl.as_secs()),
        }
    }

    /// Check whether a lock is currently recorded
    pub fn is_locked(&self) -> bool {
        self.key.is_some()
    }

    /// The held key, if any
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Record a successful renewal
    pub fn mark_renewed(&mut self, ttl: Duration) {
        self.ttl_secs = Some(ttl.as_secs());
    }

    /// Clear the lock after release
    pub fn clear(&mut self) {
        self.key = None;
        self.acquired_at = None;
        self.ttl_secs = None;
    }
}

// ── Lock Strategy ────────────────────────────────────────────────────

/// What to do when the lock for a transition's key is already held
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockStrategy {
    /// Do not lock at all, even with a backend configured
    None,
    /// Give up immediately with a lock-unavailable error
    #[default]
    FailFast,
    /// Retry at a fixed interval until acquired or the wait times out
    Wait,
    /// Finish the transition as skipped, without an error
    Skip,
}

// ── Lock Settings ────────────────────────────────────────────────────

/// Locking policy for an engine: strategy, TTL, and wait tuning
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LockSettings {
    /// Behavior on contention
    pub strategy: LockStrategy,
    /// TTL granted at acquisition; expired locks are claimable by others
    pub ttl: Duration,
    /// Total time the `Wait` strategy keeps retrying
    pub wait_timeout: Duration,
    /// Interval between retries under the `Wait` strategy
    pub poll_interval: Duration,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            strategy: LockStrategy::FailFast,
            ttl: Duration::from_secs(30),
            wait_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl LockSettings {
    pub fn with_strategy(mut self, strategy: LockStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_wait_timeout(mut self, wait_timeout: Duration) -> Self {
        self.wait_timeout = wait_timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

// ── Lock Key Provider ────────────────────────────────────────────────

/// Derives the mutual-exclusion key for a transition.
///
/// Attempts whose providers return the same key exclude each other.
/// A typical provider combines an entity type and its identifier,
/// e.g. `order:42`.
pub trait LockKeyProvider<S: EntityState>: Send + Sync {
    /// Derive the key for this state and delta
    fn key_for(&self, state: &S, delta: &Delta) -> String;
}

impl<S, F> LockKeyProvider<S> for F
where
    S: EntityState,
    F: Fn(&S, &Delta) -> String + Send + Sync,
{
    fn key_for(&self, state: &S, delta: &Delta) -> String {
        self(state, delta)
    }
}
