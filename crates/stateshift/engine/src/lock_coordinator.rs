//! Lock coordination
//!
//! Translates backend booleans into engine outcomes under the
//! configured strategy: an acquisition either succeeds, waits and
//! retries, skips the transition, or fails the call. The coordinator
//! also verifies retained ownership when a paused transition resumes,
//! and emits every lock event.

use crate::EventEmitter;
use stateshift_locks::LockBackend;
use stateshift_types::{
    EventKind, LockSettings, LockState, LockStrategy, TransitionError, TransitionId,
    TransitionResult,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

// ── Acquisition Outcome ──────────────────────────────────────────────

/// How an acquisition attempt ended, for outcomes that are not errors
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LockAcquisition {
    /// The lock is held; the transition may proceed
    Acquired { key: String, ttl: Duration },
    /// Locking is disabled by strategy; proceed without a lock
    NotRequired,
    /// The key was contended under the skip strategy; do not proceed
    Skipped { key: String },
}

// ── Lock Coordinator ─────────────────────────────────────────────────

/// Applies the locking policy to one backend
#[derive(Clone)]
pub struct LockCoordinator {
    backend: Arc<dyn LockBackend>,
    settings: LockSettings,
}

impl LockCoordinator {
    pub fn new(backend: Arc<dyn LockBackend>, settings: LockSettings) -> Self {
        Self { backend, settings }
    }

    pub fn settings(&self) -> &LockSettings {
        &self.settings
    }

    /// Acquire the key under the configured strategy.
    ///
    /// `FailFast` turns contention into [`TransitionError::LockUnavailable`];
    /// `Wait` retries at the poll interval until the wait timeout, then
    /// fails the same way; `Skip` reports contention as a non-error so
    /// the transition can finish as skipped.
    pub fn acquire(
        &self,
        transition_id: &TransitionId,
        key: &str,
        emitter: &EventEmitter,
    ) -> TransitionResult<LockAcquisition> {
        if self.settings.strategy == LockStrategy::None {
            return Ok(LockAcquisition::NotRequired);
        }

        let ttl = self.settings.ttl;
        emitter.emit(
            transition_id,
            EventKind::LockAcquiring {
                key: key.to_string(),
            },
        );

        if self.backend.acquire(key, ttl) {
            return Ok(self.acquired(transition_id, key, ttl, emitter));
        }

        match self.settings.strategy {
            LockStrategy::Wait => self.wait_for(transition_id, key, ttl, emitter),
            LockStrategy::Skip => {
                self.contended(transition_id, key, emitter);
                Ok(LockAcquisition::Skipped {
                    key: key.to_string(),
                })
            }
            // FailFast; None returned early above
            _ => {
                self.contended(transition_id, key, emitter);
                Err(TransitionError::LockUnavailable {
                    key: key.to_string(),
                })
            }
        }
    }

    /// Verify a resuming transition still owns its recorded key.
    ///
    /// A transition paused without a lock (no backend, or the `None`
    /// strategy) verifies vacuously.
    pub fn verify(
        &self,
        transition_id: &TransitionId,
        lock: &LockState,
        emitter: &EventEmitter,
    ) -> TransitionResult<()> {
        let Some(key) = lock.key() else {
            return Ok(());
        };

        if self.backend.exists(key) {
            emitter.emit(
                transition_id,
                EventKind::LockRestored {
                    key: key.to_string(),
                },
            );
            tracing::debug!(transition_id = %transition_id, key, "Lock restored for resume");
            Ok(())
        } else {
            emitter.emit(
                transition_id,
                EventKind::LockLost {
                    key: key.to_string(),
                },
            );
            tracing::warn!(transition_id = %transition_id, key, "Lock lost; resume refused");
            Err(TransitionError::LockLost {
                key: key.to_string(),
            })
        }
    }

    /// Release the recorded key, if any. Returns whether the backend
    /// actually released something.
    pub fn release(
        &self,
        transition_id: &TransitionId,
        lock: &LockState,
        emitter: &EventEmitter,
    ) -> bool {
        let Some(key) = lock.key() else {
            return false;
        };

        let released = self.backend.release(key);
        if released {
            emitter.emit(
                transition_id,
                EventKind::LockReleased {
                    key: key.to_string(),
                },
            );
            tracing::debug!(transition_id = %transition_id, key, "Lock released");
        }
        released
    }

    /// Extend the TTL of the recorded key, if any
    pub fn renew(&self, transition_id: &TransitionId, lock: &LockState, ttl: Duration) -> bool {
        let Some(key) = lock.key() else {
            return false;
        };
        let renewed = self.backend.renew(key, ttl);
        tracing::debug!(transition_id = %transition_id, key, renewed, "Lock renewal requested");
        renewed
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn wait_for(
        &self,
        transition_id: &TransitionId,
        key: &str,
        ttl: Duration,
        emitter: &EventEmitter,
    ) -> TransitionResult<LockAcquisition> {
        let deadline = Instant::now() + self.settings.wait_timeout;
        loop {
            if Instant::now() >= deadline {
                self.contended(transition_id, key, emitter);
                return Err(TransitionError::LockUnavailable {
                    key: key.to_string(),
                });
            }
            std::thread::sleep(self.settings.poll_interval);
            if self.backend.acquire(key, ttl) {
                return Ok(self.acquired(transition_id, key, ttl, emitter));
            }
        }
    }

    fn acquired(
        &self,
        transition_id: &TransitionId,
        key: &str,
        ttl: Duration,
        emitter: &EventEmitter,
    ) -> LockAcquisition {
        emitter.emit(
            transition_id,
            EventKind::LockAcquired {
                key: key.to_string(),
            },
        );
        tracing::debug!(
            transition_id = %transition_id,
            key,
            ttl_secs = ttl.as_secs(),
            "Lock acquired"
        );
        LockAcquisition::Acquired {
            key: key.to_string(),
            ttl,
        }
    }

    fn contended(&self, transition_id: &TransitionId, key: &str, emitter: &EventEmitter) {
        emitter.emit(
            transition_id,
            EventKind::LockAcquireFailed {
                key: key.to_string(),
            },
        );
        tracing::debug!(transition_id = %transition_id, key, "Lock acquisition failed");
    }
}

impl std::fmt::Debug for LockCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockCoordinator")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

// ── Lock Binding ─────────────────────────────────────────────────────

/// A coordinator bound to the key one transition locks under
#[derive(Clone, Debug)]
pub struct LockBinding {
    coordinator: LockCoordinator,
    key: String,
}

impl LockBinding {
    pub fn new(coordinator: LockCoordinator, key: impl Into<String>) -> Self {
        Self {
            coordinator,
            key: key.into(),
        }
    }

    /// The key this transition locks under
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn acquire(
        &self,
        transition_id: &TransitionId,
        emitter: &EventEmitter,
    ) -> TransitionResult<LockAcquisition> {
        self.coordinator.acquire(transition_id, &self.key, emitter)
    }

    pub fn verify(
        &self,
        transition_id: &TransitionId,
        lock: &LockState,
        emitter: &EventEmitter,
    ) -> TransitionResult<()> {
        self.coordinator.verify(transition_id, lock, emitter)
    }

    pub fn release(
        &self,
        transition_id: &TransitionId,
        lock: &LockState,
        emitter: &EventEmitter,
    ) -> bool {
        self.coordinator.release(transition_id, lock, emitter)
    }

    pub fn renew(&self, transition_id: &TransitionId, lock: &LockState, ttl: Duration) -> bool {
        self.coordinator.renew(transition_id, lock, ttl)
    }
}
