//! The lock backend contract

use std::time::Duration;

/// A TTL-based mutual-exclusion lock store.
///
/// The engine treats lock state as binary per key: held or free. Every
/// acquisition carries a TTL after which the lock may be claimed by
/// someone else, so a crashed holder never wedges its key forever.
///
/// Methods return plain booleans. Backends signal "no" for contention
/// and for their own failures alike; the caller decides what a refusal
/// means under its locking strategy.
pub trait LockBackend: Send + Sync {
    /// Try to take the lock for `key` with the given TTL.
    ///
    /// Must be atomic check-and-set: of several concurrent callers for
    /// the same free key, exactly one may win. Returns false when the
    /// key is already held and unexpired.
    fn acquire(&self, key: &str, ttl: Duration) -> bool;

    /// Release the lock for `key`.
    ///
    /// Idempotent: releasing a key that is not held returns false and
    /// changes nothing.
    fn release(&self, key: &str) -> bool;

    /// Check whether `key` is currently held and unexpired.
    ///
    /// Used by resuming transitions to verify they still own their key.
    fn exists(&self, key: &str) -> bool;

    /// Extend the TTL of a held lock.
    ///
    /// Returns false when the key is not held (including when it
    /// already expired); an expired lock must be reacquired, not
    /// renewed.
    fn renew(&self, key: &str, ttl: Duration) -> bool;
}
