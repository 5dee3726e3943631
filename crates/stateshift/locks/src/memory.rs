//! In-process lock backend
//!
//! Leases live in a mutex-guarded map of key to expiry instant. This
//! is the backend for single-process deployments and for tests; it
//! provides real mutual exclusion between threads but nothing across
//! processes.

use crate::LockBackend;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Lock backend backed by an in-process map
#[derive(Debug, Default)]
pub struct MemoryLockBackend {
    leases: Mutex<HashMap<String, Instant>>,
}

impl MemoryLockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn leases(&self) -> std::sync::MutexGuard<'_, HashMap<String, Instant>> {
        // A poisoned map is still a valid map of expiries; recover it
        // rather than refusing every lock from here on.
        match self.leases.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl LockBackend for MemoryLockBackend {
    fn acquire(&self, key: &str, ttl: Duration) -> bool {
        let now = Instant::now();
        let mut leases = self.leases();
        if let Some(expiry) = leases.get(key) {
            if *expiry > now {
                return false;
            }
        }
        let expiry = now.checked_add(ttl).unwrap_or_else(|| {
            // TTL too large to represent; treat as effectively forever
            now + Duration::from_secs(u32::MAX as u64)
        });
        leases.insert(key.to_string(), expiry);
        true
    }

    fn release(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut leases = self.leases();
        match leases.remove(key) {
            Some(expiry) => expiry > now,
            None => false,
        }
    }

    fn exists(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut leases = self.leases();
        match leases.get(key) {
            Some(expiry) if *expiry > now => true,
            Some(_) => {
                leases.remove(key);
                false
            }
            None => false,
        }
    }

    fn renew(&self, key: &str, ttl: Duration) -> bool {
        let now = Instant::now();
        let mut leases = self.leases();
        match leases.get_mut(key) {
            Some(expiry) if *expiry > now => {
                *expiry = now.checked_add(ttl).unwrap_or(*expiry);
                true
            }
            Some(_) => {
                leases.remove(key);
                false
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TTL: Duration = Duration::from_secs(30);

    #[test]
    fn test_acquire_then_contend() {
        let backend = MemoryLockBackend::new();
        assert!(backend.acquire("order:1", TTL));
        assert!(!backend.acquire("order:1", TTL));
        // A different key does not contend
        assert!(backend.acquire("order:2", TTL));
    }

    #[test]
    fn test_release_frees_the_key() {
        let backend = MemoryLockBackend::new();
        assert!(backend.acquire("order:1", TTL));
        assert!(backend.release("order:1"));
        assert!(backend.acquire("order:1", TTL));
    }

    #[test]
    fn test_release_is_idempotent() {
        let backend = MemoryLockBackend::new();
        assert!(!backend.release("order:1"));
        assert!(backend.acquire("order:1", TTL));
        assert!(backend.release("order:1"));
        assert!(!backend.release("order:1"));
    }

    #[test]
    fn test_expired_lock_is_claimable() {
        let backend = MemoryLockBackend::new();
        assert!(backend.acquire("order:1", Duration::from_millis(20)));
        assert!(backend.exists("order:1"));

        std::thread::sleep(Duration::from_millis(40));
        assert!(!backend.exists("order:1"));
        assert!(backend.acquire("order:1", TTL));
    }

    #[test]
    fn test_renew_extends_the_lease() {
        let backend = MemoryLockBackend::new();
        assert!(backend.acquire("order:1", Duration::from_millis(30)));
        assert!(backend.renew("order:1", Duration::from_secs(5)));

        std::thread::sleep(Duration::from_millis(50));
        // Would have expired under the original TTL
        assert!(backend.exists("order:1"));
    }

    #[test]
    fn test_renew_refuses_expired_and_missing_keys() {
        let backend = MemoryLockBackend::new();
        assert!(!backend.renew("ghost", TTL));

        assert!(backend.acquire("order:1", Duration::from_millis(10)));
        std::thread::sleep(Duration::from_millis(30));
        assert!(!backend.renew("order:1", TTL));
    }

    #[test]
    fn test_exactly_one_thread_wins() {
        let backend = MemoryLockBackend::new();
        let wins = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    if backend.acquire("contended", TTL) {
                        wins.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });

        assert_eq!(wins.load(Ordering::SeqCst), 1);
    }
}
