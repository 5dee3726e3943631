//! Lease-file lock backend
//!
//! One file per key inside a lease directory; the file body is the
//! RFC 3339 expiry of the lease. Atomicity comes from `create_new`,
//! which fails when the file already exists. Processes sharing the
//! directory share the locks, so this backend covers multi-process
//! deployments on one host (or a shared filesystem).
//!
//! Stale takeover is best effort: an expired or corrupt lease file is
//! removed and the key reacquired through `create_new`. TTLs should
//! comfortably exceed the work done under the lock.

use crate::LockBackend;
use chrono::{DateTime, Utc};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Lock backend backed by lease files in a shared directory
#[derive(Clone, Debug)]
pub struct FileLockBackend {
    dir: PathBuf,
}

impl FileLockBackend {
    /// Open (and create if needed) the lease directory
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The directory holding the lease files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn lease_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.lock", encode_key(key)))
    }

    /// Read the expiry of a lease file; corrupt files count as stale
    fn read_lease(&self, path: &Path) -> Option<DateTime<Utc>> {
        let text = fs::read_to_string(path).ok()?;
        match DateTime::parse_from_rfc3339(text.trim()) {
            Ok(parsed) => Some(parsed.with_timezone(&Utc)),
            Err(_) => {
                tracing::debug!(path = %path.display(), "Removing corrupt lease file");
                let _ = fs::remove_file(path);
                None
            }
        }
    }
}

impl LockBackend for FileLockBackend {
    fn acquire(&self, key: &str, ttl: Duration) -> bool {
        let path = self.lease_path(key);
        if let Some(expires_at) = self.read_lease(&path) {
            if expires_at > Utc::now() {
                return false;
            }
            let _ = fs::remove_file(&path);
        }

        let expires_at = expiry_after(ttl).to_rfc3339();
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                if file.write_all(expires_at.as_bytes()).is_err() {
                    let _ = fs::remove_file(&path);
                    return false;
                }
                true
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => false,
            Err(e) => {
                tracing::debug!(key, error = %e, "Lease file could not be created");
                false
            }
        }
    }

    fn release(&self, key: &str) -> bool {
        let path = self.lease_path(key);
        match self.read_lease(&path) {
            Some(expires_at) if expires_at > Utc::now() => fs::remove_file(&path).is_ok(),
            Some(_) => {
                // Expired lease: nothing was held any more
                let _ = fs::remove_file(&path);
                false
            }
            None => false,
        }
    }

    fn exists(&self, key: &str) -> bool {
        let path = self.lease_path(key);
        match self.read_lease(&path) {
            Some(expires_at) if expires_at > Utc::now() => true,
            Some(_) => {
                let _ = fs::remove_file(&path);
                false
            }
            None => false,
        }
    }

    fn renew(&self, key: &str, ttl: Duration) -> bool {
        let path = self.lease_path(key);
        match self.read_lease(&path) {
            Some(expires_at) if expires_at > Utc::now() => {
                fs::write(&path, expiry_after(ttl).to_rfc3339()).is_ok()
            }
            _ => false,
        }
    }
}

/// Expiry timestamp for a TTL, saturating instead of overflowing
fn expiry_after(ttl: Duration) -> DateTime<Utc> {
    let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
    Utc::now()
        .checked_add_signed(ttl)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Flatten a key into a filesystem-safe name.
///
/// Alphanumerics, `-`, and `_` pass through; every other byte becomes
/// `%xx`, so distinct keys never collide on disk.
fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' => {
                encoded.push(byte as char);
            }
            _ => {
                encoded.push('%');
                encoded.push_str(&format!("{:02x}", byte));
            }
        }
    }
    encoded
}
