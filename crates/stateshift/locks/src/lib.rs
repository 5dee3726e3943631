//! Lock backends for stateshift
//!
//! Transitions that share a lock key exclude each other. This crate
//! defines the backend contract the engine locks through, plus two
//! reference implementations:
//!
//! - [`MemoryLockBackend`]: an in-process map, for single-process
//!   deployments and tests.
//! - [`FileLockBackend`]: lease files in a shared directory, for
//!   multi-process deployments on one host.
//!
//! All locks carry a TTL. An expired lock is claimable by anyone, so
//! a crashed holder cannot wedge its key forever. Backends are
//! deliberately dumb: atomic check-and-set per key, boolean answers,
//! no policy. Strategy (fail fast, wait, skip) lives in the engine.

#![deny(unsafe_code)]

mod backend;
mod file;
mod memory;

pub use backend::*;
pub use file::*;
pub use memory::*;
