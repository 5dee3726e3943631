//! Transition engine for stateshift
//!
//! The engine takes a state and a delta, resolves the gates and
//! actions that apply, and drives the attempt through its phases:
//! lock, gates, actions, finish. Every step lands in the transition
//! context's append-only ledger, and every boundary fires an event.
//!
//! # Key Principle
//!
//! **The engine sequences, it never decides.**
//!
//! Whether a transition may happen is the gates' call; what it does is
//! the actions' call; who may run it at all is the lock backend's
//! call. The engine only holds them to the protocol: gates before
//! actions, actions in order, one attempt per lock key, nothing after
//! a halt.
//!
//! # Architecture
//!
//! [`TransitionEngine`] composes specialized components:
//!
//! - [`TransitionOrchestrator`]: owns one attempt's context and phase
//! - [`GateEvaluator`]: evaluates a gate and builds its record
//! - [`ActionRunner`]: guards and executes a single action
//! - [`LockCoordinator`]: applies the lock strategy over a backend
//! - [`EventEmitter`]: stamps and dispatches observability events
//!
//! # Example
//!
//! ```rust
//! use stateshift_engine::TransitionEngine;
//! use stateshift_types::{
//!     ApplyDelta, Delta, FieldEquals, FlatState, TransitionConfiguration, TransitionStatus,
//! };
//!
//! // Publishing is allowed only from draft, and simply applies the delta.
//! let engine = TransitionEngine::new(|_state: &FlatState, _delta: &Delta| {
//!     TransitionConfiguration::new()
//!         .with_gate(FieldEquals::new("status", "draft"))
//!         .with_action(ApplyDelta)
//! });
//!
//! let mut attempt = engine
//!     .transition(
//!         FlatState::new().set("status", "draft"),
//!         Delta::new().set("status", "published"),
//!     )
//!     .unwrap();
//!
//! assert_eq!(attempt.run().unwrap(), TransitionStatus::Completed);
//! assert_eq!(
//!     attempt.context().state_mapping().get("status"),
//!     Some(&serde_json::json!("published"))
//! );
//! ```

#![deny(unsafe_code)]

mod action_runner;
mod engine;
mod events;
mod gate_evaluator;
mod lock_coordinator;
mod orchestrator;

pub use action_runner::*;
pub use engine::*;
pub use events::*;
pub use gate_evaluator::*;
pub use lock_coordinator::*;
pub use orchestrator::*;
