//! Domain types for stateshift
//!
//! stateshift models a transition as a **delta applied to a state,
//! guarded by gates and carried out by actions**. The caller asks for
//! a change; gates decide whether it may happen; actions make it
//! happen one step at a time; the transition context records every
//! step in an append-only ledger.
//!
//! # Key Concepts
//!
//! - **EntityState / Delta**: the domain state under transition and
//!   the partial mapping of fields the caller wants changed. States
//!   are immutable from the engine's point of view.
//! - **Gate**: a yes/no/skip condition evaluated before work happens.
//!   Transition gates guard the whole attempt; action guards skip a
//!   single action.
//! - **Action**: a sequential unit of work. Actions signal whether to
//!   continue, pause, or stop, and may replace the current state.
//! - **TransitionContext**: the single source of truth for one
//!   attempt: state, histories, lock, status, timestamps.
//! - **ContextSnapshot**: the serializable form of a context, used to
//!   park paused transitions and resume them elsewhere.
//! - **TransitionConfiguration**: the ordered gates and actions for
//!   one attempt, resolved fresh by a `ConfigurationProvider`.
//! - **EventRecord / EventSink**: step-boundary observability.
//!
//! # Design Principles
//!
//! 1. Histories are append-only. Nothing ever rewrites a record.
//! 2. States are replaced, never mutated in place.
//! 3. Everything in the ledger serializes without the domain type;
//!    snapshots carry states as flat mappings.
//! 4. Gates decide, actions act. No gate has side effects.

#![deny(unsafe_code)]

mod action;
mod config;
mod context;
mod errors;
mod event;
mod gate;
mod lock;
mod record;
mod snapshot;
mod state;

pub use action::*;
pub use config::*;
pub use context::*;
pub use errors::*;
pub use event::*;
pub use gate::*;
pub use lock::*;
pub use record::*;
pub use snapshot::*;
pub use state::*;
