//! Error types for transition execution

use crate::TransitionStatus;

/// Boxed error type carried across the gate/action boundary.
///
/// Gates, actions, configuration providers, and state factories are
/// consumer code: they may fail with any error type. The engine wraps
/// whatever comes back into a [`TransitionError`] variant that names
/// the component that failed.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while preparing or executing a transition
#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("Lock unavailable for key: {key}")]
    LockUnavailable { key: String },

    #[error("Lock lost for key: {key}; the transition cannot resume")]
    LockLost { key: String },

    #[error("Gate '{gate}' failed: {source}")]
    GateFailed {
        gate: String,
        #[source]
        source: BoxedError,
    },

    #[error("Action '{action}' failed: {source}")]
    ActionFailed {
        action: String,
        #[source]
        source: BoxedError,
    },

    #[error("Configuration provider failed: {source}")]
    Configuration {
        #[source]
        source: BoxedError,
    },

    #[error("Cannot resume: transition is {status}, not paused")]
    NotPaused { status: TransitionStatus },

    #[error("Transition already finished: {status}")]
    AlreadyTerminal { status: TransitionStatus },

    #[error("No action registered under name: {action}")]
    UnknownAction { action: String },

    #[error("Snapshot could not be restored: {reason}")]
    InvalidSnapshot { reason: String },
}

/// Result type alias for transition operations
pub type TransitionResult<T> = Result<T, TransitionError>;
