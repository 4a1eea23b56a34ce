//! Error types for the relay dispatch engine.
//!
//! Each concern has its own error type so callers can match on exactly the
//! failures they care about:
//!
//! - [`RegistrationError`] — rejected synchronously at `register`/`attach`
//!   time; never reaches the event queue.
//! - [`QueueStateError`] — illegal queue transitions (double fire, dequeue
//!   from an empty queue, withdrawing an event that is not queued).
//! - [`DispatchError`] — a handler body failed while an event was being
//!   dispatched; recorded on the event itself.
//! - [`UnresolvedWaitError`] — a suspended handler's awaited event never
//!   completed before shutdown or was withdrawn.
//! - [`HandlerError`] — what handler bodies themselves return; converted
//!   into a [`DispatchError`] record by the engine.

use thiserror::Error;

// =============================================================================
// Registration Errors
// =============================================================================

/// Errors raised while registering handlers or attaching components.
///
/// These are reported synchronously to the caller and never queued.
#[derive(Debug, Clone, Error)]
pub enum RegistrationError {
    /// An exact-match pattern was empty.
    #[error("handler pattern must not be empty")]
    EmptyPattern,

    /// The handler token is unknown or was already unregistered.
    #[error("unknown handler id {id}")]
    UnknownHandler {
        /// The stale token value.
        id: u64,
    },

    /// A component with the same name already exists in the tree.
    #[error("component '{name}' already exists")]
    DuplicateComponent {
        /// The conflicting name.
        name: String,
    },

    /// The referenced component is not part of the tree (detached or never
    /// attached).
    #[error("component '{name}' is not attached")]
    UnknownComponent {
        /// The missing component's name.
        name: String,
    },

    /// The engine root cannot be detached.
    #[error("the root component cannot be detached")]
    CannotDetachRoot,
}

// =============================================================================
// Queue State Errors
// =============================================================================

/// Errors raised by illegal event-queue state transitions.
#[derive(Debug, Clone, Error)]
pub enum QueueStateError {
    /// An event was constructed with an empty name.
    #[error("event name must not be empty")]
    EmptyName,

    /// The same event instance was fired twice.
    #[error("event '{name}' is already queued")]
    AlreadyQueued {
        /// Name of the offending event.
        name: String,
    },

    /// The event instance already ran to completion.
    #[error("event '{name}' has already completed")]
    AlreadyCompleted {
        /// Name of the offending event.
        name: String,
    },

    /// `dequeue` was called on an empty queue.
    #[error("empty queue")]
    Empty,

    /// `withdraw` was called for an event that is not in the queue.
    #[error("event '{name}' is not queued")]
    NotQueued {
        /// Name of the offending event.
        name: String,
    },
}

// =============================================================================
// Dispatch Errors
// =============================================================================

/// A handler body failed while its event was being dispatched.
///
/// At most one `DispatchError` is recorded per event (first failure wins);
/// later failures are logged as suppressed. Non-critical failures do not stop
/// the remaining handlers.
#[derive(Debug, Clone, Error)]
#[error("handler '{handler}' failed for event '{event}': {message}")]
pub struct DispatchError {
    /// Name of the event being dispatched.
    pub event: String,
    /// Label of the failing handler (`component:pattern`).
    pub handler: String,
    /// The failure message produced by the handler.
    pub message: String,
}

/// A suspended handler's wait was never satisfied.
///
/// Produced at shutdown for every still-parked task, or immediately when the
/// awaited event is withdrawn before its tick.
#[derive(Debug, Clone, Error)]
#[error("handler '{handler}' of event '{event}' waited for '{awaited}', which never resolved")]
pub struct UnresolvedWaitError {
    /// Name of the event whose handler suspended.
    pub event: String,
    /// Label of the suspended handler.
    pub handler: String,
    /// Name of the event that was awaited.
    pub awaited: String,
}

/// The failure recorded on an [`Event`](crate::Event) when dispatch goes
/// wrong. Observable through `Event::error`.
#[derive(Debug, Clone, Error)]
pub enum EventError {
    /// A handler body failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// A suspended handler's wait never resolved.
    #[error(transparent)]
    UnresolvedWait(#[from] UnresolvedWaitError),
}

// =============================================================================
// Handler Errors
// =============================================================================

/// The error type handler bodies return.
///
/// Handlers are free to use `?` on anything convertible into a
/// `HandlerError`; the engine turns the value into a [`DispatchError`]
/// record on the event being dispatched.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct HandlerError {
    /// Human-readable failure description.
    pub message: String,
}

impl HandlerError {
    /// Creates a handler error from any displayable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<QueueStateError> for HandlerError {
    fn from(err: QueueStateError) -> Self {
        Self::new(err.to_string())
    }
}

impl From<RegistrationError> for HandlerError {
    fn from(err: RegistrationError) -> Self {
        Self::new(err.to_string())
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for registration operations.
pub type RegistrationResult<T> = Result<T, RegistrationError>;

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueStateError>;
