//! Foundation layer - events and error taxonomy.
//!
//! This module contains the value objects the dispatch engine routes:
//! - The event type, its payload and dispatch bookkeeping
//! - The error types observed by registrants, handlers, and run-loop callers

pub mod error;
pub mod event;

pub use error::{
    DispatchError, EventError, HandlerError, QueueResult, QueueStateError, RegistrationError,
    RegistrationResult, UnresolvedWaitError,
};
pub use event::{Event, EventBuilder, EventId, names};
