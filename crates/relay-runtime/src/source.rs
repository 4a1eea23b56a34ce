//! External event sources.
//!
//! The engine core signals idle ticks but never blocks on I/O itself;
//! timers, pollers and transports live outside it and contribute events
//! through `fire` only. An [`EventSource`] is the runtime's hook for
//! those drivers: it is polled on idle ticks, between bursts of queued
//! work.

use async_trait::async_trait;

use relay_core::Engine;

/// An external driver that injects events when the engine goes idle.
///
/// Implementations must go through [`Engine::fire`] (or a component
/// handle); they never touch the queue or registry directly.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use relay_core::{Engine, Event};
/// use relay_runtime::EventSource;
///
/// struct Heartbeat;
///
/// #[async_trait]
/// impl EventSource for Heartbeat {
///     async fn poll(&self, engine: &Engine) -> bool {
///         engine.fire(Event::new("heartbeat")).is_ok()
///     }
/// }
/// ```
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Called on idle ticks. Returns whether any event was injected; when
    /// every source reports `false`, the run loop sleeps for the
    /// configured idle backoff before polling again.
    async fn poll(&self, engine: &Engine) -> bool;

    /// Name used in logs.
    fn name(&self) -> &str {
        "source"
    }
}
