//! # relay-core
//!
//! The core event dispatch engine of the relay component framework.
//!
//! Independently authored components communicate by firing and handling
//! named events, without direct references to one another. The engine is
//! simultaneously a scheduler (what runs next, in what order), a routing
//! layer (which handlers hear which events), and a concurrency primitive
//! (handlers can suspend mid-execution to wait on another event's result,
//! without extra threads).
//!
//! ## Architecture
//!
//! ```text
//!  fire(event) ──► EventQueue ──► Engine::tick
//!                                    │
//!                          HandlerRegistry::resolve
//!                          (priority desc, exact before
//!                           wildcard, registration order)
//!                                    │
//!                      ┌─────────────┼─────────────┐
//!                      ▼             ▼             ▼
//!                  handler #1    handler #2    handler #3
//!                   (value)      (suspends)     (value)
//!                      │             │             │
//!                      │       TaskScheduler       │
//!                      │      (parked until the    │
//!                      │       awaited event       │
//!                      │         completes)        │
//!                      └─────────────┼─────────────┘
//!                                    ▼
//!                         event.value / .error / .complete
//! ```
//!
//! Components form a tree that doubles as the channel namespace: an event
//! targeted at a component reaches handlers scoped to that component's
//! subtree plus every unrestricted handler; an event with no target is a
//! broadcast.
//!
//! ## Example
//!
//! ```rust,ignore
//! use relay_core::{Engine, Event, Flow, on};
//! use serde_json::json;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = Engine::new();
//!     let root = engine.root();
//!
//!     engine
//!         .component("greeter")
//!         .handler(on("greet").priority(10), |_call| async {
//!             Ok(Flow::value(json!("LOUD HELLO")))
//!         })
//!         .attach(&root)?;
//!
//!     let greet = engine.fire(Event::new("greet"))?;
//!     while engine.tick().await? {}
//!
//!     assert!(greet.is_complete());
//!     assert_eq!(greet.value(), vec![json!("LOUD HELLO")]);
//!     Ok(())
//! }
//! ```

// Architectural layers
pub mod foundation;
pub mod framework;

// Re-export foundation types
pub use foundation::{
    DispatchError, Event, EventBuilder, EventError, EventId, HandlerError, QueueResult,
    QueueStateError, RegistrationError, RegistrationResult, UnresolvedWaitError, names,
};

// Re-export framework types
pub use framework::{
    Component, ComponentBuilder, ComponentId, Engine, EventQueue, Flow, HandlerCall, HandlerFn,
    HandlerId, HandlerResult, HandlerSpec, Pattern, Resume, into_handler, on, on_any,
};

/// Prelude for common imports.
pub mod prelude {
    pub use super::foundation::*;
    pub use super::framework::{
        Component, ComponentBuilder, Engine, Flow, HandlerCall, HandlerId, HandlerSpec, on, on_any,
    };
}
