//! # relay
//!
//! An in-process event-driven component framework for Rust.
//!
//! ## Overview
//!
//! Relay lets independently authored units of logic ("components")
//! cooperate inside one process by firing and handling named events,
//! without holding references to one another. A single cooperative
//! dispatch engine decides what runs next, routes events to interested
//! handlers by name and channel, and lets a handler suspend mid-execution
//! to wait on another event's result — without multiplying OS threads.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   fire    ┌────────────┐   resolve   ┌─────────────┐
//! │  Components  │──────────▶│   Engine   │────────────▶│  Handlers   │
//! │ (tree nodes) │           │ queue+tick │             │ (by prio)   │
//! └──────────────┘           └─────┬──────┘             └──────┬──────┘
//!        ▲                         │ idle                      │ wait
//!        │                   ┌─────▼──────┐             ┌──────▼──────┐
//!        └── attach/detach ──│  Runtime   │             │  Scheduler  │
//!                            │ (sources,  │             │ (suspended  │
//!                            │  signals)  │             │   tasks)    │
//!                            └────────────┘             └─────────────┘
//! ```
//!
//! - **Engine** ([`relay_core`]): queue, registry, component tree,
//!   cooperative task scheduler.
//! - **Runtime** ([`relay_runtime`]): config, logging, event sources,
//!   signal-driven run loop.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use relay::prelude::*;
//! use serde_json::json;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = Runtime::from_config(load_config()?);
//!     let root = runtime.engine().root();
//!
//!     runtime
//!         .engine()
//!         .component("greeter")
//!         .handler(on("greet"), |_call| async { Ok(Flow::value(json!("hi"))) })
//!         .attach(&root)?;
//!
//!     runtime.engine().fire(Event::new("greet"))?;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: `relay.toml` configuration files
//! - `json-log`: newline-delimited JSON log output

pub use relay_core as core;
pub use relay_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use relay::prelude::*;
/// ```
pub mod prelude {
    // Engine - the dispatch core
    pub use relay_core::{
        Component, ComponentBuilder, Engine, Event, EventBuilder, Flow, HandlerCall, HandlerError,
        HandlerId, HandlerSpec, names, on, on_any,
    };

    // Errors observable by registrants and run-loop callers
    pub use relay_core::{
        DispatchError, EventError, QueueStateError, RegistrationError, UnresolvedWaitError,
    };

    // Runtime - config, logging, sources, the loop
    pub use relay_runtime::{
        ConfigLoader, EventSource, LoggingBuilder, RelayConfig, RelayError, Runtime, load_config,
    };
}
