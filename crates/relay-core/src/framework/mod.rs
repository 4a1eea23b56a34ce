//! Framework layer - dispatch machinery.
//!
//! This module contains the engine's moving parts:
//! - The pending-event queue
//! - The channel registry and its pure handler resolution
//! - The component tree, handles and builder
//! - Handler callables and the suspension protocol
//! - The task scheduler for suspended handlers
//! - The engine itself: tick, run loop, shutdown

pub mod component;
pub mod engine;
pub mod handler;
pub mod queue;
pub mod registry;
pub mod scheduler;

pub use component::{Component, ComponentBuilder, ComponentId};
pub use engine::Engine;
pub use handler::{
    Flow, HandlerCall, HandlerFn, HandlerResult, HandlerSpec, Pattern, Resume, into_handler, on,
    on_any,
};
pub use queue::EventQueue;
pub use registry::HandlerId;
