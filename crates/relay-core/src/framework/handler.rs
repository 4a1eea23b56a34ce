//! Handler callables and the suspension protocol.
//!
//! A handler is an async closure over a [`HandlerCall`] returning a
//! [`Flow`]:
//!
//! - [`Flow::Continue`] — done, contributes no value;
//! - [`Flow::Value`] — done, the value joins the event's accumulator;
//! - [`Flow::Wait`] — suspend until another event completes, then resume
//!   through the given continuation. Continuations may themselves return
//!   another `Wait`, chaining with no bound other than memory.
//!
//! ```rust,ignore
//! use relay_core::{Flow, on};
//! use serde_json::json;
//!
//! engine.component("greeter")
//!     .handler(on("greet").priority(10), |call| async move {
//!         let child = call.fire(Event::new("warm_up"))?;
//!         Ok(Flow::wait(child, |done| async move {
//!             Ok(Flow::value(json!(done.value())))
//!         }))
//!     })
//!     .attach(&root)?;
//! ```

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::foundation::error::{HandlerError, QueueResult};
use crate::foundation::event::Event;
use crate::framework::engine::Engine;

/// What a handler invocation (or a resumed continuation) produced.
pub type HandlerResult = Result<Flow, HandlerError>;

/// The continuation a suspended handler resumes with. It receives the
/// completed awaited event and produces the handler's next [`Flow`].
pub type Resume = Box<dyn FnOnce(Event) -> BoxFuture<'static, HandlerResult> + Send>;

/// A type-erased, shareable handler callable.
pub type HandlerFn = Arc<dyn Fn(HandlerCall) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

// =============================================================================
// Flow
// =============================================================================

/// A handler's verdict on its own execution.
pub enum Flow {
    /// Finished without contributing a value.
    Continue,
    /// Finished with a value for the event's accumulator.
    Value(Value),
    /// Suspend until `on` completes, then resume with `resume`.
    ///
    /// The engine does not fire `on` — the handler fires it (or something
    /// else does) and the wait is keyed on that instance's completion.
    Wait {
        /// The event whose completion is awaited.
        on: Event,
        /// Continuation invoked with the completed event.
        resume: Resume,
    },
}

impl Flow {
    /// A finished flow carrying `value`.
    pub fn value(value: Value) -> Self {
        Self::Value(value)
    }

    /// A suspended flow waiting on `on`.
    pub fn wait<F, Fut>(on: Event, resume: F) -> Self
    where
        F: FnOnce(Event) -> Fut + Send + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self::Wait {
            on,
            resume: Box::new(move |event| Box::pin(resume(event))),
        }
    }
}

impl std::fmt::Debug for Flow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Continue => f.write_str("Flow::Continue"),
            Self::Value(value) => f.debug_tuple("Flow::Value").field(value).finish(),
            Self::Wait { on, .. } => f.debug_struct("Flow::Wait").field("on", &on.name()).finish(),
        }
    }
}

/// Adapts an async closure into a shareable [`HandlerFn`].
pub fn into_handler<F, Fut>(f: F) -> HandlerFn
where
    F: Fn(HandlerCall) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |call| Box::pin(f(call)))
}

// =============================================================================
// HandlerCall
// =============================================================================

/// The invocation context a handler receives: the event being dispatched
/// and a handle back to the engine for firing follow-up events.
#[derive(Clone)]
pub struct HandlerCall {
    event: Event,
    engine: Engine,
}

impl HandlerCall {
    pub(crate) fn new(event: Event, engine: Engine) -> Self {
        Self { event, engine }
    }

    /// The event this handler was resolved for.
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// The dispatching engine.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Fires a follow-up event; it lands at the queue tail and is
    /// dispatched in a later tick.
    pub fn fire(&self, event: Event) -> QueueResult<Event> {
        self.engine.fire(event)
    }
}

impl std::fmt::Debug for HandlerCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerCall")
            .field("event", &self.event)
            .finish()
    }
}

// =============================================================================
// Registration specs
// =============================================================================

/// What event names a handler matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// Matches exactly one event name.
    Exact(String),
    /// Matches every event name. At equal priority, wildcard handlers run
    /// after exact-name handlers.
    Any,
}

impl Pattern {
    /// Whether this pattern matches `name`.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Exact(expected) => expected == name,
            Self::Any => true,
        }
    }

    /// Display form used in handler labels.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Exact(name) => name,
            Self::Any => "*",
        }
    }
}

/// Declarative description of one handler registration: pattern, priority,
/// criticality and optional channel restriction.
///
/// Built with [`on`] / [`on_any`] and consumed by
/// [`ComponentBuilder::handler`](crate::ComponentBuilder::handler) or
/// [`Component::register`](crate::Component::register).
#[derive(Debug, Clone)]
pub struct HandlerSpec {
    pub(crate) pattern: Pattern,
    pub(crate) priority: i32,
    pub(crate) critical: bool,
    pub(crate) channel: Option<String>,
}

impl HandlerSpec {
    fn new(pattern: Pattern) -> Self {
        Self {
            pattern,
            priority: 0,
            critical: false,
            channel: None,
        }
    }

    /// Sets the priority; higher runs first, ties break by registration
    /// order.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Marks the handler critical: its failure skips the event's remaining
    /// handlers and propagates to the run-loop caller after the tick.
    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }

    /// Restricts the handler to events targeting `channel` (a component
    /// name) or one of its ancestors' targets.
    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }
}

/// A spec matching exactly the event name `name`, priority 0.
pub fn on(name: impl Into<String>) -> HandlerSpec {
    HandlerSpec::new(Pattern::Exact(name.into()))
}

/// A wildcard spec matching every event name, priority 0.
pub fn on_any() -> HandlerSpec {
    HandlerSpec::new(Pattern::Any)
}
