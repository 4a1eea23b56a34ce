//! The dispatch engine: queue, registry, component tree and scheduler
//! behind one handle.
//!
//! One **tick** processes exactly one queued event to completion:
//!
//! 1. Pop the head event (an empty queue is an idle tick, not an error).
//! 2. Resolve its handlers through the registry — a snapshot, so
//!    unregistering mid-flight never affects an in-flight event.
//! 3. Invoke the handlers strictly in resolved order. Each one returns a
//!    value, suspends on another event (becoming a parked task whose value
//!    splices back at its original index), or fails.
//! 4. When every handler has produced a final value or failed, the event
//!    completes and any tasks blocked on it resume within the same tick.
//! 5. Events fired by handlers land at the queue tail and run in later
//!    ticks, so chained firing never recurses.
//!
//! Exactly one handler body executes at a time: concurrency comes only
//! from suspend/resume, never from parallel handler execution, so the
//! queue, registry and event state need no coordination beyond the
//! engine's own locks.
//!
//! ```rust,ignore
//! use relay_core::{Engine, Event, Flow, on};
//! use serde_json::json;
//!
//! let engine = Engine::new();
//! let root = engine.root();
//! engine
//!     .component("greeter")
//!     .handler(on("greet"), |_call| async { Ok(Flow::value(json!("hi"))) })
//!     .attach(&root)?;
//!
//! let greet = engine.fire(Event::new("greet"))?;
//! engine.tick().await?;
//! assert_eq!(greet.value(), vec![json!("hi")]);
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use tracing::{Level, debug, error, span, trace, warn};

use crate::foundation::error::{
    DispatchError, QueueResult, RegistrationError, RegistrationResult, UnresolvedWaitError,
};
use crate::foundation::event::{self, Event};
use crate::framework::component::{Component, ComponentBuilder, ComponentId, ComponentTree};
use crate::framework::handler::{Flow, HandlerCall, HandlerFn, HandlerSpec};
use crate::framework::queue::EventQueue;
use crate::framework::registry::{HandlerId, HandlerRegistry};
use crate::framework::scheduler::{Task, TaskScheduler};

struct EngineInner {
    queue: Mutex<EventQueue>,
    registry: RwLock<HandlerRegistry>,
    tree: RwLock<ComponentTree>,
    scheduler: Mutex<TaskScheduler>,
    running: AtomicBool,
    booted: AtomicBool,
}

/// The event dispatch engine. Cloning is cheap; every clone drives the
/// same queue, registry and scheduler.
///
/// There is no ambient global instance: components receive an `Engine`
/// handle at construction and external event sources inject work through
/// [`fire`](Self::fire) only.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    /// Creates an engine with an empty queue and a tree holding only the
    /// root component.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(EngineInner {
                queue: Mutex::new(EventQueue::new()),
                registry: RwLock::new(HandlerRegistry::new()),
                tree: RwLock::new(ComponentTree::new("root")),
                scheduler: Mutex::new(TaskScheduler::new()),
                running: AtomicBool::new(false),
                booted: AtomicBool::new(false),
            }),
        }
    }

    // ─── Components ──────────────────────────────────────────────────────────

    /// The root component; every other component attaches beneath it.
    pub fn root(&self) -> Component {
        let tree = self.inner.tree.read();
        let root = tree.root();
        let name = tree
            .name_of(root)
            .expect("the root is never removed")
            .to_string();
        Component::new(root, name, self.clone())
    }

    /// Starts building a component named `name`.
    pub fn component(&self, name: impl Into<String>) -> ComponentBuilder {
        ComponentBuilder::new(self.clone(), name.into())
    }

    pub(crate) fn attach_component(
        &self,
        parent: ComponentId,
        name: String,
        handlers: Vec<(HandlerSpec, HandlerFn)>,
    ) -> RegistrationResult<Component> {
        let (id, parent_name) = {
            let mut tree = self.inner.tree.write();
            let id = tree.add(parent, &name)?;
            let parent_name = tree
                .name_of(parent)
                .expect("the parent was just attached under")
                .to_string();
            (id, parent_name)
        };

        // All-or-nothing: an invalid spec rolls the whole attach back.
        {
            let mut registry = self.inner.registry.write();
            let mut registered = Vec::new();
            for (spec, callable) in handlers {
                match registry.register(id, &name, spec, callable) {
                    Ok(handler) => registered.push(handler),
                    Err(err) => {
                        for handler in registered {
                            let _ = registry.unregister(handler);
                        }
                        drop(registry);
                        let _ = self.inner.tree.write().remove(id);
                        return Err(err);
                    }
                }
            }
        }

        debug!(component = %name, parent = %parent_name, "component attached");
        let _ = self.fire(Event::attached(&name, &parent_name));
        Ok(Component::new(id, name, self.clone()))
    }

    pub(crate) fn detach(&self, id: ComponentId) -> RegistrationResult<()> {
        let removed = self.inner.tree.write().remove(id)?;
        {
            let mut registry = self.inner.registry.write();
            for (component, _, _) in &removed {
                registry.unregister_component(*component);
            }
        }
        for (_, name, parent) in &removed {
            debug!(component = %name, "component detached");
            let _ = self.fire(Event::detached(name, parent));
        }
        Ok(())
    }

    pub(crate) fn register_handler(
        &self,
        component: ComponentId,
        component_name: &str,
        spec: HandlerSpec,
        callable: HandlerFn,
    ) -> RegistrationResult<HandlerId> {
        if !self.inner.tree.read().contains(component) {
            return Err(RegistrationError::UnknownComponent {
                name: component_name.to_string(),
            });
        }
        self.inner
            .registry
            .write()
            .register(component, component_name, spec, callable)
    }

    pub(crate) fn unregister_handler(&self, id: HandlerId) -> RegistrationResult<()> {
        self.inner.registry.write().unregister(id)
    }

    // ─── Firing ──────────────────────────────────────────────────────────────

    /// Enqueues an event for a later tick and hands it back for
    /// inspection of `value`/`error`/`is_complete` once dispatched.
    ///
    /// The same instance can be fired exactly once; a second `fire` is a
    /// [`QueueStateError`](crate::QueueStateError).
    pub fn fire(&self, event: Event) -> QueueResult<Event> {
        event.mark_queued()?;
        self.inner.queue.lock().enqueue(event.clone());
        trace!(event = %event.name(), "event queued");
        Ok(event)
    }

    /// Fires `event` targeted at `channel` (a component name).
    pub fn fire_to(&self, event: Event, channel: &str) -> QueueResult<Event> {
        event.add_channel(channel)?;
        self.fire(event)
    }

    /// Withdraws a queued event before its tick. Tasks already waiting on
    /// it fail immediately with a never-resolved wait.
    pub async fn withdraw(&self, event: &Event) -> QueueResult<()> {
        let withdrawn = self
            .inner
            .queue
            .lock()
            .withdraw(event.id(), event.name())?;
        withdrawn.mark_withdrawn();
        debug!(event = %event.name(), "event withdrawn");

        let waiters = self.inner.scheduler.lock().take_waiters(event.id());
        let mut completable = Vec::new();
        for task in waiters {
            let failure = UnresolvedWaitError {
                event: task.origin.name().to_string(),
                handler: task.handler.clone(),
                awaited: event.name().to_string(),
            };
            warn!(%failure, "awaited event withdrawn");
            task.origin.try_set_error(failure.into());
            if task.origin.resolve_slot(task.slot, None) {
                completable.push(task.origin.clone());
            }
        }
        for origin in completable {
            self.complete_event(origin).await;
        }
        Ok(())
    }

    // ─── The run loop ────────────────────────────────────────────────────────

    /// Advances the engine by one tick. Returns whether any work was done
    /// (`false` means idle). A critical handler failure surfaces here
    /// after the tick's bookkeeping is finished.
    pub async fn tick(&self) -> Result<bool, DispatchError> {
        let Some(event) = self.inner.queue.lock().try_dequeue() else {
            return Ok(false);
        };
        self.dispatch(event).await?;
        Ok(true)
    }

    /// Fires the `started` event. Only the first call has any effect.
    pub fn boot(&self) {
        if !self.inner.booted.swap(true, Ordering::SeqCst) {
            debug!("engine booted");
            let _ = self.fire(Event::started());
        }
    }

    /// Runs ticks until `stop` returns `true` or [`stop`](Self::stop) is
    /// called. Idle ticks yield to the async runtime so external drivers
    /// can interleave their own work and `fire` from their callbacks.
    pub async fn run<F>(&self, mut stop: F) -> Result<(), DispatchError>
    where
        F: FnMut() -> bool + Send,
    {
        self.inner.running.store(true, Ordering::SeqCst);
        self.boot();
        let result = loop {
            if stop() || !self.is_running() {
                break Ok(());
            }
            match self.tick().await {
                Ok(true) => {}
                Ok(false) => tokio::task::yield_now().await,
                Err(failure) => break Err(failure),
            }
        };
        self.inner.running.store(false, Ordering::SeqCst);
        result
    }

    /// Requests the run loop to exit after the current tick.
    pub fn stop(&self) {
        self.inner.running.store(false, Ordering::SeqCst);
    }

    /// Whether a run loop is active.
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Shuts the engine down: fires `stopped`, drains up to `drain_limit`
    /// further ticks so in-flight events still dispatch, then fails every
    /// still-parked task with a never-resolved wait.
    pub async fn shutdown(&self, drain_limit: usize) {
        self.inner.running.store(false, Ordering::SeqCst);
        let _ = self.fire(Event::stopped());

        let mut drained = 0;
        while drained < drain_limit {
            match self.tick().await {
                Ok(true) => drained += 1,
                Ok(false) => break,
                Err(failure) => {
                    error!(%failure, "critical failure while draining at shutdown");
                    drained += 1;
                }
            }
        }
        let remaining = self.pending_events();
        if remaining > 0 {
            warn!(remaining, "drain limit reached with events still queued");
        }
        self.fail_pending_waits();
    }

    // ─── Introspection ───────────────────────────────────────────────────────

    /// Number of events waiting in the queue.
    pub fn pending_events(&self) -> usize {
        self.inner.queue.lock().len()
    }

    /// Number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.inner.registry.read().len()
    }

    /// Number of components in the tree, the root included.
    pub fn component_count(&self) -> usize {
        self.inner.tree.read().len()
    }

    /// Number of suspended handlers parked in the scheduler.
    pub fn parked_tasks(&self) -> usize {
        self.inner.scheduler.lock().len()
    }

    // ─── Dispatch internals ──────────────────────────────────────────────────

    async fn dispatch(&self, event: Event) -> Result<(), DispatchError> {
        let span = span!(Level::DEBUG, "dispatch", event = %event.name());
        let _enter = span.enter();

        let resolved = {
            let tree = self.inner.tree.read();
            self.inner.registry.read().resolve(&event, &tree)
        };
        event.begin_dispatch(resolved.len());

        if resolved.is_empty() {
            debug!(event = %event.name(), "no handler matched");
            event.end_dispatch();
            self.complete_event(event.clone()).await;
            if !event::is_engine_notification(event.name()) {
                let _ = self.fire(Event::unhandled(event.name()));
            }
            return Ok(());
        }
        debug!(event = %event.name(), handlers = resolved.len(), "dispatching");

        let mut critical_failure = None;
        for (index, entry) in resolved.iter().enumerate() {
            let call = HandlerCall::new(event.clone(), self.clone());
            trace!(handler = %entry.label(), index, "invoking handler");
            match (entry.callable)(call).await {
                Ok(Flow::Continue) => {
                    event.resolve_slot(index, None);
                }
                Ok(Flow::Value(value)) => {
                    event.resolve_slot(index, Some(value));
                }
                Ok(Flow::Wait { on, resume }) => {
                    event.mark_pending(index);
                    let task = Task {
                        origin: event.clone(),
                        slot: index,
                        handler: entry.label(),
                        resume,
                    };
                    if on.is_complete() {
                        // The awaited event already finished; resume inline.
                        if let Some(origin) = self.run_resume_chain(task, on.clone()).await {
                            self.complete_event(origin).await;
                        }
                    } else {
                        trace!(handler = %entry.label(), awaited = %on.name(), "handler suspended");
                        self.inner.scheduler.lock().park(&on, task);
                    }
                }
                Err(err) => {
                    let recorded =
                        self.record_failure(&event, &entry.label(), &err.message, !entry.critical);
                    event.resolve_slot(index, None);
                    if entry.critical {
                        error!(
                            handler = %entry.label(),
                            "critical handler failed, skipping remaining handlers"
                        );
                        critical_failure = Some(recorded);
                        break;
                    }
                }
            }
        }

        if let Some(failure) = critical_failure {
            let dropped = self.inner.scheduler.lock().remove_origin(event.id());
            if dropped > 0 {
                warn!(dropped, "abandoned suspended handlers after critical failure");
            }
            event.abandon_unresolved();
            event.end_dispatch();
            self.complete_event(event.clone()).await;
            return Err(failure);
        }

        if event.end_dispatch() {
            self.complete_event(event.clone()).await;
        } else {
            trace!(event = %event.name(), "event awaiting suspended handlers");
        }
        Ok(())
    }

    /// Completes `event` and resumes everything transitively unblocked by
    /// it. Driven by an explicit worklist: resumption chains may be
    /// arbitrarily deep and must not recurse.
    async fn complete_event(&self, event: Event) {
        let mut worklist = VecDeque::from([event]);
        while let Some(done) = worklist.pop_front() {
            done.set_complete();
            trace!(event = %done.name(), "event complete");
            let waiters = self.inner.scheduler.lock().take_waiters(done.id());
            for task in waiters {
                if let Some(origin) = self.run_resume_chain(task, done.clone()).await {
                    worklist.push_back(origin);
                }
            }
        }
    }

    /// Resumes one task with its completed awaited event, following
    /// chained waits whose targets are already complete. Returns the
    /// origin event if this resumption made it completable.
    async fn run_resume_chain(&self, task: Task, completed: Event) -> Option<Event> {
        let Task {
            origin,
            slot,
            handler,
            resume,
        } = task;
        let mut result = (resume)(completed).await;
        loop {
            match result {
                Ok(Flow::Continue) => {
                    return origin.resolve_slot(slot, None).then_some(origin);
                }
                Ok(Flow::Value(value)) => {
                    return origin.resolve_slot(slot, Some(value)).then_some(origin);
                }
                Ok(Flow::Wait { on, resume }) => {
                    if on.is_complete() {
                        result = (resume)(on.clone()).await;
                        continue;
                    }
                    trace!(handler = %handler, awaited = %on.name(), "task suspended again");
                    self.inner.scheduler.lock().park(
                        &on,
                        Task {
                            origin,
                            slot,
                            handler,
                            resume,
                        },
                    );
                    return None;
                }
                Err(err) => {
                    self.record_failure(&origin, &handler, &err.message, true);
                    return origin.resolve_slot(slot, None).then_some(origin);
                }
            }
        }
    }

    /// Records a handler failure on `event` (first failure wins). The
    /// `exception` notification fires only for recorded non-critical
    /// failures; critical ones surface to the run-loop caller instead.
    fn record_failure(
        &self,
        event: &Event,
        handler: &str,
        message: &str,
        notify: bool,
    ) -> DispatchError {
        let failure = DispatchError {
            event: event.name().to_string(),
            handler: handler.to_string(),
            message: message.to_string(),
        };
        if event.try_set_error(failure.clone().into()) {
            warn!(event = %event.name(), handler, message, "handler failed");
            if notify && !event::is_engine_notification(event.name()) {
                let _ = self.fire(Event::exception(event.name(), handler, message));
            }
        } else {
            warn!(
                event = %event.name(),
                handler, message,
                "handler failure suppressed, an error is already recorded"
            );
        }
        failure
    }

    fn fail_pending_waits(&self) {
        let drained = self.inner.scheduler.lock().drain();
        let mut completable = Vec::new();
        for (awaited, task) in drained {
            let failure = UnresolvedWaitError {
                event: task.origin.name().to_string(),
                handler: task.handler.clone(),
                awaited,
            };
            warn!(%failure, "failing task at shutdown");
            task.origin.try_set_error(failure.into());
            if task.origin.resolve_slot(task.slot, None) {
                completable.push(task.origin);
            }
        }
        // Every parked task was just drained, so no resumption can cascade
        // from these completions.
        for origin in completable {
            origin.set_complete();
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("pending_events", &self.pending_events())
            .field("handlers", &self.handler_count())
            .field("components", &self.component_count())
            .field("parked_tasks", &self.parked_tasks())
            .finish()
    }
}
