//! Events: the messages routed through the dispatch engine.
//!
//! An [`Event`] carries a name, an opaque payload (positional and keyword
//! arguments as [`serde_json::Value`]s), and routing metadata: the target
//! channels and the firing component. Handlers never receive exclusive
//! ownership of the payload; the same instance is shared across every
//! handler invocation.
//!
//! `Event` is a cheap-clone handle over shared inner state. The engine is
//! the only writer of the dispatch bookkeeping (value accumulator, error
//! record, completion flag); callers observe it through [`Event::value`],
//! [`Event::error`] and [`Event::is_complete`] after firing:
//!
//! ```rust,ignore
//! use relay_core::Event;
//! use serde_json::json;
//!
//! let event = Event::named("greet").arg(json!("world")).build();
//! engine.fire(event.clone())?;
//! engine.tick().await?;
//! assert!(event.is_complete());
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde_json::{Map, Value, json};

use crate::foundation::error::{EventError, QueueResult, QueueStateError};

/// Event names reserved by the engine itself.
pub mod names {
    /// Fired once when the run loop boots.
    pub const STARTED: &str = "started";
    /// Fired when the engine shuts down.
    pub const STOPPED: &str = "stopped";
    /// Fired when a dispatched event matched no handler.
    pub const UNHANDLED: &str = "unhandled";
    /// Fired when a non-critical handler failure is recorded.
    pub const EXCEPTION: &str = "exception";
    /// Fired when a component is attached to the tree.
    pub const ATTACHED: &str = "attached";
    /// Fired when a component is detached from the tree.
    pub const DETACHED: &str = "detached";
}

/// Returns whether `name` is one of the engine's own notification events
/// (`unhandled` / `exception`). These are silently dropped when nothing
/// handles them, rather than generating further notifications.
pub(crate) fn is_engine_notification(name: &str) -> bool {
    name == names::UNHANDLED || name == names::EXCEPTION
}

/// Unique identity of an event instance, assigned at construction.
pub type EventId = u64;

static NEXT_EVENT_ID: AtomicU64 = AtomicU64::new(1);

// =============================================================================
// Dispatch state
// =============================================================================

/// Where an event instance is in its queue lifecycle.
///
/// `fire` moves `Created → Queued`; the dispatcher moves
/// `Queued → Dispatching → Complete`. Re-firing anything past `Created`
/// is a [`QueueStateError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Created,
    Queued,
    Dispatching,
    Complete,
}

/// One handler's contribution to the event's value accumulator.
#[derive(Debug, Clone)]
enum Slot {
    /// The handler has not run yet.
    Unfilled,
    /// The handler suspended; a parked task will fill this slot later.
    Pending,
    /// The handler finished (with or without a value).
    Done(Option<Value>),
}

struct DispatchState {
    lifecycle: Lifecycle,
    channels: Vec<String>,
    source: Option<String>,
    /// One slot per resolved handler, in resolved-priority order, so that
    /// suspended handlers splice their result back at the right index.
    slots: Vec<Slot>,
    /// Number of slots still marked [`Slot::Pending`].
    pending: usize,
    /// Set once the invocation loop has visited every handler.
    dispatch_done: bool,
    error: Option<EventError>,
}

// =============================================================================
// Event
// =============================================================================

struct EventInner {
    id: EventId,
    name: String,
    args: Vec<Value>,
    kwargs: Map<String, Value>,
    state: Mutex<DispatchState>,
}

/// A named, payload-carrying message routed through the dispatch engine.
///
/// Cloning is cheap (an `Arc` bump) and every clone observes the same
/// dispatch state.
#[derive(Clone)]
pub struct Event {
    inner: Arc<EventInner>,
}

impl Event {
    /// Creates an event with no payload and no target channels.
    pub fn new(name: impl Into<String>) -> Self {
        Self::named(name).build()
    }

    /// Starts building an event with payload and routing metadata.
    pub fn named(name: impl Into<String>) -> EventBuilder {
        EventBuilder {
            name: name.into(),
            args: Vec::new(),
            kwargs: Map::new(),
            channels: Vec::new(),
        }
    }

    // ─── Reserved events ─────────────────────────────────────────────────────

    /// The `started` event, fired once at engine boot.
    pub fn started() -> Self {
        Self::new(names::STARTED)
    }

    /// The `stopped` event, fired at engine shutdown.
    pub fn stopped() -> Self {
        Self::new(names::STOPPED)
    }

    /// The `unhandled` notification, fired when `of` matched no handler.
    pub fn unhandled(of: &str) -> Self {
        Self::named(names::UNHANDLED).arg(json!(of)).build()
    }

    /// The `exception` notification, fired when a handler failure is
    /// recorded.
    pub fn exception(event: &str, handler: &str, message: &str) -> Self {
        Self::named(names::EXCEPTION)
            .kwarg("event", json!(event))
            .kwarg("handler", json!(handler))
            .kwarg("message", json!(message))
            .build()
    }

    /// The `attached` lifecycle event for a newly attached component.
    pub fn attached(component: &str, parent: &str) -> Self {
        Self::named(names::ATTACHED)
            .arg(json!(component))
            .arg(json!(parent))
            .build()
    }

    /// The `detached` lifecycle event for a removed component.
    pub fn detached(component: &str, parent: &str) -> Self {
        Self::named(names::DETACHED)
            .arg(json!(component))
            .arg(json!(parent))
            .build()
    }

    // ─── Identity and payload ────────────────────────────────────────────────

    /// The unique identity of this event instance.
    pub fn id(&self) -> EventId {
        self.inner.id
    }

    /// The event name used for handler matching.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Positional payload arguments.
    pub fn args(&self) -> &[Value] {
        &self.inner.args
    }

    /// The positional argument at `index`, if present.
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.inner.args.get(index)
    }

    /// Keyword payload arguments.
    pub fn kwargs(&self) -> &Map<String, Value> {
        &self.inner.kwargs
    }

    /// The keyword argument named `key`, if present.
    pub fn kwarg(&self, key: &str) -> Option<&Value> {
        self.inner.kwargs.get(key)
    }

    /// Target channels; empty means global delivery.
    pub fn channels(&self) -> Vec<String> {
        self.inner.state.lock().channels.clone()
    }

    /// Name of the component that fired this event, if it was fired
    /// through a component handle.
    pub fn source(&self) -> Option<String> {
        self.inner.state.lock().source.clone()
    }

    // ─── Dispatch results ────────────────────────────────────────────────────

    /// Handler return values in resolved-priority order.
    ///
    /// Suspended handlers contribute at the index they were resolved at,
    /// regardless of when they actually resumed.
    pub fn value(&self) -> Vec<Value> {
        let state = self.inner.state.lock();
        state
            .slots
            .iter()
            .filter_map(|slot| match slot {
                Slot::Done(Some(value)) => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    /// The failure recorded for this event, if any. At most one is ever
    /// recorded; later failures are suppressed.
    pub fn error(&self) -> Option<EventError> {
        self.inner.state.lock().error.clone()
    }

    /// Whether no further handlers will run for this event.
    pub fn is_complete(&self) -> bool {
        self.inner.state.lock().lifecycle == Lifecycle::Complete
    }

    // ─── Engine bookkeeping (crate-internal) ─────────────────────────────────

    /// Transitions `Created → Queued`; the second `fire` of the same
    /// instance fails here.
    pub(crate) fn mark_queued(&self) -> QueueResult<()> {
        if self.inner.name.is_empty() {
            return Err(QueueStateError::EmptyName);
        }
        let mut state = self.inner.state.lock();
        match state.lifecycle {
            Lifecycle::Created => {
                state.lifecycle = Lifecycle::Queued;
                Ok(())
            }
            Lifecycle::Queued | Lifecycle::Dispatching => Err(QueueStateError::AlreadyQueued {
                name: self.inner.name.clone(),
            }),
            Lifecycle::Complete => Err(QueueStateError::AlreadyCompleted {
                name: self.inner.name.clone(),
            }),
        }
    }

    /// Records the firing component's channel, used by `Component::fire`.
    pub(crate) fn set_source(&self, source: &str) {
        let mut state = self.inner.state.lock();
        if state.source.is_none() {
            state.source = Some(source.to_string());
        }
    }

    /// Adds a target channel. Rejected once the event has been queued.
    pub(crate) fn add_channel(&self, channel: &str) -> QueueResult<()> {
        let mut state = self.inner.state.lock();
        if state.lifecycle != Lifecycle::Created {
            return Err(QueueStateError::AlreadyQueued {
                name: self.inner.name.clone(),
            });
        }
        if !state.channels.iter().any(|c| c == channel) {
            state.channels.push(channel.to_string());
        }
        Ok(())
    }

    /// Sets up one value slot per resolved handler.
    pub(crate) fn begin_dispatch(&self, handler_count: usize) {
        let mut state = self.inner.state.lock();
        state.lifecycle = Lifecycle::Dispatching;
        state.slots = vec![Slot::Unfilled; handler_count];
        state.pending = 0;
        state.dispatch_done = false;
    }

    /// Marks slot `index` as owned by a parked task.
    pub(crate) fn mark_pending(&self, index: usize) {
        let mut state = self.inner.state.lock();
        state.slots[index] = Slot::Pending;
        state.pending += 1;
    }

    /// Fills slot `index` with a handler's result. Returns `true` when the
    /// event became completable (every handler visited, nothing pending).
    pub(crate) fn resolve_slot(&self, index: usize, value: Option<Value>) -> bool {
        let mut state = self.inner.state.lock();
        if matches!(state.slots[index], Slot::Pending) {
            state.pending -= 1;
        }
        state.slots[index] = Slot::Done(value);
        state.dispatch_done && state.pending == 0
    }

    /// Marks the invocation loop finished. Returns `true` when nothing is
    /// pending and the event can complete in this tick.
    pub(crate) fn end_dispatch(&self) -> bool {
        let mut state = self.inner.state.lock();
        state.dispatch_done = true;
        state.pending == 0
    }

    /// Marks the event complete. Exclusive to the dispatcher.
    pub(crate) fn set_complete(&self) {
        self.inner.state.lock().lifecycle = Lifecycle::Complete;
    }

    /// Completes a queued event that was withdrawn before its tick.
    pub(crate) fn mark_withdrawn(&self) {
        let mut state = self.inner.state.lock();
        state.lifecycle = Lifecycle::Complete;
        state.dispatch_done = true;
    }

    /// Resolves every unfilled or pending slot with no value. Used when a
    /// critical failure abandons the event's remaining handlers.
    pub(crate) fn abandon_unresolved(&self) {
        let mut state = self.inner.state.lock();
        for slot in &mut state.slots {
            if !matches!(slot, Slot::Done(_)) {
                *slot = Slot::Done(None);
            }
        }
        state.pending = 0;
    }

    /// Records a failure; the first one wins. Returns whether this call
    /// recorded it.
    pub(crate) fn try_set_error(&self, error: EventError) -> bool {
        let mut state = self.inner.state.lock();
        if state.error.is_none() {
            state.error = Some(error);
            true
        } else {
            false
        }
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Event")
            .field("name", &self.inner.name)
            .field("id", &self.inner.id)
            .field("channels", &state.channels)
            .field("complete", &(state.lifecycle == Lifecycle::Complete))
            .finish()
    }
}

// =============================================================================
// EventBuilder
// =============================================================================

/// Builds an [`Event`] with payload and routing metadata.
pub struct EventBuilder {
    name: String,
    args: Vec<Value>,
    kwargs: Map<String, Value>,
    channels: Vec<String>,
}

impl EventBuilder {
    /// Appends a positional argument.
    pub fn arg(mut self, value: Value) -> Self {
        self.args.push(value);
        self
    }

    /// Sets a keyword argument.
    pub fn kwarg(mut self, key: impl Into<String>, value: Value) -> Self {
        self.kwargs.insert(key.into(), value);
        self
    }

    /// Adds a target channel. Without any, the event is delivered
    /// globally.
    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        let channel = channel.into();
        if !self.channels.iter().any(|c| *c == channel) {
            self.channels.push(channel);
        }
        self
    }

    /// Finishes the event. Name emptiness is checked at `fire` time.
    pub fn build(self) -> Event {
        Event {
            inner: Arc::new(EventInner {
                id: NEXT_EVENT_ID.fetch_add(1, Ordering::Relaxed),
                name: self.name,
                args: self.args,
                kwargs: self.kwargs,
                state: Mutex::new(DispatchState {
                    lifecycle: Lifecycle::Created,
                    channels: self.channels,
                    source: None,
                    slots: Vec::new(),
                    pending: 0,
                    dispatch_done: false,
                    error: None,
                }),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_payload_is_accessible() {
        let event = Event::named("greet")
            .arg(json!("world"))
            .kwarg("volume", json!(11))
            .channel("speaker")
            .build();

        assert_eq!(event.name(), "greet");
        assert_eq!(event.arg(0), Some(&json!("world")));
        assert_eq!(event.arg(1), None);
        assert_eq!(event.kwarg("volume"), Some(&json!(11)));
        assert_eq!(event.channels(), vec!["speaker".to_string()]);
        assert!(!event.is_complete());
        assert!(event.value().is_empty());
    }

    #[test]
    fn clones_share_state() {
        let event = Event::new("greet");
        let other = event.clone();
        assert_eq!(event.id(), other.id());

        event.mark_queued().unwrap();
        let err = other.mark_queued().unwrap_err();
        assert!(matches!(err, QueueStateError::AlreadyQueued { .. }));
    }

    #[test]
    fn empty_name_is_rejected_at_queue_time() {
        let event = Event::new("");
        assert!(matches!(
            event.mark_queued(),
            Err(QueueStateError::EmptyName)
        ));
    }

    #[test]
    fn completed_event_cannot_be_requeued() {
        let event = Event::new("once");
        event.mark_queued().unwrap();
        event.begin_dispatch(0);
        event.end_dispatch();
        event.set_complete();
        assert!(matches!(
            event.mark_queued(),
            Err(QueueStateError::AlreadyCompleted { .. })
        ));
    }

    #[test]
    fn pending_slot_splices_in_order() {
        let event = Event::new("splice");
        event.mark_queued().unwrap();
        event.begin_dispatch(3);

        // Handler 0 returns directly, handler 1 suspends, handler 2 returns.
        assert!(!event.resolve_slot(0, Some(json!("first"))));
        event.mark_pending(1);
        assert!(!event.resolve_slot(2, Some(json!("third"))));
        assert!(!event.end_dispatch());

        // The parked task resolves later, splicing into the middle.
        assert!(event.resolve_slot(1, Some(json!("second"))));
        event.set_complete();

        assert_eq!(
            event.value(),
            vec![json!("first"), json!("second"), json!("third")]
        );
        assert!(event.is_complete());
    }

    #[test]
    fn first_error_wins() {
        let event = Event::new("boom");
        let first = crate::DispatchError {
            event: "boom".into(),
            handler: "a:boom".into(),
            message: "first".into(),
        };
        let second = crate::DispatchError {
            event: "boom".into(),
            handler: "b:boom".into(),
            message: "second".into(),
        };
        assert!(event.try_set_error(first.into()));
        assert!(!event.try_set_error(second.into()));
        match event.error() {
            Some(EventError::Dispatch(err)) => assert_eq!(err.message, "first"),
            other => panic!("unexpected error record: {other:?}"),
        }
    }

    #[test]
    fn channels_freeze_once_queued() {
        let event = Event::new("route");
        event.add_channel("a").unwrap();
        event.mark_queued().unwrap();
        assert!(matches!(
            event.add_channel("b"),
            Err(QueueStateError::AlreadyQueued { .. })
        ));
        assert_eq!(event.channels(), vec!["a".to_string()]);
    }
}
