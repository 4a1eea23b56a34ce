//! The pending-event buffer.
//!
//! FIFO between distinct fired events; ordering among the handlers of one
//! event is the registry's concern, not the queue's. The queue is owned by
//! the engine and touched once per tick — handlers enqueue only through
//! `fire`, never directly.

use std::collections::VecDeque;

use crate::foundation::error::{QueueResult, QueueStateError};
use crate::foundation::event::{Event, EventId};

/// An ordered buffer of pending events.
#[derive(Default)]
pub struct EventQueue {
    items: VecDeque<Event>,
}

impl EventQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event to the tail.
    pub fn enqueue(&mut self, event: Event) {
        self.items.push_back(event);
    }

    /// Re-inserts an event at the head, ahead of FIFO order.
    pub fn requeue_front(&mut self, event: Event) {
        self.items.push_front(event);
    }

    /// Removes and returns the head event.
    pub fn dequeue(&mut self) -> QueueResult<Event> {
        self.items.pop_front().ok_or(QueueStateError::Empty)
    }

    /// Removes and returns the head event, or `None` when idle.
    pub fn try_dequeue(&mut self) -> Option<Event> {
        self.items.pop_front()
    }

    /// Removes the event with identity `id` before its tick.
    pub fn withdraw(&mut self, id: EventId, name: &str) -> QueueResult<Event> {
        match self.items.iter().position(|event| event.id() == id) {
            Some(index) => Ok(self.items.remove(index).expect("position was just found")),
            None => Err(QueueStateError::NotQueued {
                name: name.to_string(),
            }),
        }
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl std::fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventQueue")
            .field("pending", &self.items.len())
            .finish()
    }
}
