//! The task scheduler: suspended handlers parked on awaited events.
//!
//! A [`Task`] wraps a handler paused at its wait directive: the event it
//! came from, the value slot it must splice into, and the continuation to
//! resume with once the awaited event completes. Tasks blocked on the same
//! event resume in FIFO blocking order.

use std::collections::HashMap;

use crate::foundation::event::{Event, EventId};
use crate::framework::handler::Resume;

/// A suspended handler invocation.
pub(crate) struct Task {
    /// The event whose dispatch this handler belongs to.
    pub(crate) origin: Event,
    /// Index into the origin's value accumulator.
    pub(crate) slot: usize,
    /// Label of the suspended handler, for error records.
    pub(crate) handler: String,
    /// Continuation invoked with the completed awaited event.
    pub(crate) resume: Resume,
}

struct Waiters {
    awaited: EventId,
    awaited_name: String,
    tasks: Vec<Task>,
}

/// Maps awaited events to the tasks blocked on them.
///
/// Kept as an insertion-ordered list so shutdown drains deterministically;
/// the number of distinct awaited events at any moment is small.
pub(crate) struct TaskScheduler {
    waiting: Vec<Waiters>,
    index: HashMap<EventId, usize>,
}

impl TaskScheduler {
    pub(crate) fn new() -> Self {
        Self {
            waiting: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Parks `task` until `awaited` completes.
    pub(crate) fn park(&mut self, awaited: &Event, task: Task) {
        match self.index.get(&awaited.id()) {
            Some(&at) => self.waiting[at].tasks.push(task),
            None => {
                self.index.insert(awaited.id(), self.waiting.len());
                self.waiting.push(Waiters {
                    awaited: awaited.id(),
                    awaited_name: awaited.name().to_string(),
                    tasks: vec![task],
                });
            }
        }
    }

    /// Takes every task blocked on `id`, in FIFO blocking order.
    pub(crate) fn take_waiters(&mut self, id: EventId) -> Vec<Task> {
        let Some(at) = self.index.remove(&id) else {
            return Vec::new();
        };
        let waiters = self.waiting.remove(at);
        // Positions shifted left by one past the removal point.
        for (offset, entry) in self.waiting.iter().enumerate() {
            self.index.insert(entry.awaited, offset);
        }
        waiters.tasks
    }

    /// Drops every task whose origin is `origin`. Used when a critical
    /// failure abandons an event's suspended handlers.
    pub(crate) fn remove_origin(&mut self, origin: EventId) -> usize {
        let mut dropped = 0;
        for entry in &mut self.waiting {
            let before = entry.tasks.len();
            entry.tasks.retain(|task| task.origin.id() != origin);
            dropped += before - entry.tasks.len();
        }
        self.waiting.retain(|entry| !entry.tasks.is_empty());
        self.index.clear();
        for (offset, entry) in self.waiting.iter().enumerate() {
            self.index.insert(entry.awaited, offset);
        }
        dropped
    }

    /// Empties the scheduler, yielding `(awaited event name, task)` pairs
    /// in park order. Used at shutdown to fail never-satisfied waits.
    pub(crate) fn drain(&mut self) -> Vec<(String, Task)> {
        self.index.clear();
        self.waiting
            .drain(..)
            .flat_map(|entry| {
                let name = entry.awaited_name;
                entry
                    .tasks
                    .into_iter()
                    .map(move |task| (name.clone(), task))
            })
            .collect()
    }

    /// Total number of parked tasks.
    pub(crate) fn len(&self) -> usize {
        self.waiting.iter().map(|entry| entry.tasks.len()).sum()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }
}
