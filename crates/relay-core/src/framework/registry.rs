//! The channel registry: who hears what, and in which order.
//!
//! Registrations live in a flat arena of [`HandlerEntry`] records indexed
//! by component id — dispatch is a lookup and a sort, not a virtual-call
//! hierarchy. [`HandlerRegistry::resolve`] is pure: it never mutates the
//! registry or the event, and the same registry state always yields the
//! same handler order.
//!
//! Ordering rules:
//! 1. priority, descending;
//! 2. exact-name matches before wildcard matches at equal priority;
//! 3. registration order (ascending) as the final tie-break.

use std::sync::Arc;

use crate::foundation::error::{RegistrationError, RegistrationResult};
use crate::foundation::event::Event;
use crate::framework::component::{ComponentId, ComponentTree};
use crate::framework::handler::{HandlerFn, HandlerSpec, Pattern};

/// Token returned by `register`, usable for `unregister`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(pub(crate) u64);

/// One registered handler: the tagged record dispatch sorts over.
pub(crate) struct HandlerEntry {
    pub(crate) id: HandlerId,
    pub(crate) pattern: Pattern,
    pub(crate) channel: Option<String>,
    pub(crate) priority: i32,
    pub(crate) critical: bool,
    pub(crate) seq: u64,
    pub(crate) component: ComponentId,
    pub(crate) component_name: String,
    pub(crate) callable: HandlerFn,
}

impl HandlerEntry {
    /// Stable label used in logs and error records.
    pub(crate) fn label(&self) -> String {
        format!("{}:{}", self.component_name, self.pattern.as_str())
    }
}

/// Arena of handler registrations with pure, deterministic resolution.
pub(crate) struct HandlerRegistry {
    entries: Vec<Arc<HandlerEntry>>,
    next: u64,
}

impl HandlerRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
            next: 0,
        }
    }

    pub(crate) fn register(
        &mut self,
        component: ComponentId,
        component_name: &str,
        spec: HandlerSpec,
        callable: HandlerFn,
    ) -> RegistrationResult<HandlerId> {
        if matches!(&spec.pattern, Pattern::Exact(name) if name.is_empty()) {
            return Err(RegistrationError::EmptyPattern);
        }
        let seq = self.next;
        self.next += 1;
        let id = HandlerId(seq);
        self.entries.push(Arc::new(HandlerEntry {
            id,
            pattern: spec.pattern,
            channel: spec.channel,
            priority: spec.priority,
            critical: spec.critical,
            seq,
            component,
            component_name: component_name.to_string(),
            callable,
        }));
        Ok(id)
    }

    pub(crate) fn unregister(&mut self, id: HandlerId) -> RegistrationResult<()> {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        if self.entries.len() == before {
            return Err(RegistrationError::UnknownHandler { id: id.0 });
        }
        Ok(())
    }

    /// Removes every handler owned by `component` in one pass, so no
    /// dangling handler can be resolved after a teardown.
    pub(crate) fn unregister_component(&mut self, component: ComponentId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.component != component);
        before - self.entries.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Resolves the ordered handler list for `event`.
    ///
    /// An event without target channels is a broadcast: every handler
    /// whose pattern matches is a candidate. With targets, a handler
    /// matches when it is unrestricted, or its channel is one of the
    /// targets, or (tree-scoped) a descendant of one.
    pub(crate) fn resolve(&self, event: &Event, tree: &ComponentTree) -> Vec<Arc<HandlerEntry>> {
        let targets = event.channels();
        let mut matched: Vec<Arc<HandlerEntry>> = self
            .entries
            .iter()
            .filter(|entry| entry.pattern.matches(event.name()))
            .filter(|entry| Self::channel_matches(entry, &targets, tree))
            .cloned()
            .collect();

        matched.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| Self::wildcard_rank(&a.pattern).cmp(&Self::wildcard_rank(&b.pattern)))
                .then_with(|| a.seq.cmp(&b.seq))
        });
        matched
    }

    fn wildcard_rank(pattern: &Pattern) -> u8 {
        match pattern {
            Pattern::Exact(_) => 0,
            Pattern::Any => 1,
        }
    }

    fn channel_matches(entry: &HandlerEntry, targets: &[String], tree: &ComponentTree) -> bool {
        let Some(restriction) = entry.channel.as_deref() else {
            return true;
        };
        if targets.is_empty() {
            // Broadcast reaches restricted handlers too.
            return true;
        }
        targets.iter().any(|target| {
            if target == restriction {
                return true;
            }
            match (tree.id_of(restriction), tree.id_of(target)) {
                (Some(inner), Some(outer)) => tree.is_within(inner, outer),
                _ => false,
            }
        })
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::handler::{Flow, on, on_any};

    fn noop() -> HandlerFn {
        Arc::new(|_call| Box::pin(async { Ok(Flow::Continue) }))
    }

    fn labels(resolved: &[Arc<HandlerEntry>]) -> Vec<String> {
        resolved.iter().map(|entry| entry.label()).collect()
    }

    #[test]
    fn priority_descending_then_registration_order() {
        let tree = ComponentTree::new("root");
        let mut registry = HandlerRegistry::new();
        let root = tree.root();
        registry.register(root, "a", on("greet"), noop()).unwrap();
        registry
            .register(root, "b", on("greet").priority(10), noop())
            .unwrap();
        registry
            .register(root, "c", on("greet").priority(10), noop())
            .unwrap();

        let resolved = registry.resolve(&Event::new("greet"), &tree);
        assert_eq!(labels(&resolved), vec!["b:greet", "c:greet", "a:greet"]);
    }

    #[test]
    fn exact_beats_wildcard_at_equal_priority() {
        let tree = ComponentTree::new("root");
        let mut registry = HandlerRegistry::new();
        let root = tree.root();
        registry.register(root, "log", on_any(), noop()).unwrap();
        registry
            .register(root, "exact", on("greet"), noop())
            .unwrap();
        registry
            .register(root, "loud", on_any().priority(5), noop())
            .unwrap();

        let resolved = registry.resolve(&Event::new("greet"), &tree);
        assert_eq!(labels(&resolved), vec!["loud:*", "exact:greet", "log:*"]);
    }

    #[test]
    fn name_mismatch_excludes_handler() {
        let tree = ComponentTree::new("root");
        let mut registry = HandlerRegistry::new();
        registry
            .register(tree.root(), "a", on("greet"), noop())
            .unwrap();

        assert!(registry.resolve(&Event::new("farewell"), &tree).is_empty());
    }

    #[test]
    fn channel_restriction_scopes_to_target_subtree() {
        let mut tree = ComponentTree::new("root");
        let audio = tree.add(tree.root(), "audio").unwrap();
        tree.add(audio, "mixer").unwrap();
        tree.add(tree.root(), "video").unwrap();

        let mut registry = HandlerRegistry::new();
        let root = tree.root();
        registry
            .register(root, "anywhere", on("tune"), noop())
            .unwrap();
        registry
            .register(root, "mix", on("tune").channel("mixer"), noop())
            .unwrap();
        registry
            .register(root, "vid", on("tune").channel("video"), noop())
            .unwrap();

        // Targeting "audio" reaches the unrestricted handler plus the one
        // scoped to a descendant of the target.
        let event = Event::named("tune").channel("audio").build();
        assert_eq!(
            labels(&registry.resolve(&event, &tree)),
            vec!["anywhere:tune", "mix:tune"]
        );

        // A broadcast reaches everything.
        let broadcast = Event::new("tune");
        assert_eq!(registry.resolve(&broadcast, &tree).len(), 3);
    }

    #[test]
    fn unregister_component_is_atomic() {
        let mut tree = ComponentTree::new("root");
        let audio = tree.add(tree.root(), "audio").unwrap();
        let mut registry = HandlerRegistry::new();
        registry.register(audio, "audio", on("a"), noop()).unwrap();
        registry
            .register(audio, "audio", on_any(), noop())
            .unwrap();
        registry
            .register(tree.root(), "root", on("a"), noop())
            .unwrap();

        assert_eq!(registry.unregister_component(audio), 2);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn empty_pattern_is_rejected() {
        let tree = ComponentTree::new("root");
        let mut registry = HandlerRegistry::new();
        assert!(matches!(
            registry.register(tree.root(), "root", on(""), noop()),
            Err(RegistrationError::EmptyPattern)
        ));
    }

    #[test]
    fn resolve_is_pure() {
        let tree = ComponentTree::new("root");
        let mut registry = HandlerRegistry::new();
        registry
            .register(tree.root(), "a", on("greet").priority(3), noop())
            .unwrap();
        registry
            .register(tree.root(), "b", on_any(), noop())
            .unwrap();

        let event = Event::new("greet");
        let first = labels(&registry.resolve(&event, &tree));
        let second = labels(&registry.resolve(&event, &tree));
        assert_eq!(first, second);
        assert_eq!(registry.len(), 2);
    }
}
