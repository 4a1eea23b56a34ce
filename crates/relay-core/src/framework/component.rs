//! The component tree and its public handles.
//!
//! Components form the addressable channel namespace: a tree rooted at the
//! engine's root component, where each node owns its children and its own
//! handler registrations. Ownership flows parent to child only; nodes keep
//! a non-owning parent id so teardown order is unambiguous (children first,
//! then registry entries, then the node itself).
//!
//! Handlers are declared once, at construction, through
//! [`ComponentBuilder`]:
//!
//! ```rust,ignore
//! use relay_core::{Engine, Flow, on};
//! use serde_json::json;
//!
//! let engine = Engine::new();
//! let root = engine.root();
//! let greeter = engine
//!     .component("greeter")
//!     .handler(on("greet"), |_call| async { Ok(Flow::value(json!("hi"))) })
//!     .attach(&root)?;
//! ```

use std::collections::HashMap;
use std::future::Future;

use crate::foundation::error::{QueueResult, RegistrationError, RegistrationResult};
use crate::foundation::event::Event;
use crate::framework::engine::Engine;
use crate::framework::handler::{HandlerCall, HandlerFn, HandlerResult, HandlerSpec, into_handler};
use crate::framework::registry::HandlerId;

/// Identity of a component within an engine's tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentId(pub(crate) u64);

// =============================================================================
// ComponentTree (engine-internal)
// =============================================================================

pub(crate) struct ComponentNode {
    pub(crate) name: String,
    pub(crate) parent: Option<ComponentId>,
    pub(crate) children: Vec<ComponentId>,
}

/// Arena of component nodes. Names are unique tree-wide because channels
/// address components by name.
pub(crate) struct ComponentTree {
    nodes: HashMap<ComponentId, ComponentNode>,
    by_name: HashMap<String, ComponentId>,
    root: ComponentId,
    next: u64,
}

impl ComponentTree {
    pub(crate) fn new(root_name: &str) -> Self {
        let root = ComponentId(0);
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            ComponentNode {
                name: root_name.to_string(),
                parent: None,
                children: Vec::new(),
            },
        );
        let mut by_name = HashMap::new();
        by_name.insert(root_name.to_string(), root);
        Self {
            nodes,
            by_name,
            root,
            next: 1,
        }
    }

    pub(crate) fn root(&self) -> ComponentId {
        self.root
    }

    pub(crate) fn contains(&self, id: ComponentId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub(crate) fn id_of(&self, name: &str) -> Option<ComponentId> {
        self.by_name.get(name).copied()
    }

    pub(crate) fn name_of(&self, id: ComponentId) -> Option<&str> {
        self.nodes.get(&id).map(|node| node.name.as_str())
    }

    pub(crate) fn add(
        &mut self,
        parent: ComponentId,
        name: &str,
    ) -> RegistrationResult<ComponentId> {
        if !self.nodes.contains_key(&parent) {
            return Err(RegistrationError::UnknownComponent {
                name: format!("#{}", parent.0),
            });
        }
        if self.by_name.contains_key(name) {
            return Err(RegistrationError::DuplicateComponent {
                name: name.to_string(),
            });
        }
        let id = ComponentId(self.next);
        self.next += 1;
        self.nodes.insert(
            id,
            ComponentNode {
                name: name.to_string(),
                parent: Some(parent),
                children: Vec::new(),
            },
        );
        self.by_name.insert(name.to_string(), id);
        self.nodes
            .get_mut(&parent)
            .expect("parent presence was just checked")
            .children
            .push(id);
        Ok(id)
    }

    /// Removes `id` and its whole subtree. Returns the removed nodes in
    /// teardown order (children before parents) as
    /// `(id, name, parent name)` tuples.
    pub(crate) fn remove(
        &mut self,
        id: ComponentId,
    ) -> RegistrationResult<Vec<(ComponentId, String, String)>> {
        if id == self.root {
            return Err(RegistrationError::CannotDetachRoot);
        }
        let node = self
            .nodes
            .get(&id)
            .ok_or_else(|| RegistrationError::UnknownComponent {
                name: format!("#{}", id.0),
            })?;
        let parent = node.parent.expect("only the root has no parent");

        // Post-order walk: children are torn down before their parent.
        let mut order = Vec::new();
        self.collect_post_order(id, &mut order);

        let mut removed = Vec::with_capacity(order.len());
        for child in order {
            let node = self
                .nodes
                .remove(&child)
                .expect("post-order ids come from the tree");
            let parent_name = node
                .parent
                .and_then(|p| self.name_of(p).map(str::to_string))
                .unwrap_or_default();
            self.by_name.remove(&node.name);
            removed.push((child, node.name, parent_name));
        }

        let siblings = &mut self
            .nodes
            .get_mut(&parent)
            .expect("parent outlives its children")
            .children;
        siblings.retain(|child| *child != id);
        Ok(removed)
    }

    fn collect_post_order(&self, id: ComponentId, out: &mut Vec<ComponentId>) {
        if let Some(node) = self.nodes.get(&id) {
            for child in node.children.clone() {
                self.collect_post_order(child, out);
            }
            out.push(id);
        }
    }

    /// Whether `inner` is `outer` or one of its descendants.
    pub(crate) fn is_within(&self, inner: ComponentId, outer: ComponentId) -> bool {
        let mut cursor = Some(inner);
        while let Some(id) = cursor {
            if id == outer {
                return true;
            }
            cursor = self.nodes.get(&id).and_then(|node| node.parent);
        }
        false
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }
}

// =============================================================================
// Component handle
// =============================================================================

/// A live component: a node in the engine's tree, addressable as a channel
/// and owning its handler registrations.
#[derive(Clone)]
pub struct Component {
    id: ComponentId,
    name: String,
    engine: Engine,
}

impl Component {
    pub(crate) fn new(id: ComponentId, name: String, engine: Engine) -> Self {
        Self { id, name, engine }
    }

    /// The component's identity in the tree.
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// The component's name, which is also its channel address.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fires an event through the owning engine's queue.
    ///
    /// An event with no explicit target is scoped to this component's
    /// channel, mirroring the way component-fired events default to their
    /// origin.
    pub fn fire(&self, event: Event) -> QueueResult<Event> {
        if event.channels().is_empty() {
            event.add_channel(&self.name)?;
        }
        event.set_source(&self.name);
        self.engine.fire(event)
    }

    /// Registers one extra handler on this component, outside the
    /// construction-time declarations. Returns a token for
    /// [`unregister`](Self::unregister).
    pub fn register<F, Fut>(&self, spec: HandlerSpec, f: F) -> RegistrationResult<HandlerId>
    where
        F: Fn(HandlerCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.engine
            .register_handler(self.id, &self.name, spec, into_handler(f))
    }

    /// Removes a handler registered through [`register`](Self::register)
    /// or the builder.
    pub fn unregister(&self, id: HandlerId) -> RegistrationResult<()> {
        self.engine.unregister_handler(id)
    }

    /// Detaches this component and its whole subtree from the engine:
    /// children first, then all handler registrations atomically, then the
    /// node itself. Fires one `detached` event per removed component.
    pub fn detach(self) -> RegistrationResult<()> {
        self.engine.detach(self.id)
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.id.0)
            .field("name", &self.name)
            .finish()
    }
}

// =============================================================================
// ComponentBuilder
// =============================================================================

/// Builds a component with its handlers declared up front.
///
/// `attach` registers everything atomically: either the component lands in
/// the tree with all of its handlers, or nothing is registered at all.
pub struct ComponentBuilder {
    engine: Engine,
    name: String,
    handlers: Vec<(HandlerSpec, HandlerFn)>,
}

impl ComponentBuilder {
    pub(crate) fn new(engine: Engine, name: String) -> Self {
        Self {
            engine,
            name,
            handlers: Vec::new(),
        }
    }

    /// Declares a handler. Declaration order is the registration order used
    /// for priority tie-breaks.
    pub fn handler<F, Fut>(mut self, spec: HandlerSpec, f: F) -> Self
    where
        F: Fn(HandlerCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.handlers.push((spec, into_handler(f)));
        self
    }

    /// Attaches the component under `parent`, registering its handlers and
    /// firing the `attached` lifecycle event.
    pub fn attach(self, parent: &Component) -> RegistrationResult<Component> {
        let Self {
            engine,
            name,
            handlers,
        } = self;
        engine.attach_component(parent.id(), name, handlers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique_tree_wide() {
        let mut tree = ComponentTree::new("root");
        let audio = tree.add(tree.root(), "audio").unwrap();
        tree.add(audio, "mixer").unwrap();

        assert!(matches!(
            tree.add(tree.root(), "mixer"),
            Err(RegistrationError::DuplicateComponent { .. })
        ));
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn removal_is_children_first() {
        let mut tree = ComponentTree::new("root");
        let audio = tree.add(tree.root(), "audio").unwrap();
        let mixer = tree.add(audio, "mixer").unwrap();
        tree.add(mixer, "gain").unwrap();

        let removed = tree.remove(audio).unwrap();
        let names: Vec<&str> = removed.iter().map(|(_, name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["gain", "mixer", "audio"]);
        assert_eq!(tree.len(), 1);
        assert!(tree.id_of("mixer").is_none());
    }

    #[test]
    fn root_cannot_be_removed() {
        let mut tree = ComponentTree::new("root");
        assert!(matches!(
            tree.remove(tree.root()),
            Err(RegistrationError::CannotDetachRoot)
        ));
    }

    #[test]
    fn is_within_walks_ancestry() {
        let mut tree = ComponentTree::new("root");
        let audio = tree.add(tree.root(), "audio").unwrap();
        let mixer = tree.add(audio, "mixer").unwrap();
        let video = tree.add(tree.root(), "video").unwrap();

        assert!(tree.is_within(mixer, audio));
        assert!(tree.is_within(mixer, tree.root()));
        assert!(tree.is_within(audio, audio));
        assert!(!tree.is_within(audio, mixer));
        assert!(!tree.is_within(video, audio));
    }
}
