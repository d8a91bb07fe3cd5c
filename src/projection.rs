use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::warn;

use crate::ancestry::{ancestor_chain, detach_recursively};
use crate::errors::HierarchyResult;
use crate::event::{ChildEvent, Observer, ObserverRef, Property, PropertyChange};
use crate::hierarchy::Hierarchy;
use crate::model::{NodeData, NodeId, NodeKind};
use crate::ordering::sort_by_name;

/// Where in the projected tree something changed: the chain of nodes from the
/// root down to the affected node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeModelEvent {
    pub path: Vec<NodeId>,
}

impl TreeModelEvent {
    pub fn last(&self) -> Option<NodeId> {
        self.path.last().copied()
    }
}

pub trait TreeListener: Send + Sync {
    /// The children below `event.path` changed; re-query them.
    fn structure_changed(&self, _event: &TreeModelEvent) {}

    /// The node at the end of `event.path` changed how it displays.
    fn nodes_changed(&self, _event: &TreeModelEvent) {}
}

pub type ListenerRef = Arc<dyn TreeListener>;

/// A read-only, name-ordered view of a hierarchy for display.
///
/// Conversations are left out, and a category shows its member contacts as
/// its children. The view keeps itself attached to every visible node, so it
/// stays registered in the hierarchy until [`ContactTree::release`] is called.
pub struct ContactTree {
    root: NodeId,
    listeners: Mutex<Vec<ListenerRef>>,
    this: Weak<ContactTree>,
}

impl ContactTree {
    pub fn new(tree: &Hierarchy) -> HierarchyResult<Arc<Self>> {
        let root = tree.root();
        tree.get(root)?;
        let projection = Arc::new_cyclic(|this| ContactTree {
            root,
            listeners: Mutex::new(Vec::new()),
            this: this.clone(),
        });
        let observer: ObserverRef = projection.clone();
        attach_visible(tree, root, &observer)?;
        Ok(projection)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn listeners(&self) -> MutexGuard<'_, Vec<ListenerRef>> {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self, listener: ListenerRef) {
        let mut listeners = self.listeners();
        listeners.retain(|existing| !same_listener(existing, &listener));
        listeners.push(listener);
    }

    pub fn unsubscribe(&self, listener: &ListenerRef) -> bool {
        let mut listeners = self.listeners();
        let before = listeners.len();
        listeners.retain(|existing| !same_listener(existing, listener));
        listeners.len() != before
    }

    /// Detaches the view from every node of `tree`.
    pub fn release(&self, tree: &Hierarchy) -> HierarchyResult<()> {
        match self.as_observer() {
            Some(observer) => detach_recursively(tree, self.root, &observer),
            None => Ok(()),
        }
    }

    pub fn child_count(&self, tree: &Hierarchy, parent: NodeId) -> usize {
        visible_children(tree, parent).len()
    }

    pub fn child_at(&self, tree: &Hierarchy, parent: NodeId, index: usize) -> Option<NodeId> {
        visible_children(tree, parent).get(index).copied()
    }

    pub fn index_of(&self, tree: &Hierarchy, parent: NodeId, child: NodeId) -> Option<usize> {
        visible_children(tree, parent)
            .iter()
            .position(|id| *id == child)
    }

    pub fn is_leaf(&self, tree: &Hierarchy, node: NodeId) -> bool {
        tree.kind(node).is_ok_and(|kind| kind == NodeKind::Contact)
    }

    /// Renders the visible tree below the root, one node per line, indented
    /// two spaces per level.
    pub fn outline(&self, tree: &Hierarchy) -> String {
        let mut lines = Vec::new();
        for child in visible_children(tree, self.root) {
            outline_node(tree, child, 0, &mut lines);
        }
        lines.join("\n")
    }

    fn as_observer(&self) -> Option<ObserverRef> {
        self.this.upgrade().map(|this| this as ObserverRef)
    }

    fn notify(&self, event: TreeModelEvent, structural: bool) {
        let listeners = self.listeners().clone();
        for listener in listeners {
            if structural {
                listener.structure_changed(&event);
            } else {
                listener.nodes_changed(&event);
            }
        }
    }
}

impl fmt::Debug for ContactTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContactTree")
            .field("root", &self.root)
            .field("listeners", &self.listeners().len())
            .finish()
    }
}

fn same_listener(a: &ListenerRef, b: &ListenerRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

fn is_conversation(tree: &Hierarchy, id: NodeId) -> bool {
    tree.kind(id).is_ok_and(|kind| kind == NodeKind::Conversation)
}

/// Attaches to `node` and everything below it except conversations.
fn attach_visible(tree: &Hierarchy, node: NodeId, observer: &ObserverRef) -> HierarchyResult<()> {
    if is_conversation(tree, node) {
        return Ok(());
    }
    tree.attach(node, observer.clone())?;
    for child in tree.children(node) {
        attach_visible(tree, child, observer)?;
    }
    Ok(())
}

fn visible_children(tree: &Hierarchy, parent: NodeId) -> Vec<NodeId> {
    let Ok(node) = tree.get(parent) else {
        return Vec::new();
    };
    let mut children = match node.data() {
        NodeData::Root => tree.children(parent),
        NodeData::Account(_) => tree
            .children(parent)
            .into_iter()
            .filter(|child| !is_conversation(tree, *child))
            .collect(),
        // Only members still owned by the category's account are observed.
        NodeData::Category(category) => {
            let owner = tree.parent(parent);
            category
                .members()
                .iter()
                .copied()
                .filter(|member| owner.is_some() && tree.parent(*member) == owner)
                .collect()
        }
        NodeData::Contact(_) | NodeData::Conversation(_) => Vec::new(),
    };
    sort_by_name(tree, &mut children);
    children
}

fn label(tree: &Hierarchy, id: NodeId) -> String {
    let Ok(node) = tree.get(id) else {
        return format!("<missing {id:?}>");
    };
    match (node.as_contact(), node.name()) {
        (Some(contact), Some(name)) => {
            format!("{name} ({}) {}", contact.address(), contact.status())
        }
        (Some(contact), None) => format!("{} {}", contact.address(), contact.status()),
        (None, Some(name)) => name.to_string(),
        (None, None) => format!("<unnamed {}>", node.kind()),
    }
}

fn outline_node(tree: &Hierarchy, id: NodeId, depth: usize, lines: &mut Vec<String>) {
    lines.push(format!("{}{}", "  ".repeat(depth), label(tree, id)));
    for child in visible_children(tree, id) {
        outline_node(tree, child, depth + 1, lines);
    }
}

impl Observer for ContactTree {
    fn child_added(&self, tree: &Hierarchy, event: &ChildEvent) {
        if is_conversation(tree, event.source) || is_conversation(tree, event.child) {
            return;
        }
        if let Some(observer) = self.as_observer() {
            if let Err(err) = attach_visible(tree, event.child, &observer) {
                warn!(child = ?event.child, %err, "failed to observe added subtree");
            }
        }
        self.notify(
            TreeModelEvent {
                path: ancestor_chain(tree, event.source),
            },
            true,
        );
    }

    fn child_removed(&self, tree: &Hierarchy, event: &ChildEvent) {
        if let Some(observer) = self.as_observer() {
            if let Err(err) = detach_recursively(tree, event.child, &observer) {
                warn!(child = ?event.child, %err, "failed to stop observing removed subtree");
            }
        }
        if is_conversation(tree, event.source) || is_conversation(tree, event.child) {
            return;
        }
        self.notify(
            TreeModelEvent {
                path: ancestor_chain(tree, event.source),
            },
            true,
        );
    }

    fn property_changed(&self, tree: &Hierarchy, change: &PropertyChange) {
        let Ok(kind) = tree.kind(change.source) else {
            return;
        };
        if kind == NodeKind::Conversation {
            return;
        }
        let event = TreeModelEvent {
            path: ancestor_chain(tree, change.source),
        };
        let structural = kind == NodeKind::Category && change.property == Property::Members;
        self.notify(event, structural);
    }
}
