use crate::errors::HierarchyResult;
use crate::event::ObserverRef;
use crate::hierarchy::Hierarchy;
use crate::model::{Node, NodeId, NodeKind};

/// The chain from the top of the hierarchy down to `node`, `node` last.
pub fn ancestor_chain(tree: &Hierarchy, node: NodeId) -> Vec<NodeId> {
    if !tree.contains(node) {
        return Vec::new();
    }
    let mut chain = vec![node];
    let mut current = node;
    while let Some(parent) = tree.parent(current) {
        chain.push(parent);
        current = parent;
    }
    chain.reverse();
    chain
}

/// The topmost ancestor of `node`, or `None` when `node` has no parent.
pub fn top_ancestor(tree: &Hierarchy, node: NodeId) -> Option<NodeId> {
    let mut ancestor = tree.parent(node)?;
    while let Some(parent) = tree.parent(ancestor) {
        ancestor = parent;
    }
    Some(ancestor)
}

/// Nearest strict ancestor of `node` for which `predicate` holds.
pub fn find_ancestor(
    tree: &Hierarchy,
    node: NodeId,
    predicate: impl Fn(&Node) -> bool,
) -> Option<NodeId> {
    let mut current = tree.parent(node);
    while let Some(candidate) = current {
        if tree.get(candidate).is_ok_and(&predicate) {
            return Some(candidate);
        }
        current = tree.parent(candidate);
    }
    None
}

pub fn find_ancestor_of_kind(tree: &Hierarchy, node: NodeId, kind: NodeKind) -> Option<NodeId> {
    find_ancestor(tree, node, |candidate| candidate.kind() == kind)
}

/// Attaches `observer` to `node` and every node currently below it. Nodes
/// added later are not covered; callers re-run this for new subtrees.
pub fn attach_recursively(
    tree: &Hierarchy,
    node: NodeId,
    observer: &ObserverRef,
) -> HierarchyResult<()> {
    tree.attach(node, observer.clone())?;
    for child in tree.children(node) {
        attach_recursively(tree, child, observer)?;
    }
    Ok(())
}

pub fn detach_recursively(
    tree: &Hierarchy,
    node: NodeId,
    observer: &ObserverRef,
) -> HierarchyResult<()> {
    tree.detach(node, observer)?;
    for child in tree.children(node) {
        detach_recursively(tree, child, observer)?;
    }
    Ok(())
}
