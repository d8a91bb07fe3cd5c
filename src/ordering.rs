use std::cmp::Ordering;

use crate::hierarchy::Hierarchy;
use crate::model::{Node, NodeId};

/// The text nodes are sorted on: the name, or the address of an unnamed
/// contact.
fn name_key(node: &Node) -> Option<&str> {
    node.display_name()
}

fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

/// Case-insensitive display order. Nodes with nothing to sort on come first
/// and are equal to each other.
pub fn by_name(a: &Node, b: &Node) -> Ordering {
    match (name_key(a), name_key(b)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => cmp_ignore_case(a, b),
    }
}

/// Order on stable identity alone. Copies of one logical node compare equal.
pub fn by_identity(a: &Node, b: &Node) -> Ordering {
    a.uuid().cmp(&b.uuid())
}

fn compare_ids(
    tree: &Hierarchy,
    a: NodeId,
    b: NodeId,
    order: fn(&Node, &Node) -> Ordering,
) -> Ordering {
    match (tree.get(a), tree.get(b)) {
        (Ok(a), Ok(b)) => order(a, b),
        (Err(_), Err(_)) => Ordering::Equal,
        (Err(_), Ok(_)) => Ordering::Less,
        (Ok(_), Err(_)) => Ordering::Greater,
    }
}

/// Stable sort of `ids` by [`by_name`].
pub fn sort_by_name(tree: &Hierarchy, ids: &mut [NodeId]) {
    ids.sort_by(|a, b| compare_ids(tree, *a, *b, by_name));
}

pub fn sort_by_identity(tree: &Hierarchy, ids: &mut [NodeId]) {
    ids.sort_by(|a, b| compare_ids(tree, *a, *b, by_identity));
}
