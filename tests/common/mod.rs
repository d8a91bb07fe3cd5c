#![allow(dead_code)]

use roster_tree::event::{ChildEvent, Observer, PropertyChange};
use roster_tree::model::{Account, Node, NodeId, Protocol, Status};
use roster_tree::projection::{TreeListener, TreeModelEvent};
use roster_tree::Hierarchy;
use std::sync::Mutex;

pub struct Sample {
    pub tree: Hierarchy,
    pub account: NodeId,
    pub alice: NodeId,
    pub bob: NodeId,
    pub friends: NodeId,
}

/// One XMPP account with two contacts and a category holding Alice.
pub fn sample_hierarchy() -> Sample {
    let mut tree = Hierarchy::new();
    let root = tree.root();
    let account = tree
        .add_new(
            root,
            Node::account(
                "terry",
                Account::with_protocol(Protocol::Xmpp, Some("jabber.org".to_string())),
            ),
        )
        .unwrap();
    let alice = tree
        .add_new(account, Node::contact(Some("Alice"), "alice@jabber.org", Status::Online))
        .unwrap();
    let bob = tree
        .add_new(account, Node::contact(None, "bob@jabber.org", Status::Away))
        .unwrap();
    let friends = tree.add_new(account, Node::category("Friends")).unwrap();
    tree.add_member(friends, alice).unwrap();
    Sample {
        tree,
        account,
        alice,
        bob,
        friends,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Added(ChildEvent),
    Removed(ChildEvent),
    Changed(PropertyChange),
}

/// Keeps every hierarchy event it sees, in order.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Recorded>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<Recorded> {
        self.events.lock().unwrap().clone()
    }
}

impl Observer for RecordingObserver {
    fn child_added(&self, _tree: &Hierarchy, event: &ChildEvent) {
        self.events.lock().unwrap().push(Recorded::Added(event.clone()));
    }

    fn child_removed(&self, _tree: &Hierarchy, event: &ChildEvent) {
        self.events.lock().unwrap().push(Recorded::Removed(event.clone()));
    }

    fn property_changed(&self, _tree: &Hierarchy, change: &PropertyChange) {
        self.events.lock().unwrap().push(Recorded::Changed(change.clone()));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notified {
    Structure(Vec<NodeId>),
    Nodes(Vec<NodeId>),
}

#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<Notified>>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<Notified> {
        self.events.lock().unwrap().clone()
    }
}

impl TreeListener for RecordingListener {
    fn structure_changed(&self, event: &TreeModelEvent) {
        self.events
            .lock()
            .unwrap()
            .push(Notified::Structure(event.path.clone()));
    }

    fn nodes_changed(&self, event: &TreeModelEvent) {
        self.events
            .lock()
            .unwrap()
            .push(Notified::Nodes(event.path.clone()));
    }
}
