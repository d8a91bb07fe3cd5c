use insta::assert_snapshot;
use roster_tree::model::{Node, Status};
use roster_tree::roster::{self, RosterEntry};
use roster_tree::ContactTree;
use std::sync::Arc;

mod common;
use common::*;

#[test]
fn test_conversation_changes_are_invisible() {
    let Sample {
        mut tree,
        account,
        alice,
        ..
    } = sample_hierarchy();
    let view = ContactTree::new(&tree).unwrap();
    let listener = Arc::new(RecordingListener::default());
    view.subscribe(listener.clone());

    let chat = roster::create_conversation(&mut tree, account, &[alice]).unwrap();
    tree.set_name(chat, Some("renamed".to_string())).unwrap();
    tree.remove_child(account, chat).unwrap();
    assert!(listener.events().is_empty());
}

#[test]
fn test_added_contact_reports_parent_path() {
    let Sample {
        mut tree, account, ..
    } = sample_hierarchy();
    let view = ContactTree::new(&tree).unwrap();
    let listener = Arc::new(RecordingListener::default());
    view.subscribe(listener.clone());

    let carol = tree
        .add_new(account, Node::contact(Some("Carol"), "carol@x", Status::Online))
        .unwrap();
    assert_eq!(
        listener.events(),
        vec![Notified::Structure(vec![tree.root(), account])]
    );

    // The new contact is observed from now on.
    tree.set_status(carol, Status::Away).unwrap();
    assert_eq!(
        listener.events()[1],
        Notified::Nodes(vec![tree.root(), account, carol])
    );
}

#[test]
fn test_removed_subtree_is_no_longer_observed() {
    let Sample {
        mut tree, account, ..
    } = sample_hierarchy();
    let view = ContactTree::new(&tree).unwrap();
    let listener = Arc::new(RecordingListener::default());
    view.subscribe(listener.clone());

    let root = tree.root();
    tree.remove_child(root, account).unwrap();
    assert_eq!(listener.events(), vec![Notified::Structure(vec![root])]);
    assert_eq!(tree.observer_count(account), 0);

    tree.set_name(account, Some("gone".to_string())).unwrap();
    assert_eq!(listener.events().len(), 1);
}

#[test]
fn test_order_follows_renames() {
    let Sample {
        mut tree,
        account,
        alice,
        bob,
        ..
    } = sample_hierarchy();
    let view = ContactTree::new(&tree).unwrap();
    assert_eq!(view.child_at(&tree, account, 0), Some(alice));

    tree.set_name(alice, Some("Zoe".to_string())).unwrap();
    assert_eq!(view.child_at(&tree, account, 0), Some(bob));
    assert_eq!(view.index_of(&tree, account, alice), Some(2));
}

#[test]
fn test_render_populated_account() {
    let Sample {
        mut tree, account, ..
    } = sample_hierarchy();
    let view = ContactTree::new(&tree).unwrap();

    roster::entries_added(
        &mut tree,
        account,
        &[RosterEntry::new(Some("carol"), "carol@jabber.org", Status::Busy)],
    )
    .unwrap();
    roster::presence_changed(&mut tree, account, "bob@jabber.org", Status::Online).unwrap();

    assert_snapshot!(view.outline(&tree), @r"
    terry
      Alice (alice@jabber.org) Online
      bob@jabber.org Online
      carol (carol@jabber.org) Busy
      Friends
        Alice (alice@jabber.org) Online
    ");
    view.release(&tree).unwrap();
}

#[test]
fn test_removed_member_leaves_category_view() {
    let Sample {
        mut tree,
        account,
        alice,
        friends,
        ..
    } = sample_hierarchy();
    let view = ContactTree::new(&tree).unwrap();
    let listener = Arc::new(RecordingListener::default());
    view.subscribe(listener.clone());
    assert_eq!(view.child_count(&tree, friends), 1);

    assert!(tree.remove_child(account, alice).unwrap());
    assert!(tree.contains(alice));
    assert_eq!(view.child_count(&tree, friends), 0);
    assert_eq!(view.child_at(&tree, friends, 0), None);

    let root = tree.root();
    assert_eq!(
        listener.events(),
        vec![
            Notified::Structure(vec![root, account, friends]),
            Notified::Structure(vec![root, account]),
        ]
    );
    view.release(&tree).unwrap();
}

#[test]
fn test_participant_changes_are_invisible() {
    let Sample {
        mut tree,
        account,
        alice,
        bob,
        ..
    } = sample_hierarchy();
    let chat = roster::create_conversation(&mut tree, account, &[alice]).unwrap();
    let view = ContactTree::new(&tree).unwrap();
    let listener = Arc::new(RecordingListener::default());
    view.subscribe(listener.clone());

    tree.add_participant(chat, bob).unwrap();
    tree.remove_participant(chat, alice).unwrap();
    assert!(listener.events().is_empty());
    view.release(&tree).unwrap();
}
