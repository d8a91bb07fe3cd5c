use indextree::Arena;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::errors::{HierarchyError, HierarchyResult};
use crate::event::{
    ChildEvent, ChildEventKind, ObserverRef, Property, PropertyChange, PropertyValue,
};
use crate::model::{Node, NodeId, NodeKind, Status};

/// An observable tree of typed nodes.
///
/// Every node lives in one arena owned by the hierarchy; a node's parent link
/// is a back-reference used for traversal only. Nodes removed from their
/// parent stay addressable until [`Hierarchy::discard`] frees them.
///
/// All mutation goes through `&mut self` on the owning thread. Observer
/// registration only needs `&self`, so observers can (re)attach themselves
/// while an event is being delivered.
#[derive(Debug)]
pub struct Hierarchy {
    arena: Arena<Node>,
    root: NodeId,
}

impl Default for Hierarchy {
    fn default() -> Self {
        Self::new()
    }
}

impl Hierarchy {
    /// Creates a hierarchy with an unnamed root node.
    pub fn new() -> Self {
        Self::with_root(Node::root())
    }

    /// Creates a hierarchy whose top node is `root`, of any kind.
    pub fn with_root(root: Node) -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(root);
        Self { arena, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Adds a node to the arena without attaching it anywhere.
    pub fn insert(&mut self, node: Node) -> NodeId {
        self.arena.new_node(node)
    }

    /// Inserts `node` and attaches it under `parent` in one step.
    pub fn add_new(&mut self, parent: NodeId, node: Node) -> HierarchyResult<NodeId> {
        let parent_kind = self.kind(parent)?;
        if !parent_kind.allows_child(node.kind()) {
            return Err(HierarchyError::ChildKindNotAllowed {
                parent: parent_kind,
                child: node.kind(),
            });
        }
        let id = self.insert(node);
        self.add_child(parent, id)?;
        Ok(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.arena.get(id).is_some_and(|node| !node.is_removed())
    }

    pub fn get(&self, id: NodeId) -> HierarchyResult<&Node> {
        self.arena
            .get(id)
            .filter(|node| !node.is_removed())
            .map(|node| node.get())
            .ok_or(HierarchyError::MissingNode(id))
    }

    fn get_mut(&mut self, id: NodeId) -> HierarchyResult<&mut Node> {
        self.arena
            .get_mut(id)
            .filter(|node| !node.is_removed())
            .map(|node| node.get_mut())
            .ok_or(HierarchyError::MissingNode(id))
    }

    pub fn kind(&self, id: NodeId) -> HierarchyResult<NodeKind> {
        self.get(id).map(Node::kind)
    }

    pub fn name(&self, id: NodeId) -> HierarchyResult<Option<&str>> {
        self.get(id).map(Node::name)
    }

    pub fn uuid(&self, id: NodeId) -> HierarchyResult<Uuid> {
        self.get(id).map(Node::uuid)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena
            .get(id)
            .filter(|node| !node.is_removed())
            .and_then(|node| node.parent())
    }

    /// Children in exposure order: grouped by the parent's allowed kinds,
    /// insertion order within each group.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        if !self.contains(id) {
            return Vec::new();
        }
        id.children(&self.arena).collect()
    }

    pub fn children_of_kind(&self, id: NodeId, kind: NodeKind) -> Vec<NodeId> {
        self.children(id)
            .into_iter()
            .filter(|child| self.kind(*child).is_ok_and(|k| k == kind))
            .collect()
    }

    pub fn contains_child(&self, parent: NodeId, child: NodeId) -> bool {
        self.parent(child) == Some(parent)
    }

    pub fn index_of_child(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.children(parent).iter().position(|id| *id == child)
    }

    /// Finds a live (not freed) node by its stable identity, attached or not.
    pub fn find_by_uuid(&self, uuid: Uuid) -> Option<NodeId> {
        self.arena
            .iter()
            .filter(|node| !node.is_removed() && node.get().uuid() == uuid)
            .find_map(|node| self.arena.get_node_id(node))
    }

    /// Number of nodes reachable from the root, the root included.
    pub fn len(&self) -> usize {
        self.root.descendants(&self.arena).count()
    }

    /// True when nothing is attached under the root.
    pub fn is_empty(&self) -> bool {
        self.root.children(&self.arena).next().is_none()
    }

    // --- Structure ---

    /// Appends `child` at the end of its kind's group under `parent`.
    /// Returns the index within that group.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> HierarchyResult<usize> {
        self.insert_child(parent, child, None)
    }

    /// Inserts `child` at `index` within its kind's group under `parent`.
    pub fn add_child_at(
        &mut self,
        parent: NodeId,
        child: NodeId,
        index: usize,
    ) -> HierarchyResult<usize> {
        self.insert_child(parent, child, Some(index))
    }

    fn insert_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        index: Option<usize>,
    ) -> HierarchyResult<usize> {
        let parent_kind = self.kind(parent)?;
        let child_kind = self.kind(child)?;
        if !parent_kind.allows_child(child_kind) {
            return Err(HierarchyError::ChildKindNotAllowed {
                parent: parent_kind,
                child: child_kind,
            });
        }
        debug_assert_eq!(child_kind.parent_kind(), Some(parent_kind));
        match self.parent(child) {
            Some(current) if current == parent => {
                return Err(HierarchyError::DuplicateChild(child));
            }
            Some(_) => return Err(HierarchyError::AlreadyParented(child)),
            None => {}
        }

        let group = self.children_of_kind(parent, child_kind);
        let index = index.unwrap_or(group.len());
        if index > group.len() {
            return Err(HierarchyError::IndexOutOfRange {
                index,
                len: group.len(),
                kind: child_kind,
            });
        }

        if let Some(&anchor) = group.get(index) {
            anchor.checked_insert_before(child, &mut self.arena)?;
        } else if let Some(&last) = group.last() {
            last.checked_insert_after(child, &mut self.arena)?;
        } else if let Some(next) = self.first_child_after_group(parent, parent_kind, child_kind) {
            next.checked_insert_before(child, &mut self.arena)?;
        } else {
            parent.checked_append(child, &mut self.arena)?;
        }

        debug!(?parent, ?child, kind = %child_kind, index, "child added");
        self.fire_child_event(ChildEvent {
            source: parent,
            child,
            index,
            kind: ChildEventKind::Added,
        });
        Ok(index)
    }

    /// First existing child whose kind's group comes after `kind`'s group.
    fn first_child_after_group(
        &self,
        parent: NodeId,
        parent_kind: NodeKind,
        kind: NodeKind,
    ) -> Option<NodeId> {
        let later: Vec<NodeKind> = parent_kind
            .allowed_child_kinds()
            .iter()
            .skip_while(|allowed| **allowed != kind)
            .skip(1)
            .copied()
            .collect();
        self.children(parent)
            .into_iter()
            .find(|child| self.kind(*child).is_ok_and(|k| later.contains(&k)))
    }

    /// Detaches `child` from `parent`. Returns `false` when it was not a
    /// child of `parent`. The detached node stays addressable.
    ///
    /// A removed contact is first dropped from the members of its account's
    /// categories and the participants of its account's conversations.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> HierarchyResult<bool> {
        let parent_kind = self.kind(parent)?;
        if !parent_kind.allows_children() {
            return Err(HierarchyError::ChildrenNotSupported(parent_kind));
        }
        let child_kind = self.kind(child)?;
        if !parent_kind.allows_child(child_kind) {
            return Err(HierarchyError::ChildKindNotAllowed {
                parent: parent_kind,
                child: child_kind,
            });
        }
        if !self.contains_child(parent, child) {
            return Ok(false);
        }
        if child_kind == NodeKind::Contact {
            self.drop_references(parent, child)?;
        }
        let Some(index) = self.index_of_child(parent, child) else {
            return Ok(false);
        };

        child.detach(&mut self.arena);

        debug!(?parent, ?child, kind = %child_kind, index, "child removed");
        self.fire_child_event(ChildEvent {
            source: parent,
            child,
            index,
            kind: ChildEventKind::Removed,
        });
        Ok(true)
    }

    fn drop_references(&mut self, account: NodeId, contact: NodeId) -> HierarchyResult<()> {
        for category in self.children_of_kind(account, NodeKind::Category) {
            self.remove_member(category, contact)?;
        }
        for conversation in self.children_of_kind(account, NodeKind::Conversation) {
            self.remove_participant(conversation, contact)?;
        }
        Ok(())
    }

    /// Frees a detached node and its whole subtree.
    pub fn discard(&mut self, id: NodeId) -> HierarchyResult<()> {
        if id == self.root {
            return Err(HierarchyError::CannotDiscardRoot);
        }
        self.get(id)?;
        if self.parent(id).is_some() {
            return Err(HierarchyError::AlreadyParented(id));
        }
        id.remove_subtree(&mut self.arena);
        Ok(())
    }

    // --- Observers ---

    pub fn attach(&self, id: NodeId, observer: ObserverRef) -> HierarchyResult<()> {
        self.get(id)?.observers.attach(observer);
        Ok(())
    }

    pub fn detach(&self, id: NodeId, observer: &ObserverRef) -> HierarchyResult<bool> {
        Ok(self.get(id)?.observers.detach(observer))
    }

    pub fn observer_count(&self, id: NodeId) -> usize {
        self.get(id).map_or(0, |node| node.observers.len())
    }

    fn fire_child_event(&self, event: ChildEvent) {
        let Ok(source) = self.get(event.source) else {
            return;
        };
        for observer in source.observers.snapshot() {
            match event.kind {
                ChildEventKind::Added => observer.child_added(self, &event),
                ChildEventKind::Removed => observer.child_removed(self, &event),
            }
        }
    }

    fn fire_property_change(&self, change: PropertyChange) {
        let Ok(source) = self.get(change.source) else {
            return;
        };
        for observer in source.observers.snapshot() {
            observer.property_changed(self, &change);
        }
    }

    // --- Properties ---

    /// Replaces the field selected by `field` and fires a change event when
    /// the value differs. Returns whether anything changed.
    fn update_property<T>(
        &mut self,
        id: NodeId,
        property: Property,
        value: T,
        field: impl FnOnce(&mut Node) -> HierarchyResult<&mut T>,
    ) -> HierarchyResult<bool>
    where
        T: Clone + PartialEq + Into<PropertyValue>,
    {
        let slot = field(self.get_mut(id)?)?;
        if *slot == value {
            return Ok(false);
        }
        let old = std::mem::replace(slot, value.clone());

        trace!(node = ?id, %property, "property changed");
        self.fire_property_change(PropertyChange {
            source: id,
            property,
            old: old.into(),
            new: value.into(),
        });
        Ok(true)
    }

    pub fn set_name(&mut self, id: NodeId, name: Option<String>) -> HierarchyResult<bool> {
        self.update_property(id, Property::Name, name, |node| Ok(&mut node.name))
    }

    pub fn set_password(&mut self, id: NodeId, password: Option<String>) -> HierarchyResult<bool> {
        self.update_property(id, Property::Password, password, |node| {
            Ok(&mut node.account_mut()?.password)
        })
    }

    pub fn set_connect_automatically(&mut self, id: NodeId, value: bool) -> HierarchyResult<bool> {
        self.update_property(id, Property::ConnectAutomatically, value, |node| {
            Ok(&mut node.account_mut()?.connect_automatically)
        })
    }

    pub fn set_domain(&mut self, id: NodeId, domain: Option<String>) -> HierarchyResult<bool> {
        self.update_property(id, Property::Domain, domain, |node| {
            Ok(&mut node.account_mut()?.domain)
        })
    }

    pub fn set_resource(&mut self, id: NodeId, resource: Option<String>) -> HierarchyResult<bool> {
        self.update_property(id, Property::Resource, resource, |node| {
            Ok(&mut node.account_mut()?.resource)
        })
    }

    pub fn set_anonymous(&mut self, id: NodeId, value: bool) -> HierarchyResult<bool> {
        self.update_property(id, Property::Anonymous, value, |node| {
            Ok(&mut node.account_mut()?.anonymous)
        })
    }

    /// Records the transport's connection state for an account.
    pub fn set_connected(&mut self, id: NodeId, value: bool) -> HierarchyResult<bool> {
        self.update_property(id, Property::Connected, value, |node| {
            Ok(&mut node.account_mut()?.connected)
        })
    }

    pub(crate) fn set_populated(&mut self, id: NodeId, value: bool) -> HierarchyResult<bool> {
        self.update_property(id, Property::Populated, value, |node| {
            Ok(&mut node.account_mut()?.populated)
        })
    }

    pub fn set_address(&mut self, id: NodeId, address: String) -> HierarchyResult<bool> {
        self.update_property(id, Property::Address, address, |node| {
            Ok(&mut node.contact_mut()?.address)
        })
    }

    pub fn set_status(&mut self, id: NodeId, status: Status) -> HierarchyResult<bool> {
        self.update_property(id, Property::Status, status, |node| {
            Ok(&mut node.contact_mut()?.status)
        })
    }

    // --- Category membership ---

    pub fn members(&self, category: NodeId) -> HierarchyResult<&[NodeId]> {
        let node = self.get(category)?;
        node.as_category()
            .map(|category| category.members())
            .ok_or(HierarchyError::WrongKind {
                expected: NodeKind::Category,
                found: node.kind(),
            })
    }

    pub fn add_member(&mut self, category: NodeId, contact: NodeId) -> HierarchyResult<usize> {
        let len = self.members(category)?.len();
        self.add_member_at(category, contact, len)
    }

    /// Lists `contact` in `category` at `index`. Membership does not change
    /// the contact's parent.
    pub fn add_member_at(
        &mut self,
        category: NodeId,
        contact: NodeId,
        index: usize,
    ) -> HierarchyResult<usize> {
        let members = self.members(category)?;
        let contact_kind = self.kind(contact)?;
        if contact_kind != NodeKind::Contact {
            return Err(HierarchyError::WrongKind {
                expected: NodeKind::Contact,
                found: contact_kind,
            });
        }
        if members.contains(&contact) {
            return Err(HierarchyError::DuplicateMember(contact));
        }
        if index > members.len() {
            return Err(HierarchyError::IndexOutOfRange {
                index,
                len: members.len(),
                kind: NodeKind::Contact,
            });
        }

        let mut updated = members.to_vec();
        updated.insert(index, contact);
        self.update_property(category, Property::Members, updated, |node| {
            Ok(&mut node.category_mut()?.members)
        })?;
        Ok(index)
    }

    pub fn remove_member(&mut self, category: NodeId, contact: NodeId) -> HierarchyResult<bool> {
        let members = self.members(category)?;
        if !members.contains(&contact) {
            return Ok(false);
        }
        let updated: Vec<NodeId> = members
            .iter()
            .copied()
            .filter(|member| *member != contact)
            .collect();
        self.update_property(category, Property::Members, updated, |node| {
            Ok(&mut node.category_mut()?.members)
        })
    }

    // --- Conversation participants ---

    pub fn participants(&self, conversation: NodeId) -> HierarchyResult<&[NodeId]> {
        let node = self.get(conversation)?;
        node.as_conversation()
            .map(|conversation| conversation.participants())
            .ok_or(HierarchyError::WrongKind {
                expected: NodeKind::Conversation,
                found: node.kind(),
            })
    }

    pub fn add_participant(
        &mut self,
        conversation: NodeId,
        contact: NodeId,
    ) -> HierarchyResult<usize> {
        let len = self.participants(conversation)?.len();
        self.add_participant_at(conversation, contact, len)
    }

    pub fn add_participant_at(
        &mut self,
        conversation: NodeId,
        contact: NodeId,
        index: usize,
    ) -> HierarchyResult<usize> {
        let participants = self.participants(conversation)?;
        let contact_kind = self.kind(contact)?;
        if contact_kind != NodeKind::Contact {
            return Err(HierarchyError::WrongKind {
                expected: NodeKind::Contact,
                found: contact_kind,
            });
        }
        if participants.contains(&contact) {
            return Err(HierarchyError::DuplicateMember(contact));
        }
        if index > participants.len() {
            return Err(HierarchyError::IndexOutOfRange {
                index,
                len: participants.len(),
                kind: NodeKind::Contact,
            });
        }

        let mut updated = participants.to_vec();
        updated.insert(index, contact);
        self.update_property(conversation, Property::Participants, updated, |node| {
            Ok(&mut node.conversation_mut()?.participants)
        })?;
        Ok(index)
    }

    pub fn remove_participant(
        &mut self,
        conversation: NodeId,
        contact: NodeId,
    ) -> HierarchyResult<bool> {
        let participants = self.participants(conversation)?;
        if !participants.contains(&contact) {
            return Ok(false);
        }
        let updated: Vec<NodeId> = participants
            .iter()
            .copied()
            .filter(|participant| *participant != contact)
            .collect();
        self.update_property(conversation, Property::Participants, updated, |node| {
            Ok(&mut node.conversation_mut()?.participants)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Account, Conversation, NodeData, Protocol};

    fn account_tree() -> (Hierarchy, NodeId) {
        let mut tree = Hierarchy::new();
        let root = tree.root();
        let account = tree
            .add_new(root, Node::account("terry", Account::with_protocol(Protocol::Xmpp, None)))
            .unwrap();
        (tree, account)
    }

    #[test]
    fn test_children_are_grouped_by_kind() {
        let (mut tree, account) = account_tree();
        let friends = tree.add_new(account, Node::category("Friends")).unwrap();
        let alice = tree
            .add_new(account, Node::contact(Some("Alice"), "alice@x", Status::Online))
            .unwrap();
        let bob = tree
            .add_new(account, Node::contact(Some("Bob"), "bob@x", Status::Away))
            .unwrap();

        assert_eq!(tree.children(account), vec![alice, bob, friends]);
        assert_eq!(tree.children_of_kind(account, NodeKind::Contact), vec![alice, bob]);
    }

    #[test]
    fn test_add_child_at_index_within_group() {
        let (mut tree, account) = account_tree();
        let friends = tree.add_new(account, Node::category("Friends")).unwrap();
        let alice = tree
            .add_new(account, Node::contact(Some("Alice"), "alice@x", Status::Online))
            .unwrap();
        let bob = tree.insert(Node::contact(Some("Bob"), "bob@x", Status::Online));

        let index = tree.add_child_at(account, bob, 0).unwrap();
        assert_eq!(index, 0);
        assert_eq!(tree.children(account), vec![bob, alice, friends]);
    }

    #[test]
    fn test_add_child_rejects_out_of_range_index() {
        let (mut tree, account) = account_tree();
        let alice = tree.insert(Node::contact(Some("Alice"), "alice@x", Status::Online));

        let result = tree.add_child_at(account, alice, 3);
        assert!(matches!(
            result,
            Err(HierarchyError::IndexOutOfRange { index: 3, len: 0, .. })
        ));
        assert_eq!(tree.parent(alice), None);
        assert!(tree.children(account).is_empty());
    }

    #[test]
    fn test_add_child_rejects_disallowed_kind() {
        let (mut tree, _account) = account_tree();
        let root = tree.root();
        let alice = tree.insert(Node::contact(Some("Alice"), "alice@x", Status::Online));

        let err = tree.add_child(root, alice).unwrap_err();
        assert!(matches!(
            err,
            HierarchyError::ChildKindNotAllowed {
                parent: NodeKind::Root,
                child: NodeKind::Contact
            }
        ));
        assert_eq!(tree.parent(alice), None);
    }

    #[test]
    fn test_add_child_twice_is_rejected() {
        let (mut tree, account) = account_tree();
        let root = tree.root();
        let err = tree.add_child(root, account).unwrap_err();
        assert!(matches!(err, HierarchyError::DuplicateChild(id) if id == account));
        assert_eq!(tree.children(root), vec![account]);
    }

    #[test]
    fn test_child_cannot_have_two_parents() {
        let (mut tree, first) = account_tree();
        let root = tree.root();
        let second = tree
            .add_new(root, Node::account("other", Account::stub()))
            .unwrap();
        let alice = tree
            .add_new(first, Node::contact(Some("Alice"), "alice@x", Status::Online))
            .unwrap();

        let err = tree.add_child(second, alice).unwrap_err();
        assert!(matches!(err, HierarchyError::AlreadyParented(_)));
        assert_eq!(tree.parent(alice), Some(first));
    }

    #[test]
    fn test_remove_child_from_childless_node_is_unsupported() {
        let (mut tree, account) = account_tree();
        let alice = tree
            .add_new(account, Node::contact(Some("Alice"), "alice@x", Status::Online))
            .unwrap();
        let bob = tree.insert(Node::contact(Some("Bob"), "bob@x", Status::Online));

        let err = tree.remove_child(alice, bob).unwrap_err();
        assert_eq!(err.class(), crate::errors::ErrorClass::Unsupported);
    }

    #[test]
    fn test_remove_child_that_is_not_present() {
        let (mut tree, account) = account_tree();
        let alice = tree.insert(Node::contact(Some("Alice"), "alice@x", Status::Online));
        assert!(!tree.remove_child(account, alice).unwrap());
    }

    #[test]
    fn test_discard_frees_detached_subtree() {
        let (mut tree, account) = account_tree();
        let root = tree.root();
        let alice = tree
            .add_new(account, Node::contact(Some("Alice"), "alice@x", Status::Online))
            .unwrap();

        assert!(matches!(
            tree.discard(account),
            Err(HierarchyError::AlreadyParented(_))
        ));
        assert!(tree.remove_child(root, account).unwrap());
        assert!(tree.contains(account));

        tree.discard(account).unwrap();
        assert!(!tree.contains(account));
        assert!(!tree.contains(alice));
        assert!(matches!(tree.discard(root), Err(HierarchyError::CannotDiscardRoot)));
    }

    #[test]
    fn test_setters_report_changes() {
        let (mut tree, account) = account_tree();
        assert!(tree.set_password(account, Some("secret".into())).unwrap());
        assert!(!tree.set_password(account, Some("secret".into())).unwrap());
        assert_eq!(
            tree.get(account).unwrap().as_account().unwrap().password(),
            Some("secret")
        );

        let err = tree.set_status(account, Status::Busy).unwrap_err();
        assert!(matches!(
            err,
            HierarchyError::WrongKind {
                expected: NodeKind::Contact,
                found: NodeKind::Account
            }
        ));
    }

    #[test]
    fn test_category_membership_does_not_reparent() {
        let (mut tree, account) = account_tree();
        let friends = tree.add_new(account, Node::category("Friends")).unwrap();
        let alice = tree
            .add_new(account, Node::contact(Some("Alice"), "alice@x", Status::Online))
            .unwrap();

        tree.add_member(friends, alice).unwrap();
        assert_eq!(tree.members(friends).unwrap(), &[alice]);
        assert_eq!(tree.parent(alice), Some(account));
        assert!(matches!(
            tree.add_member(friends, alice),
            Err(HierarchyError::DuplicateMember(_))
        ));
        assert!(matches!(
            tree.add_member(friends, account),
            Err(HierarchyError::WrongKind { .. })
        ));

        assert!(tree.remove_member(friends, alice).unwrap());
        assert!(!tree.remove_member(friends, alice).unwrap());
    }

    #[test]
    fn test_find_by_uuid() {
        let (tree, account) = account_tree();
        let uuid = tree.uuid(account).unwrap();
        assert_eq!(tree.find_by_uuid(uuid), Some(account));
        assert_eq!(tree.find_by_uuid(Uuid::new_v4()), None);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_is_empty_ignores_root() {
        let mut tree = Hierarchy::new();
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 1);

        let root = tree.root();
        let account = tree.add_new(root, Node::account("terry", Account::stub())).unwrap();
        assert!(!tree.is_empty());
        tree.remove_child(root, account).unwrap();
        assert!(tree.is_empty());
    }

    #[test]
    fn test_participant_editing() {
        let (mut tree, account) = account_tree();
        let alice = tree
            .add_new(account, Node::contact(Some("Alice"), "alice@x", Status::Online))
            .unwrap();
        let bob = tree
            .add_new(account, Node::contact(Some("Bob"), "bob@x", Status::Away))
            .unwrap();
        let chat = tree
            .add_new(
                account,
                Node::new(None, NodeData::Conversation(Conversation::default())),
            )
            .unwrap();

        assert_eq!(tree.add_participant(chat, alice).unwrap(), 0);
        assert_eq!(tree.add_participant_at(chat, bob, 0).unwrap(), 0);
        assert_eq!(tree.participants(chat).unwrap(), &[bob, alice]);
        assert!(matches!(
            tree.add_participant(chat, alice),
            Err(HierarchyError::DuplicateMember(id)) if id == alice
        ));
        assert!(matches!(
            tree.add_participant(chat, account),
            Err(HierarchyError::WrongKind { .. })
        ));
        assert!(matches!(
            tree.participants(account),
            Err(HierarchyError::WrongKind {
                expected: NodeKind::Conversation,
                ..
            })
        ));

        assert!(tree.remove_participant(chat, bob).unwrap());
        assert!(!tree.remove_participant(chat, bob).unwrap());
        assert_eq!(tree.participants(chat).unwrap(), &[alice]);
    }

    #[test]
    fn test_removed_contact_leaves_categories_and_conversations() {
        let (mut tree, account) = account_tree();
        let alice = tree
            .add_new(account, Node::contact(Some("Alice"), "alice@x", Status::Online))
            .unwrap();
        let friends = tree.add_new(account, Node::category("Friends")).unwrap();
        let chat = tree
            .add_new(
                account,
                Node::new(None, NodeData::Conversation(Conversation::default())),
            )
            .unwrap();
        tree.add_member(friends, alice).unwrap();
        tree.add_participant(chat, alice).unwrap();

        assert!(tree.remove_child(account, alice).unwrap());
        assert!(tree.contains(alice));
        assert!(tree.members(friends).unwrap().is_empty());
        assert!(tree.participants(chat).unwrap().is_empty());
    }
}
