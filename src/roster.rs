use tracing::{debug, info};

use crate::errors::{HierarchyError, HierarchyResult};
use crate::hierarchy::Hierarchy;
use crate::model::{Account, Conversation, Node, NodeData, NodeId, NodeKind, Status};

/// One contact as reported by the transport's roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub name: Option<String>,
    pub address: String,
    pub status: Status,
}

impl RosterEntry {
    pub fn new(name: Option<&str>, address: impl Into<String>, status: Status) -> Self {
        Self {
            name: name.map(str::to_owned),
            address: address.into(),
            status,
        }
    }

    fn to_node(&self) -> Node {
        Node::contact(self.name.as_deref(), self.address.clone(), self.status)
    }
}

fn require_account(tree: &Hierarchy, account: NodeId) -> HierarchyResult<&Account> {
    let node = tree.get(account)?;
    node.as_account().ok_or(HierarchyError::WrongKind {
        expected: NodeKind::Account,
        found: node.kind(),
    })
}

/// Participant addresses of every conversation under `account`.
fn participant_addresses(tree: &Hierarchy, account: NodeId) -> Vec<(NodeId, Vec<String>)> {
    tree.children_of_kind(account, NodeKind::Conversation)
        .into_iter()
        .map(|conversation| {
            let addresses = tree
                .participants(conversation)
                .unwrap_or_default()
                .iter()
                .filter_map(|participant| tree.get(*participant).ok())
                .filter_map(Node::as_contact)
                .map(|contact| contact.address().to_string())
                .collect();
            (conversation, addresses)
        })
        .collect()
}

/// Re-adds participants by address after their contacts were replaced.
fn restore_participants(
    tree: &mut Hierarchy,
    account: NodeId,
    saved: &[(NodeId, Vec<String>)],
) -> HierarchyResult<()> {
    for (conversation, addresses) in saved {
        for address in addresses {
            let Some(contact) = find_contact_by_address(tree, account, address) else {
                continue;
            };
            if !tree.participants(*conversation)?.contains(&contact) {
                tree.add_participant(*conversation, contact)?;
            }
        }
    }
    Ok(())
}

/// Replaces the account's contacts with `entries`.
///
/// An account that was already populated first loses all of its contacts,
/// last to first, and reports `populated` going false before the new
/// contacts arrive. Removed contacts leave every category. Open
/// conversations get the new contact with the same address back as a
/// participant. Returns the number of contacts added.
pub fn populate(
    tree: &mut Hierarchy,
    account: NodeId,
    entries: &[RosterEntry],
) -> HierarchyResult<usize> {
    let mut saved = Vec::new();
    if require_account(tree, account)?.is_populated() {
        saved = participant_addresses(tree, account);
        let contacts = tree.children_of_kind(account, NodeKind::Contact);
        for contact in contacts.into_iter().rev() {
            tree.remove_child(account, contact)?;
            tree.discard(contact)?;
        }
        tree.set_populated(account, false)?;
    }

    for entry in entries {
        tree.add_new(account, entry.to_node())?;
    }
    restore_participants(tree, account, &saved)?;
    tree.set_populated(account, true)?;
    info!(?account, contacts = entries.len(), "account populated");
    Ok(entries.len())
}

pub fn find_contact_by_address(tree: &Hierarchy, account: NodeId, address: &str) -> Option<NodeId> {
    tree.children_of_kind(account, NodeKind::Contact)
        .into_iter()
        .find(|contact| {
            tree.get(*contact)
                .ok()
                .and_then(Node::as_contact)
                .is_some_and(|c| c.address() == address)
        })
}

pub fn find_category_by_name(tree: &Hierarchy, account: NodeId, name: &str) -> Option<NodeId> {
    tree.children_of_kind(account, NodeKind::Category)
        .into_iter()
        .find(|category| tree.name(*category).is_ok_and(|n| n == Some(name)))
}

fn require_contact(tree: &Hierarchy, account: NodeId, address: &str) -> HierarchyResult<NodeId> {
    find_contact_by_address(tree, account, address)
        .ok_or_else(|| HierarchyError::ContactNotFound(address.to_string()))
}

pub fn presence_changed(
    tree: &mut Hierarchy,
    account: NodeId,
    address: &str,
    status: Status,
) -> HierarchyResult<bool> {
    require_account(tree, account)?;
    let contact = require_contact(tree, account, address)?;
    tree.set_status(contact, status)
}

/// Applies renamed roster entries. Every address must already be known.
pub fn entries_updated(
    tree: &mut Hierarchy,
    account: NodeId,
    entries: &[RosterEntry],
) -> HierarchyResult<usize> {
    require_account(tree, account)?;
    let contacts = entries
        .iter()
        .map(|entry| require_contact(tree, account, &entry.address))
        .collect::<HierarchyResult<Vec<_>>>()?;

    let mut changed = 0;
    for (contact, entry) in contacts.into_iter().zip(entries) {
        if tree.set_name(contact, entry.name.clone())? {
            changed += 1;
        }
    }
    Ok(changed)
}

/// Removes the contacts with the given addresses. Nothing is removed when
/// any address is unknown. Returns the detached contacts.
pub fn entries_deleted(
    tree: &mut Hierarchy,
    account: NodeId,
    addresses: &[&str],
) -> HierarchyResult<Vec<NodeId>> {
    require_account(tree, account)?;
    let contacts = addresses
        .iter()
        .map(|address| require_contact(tree, account, address))
        .collect::<HierarchyResult<Vec<_>>>()?;

    for contact in &contacts {
        tree.remove_child(account, *contact)?;
    }
    debug!(?account, removed = contacts.len(), "roster entries deleted");
    Ok(contacts)
}

pub fn entries_added(
    tree: &mut Hierarchy,
    account: NodeId,
    entries: &[RosterEntry],
) -> HierarchyResult<Vec<NodeId>> {
    require_account(tree, account)?;
    entries
        .iter()
        .map(|entry| tree.add_new(account, entry.to_node()))
        .collect()
}

/// Starts a conversation with `contacts` under `account`. It is named after
/// its participants, joined with ", ".
pub fn create_conversation(
    tree: &mut Hierarchy,
    account: NodeId,
    contacts: &[NodeId],
) -> HierarchyResult<NodeId> {
    require_account(tree, account)?;
    if contacts.is_empty() {
        return Err(HierarchyError::EmptyConversation);
    }

    let mut names = Vec::with_capacity(contacts.len());
    for contact in contacts {
        let node = tree.get(*contact)?;
        if node.kind() != NodeKind::Contact {
            return Err(HierarchyError::WrongKind {
                expected: NodeKind::Contact,
                found: node.kind(),
            });
        }
        names.push(node.display_name().unwrap_or_default().to_string());
    }

    let conversation = Node::new(
        Some(names.join(", ")),
        NodeData::Conversation(Conversation {
            participants: contacts.to_vec(),
        }),
    );
    tree.add_new(account, conversation)
}

/// The conversation to deliver a chat from `address` to: an existing one
/// with that participant, or a new one with the matching contact.
pub fn resolve_conversation(
    tree: &mut Hierarchy,
    account: NodeId,
    address: &str,
) -> HierarchyResult<NodeId> {
    require_account(tree, account)?;
    let existing = tree
        .children_of_kind(account, NodeKind::Conversation)
        .into_iter()
        .find(|conversation| {
            tree.get(*conversation)
                .ok()
                .and_then(Node::as_conversation)
                .is_some_and(|c| {
                    c.participants().iter().any(|participant| {
                        tree.get(*participant)
                            .ok()
                            .and_then(Node::as_contact)
                            .is_some_and(|contact| contact.address() == address)
                    })
                })
        });
    if let Some(conversation) = existing {
        return Ok(conversation);
    }

    let contact = require_contact(tree, account, address)?;
    create_conversation(tree, account, &[contact])
}
