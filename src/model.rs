use std::fmt;

use indextree::NodeId as TreeNodeId;
use uuid::Uuid;

use crate::errors::{HierarchyError, HierarchyResult};
use crate::event::ObserverRegistry;

pub type NodeId = TreeNodeId;

/// The closed set of node categories in a contact hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Root,
    Account,
    Contact,
    Category,
    Conversation,
}

impl NodeKind {
    /// Kinds a node of this kind may own, in the order its children are exposed.
    pub fn allowed_child_kinds(self) -> &'static [NodeKind] {
        match self {
            NodeKind::Root => &[NodeKind::Account],
            NodeKind::Account => &[
                NodeKind::Contact,
                NodeKind::Category,
                NodeKind::Conversation,
            ],
            NodeKind::Contact | NodeKind::Category | NodeKind::Conversation => &[],
        }
    }

    pub fn allows_children(self) -> bool {
        !self.allowed_child_kinds().is_empty()
    }

    pub fn allows_child(self, kind: NodeKind) -> bool {
        self.allowed_child_kinds().contains(&kind)
    }

    /// The only kind a node of this kind may be attached under.
    pub fn parent_kind(self) -> Option<NodeKind> {
        match self {
            NodeKind::Root => None,
            NodeKind::Account => Some(NodeKind::Root),
            NodeKind::Contact | NodeKind::Category | NodeKind::Conversation => {
                Some(NodeKind::Account)
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Root => "root",
            NodeKind::Account => "account",
            NodeKind::Contact => "contact",
            NodeKind::Category => "category",
            NodeKind::Conversation => "conversation",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Xmpp,
    GoogleTalk,
}

impl Protocol {
    pub fn display_name(self) -> &'static str {
        match self {
            Protocol::Xmpp => "XMPP",
            Protocol::GoogleTalk => "Google Talk",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    Online,
    Busy,
    Away,
    #[default]
    Offline,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Status::Online => "Online",
            Status::Busy => "Busy",
            Status::Away => "Away",
            Status::Offline => "Offline",
        };
        f.write_str(label)
    }
}

/// Concrete node type, used to key node factories. Accounts without a
/// protocol are stubs that were never bound to a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeVariant {
    Root,
    Account(Option<Protocol>),
    Contact,
    Category,
    Conversation,
}

impl NodeVariant {
    pub fn kind(self) -> NodeKind {
        match self {
            NodeVariant::Root => NodeKind::Root,
            NodeVariant::Account(_) => NodeKind::Account,
            NodeVariant::Contact => NodeKind::Contact,
            NodeVariant::Category => NodeKind::Category,
            NodeVariant::Conversation => NodeKind::Conversation,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
    pub(crate) protocol: Option<Protocol>,
    pub(crate) password: Option<String>,
    pub(crate) connect_automatically: bool,
    pub(crate) domain: Option<String>,
    pub(crate) resource: Option<String>,
    pub(crate) anonymous: bool,
    pub(crate) populated: bool,
    pub(crate) connected: bool,
}

impl Account {
    pub fn stub() -> Self {
        Self::default()
    }

    pub fn with_protocol(protocol: Protocol, domain: Option<String>) -> Self {
        Self {
            protocol: Some(protocol),
            domain,
            ..Self::default()
        }
    }

    pub fn protocol(&self) -> Option<Protocol> {
        self.protocol
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn connect_automatically(&self) -> bool {
        self.connect_automatically
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    pub fn anonymous(&self) -> bool {
        self.anonymous
    }

    pub fn is_populated(&self) -> bool {
        self.populated
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Compares the user-editable settings, ignoring connection state.
    pub fn settings_eq(&self, other: &Account) -> bool {
        self.protocol == other.protocol
            && self.password == other.password
            && self.connect_automatically == other.connect_automatically
            && self.domain == other.domain
            && self.resource == other.resource
            && self.anonymous == other.anonymous
    }

    fn editable_copy(&self) -> Self {
        Self {
            populated: false,
            connected: false,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contact {
    pub(crate) address: String,
    pub(crate) status: Status,
}

impl Contact {
    pub fn new(address: impl Into<String>, status: Status) -> Self {
        Self {
            address: address.into(),
            status,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn status(&self) -> Status {
        self.status
    }
}

/// A named grouping of contacts. Members are references to contacts owned
/// by the same account, not children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Category {
    pub(crate) members: Vec<NodeId>,
}

impl Category {
    pub fn members(&self) -> &[NodeId] {
        &self.members
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    pub(crate) participants: Vec<NodeId>,
}

impl Conversation {
    pub fn participants(&self) -> &[NodeId] {
        &self.participants
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Root,
    Account(Account),
    Contact(Contact),
    Category(Category),
    Conversation(Conversation),
}

impl NodeData {
    pub fn kind(&self) -> NodeKind {
        self.variant().kind()
    }

    pub fn variant(&self) -> NodeVariant {
        match self {
            NodeData::Root => NodeVariant::Root,
            NodeData::Account(account) => NodeVariant::Account(account.protocol),
            NodeData::Contact(_) => NodeVariant::Contact,
            NodeData::Category(_) => NodeVariant::Category,
            NodeData::Conversation(_) => NodeVariant::Conversation,
        }
    }

    /// Copy of the editable state only: runtime flags reset, references dropped.
    fn editable_copy(&self) -> Self {
        match self {
            NodeData::Root => NodeData::Root,
            NodeData::Account(account) => NodeData::Account(account.editable_copy()),
            NodeData::Contact(contact) => NodeData::Contact(contact.clone()),
            NodeData::Category(_) => NodeData::Category(Category::default()),
            NodeData::Conversation(_) => NodeData::Conversation(Conversation::default()),
        }
    }
}

#[derive(Debug)]
pub struct Node {
    uuid: Uuid,
    pub(crate) name: Option<String>,
    pub(crate) data: NodeData,
    pub(crate) observers: ObserverRegistry,
}

impl Node {
    pub fn new(name: Option<String>, data: NodeData) -> Self {
        Self::with_identity(Uuid::new_v4(), name, data)
    }

    /// Builds a node that stands for an existing one in another hierarchy.
    pub fn with_identity(uuid: Uuid, name: Option<String>, data: NodeData) -> Self {
        Self {
            uuid,
            name,
            data,
            observers: ObserverRegistry::default(),
        }
    }

    pub fn root() -> Self {
        Self::new(None, NodeData::Root)
    }

    pub fn account(name: impl Into<String>, account: Account) -> Self {
        Self::new(Some(name.into()), NodeData::Account(account))
    }

    pub fn contact(name: Option<&str>, address: impl Into<String>, status: Status) -> Self {
        Self::new(
            name.map(str::to_owned),
            NodeData::Contact(Contact::new(address, status)),
        )
    }

    pub fn category(name: impl Into<String>) -> Self {
        Self::new(Some(name.into()), NodeData::Category(Category::default()))
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn data(&self) -> &NodeData {
        &self.data
    }

    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }

    pub fn variant(&self) -> NodeVariant {
        self.data.variant()
    }

    pub fn as_account(&self) -> Option<&Account> {
        match &self.data {
            NodeData::Account(account) => Some(account),
            _ => None,
        }
    }

    pub fn as_contact(&self) -> Option<&Contact> {
        match &self.data {
            NodeData::Contact(contact) => Some(contact),
            _ => None,
        }
    }

    pub fn as_category(&self) -> Option<&Category> {
        match &self.data {
            NodeData::Category(category) => Some(category),
            _ => None,
        }
    }

    pub fn as_conversation(&self) -> Option<&Conversation> {
        match &self.data {
            NodeData::Conversation(conversation) => Some(conversation),
            _ => None,
        }
    }

    pub(crate) fn account_mut(&mut self) -> HierarchyResult<&mut Account> {
        let found = self.kind();
        match &mut self.data {
            NodeData::Account(account) => Ok(account),
            _ => Err(HierarchyError::WrongKind {
                expected: NodeKind::Account,
                found,
            }),
        }
    }

    pub(crate) fn contact_mut(&mut self) -> HierarchyResult<&mut Contact> {
        let found = self.kind();
        match &mut self.data {
            NodeData::Contact(contact) => Ok(contact),
            _ => Err(HierarchyError::WrongKind {
                expected: NodeKind::Contact,
                found,
            }),
        }
    }

    pub(crate) fn category_mut(&mut self) -> HierarchyResult<&mut Category> {
        let found = self.kind();
        match &mut self.data {
            NodeData::Category(category) => Ok(category),
            _ => Err(HierarchyError::WrongKind {
                expected: NodeKind::Category,
                found,
            }),
        }
    }

    pub(crate) fn conversation_mut(&mut self) -> HierarchyResult<&mut Conversation> {
        let found = self.kind();
        match &mut self.data {
            NodeData::Conversation(conversation) => Ok(conversation),
            _ => Err(HierarchyError::WrongKind {
                expected: NodeKind::Conversation,
                found,
            }),
        }
    }

    /// The text a user sees for this node: its name, or a contact's address.
    pub fn display_name(&self) -> Option<&str> {
        self.name()
            .or_else(|| self.as_contact().map(Contact::address))
    }

    /// A detached duplicate carrying the same identity and editable state,
    /// without observers, memberships or connection state.
    pub fn detached_copy(&self) -> Node {
        Node::with_identity(self.uuid, self.name.clone(), self.data.editable_copy())
    }

    /// Equality over user-editable properties, defined per kind.
    pub fn content_eq(&self, other: &Node) -> bool {
        if self.name != other.name {
            return false;
        }
        match (&self.data, &other.data) {
            (NodeData::Account(a), NodeData::Account(b)) => a.settings_eq(b),
            (NodeData::Contact(a), NodeData::Contact(b)) => a == b,
            (NodeData::Root, NodeData::Root)
            | (NodeData::Category(_), NodeData::Category(_))
            | (NodeData::Conversation(_), NodeData::Conversation(_)) => true,
            _ => false,
        }
    }
}
