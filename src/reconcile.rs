use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use tracing::{debug, info};

use crate::config::AppConfig;
use crate::errors::{HierarchyError, HierarchyResult};
use crate::event::{ObserverRef, Property};
use crate::hierarchy::Hierarchy;
use crate::model::{
    Account, Category, Contact, Conversation, Node, NodeData, NodeId, NodeKind, NodeVariant,
    Protocol, Status,
};
use crate::ordering::sort_by_identity;

type Constructor = Box<dyn Fn() -> NodeData + Send + Sync>;

/// Creates fresh node payloads for each concrete variant and knows which
/// observers every new node of a kind starts with.
#[derive(Default)]
pub struct NodeFactory {
    constructors: HashMap<NodeVariant, Constructor>,
    default_observers: HashMap<NodeKind, Vec<ObserverRef>>,
}

impl NodeFactory {
    /// An empty factory. Every variant must be registered before use.
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory for every variant, seeded from `config`.
    pub fn with_defaults(config: &AppConfig) -> Self {
        let mut factory = Self::new();
        let connect_automatically = config.connect_automatically;
        let resource = config.default_resource.clone();
        let domain = config.google_talk_domain.clone();

        factory.register(NodeVariant::Root, || NodeData::Root);
        factory.register(NodeVariant::Account(None), move || {
            NodeData::Account(Account {
                connect_automatically,
                ..Account::stub()
            })
        });
        factory.register(NodeVariant::Account(Some(Protocol::Xmpp)), move || {
            NodeData::Account(Account {
                connect_automatically,
                resource: resource.clone(),
                ..Account::with_protocol(Protocol::Xmpp, None)
            })
        });
        factory.register(NodeVariant::Account(Some(Protocol::GoogleTalk)), move || {
            NodeData::Account(Account {
                connect_automatically,
                ..Account::with_protocol(Protocol::GoogleTalk, Some(domain.clone()))
            })
        });
        factory.register(NodeVariant::Contact, || {
            NodeData::Contact(Contact::new(String::new(), Status::Offline))
        });
        factory.register(NodeVariant::Category, || {
            NodeData::Category(Category::default())
        });
        factory.register(NodeVariant::Conversation, || {
            NodeData::Conversation(Conversation::default())
        });
        factory
    }

    pub fn register(
        &mut self,
        variant: NodeVariant,
        constructor: impl Fn() -> NodeData + Send + Sync + 'static,
    ) {
        self.constructors.insert(variant, Box::new(constructor));
    }

    /// Every node of `kind` created through this factory gets `observer`.
    pub fn register_observer(&mut self, kind: NodeKind, observer: ObserverRef) {
        self.default_observers.entry(kind).or_default().push(observer);
    }

    pub fn default_observers(&self, kind: NodeKind) -> &[ObserverRef] {
        self.default_observers
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn supports(&self, variant: NodeVariant) -> bool {
        self.constructors.contains_key(&variant)
    }

    pub fn instantiate(&self, variant: NodeVariant) -> HierarchyResult<NodeData> {
        self.constructors
            .get(&variant)
            .map(|constructor| constructor())
            .ok_or(HierarchyError::NoFactory(variant))
    }

    /// A new unnamed node of `variant` with a fresh identity.
    pub fn create(&self, variant: NodeVariant) -> HierarchyResult<Node> {
        Ok(Node::new(None, self.instantiate(variant)?))
    }
}

impl fmt::Debug for NodeFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut variants: Vec<String> = self
            .constructors
            .keys()
            .map(|variant| format!("{variant:?}"))
            .collect();
        variants.sort();
        f.debug_struct("NodeFactory")
            .field("variants", &variants)
            .finish()
    }
}

/// What a reconcile did to the live hierarchy. Removed nodes are detached
/// but still addressable; the caller decides whether to discard them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub added: Vec<NodeId>,
    pub updated: Vec<NodeId>,
    pub removed: Vec<NodeId>,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// A disconnected copy of one parent's children of a single kind, edited
/// freely and later folded back into the live hierarchy.
#[derive(Debug)]
pub struct WorkingCopy {
    tree: Hierarchy,
    live_parent: NodeId,
    kind: NodeKind,
}

impl WorkingCopy {
    pub fn of(live: &Hierarchy, parent: NodeId, kind: NodeKind) -> HierarchyResult<Self> {
        let parent_node = live.get(parent)?;
        if !parent_node.kind().allows_child(kind) {
            return Err(HierarchyError::ChildKindNotAllowed {
                parent: parent_node.kind(),
                child: kind,
            });
        }

        let mut tree = Hierarchy::with_root(parent_node.detached_copy());
        for child in live.children_of_kind(parent, kind) {
            let copy = live.get(child)?.detached_copy();
            tree.add_new(tree.root(), copy)?;
        }
        Ok(Self {
            tree,
            live_parent: parent,
            kind,
        })
    }

    pub fn tree(&self) -> &Hierarchy {
        &self.tree
    }

    /// Direct access for property edits on the copies.
    pub fn tree_mut(&mut self) -> &mut Hierarchy {
        &mut self.tree
    }

    pub fn live_parent(&self) -> NodeId {
        self.live_parent
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// The edited items, in their current order.
    pub fn items(&self) -> Vec<NodeId> {
        self.tree.children_of_kind(self.tree.root(), self.kind)
    }

    pub fn add(&mut self, node: Node) -> HierarchyResult<NodeId> {
        if node.kind() != self.kind {
            return Err(HierarchyError::WrongKind {
                expected: self.kind,
                found: node.kind(),
            });
        }
        let root = self.tree.root();
        self.tree.add_new(root, node)
    }

    pub fn remove(&mut self, id: NodeId) -> HierarchyResult<bool> {
        let root = self.tree.root();
        let removed = self.tree.remove_child(root, id)?;
        if removed {
            self.tree.discard(id)?;
        }
        Ok(removed)
    }

    /// Replaces the account `id` with a new account bound to `protocol`.
    /// The replacement has a new identity and keeps the name, password and
    /// auto-connect setting, at the same position.
    pub fn retype_account(
        &mut self,
        id: NodeId,
        protocol: Option<Protocol>,
        factory: &NodeFactory,
    ) -> HierarchyResult<NodeId> {
        let node = self.tree.get(id)?;
        let old = node.as_account().ok_or(HierarchyError::WrongKind {
            expected: NodeKind::Account,
            found: node.kind(),
        })?;
        let index = self
            .items()
            .iter()
            .position(|item| *item == id)
            .ok_or(HierarchyError::MissingNode(id))?;

        let mut data = factory.instantiate(NodeVariant::Account(protocol))?;
        if let NodeData::Account(account) = &mut data {
            account.password = old.password.clone();
            account.connect_automatically = old.connect_automatically;
        }
        let replacement = Node::new(node.name.clone(), data);

        self.remove(id)?;
        let root = self.tree.root();
        let new_id = self.tree.insert(replacement);
        self.tree.add_child_at(root, new_id, index)?;
        debug!(old = ?id, new = ?new_id, ?protocol, "account retyped");
        Ok(new_id)
    }

    /// Whether committing would change the live hierarchy.
    pub fn has_pending_changes(&self, live: &Hierarchy) -> bool {
        let mut live_items = live.children_of_kind(self.live_parent, self.kind);
        let mut working_items = self.items();
        if live_items.len() != working_items.len() {
            return true;
        }
        sort_by_identity(live, &mut live_items);
        sort_by_identity(&self.tree, &mut working_items);

        live_items
            .iter()
            .zip(&working_items)
            .any(|(l, w)| match (live.get(*l), self.tree.get(*w)) {
                (Ok(l), Ok(w)) => l.uuid() != w.uuid() || !l.content_eq(w),
                _ => true,
            })
    }

    pub fn commit(
        &self,
        live: &mut Hierarchy,
        factory: &NodeFactory,
    ) -> HierarchyResult<ReconcileReport> {
        reconcile(live, self, factory)
    }
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Add { working: NodeId },
    Update { live: NodeId, working: NodeId },
    Remove { live: NodeId },
}

/// Pairs live and working items by identity. Validates everything that
/// could fail before any step is applied.
fn plan(
    live: &Hierarchy,
    live_items: &[NodeId],
    working: &Hierarchy,
    working_items: &[NodeId],
    factory: &NodeFactory,
) -> HierarchyResult<Vec<Step>> {
    let mut steps = Vec::new();
    let (mut i, mut j) = (0, 0);

    loop {
        let order = match (live_items.get(i), working_items.get(j)) {
            (None, None) => break,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(&l), Some(&w)) => live.uuid(l)?.cmp(&working.uuid(w)?),
        };

        match order {
            Ordering::Less => {
                steps.push(Step::Remove {
                    live: live_items[i],
                });
                i += 1;
            }
            Ordering::Greater => {
                let w = working_items[j];
                let variant = working.get(w)?.variant();
                if !factory.supports(variant) {
                    return Err(HierarchyError::NoFactory(variant));
                }
                steps.push(Step::Add { working: w });
                j += 1;
            }
            Ordering::Equal => {
                let (l, w) = (live_items[i], working_items[j]);
                let (live_node, working_node) = (live.get(l)?, working.get(w)?);
                if live_node.variant() != working_node.variant() {
                    return Err(HierarchyError::VariantMismatch {
                        uuid: live_node.uuid(),
                        live: live_node.variant(),
                        working: working_node.variant(),
                    });
                }
                if !live_node.content_eq(working_node) {
                    steps.push(Step::Update {
                        live: l,
                        working: w,
                    });
                }
                i += 1;
                j += 1;
            }
        }
    }
    Ok(steps)
}

/// Folds `working` into the live hierarchy it was copied from.
///
/// Both item lists are sorted by identity and merged: identities only in the
/// working copy are instantiated through `factory` (keeping that identity),
/// identities only in the live hierarchy are detached from their parent, and
/// identities in both get their editable properties copied across.
pub fn reconcile(
    live: &mut Hierarchy,
    working: &WorkingCopy,
    factory: &NodeFactory,
) -> HierarchyResult<ReconcileReport> {
    let parent = working.live_parent;
    live.get(parent)?;
    if !working.has_pending_changes(live) {
        return Ok(ReconcileReport::default());
    }

    let mut live_items = live.children_of_kind(parent, working.kind);
    let mut working_items = working.items();
    sort_by_identity(live, &mut live_items);
    sort_by_identity(&working.tree, &mut working_items);
    let steps = plan(live, &live_items, &working.tree, &working_items, factory)?;

    let mut report = ReconcileReport::default();
    for step in steps {
        match step {
            Step::Remove { live: id } => {
                live.remove_child(parent, id)?;
                debug!(node = ?id, "reconcile removed");
                report.removed.push(id);
            }
            Step::Update { live: id, working: source } => {
                let changed = copy_editable(live, id, working.tree.get(source)?)?;
                debug!(node = ?id, ?changed, "reconcile updated");
                report.updated.push(id);
            }
            Step::Add { working: source } => {
                let source = working.tree.get(source)?;
                let data = factory.instantiate(source.variant())?;
                let id = live.insert(Node::with_identity(source.uuid(), None, data));
                copy_editable(live, id, source)?;
                for observer in factory.default_observers(source.kind()) {
                    live.attach(id, observer.clone())?;
                }
                live.add_child(parent, id)?;
                debug!(node = ?id, uuid = %source.uuid(), "reconcile added");
                report.added.push(id);
            }
        }
    }

    info!(
        added = report.added.len(),
        updated = report.updated.len(),
        removed = report.removed.len(),
        kind = %working.kind,
        "reconciled working copy"
    );
    Ok(report)
}

/// Copies the editable properties of `source` onto the live node `id`
/// through the normal setters. Returns the properties that changed.
pub fn copy_editable(
    live: &mut Hierarchy,
    id: NodeId,
    source: &Node,
) -> HierarchyResult<Vec<Property>> {
    let mut changed = Vec::new();
    let mut record = |property: Property, did_change: bool| {
        if did_change {
            changed.push(property);
        }
    };

    record(Property::Name, live.set_name(id, source.name.clone())?);
    match source.data() {
        NodeData::Account(account) => {
            record(
                Property::Password,
                live.set_password(id, account.password.clone())?,
            );
            record(
                Property::ConnectAutomatically,
                live.set_connect_automatically(id, account.connect_automatically)?,
            );
            record(Property::Domain, live.set_domain(id, account.domain.clone())?);
            record(
                Property::Resource,
                live.set_resource(id, account.resource.clone())?,
            );
            record(Property::Anonymous, live.set_anonymous(id, account.anonymous)?);
        }
        NodeData::Contact(contact) => {
            record(
                Property::Address,
                live.set_address(id, contact.address.clone())?,
            );
            record(Property::Status, live.set_status(id, contact.status)?);
        }
        NodeData::Root | NodeData::Category(_) | NodeData::Conversation(_) => {}
    }
    Ok(changed)
}
