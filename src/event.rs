use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::hierarchy::Hierarchy;
use crate::model::{NodeId, Status};

pub type ObserverRef = Arc<dyn Observer>;

/// Receives change notifications from the nodes it is attached to.
///
/// Callbacks run on the thread that performed the mutation, after the
/// mutation is complete. They see the hierarchy read-only; an observer that
/// needs to react with further mutations has to queue them for the owner.
pub trait Observer: Send + Sync {
    fn child_added(&self, _tree: &Hierarchy, _event: &ChildEvent) {}

    fn child_removed(&self, _tree: &Hierarchy, _event: &ChildEvent) {}

    fn property_changed(&self, _tree: &Hierarchy, _change: &PropertyChange) {}
}

/// True when both handles refer to the same observer instance.
pub fn same_observer(a: &ObserverRef, b: &ObserverRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildEventKind {
    Added,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEvent {
    pub source: NodeId,
    pub child: NodeId,
    /// For additions, the position among siblings of the same kind. For
    /// removals, the position in the full child list before removal.
    pub index: usize,
    pub kind: ChildEventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    Name,
    Password,
    ConnectAutomatically,
    Domain,
    Resource,
    Anonymous,
    Address,
    Status,
    Populated,
    Connected,
    Members,
    Participants,
}

impl Property {
    pub fn as_str(self) -> &'static str {
        match self {
            Property::Name => "name",
            Property::Password => "password",
            Property::ConnectAutomatically => "connectAutomatically",
            Property::Domain => "domain",
            Property::Resource => "resource",
            Property::Anonymous => "anonymous",
            Property::Address => "address",
            Property::Status => "status",
            Property::Populated => "populated",
            Property::Connected => "connected",
            Property::Members => "members",
            Property::Participants => "participants",
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Text(Option<String>),
    Flag(bool),
    Status(Status),
    /// A category's members or a conversation's participants.
    Members(Vec<NodeId>),
}

impl From<Option<String>> for PropertyValue {
    fn from(value: Option<String>) -> Self {
        PropertyValue::Text(value)
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(Some(value))
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Flag(value)
    }
}

impl From<Status> for PropertyValue {
    fn from(value: Status) -> Self {
        PropertyValue::Status(value)
    }
}

impl From<Vec<NodeId>> for PropertyValue {
    fn from(value: Vec<NodeId>) -> Self {
        PropertyValue::Members(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyChange {
    pub source: NodeId,
    pub property: Property,
    pub old: PropertyValue,
    pub new: PropertyValue,
}

/// Per-node observer list. Attach, detach and the fan-out snapshot all take
/// the same lock; callbacks run after the lock is released.
#[derive(Default)]
pub(crate) struct ObserverRegistry {
    observers: Mutex<Vec<ObserverRef>>,
}

impl ObserverRegistry {
    fn lock(&self) -> MutexGuard<'_, Vec<ObserverRef>> {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn attach(&self, observer: ObserverRef) {
        let mut observers = self.lock();
        observers.retain(|existing| !same_observer(existing, &observer));
        observers.push(observer);
    }

    pub(crate) fn detach(&self, observer: &ObserverRef) -> bool {
        let mut observers = self.lock();
        let before = observers.len();
        observers.retain(|existing| !same_observer(existing, observer));
        observers.len() != before
    }

    pub(crate) fn snapshot(&self) -> Vec<ObserverRef> {
        self.lock().clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }
}

impl fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.len())
            .finish()
    }
}
