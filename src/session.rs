use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::errors::HierarchyResult;
use crate::event::{ChildEvent, Observer, ObserverRef, Property, PropertyChange, PropertyValue};
use crate::hierarchy::Hierarchy;
use crate::model::{Node, NodeId, NodeKind, Protocol};
use crate::reconcile::NodeFactory;
use crate::roster::{self, RosterEntry};

#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("Account has no transport protocol")]
    NoProtocol,
    #[error("Could not reach {domain}: {reason}")]
    Unreachable { domain: String, reason: String },
    #[error("Login rejected for {0}")]
    LoginRejected(String),
}

/// What a transport needs to log an account in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSettings {
    pub protocol: Option<Protocol>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub domain: Option<String>,
    pub resource: Option<String>,
    pub anonymous: bool,
}

impl AccountSettings {
    pub fn from_node(node: &Node) -> Option<Self> {
        let account = node.as_account()?;
        Some(Self {
            protocol: account.protocol(),
            username: node.name().map(str::to_owned),
            password: account.password().map(str::to_owned),
            domain: account.domain().map(str::to_owned),
            resource: account.resource().map(str::to_owned),
            anonymous: account.anonymous(),
        })
    }
}

/// The IM transport behind accounts.
pub trait Connector {
    fn connect(&mut self, account: &AccountSettings) -> Result<(), ConnectError>;

    fn disconnect(&mut self, account: &AccountSettings);

    /// The current roster of a connected account.
    fn roster(&mut self, account: &AccountSettings) -> Vec<RosterEntry>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRequest {
    Connect(NodeId),
    /// Carries the settings so the transport can be closed after the
    /// account node itself is gone.
    Disconnect {
        account: NodeId,
        settings: AccountSettings,
    },
    Populate(NodeId),
}

/// Turns hierarchy events into transport work for the owning thread.
pub struct RequestQueue {
    requests: Mutex<VecDeque<SessionRequest>>,
    this: Weak<RequestQueue>,
}

impl RequestQueue {
    fn new() -> Arc<Self> {
        Arc::new_cyclic(|this| RequestQueue {
            requests: Mutex::new(VecDeque::new()),
            this: this.clone(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<SessionRequest>> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, request: SessionRequest) {
        debug!(?request, "session request queued");
        self.lock().push_back(request);
    }

    fn pop(&self) -> Option<SessionRequest> {
        self.lock().pop_front()
    }

    fn as_observer(&self) -> Option<ObserverRef> {
        self.this.upgrade().map(|this| this as ObserverRef)
    }
}

fn is_account_under_root(tree: &Hierarchy, event: &ChildEvent) -> bool {
    event.source == tree.root() && tree.kind(event.child).is_ok_and(|k| k == NodeKind::Account)
}

impl Observer for RequestQueue {
    fn child_added(&self, tree: &Hierarchy, event: &ChildEvent) {
        if !is_account_under_root(tree, event) {
            return;
        }
        if let Some(observer) = self.as_observer() {
            if let Err(err) = tree.attach(event.child, observer) {
                warn!(account = ?event.child, %err, "failed to observe new account");
            }
        }
        let auto = tree
            .get(event.child)
            .ok()
            .and_then(Node::as_account)
            .is_some_and(|account| account.connect_automatically());
        if auto {
            self.push(SessionRequest::Connect(event.child));
        }
    }

    fn child_removed(&self, tree: &Hierarchy, event: &ChildEvent) {
        if !is_account_under_root(tree, event) {
            return;
        }
        if let Some(observer) = self.as_observer() {
            if let Err(err) = tree.detach(event.child, &observer) {
                warn!(account = ?event.child, %err, "failed to stop observing removed account");
            }
        }
        let Ok(node) = tree.get(event.child) else {
            return;
        };
        if !node.as_account().is_some_and(|account| account.is_connected()) {
            return;
        }
        if let Some(settings) = AccountSettings::from_node(node) {
            self.push(SessionRequest::Disconnect {
                account: event.child,
                settings,
            });
        }
    }

    fn property_changed(&self, _tree: &Hierarchy, change: &PropertyChange) {
        if change.property == Property::Connected && change.new == PropertyValue::Flag(true) {
            self.push(SessionRequest::Populate(change.source));
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionReport {
    pub connected: usize,
    pub failed: usize,
    pub disconnected: usize,
    pub populated: usize,
}

/// Drives a [`Connector`] from hierarchy changes.
pub struct Session<C> {
    connector: C,
    queue: Arc<RequestQueue>,
}

impl<C: Connector> Session<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            queue: RequestQueue::new(),
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn observer(&self) -> ObserverRef {
        self.queue.clone()
    }

    /// Watches the root and every existing account, and makes `factory`
    /// hand the queue to accounts it creates.
    pub fn install(&self, tree: &Hierarchy, factory: &mut NodeFactory) -> HierarchyResult<()> {
        let observer = self.observer();
        tree.attach(tree.root(), observer.clone())?;
        for account in tree.children_of_kind(tree.root(), NodeKind::Account) {
            tree.attach(account, observer.clone())?;
        }
        factory.register_observer(NodeKind::Account, observer);
        Ok(())
    }

    pub fn request(&self, request: SessionRequest) {
        self.queue.push(request);
    }

    pub fn pending(&self) -> Vec<SessionRequest> {
        self.queue.lock().iter().cloned().collect()
    }

    /// Runs queued requests until the queue is empty, including requests
    /// queued while running. Connection failures are counted, not retried.
    pub fn run_pending(&mut self, tree: &mut Hierarchy) -> HierarchyResult<SessionReport> {
        let mut report = SessionReport::default();
        while let Some(request) = self.queue.pop() {
            match request {
                SessionRequest::Connect(account) => self.connect(tree, account, &mut report)?,
                SessionRequest::Disconnect { account, settings } => {
                    self.connector.disconnect(&settings);
                    if tree.contains(account) {
                        tree.set_connected(account, false)?;
                    }
                    info!(?account, "account disconnected");
                    report.disconnected += 1;
                }
                SessionRequest::Populate(account) => {
                    let Some(settings) = connected_settings(tree, account) else {
                        continue;
                    };
                    let entries = self.connector.roster(&settings);
                    roster::populate(tree, account, &entries)?;
                    report.populated += 1;
                }
            }
        }
        Ok(report)
    }

    fn connect(
        &mut self,
        tree: &mut Hierarchy,
        account: NodeId,
        report: &mut SessionReport,
    ) -> HierarchyResult<()> {
        let Ok(node) = tree.get(account) else {
            return Ok(());
        };
        let Some(settings) = AccountSettings::from_node(node) else {
            return Ok(());
        };
        if node.as_account().is_some_and(|a| a.is_connected()) {
            return Ok(());
        }

        match self.connector.connect(&settings) {
            Ok(()) => {
                info!(?account, username = ?settings.username, "account connected");
                report.connected += 1;
                tree.set_connected(account, true)?;
            }
            Err(err) => {
                warn!(?account, username = ?settings.username, %err, "connection failed");
                report.failed += 1;
            }
        }
        Ok(())
    }
}

fn connected_settings(tree: &Hierarchy, account: NodeId) -> Option<AccountSettings> {
    let node = tree.get(account).ok()?;
    if !node.as_account()?.is_connected() {
        return None;
    }
    AccountSettings::from_node(node)
}
