pub mod ancestry;
pub mod config;
pub mod errors;
pub mod event;
pub mod hierarchy;
pub mod model;
pub mod ordering;
pub mod projection;
pub mod reconcile;
pub mod roster;
pub mod session;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{ErrorClass, HierarchyError, HierarchyResult};
pub use event::{ChildEvent, ChildEventKind, Observer, ObserverRef, Property, PropertyChange};
pub use hierarchy::Hierarchy;
pub use model::{Node, NodeData, NodeId, NodeKind, NodeVariant, Protocol, Status};
pub use projection::{ContactTree, TreeListener, TreeModelEvent};
pub use reconcile::{NodeFactory, ReconcileReport, WorkingCopy};
pub use session::{Connector, Session};
