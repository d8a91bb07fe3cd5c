use thiserror::Error;
use uuid::Uuid;

use crate::model::{NodeId, NodeKind, NodeVariant};

/// Broad classes callers can branch on without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    InvalidArgument,
    Unsupported,
    IllegalState,
}

#[derive(Error, Debug)]
pub enum HierarchyError {
    #[error("Node {0:?} does not exist in this hierarchy")]
    MissingNode(NodeId),

    #[error("A {parent} does not allow children of kind {child}")]
    ChildKindNotAllowed { parent: NodeKind, child: NodeKind },

    #[error("Node {0:?} is already a child of this parent")]
    DuplicateChild(NodeId),

    #[error("Node {0:?} already belongs to another parent")]
    AlreadyParented(NodeId),

    #[error("Index {index} is out of range for {len} children of kind {kind}")]
    IndexOutOfRange {
        index: usize,
        len: usize,
        kind: NodeKind,
    },

    #[error("Expected a {expected} but node is a {found}")]
    WrongKind { expected: NodeKind, found: NodeKind },

    #[error("Contact {0:?} is already listed")]
    DuplicateMember(NodeId),

    #[error("Cannot create a conversation with no contacts")]
    EmptyConversation,

    #[error("Cannot update a {live:?} from a {working:?} with the same identity {uuid}")]
    VariantMismatch {
        uuid: Uuid,
        live: NodeVariant,
        working: NodeVariant,
    },

    #[error("Invalid operation: cannot discard the root node")]
    CannotDiscardRoot,

    #[error("A {0} does not allow children")]
    ChildrenNotSupported(NodeKind),

    #[error("No factory registered for {0:?}")]
    NoFactory(NodeVariant),

    #[error("No contact with address {0} in this account")]
    ContactNotFound(String),

    #[error("Tree operation failed: {0}")]
    Tree(#[from] indextree::NodeError),
}

impl HierarchyError {
    pub fn class(&self) -> ErrorClass {
        match self {
            HierarchyError::ChildrenNotSupported(_) | HierarchyError::NoFactory(_) => {
                ErrorClass::Unsupported
            }
            HierarchyError::ContactNotFound(_) | HierarchyError::Tree(_) => {
                ErrorClass::IllegalState
            }
            _ => ErrorClass::InvalidArgument,
        }
    }
}

pub type HierarchyResult<T> = Result<T, HierarchyError>;
