//! Error types for the tree crate.

use pandora_diff::DiffError;
use pandora_types::NodeId;

/// Errors that can occur while working with a collection tree.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// The handle does not name a live node of this tree.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// A structural operation was attempted on a leaf.
    #[error("{0} is a leaf and cannot hold child nodes")]
    NotComposite(NodeId),

    /// A leaf-only operation was attempted on a composite.
    #[error("{node} is a composite and does not support {op}")]
    NotLeaf { node: NodeId, op: &'static str },

    /// The node is already a root.
    #[error("{0} has no parent")]
    NoParent(NodeId),

    /// The node is not a direct child of the given parent.
    #[error("{child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    /// Attaching the node would make it its own ancestor.
    #[error("attaching {child} under {parent} would create a cycle")]
    CycleDetected { parent: NodeId, child: NodeId },

    /// `end_transaction` without a matching `start_transaction`.
    #[error("{0} is not in a transaction")]
    NotInTransaction(NodeId),

    /// `restore` without a snapshot to roll back to.
    #[error("{0} has no snapshot to restore")]
    NoSnapshot(NodeId),

    /// An index fell outside the node's items while strict bounds are on.
    #[error("{op} at index {index} is out of range for {node} with {len} items")]
    IndexOutOfRange {
        node: NodeId,
        op: &'static str,
        index: usize,
        len: usize,
    },

    /// Computing or dispatching the change notification failed.
    #[error("change notification failed: {0}")]
    Diff(#[from] DiffError),
}

/// Convenience alias for tree results.
pub type TreeResult<T> = Result<T, TreeError>;
