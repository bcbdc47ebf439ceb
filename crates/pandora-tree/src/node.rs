use pandora_diff::ListUpdateCallback;
use pandora_types::NodeId;
use serde::{Deserialize, Serialize};

use crate::snapshot::Snapshot;

/// Observer attached to a node. It sees positions in that node's own
/// flattened numbering.
pub type BoxedObserver = Box<dyn ListUpdateCallback>;

/// Whether a node stores items or child nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Leaf,
    Composite,
}

pub(crate) enum NodeKind<T> {
    Leaf(Vec<T>),
    Composite(Vec<NodeId>),
}

pub(crate) struct Node<T> {
    pub(crate) kind: NodeKind<T>,
    pub(crate) parent: Option<NodeId>,
    /// First position within the parent's numbering; 0 for a root.
    pub(crate) start_index: usize,
    pub(crate) group_index: Option<usize>,
    /// Cached item count; for a composite, the sum over its children.
    pub(crate) len: usize,
    pub(crate) txn_depth: usize,
    pub(crate) snapshot: Option<Snapshot<T>>,
    pub(crate) observer: Option<BoxedObserver>,
}

impl<T> Node<T> {
    pub(crate) fn leaf(items: Vec<T>) -> Self {
        let len = items.len();
        Self::with_kind(NodeKind::Leaf(items), len)
    }

    pub(crate) fn composite() -> Self {
        Self::with_kind(NodeKind::Composite(Vec::new()), 0)
    }

    fn with_kind(kind: NodeKind<T>, len: usize) -> Self {
        Self {
            kind,
            parent: None,
            start_index: 0,
            group_index: None,
            len,
            txn_depth: 0,
            snapshot: None,
            observer: None,
        }
    }

    pub(crate) fn node_type(&self) -> NodeType {
        match self.kind {
            NodeKind::Leaf(_) => NodeType::Leaf,
            NodeKind::Composite(_) => NodeType::Composite,
        }
    }

    pub(crate) fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Composite(children) => children,
            NodeKind::Leaf(_) => &[],
        }
    }

    pub(crate) fn detach_from_parent(&mut self) {
        self.parent = None;
        self.start_index = 0;
        self.group_index = None;
    }
}
