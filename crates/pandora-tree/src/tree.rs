//! The collection tree arena and its structural operations.

use std::collections::HashMap;

use pandora_diff::ListUpdateCallback;
use pandora_types::{Item, NodeId};
use tracing::debug;

use crate::config::TreeConfig;
use crate::error::{TreeError, TreeResult};
use crate::node::{BoxedObserver, Node, NodeKind, NodeType};

/// An arena of leaf and composite collection nodes.
///
/// Leaves own items; composites own an ordered list of child nodes and
/// expose the concatenation of their children's items under one numbering.
/// Every node is addressed by a [`NodeId`] handed out by this tree. A parent
/// owns its children; the child's link back to its parent is a plain handle.
pub struct CollectionTree<T: Item> {
    nodes: HashMap<NodeId, Node<T>>,
    next_id: NodeId,
    pub(crate) config: TreeConfig,
}

impl<T: Item> Default for CollectionTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Item> CollectionTree<T> {
    pub fn new() -> Self {
        Self::with_config(TreeConfig::default())
    }

    pub fn with_config(config: TreeConfig) -> Self {
        Self {
            nodes: HashMap::new(),
            next_id: NodeId::from_raw(1),
            config,
        }
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    // ---------------------------------------------------------------------
    // Node creation
    // ---------------------------------------------------------------------

    /// Create an empty root leaf.
    pub fn new_leaf(&mut self) -> NodeId {
        self.insert_node(Node::leaf(Vec::new()))
    }

    /// Create a root leaf holding `items`.
    pub fn new_leaf_with(&mut self, items: impl IntoIterator<Item = T>) -> NodeId {
        self.insert_node(Node::leaf(items.into_iter().collect()))
    }

    /// Create an empty root composite.
    pub fn new_composite(&mut self) -> NodeId {
        self.insert_node(Node::composite())
    }

    fn insert_node(&mut self, node: Node<T>) -> NodeId {
        let id = self.next_id;
        self.next_id = id.next();
        self.nodes.insert(id, node);
        debug!(node = %id, "node created");
        id
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    pub fn node_type(&self, id: NodeId) -> TreeResult<NodeType> {
        Ok(self.node(id)?.node_type())
    }

    pub fn parent(&self, id: NodeId) -> TreeResult<Option<NodeId>> {
        Ok(self.node(id)?.parent)
    }

    /// Offset of the node's first item within its parent's numbering.
    pub fn start_index(&self, id: NodeId) -> TreeResult<usize> {
        Ok(self.node(id)?.start_index)
    }

    /// Offset of the node's first item within its root's numbering.
    pub fn absolute_start_index(&self, id: NodeId) -> TreeResult<usize> {
        let mut offset = 0;
        for ancestor in self.ancestors_inclusive(id)? {
            offset += self.node(ancestor)?.start_index;
        }
        Ok(offset)
    }

    /// Position among the parent's children; `None` for a root.
    pub fn group_index(&self, id: NodeId) -> TreeResult<Option<usize>> {
        Ok(self.node(id)?.group_index)
    }

    pub fn child_count(&self, id: NodeId) -> TreeResult<usize> {
        Ok(self.node(id)?.children().len())
    }

    pub fn child(&self, id: NodeId, index: usize) -> TreeResult<Option<NodeId>> {
        Ok(self.node(id)?.children().get(index).copied())
    }

    /// Children in order. Empty for a leaf.
    pub fn children(&self, id: NodeId) -> TreeResult<&[NodeId]> {
        Ok(self.node(id)?.children())
    }

    pub fn root_of(&self, id: NodeId) -> TreeResult<NodeId> {
        let chain = self.ancestors_inclusive(id)?;
        Ok(chain.last().copied().unwrap_or(id))
    }

    /// Whether `ancestor` lies strictly above `id`.
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> TreeResult<bool> {
        Ok(self.ancestors_inclusive(id)?.iter().skip(1).any(|&a| a == ancestor))
    }

    /// Find the leaf owning position `index` of `id` and the position
    /// inside that leaf.
    pub fn locate(&self, id: NodeId, index: usize) -> TreeResult<Option<(NodeId, usize)>> {
        let mut current = id;
        let mut local = index;
        loop {
            match &self.node(current)?.kind {
                NodeKind::Leaf(items) => return Ok((local < items.len()).then_some((current, local))),
                NodeKind::Composite(children) => {
                    // Start indices are non-decreasing, so the owner is the
                    // first child whose range ends past `local`.
                    let slot = children.partition_point(|c| {
                        self.nodes
                            .get(c)
                            .map_or(true, |n| n.start_index + n.len <= local)
                    });
                    let Some(&child) = children.get(slot) else {
                        return Ok(None);
                    };
                    local -= self.node(child)?.start_index;
                    current = child;
                }
            }
        }
    }

    // ---------------------------------------------------------------------
    // Structure
    // ---------------------------------------------------------------------

    /// Append `child` to the children of `parent`.
    ///
    /// A child that already has a parent is detached from it first.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> TreeResult<()> {
        if self.node(parent)?.node_type() != NodeType::Composite {
            return Err(TreeError::NotComposite(parent));
        }
        self.node(child)?;
        if parent == child || self.is_ancestor(child, parent)? {
            return Err(TreeError::CycleDetected { parent, child });
        }
        if self.node(child)?.parent.is_some() {
            self.detach(child)?;
        }

        self.before_change(parent)?;
        if let NodeKind::Composite(children) = &mut self.node_mut(parent)?.kind {
            children.push(child);
        }
        self.node_mut(child)?.parent = Some(parent);
        if self.in_transaction(parent)? {
            self.capture_pending(child)?;
        }
        self.after_change(parent)?;

        debug!(%parent, %child, "child attached");
        Ok(())
    }

    /// Detach `child` from `parent` and release its subtree.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> TreeResult<()> {
        if self.node(child)?.parent != Some(parent) {
            return Err(TreeError::NotAChild { parent, child });
        }
        self.detach(child)?;
        self.release(child)?;
        Ok(())
    }

    /// Detach the node from its parent. It stays alive as a new root.
    pub fn detach(&mut self, id: NodeId) -> TreeResult<()> {
        let parent = self.node(id)?.parent.ok_or(TreeError::NoParent(id))?;

        self.before_change(parent)?;
        if let NodeKind::Composite(children) = &mut self.node_mut(parent)?.kind {
            children.retain(|c| *c != id);
        }
        self.node_mut(id)?.detach_from_parent();
        self.after_change(parent)?;

        debug!(node = %id, %parent, "node detached");
        Ok(())
    }

    /// Destroy the node and its whole subtree, detaching it first if needed.
    /// Returns the number of nodes released.
    pub fn release(&mut self, id: NodeId) -> TreeResult<usize> {
        if self.node(id)?.parent.is_some() {
            self.detach(id)?;
        }
        let released = self.drop_subtree(id)?;
        debug!(node = %id, released, "subtree released");
        Ok(released)
    }

    /// Release every child of a composite in one tracked change.
    pub fn clear_children(&mut self, id: NodeId) -> TreeResult<()> {
        if self.node(id)?.node_type() != NodeType::Composite {
            return Err(TreeError::NotComposite(id));
        }
        if self.node(id)?.children().is_empty() {
            return Ok(());
        }

        self.before_change(id)?;
        let children = match &mut self.node_mut(id)?.kind {
            NodeKind::Composite(children) => std::mem::take(children),
            NodeKind::Leaf(_) => Vec::new(),
        };
        for child in &children {
            self.drop_subtree(*child)?;
        }
        self.after_change(id)?;

        debug!(node = %id, removed = children.len(), "children cleared");
        Ok(())
    }

    fn drop_subtree(&mut self, id: NodeId) -> TreeResult<usize> {
        let subtree = self.subtree(id)?;
        for node in &subtree {
            self.nodes.remove(node);
        }
        Ok(subtree.len())
    }

    // ---------------------------------------------------------------------
    // Observers
    // ---------------------------------------------------------------------

    /// Attach an observer that receives this node's changes in its own
    /// numbering. Replaces any previous observer.
    pub fn set_observer(
        &mut self,
        id: NodeId,
        observer: impl ListUpdateCallback + 'static,
    ) -> TreeResult<()> {
        self.node_mut(id)?.observer = Some(Box::new(observer));
        if self.in_transaction(id)? && self.node(id)?.snapshot.is_none() {
            self.capture(id)?;
        }
        Ok(())
    }

    pub fn take_observer(&mut self, id: NodeId) -> TreeResult<Option<BoxedObserver>> {
        Ok(self.node_mut(id)?.observer.take())
    }

    // ---------------------------------------------------------------------
    // Internals shared with the data and transaction modules
    // ---------------------------------------------------------------------

    pub(crate) fn node(&self, id: NodeId) -> TreeResult<&Node<T>> {
        self.nodes.get(&id).ok_or(TreeError::NodeNotFound(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> TreeResult<&mut Node<T>> {
        self.nodes.get_mut(&id).ok_or(TreeError::NodeNotFound(id))
    }

    /// `id`, its parent, and so on up to the root.
    pub(crate) fn ancestors_inclusive(&self, id: NodeId) -> TreeResult<Vec<NodeId>> {
        let mut chain = vec![id];
        let mut current = self.node(id)?.parent;
        while let Some(parent) = current {
            chain.push(parent);
            current = self.node(parent)?.parent;
        }
        Ok(chain)
    }

    /// `id` and all its descendants, parents before children.
    pub(crate) fn subtree(&self, id: NodeId) -> TreeResult<Vec<NodeId>> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            order.push(current);
            stack.extend(self.node(current)?.children().iter().rev().copied());
        }
        Ok(order)
    }

    /// Recompute start and group indices of the node's children and the
    /// node's own cached count.
    pub(crate) fn rebuild_sub_nodes(&mut self, id: NodeId) -> TreeResult<()> {
        let children = match &self.node(id)?.kind {
            NodeKind::Leaf(items) => {
                let len = items.len();
                self.node_mut(id)?.len = len;
                return Ok(());
            }
            NodeKind::Composite(children) => children.clone(),
        };
        let mut start = 0;
        for (group, child) in children.iter().enumerate() {
            let node = self.node_mut(*child)?;
            node.start_index = start;
            node.group_index = Some(group);
            start += node.len;
        }
        self.node_mut(id)?.len = start;
        Ok(())
    }

    /// Rebuild `id` and every ancestor, so counts and start indices reflect
    /// a change made below `id`.
    pub(crate) fn rebuild_upwards(&mut self, id: NodeId) -> TreeResult<()> {
        for node in self.ancestors_inclusive(id)? {
            self.rebuild_sub_nodes(node)?;
        }
        Ok(())
    }
}
