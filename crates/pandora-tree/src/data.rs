//! Item operations. Leaves act on their own items; composites route each
//! call to the leaf that owns the position.

use pandora_types::{Item, NodeId};
use tracing::{debug, warn};

use crate::error::{TreeError, TreeResult};
use crate::node::NodeKind;
use crate::tree::CollectionTree;

impl<T: Item> CollectionTree<T> {
    /// Number of items under the node.
    pub fn count(&self, id: NodeId) -> TreeResult<usize> {
        Ok(self.node(id)?.len)
    }

    pub fn item_at(&self, id: NodeId, index: usize) -> TreeResult<Option<&T>> {
        let Some((leaf, local)) = self.locate(id, index)? else {
            return Ok(None);
        };
        match &self.node(leaf)?.kind {
            NodeKind::Leaf(items) => Ok(items.get(local)),
            NodeKind::Composite(_) => Ok(None),
        }
    }

    /// Insert `item` so that it ends up at `index`.
    ///
    /// On a composite, `index == count` appends to the last leaf.
    pub fn insert_at(&mut self, id: NodeId, index: usize, item: T) -> TreeResult<()> {
        let len = self.count(id)?;
        if index > len {
            return self.out_of_range(id, "insert", index, len);
        }
        let target = if index == len {
            self.last_leaf(id)?
        } else {
            self.locate(id, index)?
        };
        let Some((leaf, local)) = target else {
            debug!(node = %id, index, "no leaf to insert into");
            return Ok(());
        };
        self.mutate_leaf(leaf, |items| items.insert(local, item))
    }

    /// Append to the node; a composite appends to its last leaf and
    /// ignores the call when it has none.
    pub fn append(&mut self, id: NodeId, item: T) -> TreeResult<()> {
        match self.last_leaf(id)? {
            Some((leaf, _)) => self.mutate_leaf(leaf, |items| items.push(item)),
            None => {
                debug!(node = %id, "append ignored: no leaf");
                Ok(())
            }
        }
    }

    pub fn append_all(&mut self, id: NodeId, items: impl IntoIterator<Item = T>) -> TreeResult<()> {
        match self.last_leaf(id)? {
            Some((leaf, _)) => self.mutate_leaf(leaf, |existing| existing.extend(items)),
            None => {
                debug!(node = %id, "append_all ignored: no leaf");
                Ok(())
            }
        }
    }

    /// Remove and return the item at `index`.
    pub fn remove_at(&mut self, id: NodeId, index: usize) -> TreeResult<Option<T>> {
        match self.locate(id, index)? {
            Some((leaf, local)) => self.mutate_leaf(leaf, |items| items.remove(local)).map(Some),
            None => {
                let len = self.count(id)?;
                self.out_of_range(id, "remove", index, len)?;
                Ok(None)
            }
        }
    }

    /// Remove the first item equal to `item` from every leaf under the
    /// node, in one batched change. Returns how many items were removed.
    pub fn remove_item(&mut self, id: NodeId, item: &T) -> TreeResult<usize> {
        if let NodeKind::Leaf(items) = &self.node(id)?.kind {
            let Some(position) = items.iter().position(|x| x == item) else {
                return Ok(0);
            };
            self.mutate_leaf(id, |items| items.remove(position))?;
            return Ok(1);
        }
        self.apply(id, |tree| {
            let mut removed = 0;
            for leaf in tree.leaves(id)? {
                removed += tree.remove_item(leaf, item)?;
            }
            Ok(removed)
        })
    }

    /// Overwrite the item at `index`. Returns `false` when nothing is there.
    pub fn replace_at(&mut self, id: NodeId, index: usize, item: T) -> TreeResult<bool> {
        match self.locate(id, index)? {
            Some((leaf, local)) => {
                self.mutate_leaf(leaf, |items| items[local] = item)?;
                Ok(true)
            }
            None => {
                let len = self.count(id)?;
                self.out_of_range(id, "replace", index, len)?;
                Ok(false)
            }
        }
    }

    /// Replace all items of a leaf.
    pub fn set_all(&mut self, id: NodeId, items: impl IntoIterator<Item = T>) -> TreeResult<()> {
        if let NodeKind::Composite(_) = self.node(id)?.kind {
            warn!(node = %id, "set_all is not supported on a composite");
            return Err(TreeError::NotLeaf { node: id, op: "set_all" });
        }
        let items: Vec<T> = items.into_iter().collect();
        self.mutate_leaf(id, |existing| *existing = items)
    }

    /// Position of the first item equal to `item`, in the node's numbering.
    pub fn index_of(&self, id: NodeId, item: &T) -> TreeResult<Option<usize>> {
        Ok(self.item_refs(id)?.into_iter().position(|x| x == item))
    }

    /// Remove every item. A composite clears all its leaves in one batched
    /// change and keeps its children.
    pub fn clear(&mut self, id: NodeId) -> TreeResult<()> {
        if let NodeKind::Leaf(_) = self.node(id)?.kind {
            return self.mutate_leaf(id, Vec::clear);
        }
        self.apply(id, |tree| {
            for leaf in tree.leaves(id)? {
                tree.clear(leaf)?;
            }
            Ok(())
        })
    }

    /// Copy of every item under the node, in order.
    pub fn items(&self, id: NodeId) -> TreeResult<Vec<T>> {
        Ok(self.item_refs(id)?.into_iter().cloned().collect())
    }

    /// Visit every item under the node with its position.
    pub fn for_each(&self, id: NodeId, mut f: impl FnMut(usize, &T)) -> TreeResult<()> {
        for (index, item) in self.item_refs(id)?.into_iter().enumerate() {
            f(index, item);
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------------

    pub(crate) fn item_refs(&self, id: NodeId) -> TreeResult<Vec<&T>> {
        let mut out = Vec::with_capacity(self.count(id)?);
        for leaf in self.leaves(id)? {
            if let NodeKind::Leaf(items) = &self.node(leaf)?.kind {
                out.extend(items.iter());
            }
        }
        Ok(out)
    }

    /// Leaves under the node, in item order.
    pub(crate) fn leaves(&self, id: NodeId) -> TreeResult<Vec<NodeId>> {
        let mut leaves = Vec::new();
        for node in self.subtree(id)? {
            if let NodeKind::Leaf(_) = self.node(node)?.kind {
                leaves.push(node);
            }
        }
        Ok(leaves)
    }

    /// The leaf reached by following last children, with its item count.
    fn last_leaf(&self, id: NodeId) -> TreeResult<Option<(NodeId, usize)>> {
        let mut current = id;
        loop {
            match &self.node(current)?.kind {
                NodeKind::Leaf(items) => return Ok(Some((current, items.len()))),
                NodeKind::Composite(children) => match children.last() {
                    Some(&last) => current = last,
                    None => return Ok(None),
                },
            }
        }
    }

    /// Apply `f` to a leaf's items between the change hooks.
    fn mutate_leaf<R>(&mut self, leaf: NodeId, f: impl FnOnce(&mut Vec<T>) -> R) -> TreeResult<R> {
        self.before_change(leaf)?;
        let result = match &mut self.node_mut(leaf)?.kind {
            NodeKind::Leaf(items) => f(items),
            NodeKind::Composite(_) => {
                return Err(TreeError::NotLeaf {
                    node: leaf,
                    op: "item mutation",
                })
            }
        };
        self.after_change(leaf)?;
        Ok(result)
    }

    fn out_of_range(&self, id: NodeId, op: &'static str, index: usize, len: usize) -> TreeResult<()> {
        if self.config.strict_bounds {
            return Err(TreeError::IndexOutOfRange {
                node: id,
                op,
                index,
                len,
            });
        }
        debug!(node = %id, op, index, len, "index out of range, ignored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{CollectionTree, TreeConfig, TreeError};
    use pandora_types::NodeId;

    fn two_leaves(config: TreeConfig) -> (CollectionTree<u32>, NodeId, NodeId, NodeId) {
        let mut tree = CollectionTree::with_config(config);
        let root = tree.new_composite();
        let a = tree.new_leaf_with([1, 2]);
        let b = tree.new_leaf_with([3, 4]);
        tree.add_child(root, a).unwrap();
        tree.add_child(root, b).unwrap();
        (tree, root, a, b)
    }

    #[test]
    fn composite_index_translation() {
        let (tree, root, _a, b) = two_leaves(TreeConfig::default());
        assert_eq!(tree.item_at(root, 3).unwrap(), tree.item_at(b, 1).unwrap());
        assert_eq!(tree.item_at(root, 3).unwrap(), Some(&4));
        assert_eq!(tree.start_index(b).unwrap(), 2);
        assert_eq!(tree.item_at(root, 4).unwrap(), None);
    }

    #[test]
    fn insert_routes_to_owner() {
        let (mut tree, root, a, b) = two_leaves(TreeConfig::default());
        tree.insert_at(root, 3, 30).unwrap();
        assert_eq!(tree.items(b).unwrap(), vec![3, 30, 4]);
        tree.insert_at(root, 0, 10).unwrap();
        assert_eq!(tree.items(a).unwrap(), vec![10, 1, 2]);
        assert_eq!(tree.start_index(b).unwrap(), 3);
        tree.insert_at(root, 6, 50).unwrap();
        assert_eq!(tree.items(root).unwrap(), vec![10, 1, 2, 3, 30, 4, 50]);
    }

    #[test]
    fn insert_at_boundary_goes_to_owner_of_that_position() {
        let (mut tree, root, _a, b) = two_leaves(TreeConfig::default());
        tree.insert_at(root, 2, 9).unwrap();
        assert_eq!(tree.items(b).unwrap(), vec![9, 3, 4]);
    }

    #[test]
    fn append_targets_last_leaf() {
        let (mut tree, root, _a, b) = two_leaves(TreeConfig::default());
        tree.append(root, 5).unwrap();
        tree.append_all(root, [6, 7]).unwrap();
        assert_eq!(tree.items(b).unwrap(), vec![3, 4, 5, 6, 7]);
        assert_eq!(tree.count(root).unwrap(), 7);
    }

    #[test]
    fn append_on_empty_composite_is_ignored() {
        let mut tree: CollectionTree<u32> = CollectionTree::new();
        let root = tree.new_composite();
        tree.append(root, 1).unwrap();
        tree.insert_at(root, 0, 1).unwrap();
        assert_eq!(tree.count(root).unwrap(), 0);
    }

    #[test]
    fn remove_and_replace() {
        let (mut tree, root, a, b) = two_leaves(TreeConfig::default());
        assert_eq!(tree.remove_at(root, 1).unwrap(), Some(2));
        assert_eq!(tree.items(a).unwrap(), vec![1]);
        assert_eq!(tree.start_index(b).unwrap(), 1);
        assert!(tree.replace_at(root, 2, 40).unwrap());
        assert_eq!(tree.items(root).unwrap(), vec![1, 3, 40]);
    }

    #[test]
    fn out_of_range_is_ignored_by_default() {
        let (mut tree, root, a, _b) = two_leaves(TreeConfig::default());
        assert_eq!(tree.remove_at(root, 9).unwrap(), None);
        assert!(!tree.replace_at(root, 4, 0).unwrap());
        assert!(!tree.replace_at(a, 2, 0).unwrap());
        tree.insert_at(a, 5, 0).unwrap();
        assert_eq!(tree.items(root).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn out_of_range_is_an_error_when_strict() {
        let (mut tree, root, a, _b) = two_leaves(TreeConfig::strict());
        assert!(matches!(
            tree.remove_at(root, 9),
            Err(TreeError::IndexOutOfRange { op: "remove", index: 9, len: 4, .. })
        ));
        assert!(matches!(
            tree.replace_at(a, 2, 0),
            Err(TreeError::IndexOutOfRange { op: "replace", .. })
        ));
        assert!(matches!(
            tree.insert_at(a, 3, 0),
            Err(TreeError::IndexOutOfRange { op: "insert", .. })
        ));
        assert_eq!(tree.items(root).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn set_all_is_leaf_only() {
        let (mut tree, root, a, b) = two_leaves(TreeConfig::default());
        tree.set_all(a, [7, 8, 9]).unwrap();
        assert_eq!(tree.start_index(b).unwrap(), 3);
        assert!(matches!(
            tree.set_all(root, [1]),
            Err(TreeError::NotLeaf { op: "set_all", .. })
        ));
    }

    #[test]
    fn index_of_uses_composite_numbering() {
        let (tree, root, _a, b) = two_leaves(TreeConfig::default());
        assert_eq!(tree.index_of(root, &4).unwrap(), Some(3));
        assert_eq!(tree.index_of(b, &4).unwrap(), Some(1));
        assert_eq!(tree.index_of(root, &99).unwrap(), None);
    }

    #[test]
    fn remove_item_hits_every_leaf_once() {
        let mut tree = CollectionTree::new();
        let root = tree.new_composite();
        let a = tree.new_leaf_with([1u32, 7, 7]);
        let b = tree.new_leaf_with([7u32, 2]);
        tree.add_child(root, a).unwrap();
        tree.add_child(root, b).unwrap();
        assert_eq!(tree.remove_item(root, &7).unwrap(), 2);
        assert_eq!(tree.items(root).unwrap(), vec![1, 7, 2]);
        assert_eq!(tree.remove_item(a, &5).unwrap(), 0);
        assert!(!tree.in_transaction(root).unwrap());
    }

    #[test]
    fn clear_keeps_children() {
        let (mut tree, root, a, b) = two_leaves(TreeConfig::default());
        tree.clear(root).unwrap();
        assert_eq!(tree.count(root).unwrap(), 0);
        assert_eq!(tree.children(root).unwrap(), &[a, b]);
        assert!(!tree.in_transaction(root).unwrap());
    }

    #[test]
    fn for_each_visits_in_order() {
        let (tree, root, _a, _b) = two_leaves(TreeConfig::default());
        let mut seen = Vec::new();
        tree.for_each(root, |i, v| seen.push((i, *v))).unwrap();
        assert_eq!(seen, vec![(0, 1), (1, 2), (2, 3), (3, 4)]);
    }
}
