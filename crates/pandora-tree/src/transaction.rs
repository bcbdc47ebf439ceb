//! Transactions, snapshots and change notification.
//!
//! Outside a transaction every tracked mutation is bracketed by
//! [`before_change`](CollectionTree::before_change), which snapshots the
//! observed nodes on the path to the root, and
//! [`after_change`](CollectionTree::after_change), which diffs those
//! snapshots against the live state and notifies. Inside a transaction
//! (on the node itself or on any ancestor) notification waits for the
//! outermost `end_transaction`.

use std::collections::HashMap;

use pandora_diff::calculate_diff;
use pandora_types::{Item, NodeId};
use tracing::{debug, trace, warn};

use crate::error::{TreeError, TreeResult};
use crate::node::NodeKind;
use crate::snapshot::{Layout, Snapshot, SnapshotCallback};
use crate::tree::CollectionTree;

impl<T: Item> CollectionTree<T> {
    // ---------------------------------------------------------------------
    // Transaction lifecycle
    // ---------------------------------------------------------------------

    /// Open a transaction on the node. Nested calls only bump the depth;
    /// the snapshot taken by the first call is kept.
    pub fn start_transaction(&mut self, id: NodeId) -> TreeResult<()> {
        let node = self.node_mut(id)?;
        node.txn_depth += 1;
        let depth = node.txn_depth;
        if node.snapshot.is_none() {
            self.capture(id)?;
        }
        self.capture_pending(id)?;
        debug!(node = %id, depth, "transaction started");
        Ok(())
    }

    /// Close one level of the node's transaction. The outermost close
    /// diffs every snapshot in the subtree and notifies its observers,
    /// unless an ancestor still has a transaction open.
    pub fn end_transaction(&mut self, id: NodeId) -> TreeResult<()> {
        let node = self.node_mut(id)?;
        if node.txn_depth == 0 {
            return Err(TreeError::NotInTransaction(id));
        }
        node.txn_depth -= 1;
        let depth = node.txn_depth;
        debug!(node = %id, depth, "transaction ended");
        if depth == 0 && !self.ancestor_in_transaction(id)? {
            self.notify_subtree(id)?;
        }
        Ok(())
    }

    /// Close the transaction on the node and every descendant without
    /// notifying anyone.
    pub fn end_transaction_silently(&mut self, id: NodeId) -> TreeResult<()> {
        // Snapshots still belong to an enclosing transaction if there is one.
        let keep_snapshots = self.ancestor_in_transaction(id)?;
        for node in self.subtree(id)? {
            let node = self.node_mut(node)?;
            node.txn_depth = 0;
            if !keep_snapshots {
                node.snapshot = None;
            }
        }
        debug!(node = %id, "transaction ended silently");
        Ok(())
    }

    /// Whether the node or any ancestor has a transaction open.
    pub fn in_transaction(&self, id: NodeId) -> TreeResult<bool> {
        for node in self.ancestors_inclusive(id)? {
            if self.node(node)?.txn_depth > 0 {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn has_snapshot(&self, id: NodeId) -> TreeResult<bool> {
        Ok(self.node(id)?.snapshot.is_some())
    }

    /// Roll the node's subtree back to its snapshot.
    ///
    /// Leaf items and child lists are restored for every node that is
    /// still alive. Nodes attached during the transaction become roots;
    /// released nodes cannot come back and are skipped.
    ///
    /// Observed ancestors outside the transaction were told about every
    /// edit as it happened, so they are told about the roll-back too.
    pub fn restore(&mut self, id: NodeId) -> TreeResult<()> {
        let snapshot = self
            .node_mut(id)?
            .snapshot
            .take()
            .ok_or(TreeError::NoSnapshot(id))?;
        let result = self.restore_tracked(id, &snapshot);
        self.node_mut(id)?.snapshot = Some(snapshot);
        result?;
        debug!(node = %id, "restored from snapshot");
        Ok(())
    }

    /// Run `f` inside a transaction on `id`.
    ///
    /// On success the transaction ends normally. On error the subtree is
    /// restored, the transaction is abandoned without notification, and the
    /// error is returned.
    pub fn apply<R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut Self) -> TreeResult<R>,
    ) -> TreeResult<R> {
        let outer_depth = self.node(id)?.txn_depth;
        self.start_transaction(id)?;
        match f(self) {
            Ok(value) => {
                self.end_transaction(id)?;
                Ok(value)
            }
            Err(err) => {
                warn!(node = %id, error = %err, "transaction failed, restoring");
                self.restore(id)?;
                if outer_depth == 0 {
                    self.end_transaction_silently(id)?;
                } else {
                    self.node_mut(id)?.txn_depth = outer_depth;
                }
                Err(err)
            }
        }
    }

    // ---------------------------------------------------------------------
    // Change hooks
    // ---------------------------------------------------------------------

    /// Snapshot every observed node from `id` to the root that is not
    /// covered by a transaction and has no snapshot yet.
    pub(crate) fn before_change(&mut self, id: NodeId) -> TreeResult<()> {
        for node in self.ancestors_inclusive(id)? {
            let n = self.node(node)?;
            if n.observer.is_some() && n.snapshot.is_none() && !self.in_transaction(node)? {
                self.capture(node)?;
            }
        }
        Ok(())
    }

    /// Refresh counts and start indices, then notify every node from `id`
    /// to the root that holds a snapshot and is not covered by a
    /// transaction.
    pub(crate) fn after_change(&mut self, id: NodeId) -> TreeResult<()> {
        self.rebuild_upwards(id)?;
        for node in self.ancestors_inclusive(id)? {
            if self.node(node)?.snapshot.is_some() && !self.in_transaction(node)? {
                self.notify(node)?;
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Snapshots
    // ---------------------------------------------------------------------

    pub(crate) fn capture(&mut self, id: NodeId) -> TreeResult<()> {
        let mut layout = HashMap::new();
        for node in self.subtree(id)? {
            let saved = match &self.node(node)?.kind {
                NodeKind::Leaf(items) => Layout::Leaf(items.clone()),
                NodeKind::Composite(children) => Layout::Composite(children.clone()),
            };
            layout.insert(node, saved);
        }
        let items = self.items(id)?;
        trace!(node = %id, items = items.len(), nodes = layout.len(), "snapshot captured");
        self.node_mut(id)?.snapshot = Some(Snapshot::new(items, layout));
        Ok(())
    }

    /// Snapshot observed descendants that entered a transaction without one.
    pub(crate) fn capture_pending(&mut self, id: NodeId) -> TreeResult<()> {
        for node in self.subtree(id)? {
            let n = self.node(node)?;
            if n.observer.is_some() && n.snapshot.is_none() {
                self.capture(node)?;
            }
        }
        Ok(())
    }

    fn restore_tracked(&mut self, id: NodeId, snapshot: &Snapshot<T>) -> TreeResult<()> {
        let Some(parent) = self.node(id)?.parent else {
            return self.restore_layout(id, snapshot);
        };
        self.before_change(parent)?;
        self.restore_layout(id, snapshot)?;
        self.after_change(parent)
    }

    fn restore_layout(&mut self, root: NodeId, snapshot: &Snapshot<T>) -> TreeResult<()> {
        let mut foreign_parents = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(saved) = snapshot.layout.get(&id) else {
                continue;
            };
            if !self.contains(id) {
                warn!(node = %id, "released node cannot be restored");
                continue;
            }
            match saved {
                Layout::Leaf(items) => {
                    if let NodeKind::Leaf(live) = &mut self.node_mut(id)?.kind {
                        *live = items.clone();
                    }
                }
                Layout::Composite(children) => {
                    let children: Vec<NodeId> =
                        children.iter().copied().filter(|c| self.contains(*c)).collect();
                    for current in self.node(id)?.children().to_vec() {
                        if !children.contains(&current) {
                            self.node_mut(current)?.detach_from_parent();
                        }
                    }
                    for &child in &children {
                        if let Some(other) = self.node(child)?.parent.filter(|p| *p != id) {
                            if let NodeKind::Composite(siblings) = &mut self.node_mut(other)?.kind {
                                siblings.retain(|c| *c != child);
                            }
                            foreign_parents.push(other);
                        }
                        self.node_mut(child)?.parent = Some(id);
                    }
                    if let NodeKind::Composite(live) = &mut self.node_mut(id)?.kind {
                        *live = children.clone();
                    }
                    stack.extend(children);
                }
            }
        }

        for node in self.subtree(root)?.into_iter().rev() {
            self.rebuild_sub_nodes(node)?;
        }
        self.rebuild_upwards(root)?;
        for parent in foreign_parents {
            if self.contains(parent) {
                self.rebuild_upwards(parent)?;
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Notification
    // ---------------------------------------------------------------------

    fn ancestor_in_transaction(&self, id: NodeId) -> TreeResult<bool> {
        match self.node(id)?.parent {
            Some(parent) => self.in_transaction(parent),
            None => Ok(false),
        }
    }

    fn notify_subtree(&mut self, id: NodeId) -> TreeResult<()> {
        // Children before parents, the same order a single mutation uses.
        for node in self.subtree(id)?.into_iter().rev() {
            if self.node(node)?.snapshot.is_some() && !self.in_transaction(node)? {
                self.notify(node)?;
            }
        }
        Ok(())
    }

    /// Diff the node's snapshot against its live items and deliver the
    /// result to its observer. The snapshot is consumed either way.
    fn notify(&mut self, id: NodeId) -> TreeResult<()> {
        let node = self.node_mut(id)?;
        let Some(snapshot) = node.snapshot.take() else {
            return Ok(());
        };
        let Some(mut observer) = node.observer.take() else {
            return Ok(());
        };

        let diff = self.config.diff;
        let result = match self.item_refs(id) {
            Ok(live) => {
                calculate_diff(SnapshotCallback::new(&snapshot, &live), diff.detect_moves)
                    .and_then(|outcome| {
                        if diff.batch_updates {
                            outcome.dispatch_updates_to(&mut observer)
                        } else {
                            outcome.dispatch_raw_updates_to(&mut observer)
                        }
                    })
                    .map_err(TreeError::from)
            }
            Err(err) => Err(err),
        };

        // The observer goes back even when the diff failed.
        self.node_mut(id)?.observer = Some(observer);
        match &result {
            Ok(()) => debug!(node = %id, old_len = snapshot.items.len(), "observer notified"),
            Err(err) => warn!(node = %id, error = %err, "observer notification failed"),
        }
        result
    }
}
