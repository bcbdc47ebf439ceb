//! Pre-mutation copies of a subtree and the diff callback that compares
//! them with the live state.

use std::collections::HashMap;

use pandora_diff::DiffCallback;
use pandora_types::{Item, NodeId};

/// Saved shape of one node inside a snapshot.
pub(crate) enum Layout<T> {
    Leaf(Vec<T>),
    Composite(Vec<NodeId>),
}

/// A node's flattened items and their content hashes, plus the layout of
/// its whole subtree so that [`restore`](crate::CollectionTree::restore)
/// can roll it back.
pub(crate) struct Snapshot<T> {
    pub(crate) items: Vec<T>,
    pub(crate) hashes: Vec<u64>,
    pub(crate) layout: HashMap<NodeId, Layout<T>>,
}

impl<T: Item> Snapshot<T> {
    pub(crate) fn new(items: Vec<T>, layout: HashMap<NodeId, Layout<T>>) -> Self {
        let hashes = items.iter().map(|item| item.content_hash()).collect();
        Self {
            items,
            hashes,
            layout,
        }
    }
}

/// Compares a snapshot (old) with the live items (new).
///
/// Identity comes from [`Item::is_same_item`]; content from the hash stored
/// at capture time against the live item's current hash.
pub(crate) struct SnapshotCallback<'a, T> {
    snapshot: &'a Snapshot<T>,
    live: &'a [&'a T],
}

impl<'a, T> SnapshotCallback<'a, T> {
    pub(crate) fn new(snapshot: &'a Snapshot<T>, live: &'a [&'a T]) -> Self {
        Self { snapshot, live }
    }
}

impl<T: Item> DiffCallback for SnapshotCallback<'_, T> {
    type Payload = ();

    fn old_len(&self) -> usize {
        self.snapshot.items.len()
    }

    fn new_len(&self) -> usize {
        self.live.len()
    }

    fn are_items_the_same(&self, old_position: usize, new_position: usize) -> bool {
        self.snapshot.items[old_position].is_same_item(self.live[new_position])
    }

    fn are_contents_the_same(&self, old_position: usize, new_position: usize) -> bool {
        self.snapshot.hashes[old_position] == self.live[new_position].content_hash()
    }
}
