//! The observer boundary and helpers for recording and replaying edit scripts.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::{DiffError, DiffResult};

/// Receives the edit script, one operation at a time, in dispatch order.
///
/// Each position is interpreted against the list as already modified by
/// every earlier call.
pub trait ListUpdateCallback<P = ()> {
    fn on_inserted(&mut self, position: usize, count: usize);

    fn on_removed(&mut self, position: usize, count: usize);

    /// Remove the item at `from`, then insert it at `to`.
    fn on_moved(&mut self, from: usize, to: usize);

    fn on_changed(&mut self, position: usize, count: usize, payload: Option<P>);
}

impl<P, O: ListUpdateCallback<P> + ?Sized> ListUpdateCallback<P> for &mut O {
    fn on_inserted(&mut self, position: usize, count: usize) {
        (**self).on_inserted(position, count);
    }

    fn on_removed(&mut self, position: usize, count: usize) {
        (**self).on_removed(position, count);
    }

    fn on_moved(&mut self, from: usize, to: usize) {
        (**self).on_moved(from, to);
    }

    fn on_changed(&mut self, position: usize, count: usize, payload: Option<P>) {
        (**self).on_changed(position, count, payload);
    }
}

impl<P, O: ListUpdateCallback<P> + ?Sized> ListUpdateCallback<P> for Box<O> {
    fn on_inserted(&mut self, position: usize, count: usize) {
        (**self).on_inserted(position, count);
    }

    fn on_removed(&mut self, position: usize, count: usize) {
        (**self).on_removed(position, count);
    }

    fn on_moved(&mut self, from: usize, to: usize) {
        (**self).on_moved(from, to);
    }

    fn on_changed(&mut self, position: usize, count: usize, payload: Option<P>) {
        (**self).on_changed(position, count, payload);
    }
}

/// One operation of an edit script.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ListUpdate<P = ()> {
    Inserted { position: usize, count: usize },
    Removed { position: usize, count: usize },
    Moved { from: usize, to: usize },
    Changed {
        position: usize,
        count: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<P>,
    },
}

impl<P> ListUpdate<P> {
    pub fn inserted(position: usize, count: usize) -> Self {
        ListUpdate::Inserted { position, count }
    }

    pub fn removed(position: usize, count: usize) -> Self {
        ListUpdate::Removed { position, count }
    }

    pub fn moved(from: usize, to: usize) -> Self {
        ListUpdate::Moved { from, to }
    }

    pub fn changed(position: usize, count: usize) -> Self {
        ListUpdate::Changed {
            position,
            count,
            payload: None,
        }
    }

    /// Forward this operation to an observer.
    pub fn dispatch_to<O: ListUpdateCallback<P> + ?Sized>(self, observer: &mut O) {
        match self {
            ListUpdate::Inserted { position, count } => observer.on_inserted(position, count),
            ListUpdate::Removed { position, count } => observer.on_removed(position, count),
            ListUpdate::Moved { from, to } => observer.on_moved(from, to),
            ListUpdate::Changed {
                position,
                count,
                payload,
            } => observer.on_changed(position, count, payload),
        }
    }
}

impl<P> fmt::Display for ListUpdate<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListUpdate::Inserted { position, count } => write!(f, "insert {count} at {position}"),
            ListUpdate::Removed { position, count } => write!(f, "remove {count} at {position}"),
            ListUpdate::Moved { from, to } => write!(f, "move {from} -> {to}"),
            ListUpdate::Changed { position, count, .. } => {
                write!(f, "change {count} at {position}")
            }
        }
    }
}

impl<P> ListUpdateCallback<P> for Vec<ListUpdate<P>> {
    fn on_inserted(&mut self, position: usize, count: usize) {
        self.push(ListUpdate::inserted(position, count));
    }

    fn on_removed(&mut self, position: usize, count: usize) {
        self.push(ListUpdate::removed(position, count));
    }

    fn on_moved(&mut self, from: usize, to: usize) {
        self.push(ListUpdate::moved(from, to));
    }

    fn on_changed(&mut self, position: usize, count: usize, payload: Option<P>) {
        self.push(ListUpdate::Changed {
            position,
            count,
            payload,
        });
    }
}

/// Recording observer with a shared handle.
///
/// Clones see the same log, so one clone can be handed to a tree node while
/// another stays with the caller.
pub struct UpdateLog<P = ()> {
    inner: Rc<RefCell<Vec<ListUpdate<P>>>>,
}

impl<P> UpdateLog<P> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }

    /// Drain everything recorded so far.
    pub fn take(&self) -> Vec<ListUpdate<P>> {
        std::mem::take(&mut *self.inner.borrow_mut())
    }

    pub fn clear(&self) {
        self.inner.borrow_mut().clear();
    }
}

impl<P: Clone> UpdateLog<P> {
    /// Copy of everything recorded so far.
    pub fn updates(&self) -> Vec<ListUpdate<P>> {
        self.inner.borrow().clone()
    }
}

impl<P> Clone for UpdateLog<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<P> Default for UpdateLog<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: fmt::Debug> fmt::Debug for UpdateLog<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.inner.borrow().iter()).finish()
    }
}

impl<P> ListUpdateCallback<P> for UpdateLog<P> {
    fn on_inserted(&mut self, position: usize, count: usize) {
        self.inner.borrow_mut().on_inserted(position, count);
    }

    fn on_removed(&mut self, position: usize, count: usize) {
        self.inner.borrow_mut().on_removed(position, count);
    }

    fn on_moved(&mut self, from: usize, to: usize) {
        self.inner.borrow_mut().on_moved(from, to);
    }

    fn on_changed(&mut self, position: usize, count: usize, payload: Option<P>) {
        self.inner.borrow_mut().on_changed(position, count, payload);
    }
}

/// One slot of a list rebuilt by [`apply_updates`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplaySlot<T> {
    /// An item carried over from the old list, possibly moved.
    Kept { item: T, changed: bool },
    /// A placeholder for an inserted item.
    Inserted,
}

impl<T> ReplaySlot<T> {
    pub fn item(&self) -> Option<&T> {
        match self {
            ReplaySlot::Kept { item, .. } => Some(item),
            ReplaySlot::Inserted => None,
        }
    }

    pub fn is_changed(&self) -> bool {
        matches!(self, ReplaySlot::Kept { changed: true, .. })
    }
}

/// Replay an edit script onto a copy of `old`.
///
/// Inserted slots carry no item, since the script only says where new items
/// go. A caller checks a round trip by comparing every kept item with the
/// new list at the same position.
pub fn apply_updates<T: Clone, P>(
    old: &[T],
    updates: &[ListUpdate<P>],
) -> DiffResult<Vec<ReplaySlot<T>>> {
    let mut slots: Vec<ReplaySlot<T>> = old
        .iter()
        .cloned()
        .map(|item| ReplaySlot::Kept {
            item,
            changed: false,
        })
        .collect();

    for update in updates {
        match *update {
            ListUpdate::Inserted { position, count } => {
                check_replay("insert", position, slots.len() + 1)?;
                slots.splice(position..position, (0..count).map(|_| ReplaySlot::Inserted));
            }
            ListUpdate::Removed { position, count } => {
                let end = replay_end("remove", position, count, slots.len())?;
                slots.drain(position..end);
            }
            ListUpdate::Moved { from, to } => {
                check_replay("move", from, slots.len())?;
                let slot = slots.remove(from);
                check_replay("move", to, slots.len() + 1)?;
                slots.insert(to, slot);
            }
            ListUpdate::Changed {
                position, count, ..
            } => {
                let end = replay_end("change", position, count, slots.len())?;
                for slot in &mut slots[position..end] {
                    if let ReplaySlot::Kept { changed, .. } = slot {
                        *changed = true;
                    }
                }
            }
        }
    }
    Ok(slots)
}

/// End of the range `position..position + count`, if it fits in `len`.
fn replay_end(op: &'static str, position: usize, count: usize, len: usize) -> DiffResult<usize> {
    let end = position
        .checked_add(count)
        .ok_or(DiffError::ReplayOutOfRange { op, position, len })?;
    check_replay(op, end, len + 1)?;
    Ok(end)
}

fn check_replay(op: &'static str, position: usize, bound: usize) -> DiffResult<()> {
    if position < bound {
        Ok(())
    } else {
        Err(DiffError::ReplayOutOfRange {
            op,
            position,
            len: bound.saturating_sub(1),
        })
    }
}
