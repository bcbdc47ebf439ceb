use tracing::{debug, trace};

use crate::batching::BatchingCallback;
use crate::callback::DiffCallback;
use crate::error::{DiffError, DiffResult};
use crate::snake::Snake;
use crate::status::ItemStatus;
use crate::update::ListUpdateCallback;

/// A pending half of a move: either an old item still sitting in the list
/// (`removal`) or a new slot still waiting for its item.
#[derive(Clone, Copy, Debug)]
struct PostponedUpdate {
    pos_in_owner_list: usize,
    current_pos: usize,
    removal: bool,
}

/// Result of a diff pass.
///
/// Holds the snakes and one [`ItemStatus`] per old and per new position.
/// The status tables are computed once and then only read, by the position
/// queries and by [`dispatch_updates_to`](Self::dispatch_updates_to).
pub struct DiffOutcome<C: DiffCallback> {
    callback: C,
    snakes: Vec<Snake>,
    old_statuses: Vec<ItemStatus>,
    new_statuses: Vec<ItemStatus>,
    detect_moves: bool,
}

impl<C: DiffCallback> DiffOutcome<C> {
    pub(crate) fn new(callback: C, snakes: Vec<Snake>, detect_moves: bool) -> Self {
        let old_len = callback.old_len();
        let new_len = callback.new_len();
        let mut outcome = Self {
            callback,
            snakes,
            old_statuses: vec![ItemStatus::Unmatched; old_len],
            new_statuses: vec![ItemStatus::Unmatched; new_len],
            detect_moves,
        };
        outcome.find_matching_items();
        outcome
    }

    pub fn snakes(&self) -> &[Snake] {
        &self.snakes
    }

    pub fn old_len(&self) -> usize {
        self.old_statuses.len()
    }

    pub fn new_len(&self) -> usize {
        self.new_statuses.len()
    }

    pub fn detect_moves(&self) -> bool {
        self.detect_moves
    }

    pub fn callback(&self) -> &C {
        &self.callback
    }

    /// Where the item at `old_position` ended up in the new list, or `None`
    /// if it was removed.
    pub fn old_position_to_new(&self, old_position: usize) -> DiffResult<Option<usize>> {
        Ok(self.item_status_old(old_position)?.target())
    }

    /// Where the item at `new_position` came from in the old list, or `None`
    /// if it was inserted.
    pub fn new_position_to_old(&self, new_position: usize) -> DiffResult<Option<usize>> {
        Ok(self.item_status_new(new_position)?.target())
    }

    pub fn item_status_old(&self, old_position: usize) -> DiffResult<ItemStatus> {
        self.old_statuses
            .get(old_position)
            .copied()
            .ok_or(DiffError::PositionOutOfRange {
                side: "old",
                position: old_position,
                len: self.old_len(),
            })
    }

    pub fn item_status_new(&self, new_position: usize) -> DiffResult<ItemStatus> {
        self.new_statuses
            .get(new_position)
            .copied()
            .ok_or(DiffError::PositionOutOfRange {
                side: "new",
                position: new_position,
                len: self.new_len(),
            })
    }

    /// Whether the diff found nothing to report.
    pub fn is_unchanged(&self) -> bool {
        self.old_len() == self.new_len()
            && self
                .old_statuses
                .iter()
                .enumerate()
                .all(|(i, s)| matches!(*s, ItemStatus::Matched { target, changed: false } if target == i))
    }

    /// Emit the edit script to `observer`, coalescing adjacent operations.
    pub fn dispatch_updates_to<O>(&self, observer: &mut O) -> DiffResult<()>
    where
        O: ListUpdateCallback<C::Payload> + ?Sized,
    {
        let mut batching = BatchingCallback::new(observer);
        self.dispatch(&mut batching)?;
        batching.dispatch_last_event();
        Ok(())
    }

    /// Emit the edit script to `observer` exactly as the dispatcher produces
    /// it, one call per position.
    pub fn dispatch_raw_updates_to<O>(&self, observer: &mut O) -> DiffResult<()>
    where
        O: ListUpdateCallback<C::Payload> + ?Sized,
    {
        self.dispatch(observer)
    }

    // ---------------------------------------------------------------------
    // Status tables
    // ---------------------------------------------------------------------

    fn find_matching_items(&mut self) {
        let mut pos_old = self.old_len();
        let mut pos_new = self.new_len();
        for i in (0..self.snakes.len()).rev() {
            let snake = self.snakes[i];
            if self.detect_moves {
                while pos_old > snake.end_x() {
                    if self.old_statuses[pos_old - 1].is_unmatched() {
                        self.find_addition(pos_old - 1, pos_new, i);
                    }
                    pos_old -= 1;
                }
                while pos_new > snake.end_y() {
                    if self.new_statuses[pos_new - 1].is_unmatched() {
                        self.find_removal(pos_new - 1, pos_old, i);
                    }
                    pos_new -= 1;
                }
            }
            for offset in 0..snake.size {
                let (x, y) = (snake.x + offset, snake.y + offset);
                let changed = !self.callback.are_contents_the_same(x, y);
                self.old_statuses[x] = ItemStatus::Matched { target: y, changed };
                self.new_statuses[y] = ItemStatus::Matched { target: x, changed };
            }
            pos_old = snake.x;
            pos_new = snake.y;
        }
    }

    /// Look for an unclaimed new position matching the removed old item,
    /// scanning the current gap and then every earlier gap, highest first.
    fn find_addition(&mut self, old_pos: usize, gap_top: usize, snake_index: usize) {
        let mut top = gap_top;
        for j in (0..=snake_index).rev() {
            let snake = self.snakes[j];
            for new_pos in (snake.end_y()..top).rev() {
                if self.new_statuses[new_pos].is_unmatched()
                    && self.callback.are_items_the_same(old_pos, new_pos)
                {
                    let changed = !self.callback.are_contents_the_same(old_pos, new_pos);
                    self.old_statuses[old_pos] = ItemStatus::Ignored { target: new_pos };
                    self.new_statuses[new_pos] = ItemStatus::Moved {
                        target: old_pos,
                        changed,
                    };
                    trace!(old_pos, new_pos, changed, "old item moved forward");
                    return;
                }
            }
            top = snake.y;
        }
    }

    /// Look for an unclaimed old position matching the inserted new item,
    /// scanning gaps strictly before the current one.
    fn find_removal(&mut self, new_pos: usize, gap_top: usize, snake_index: usize) {
        let mut top = gap_top;
        for j in (0..=snake_index).rev() {
            let snake = self.snakes[j];
            for old_pos in (snake.end_x()..top).rev() {
                if self.old_statuses[old_pos].is_unmatched()
                    && self.callback.are_items_the_same(old_pos, new_pos)
                {
                    let changed = !self.callback.are_contents_the_same(old_pos, new_pos);
                    self.new_statuses[new_pos] = ItemStatus::Ignored { target: old_pos };
                    self.old_statuses[old_pos] = ItemStatus::Moved {
                        target: new_pos,
                        changed,
                    };
                    trace!(old_pos, new_pos, changed, "new item moved backward");
                    return;
                }
            }
            top = snake.x;
        }
    }

    // ---------------------------------------------------------------------
    // Dispatch
    // ---------------------------------------------------------------------

    fn dispatch<O>(&self, observer: &mut O) -> DiffResult<()>
    where
        O: ListUpdateCallback<C::Payload> + ?Sized,
    {
        let mut postponed = Vec::new();
        let mut pos_old = self.old_len();
        let mut pos_new = self.new_len();
        for snake in self.snakes.iter().rev() {
            let (end_x, end_y) = (snake.end_x(), snake.end_y());
            if end_x < pos_old {
                self.dispatch_removals(&mut postponed, observer, end_x, pos_old - end_x, end_x)?;
            }
            if end_y < pos_new {
                self.dispatch_additions(&mut postponed, observer, end_x, pos_new - end_y, end_y)?;
            }
            for offset in (0..snake.size).rev() {
                let x = snake.x + offset;
                if let ItemStatus::Matched { changed: true, .. } = self.old_statuses[x] {
                    let payload = self.callback.change_payload(x, snake.y + offset);
                    observer.on_changed(x, 1, payload);
                }
            }
            pos_old = snake.x;
            pos_new = snake.y;
        }
        debug!(
            old_len = self.old_len(),
            new_len = self.new_len(),
            snakes = self.snakes.len(),
            "updates dispatched"
        );
        Ok(())
    }

    fn dispatch_removals<O>(
        &self,
        postponed: &mut Vec<PostponedUpdate>,
        observer: &mut O,
        start: usize,
        count: usize,
        global: usize,
    ) -> DiffResult<()>
    where
        O: ListUpdateCallback<C::Payload> + ?Sized,
    {
        if !self.detect_moves {
            observer.on_removed(start, count);
            return Ok(());
        }
        for i in (0..count).rev() {
            let old_pos = global + i;
            match self.old_statuses[old_pos] {
                ItemStatus::Unmatched => {
                    observer.on_removed(start + i, 1);
                    for update in postponed.iter_mut() {
                        update.current_pos -= 1;
                    }
                }
                ItemStatus::Moved { target, changed } => {
                    let update = take_postponed(postponed, target, false)?;
                    // The removal ahead of the slot shifts it down by one.
                    let to = update.current_pos - 1;
                    observer.on_moved(start + i, to);
                    if changed {
                        observer.on_changed(to, 1, self.callback.change_payload(old_pos, target));
                    }
                }
                ItemStatus::Ignored { .. } => postponed.push(PostponedUpdate {
                    pos_in_owner_list: old_pos,
                    current_pos: start + i,
                    removal: true,
                }),
                status @ ItemStatus::Matched { .. } => {
                    return Err(DiffError::UnexpectedStatus {
                        side: "old",
                        position: old_pos,
                        status: status.to_string(),
                    })
                }
            }
        }
        Ok(())
    }

    fn dispatch_additions<O>(
        &self,
        postponed: &mut Vec<PostponedUpdate>,
        observer: &mut O,
        start: usize,
        count: usize,
        global: usize,
    ) -> DiffResult<()>
    where
        O: ListUpdateCallback<C::Payload> + ?Sized,
    {
        if !self.detect_moves {
            observer.on_inserted(start, count);
            return Ok(());
        }
        for i in (0..count).rev() {
            let new_pos = global + i;
            match self.new_statuses[new_pos] {
                ItemStatus::Unmatched => {
                    observer.on_inserted(start, 1);
                    for update in postponed.iter_mut() {
                        update.current_pos += 1;
                    }
                }
                ItemStatus::Moved { target, changed } => {
                    let update = take_postponed(postponed, target, true)?;
                    observer.on_moved(update.current_pos, start);
                    if changed {
                        observer.on_changed(start, 1, self.callback.change_payload(target, new_pos));
                    }
                }
                ItemStatus::Ignored { .. } => postponed.push(PostponedUpdate {
                    pos_in_owner_list: new_pos,
                    current_pos: start,
                    removal: false,
                }),
                status @ ItemStatus::Matched { .. } => {
                    return Err(DiffError::UnexpectedStatus {
                        side: "new",
                        position: new_pos,
                        status: status.to_string(),
                    })
                }
            }
        }
        Ok(())
    }
}

/// Remove the record for `position`, shifting every record queued after it:
/// those sit between the two ends of the move being resolved.
fn take_postponed(
    postponed: &mut Vec<PostponedUpdate>,
    position: usize,
    removal: bool,
) -> DiffResult<PostponedUpdate> {
    let index = postponed
        .iter()
        .rposition(|u| u.pos_in_owner_list == position && u.removal == removal)
        .ok_or(DiffError::MissingPostponedUpdate { position, removal })?;
    let update = postponed.remove(index);
    for later in &mut postponed[index..] {
        if removal {
            later.current_pos += 1;
        } else {
            later.current_pos -= 1;
        }
    }
    Ok(update)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{calculate_diff, diff_slices};
    use crate::callback::{FnCallback, ItemCallback, SliceCallback};
    use crate::update::{apply_updates, ListUpdate, ReplaySlot};
    use crate::DiffConfig;
    use proptest::prelude::*;

    fn eq_callback<'a, T: PartialEq>(old: &'a [T], new: &'a [T]) -> FnCallback<impl Fn(usize, usize) -> bool + 'a, impl Fn(usize, usize) -> bool + 'a> {
        FnCallback::new(old.len(), new.len(), move |o, n| old[o] == new[n], |_, _| true)
    }

    fn script<T: PartialEq>(old: &[T], new: &[T], detect_moves: bool) -> Vec<ListUpdate> {
        let outcome = calculate_diff(eq_callback(old, new), detect_moves).unwrap();
        let mut out = Vec::new();
        outcome.dispatch_updates_to(&mut out).unwrap();
        out
    }

    fn raw_script<T: PartialEq>(old: &[T], new: &[T], detect_moves: bool) -> Vec<ListUpdate> {
        let outcome = calculate_diff(eq_callback(old, new), detect_moves).unwrap();
        let mut out = Vec::new();
        outcome.dispatch_raw_updates_to(&mut out).unwrap();
        out
    }

    fn round_trips<T: PartialEq + Clone + std::fmt::Debug>(old: &[T], new: &[T], updates: &[ListUpdate]) -> bool {
        let slots = apply_updates(old, updates).unwrap();
        slots.len() == new.len()
            && slots.iter().zip(new).all(|(slot, expected)| match slot {
                ReplaySlot::Kept { item, .. } => item == expected,
                ReplaySlot::Inserted => true,
            })
    }

    fn lcs_len<T: PartialEq>(a: &[T], b: &[T]) -> usize {
        let mut table = vec![vec![0usize; b.len() + 1]; a.len() + 1];
        for i in 0..a.len() {
            for j in 0..b.len() {
                table[i + 1][j + 1] = if a[i] == b[j] {
                    table[i][j] + 1
                } else {
                    table[i][j + 1].max(table[i + 1][j])
                };
            }
        }
        table[a.len()][b.len()]
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Row {
        id: u32,
        body: &'static str,
    }

    struct ById;

    impl ItemCallback<Row> for ById {
        type Payload = &'static str;

        fn are_items_the_same(&self, a: &Row, b: &Row) -> bool {
            a.id == b.id
        }

        fn are_contents_the_same(&self, a: &Row, b: &Row) -> bool {
            a.body == b.body
        }

        fn change_payload(&self, _a: &Row, b: &Row) -> Option<&'static str> {
            Some(b.body)
        }
    }

    // ---------------------------------------------------------------------
    // Scenarios
    // ---------------------------------------------------------------------

    #[test]
    fn append_one() {
        assert_eq!(script(&[1, 2], &[1, 2, 3], true), vec![ListUpdate::inserted(2, 1)]);
    }

    #[test]
    fn remove_middle() {
        assert_eq!(script(&[1, 2, 3], &[1, 3], true), vec![ListUpdate::removed(1, 1)]);
    }

    #[test]
    fn fill_empty_list_batched() {
        assert_eq!(script::<u8>(&[], &[1, 2], true), vec![ListUpdate::inserted(0, 2)]);
    }

    #[test]
    fn fill_empty_list_unbatched() {
        assert_eq!(
            raw_script::<u8>(&[], &[1, 2], true),
            vec![ListUpdate::inserted(0, 1), ListUpdate::inserted(0, 1)]
        );
    }

    #[test]
    fn clear_list() {
        assert_eq!(script(&[1, 2, 3], &[], true), vec![ListUpdate::removed(0, 3)]);
    }

    #[test]
    fn swap_is_a_single_move() {
        let updates = script(&['a', 'b', 'c'], &['b', 'a', 'c'], true);
        assert_eq!(updates.len(), 1);
        assert!(matches!(updates[0], ListUpdate::Moved { .. }));
        assert!(round_trips(&['a', 'b', 'c'], &['b', 'a', 'c'], &updates));
    }

    #[test]
    fn swap_without_move_detection() {
        let updates = script(&['a', 'b', 'c'], &['b', 'a', 'c'], false);
        assert!(updates.iter().all(|u| !matches!(u, ListUpdate::Moved { .. })));
        let edits: usize = updates
            .iter()
            .map(|u| match u {
                ListUpdate::Inserted { count, .. } | ListUpdate::Removed { count, .. } => *count,
                _ => 0,
            })
            .sum();
        assert_eq!(edits, 2);
        assert!(round_trips(&['a', 'b', 'c'], &['b', 'a', 'c'], &updates));
    }

    #[test]
    fn content_change_without_move() {
        let old = [Row { id: 1, body: "v1" }];
        let new = [Row { id: 1, body: "v2" }];
        let updates = diff_slices(&old, &new, &ById, DiffConfig::default()).unwrap();
        assert_eq!(
            updates,
            vec![ListUpdate::Changed { position: 0, count: 1, payload: Some("v2") }]
        );
    }

    #[test]
    fn moved_and_changed_reports_both() {
        let old = [
            Row { id: 1, body: "a" },
            Row { id: 2, body: "b" },
            Row { id: 3, body: "c" },
        ];
        let new = [
            Row { id: 2, body: "b" },
            Row { id: 3, body: "c" },
            Row { id: 1, body: "A" },
        ];
        let updates = diff_slices(&old, &new, &ById, DiffConfig::default()).unwrap();
        let moves = updates.iter().filter(|u| matches!(u, ListUpdate::Moved { .. })).count();
        let changes = updates.iter().filter(|u| matches!(u, ListUpdate::Changed { .. })).count();
        assert_eq!(moves, 1);
        assert_eq!(changes, 1);
        let slots = apply_updates(&old, &updates).unwrap();
        assert_eq!(slots[2].item().map(|r| r.id), Some(1));
        assert!(slots[2].is_changed());
    }

    #[test]
    fn identical_lists_produce_nothing() {
        let list = [5, 1, 4, 1, 5, 9, 2, 6];
        let outcome = calculate_diff(eq_callback(&list, &list), true).unwrap();
        assert!(outcome.is_unchanged());
        let mut out: Vec<ListUpdate> = Vec::new();
        outcome.dispatch_updates_to(&mut out).unwrap();
        assert!(out.is_empty());
    }

    // ---------------------------------------------------------------------
    // Position queries
    // ---------------------------------------------------------------------

    #[test]
    fn position_conversion() {
        let old = ['a', 'b', 'c', 'd'];
        let new = ['a', 'c', 'x', 'd'];
        let outcome = calculate_diff(eq_callback(&old, &new), true).unwrap();
        assert_eq!(outcome.old_position_to_new(0).unwrap(), Some(0));
        assert_eq!(outcome.old_position_to_new(1).unwrap(), None);
        assert_eq!(outcome.old_position_to_new(2).unwrap(), Some(1));
        assert_eq!(outcome.new_position_to_old(2).unwrap(), None);
        assert_eq!(outcome.new_position_to_old(3).unwrap(), Some(3));
    }

    #[test]
    fn position_conversion_follows_moves() {
        let old = ['a', 'b', 'c'];
        let new = ['c', 'a', 'b'];
        let outcome = calculate_diff(eq_callback(&old, &new), true).unwrap();
        assert_eq!(outcome.old_position_to_new(2).unwrap(), Some(0));
        assert_eq!(outcome.new_position_to_old(0).unwrap(), Some(2));
    }

    #[test]
    fn position_out_of_range() {
        let outcome = calculate_diff(eq_callback(&[1, 2], &[1]), true).unwrap();
        assert_eq!(
            outcome.old_position_to_new(2),
            Err(DiffError::PositionOutOfRange { side: "old", position: 2, len: 2 })
        );
        assert!(outcome.new_position_to_old(1).is_err());
    }

    #[test]
    fn duplicates_are_claimed_once() {
        let old = [1, 1, 2, 1];
        let new = [2, 1, 1, 1, 1];
        let updates = script(&old, &new, true);
        assert!(round_trips(&old, &new, &updates));
    }

    #[test]
    fn missing_postponed_record_is_an_error() {
        let mut postponed = vec![PostponedUpdate { pos_in_owner_list: 3, current_pos: 4, removal: true }];
        assert_eq!(
            take_postponed(&mut postponed, 3, false).unwrap_err(),
            DiffError::MissingPostponedUpdate { position: 3, removal: false }
        );
        assert!(take_postponed(&mut postponed, 3, true).is_ok());
        assert!(postponed.is_empty());
    }

    #[test]
    fn slice_callback_drives_outcome() {
        let old = [Row { id: 1, body: "x" }, Row { id: 2, body: "y" }];
        let new = [Row { id: 2, body: "y" }];
        let cb = SliceCallback::new(&old, &new, &ById);
        let outcome = calculate_diff(&cb, false).unwrap();
        assert_eq!(outcome.item_status_old(0).unwrap(), ItemStatus::Unmatched);
        assert_eq!(
            outcome.item_status_new(0).unwrap(),
            ItemStatus::Matched { target: 1, changed: false }
        );
    }

    // ---------------------------------------------------------------------
    // Properties
    // ---------------------------------------------------------------------

    proptest! {
        #[test]
        fn edit_count_matches_lcs_distance(
            old in prop::collection::vec(0u8..4, 0..24),
            new in prop::collection::vec(0u8..4, 0..24),
        ) {
            let updates = raw_script(&old, &new, false);
            let edits: usize = updates
                .iter()
                .map(|u| match u {
                    ListUpdate::Inserted { count, .. } | ListUpdate::Removed { count, .. } => *count,
                    _ => 0,
                })
                .sum();
            prop_assert_eq!(edits, old.len() + new.len() - 2 * lcs_len(&old, &new));
        }

        #[test]
        fn script_replays_to_new_list(
            old in prop::collection::vec(0u8..6, 0..24),
            new in prop::collection::vec(0u8..6, 0..24),
            detect_moves in any::<bool>(),
        ) {
            let updates = script(&old, &new, detect_moves);
            prop_assert!(round_trips(&old, &new, &updates));
            let raw = raw_script(&old, &new, detect_moves);
            prop_assert!(round_trips(&old, &new, &raw));
        }

        #[test]
        fn permutations_are_moves_only(new in Just((0u16..12).collect::<Vec<_>>()).prop_shuffle()) {
            let old: Vec<u16> = (0..12).collect();
            let updates = script(&old, &new, true);
            prop_assert!(
                updates.iter().all(|u| matches!(u, ListUpdate::Moved { .. })),
                "expected only moves, got {:?}",
                updates
            );
            prop_assert!(round_trips(&old, &new, &updates));
        }

        #[test]
        fn self_diff_is_empty(list in prop::collection::vec(any::<u8>(), 0..32)) {
            prop_assert!(script(&list, &list, true).is_empty());
        }
    }
}
