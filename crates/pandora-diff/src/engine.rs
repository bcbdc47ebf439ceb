use tracing::debug;

use crate::callback::{DiffCallback, FnCallback, ItemCallback, SliceCallback};
use crate::config::DiffConfig;
use crate::error::DiffResult;
use crate::outcome::DiffOutcome;
use crate::snake::find_snakes;
use crate::update::ListUpdate;

/// Diff the two lists described by `callback`.
///
/// The result is a shortest edit script under the identity relation. With
/// `detect_moves` set, a removed item that reappears elsewhere is reported
/// as a single move instead of a removal and an insertion.
///
/// Pass `&callback` to keep ownership of the callback.
pub fn calculate_diff<C: DiffCallback>(callback: C, detect_moves: bool) -> DiffResult<DiffOutcome<C>> {
    let old_len = callback.old_len();
    let new_len = callback.new_len();
    debug!(old_len, new_len, detect_moves, "calculating diff");

    let snakes = find_snakes(&callback, old_len, new_len)?;
    let outcome = DiffOutcome::new(callback, snakes, detect_moves);

    debug!(
        old_len,
        new_len,
        snakes = outcome.snakes().len(),
        "diff calculated"
    );
    Ok(outcome)
}

/// Diff two lists given only their sizes and two position predicates.
pub fn calculate_diff_with<S, C>(
    old_len: usize,
    new_len: usize,
    same_item: S,
    same_content: C,
    detect_moves: bool,
) -> DiffResult<DiffOutcome<FnCallback<S, C>>>
where
    S: Fn(usize, usize) -> bool,
    C: Fn(usize, usize) -> bool,
{
    calculate_diff(
        FnCallback::new(old_len, new_len, same_item, same_content),
        detect_moves,
    )
}

/// Diff two slices and collect the edit script, batched or not per `config`.
pub fn diff_slices<T, C>(
    old: &[T],
    new: &[T],
    items: &C,
    config: DiffConfig,
) -> DiffResult<Vec<ListUpdate<C::Payload>>>
where
    C: ItemCallback<T> + ?Sized,
{
    let outcome = calculate_diff(SliceCallback::new(old, new, items), config.detect_moves)?;
    let mut updates = Vec::new();
    if config.batch_updates {
        outcome.dispatch_updates_to(&mut updates)?;
    } else {
        outcome.dispatch_raw_updates_to(&mut updates)?;
    }
    Ok(updates)
}
