use tracing::trace;

use crate::update::ListUpdateCallback;

enum Pending<P> {
    None,
    Insert { position: usize, count: usize },
    Remove { position: usize, count: usize },
    Change {
        position: usize,
        count: usize,
        payload: Option<P>,
    },
}

/// Wraps an observer and coalesces runs of compatible updates.
///
/// Adjacent inserts merge with inserts, removes with removes, and changes
/// with overlapping or touching changes that carry an equal payload. Moves
/// are never merged. Call [`dispatch_last_event`](Self::dispatch_last_event)
/// once the script is complete to flush the held operation.
pub struct BatchingCallback<'a, P, O: ListUpdateCallback<P> + ?Sized> {
    wrapped: &'a mut O,
    pending: Pending<P>,
}

impl<'a, P: PartialEq, O: ListUpdateCallback<P> + ?Sized> BatchingCallback<'a, P, O> {
    pub fn new(wrapped: &'a mut O) -> Self {
        Self {
            wrapped,
            pending: Pending::None,
        }
    }

    /// Forward the held operation, if any.
    pub fn dispatch_last_event(&mut self) {
        match std::mem::replace(&mut self.pending, Pending::None) {
            Pending::None => {}
            Pending::Insert { position, count } => self.wrapped.on_inserted(position, count),
            Pending::Remove { position, count } => self.wrapped.on_removed(position, count),
            Pending::Change {
                position,
                count,
                payload,
            } => self.wrapped.on_changed(position, count, payload),
        }
    }
}

impl<P: PartialEq, O: ListUpdateCallback<P> + ?Sized> ListUpdateCallback<P>
    for BatchingCallback<'_, P, O>
{
    fn on_inserted(&mut self, position: usize, count: usize) {
        if let Pending::Insert {
            position: last,
            count: last_count,
        } = &mut self.pending
        {
            if position >= *last && position <= *last + *last_count {
                *last_count += count;
                *last = position.min(*last);
                return;
            }
        }
        self.dispatch_last_event();
        self.pending = Pending::Insert { position, count };
    }

    fn on_removed(&mut self, position: usize, count: usize) {
        if let Pending::Remove {
            position: last,
            count: last_count,
        } = &mut self.pending
        {
            if *last >= position && *last <= position + count {
                *last_count += count;
                *last = position;
                return;
            }
        }
        self.dispatch_last_event();
        self.pending = Pending::Remove { position, count };
    }

    fn on_moved(&mut self, from: usize, to: usize) {
        self.dispatch_last_event();
        self.wrapped.on_moved(from, to);
    }

    fn on_changed(&mut self, position: usize, count: usize, payload: Option<P>) {
        if let Pending::Change {
            position: last,
            count: last_count,
            payload: last_payload,
        } = &mut self.pending
        {
            let previous_end = *last + *last_count;
            if position <= previous_end && position + count >= *last && *last_payload == payload {
                *last = position.min(*last);
                *last_count = previous_end.max(position + count) - *last;
                trace!(position = *last, count = *last_count, "merged change");
                return;
            }
        }
        self.dispatch_last_event();
        self.pending = Pending::Change {
            position,
            count,
            payload,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::update::ListUpdate;

    fn batched(f: impl FnOnce(&mut BatchingCallback<'_, u8, Vec<ListUpdate<u8>>>)) -> Vec<ListUpdate<u8>> {
        let mut out = Vec::new();
        let mut batch = BatchingCallback::new(&mut out);
        f(&mut batch);
        batch.dispatch_last_event();
        out
    }

    #[test]
    fn consecutive_inserts_at_same_position_merge() {
        let out = batched(|b| {
            b.on_inserted(3, 1);
            b.on_inserted(3, 1);
            b.on_inserted(4, 2);
        });
        assert_eq!(out, vec![ListUpdate::inserted(3, 4)]);
    }

    #[test]
    fn descending_removes_merge() {
        let out = batched(|b| {
            b.on_removed(5, 1);
            b.on_removed(4, 1);
            b.on_removed(3, 1);
        });
        assert_eq!(out, vec![ListUpdate::removed(3, 3)]);
    }

    #[test]
    fn distant_removes_stay_apart() {
        let out = batched(|b| {
            b.on_removed(9, 1);
            b.on_removed(2, 1);
        });
        assert_eq!(out, vec![ListUpdate::removed(9, 1), ListUpdate::removed(2, 1)]);
    }

    #[test]
    fn moves_flush_and_never_merge() {
        let out = batched(|b| {
            b.on_inserted(0, 1);
            b.on_moved(1, 2);
            b.on_moved(2, 3);
            b.on_inserted(0, 1);
        });
        assert_eq!(
            out,
            vec![
                ListUpdate::inserted(0, 1),
                ListUpdate::moved(1, 2),
                ListUpdate::moved(2, 3),
                ListUpdate::inserted(0, 1),
            ]
        );
    }

    #[test]
    fn changes_merge_only_with_equal_payloads() {
        let out = batched(|b| {
            b.on_changed(4, 1, Some(1));
            b.on_changed(3, 1, Some(1));
            b.on_changed(2, 1, Some(2));
        });
        assert_eq!(
            out,
            vec![
                ListUpdate::Changed { position: 3, count: 2, payload: Some(1) },
                ListUpdate::Changed { position: 2, count: 1, payload: Some(2) },
            ]
        );
    }

    #[test]
    fn kind_switch_flushes() {
        let out = batched(|b| {
            b.on_inserted(0, 1);
            b.on_removed(0, 1);
        });
        assert_eq!(out, vec![ListUpdate::inserted(0, 1), ListUpdate::removed(0, 1)]);
    }
}
