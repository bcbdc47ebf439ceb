//! Error types for the diff crate.

/// Errors that can occur while computing or dispatching a diff.
///
/// Apart from [`PositionOutOfRange`](DiffError::PositionOutOfRange), every
/// variant means the compared sequences changed while the diff was running.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DiffError {
    /// The middle-snake search ran out of diagonals without the forward and
    /// backward frontiers meeting.
    #[error(
        "no middle snake found for old[{old_start}..{old_end}] / new[{new_start}..{new_end}]; \
         the lists must not change while the diff is calculated"
    )]
    NoMiddleSnake {
        old_start: usize,
        old_end: usize,
        new_start: usize,
        new_end: usize,
    },

    /// A moved item reached its second half without a recorded first half.
    #[error("no postponed update recorded for position {position} (removal side: {removal})")]
    MissingPostponedUpdate { position: usize, removal: bool },

    /// A position carried a status that cannot appear where it was found.
    #[error("unexpected status {status} for {side} position {position}")]
    UnexpectedStatus {
        side: &'static str,
        position: usize,
        status: String,
    },

    /// A position query fell outside the list.
    #[error("index out of bounds - passed position = {position}, {side} list size = {len}")]
    PositionOutOfRange {
        side: &'static str,
        position: usize,
        len: usize,
    },

    /// Replaying an update script hit a position outside the working list.
    #[error("cannot replay {op} at {position}: list has {len} items")]
    ReplayOutOfRange {
        op: &'static str,
        position: usize,
        len: usize,
    },
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
