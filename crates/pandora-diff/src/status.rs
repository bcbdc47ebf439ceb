use std::fmt;

use serde::{Deserialize, Serialize};

/// What the diff decided about one old or one new position.
///
/// `target` is always a position in the opposite list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    /// A genuine insertion (new side) or removal (old side).
    Unmatched,
    /// Matched along a snake.
    Matched { target: usize, changed: bool },
    /// Matched across snakes; this side carries the move.
    Moved { target: usize, changed: bool },
    /// Claimed by the move scan from the opposite side; the counterpart
    /// carries the [`Moved`](ItemStatus::Moved) status.
    Ignored { target: usize },
}

impl ItemStatus {
    /// The matched position in the opposite list, if any.
    pub fn target(&self) -> Option<usize> {
        match *self {
            ItemStatus::Unmatched => None,
            ItemStatus::Matched { target, .. }
            | ItemStatus::Moved { target, .. }
            | ItemStatus::Ignored { target } => Some(target),
        }
    }

    pub fn is_unmatched(&self) -> bool {
        matches!(self, ItemStatus::Unmatched)
    }

    /// Whether the item's content differs from its counterpart's.
    pub fn is_changed(&self) -> bool {
        matches!(
            self,
            ItemStatus::Matched { changed: true, .. } | ItemStatus::Moved { changed: true, .. }
        )
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemStatus::Unmatched => write!(f, "unmatched"),
            ItemStatus::Matched { target, changed } => {
                write!(f, "matched({target}{})", if *changed { ", changed" } else { "" })
            }
            ItemStatus::Moved { target, changed } => {
                write!(f, "moved({target}{})", if *changed { ", changed" } else { "" })
            }
            ItemStatus::Ignored { target } => write!(f, "ignored({target})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets() {
        assert_eq!(ItemStatus::Unmatched.target(), None);
        assert_eq!(ItemStatus::Ignored { target: 4 }.target(), Some(4));
        assert_eq!(
            ItemStatus::Moved { target: 1, changed: false }.target(),
            Some(1)
        );
    }

    #[test]
    fn changed_flag() {
        assert!(ItemStatus::Matched { target: 0, changed: true }.is_changed());
        assert!(!ItemStatus::Ignored { target: 0 }.is_changed());
    }

    #[test]
    fn serializes_with_tag() {
        let json = serde_json::to_string(&ItemStatus::Moved { target: 2, changed: true }).unwrap();
        assert_eq!(json, r#"{"status":"moved","target":2,"changed":true}"#);
    }

    #[test]
    fn display() {
        assert_eq!(ItemStatus::Matched { target: 3, changed: true }.to_string(), "matched(3, changed)");
        assert_eq!(ItemStatus::Unmatched.to_string(), "unmatched");
    }
}
