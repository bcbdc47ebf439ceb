use serde::{Deserialize, Serialize};

/// Configuration for a diff pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Run the second pass that turns remove/insert pairs of the same item
    /// into a single move.
    pub detect_moves: bool,
    /// Coalesce adjacent inserts, removes and changes before they reach the
    /// observer.
    pub batch_updates: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            detect_moves: true,
            batch_updates: true,
        }
    }
}

impl DiffConfig {
    /// Plain Myers output: no move detection, one callback per run.
    pub fn without_moves() -> Self {
        Self {
            detect_moves: false,
            ..Default::default()
        }
    }
}
