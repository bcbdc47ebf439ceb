use pandora_diff::DiffConfig;
use serde::{Deserialize, Serialize};

/// Configuration for a collection tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// How change notifications are computed and delivered.
    pub diff: DiffConfig,
    /// Reject out-of-range insert/remove/replace with
    /// [`TreeError::IndexOutOfRange`](crate::TreeError::IndexOutOfRange)
    /// instead of ignoring them.
    pub strict_bounds: bool,
}

impl TreeConfig {
    pub fn strict() -> Self {
        Self {
            strict_bounds: true,
            ..Default::default()
        }
    }
}
