use std::path::Path;

use anyhow::Context;
use pandora_diff::DiffConfig;
use pandora_tree::TreeConfig;
use serde::{Deserialize, Serialize};

use crate::cli::CompareArgs;

/// Settings read from `--config`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub diff: DiffConfig,
    /// Fail instead of ignoring out-of-range tree edits.
    pub strict_bounds: bool,
}

impl CliConfig {
    /// Read the file if one was given, else use defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Apply command-line switches on top of the file settings.
    pub fn with_flags(mut self, args: &CompareArgs) -> Self {
        if args.no_moves {
            self.diff.detect_moves = false;
        }
        if args.no_batch {
            self.diff.batch_updates = false;
        }
        self
    }

    pub fn tree_config(&self) -> TreeConfig {
        TreeConfig {
            diff: self.diff,
            strict_bounds: self.strict_bounds,
        }
    }
}
