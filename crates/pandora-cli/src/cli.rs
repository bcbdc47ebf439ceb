use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "pandora",
    about = "Pandora — minimal edit scripts for ordered lists",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML file with `[diff]` settings; flags override it
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the edit script between two lists
    Diff(DiffArgs),
    /// Load grouped lists into a composite tree and report its notifications
    Tree(TreeArgs),
    /// Print the content fingerprint of every item in a list
    Hash(HashArgs),
}

/// Options shared by commands that compare two inputs.
#[derive(Args)]
pub struct CompareArgs {
    /// Identify JSON objects by this field instead of by their whole value
    #[arg(long)]
    pub key: Option<String>,
    /// Report remove/insert pairs instead of moves
    #[arg(long)]
    pub no_moves: bool,
    /// Report one operation per position instead of coalescing runs
    #[arg(long)]
    pub no_batch: bool,
    /// Replay the script onto the old list and check it yields the new one
    #[arg(long)]
    pub verify: bool,
}

#[derive(Args)]
pub struct DiffArgs {
    pub old: PathBuf,
    pub new: PathBuf,
    /// Treat inputs as newline-separated text instead of JSON arrays
    #[arg(long)]
    pub lines: bool,
    #[command(flatten)]
    pub compare: CompareArgs,
}

#[derive(Args)]
pub struct TreeArgs {
    /// JSON array of groups, each a JSON array of items
    pub old: PathBuf,
    pub new: PathBuf,
    #[command(flatten)]
    pub compare: CompareArgs,
}

#[derive(Args)]
pub struct HashArgs {
    pub input: PathBuf,
    #[arg(long)]
    pub lines: bool,
}
