//! Myers diff with move detection for Pandora.
//!
//! Compares two versions of an ordered list and reports the shortest edit
//! script that turns one into the other, as insert, remove, move and change
//! operations delivered to a [`ListUpdateCallback`] observer.
//!
//! # Key Types
//!
//! - [`DiffCallback`] / [`ItemCallback`] -- How the engine compares positions or elements
//! - [`DiffOutcome`] -- Snakes, per-position statuses and the update dispatcher
//! - [`ListUpdateCallback`] / [`ListUpdate`] -- The observer boundary and its recorded form
//! - [`BatchingCallback`] -- Coalesces adjacent operations before they reach an observer
//! - [`DiffConfig`] -- Move detection and batching switches

pub mod batching;
pub mod callback;
pub mod config;
pub mod engine;
pub mod error;
pub mod outcome;
pub mod snake;
pub mod status;
pub mod update;

pub use batching::BatchingCallback;
pub use callback::{DiffCallback, FnCallback, ItemCallback, ItemIdentity, SliceCallback};
pub use config::DiffConfig;
pub use engine::{calculate_diff, calculate_diff_with, diff_slices};
pub use error::{DiffError, DiffResult};
pub use outcome::DiffOutcome;
pub use snake::Snake;
pub use status::ItemStatus;
pub use update::{apply_updates, ListUpdate, ListUpdateCallback, ReplaySlot, UpdateLog};
