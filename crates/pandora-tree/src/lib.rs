//! Composite collection tree for Pandora.
//!
//! Leaves hold items, composites concatenate their children under one
//! numbering, and observers attached to any node receive a diffed, batched
//! edit script whenever that node's items change.
//!
//! # Key Types
//!
//! - [`CollectionTree`] -- Arena owning every node, with the item, structure and transaction APIs
//! - [`NodeType`] -- Leaf or composite
//! - [`TreeConfig`] -- Notification and bounds-checking policy
//! - [`TreeError`] -- Structural and transaction errors

pub mod config;
mod data;
pub mod error;
pub mod node;
mod snapshot;
mod transaction;
pub mod tree;

pub use config::TreeConfig;
pub use error::{TreeError, TreeResult};
pub use node::{BoxedObserver, NodeType};
pub use tree::CollectionTree;
