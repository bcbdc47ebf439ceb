//! Foundation types for Pandora.
//!
//! This crate provides the vocabulary shared by the diff engine and the
//! composite collection tree: node handles, the item identity contract, and
//! stable content fingerprints.
//!
//! # Key Types
//!
//! - [`NodeId`] -- Handle of a node owned by a collection tree arena
//! - [`Item`] -- Identity contract for elements stored in a tree
//! - [`ContentHash`] -- Stable content fingerprint used to detect in-place changes
//! - [`ContentHasher`] -- Domain-separated BLAKE3 fingerprinting

pub mod error;
pub mod hasher;
pub mod identity;
pub mod item;

pub use error::TypeError;
pub use hasher::{hash_combine, ContentHasher};
pub use identity::NodeId;
pub use item::{ContentHash, Item};
