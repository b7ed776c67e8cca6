//! Lazy catalog traversal for stacwalk
//!
//! This crate turns a static catalog into a stream of lazily-resolved nodes:
//! - WalkContext / WalkNode: resolve-once references into the catalog tree
//! - WalkStream / Walk: preorder traversal with subtree skipping
//! - ChainWalk / FixedWalk: composed and pre-assembled streams
//! - FilteredWalk: an ordered filter chain with skip and prune signals

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod filter;
pub mod node;
pub mod walk;

pub use filter::{resolve_for_filter, FilterSignal, FilterStage, FilteredWalk};
pub use node::{WalkContext, WalkNode};
pub use walk::{ChainWalk, FixedWalk, Walk, WalkStream};
