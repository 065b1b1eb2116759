//! Filesystem snapshot tree
//!
//! Represents the watched root as an immutable nested tree of files and directories,
//! rebuilt from scratch for every snapshot.

pub mod builder;
pub mod node;
pub mod path;
pub mod walker;

pub use builder::{build, TreeBuilder};
pub use node::{NodeKind, Snapshot, TreeNode};
