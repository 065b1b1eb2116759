//! Snapshot tree nodes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Kind of a filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Directory,
}

/// One filesystem entry at snapshot time.
///
/// Constructed only through [`TreeNode::file`] and [`TreeNode::directory`]; there are no
/// mutating accessors, so a built tree stays as the walk produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    name: String,
    relative_path: String,
    kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    children: Option<Vec<TreeNode>>,
}

impl TreeNode {
    pub fn file(name: String, relative_path: String, size_bytes: u64) -> Self {
        Self {
            name,
            relative_path,
            kind: NodeKind::File,
            size_bytes: Some(size_bytes),
            children: None,
        }
    }

    pub fn directory(name: String, relative_path: String, children: Vec<TreeNode>) -> Self {
        Self {
            name,
            relative_path,
            kind: NodeKind::Directory,
            size_bytes: None,
            children: Some(children),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path relative to the snapshot root, `/` separated; empty for the root.
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    pub fn size_bytes(&self) -> Option<u64> {
        self.size_bytes
    }

    /// Children of a directory; empty for files.
    pub fn children(&self) -> &[TreeNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Depth-first pre-order iterator over this node and its descendants.
    pub fn iter(&self) -> Iter<'_> {
        Iter { stack: vec![self] }
    }

    /// Number of file nodes at or below this node.
    pub fn count_files(&self) -> usize {
        self.iter().filter(|n| n.kind == NodeKind::File).count()
    }

    /// Number of directory nodes below this node, excluding itself.
    pub fn count_directories(&self) -> usize {
        self.iter()
            .skip(1)
            .filter(|n| n.kind == NodeKind::Directory)
            .count()
    }

    /// Find a descendant by relative path (`""` is this node).
    pub fn find(&self, relative_path: &str) -> Option<&TreeNode> {
        let mut current = self;
        for part in relative_path.split('/').filter(|p| !p.is_empty()) {
            current = current.children().iter().find(|c| c.name == part)?;
        }
        Some(current)
    }
}

/// Pre-order traversal over a [`TreeNode`]
pub struct Iter<'a> {
    stack: Vec<&'a TreeNode>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a TreeNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}

/// A complete tree of the watched root at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Absolute root path the tree was built from
    pub root: PathBuf,
    pub generated_at: DateTime<Utc>,
    pub tree: TreeNode,
}
