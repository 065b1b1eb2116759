//! Tree builder for constructing snapshot trees

use crate::error::TreeError;
use crate::ignore::IgnoreSet;
use crate::tree::node::{Snapshot, TreeNode};
use crate::tree::path;
use crate::tree::walker::{Visit, Walker, WalkerConfig};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, instrument};

/// Directory whose children are still being collected
struct PendingDir {
    path: PathBuf,
    name: String,
    relative_path: String,
    children: Vec<TreeNode>,
}

impl PendingDir {
    fn finish(self) -> TreeNode {
        TreeNode::directory(self.name, self.relative_path, self.children)
    }
}

/// Tree builder for constructing snapshot trees.
///
/// Holds only configuration; every [`build`](TreeBuilder::build) call owns its own walk state,
/// so one builder can serve concurrent builds.
#[derive(Debug, Clone, Default)]
pub struct TreeBuilder {
    walker_config: WalkerConfig,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set walker config (ignore set, depth limit, symlink policy).
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    pub fn with_ignore(mut self, ignore: IgnoreSet) -> Self {
        self.walker_config.ignore = ignore;
        self
    }

    pub fn ignore(&self) -> &IgnoreSet {
        &self.walker_config.ignore
    }

    /// Build the tree rooted at `root`.
    ///
    /// Fails only when `root` is missing, not a directory, or unreadable. Entries that
    /// fail mid-walk are left out of the result.
    pub fn build(&self, root: &Path) -> Result<TreeNode, TreeError> {
        let root = path::validate_root(root)?;
        self.build_canonical(&root)
    }

    /// Build a timestamped snapshot of `root`.
    pub fn snapshot(&self, root: &Path) -> Result<Snapshot, TreeError> {
        let canonical = path::validate_root(root)?;
        let tree = self.build_canonical(&canonical)?;
        Ok(Snapshot {
            root: canonical,
            generated_at: Utc::now(),
            tree,
        })
    }

    /// `root` must already be validated and canonical.
    #[instrument(skip(self), fields(root = %root.display()))]
    fn build_canonical(&self, root: &Path) -> Result<TreeNode, TreeError> {
        let start = Instant::now();
        let visits = Walker::with_config(root.to_path_buf(), self.walker_config.clone()).walk()?;
        let tree = assemble(root, visits)?;

        debug!(
            files = tree.count_files(),
            directories = tree.count_directories(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Tree built"
        );
        Ok(tree)
    }
}

/// Convenience wrapper: build `root` with the given ignore set.
pub fn build(root: &Path, ignore: &IgnoreSet) -> Result<TreeNode, TreeError> {
    TreeBuilder::new().with_ignore(ignore.clone()).build(root)
}

/// Fold a pre-order visit stream into a nested tree.
///
/// `stack[d]` is the open directory at depth `d`; an entry at depth `d` closes every
/// directory deeper than `d - 1` before it is attached.
fn assemble(root: &Path, visits: Vec<Visit>) -> Result<TreeNode, TreeError> {
    let mut stack: Vec<PendingDir> = Vec::new();

    for visit in visits {
        match visit {
            Visit::Directory { depth: 0, path } => {
                stack.push(PendingDir {
                    name: path::entry_name(&path),
                    relative_path: String::new(),
                    path,
                    children: Vec::new(),
                });
            }
            Visit::Directory { depth, path } => {
                collapse(&mut stack, depth);
                let Some(relative_path) = path::relative_path_string(root, &path) else {
                    continue;
                };
                stack.push(PendingDir {
                    name: path::entry_name(&path),
                    relative_path,
                    path,
                    children: Vec::new(),
                });
            }
            Visit::File { depth, path, size } => {
                collapse(&mut stack, depth);
                if let (Some(parent), Some(relative_path)) =
                    (stack.last_mut(), path::relative_path_string(root, &path))
                {
                    parent
                        .children
                        .push(TreeNode::file(path::entry_name(&path), relative_path, size));
                }
            }
            Visit::Revisit { depth, path } => {
                collapse(&mut stack, depth);
                if let (Some(parent), Some(relative_path)) =
                    (stack.last_mut(), path::relative_path_string(root, &path))
                {
                    parent.children.push(TreeNode::directory(
                        path::entry_name(&path),
                        relative_path,
                        Vec::new(),
                    ));
                }
            }
            Visit::Failed { path, message, .. } => {
                // A directory that failed to open is dropped along with its partial contents.
                let opened_and_failed = stack.len() > 1
                    && path.as_deref() == stack.last().map(|open| open.path.as_path());
                if opened_and_failed {
                    if let Some(dropped) = stack.pop() {
                        debug!(path = %dropped.path.display(), error = %message, "Omitting unreadable directory");
                    }
                }
            }
        }
    }

    collapse(&mut stack, 1);
    stack
        .pop()
        .map(PendingDir::finish)
        .ok_or_else(|| TreeError::InvalidPath(format!("Walk of {} yielded no root", root.display())))
}

/// Close open directories until `stack.len() == depth`, attaching each to its parent.
fn collapse(stack: &mut Vec<PendingDir>, depth: usize) {
    while stack.len() > depth.max(1) {
        if let Some(done) = stack.pop() {
            if let Some(parent) = stack.last_mut() {
                parent.children.push(done.finish());
            }
        }
    }
}
