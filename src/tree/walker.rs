//! Filesystem walker for traversing directory structures

use crate::error::TreeError;
use crate::ignore::IgnoreSet;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// One step of a walk, in depth-first pre-order.
///
/// `depth` is relative to the walk root (root = 0).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visit {
    /// A directory whose contents follow
    Directory { depth: usize, path: PathBuf },
    /// A regular file (or a symlink to one)
    File { depth: usize, path: PathBuf, size: u64 },
    /// A directory that resolves to an already-visited canonical path; not descended
    Revisit { depth: usize, path: PathBuf },
    /// An entry that could not be read; `path` is the failing entry when known
    Failed {
        depth: usize,
        path: Option<PathBuf>,
        message: String,
    },
}

/// Filesystem walker configuration
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Follow symbolic links (default: true; cycles are guarded)
    pub follow_symlinks: bool,
    /// Entry names excluded before descent
    pub ignore: IgnoreSet,
    /// Maximum depth to traverse (None = unlimited)
    pub max_depth: Option<usize>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: true,
            ignore: IgnoreSet::default(),
            max_depth: None,
        }
    }
}

/// Filesystem walker
pub struct Walker {
    root: PathBuf,
    config: WalkerConfig,
}

impl Walker {
    /// Create a walker with the default configuration
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            config: WalkerConfig::default(),
        }
    }

    /// Create a walker with custom configuration
    pub fn with_config(root: PathBuf, config: WalkerConfig) -> Self {
        Self { root, config }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the tree and collect visits.
    ///
    /// Siblings are yielded sorted by file name. The visited set lives for this call only.
    /// Only a failure to read the root itself is returned as an error.
    pub fn walk(&self) -> Result<Vec<Visit>, TreeError> {
        let ignore = self.config.ignore.clone();
        let mut walker = WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .max_depth(self.config.max_depth.unwrap_or(usize::MAX))
            .sort_by_file_name()
            .into_iter()
            // Ignored names are pruned here, so their subtrees are never opened.
            .filter_entry(move |entry| {
                entry.depth() == 0 || !ignore.is_ignored_name(&entry.file_name().to_string_lossy())
            });

        let mut visited: HashSet<PathBuf> = HashSet::new();
        let mut visits = Vec::new();

        while let Some(next) = walker.next() {
            let entry = match next {
                Ok(entry) => entry,
                Err(err) => {
                    let depth = err.depth();
                    let path = err.path().map(Path::to_path_buf);
                    if depth == 0 && path.as_deref() == Some(self.root.as_path()) {
                        let io = std::io::Error::from(err);
                        return Err(TreeError::IoError(io));
                    }
                    if err.loop_ancestor().is_some() {
                        if let Some(path) = path {
                            debug!(path = %path.display(), "Symlink loop, not descending");
                            visits.push(Visit::Revisit { depth, path });
                        }
                        continue;
                    }
                    debug!(error = %err, "Skipping unreadable entry");
                    visits.push(Visit::Failed {
                        depth,
                        path,
                        message: err.to_string(),
                    });
                    continue;
                }
            };

            let depth = entry.depth();
            let path = entry.path().to_path_buf();
            let file_type = entry.file_type();

            if file_type.is_dir() {
                let canonical = dunce::canonicalize(&path).unwrap_or_else(|_| path.clone());
                if !visited.insert(canonical) {
                    trace!(path = %path.display(), "Already visited, not descending");
                    walker.skip_current_dir();
                    visits.push(Visit::Revisit { depth, path });
                    continue;
                }
                visits.push(Visit::Directory { depth, path });
            } else if file_type.is_file() {
                match entry.metadata() {
                    Ok(metadata) => visits.push(Visit::File {
                        depth,
                        path,
                        size: metadata.len(),
                    }),
                    Err(err) => visits.push(Visit::Failed {
                        depth,
                        path: Some(path),
                        message: err.to_string(),
                    }),
                }
            }
            // Unfollowed symlinks, sockets and fifos are neither files nor directories.
        }

        Ok(visits)
    }
}
