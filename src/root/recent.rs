//! Recently selected roots

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// Default number of remembered roots
pub const DEFAULT_CAPACITY: usize = 10;

/// Bounded most-recent-first list of roots, deduplicated by path equality
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentRoots {
    capacity: usize,
    entries: VecDeque<PathBuf>,
}

impl Default for RecentRoots {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl RecentRoots {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Move `path` to the front, appending it if new; evict the oldest beyond capacity.
    pub fn promote(&mut self, path: &Path) {
        self.entries.retain(|existing| existing != path);
        self.entries.push_front(path.to_path_buf());
        self.entries.truncate(self.capacity);
    }

    pub fn to_vec(&self) -> Vec<PathBuf> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
