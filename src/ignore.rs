//! Ignore set for tree builds and watch filtering.
//!
//! The ignore set is a static list of entry names. A pattern matches a single path
//! component, never a whole path: `node_modules` excludes every directory of that name at
//! any depth, together with everything beneath it. Patterns may carry one leading or
//! trailing `*` (`*.swp`, `.#*`). Names are compared in NFC, so a pattern matches an
//! entry whether its name is stored composed or decomposed.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::{Component, Path};
use unicode_normalization::UnicodeNormalization;

/// Built-in ignore names: version-control metadata and dependency caches.
pub const BUILTIN_DEFAULTS: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    "node_modules",
    "target",
    ".cargo",
    "__pycache__",
    ".venv",
];

/// Compiled ignore configuration, shared by value between the builder and the watcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct IgnoreSet {
    names: Vec<String>,
}

impl From<Vec<String>> for IgnoreSet {
    fn from(names: Vec<String>) -> Self {
        Self::new(names)
    }
}

impl From<IgnoreSet> for Vec<String> {
    fn from(set: IgnoreSet) -> Self {
        set.names
    }
}

impl Default for IgnoreSet {
    fn default() -> Self {
        Self::new(BUILTIN_DEFAULTS.iter().map(|s| (*s).to_string()))
    }
}

impl IgnoreSet {
    /// Build an ignore set from names. Empty and comment (`#`) lines are dropped.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for name in names {
            let name: String = name.into();
            let name = nfc(name.trim().trim_end_matches('/')).into_owned();
            if name.is_empty() || name.starts_with('#') || out.contains(&name) {
                continue;
            }
            out.push(name);
        }
        Self { names: out }
    }

    /// Ignore set with no entries.
    pub fn empty() -> Self {
        Self { names: Vec::new() }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Whether a single entry name is ignored.
    pub fn is_ignored_name(&self, name: &str) -> bool {
        let name = nfc(name);
        self.names.iter().any(|pattern| matches_pattern(&name, pattern))
    }

    /// Whether any normal component of `relative` is ignored.
    pub fn is_ignored_path(&self, relative: &Path) -> bool {
        relative.components().any(|component| match component {
            Component::Normal(name) => self.is_ignored_name(&name.to_string_lossy()),
            _ => false,
        })
    }

    /// Whether `path` falls under an ignored subtree of `root`.
    /// Paths outside `root` are reported as ignored.
    pub fn is_ignored_under(&self, root: &Path, path: &Path) -> bool {
        match path.strip_prefix(root) {
            Ok(relative) => self.is_ignored_path(relative),
            Err(_) => true,
        }
    }
}

fn nfc(name: &str) -> Cow<'_, str> {
    if name.is_ascii() {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(name.nfc().collect())
    }
}

fn matches_pattern(name: &str, pattern: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if let Some(suffix) = pattern.strip_prefix('*') {
        return name.ends_with(suffix);
    }
    if let Some(prefix) = pattern.strip_suffix('*') {
        return name.starts_with(prefix);
    }
    name == pattern
}
