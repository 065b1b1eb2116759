//! Path canonicalization utilities
//!
//! Paths and names are taken from the OS as they are stored on disk. No Unicode
//! normalization is applied here: on Linux a name is a byte string, and a normalized
//! form of it may not exist.

use crate::error::TreeError;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Canonicalize a path: resolves symlinks, `..` and `.`.
pub fn canonicalize_path(path: &Path) -> Result<PathBuf, TreeError> {
    dunce::canonicalize(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => TreeError::NotFound(path.to_path_buf()),
        _ => TreeError::InvalidPath(format!("Failed to canonicalize {}: {}", path.display(), e)),
    })
}

/// Check that `path` names an existing directory and return its canonical form.
pub fn validate_root(path: &Path) -> Result<PathBuf, TreeError> {
    let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => TreeError::NotFound(path.to_path_buf()),
        _ => TreeError::IoError(e),
    })?;
    if !metadata.is_dir() {
        return Err(TreeError::NotADirectory(path.to_path_buf()));
    }
    canonicalize_path(path)
}

/// Relative path of `path` under `root`, `/` separated, names as stored on disk.
/// The root itself maps to the empty string.
pub fn relative_path_string(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    Some(parts.join("/"))
}

/// Display name of a path: its final component, or the whole path for `/`.
pub fn entry_name(path: &Path) -> String {
    match path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => path.to_string_lossy().into_owned(),
    }
}
