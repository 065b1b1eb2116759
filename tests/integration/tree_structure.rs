//! Integration tests for tree structure correctness

use dirmirror::ignore::IgnoreSet;
use dirmirror::tree::{build, NodeKind, TreeBuilder};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Test that tree contains all files and directories
#[test]
fn test_tree_counts_match_disk() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    fs::create_dir_all(root.join("dir1/nested")).unwrap();
    fs::create_dir(root.join("dir2")).unwrap();
    fs::write(root.join("file1.txt"), "content1").unwrap();
    fs::write(root.join("dir1/file2.txt"), "content2").unwrap();
    fs::write(root.join("dir1/nested/file3.txt"), "content3").unwrap();

    let tree = TreeBuilder::new().build(root).unwrap();

    assert_eq!(tree.count_files(), 3);
    assert_eq!(tree.count_directories(), 3);
}

/// Every relative path in the tree resolves to an entry of the same kind on disk
#[test]
fn test_relative_paths_resolve_on_disk() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    fs::create_dir_all(root.join("src/bin")).unwrap();
    fs::write(root.join("src/lib.rs"), "pub mod a;").unwrap();
    fs::write(root.join("src/bin/main.rs"), "fn main() {}").unwrap();
    fs::write(root.join("README.md"), "# readme").unwrap();

    let tree = TreeBuilder::new().build(root).unwrap();

    for node in tree.iter().skip(1) {
        let on_disk = root.join(node.relative_path());
        match node.kind() {
            NodeKind::File => {
                let metadata = fs::metadata(&on_disk).unwrap();
                assert!(metadata.is_file(), "{} should be a file", node.relative_path());
                assert_eq!(node.size_bytes(), Some(metadata.len()));
            }
            NodeKind::Directory => {
                assert!(on_disk.is_dir(), "{} should be a directory", node.relative_path());
                assert_eq!(node.size_bytes(), None);
            }
        }
        assert_eq!(
            Path::new(node.relative_path()).file_name().unwrap().to_string_lossy(),
            node.name()
        );
    }
}

/// Ignored names never appear anywhere in the tree, and nothing beneath them does
#[test]
fn test_ignored_entries_are_absent() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
    fs::write(root.join("node_modules/pkg/index.js"), "x").unwrap();
    fs::create_dir_all(root.join("app/.git")).unwrap();
    fs::write(root.join("app/.git/HEAD"), "ref").unwrap();
    fs::write(root.join("app/main.js"), "y").unwrap();

    let ignore = IgnoreSet::new(["node_modules", ".git"]);
    let tree = build(root, &ignore).unwrap();

    for node in tree.iter() {
        assert!(
            !ignore.is_ignored_path(Path::new(node.relative_path())),
            "{} should have been ignored",
            node.relative_path()
        );
    }
    assert!(tree.find("app/main.js").is_some());
    assert!(tree.find("node_modules").is_none());
    assert_eq!(tree.count_files(), 1);
}

/// Building twice without changes yields the same tree
#[test]
fn test_build_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    for name in ["c.txt", "a.txt", "b.txt"] {
        fs::write(root.join(name), name).unwrap();
    }
    fs::create_dir(root.join("zeta")).unwrap();
    fs::create_dir(root.join("alpha")).unwrap();

    let builder = TreeBuilder::new();
    let first = builder.build(root).unwrap();
    let second = builder.build(root).unwrap();
    assert_eq!(first, second);

    let names: Vec<&str> = first.children().iter().map(|c| c.name()).collect();
    assert_eq!(names, vec!["a.txt", "alpha", "b.txt", "c.txt", "zeta"]);
}

/// The documented example: a file, a subdirectory with a file, and an ignored `.git`
#[test]
fn test_proj_layout_serializes_as_expected() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("proj");
    fs::create_dir_all(root.join("src")).unwrap();
    fs::create_dir_all(root.join(".git")).unwrap();
    fs::write(root.join("a.txt"), "0123456789").unwrap();
    fs::write(root.join("src/b.rs"), "fn b() {}").unwrap();
    fs::write(root.join(".git/config"), "[core]").unwrap();

    let tree = build(&root, &IgnoreSet::new([".git"])).unwrap();
    let value = serde_json::to_value(&tree).unwrap();

    assert_eq!(
        value,
        serde_json::json!({
            "name": "proj",
            "relativePath": "",
            "kind": "directory",
            "children": [
                { "name": "a.txt", "relativePath": "a.txt", "kind": "file", "sizeBytes": 10 },
                {
                    "name": "src",
                    "relativePath": "src",
                    "kind": "directory",
                    "children": [
                        { "name": "b.rs", "relativePath": "src/b.rs", "kind": "file", "sizeBytes": 9 }
                    ]
                }
            ]
        })
    );
}

/// Snapshots carry the canonical root
#[test]
fn test_snapshot_root_is_canonical() {
    let temp_dir = TempDir::new().unwrap();
    let nested = temp_dir.path().join("x");
    fs::create_dir(&nested).unwrap();

    let snapshot = TreeBuilder::new().snapshot(&nested.join("..").join("x")).unwrap();
    assert_eq!(snapshot.root, dunce::canonicalize(&nested).unwrap());
    assert_eq!(snapshot.tree.name(), "x");
}

/// Names are reported exactly as stored, so decomposed Unicode names still resolve
#[test]
fn test_decomposed_unicode_names_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("proje\u{0301}t");
    fs::create_dir_all(root.join("cafe\u{0301}")).unwrap();
    fs::write(root.join("cafe\u{0301}/menu.txt"), "x").unwrap();
    fs::write(root.join("nai\u{0308}ve.md"), "y").unwrap();

    let snapshot = TreeBuilder::new().snapshot(&root).unwrap();

    assert_eq!(snapshot.tree.count_files(), 2);
    for node in snapshot.tree.iter().skip(1) {
        assert!(
            snapshot.root.join(node.relative_path()).exists(),
            "{:?} does not resolve",
            node.relative_path()
        );
    }
}
