#![allow(dead_code)]

use assert_fs::TempDir;
use assert_fs::prelude::{FileWriteStr, PathChild, PathCreateDir};
use bit_attr::{AttrCheckFlags, AttrOptions, Attributes, LocalRepository};
use rstest::fixture;

#[fixture]
pub fn worktree() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

/// Attribute resolution over a repository rooted at the sandbox
pub fn open_attrs(worktree: &TempDir) -> Attributes<LocalRepository> {
    Attributes::new(LocalRepository::open(worktree.path()))
}

/// Attribute resolution over a bare repository (no work tree)
pub fn bare_attrs(git_dir: &TempDir) -> Attributes<LocalRepository> {
    Attributes::new(LocalRepository::bare(git_dir.path()))
}

/// Default lookup options for sandboxed tests: never read the developer's
/// real system attribute file
pub fn options() -> AttrOptions {
    AttrOptions::new(AttrCheckFlags::NO_SYSTEM)
}

pub fn options_with(flags: AttrCheckFlags) -> AttrOptions {
    AttrOptions::new(flags | AttrCheckFlags::NO_SYSTEM)
}

/// Write a rule file at a sandbox-relative path, creating parents
pub fn write_file(worktree: &TempDir, rel: &str, contents: &str) {
    let child = worktree.child(rel);
    if let Some(parent) = child.path().parent() {
        std::fs::create_dir_all(parent).expect("Failed to create parent dirs");
    }
    child.write_str(contents).expect("Failed to write file");
}

/// Create a directory inside the sandbox
pub fn make_dir(worktree: &TempDir, rel: &str) {
    worktree
        .child(rel)
        .create_dir_all()
        .expect("Failed to create directory");
}

/// Collect `foreach` output as (name, value) pairs
pub fn collect_foreach(
    attrs: &Attributes<LocalRepository>,
    opts: &AttrOptions,
    path: &str,
) -> Vec<(String, bit_attr::AttrValue)> {
    let mut out = Vec::new();
    attrs
        .foreach(opts, path, |name, value| {
            out.push((name.to_string(), value.clone()));
            0
        })
        .expect("foreach failed");
    out
}
