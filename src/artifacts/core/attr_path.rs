//! Query path normalization
//!
//! Attribute lookups receive a path that may be absolute (inside the work
//! tree) or already relative to the work-tree root. Matching always happens
//! on the normalized relative form with `/` separators, together with a
//! directory flag resolved at query time.

use std::path::Path;

/// A query path prepared for rule matching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrPath {
    rel: String,
    basename_off: usize,
    is_dir: bool,
}

impl AttrPath {
    /// Normalize a query path against the work-tree root
    ///
    /// Absolute paths are made relative to `workdir` when they fall inside
    /// it. A trailing `/` marks the path as a directory; otherwise the
    /// directory flag comes from a stat of the working-tree entry, and is
    /// false when there is no work tree or no such entry.
    pub fn from_query(workdir: Option<&Path>, path: &str) -> Self {
        let mut rel = path.replace('\\', "/");

        if let Some(root) = workdir {
            let root = root.to_string_lossy().replace('\\', "/");
            let root = root.trim_end_matches('/');
            if !root.is_empty() && rel.starts_with(root) {
                let remainder = &rel[root.len()..];
                if remainder.is_empty() || remainder.starts_with('/') {
                    rel = remainder.trim_start_matches('/').to_string();
                }
            }
        }

        while let Some(stripped) = rel.strip_prefix("./") {
            rel = stripped.to_string();
        }
        let rel = rel.trim_start_matches('/').to_string();

        let marked_dir = rel.ends_with('/');
        let rel = rel.trim_end_matches('/').to_string();

        let is_dir = marked_dir
            || workdir
                .map(|root| root.join(&rel).is_dir() && !rel.is_empty())
                .unwrap_or(false);

        Self::new(rel, is_dir)
    }

    /// Build from an already-relative path and a known directory flag
    pub fn new(rel: String, is_dir: bool) -> Self {
        let basename_off = rel.rfind('/').map(|i| i + 1).unwrap_or(0);

        AttrPath {
            rel,
            basename_off,
            is_dir,
        }
    }

    /// The full path relative to the work-tree root
    pub fn full(&self) -> &str {
        &self.rel
    }

    /// The last path component
    pub fn basename(&self) -> &str {
        &self.rel[self.basename_off..]
    }

    /// The directory containing the path, `""` for root-level entries
    pub fn containing_dir(&self) -> &str {
        if self.basename_off == 0 {
            ""
        } else {
            &self.rel[..self.basename_off - 1]
        }
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    pub fn is_empty(&self) -> bool {
        self.rel.is_empty()
    }
}

/// Iterator over the ancestors of a work-tree-relative directory
///
/// Yields each directory from `start` up to and including the root (`""`),
/// deepest first: `"a/b/c"`, `"a/b"`, `"a"`, `""`.
pub fn walk_up(start: &str) -> AncestorDirs<'_> {
    AncestorDirs {
        current: Some(start.trim_matches('/')),
    }
}

#[derive(Debug)]
pub struct AncestorDirs<'a> {
    current: Option<&'a str>,
}

impl<'a> Iterator for AncestorDirs<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let dir = self.current?;

        self.current = if dir.is_empty() {
            None
        } else {
            Some(dir.rfind('/').map(|i| &dir[..i]).unwrap_or(""))
        };

        Some(dir)
    }
}
