//! Repository collaborator seam
//!
//! Attribute resolution consumes a repository; it never implements one. The
//! `Repository` trait is the contract the engine needs: where the work tree
//! is, where `$GIT_DIR/info` lives, which blob backs a repo-relative path in
//! the index or in a commit tree, and how to read a blob.
//!
//! `LocalRepository` is a minimal adapter over a local directory with an
//! in-memory index and object store. It backs the integration tests and
//! lets embedders resolve attributes without a full repository
//! implementation.
//!
//! ## Thread Safety
//!
//! `LocalRepository` keeps its mutable state behind a `RwLock` so a shared
//! handle can serve concurrent lookups while tests stage new blobs.

use crate::artifacts::objects::object_id::ObjectId;
use crate::error::AttrError;
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// Git directory name
const GIT_DIR: &str = ".git";

/// Info directory name under the git directory
const INFO_DIR: &str = "info";

/// What the attribute engine needs from the enclosing repository
pub trait Repository {
    /// Work-tree root, `None` for bare repositories
    fn workdir(&self) -> Option<&Path>;

    fn is_bare(&self) -> bool {
        self.workdir().is_none()
    }

    /// The `$GIT_DIR/info` directory, when the repository has one
    fn info_dir(&self) -> Option<PathBuf>;

    /// The configured extra attribute file (`core.attributesfile`), or
    /// `None` when the configuration key is absent
    fn attributes_file(&self) -> Option<PathBuf>;

    /// Whether path matching should fold ASCII case
    fn ignore_case(&self) -> bool {
        false
    }

    /// The commit `HEAD` points at, when one exists
    fn head_commit(&self) -> Result<Option<ObjectId>, AttrError>;

    /// Object id of the blob staged at a repo-relative path, if any
    fn index_blob_oid(&self, path: &Path) -> Result<Option<ObjectId>, AttrError>;

    /// Object id of the blob at a repo-relative path in a commit's tree
    fn commit_blob_oid(
        &self,
        commit: &ObjectId,
        path: &Path,
    ) -> Result<Option<ObjectId>, AttrError>;

    /// Read a blob's contents
    fn read_blob(&self, oid: &ObjectId) -> Result<Bytes, AttrError>;
}

#[derive(Debug, Default)]
struct RepoState {
    index: BTreeMap<PathBuf, ObjectId>,
    commits: HashMap<ObjectId, BTreeMap<PathBuf, ObjectId>>,
    blobs: HashMap<ObjectId, Bytes>,
    head: Option<ObjectId>,
    attributes_file: Option<PathBuf>,
    ignore_case: bool,
}

/// Minimal repository adapter over a local directory
///
/// The work tree and `$GIT_DIR` live on disk; the index and object store
/// are in-memory overlays populated through `stage_blob` and
/// `create_commit`.
#[derive(Debug)]
pub struct LocalRepository {
    workdir: Option<Box<Path>>,
    git_dir: Box<Path>,
    state: RwLock<RepoState>,
}

impl LocalRepository {
    /// Open a repository with a work tree rooted at `workdir`
    pub fn open(workdir: impl Into<PathBuf>) -> Self {
        let workdir: PathBuf = workdir.into();
        let git_dir = workdir.join(GIT_DIR);

        LocalRepository {
            workdir: Some(workdir.into_boxed_path()),
            git_dir: git_dir.into_boxed_path(),
            state: RwLock::new(RepoState::default()),
        }
    }

    /// Open a bare repository: no work tree, only blob-backed sources
    pub fn bare(git_dir: impl Into<PathBuf>) -> Self {
        LocalRepository {
            workdir: None,
            git_dir: git_dir.into().into_boxed_path(),
            state: RwLock::new(RepoState::default()),
        }
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// Stage a blob at a repo-relative path, returning its object id
    pub fn stage_blob(&self, path: impl Into<PathBuf>, contents: &[u8]) -> ObjectId {
        let oid = ObjectId::hash_of(contents);
        let mut state = self.write_state();
        state.blobs.insert(oid.clone(), Bytes::copy_from_slice(contents));
        state.index.insert(path.into(), oid.clone());
        oid
    }

    /// Remove a staged entry
    pub fn unstage(&self, path: &Path) {
        self.write_state().index.remove(path);
    }

    /// Record a commit snapshot from repo-relative paths to blob contents,
    /// returning the commit id
    pub fn create_commit(&self, files: &[(&str, &[u8])]) -> ObjectId {
        let mut state = self.write_state();
        let mut tree = BTreeMap::new();
        let mut digest = Vec::new();

        for (path, contents) in files {
            let oid = ObjectId::hash_of(contents);
            digest.extend_from_slice(path.as_bytes());
            digest.extend_from_slice(oid.as_ref().as_bytes());
            state.blobs.insert(oid.clone(), Bytes::copy_from_slice(contents));
            tree.insert(PathBuf::from(path), oid);
        }

        let commit = ObjectId::hash_of(&digest);
        state.commits.insert(commit.clone(), tree);
        commit
    }

    pub fn set_head(&self, commit: Option<ObjectId>) {
        self.write_state().head = commit;
    }

    /// Point `core.attributesfile` at an extra rule file
    pub fn set_attributes_file(&self, path: Option<PathBuf>) {
        self.write_state().attributes_file = path;
    }

    pub fn set_ignore_case(&self, ignore_case: bool) {
        self.write_state().ignore_case = ignore_case;
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, RepoState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, RepoState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Repository for LocalRepository {
    fn workdir(&self) -> Option<&Path> {
        self.workdir.as_deref()
    }

    fn info_dir(&self) -> Option<PathBuf> {
        Some(self.git_dir.join(INFO_DIR))
    }

    fn attributes_file(&self) -> Option<PathBuf> {
        self.read_state().attributes_file.clone()
    }

    fn ignore_case(&self) -> bool {
        self.read_state().ignore_case
    }

    fn head_commit(&self) -> Result<Option<ObjectId>, AttrError> {
        Ok(self.read_state().head.clone())
    }

    fn index_blob_oid(&self, path: &Path) -> Result<Option<ObjectId>, AttrError> {
        Ok(self.read_state().index.get(path).cloned())
    }

    fn commit_blob_oid(
        &self,
        commit: &ObjectId,
        path: &Path,
    ) -> Result<Option<ObjectId>, AttrError> {
        Ok(self
            .read_state()
            .commits
            .get(commit)
            .and_then(|tree| tree.get(path))
            .cloned())
    }

    fn read_blob(&self, oid: &ObjectId) -> Result<Bytes, AttrError> {
        self.read_state()
            .blobs
            .get(oid)
            .cloned()
            .ok_or_else(|| AttrError::NotFound(format!("blob {oid}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn staged_blobs_are_indexed_and_readable() {
        let repo = LocalRepository::bare("/tmp/repo.git");

        let oid = repo.stage_blob(".gitattributes", b"*.c text\n");

        let found = repo
            .index_blob_oid(Path::new(".gitattributes"))
            .unwrap()
            .unwrap();
        assert_eq!(found, oid);
        assert_eq!(repo.read_blob(&oid).unwrap().as_ref(), b"*.c text\n");
    }

    #[test]
    fn commits_snapshot_their_tree() {
        let repo = LocalRepository::bare("/tmp/repo.git");

        let commit = repo.create_commit(&[(".gitattributes", b"*.c text\n")]);
        repo.set_head(Some(commit.clone()));

        assert_eq!(repo.head_commit().unwrap(), Some(commit.clone()));
        let oid = repo
            .commit_blob_oid(&commit, Path::new(".gitattributes"))
            .unwrap()
            .unwrap();
        assert_eq!(repo.read_blob(&oid).unwrap().as_ref(), b"*.c text\n");
    }

    #[test]
    fn bare_repositories_have_no_workdir() {
        let repo = LocalRepository::bare("/tmp/repo.git");

        assert!(repo.is_bare());
        assert_eq!(repo.workdir(), None);
    }

    #[test]
    fn unstage_removes_the_index_entry() {
        let repo = LocalRepository::bare("/tmp/repo.git");
        repo.stage_blob("a.txt", b"a");

        repo.unstage(Path::new("a.txt"));

        assert_eq!(repo.index_blob_oid(Path::new("a.txt")).unwrap(), None);
    }
}
