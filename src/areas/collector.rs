//! Ordered rule-file collection
//!
//! For one query path, produce the vector of attribute files to consult,
//! highest precedence first:
//!
//! 1. `$GIT_DIR/info/attributes`
//! 2. per-directory `.gitattributes` from the query path's directory up to
//!    the work-tree root, each directory reading its backends in the order
//!    the flags select
//! 3. the configured extra file (`core.attributesfile`)
//! 4. the system file, unless `NO_SYSTEM`
//!
//! Missing files contribute nothing and never abort the walk.

use crate::areas::attributes::{AttrCheckFlags, AttrOptions, SourceOrder};
use crate::areas::cache::AttrCache;
use crate::areas::repository::Repository;
use crate::areas::session::{AttrSession, MemoKey};
use crate::areas::sysdir;
use crate::artifacts::core::attr_path::{AttrPath, walk_up};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::rules::attr_file::AttrFile;
use crate::artifacts::source::{ATTR_FILE, ATTR_FILE_INREPO, Source};
use crate::error::AttrError;
use std::path::PathBuf;
use std::sync::Arc;

/// Collect the ordered file vector for a query path
pub(crate) fn collect_attr_files<R: Repository>(
    repo: &R,
    cache: &AttrCache,
    mut session: Option<&mut AttrSession>,
    opts: &AttrOptions,
    path: &AttrPath,
) -> Result<Vec<Arc<AttrFile>>, AttrError> {
    setup(repo, cache, session.as_deref_mut(), opts)?;

    let commit = consulted_commit(repo, opts)?;
    let memo_key: MemoKey = (
        path.containing_dir().to_string(),
        opts.flags.bits(),
        commit.clone(),
    );
    if let Some(session) = session.as_deref()
        && let Some(files) = session.memo_get(&memo_key)
    {
        return Ok(files);
    }

    let mut files = Vec::new();

    if let Some(info_dir) = repo.info_dir() {
        push_source(
            repo,
            cache,
            &mut files,
            opts,
            Source::working_file_in(&info_dir, ATTR_FILE_INREPO),
            "",
            true,
        )?;
    }

    let has_workdir = repo.workdir().is_some();
    let order = opts.flags.source_order();
    for dir in walk_up(path.containing_dir()) {
        for backend in order.backends(has_workdir) {
            // only the work-tree root file is trusted for macros; index
            // and commit blobs never are
            let (source, allow_macros) = match backend {
                Backend::File => {
                    let base = workdir_subdir(repo, dir);
                    (
                        Source::working_file_in(&base, ATTR_FILE),
                        dir.is_empty(),
                    )
                }
                Backend::Index => (Source::index_blob(dir_attr_path(dir)), false),
            };
            push_source(repo, cache, &mut files, opts, source, dir, allow_macros)?;
        }

        if let Some(commit) = &commit {
            let source = Source::commit_blob(commit.clone(), dir_attr_path(dir));
            push_source(repo, cache, &mut files, opts, source, dir, false)?;
        }
    }

    if let Some(extra) = repo.attributes_file() {
        push_source(
            repo,
            cache,
            &mut files,
            opts,
            Source::working_file(extra),
            "",
            true,
        )?;
    }

    if !opts.flags.contains(AttrCheckFlags::NO_SYSTEM)
        && let Some(system) = system_file(session.as_deref_mut())
    {
        push_source(
            repo,
            cache,
            &mut files,
            opts,
            Source::working_file(system.as_path()),
            "",
            true,
        )?;
    }

    if let Some(session) = session.as_deref_mut() {
        session.memo_put(memo_key, files.clone());
    }

    Ok(files)
}

/// Preload the trusted, macro-bearing files and the root rule blobs once
/// per session, so macro definitions exist before any dependent file
/// parses
fn setup<R: Repository>(
    repo: &R,
    cache: &AttrCache,
    mut session: Option<&mut AttrSession>,
    opts: &AttrOptions,
) -> Result<(), AttrError> {
    if session.as_deref().is_some_and(AttrSession::setup_done) {
        return Ok(());
    }

    if !opts.flags.contains(AttrCheckFlags::NO_SYSTEM)
        && let Some(system) = system_file(session.as_deref_mut())
    {
        cache.get(
            repo,
            &Source::working_file(system.as_path()),
            "",
            true,
        )?;
    }

    if let Some(extra) = repo.attributes_file() {
        cache.get(repo, &Source::working_file(extra), "", true)?;
    }

    if let Some(info_dir) = repo.info_dir() {
        cache.get(
            repo,
            &Source::working_file_in(&info_dir, ATTR_FILE_INREPO),
            "",
            true,
        )?;
    }

    if let Some(workdir) = repo.workdir() {
        cache.get(repo, &Source::working_file_in(workdir, ATTR_FILE), "", true)?;
    }

    cache.get(repo, &Source::index_blob(ATTR_FILE), "", false)?;

    if let Some(commit) = consulted_commit(repo, opts)? {
        cache.get(repo, &Source::commit_blob(commit, ATTR_FILE), "", false)?;
    }

    if let Some(session) = session {
        session.mark_setup_done();
    }

    Ok(())
}

/// The commit whose tree the flags ask to consult, if any
fn consulted_commit<R: Repository>(
    repo: &R,
    opts: &AttrOptions,
) -> Result<Option<ObjectId>, AttrError> {
    if opts.flags.contains(AttrCheckFlags::INCLUDE_COMMIT) {
        let commit = opts.commit_id.clone().ok_or_else(|| {
            AttrError::InvalidArgument("INCLUDE_COMMIT requires a commit id".to_string())
        })?;
        return Ok(Some(commit));
    }
    if opts.flags.contains(AttrCheckFlags::INCLUDE_HEAD) {
        return repo.head_commit();
    }
    Ok(None)
}

fn push_source<R: Repository>(
    repo: &R,
    cache: &AttrCache,
    files: &mut Vec<Arc<AttrFile>>,
    opts: &AttrOptions,
    source: Source,
    container: &str,
    allow_macros: bool,
) -> Result<(), AttrError> {
    opts.check_cancelled()?;
    if let Some(file) = cache.get(repo, &source, container, allow_macros)? {
        files.push(file);
    }
    Ok(())
}

fn system_file(session: Option<&mut AttrSession>) -> Option<Arc<PathBuf>> {
    match session {
        Some(session) => session.system_file(),
        None => sysdir::system_attributes_file(),
    }
}

fn workdir_subdir<R: Repository>(repo: &R, dir: &str) -> PathBuf {
    let root = repo.workdir().unwrap_or_else(|| std::path::Path::new(""));
    if dir.is_empty() {
        root.to_path_buf()
    } else {
        root.join(dir)
    }
}

/// Repo-relative path of the attribute file in `dir`
fn dir_attr_path(dir: &str) -> PathBuf {
    if dir.is_empty() {
        PathBuf::from(ATTR_FILE)
    } else {
        PathBuf::from(dir).join(ATTR_FILE)
    }
}

/// Storage backend for one per-directory step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Backend {
    File,
    Index,
}

impl SourceOrder {
    /// The backends to read for one directory, in precedence order
    pub(crate) fn backends(self, has_workdir: bool) -> impl Iterator<Item = Backend> {
        let pair: &[Backend] = match self {
            SourceOrder::FileThenIndex => &[Backend::File, Backend::Index],
            SourceOrder::IndexThenFile => &[Backend::Index, Backend::File],
            SourceOrder::IndexOnly => &[Backend::Index],
        };
        pair.iter()
            .copied()
            .filter(move |backend| has_workdir || *backend != Backend::File)
            .collect::<Vec<_>>()
            .into_iter()
    }
}
