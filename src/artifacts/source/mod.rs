//! Attribute source handles and content signatures
//!
//! A `Source` says where an attribute file comes from: a file on disk, a
//! blob in the index, a blob in a commit tree, or an in-memory buffer. The
//! cache keys entries by the source fingerprint (`SourceKey`) and detects
//! staleness by comparing content signatures, which are cheap to recompute:
//! a stat tuple for filesystem files, the blob object id for index and
//! commit sources, and a content hash for buffers.

use crate::artifacts::objects::object_id::ObjectId;
use crate::error::AttrError;
use bytes::Bytes;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the per-directory attribute file
pub const ATTR_FILE: &str = ".gitattributes";

/// Name of the repository-local attribute file under `$GIT_DIR/info`
pub const ATTR_FILE_INREPO: &str = "attributes";

/// Where an attribute file comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A file on disk at `base / filename` (or `filename` alone)
    WorkingFile {
        base: Option<PathBuf>,
        filename: PathBuf,
    },
    /// A blob in the current index at a repo-relative path
    IndexBlob { path: PathBuf },
    /// A blob at a repo-relative path inside a commit's tree
    CommitBlob { commit: ObjectId, path: PathBuf },
    /// An in-memory buffer, for tests and ad-hoc rule sets
    Memory { label: String, contents: Bytes },
}

impl Source {
    /// A filesystem source addressed by a full path
    pub fn working_file(filename: impl Into<PathBuf>) -> Source {
        Source::WorkingFile {
            base: None,
            filename: filename.into(),
        }
    }

    /// A filesystem source at `base / filename`
    pub fn working_file_in(base: &Path, filename: impl Into<PathBuf>) -> Source {
        Source::WorkingFile {
            base: Some(base.to_path_buf()),
            filename: filename.into(),
        }
    }

    pub fn index_blob(path: impl Into<PathBuf>) -> Source {
        Source::IndexBlob { path: path.into() }
    }

    pub fn commit_blob(commit: ObjectId, path: impl Into<PathBuf>) -> Source {
        Source::CommitBlob {
            commit,
            path: path.into(),
        }
    }

    pub fn memory(label: impl Into<String>, contents: impl Into<Bytes>) -> Source {
        Source::Memory {
            label: label.into(),
            contents: contents.into(),
        }
    }

    /// The cache fingerprint for this source
    pub fn key(&self) -> SourceKey {
        match self {
            Source::WorkingFile { base, filename } => SourceKey {
                tag: SourceTag::WorkingFile,
                base: base.clone(),
                filename: filename.clone(),
                commit: None,
            },
            Source::IndexBlob { path } => SourceKey {
                tag: SourceTag::IndexBlob,
                base: None,
                filename: path.clone(),
                commit: None,
            },
            Source::CommitBlob { commit, path } => SourceKey {
                tag: SourceTag::CommitBlob,
                base: None,
                filename: path.clone(),
                commit: Some(commit.clone()),
            },
            Source::Memory { label, .. } => SourceKey {
                tag: SourceTag::Memory,
                base: None,
                filename: PathBuf::from(label),
                commit: None,
            },
        }
    }

    /// Resolved on-disk location for filesystem sources
    pub fn file_path(&self) -> Option<PathBuf> {
        match self {
            Source::WorkingFile { base, filename } => Some(match base {
                Some(base) => base.join(filename),
                None => filename.clone(),
            }),
            _ => None,
        }
    }
}

/// Which backend a source reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceTag {
    WorkingFile,
    IndexBlob,
    CommitBlob,
    Memory,
}

/// The fingerprint that keys an attribute file in the cache:
/// `(tag, base_dir, filename, commit-or-none)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceKey {
    tag: SourceTag,
    base: Option<PathBuf>,
    filename: PathBuf,
    commit: Option<ObjectId>,
}

impl SourceKey {
    pub fn memory(label: impl Into<String>) -> SourceKey {
        SourceKey {
            tag: SourceTag::Memory,
            base: None,
            filename: PathBuf::from(label.into()),
            commit: None,
        }
    }

    pub fn tag(&self) -> SourceTag {
        self.tag
    }

    pub fn describe(&self) -> String {
        match self.tag {
            SourceTag::WorkingFile => match &self.base {
                Some(base) => base.join(&self.filename).display().to_string(),
                None => self.filename.display().to_string(),
            },
            SourceTag::IndexBlob => format!("index:{}", self.filename.display()),
            SourceTag::CommitBlob => format!(
                "commit:{}:{}",
                self.commit
                    .as_ref()
                    .map(ObjectId::to_short_oid)
                    .unwrap_or_default(),
                self.filename.display()
            ),
            SourceTag::Memory => format!("memory:{}", self.filename.display()),
        }
    }
}

/// Whatever is needed to detect change cheaply, per backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSignature {
    /// Filesystem stat tuple
    Stat {
        size: u64,
        mtime: i64,
        mtime_nsec: i64,
        ino: u64,
        mode: u32,
    },
    /// Object id of an index or commit blob
    Blob(ObjectId),
    /// Content hash of an in-memory buffer
    Buffer(ObjectId),
    /// Placeholder for sources that carry no signature
    Missing,
}

impl SourceSignature {
    #[cfg(unix)]
    fn from_metadata(metadata: &fs::Metadata) -> SourceSignature {
        use std::os::unix::fs::MetadataExt;

        SourceSignature::Stat {
            size: metadata.size(),
            mtime: metadata.mtime(),
            mtime_nsec: metadata.mtime_nsec(),
            ino: metadata.ino(),
            mode: metadata.mode(),
        }
    }

    #[cfg(not(unix))]
    fn from_metadata(metadata: &fs::Metadata) -> SourceSignature {
        use std::time::UNIX_EPOCH;

        let modified = metadata
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .unwrap_or_default();

        SourceSignature::Stat {
            size: metadata.len(),
            mtime: modified.as_secs() as i64,
            mtime_nsec: modified.subsec_nanos() as i64,
            ino: 0,
            mode: 0,
        }
    }
}

/// Stat a filesystem source; `None` means the file is absent
pub fn stat_signature(path: &Path) -> Result<Option<SourceSignature>, AttrError> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => Ok(None),
        Ok(metadata) => Ok(Some(SourceSignature::from_metadata(&metadata))),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(AttrError::io(path, err)),
    }
}

/// Read a filesystem source and the signature it was read at; `None` means
/// the file is absent
pub fn read_file(path: &Path) -> Result<Option<(Bytes, SourceSignature)>, AttrError> {
    let Some(signature) = stat_signature(path)? else {
        return Ok(None);
    };

    match fs::read(path) {
        Ok(data) => Ok(Some((Bytes::from(data), signature))),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(AttrError::io(path, err)),
    }
}
