//! Shared rule-file cache
//!
//! Process-wide store of parsed attribute files, keyed by source
//! fingerprint. Entries revalidate against a freshly computed content
//! signature on every hit, so a changed file reparses and an unchanged one
//! is shared as-is.
//!
//! ## Thread Safety
//!
//! The keyed map is behind a reader-writer lock; published files are
//! immutable and handed out as `Arc` clones. Each entry owns a mutex, so
//! loads of the same key are single-flight while distinct keys parse in
//! parallel. The macro table takes an exclusive lock only for the rare
//! writes that happen when a trusted source defines a macro.

use crate::areas::repository::Repository;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::rules::MacroDef;
use crate::artifacts::rules::attr_file::AttrFile;
use crate::artifacts::source::{self, Source, SourceKey, SourceSignature};
use crate::error::AttrError;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Keyed store of parsed attribute files plus the macro table
#[derive(Debug, Default)]
pub struct AttrCache {
    entries: RwLock<HashMap<SourceKey, Arc<CacheSlot>>>,
    macros: RwLock<HashMap<String, Arc<MacroDef>>>,
}

#[derive(Debug, Default)]
struct CacheSlot {
    state: Mutex<SlotState>,
}

#[derive(Debug, Default)]
struct SlotState {
    loaded: Option<Loaded>,
}

/// A slot holds either a parsed file or the observation that the source
/// does not exist, so repeated queries do not re-stat missing files
#[derive(Debug)]
enum Loaded {
    Present(Arc<AttrFile>),
    Absent,
}

impl AttrCache {
    pub fn new() -> Self {
        AttrCache::default()
    }

    /// Fetch the parsed file for `source`, reloading it if stale
    ///
    /// Returns `None` when the source does not exist; that observation is
    /// cached too. `container` is the work-tree-relative directory the
    /// source's patterns anchor to, and `allow_macros` is the trust
    /// decision for macro definitions in this source.
    pub fn get<R: Repository>(
        &self,
        repo: &R,
        source: &Source,
        container: &str,
        allow_macros: bool,
    ) -> Result<Option<Arc<AttrFile>>, AttrError> {
        let key = source.key();
        let slot = self.slot(&key);

        // Per-key single-flight: one loader at a time, others wait here.
        let mut state = slot.state.lock().unwrap_or_else(PoisonError::into_inner);

        let current = current_signature(repo, source)?;
        match (&state.loaded, &current) {
            (Some(Loaded::Present(file)), Some(signature)) if file.signature() == signature => {
                return Ok(Some(file.clone()));
            }
            (Some(Loaded::Absent), None) => return Ok(None),
            _ => {}
        }

        let Some((data, signature)) = load(repo, source)? else {
            state.loaded = Some(Loaded::Absent);
            return Ok(None);
        };

        let file = Arc::new(AttrFile::parse(
            key,
            signature,
            &data,
            container,
            allow_macros,
        ));
        self.register_macros(&file);
        state.loaded = Some(Loaded::Present(file.clone()));

        Ok(Some(file))
    }

    /// Register a macro directly, bypassing file parsing
    pub fn insert_macro(&self, def: MacroDef) {
        self.macros
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(def.name.clone(), Arc::new(def));
    }

    /// Look up a registered macro by name
    pub fn macro_def(&self, name: &str) -> Option<Arc<MacroDef>> {
        self.macros
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Drop every cached file entry
    ///
    /// For callers that mutate the working tree. Registered macros stay:
    /// reparsing their defining sources would re-register them identically.
    pub fn flush(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn slot(&self, key: &SourceKey) -> Arc<CacheSlot> {
        if let Some(slot) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return slot.clone();
        }

        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.clone())
            .or_default()
            .clone()
    }

    fn register_macros(&self, file: &AttrFile) {
        if file.macros().is_empty() {
            return;
        }
        let mut macros = self.macros.write().unwrap_or_else(PoisonError::into_inner);
        for def in file.macros() {
            macros.insert(def.name.clone(), Arc::new(def.clone()));
        }
    }

    #[cfg(test)]
    pub(crate) fn entry_count(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Recompute the signature a cached entry must match to stay valid
fn current_signature<R: Repository>(
    repo: &R,
    source: &Source,
) -> Result<Option<SourceSignature>, AttrError> {
    match source {
        Source::WorkingFile { .. } => {
            let path = source.file_path().unwrap_or_default();
            source::stat_signature(&path)
        }
        Source::IndexBlob { path } => Ok(repo
            .index_blob_oid(path)?
            .map(SourceSignature::Blob)),
        Source::CommitBlob { commit, path } => Ok(repo
            .commit_blob_oid(commit, path)?
            .map(SourceSignature::Blob)),
        Source::Memory { contents, .. } => Ok(Some(SourceSignature::Buffer(ObjectId::hash_of(
            contents,
        )))),
    }
}

/// Load raw bytes and the signature they were read at
fn load<R: Repository>(
    repo: &R,
    source: &Source,
) -> Result<Option<(Bytes, SourceSignature)>, AttrError> {
    match source {
        Source::WorkingFile { .. } => {
            let path = source.file_path().unwrap_or_default();
            source::read_file(&path)
        }
        Source::IndexBlob { path } => load_blob(repo, repo.index_blob_oid(path)?),
        Source::CommitBlob { commit, path } => {
            load_blob(repo, repo.commit_blob_oid(commit, path)?)
        }
        Source::Memory { contents, .. } => Ok(Some((
            contents.clone(),
            SourceSignature::Buffer(ObjectId::hash_of(contents)),
        ))),
    }
}

fn load_blob<R: Repository>(
    repo: &R,
    oid: Option<ObjectId>,
) -> Result<Option<(Bytes, SourceSignature)>, AttrError> {
    let Some(oid) = oid else {
        return Ok(None);
    };
    let data = repo.read_blob(&oid)?;
    Ok(Some((data, SourceSignature::Blob(oid))))
}
