//! Public attribute resolution surface
//!
//! `Attributes` bundles a repository handle with the shared rule-file
//! cache and exposes the lookup operations: single-attribute `get`,
//! multi-attribute `get_many`, enumeration via `foreach`, plus macro
//! registration and cache flushing. Each operation optionally takes an
//! `AttrSession` to amortize setup across a bulk operation.
//!
//! ## Thread Safety
//!
//! `Attributes` is shared freely across threads (the cache uses interior
//! locking); sessions are per-thread scratch and never shared.

use crate::areas::cache::AttrCache;
use crate::areas::collector::collect_attr_files;
use crate::areas::repository::Repository;
use crate::areas::session::AttrSession;
use crate::artifacts::core::attr_path::AttrPath;
use crate::artifacts::core::cancel::CancellationToken;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::rules::attr_file::{AttrFile, macro_from_definition};
use crate::artifacts::rules::{AttrValue, MacroDef, Rule, is_valid_attr_name, name_hash};
use crate::error::AttrError;
use bitflags::bitflags;
use std::collections::HashSet;

bitflags! {
    /// Lookup behavior flags
    ///
    /// The empty set is the default behavior: per-directory files read the
    /// working tree first and the index second, and the system file is
    /// consulted.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AttrCheckFlags: u32 {
        /// Read the index blob before the working-tree file
        const INDEX_THEN_FILE = 1 << 0;
        /// Read only the index blob, never the working-tree file
        const INDEX_ONLY = 1 << 1;
        /// Skip the system attribute file
        const NO_SYSTEM = 1 << 2;
        /// Also consult the `HEAD` commit's blobs
        const INCLUDE_HEAD = 1 << 3;
        /// Also consult an arbitrary commit's blobs (set `commit_id`)
        const INCLUDE_COMMIT = 1 << 4;
    }
}

/// Mutually exclusive per-directory backend orders
///
/// `INDEX_ONLY` wins when both order bits are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SourceOrder {
    FileThenIndex,
    IndexThenFile,
    IndexOnly,
}

impl AttrCheckFlags {
    pub(crate) fn source_order(self) -> SourceOrder {
        if self.contains(AttrCheckFlags::INDEX_ONLY) {
            SourceOrder::IndexOnly
        } else if self.contains(AttrCheckFlags::INDEX_THEN_FILE) {
            SourceOrder::IndexThenFile
        } else {
            SourceOrder::FileThenIndex
        }
    }
}

/// Options for one lookup
#[derive(Debug, Clone, Default)]
pub struct AttrOptions {
    pub flags: AttrCheckFlags,
    /// Commit consulted by `INCLUDE_COMMIT`
    pub commit_id: Option<ObjectId>,
    /// Checked between files during collection and between rules during
    /// resolution
    pub cancel: Option<CancellationToken>,
}

impl AttrOptions {
    pub fn new(flags: AttrCheckFlags) -> Self {
        AttrOptions {
            flags,
            ..AttrOptions::default()
        }
    }

    pub fn with_commit(mut self, commit: ObjectId) -> Self {
        self.commit_id = Some(commit);
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub(crate) fn check_cancelled(&self) -> Result<(), AttrError> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(AttrError::Cancelled),
            _ => Ok(()),
        }
    }
}

impl From<AttrCheckFlags> for AttrOptions {
    fn from(flags: AttrCheckFlags) -> Self {
        AttrOptions::new(flags)
    }
}

/// Attribute resolution facade over a repository
pub struct Attributes<R: Repository> {
    repo: R,
    cache: AttrCache,
}

impl<R: Repository> Attributes<R> {
    pub fn new(repo: R) -> Self {
        Attributes {
            repo,
            cache: AttrCache::new(),
        }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Resolve one attribute at a path
    pub fn get(&self, opts: &AttrOptions, path: &str, name: &str) -> Result<AttrValue, AttrError> {
        self.get_inner(None, opts, path, name)
    }

    /// `get` with a session amortizing setup across many lookups
    pub fn get_with_session(
        &self,
        session: &mut AttrSession,
        opts: &AttrOptions,
        path: &str,
        name: &str,
    ) -> Result<AttrValue, AttrError> {
        self.get_inner(Some(session), opts, path, name)
    }

    /// Resolve several attributes at a path in one walk
    ///
    /// The result vector is index-aligned with `names`. On error nothing
    /// partial escapes.
    pub fn get_many(
        &self,
        opts: &AttrOptions,
        path: &str,
        names: &[&str],
    ) -> Result<Vec<AttrValue>, AttrError> {
        self.get_many_inner(None, opts, path, names)
    }

    /// `get_many` with a session
    pub fn get_many_with_session(
        &self,
        session: &mut AttrSession,
        opts: &AttrOptions,
        path: &str,
        names: &[&str],
    ) -> Result<Vec<AttrValue>, AttrError> {
        self.get_many_inner(Some(session), opts, path, names)
    }

    /// Enumerate every attribute that applies at a path
    ///
    /// Each name is reported at most once, highest precedence first. A
    /// non-zero callback return aborts the walk and surfaces as
    /// `AttrError::Callback` carrying that code.
    pub fn foreach(
        &self,
        opts: &AttrOptions,
        path: &str,
        callback: impl FnMut(&str, &AttrValue) -> i32,
    ) -> Result<(), AttrError> {
        self.foreach_inner(None, opts, path, callback)
    }

    /// `foreach` with a session
    pub fn foreach_with_session(
        &self,
        session: &mut AttrSession,
        opts: &AttrOptions,
        path: &str,
        callback: impl FnMut(&str, &AttrValue) -> i32,
    ) -> Result<(), AttrError> {
        self.foreach_inner(Some(session), opts, path, callback)
    }

    /// Register a macro as if it were defined in a trusted file
    ///
    /// `definition` is a space-separated assignment list, e.g.
    /// `"-diff -merge -text"`.
    pub fn add_macro(&self, name: &str, definition: &str) -> Result<(), AttrError> {
        let def = macro_from_definition(name, definition).ok_or_else(|| {
            AttrError::InvalidArgument(format!("invalid macro definition for '{name}'"))
        })?;
        self.cache.insert_macro(def);
        Ok(())
    }

    /// Drop all cached rule files; the next lookup reloads them
    pub fn flush_cache(&self) {
        self.cache.flush();
    }

    fn get_inner(
        &self,
        session: Option<&mut AttrSession>,
        opts: &AttrOptions,
        path: &str,
        name: &str,
    ) -> Result<AttrValue, AttrError> {
        validate_attr_name(name)?;

        let attr_path = AttrPath::from_query(self.repo.workdir(), path);
        if attr_path.is_empty() {
            return Ok(AttrValue::Unspecified);
        }

        let files = collect_attr_files(&self.repo, &self.cache, session, opts, &attr_path)?;
        let fold_case = self.repo.ignore_case();
        let hash = name_hash(name);

        for file in &files {
            for rule in file.matching_rules(&attr_path, fold_case) {
                opts.check_cancelled()?;
                if let Some(value) = self.rule_value(file, rule, hash, name) {
                    return Ok(value);
                }
            }
        }

        Ok(AttrValue::Unspecified)
    }

    fn get_many_inner(
        &self,
        session: Option<&mut AttrSession>,
        opts: &AttrOptions,
        path: &str,
        names: &[&str],
    ) -> Result<Vec<AttrValue>, AttrError> {
        for name in names {
            validate_attr_name(name)?;
        }
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let mut values = vec![AttrValue::Unspecified; names.len()];

        let attr_path = AttrPath::from_query(self.repo.workdir(), path);
        if attr_path.is_empty() {
            return Ok(values);
        }

        let files = collect_attr_files(&self.repo, &self.cache, session, opts, &attr_path)?;
        let fold_case = self.repo.ignore_case();
        let hashes: Vec<u32> = names.iter().map(|name| name_hash(name)).collect();
        let mut found = vec![false; names.len()];
        let mut remaining = names.len();

        'walk: for file in &files {
            for rule in file.matching_rules(&attr_path, fold_case) {
                opts.check_cancelled()?;
                for (i, name) in names.iter().enumerate() {
                    if found[i] {
                        continue;
                    }
                    if let Some(value) = self.rule_value(file, rule, hashes[i], name) {
                        values[i] = value;
                        found[i] = true;
                        remaining -= 1;
                        if remaining == 0 {
                            break 'walk;
                        }
                    }
                }
            }
        }

        Ok(values)
    }

    fn foreach_inner(
        &self,
        session: Option<&mut AttrSession>,
        opts: &AttrOptions,
        path: &str,
        mut callback: impl FnMut(&str, &AttrValue) -> i32,
    ) -> Result<(), AttrError> {
        let attr_path = AttrPath::from_query(self.repo.workdir(), path);
        if attr_path.is_empty() {
            return Ok(());
        }

        let files = collect_attr_files(&self.repo, &self.cache, session, opts, &attr_path)?;
        let fold_case = self.repo.ignore_case();
        let mut seen: HashSet<String> = HashSet::new();

        for file in &files {
            for rule in file.matching_rules(&attr_path, fold_case) {
                opts.check_cancelled()?;

                // direct assignments outrank this rule's macro expansions
                for assign in rule.assignments() {
                    let name = assign.name(file.arena());
                    if seen.insert(name.to_string()) {
                        let value = assign.value(file.arena());
                        let code = callback(name, &value);
                        if code != 0 {
                            return Err(AttrError::Callback(code));
                        }
                    }
                }

                let mut expanded = HashSet::new();
                for assign in rule.assignments() {
                    if !assign.is_true() {
                        continue;
                    }
                    let name = assign.name(file.arena());
                    self.emit_macro(name, &mut seen, &mut expanded, &mut callback)?;
                }
            }
        }

        Ok(())
    }

    /// Emit a macro's assignments (and those of nested macros) through the
    /// callback, skipping names already reported
    fn emit_macro(
        &self,
        name: &str,
        seen: &mut HashSet<String>,
        expanded: &mut HashSet<String>,
        callback: &mut impl FnMut(&str, &AttrValue) -> i32,
    ) -> Result<(), AttrError> {
        if !expanded.insert(name.to_string()) {
            return Ok(());
        }
        let Some(def) = self.cache.macro_def(name) else {
            return Ok(());
        };

        for assign in &def.assignments {
            if seen.insert(assign.name.clone()) {
                let code = callback(&assign.name, &assign.value);
                if code != 0 {
                    return Err(AttrError::Callback(code));
                }
            }
        }
        for assign in &def.assignments {
            if matches!(assign.value, AttrValue::True) {
                self.emit_macro(&assign.name, seen, expanded, callback)?;
            }
        }

        Ok(())
    }

    /// The value a matched rule gives `name`, if any
    ///
    /// Direct assignments are consulted first; then `True`-valued
    /// assignments whose names are registered macros are logically
    /// substituted at the same precedence level.
    fn rule_value(&self, file: &AttrFile, rule: &Rule, hash: u32, name: &str) -> Option<AttrValue> {
        if let Some(assign) = rule.assignment(file.arena(), hash, name) {
            return Some(assign.value(file.arena()));
        }

        let mut seen = HashSet::new();
        for assign in rule.assignments() {
            if !assign.is_true() {
                continue;
            }
            let macro_name = assign.name(file.arena());
            if !seen.insert(macro_name.to_string()) {
                continue;
            }
            if let Some(def) = self.cache.macro_def(macro_name)
                && let Some(value) = self.find_in_macro(&def, name, &mut seen)
            {
                return Some(value);
            }
        }

        None
    }

    fn find_in_macro(
        &self,
        def: &MacroDef,
        target: &str,
        seen: &mut HashSet<String>,
    ) -> Option<AttrValue> {
        for assign in &def.assignments {
            if assign.name == target {
                return Some(assign.value.clone());
            }
        }
        for assign in &def.assignments {
            if !matches!(assign.value, AttrValue::True) {
                continue;
            }
            if !seen.insert(assign.name.clone()) {
                continue;
            }
            if let Some(inner) = self.cache.macro_def(&assign.name)
                && let Some(value) = self.find_in_macro(&inner, target, seen)
            {
                return Some(value);
            }
        }
        None
    }
}

fn validate_attr_name(name: &str) -> Result<(), AttrError> {
    if is_valid_attr_name(name) {
        Ok(())
    } else {
        Err(AttrError::InvalidArgument(format!(
            "invalid attribute name: '{name}'"
        )))
    }
}
