//! Parsed contents of one attribute source
//!
//! ## File format
//!
//! One rule per line: a glob pattern followed by whitespace-separated
//! assignments (`name`, `-name`, `!name`, `name=value`). Lines starting
//! with `#` are comments, blank lines are ignored, a trailing CR is
//! tolerated. A line starting with `[attr]` defines a macro; definitions
//! are honored only when the source is trusted.
//!
//! The parser never fails: malformed assignments and empty patterns are
//! skipped and parsing continues. All strings land in the file's arena and
//! are released together when the file drops.

use crate::artifacts::core::attr_path::AttrPath;
use crate::artifacts::core::text_arena::TextArena;
use crate::artifacts::pattern::{MatchFlags, Pattern};
use crate::artifacts::rules::{
    Assignment, MacroAssignment, MacroDef, Rule, ValueRef, is_valid_attr_name, name_hash,
};
use crate::artifacts::source::{SourceKey, SourceSignature};
use std::collections::HashSet;
use std::fmt;

/// Prefix introducing a macro definition line
const MACRO_PREFIX: &str = "[attr]";

/// Parsed contents of one attribute source
///
/// Immutable once built; the cache publishes these behind `Arc` and every
/// lookup session shares them. Rule order is file order; the resolver walks
/// it in reverse so later lines override earlier ones.
#[derive(Debug)]
pub struct AttrFile {
    key: SourceKey,
    signature: SourceSignature,
    rules: Vec<Rule>,
    macros: Vec<MacroDef>,
    arena: TextArena,
}

impl AttrFile {
    /// Parse one source buffer
    ///
    /// `container` is the work-tree-relative directory the file lives in;
    /// anchored patterns match relative to it. Macro definitions are
    /// recognized and kept as rules regardless of `allow_macros`, but only
    /// produce table registrations when it is set.
    pub fn parse(
        key: SourceKey,
        signature: SourceSignature,
        data: &[u8],
        container: &str,
        allow_macros: bool,
    ) -> AttrFile {
        let text = String::from_utf8_lossy(data);
        let mut arena = TextArena::with_capacity(data.len());
        let mut rules = Vec::new();
        let mut macros = Vec::new();

        for raw_line in text.split('\n') {
            let line = raw_line.strip_suffix('\r').unwrap_or(raw_line).trim_start();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(rest) = line.strip_prefix(MACRO_PREFIX) {
                if let Some((rule, def)) = parse_macro_line(rest, &mut arena) {
                    rules.push(rule);
                    if allow_macros {
                        macros.push(def);
                    }
                }
                continue;
            }

            let (token, rest) = split_pattern_token(line);
            let Some(pattern) = Pattern::compile(token, container, &mut arena) else {
                continue;
            };
            let assigns = parse_assignments(rest, &mut arena);
            let assigns = finish_assignments(&arena, assigns);
            rules.push(Rule::new(pattern, assigns));
        }

        AttrFile {
            key,
            signature,
            rules,
            macros,
            arena,
        }
    }

    pub fn key(&self) -> &SourceKey {
        &self.key
    }

    pub fn signature(&self) -> &SourceSignature {
        &self.signature
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Macro definitions accepted from this (trusted) source
    pub fn macros(&self) -> &[MacroDef] {
        &self.macros
    }

    pub fn arena(&self) -> &TextArena {
        &self.arena
    }

    /// Rules that apply to `path`, in precedence order
    ///
    /// Walks the rule list in reverse so later lines win. Negated rules
    /// assert nothing and are skipped, as are macro definitions.
    pub fn matching_rules<'a>(
        &'a self,
        path: &'a AttrPath,
        fold_case: bool,
    ) -> impl Iterator<Item = &'a Rule> + 'a {
        self.rules.iter().rev().filter(move |rule| {
            !rule.pattern().is_negated() && rule.pattern().matches(&self.arena, path, fold_case)
        })
    }
}

impl fmt::Display for AttrFile {
    /// Serialize back to the file format, modulo whitespace and dropped
    /// (comment, malformed) lines
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in &self.rules {
            let pattern = rule.pattern();
            let flags = pattern.flags();
            let text = pattern.text(&self.arena);

            if flags.contains(MatchFlags::MACRO) {
                write!(f, "{MACRO_PREFIX}{text}")?;
            } else {
                if flags.contains(MatchFlags::NEGATE) {
                    write!(f, "!")?;
                }
                if flags.contains(MatchFlags::FULL_PATH) && !text.contains('/') {
                    write!(f, "/")?;
                }
                write!(f, "{text}")?;
                if flags.contains(MatchFlags::DIRECTORY_ONLY) {
                    write!(f, "/")?;
                }
            }

            for assign in rule.assignments() {
                let name = assign.name(&self.arena);
                match assign.value {
                    ValueRef::True => write!(f, " {name}")?,
                    ValueRef::False => write!(f, " -{name}")?,
                    ValueRef::Unset => write!(f, " !{name}")?,
                    ValueRef::Text(value) => write!(f, " {name}={}", self.arena.get(value))?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Parse a macro definition body (everything after `[attr]`)
///
/// Yields the definition both as a `MACRO`-flagged rule kept in the file
/// and as an owned def for the cache's macro table.
fn parse_macro_line(rest: &str, arena: &mut TextArena) -> Option<(Rule, MacroDef)> {
    let rest = rest.trim_start();
    let (name, definition) = match rest.split_once(char::is_whitespace) {
        Some((name, definition)) => (name, definition),
        None => (rest, ""),
    };
    if !is_valid_attr_name(name) {
        return None;
    }

    let assigns = parse_assignments(definition, arena);
    let assigns = finish_assignments(arena, assigns);
    let def = MacroDef::new(name.to_string(), materialize_assignments(arena, &assigns));
    let rule = Rule::new(Pattern::macro_def(name, arena), assigns);

    Some((rule, def))
}

/// Build an owned macro from a name and a definition string
///
/// Backs the public `add_macro` operation. Returns `None` when the name is
/// invalid or no assignment survives parsing.
pub(crate) fn macro_from_definition(name: &str, definition: &str) -> Option<MacroDef> {
    if !is_valid_attr_name(name) {
        return None;
    }

    let mut arena = TextArena::new();
    let assigns = parse_assignments(definition, &mut arena);
    let assigns = finish_assignments(&arena, assigns);
    if assigns.is_empty() {
        return None;
    }

    Some(MacroDef::new(
        name.to_string(),
        materialize_assignments(&arena, &assigns),
    ))
}

fn materialize_assignments(arena: &TextArena, assigns: &[Assignment]) -> Vec<MacroAssignment> {
    assigns
        .iter()
        .map(|assign| {
            MacroAssignment::new(
                assign.name(arena).to_string(),
                assign.name_hash,
                assign.value(arena),
            )
        })
        .collect()
}

/// Split the pattern field off a rule line at the first unescaped blank
fn split_pattern_token(line: &str) -> (&str, &str) {
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b' ' | b'\t' => return (&line[..i], &line[i..]),
            _ => i += 1,
        }
    }
    (line, "")
}

/// Parse space-separated assignments, skipping malformed ones
fn parse_assignments(text: &str, arena: &mut TextArena) -> Vec<Assignment> {
    let mut assigns = Vec::new();

    for token in text.split_whitespace() {
        let (name, value) = if let Some(name) = token.strip_prefix('-') {
            (name, ValueRef::False)
        } else if let Some(name) = token.strip_prefix('!') {
            (name, ValueRef::Unset)
        } else if let Some((name, value)) = token.split_once('=') {
            let value = arena.intern(value);
            (name, ValueRef::Text(value))
        } else {
            (token, ValueRef::True)
        };

        if !is_valid_attr_name(name) {
            continue;
        }

        assigns.push(Assignment {
            name_hash: name_hash(name),
            name: arena.intern(name),
            value,
        });
    }

    assigns
}

/// Deduplicate (later wins) and sort by `(name_hash, name)` for binary
/// search
fn finish_assignments(arena: &TextArena, assigns: Vec<Assignment>) -> Vec<Assignment> {
    let mut seen = HashSet::new();
    let mut kept: Vec<Assignment> = assigns
        .into_iter()
        .rev()
        .filter(|assign| seen.insert(assign.name(arena)))
        .collect();

    kept.sort_by(|a, b| {
        a.name_hash
            .cmp(&b.name_hash)
            .then_with(|| a.name(arena).cmp(b.name(arena)))
    });
    kept
}
