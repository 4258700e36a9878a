//! Glob pattern compilation and matching
//!
//! One text line from an attribute file compiles into a `Pattern`: the glob
//! text interned in the owning file's arena, a flag set, and the directory
//! context the pattern was parsed in (so `/foo` anchors relative to the
//! file containing it, not the work-tree root).

pub mod wildmatch;

use crate::artifacts::core::attr_path::AttrPath;
use crate::artifacts::core::text_arena::{TextArena, TextRef};
use crate::artifacts::pattern::wildmatch::wildmatch;
use bitflags::bitflags;

bitflags! {
    /// Properties of a compiled pattern
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MatchFlags: u8 {
        /// Leading `!`: a matching rule asserts nothing
        const NEGATE = 1 << 0;
        /// Trailing `/`: only matches directories
        const DIRECTORY_ONLY = 1 << 1;
        /// Contains a `/`: anchored to the directory of the source file
        const FULL_PATH = 1 << 2;
        /// Contains an unescaped `*`, `?`, or `[`
        const HAS_WILD = 1 << 3;
        /// A macro definition; never matches a path
        const MACRO = 1 << 4;
    }
}

/// A compiled glob pattern
#[derive(Debug, Clone, Copy)]
pub struct Pattern {
    text: TextRef,
    container: TextRef,
    flags: MatchFlags,
}

impl Pattern {
    /// Compile one pattern token
    ///
    /// `token` is the first unescaped-whitespace-separated field of a rule
    /// line; `container` is the work-tree-relative directory of the file the
    /// line came from. Returns `None` when nothing survives compilation.
    pub fn compile(token: &str, container: &str, arena: &mut TextArena) -> Option<Pattern> {
        let mut flags = MatchFlags::empty();
        let mut text = token;

        if let Some(rest) = text.strip_prefix('!') {
            flags |= MatchFlags::NEGATE;
            text = rest;
        }

        if ends_with_unescaped_slash(text) {
            flags |= MatchFlags::DIRECTORY_ONLY;
            text = &text[..text.len() - 1];
        }

        if let Some(rest) = text.strip_prefix('/') {
            flags |= MatchFlags::FULL_PATH;
            text = rest;
        }
        if find_unescaped(text, |c| c == b'/').is_some() {
            flags |= MatchFlags::FULL_PATH;
        }

        if find_unescaped(text, |c| matches!(c, b'*' | b'?' | b'[')).is_some() {
            flags |= MatchFlags::HAS_WILD;
        }

        if text.is_empty() {
            return None;
        }

        Some(Pattern {
            text: arena.intern(text),
            container: arena.intern(container),
            flags,
        })
    }

    /// Build a macro-definition pattern holding the macro name
    pub fn macro_def(name: &str, arena: &mut TextArena) -> Pattern {
        Pattern {
            text: arena.intern(name),
            container: TextRef::EMPTY,
            flags: MatchFlags::MACRO,
        }
    }

    pub fn flags(&self) -> MatchFlags {
        self.flags
    }

    pub fn is_negated(&self) -> bool {
        self.flags.contains(MatchFlags::NEGATE)
    }

    pub fn is_macro(&self) -> bool {
        self.flags.contains(MatchFlags::MACRO)
    }

    /// The stored glob text (macro name for macro definitions)
    pub fn text<'a>(&self, arena: &'a TextArena) -> &'a str {
        arena.get(self.text)
    }

    /// Test a candidate path against this pattern
    ///
    /// Anchored patterns match the candidate made relative to the pattern's
    /// container directory; basename patterns match the final component.
    /// `fold_case` follows the filesystem policy at match time.
    pub fn matches(&self, arena: &TextArena, path: &AttrPath, fold_case: bool) -> bool {
        if self.flags.contains(MatchFlags::MACRO) {
            return false;
        }
        if self.flags.contains(MatchFlags::DIRECTORY_ONLY) && !path.is_dir() {
            return false;
        }

        let pattern = arena.get(self.text);
        let candidate = if self.flags.contains(MatchFlags::FULL_PATH) {
            let container = arena.get(self.container);
            match strip_dir_prefix(path.full(), container, fold_case) {
                Some(remainder) => remainder,
                None => return false,
            }
        } else {
            path.basename()
        };

        if self.flags.contains(MatchFlags::HAS_WILD) {
            wildmatch(pattern, candidate, fold_case)
        } else {
            literal_eq(pattern, candidate, fold_case)
        }
    }
}

/// Strip `dir/` off the front of `path`, or pass `path` through when `dir`
/// is the root
fn strip_dir_prefix<'a>(path: &'a str, dir: &str, fold_case: bool) -> Option<&'a str> {
    if dir.is_empty() {
        return Some(path);
    }
    if path.len() <= dir.len() || path.as_bytes()[dir.len()] != b'/' {
        return None;
    }

    let head = &path[..dir.len()];
    let same = if fold_case {
        head.eq_ignore_ascii_case(dir)
    } else {
        head == dir
    };
    same.then(|| &path[dir.len() + 1..])
}

/// Compare a pattern with escapes removed against a candidate
fn literal_eq(pattern: &str, candidate: &str, fold_case: bool) -> bool {
    let mut p = pattern.bytes();
    let mut c = candidate.bytes();

    loop {
        let expected = match p.next() {
            None => return c.next().is_none(),
            Some(b'\\') => match p.next() {
                Some(escaped) => escaped,
                None => b'\\',
            },
            Some(byte) => byte,
        };
        match c.next() {
            Some(got) if got == expected => {}
            Some(got)
                if fold_case
                    && got.to_ascii_lowercase() == expected.to_ascii_lowercase() => {}
            _ => return false,
        }
    }
}

fn ends_with_unescaped_slash(text: &str) -> bool {
    if !text.ends_with('/') {
        return false;
    }
    let backslashes = text[..text.len() - 1]
        .bytes()
        .rev()
        .take_while(|&c| c == b'\\')
        .count();
    backslashes % 2 == 0
}

/// Position of the first byte satisfying `wanted` that is not preceded by a
/// backslash escape
fn find_unescaped(text: &str, wanted: impl Fn(u8) -> bool) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        if wanted(bytes[i]) {
            return Some(i);
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn compile(token: &str, container: &str) -> (Pattern, TextArena) {
        let mut arena = TextArena::new();
        let pattern = Pattern::compile(token, container, &mut arena).expect("pattern expected");
        (pattern, arena)
    }

    fn file(path: &str) -> AttrPath {
        AttrPath::new(path.to_string(), false)
    }

    fn dir(path: &str) -> AttrPath {
        AttrPath::new(path.to_string(), true)
    }

    #[rstest]
    #[case("*.c", MatchFlags::HAS_WILD)]
    #[case("!*.c", MatchFlags::NEGATE | MatchFlags::HAS_WILD)]
    #[case("build/", MatchFlags::DIRECTORY_ONLY)]
    #[case("/Makefile", MatchFlags::FULL_PATH)]
    #[case("src/*.c", MatchFlags::FULL_PATH | MatchFlags::HAS_WILD)]
    #[case("README", MatchFlags::empty())]
    #[case(r"\*.c", MatchFlags::empty())]
    fn compile_sets_expected_flags(#[case] token: &str, #[case] expected: MatchFlags) {
        let (pattern, _arena) = compile(token, "");

        assert_eq!(pattern.flags(), expected);
    }

    #[test]
    fn empty_and_bang_only_tokens_compile_to_nothing() {
        let mut arena = TextArena::new();

        assert!(Pattern::compile("", "", &mut arena).is_none());
        assert!(Pattern::compile("!", "", &mut arena).is_none());
        assert!(Pattern::compile("/", "", &mut arena).is_none());
    }

    #[test]
    fn basename_pattern_ignores_leading_directories() {
        let (pattern, arena) = compile("*.bin", "");

        assert!(pattern.matches(&arena, &file("x.bin"), false));
        assert!(pattern.matches(&arena, &file("deep/nested/x.bin"), false));
        assert!(!pattern.matches(&arena, &file("x.txt"), false));
    }

    #[test]
    fn anchored_pattern_matches_relative_to_container() {
        let (pattern, arena) = compile("gen/*.c", "src");

        assert!(pattern.matches(&arena, &file("src/gen/x.c"), false));
        assert!(!pattern.matches(&arena, &file("other/gen/x.c"), false));
        assert!(!pattern.matches(&arena, &file("src/gen/sub/x.c"), false));
    }

    #[test]
    fn leading_slash_anchors_at_the_container() {
        let (pattern, arena) = compile("/Makefile", "");

        assert!(pattern.matches(&arena, &file("Makefile"), false));
        assert!(!pattern.matches(&arena, &file("sub/Makefile"), false));
    }

    #[test]
    fn directory_only_requires_a_directory() {
        let (pattern, arena) = compile("build/", "");

        assert!(pattern.matches(&arena, &dir("build"), false));
        assert!(!pattern.matches(&arena, &file("build"), false));
    }

    #[test]
    fn macro_patterns_never_match_paths() {
        let mut arena = TextArena::new();
        let pattern = Pattern::macro_def("binary", &mut arena);

        assert!(!pattern.matches(&arena, &file("binary"), false));
        assert!(pattern.is_macro());
    }

    #[test]
    fn case_folding_is_decided_at_match_time() {
        let (pattern, arena) = compile("*.C", "");

        assert!(!pattern.matches(&arena, &file("a.c"), false));
        assert!(pattern.matches(&arena, &file("a.c"), true));
    }

    #[test]
    fn case_folding_applies_to_the_container_prefix() {
        let (pattern, arena) = compile("gen/*.c", "Src");

        assert!(!pattern.matches(&arena, &file("src/gen/a.c"), false));
        assert!(pattern.matches(&arena, &file("src/gen/a.c"), true));
    }

    #[test]
    fn escaped_trailing_slash_is_not_directory_only() {
        let (pattern, _arena) = compile(r"odd\/", "");

        assert!(!pattern.flags().contains(MatchFlags::DIRECTORY_ONLY));
    }
}
