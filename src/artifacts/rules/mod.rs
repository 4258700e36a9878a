//! Attribute values, assignments, and rules
//!
//! A rule is one pattern plus the assignments that apply when it matches.
//! Assignment names and string values live in the owning file's arena;
//! each assignment also carries a 32-bit hash of its name so rule scans can
//! binary-search without touching the arena for every probe.

pub mod attr_file;

use crate::artifacts::core::text_arena::{TextArena, TextRef};
use crate::artifacts::pattern::Pattern;
use derive_new::new;

/// The value an attribute resolves to at a path
///
/// `Unspecified` is the absence of any assignment and is distinct from
/// `Unset`, which is an explicit removal of an inherited value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AttrValue {
    True,
    False,
    Unset,
    String(String),
    #[default]
    Unspecified,
}

impl AttrValue {
    /// Whether any assignment applies (everything except `Unspecified`)
    pub fn is_specified(&self) -> bool {
        !matches!(self, AttrValue::Unspecified)
    }

    /// The string payload, when the value is an opaque string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(text) => Some(text),
            _ => None,
        }
    }
}

/// Arena-resident form of an assignment's value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueRef {
    True,
    False,
    Unset,
    Text(TextRef),
}

impl ValueRef {
    pub fn materialize(&self, arena: &TextArena) -> AttrValue {
        match self {
            ValueRef::True => AttrValue::True,
            ValueRef::False => AttrValue::False,
            ValueRef::Unset => AttrValue::Unset,
            ValueRef::Text(text) => AttrValue::String(arena.get(*text).to_string()),
        }
    }
}

/// 32-bit FNV-1a hash of an attribute name
pub fn name_hash(name: &str) -> u32 {
    let mut hash: u32 = 0x811c9dc5;
    for byte in name.bytes() {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(0x01000193);
    }
    hash
}

/// Attribute names are ASCII words of alphanumerics, `-`, `_`, and `.`,
/// and may not start with `-`
pub fn is_valid_attr_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && name
            .bytes()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, b'-' | b'_' | b'.'))
}

/// One attribute assignment inside a rule
#[derive(Debug, Clone, Copy)]
pub struct Assignment {
    pub(crate) name: TextRef,
    pub(crate) name_hash: u32,
    pub(crate) value: ValueRef,
}

impl Assignment {
    pub fn name<'a>(&self, arena: &'a TextArena) -> &'a str {
        arena.get(self.name)
    }

    pub fn value(&self, arena: &TextArena) -> AttrValue {
        self.value.materialize(arena)
    }

    pub(crate) fn is_true(&self) -> bool {
        matches!(self.value, ValueRef::True)
    }
}

/// A pattern plus its assignments, sorted by `(name_hash, name)`
#[derive(Debug, Clone)]
pub struct Rule {
    pattern: Pattern,
    assigns: Vec<Assignment>,
}

impl Rule {
    pub(crate) fn new(pattern: Pattern, assigns: Vec<Assignment>) -> Self {
        Rule { pattern, assigns }
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assigns
    }

    /// Binary-search the assignment list for an attribute name
    pub fn assignment(&self, arena: &TextArena, hash: u32, name: &str) -> Option<&Assignment> {
        self.assigns
            .binary_search_by(|probe| {
                probe
                    .name_hash
                    .cmp(&hash)
                    .then_with(|| probe.name(arena).cmp(name))
            })
            .ok()
            .map(|index| &self.assigns[index])
    }
}

/// A registered macro: a named bundle of assignments, decoupled from any
/// file arena so the table can outlive the file the definition came from
#[derive(Debug, Clone, new)]
pub struct MacroDef {
    pub name: String,
    pub assignments: Vec<MacroAssignment>,
}

/// One assignment inside a macro definition
#[derive(Debug, Clone, new)]
pub struct MacroAssignment {
    pub name: String,
    pub name_hash: u32,
    pub value: AttrValue,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn name_hash_is_stable_and_discriminating() {
        assert_eq!(name_hash("diff"), name_hash("diff"));
        assert_ne!(name_hash("diff"), name_hash("text"));
    }

    #[rstest]
    #[case("diff", true)]
    #[case("merge.driver", true)]
    #[case("my-attr_2", true)]
    #[case("", false)]
    #[case("-leading-dash", false)]
    #[case("has space", false)]
    #[case("émoji", false)]
    fn attr_name_validity(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_valid_attr_name(name), expected);
    }

    #[test]
    fn unspecified_is_distinct_from_unset() {
        assert!(AttrValue::Unset.is_specified());
        assert!(!AttrValue::Unspecified.is_specified());
    }

    #[test]
    fn value_ref_materializes_from_the_arena() {
        let mut arena = TextArena::new();
        let text = arena.intern("cpp");

        assert_eq!(
            ValueRef::Text(text).materialize(&arena),
            AttrValue::String("cpp".to_string())
        );
        assert_eq!(ValueRef::Unset.materialize(&arena), AttrValue::Unset);
    }
}
