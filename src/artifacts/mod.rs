//! Attribute data structures and algorithms
//!
//! This module contains the core types and algorithms:
//!
//! - `core`: shared utilities (text arena, cancellation, path handling)
//! - `objects`: object identifiers for blob-backed sources
//! - `pattern`: glob compilation and the wildmatch engine
//! - `rules`: attribute values, assignments, rules, and the file parser
//! - `source`: source handles, fingerprints, and content signatures

pub mod core;
pub mod objects;
pub mod pattern;
pub mod rules;
pub mod source;
