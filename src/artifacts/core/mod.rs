//! Shared utilities for the attribute engine
//!
//! - `attr_path`: query path normalization and the ancestor-directory walk
//! - `cancel`: cooperative cancellation token
//! - `text_arena`: per-file string storage with stable handles

pub mod attr_path;
pub mod cancel;
pub mod text_arena;
