//! Object identifiers for blob-backed attribute sources

pub mod object_id;

/// Length of a hex-encoded object id
pub const OBJECT_ID_LENGTH: usize = 40;
