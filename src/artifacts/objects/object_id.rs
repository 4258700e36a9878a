//! Object identifier (SHA-1 hash)
//!
//! Attribute sources backed by the index or a commit are keyed by the
//! object id of the rule-file blob; in-memory buffers use a content hash of
//! the same shape so every source kind fingerprints uniformly.

use crate::artifacts::objects::OBJECT_ID_LENGTH;
use crate::error::AttrError;
use sha1::{Digest, Sha1};

/// Object identifier (SHA-1 hash)
///
/// A 40-character hexadecimal string that uniquely identifies a blob or
/// commit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    /// Parse and validate an object ID from a string
    pub fn try_parse(id: String) -> Result<Self, AttrError> {
        if id.len() != OBJECT_ID_LENGTH {
            return Err(AttrError::InvalidArgument(format!(
                "invalid object ID length: {}",
                id.len()
            )));
        }
        if !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AttrError::InvalidArgument(format!(
                "invalid object ID characters: {id}"
            )));
        }
        Ok(Self(id))
    }

    /// Hash a buffer into an object ID
    ///
    /// Used for in-memory source signatures and by the local repository
    /// adapter when storing blobs.
    pub fn hash_of(data: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(data);
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Get abbreviated form of the object ID
    pub fn to_short_oid(&self) -> String {
        self.0.split_at(7).0.to_string()
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
