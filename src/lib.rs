//! Attribute resolution for the bit git implementation
//!
//! Given a path inside a working tree (or a bare repository), determine the
//! value of one or more named attributes according to a layered set of
//! pattern rules gathered from multiple sources: the repository's
//! `$GIT_DIR/info/attributes`, per-directory `.gitattributes` files (from
//! the working tree, the index, or a commit), a configured extra file, and
//! the system-wide file.
//!
//! ## Usage
//!
//! ```ignore
//! let repo = LocalRepository::open("/path/to/worktree");
//! let attrs = Attributes::new(repo);
//! let opts = AttrOptions::default();
//!
//! match attrs.get(&opts, "src/foo.c", "diff")? {
//!     AttrValue::String(driver) => println!("diff driver: {driver}"),
//!     AttrValue::Unspecified => println!("no diff driver"),
//!     other => println!("{other:?}"),
//! }
//! ```
//!
//! ## Architecture
//!
//! - `areas`: coordinating subsystems (facade, cache, collector, session)
//! - `artifacts`: data structures and algorithms (patterns, rules, sources)
//!
//! The repository itself is a collaborator: the engine consumes the
//! [`Repository`] trait and never implements object storage or the index.

pub mod areas;
pub mod artifacts;
mod error;

pub use areas::attributes::{AttrCheckFlags, AttrOptions, Attributes};
pub use areas::cache::AttrCache;
pub use areas::repository::{LocalRepository, Repository};
pub use areas::session::AttrSession;
pub use areas::sysdir::{set_system_attributes_file, system_attributes_file};
pub use artifacts::core::cancel::CancellationToken;
pub use artifacts::objects::object_id::ObjectId;
pub use artifacts::rules::AttrValue;
pub use artifacts::source::Source;
pub use error::AttrError;
