//! System-wide attribute file discovery
//!
//! The resolved path to the system attribute file is process-wide state:
//! initialized lazily, read many times, and replaceable as a whole value so
//! readers never observe a partial update. Sessions snapshot it once per
//! operation.

use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// Default location probed when no explicit path has been configured
#[cfg(unix)]
const SYSTEM_ATTR_FILE: &str = "/etc/gitattributes";

static SYSTEM_PATH: Lazy<RwLock<Option<Arc<PathBuf>>>> = Lazy::new(|| RwLock::new(probe()));

#[cfg(unix)]
fn probe() -> Option<Arc<PathBuf>> {
    let path = Path::new(SYSTEM_ATTR_FILE);
    path.is_file().then(|| Arc::new(path.to_path_buf()))
}

#[cfg(not(unix))]
fn probe() -> Option<Arc<PathBuf>> {
    None
}

/// The system attribute file, if one is configured or discoverable
pub fn system_attributes_file() -> Option<Arc<PathBuf>> {
    SYSTEM_PATH
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Override the system attribute file for this process
///
/// `None` disables the system file entirely. Intended for embedders that
/// resolve the location themselves and for tests.
pub fn set_system_attributes_file(path: Option<PathBuf>) {
    *SYSTEM_PATH.write().unwrap_or_else(PoisonError::into_inner) = path.map(Arc::new);
}
