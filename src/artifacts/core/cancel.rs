//! Cooperative cancellation for long-running queries
//!
//! The token is checked between files during collection and between rules
//! during resolution; on cancellation partial results are discarded and the
//! query returns `AttrError::Cancelled`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Caller-supplied cancellation token
///
/// Cloning shares the underlying flag, so one handle can be kept by the
/// caller while another travels with the query options.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken::default()
    }

    /// Request cancellation; all clones observe it
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
