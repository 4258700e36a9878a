//! Per-operation scratch state
//!
//! A session amortizes setup across the many lookups of one bulk operation
//! (a checkout, a status walk): the system-file path is resolved once, the
//! macro preload runs once, and collected file vectors are memoized for
//! revisited directories. Sessions are not shared between threads; each
//! concurrent operation uses its own, or none.

use crate::areas::sysdir;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::rules::attr_file::AttrFile;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

/// Bound on memoized file vectors; old entries fall out insertion-first
const MEMO_CAPACITY: usize = 16;

/// Memo key: the query path's containing directory, the flag bits, and the
/// commit consulted (the collected vector depends on nothing else)
pub(crate) type MemoKey = (String, u32, Option<ObjectId>);

/// Short-lived scratch state for one higher-level operation
#[derive(Debug, Default)]
pub struct AttrSession {
    setup_done: bool,
    system_file: Option<Option<Arc<PathBuf>>>,
    memo: HashMap<MemoKey, Vec<Arc<AttrFile>>>,
    memo_order: VecDeque<MemoKey>,
}

impl AttrSession {
    pub fn new() -> Self {
        AttrSession::default()
    }

    /// The system attribute file, resolved once per session
    pub(crate) fn system_file(&mut self) -> Option<Arc<PathBuf>> {
        self.system_file
            .get_or_insert_with(sysdir::system_attributes_file)
            .clone()
    }

    pub(crate) fn setup_done(&self) -> bool {
        self.setup_done
    }

    pub(crate) fn mark_setup_done(&mut self) {
        self.setup_done = true;
    }

    pub(crate) fn memo_get(&self, key: &MemoKey) -> Option<Vec<Arc<AttrFile>>> {
        self.memo.get(key).cloned()
    }

    pub(crate) fn memo_put(&mut self, key: MemoKey, files: Vec<Arc<AttrFile>>) {
        if self.memo.contains_key(&key) {
            return;
        }
        if self.memo.len() >= MEMO_CAPACITY
            && let Some(evicted) = self.memo_order.pop_front()
        {
            self.memo.remove(&evicted);
        }
        self.memo_order.push_back(key.clone());
        self.memo.insert(key, files);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(dir: &str) -> MemoKey {
        (dir.to_string(), 0, None)
    }

    #[test]
    fn memo_round_trips_file_vectors() {
        let mut session = AttrSession::new();

        session.memo_put(key("src"), Vec::new());

        assert!(session.memo_get(&key("src")).is_some_and(|v| v.is_empty()));
        assert!(session.memo_get(&key("other")).is_none());
    }

    #[test]
    fn memo_evicts_oldest_entry_past_capacity() {
        let mut session = AttrSession::new();

        for i in 0..=MEMO_CAPACITY {
            session.memo_put(key(&format!("dir{i}")), Vec::new());
        }

        assert!(session.memo_get(&key("dir0")).is_none());
        assert!(session.memo_get(&key("dir1")).is_some());
    }

    #[test]
    fn setup_flag_starts_clear() {
        let mut session = AttrSession::new();

        assert!(!session.setup_done());
        session.mark_setup_done();
        assert!(session.setup_done());
    }
}
