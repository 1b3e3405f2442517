//! Unit content cache
//!
//! LRU of recently read unit texts, keyed by unit id. Any edit or rebuild
//! clears it, since ids and contents are only valid for one index build and
//! one patch set.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use crate::index::UnitId;

#[derive(Debug)]
pub(crate) struct UnitCache {
    entries: Option<Mutex<LruCache<UnitId, Arc<str>>>>,
}

impl UnitCache {
    /// A capacity of zero disables caching
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    pub(crate) fn get(&self, id: UnitId) -> Option<Arc<str>> {
        self.entries.as_ref()?.lock().get(&id).cloned()
    }

    pub(crate) fn put(&self, id: UnitId, text: Arc<str>) {
        if let Some(entries) = &self.entries {
            entries.lock().put(id, text);
        }
    }

    pub(crate) fn clear(&self) {
        if let Some(entries) = &self.entries {
            entries.lock().clear();
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |e| e.lock().len())
    }
}
