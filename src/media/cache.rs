use std::hash::Hash;
use std::num::NonZeroUsize;

use lru::LruCache;

use crate::media::frame::Frame;

/// Time rounded to whole milliseconds, used as a cache key for floating-point times.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeKey(pub i64);

impl TimeKey {
    /// Round `secs` to the nearest millisecond.
    pub fn from_secs(secs: f64) -> Self {
        Self((secs * 1000.0).round() as i64)
    }

    pub fn as_secs(self) -> f64 {
        self.0 as f64 / 1000.0
    }
}

/// Bounded least-recently-used frame store.
///
/// Both [`FrameCache::get`] and [`FrameCache::put`] count as a use. Returned frames are
/// copy-on-write handles, so eviction never affects a value a caller already holds.
#[derive(Debug)]
pub struct FrameCache<K: Hash + Eq> {
    inner: LruCache<K, Frame>,
}

impl<K: Hash + Eq> FrameCache<K> {
    /// Create a cache holding at most `max_frames` entries (`0` is treated as `1`).
    pub fn new(max_frames: usize) -> Self {
        let cap = NonZeroUsize::new(max_frames).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: LruCache::new(cap),
        }
    }

    /// Look up `key` and mark it most recently used.
    pub fn get(&mut self, key: &K) -> Option<Frame> {
        self.inner.get(key).cloned()
    }

    /// Insert or overwrite `key`, evicting the least recently used entry when full.
    pub fn put(&mut self, key: K, frame: Frame) {
        if let Some((_, evicted)) = self.inner.push(key, frame) {
            tracing::trace!(
                w = evicted.width(),
                h = evicted.height(),
                "frame cache evicted entry"
            );
        }
    }

    /// Non-promoting membership test.
    pub fn contains(&self, key: &K) -> bool {
        self.inner.contains(key)
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.cap().get()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/cache.rs"]
mod tests;
