use crate::PreviewResult;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// How the fetcher uses an attached [`PreviewCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheStrategy {
    /// Serve fresh entries and store new results.
    #[default]
    UseCache,
    /// Neither read nor write.
    NoCache,
    /// Skip the lookup but store the new result.
    ForceUpdate,
}

#[derive(Debug, Clone)]
struct CachedPreview {
    preview: PreviewResult,
    stored_at: Instant,
}

/// Bounded, TTL-limited store of successful previews keyed by URL.
///
/// Cloning shares the underlying map.
#[derive(Debug, Clone)]
pub struct PreviewCache {
    entries: Arc<DashMap<String, CachedPreview>>,
    capacity: usize,
    ttl: Duration,
}

impl PreviewCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Arc::new(DashMap::with_capacity(capacity)),
            capacity,
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<PreviewResult> {
        if let Some(entry) = self.entries.get(key) {
            if entry.stored_at.elapsed() < self.ttl {
                return Some(entry.preview.clone());
            }
        }

        // Read guard is released above; removing while holding it would deadlock.
        self.entries
            .remove_if(key, |_, cached| cached.stored_at.elapsed() >= self.ttl);
        None
    }

    pub fn insert(&self, key: String, preview: PreviewResult) {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict();
        }

        self.entries.insert(
            key,
            CachedPreview {
                preview,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict(&self) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, cached| cached.stored_at.elapsed() < ttl);

        if self.entries.len() < self.capacity {
            return;
        }

        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.stored_at)
            .map(|entry| entry.key().clone());

        if let Some(key) = oldest {
            debug!(key = %key, "Evicting oldest cached preview");
            self.entries.remove(&key);
        }
    }
}

impl Default for PreviewCache {
    fn default() -> Self {
        Self::new(1000, DEFAULT_CACHE_TTL)
    }
}
