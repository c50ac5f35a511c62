//! Result cache with per-entry TTL.
//!
//! Entries are keyed by [`formula_shared::cache_key`]. `get` treats an expired
//! entry as absent; the background sweeper only bounds memory. There is no
//! entry cap: TTL is the only eviction policy. Writes are last-write-wins.

use formula_shared::FormulaResult;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default lifetime of a cached result
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("result cache lock poisoned")]
    Poisoned,
}

/// Cached result and its expiry
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub result: FormulaResult,
    pub expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Process-wide result cache, cheap to clone.
#[derive(Debug, Clone)]
pub struct ResultCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Unexpired result for `key`, if any.
    pub fn get(&self, key: &str) -> Result<Option<FormulaResult>, CacheError> {
        let entries = self.entries.read().map_err(|_| CacheError::Poisoned)?;
        let now = Instant::now();
        Ok(entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.result.clone()))
    }

    /// Store `result` for the deployment TTL.
    pub fn put(&self, key: &str, result: FormulaResult) -> Result<(), CacheError> {
        self.put_with_ttl(key, result, self.ttl)
    }

    pub fn put_with_ttl(
        &self,
        key: &str,
        result: FormulaResult,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let mut entries = self.entries.write().map_err(|_| CacheError::Poisoned)?;
        entries.insert(
            key.to_string(),
            CacheEntry {
                result,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    /// Remove expired entries, returning how many were dropped.
    pub fn sweep(&self) -> Result<usize, CacheError> {
        let mut entries = self.entries.write().map_err(|_| CacheError::Poisoned)?;
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        Ok(before - entries.len())
    }

    /// Number of stored entries, expired-but-unswept included.
    pub fn len(&self) -> Result<usize, CacheError> {
        Ok(self.entries.read().map_err(|_| CacheError::Poisoned)?.len())
    }

    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }

    pub fn clear(&self) -> Result<(), CacheError> {
        self.entries
            .write()
            .map_err(|_| CacheError::Poisoned)?
            .clear();
        Ok(())
    }

    /// Start the periodic sweep. Stop it with [`SweeperHandle::shutdown`].
    pub fn spawn_sweeper(&self, interval: Duration) -> SweeperHandle {
        let cache = self.clone();
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => match cache.sweep() {
                        Ok(0) => {}
                        Ok(removed) => debug!("Swept {} expired cache entries", removed),
                        Err(e) => warn!("Cache sweep failed: {}", e),
                    },
                }
            }
        });

        SweeperHandle { cancel, task }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

/// Handle to the background sweep task.
#[derive(Debug)]
pub struct SweeperHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for it to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!("Cache sweeper ended abnormally: {}", e);
        }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formula_shared::FormulaSource;

    fn result(formula: &str) -> FormulaResult {
        FormulaResult::generated(formula.to_string())
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let cache = ResultCache::new(Duration::from_secs(60));
        assert_eq!(cache.get("A1:A3|sum").unwrap(), None);

        cache.put("A1:A3|sum", result("=SUM(A1:A3)")).unwrap();
        let cached = cache.get("A1:A3|sum").unwrap().unwrap();
        assert_eq!(cached.formula, "=SUM(A1:A3)");
        assert_eq!(cached.source, FormulaSource::Generated);
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let cache = ResultCache::new(Duration::from_secs(60));
        cache.put("k", result("=SUM(A1)")).unwrap();
        cache.put("k", result("=MAX(A1)")).unwrap();
        assert_eq!(cache.get("k").unwrap().unwrap().formula, "=MAX(A1)");
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_absent_before_sweep() {
        let cache = ResultCache::new(Duration::from_millis(100));
        cache.put("k", result("=SUM(A1)")).unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(cache.get("k").unwrap(), None);
        // Still stored until swept
        assert_eq!(cache.len().unwrap(), 1);
        assert_eq!(cache.sweep().unwrap(), 1);
        assert!(cache.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_entries_expire_independently() {
        let cache = ResultCache::new(Duration::from_secs(60));
        cache
            .put_with_ttl("short", result("=MIN(A1)"), Duration::from_millis(50))
            .unwrap();
        cache.put("long", result("=MAX(A1)")).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(cache.sweep().unwrap(), 1);
        assert!(cache.get("short").unwrap().is_none());
        assert!(cache.get("long").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sweeper_removes_expired_and_shuts_down() {
        let cache = ResultCache::new(Duration::from_millis(20));
        cache.put("k", result("=SUM(A1)")).unwrap();

        let sweeper = cache.spawn_sweeper(Duration::from_millis(30));
        assert!(sweeper.is_running());
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(cache.is_empty().unwrap());

        sweeper.shutdown().await;

        // No sweeps after shutdown: an expired entry stays stored.
        cache
            .put_with_ttl("late", result("=MAX(A1)"), Duration::from_millis(10))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(cache.get("late").unwrap().is_none());
        assert_eq!(cache.len().unwrap(), 1);
    }
}
