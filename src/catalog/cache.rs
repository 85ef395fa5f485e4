use std::{
    collections::HashMap,
    future::Future,
    sync::Arc,
    time::{Duration, Instant},
};

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::ApiError;

#[derive(Default)]
struct Entries {
    /// Bumped by every invalidation.
    generation: u64,
    views: HashMap<String, (Instant, Value)>,
}

/// TTL cache of rendered GET views keyed by request path. A TTL of zero
/// disables it.
#[derive(Clone)]
pub struct ReadCache {
    ttl: Duration,
    entries: Arc<RwLock<Entries>>,
}

impl ReadCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(RwLock::new(Entries::default())),
        }
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        if self.ttl.is_zero() {
            return None;
        }
        let entries = self.entries.read().await;
        entries
            .views
            .get(key)
            .filter(|(stored, _)| stored.elapsed() < self.ttl)
            .map(|(_, value)| value.clone())
    }

    pub async fn put(&self, key: String, value: Value) {
        if self.ttl.is_zero() {
            return;
        }
        let mut entries = self.entries.write().await;
        store_view(&mut entries, self.ttl, key, value);
    }

    pub async fn invalidate<I, K>(&self, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let mut entries = self.entries.write().await;
        entries.generation += 1;
        for key in keys {
            if entries.views.remove(key.as_ref()).is_some() {
                debug!(key = key.as_ref(), "cache entry invalidated");
            }
        }
    }

    /// Cached value for `key`, or the result of `load`. The loaded value is
    /// only stored if no invalidation ran while it was being built.
    pub async fn get_or_load<F, Fut>(&self, key: String, load: F) -> Result<Value, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, ApiError>>,
    {
        if self.ttl.is_zero() {
            return load().await;
        }
        let seen = {
            let entries = self.entries.read().await;
            if let Some((stored, value)) = entries.views.get(&key) {
                if stored.elapsed() < self.ttl {
                    return Ok(value.clone());
                }
            }
            entries.generation
        };

        let value = load().await?;

        let mut entries = self.entries.write().await;
        if entries.generation == seen {
            store_view(&mut entries, self.ttl, key, value.clone());
        } else {
            debug!(key = %key, "write raced the load, not caching");
        }
        Ok(value)
    }
}

fn store_view(entries: &mut Entries, ttl: Duration, key: String, value: Value) {
    entries.views.retain(|_, (stored, _)| stored.elapsed() < ttl);
    entries.views.insert(key, (Instant::now(), value));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn loads_once_until_invalidated() {
        let cache = ReadCache::new(Duration::from_secs(60));
        let v = cache
            .get_or_load("/api/movies/".into(), || async { Ok::<_, ApiError>(json!([1])) })
            .await
            .unwrap();
        assert_eq!(v, json!([1]));

        let v = cache
            .get_or_load("/api/movies/".into(), || async { Ok::<_, ApiError>(json!([2])) })
            .await
            .unwrap();
        assert_eq!(v, json!([1]));

        cache.invalidate(["/api/movies/"]).await;
        assert!(cache.get("/api/movies/").await.is_none());
    }

    #[tokio::test]
    async fn zero_ttl_disables_caching() {
        let cache = ReadCache::new(Duration::ZERO);
        cache.put("/k/".into(), json!(1)).await;
        assert!(cache.get("/k/").await.is_none());
    }

    #[tokio::test]
    async fn failed_loads_are_not_cached() {
        let cache = ReadCache::new(Duration::from_secs(60));
        let err = cache
            .get_or_load("/api/movies/9/".into(), || async { Err::<Value, _>(ApiError::NotFound("gone".into())) })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert!(cache.get("/api/movies/9/").await.is_none());
    }

    #[tokio::test]
    async fn load_overtaken_by_a_write_is_not_cached() {
        let cache = ReadCache::new(Duration::from_secs(60));
        let (loaded_tx, loaded_rx) = tokio::sync::oneshot::channel::<()>();
        let (resume_tx, resume_rx) = tokio::sync::oneshot::channel::<()>();

        let reader = cache.get_or_load("/api/movies/".into(), || async move {
            let _ = loaded_tx.send(());
            let _ = resume_rx.await;
            Ok::<_, ApiError>(json!(["old"]))
        });
        let writer = async {
            loaded_rx.await.unwrap();
            cache.invalidate(["/api/movies/"]).await;
            resume_tx.send(()).unwrap();
        };
        let (read, ()) = tokio::join!(reader, writer);

        assert_eq!(read.unwrap(), json!(["old"]));
        assert!(cache.get("/api/movies/").await.is_none());

        let v = cache
            .get_or_load("/api/movies/".into(), || async { Ok::<_, ApiError>(json!(["new"])) })
            .await
            .unwrap();
        assert_eq!(v, json!(["new"]));
        assert_eq!(cache.get("/api/movies/").await, Some(json!(["new"])));
    }
}
