use {
    std::collections::HashMap,
    std::time::{Duration, Instant},
    tokio::sync::RwLock,
    uuid::Uuid,
};

struct Entry {
    count: i64,
    stored_at: Instant,
}

/// TTL cache for per-merchant pending counts, shared through app state so
/// it can be dropped in tests and swapped for a distributed cache later
/// without touching the call sites.
pub struct PendingCountCache {
    ttl: Duration,
    inner: RwLock<HashMap<Uuid, Entry>>,
}

impl PendingCountCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, merchant_id: Uuid) -> Option<i64> {
        let inner = self.inner.read().await;
        inner
            .get(&merchant_id)
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| entry.count)
    }

    pub async fn put(&self, merchant_id: Uuid, count: i64) {
        let mut inner = self.inner.write().await;
        inner.insert(
            merchant_id,
            Entry {
                count,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop the entry so the next read goes to the database. Called when a
    /// bulk decision changes the pending set.
    pub async fn invalidate(&self, merchant_id: Uuid) {
        self.inner.write().await.remove(&merchant_id);
    }
}
