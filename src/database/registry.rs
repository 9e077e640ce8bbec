//! Shared MongoDB clients, one per connection URL.
//!
//! A `mongodb::Client` owns a connection pool and is cheap to clone, so
//! requests naming the same URL reuse one client instead of opening a new
//! pool per question. The cache is bounded; the least recently used client
//! is dropped when a new URL arrives at capacity.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use mongodb::Client;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::mongo::DEFAULT_CLIENT_CACHE_SIZE;

struct Entry<C> {
    client: C,
    last_used: AtomicU64,
}

/// Bounded LRU map from URL to client
///
/// Clients are built outside the lock, so a slow build (SRV lookup for
/// `mongodb+srv://`) never blocks lookups of URLs already cached.
pub struct ClientCache<C> {
    entries: RwLock<HashMap<String, Entry<C>>>,
    capacity: usize,
    clock: AtomicU64,
}

pub type MongoRegistry = ClientCache<Client>;

impl<C: Clone> ClientCache<C> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            clock: AtomicU64::new(0),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Cached client for `key`, marking it as recently used
    pub async fn get(&self, key: &str) -> Option<C> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        entry.last_used.store(self.tick(), Ordering::Relaxed);
        Some(entry.client.clone())
    }

    /// Cached client for `key`, or the result of `build` stored under it
    ///
    /// When two callers race on the same key, the first insert wins and the
    /// other built client is dropped. Build errors are not cached.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: &str, build: F) -> Result<C, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<C, E>>,
    {
        if let Some(client) = self.get(key).await {
            return Ok(client);
        }

        let built = build().await?;

        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(key) {
            entry.last_used.store(self.tick(), Ordering::Relaxed);
            return Ok(entry.client.clone());
        }
        if entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used.load(Ordering::Relaxed))
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
                debug!("Evicted least recently used client");
            }
        }
        entries.insert(
            key.to_string(),
            Entry {
                client: built.clone(),
                last_used: AtomicU64::new(self.tick()),
            },
        );
        info!("Cached new client ({} of {})", entries.len(), self.capacity);
        Ok(built)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl<C: Clone> Default for ClientCache<C> {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CLIENT_CACHE_SIZE)
    }
}

impl ClientCache<Client> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Client for `url`, created on first use
    ///
    /// Fails only when the URL cannot be parsed or resolved; the connection
    /// itself is established lazily by the driver.
    pub async fn client(&self, url: &str) -> Result<Client, mongodb::error::Error> {
        self.get_or_try_insert_with(url, || Client::with_uri_str(url))
            .await
    }
}
