//! Per-document configuration cache
//!
//! Fetching a document's configuration is a server round trip; UI
//! collaborators ask for it far more often than it changes. This cache
//! keeps the last result per document URI for a short staleness window and
//! guarantees at most one in-flight fetch per URI: concurrent callers share
//! the same pending future instead of issuing duplicate requests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tracing::warn;
use url::Url;

use crate::client::client::{ConfigProvider, DocumentConfig};

const DEFAULT_STALE_AFTER: Duration = Duration::from_millis(1000);
const DEFAULT_MAX_AGE: Duration = Duration::from_millis(5000);

type SharedFetch = Shared<BoxFuture<'static, Option<DocumentConfig>>>;

struct CacheEntry {
    config: Option<DocumentConfig>,
    fetched_at: Instant,
    pending: Option<SharedFetch>,
}

pub struct DocumentConfigCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    provider: Arc<dyn ConfigProvider>,
    stale_after: Duration,
    max_age: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl DocumentConfigCache {
    pub fn new(provider: Arc<dyn ConfigProvider>) -> Self {
        Self::with_timing(provider, DEFAULT_STALE_AFTER, DEFAULT_MAX_AGE)
    }

    pub fn with_timing(
        provider: Arc<dyn ConfigProvider>,
        stale_after: Duration,
        max_age: Duration,
    ) -> Self {
        DocumentConfigCache {
            inner: Arc::new(CacheInner {
                provider,
                stale_after,
                max_age,
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// The cached config, if fresh enough. A missing or too-old entry kicks
    /// off a fetch and resolves to `None`; a merely stale entry is returned
    /// while a refresh runs behind it.
    pub fn get(&self, uri: &Url) -> Option<DocumentConfig> {
        let key = uri.to_string();
        let now = Instant::now();

        let (result, needs_fetch) = {
            let entries = self.inner.entries.lock().expect("cache lock poisoned");
            match entries.get(&key) {
                Some(entry) if entry.config.is_some() && !self.inner.is_too_old(entry, now) => {
                    (entry.config.clone(), !self.inner.is_fresh(entry, now))
                }
                _ => (None, true),
            }
        };

        if needs_fetch {
            let _ = self.start_fetch(uri);
        }
        result
    }

    /// The config for a document, fetching if needed. Concurrent calls for
    /// the same URI share a single server request.
    pub async fn fetch(&self, uri: &Url) -> Option<DocumentConfig> {
        let key = uri.to_string();
        let now = Instant::now();

        let cached = {
            let entries = self.inner.entries.lock().expect("cache lock poisoned");
            entries.get(&key).and_then(|entry| {
                if entry.config.is_some() && self.inner.is_fresh(entry, now) {
                    entry.config.clone()
                } else {
                    None
                }
            })
        };
        if cached.is_some() {
            return cached;
        }

        self.start_fetch(uri).await
    }

    pub fn set(&self, uri: &Url, config: DocumentConfig) {
        let mut entries = self.inner.entries.lock().expect("cache lock poisoned");
        let entry = entries.entry(uri.to_string()).or_insert_with(|| CacheEntry {
            config: None,
            fetched_at: Instant::now(),
            pending: None,
        });
        entry.config = Some(config);
        entry.fetched_at = Instant::now();
    }

    pub fn delete(&self, uri: &Url) -> bool {
        let mut entries = self.inner.entries.lock().expect("cache lock poisoned");
        entries.remove(&uri.to_string()).is_some()
    }

    pub fn clear(&self) {
        let mut entries = self.inner.entries.lock().expect("cache lock poisoned");
        entries.clear();
    }

    /// The shared in-flight fetch for a URI, starting one if none exists.
    fn start_fetch(&self, uri: &Url) -> SharedFetch {
        let key = uri.to_string();
        let mut entries = self.inner.entries.lock().expect("cache lock poisoned");

        if let Some(entry) = entries.get(&key) {
            if let Some(pending) = &entry.pending {
                return pending.clone();
            }
        }

        let inner = Arc::clone(&self.inner);
        let fetch_uri = uri.clone();
        let fetch_key = key.clone();
        let future: SharedFetch = async move {
            let result = inner
                .provider
                .configuration_for_document(Some(&fetch_uri))
                .await;
            let config = match result {
                Ok(config) => Some(config),
                Err(e) => {
                    warn!("Failed to fetch configuration for {}: {}", fetch_uri, e);
                    None
                }
            };

            let mut entries = inner.entries.lock().expect("cache lock poisoned");
            if let Some(entry) = entries.get_mut(&fetch_key) {
                if config.is_some() {
                    entry.config = config.clone();
                    entry.fetched_at = Instant::now();
                }
                entry.pending = None;
            }
            inner.purge_locked(&mut entries);
            config
        }
        .boxed()
        .shared();

        let entry = entries.entry(key).or_insert_with(|| CacheEntry {
            config: None,
            fetched_at: Instant::now(),
            pending: None,
        });
        entry.pending = Some(future.clone());

        // Drive the fetch even if no caller awaits it.
        tokio::spawn(future.clone());
        future
    }
}

impl CacheInner {
    fn is_fresh(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.duration_since(entry.fetched_at) < self.stale_after
    }

    fn is_too_old(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.duration_since(entry.fetched_at) > self.max_age
    }

    fn purge_locked(&self, entries: &mut HashMap<String, CacheEntry>) {
        let now = Instant::now();
        entries.retain(|_, entry| entry.pending.is_some() || !self.is_too_old(entry, now));
    }
}
