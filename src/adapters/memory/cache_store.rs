//! In-memory cache store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::domain::errors::CacheError;
use crate::domain::models::Identifier;
use crate::domain::ports::{CacheStore, FieldSet};
use crate::services::cache_proxy::{FIELD_PAYLOAD, FIELD_SOURCE, FIELD_TYPE};

/// Hash-of-fields store with failure injection.
#[derive(Default)]
pub struct InMemoryCacheStore {
    entries: RwLock<HashMap<String, HashMap<String, Vec<u8>>>>,
    fail_next: Mutex<Option<String>>,
    truncate_next: AtomicBool,
    latency: Mutex<Duration>,
    exists_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl InMemoryCacheStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a complete entry under `key`.
    pub async fn put_entry(&self, key: &str, record_type: &str, source: &str, payload: &[u8]) {
        let mut entries = self.entries.write().await;
        let fields = entries.entry(key.to_string()).or_default();
        fields.insert(FIELD_TYPE.to_string(), record_type.as_bytes().to_vec());
        fields.insert(FIELD_SOURCE.to_string(), source.as_bytes().to_vec());
        fields.insert(FIELD_PAYLOAD.to_string(), payload.to_vec());
    }

    /// Store a single field under `key`.
    pub async fn put_field(&self, key: &str, field: &str, value: &[u8]) {
        self.entries
            .write()
            .await
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_vec());
    }

    /// Remove `key` and all of its fields.
    pub async fn remove(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    /// Make the next request fail with a transport error.
    pub fn fail_next_request(&self, message: impl Into<String>) {
        *self.fail_next.lock().expect("fail_next lock poisoned") = Some(message.into());
    }

    /// Drop the last row of the next fetch reply.
    pub fn truncate_next_reply(&self) {
        self.truncate_next.store(true, Ordering::SeqCst);
    }

    /// Delay every request by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().expect("latency lock poisoned") = latency;
    }

    /// Number of existence checks served.
    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    /// Number of field fetches served.
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    async fn begin_request(&self) -> Result<(), CacheError> {
        let latency = *self.latency.lock().expect("latency lock poisoned");
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        match self.fail_next.lock().expect("fail_next lock poisoned").take() {
            Some(message) => Err(CacheError::Transport(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn count_existing(&self, keys: &[Identifier]) -> Result<usize, CacheError> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        self.begin_request().await?;

        let entries = self.entries.read().await;
        Ok(keys.iter().filter(|k| entries.contains_key(k.as_str())).count())
    }

    async fn fetch_fields(
        &self,
        keys: &[Identifier],
        fields: &[&str],
    ) -> Result<Vec<FieldSet>, CacheError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.begin_request().await?;

        let entries = self.entries.read().await;
        let mut rows: Vec<FieldSet> = keys
            .iter()
            .map(|key| {
                let entry = entries.get(key.as_str());
                fields
                    .iter()
                    .map(|field| entry.and_then(|e| e.get(*field).cloned()))
                    .collect()
            })
            .collect();

        if self.truncate_next.swap(false, Ordering::SeqCst) {
            rows.pop();
        }
        Ok(rows)
    }
}
