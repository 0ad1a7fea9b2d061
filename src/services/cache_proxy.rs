//! Cache proxy.
//!
//! Wraps a [`CacheStore`] with the checks the pipeline relies on:
//! - Bulk existence checks reported as a data-quality boolean
//! - One pipelined round trip per batch of lookups
//! - Per-key filtering of incomplete entries
//! - Slow request logging

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::domain::errors::CacheError;
use crate::domain::models::{CacheEntry, Identifier};
use crate::domain::ports::{CacheStore, FieldSet};

/// Hash field holding the record type.
pub const FIELD_TYPE: &str = "type";
/// Hash field holding the record source.
pub const FIELD_SOURCE: &str = "source";
/// Hash field holding the record payload.
pub const FIELD_PAYLOAD: &str = "payload";

const ENTRY_FIELDS: [&str; 3] = [FIELD_TYPE, FIELD_SOURCE, FIELD_PAYLOAD];

/// Default threshold above which a cache request is logged.
pub const DEFAULT_SLOW_REQUEST: Duration = Duration::from_millis(100);

/// Proxy over the cache store used by the workers.
#[derive(Clone)]
pub struct CacheProxy {
    store: Arc<dyn CacheStore>,
    slow_request: Duration,
}

impl CacheProxy {
    /// Create a proxy with the default slow request threshold.
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self::with_slow_request(store, DEFAULT_SLOW_REQUEST)
    }

    /// Create a proxy that logs requests taking at least `slow_request`.
    pub fn with_slow_request(store: Arc<dyn CacheStore>, slow_request: Duration) -> Self {
        Self {
            store,
            slow_request,
        }
    }

    /// Check that every one of `keys` exists in the cache.
    ///
    /// Returns `Ok(false)` when the store holds fewer of the distinct keys than
    /// were asked for. Only transport failures are errors.
    pub async fn exists(&self, keys: &[Identifier]) -> Result<bool, CacheError> {
        let distinct: Vec<Identifier> = {
            let mut seen = HashSet::with_capacity(keys.len());
            keys.iter().filter(|k| seen.insert(*k)).cloned().collect()
        };

        if distinct.is_empty() {
            return Ok(true);
        }

        let start = Instant::now();
        let result = self.store.count_existing(&distinct).await;
        self.warn_if_slow(start.elapsed(), "exists", distinct.len());

        let found = result?;
        if found < distinct.len() {
            warn!(
                requested = distinct.len(),
                found,
                "one or more keys do not exist in the cache"
            );
            return Ok(false);
        }

        Ok(true)
    }

    /// Fetch the cached entries for `keys` in one pipelined round trip.
    ///
    /// Keys with a missing entry or a missing/empty field are skipped with a
    /// warning, so the result may be shorter than `keys`. Entries keep the
    /// order of `keys`.
    pub async fn get(&self, keys: &[Identifier]) -> Result<Vec<(Identifier, CacheEntry)>, CacheError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let result = self.store.fetch_fields(keys, &ENTRY_FIELDS).await;
        self.warn_if_slow(start.elapsed(), "hmget", keys.len());

        let rows = result?;
        if rows.len() != keys.len() {
            return Err(CacheError::MalformedReply {
                expected: keys.len(),
                actual: rows.len(),
            });
        }

        let entries = keys
            .iter()
            .zip(rows)
            .filter_map(|(id, row)| decode_entry(id, row).map(|entry| (id.clone(), entry)))
            .collect();

        Ok(entries)
    }

    fn warn_if_slow(&self, elapsed: Duration, operation: &str, items: usize) {
        if elapsed >= self.slow_request {
            info!(
                operation,
                items,
                elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                "slow cache request"
            );
        }
    }
}

/// Turn one HMGET row into an entry, or `None` if anything is missing.
fn decode_entry(id: &Identifier, row: FieldSet) -> Option<CacheEntry> {
    let mut fields = row.into_iter();
    let record_type = required_field(id, FIELD_TYPE, fields.next().flatten())?;
    let source = required_field(id, FIELD_SOURCE, fields.next().flatten())?;
    let payload = required_field(id, FIELD_PAYLOAD, fields.next().flatten())?;

    let record_type = text_field(id, FIELD_TYPE, record_type)?;
    let source = text_field(id, FIELD_SOURCE, source)?;

    Some(CacheEntry {
        record_type,
        source,
        payload,
    })
}

fn required_field(id: &Identifier, field: &str, value: Option<Vec<u8>>) -> Option<Vec<u8>> {
    match value {
        Some(v) if !v.is_empty() => Some(v),
        _ => {
            warn!(id = %id, field, "cache value is empty, ignoring lookup");
            None
        }
    }
}

fn text_field(id: &Identifier, field: &str, value: Vec<u8>) -> Option<String> {
    match String::from_utf8(value) {
        Ok(s) => Some(s),
        Err(_) => {
            warn!(id = %id, field, "cache value is not valid UTF-8, ignoring lookup");
            None
        }
    }
}
