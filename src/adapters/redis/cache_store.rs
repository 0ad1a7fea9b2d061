use ::redis::{from_redis_value, Value};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use crate::domain::errors::CacheError;
use crate::domain::models::Identifier;
use crate::domain::ports::{CacheStore, FieldSet};

use super::connection::{pipeline_replies, RedisPool};

/// Cache store reading record hashes from Redis.
#[derive(Clone)]
pub struct RedisCacheStore {
    pool: Arc<RedisPool>,
}

impl RedisCacheStore {
    /// Create a store over an open pool.
    pub fn new(pool: Arc<RedisPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn count_existing(&self, keys: &[Identifier]) -> Result<usize, CacheError> {
        let mut conn = self.pool.get();
        let keys: Vec<&str> = keys.iter().map(Identifier::as_str).collect();

        let count: usize = ::redis::cmd("EXISTS").arg(keys).query_async(&mut conn).await?;
        Ok(count)
    }

    async fn fetch_fields(
        &self,
        keys: &[Identifier],
        fields: &[&str],
    ) -> Result<Vec<FieldSet>, CacheError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.get();

        // one HMGET per key, sent as a single pipeline
        let mut pipe = ::redis::pipe();
        for key in keys {
            pipe.cmd("HMGET").arg(key.as_str()).arg(fields);
        }

        let replies = pipeline_replies(&mut conn, &pipe, keys.len()).await?;
        keys.iter()
            .zip(replies)
            .map(|(key, reply)| row_from_reply(key, reply, fields.len()))
            .collect()
    }
}

/// Decode one HMGET reply.
///
/// A key the server refused to read (e.g. WRONGTYPE) yields an all-empty row,
/// which the cache proxy skips like a missing entry.
fn row_from_reply(key: &Identifier, reply: Value, field_count: usize) -> Result<FieldSet, CacheError> {
    match reply {
        Value::ServerError(err) => {
            warn!(id = %key, error = ?err, "one of the cache operations failed, ignoring lookup");
            Ok(vec![None; field_count])
        }
        reply => Ok(from_redis_value(&reply)?),
    }
}
