use ::redis::aio::{ConnectionLike, ConnectionManager, ConnectionManagerConfig};
use ::redis::{ConnectionInfo, IntoConnectionInfo, Pipeline, RedisResult, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::domain::models::CacheConfig;

/// Build connection info from the cache configuration.
pub fn connection_info(config: &CacheConfig) -> RedisResult<ConnectionInfo> {
    let mut info = format!("redis://{}:{}/{}", config.host, config.port, config.db)
        .into_connection_info()?;
    info.redis.password.clone_from(&config.password);
    Ok(info)
}

/// Fixed-size pool of Redis connections shared by all workers.
///
/// Each slot is a `ConnectionManager`, which multiplexes requests and
/// reconnects on its own; callers get slots round-robin.
pub struct RedisPool {
    connections: Vec<ConnectionManager>,
    next: AtomicUsize,
}

impl RedisPool {
    /// Open `size` connections and check each one with PING.
    pub async fn connect(info: ConnectionInfo, size: usize, timeout: Duration) -> RedisResult<Self> {
        let client = ::redis::Client::open(info)?;
        let config = ConnectionManagerConfig::new()
            .set_connection_timeout(timeout)
            .set_response_timeout(timeout);

        let mut connections = Vec::with_capacity(size.max(1));
        for slot in 0..size.max(1) {
            let mut conn = ConnectionManager::new_with_config(client.clone(), config.clone()).await?;
            let _: String = ::redis::cmd("PING").query_async(&mut conn).await?;
            debug!(slot, "redis connection ready");
            connections.push(conn);
        }

        Ok(Self {
            connections,
            next: AtomicUsize::new(0),
        })
    }

    /// Next connection in round-robin order.
    pub fn get(&self) -> ConnectionManager {
        let ix = self.next.fetch_add(1, Ordering::Relaxed) % self.connections.len();
        self.connections[ix].clone()
    }

    /// Number of connections in the pool.
    pub fn size(&self) -> usize {
        self.connections.len()
    }
}

/// Send `pipe` and return one raw reply per command.
///
/// Unlike `Pipeline::query_async`, a command rejected by the server comes
/// back as a `Value::ServerError` in its slot instead of failing the whole
/// pipeline. Only connection-level failures are errors.
pub async fn pipeline_replies<C>(conn: &mut C, pipe: &Pipeline, count: usize) -> RedisResult<Vec<Value>>
where
    C: ConnectionLike + Send,
{
    conn.req_packed_commands(pipe, 0, count).await
}
