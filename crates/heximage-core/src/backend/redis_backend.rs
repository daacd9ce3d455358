use super::{CanvasBackend, PayloadStream};
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::MultiplexedConnection;
use tracing::{debug, info};

/// Redis-backed canvas store (for production)
///
/// One multiplexed connection is opened at startup and cloned per command;
/// each subscription gets its own dedicated pub/sub connection.
///
/// # Security Features
///
/// - Credentials in the URL (`redis://:password@host`) are sent as AUTH
/// - Consider enabling Redis TLS (`rediss://`) in production
#[derive(Clone)]
pub struct RedisBackend {
    client: redis::Client,
    conn: MultiplexedConnection,
}

impl RedisBackend {
    /// Connect and verify the server answers a PING
    ///
    /// # Errors
    ///
    /// Returns error if the URL is invalid or Redis is unreachable
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| Error::store(format!("invalid Redis URL: {e}")))?;

        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| Error::store(format!("Redis connection failed: {e}")))?;

        let backend = Self { client, conn };
        backend.ping().await?;

        info!("Connected to Redis");
        Ok(backend)
    }

    fn bitfield_set(key: &str, bit_offset: u64, value: u32) -> redis::Cmd {
        let mut cmd = redis::cmd("BITFIELD");
        cmd.arg(key).arg("SET").arg("u32").arg(bit_offset).arg(value);
        cmd
    }
}

#[async_trait]
impl CanvasBackend for RedisBackend {
    async fn set_u32(&self, key: &str, bit_offset: u64, value: u32) -> Result<()> {
        let mut conn = self.conn.clone();
        debug!(query = "redis", "BITFIELD {} SET u32 {} {}", key, bit_offset, value);

        Self::bitfield_set(key, bit_offset, value)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| Error::store(format!("Redis BITFIELD failed: {e}")))
    }

    async fn set_u32_batch(&self, key: &str, writes: &[(u64, u32)]) -> Result<()> {
        if writes.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        for (offset, value) in writes {
            pipe.add_command(Self::bitfield_set(key, *offset, *value)).ignore();
        }

        let mut conn = self.conn.clone();
        pipe.query_async::<()>(&mut conn)
            .await
            .map_err(|e| Error::store(format!("Redis BITFIELD pipeline failed: {e}")))?;

        debug!(query = "redis", key = %key, writes = writes.len(), "BITFIELD pipeline flushed");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        debug!(query = "redis", "GET {}", key);

        redis::cmd("GET")
            .arg(key)
            .query_async::<Option<Vec<u8>>>(&mut conn)
            .await
            .map_err(|e| Error::store(format!("Redis GET failed: {e}")))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        debug!(query = "redis", "DEL {}", key);

        let deleted: i64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::store(format!("Redis DEL failed: {e}")))?;

        debug!(key = %key, deleted = deleted > 0, "Canvas value deleted");
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: &[u8]) -> Result<usize> {
        let mut conn = self.conn.clone();

        let receivers: i64 = redis::cmd("PUBLISH")
            .arg(channel)
            .arg(payload)
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::store(format!("Redis PUBLISH failed: {e}")))?;

        Ok(usize::try_from(receivers).unwrap_or(0))
    }

    async fn subscribe(&self, channel: &str) -> Result<PayloadStream> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| Error::store(format!("Redis pub/sub connection failed: {e}")))?;

        pubsub
            .subscribe(channel)
            .await
            .map_err(|e| Error::store(format!("Redis SUBSCRIBE failed: {e}")))?;

        info!(channel = %channel, "Subscribed to Redis channel");

        // The message stream ends when the pub/sub connection drops
        let stream = pubsub
            .into_on_message()
            .map(|msg| Ok(msg.get_payload_bytes().to_vec()));

        Ok(Box::pin(stream))
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::store(format!("Redis PING failed: {e}")))?;
        Ok(())
    }
}
