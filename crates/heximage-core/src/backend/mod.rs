//! Key-value store backends
//!
//! The core needs four operation shapes from its store: an atomic bit-range
//! SET on a binary value, a plain GET and DEL on the same key, and
//! PUBLISH/SUBSCRIBE on a topic. `CanvasBackend` captures exactly those.
//!
//! - `RedisBackend` is the production backend (`BITFIELD`, `GET`, `DEL`,
//!   `PUBLISH`, `SUBSCRIBE`)
//! - `MemoryBackend` keeps everything in-process, for tests and local
//!   development. Data is lost on restart.

mod memory;
mod redis_backend;

pub use memory::MemoryBackend;
pub use redis_backend::RedisBackend;

use crate::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;
use tracing::info;

/// Stream of raw payloads from a pub/sub topic.
///
/// An `Err` item or the end of the stream means the subscription is gone.
pub type PayloadStream = BoxStream<'static, Result<Vec<u8>>>;

/// Backend handle shared by `PixelStore`, `ChangeFeed` and `DrawGateway`
pub type SharedBackend = Arc<dyn CanvasBackend>;

/// Store operations the live update hub depends on
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CanvasBackend: Send + Sync {
    /// Atomically write a big-endian `u32` at `bit_offset` inside `key`,
    /// growing the value with zero bytes as needed
    async fn set_u32(&self, key: &str, bit_offset: u64, value: u32) -> Result<()>;

    /// Send many `set_u32` writes in one round trip. Each write is atomic on
    /// its own; the batch as a whole is not.
    async fn set_u32_batch(&self, key: &str, writes: &[(u64, u32)]) -> Result<()>;

    /// Read the whole value, `None` if the key does not exist
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete the value. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Publish a payload, returning how many subscribers received it
    async fn publish(&self, channel: &str, payload: &[u8]) -> Result<usize>;

    /// Open a fresh subscription to `channel`, without backlog
    async fn subscribe(&self, channel: &str) -> Result<PayloadStream>;

    /// Round-trip check used by health reporting
    async fn ping(&self) -> Result<()>;
}

/// Open a backend from a URL.
///
/// `memory://` selects the in-process backend, anything else is handed to
/// the Redis client (`redis://`, `rediss://`, `unix://`).
///
/// # Errors
///
/// Returns `Error::StoreUnavailable` if the URL is invalid or the store
/// does not answer a PING.
pub async fn open(url: &str) -> Result<SharedBackend> {
    if url.starts_with("memory://") {
        info!("Using in-memory canvas backend, data is lost on restart");
        return Ok(Arc::new(MemoryBackend::new()));
    }

    let backend = RedisBackend::connect(url).await?;
    Ok(Arc::new(backend))
}
