use super::{CanvasBackend, PayloadStream};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};

/// Buffered payloads per topic before a slow subscriber is cut off
const TOPIC_CAPACITY: usize = 1024;

/// In-process backend (for development/testing)
///
/// Emulates the Redis semantics the core relies on: `set_u32` behaves like
/// `BITFIELD key SET u32 <offset> <value>` (big-endian, zero-extending), and
/// topics fan out to every live subscriber with no backlog.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    values: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    topics: Arc<Mutex<HashMap<String, broadcast::Sender<Vec<u8>>>>>,
}

impl MemoryBackend {
    /// Create an empty backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every subscription to `channel`, as if the store connection had
    /// been lost. Open subscription streams end.
    pub fn close_topic(&self, channel: &str) {
        if let Ok(mut topics) = self.topics.lock() {
            if topics.remove(channel).is_some() {
                debug!(channel = %channel, "Closed in-memory topic");
            }
        }
    }

    fn topic(&self, channel: &str) -> Result<broadcast::Sender<Vec<u8>>> {
        let mut topics = self
            .topics
            .lock()
            .map_err(|_| Error::store("in-memory topic table poisoned"))?;
        Ok(topics
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .clone())
    }
}

/// Write `value` big-endian at an arbitrary bit offset, growing `buf`
fn write_u32_bits(buf: &mut Vec<u8>, bit_offset: u64, value: u32) {
    let end_bit = bit_offset + 32;
    let needed = end_bit.div_ceil(8) as usize;
    if buf.len() < needed {
        buf.resize(needed, 0);
    }

    if bit_offset % 8 == 0 {
        let start = (bit_offset / 8) as usize;
        buf[start..start + 4].copy_from_slice(&value.to_be_bytes());
        return;
    }

    for i in 0..32u64 {
        let bit = (value >> (31 - i)) & 1;
        let pos = bit_offset + i;
        let byte = (pos / 8) as usize;
        let mask = 0x80u8 >> (pos % 8);
        if bit == 1 {
            buf[byte] |= mask;
        } else {
            buf[byte] &= !mask;
        }
    }
}

#[async_trait]
impl CanvasBackend for MemoryBackend {
    async fn set_u32(&self, key: &str, bit_offset: u64, value: u32) -> Result<()> {
        let mut values = self.values.write().await;
        write_u32_bits(values.entry(key.to_string()).or_default(), bit_offset, value);
        Ok(())
    }

    async fn set_u32_batch(&self, key: &str, writes: &[(u64, u32)]) -> Result<()> {
        if writes.is_empty() {
            return Ok(());
        }
        let mut values = self.values.write().await;
        let buf = values.entry(key.to_string()).or_default();
        for (offset, value) in writes {
            write_u32_bits(buf, *offset, *value);
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.values.write().await.remove(key);
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: &[u8]) -> Result<usize> {
        // No receivers is not an error, the message is simply dropped
        Ok(self.topic(channel)?.send(payload.to_vec()).unwrap_or(0))
    }

    async fn subscribe(&self, channel: &str) -> Result<PayloadStream> {
        let rx = self.topic(channel)?.subscribe();
        let channel = channel.to_string();

        let stream = futures::stream::unfold(Some(rx), move |state| {
            let channel = channel.clone();
            async move {
                let mut rx = state?;
                match rx.recv().await {
                    Ok(payload) => Some((Ok(payload), Some(rx))),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(channel = %channel, missed, "In-memory subscriber lagged");
                        Some((
                            Err(Error::terminated(format!(
                                "subscriber lagged behind by {missed} messages"
                            ))),
                            None,
                        ))
                    }
                    Err(broadcast::error::RecvError::Closed) => None,
                }
            }
        });

        Ok(Box::pin(stream))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_write_aligned() {
        let mut buf = Vec::new();
        write_u32_bits(&mut buf, 32, 0xDEADBEEF);
        assert_eq!(buf, vec![0, 0, 0, 0, 0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn test_write_unaligned_keeps_neighbours() {
        let mut buf = vec![0xFF; 6];
        write_u32_bits(&mut buf, 4, 0);
        assert_eq!(buf, vec![0xF0, 0x00, 0x00, 0x00, 0x0F, 0xFF]);
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let backend = MemoryBackend::new();
        backend.set_u32("k", 0, 0x01020304).await.unwrap();
        assert_eq!(backend.get("k").await.unwrap(), Some(vec![1, 2, 3, 4]));

        backend.delete("k").await.unwrap();
        assert_eq!(backend.get("k").await.unwrap(), None);
        backend.delete("k").await.unwrap();
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.publish("t", b"hello").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_subscribe_receives_after_subscribing_only() {
        let backend = MemoryBackend::new();
        backend.publish("t", b"before").await.unwrap();

        let mut stream = backend.subscribe("t").await.unwrap();
        assert_eq!(backend.publish("t", b"after").await.unwrap(), 1);

        let payload = stream.next().await.unwrap().unwrap();
        assert_eq!(payload, b"after".to_vec());
    }

    #[tokio::test]
    async fn test_close_topic_ends_stream() {
        let backend = MemoryBackend::new();
        let mut stream = backend.subscribe("t").await.unwrap();
        backend.close_topic("t");
        assert!(stream.next().await.is_none());
    }
}
