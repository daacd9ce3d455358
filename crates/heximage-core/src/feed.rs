//! Change feed
//!
//! One message per accepted pixel write, carried on a pub/sub topic of the
//! same store that holds the canvas. Only `BroadcastHub` subscribes, once
//! per process; fan-out to viewers happens after the subscription, never by
//! opening one subscription per viewer.

use crate::backend::SharedBackend;
use crate::error::{Error, Result};
use crate::pixel::Pixel;
use futures::future;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use tracing::{debug, warn};

/// Serialized form of an accepted `Pixel`.
///
/// Holds the canonical JSON payload behind an `Arc`, so fanning one message
/// out to many subscribers never copies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeMessage {
    pixel: Pixel,
    payload: Arc<str>,
}

impl ChangeMessage {
    /// Encode a pixel
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if the pixel cannot be encoded.
    pub fn from_pixel(pixel: Pixel) -> Result<Self> {
        let payload =
            serde_json::to_string(&pixel).map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(Self {
            pixel,
            payload: payload.into(),
        })
    }

    /// Decode a payload received from the topic
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if the bytes are not a change message.
    pub fn from_payload(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| Error::Serialization(format!("change message is not UTF-8: {e}")))?;
        let pixel = Pixel::from_json(text)
            .map_err(|e| Error::Serialization(format!("invalid change message: {e}")))?;
        Ok(Self {
            pixel,
            payload: text.into(),
        })
    }

    /// The pixel this message announces
    #[must_use]
    pub fn pixel(&self) -> Pixel {
        self.pixel
    }

    /// JSON payload as sent on the wire
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.payload
    }
}

/// Stream of change messages; an `Err` item is terminal
pub type ChangeStream = BoxStream<'static, Result<ChangeMessage>>;

/// Publish/subscribe channel for accepted writes
#[derive(Clone)]
pub struct ChangeFeed {
    backend: SharedBackend,
    topic: String,
}

impl ChangeFeed {
    /// Create a feed on `topic`
    #[must_use]
    pub fn new(backend: SharedBackend, topic: impl Into<String>) -> Self {
        Self {
            backend,
            topic: topic.into(),
        }
    }

    /// Topic name
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Announce a persisted pixel. Call only after `PixelStore::set_pixel`
    /// succeeded.
    ///
    /// # Errors
    ///
    /// Returns `Error::StoreUnavailable` if the publish fails.
    pub async fn publish(&self, pixel: Pixel) -> Result<()> {
        let message = ChangeMessage::from_pixel(pixel)?;
        let receivers = self
            .backend
            .publish(&self.topic, message.as_str().as_bytes())
            .await?;
        debug!(topic = %self.topic, pixel = %pixel, receivers, "Change published");
        Ok(())
    }

    /// Open a fresh subscription, with no backlog replay.
    ///
    /// The stream is infinite while the store connection holds. Payloads that
    /// do not decode are skipped. When the underlying subscription fails or
    /// ends, the stream yields one `Error::SubscriptionTerminated` and stops.
    ///
    /// # Errors
    ///
    /// Returns `Error::StoreUnavailable` if the subscription cannot be opened.
    pub async fn subscribe(&self) -> Result<ChangeStream> {
        let topic = self.topic.clone();
        let payloads = self.backend.subscribe(&self.topic).await?;

        let messages = payloads.filter_map(move |item| {
            let topic = topic.clone();
            async move {
                match item {
                    Ok(bytes) => match ChangeMessage::from_payload(&bytes) {
                        Ok(message) => Some(Ok(message)),
                        Err(e) => {
                            warn!(topic = %topic, error = %e, "Skipping malformed change message");
                            None
                        }
                    },
                    Err(e) => Some(Err(Error::terminated(e.to_string()))),
                }
            }
        });

        let closed = stream::once(async { Err(Error::terminated("change feed closed")) });

        let terminal_once = messages.chain(closed).scan(false, |terminated, item| {
            if *terminated {
                return future::ready(None);
            }
            *terminated = item.is_err();
            future::ready(Some(item))
        });

        Ok(Box::pin(terminal_once))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{CanvasBackend, MemoryBackend};

    #[test]
    fn test_message_round_trip() {
        let message = ChangeMessage::from_pixel(Pixel::new(2, 3, 0x00FF00FF)).unwrap();
        assert_eq!(message.as_str(), r#"{"x":2,"y":3,"colour":"00ff00ff"}"#);

        let decoded = ChangeMessage::from_payload(message.as_str().as_bytes()).unwrap();
        assert_eq!(decoded.pixel(), Pixel::new(2, 3, 0x00FF00FF));
    }

    #[test]
    fn test_message_rejects_garbage() {
        let err = ChangeMessage::from_payload(b"\xff\xfe").unwrap_err();
        assert_eq!(err.code(), "serialization_error");
        let err = ChangeMessage::from_payload(b"{}").unwrap_err();
        assert_eq!(err.code(), "serialization_error");
    }

    #[tokio::test]
    async fn test_publish_subscribe() {
        let backend = Arc::new(MemoryBackend::new());
        let feed = ChangeFeed::new(backend, "heximage:updates");
        let mut stream = feed.subscribe().await.unwrap();

        feed.publish(Pixel::new(1, 1, 0xFF)).await.unwrap();

        let message = stream.next().await.unwrap().unwrap();
        assert_eq!(message.pixel(), Pixel::new(1, 1, 0xFF));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_skipped() {
        let backend = Arc::new(MemoryBackend::new());
        let feed = ChangeFeed::new(backend.clone(), "t");
        let mut stream = feed.subscribe().await.unwrap();

        backend.publish("t", b"garbage").await.unwrap();
        feed.publish(Pixel::new(1, 2, 3)).await.unwrap();

        let message = stream.next().await.unwrap().unwrap();
        assert_eq!(message.pixel(), Pixel::new(1, 2, 3));
    }

    #[tokio::test]
    async fn test_closed_subscription_is_terminal() {
        let backend = Arc::new(MemoryBackend::new());
        let feed = ChangeFeed::new(backend.clone(), "t");
        let mut stream = feed.subscribe().await.unwrap();

        backend.close_topic("t");

        let err = stream.next().await.unwrap().unwrap_err();
        assert_eq!(err.code(), "subscription_terminated");
        assert!(stream.next().await.is_none());
    }
}
