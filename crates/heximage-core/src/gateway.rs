//! Draw gateway
//!
//! Validates inbound writes, persists them, then publishes them, in that
//! order. A failed write is never published. A publish that fails after a
//! successful write leaves the write committed: the canvas and what viewers
//! have seen may diverge until their next full read, and the outcome says so.

use crate::canvas::Canvas;
use crate::error::Result;
use crate::feed::ChangeFeed;
use crate::pixel::{DrawRequest, Pixel};
use crate::store::PixelStore;
use serde::Serialize;
use tracing::{debug, warn};

/// Result of an accepted draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DrawOutcome {
    /// The persisted pixel
    pub pixel: Pixel,
    /// Whether the change message reached the feed
    pub published: bool,
}

/// Entry point for pixel writes and canvas reads
#[derive(Clone)]
pub struct DrawGateway {
    store: PixelStore,
    feed: ChangeFeed,
}

impl DrawGateway {
    /// Create a gateway over a store and its feed
    #[must_use]
    pub fn new(store: PixelStore, feed: ChangeFeed) -> Self {
        Self { store, feed }
    }

    /// Underlying pixel store
    #[must_use]
    pub fn store(&self) -> &PixelStore {
        &self.store
    }

    /// Handle a structured draw request
    ///
    /// # Errors
    ///
    /// `Error::Parse` for malformed fields, `Error::OutOfBounds` for a
    /// coordinate off the canvas, `Error::StoreUnavailable` if persisting
    /// fails.
    pub async fn handle_draw(&self, request: DrawRequest) -> Result<DrawOutcome> {
        let pixel = request.into_pixel()?;
        self.handle_pixel(pixel).await
    }

    /// Handle a raw JSON draw message (HTTP body or WebSocket text frame)
    ///
    /// # Errors
    ///
    /// Same as `handle_draw`; malformed JSON is `Error::Parse`.
    pub async fn handle_draw_json(&self, raw: &str) -> Result<DrawOutcome> {
        let pixel = Pixel::from_json(raw)?;
        self.handle_pixel(pixel).await
    }

    /// Persist then publish an already-parsed pixel
    ///
    /// # Errors
    ///
    /// `Error::OutOfBounds` before any store call, `Error::StoreUnavailable`
    /// if persisting fails.
    pub async fn handle_pixel(&self, pixel: Pixel) -> Result<DrawOutcome> {
        self.store.geometry().check(pixel.x, pixel.y)?;
        self.store.set_pixel(pixel.x, pixel.y, pixel.colour).await?;

        let published = match self.feed.publish(pixel).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    pixel = %pixel,
                    error = %e,
                    "Pixel persisted but change was not published, viewers are stale until reload"
                );
                false
            }
        };

        debug!(pixel = %pixel, published, "Draw accepted");
        Ok(DrawOutcome { pixel, published })
    }

    /// Snapshot of the whole canvas
    ///
    /// # Errors
    ///
    /// Returns `Error::StoreUnavailable` if the read fails.
    pub async fn read_canvas(&self) -> Result<Canvas> {
        self.store.read_canvas().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBackend, MockCanvasBackend, SharedBackend};
    use crate::canvas::CanvasGeometry;
    use crate::error::Error;
    use futures::StreamExt;
    use std::sync::Arc;

    fn gateway(backend: SharedBackend) -> DrawGateway {
        let geometry = CanvasGeometry::new(3, 3).unwrap();
        DrawGateway::new(
            PixelStore::new(backend.clone(), geometry, "heximage"),
            ChangeFeed::new(backend, "heximage:updates"),
        )
    }

    #[tokio::test]
    async fn test_draw_persists_and_publishes() {
        let backend: SharedBackend = Arc::new(MemoryBackend::new());
        let gateway = gateway(backend.clone());
        let mut updates = ChangeFeed::new(backend, "heximage:updates")
            .subscribe()
            .await
            .unwrap();

        let outcome = gateway
            .handle_draw_json(r#"{"x":"2","y":"2","colour":"00FF00FF"}"#)
            .await
            .unwrap();
        assert!(outcome.published);
        assert_eq!(outcome.pixel, Pixel::new(2, 2, 0x00FF00FF));

        let canvas = gateway.read_canvas().await.unwrap();
        assert_eq!(canvas.pixel(2, 2), Some(0x00FF00FF));

        let message = updates.next().await.unwrap().unwrap();
        assert_eq!(message.pixel(), outcome.pixel);
    }

    #[tokio::test]
    async fn test_parse_error_touches_nothing() {
        let gateway = gateway(Arc::new(MockCanvasBackend::new()));
        let err = gateway
            .handle_draw_json(r#"{"x":"one","y":"2","colour":"ff"}"#)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "parse_error");
    }

    #[tokio::test]
    async fn test_out_of_bounds_touches_nothing() {
        let gateway = gateway(Arc::new(MockCanvasBackend::new()));
        let err = gateway.handle_pixel(Pixel::new(4, 1, 0xFF)).await.unwrap_err();
        assert!(matches!(err, Error::OutOfBounds { x: 4, y: 1, .. }));
    }

    #[tokio::test]
    async fn test_failed_persist_is_not_published() {
        let mut mock = MockCanvasBackend::new();
        mock.expect_set_u32()
            .times(1)
            .returning(|_, _, _| Err(Error::store("READONLY")));
        mock.expect_publish().never();

        let gateway = gateway(Arc::new(mock));
        let err = gateway.handle_pixel(Pixel::new(1, 1, 0xFF)).await.unwrap_err();
        assert_eq!(err.code(), "store_unavailable");
    }

    #[tokio::test]
    async fn test_failed_publish_still_commits() {
        let mut mock = MockCanvasBackend::new();
        let mut seq = mockall::Sequence::new();
        mock.expect_set_u32()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|key, offset, colour| key == "heximage" && *offset == 128 && *colour == 0xAB)
            .returning(|_, _, _| Ok(()));
        mock.expect_publish()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(Error::store("connection reset")));

        let gateway = gateway(Arc::new(mock));
        let outcome = gateway.handle_pixel(Pixel::new(2, 2, 0xAB)).await.unwrap();
        assert!(!outcome.published);
        assert_eq!(outcome.pixel, Pixel::new(2, 2, 0xAB));
    }

    #[tokio::test]
    async fn test_structured_request() {
        let gateway = gateway(Arc::new(MemoryBackend::new()));
        let request: DrawRequest =
            serde_json::from_str(r#"{"x":3,"y":3,"colour":"0000ffff"}"#).unwrap();
        let outcome = gateway.handle_draw(request).await.unwrap();
        assert_eq!(outcome.pixel, Pixel::new(3, 3, 0x0000FFFF));
    }
}
