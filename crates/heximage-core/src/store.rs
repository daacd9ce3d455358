//! Packed pixel store
//!
//! `PixelStore` keeps the canvas as one binary value in the backing store.
//! Single-pixel writes are one atomic bit-range SET each, so concurrent
//! writers never need a canvas-wide lock: different pixels never interfere,
//! and two writes to the same pixel are last-write-wins. The store adds no
//! locking of its own and does not assume exclusive access.

use crate::backend::SharedBackend;
use crate::canvas::{Canvas, CanvasGeometry, TEST_PATTERN};
use crate::error::Result;
use tracing::{debug, info};

/// Canvas persistence over a `CanvasBackend`
#[derive(Clone)]
pub struct PixelStore {
    backend: SharedBackend,
    geometry: CanvasGeometry,
    key: String,
}

impl PixelStore {
    /// Create a store for the canvas kept under `key`
    #[must_use]
    pub fn new(backend: SharedBackend, geometry: CanvasGeometry, key: impl Into<String>) -> Self {
        Self {
            backend,
            geometry,
            key: key.into(),
        }
    }

    /// Canvas dimensions
    #[must_use]
    pub fn geometry(&self) -> CanvasGeometry {
        self.geometry
    }

    /// Key holding the packed buffer
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Set one pixel. Does not publish a change message.
    ///
    /// # Errors
    ///
    /// Returns `Error::OutOfBounds` without touching the store if the
    /// coordinate is off the canvas, `Error::StoreUnavailable` if the write
    /// fails.
    pub async fn set_pixel(&self, x: u32, y: u32, colour: u32) -> Result<()> {
        self.geometry.check(x, y)?;
        self.backend
            .set_u32(&self.key, self.geometry.bit_offset(x, y), colour)
            .await
    }

    /// Read the whole canvas, zero-extended to the canonical length
    ///
    /// # Errors
    ///
    /// Returns `Error::StoreUnavailable` if the read fails.
    pub async fn read_canvas(&self) -> Result<Canvas> {
        let raw = self.backend.get(&self.key).await?;
        if let Some(data) = &raw {
            if data.len() != self.geometry.buffer_len() {
                debug!(
                    stored = data.len(),
                    canonical = self.geometry.buffer_len(),
                    "Canvas value length differs from canonical, normalizing"
                );
            }
        }
        Ok(Canvas::from_raw(self.geometry, raw))
    }

    /// Delete the backing value; later reads return an all-zero canvas
    ///
    /// # Errors
    ///
    /// Returns `Error::StoreUnavailable` if the delete fails.
    pub async fn clear(&self) -> Result<()> {
        self.backend.delete(&self.key).await?;
        info!(key = %self.key, "Canvas cleared");
        Ok(())
    }

    /// Delete, then write colour 0 at `(width, height)` so the stored value
    /// has the canonical length from the first read onward
    ///
    /// # Errors
    ///
    /// Returns `Error::StoreUnavailable` if either call fails.
    pub async fn initialize(&self) -> Result<()> {
        self.backend.delete(&self.key).await?;
        let (x, y) = (self.geometry.width(), self.geometry.height());
        self.backend
            .set_u32(&self.key, self.geometry.bit_offset(x, y), 0)
            .await?;
        info!(key = %self.key, geometry = %self.geometry, "Canvas initialized");
        Ok(())
    }

    /// Write the diagnostic pattern: `TEST_PATTERN` repeated row-major from
    /// `(1, 1)`, starting with its first colour
    ///
    /// # Errors
    ///
    /// Returns `Error::StoreUnavailable` if the batch fails.
    pub async fn fill_test_pattern(&self) -> Result<()> {
        let writes: Vec<(u64, u32)> = self
            .geometry
            .coordinates()
            .zip(TEST_PATTERN.iter().cycle())
            .map(|((x, y), colour)| (self.geometry.bit_offset(x, y), *colour))
            .collect();

        self.backend.set_u32_batch(&self.key, &writes).await?;
        info!(key = %self.key, pixels = writes.len(), "Test pattern written");
        Ok(())
    }
}
