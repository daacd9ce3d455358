//! Canvas geometry and the packed pixel buffer
//!
//! The canvas is one contiguous buffer of `width * height * 4` bytes. Each
//! pixel is a 32-bit colour stored big-endian, so the bytes read `R, G, B, A`
//! and `0xFF0000FF` is opaque red. Coordinates are 1-indexed.

use crate::error::{Error, Result};

/// Bytes per pixel in the packed buffer
pub const BYTES_PER_PIXEL: usize = 4;

/// Bits per pixel, the width of one bit-range SET
pub const BITS_PER_PIXEL: u64 = 32;

/// Colour cycle written by the diagnostic test pattern, in order
pub const TEST_PATTERN: [u32; 3] = [0xFF0F00FF, 0xF99F00FF, 0xF0FF00FF];

/// Redis strings are capped at 512 MiB
const MAX_BUFFER_LEN: u64 = 512 * 1024 * 1024;

/// Fixed dimensions of the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanvasGeometry {
    width: u32,
    height: u32,
}

impl CanvasGeometry {
    /// Create a geometry, rejecting empty or oversized canvases
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if either dimension is zero or the
    /// buffer would not fit in a single store value.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::Configuration(format!(
                "canvas dimensions must be non-zero, got {width}x{height}"
            )));
        }

        let len = u128::from(width) * u128::from(height) * BYTES_PER_PIXEL as u128;
        if len > u128::from(MAX_BUFFER_LEN) {
            return Err(Error::Configuration(format!(
                "canvas {width}x{height} needs {len} bytes, above the {MAX_BUFFER_LEN} byte limit"
            )));
        }

        Ok(Self { width, height })
    }

    /// Canvas width in pixels
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Canvas height in pixels
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of pixels on the canvas
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Canonical buffer length in bytes
    #[must_use]
    pub fn buffer_len(&self) -> usize {
        self.pixel_count() * BYTES_PER_PIXEL
    }

    /// Whether `(x, y)` lies on the canvas
    #[must_use]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x != 0 && y != 0 && x <= self.width && y <= self.height
    }

    /// Fail with `OutOfBounds` unless `(x, y)` lies on the canvas
    ///
    /// # Errors
    ///
    /// Returns `Error::OutOfBounds` for a zero or too-large coordinate.
    pub fn check(&self, x: u32, y: u32) -> Result<()> {
        if self.contains(x, y) {
            Ok(())
        } else {
            Err(Error::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            })
        }
    }

    /// Row-major pixel index, only meaningful for coordinates on the canvas
    fn index(&self, x: u32, y: u32) -> u64 {
        u64::from(y - 1) * u64::from(self.width) + u64::from(x - 1)
    }

    /// Bit offset of the pixel for a bit-range SET
    #[must_use]
    pub fn bit_offset(&self, x: u32, y: u32) -> u64 {
        self.index(x, y) * BITS_PER_PIXEL
    }

    /// Byte offset of the pixel in the flat buffer
    #[must_use]
    pub fn byte_offset(&self, x: u32, y: u32) -> usize {
        self.index(x, y) as usize * BYTES_PER_PIXEL
    }

    /// All coordinates in row-major order, `(1,1), (2,1), ..`
    pub fn coordinates(&self) -> impl Iterator<Item = (u32, u32)> {
        let width = self.width;
        (1..=self.height).flat_map(move |y| (1..=width).map(move |x| (x, y)))
    }
}

impl Default for CanvasGeometry {
    fn default() -> Self {
        Self {
            width: 50,
            height: 50,
        }
    }
}

impl std::fmt::Display for CanvasGeometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Snapshot of the whole canvas, always exactly `buffer_len()` bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    geometry: CanvasGeometry,
    data: Vec<u8>,
}

impl Canvas {
    /// All-zero canvas
    #[must_use]
    pub fn blank(geometry: CanvasGeometry) -> Self {
        Self {
            geometry,
            data: vec![0; geometry.buffer_len()],
        }
    }

    /// Build a snapshot from the raw stored value.
    ///
    /// An absent or short value is zero-padded and a long one is truncated,
    /// so the result always has the canonical length.
    #[must_use]
    pub fn from_raw(geometry: CanvasGeometry, raw: Option<Vec<u8>>) -> Self {
        let mut data = raw.unwrap_or_default();
        data.resize(geometry.buffer_len(), 0);
        Self { geometry, data }
    }

    /// Canvas dimensions
    #[must_use]
    pub fn geometry(&self) -> CanvasGeometry {
        self.geometry
    }

    /// Raw packed buffer
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Take the raw packed buffer
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Colour at `(x, y)`, or `None` off the canvas
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if !self.geometry.contains(x, y) {
            return None;
        }
        let offset = self.geometry.byte_offset(x, y);
        let bytes: [u8; BYTES_PER_PIXEL] = self.data[offset..offset + BYTES_PER_PIXEL]
            .try_into()
            .ok()?;
        Some(u32::from_be_bytes(bytes))
    }

    /// Whether every byte is zero
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|b| *b == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_rejects_empty() {
        assert!(CanvasGeometry::new(0, 10).is_err());
        assert!(CanvasGeometry::new(10, 0).is_err());
        assert!(CanvasGeometry::new(1, 1).is_ok());
    }

    #[test]
    fn test_geometry_rejects_oversized() {
        let err = CanvasGeometry::new(u32::MAX, u32::MAX).unwrap_err();
        assert_eq!(err.code(), "configuration_error");
    }

    #[test]
    fn test_offsets() {
        let g = CanvasGeometry::new(3, 3).unwrap();
        assert_eq!(g.byte_offset(1, 1), 0);
        assert_eq!(g.byte_offset(2, 2), 16);
        assert_eq!(g.byte_offset(3, 3), 32);
        assert_eq!(g.bit_offset(2, 2), 128);
        assert_eq!(g.buffer_len(), 36);
    }

    #[test]
    fn test_contains_edges() {
        let g = CanvasGeometry::new(4, 2).unwrap();
        assert!(g.contains(1, 1));
        assert!(g.contains(4, 2));
        assert!(!g.contains(0, 1));
        assert!(!g.contains(1, 0));
        assert!(!g.contains(5, 1));
        assert!(!g.contains(1, 3));
    }

    #[test]
    fn test_coordinates_row_major() {
        let g = CanvasGeometry::new(2, 2).unwrap();
        let coords: Vec<_> = g.coordinates().collect();
        assert_eq!(coords, vec![(1, 1), (2, 1), (1, 2), (2, 2)]);
    }

    #[test]
    fn test_from_raw_pads_and_truncates() {
        let g = CanvasGeometry::new(2, 1).unwrap();

        let canvas = Canvas::from_raw(g, None);
        assert_eq!(canvas.as_bytes(), &[0; 8]);

        let canvas = Canvas::from_raw(g, Some(vec![0xFF, 0, 0, 0xFF]));
        assert_eq!(canvas.as_bytes().len(), 8);
        assert_eq!(canvas.pixel(1, 1), Some(0xFF0000FF));
        assert_eq!(canvas.pixel(2, 1), Some(0));

        let canvas = Canvas::from_raw(g, Some(vec![1; 20]));
        assert_eq!(canvas.as_bytes().len(), 8);
    }

    #[test]
    fn test_pixel_off_canvas() {
        let canvas = Canvas::blank(CanvasGeometry::new(2, 2).unwrap());
        assert_eq!(canvas.pixel(0, 1), None);
        assert_eq!(canvas.pixel(3, 1), None);
        assert!(canvas.is_blank());
    }
}
