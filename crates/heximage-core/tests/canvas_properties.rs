//! Canvas store properties against the in-memory backend
//!
//! These tests exercise the public API only:
//! - every valid coordinate round-trips through set/read
//! - out-of-bounds writes fail and leave the canvas untouched
//! - clear, initialize and the test pattern

use heximage_core::{Canvas, CanvasGeometry, MemoryBackend, PixelStore, SharedBackend, TEST_PATTERN};
use std::sync::Arc;

fn store(width: u32, height: u32) -> PixelStore {
    let backend: SharedBackend = Arc::new(MemoryBackend::new());
    PixelStore::new(backend, CanvasGeometry::new(width, height).unwrap(), "heximage")
}

fn colour_for(x: u32, y: u32) -> u32 {
    (x << 24) | (y << 16) | 0xFF
}

#[tokio::test]
async fn test_every_pixel_round_trips() {
    let store = store(7, 5);
    let geometry = store.geometry();

    for (x, y) in geometry.coordinates() {
        store.set_pixel(x, y, colour_for(x, y)).await.unwrap();
    }

    let canvas = store.read_canvas().await.unwrap();
    for (x, y) in geometry.coordinates() {
        let offset = ((y - 1) * geometry.width() + (x - 1)) as usize * 4;
        let bytes: [u8; 4] = canvas.as_bytes()[offset..offset + 4].try_into().unwrap();
        assert_eq!(u32::from_be_bytes(bytes), colour_for(x, y), "pixel ({x}, {y})");
    }
}

#[tokio::test]
async fn test_out_of_bounds_never_mutates() {
    let store = store(4, 3);
    store.set_pixel(2, 2, 0x12345678).await.unwrap();
    let before = store.read_canvas().await.unwrap();

    for (x, y) in [(0, 2), (2, 0), (5, 2), (2, 4), (0, 0), (u32::MAX, u32::MAX)] {
        let err = store.set_pixel(x, y, 0xFFFFFFFF).await.unwrap_err();
        assert_eq!(err.code(), "out_of_bounds", "({x}, {y})");
    }

    assert_eq!(store.read_canvas().await.unwrap(), before);
}

#[tokio::test]
async fn test_last_write_wins() {
    let store = store(2, 2);
    store.set_pixel(1, 2, 0x11111111).await.unwrap();
    store.set_pixel(1, 2, 0x22222222).await.unwrap();

    let canvas = store.read_canvas().await.unwrap();
    assert_eq!(canvas.pixel(1, 2), Some(0x22222222));
    assert_eq!(canvas.pixel(2, 1), Some(0));
}

#[tokio::test]
async fn test_concurrent_writers_do_not_interfere() {
    let store = store(10, 10);

    let writers: Vec<_> = store
        .geometry()
        .coordinates()
        .map(|(x, y)| {
            let store = store.clone();
            tokio::spawn(async move { store.set_pixel(x, y, colour_for(x, y)).await })
        })
        .collect();
    for writer in writers {
        writer.await.unwrap().unwrap();
    }

    let canvas = store.read_canvas().await.unwrap();
    for (x, y) in store.geometry().coordinates() {
        assert_eq!(canvas.pixel(x, y), Some(colour_for(x, y)));
    }
}

#[tokio::test]
async fn test_clear_after_any_state() {
    let store = store(3, 3);
    store.fill_test_pattern().await.unwrap();
    store.set_pixel(3, 3, 0xFFFFFFFF).await.unwrap();

    store.clear().await.unwrap();

    let canvas = store.read_canvas().await.unwrap();
    assert_eq!(canvas, Canvas::blank(store.geometry()));
}

#[tokio::test]
async fn test_initialize_then_read() {
    let store = store(4, 4);
    store.initialize().await.unwrap();

    let canvas = store.read_canvas().await.unwrap();
    assert_eq!(canvas.as_bytes().len(), 64);
    assert_eq!(canvas.pixel(4, 4), Some(0));
    assert!(canvas.is_blank());
}

#[tokio::test]
async fn test_never_initialized_read() {
    let store = store(50, 50);
    let canvas = store.read_canvas().await.unwrap();
    assert_eq!(canvas.as_bytes().len(), 50 * 50 * 4);
    assert!(canvas.is_blank());
}

#[tokio::test]
async fn test_pattern_cycles_row_major() {
    let store = store(4, 2);
    store.fill_test_pattern().await.unwrap();

    let canvas = store.read_canvas().await.unwrap();
    let colours: Vec<u32> = store
        .geometry()
        .coordinates()
        .map(|(x, y)| canvas.pixel(x, y).unwrap())
        .collect();

    let expected: Vec<u32> = TEST_PATTERN.iter().cycle().take(8).copied().collect();
    assert_eq!(colours, expected);
}
