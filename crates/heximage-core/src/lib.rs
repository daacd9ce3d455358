//! Heximage Core - Live Update Hub
//!
//! This crate provides the concurrency and data-consistency core of heximage,
//! a shared "place"-style pixel board:
//! - Canvas: Canvas geometry and the packed RGBA buffer
//! - Pixel: The canonical draw-request grammar and the `Pixel` value
//! - Backend: The key-value store seam (Redis and in-memory implementations)
//! - Store: `PixelStore`, atomic single-pixel writes into the packed buffer
//! - Feed: `ChangeFeed`, one pub/sub message per accepted write
//! - Hub: `BroadcastHub`, single-owner fan-out to live subscribers
//! - Gateway: `DrawGateway`, validate, persist, then publish
//! - Error: Error types for canvas operations
//!
//! ## Usage
//!
//! ```ignore
//! use heximage_core::{
//!     backend, BroadcastHub, CanvasGeometry, ChangeFeed, DrawGateway, HubConfig, PixelStore,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! let backend = backend::open("redis://127.0.0.1:6379").await?;
//! let geometry = CanvasGeometry::new(50, 50)?;
//! let store = PixelStore::new(backend.clone(), geometry, "heximage");
//! let feed = ChangeFeed::new(backend, "heximage:updates");
//!
//! let cancel = CancellationToken::new();
//! let (hub, _tasks) = BroadcastHub::spawn(feed.clone(), HubConfig::default(), cancel.clone()).await?;
//! let gateway = DrawGateway::new(store, feed);
//!
//! gateway.handle_draw_json(r#"{"x":"1","y":"1","colour":"ff0000ff"}"#).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod canvas;
pub mod error;
pub mod feed;
pub mod gateway;
pub mod hub;
pub mod pixel;
pub mod store;

// Re-export main types
pub use backend::{CanvasBackend, MemoryBackend, RedisBackend, SharedBackend};
pub use canvas::{Canvas, CanvasGeometry, TEST_PATTERN};
pub use error::{Error, Result};
pub use feed::{ChangeFeed, ChangeMessage};
pub use gateway::{DrawGateway, DrawOutcome};
pub use hub::{BroadcastHub, HubConfig, HubHandle, HubTasks, SubscriberId, Subscription};
pub use pixel::{DrawRequest, NumericField, Pixel};
pub use store::PixelStore;
