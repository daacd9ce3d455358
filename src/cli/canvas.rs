//! Canvas maintenance commands
//!
//! Each command opens its own store connection, does one thing and exits.

use crate::server::config::AppConfig;
use crate::server::init_canvas;
use anyhow::{Context, Result};
use heximage_core::{DrawGateway, Pixel, TEST_PATTERN};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// `heximage init`
pub async fn init(config: &AppConfig) -> Result<()> {
    let services = init_canvas(config).await?;
    services
        .store
        .initialize()
        .await
        .context("Failed to initialize canvas")?;

    println!(
        "Initialized {} canvas at key {:?}",
        services.store.geometry(),
        services.store.key()
    );
    Ok(())
}

/// `heximage set <x> <y> <colour>`
pub async fn set(config: &AppConfig, x: &str, y: &str, colour: &str, broadcast: bool) -> Result<()> {
    let pixel = Pixel::parse(x, y, colour)?;
    let services = init_canvas(config).await?;

    if broadcast {
        let gateway = DrawGateway::new(services.store, services.feed);
        let outcome = gateway.handle_pixel(pixel).await?;
        if !outcome.published {
            warn!(pixel = %pixel, "Pixel set but live viewers were not notified");
        }
    } else {
        services.store.set_pixel(pixel.x, pixel.y, pixel.colour).await?;
    }

    info!(pixel = %pixel, broadcast, "Pixel set");
    println!("Set {}", pixel);
    Ok(())
}

/// `heximage get [--output FILE]`
pub async fn get(config: &AppConfig, output: Option<&Path>) -> Result<()> {
    let services = init_canvas(config).await?;
    let canvas = services
        .store
        .read_canvas()
        .await
        .context("Failed to read canvas")?;

    match output {
        Some(path) => {
            tokio::fs::write(path, canvas.as_bytes())
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), bytes = canvas.as_bytes().len(), "Canvas written");
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(canvas.as_bytes()).await?;
            stdout.flush().await?;
        }
    }
    Ok(())
}

/// `heximage clear`
///
/// Deletes the canvas, then recreates it at the configured size.
pub async fn clear(config: &AppConfig) -> Result<()> {
    let services = init_canvas(config).await?;
    services.store.clear().await.context("Failed to clear canvas")?;
    services
        .store
        .initialize()
        .await
        .context("Failed to initialize canvas")?;

    println!("Cleared {} canvas", services.store.geometry());
    Ok(())
}

/// `heximage test`
pub async fn test_pattern(config: &AppConfig) -> Result<()> {
    let services = init_canvas(config).await?;
    services
        .store
        .fill_test_pattern()
        .await
        .context("Failed to write test pattern")?;

    println!(
        "Filled {} canvas with {} colour test pattern",
        services.store.geometry(),
        TEST_PATTERN.len()
    );
    Ok(())
}
