//! Server configuration types
//!
//! Contains all configuration structures for the heximage server.

use anyhow::{Context, Result};
use heximage_core::{CanvasGeometry, HubConfig};
use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub canvas: CanvasConfig,
    #[serde(default)]
    pub hub: HubSettings,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_origins: Vec::new(),
        }
    }
}

/// Redis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
        }
    }
}

/// Canvas configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasConfig {
    #[serde(default = "default_dimension")]
    pub width: u32,
    #[serde(default = "default_dimension")]
    pub height: u32,
    /// Key holding the packed pixel buffer
    #[serde(default = "default_key")]
    pub key: String,
    /// Pub/sub topic for change messages
    #[serde(default = "default_updates_topic")]
    pub updates_topic: String,
}

fn default_dimension() -> u32 {
    50
}

fn default_key() -> String {
    "heximage".to_string()
}

fn default_updates_topic() -> String {
    "heximage:updates".to_string()
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: default_dimension(),
            height: default_dimension(),
            key: default_key(),
            updates_topic: default_updates_topic(),
        }
    }
}

impl CanvasConfig {
    pub fn geometry(&self) -> Result<CanvasGeometry> {
        CanvasGeometry::new(self.width, self.height).context("Invalid canvas dimensions")
    }
}

/// Broadcast hub sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubSettings {
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
    #[serde(default = "default_delivery_buffer")]
    pub delivery_buffer: usize,
}

fn default_subscriber_buffer() -> usize {
    64
}

fn default_delivery_buffer() -> usize {
    1024
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            subscriber_buffer: default_subscriber_buffer(),
            delivery_buffer: default_delivery_buffer(),
        }
    }
}

impl From<&HubSettings> for HubConfig {
    fn from(settings: &HubSettings) -> Self {
        Self {
            subscriber_buffer: settings.subscriber_buffer,
            delivery_buffer: settings.delivery_buffer,
        }
    }
}
