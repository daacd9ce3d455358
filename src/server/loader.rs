//! Configuration loading
//!
//! Sources, lowest priority first: the embedded `config/default.toml`, then
//! optional `config/default`, `config/{HEXIMAGE_ENV}` and `config/local`
//! files, then `HEXIMAGE_*` environment variables.

use super::config::AppConfig;
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};

/// Embedded default configuration (compiled into binary)
pub const DEFAULT_CONFIG: &str = include_str!("../../config/default.toml");

const ENV_PREFIX: &str = "HEXIMAGE";

fn profile() -> String {
    std::env::var("HEXIMAGE_ENV").unwrap_or_else(|_| "development".to_string())
}

/// `HEXIMAGE_CANVAS__WIDTH=64` sets `canvas.width`;
/// `HEXIMAGE_SERVER__CORS_ORIGINS=a,b` sets a list.
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("server.cors_origins")
        .try_parsing(true)
}

/// Load configuration from files and environment
pub fn load_config() -> Result<AppConfig> {
    let files = [
        "config/default".to_string(),
        format!("config/{}", profile()),
        "config/local".to_string(),
    ];

    let builder = files.iter().fold(
        Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml)),
        |builder, name| builder.add_source(File::with_name(name).required(false)),
    );

    builder
        .add_source(environment())
        .build()
        .context("Failed to build configuration")?
        .try_deserialize()
        .context("Failed to deserialize configuration")
}
