//! Server module for heximage
//!
//! Contains the main server initialization and runtime logic.
//!
//! # Module Structure
//!
//! - `config`: Configuration structures for all server components
//! - `loader`: Configuration loading from files and environment
//! - `init`: Store wiring, router construction and the run loop
//! - `shutdown`: Ctrl+C / SIGTERM handling

pub mod config;
mod init;
mod loader;
mod shutdown;

// Re-export public API
pub use init::{init_canvas, run};
pub use loader::load_config;
