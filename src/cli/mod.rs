//! CLI module for heximage
//!
//! Provides commands:
//! - `serve`: Run the HTTP + WebSocket server
//! - `init`, `clear`, `test`: Canvas maintenance
//! - `set`, `get`: Single pixel writes and full buffer reads

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod canvas;

/// heximage CLI
#[derive(Parser, Debug)]
#[command(name = "heximage")]
#[command(about = "Shared pixel canvas backed by Redis")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Redis URL, overriding configuration (`memory://` for an in-process store)
    #[arg(long, global = true, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the server
    Serve {
        /// Address to listen on, e.g. 0.0.0.0:8000
        #[arg(long)]
        listen_addr: Option<String>,
    },
    /// Create an empty canvas of the configured size
    Init,
    /// Set a single pixel
    Set {
        /// Column, starting at 1
        x: String,
        /// Row, starting at 1
        y: String,
        /// Colour as hex RRGGBBAA
        colour: String,
        /// Also publish the change to live viewers
        #[arg(long)]
        broadcast: bool,
    },
    /// Write the raw canvas buffer to stdout or a file
    Get {
        /// Output file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Erase the canvas and recreate it empty
    Clear,
    /// Fill the canvas with the test pattern
    Test,
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = crate::server::load_config()?;
    if let Some(url) = cli.redis_url {
        config.redis.url = url;
    }

    match cli.command {
        Some(Commands::Serve { listen_addr }) => crate::server::run(config, listen_addr).await,
        Some(Commands::Init) => canvas::init(&config).await,
        Some(Commands::Set {
            x,
            y,
            colour,
            broadcast,
        }) => canvas::set(&config, &x, &y, &colour, broadcast).await,
        Some(Commands::Get { output }) => canvas::get(&config, output.as_deref()).await,
        Some(Commands::Clear) => canvas::clear(&config).await,
        Some(Commands::Test) => canvas::test_pattern(&config).await,
        None => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set_with_broadcast() {
        let cli = Cli::parse_from(["heximage", "set", "3", "4", "ff0000ff", "--broadcast"]);
        match cli.command {
            Some(Commands::Set {
                x,
                y,
                colour,
                broadcast,
            }) => {
                assert_eq!((x.as_str(), y.as_str(), colour.as_str()), ("3", "4", "ff0000ff"));
                assert!(broadcast);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "heximage",
            "serve",
            "--listen-addr",
            "0.0.0.0:9000",
            "--debug",
            "--redis-url",
            "memory://",
        ]);
        assert!(cli.debug);
        assert_eq!(cli.redis_url.as_deref(), Some("memory://"));
        assert!(matches!(
            cli.command,
            Some(Commands::Serve { listen_addr: Some(ref addr) }) if addr == "0.0.0.0:9000"
        ));
    }

    #[test]
    fn test_cli_definition() {
        <Cli as clap::CommandFactory>::command().debug_assert();
    }
}
