//! entangle - Command-line client for Entangle RPC
//!
//! Calls remote methods and decodes captured frames.

mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use entangle_client::{Client, ConnectionConfig};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "entangle")]
#[command(about = "Command-line client for Entangle RPC servers")]
#[command(version)]
struct Cli {
    /// Server address as HOST:PORT
    #[arg(short, long, env = "ENTANGLE_SERVER", default_value = "127.0.0.1:6000")]
    server: String,

    /// Timeout for each connect attempt, in seconds
    #[arg(long, default_value = "10")]
    connect_timeout: u64,

    /// Extra connect attempts before giving up
    #[arg(long, default_value = "3")]
    reconnect_limit: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Call a remote method
    Call {
        /// Method name
        method: String,

        /// Arguments as JSON values (or @file.json to read from file)
        args: Vec<String>,

        /// Ask the server to attach a trace to the reply
        #[arg(long)]
        trace: bool,

        /// Send a notification and do not wait for a reply
        #[arg(long)]
        notify: bool,
    },

    /// Decode a hex-encoded frame
    Decode {
        /// Frame bytes as hex
        hex: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Decoding is local, no server connection needed
    if let Commands::Decode { hex } = &cli.command {
        match commands::decode(hex) {
            Ok(output) => println!("{}", output),
            Err(e) => {
                eprintln!("{}: {}", "Error".red(), e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let config = ConnectionConfig::new(cli.server)
        .with_connect_timeout(Duration::from_secs(cli.connect_timeout))
        .with_reconnect_limit(cli.reconnect_limit);
    tracing::debug!(
        "Using server {} (connect timeout {}s, reconnect limit {})",
        config.addr,
        config.connect_timeout.as_secs(),
        config.reconnect_limit
    );
    let mut client = Client::new(config);

    match commands::execute(&mut client, cli.command) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            let _ = client.close();
            std::process::exit(1);
        }
    }

    client.close()?;
    Ok(())
}
