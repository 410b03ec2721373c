//! RwaDiscount CLI - inspect and exercise the caching agent against an origin.
//!
//! # Usage
//!
//! ```bash
//! # Print the agent descriptor a server publishes
//! rwa-cli descriptor --origin http://127.0.0.1:3000
//!
//! # Install the agent in-process, then replay requests
//! rwa-cli simulate --origin http://127.0.0.1:3000 / /offline.html /icons/icon-192x192.png
//!
//! # Same, with the network cut after install
//! rwa-cli simulate --origin http://127.0.0.1:3000 --offline / /assets/app.js
//! ```
//!
//! # Commands
//!
//! - `descriptor` - Fetch and print the agent descriptor
//! - `simulate` - Register the agent and replay fetches

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use url::Url;

mod commands;

#[derive(Parser)]
#[command(name = "rwa-cli")]
#[command(author, version, about = "RwaDiscount caching agent tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and print the agent descriptor
    Descriptor {
        /// Origin serving the app
        #[arg(short, long, default_value = "http://127.0.0.1:3000")]
        origin: Url,
    },
    /// Register the agent in-process and replay fetches through it
    Simulate {
        /// Origin serving the app
        #[arg(short, long, default_value = "http://127.0.0.1:3000")]
        origin: Url,

        /// Cut the network after install
        #[arg(long)]
        offline: bool,

        /// Paths to request, in order
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Descriptor { origin } => commands::descriptor::print(&origin).await?,
        Commands::Simulate {
            origin,
            offline,
            paths,
        } => commands::simulate::run(&origin, offline, &paths).await?,
    }
    Ok(())
}
