// src/cli/mod.rs — CLI definition (clap derive)

pub mod chat;
pub mod migrate;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "winear", about = "Travel-personality interview service", version)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Default log level when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Bind address (overrides server.host)
        #[arg(long)]
        host: Option<String>,
        /// Port (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run an interview interactively in the terminal
    Chat {
        /// User the interview is for
        #[arg(short, long)]
        user: String,
    },
    /// Inspect or apply database migrations
    Migrate {
        /// Only show the current status
        #[arg(long)]
        status: bool,
        /// Revert the most recent migration
        #[arg(long, conflicts_with = "status")]
        rollback: bool,
    },
}
