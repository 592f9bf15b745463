//! Shopify Insights CLI - Database migrations and webhook tooling.
//!
//! # Usage
//!
//! ```bash
//! # Run webhook database migrations
//! insights-cli migrate
//!
//! # Print the X-Shopify-Hmac-Sha256 value for a payload
//! insights-cli sign --file order.json
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `sign` - Sign a webhook body with `SHOPIFY_WEBHOOK_SECRET`

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "insights-cli")]
#[command(author, version, about = "Shopify Insights CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run webhook database migrations
    Migrate,
    /// Compute the webhook signature for a payload file
    Sign {
        /// Path to the raw JSON body
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Sign { file } => commands::sign::run(&file)?,
    }
    Ok(())
}
