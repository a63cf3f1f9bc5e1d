//! Binary crate for the `skydash` Discord bot.
//!
//! This crate focuses on:
//! - Parsing CLI arguments and interactive configuration
//! - Adapting the core controller to Discord interactions
//! - The health-check page hosting platforms poll

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod discord;
mod health;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; real deployments set the environment directly.
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skydash=info,skydash_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cmd = cli::Cli::parse();
    cmd.run().await
}
