mod auth;
mod cli;
mod config;
mod error;
mod output;
mod providers;
mod run_data;
mod timeline;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting actions-trace");
    cli.execute().await?;

    Ok(())
}
