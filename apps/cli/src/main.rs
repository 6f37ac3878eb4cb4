//! blockdocs CLI: publishing toolkit for a blockchain docs site.
//!
//! Summarizes markdown articles with an LLM, publishes them, keeps published
//! copies current, and maintains term and cross-article links.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
