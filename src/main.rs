use anyhow::Result;
use clap::Parser;

use adscope::cli::{self, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    cli::run(Cli::parse()).await
}
