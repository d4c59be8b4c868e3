use anyhow::Context;
use clap::Parser;
use smna_armobs::cli::{run, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run(cli).await.context("smna-armobs failed")
}
