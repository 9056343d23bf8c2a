use catalog_cli::Cli;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    catalog_cli::run(Cli::parse()).await
}
