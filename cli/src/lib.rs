//! `catalog`: browse a catalog export through the same list controller the
//! catalog page uses.

mod list_cmd;
pub mod logging;
mod templates_cmd;

use anyhow::Context;
use anyhow::Result;
use catalog_protocol::Entity;
use std::path::Path;

pub use list_cmd::ListArgs;
pub use templates_cmd::TemplatesArgs;

/// Browse a catalog export from the terminal.
#[derive(Debug, clap::Parser)]
#[command(name = "catalog", version)]
pub struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub subcommand: Subcommand,
}

#[derive(Debug, clap::Subcommand)]
pub enum Subcommand {
    /// Filter catalog entities the way the catalog page does.
    List(ListArgs),

    /// Show template cards for the templates in a catalog export.
    Templates(TemplatesArgs),
}

pub async fn run(cli: Cli) -> Result<()> {
    logging::init_logging(cli.verbose)?;
    match cli.subcommand {
        Subcommand::List(args) => list_cmd::run(args).await,
        Subcommand::Templates(args) => templates_cmd::run(args).await,
    }
}

pub(crate) fn read_entities(path: &Path) -> Result<Vec<Entity>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    catalog_backend_client::InMemoryCatalog::parse_entities(&raw)
        .with_context(|| format!("failed to parse entities from {}", path.display()))
}
