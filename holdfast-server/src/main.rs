//! Holdfast media manager: CLI entrypoint over the reconciliation core.
//!
//! Parses the command line, loads configuration, builds the collaborators
//! each subcommand needs (see [`runtime`]), and dispatches.

mod cli;
mod commands;
mod http;
mod runtime;

use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "holdfast_server=info,holdfast_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = holdfast_config::ConfigLoader::load()?;

    match cli.command {
        Command::Serve => commands::serve::run(config).await,
        Command::Index { entity } => commands::index::run(config, entity).await,
        Command::Reconcile { entity } => commands::reconcile::run(config, entity).await,
        Command::Schema => commands::schema::run(config).await,
        Command::DemoLibrary => commands::demo_library::run(config).await,
    }
}
