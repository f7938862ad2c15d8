//! Command-line surface: start the server, run one-shot
//! index/reconcile passes, emit the database schema, or materialize a
//! synthetic library from the current database state.

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "holdfast", about = "Holdfast media manager", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Runs the Reconciler's scheduled loops, the Download Tracker's poll
    /// loop, and the read-only HTTP surface until signaled to stop.
    Serve,

    /// Runs a single Index pass for one entity kind, then exits.
    Index {
        #[arg(value_enum)]
        entity: Entity,
    },

    /// Runs a single Reconcile pass for one entity kind, then exits.
    Reconcile {
        #[arg(value_enum)]
        entity: Entity,
    },

    /// Applies pending `sqlx` migrations to the configured database.
    Schema,

    /// Materializes a synthetic file tree under the configured library
    /// roots from the movies and episodes currently recorded as
    /// `Downloaded`, for exercising the importer without real downloads.
    DemoLibrary,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Entity {
    Movie,
    Series,
}
