//! `schema` subcommand: applies pending migrations and exits. Kept as the
//! single place DDL is applied, so the schema can never drift from the
//! migration files under `holdfast-core/migrations/`.

use holdfast_config::Config;
use sqlx::postgres::PgPoolOptions;

pub async fn run(config: Config) -> anyhow::Result<()> {
    let pool = PgPoolOptions::new().max_connections(1).connect(&config.storage.database_url).await?;

    sqlx::migrate!("../holdfast-core/migrations").run(&pool).await?;

    tracing::info!("schema up to date");
    Ok(())
}
