//! One-shot `index` subcommand.

use holdfast_config::Config;
use holdfast_core::reconciler::{EntityScope, Phase};

use crate::cli::Entity;
use crate::runtime::Runtime;

pub async fn run(config: Config, entity: Entity) -> anyhow::Result<()> {
    let runtime = Runtime::build(config).await?;
    let scope = match entity {
        Entity::Movie => EntityScope::Movie,
        Entity::Series => EntityScope::Series,
    };
    runtime.reconciler.run_once(scope, Phase::Index).await?;
    tracing::info!(?scope, "index pass complete");
    Ok(())
}
