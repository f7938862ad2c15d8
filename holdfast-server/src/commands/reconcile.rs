//! One-shot `reconcile` subcommand.

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
    runtime.reconciler.run_once(scope, Phase::Reconcile).await?;
    tracing::info!(?scope, "reconcile pass complete");
    Ok(())
}
