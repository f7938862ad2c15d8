//! Selects an [`IndexerProvider`] variant from a stored `indexer_sources`
//! row's `kind`, instead of a caller hardcoding which provider to build
//! (spec.md §9).

use std::sync::Arc;

use crate::error::{CoreError, CoreResult};
use crate::indexer::gateway::IndexerProvider;
use crate::indexer::rate_limit::RateLimitConfig;
use crate::store::IndexerSourceConfig;

use super::prowlarr::ProwlarrProvider;

pub fn build_provider(
    source: &IndexerSourceConfig,
    http: reqwest::Client,
    rate_limit: RateLimitConfig,
) -> CoreResult<Arc<dyn IndexerProvider>> {
    match source.kind.as_str() {
        "prowlarr" => Ok(Arc::new(ProwlarrProvider::new(
            source.base_url.clone(),
            source.api_key.clone(),
            source.id,
            source.name.clone(),
            source.priority,
            source.categories.clone(),
            http,
            rate_limit,
        ))),
        other => Err(CoreError::invalid(format!("unrecognized indexer_sources.kind {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use holdfast_model::IndexerId;

    fn source(kind: &str) -> IndexerSourceConfig {
        IndexerSourceConfig {
            id: IndexerId::new(1),
            name: "primary".into(),
            kind: kind.into(),
            priority: 0,
            base_url: "http://localhost:9696".into(),
            api_key: "key".into(),
            categories: vec![2000, 5000],
            enabled: true,
        }
    }

    #[test]
    fn prowlarr_kind_builds_a_provider() {
        assert!(build_provider(&source("prowlarr"), reqwest::Client::new(), RateLimitConfig::default()).is_ok());
    }

    #[test]
    fn unrecognized_kind_is_rejected() {
        assert!(build_provider(&source("newznab"), reqwest::Client::new(), RateLimitConfig::default()).is_err());
    }
}
