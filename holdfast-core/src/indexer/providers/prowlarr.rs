//! A Prowlarr-compatible JSON indexer provider. Required query parameters:
//! `apikey`, `query`, `categories`, `indexerIds`, `limit`.

use async_trait::async_trait;
use holdfast_model::{IndexerId, Protocol};
use serde::Deserialize;

use crate::domain::Release;
use crate::error::CoreResult;
use crate::indexer::gateway::{IndexerDescriptor, IndexerProvider, QuerySpec};
use crate::indexer::rate_limit::{RateLimitConfig, RateLimiter, RetryHint};

#[derive(Debug, Deserialize)]
struct ApiRelease {
    title: String,
    guid: Option<String>,
    #[serde(rename = "downloadUrl")]
    download_url: Option<String>,
    size: u64,
    seeders: Option<u32>,
    protocol: Option<String>,
    categories: Option<Vec<ApiCategory>>,
    #[serde(rename = "tmdbId")]
    tmdb_id: Option<i64>,
    season: Option<u16>,
    episode: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct ApiCategory {
    id: u32,
}

pub struct ProwlarrProvider {
    base_url: String,
    api_key: String,
    indexer_id: IndexerId,
    name: String,
    priority: i32,
    categories: Vec<u32>,
    client: reqwest::Client,
    limiter: RateLimiter,
}

impl ProwlarrProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        indexer_id: IndexerId,
        name: impl Into<String>,
        priority: i32,
        categories: Vec<u32>,
        client: reqwest::Client,
        rate_limit: RateLimitConfig,
    ) -> Self {
        ProwlarrProvider {
            base_url: base_url.into(),
            api_key: api_key.into(),
            indexer_id,
            name: name.into(),
            priority,
            categories,
            client,
            limiter: RateLimiter::new(rate_limit),
        }
    }
}

#[async_trait]
impl IndexerProvider for ProwlarrProvider {
    fn descriptor(&self) -> IndexerDescriptor {
        IndexerDescriptor {
            id: self.indexer_id,
            name: self.name.clone(),
            priority: self.priority,
            categories: self.categories.clone(),
        }
    }

    async fn search(&self, categories: &[u32], query: &QuerySpec) -> CoreResult<Vec<Release>> {
        let category_csv = categories
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");

        let indexer_id_str = self.indexer_id.get().to_string();
        let result = self
            .limiter
            .call(|| async {
                let response = self
                    .client
                    .get(format!("{}/api/v1/search", self.base_url))
                    .query(&[
                        ("apikey", self.api_key.as_str()),
                        ("query", query.title.as_str()),
                        ("categories", category_csv.as_str()),
                        ("indexerIds", indexer_id_str.as_str()),
                        ("limit", "100"),
                    ])
                    .send()
                    .await
                    .map_err(|e| RetryHint::Terminal(e.to_string()))?;

                if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    let retry_after = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse::<u64>().ok());
                    return match retry_after {
                        Some(secs) => Err(RetryHint::After(std::time::Duration::from_secs(secs))),
                        None => Err(RetryHint::Backoff),
                    };
                }

                if !response.status().is_success() {
                    return Err(RetryHint::Terminal(format!(
                        "prowlarr-like indexer returned {}",
                        response.status()
                    )));
                }

                response
                    .json::<Vec<ApiRelease>>()
                    .await
                    .map_err(|e| RetryHint::Terminal(e.to_string()))
            })
            .await?;

        Ok(result
            .into_iter()
            .map(|r| self.normalize(r))
            .collect())
    }
}

impl ProwlarrProvider {
    fn normalize(&self, api: ApiRelease) -> Release {
        Release {
            external_id: api.guid.clone().unwrap_or_default(),
            title: api.title,
            size_bytes: api.size,
            seeders: api.seeders,
            protocol: match api.protocol.as_deref() {
                Some("usenet") => Protocol::Usenet,
                _ => Protocol::Torrent,
            },
            indexer_id: self.indexer_id,
            categories: api
                .categories
                .unwrap_or_default()
                .into_iter()
                .map(|c| c.id)
                .collect(),
            download_url: api.download_url,
            guid: api.guid,
            metadata_correlator: api.tmdb_id.map(|id| id.to_string()),
            season: api.season,
            episode: api.episode,
            runtime_minutes: None,
        }
    }
}
