//! The Indexer Gateway: abstracts over heterogeneous
//! indexer providers, fanning a single search out to all configured sources
//! and isolating the failure of any one of them.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use holdfast_model::IndexerId;

use crate::domain::Release;
use crate::error::CoreResult;

/// Content type hint carried in a search, distinguishing a movie search
/// from a TV episode search at providers that support category-based
/// filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Movie,
    Episode,
}

/// A search query: title, optional season/episode numerals, optional
/// external correlator, optional content type.
#[derive(Debug, Clone)]
pub struct QuerySpec {
    pub title: String,
    pub season: Option<u16>,
    pub episode: Option<u16>,
    pub content_type: Option<ContentType>,
    pub correlator: Option<String>,
}

/// An indexer descriptor: id, priority, supported categories.
#[derive(Debug, Clone)]
pub struct IndexerDescriptor {
    pub id: IndexerId,
    pub name: String,
    pub priority: i32,
    pub categories: Vec<u32>,
}

/// A single indexer source. Implementations normalize their own wire
/// format into [`Release`].
#[async_trait]
pub trait IndexerProvider: Send + Sync {
    fn descriptor(&self) -> IndexerDescriptor;
    async fn search(&self, categories: &[u32], query: &QuerySpec) -> CoreResult<Vec<Release>>;
}

/// The outcome of fanning a search out across every configured provider:
/// partial results plus per-indexer error flags, so one provider failing
/// never fails the whole search.
#[derive(Debug, Default)]
pub struct SearchOutcome {
    pub releases: Vec<Release>,
    pub errors: Vec<(IndexerId, String)>,
}

pub struct IndexerGateway {
    providers: Vec<Arc<dyn IndexerProvider>>,
    /// Read-mostly cache of each provider's descriptor
    /// ("in-memory caches (e.g., of indexer descriptors) are read-mostly
    /// with a single-writer lock; stale reads are acceptable"). `DashMap`
    /// gives lock-free reads without a separate `RwLock` around a `HashMap`;
    /// `refresh_descriptors` is the single writer.
    descriptor_cache: DashMap<IndexerId, IndexerDescriptor>,
}

impl IndexerGateway {
    pub fn new(providers: Vec<Arc<dyn IndexerProvider>>) -> Self {
        let descriptor_cache = DashMap::new();
        for provider in &providers {
            let descriptor = provider.descriptor();
            descriptor_cache.insert(descriptor.id, descriptor);
        }
        IndexerGateway { providers, descriptor_cache }
    }

    /// Re-reads every provider's descriptor into the cache. Cheap and rare
    /// enough (config reload, indexer added/removed) that a stale read
    /// between calls is acceptable.
    pub fn refresh_descriptors(&self) {
        for provider in &self.providers {
            let descriptor = provider.descriptor();
            self.descriptor_cache.insert(descriptor.id, descriptor);
        }
    }

    pub fn list_indexers(&self) -> Vec<IndexerDescriptor> {
        self.descriptor_cache.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Searches every provider whose cached declared categories intersect
    /// the requested ones, concurrently. A failure on one provider is
    /// recorded in [`SearchOutcome::errors`] and never aborts the others.
    pub async fn search(&self, categories: &[u32], query: QuerySpec) -> SearchOutcome {
        let query = Arc::new(query);
        let futures = self
            .providers
            .iter()
            .filter(|provider| {
                let id = provider.descriptor().id;
                self.descriptor_cache
                    .get(&id)
                    .map(|d| categories.iter().any(|c| d.categories.contains(c)))
                    .unwrap_or(false)
            })
            .map(|provider| {
                let provider = Arc::clone(provider);
                let query = Arc::clone(&query);
                let categories = categories.to_vec();
                async move {
                    let id = provider.descriptor().id;
                    (id, provider.search(&categories, &query).await)
                }
            });

        let results = futures::future::join_all(futures).await;
        let mut outcome = SearchOutcome::default();
        for (id, result) in results {
            match result {
                Ok(releases) => outcome.releases.extend(releases),
                Err(err) => outcome.errors.push((id, err.to_string())),
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use holdfast_model::Protocol;

    struct Stub {
        id: IndexerId,
        categories: Vec<u32>,
        result: Result<Vec<Release>, String>,
    }

    impl Stub {
        fn new(id: u32, categories: Vec<u32>, result: Result<Vec<Release>, String>) -> Self {
            Stub { id: IndexerId::new(id as i64), categories, result }
        }
    }

    #[async_trait]
    impl IndexerProvider for Stub {
        fn descriptor(&self) -> IndexerDescriptor {
            IndexerDescriptor { id: self.id, name: "stub".into(), priority: 0, categories: self.categories.clone() }
        }

        async fn search(&self, _categories: &[u32], _query: &QuerySpec) -> CoreResult<Vec<Release>> {
            self.result.clone().map_err(CoreError::external)
        }
    }

    fn release(id: &str) -> Release {
        Release {
            external_id: id.into(),
            title: format!("Release {id}"),
            size_bytes: 1_000_000,
            seeders: Some(5),
            protocol: Protocol::Torrent,
            indexer_id: IndexerId::new(1),
            categories: vec![2000],
            download_url: Some("https://example/dl".into()),
            guid: None,
            metadata_correlator: None,
            season: None,
            episode: None,
            runtime_minutes: None,
        }
    }

    fn movie_query() -> QuerySpec {
        QuerySpec {
            title: "Inception".into(),
            season: None,
            episode: None,
            content_type: Some(ContentType::Movie),
            correlator: None,
        }
    }

    #[tokio::test]
    async fn one_failing_indexer_does_not_suppress_others_results() {
        let gateway = IndexerGateway::new(vec![
            Arc::new(Stub::new(1, vec![2000], Ok(vec![release("a")]))),
            Arc::new(Stub::new(2, vec![2000], Err("boom".into()))),
        ]);
        let outcome = gateway.search(&[2000], movie_query()).await;
        assert_eq!(outcome.releases.len(), 1);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].0, IndexerId::new(2));
    }

    #[tokio::test]
    async fn providers_with_no_overlapping_category_are_skipped() {
        // 5000 is the TV category; a movie search (2000) must not fan
        // out to a TV-only indexer.
        let gateway = IndexerGateway::new(vec![
            Arc::new(Stub::new(1, vec![2000], Ok(vec![release("a")]))),
            Arc::new(Stub::new(2, vec![5000], Err("should not be called".into()))),
        ]);
        let outcome = gateway.search(&[2000], movie_query()).await;
        assert_eq!(outcome.releases.len(), 1);
        assert!(outcome.errors.is_empty());
    }

    #[test]
    fn list_indexers_reflects_descriptor_cache() {
        let gateway = IndexerGateway::new(vec![Arc::new(Stub::new(1, vec![2000], Ok(vec![])))]);
        let descriptors = gateway.list_indexers();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].id, IndexerId::new(1));
    }
}
