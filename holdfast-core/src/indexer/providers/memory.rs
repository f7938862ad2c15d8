//! An in-memory indexer provider used by reconciler tests — returns a
//! canned list of releases without touching the network.

use async_trait::async_trait;
use holdfast_model::IndexerId;
use parking_lot::Mutex;

use crate::domain::Release;
use crate::error::CoreResult;
use crate::indexer::gateway::{IndexerDescriptor, IndexerProvider, QuerySpec};

pub struct InMemoryIndexerProvider {
    descriptor: IndexerDescriptor,
    releases: Mutex<Vec<Release>>,
}

impl InMemoryIndexerProvider {
    pub fn new(id: IndexerId, name: impl Into<String>, categories: Vec<u32>) -> Self {
        InMemoryIndexerProvider {
            descriptor: IndexerDescriptor { id, name: name.into(), priority: 0, categories },
            releases: Mutex::new(Vec::new()),
        }
    }

    pub fn seed(&self, releases: Vec<Release>) {
        *self.releases.lock() = releases;
    }
}

#[async_trait]
impl IndexerProvider for InMemoryIndexerProvider {
    fn descriptor(&self) -> IndexerDescriptor {
        self.descriptor.clone()
    }

    async fn search(&self, categories: &[u32], query: &QuerySpec) -> CoreResult<Vec<Release>> {
        let guard = self.releases.lock();
        Ok(guard
            .iter()
            .filter(|r| categories.is_empty() || r.categories.iter().any(|c| categories.contains(c)))
            .filter(|r| r.title.to_lowercase().contains(&query.title.to_lowercase()) || query.title.is_empty())
            .cloned()
            .collect())
    }
}
