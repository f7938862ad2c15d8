use holdfast_model::{IndexerId, Protocol};
use serde::{Deserialize, Serialize};

/// A candidate release as normalized by the Indexer Gateway. Transient by
/// nature — never persisted as its own row, only referenced via a
/// [`crate::domain::Fingerprint`] once a Download is
/// created from it.
///
/// Optional correlators use `Option`, not a defaulted sentinel: some
/// indexers distinguish "no season tag" from "season 0" meaningfully.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub external_id: String,
    pub title: String,
    pub size_bytes: u64,
    pub seeders: Option<u32>,
    pub protocol: Protocol,
    pub indexer_id: IndexerId,
    pub categories: Vec<u32>,
    pub download_url: Option<String>,
    pub guid: Option<String>,
    pub metadata_correlator: Option<String>,
    pub season: Option<u16>,
    pub episode: Option<u16>,
    pub runtime_minutes: Option<u32>,
}

impl Release {
    /// The URL the Indexer Gateway submits to a download client: prefer
    /// `download_url`, fall back to `guid` only when absent.
    pub fn submission_url(&self) -> Option<&str> {
        self.download_url
            .as_deref()
            .or(self.guid.as_deref())
    }
}
