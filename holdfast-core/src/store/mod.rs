//! The Entity Store and Transition Log.
//!
//! Modeled as one `async_trait` repository per aggregate, composed into a
//! single `Store` supertrait, plus one `TransitionLog` trait. `transition`
//! on every repository is the only way a caller changes an entity's
//! current state; implementations are required to make the state update
//! and the transition-log append one atomic unit.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use holdfast_model::{
    DownloadClientId, DownloadId, EpisodeId, IndexerId, MovieId, QualityProfileId, SeasonId, SeriesId,
};

use crate::domain::{
    Download, DownloadState, Episode, EpisodeState, Fingerprint, Movie, MovieState,
    QualityDefinition, QualityProfile, Season, Series, SeriesState, Transition,
};
use crate::error::CoreResult;

/// Filters accepted by `list` operations: state, monitored flag, metadata
/// id. `None` means "no constraint on this field".
#[derive(Debug, Clone, Default)]
pub struct MovieFilter {
    pub state: Option<MovieState>,
    pub monitored: Option<bool>,
    pub external_id: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct SeriesFilter {
    pub state: Option<SeriesState>,
    pub monitored: Option<bool>,
    pub external_id: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct SeasonFilter {
    pub series_id: Option<SeriesId>,
    pub monitored: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct EpisodeFilter {
    pub season_id: Option<SeasonId>,
    pub state: Option<EpisodeState>,
    pub monitored: Option<bool>,
}

/// The metadata projection for a movie. Distinct from the current-state
/// row: `upsert_metadata` never changes `Movie::state`.
#[derive(Debug, Clone)]
pub struct MovieMetadataUpdate {
    pub external_id: i64,
    pub title: String,
    pub year: Option<i32>,
    pub release_date: Option<NaiveDate>,
    pub runtime_minutes: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct SeriesMetadataUpdate {
    pub external_id: i64,
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct EpisodeMetadataUpdate {
    pub season_id: SeasonId,
    pub episode_number: holdfast_model::EpisodeNumber,
    pub air_date: Option<NaiveDate>,
    pub runtime_minutes: Option<i32>,
}

/// A download the tracker or reconciler is about to start tracking.
#[derive(Debug, Clone)]
pub struct NewDownload {
    pub owning_kind: crate::domain::EntityKind,
    pub owning_id: i64,
    pub client_id: DownloadClientId,
    pub client_side_id: String,
    pub fingerprint: Fingerprint,
}

/// A stored `indexer_sources` row: everything a provider factory needs to
/// construct the right [`crate::indexer::gateway::IndexerProvider`] variant
/// for `kind` without the caller hardcoding it.
#[derive(Debug, Clone)]
pub struct IndexerSourceConfig {
    pub id: IndexerId,
    pub name: String,
    pub kind: String,
    pub priority: i32,
    pub base_url: String,
    pub api_key: String,
    pub categories: Vec<u32>,
    pub enabled: bool,
}

/// An `indexer_sources` row not yet assigned an id, used to seed a default
/// provider from config the first time a store has none configured.
#[derive(Debug, Clone)]
pub struct NewIndexerSource {
    pub name: String,
    pub kind: String,
    pub priority: i32,
    pub base_url: String,
    pub api_key: String,
    pub categories: Vec<u32>,
    pub enabled: bool,
}

/// A stored `download_clients` row: everything a client factory needs to
/// construct the right [`crate::downloads::client::DownloadClientPort`]
/// variant for `kind`.
#[derive(Debug, Clone)]
pub struct DownloadClientConfig {
    pub id: DownloadClientId,
    pub name: String,
    pub kind: String,
    pub base_url: String,
    pub api_key: String,
    pub download_dir: String,
    pub enabled: bool,
}

/// A `download_clients` row not yet assigned an id, used to seed a default
/// client from config the first time a store has none configured.
#[derive(Debug, Clone)]
pub struct NewDownloadClient {
    pub name: String,
    pub kind: String,
    pub base_url: String,
    pub api_key: String,
    pub download_dir: String,
    pub enabled: bool,
}

#[async_trait]
pub trait MovieRepository: Send + Sync {
    async fn get(&self, id: MovieId) -> CoreResult<Movie>;
    async fn list(&self, filter: MovieFilter) -> CoreResult<Vec<Movie>>;
    async fn upsert_metadata(&self, metadata: MovieMetadataUpdate) -> CoreResult<MovieId>;
    async fn transition(
        &self,
        id: MovieId,
        expected_from: Option<MovieState>,
        to: MovieState,
        metadata: Option<serde_json::Value>,
    ) -> CoreResult<()>;
    async fn set_path(&self, id: MovieId, path: String) -> CoreResult<()>;
}

#[async_trait]
pub trait SeriesRepository: Send + Sync {
    async fn get(&self, id: SeriesId) -> CoreResult<Series>;
    async fn list(&self, filter: SeriesFilter) -> CoreResult<Vec<Series>>;
    async fn upsert_metadata(&self, metadata: SeriesMetadataUpdate) -> CoreResult<SeriesId>;
    async fn transition(
        &self,
        id: SeriesId,
        expected_from: Option<SeriesState>,
        to: SeriesState,
        metadata: Option<serde_json::Value>,
    ) -> CoreResult<()>;
}

#[async_trait]
pub trait SeasonRepository: Send + Sync {
    async fn get(&self, id: SeasonId) -> CoreResult<Season>;
    async fn list(&self, filter: SeasonFilter) -> CoreResult<Vec<Season>>;
    async fn upsert(
        &self,
        series_id: SeriesId,
        season_number: holdfast_model::SeasonNumber,
        monitored: bool,
    ) -> CoreResult<SeasonId>;
}

#[async_trait]
pub trait EpisodeRepository: Send + Sync {
    async fn get(&self, id: EpisodeId) -> CoreResult<Episode>;
    async fn list(&self, filter: EpisodeFilter) -> CoreResult<Vec<Episode>>;
    async fn upsert_metadata(&self, metadata: EpisodeMetadataUpdate) -> CoreResult<EpisodeId>;
    async fn transition(
        &self,
        id: EpisodeId,
        expected_from: Option<EpisodeState>,
        to: EpisodeState,
        metadata: Option<serde_json::Value>,
    ) -> CoreResult<()>;
}

#[async_trait]
pub trait DownloadRepository: Send + Sync {
    async fn record(&self, download: NewDownload) -> CoreResult<Download>;
    async fn get(&self, id: DownloadId) -> CoreResult<Download>;
    async fn transition(
        &self,
        id: DownloadId,
        expected_from: DownloadState,
        to: DownloadState,
    ) -> CoreResult<()>;
    async fn increment_attempts(&self, id: DownloadId) -> CoreResult<u32>;
    async fn list_by_state(&self, state: DownloadState) -> CoreResult<Vec<Download>>;
    /// Used by release selection to enforce the invariant that at most one
    /// Download exists in state Queued or Active for a given (entity,
    /// fingerprint) before submitting a new one.
    async fn find_active_for_fingerprint(&self, fingerprint: &Fingerprint) -> CoreResult<Option<Download>>;
}

#[async_trait]
pub trait QualityRepository: Send + Sync {
    async fn get_profile(&self, id: QualityProfileId) -> CoreResult<QualityProfile>;
    async fn list_definitions(&self) -> CoreResult<Vec<QualityDefinition>>;
}

/// Read/seed access to the `indexer_sources` and `download_clients` config
/// tables, so `Runtime::build` can select provider/client variants by
/// stored `kind` instead of hardcoding one instance of each (spec.md §9:
/// "Construction is through a factory that selects the variant from a
/// stored config row").
#[async_trait]
pub trait ProviderConfigRepository: Send + Sync {
    async fn list_indexer_sources(&self) -> CoreResult<Vec<IndexerSourceConfig>>;
    /// Inserts `source` only if the table is currently empty; a no-op once
    /// any indexer source has been configured, by hand or otherwise.
    async fn seed_default_indexer_source(&self, source: NewIndexerSource) -> CoreResult<()>;

    async fn list_download_clients(&self) -> CoreResult<Vec<DownloadClientConfig>>;
    /// Inserts `client` only if the table is currently empty.
    async fn seed_default_download_client(&self, client: NewDownloadClient) -> CoreResult<()>;
}

#[async_trait]
pub trait TransitionLogReader: Send + Sync {
    async fn query_by_entity(
        &self,
        kind: crate::domain::EntityKind,
        entity_id: i64,
    ) -> CoreResult<Vec<Transition>>;
    async fn query_by_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        kinds: &[crate::domain::EntityKind],
        offset: i64,
        limit: i64,
    ) -> CoreResult<Vec<Transition>>;
    async fn count_by_window(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> CoreResult<i64>;
}

/// The full Entity Store surface the Reconciler and its collaborators
/// depend on. A marker supertrait, blanket-implemented for anything that
/// implements every constituent repository, expressed as a trait bound
/// instead of a concrete `Arc<dyn _>` field struct, so the in-memory test
/// double and the Postgres implementation can both satisfy it directly.
pub trait Store:
    MovieRepository
    + SeriesRepository
    + SeasonRepository
    + EpisodeRepository
    + DownloadRepository
    + QualityRepository
    + ProviderConfigRepository
    + TransitionLogReader
    + Send
    + Sync
{
}

impl<T> Store for T where
    T: MovieRepository
        + SeriesRepository
        + SeasonRepository
        + EpisodeRepository
        + DownloadRepository
        + QualityRepository
        + ProviderConfigRepository
        + TransitionLogReader
        + Send
        + Sync
{
}
