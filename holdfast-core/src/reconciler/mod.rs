//! The Reconciler: the engine that sweeps every tracked
//! Movie/Series on a schedule and drives each through its state machine.
//!
//! The four periodic loops (Movie Index, Movie Reconcile,
//! Series Index, Series Reconcile) are one generalized [`SchedulerLoop`]
//! type parameterized by [`EntityScope`] and [`Phase`], not four
//! copy-pasted loop bodies. The [`DownloadTracker`](crate::downloads::tracker::DownloadTracker)
//! runs its own poll loop independently of these four; it is not one of the
//! Reconciler's `SchedulerLoop`s because its tick rate and failure handling
//! are governed entirely by its own poll loop.

pub mod episode;
pub mod movie;
pub mod release_selection;
pub mod series;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use holdfast_model::Protocol;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::domain::{EpisodeState, MovieState};
use crate::downloads::client::DownloadClientPort;
use crate::error::CoreResult;
use crate::indexer::gateway::IndexerGateway;
use crate::metadata::MetadataProvider;
use crate::store::{
    EpisodeFilter, EpisodeRepository, MovieFilter, MovieRepository, SeasonFilter, SeasonRepository,
    SeriesFilter, SeriesRepository, Store,
};

/// Which entity family a [`SchedulerLoop`] sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityScope {
    Movie,
    Series,
}

/// Which lifecycle phase a [`SchedulerLoop`] drives: resolving metadata
/// (`Index`) or searching/submitting downloads (`Reconcile`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Index,
    Reconcile,
}

/// Tunables for the four loops plus the category sets passed to the
/// Indexer Gateway.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub movie_index_interval: Duration,
    pub movie_reconcile_interval: Duration,
    pub series_index_interval: Duration,
    pub series_reconcile_interval: Duration,
    pub movie_categories: Vec<u32>,
    pub episode_categories: Vec<u32>,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        ReconcilerConfig {
            movie_index_interval: Duration::from_secs(600),
            movie_reconcile_interval: Duration::from_secs(600),
            series_index_interval: Duration::from_secs(600),
            series_reconcile_interval: Duration::from_secs(600),
            movie_categories: vec![2000],
            episode_categories: vec![5000],
        }
    }
}

/// One periodic sweep: fires every `interval`, visits every entity its
/// (scope, phase) names in ascending id order, and will not run two copies
/// of itself concurrently.
pub struct SchedulerLoop {
    scope: EntityScope,
    phase: Phase,
    interval: Duration,
    in_flight: Mutex<bool>,
}

impl SchedulerLoop {
    pub fn new(scope: EntityScope, phase: Phase, interval: Duration) -> Self {
        SchedulerLoop { scope, phase, interval, in_flight: Mutex::new(false) }
    }

    /// Runs one sweep, unless a prior sweep from this same loop is still
    /// running, in which case this tick is skipped entirely.
    #[instrument(skip(self, reconciler, cancel), fields(scope = ?self.scope, phase = ?self.phase))]
    pub async fn tick(&self, reconciler: &Reconciler, cancel: &CancellationToken) -> CoreResult<bool> {
        {
            let mut guard = self.in_flight.lock();
            if *guard {
                warn!("previous sweep still running, skipping this tick");
                return Ok(false);
            }
            *guard = true;
        }
        let result = reconciler.sweep(self.scope, self.phase, cancel).await;
        *self.in_flight.lock() = false;
        result.map(|_| true)
    }

    /// Runs this loop until `cancel` fires, via the usual
    /// `tokio::select!`-over-`CancellationToken` shutdown pattern.
    pub async fn run(self: Arc<Self>, reconciler: Arc<Reconciler>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self.tick(&reconciler, &cancel).await {
                        warn!(error = %err, scope = ?self.scope, phase = ?self.phase, "sweep failed");
                    }
                }
                _ = cancel.cancelled() => {
                    info!(scope = ?self.scope, phase = ?self.phase, "scheduler loop shutting down");
                    break;
                }
            }
        }
    }
}

/// Owns every collaborator the sweep handlers need and dispatches each
/// visited entity to its state-machine handler by a plain `match` on
/// entity kind — the state machines are closed sets known at compile time,
/// so a trait object would buy nothing over exhaustiveness checking.
pub struct Reconciler {
    store: Arc<dyn Store>,
    metadata: Arc<dyn MetadataProvider>,
    gateway: Arc<IndexerGateway>,
    clients: HashMap<Protocol, Arc<dyn DownloadClientPort>>,
    config: ReconcilerConfig,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn Store>,
        metadata: Arc<dyn MetadataProvider>,
        gateway: Arc<IndexerGateway>,
        clients: HashMap<Protocol, Arc<dyn DownloadClientPort>>,
        config: ReconcilerConfig,
    ) -> Self {
        Reconciler { store, metadata, gateway, clients, config }
    }

    /// Spawns the four `SchedulerLoop`s and returns their join handles so a
    /// caller can await them after triggering `cancel`.
    pub fn spawn_loops(self: &Arc<Self>, cancel: CancellationToken) -> Vec<tokio::task::JoinHandle<()>> {
        let loops: [Arc<SchedulerLoop>; 4] = [
            Arc::new(SchedulerLoop::new(EntityScope::Movie, Phase::Index, self.config.movie_index_interval)),
            Arc::new(SchedulerLoop::new(
                EntityScope::Movie,
                Phase::Reconcile,
                self.config.movie_reconcile_interval,
            )),
            Arc::new(SchedulerLoop::new(EntityScope::Series, Phase::Index, self.config.series_index_interval)),
            Arc::new(SchedulerLoop::new(
                EntityScope::Series,
                Phase::Reconcile,
                self.config.series_reconcile_interval,
            )),
        ];
        loops
            .into_iter()
            .map(|sl| {
                let reconciler = Arc::clone(self);
                let cancel = cancel.clone();
                tokio::spawn(async move { sl.run(reconciler, cancel).await })
            })
            .collect()
    }

    /// Runs a single sweep to completion outside of any `SchedulerLoop`,
    /// for the CLI's one-shot `index`/`reconcile` subcommands.
    pub async fn run_once(&self, scope: EntityScope, phase: Phase) -> CoreResult<()> {
        self.sweep(scope, phase, &CancellationToken::new()).await
    }

    #[instrument(skip(self, cancel), fields(scope = ?scope, phase = ?phase))]
    async fn sweep(&self, scope: EntityScope, phase: Phase, cancel: &CancellationToken) -> CoreResult<()> {
        match (scope, phase) {
            (EntityScope::Movie, Phase::Index) => self.sweep_movie_index(cancel).await,
            (EntityScope::Movie, Phase::Reconcile) => self.sweep_movie_reconcile(cancel).await,
            (EntityScope::Series, Phase::Index) => self.sweep_series_index(cancel).await,
            (EntityScope::Series, Phase::Reconcile) => self.sweep_series_reconcile(cancel).await,
        }
    }

    async fn sweep_movie_index(&self, cancel: &CancellationToken) -> CoreResult<()> {
        let mut movies = MovieRepository::list(
            self.store.as_ref(),
            MovieFilter { state: Some(MovieState::Discovered), ..Default::default() },
        )
        .await?;
        movies.sort_by_key(|m| m.id.get());
        for movie in movies {
            if cancel.is_cancelled() {
                break;
            }
            if let Err(err) = movie::evaluate_discovered(self.store.as_ref(), self.metadata.as_ref(), &movie).await
            {
                warn!(movie_id = movie.id.get(), error = %err, "movie index failed for one movie");
            }
        }
        Ok(())
    }

    async fn sweep_movie_reconcile(&self, cancel: &CancellationToken) -> CoreResult<()> {
        let mut movies = MovieRepository::list(
            self.store.as_ref(),
            MovieFilter { state: Some(MovieState::Missing), monitored: Some(true), ..Default::default() },
        )
        .await?;
        movies.sort_by_key(|m| m.id.get());
        for movie in movies {
            if cancel.is_cancelled() {
                break;
            }
            if let Err(err) = movie::evaluate_missing(
                self.store.as_ref(),
                self.gateway.as_ref(),
                &self.clients,
                &self.config.movie_categories,
                &movie,
            )
            .await
            {
                warn!(movie_id = movie.id.get(), error = %err, "movie reconcile failed for one movie");
            }
        }
        Ok(())
    }

    async fn sweep_series_index(&self, cancel: &CancellationToken) -> CoreResult<()> {
        let mut series_list =
            SeriesRepository::list(self.store.as_ref(), SeriesFilter { monitored: Some(true), ..Default::default() })
                .await?;
        series_list.sort_by_key(|s| s.id.get());
        for series in series_list {
            if cancel.is_cancelled() {
                break;
            }
            if let Err(err) = series::index_series(self.store.as_ref(), self.metadata.as_ref(), &series).await {
                warn!(series_id = series.id.get(), error = %err, "series index failed for one series");
            }
        }
        Ok(())
    }

    async fn sweep_series_reconcile(&self, cancel: &CancellationToken) -> CoreResult<()> {
        let mut series_list =
            SeriesRepository::list(self.store.as_ref(), SeriesFilter { monitored: Some(true), ..Default::default() })
                .await?;
        series_list.sort_by_key(|s| s.id.get());
        for series in series_list {
            if cancel.is_cancelled() {
                break;
            }
            let seasons = SeasonRepository::list(
                self.store.as_ref(),
                SeasonFilter { series_id: Some(series.id), monitored: Some(true) },
            )
            .await?;
            for season in seasons {
                if cancel.is_cancelled() {
                    break;
                }
                let mut episodes = EpisodeRepository::list(
                    self.store.as_ref(),
                    EpisodeFilter {
                        season_id: Some(season.id),
                        state: Some(EpisodeState::Missing),
                        monitored: Some(true),
                    },
                )
                .await?;
                episodes.sort_by_key(|e| e.id.get());
                for episode in episodes {
                    if cancel.is_cancelled() {
                        break;
                    }
                    if let Err(err) = episode::evaluate_missing(
                        self.store.as_ref(),
                        self.gateway.as_ref(),
                        &self.clients,
                        &self.config.episode_categories,
                        &series,
                        season.season_number.value(),
                        &episode,
                    )
                    .await
                    {
                        warn!(episode_id = episode.id.get(), error = %err, "series reconcile failed for one episode");
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Movie, QualityDefinition, QualityItem, QualityProfile, QualityToken};
    use crate::indexer::providers::memory::InMemoryIndexerProvider;
    use crate::metadata::InMemoryMetadataProvider;
    use crate::store::memory::InMemoryStore;
    use crate::store::TransitionLogReader;
    use holdfast_model::{IndexerId, MovieId, QualityDefinitionId, QualityProfileId};

    fn reconciler_with_discovered_movie() -> (Arc<InMemoryStore>, Arc<Reconciler>, MovieId) {
        let store = Arc::new(InMemoryStore::new());
        let movie_id = MovieId::new(1);
        store.seed_movie(Movie {
            id: movie_id,
            external_id: 27205,
            title: "Inception".into(),
            year: Some(2010),
            monitored: true,
            quality_profile_id: QualityProfileId::new(1),
            path: None,
            state: MovieState::Discovered,
            release_date: chrono::NaiveDate::from_ymd_opt(2010, 7, 16),
            runtime_minutes: Some(148),
            added_at: chrono::Utc::now(),
        });
        store.seed_quality_profile(QualityProfile {
            id: QualityProfileId::new(1),
            name: "HD".into(),
            items: vec![QualityItem { token: QualityToken::Bluray1080p, allowed: true }],
            min_quality: QualityToken::WebDl720p,
            max_quality: QualityToken::Bluray2160p,
        });
        store.seed_quality_definitions(vec![QualityDefinition {
            id: QualityDefinitionId::new(1),
            token: QualityToken::Bluray1080p,
            name: "Bluray-1080p".into(),
            min_mb_per_minute: 40.0,
            max_mb_per_minute: 120.0,
            preferred_mb_per_minute: 80.0,
        }]);

        let metadata = Arc::new(InMemoryMetadataProvider::new());
        metadata.seed_movie(crate::metadata::provider::MovieDetails {
            external_id: 27205,
            title: "Inception".into(),
            original_title: None,
            release_date: chrono::NaiveDate::from_ymd_opt(2010, 7, 16),
            runtime_minutes: Some(148),
        });

        let indexer = InMemoryIndexerProvider::new(IndexerId::new(1), "stub", vec![2000]);
        indexer.seed(vec![crate::domain::Release {
            external_id: "r1".into(),
            title: "Inception.2010.1080p.BluRay.x264-GROUP".into(),
            size_bytes: 12_000 * 1024 * 1024,
            seeders: Some(40),
            protocol: Protocol::Torrent,
            indexer_id: IndexerId::new(1),
            categories: vec![2000],
            download_url: Some("magnet:?x".into()),
            guid: None,
            metadata_correlator: Some("27205".into()),
            season: None,
            episode: None,
            runtime_minutes: None,
        }]);
        let gateway = Arc::new(IndexerGateway::new(vec![Arc::new(indexer)]));

        let client = Arc::new(crate::downloads::clients::InMemoryDownloadClient::new(
            holdfast_model::DownloadClientId::new(1),
        ));
        let mut clients: HashMap<Protocol, Arc<dyn DownloadClientPort>> = HashMap::new();
        clients.insert(Protocol::Torrent, client);

        let reconciler = Arc::new(Reconciler::new(
            store.clone(),
            metadata,
            gateway,
            clients,
            ReconcilerConfig::default(),
        ));
        (store, reconciler, movie_id)
    }

    #[tokio::test]
    async fn movie_index_then_reconcile_sweep_drives_a_movie_to_downloading() {
        let (store, reconciler, movie_id) = reconciler_with_discovered_movie();
        let cancel = CancellationToken::new();

        reconciler.sweep(EntityScope::Movie, Phase::Index, &cancel).await.unwrap();
        let movie = MovieRepository::get(store.as_ref(), movie_id).await.unwrap();
        assert_eq!(movie.state, MovieState::Missing);

        reconciler.sweep(EntityScope::Movie, Phase::Reconcile, &cancel).await.unwrap();
        let movie = MovieRepository::get(store.as_ref(), movie_id).await.unwrap();
        assert_eq!(movie.state, MovieState::Downloading);
    }

    #[tokio::test]
    async fn scheduler_loop_single_flight_guard_skips_overlapping_ticks() {
        let (_store, reconciler, _movie_id) = reconciler_with_discovered_movie();
        let cancel = CancellationToken::new();
        let sl = SchedulerLoop::new(EntityScope::Movie, Phase::Index, Duration::from_secs(600));

        *sl.in_flight.lock() = true;
        let ran = sl.tick(&reconciler, &cancel).await.unwrap();
        assert!(!ran);
    }
}
