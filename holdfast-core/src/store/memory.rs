//! An in-memory `Store` implementation used by reconciler integration tests:
//! a lightweight non-Postgres double available for fast tests alongside
//! the real repository implementations.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use holdfast_model::{
    DownloadClientId, DownloadId, EpisodeId, IndexerId, MovieId, QualityProfileId, SeasonId, SeriesId,
};
use parking_lot::Mutex;

use crate::domain::{
    Download, DownloadState, EntityKind, Episode, EpisodeState, Fingerprint, Movie, MovieState,
    QualityDefinition, QualityProfile, Season, Series, SeriesState, Transition,
};
use crate::error::{CoreError, CoreResult};

use super::{
    DownloadClientConfig, DownloadRepository, EpisodeFilter, EpisodeMetadataUpdate, EpisodeRepository,
    IndexerSourceConfig, MovieFilter, MovieMetadataUpdate, MovieRepository, NewDownload,
    NewDownloadClient, NewIndexerSource, ProviderConfigRepository, QualityRepository, SeasonFilter,
    SeasonRepository, SeriesFilter, SeriesMetadataUpdate, SeriesRepository, TransitionLogReader,
};

#[derive(Default)]
struct Ids {
    movie: AtomicI64,
    series: AtomicI64,
    season: AtomicI64,
    episode: AtomicI64,
    download: AtomicI64,
    indexer_source: AtomicI64,
    download_client: AtomicI64,
}

impl Ids {
    fn next(counter: &AtomicI64) -> i64 {
        counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}

struct Inner {
    movies: HashMap<i64, Movie>,
    series: HashMap<i64, Series>,
    seasons: HashMap<i64, Season>,
    episodes: HashMap<i64, Episode>,
    downloads: HashMap<i64, Download>,
    quality_profiles: HashMap<i64, QualityProfile>,
    quality_definitions: Vec<QualityDefinition>,
    transitions: Vec<Transition>,
    indexer_sources: HashMap<i64, IndexerSourceConfig>,
    download_clients: HashMap<i64, DownloadClientConfig>,
}

/// An in-memory, single-process implementation of every Entity Store
/// repository plus the Transition Log. Good enough for reconciler tests;
/// not safe to share across real concurrent writers beyond the mutex's
/// serialization (which is exactly what a real transaction would do, just
/// without durability).
pub struct InMemoryStore {
    ids: Ids,
    inner: Mutex<Inner>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        InMemoryStore {
            ids: Ids::default(),
            inner: Mutex::new(Inner {
                movies: HashMap::new(),
                series: HashMap::new(),
                seasons: HashMap::new(),
                episodes: HashMap::new(),
                downloads: HashMap::new(),
                quality_profiles: HashMap::new(),
                quality_definitions: Vec::new(),
                transitions: Vec::new(),
                indexer_sources: HashMap::new(),
                download_clients: HashMap::new(),
            }),
        }
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test/setup helper: seed a quality profile directly, bypassing any
    /// repository trait (there is no write path for profiles themselves,
    /// only for the entities that reference them).
    pub fn seed_quality_profile(&self, profile: QualityProfile) {
        self.inner.lock().quality_profiles.insert(profile.id.get(), profile);
    }

    pub fn seed_quality_definitions(&self, definitions: Vec<QualityDefinition>) {
        self.inner.lock().quality_definitions = definitions;
    }

    /// Test/setup helper mirroring what a real scan/metadata-refresh flow
    /// would do: insert a fully formed Movie row including its initial
    /// state, bypassing `upsert_metadata` (which always starts a movie at
    /// `Discovered`).
    pub fn seed_movie(&self, movie: Movie) -> MovieId {
        let mut guard = self.inner.lock();
        let id = movie.id;
        guard.transitions.push(Transition::creation(
            EntityKind::Movie,
            id.get(),
            movie.state.as_str(),
            movie.added_at,
        ));
        guard.movies.insert(id.get(), movie);
        id
    }

    /// Test/setup helper: insert a fully formed Series row, bypassing
    /// `upsert_metadata` (which always starts a series at `Unreleased`).
    pub fn seed_series(&self, series: Series) -> SeriesId {
        let mut guard = self.inner.lock();
        let id = series.id;
        guard.transitions.push(Transition::creation(
            EntityKind::Series,
            id.get(),
            series.state.as_str(),
            series.added_at,
        ));
        guard.series.insert(id.get(), series);
        id
    }

    /// Test/setup helper: insert a Season row directly.
    pub fn seed_season(&self, season: Season) -> SeasonId {
        let mut guard = self.inner.lock();
        let id = season.id;
        guard.seasons.insert(id.get(), season);
        id
    }

    /// Test/setup helper mirroring [`Self::seed_movie`] for episodes: insert
    /// a fully formed Episode row including its initial state, bypassing
    /// `upsert_metadata`'s air-date-derived state assignment.
    pub fn seed_episode(&self, episode: Episode) -> EpisodeId {
        let mut guard = self.inner.lock();
        let id = episode.id;
        guard.transitions.push(Transition::creation(
            EntityKind::Episode,
            id.get(),
            episode.state.as_str(),
            Utc::now(),
        ));
        guard.episodes.insert(id.get(), episode);
        id
    }

    fn append_locked(
        guard: &mut Inner,
        kind: EntityKind,
        entity_id: i64,
        from: Option<String>,
        to: String,
        metadata: Option<serde_json::Value>,
    ) {
        let mut t = Transition::creation(kind, entity_id, to, Utc::now());
        t.from_state = from;
        if let Some(m) = metadata {
            t = t.with_metadata(m);
        }
        guard.transitions.push(t);
    }
}

#[async_trait]
impl MovieRepository for InMemoryStore {
    async fn get(&self, id: MovieId) -> CoreResult<Movie> {
        self.inner
            .lock()
            .movies
            .get(&id.get())
            .cloned()
            .ok_or_else(|| CoreError::not_found(format!("movie {id}")))
    }

    async fn list(&self, filter: MovieFilter) -> CoreResult<Vec<Movie>> {
        let guard = self.inner.lock();
        let mut out: Vec<Movie> = guard
            .movies
            .values()
            .filter(|m| filter.state.map_or(true, |s| m.state == s))
            .filter(|m| filter.monitored.map_or(true, |mon| m.monitored == mon))
            .filter(|m| filter.external_id.map_or(true, |eid| m.external_id == eid))
            .cloned()
            .collect();
        out.sort_by_key(|m| m.id.get());
        Ok(out)
    }

    async fn upsert_metadata(&self, metadata: MovieMetadataUpdate) -> CoreResult<MovieId> {
        let mut guard = self.inner.lock();
        if let Some(existing) = guard
            .movies
            .values_mut()
            .find(|m| m.external_id == metadata.external_id)
        {
            existing.title = metadata.title;
            existing.year = metadata.year;
            existing.release_date = metadata.release_date;
            existing.runtime_minutes = metadata.runtime_minutes;
            return Ok(existing.id);
        }
        let id = MovieId::new(Ids::next(&self.ids.movie));
        let now = Utc::now();
        let movie = Movie {
            id,
            external_id: metadata.external_id,
            title: metadata.title,
            year: metadata.year,
            monitored: true,
            quality_profile_id: QualityProfileId::new(0),
            path: None,
            state: MovieState::Discovered,
            release_date: metadata.release_date,
            runtime_minutes: metadata.runtime_minutes,
            added_at: now,
        };
        Self::append_locked(
            &mut guard,
            EntityKind::Movie,
            id.get(),
            None,
            MovieState::Discovered.as_str().to_string(),
            None,
        );
        guard.movies.insert(id.get(), movie);
        Ok(id)
    }

    async fn transition(
        &self,
        id: MovieId,
        expected_from: Option<MovieState>,
        to: MovieState,
        metadata: Option<serde_json::Value>,
    ) -> CoreResult<()> {
        let mut guard = self.inner.lock();
        let current = guard
            .movies
            .get(&id.get())
            .ok_or_else(|| CoreError::not_found(format!("movie {id}")))?
            .state;
        if expected_from != Some(current) {
            return Err(CoreError::Conflict);
        }
        Self::append_locked(
            &mut guard,
            EntityKind::Movie,
            id.get(),
            Some(current.as_str().to_string()),
            to.as_str().to_string(),
            metadata,
        );
        guard.movies.get_mut(&id.get()).unwrap().state = to;
        Ok(())
    }

    async fn set_path(&self, id: MovieId, path: String) -> CoreResult<()> {
        let mut guard = self.inner.lock();
        let movie = guard
            .movies
            .get_mut(&id.get())
            .ok_or_else(|| CoreError::not_found(format!("movie {id}")))?;
        movie.path = Some(path);
        Ok(())
    }
}

#[async_trait]
impl SeriesRepository for InMemoryStore {
    async fn get(&self, id: SeriesId) -> CoreResult<Series> {
        self.inner
            .lock()
            .series
            .get(&id.get())
            .cloned()
            .ok_or_else(|| CoreError::not_found(format!("series {id}")))
    }

    async fn list(&self, filter: SeriesFilter) -> CoreResult<Vec<Series>> {
        let guard = self.inner.lock();
        let mut out: Vec<Series> = guard
            .series
            .values()
            .filter(|s| filter.state.map_or(true, |st| s.state == st))
            .filter(|s| filter.monitored.map_or(true, |mon| s.monitored == mon))
            .filter(|s| filter.external_id.map_or(true, |eid| s.external_id == eid))
            .cloned()
            .collect();
        out.sort_by_key(|s| s.id.get());
        Ok(out)
    }

    async fn upsert_metadata(&self, metadata: SeriesMetadataUpdate) -> CoreResult<SeriesId> {
        let mut guard = self.inner.lock();
        if let Some(existing) = guard
            .series
            .values_mut()
            .find(|s| s.external_id == metadata.external_id)
        {
            existing.title = metadata.title;
            return Ok(existing.id);
        }
        let id = SeriesId::new(Ids::next(&self.ids.series));
        let series = Series {
            id,
            external_id: metadata.external_id,
            title: metadata.title,
            monitored: true,
            quality_profile_id: QualityProfileId::new(0),
            path: None,
            state: SeriesState::Unreleased,
            added_at: Utc::now(),
        };
        Self::append_locked(
            &mut guard,
            EntityKind::Series,
            id.get(),
            None,
            SeriesState::Unreleased.as_str().to_string(),
            None,
        );
        guard.series.insert(id.get(), series);
        Ok(id)
    }

    async fn transition(
        &self,
        id: SeriesId,
        expected_from: Option<SeriesState>,
        to: SeriesState,
        metadata: Option<serde_json::Value>,
    ) -> CoreResult<()> {
        let mut guard = self.inner.lock();
        let current = guard
            .series
            .get(&id.get())
            .ok_or_else(|| CoreError::not_found(format!("series {id}")))?
            .state;
        if expected_from != Some(current) {
            return Err(CoreError::Conflict);
        }
        Self::append_locked(
            &mut guard,
            EntityKind::Series,
            id.get(),
            Some(current.as_str().to_string()),
            to.as_str().to_string(),
            metadata,
        );
        guard.series.get_mut(&id.get()).unwrap().state = to;
        Ok(())
    }
}

#[async_trait]
impl SeasonRepository for InMemoryStore {
    async fn get(&self, id: SeasonId) -> CoreResult<Season> {
        self.inner
            .lock()
            .seasons
            .get(&id.get())
            .cloned()
            .ok_or_else(|| CoreError::not_found(format!("season {id}")))
    }

    async fn list(&self, filter: SeasonFilter) -> CoreResult<Vec<Season>> {
        let guard = self.inner.lock();
        let mut out: Vec<Season> = guard
            .seasons
            .values()
            .filter(|s| filter.series_id.map_or(true, |sid| s.series_id == sid))
            .filter(|s| filter.monitored.map_or(true, |mon| s.monitored == mon))
            .cloned()
            .collect();
        out.sort_by_key(|s| s.id.get());
        Ok(out)
    }

    async fn upsert(
        &self,
        series_id: SeriesId,
        season_number: holdfast_model::SeasonNumber,
        monitored: bool,
    ) -> CoreResult<SeasonId> {
        let mut guard = self.inner.lock();
        if let Some(existing) = guard
            .seasons
            .values_mut()
            .find(|s| s.series_id == series_id && s.season_number == season_number)
        {
            existing.monitored = monitored;
            return Ok(existing.id);
        }
        let id = SeasonId::new(Ids::next(&self.ids.season));
        guard.seasons.insert(
            id.get(),
            Season { id, series_id, season_number, monitored },
        );
        Ok(id)
    }
}

#[async_trait]
impl EpisodeRepository for InMemoryStore {
    async fn get(&self, id: EpisodeId) -> CoreResult<Episode> {
        self.inner
            .lock()
            .episodes
            .get(&id.get())
            .cloned()
            .ok_or_else(|| CoreError::not_found(format!("episode {id}")))
    }

    async fn list(&self, filter: EpisodeFilter) -> CoreResult<Vec<Episode>> {
        let guard = self.inner.lock();
        let mut out: Vec<Episode> = guard
            .episodes
            .values()
            .filter(|e| filter.season_id.map_or(true, |sid| e.season_id == sid))
            .filter(|e| filter.state.map_or(true, |st| e.state == st))
            .filter(|e| filter.monitored.map_or(true, |mon| e.monitored == mon))
            .cloned()
            .collect();
        out.sort_by_key(|e| e.id.get());
        Ok(out)
    }

    async fn upsert_metadata(&self, metadata: EpisodeMetadataUpdate) -> CoreResult<EpisodeId> {
        let mut guard = self.inner.lock();
        if let Some(existing) = guard.episodes.values_mut().find(|e| {
            e.season_id == metadata.season_id && e.episode_number == metadata.episode_number
        }) {
            existing.air_date = metadata.air_date;
            existing.runtime_minutes = metadata.runtime_minutes;
            return Ok(existing.id);
        }
        let id = EpisodeId::new(Ids::next(&self.ids.episode));
        let state = if metadata.air_date.map_or(true, |d| d > Utc::now().date_naive()) {
            EpisodeState::Unreleased
        } else {
            EpisodeState::Missing
        };
        Self::append_locked(
            &mut guard,
            EntityKind::Episode,
            id.get(),
            None,
            state.as_str().to_string(),
            None,
        );
        guard.episodes.insert(
            id.get(),
            Episode {
                id,
                season_id: metadata.season_id,
                episode_number: metadata.episode_number,
                air_date: metadata.air_date,
                monitored: true,
                state,
                runtime_minutes: metadata.runtime_minutes,
            },
        );
        Ok(id)
    }

    async fn transition(
        &self,
        id: EpisodeId,
        expected_from: Option<EpisodeState>,
        to: EpisodeState,
        metadata: Option<serde_json::Value>,
    ) -> CoreResult<()> {
        let mut guard = self.inner.lock();
        let current = guard
            .episodes
            .get(&id.get())
            .ok_or_else(|| CoreError::not_found(format!("episode {id}")))?
            .state;
        if expected_from != Some(current) {
            return Err(CoreError::Conflict);
        }
        Self::append_locked(
            &mut guard,
            EntityKind::Episode,
            id.get(),
            Some(current.as_str().to_string()),
            to.as_str().to_string(),
            metadata,
        );
        guard.episodes.get_mut(&id.get()).unwrap().state = to;
        Ok(())
    }
}

#[async_trait]
impl DownloadRepository for InMemoryStore {
    async fn record(&self, download: NewDownload) -> CoreResult<Download> {
        let mut guard = self.inner.lock();
        let id = DownloadId::new(Ids::next(&self.ids.download));
        let row = Download {
            id,
            owning_kind: download.owning_kind,
            owning_id: download.owning_id,
            client_id: download.client_id,
            client_side_id: download.client_side_id,
            fingerprint: download.fingerprint,
            state: DownloadState::Queued,
            attempts: 0,
            created_at: Utc::now(),
        };
        Self::append_locked(
            &mut guard,
            EntityKind::Download,
            id.get(),
            None,
            DownloadState::Queued.as_str().to_string(),
            None,
        );
        guard.downloads.insert(id.get(), row.clone());
        Ok(row)
    }

    async fn get(&self, id: DownloadId) -> CoreResult<Download> {
        self.inner
            .lock()
            .downloads
            .get(&id.get())
            .cloned()
            .ok_or_else(|| CoreError::not_found(format!("download {id}")))
    }

    async fn transition(
        &self,
        id: DownloadId,
        expected_from: DownloadState,
        to: DownloadState,
    ) -> CoreResult<()> {
        let mut guard = self.inner.lock();
        let current = guard
            .downloads
            .get(&id.get())
            .ok_or_else(|| CoreError::not_found(format!("download {id}")))?
            .state;
        if current != expected_from {
            return Err(CoreError::Conflict);
        }
        Self::append_locked(
            &mut guard,
            EntityKind::Download,
            id.get(),
            Some(current.as_str().to_string()),
            to.as_str().to_string(),
            None,
        );
        guard.downloads.get_mut(&id.get()).unwrap().state = to;
        Ok(())
    }

    async fn increment_attempts(&self, id: DownloadId) -> CoreResult<u32> {
        let mut guard = self.inner.lock();
        let download = guard
            .downloads
            .get_mut(&id.get())
            .ok_or_else(|| CoreError::not_found(format!("download {id}")))?;
        download.attempts += 1;
        Ok(download.attempts)
    }

    async fn list_by_state(&self, state: DownloadState) -> CoreResult<Vec<Download>> {
        let guard = self.inner.lock();
        let mut out: Vec<Download> = guard
            .downloads
            .values()
            .filter(|d| d.state == state)
            .cloned()
            .collect();
        out.sort_by_key(|d| d.id.get());
        Ok(out)
    }

    async fn find_active_for_fingerprint(&self, fingerprint: &Fingerprint) -> CoreResult<Option<Download>> {
        let guard = self.inner.lock();
        Ok(guard
            .downloads
            .values()
            .find(|d| d.fingerprint == *fingerprint && d.state.is_tracked())
            .cloned())
    }
}

#[async_trait]
impl QualityRepository for InMemoryStore {
    async fn get_profile(&self, id: QualityProfileId) -> CoreResult<QualityProfile> {
        self.inner
            .lock()
            .quality_profiles
            .get(&id.get())
            .cloned()
            .ok_or_else(|| CoreError::not_found(format!("quality profile {id}")))
    }

    async fn list_definitions(&self) -> CoreResult<Vec<QualityDefinition>> {
        Ok(self.inner.lock().quality_definitions.clone())
    }
}

#[async_trait]
impl ProviderConfigRepository for InMemoryStore {
    async fn list_indexer_sources(&self) -> CoreResult<Vec<IndexerSourceConfig>> {
        let mut sources: Vec<_> = self.inner.lock().indexer_sources.values().cloned().collect();
        sources.sort_by_key(|s| s.id.get());
        Ok(sources)
    }

    async fn seed_default_indexer_source(&self, source: NewIndexerSource) -> CoreResult<()> {
        let mut guard = self.inner.lock();
        if !guard.indexer_sources.is_empty() {
            return Ok(());
        }
        let id = IndexerId::new(Ids::next(&self.ids.indexer_source));
        guard.indexer_sources.insert(
            id.get(),
            IndexerSourceConfig {
                id,
                name: source.name,
                kind: source.kind,
                priority: source.priority,
                base_url: source.base_url,
                api_key: source.api_key,
                categories: source.categories,
                enabled: source.enabled,
            },
        );
        Ok(())
    }

    async fn list_download_clients(&self) -> CoreResult<Vec<DownloadClientConfig>> {
        let mut clients: Vec<_> = self.inner.lock().download_clients.values().cloned().collect();
        clients.sort_by_key(|c| c.id.get());
        Ok(clients)
    }

    async fn seed_default_download_client(&self, client: NewDownloadClient) -> CoreResult<()> {
        let mut guard = self.inner.lock();
        if !guard.download_clients.is_empty() {
            return Ok(());
        }
        let id = DownloadClientId::new(Ids::next(&self.ids.download_client));
        guard.download_clients.insert(
            id.get(),
            DownloadClientConfig {
                id,
                name: client.name,
                kind: client.kind,
                base_url: client.base_url,
                api_key: client.api_key,
                download_dir: client.download_dir,
                enabled: client.enabled,
            },
        );
        Ok(())
    }
}

#[async_trait]
impl TransitionLogReader for InMemoryStore {
    async fn query_by_entity(&self, kind: EntityKind, entity_id: i64) -> CoreResult<Vec<Transition>> {
        let guard = self.inner.lock();
        Ok(guard
            .transitions
            .iter()
            .filter(|t| t.kind == kind && t.entity_id == entity_id)
            .cloned()
            .collect())
    }

    async fn query_by_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        kinds: &[EntityKind],
        offset: i64,
        limit: i64,
    ) -> CoreResult<Vec<Transition>> {
        let guard = self.inner.lock();
        let mut matches: Vec<Transition> = guard
            .transitions
            .iter()
            .filter(|t| t.at >= start && t.at <= end)
            .filter(|t| kinds.is_empty() || kinds.contains(&t.kind))
            .cloned()
            .collect();
        matches.sort_by_key(|t| t.at);
        Ok(matches
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count_by_window(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> CoreResult<i64> {
        let guard = self.inner.lock();
        Ok(guard
            .transitions
            .iter()
            .filter(|t| t.at >= start && t.at <= end)
            .count() as i64)
    }
}
