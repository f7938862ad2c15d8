//! The Download Tracker's poll loop: the sole promoter of
//! `Downloading -> Downloaded` for its owning entity.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use holdfast_model::{DownloadClientId, EpisodeId, MovieId};
use parking_lot::Mutex;
use tracing::{info, instrument, warn};

use crate::domain::{Download, DownloadState, EntityKind, EpisodeState, MovieState};
use crate::downloads::client::{ClientStatus, DownloadClientPort};
use crate::error::{CoreError, CoreResult};
use crate::importer;
use crate::store::{
    DownloadRepository, EpisodeRepository, MovieRepository, SeasonRepository, SeriesRepository, Store,
};

/// A record of how many Downloads were moved into each terminal bucket on
/// one tick, returned mainly for tests and CLI one-shot output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerTickOutcome {
    pub completed: u32,
    pub failed: u32,
    pub still_pending: u32,
}

struct ProgressSample {
    progress: f32,
    observed_at: Instant,
}

pub struct DownloadTracker {
    store: Arc<dyn Store>,
    clients: HashMap<DownloadClientId, Arc<dyn DownloadClientPort>>,
    grace_period: Duration,
    stall_threshold: Duration,
    movies_root: PathBuf,
    tv_root: PathBuf,
    missing_since: Mutex<HashMap<holdfast_model::DownloadId, Instant>>,
    progress: Mutex<HashMap<holdfast_model::DownloadId, ProgressSample>>,
}

impl DownloadTracker {
    pub fn new(
        store: Arc<dyn Store>,
        clients: HashMap<DownloadClientId, Arc<dyn DownloadClientPort>>,
        grace_period: Duration,
        stall_threshold: Duration,
        movies_root: PathBuf,
        tv_root: PathBuf,
    ) -> Self {
        DownloadTracker {
            store,
            clients,
            grace_period,
            stall_threshold,
            movies_root,
            tv_root,
            missing_since: Mutex::new(HashMap::new()),
            progress: Mutex::new(HashMap::new()),
        }
    }

    /// Runs one poll tick: loads every tracked Download, groups by client,
    /// fetches each client's list once, and correlates.
    #[instrument(skip(self))]
    pub async fn tick(&self) -> CoreResult<TrackerTickOutcome> {
        let mut queued = self.store.list_by_state(DownloadState::Queued).await?;
        let active = self.store.list_by_state(DownloadState::Active).await?;
        queued.extend(active);

        let mut by_client: HashMap<DownloadClientId, Vec<Download>> = HashMap::new();
        for download in queued {
            by_client.entry(download.client_id).or_default().push(download);
        }

        let mut outcome = TrackerTickOutcome::default();

        for (client_id, downloads) in by_client {
            let Some(client) = self.clients.get(&client_id) else {
                warn!(client_id = client_id.get(), "tracked download references unconfigured client");
                outcome.still_pending += downloads.len() as u32;
                continue;
            };
            let statuses = client.list().await?;
            let by_client_side_id: HashMap<&str, &ClientStatus> =
                statuses.iter().map(|s| (s.client_side_id.as_str(), s)).collect();

            for download in &downloads {
                match by_client_side_id.get(download.client_side_id.as_str()) {
                    None => {
                        if self.handle_missing(download).await? {
                            outcome.failed += 1;
                        } else {
                            outcome.still_pending += 1;
                        }
                    }
                    Some(status) => {
                        self.missing_since.lock().remove(&download.id);
                        match self.handle_correlated(download, status).await? {
                            Correlated::Completed => outcome.completed += 1,
                            Correlated::Failed => outcome.failed += 1,
                            Correlated::Pending => outcome.still_pending += 1,
                        }
                    }
                }
            }
        }

        Ok(outcome)
    }

    /// Item present in the store but absent from the client's list: mark
    /// Failed once it has been missing longer than the grace period,
    /// which tolerates a client restart without failing every in-flight
    /// download immediately.
    async fn handle_missing(&self, download: &Download) -> CoreResult<bool> {
        let now = Instant::now();
        let first_missing = *self.missing_since.lock().entry(download.id).or_insert(now);
        if now.duration_since(first_missing) < self.grace_period {
            return Ok(false);
        }
        self.missing_since.lock().remove(&download.id);
        self.fail_download(download, "missing from download client past grace period").await?;
        Ok(true)
    }

    async fn handle_correlated(&self, download: &Download, status: &ClientStatus) -> CoreResult<Correlated> {
        if status.errored {
            self.progress.lock().remove(&download.id);
            self.fail_download(download, "download client reported an error").await?;
            return Ok(Correlated::Failed);
        }

        if status.done && status.progress >= 100.0 {
            self.progress.lock().remove(&download.id);
            return self.complete_download(download, status).await;
        }

        if self.is_stalled(download, status.progress) {
            self.progress.lock().remove(&download.id);
            self.fail_download(download, "download stalled past stall threshold").await?;
            return Ok(Correlated::Failed);
        }

        Ok(Correlated::Pending)
    }

    fn is_stalled(&self, download: &Download, current_progress: f32) -> bool {
        let now = Instant::now();
        let mut progress = self.progress.lock();
        match progress.get_mut(&download.id) {
            Some(sample) if sample.progress < current_progress => {
                sample.progress = current_progress;
                sample.observed_at = now;
                false
            }
            Some(sample) => now.duration_since(sample.observed_at) >= self.stall_threshold,
            None => {
                progress.insert(download.id, ProgressSample { progress: current_progress, observed_at: now });
                false
            }
        }
    }

    /// Failure path shared by the missing-past-grace-period and
    /// client-reported-error branches: transition Download to Failed and
    /// the owning entity `Downloading -> Missing`.
    async fn fail_download(&self, download: &Download, reason: &str) -> CoreResult<()> {
        warn!(download_id = download.id.get(), reason, "failing tracked download");
        DownloadRepository::transition(self.store.as_ref(), download.id, download.state, DownloadState::Failed)
            .await?;
        let metadata = Some(serde_json::json!({ "reason": reason }));
        match download.owning_kind {
            EntityKind::Movie => {
                MovieRepository::transition(
                    self.store.as_ref(),
                    MovieId::new(download.owning_id),
                    Some(MovieState::Downloading),
                    MovieState::Missing,
                    metadata,
                )
                .await?
            }
            EntityKind::Episode => {
                EpisodeRepository::transition(
                    self.store.as_ref(),
                    EpisodeId::new(download.owning_id),
                    Some(EpisodeState::Downloading),
                    EpisodeState::Missing,
                    metadata,
                )
                .await?
            }
            other => {
                return Err(CoreError::invalid(format!("download owned by unsupported entity kind {other}")));
            }
        }
        Ok(())
    }

    /// `status.done && progress >= 100` branch: propose the owning entity's
    /// `Downloading -> Downloaded` transition, hand the file paths to the
    /// importer, then either finish at `Completed`/`Done` or roll back to
    /// `Missing`/`Failed` on an import error.
    async fn complete_download(&self, download: &Download, status: &ClientStatus) -> CoreResult<Correlated> {
        let Some(source) = status.file_paths.first() else {
            self.fail_download(download, "client reported done with no file paths").await?;
            return Ok(Correlated::Failed);
        };

        match download.owning_kind {
            EntityKind::Movie => self.complete_movie(download, source).await,
            EntityKind::Episode => self.complete_episode(download, source).await,
            other => Err(CoreError::invalid(format!("download owned by unsupported entity kind {other}"))),
        }
    }

    async fn complete_movie(&self, download: &Download, source: &std::path::Path) -> CoreResult<Correlated> {
        let movie_id = MovieId::new(download.owning_id);
        let movie = MovieRepository::get(self.store.as_ref(), movie_id).await?;

        MovieRepository::transition(self.store.as_ref(), movie_id, Some(MovieState::Downloading), MovieState::Downloaded, None)
            .await?;

        let destination = importer::movie_destination(&self.movies_root, &movie.title, source)?;
        match importer::import_file(source, &destination, &self.movies_root) {
            Ok(result) => {
                self.store.set_path(movie_id, result.file.relative_path.display().to_string()).await?;
                MovieRepository::transition(self.store.as_ref(), movie_id, Some(MovieState::Downloaded), MovieState::Completed, None)
                    .await?;
                DownloadRepository::transition(self.store.as_ref(), download.id, download.state, DownloadState::Done).await?;
                info!(movie_id = movie_id.get(), "movie import completed");
                Ok(Correlated::Completed)
            }
            Err(err) => {
                warn!(movie_id = movie_id.get(), error = %err, "importer failed for movie download");
                DownloadRepository::transition(self.store.as_ref(), download.id, download.state, DownloadState::Failed).await?;
                MovieRepository::transition(self.store.as_ref(), movie_id, Some(MovieState::Downloaded), MovieState::Missing, None)
                    .await?;
                Ok(Correlated::Failed)
            }
        }
    }

    async fn complete_episode(&self, download: &Download, source: &std::path::Path) -> CoreResult<Correlated> {
        let episode_id = EpisodeId::new(download.owning_id);
        let episode = EpisodeRepository::get(self.store.as_ref(), episode_id).await?;
        let season = SeasonRepository::get(self.store.as_ref(), episode.season_id).await?;
        let series = SeriesRepository::get(self.store.as_ref(), season.series_id).await?;

        EpisodeRepository::transition(
            self.store.as_ref(),
            episode_id,
            Some(EpisodeState::Downloading),
            EpisodeState::Downloaded,
            None,
        )
        .await?;

        let destination =
            importer::episode_destination(&self.tv_root, &series.title, season.season_number.value(), source)?;
        match importer::import_file(source, &destination, &self.tv_root) {
            Ok(_result) => {
                EpisodeRepository::transition(
                    self.store.as_ref(),
                    episode_id,
                    Some(EpisodeState::Downloaded),
                    EpisodeState::Completed,
                    None,
                )
                .await?;
                DownloadRepository::transition(self.store.as_ref(), download.id, download.state, DownloadState::Done).await?;
                info!(episode_id = episode_id.get(), "episode import completed");
                Ok(Correlated::Completed)
            }
            Err(err) => {
                warn!(episode_id = episode_id.get(), error = %err, "importer failed for episode download");
                DownloadRepository::transition(self.store.as_ref(), download.id, download.state, DownloadState::Failed).await?;
                EpisodeRepository::transition(
                    self.store.as_ref(),
                    episode_id,
                    Some(EpisodeState::Downloaded),
                    EpisodeState::Missing,
                    None,
                )
                .await?;
                Ok(Correlated::Failed)
            }
        }
    }
}

enum Correlated {
    Completed,
    Failed,
    Pending,
}
