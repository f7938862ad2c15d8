//! Cross-component scenarios that exercise the Reconciler, the Indexer
//! Gateway, the Download Tracker, and the Library Importer wired together,
//! as opposed to the embedded unit tests that cover each in isolation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use holdfast_core::domain::{
    EpisodeState, Movie, MovieState, QualityDefinition, QualityItem, QualityProfile, QualityToken,
    Release, Series, SeriesState,
};
use holdfast_core::downloads::client::DownloadClientPort;
use holdfast_core::downloads::clients::InMemoryDownloadClient;
use holdfast_core::downloads::tracker::DownloadTracker;
use holdfast_core::indexer::gateway::IndexerGateway;
use holdfast_core::indexer::providers::memory::InMemoryIndexerProvider;
use holdfast_core::metadata::provider::{EpisodeSummary, MovieDetails, SeasonSummary, SeriesDetails};
use holdfast_core::metadata::InMemoryMetadataProvider;
use holdfast_core::reconciler::{EntityScope, Phase, Reconciler, ReconcilerConfig, SchedulerLoop};
use holdfast_core::store::memory::InMemoryStore;
use holdfast_core::store::{DownloadRepository, EpisodeRepository, MovieRepository, SeriesRepository};
use holdfast_model::{
    DownloadClientId, IndexerId, MovieId, Protocol, QualityDefinitionId, QualityProfileId, SeriesId,
};

fn quality_profile() -> QualityProfile {
    QualityProfile {
        id: QualityProfileId::new(1),
        name: "HD".into(),
        items: vec![QualityItem { token: QualityToken::Bluray1080p, allowed: true }],
        min_quality: QualityToken::WebDl720p,
        max_quality: QualityToken::Bluray2160p,
    }
}

fn quality_definitions() -> Vec<QualityDefinition> {
    vec![QualityDefinition {
        id: QualityDefinitionId::new(1),
        token: QualityToken::Bluray1080p,
        name: "Bluray-1080p".into(),
        min_mb_per_minute: 40.0,
        max_mb_per_minute: 120.0,
        preferred_mb_per_minute: 80.0,
    }]
}

fn release(external_id: &str, title: &str, correlator: &str, season: Option<u16>, episode: Option<u16>) -> Release {
    Release {
        external_id: external_id.into(),
        title: title.into(),
        size_bytes: 12_000 * 1024 * 1024,
        seeders: Some(40),
        protocol: Protocol::Torrent,
        indexer_id: IndexerId::new(1),
        categories: vec![2000, 5000],
        download_url: Some("magnet:?x".into()),
        guid: None,
        metadata_correlator: Some(correlator.into()),
        season,
        episode,
        runtime_minutes: None,
    }
}

/// A Discovered movie is resolved by the Index sweep, driven to
/// Downloading by the Reconcile sweep, and the Download Tracker then
/// completes it all the way to `Completed` with a file placed under the
/// configured library root.
#[tokio::test]
async fn movie_lifecycle_from_discovery_to_completed_import() {
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
    store.seed_quality_profile(quality_profile());
    store.seed_quality_definitions(quality_definitions());

    let metadata = Arc::new(InMemoryMetadataProvider::new());
    metadata.seed_movie(MovieDetails {
        external_id: 27205,
        title: "Inception".into(),
        original_title: None,
        release_date: chrono::NaiveDate::from_ymd_opt(2010, 7, 16),
        runtime_minutes: Some(148),
    });

    let indexer = InMemoryIndexerProvider::new(IndexerId::new(1), "stub", vec![2000]);
    indexer.seed(vec![release("r1", "Inception.2010.1080p.BluRay.x264-GROUP", "27205", None, None)]);
    let gateway = Arc::new(IndexerGateway::new(vec![Arc::new(indexer)]));

    let client_id = DownloadClientId::new(1);
    let client = Arc::new(InMemoryDownloadClient::new(client_id));
    let mut clients: HashMap<Protocol, Arc<dyn DownloadClientPort>> = HashMap::new();
    clients.insert(Protocol::Torrent, client.clone());

    let reconciler = Arc::new(Reconciler::new(store.clone(), metadata, gateway, clients, ReconcilerConfig::default()));

    reconciler.run_once(EntityScope::Movie, Phase::Index).await.unwrap();
    let movie = MovieRepository::get(store.as_ref(), movie_id).await.unwrap();
    assert_eq!(movie.state, MovieState::Missing);

    reconciler.run_once(EntityScope::Movie, Phase::Reconcile).await.unwrap();
    let movie = MovieRepository::get(store.as_ref(), movie_id).await.unwrap();
    assert_eq!(movie.state, MovieState::Downloading);

    let downloaded = store.list_by_state(holdfast_core::domain::DownloadState::Queued).await.unwrap();
    assert_eq!(downloaded.len(), 1);
    let client_side_id = downloaded[0].client_side_id.clone();

    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("inception.mkv");
    std::fs::write(&source, b"movie bytes").unwrap();
    client.set_status(&client_side_id, 100.0, true, vec![source]);

    let mut tracker_clients: HashMap<DownloadClientId, Arc<dyn DownloadClientPort>> = HashMap::new();
    tracker_clients.insert(client_id, client);
    let tracker = DownloadTracker::new(
        store.clone(),
        tracker_clients,
        Duration::from_secs(60),
        Duration::from_secs(60),
        dir.path().join("movies"),
        dir.path().join("tv"),
    );
    let outcome = tracker.tick().await.unwrap();
    assert_eq!(outcome.completed, 1);

    let movie = MovieRepository::get(store.as_ref(), movie_id).await.unwrap();
    assert_eq!(movie.state, MovieState::Completed);
    let path = movie.path.expect("completed movie has a relative path");
    assert!(dir.path().join("movies").join(&path).exists());
}

/// A series' Index sweep resolves a season/episode tree from metadata, the
/// Reconcile sweep drives the one aired-but-missing episode to
/// Downloading, and the Tracker finishes the job through the importer.
#[tokio::test]
async fn series_reconcile_drives_an_episode_through_download_and_import() {
    let store = Arc::new(InMemoryStore::new());
    let series_id = SeriesId::new(1);
    store.seed_series(Series {
        id: series_id,
        external_id: 1399,
        title: "Example Show".into(),
        monitored: true,
        quality_profile_id: QualityProfileId::new(1),
        path: None,
        state: SeriesState::Unreleased,
        added_at: chrono::Utc::now(),
    });
    store.seed_quality_profile(quality_profile());
    store.seed_quality_definitions(quality_definitions());

    let metadata = Arc::new(InMemoryMetadataProvider::new());
    metadata.seed_series(SeriesDetails {
        external_id: 1399,
        title: "Example Show".into(),
        seasons: vec![SeasonSummary {
            season_number: 1,
            episodes: vec![EpisodeSummary {
                episode_number: 1,
                air_date: chrono::NaiveDate::from_ymd_opt(2020, 1, 1),
                runtime_minutes: Some(45),
            }],
        }],
    });

    let indexer = InMemoryIndexerProvider::new(IndexerId::new(1), "stub", vec![5000]);
    indexer.seed(vec![release(
        "r1",
        "Example.Show.S01E01.1080p.BluRay.x264-GROUP",
        "1399",
        Some(1),
        Some(1),
    )]);
    let gateway = Arc::new(IndexerGateway::new(vec![Arc::new(indexer)]));

    let client_id = DownloadClientId::new(1);
    let client = Arc::new(InMemoryDownloadClient::new(client_id));
    let mut clients: HashMap<Protocol, Arc<dyn DownloadClientPort>> = HashMap::new();
    clients.insert(Protocol::Torrent, client.clone());

    let reconciler = Arc::new(Reconciler::new(store.clone(), metadata, gateway, clients, ReconcilerConfig::default()));

    reconciler.run_once(EntityScope::Series, Phase::Index).await.unwrap();
    let episodes = EpisodeRepository::list(store.as_ref(), Default::default()).await.unwrap();
    assert_eq!(episodes.len(), 1);
    assert_eq!(episodes[0].state, EpisodeState::Missing);
    let episode_id = episodes[0].id;

    reconciler.run_once(EntityScope::Series, Phase::Reconcile).await.unwrap();
    let episode = EpisodeRepository::get(store.as_ref(), episode_id).await.unwrap();
    assert_eq!(episode.state, EpisodeState::Downloading);

    let active = store.list_by_state(holdfast_core::domain::DownloadState::Queued).await.unwrap();
    assert_eq!(active.len(), 1);
    let client_side_id = active[0].client_side_id.clone();

    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("s01e01.mkv");
    std::fs::write(&source, b"episode bytes").unwrap();
    client.set_status(&client_side_id, 100.0, true, vec![source]);

    let mut tracker_clients: HashMap<DownloadClientId, Arc<dyn DownloadClientPort>> = HashMap::new();
    tracker_clients.insert(client_id, client);
    let tracker = DownloadTracker::new(
        store.clone(),
        tracker_clients,
        Duration::from_secs(60),
        Duration::from_secs(60),
        dir.path().join("movies"),
        dir.path().join("tv"),
    );
    let outcome = tracker.tick().await.unwrap();
    assert_eq!(outcome.completed, 1);

    let episode = EpisodeRepository::get(store.as_ref(), episode_id).await.unwrap();
    assert_eq!(episode.state, EpisodeState::Completed);

    let series = SeriesRepository::get(store.as_ref(), series_id).await.unwrap();
    assert_eq!(series.state, SeriesState::Ended);
}

/// A `SchedulerLoop` run under a real `tokio::time::interval` stops as soon
/// as its `CancellationToken` fires, rather than running until the process
/// exits.
#[tokio::test(start_paused = true)]
async fn scheduler_loop_stops_promptly_once_cancelled() {
    let store = Arc::new(InMemoryStore::new());
    let metadata = Arc::new(InMemoryMetadataProvider::new());
    let gateway = Arc::new(IndexerGateway::new(vec![]));
    let reconciler = Arc::new(Reconciler::new(
        store,
        metadata,
        gateway,
        HashMap::new(),
        ReconcilerConfig::default(),
    ));

    let cancel = tokio_util::sync::CancellationToken::new();
    let scheduler = Arc::new(SchedulerLoop::new(EntityScope::Movie, Phase::Index, Duration::from_millis(10)));
    let handle = tokio::spawn(scheduler.run(reconciler, cancel.clone()));

    tokio::time::advance(Duration::from_millis(35)).await;
    cancel.cancel();

    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("scheduler loop task should join promptly after cancellation")
        .unwrap();
}

/// A Download that reports unchanging progress for longer than the stall
/// threshold is failed back to `Missing`, distinct from the
/// missing-from-client and completed paths already covered in
/// `downloads::tracker`'s embedded tests.
#[tokio::test(start_paused = true)]
async fn download_tracker_fails_a_stalled_download() {
    let store = Arc::new(InMemoryStore::new());
    let movie_id = MovieId::new(1);
    store.seed_movie(Movie {
        id: movie_id,
        external_id: 1,
        title: "Stalled Movie".into(),
        year: Some(2020),
        monitored: true,
        quality_profile_id: QualityProfileId::new(1),
        path: None,
        state: MovieState::Downloading,
        release_date: None,
        runtime_minutes: Some(100),
        added_at: chrono::Utc::now(),
    });

    let client_id = DownloadClientId::new(1);
    let client = Arc::new(InMemoryDownloadClient::new(client_id));
    let client_side_id = client
        .add(&release("r1", "Stalled Movie", "1", None, None))
        .await
        .unwrap();

    let fingerprint =
        holdfast_core::domain::Fingerprint::new(holdfast_core::domain::EntityKind::Movie, movie_id.get(), IndexerId::new(1), "r1");
    let download = store
        .record(holdfast_core::store::NewDownload {
            owning_kind: holdfast_core::domain::EntityKind::Movie,
            owning_id: movie_id.get(),
            client_id,
            client_side_id: client_side_id.clone(),
            fingerprint,
        })
        .await
        .unwrap();
    DownloadRepository::transition(
        store.as_ref(),
        download.id,
        holdfast_core::domain::DownloadState::Queued,
        holdfast_core::domain::DownloadState::Active,
    )
    .await
    .unwrap();
    client.set_status(&client_side_id, 40.0, false, vec![]);

    let mut clients: HashMap<DownloadClientId, Arc<dyn DownloadClientPort>> = HashMap::new();
    clients.insert(client_id, client);
    let tracker = DownloadTracker::new(
        store.clone(),
        clients,
        Duration::from_secs(600),
        Duration::from_millis(50),
        std::path::PathBuf::from("/movies"),
        std::path::PathBuf::from("/tv"),
    );

    // First tick only observes the progress sample; progress has not moved
    // since, so the second tick (after the stall threshold elapses) fails it.
    tracker.tick().await.unwrap();
    tokio::time::advance(Duration::from_millis(100)).await;
    let outcome = tracker.tick().await.unwrap();
    assert_eq!(outcome.failed, 1);

    let movie = MovieRepository::get(store.as_ref(), movie_id).await.unwrap();
    assert_eq!(movie.state, MovieState::Missing);
}
