//! The Movie state machine handler.
//! Each function here is one handler the [`super::SchedulerLoop`] dispatches
//! to for a single entity visit; handlers commit at most one transition per
//! call and perform the store write themselves, matching the pattern
//! already established by [`crate::downloads::tracker::DownloadTracker`].

use std::collections::HashMap;
use std::sync::Arc;

use holdfast_model::Protocol;
use tracing::{instrument, warn};

use crate::domain::{EntityKind, Fingerprint, Movie, MovieState};
use crate::downloads::client::DownloadClientPort;
use crate::error::CoreResult;
use crate::indexer::gateway::{ContentType, IndexerGateway, QuerySpec};
use crate::metadata::MetadataProvider;
use crate::store::{DownloadRepository, MovieMetadataUpdate, MovieRepository, NewDownload, QualityRepository, Store};

use super::release_selection::{self, MatchCriteria, NoSelection};

#[derive(Debug, Clone, PartialEq)]
pub enum MovieOutcome {
    NoChange,
    Transitioned { to: MovieState },
}

fn no_selection_metadata(reason: &NoSelection) -> serde_json::Value {
    match reason {
        NoSelection::NoCandidates => serde_json::json!({ "reason": "no candidates" }),
        NoSelection::AllRejected => serde_json::json!({ "reason": "rejected" }),
    }
}

/// `Discovered -> Missing` / `Discovered -> Unreleased`: resolve metadata
/// and branch on whether the release date has passed.
#[instrument(skip(store, metadata), fields(movie_id = movie.id.get()))]
pub async fn evaluate_discovered(
    store: &dyn Store,
    metadata: &dyn MetadataProvider,
    movie: &Movie,
) -> CoreResult<MovieOutcome> {
    if movie.state != MovieState::Discovered {
        return Ok(MovieOutcome::NoChange);
    }

    let details = metadata.get_movie_details(movie.external_id).await?;
    MovieRepository::upsert_metadata(
        store,
        MovieMetadataUpdate {
            external_id: movie.external_id,
            title: details.title.clone(),
            year: details.release_date.map(|d| chrono::Datelike::year(&d)),
            release_date: details.release_date,
            runtime_minutes: details.runtime_minutes,
        },
    )
    .await?;

    let released = details
        .release_date
        .map(|d| d <= chrono::Utc::now().date_naive())
        .unwrap_or(false);
    let to = if released { MovieState::Missing } else { MovieState::Unreleased };

    MovieRepository::transition(store, movie.id, Some(MovieState::Discovered), to, None).await?;
    Ok(MovieOutcome::Transitioned { to })
}

/// `Missing -> Downloading`: search, select, and submit.
#[instrument(skip(store, gateway, clients), fields(movie_id = movie.id.get()))]
pub async fn evaluate_missing(
    store: &dyn Store,
    gateway: &IndexerGateway,
    clients: &HashMap<Protocol, Arc<dyn DownloadClientPort>>,
    movie_categories: &[u32],
    movie: &Movie,
) -> CoreResult<MovieOutcome> {
    if movie.state != MovieState::Missing || !movie.monitored {
        return Ok(MovieOutcome::NoChange);
    }

    let profile = QualityRepository::get_profile(store, movie.quality_profile_id).await?;
    let definitions = QualityRepository::list_definitions(store).await?;

    let search = gateway
        .search(
            movie_categories,
            QuerySpec {
                title: movie.title.clone(),
                season: None,
                episode: None,
                content_type: Some(ContentType::Movie),
                correlator: Some(movie.external_id.to_string()),
            },
        )
        .await;

    for (indexer_id, err) in &search.errors {
        warn!(indexer_id = indexer_id.get(), error = %err, "indexer search failed for movie");
    }

    let criteria = MatchCriteria {
        title: movie.title.clone(),
        season: None,
        episode: None,
        external_correlator: Some(movie.external_id.to_string()),
        categories: movie_categories.to_vec(),
    };

    let selected = match release_selection::select(
        search.releases,
        &criteria,
        &profile,
        &definitions,
        movie.runtime_minutes.map(|r| r as u32),
    ) {
        Ok(selected) => selected,
        Err(reason) => {
            MovieRepository::transition(
                store,
                movie.id,
                Some(MovieState::Missing),
                MovieState::Missing,
                Some(no_selection_metadata(&reason)),
            )
            .await?;
            return Ok(MovieOutcome::NoChange);
        }
    };

    let fingerprint = Fingerprint::new(
        EntityKind::Movie,
        movie.id.get(),
        selected.release.indexer_id,
        &selected.release.external_id,
    );

    if DownloadRepository::find_active_for_fingerprint(store, &fingerprint).await?.is_some() {
        // Another pass already has an active download for this exact
        // release; do nothing rather than double-submit.
        return Ok(MovieOutcome::NoChange);
    }

    let Some(client) = clients.get(&selected.release.protocol) else {
        return Err(crate::error::CoreError::invalid(format!(
            "no download client configured for protocol {}",
            selected.release.protocol
        )));
    };

    // Claim the Missing -> Downloading transition before talking to the
    // download client or recording the download: the transition is the
    // compare-and-swap that decides which of two racing reconcile passes
    // wins. If this loses the race (another pass already moved the movie),
    // back off rather than submit a release nobody will track.
    match MovieRepository::transition(
        store,
        movie.id,
        Some(MovieState::Missing),
        MovieState::Downloading,
        Some(serde_json::json!({ "release_title": selected.release.title })),
    )
    .await
    {
        Ok(()) => {}
        Err(crate::error::CoreError::Conflict) => return Ok(MovieOutcome::NoChange),
        Err(err) => return Err(err),
    }

    let submission = async {
        let client_side_id = client.add(&selected.release).await?;
        DownloadRepository::record(
            store,
            NewDownload {
                owning_kind: EntityKind::Movie,
                owning_id: movie.id.get(),
                client_id: client.id(),
                client_side_id,
                fingerprint,
            },
        )
        .await
    }
    .await;

    if let Err(err) = submission {
        warn!(movie_id = movie.id.get(), error = %err, "download submission failed after transition, reverting to missing");
        MovieRepository::transition(
            store,
            movie.id,
            Some(MovieState::Downloading),
            MovieState::Missing,
            Some(serde_json::json!({ "reason": "submission failed", "error": err.to_string() })),
        )
        .await?;
        return Err(err);
    }

    Ok(MovieOutcome::Transitioned { to: MovieState::Downloading })
}

/// `Completed -> Missing`: a user re-marks the movie and its file is
/// absent, or an explicit re-search is requested for any state:
/// `Completed -> Missing` if the user re-marks it and the file is absent,
/// or any state -> Missing on explicit re-search.
#[instrument(skip(store), fields(movie_id = movie.id.get()))]
pub async fn force_missing(store: &dyn Store, movie: &Movie) -> CoreResult<MovieOutcome> {
    if movie.state == MovieState::Missing {
        return Ok(MovieOutcome::NoChange);
    }
    MovieRepository::transition(store, movie.id, Some(movie.state), MovieState::Missing, None).await?;
    Ok(MovieOutcome::Transitioned { to: MovieState::Missing })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{QualityDefinition, QualityItem, QualityProfile, QualityToken};
    use crate::indexer::providers::memory::InMemoryIndexerProvider;
    use crate::metadata::{InMemoryMetadataProvider, MovieDetails as ProviderMovieDetails};
    use crate::store::memory::InMemoryStore;
    use crate::store::TransitionLogReader;
    use holdfast_model::{IndexerId, QualityDefinitionId, QualityProfileId};

    fn seed_movie(store: &InMemoryStore, state: MovieState) -> Movie {
        let id = holdfast_model::MovieId::new(1);
        let movie = Movie {
            id,
            external_id: 27205,
            title: "Inception".into(),
            year: Some(2010),
            monitored: true,
            quality_profile_id: QualityProfileId::new(1),
            path: None,
            state,
            release_date: chrono::NaiveDate::from_ymd_opt(2010, 7, 16),
            runtime_minutes: Some(148),
            added_at: chrono::Utc::now(),
        };
        store.seed_movie(movie.clone());
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
        movie
    }

    #[tokio::test]
    async fn discovered_with_past_release_date_moves_to_missing() {
        let store = InMemoryStore::new();
        let movie = seed_movie(&store, MovieState::Discovered);
        let metadata = InMemoryMetadataProvider::new();
        metadata.seed_movie(ProviderMovieDetails {
            external_id: movie.external_id,
            title: movie.title.clone(),
            original_title: None,
            release_date: movie.release_date,
            runtime_minutes: movie.runtime_minutes,
        });

        let outcome = evaluate_discovered(&store, &metadata, &movie).await.unwrap();
        assert_eq!(outcome, MovieOutcome::Transitioned { to: MovieState::Missing });
    }

    #[tokio::test]
    async fn discovered_with_future_release_date_moves_to_unreleased() {
        let store = InMemoryStore::new();
        let mut movie = seed_movie(&store, MovieState::Discovered);
        movie.release_date = Some(chrono::Utc::now().date_naive() + chrono::Duration::days(30));
        let metadata = InMemoryMetadataProvider::new();
        metadata.seed_movie(ProviderMovieDetails {
            external_id: movie.external_id,
            title: movie.title.clone(),
            original_title: None,
            release_date: movie.release_date,
            runtime_minutes: movie.runtime_minutes,
        });

        let outcome = evaluate_discovered(&store, &metadata, &movie).await.unwrap();
        assert_eq!(outcome, MovieOutcome::Transitioned { to: MovieState::Unreleased });
    }

    #[tokio::test]
    async fn missing_with_winning_release_moves_to_downloading() {
        let store = InMemoryStore::new();
        let movie = seed_movie(&store, MovieState::Missing);

        let indexer = InMemoryIndexerProvider::new(IndexerId::new(1), "stub", vec![2000]);
        indexer.seed(vec![crate::domain::Release {
            external_id: "r1".into(),
            title: "Inception.2010.1080p.BluRay.x264-GROUP".into(),
            size_bytes: 12_000 * 1024 * 1024,
            seeders: Some(40),
            protocol: holdfast_model::Protocol::Torrent,
            indexer_id: IndexerId::new(1),
            categories: vec![2000],
            download_url: Some("magnet:?x".into()),
            guid: None,
            metadata_correlator: Some(movie.external_id.to_string()),
            season: None,
            episode: None,
            runtime_minutes: None,
        }]);
        let gateway = IndexerGateway::new(vec![Arc::new(indexer)]);

        let client = Arc::new(crate::downloads::clients::InMemoryDownloadClient::new(
            holdfast_model::DownloadClientId::new(1),
        ));
        let mut clients: HashMap<Protocol, Arc<dyn DownloadClientPort>> = HashMap::new();
        clients.insert(Protocol::Torrent, client);

        let outcome = evaluate_missing(&store, &gateway, &clients, &[2000], &movie).await.unwrap();
        assert_eq!(outcome, MovieOutcome::Transitioned { to: MovieState::Downloading });
    }

    #[tokio::test]
    async fn two_concurrent_passes_on_one_missing_movie_produce_one_download() {
        let store = InMemoryStore::new();
        let movie = seed_movie(&store, MovieState::Missing);

        let indexer = InMemoryIndexerProvider::new(IndexerId::new(1), "stub", vec![2000]);
        indexer.seed(vec![crate::domain::Release {
            external_id: "r1".into(),
            title: "Inception.2010.1080p.BluRay.x264-GROUP".into(),
            size_bytes: 12_000 * 1024 * 1024,
            seeders: Some(40),
            protocol: holdfast_model::Protocol::Torrent,
            indexer_id: IndexerId::new(1),
            categories: vec![2000],
            download_url: Some("magnet:?x".into()),
            guid: None,
            metadata_correlator: Some(movie.external_id.to_string()),
            season: None,
            episode: None,
            runtime_minutes: None,
        }]);
        let gateway = IndexerGateway::new(vec![Arc::new(indexer)]);

        let client = Arc::new(crate::downloads::clients::InMemoryDownloadClient::new(
            holdfast_model::DownloadClientId::new(1),
        ));
        let mut clients: HashMap<Protocol, Arc<dyn DownloadClientPort>> = HashMap::new();
        clients.insert(Protocol::Torrent, client);

        // Two racing reconcile passes both see the movie as Missing: only
        // one may win the transition and record a download.
        let (first, second) = tokio::join!(
            evaluate_missing(&store, &gateway, &clients, &[2000], &movie),
            evaluate_missing(&store, &gateway, &clients, &[2000], &movie),
        );
        let outcomes = [first.unwrap(), second.unwrap()];
        let transitioned = outcomes.iter().filter(|o| matches!(o, MovieOutcome::Transitioned { .. })).count();
        let unchanged = outcomes.iter().filter(|o| matches!(o, MovieOutcome::NoChange)).count();
        assert_eq!(transitioned, 1);
        assert_eq!(unchanged, 1);

        let downloads = store.list_by_state(crate::domain::DownloadState::Queued).await.unwrap();
        assert_eq!(downloads.len(), 1, "exactly one download row, no orphan from the losing pass");
    }

    #[tokio::test]
    async fn missing_with_no_candidates_logs_and_stays_missing() {
        let store = InMemoryStore::new();
        let movie = seed_movie(&store, MovieState::Missing);
        let gateway = IndexerGateway::new(vec![]);
        let clients: HashMap<Protocol, Arc<dyn DownloadClientPort>> = HashMap::new();

        let outcome = evaluate_missing(&store, &gateway, &clients, &[2000], &movie).await.unwrap();
        assert_eq!(outcome, MovieOutcome::NoChange);

        let transitions = store.query_by_entity(EntityKind::Movie, movie.id.get()).await.unwrap();
        let last = transitions.last().unwrap();
        assert_eq!(last.metadata.as_ref().unwrap()["reason"], "no candidates");
    }
}
