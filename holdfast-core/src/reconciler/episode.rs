//! The Episode state machine handler. An episode never sees a `Discovered` state of its own — it is
//! created already resolved into `Missing`/`Unreleased` by
//! [`EpisodeRepository::upsert_metadata`] during a Series index pass (see
//! [`super::series::index_series`]) — so this module only carries the
//! search-and-submit handler and the explicit re-search handler.

use std::collections::HashMap;
use std::sync::Arc;

use holdfast_model::Protocol;
use tracing::{instrument, warn};

use crate::domain::{EntityKind, Episode, EpisodeState, Fingerprint, Series};
use crate::downloads::client::DownloadClientPort;
use crate::error::CoreResult;
use crate::indexer::gateway::{ContentType, IndexerGateway, QuerySpec};
use crate::store::{DownloadRepository, EpisodeRepository, NewDownload, QualityRepository, Store};

use super::release_selection::{self, MatchCriteria, NoSelection};

#[derive(Debug, Clone, PartialEq)]
pub enum EpisodeOutcome {
    NoChange,
    Transitioned { to: EpisodeState },
}

fn no_selection_metadata(reason: &NoSelection) -> serde_json::Value {
    match reason {
        NoSelection::NoCandidates => serde_json::json!({ "reason": "no candidates" }),
        NoSelection::AllRejected => serde_json::json!({ "reason": "rejected" }),
    }
}

/// `Missing -> Downloading`, keyed on the owning series' title plus this
/// episode's season/episode numerals.
#[instrument(skip(store, gateway, clients), fields(episode_id = episode.id.get()))]
pub async fn evaluate_missing(
    store: &dyn Store,
    gateway: &IndexerGateway,
    clients: &HashMap<Protocol, Arc<dyn DownloadClientPort>>,
    episode_categories: &[u32],
    series: &Series,
    season_number: u16,
    episode: &Episode,
) -> CoreResult<EpisodeOutcome> {
    if episode.state != EpisodeState::Missing || !episode.monitored {
        return Ok(EpisodeOutcome::NoChange);
    }

    let profile = QualityRepository::get_profile(store, series.quality_profile_id).await?;
    let definitions = QualityRepository::list_definitions(store).await?;

    let search = gateway
        .search(
            episode_categories,
            QuerySpec {
                title: series.title.clone(),
                season: Some(season_number),
                episode: Some(episode.episode_number.value()),
                content_type: Some(ContentType::Episode),
                correlator: Some(series.external_id.to_string()),
            },
        )
        .await;

    for (indexer_id, err) in &search.errors {
        warn!(indexer_id = indexer_id.get(), error = %err, "indexer search failed for episode");
    }

    let criteria = MatchCriteria {
        title: series.title.clone(),
        season: Some(season_number),
        episode: Some(episode.episode_number.value()),
        external_correlator: Some(series.external_id.to_string()),
        categories: episode_categories.to_vec(),
    };

    let selected = match release_selection::select(
        search.releases,
        &criteria,
        &profile,
        &definitions,
        episode.runtime_minutes.map(|r| r as u32),
    ) {
        Ok(selected) => selected,
        Err(reason) => {
            EpisodeRepository::transition(
                store,
                episode.id,
                Some(EpisodeState::Missing),
                EpisodeState::Missing,
                Some(no_selection_metadata(&reason)),
            )
            .await?;
            return Ok(EpisodeOutcome::NoChange);
        }
    };

    let fingerprint = Fingerprint::new(
        EntityKind::Episode,
        episode.id.get(),
        selected.release.indexer_id,
        &selected.release.external_id,
    );

    if DownloadRepository::find_active_for_fingerprint(store, &fingerprint).await?.is_some() {
        return Ok(EpisodeOutcome::NoChange);
    }

    let Some(client) = clients.get(&selected.release.protocol) else {
        return Err(crate::error::CoreError::invalid(format!(
            "no download client configured for protocol {}",
            selected.release.protocol
        )));
    };

    // Claim the transition before submitting, so a losing concurrent pass
    // backs off instead of leaving an orphaned download behind.
    match EpisodeRepository::transition(
        store,
        episode.id,
        Some(EpisodeState::Missing),
        EpisodeState::Downloading,
        Some(serde_json::json!({ "release_title": selected.release.title })),
    )
    .await
    {
        Ok(()) => {}
        Err(crate::error::CoreError::Conflict) => return Ok(EpisodeOutcome::NoChange),
        Err(err) => return Err(err),
    }

    let submission = async {
        let client_side_id = client.add(&selected.release).await?;
        DownloadRepository::record(
            store,
            NewDownload {
                owning_kind: EntityKind::Episode,
                owning_id: episode.id.get(),
                client_id: client.id(),
                client_side_id,
                fingerprint,
            },
        )
        .await
    }
    .await;

    if let Err(err) = submission {
        warn!(episode_id = episode.id.get(), error = %err, "download submission failed after transition, reverting to missing");
        EpisodeRepository::transition(
            store,
            episode.id,
            Some(EpisodeState::Downloading),
            EpisodeState::Missing,
            Some(serde_json::json!({ "reason": "submission failed", "error": err.to_string() })),
        )
        .await?;
        return Err(err);
    }

    Ok(EpisodeOutcome::Transitioned { to: EpisodeState::Downloading })
}

/// `Completed -> Missing` / any state -> Missing on explicit re-search,
/// mirroring [`super::movie::force_missing`].
#[instrument(skip(store), fields(episode_id = episode.id.get()))]
pub async fn force_missing(store: &dyn Store, episode: &Episode) -> CoreResult<EpisodeOutcome> {
    if episode.state == EpisodeState::Missing {
        return Ok(EpisodeOutcome::NoChange);
    }
    EpisodeRepository::transition(store, episode.id, Some(episode.state), EpisodeState::Missing, None).await?;
    Ok(EpisodeOutcome::Transitioned { to: EpisodeState::Missing })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{QualityDefinition, QualityItem, QualityProfile, QualityToken};
    use crate::indexer::providers::memory::InMemoryIndexerProvider;
    use crate::store::memory::InMemoryStore;
    use crate::store::TransitionLogReader;
    use holdfast_model::{EpisodeNumber, IndexerId, QualityDefinitionId, QualityProfileId, SeasonId, SeriesId};

    fn seed(store: &InMemoryStore) -> (Series, Episode) {
        let series = Series {
            id: SeriesId::new(1),
            external_id: 1399,
            title: "Game of Thrones".into(),
            monitored: true,
            quality_profile_id: QualityProfileId::new(1),
            path: None,
            state: crate::domain::SeriesState::Continuing,
            added_at: chrono::Utc::now(),
        };
        let episode = Episode {
            id: holdfast_model::EpisodeId::new(1),
            season_id: SeasonId::new(1),
            episode_number: EpisodeNumber::new(1),
            air_date: chrono::NaiveDate::from_ymd_opt(2011, 4, 17),
            monitored: true,
            state: EpisodeState::Missing,
            runtime_minutes: Some(55),
        };

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
        store.seed_episode(episode.clone());
        (series, episode)
    }

    #[tokio::test]
    async fn missing_episode_with_winning_release_moves_to_downloading() {
        let store = InMemoryStore::new();
        let (series, episode) = seed(&store);

        let indexer = InMemoryIndexerProvider::new(IndexerId::new(1), "stub", vec![5000]);
        indexer.seed(vec![crate::domain::Release {
            external_id: "r1".into(),
            title: "Game.of.Thrones.S01E01.1080p.BluRay.x264-GROUP".into(),
            size_bytes: 3_500 * 1024 * 1024,
            seeders: Some(40),
            protocol: holdfast_model::Protocol::Torrent,
            indexer_id: IndexerId::new(1),
            categories: vec![5000],
            download_url: Some("magnet:?x".into()),
            guid: None,
            metadata_correlator: Some(series.external_id.to_string()),
            season: Some(1),
            episode: Some(1),
            runtime_minutes: None,
        }]);
        let gateway = IndexerGateway::new(vec![Arc::new(indexer)]);

        let client = Arc::new(crate::downloads::clients::InMemoryDownloadClient::new(
            holdfast_model::DownloadClientId::new(1),
        ));
        let mut clients: HashMap<Protocol, Arc<dyn DownloadClientPort>> = HashMap::new();
        clients.insert(Protocol::Torrent, client);

        let outcome = evaluate_missing(&store, &gateway, &clients, &[5000], &series, 1, &episode)
            .await
            .unwrap();
        assert_eq!(outcome, EpisodeOutcome::Transitioned { to: EpisodeState::Downloading });
    }

    #[tokio::test]
    async fn two_concurrent_passes_on_one_missing_episode_produce_one_download() {
        let store = InMemoryStore::new();
        let (series, episode) = seed(&store);

        let indexer = InMemoryIndexerProvider::new(IndexerId::new(1), "stub", vec![5000]);
        indexer.seed(vec![crate::domain::Release {
            external_id: "r1".into(),
            title: "Game.of.Thrones.S01E01.1080p.BluRay.x264-GROUP".into(),
            size_bytes: 3_500 * 1024 * 1024,
            seeders: Some(40),
            protocol: holdfast_model::Protocol::Torrent,
            indexer_id: IndexerId::new(1),
            categories: vec![5000],
            download_url: Some("magnet:?x".into()),
            guid: None,
            metadata_correlator: Some(series.external_id.to_string()),
            season: Some(1),
            episode: Some(1),
            runtime_minutes: None,
        }]);
        let gateway = IndexerGateway::new(vec![Arc::new(indexer)]);

        let client = Arc::new(crate::downloads::clients::InMemoryDownloadClient::new(
            holdfast_model::DownloadClientId::new(1),
        ));
        let mut clients: HashMap<Protocol, Arc<dyn DownloadClientPort>> = HashMap::new();
        clients.insert(Protocol::Torrent, client);

        let (first, second) = tokio::join!(
            evaluate_missing(&store, &gateway, &clients, &[5000], &series, 1, &episode),
            evaluate_missing(&store, &gateway, &clients, &[5000], &series, 1, &episode),
        );
        let outcomes = [first.unwrap(), second.unwrap()];
        let transitioned = outcomes.iter().filter(|o| matches!(o, EpisodeOutcome::Transitioned { .. })).count();
        let unchanged = outcomes.iter().filter(|o| matches!(o, EpisodeOutcome::NoChange)).count();
        assert_eq!(transitioned, 1);
        assert_eq!(unchanged, 1);

        let downloads = store.list_by_state(crate::domain::DownloadState::Queued).await.unwrap();
        assert_eq!(downloads.len(), 1, "exactly one download row, no orphan from the losing pass");
    }

    #[tokio::test]
    async fn unmonitored_episode_is_left_alone() {
        let store = InMemoryStore::new();
        let (series, mut episode) = seed(&store);
        episode.monitored = false;
        let gateway = IndexerGateway::new(vec![]);
        let clients: HashMap<Protocol, Arc<dyn DownloadClientPort>> = HashMap::new();

        let outcome = evaluate_missing(&store, &gateway, &clients, &[5000], &series, 1, &episode)
            .await
            .unwrap();
        assert_eq!(outcome, EpisodeOutcome::NoChange);
    }
}
