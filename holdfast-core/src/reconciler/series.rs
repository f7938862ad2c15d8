//! The Series index handler: resolves a series' external metadata into its
//! season/episode tree and derives the series' own airing state.
//!
//! Only the Season aggregate derivation is spelled out in detail
//! elsewhere (see [`crate::domain::SeasonAggregateState::derive`]); it is silent on
//! what drives a Series between `Continuing`/`Ended`/`Unreleased`, since the
//! trimmed metadata surface carries no upstream "still
//! airing" flag. This derives it from the episode air dates the provider
//! does give us: a series with any monitored episode not yet aired is still
//! `Continuing`, one with aired episodes but none upcoming has `Ended`, and
//! one with no episodes at all yet is `Unreleased`.

use tracing::instrument;

use crate::domain::{EpisodeState, Series, SeriesState};
use crate::error::CoreResult;
use crate::metadata::MetadataProvider;
use crate::store::{
    EpisodeMetadataUpdate, EpisodeRepository, SeasonRepository, SeriesMetadataUpdate, SeriesRepository, Store,
};

#[derive(Debug, Clone, PartialEq)]
pub struct IndexOutcome {
    pub seasons_indexed: usize,
    pub episodes_indexed: usize,
    pub series_transitioned_to: Option<SeriesState>,
}

fn derive_series_state(episode_states: &[EpisodeState]) -> SeriesState {
    if episode_states.is_empty() {
        return SeriesState::Unreleased;
    }
    if episode_states.iter().any(|s| *s == EpisodeState::Unreleased) {
        return SeriesState::Continuing;
    }
    SeriesState::Ended
}

/// Fetches `get_series_details`, upserts every season and episode it
/// describes, and transitions the series' own state to match.
#[instrument(skip(store, metadata), fields(series_id = series.id.get()))]
pub async fn index_series(
    store: &dyn Store,
    metadata: &dyn MetadataProvider,
    series: &Series,
) -> CoreResult<IndexOutcome> {
    let details = metadata.get_series_details(series.external_id).await?;

    SeriesRepository::upsert_metadata(
        store,
        SeriesMetadataUpdate { external_id: series.external_id, title: details.title.clone() },
    )
    .await?;

    let mut episode_states = Vec::new();
    let mut episodes_indexed = 0usize;

    for season in &details.seasons {
        let season_id = SeasonRepository::upsert(
            store,
            series.id,
            holdfast_model::SeasonNumber::new(season.season_number),
            true,
        )
        .await?;

        for ep in &season.episodes {
            let episode_id = EpisodeRepository::upsert_metadata(
                store,
                EpisodeMetadataUpdate {
                    season_id,
                    episode_number: holdfast_model::EpisodeNumber::new(ep.episode_number),
                    air_date: ep.air_date,
                    runtime_minutes: ep.runtime_minutes,
                },
            )
            .await?;
            episodes_indexed += 1;

            let episode = EpisodeRepository::get(store, episode_id).await?;
            episode_states.push(episode.state);
        }
    }

    let target_state = derive_series_state(&episode_states);
    let transitioned = if target_state != series.state {
        SeriesRepository::transition(store, series.id, Some(series.state), target_state, None).await?;
        Some(target_state)
    } else {
        None
    };

    Ok(IndexOutcome {
        seasons_indexed: details.seasons.len(),
        episodes_indexed,
        series_transitioned_to: transitioned,
    })
}
