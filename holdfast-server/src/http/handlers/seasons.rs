use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::Json;
use holdfast_core::domain::{Season, SeasonAggregateState};
use holdfast_core::store::{EpisodeFilter, EpisodeRepository, SeasonFilter, SeasonRepository};
use holdfast_model::SeriesId;
use serde::Serialize;

use crate::http::handlers::ApiError;
use crate::http::state::AppState;

/// A season plus its aggregate state, computed at read time from its
/// monitored episodes' states rather than stored on the season row.
#[derive(Debug, Serialize)]
pub struct SeasonWithState {
    #[serde(flatten)]
    pub season: Season,
    pub state: SeasonAggregateState,
}

pub async fn list_for_series(
    State(state): State<Arc<AppState>>,
    Path(series_id): Path<i64>,
) -> Result<Json<Vec<SeasonWithState>>, ApiError> {
    let series_id = SeriesId::new(series_id);
    let seasons = state.store.list(SeasonFilter { series_id: Some(series_id), monitored: None }).await?;

    let mut with_state = Vec::with_capacity(seasons.len());
    for season in seasons {
        let episodes = state
            .store
            .list(EpisodeFilter { season_id: Some(season.id), state: None, monitored: Some(true) })
            .await?;
        let episode_states: Vec<_> = episodes.into_iter().map(|e| e.state).collect();
        let aggregate = SeasonAggregateState::derive(&episode_states);
        with_state.push(SeasonWithState { season, state: aggregate });
    }

    Ok(Json(with_state))
}
