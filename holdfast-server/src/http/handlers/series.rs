use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::Json;
use holdfast_core::domain::{Series, SeriesState};
use holdfast_core::store::{SeriesFilter, SeriesRepository};
use holdfast_model::SeriesId;
use serde::Deserialize;

use crate::http::handlers::ApiError;
use crate::http::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListSeriesQuery {
    state: Option<SeriesState>,
    monitored: Option<bool>,
}

pub async fn list(State(state): State<Arc<AppState>>, Query(query): Query<ListSeriesQuery>) -> Result<Json<Vec<Series>>, ApiError> {
    let filter = SeriesFilter { state: query.state, monitored: query.monitored, external_id: None };
    let series = state.store.list(filter).await?;
    Ok(Json(series))
}

pub async fn get(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> Result<Json<Series>, ApiError> {
    let series = state.store.get(SeriesId::new(id)).await?;
    Ok(Json(series))
}
