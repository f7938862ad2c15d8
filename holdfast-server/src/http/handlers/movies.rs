use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::Json;
use holdfast_core::domain::{Movie, MovieState};
use holdfast_core::store::{MovieFilter, MovieRepository};
use holdfast_model::MovieId;
use serde::Deserialize;

use crate::http::handlers::ApiError;
use crate::http::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListMoviesQuery {
    state: Option<MovieState>,
    monitored: Option<bool>,
}

pub async fn list(State(state): State<Arc<AppState>>, Query(query): Query<ListMoviesQuery>) -> Result<Json<Vec<Movie>>, ApiError> {
    let filter = MovieFilter { state: query.state, monitored: query.monitored, external_id: None };
    let movies = state.store.list(filter).await?;
    Ok(Json(movies))
}

pub async fn get(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> Result<Json<Movie>, ApiError> {
    let movie = state.store.get(MovieId::new(id)).await?;
    Ok(Json(movie))
}
