use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Json;
use holdfast_core::domain::{Download, DownloadState};
use holdfast_core::store::DownloadRepository;
use serde::Deserialize;

use crate::http::handlers::ApiError;
use crate::http::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListDownloadsQuery {
    state: Option<DownloadState>,
}

/// Lists downloads in the requested state, or every state if none was
/// given — `DownloadRepository` only exposes `list_by_state`, so "all" is
/// the fan-out over every variant rather than a separate store method.
pub async fn list(State(state): State<Arc<AppState>>, Query(query): Query<ListDownloadsQuery>) -> Result<Json<Vec<Download>>, ApiError> {
    let states = match query.state {
        Some(s) => vec![s],
        None => vec![DownloadState::Queued, DownloadState::Active, DownloadState::Done, DownloadState::Failed],
    };

    let mut downloads = Vec::new();
    for s in states {
        downloads.extend(state.store.list_by_state(s).await?);
    }
    Ok(Json(downloads))
}
