use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{downloads, health, movies, seasons, series};
use super::state::AppState;

pub fn create_app(state: AppState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/ping", get(health::ping))
        .route("/health", get(health::health))
        .route("/api/v1/movies", get(movies::list))
        .route("/api/v1/movies/:id", get(movies::get))
        .route("/api/v1/series", get(series::list))
        .route("/api/v1/series/:id", get(series::get))
        .route("/api/v1/series/:id/seasons", get(seasons::list_for_series))
        .route("/api/v1/downloads", get(downloads::list))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use holdfast_core::store::memory::InMemoryStore;
    use tower::ServiceExt;

    use super::create_app;
    use crate::http::state::AppState;

    fn app() -> axum::Router {
        create_app(AppState { store: Arc::new(InMemoryStore::new()) })
    }

    #[tokio::test]
    async fn ping_is_reachable_through_the_router() {
        let response = app().oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn empty_store_lists_no_movies() {
        let response = app()
            .oneshot(Request::builder().uri("/api/v1/movies").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let response = app().oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
