//! An in-memory metadata provider test double, seeded with canned
//! [`MovieDetails`]/[`SeriesDetails`] so reconciler tests can exercise the
//! Discovered/Missing/Unreleased transitions without a network call.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{CoreError, CoreResult};

use super::provider::{MetadataProvider, MovieDetails, SearchHit, SeriesDetails};

#[derive(Default)]
pub struct InMemoryMetadataProvider {
    movies: Mutex<HashMap<i64, MovieDetails>>,
    series: Mutex<HashMap<i64, SeriesDetails>>,
}

impl InMemoryMetadataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_movie(&self, details: MovieDetails) {
        self.movies.lock().insert(details.external_id, details);
    }

    pub fn seed_series(&self, details: SeriesDetails) {
        self.series.lock().insert(details.external_id, details);
    }
}

#[async_trait]
impl MetadataProvider for InMemoryMetadataProvider {
    async fn get_movie_details(&self, external_id: i64) -> CoreResult<MovieDetails> {
        self.movies
            .lock()
            .get(&external_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(format!("movie {external_id}")))
    }

    async fn get_series_details(&self, external_id: i64) -> CoreResult<SeriesDetails> {
        self.series
            .lock()
            .get(&external_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(format!("series {external_id}")))
    }

    async fn search_movie(&self, query: &str) -> CoreResult<Vec<SearchHit>> {
        let query = query.to_lowercase();
        Ok(self
            .movies
            .lock()
            .values()
            .filter(|m| m.title.to_lowercase().contains(&query))
            .map(|m| SearchHit {
                external_id: m.external_id,
                title: m.title.clone(),
                year: m.release_date.map(|d| chrono::Datelike::year(&d)),
            })
            .collect())
    }

    async fn search_series(&self, query: &str) -> CoreResult<Vec<SearchHit>> {
        let query = query.to_lowercase();
        Ok(self
            .series
            .lock()
            .values()
            .filter(|s| s.title.to_lowercase().contains(&query))
            .map(|s| SearchHit { external_id: s.external_id, title: s.title.clone(), year: None })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_seeded_movie_details() {
        let provider = InMemoryMetadataProvider::new();
        provider.seed_movie(MovieDetails {
            external_id: 27205,
            title: "Inception".into(),
            original_title: None,
            release_date: chrono::NaiveDate::from_ymd_opt(2010, 7, 16),
            runtime_minutes: Some(148),
        });

        let details = provider.get_movie_details(27205).await.unwrap();
        assert_eq!(details.title, "Inception");
        assert_eq!(details.runtime_minutes, Some(148));
    }

    #[tokio::test]
    async fn unseeded_movie_is_not_found() {
        let provider = InMemoryMetadataProvider::new();
        assert!(provider.get_movie_details(1).await.is_err());
    }
}
