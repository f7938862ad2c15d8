use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::CoreResult;

/// Movie details, trimmed to the fields the core
/// consumes: title/release-date (Discovered -> Missing/Unreleased) and
/// runtime (the Quality Profile Evaluator's size-per-minute fallback).
#[derive(Debug, Clone)]
pub struct MovieDetails {
    pub external_id: i64,
    pub title: String,
    pub original_title: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub runtime_minutes: Option<i32>,
}

/// One episode within a `get_series_details` response.
#[derive(Debug, Clone)]
pub struct EpisodeSummary {
    pub episode_number: u16,
    pub air_date: Option<NaiveDate>,
    pub runtime_minutes: Option<i32>,
}

/// One season within a `get_series_details` response.
#[derive(Debug, Clone)]
pub struct SeasonSummary {
    pub season_number: u16,
    pub episodes: Vec<EpisodeSummary>,
}

/// Series details: title plus the nested
/// season/episode tree the Reconciler upserts against `SeasonRepository`
/// and `EpisodeRepository`.
#[derive(Debug, Clone)]
pub struct SeriesDetails {
    pub external_id: i64,
    pub title: String,
    pub seasons: Vec<SeasonSummary>,
}

/// One `search_movie`/`search_series` result.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub external_id: i64,
    pub title: String,
    pub year: Option<i32>,
}

/// The metadata provider interface, consumed by the Reconciler's
/// Index loops to resolve a Movie/Series' external id into the facts its
/// state machine needs. Authentication (a bearer token) is an
/// implementation detail of each concrete provider, not part of this trait.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn get_movie_details(&self, external_id: i64) -> CoreResult<MovieDetails>;
    async fn get_series_details(&self, external_id: i64) -> CoreResult<SeriesDetails>;
    async fn search_movie(&self, query: &str) -> CoreResult<Vec<SearchHit>>;
    async fn search_series(&self, query: &str) -> CoreResult<Vec<SearchHit>>;
}
