//! A TMDB-compatible [`MetadataProvider`]: a thin wrapper around the
//! `tmdb-api` crate, trimmed to the four operations the core consumes.

use async_trait::async_trait;
use chrono::NaiveDate;
use tmdb_api::{
    client::{reqwest::ReqwestExecutor, Client},
    movie::{details::MovieDetails as MovieDetailsCommand, search::MovieSearch},
    prelude::Command,
    tvshow::{
        details::TVShowDetails, search::TVShowSearch, season::details::TVShowSeasonDetails,
    },
};

use crate::error::{CoreError, CoreResult};

use super::provider::{
    EpisodeSummary, MetadataProvider, MovieDetails, SearchHit, SeasonSummary, SeriesDetails,
};

pub struct TmdbMetadataProvider {
    client: Client<ReqwestExecutor>,
}

impl TmdbMetadataProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        TmdbMetadataProvider { client: Client::<ReqwestExecutor>::new(api_key.into()) }
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

#[async_trait]
impl MetadataProvider for TmdbMetadataProvider {
    async fn get_movie_details(&self, external_id: i64) -> CoreResult<MovieDetails> {
        let details = MovieDetailsCommand::new(external_id as u64)
            .execute(&self.client)
            .await
            .map_err(|e| CoreError::external(format!("tmdb-like provider: {e}")))?;

        Ok(MovieDetails {
            external_id,
            title: details.inner.title.clone(),
            original_title: Some(details.inner.original_title.clone()),
            release_date: details.inner.release_date.as_ref().and_then(|d| parse_date(&d.to_string())),
            runtime_minutes: details.runtime.map(|r| r as i32),
        })
    }

    async fn get_series_details(&self, external_id: i64) -> CoreResult<SeriesDetails> {
        let details = TVShowDetails::new(external_id as u64)
            .execute(&self.client)
            .await
            .map_err(|e| CoreError::external(format!("tmdb-like provider: {e}")))?;

        let number_of_seasons = details.number_of_seasons.unwrap_or(0);
        let mut seasons = Vec::with_capacity(number_of_seasons as usize);
        for season_number in 1..=number_of_seasons {
            let season = TVShowSeasonDetails::new(external_id as u64, season_number as u64)
                .execute(&self.client)
                .await
                .map_err(|e| CoreError::external(format!("tmdb-like provider: {e}")))?;

            let episodes = season
                .episodes
                .iter()
                .map(|ep| EpisodeSummary {
                    episode_number: ep.inner.episode_number as u16,
                    air_date: ep.inner.air_date.as_ref().and_then(|d| parse_date(&d.to_string())),
                    runtime_minutes: ep.runtime.map(|r| r as i32),
                })
                .collect();

            seasons.push(SeasonSummary { season_number: season_number as u16, episodes });
        }

        Ok(SeriesDetails { external_id, title: details.inner.name.clone(), seasons })
    }

    async fn search_movie(&self, query: &str) -> CoreResult<Vec<SearchHit>> {
        let results = MovieSearch::new(query.to_string())
            .execute(&self.client)
            .await
            .map_err(|e| CoreError::external(format!("tmdb-like provider: {e}")))?;

        Ok(results
            .results
            .into_iter()
            .map(|r| SearchHit {
                external_id: r.inner.id as i64,
                title: r.inner.title,
                year: r.inner.release_date.as_ref().and_then(|d| parse_date(&d.to_string())).map(|d| {
                    use chrono::Datelike;
                    d.year()
                }),
            })
            .collect())
    }

    async fn search_series(&self, query: &str) -> CoreResult<Vec<SearchHit>> {
        let results = TVShowSearch::new(query.to_string())
            .execute(&self.client)
            .await
            .map_err(|e| CoreError::external(format!("tmdb-like provider: {e}")))?;

        Ok(results
            .results
            .into_iter()
            .map(|r| SearchHit {
                external_id: r.inner.id as i64,
                title: r.inner.name,
                year: r.inner.first_air_date.as_ref().and_then(|d| parse_date(&d.to_string())).map(|d| {
                    use chrono::Datelike;
                    d.year()
                }),
            })
            .collect())
    }
}
