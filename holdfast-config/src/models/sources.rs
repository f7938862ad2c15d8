//! The two raw inputs a [`crate::loader::ConfigLoader`] merges: an optional
//! TOML file and the process environment. Every field here is optional —
//! absence just means "this source had nothing to say about it" — so the
//! loader can apply env-over-file-over-default precedence uniformly.

use serde::Deserialize;
use std::path::PathBuf;

/// Raw configuration as defined in an optional TOML file (`holdfast.toml`
/// by default, overridable via `HOLDFAST_CONFIG_FILE`).
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub tmdb: FileTmdbConfig,
    #[serde(default)]
    pub indexer: FileIndexerConfig,
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub library: FileLibraryConfig,
    #[serde(default)]
    pub storage: FileStorageConfig,
    #[serde(default)]
    pub manager_jobs: FileManagerJobsConfig,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileTmdbConfig {
    pub api_key: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileIndexerConfig {
    pub prowlarr_base_url: Option<String>,
    pub prowlarr_api_key: Option<String>,
    pub movie_categories: Option<Vec<u32>>,
    pub episode_categories: Option<Vec<u32>>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileServerConfig {
    pub bind_addr: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileLibraryConfig {
    pub movies_root: Option<PathBuf>,
    pub tv_root: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileStorageConfig {
    pub database_url: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileManagerJobsConfig {
    pub movie_index_interval: Option<String>,
    pub movie_reconcile_interval: Option<String>,
    pub series_index_interval: Option<String>,
    pub series_reconcile_interval: Option<String>,
    pub download_grace_period: Option<String>,
    pub download_stall_threshold: Option<String>,
}

/// Raw configuration read directly from the process environment (after
/// `.env` has been loaded into it). Prefixes: `TMDB_*`, `INDEXER_*`,
/// `SERVER_*`, `LIBRARY_*`, `STORAGE_*`, `MANAGER_JOBS_*`.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub tmdb_api_key: Option<String>,
    pub indexer_prowlarr_base_url: Option<String>,
    pub indexer_prowlarr_api_key: Option<String>,
    pub indexer_movie_categories: Option<Vec<u32>>,
    pub indexer_episode_categories: Option<Vec<u32>>,
    pub server_bind_addr: Option<String>,
    pub library_movies_root: Option<PathBuf>,
    pub library_tv_root: Option<PathBuf>,
    pub storage_database_url: Option<String>,
    pub manager_jobs_movie_index_interval: Option<String>,
    pub manager_jobs_movie_reconcile_interval: Option<String>,
    pub manager_jobs_series_index_interval: Option<String>,
    pub manager_jobs_series_reconcile_interval: Option<String>,
    pub manager_jobs_download_grace_period: Option<String>,
    pub manager_jobs_download_stall_threshold: Option<String>,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self {
            tmdb_api_key: string_var("TMDB_API_KEY"),
            indexer_prowlarr_base_url: string_var("INDEXER_PROWLARR_BASE_URL"),
            indexer_prowlarr_api_key: string_var("INDEXER_PROWLARR_API_KEY"),
            indexer_movie_categories: csv_u32_var("INDEXER_MOVIE_CATEGORIES"),
            indexer_episode_categories: csv_u32_var("INDEXER_EPISODE_CATEGORIES"),
            server_bind_addr: string_var("SERVER_BIND_ADDR"),
            library_movies_root: string_var("LIBRARY_MOVIES_ROOT").map(PathBuf::from),
            library_tv_root: string_var("LIBRARY_TV_ROOT").map(PathBuf::from),
            storage_database_url: string_var("STORAGE_DATABASE_URL"),
            manager_jobs_movie_index_interval: string_var("MANAGER_JOBS_MOVIE_INDEX_INTERVAL"),
            manager_jobs_movie_reconcile_interval: string_var("MANAGER_JOBS_MOVIE_RECONCILE_INTERVAL"),
            manager_jobs_series_index_interval: string_var("MANAGER_JOBS_SERIES_INDEX_INTERVAL"),
            manager_jobs_series_reconcile_interval: string_var("MANAGER_JOBS_SERIES_RECONCILE_INTERVAL"),
            manager_jobs_download_grace_period: string_var("MANAGER_JOBS_DOWNLOAD_GRACE_PERIOD"),
            manager_jobs_download_stall_threshold: string_var("MANAGER_JOBS_DOWNLOAD_STALL_THRESHOLD"),
        }
    }
}

fn string_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn csv_u32_var(name: &str) -> Option<Vec<u32>> {
    string_var(name).map(|raw| raw.split(',').filter_map(|part| part.trim().parse().ok()).collect())
}
