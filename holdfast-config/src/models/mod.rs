pub mod sources;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub use sources::{EnvConfig, FileConfig};

/// Fully resolved configuration for a running Holdfast instance. Every field
/// here has already been through env-over-file-over-default precedence; by
/// the time callers see a `Config` there is nothing left to fall back on.
#[derive(Debug, Clone)]
pub struct Config {
    pub tmdb: TmdbConfig,
    pub indexer: IndexerConfig,
    pub server: ServerConfig,
    pub library: LibraryConfig,
    pub storage: StorageConfig,
    pub manager_jobs: ManagerJobsConfig,
}

#[derive(Debug, Clone)]
pub struct TmdbConfig {
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub prowlarr_base_url: String,
    pub prowlarr_api_key: String,
    pub movie_categories: Vec<u32>,
    pub episode_categories: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct LibraryConfig {
    pub movies_root: PathBuf,
    pub tv_root: PathBuf,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub database_url: String,
}

/// The sweep intervals and download-health thresholds the reconciler's
/// scheduler loops and the Download Tracker read at startup. None of these
/// are hard-coded in `holdfast-core`.
#[derive(Debug, Clone)]
pub struct ManagerJobsConfig {
    pub movie_index_interval: Duration,
    pub movie_reconcile_interval: Duration,
    pub series_index_interval: Duration,
    pub series_reconcile_interval: Duration,
    pub download_grace_period: Duration,
    pub download_stall_threshold: Duration,
}

impl Default for ManagerJobsConfig {
    fn default() -> Self {
        Self {
            movie_index_interval: Duration::from_secs(600),
            movie_reconcile_interval: Duration::from_secs(600),
            series_index_interval: Duration::from_secs(600),
            series_reconcile_interval: Duration::from_secs(600),
            download_grace_period: Duration::from_secs(300),
            download_stall_threshold: Duration::from_secs(1800),
        }
    }
}
