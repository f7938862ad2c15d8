pub mod error;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

pub use error::ConfigLoadError;

use crate::models::sources::{
    FileIndexerConfig, FileLibraryConfig, FileManagerJobsConfig, FileServerConfig, FileStorageConfig, FileTmdbConfig,
};
use crate::models::{
    Config, EnvConfig, FileConfig, IndexerConfig, LibraryConfig, ManagerJobsConfig, ServerConfig, StorageConfig,
    TmdbConfig,
};

const DEFAULT_CONFIG_FILE: &str = "holdfast.toml";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8787";
const DEFAULT_MOVIE_CATEGORIES: &[u32] = &[2000];
const DEFAULT_EPISODE_CATEGORIES: &[u32] = &[5000];

/// Loads and merges the two configuration sources into a resolved [`Config`].
///
/// Precedence, highest first: process environment (after `.env` has been
/// loaded into it), the TOML file, then the built-in default for that field.
/// A field with no default raises [`ConfigLoadError::MissingRequired`]
/// rather than silently defaulting to an empty string.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `.env` (if present), reads the optional TOML file named by
    /// `HOLDFAST_CONFIG_FILE` (default `holdfast.toml`), and layers the
    /// process environment on top.
    pub fn load() -> Result<Config, ConfigLoadError> {
        dotenvy::dotenv().ok();

        let file = Self::read_file_config()?;
        let env = EnvConfig::from_env();

        let config = Config {
            tmdb: resolve_tmdb(&env.tmdb_api_key, &file.tmdb)?,
            indexer: resolve_indexer(&env, &file.indexer)?,
            server: resolve_server(&env.server_bind_addr, &file.server)?,
            library: resolve_library(&env, &file.library)?,
            storage: resolve_storage(&env.storage_database_url, &file.storage)?,
            manager_jobs: resolve_manager_jobs(&env, &file.manager_jobs)?,
        };

        info!(
            bind_addr = %config.server.bind_addr,
            movies_root = %config.library.movies_root.display(),
            "configuration loaded"
        );

        Ok(config)
    }

    fn read_file_config() -> Result<FileConfig, ConfigLoadError> {
        let path = std::env::var("HOLDFAST_CONFIG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        Self::read_file_config_at(&path)
    }

    fn read_file_config_at(path: &Path) -> Result<FileConfig, ConfigLoadError> {
        if !path.exists() {
            return Ok(FileConfig::default());
        }

        let raw = fs::read_to_string(path)
            .map_err(|source| ConfigLoadError::FileIo { path: path.to_path_buf(), source })?;
        toml::from_str(&raw).map_err(|source| ConfigLoadError::FileParse { path: path.to_path_buf(), source })
    }
}

fn required(env: Option<&String>, file: Option<&String>, field: &'static str) -> Result<String, ConfigLoadError> {
    env.cloned()
        .or_else(|| file.cloned())
        .ok_or(ConfigLoadError::MissingRequired { field })
}

fn resolve_tmdb(env_api_key: &Option<String>, file: &FileTmdbConfig) -> Result<TmdbConfig, ConfigLoadError> {
    Ok(TmdbConfig { api_key: required(env_api_key.as_ref(), file.api_key.as_ref(), "TMDB_API_KEY")? })
}

fn resolve_indexer(env: &EnvConfig, file: &FileIndexerConfig) -> Result<IndexerConfig, ConfigLoadError> {
    Ok(IndexerConfig {
        prowlarr_base_url: required(
            env.indexer_prowlarr_base_url.as_ref(),
            file.prowlarr_base_url.as_ref(),
            "INDEXER_PROWLARR_BASE_URL",
        )?,
        prowlarr_api_key: required(
            env.indexer_prowlarr_api_key.as_ref(),
            file.prowlarr_api_key.as_ref(),
            "INDEXER_PROWLARR_API_KEY",
        )?,
        movie_categories: env
            .indexer_movie_categories
            .clone()
            .or_else(|| file.movie_categories.clone())
            .unwrap_or_else(|| DEFAULT_MOVIE_CATEGORIES.to_vec()),
        episode_categories: env
            .indexer_episode_categories
            .clone()
            .or_else(|| file.episode_categories.clone())
            .unwrap_or_else(|| DEFAULT_EPISODE_CATEGORIES.to_vec()),
    })
}

fn resolve_server(env_bind_addr: &Option<String>, file: &FileServerConfig) -> Result<ServerConfig, ConfigLoadError> {
    let raw = env_bind_addr
        .clone()
        .or_else(|| file.bind_addr.clone())
        .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
    let bind_addr = raw
        .parse()
        .map_err(|source| ConfigLoadError::InvalidSocketAddr { field: "SERVER_BIND_ADDR", source })?;
    Ok(ServerConfig { bind_addr })
}

fn resolve_library(env: &EnvConfig, file: &FileLibraryConfig) -> Result<LibraryConfig, ConfigLoadError> {
    let movies_root = env
        .library_movies_root
        .clone()
        .or_else(|| file.movies_root.clone())
        .ok_or(ConfigLoadError::MissingRequired { field: "LIBRARY_MOVIES_ROOT" })?;
    let tv_root = env
        .library_tv_root
        .clone()
        .or_else(|| file.tv_root.clone())
        .ok_or(ConfigLoadError::MissingRequired { field: "LIBRARY_TV_ROOT" })?;
    Ok(LibraryConfig { movies_root, tv_root })
}

fn resolve_storage(
    env_database_url: &Option<String>,
    file: &FileStorageConfig,
) -> Result<StorageConfig, ConfigLoadError> {
    Ok(StorageConfig {
        database_url: required(env_database_url.as_ref(), file.database_url.as_ref(), "STORAGE_DATABASE_URL")?,
    })
}

fn resolve_manager_jobs(
    env: &EnvConfig,
    file: &FileManagerJobsConfig,
) -> Result<ManagerJobsConfig, ConfigLoadError> {
    let defaults = ManagerJobsConfig::default();
    Ok(ManagerJobsConfig {
        movie_index_interval: resolve_duration(
            &env.manager_jobs_movie_index_interval,
            &file.movie_index_interval,
            defaults.movie_index_interval,
            "MANAGER_JOBS_MOVIE_INDEX_INTERVAL",
        )?,
        movie_reconcile_interval: resolve_duration(
            &env.manager_jobs_movie_reconcile_interval,
            &file.movie_reconcile_interval,
            defaults.movie_reconcile_interval,
            "MANAGER_JOBS_MOVIE_RECONCILE_INTERVAL",
        )?,
        series_index_interval: resolve_duration(
            &env.manager_jobs_series_index_interval,
            &file.series_index_interval,
            defaults.series_index_interval,
            "MANAGER_JOBS_SERIES_INDEX_INTERVAL",
        )?,
        series_reconcile_interval: resolve_duration(
            &env.manager_jobs_series_reconcile_interval,
            &file.series_reconcile_interval,
            defaults.series_reconcile_interval,
            "MANAGER_JOBS_SERIES_RECONCILE_INTERVAL",
        )?,
        download_grace_period: resolve_duration(
            &env.manager_jobs_download_grace_period,
            &file.download_grace_period,
            defaults.download_grace_period,
            "MANAGER_JOBS_DOWNLOAD_GRACE_PERIOD",
        )?,
        download_stall_threshold: resolve_duration(
            &env.manager_jobs_download_stall_threshold,
            &file.download_stall_threshold,
            defaults.download_stall_threshold,
            "MANAGER_JOBS_DOWNLOAD_STALL_THRESHOLD",
        )?,
    })
}

fn resolve_duration(
    env_value: &Option<String>,
    file_value: &Option<String>,
    default: Duration,
    field: &'static str,
) -> Result<Duration, ConfigLoadError> {
    match env_value.clone().or_else(|| file_value.clone()) {
        Some(raw) => {
            humantime::parse_duration(&raw).map_err(|source| ConfigLoadError::InvalidDuration { field, source })
        }
        None => {
            warn!(field, "no override found, using built-in default");
            Ok(default)
        }
    }
}
