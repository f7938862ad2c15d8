//! Configuration loading for Holdfast: `.env` plus an optional TOML file,
//! merged with the process environment taking precedence, resolved into a
//! single strongly-typed [`Config`].

pub mod loader;
pub mod models;

pub use loader::{ConfigLoadError, ConfigLoader};
pub use models::{
    Config, EnvConfig, FileConfig, IndexerConfig, LibraryConfig, ManagerJobsConfig, ServerConfig, StorageConfig,
    TmdbConfig,
};
