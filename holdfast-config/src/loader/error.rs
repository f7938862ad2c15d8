use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file {path}: {source}")]
    FileIo { path: PathBuf, source: io::Error },

    #[error("failed to parse config file {path}: {source}")]
    FileParse { path: PathBuf, source: toml::de::Error },

    #[error("missing required config value: {field} (set it via env or the config file)")]
    MissingRequired { field: &'static str },

    #[error("invalid socket address for {field}: {source}")]
    InvalidSocketAddr { field: &'static str, source: std::net::AddrParseError },

    #[error("invalid duration for {field}: {source}")]
    InvalidDuration { field: &'static str, source: humantime::DurationError },
}
