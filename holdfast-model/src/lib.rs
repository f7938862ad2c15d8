//! Identifiers and small value types shared between the Holdfast media
//! manager core and its HTTP surface.
//!
//! Everything in this crate is a plain value type with no I/O. Entity
//! identity here is a stable internal integer, independent of whatever id an
//! external metadata or indexer provider hands back.

#![allow(missing_docs)]

pub mod error;
pub mod ids;
pub mod numbers;
pub mod protocol;

pub use error::ModelError;
pub use ids::{
    DownloadClientId, DownloadId, EpisodeId, IndexerId, MovieId,
    QualityDefinitionId, QualityProfileId, SeasonId, SeriesId,
};
pub use numbers::{EpisodeNumber, SeasonNumber};
pub use protocol::Protocol;
