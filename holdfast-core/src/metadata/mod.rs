//! The metadata provider interface: resolves external
//! identifiers to title/runtime/air-date facts the Reconciler needs to
//! decide Discovered -> Missing/Unreleased and to seed a Movie's or
//! Episode's runtime for the Quality Profile Evaluator's size-per-minute
//! check.
//!
//! Out of scope: images, genres, and every other presentation-only field
//! the generated OpenAPI bindings carry. Only the
//! facts the core's state machines and evaluator actually consume are
//! modeled here.

pub mod memory;
pub mod provider;
pub mod tmdb;

pub use memory::InMemoryMetadataProvider;
pub use provider::{
    EpisodeSummary, MetadataProvider, MovieDetails, SearchHit, SeasonSummary, SeriesDetails,
};
pub use tmdb::TmdbMetadataProvider;
