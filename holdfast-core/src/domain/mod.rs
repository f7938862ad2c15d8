//! Pure data types for every tracked entity: identity, state sets, and the
//! transient shapes (releases, fingerprints) that flow between components.
//!
//! Nothing in this module performs I/O. State here is a plain runtime enum,
//! not a compile-time-checked phantom type — the current state of an entity
//! is only known after a store read, since it can change out from under the
//! process (a download client finishing, a user re-marking a title), so the
//! type system cannot usefully gate transitions the way it can for a
//! protocol driven entirely by one process. Legality is enforced by the
//! Entity Store's compare-and-swap (see `store`), not by these types.

pub mod download;
pub mod episode;
pub mod fingerprint;
pub mod movie;
pub mod quality;
pub mod release;
pub mod season;
pub mod series;
pub mod transition;

pub use download::{Download, DownloadState};
pub use episode::{Episode, EpisodeState};
pub use fingerprint::Fingerprint;
pub use movie::{Movie, MovieState};
pub use quality::{QualityDefinition, QualityItem, QualityProfile, QualityToken};
pub use release::Release;
pub use season::{Season, SeasonAggregateState};
pub use series::{Series, SeriesState};
pub use transition::{EntityKind, Transition};
