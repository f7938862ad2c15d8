//! The Download Tracker: polls configured download clients
//! and translates their reported progress into entity and Download
//! transitions.

pub mod client;
pub mod clients;
pub mod tracker;

pub use client::{ClientStatus, DownloadClientPort};
pub use tracker::{DownloadTracker, TrackerTickOutcome};
