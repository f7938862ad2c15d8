use chrono::{DateTime, NaiveDate, Utc};
use holdfast_model::{MovieId, QualityProfileId};
use serde::{Deserialize, Serialize};

/// The Movie state machine.
///
/// ```text
/// Discovered -> Missing     (metadata resolved, release date passed)
/// Discovered -> Unreleased  (release date in the future)
/// Missing    -> Downloading (search + acceptance + submission)
/// Downloading-> Downloaded  (tracker signals completion)
/// Downloaded -> Completed   (importer places the file)
/// Completed  -> Missing     (user re-marks it, file absent)
/// *          -> Missing     (explicit re-search)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovieState {
    Discovered,
    Missing,
    Unreleased,
    Downloading,
    Downloaded,
    Completed,
}

impl MovieState {
    pub fn as_str(self) -> &'static str {
        match self {
            MovieState::Discovered => "discovered",
            MovieState::Missing => "missing",
            MovieState::Unreleased => "unreleased",
            MovieState::Downloading => "downloading",
            MovieState::Downloaded => "downloaded",
            MovieState::Completed => "completed",
        }
    }
}

impl std::str::FromStr for MovieState {
    type Err = holdfast_model::ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "discovered" => MovieState::Discovered,
            "missing" => MovieState::Missing,
            "unreleased" => MovieState::Unreleased,
            "downloading" => MovieState::Downloading,
            "downloaded" => MovieState::Downloaded,
            "completed" => MovieState::Completed,
            other => {
                return Err(holdfast_model::ModelError::Invalid {
                    field: "movie.state",
                    reason: format!("unrecognized state {other:?}"),
                })
            }
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    /// External metadata provider id (e.g. a TMDB-like movie id).
    pub external_id: i64,
    pub title: String,
    pub year: Option<i32>,
    pub monitored: bool,
    pub quality_profile_id: QualityProfileId,
    pub path: Option<String>,
    pub state: MovieState,
    pub release_date: Option<NaiveDate>,
    pub runtime_minutes: Option<i32>,
    pub added_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_round_trips_through_its_string_form() {
        for state in [
            MovieState::Discovered,
            MovieState::Missing,
            MovieState::Unreleased,
            MovieState::Downloading,
            MovieState::Downloaded,
            MovieState::Completed,
        ] {
            let parsed: MovieState = state.as_str().parse().unwrap();
            assert_eq!(parsed, state);
        }
    }

    #[test]
    fn unknown_state_string_is_invalid() {
        assert!("archived".parse::<MovieState>().is_err());
    }
}
