use chrono::NaiveDate;
use holdfast_model::{EpisodeId, EpisodeNumber, SeasonId};
use serde::{Deserialize, Serialize};

/// Identical in shape to [`crate::domain::MovieState`], keyed on episode air
/// date rather than a movie's theatrical release date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeState {
    Missing,
    Unreleased,
    Downloading,
    Downloaded,
    Completed,
}

impl EpisodeState {
    pub fn as_str(self) -> &'static str {
        match self {
            EpisodeState::Missing => "missing",
            EpisodeState::Unreleased => "unreleased",
            EpisodeState::Downloading => "downloading",
            EpisodeState::Downloaded => "downloaded",
            EpisodeState::Completed => "completed",
        }
    }
}

impl std::str::FromStr for EpisodeState {
    type Err = holdfast_model::ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "missing" => EpisodeState::Missing,
            "unreleased" => EpisodeState::Unreleased,
            "downloading" => EpisodeState::Downloading,
            "downloaded" => EpisodeState::Downloaded,
            "completed" => EpisodeState::Completed,
            other => {
                return Err(holdfast_model::ModelError::Invalid {
                    field: "episode.state",
                    reason: format!("unrecognized state {other:?}"),
                })
            }
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub id: EpisodeId,
    pub season_id: SeasonId,
    pub episode_number: EpisodeNumber,
    pub air_date: Option<NaiveDate>,
    pub monitored: bool,
    pub state: EpisodeState,
    pub runtime_minutes: Option<i32>,
}
