use chrono::{DateTime, Utc};
use holdfast_model::{QualityProfileId, SeriesId};
use serde::{Deserialize, Serialize};

/// Series carry a looser state set than Movie/Episode: a series itself is
/// never "downloaded", only its episodes are. `Continuing`/`Ended` track
/// the upstream show's airing status; `Unreleased` covers a series that has
/// been declared but has no aired or scheduled episodes yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesState {
    Continuing,
    Ended,
    Unreleased,
}

impl SeriesState {
    pub fn as_str(self) -> &'static str {
        match self {
            SeriesState::Continuing => "continuing",
            SeriesState::Ended => "ended",
            SeriesState::Unreleased => "unreleased",
        }
    }
}

impl std::str::FromStr for SeriesState {
    type Err = holdfast_model::ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "continuing" => SeriesState::Continuing,
            "ended" => SeriesState::Ended,
            "unreleased" => SeriesState::Unreleased,
            other => {
                return Err(holdfast_model::ModelError::Invalid {
                    field: "series.state",
                    reason: format!("unrecognized state {other:?}"),
                })
            }
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Series {
    pub id: SeriesId,
    pub external_id: i64,
    pub title: String,
    pub monitored: bool,
    pub quality_profile_id: QualityProfileId,
    pub path: Option<String>,
    pub state: SeriesState,
    pub added_at: DateTime<Utc>,
}
