use chrono::{DateTime, Utc};
use holdfast_model::{DownloadClientId, DownloadId};
use serde::{Deserialize, Serialize};

use super::fingerprint::Fingerprint;
use super::transition::EntityKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadState {
    Queued,
    Active,
    Done,
    Failed,
}

impl DownloadState {
    pub fn as_str(self) -> &'static str {
        match self {
            DownloadState::Queued => "queued",
            DownloadState::Active => "active",
            DownloadState::Done => "done",
            DownloadState::Failed => "failed",
        }
    }

    /// Whether this state counts toward the Download Tracker's "Queued or
    /// Active" poll set.
    pub fn is_tracked(self) -> bool {
        matches!(self, DownloadState::Queued | DownloadState::Active)
    }
}

impl std::str::FromStr for DownloadState {
    type Err = holdfast_model::ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "queued" => DownloadState::Queued,
            "active" => DownloadState::Active,
            "done" => DownloadState::Done,
            "failed" => DownloadState::Failed,
            other => {
                return Err(holdfast_model::ModelError::Invalid {
                    field: "download.state",
                    reason: format!("unrecognized state {other:?}"),
                })
            }
        })
    }
}

/// A download attempt owned by a Movie or Episode. `owning_kind` is
/// restricted to those two by convention, not enforced in the type (the
/// Entity Store validates it on write).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Download {
    pub id: DownloadId,
    pub owning_kind: EntityKind,
    pub owning_id: i64,
    pub client_id: DownloadClientId,
    pub client_side_id: String,
    pub fingerprint: Fingerprint,
    pub state: DownloadState,
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
}
