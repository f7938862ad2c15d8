use holdfast_model::{QualityDefinitionId, QualityProfileId};
use serde::{Deserialize, Serialize};

/// A quality token as parsed from a release title by
/// [`crate::quality::title_parser`]. Ordered worst-to-best by [`Self::ordinal`]
/// so a profile's min/max bounds can be compared without re-deriving an
/// order from the profile's preference list, which is a *preference*
/// ranking, not a quality ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityToken {
    Sdtv,
    Dvd,
    WebDl480p,
    Hdtv720p,
    WebDl720p,
    Bluray720p,
    Hdtv1080p,
    WebDl1080p,
    Bluray1080p,
    Hdtv2160p,
    WebDl2160p,
    Bluray2160p,
}

impl QualityToken {
    pub const ALL: [QualityToken; 12] = [
        QualityToken::Sdtv,
        QualityToken::Dvd,
        QualityToken::WebDl480p,
        QualityToken::Hdtv720p,
        QualityToken::WebDl720p,
        QualityToken::Bluray720p,
        QualityToken::Hdtv1080p,
        QualityToken::WebDl1080p,
        QualityToken::Bluray1080p,
        QualityToken::Hdtv2160p,
        QualityToken::WebDl2160p,
        QualityToken::Bluray2160p,
    ];

    pub fn ordinal(self) -> u8 {
        Self::ALL.iter().position(|t| *t == self).expect("exhaustive") as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QualityToken::Sdtv => "sdtv",
            QualityToken::Dvd => "dvd",
            QualityToken::WebDl480p => "webdl-480p",
            QualityToken::Hdtv720p => "hdtv-720p",
            QualityToken::WebDl720p => "webdl-720p",
            QualityToken::Bluray720p => "bluray-720p",
            QualityToken::Hdtv1080p => "hdtv-1080p",
            QualityToken::WebDl1080p => "webdl-1080p",
            QualityToken::Bluray1080p => "bluray-1080p",
            QualityToken::Hdtv2160p => "hdtv-2160p",
            QualityToken::WebDl2160p => "webdl-2160p",
            QualityToken::Bluray2160p => "bluray-2160p",
        }
    }
}

impl std::fmt::Display for QualityToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Acceptable size-per-minute band for a [`QualityToken`]. Sizes are
/// expressed in megabytes per minute of runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityDefinition {
    pub id: QualityDefinitionId,
    pub token: QualityToken,
    pub name: String,
    pub min_mb_per_minute: f64,
    pub max_mb_per_minute: f64,
    pub preferred_mb_per_minute: f64,
}

/// One entry in a profile's ordered preference list. A token can be present
/// but `allowed: false` to record "known, but never accept" without removing
/// it from the canonical list shown to users.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QualityItem {
    pub token: QualityToken,
    pub allowed: bool,
}

/// A Quality Profile: an ordered preference list plus min/max quality
/// bounds. The preference list's *position* is the `profile_rank` term in
/// the release scoring formula — index 0 is most
/// preferred.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityProfile {
    pub id: QualityProfileId,
    pub name: String,
    pub items: Vec<QualityItem>,
    pub min_quality: QualityToken,
    pub max_quality: QualityToken,
}

impl QualityProfile {
    /// Rank of an allowed token within this profile's preference list,
    /// higher is more preferred. `None` if the token is absent or
    /// disallowed.
    pub fn rank_of(&self, token: QualityToken) -> Option<u32> {
        let len = self.items.len() as u32;
        self.items
            .iter()
            .position(|item| item.token == token && item.allowed)
            .map(|pos| len - pos as u32)
    }

    pub fn within_bounds(&self, token: QualityToken) -> bool {
        token.ordinal() >= self.min_quality.ordinal() && token.ordinal() <= self.max_quality.ordinal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinal_orders_worst_to_best() {
        assert!(QualityToken::Sdtv.ordinal() < QualityToken::Hdtv1080p.ordinal());
        assert!(QualityToken::Hdtv1080p.ordinal() < QualityToken::Bluray2160p.ordinal());
    }

    #[test]
    fn rank_of_prefers_earlier_list_positions() {
        let profile = QualityProfile {
            id: QualityProfileId::new(1),
            name: "HD".into(),
            items: vec![
                QualityItem { token: QualityToken::Bluray1080p, allowed: true },
                QualityItem { token: QualityToken::WebDl1080p, allowed: true },
                QualityItem { token: QualityToken::Hdtv720p, allowed: false },
            ],
            min_quality: QualityToken::Hdtv720p,
            max_quality: QualityToken::Bluray2160p,
        };
        let bluray_rank = profile.rank_of(QualityToken::Bluray1080p).unwrap();
        let webdl_rank = profile.rank_of(QualityToken::WebDl1080p).unwrap();
        assert!(bluray_rank > webdl_rank);
        assert_eq!(profile.rank_of(QualityToken::Hdtv720p), None);
    }
}
