//! The release-selection algorithm:
//! filter candidates against the entity, reject what the Quality Profile
//! Evaluator rejects, score the rest, and return the winner.

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

use crate::domain::{QualityDefinition, QualityProfile, Release};
use crate::quality::evaluator::{self, Acceptance};

/// Minimum skim fuzzy-match score between a release's title and the
/// entity's title for the release to be considered "about this entity" at
/// all. Chosen low enough to tolerate scene-tag noise (resolution, group,
/// source tags) but high enough to reject an unrelated title outright.
const TITLE_FINGERPRINT_THRESHOLD: i64 = 40;

/// What the entity being searched for expects a matching release to
/// carry.
#[derive(Debug, Clone)]
pub struct MatchCriteria {
    pub title: String,
    pub season: Option<u16>,
    pub episode: Option<u16>,
    /// The entity's external metadata id, as a string, compared against a
    /// release's `metadata_correlator` only when the release supplies one.
    pub external_correlator: Option<String>,
    /// Categories the entity searched under (movie or episode categories).
    /// A release outside all of them is for the wrong kind of content even
    /// when it comes back from a mixed-category indexer, so it is rejected
    /// here rather than relying solely on `IndexerGateway`'s provider-level
    /// filter.
    pub categories: Vec<u32>,
}

fn title_matches(criteria: &str, candidate: &str) -> bool {
    SkimMatcherV2::default()
        .ignore_case()
        .fuzzy_match(candidate, criteria)
        .map(|score| score >= TITLE_FINGERPRINT_THRESHOLD)
        .unwrap_or(false)
}

/// Matched on title fingerprint, season/episode tags, and external
/// correlator, when the release carries them.
fn matches_entity(release: &Release, criteria: &MatchCriteria) -> bool {
    if !title_matches(&criteria.title, &release.title) {
        return false;
    }
    if let (Some(expected), Some(actual)) = (criteria.season, release.season) {
        if expected != actual {
            return false;
        }
    }
    if let (Some(expected), Some(actual)) = (criteria.episode, release.episode) {
        if expected != actual {
            return false;
        }
    }
    if let (Some(expected), Some(actual)) = (&criteria.external_correlator, &release.metadata_correlator) {
        if expected != actual {
            return false;
        }
    }
    if !criteria.categories.is_empty() && !release.categories.iter().any(|c| criteria.categories.contains(c)) {
        return false;
    }
    true
}

/// Why no release was selected, carried back so the caller can log it as
/// transition metadata ("no candidates" / "rejected").
#[derive(Debug, Clone, PartialEq)]
pub enum NoSelection {
    NoCandidates,
    AllRejected,
}

#[derive(Debug, Clone)]
pub struct Selected {
    pub release: Release,
    pub acceptance: Acceptance,
}

/// Filters, rejects by quality, scores, and picks the winner. Ties break
/// by lower size, then lexicographic release
/// title, per the spec's scoring step.
pub fn select(
    releases: Vec<Release>,
    criteria: &MatchCriteria,
    profile: &QualityProfile,
    definitions: &[QualityDefinition],
    parent_runtime_minutes: Option<u32>,
) -> Result<Selected, NoSelection> {
    if releases.is_empty() {
        return Err(NoSelection::NoCandidates);
    }

    let matching: Vec<Release> = releases.into_iter().filter(|r| matches_entity(r, criteria)).collect();
    if matching.is_empty() {
        return Err(NoSelection::NoCandidates);
    }

    let mut accepted: Vec<Selected> = matching
        .into_iter()
        .filter_map(|release| {
            evaluator::evaluate(&release, profile, definitions, parent_runtime_minutes)
                .ok()
                .map(|acceptance| Selected { release, acceptance })
        })
        .collect();

    if accepted.is_empty() {
        return Err(NoSelection::AllRejected);
    }

    accepted.sort_by(|a, b| {
        b.acceptance
            .score
            .cmp(&a.acceptance.score)
            .then_with(|| a.release.size_bytes.cmp(&b.release.size_bytes))
            .then_with(|| a.release.title.cmp(&b.release.title))
    });

    Ok(accepted.into_iter().next().expect("non-empty checked above"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{QualityDefinitionId, QualityItem, QualityProfileId, QualityToken};
    use holdfast_model::{IndexerId, Protocol};

    fn profile() -> QualityProfile {
        QualityProfile {
            id: QualityProfileId::new(1),
            name: "HD".into(),
            items: vec![
                QualityItem { token: QualityToken::Bluray1080p, allowed: true },
                QualityItem { token: QualityToken::WebDl720p, allowed: true },
            ],
            min_quality: QualityToken::WebDl720p,
            max_quality: QualityToken::Bluray2160p,
        }
    }

    fn definitions() -> Vec<QualityDefinition> {
        vec![
            QualityDefinition {
                id: QualityDefinitionId::new(1),
                token: QualityToken::Bluray1080p,
                name: "Bluray-1080p".into(),
                min_mb_per_minute: 40.0,
                max_mb_per_minute: 120.0,
                preferred_mb_per_minute: 80.0,
            },
            QualityDefinition {
                id: QualityDefinitionId::new(2),
                token: QualityToken::WebDl720p,
                name: "WebDL-720p".into(),
                min_mb_per_minute: 10.0,
                max_mb_per_minute: 40.0,
                preferred_mb_per_minute: 25.0,
            },
        ]
    }

    fn release(title: &str, size_mb: u64, seeders: u32) -> Release {
        Release {
            external_id: title.into(),
            title: title.into(),
            size_bytes: size_mb * 1024 * 1024,
            seeders: Some(seeders),
            protocol: Protocol::Torrent,
            indexer_id: IndexerId::new(1),
            categories: vec![2000],
            download_url: Some("https://example/dl".into()),
            guid: None,
            metadata_correlator: None,
            season: None,
            episode: None,
            runtime_minutes: None,
        }
    }

    fn criteria() -> MatchCriteria {
        MatchCriteria {
            title: "Inception".into(),
            season: None,
            episode: None,
            external_correlator: None,
            categories: vec![2000],
        }
    }

    #[test]
    fn release_outside_criteria_categories_is_filtered_to_no_candidates() {
        // Mixed-category indexer returning a TV release (5000) against a
        // movie search (2000 only in criteria).
        let mut tv_release = release("Inception.2010.1080p.BluRay.x264-GROUP", 12_000, 40);
        tv_release.categories = vec![5000];
        assert_eq!(
            select(vec![tv_release], &criteria(), &profile(), &definitions(), Some(148)),
            Err(NoSelection::NoCandidates)
        );
    }

    #[test]
    fn empty_candidate_list_is_no_candidates() {
        assert_eq!(select(vec![], &criteria(), &profile(), &definitions(), Some(148)), Err(NoSelection::NoCandidates));
    }

    #[test]
    fn unrelated_title_is_filtered_to_no_candidates() {
        let releases = vec![release("Completely.Unrelated.Movie.1080p.BluRay", 12_000, 10)];
        assert_eq!(select(releases, &criteria(), &profile(), &definitions(), Some(148)), Err(NoSelection::NoCandidates));
    }

    #[test]
    fn spec_scenario_1_1080p_bluray_beats_720p_high_seeders() {
        let releases = vec![
            release("Inception.2010.1080p.BluRay.x264-GROUP", 12_000, 40),
            release("Inception.2010.720p.WEB-DL.x264-GROUP", 4_000, 100),
        ];
        let winner = select(releases, &criteria(), &profile(), &definitions(), Some(148)).unwrap();
        assert!(winner.release.title.contains("1080p"));
    }

    #[test]
    fn all_rejected_when_every_match_fails_quality() {
        // Way undersized for either band -> rejected by size.
        let releases = vec![release("Inception.2010.1080p.BluRay.x264-GROUP", 10, 40)];
        assert_eq!(
            select(releases, &criteria(), &profile(), &definitions(), Some(148)),
            Err(NoSelection::AllRejected)
        );
    }
}
