//! Pure acceptance/scoring function over a [`Release`] and a
//! [`QualityProfile`]. Performs no I/O: callers resolve
//! the profile and its quality definitions from the store before invoking
//! this module.

use ordered_float::NotNan;

use crate::domain::{QualityDefinition, QualityProfile, QualityToken, Release};

use super::title_parser;

/// A release rejected at some step of the evaluation, carried back to the
/// caller so it can be logged as transition metadata when every candidate
/// is rejected by quality.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    UnrecognizedQuality,
    OutsideProfileBounds { token: QualityToken },
    OutsideSizeBand { token: QualityToken, mb_per_minute: f64 },
    NoMatchingDefinition { token: QualityToken },
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::UnrecognizedQuality => write!(f, "unrecognized quality"),
            RejectReason::OutsideProfileBounds { token } => {
                write!(f, "{token} outside profile min/max bounds")
            }
            RejectReason::OutsideSizeBand { token, mb_per_minute } => {
                write!(f, "{token} size {mb_per_minute:.1} MB/min outside definition band")
            }
            RejectReason::NoMatchingDefinition { token } => {
                write!(f, "no quality definition configured for {token}")
            }
        }
    }
}

/// An accepted release with its computed score, per the composite formula
/// `profile_rank * 1000 + size_within_band_score * 10 + seeder_score`.
/// `NotNan` rather than a bare `f64` so release selection
/// can sort candidates with `Ord` directly instead of a `partial_cmp`
/// fallback — the formula's inputs (ranks, ratios, seeder counts) can never
/// produce `NaN`, so the conversion below never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Acceptance {
    pub token: QualityToken,
    pub score: NotNan<f64>,
}

/// Fallback runtime (minutes) used when neither the release nor its parent
/// entity's metadata supplies one.
pub const DEFAULT_RUNTIME_MINUTES: u32 = 45;

/// Evaluate a release against a profile and its definitions.
///
/// `parent_runtime_minutes` is the owning Movie/Episode's known runtime,
/// used when the release itself didn't carry one.
pub fn evaluate(
    release: &Release,
    profile: &QualityProfile,
    definitions: &[QualityDefinition],
    parent_runtime_minutes: Option<u32>,
) -> Result<Acceptance, RejectReason> {
    let token = title_parser::parse(&release.title).ok_or(RejectReason::UnrecognizedQuality)?;

    if !profile.within_bounds(token) {
        return Err(RejectReason::OutsideProfileBounds { token });
    }

    let runtime_minutes = release
        .runtime_minutes
        .or(parent_runtime_minutes)
        .unwrap_or(DEFAULT_RUNTIME_MINUTES)
        .max(1) as f64;

    let mb_per_minute = (release.size_bytes as f64 / (1024.0 * 1024.0)) / runtime_minutes;

    let definition = definitions
        .iter()
        .find(|d| d.token == token)
        .ok_or(RejectReason::NoMatchingDefinition { token })?;

    if mb_per_minute < definition.min_mb_per_minute || mb_per_minute > definition.max_mb_per_minute {
        return Err(RejectReason::OutsideSizeBand { token, mb_per_minute });
    }

    let profile_rank = profile.rank_of(token).unwrap_or(0) as f64;
    let band_score = band_score(mb_per_minute, definition);
    let seeder_score = release.seeders.unwrap_or(0) as f64;

    let score = profile_rank * 1000.0 + band_score * 10.0 + seeder_score;
    Ok(Acceptance {
        token,
        score: NotNan::new(score).expect("score formula never produces NaN"),
    })
}

/// Closeness to the definition's preferred size-per-minute, normalized to
/// `[0, 1]` so it contributes a bounded term to the composite score and can
/// never outweigh `profile_rank`.
fn band_score(mb_per_minute: f64, definition: &QualityDefinition) -> f64 {
    let span = (definition.max_mb_per_minute - definition.min_mb_per_minute).max(f64::EPSILON);
    let distance = (mb_per_minute - definition.preferred_mb_per_minute).abs();
    (1.0 - (distance / span).min(1.0)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use holdfast_model::{QualityDefinitionId, QualityProfileId};

    fn profile() -> QualityProfile {
        use crate::domain::QualityItem;
        QualityProfile {
            id: QualityProfileId::new(1),
            name: "HD-1080p".into(),
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
            external_id: "1".into(),
            title: title.into(),
            size_bytes: size_mb * 1024 * 1024,
            seeders: Some(seeders),
            protocol: holdfast_model::Protocol::Torrent,
            indexer_id: holdfast_model::IndexerId::new(1),
            categories: vec![],
            download_url: Some("https://example/download".into()),
            guid: None,
            metadata_correlator: None,
            season: None,
            episode: None,
            runtime_minutes: None,
        }
    }

    #[test]
    fn accepts_release_within_band_and_scores_by_profile_rank() {
        // 12000 MB / 148 min ~= 81 MB/min, within the 1080p band.
        let r = release("Inception.2010.1080p.BluRay.x264-GROUP", 12_000, 40);
        let acceptance = evaluate(&r, &profile(), &definitions(), Some(148)).unwrap();
        assert_eq!(acceptance.token, QualityToken::Bluray1080p);
    }

    #[test]
    fn rejects_unknown_title() {
        let r = release("no-markers-here", 1_000, 10);
        assert_eq!(
            evaluate(&r, &profile(), &definitions(), Some(100)),
            Err(RejectReason::UnrecognizedQuality)
        );
    }

    #[test]
    fn rejects_quality_outside_profile_bounds() {
        let r = release("Show.S01E01.480p.WEB-DL", 500, 10);
        assert!(matches!(
            evaluate(&r, &profile(), &definitions(), Some(45)),
            Err(RejectReason::UnrecognizedQuality) | Err(RejectReason::OutsideProfileBounds { .. })
        ));
    }

    #[test]
    fn rejects_size_outside_band() {
        // Way too small for a 148-minute 1080p release.
        let r = release("Inception.2010.1080p.BluRay.x264-GROUP", 100, 40);
        assert_eq!(
            evaluate(&r, &profile(), &definitions(), Some(148)),
            Err(RejectReason::OutsideSizeBand {
                token: QualityToken::Bluray1080p,
                mb_per_minute: 100.0 / 148.0,
            })
        );
    }

    #[test]
    fn profile_rank_dominates_seeder_count_in_scoring() {
        // R1 is 1080p/low seeders, R2 is 720p/high seeders. R1 must
        // outscore R2.
        let defs = definitions();
        let p = profile();
        let r1 = release("Inception.2010.1080p.BluRay.x264-GROUP", 12_000, 40);
        let r2_title = "Inception.2010.720p.WEB-DL.x264-GROUP";
        let r2 = release(r2_title, 4_000, 100);
        let a1 = evaluate(&r1, &p, &defs, Some(148)).unwrap();
        let a2 = evaluate(&r2, &p, &defs, Some(148)).unwrap();
        assert!(a1.score > a2.score);
    }
}
