//! Parses a release title into a [`QualityToken`] via a table of
//! case-insensitive regex patterns.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::QualityToken;

struct Pattern {
    token: QualityToken,
    regex: Lazy<Regex>,
}

macro_rules! pattern {
    ($token:expr, $re:literal) => {
        Pattern {
            token: $token,
            regex: Lazy::new(|| Regex::new($re).expect("static pattern compiles")),
        }
    };
}

// Ordered most-specific first: a title like "2160p.BluRay" must match the
// 2160p/BluRay pattern before a looser 1080p fallback could shadow it.
static PATTERNS: &[Pattern] = &[
    pattern!(QualityToken::Bluray2160p, r"(?i)2160p.*(blu[- ]?ray|bdrip)"),
    pattern!(QualityToken::WebDl2160p, r"(?i)2160p.*(web[- ]?(dl|rip)|amzn|nf|dsnp)"),
    pattern!(QualityToken::Hdtv2160p, r"(?i)2160p.*hdtv"),
    pattern!(QualityToken::Bluray1080p, r"(?i)1080p.*(blu[- ]?ray|bdrip)"),
    pattern!(QualityToken::WebDl1080p, r"(?i)1080p.*(web[- ]?(dl|rip)|amzn|nf|dsnp)"),
    pattern!(QualityToken::Hdtv1080p, r"(?i)1080p.*hdtv"),
    pattern!(QualityToken::Bluray720p, r"(?i)720p.*(blu[- ]?ray|bdrip)"),
    pattern!(QualityToken::WebDl720p, r"(?i)720p.*(web[- ]?(dl|rip)|amzn|nf|dsnp)"),
    pattern!(QualityToken::Hdtv720p, r"(?i)720p.*hdtv"),
    pattern!(QualityToken::WebDl480p, r"(?i)480p.*(web[- ]?(dl|rip))"),
    pattern!(QualityToken::Dvd, r"(?i)\bdvd(rip)?\b"),
    pattern!(QualityToken::Sdtv, r"(?i)\b(sdtv|hdtv)\b"),
];

/// Returns `None` when no pattern matches — treated as a reject by the
/// evaluator ("Unknown -> reject").
pub fn parse(title: &str) -> Option<QualityToken> {
    PATTERNS
        .iter()
        .find(|p| p.regex.is_match(title))
        .map(|p| p.token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_1080p_bluray() {
        assert_eq!(
            parse("Inception.2010.1080p.BluRay.x264-GROUP"),
            Some(QualityToken::Bluray1080p)
        );
    }

    #[test]
    fn parses_720p_webdl() {
        assert_eq!(
            parse("Show.S01E01.720p.WEB-DL.x264"),
            Some(QualityToken::WebDl720p)
        );
    }

    #[test]
    fn unknown_title_is_none() {
        assert_eq!(parse("totally-unstructured-release-name"), None);
    }

    #[test]
    fn distinguishes_2160p_bluray_from_2160p_webdl() {
        assert_eq!(
            parse("Movie.2020.2160p.BluRay.REMUX"),
            Some(QualityToken::Bluray2160p)
        );
        assert_eq!(
            parse("Movie.2020.2160p.AMZN.WEB-DL"),
            Some(QualityToken::WebDl2160p)
        );
    }
}
