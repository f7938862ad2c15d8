//! Strongly typed wrappers around the internal numeric identity of each
//! tracked entity. These are deliberately distinct types even though they
//! all wrap `i64` — mixing up a `SeriesId` and a `SeasonId` at a call site
//! should be a type error, not a runtime bug.

use std::fmt;

macro_rules! entity_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(
            feature = "serde",
            derive(serde::Serialize, serde::Deserialize)
        )]
        #[cfg_attr(feature = "serde", serde(transparent))]
        #[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
        #[cfg_attr(feature = "sqlx", sqlx(transparent))]
        pub struct $name(pub i64);

        impl $name {
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

entity_id!(MovieId, "Internal identity of a tracked movie.");
entity_id!(SeriesId, "Internal identity of a tracked series.");
entity_id!(SeasonId, "Internal identity of a series' season.");
entity_id!(EpisodeId, "Internal identity of a season's episode.");
entity_id!(DownloadId, "Internal identity of a download attempt.");
entity_id!(QualityProfileId, "Identity of a quality profile.");
entity_id!(QualityDefinitionId, "Identity of a quality definition.");
entity_id!(IndexerId, "Identity of a configured indexer source.");
entity_id!(DownloadClientId, "Identity of a configured download client.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_of_different_kinds_do_not_compare() {
        let movie = MovieId::new(7);
        let series = SeriesId::new(7);
        // Compiles only because these are distinct types; the assertion
        // below is just exercising Display/Eq on the same underlying value.
        assert_eq!(movie.get(), series.get());
        assert_eq!(movie.to_string(), "7");
    }
}
