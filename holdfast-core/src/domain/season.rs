use holdfast_model::{SeasonId, SeasonNumber, SeriesId};
use serde::{Deserialize, Serialize};

use super::episode::EpisodeState;

/// A Season's state is derived at read time from its monitored episodes
///; it is never stored as a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonAggregateState {
    Continuing,
    Completed,
    Unreleased,
}

impl SeasonAggregateState {
    /// Derive a season's aggregate state from the states of its monitored
    /// episodes. A season with no monitored episodes is `Unreleased` —
    /// vacuously true for both "all completed" and "all unreleased" would
    /// be ambiguous, so the absence case is pinned to the weakest claim.
    pub fn derive(episode_states: &[EpisodeState]) -> Self {
        let monitored = episode_states;
        if monitored.is_empty() {
            return SeasonAggregateState::Unreleased;
        }
        if monitored.iter().all(|s| *s == EpisodeState::Completed) {
            return SeasonAggregateState::Completed;
        }
        if monitored.iter().all(|s| *s == EpisodeState::Unreleased) {
            return SeasonAggregateState::Unreleased;
        }
        SeasonAggregateState::Continuing
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Season {
    pub id: SeasonId,
    pub series_id: SeriesId,
    pub season_number: SeasonNumber,
    pub monitored: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_completed_episodes_yield_completed_season() {
        let states = vec![EpisodeState::Completed, EpisodeState::Completed];
        assert_eq!(
            SeasonAggregateState::derive(&states),
            SeasonAggregateState::Completed
        );
    }

    #[test]
    fn mixed_episode_states_yield_continuing_season() {
        let states = vec![EpisodeState::Completed, EpisodeState::Missing];
        assert_eq!(
            SeasonAggregateState::derive(&states),
            SeasonAggregateState::Continuing
        );
    }

    #[test]
    fn all_unreleased_episodes_yield_unreleased_season() {
        let states = vec![EpisodeState::Unreleased, EpisodeState::Unreleased];
        assert_eq!(
            SeasonAggregateState::derive(&states),
            SeasonAggregateState::Unreleased
        );
    }

    #[test]
    fn no_monitored_episodes_yields_unreleased_season() {
        assert_eq!(
            SeasonAggregateState::derive(&[]),
            SeasonAggregateState::Unreleased
        );
    }
}
