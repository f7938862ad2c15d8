use holdfast_model::IndexerId;
use serde::{Deserialize, Serialize};

use super::transition::EntityKind;

/// A stable identifier for "this release, for this entity", used to dedupe
/// concurrent Downloads: at most one Download exists in state Queued or
/// Active for a given (entity, fingerprint).
///
/// Deliberately a deterministic string key rather than a hash digest: it is
/// stored in a text column and needs to be reproducible across process
/// restarts and independent of any particular hasher's implementation, and
/// being human-readable makes the transitions table easier to audit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(kind: EntityKind, entity_id: i64, indexer_id: IndexerId, external_release_id: &str) -> Self {
        Fingerprint(format!(
            "{kind}:{entity_id}:{}:{external_release_id}",
            indexer_id.get()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reconstruct a fingerprint from its stored text form (the store never
    /// re-derives a fingerprint's components, only round-trips the string).
    pub fn new_from_stored(raw: String) -> Self {
        Fingerprint(raw)
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic_for_the_same_inputs() {
        let a = Fingerprint::new(EntityKind::Movie, 1, IndexerId::new(3), "abc");
        let b = Fingerprint::new(EntityKind::Movie, 1, IndexerId::new(3), "abc");
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_differs_on_entity_id() {
        let a = Fingerprint::new(EntityKind::Movie, 1, IndexerId::new(3), "abc");
        let b = Fingerprint::new(EntityKind::Movie, 2, IndexerId::new(3), "abc");
        assert_ne!(a, b);
    }
}
