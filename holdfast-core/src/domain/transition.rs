use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Discriminates which entity table a [`Transition`] or store operation
/// addresses. Carried alongside the internal id rather than modeled as
/// separate per-kind transition types, since the Transition Log is a single
/// append-only table keyed on `(kind, id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Movie,
    Series,
    Season,
    Episode,
    Download,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EntityKind::Movie => "movie",
            EntityKind::Series => "series",
            EntityKind::Season => "season",
            EntityKind::Episode => "episode",
            EntityKind::Download => "download",
        };
        write!(f, "{s}")
    }
}

/// An immutable record of a state change, as appended by the Entity Store.
/// `from_state` is `None` only for the creation transition of an entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition {
    pub kind: EntityKind,
    pub entity_id: i64,
    pub from_state: Option<String>,
    pub to_state: String,
    pub at: DateTime<Utc>,
    /// Free-form context: a rejection reason ("no candidates", "rejected"),
    /// a caught error's display string, or nothing at all for a routine
    /// transition.
    pub metadata: Option<serde_json::Value>,
}

impl Transition {
    pub fn creation(
        kind: EntityKind,
        entity_id: i64,
        to_state: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Transition {
            kind,
            entity_id,
            from_state: None,
            to_state: to_state.into(),
            at,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
