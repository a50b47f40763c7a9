use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq)]
#[serde(transparent)]
pub struct ElementId(pub String);

impl From<&str> for ElementId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ElementId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One canvas element as exchanged between peers.
///
/// The rendering surface bumps `version` on every committed mutation; the
/// reconciler compares versions and nothing else. Everything besides id and
/// version (geometry, style, text, ...) is carried opaquely.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VersionedElement {
    pub id: ElementId,
    pub version: u64,
    #[serde(flatten)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

impl VersionedElement {
    pub fn new(id: impl Into<ElementId>, version: u64) -> Self {
        Self {
            id: id.into(),
            version,
            payload: serde_json::Map::new(),
        }
    }
}
