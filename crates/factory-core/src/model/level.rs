use serde::{Deserialize, Serialize};

/// Placement of one component in a level: where it sits, what it is, and
/// which component ids its output feeds. Behavior lives in the simulation
/// layer; this is the shape the storage collaborator persists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentPlacement {
    pub id: String,
    pub kind: String,
    pub position: (f32, f32),
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub plex: bool,
}

/// A full level definition as the external storage collaborator sees it.
/// The betting bucket count is carried inside the script text itself
/// (`buckets(n)`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDefinition {
    pub name: String,
    pub seed: u64,
    pub script: String,
    pub layout: Vec<ComponentPlacement>,
    pub thresholds: [f64; 4],
}

impl LevelDefinition {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// One scored attempt at a level. The timestamp is supplied by the host;
/// the core stays clock-free.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayRecord {
    pub divergence: f64,
    pub stars: u8,
    pub timestamp_ms: u64,
}

impl PlayRecord {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
