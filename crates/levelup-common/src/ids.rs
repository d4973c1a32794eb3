//! Identity types shared by every progression entity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of a persisted progression entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// A world or level
    World,
    /// A score
    Score,
    /// A gate
    Gate,
    /// A mission
    Mission,
    /// A reward
    Reward,
}

impl EntityKind {
    /// Lowercase name used in storage keys and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::World => "world",
            Self::Score => "score",
            Self::Gate => "gate",
            Self::Mission => "mission",
            Self::Reward => "reward",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage key for a score's persisted values.
///
/// Derived from the owning world, the score's type tag, and its id. Scores
/// sharing an id in different worlds, or a range and a plain score sharing an
/// id, never read each other's values. A score not attached to a world keys
/// on its tag and id alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScoreKey(String);

impl ScoreKey {
    /// Builds the key for a score owned by `world_id`.
    #[must_use]
    pub fn new(world_id: &str, type_tag: &str, score_id: &str) -> Self {
        if world_id.is_empty() {
            Self(format!("{type_tag}:{score_id}"))
        } else {
            Self(format!("{world_id}/{type_tag}:{score_id}"))
        }
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Id of the `index`-th level generated under `parent_id`.
#[must_use]
pub fn level_id(parent_id: &str, index: usize) -> String {
    format!("{parent_id}_level{index}")
}

/// Id of the gate generated for a level.
#[must_use]
pub fn gate_id(level_id: &str) -> String {
    format!("{level_id}_gate")
}

/// Id of the `index`-th score generated for a level.
#[must_use]
pub fn score_id(level_id: &str, index: usize) -> String {
    format!("{level_id}_score{index}")
}

/// Id of the `index`-th mission generated for a level.
#[must_use]
pub fn mission_id(level_id: &str, index: usize) -> String {
    format!("{level_id}_mission{index}")
}

/// Id of the `index`-th member of a copied composite mission or gate.
#[must_use]
pub fn sub_id(parent_id: &str, index: usize) -> String {
    format!("{parent_id}_sub{index}")
}
