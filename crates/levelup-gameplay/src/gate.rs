//! Gates: unlock conditions over persisted progress.
//!
//! A gate is a pure predicate. Evaluating it reads a [`ProgressQuery`] and never
//! mutates anything. Composite gates recurse through their members.

use crate::entity::{decode_tagged, encode, Entity};
use crate::progress::ProgressQuery;
use levelup_common::{ids, EntityKind, LevelUpResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Gate variant, stored under `className`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "className")]
pub enum GateKind {
    /// Open once a world is completed
    #[serde(rename = "WorldCompletionGate", rename_all = "camelCase")]
    WorldCompletion {
        /// World that must be completed
        associated_world_id: String,
    },
    /// Open once a score's record reaches a value
    #[serde(rename = "RecordGate", rename_all = "camelCase")]
    Record {
        /// Score whose record is checked
        associated_score_id: String,
        /// Record to reach
        desired_record: f64,
    },
    /// Open once a mission is completed
    #[serde(rename = "MissionCompletionGate", rename_all = "camelCase")]
    MissionCompletion {
        /// Mission that must be completed
        associated_mission_id: String,
    },
    /// Open when every member is open
    #[serde(rename = "GatesListAND")]
    All {
        /// Member gates
        gates: Vec<Gate>,
    },
    /// Open when any member is open
    #[serde(rename = "GatesListOR")]
    Any {
        /// Member gates
        gates: Vec<Gate>,
    },
}

/// An unlock condition deciding whether a world or level can be played.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    #[serde(rename = "itemId")]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(flatten)]
    kind: GateKind,
}

impl Gate {
    /// Creates a gate of any kind.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: GateKind) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            kind,
        }
    }

    /// Gate opened by completing `world_id`.
    #[must_use]
    pub fn world_completion(id: impl Into<String>, world_id: impl Into<String>) -> Self {
        Self::new(
            id,
            GateKind::WorldCompletion {
                associated_world_id: world_id.into(),
            },
        )
    }

    /// Gate opened when `score_id` has a record reaching `desired_record`.
    #[must_use]
    pub fn record(id: impl Into<String>, score_id: impl Into<String>, desired_record: f64) -> Self {
        Self::new(
            id,
            GateKind::Record {
                associated_score_id: score_id.into(),
                desired_record,
            },
        )
    }

    /// Gate opened by completing `mission_id`.
    #[must_use]
    pub fn mission_completion(id: impl Into<String>, mission_id: impl Into<String>) -> Self {
        Self::new(
            id,
            GateKind::MissionCompletion {
                associated_mission_id: mission_id.into(),
            },
        )
    }

    /// Gate open when all of `gates` are open.
    #[must_use]
    pub fn all(id: impl Into<String>, gates: Vec<Gate>) -> Self {
        Self::new(id, GateKind::All { gates })
    }

    /// Gate open when any of `gates` is open.
    #[must_use]
    pub fn any(id: impl Into<String>, gates: Vec<Gate>) -> Self {
        Self::new(id, GateKind::Any { gates })
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gate variant.
    #[must_use]
    pub const fn kind(&self) -> &GateKind {
        &self.kind
    }

    /// Evaluates the gate. An empty AND list is open, an empty OR list is not.
    pub fn is_open<Q: ProgressQuery + ?Sized>(&self, progress: &Q) -> bool {
        match &self.kind {
            GateKind::WorldCompletion {
                associated_world_id,
            } => progress.is_world_completed(associated_world_id),
            GateKind::Record {
                associated_score_id,
                desired_record,
            } => progress.has_record_reached(associated_score_id, *desired_record),
            GateKind::MissionCompletion {
                associated_mission_id,
            } => progress.is_mission_completed(associated_mission_id),
            GateKind::All { gates } => gates.iter().all(|g| g.is_open(progress)),
            GateKind::Any { gates } => gates.iter().any(|g| g.is_open(progress)),
        }
    }

    /// Independent copy under a new id. Member gates are copied recursively
    /// and renamed `{new_id}_sub{k}`.
    #[must_use]
    pub fn clone_with_id(&self, new_id: impl Into<String>) -> Self {
        let id = new_id.into();
        let rename = |gates: &[Self]| -> Vec<Self> {
            gates
                .iter()
                .enumerate()
                .map(|(k, g)| g.clone_with_id(ids::sub_id(&id, k)))
                .collect()
        };
        let kind = match &self.kind {
            GateKind::All { gates } => GateKind::All {
                gates: rename(gates),
            },
            GateKind::Any { gates } => GateKind::Any {
                gates: rename(gates),
            },
            other => other.clone(),
        };
        Self {
            id,
            kind,
            ..self.clone()
        }
    }

    /// Finds this gate or a nested member by id.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Gate> {
        if self.id == id {
            return Some(self);
        }
        match &self.kind {
            GateKind::All { gates } | GateKind::Any { gates } => {
                gates.iter().find_map(|g| g.find(id))
            },
            _ => None,
        }
    }
}

impl Entity for Gate {
    const KIND: EntityKind = EntityKind::Gate;
    const TYPE_TAGS: &'static [&'static str] = &[
        "WorldCompletionGate",
        "RecordGate",
        "MissionCompletionGate",
        "GatesListAND",
        "GatesListOR",
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn type_tag(&self) -> &'static str {
        match self.kind {
            GateKind::WorldCompletion { .. } => "WorldCompletionGate",
            GateKind::Record { .. } => "RecordGate",
            GateKind::MissionCompletion { .. } => "MissionCompletionGate",
            GateKind::All { .. } => "GatesListAND",
            GateKind::Any { .. } => "GatesListOR",
        }
    }

    fn to_json(&self) -> LevelUpResult<Value> {
        encode(self)
    }

    fn from_json(value: &Value) -> LevelUpResult<Self> {
        decode_tagged(value)
    }
}
