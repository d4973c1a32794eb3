//! Missions: completable objectives that may hand out rewards.

use crate::entity::{decode_tagged, encode, Entity};
use crate::progress::ProgressQuery;
use crate::reward::RewardRegistry;
use crate::schedule::Schedule;
use crate::storage::{MissionStorage, RewardStorage};
use levelup_common::{ids, EntityKind, LevelUpResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Mission variant, stored under `className`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "className")]
pub enum MissionKind {
    /// Fulfilled once a world is completed
    #[serde(rename = "WorldCompletionMission", rename_all = "camelCase")]
    WorldCompletion {
        /// World that must be completed
        associated_world_id: String,
    },
    /// Fulfilled once a score's record reaches a value
    #[serde(rename = "RecordMission", rename_all = "camelCase")]
    Record {
        /// Score whose record is checked
        associated_score_id: String,
        /// Record to reach
        desired_record: f64,
    },
    /// Fulfilled once every sub-mission is completed
    #[serde(rename = "ChallengeMission")]
    Challenge {
        /// Sub-missions
        missions: Vec<Mission>,
    },
}

/// A completable objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
    #[serde(rename = "itemId")]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    reward_ids: Vec<String>,
    #[serde(default = "Schedule::once")]
    schedule: Schedule,
    #[serde(flatten)]
    kind: MissionKind,
}

impl Mission {
    /// Creates a mission of any kind, completable once.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: MissionKind) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            reward_ids: Vec::new(),
            schedule: Schedule::once(),
            kind,
        }
    }

    /// Mission fulfilled by completing `world_id`.
    #[must_use]
    pub fn world_completion(id: impl Into<String>, world_id: impl Into<String>) -> Self {
        Self::new(
            id,
            MissionKind::WorldCompletion {
                associated_world_id: world_id.into(),
            },
        )
    }

    /// Mission fulfilled when `score_id` has a record reaching `desired_record`.
    #[must_use]
    pub fn record(id: impl Into<String>, score_id: impl Into<String>, desired_record: f64) -> Self {
        Self::new(
            id,
            MissionKind::Record {
                associated_score_id: score_id.into(),
                desired_record,
            },
        )
    }

    /// Mission fulfilled when all of `missions` are completed.
    #[must_use]
    pub fn challenge(id: impl Into<String>, missions: Vec<Mission>) -> Self {
        Self::new(id, MissionKind::Challenge { missions })
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a reward handed out on completion.
    #[must_use]
    pub fn with_reward(mut self, reward_id: impl Into<String>) -> Self {
        self.reward_ids.push(reward_id.into());
        self
    }

    /// Sets the completion schedule.
    #[must_use]
    pub const fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mission variant.
    #[must_use]
    pub const fn kind(&self) -> &MissionKind {
        &self.kind
    }

    /// Rewards handed out on completion.
    #[must_use]
    pub fn reward_ids(&self) -> &[String] {
        &self.reward_ids
    }

    /// Completion schedule.
    #[must_use]
    pub const fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Number of recorded completions.
    pub fn times_completed<S: MissionStorage + ?Sized>(&self, storage: &S) -> u32 {
        storage.mission_times_completed(&self.id)
    }

    /// Whether the mission was completed at least once.
    pub fn is_completed<S: MissionStorage + ?Sized>(&self, storage: &S) -> bool {
        storage.is_mission_completed(&self.id)
    }

    /// Whether the schedule allows another completion.
    pub fn is_available<S: MissionStorage + ?Sized>(&self, storage: &S) -> bool {
        self.schedule.approve(self.times_completed(storage))
    }

    /// Whether the mission's condition currently holds.
    pub fn is_fulfilled<Q: ProgressQuery + ?Sized>(&self, progress: &Q) -> bool {
        match &self.kind {
            MissionKind::WorldCompletion {
                associated_world_id,
            } => progress.is_world_completed(associated_world_id),
            MissionKind::Record {
                associated_score_id,
                desired_record,
            } => progress.has_record_reached(associated_score_id, *desired_record),
            MissionKind::Challenge { missions } => missions
                .iter()
                .all(|m| progress.is_mission_completed(m.id())),
        }
    }

    /// Records a completion and gives every reward. Returns false when the
    /// schedule refuses another completion.
    pub fn complete<S>(&self, rewards: &RewardRegistry, storage: &mut S) -> bool
    where
        S: MissionStorage + RewardStorage + ?Sized,
    {
        if !self.is_available(storage) {
            debug!("Mission {} not available for completion", self.id);
            return false;
        }
        storage.set_mission_completed(&self.id, true);

        for reward_id in &self.reward_ids {
            match rewards.find(reward_id) {
                Some(reward) => {
                    reward.give(storage);
                },
                None => warn!("Mission {} references unknown reward {reward_id}", self.id),
            }
        }
        debug!("Completed mission {}", self.id);
        true
    }

    /// Undoes one completion and takes the rewards back.
    pub fn revoke<S>(&self, rewards: &RewardRegistry, storage: &mut S) -> bool
    where
        S: MissionStorage + RewardStorage + ?Sized,
    {
        if !self.is_completed(storage) {
            return false;
        }
        storage.set_mission_completed(&self.id, false);

        for reward_id in &self.reward_ids {
            if let Some(reward) = rewards.find(reward_id) {
                reward.take(storage);
            }
        }
        true
    }

    /// Independent copy under a new id. Sub-missions are copied recursively
    /// and renamed `{new_id}_sub{k}`.
    #[must_use]
    pub fn clone_with_id(&self, new_id: impl Into<String>) -> Self {
        let id = new_id.into();
        let kind = match &self.kind {
            MissionKind::Challenge { missions } => MissionKind::Challenge {
                missions: missions
                    .iter()
                    .enumerate()
                    .map(|(k, m)| m.clone_with_id(ids::sub_id(&id, k)))
                    .collect(),
            },
            other => other.clone(),
        };
        Self {
            id,
            kind,
            ..self.clone()
        }
    }

    /// Finds this mission or a nested sub-mission by id.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Mission> {
        if self.id == id {
            return Some(self);
        }
        match &self.kind {
            MissionKind::Challenge { missions } => missions.iter().find_map(|m| m.find(id)),
            _ => None,
        }
    }
}

impl Entity for Mission {
    const KIND: EntityKind = EntityKind::Mission;
    const TYPE_TAGS: &'static [&'static str] =
        &["WorldCompletionMission", "RecordMission", "ChallengeMission"];

    fn id(&self) -> &str {
        &self.id
    }

    fn type_tag(&self) -> &'static str {
        match self.kind {
            MissionKind::WorldCompletion { .. } => "WorldCompletionMission",
            MissionKind::Record { .. } => "RecordMission",
            MissionKind::Challenge { .. } => "ChallengeMission",
        }
    }

    fn to_json(&self) -> LevelUpResult<Value> {
        encode(self)
    }

    fn from_json(value: &Value) -> LevelUpResult<Self> {
        decode_tagged(value)
    }
}
