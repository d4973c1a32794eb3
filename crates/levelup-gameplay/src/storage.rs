//! Storage interface for persisted progression state.
//!
//! The progression core never persists anything directly. Completion flags,
//! reward assignments, score values, reward ledgers, mission counters, and
//! level play statistics all go through these traits. [`MemoryStorage`] is an
//! in-process implementation; `KeyValueStorage` maps the same calls onto a
//! flat string store.

use levelup_common::ScoreKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Completion flags and reward assignment per world.
pub trait WorldStorage {
    /// Returns whether the world is marked completed.
    fn is_world_completed(&self, world_id: &str) -> bool;
    /// Marks the world completed or not.
    fn set_world_completed(&mut self, world_id: &str, completed: bool);
    /// Returns the id of the reward currently assigned to the world.
    fn assigned_reward(&self, world_id: &str) -> Option<String>;
    /// Records the reward assigned to the world.
    fn set_assigned_reward(&mut self, world_id: &str, reward_id: &str);
}

/// Latest and record values per score.
pub trait ScoreStorage {
    /// Last committed value.
    fn latest_score(&self, key: &ScoreKey) -> Option<f64>;
    /// Sets the last committed value.
    fn set_latest_score(&mut self, key: &ScoreKey, value: f64);
    /// Best committed value.
    fn record_score(&self, key: &ScoreKey) -> Option<f64>;
    /// Sets the best committed value.
    fn set_record_score(&mut self, key: &ScoreKey, value: f64);
}

/// Owned-rewards ledger.
pub trait RewardStorage {
    /// How many times the reward is currently given.
    fn times_given(&self, reward_id: &str) -> u32;
    /// Gives (`true`) or takes (`false`) one activation of the reward.
    fn set_reward_status(&mut self, reward_id: &str, given: bool);
    /// Index of the last member handed out by a sequence or random reward.
    fn last_given_index(&self, reward_id: &str) -> Option<usize>;
    /// Sets or clears the last handed out member index.
    fn set_last_given_index(&mut self, reward_id: &str, index: Option<usize>);

    /// Returns whether the reward is currently given at least once.
    fn is_reward_given(&self, reward_id: &str) -> bool {
        self.times_given(reward_id) > 0
    }
}

/// Mission completion counters.
pub trait MissionStorage {
    /// How many times the mission was completed.
    fn mission_times_completed(&self, mission_id: &str) -> u32;
    /// Records (`true`) or revokes (`false`) one completion.
    fn set_mission_completed(&mut self, mission_id: &str, completed: bool);

    /// Returns whether the mission was completed at least once.
    fn is_mission_completed(&self, mission_id: &str) -> bool {
        self.mission_times_completed(mission_id) > 0
    }
}

/// Level play statistics.
pub trait LevelStorage {
    /// Number of times the level was started.
    fn times_started(&self, level_id: &str) -> u32;
    /// Increments the started counter.
    fn inc_times_started(&mut self, level_id: &str);
    /// Number of times the level was played to an end.
    fn times_played(&self, level_id: &str) -> u32;
    /// Increments the played counter.
    fn inc_times_played(&mut self, level_id: &str);
    /// Fastest completed play in milliseconds.
    fn fastest_duration_ms(&self, level_id: &str) -> Option<u64>;
    /// Sets the fastest completed play.
    fn set_fastest_duration_ms(&mut self, level_id: &str, duration_ms: u64);
    /// Slowest completed play in milliseconds.
    fn slowest_duration_ms(&self, level_id: &str) -> Option<u64>;
    /// Sets the slowest completed play.
    fn set_slowest_duration_ms(&mut self, level_id: &str, duration_ms: u64);
}

/// Everything a progression session persists.
pub trait LevelUpStorage:
    WorldStorage + ScoreStorage + RewardStorage + MissionStorage + LevelStorage
{
}

impl<T> LevelUpStorage for T where
    T: WorldStorage + ScoreStorage + RewardStorage + MissionStorage + LevelStorage
{
}

/// Per-level play statistics held by [`MemoryStorage`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelStats {
    /// Times started
    pub started: u32,
    /// Times played to an end
    pub played: u32,
    /// Fastest completed play
    pub fastest_ms: Option<u64>,
    /// Slowest completed play
    pub slowest_ms: Option<u64>,
}

/// In-process storage. Serializable so a whole snapshot can be saved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStorage {
    completed_worlds: HashMap<String, bool>,
    assigned_rewards: HashMap<String, String>,
    latest_scores: HashMap<ScoreKey, f64>,
    record_scores: HashMap<ScoreKey, f64>,
    rewards_given: HashMap<String, u32>,
    last_given_index: HashMap<String, usize>,
    missions_completed: HashMap<String, u32>,
    levels: HashMap<String, LevelStats>,
}

impl MemoryStorage {
    /// Creates empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Play statistics for a level, if it was ever started.
    #[must_use]
    pub fn level_stats(&self, level_id: &str) -> Option<&LevelStats> {
        self.levels.get(level_id)
    }

    /// Drops every stored value.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl WorldStorage for MemoryStorage {
    fn is_world_completed(&self, world_id: &str) -> bool {
        self.completed_worlds.get(world_id).copied().unwrap_or(false)
    }

    fn set_world_completed(&mut self, world_id: &str, completed: bool) {
        self.completed_worlds.insert(world_id.to_string(), completed);
    }

    fn assigned_reward(&self, world_id: &str) -> Option<String> {
        self.assigned_rewards.get(world_id).cloned()
    }

    fn set_assigned_reward(&mut self, world_id: &str, reward_id: &str) {
        self.assigned_rewards
            .insert(world_id.to_string(), reward_id.to_string());
    }
}

impl ScoreStorage for MemoryStorage {
    fn latest_score(&self, key: &ScoreKey) -> Option<f64> {
        self.latest_scores.get(key).copied()
    }

    fn set_latest_score(&mut self, key: &ScoreKey, value: f64) {
        self.latest_scores.insert(key.clone(), value);
    }

    fn record_score(&self, key: &ScoreKey) -> Option<f64> {
        self.record_scores.get(key).copied()
    }

    fn set_record_score(&mut self, key: &ScoreKey, value: f64) {
        self.record_scores.insert(key.clone(), value);
    }
}

impl RewardStorage for MemoryStorage {
    fn times_given(&self, reward_id: &str) -> u32 {
        self.rewards_given.get(reward_id).copied().unwrap_or(0)
    }

    fn set_reward_status(&mut self, reward_id: &str, given: bool) {
        let times = self.rewards_given.entry(reward_id.to_string()).or_insert(0);
        *times = if given {
            times.saturating_add(1)
        } else {
            times.saturating_sub(1)
        };
    }

    fn last_given_index(&self, reward_id: &str) -> Option<usize> {
        self.last_given_index.get(reward_id).copied()
    }

    fn set_last_given_index(&mut self, reward_id: &str, index: Option<usize>) {
        match index {
            Some(index) => {
                self.last_given_index.insert(reward_id.to_string(), index);
            },
            None => {
                self.last_given_index.remove(reward_id);
            },
        }
    }
}

impl MissionStorage for MemoryStorage {
    fn mission_times_completed(&self, mission_id: &str) -> u32 {
        self.missions_completed.get(mission_id).copied().unwrap_or(0)
    }

    fn set_mission_completed(&mut self, mission_id: &str, completed: bool) {
        let times = self
            .missions_completed
            .entry(mission_id.to_string())
            .or_insert(0);
        *times = if completed {
            times.saturating_add(1)
        } else {
            times.saturating_sub(1)
        };
    }
}

impl LevelStorage for MemoryStorage {
    fn times_started(&self, level_id: &str) -> u32 {
        self.levels.get(level_id).map_or(0, |s| s.started)
    }

    fn inc_times_started(&mut self, level_id: &str) {
        self.levels.entry(level_id.to_string()).or_default().started += 1;
    }

    fn times_played(&self, level_id: &str) -> u32 {
        self.levels.get(level_id).map_or(0, |s| s.played)
    }

    fn inc_times_played(&mut self, level_id: &str) {
        self.levels.entry(level_id.to_string()).or_default().played += 1;
    }

    fn fastest_duration_ms(&self, level_id: &str) -> Option<u64> {
        self.levels.get(level_id).and_then(|s| s.fastest_ms)
    }

    fn set_fastest_duration_ms(&mut self, level_id: &str, duration_ms: u64) {
        self.levels.entry(level_id.to_string()).or_default().fastest_ms = Some(duration_ms);
    }

    fn slowest_duration_ms(&self, level_id: &str) -> Option<u64> {
        self.levels.get(level_id).and_then(|s| s.slowest_ms)
    }

    fn set_slowest_duration_ms(&mut self, level_id: &str, duration_ms: u64) {
        self.levels.entry(level_id.to_string()).or_default().slowest_ms = Some(duration_ms);
    }
}
