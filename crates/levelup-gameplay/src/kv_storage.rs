//! Storage over a flat string key-value store.
//!
//! Every storage call becomes a read or write of one string key under a
//! configurable prefix:
//!
//! | Value                  | Key                                   |
//! |------------------------|---------------------------------------|
//! | world completed        | `{prefix}.worlds.{id}.completed`      |
//! | assigned reward        | `{prefix}.worlds.{id}.assignedReward` |
//! | latest score           | `{prefix}.scores.{key}.latest`        |
//! | record score           | `{prefix}.scores.{key}.record`        |
//! | reward times given     | `{prefix}.rewards.{id}.timesGiven`    |
//! | sequence reward index  | `{prefix}.rewards.{id}.seqIdx`        |
//! | mission completions    | `{prefix}.missions.{id}.timesCompleted` |
//! | level starts / plays   | `{prefix}.levels.{id}.started` / `.played` |
//! | level durations (ms)   | `{prefix}.levels.{id}.fastest` / `.slowest` |
//!
//! Values that fail to parse are logged and read as absent.

use crate::storage::{LevelStorage, MissionStorage, RewardStorage, ScoreStorage, WorldStorage};
use levelup_common::{LevelUpConfig, ScoreKey};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::str::FromStr;
use tracing::warn;

/// A flat string key-value store.
pub trait KeyValueStore {
    /// Reads a value.
    fn get(&self, key: &str) -> Option<String>;

    /// Writes a value.
    fn set(&mut self, key: &str, value: String);

    /// Deletes a value.
    fn remove(&mut self, key: &str);
}

impl KeyValueStore for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        HashMap::remove(self, key);
    }
}

impl KeyValueStore for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        BTreeMap::get(self, key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        BTreeMap::remove(self, key);
    }
}

/// Implements every storage trait on top of a [`KeyValueStore`].
#[derive(Debug, Clone, Default)]
pub struct KeyValueStorage<B> {
    backend: B,
    prefix: String,
}

impl<B: KeyValueStore> KeyValueStorage<B> {
    /// Wraps `backend`, writing keys under `prefix`.
    #[must_use]
    pub fn new(backend: B, prefix: impl Into<String>) -> Self {
        Self {
            backend,
            prefix: prefix.into(),
        }
    }

    /// Wraps `backend` using the configured key prefix.
    #[must_use]
    pub fn with_config(backend: B, config: &LevelUpConfig) -> Self {
        Self::new(backend, config.key_prefix.as_str())
    }

    /// Key prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Underlying store.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Unwraps the underlying store.
    #[must_use]
    pub fn into_backend(self) -> B {
        self.backend
    }

    fn key(&self, group: &str, id: &str, field: &str) -> String {
        format!("{}.{group}.{id}.{field}", self.prefix)
    }

    fn read<T>(&self, key: &str) -> Option<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self.backend.get(key)?;
        match raw.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring unparseable value {raw:?} at {key}: {e}");
                None
            },
        }
    }

    fn write<T: ToString>(&mut self, key: &str, value: Option<T>) {
        match value {
            Some(value) => self.backend.set(key, value.to_string()),
            None => self.backend.remove(key),
        }
    }

    fn count(&self, key: &str) -> u32 {
        self.read(key).unwrap_or(0)
    }

    fn bump(&mut self, key: &str, up: bool) {
        let current = self.count(key);
        let next = if up {
            current.saturating_add(1)
        } else {
            current.saturating_sub(1)
        };
        self.write(key, Some(next));
    }
}

impl<B: KeyValueStore> WorldStorage for KeyValueStorage<B> {
    fn is_world_completed(&self, world_id: &str) -> bool {
        self.read(&self.key("worlds", world_id, "completed"))
            .unwrap_or(false)
    }

    fn set_world_completed(&mut self, world_id: &str, completed: bool) {
        let key = self.key("worlds", world_id, "completed");
        self.write(&key, completed.then_some(true));
    }

    fn assigned_reward(&self, world_id: &str) -> Option<String> {
        self.backend
            .get(&self.key("worlds", world_id, "assignedReward"))
    }

    fn set_assigned_reward(&mut self, world_id: &str, reward_id: &str) {
        let key = self.key("worlds", world_id, "assignedReward");
        self.write(&key, Some(reward_id));
    }
}

impl<B: KeyValueStore> ScoreStorage for KeyValueStorage<B> {
    fn latest_score(&self, key: &ScoreKey) -> Option<f64> {
        self.read(&self.key("scores", key.as_str(), "latest"))
    }

    fn set_latest_score(&mut self, key: &ScoreKey, value: f64) {
        let key = self.key("scores", key.as_str(), "latest");
        self.write(&key, Some(value));
    }

    fn record_score(&self, key: &ScoreKey) -> Option<f64> {
        self.read(&self.key("scores", key.as_str(), "record"))
    }

    fn set_record_score(&mut self, key: &ScoreKey, value: f64) {
        let key = self.key("scores", key.as_str(), "record");
        self.write(&key, Some(value));
    }
}

impl<B: KeyValueStore> RewardStorage for KeyValueStorage<B> {
    fn times_given(&self, reward_id: &str) -> u32 {
        self.count(&self.key("rewards", reward_id, "timesGiven"))
    }

    fn set_reward_status(&mut self, reward_id: &str, given: bool) {
        let key = self.key("rewards", reward_id, "timesGiven");
        self.bump(&key, given);
    }

    fn last_given_index(&self, reward_id: &str) -> Option<usize> {
        self.read(&self.key("rewards", reward_id, "seqIdx"))
    }

    fn set_last_given_index(&mut self, reward_id: &str, index: Option<usize>) {
        let key = self.key("rewards", reward_id, "seqIdx");
        self.write(&key, index);
    }
}

impl<B: KeyValueStore> MissionStorage for KeyValueStorage<B> {
    fn mission_times_completed(&self, mission_id: &str) -> u32 {
        self.count(&self.key("missions", mission_id, "timesCompleted"))
    }

    fn set_mission_completed(&mut self, mission_id: &str, completed: bool) {
        let key = self.key("missions", mission_id, "timesCompleted");
        self.bump(&key, completed);
    }
}

impl<B: KeyValueStore> LevelStorage for KeyValueStorage<B> {
    fn times_started(&self, level_id: &str) -> u32 {
        self.count(&self.key("levels", level_id, "started"))
    }

    fn inc_times_started(&mut self, level_id: &str) {
        let key = self.key("levels", level_id, "started");
        self.bump(&key, true);
    }

    fn times_played(&self, level_id: &str) -> u32 {
        self.count(&self.key("levels", level_id, "played"))
    }

    fn inc_times_played(&mut self, level_id: &str) {
        let key = self.key("levels", level_id, "played");
        self.bump(&key, true);
    }

    fn fastest_duration_ms(&self, level_id: &str) -> Option<u64> {
        self.read(&self.key("levels", level_id, "fastest"))
    }

    fn set_fastest_duration_ms(&mut self, level_id: &str, duration_ms: u64) {
        let key = self.key("levels", level_id, "fastest");
        self.write(&key, Some(duration_ms));
    }

    fn slowest_duration_ms(&self, level_id: &str) -> Option<u64> {
        self.read(&self.key("levels", level_id, "slowest"))
    }

    fn set_slowest_duration_ms(&mut self, level_id: &str, duration_ms: u64) {
        let key = self.key("levels", level_id, "slowest");
        self.write(&key, Some(duration_ms));
    }
}
