//! The progression session.
//!
//! [`LevelUp`] owns one progression model (the root world and the reward
//! registry) together with its storage and event bus. Operations that need
//! both the model and the storage go through here so the borrows stay
//! disjoint and every state change is published.

use crate::entity::Entity;
use crate::events::{EventBus, ProgressEvent};
use crate::gate::Gate;
use crate::level::LevelRun;
use crate::mission::{Mission, MissionKind};
use crate::progress::Progress;
use crate::reward::{Reward, RewardRegistry};
use crate::score::Score;
use crate::storage::LevelUpStorage;
use crate::world::World;
use levelup_common::{EntityKind, LevelUpConfig, LevelUpError, LevelUpResult, SchemaVersion};
use serde_json::{Map, Value};
use tracing::{debug, info};

const SCHEMA_VERSION: &str = "schemaVersion";
const MAIN_WORLD: &str = "mainWorld";
const REWARDS: &str = "rewards";

/// A loaded progression model bound to its storage.
#[derive(Debug)]
pub struct LevelUp<S> {
    root: World,
    rewards: RewardRegistry,
    storage: S,
    events: EventBus,
    config: LevelUpConfig,
}

impl<S: LevelUpStorage> LevelUp<S> {
    /// Creates a session over an already built model.
    #[must_use]
    pub fn new(root: World, rewards: RewardRegistry, storage: S, mut config: LevelUpConfig) -> Self {
        config.validate();
        info!(
            "LevelUp initialized: main world {}, {} rewards",
            root.id(),
            rewards.len()
        );
        Self {
            root,
            rewards,
            storage,
            events: EventBus::new(config.event_capacity),
            config,
        }
    }

    /// Loads a model document `{schemaVersion, mainWorld, rewards}`.
    ///
    /// A document without a version is read as the current version. A
    /// document from another major version is rejected.
    pub fn from_model_json(value: &Value, storage: S, config: LevelUpConfig) -> LevelUpResult<Self> {
        let current = SchemaVersion::LEVELUP_MODEL;
        match value.get(SCHEMA_VERSION).and_then(Value::as_str) {
            Some(raw) => {
                let version: SchemaVersion = raw.parse()?;
                if !current.can_read(&version) {
                    return Err(LevelUpError::VersionMismatch {
                        expected: current.to_string(),
                        actual: version.to_string(),
                    });
                }
            },
            None => debug!("Model has no {SCHEMA_VERSION}, assuming {current}"),
        }

        let main = value.get(MAIN_WORLD).ok_or_else(|| {
            LevelUpError::Deserialization(format!("model is missing {MAIN_WORLD}"))
        })?;
        let root = World::from_json(main)?;
        let rewards = match value.get(REWARDS) {
            None | Some(Value::Null) => RewardRegistry::new(),
            Some(rewards) => RewardRegistry::from_json(rewards)?,
        };
        Ok(Self::new(root, rewards, storage, config))
    }

    /// Loads a model document from text.
    pub fn from_model_str(text: &str, storage: S, config: LevelUpConfig) -> LevelUpResult<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_model_json(&value, storage, config)
    }

    /// The model document.
    pub fn to_model_json(&self) -> LevelUpResult<Value> {
        let mut obj = Map::new();
        obj.insert(
            SCHEMA_VERSION.to_string(),
            Value::from(SchemaVersion::LEVELUP_MODEL.to_string()),
        );
        obj.insert(MAIN_WORLD.to_string(), self.root.to_json()?);
        obj.insert(REWARDS.to_string(), self.rewards.to_json()?);
        Ok(Value::Object(obj))
    }

    /// The model document as text, pretty-printed if configured.
    pub fn model_to_string(&self) -> LevelUpResult<String> {
        let value = self.to_model_json()?;
        let text = if self.config.pretty_json {
            serde_json::to_string_pretty(&value)
        } else {
            serde_json::to_string(&value)
        };
        text.map_err(|e| LevelUpError::Serialization(e.to_string()))
    }

    /// Root world.
    #[must_use]
    pub const fn root(&self) -> &World {
        &self.root
    }

    /// Registered rewards.
    #[must_use]
    pub const fn rewards(&self) -> &RewardRegistry {
        &self.rewards
    }

    /// Registered rewards, mutably.
    pub fn rewards_mut(&mut self) -> &mut RewardRegistry {
        &mut self.rewards
    }

    /// Backing storage.
    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Backing storage, mutably.
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &LevelUpConfig {
        &self.config
    }

    /// Event bus.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Drains pending events.
    pub fn drain_events(&self) -> Vec<ProgressEvent> {
        self.events.drain()
    }

    /// World anywhere in the tree.
    #[must_use]
    pub fn world(&self, id: &str) -> Option<&World> {
        self.root.find_world(id)
    }

    /// World anywhere in the tree, mutably.
    pub fn world_mut(&mut self, id: &str) -> Option<&mut World> {
        self.root.find_world_mut(id)
    }

    /// Score anywhere in the tree.
    #[must_use]
    pub fn score(&self, id: &str) -> Option<&Score> {
        self.root.find_score(id)
    }

    /// Gate anywhere in the tree.
    #[must_use]
    pub fn gate(&self, id: &str) -> Option<&Gate> {
        self.root.find_gate(id)
    }

    /// Mission anywhere in the tree.
    #[must_use]
    pub fn mission(&self, id: &str) -> Option<&Mission> {
        self.root.find_mission(id)
    }

    /// Registered reward, including sequence and random members.
    #[must_use]
    pub fn reward(&self, id: &str) -> Option<&Reward> {
        self.rewards.find(id)
    }

    /// Number of levels in the tree.
    #[must_use]
    pub fn count_levels(&self) -> usize {
        self.root.count_levels()
    }

    /// Number of worlds below the root, optionally counting levels.
    #[must_use]
    pub fn count_worlds(&self, with_levels: bool) -> usize {
        let all = self.root.count_descendants();
        if with_levels {
            all
        } else {
            all - self.root.count_levels()
        }
    }

    fn require_world(&self, id: &str) -> LevelUpResult<&World> {
        self.root
            .find_world(id)
            .ok_or_else(|| LevelUpError::missing(EntityKind::World, id))
    }

    /// Read-only view for evaluating gates and missions.
    #[must_use]
    pub fn progress(&self) -> Progress<'_, S> {
        Progress::new(&self.root, &self.storage)
    }

    /// Whether a world's gate is open.
    pub fn can_start(&self, world_id: &str) -> LevelUpResult<bool> {
        Ok(self.require_world(world_id)?.can_start(&self.progress()))
    }

    /// Marks a world completed or not, optionally with all its descendants.
    pub fn set_world_completed(
        &mut self,
        world_id: &str,
        completed: bool,
        recursive: bool,
    ) -> LevelUpResult<()> {
        let world = self
            .root
            .find_world(world_id)
            .ok_or_else(|| LevelUpError::missing(EntityKind::World, world_id))?;
        world.set_completed(completed, recursive, &mut self.storage);
        self.events.publish(ProgressEvent::WorldCompleted {
            world_id: world_id.to_string(),
            completed,
        });
        Ok(())
    }

    /// Assigns a registered reward to a world.
    pub fn assign_reward(&mut self, world_id: &str, reward_id: &str) -> LevelUpResult<()> {
        let world = self
            .root
            .find_world(world_id)
            .ok_or_else(|| LevelUpError::missing(EntityKind::World, world_id))?;
        world.assign_reward(reward_id, &mut self.rewards, &mut self.storage)?;
        self.events.publish(ProgressEvent::RewardAssigned {
            world_id: world_id.to_string(),
            reward_id: reward_id.to_string(),
        });
        Ok(())
    }

    /// Completes a mission and gives its rewards. Returns false when the
    /// mission's schedule refuses another completion.
    pub fn complete_mission(&mut self, mission_id: &str) -> LevelUpResult<bool> {
        let mission = self
            .root
            .find_mission(mission_id)
            .ok_or_else(|| LevelUpError::missing(EntityKind::Mission, mission_id))?;
        let completed = mission.complete(&self.rewards, &mut self.storage);
        if completed {
            self.events.publish(ProgressEvent::MissionCompleted {
                mission_id: mission_id.to_string(),
            });
        }
        Ok(completed)
    }

    /// Completes every available mission whose condition now holds.
    /// Sub-missions are checked before the challenges containing them.
    /// Returns the ids completed.
    pub fn complete_fulfilled_missions(&mut self) -> Vec<String> {
        let mut ids = Vec::new();
        collect_mission_ids(&self.root, &mut ids);

        let mut done = Vec::new();
        for id in ids {
            let Some(mission) = self.root.find_mission(&id) else {
                continue;
            };
            let progress = Progress::new(&self.root, &self.storage);
            if !mission.is_available(&self.storage) || !mission.is_fulfilled(&progress) {
                continue;
            }
            if mission.complete(&self.rewards, &mut self.storage) {
                self.events.publish(ProgressEvent::MissionCompleted {
                    mission_id: id.clone(),
                });
                done.push(id);
            }
        }
        done
    }

    /// Resets a world's scores, committing them first when `save` is set.
    pub fn reset_scores(&mut self, world_id: &str, save: bool) -> LevelUpResult<()> {
        let world = self
            .root
            .find_world_mut(world_id)
            .ok_or_else(|| LevelUpError::missing(EntityKind::World, world_id))?;
        world.reset_scores(save, &mut self.storage);
        self.events.publish(ProgressEvent::ScoresReset {
            world_id: world_id.to_string(),
            saved: save,
        });
        Ok(())
    }

    /// Starts playing a level. Returns `None` if its gate is closed.
    pub fn start_level(&mut self, level_id: &str, now_ms: u64) -> LevelUpResult<Option<LevelRun>> {
        if !self.can_start(level_id)? {
            debug!("Level {level_id} is locked");
            return Ok(None);
        }
        self.storage.inc_times_started(level_id);

        let mut run = LevelRun::new(level_id);
        run.start(now_ms);
        self.events.publish(ProgressEvent::LevelStarted {
            level_id: level_id.to_string(),
        });
        Ok(Some(run))
    }

    /// Ends a running or paused level. Returns false if the run was not active.
    ///
    /// Every end counts as a play. On completion the fastest and slowest
    /// durations are updated, the level's scores are committed, and the
    /// level is marked completed. Otherwise scores are reset unsaved.
    pub fn end_level(&mut self, run: &mut LevelRun, completed: bool, now_ms: u64) -> LevelUpResult<bool> {
        let level_id = run.level_id().to_string();
        let level = self
            .root
            .find_world_mut(&level_id)
            .ok_or_else(|| LevelUpError::missing(EntityKind::World, &level_id))?;
        if !run.finish(completed, now_ms) {
            return Ok(false);
        }
        let duration_ms = run.play_duration_ms(now_ms);

        self.storage.inc_times_played(&level_id);
        if completed {
            if self
                .storage
                .fastest_duration_ms(&level_id)
                .map_or(true, |fastest| duration_ms < fastest)
            {
                self.storage.set_fastest_duration_ms(&level_id, duration_ms);
            }
            if self
                .storage
                .slowest_duration_ms(&level_id)
                .map_or(true, |slowest| duration_ms > slowest)
            {
                self.storage.set_slowest_duration_ms(&level_id, duration_ms);
            }
        }

        if level.score_count() > 0 {
            level.reset_scores(completed, &mut self.storage);
        }
        if completed {
            level.set_completed(true, false, &mut self.storage);
        }

        self.events.publish(ProgressEvent::LevelEnded {
            level_id: level_id.clone(),
            completed,
            duration_ms,
        });
        if completed {
            self.events.publish(ProgressEvent::WorldCompleted {
                world_id: level_id,
                completed: true,
            });
        }
        Ok(true)
    }
}

fn collect_mission_ids(world: &World, out: &mut Vec<String>) {
    fn visit(mission: &Mission, out: &mut Vec<String>) {
        if let MissionKind::Challenge { missions } = mission.kind() {
            for sub in missions {
                visit(sub, out);
            }
        }
        out.push(mission.id().to_string());
    }

    for mission in world.missions() {
        visit(mission, out);
    }
    for inner in world.inner_worlds() {
        collect_mission_ids(inner, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv_storage::KeyValueStorage;
    use crate::level::LevelState;
    use crate::schedule::Schedule;
    use crate::storage::{LevelStorage, MemoryStorage, RewardStorage, WorldStorage};
    use serde_json::json;
    use std::collections::BTreeMap;

    /// Two chapters of three levels. Each chapter after the first is locked
    /// behind completing the previous one.
    fn model() -> (World, RewardRegistry) {
        let mut root = World::new("main");
        let mut first = World::new("c0");
        first
            .batch_add_levels(3, None, &[Score::new("stars")], &[])
            .expect("generate");
        let mut second = World::new("c1").with_gate(Gate::world_completion("c1_gate", "c0"));
        second
            .batch_add_levels(
                3,
                Some(&Gate::record("tpl", "c0_level0_score0", 3.0)),
                &[Score::new("stars")],
                &[],
            )
            .expect("generate");
        root.add_inner_world(first).expect("unique");
        root.add_inner_world(second).expect("unique");
        root.add_mission(
            Mission::world_completion("finish_c0", "c0").with_reward("gold"),
        );
        root.add_mission(Mission::challenge(
            "all_done",
            vec![
                Mission::world_completion("finish_c0_again", "c0"),
                Mission::world_completion("finish_c1", "c1"),
            ],
        ));

        let mut rewards = RewardRegistry::new();
        rewards.register(Reward::badge("gold")).expect("register");
        rewards.register(Reward::badge("silver")).expect("register");
        (root, rewards)
    }

    fn session() -> LevelUp<MemoryStorage> {
        let (root, rewards) = model();
        LevelUp::new(root, rewards, MemoryStorage::new(), LevelUpConfig::default())
    }

    #[test]
    fn test_lookups_and_counts() {
        let lu = session();
        assert!(lu.world("c1_level2").is_some());
        assert!(lu.score("c0_level1_score0").is_some());
        assert!(lu.gate("c1_level0_gate").is_some());
        assert!(lu.mission("finish_c1").is_some());
        assert!(lu.reward("gold").is_some());
        assert!(lu.world("nope").is_none());

        assert_eq!(lu.count_levels(), 6);
        assert_eq!(lu.count_worlds(true), 8);
        assert_eq!(lu.count_worlds(false), 2);
    }

    #[test]
    fn test_locked_chapter() {
        let mut lu = session();
        assert!(lu.can_start("c0").expect("exists"));
        assert!(!lu.can_start("c1").expect("exists"));

        lu.set_world_completed("c0", true, true).expect("exists");
        assert!(lu.can_start("c1").expect("exists"));
        assert!(lu.storage().is_world_completed("c0_level2"));

        assert!(matches!(
            lu.can_start("missing"),
            Err(LevelUpError::MissingKey { kind: EntityKind::World, .. })
        ));
    }

    #[test]
    fn test_level_play_records_stats_and_scores() {
        let mut lu = session();
        let mut run = lu
            .start_level("c0_level0", 1_000)
            .expect("exists")
            .expect("ungated");
        lu.world_mut("c0_level0").expect("level").inc_single_score(3.0);
        assert!(lu.end_level(&mut run, true, 6_000).expect("exists"));
        assert_eq!(run.state(), LevelState::Completed);

        let storage = lu.storage();
        assert_eq!(storage.times_started("c0_level0"), 1);
        assert_eq!(storage.times_played("c0_level0"), 1);
        assert_eq!(storage.fastest_duration_ms("c0_level0"), Some(5_000));
        assert_eq!(storage.slowest_duration_ms("c0_level0"), Some(5_000));
        assert!(storage.is_world_completed("c0_level0"));

        let score = lu.score("c0_level0_score0").expect("score");
        assert_eq!(score.record(lu.storage()), Some(3.0));
        assert_eq!(score.temp_score(), 0.0);

        assert!(!lu.end_level(&mut run, true, 7_000).expect("exists"));
    }

    #[test]
    fn test_durations_track_extremes() {
        let mut lu = session();
        for (start, end) in [(0, 4_000), (0, 2_000), (0, 9_000)] {
            let mut run = lu
                .start_level("c0_level1", start)
                .expect("exists")
                .expect("ungated");
            lu.end_level(&mut run, true, end).expect("exists");
        }
        let mut failed = lu
            .start_level("c0_level1", 0)
            .expect("exists")
            .expect("ungated");
        lu.end_level(&mut failed, false, 100).expect("exists");

        let storage = lu.storage();
        assert_eq!(storage.fastest_duration_ms("c0_level1"), Some(2_000));
        assert_eq!(storage.slowest_duration_ms("c0_level1"), Some(9_000));
        assert_eq!(storage.times_played("c0_level1"), 4);
    }

    #[test]
    fn test_failed_run_discards_scores() {
        let mut lu = session();
        let mut run = lu
            .start_level("c0_level2", 0)
            .expect("exists")
            .expect("ungated");
        lu.world_mut("c0_level2").expect("level").inc_single_score(9.0);
        lu.end_level(&mut run, false, 10).expect("exists");

        let score = lu.score("c0_level2_score0").expect("score");
        assert_eq!(score.record(lu.storage()), None);
        assert!(!lu.storage().is_world_completed("c0_level2"));
    }

    #[test]
    fn test_gated_level_refused() {
        let mut lu = session();
        lu.set_world_completed("c0", true, false).expect("exists");
        assert!(lu.start_level("c1_level0", 0).expect("exists").is_none());
        assert_eq!(lu.storage().times_started("c1_level0"), 0);

        let mut run = lu
            .start_level("c0_level0", 0)
            .expect("exists")
            .expect("ungated");
        lu.world_mut("c0_level0").expect("level").set_single_score_value(3.0);
        lu.end_level(&mut run, true, 1).expect("exists");

        assert!(lu.start_level("c1_level0", 0).expect("exists").is_some());
    }

    #[test]
    fn test_missions_and_rewards() {
        let mut lu = session();
        assert!(lu.complete_fulfilled_missions().is_empty());

        lu.set_world_completed("c0", true, false).expect("exists");
        let done = lu.complete_fulfilled_missions();
        assert_eq!(done, vec!["finish_c0", "finish_c0_again"]);
        assert!(lu.storage().is_reward_given("gold"));

        lu.set_world_completed("c1", true, false).expect("exists");
        assert_eq!(lu.complete_fulfilled_missions(), vec!["finish_c1", "all_done"]);
        assert!(lu.complete_fulfilled_missions().is_empty());

        assert!(!lu.complete_mission("finish_c0").expect("exists"));
        assert!(matches!(
            lu.complete_mission("ghost"),
            Err(LevelUpError::MissingKey { kind: EntityKind::Mission, .. })
        ));
    }

    #[test]
    fn test_assign_reward_through_session() {
        let mut lu = session();
        lu.rewards_mut()
            .get_mut("silver")
            .expect("registered")
            .schedule_mut()
            .activation_limit = 1;

        lu.assign_reward("c0", "gold").expect("assign");
        lu.assign_reward("c0", "silver").expect("assign");

        assert_eq!(lu.storage().assigned_reward("c0").as_deref(), Some("silver"));
        assert!(!lu.storage().is_reward_given("gold"));
        assert_eq!(lu.reward("silver").map(|r| *r.schedule()), Some(Schedule::unlimited()));
        assert!(matches!(
            lu.assign_reward("ghost", "gold"),
            Err(LevelUpError::MissingKey { kind: EntityKind::World, .. })
        ));
    }

    #[test]
    fn test_events_published() {
        let mut lu = session();
        lu.set_world_completed("c0", true, false).expect("exists");
        lu.reset_scores("c0_level0", false).expect("exists");
        let mut run = lu
            .start_level("c0_level0", 0)
            .expect("exists")
            .expect("ungated");
        lu.end_level(&mut run, false, 5).expect("exists");

        assert_eq!(
            lu.drain_events(),
            vec![
                ProgressEvent::WorldCompleted {
                    world_id: "c0".to_string(),
                    completed: true
                },
                ProgressEvent::ScoresReset {
                    world_id: "c0_level0".to_string(),
                    saved: false
                },
                ProgressEvent::LevelStarted {
                    level_id: "c0_level0".to_string()
                },
                ProgressEvent::LevelEnded {
                    level_id: "c0_level0".to_string(),
                    completed: false,
                    duration_ms: 5
                },
            ]
        );
    }

    #[test]
    fn test_model_round_trip() {
        let lu = session();
        let text = lu.model_to_string().expect("encode");
        let loaded = LevelUp::from_model_str(&text, MemoryStorage::new(), LevelUpConfig::default())
            .expect("decode");
        assert_eq!(loaded.root(), lu.root());
        assert_eq!(loaded.rewards().len(), 2);
        assert_eq!(loaded.to_model_json().expect("encode"), lu.to_model_json().expect("encode"));
    }

    #[test]
    fn test_pretty_model() {
        let (root, rewards) = model();
        let config = LevelUpConfig {
            pretty_json: true,
            ..LevelUpConfig::default()
        };
        let lu = LevelUp::new(root, rewards, MemoryStorage::new(), config);
        assert!(lu.model_to_string().expect("encode").contains('\n'));
    }

    #[test]
    fn test_model_version_checks() {
        let newer = json!({
            "schemaVersion": "2.0.0",
            "mainWorld": {"className": "World", "itemId": "main"}
        });
        assert!(matches!(
            LevelUp::from_model_json(&newer, MemoryStorage::new(), LevelUpConfig::default()),
            Err(LevelUpError::VersionMismatch { .. })
        ));

        let unversioned = json!({"mainWorld": {"className": "World", "itemId": "main"}});
        let lu = LevelUp::from_model_json(&unversioned, MemoryStorage::new(), LevelUpConfig::default())
            .expect("decode");
        assert!(lu.rewards().is_empty());

        let headless = json!({"schemaVersion": "1.0.0"});
        assert!(matches!(
            LevelUp::from_model_json(&headless, MemoryStorage::new(), LevelUpConfig::default()),
            Err(LevelUpError::Deserialization(_))
        ));
    }

    #[test]
    fn test_key_value_backed_session() {
        let (root, rewards) = model();
        let storage = KeyValueStorage::new(BTreeMap::new(), "lu");
        let mut lu = LevelUp::new(root, rewards, storage, LevelUpConfig::default());

        let mut run = lu
            .start_level("c0_level0", 0)
            .expect("exists")
            .expect("ungated");
        lu.world_mut("c0_level0").expect("level").inc_single_score(2.0);
        lu.end_level(&mut run, true, 750).expect("exists");

        let backend = lu.storage().backend();
        assert_eq!(
            backend.get("lu.scores.c0_level0/Score:c0_level0_score0.record").map(String::as_str),
            Some("2")
        );
        assert_eq!(backend.get("lu.levels.c0_level0.fastest").map(String::as_str), Some("750"));
        assert_eq!(backend.get("lu.worlds.c0_level0.completed").map(String::as_str), Some("true"));
    }
}
