//! Worlds: the nodes of the progression tree.
//!
//! A world owns its inner worlds, scores, missions, and optional gate. A world
//! without inner worlds is a level; both share this type. Inner worlds and
//! scores are kept in insertion order, which is what "first score" and
//! [`World::inner_world_at`] observe.

use crate::entity::{decode_array, type_tag_of, Entity, CLASS_NAME, ITEM_ID, NAME};
use crate::gate::Gate;
use crate::mission::Mission;
use crate::progress::ProgressQuery;
use crate::reward::RewardRegistry;
use crate::score::Score;
use crate::storage::{RewardStorage, ScoreStorage, WorldStorage};
use indexmap::IndexMap;
use levelup_common::{ids, EntityKind, LevelUpError, LevelUpResult};
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

/// Type tag written for every world.
pub const WORLD_TAG: &str = "World";
/// Type tag accepted for leaf worlds written by other tools.
pub const LEVEL_TAG: &str = "Level";

const GATE: &str = "gate";
const WORLDS: &str = "worlds";
const SCORES: &str = "scores";
const MISSIONS: &str = "missions";

/// A node in the progression tree.
#[derive(Debug, Clone, PartialEq)]
pub struct World {
    id: String,
    name: String,
    gate: Option<Gate>,
    inner_worlds: IndexMap<String, World>,
    scores: IndexMap<String, Score>,
    missions: Vec<Mission>,
}

impl World {
    /// Creates an empty world.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            gate: None,
            inner_worlds: IndexMap::new(),
            scores: IndexMap::new(),
            missions: Vec::new(),
        }
    }

    /// Creates a world from pre-built children. Absent collections become
    /// empty; duplicate ids are rejected.
    pub fn with_children(
        id: impl Into<String>,
        gate: Option<Gate>,
        inner_worlds: Option<Vec<World>>,
        scores: Option<Vec<Score>>,
        missions: Option<Vec<Mission>>,
    ) -> LevelUpResult<Self> {
        let mut world = Self::new(id);
        world.gate = gate;
        for inner in inner_worlds.unwrap_or_default() {
            world.add_inner_world(inner)?;
        }
        for score in scores.unwrap_or_default() {
            world.add_score(score)?;
        }
        world.missions = missions.unwrap_or_default();
        Ok(world)
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the gate.
    #[must_use]
    pub fn with_gate(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unlock gate, if any.
    #[must_use]
    pub const fn gate(&self) -> Option<&Gate> {
        self.gate.as_ref()
    }

    /// Replaces the gate.
    pub fn set_gate(&mut self, gate: Option<Gate>) {
        self.gate = gate;
    }

    /// Whether this world is a level (has no inner worlds).
    #[must_use]
    pub fn is_level(&self) -> bool {
        self.inner_worlds.is_empty()
    }

    /// Adds an inner world. Fails if its id is already present.
    pub fn add_inner_world(&mut self, world: World) -> LevelUpResult<()> {
        if self.inner_worlds.contains_key(&world.id) {
            return Err(LevelUpError::duplicate(EntityKind::World, world.id));
        }
        self.inner_worlds.insert(world.id.clone(), world);
        Ok(())
    }

    /// Appends a mission.
    pub fn add_mission(&mut self, mission: Mission) {
        self.missions.push(mission);
    }

    /// Adds a score and makes this world its owner. Fails if its id is
    /// already present.
    pub fn add_score(&mut self, mut score: Score) -> LevelUpResult<()> {
        if self.scores.contains_key(score.id()) {
            return Err(LevelUpError::duplicate(EntityKind::Score, score.id()));
        }
        score.set_owner(&self.id);
        self.scores.insert(score.id().to_string(), score);
        Ok(())
    }

    /// Inner world at `index` in insertion order.
    #[must_use]
    pub fn inner_world_at(&self, index: usize) -> Option<&World> {
        self.inner_worlds.get_index(index).map(|(_, world)| world)
    }

    /// Direct inner world by id.
    #[must_use]
    pub fn inner_world(&self, id: &str) -> Option<&World> {
        self.inner_worlds.get(id)
    }

    /// Direct inner world by id, mutably.
    pub fn inner_world_mut(&mut self, id: &str) -> Option<&mut World> {
        self.inner_worlds.get_mut(id)
    }

    /// Direct inner worlds in insertion order.
    pub fn inner_worlds(&self) -> impl Iterator<Item = &World> {
        self.inner_worlds.values()
    }

    /// Number of direct inner worlds.
    #[must_use]
    pub fn inner_world_count(&self) -> usize {
        self.inner_worlds.len()
    }

    /// Scores in insertion order.
    pub fn scores(&self) -> impl Iterator<Item = &Score> {
        self.scores.values()
    }

    /// Score by id.
    #[must_use]
    pub fn score(&self, id: &str) -> Option<&Score> {
        self.scores.get(id)
    }

    /// Score by id, mutably.
    pub fn score_mut(&mut self, id: &str) -> Option<&mut Score> {
        self.scores.get_mut(id)
    }

    /// Number of scores.
    #[must_use]
    pub fn score_count(&self) -> usize {
        self.scores.len()
    }

    /// Missions in order.
    #[must_use]
    pub fn missions(&self) -> &[Mission] {
        &self.missions
    }

    /// Generates `num_levels` leaf worlds from templates.
    ///
    /// Level `i` gets id `{id}_level{i}`, a copy of the gate template with id
    /// `{level}_gate`, and copies of each score and mission template with ids
    /// `{level}_score{k}` and `{level}_mission{k}`. Nothing is inserted if any
    /// generated level id is already taken.
    pub fn batch_add_levels(
        &mut self,
        num_levels: usize,
        gate_template: Option<&Gate>,
        score_templates: &[Score],
        mission_templates: &[Mission],
    ) -> LevelUpResult<()> {
        let mut levels = Vec::with_capacity(num_levels);
        for i in 0..num_levels {
            let level_id = ids::level_id(&self.id, i);
            if self.inner_worlds.contains_key(&level_id) {
                return Err(LevelUpError::duplicate(EntityKind::World, level_id));
            }

            let mut level = World::new(level_id.as_str());
            level.gate = gate_template.map(|gate| gate.clone_with_id(ids::gate_id(&level_id)));
            for (k, template) in score_templates.iter().enumerate() {
                level.add_score(template.clone_with_id(ids::score_id(&level_id, k)))?;
            }
            for (k, template) in mission_templates.iter().enumerate() {
                level.add_mission(template.clone_with_id(ids::mission_id(&level_id, k)));
            }
            levels.push(level);
        }

        for level in levels {
            self.inner_worlds.insert(level.id.clone(), level);
        }
        debug!("Generated {num_levels} levels under world {}", self.id);
        Ok(())
    }

    /// [`World::batch_add_levels`] with at most one score and one mission template.
    pub fn batch_add_levels_with_template(
        &mut self,
        num_levels: usize,
        gate_template: Option<&Gate>,
        score_template: Option<&Score>,
        mission_template: Option<&Mission>,
    ) -> LevelUpResult<()> {
        self.batch_add_levels(
            num_levels,
            gate_template,
            score_template.map_or(&[], std::slice::from_ref),
            mission_template.map_or(&[], std::slice::from_ref),
        )
    }

    /// First score in insertion order.
    #[must_use]
    pub fn single_score(&self) -> Option<&Score> {
        self.scores.first().map(|(_, score)| score)
    }

    /// First score in insertion order, mutably.
    pub fn single_score_mut(&mut self) -> Option<&mut Score> {
        self.scores.first_mut().map(|(_, score)| score)
    }

    /// Sets the first score's temp value. No-op without scores.
    pub fn set_single_score_value(&mut self, value: f64) {
        if let Some(score) = self.single_score_mut() {
            score.set_temp_score(value, false);
        }
    }

    /// Increments the first score. No-op without scores.
    pub fn inc_single_score(&mut self, amount: f64) {
        if let Some(score) = self.single_score_mut() {
            score.inc(amount);
        }
    }

    /// Decrements the first score. No-op without scores.
    pub fn dec_single_score(&mut self, amount: f64) {
        if let Some(score) = self.single_score_mut() {
            score.dec(amount);
        }
    }

    /// Sum of the first score's record over direct inner worlds. Records never
    /// committed count as zero.
    ///
    /// Every inner world must own at least one score.
    pub fn sum_inner_worlds_records<S: ScoreStorage + ?Sized>(
        &self,
        storage: &S,
    ) -> LevelUpResult<f64> {
        self.inner_worlds.values().try_fold(0.0, |sum, world| {
            let score = world.single_score().ok_or_else(|| LevelUpError::EmptyCollection {
                kind: EntityKind::Score,
                owner: world.id.clone(),
            })?;
            Ok(sum + score.record(storage).unwrap_or(0.0))
        })
    }

    fn score_for(&mut self, score_id: &str, op: &str) -> Option<&mut Score> {
        let found = self.scores.get_mut(score_id);
        if found.is_none() {
            warn!("({op}) Can't find score id: {score_id} world id: {}", self.id);
        }
        found
    }

    /// Resets every score, saving first when asked. Reports and does
    /// nothing when the world has no scores.
    pub fn reset_scores<S: ScoreStorage + ?Sized>(&mut self, save: bool, storage: &mut S) {
        if self.scores.is_empty() {
            error!(
                "(reset_scores) You don't have any scores defined in this world. World id: {}",
                self.id
            );
            return;
        }
        for score in self.scores.values_mut() {
            score.reset(save, storage);
        }
    }

    /// Increments a score. Returns false and logs when the id is unknown.
    pub fn inc_score(&mut self, score_id: &str, amount: f64) -> bool {
        self.score_for(score_id, "inc_score")
            .map(|score| score.inc(amount))
            .is_some()
    }

    /// Decrements a score. Returns false and logs when the id is unknown.
    pub fn dec_score(&mut self, score_id: &str, amount: f64) -> bool {
        self.score_for(score_id, "dec_score")
            .map(|score| score.dec(amount))
            .is_some()
    }

    /// Sets a score's temp value. Returns false and logs when the id is unknown.
    pub fn set_score_value(&mut self, score_id: &str, value: f64, only_if_better: bool) -> bool {
        self.score_for(score_id, "set_score_value")
            .map(|score| score.set_temp_score(value, only_if_better))
            .is_some()
    }

    /// Committed records by score id. Scores never committed are left out.
    pub fn record_scores<S: ScoreStorage + ?Sized>(&self, storage: &S) -> IndexMap<String, f64> {
        self.scores
            .iter()
            .filter_map(|(id, score)| score.record(storage).map(|v| (id.clone(), v)))
            .collect()
    }

    /// Latest committed values by score id. Scores never committed are left out.
    pub fn latest_scores<S: ScoreStorage + ?Sized>(&self, storage: &S) -> IndexMap<String, f64> {
        self.scores
            .iter()
            .filter_map(|(id, score)| score.latest(storage).map(|v| (id.clone(), v)))
            .collect()
    }

    /// Whether the world is marked completed.
    pub fn is_completed<S: WorldStorage + ?Sized>(&self, storage: &S) -> bool {
        storage.is_world_completed(&self.id)
    }

    /// Marks the world completed or not. With `recursive`, every descendant
    /// is marked first.
    pub fn set_completed<S: WorldStorage + ?Sized>(
        &self,
        completed: bool,
        recursive: bool,
        storage: &mut S,
    ) {
        if recursive {
            for world in self.inner_worlds.values() {
                world.set_completed(completed, true, storage);
            }
        }
        storage.set_world_completed(&self.id, completed);
    }

    /// Assigns a registered reward to this world.
    ///
    /// The previously assigned reward is taken back if it can still be
    /// found. The new reward's activation limit is lifted so it can be given
    /// again on every reassignment, then it is given and recorded as this
    /// world's reward. A reward that refuses to be given, such as an
    /// exhausted sequence, is still recorded.
    pub fn assign_reward<S>(
        &self,
        reward_id: &str,
        rewards: &mut RewardRegistry,
        storage: &mut S,
    ) -> LevelUpResult<()>
    where
        S: WorldStorage + RewardStorage + ?Sized,
    {
        if !rewards.contains(reward_id) {
            return Err(LevelUpError::missing(EntityKind::Reward, reward_id));
        }

        if let Some(old_id) = storage.assigned_reward(&self.id) {
            match rewards.find(&old_id) {
                Some(old) => {
                    if !old.take(storage) {
                        debug!("Previously assigned reward {old_id} was not held");
                    }
                },
                None => debug!("Previously assigned reward {old_id} is gone"),
            }
        }

        let reward = rewards
            .get_mut(reward_id)
            .ok_or_else(|| LevelUpError::missing(EntityKind::Reward, reward_id))?;
        if reward.schedule().activation_limit > 0 {
            reward.schedule_mut().activation_limit = 0;
        }
        if !reward.give(storage) {
            warn!("Reward {reward_id} assigned to world {} but could not be given", self.id);
        }
        storage.set_assigned_reward(&self.id, reward_id);
        Ok(())
    }

    /// Id of the reward assigned to this world.
    pub fn assigned_reward_id<S: WorldStorage + ?Sized>(&self, storage: &S) -> Option<String> {
        storage.assigned_reward(&self.id)
    }

    /// Whether the world can be played: no gate, or an open one.
    pub fn can_start<Q: ProgressQuery + ?Sized>(&self, progress: &Q) -> bool {
        self.gate.as_ref().map_or(true, |gate| gate.is_open(progress))
    }

    /// Finds this world or a descendant by id.
    #[must_use]
    pub fn find_world(&self, id: &str) -> Option<&World> {
        if self.id == id {
            return Some(self);
        }
        self.inner_worlds.values().find_map(|w| w.find_world(id))
    }

    /// Finds this world or a descendant by id, mutably.
    pub fn find_world_mut(&mut self, id: &str) -> Option<&mut World> {
        if self.id == id {
            return Some(self);
        }
        self.inner_worlds
            .values_mut()
            .find_map(|w| w.find_world_mut(id))
    }

    /// Finds a score anywhere in this subtree.
    #[must_use]
    pub fn find_score(&self, id: &str) -> Option<&Score> {
        self.scores
            .get(id)
            .or_else(|| self.inner_worlds.values().find_map(|w| w.find_score(id)))
    }

    /// Finds a mission, including challenge sub-missions, anywhere in this subtree.
    #[must_use]
    pub fn find_mission(&self, id: &str) -> Option<&Mission> {
        self.missions
            .iter()
            .find_map(|m| m.find(id))
            .or_else(|| self.inner_worlds.values().find_map(|w| w.find_mission(id)))
    }

    /// Finds a gate, including composite members, anywhere in this subtree.
    #[must_use]
    pub fn find_gate(&self, id: &str) -> Option<&Gate> {
        self.gate
            .as_ref()
            .and_then(|g| g.find(id))
            .or_else(|| self.inner_worlds.values().find_map(|w| w.find_gate(id)))
    }

    /// Number of levels (leaf worlds) strictly below this world.
    #[must_use]
    pub fn count_levels(&self) -> usize {
        self.inner_worlds
            .values()
            .map(|w| if w.is_level() { 1 } else { w.count_levels() })
            .sum()
    }

    /// Number of worlds strictly below this world, levels included.
    #[must_use]
    pub fn count_descendants(&self) -> usize {
        self.inner_worlds
            .values()
            .map(|w| 1 + w.count_descendants())
            .sum()
    }
}

fn entities_to_json<'a, T: Entity + 'a>(
    items: impl Iterator<Item = &'a T>,
) -> LevelUpResult<Value> {
    items
        .map(Entity::to_json)
        .collect::<LevelUpResult<Vec<_>>>()
        .map(Value::Array)
}

impl Entity for World {
    const KIND: EntityKind = EntityKind::World;
    const TYPE_TAGS: &'static [&'static str] = &[WORLD_TAG, LEVEL_TAG];

    fn id(&self) -> &str {
        &self.id
    }

    fn type_tag(&self) -> &'static str {
        WORLD_TAG
    }

    fn to_json(&self) -> LevelUpResult<Value> {
        let mut obj = Map::new();
        obj.insert(CLASS_NAME.to_string(), Value::from(WORLD_TAG));
        obj.insert(ITEM_ID.to_string(), Value::from(self.id.as_str()));
        obj.insert(NAME.to_string(), Value::from(self.name.as_str()));
        let gate = match &self.gate {
            Some(gate) => gate.to_json()?,
            None => Value::Object(Map::new()),
        };
        obj.insert(GATE.to_string(), gate);
        obj.insert(WORLDS.to_string(), entities_to_json(self.inner_worlds.values())?);
        obj.insert(SCORES.to_string(), entities_to_json(self.scores.values())?);
        obj.insert(MISSIONS.to_string(), entities_to_json(self.missions.iter())?);
        Ok(Value::Object(obj))
    }

    fn from_json(value: &Value) -> LevelUpResult<Self> {
        type_tag_of(Self::KIND, Self::TYPE_TAGS, value)?;
        let id = value.get(ITEM_ID).and_then(Value::as_str).ok_or_else(|| {
            LevelUpError::Deserialization(format!("world is missing {ITEM_ID}"))
        })?;

        let mut world = World::new(id);
        if let Some(name) = value.get(NAME).and_then(Value::as_str) {
            world.name = name.to_string();
        }

        world.gate = match value.get(GATE) {
            None | Some(Value::Null) => None,
            Some(Value::Object(fields)) if fields.is_empty() => None,
            Some(gate) => Some(Gate::from_json(gate)?),
        };

        for inner in decode_array::<World>(id, value, WORLDS)? {
            world.add_inner_world(inner)?;
        }
        for score in decode_array::<Score>(id, value, SCORES)? {
            world.add_score(score)?;
        }
        world.missions = decode_array::<Mission>(id, value, MISSIONS)?;
        Ok(world)
    }
}
