//! Rewards and the reward registry.
//!
//! Giving and taking a reward updates the owned-rewards ledger in
//! [`RewardStorage`]. A reward's [`Schedule`] caps how many times it may be
//! given. Sequence and random rewards hand out one of their members per give
//! and remember which one so it can be taken back.

use crate::entity::{decode_tagged, encode, Entity};
use crate::schedule::Schedule;
use crate::storage::RewardStorage;
use indexmap::IndexMap;
use levelup_common::{EntityKind, LevelUpError, LevelUpResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Reward variant, stored under `className`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "className")]
pub enum RewardKind {
    /// A badge; giving it simply marks it owned
    #[serde(rename = "BadgeReward", rename_all = "camelCase")]
    Badge {
        /// Optional icon location
        #[serde(default, skip_serializing_if = "Option::is_none")]
        icon_url: Option<String>,
    },
    /// Hands out its members in order, one per give
    #[serde(rename = "SequenceReward")]
    Sequence {
        /// Members in hand-out order
        rewards: Vec<Reward>,
    },
    /// Hands out a random member per give
    #[serde(rename = "RandomReward")]
    Random {
        /// Candidate members
        rewards: Vec<Reward>,
    },
}

/// A giveable, takeable entity with an activation limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reward {
    #[serde(rename = "itemId")]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    schedule: Schedule,
    #[serde(flatten)]
    kind: RewardKind,
}

impl Reward {
    /// Creates a reward of any kind with an unlimited schedule.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: RewardKind) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            schedule: Schedule::unlimited(),
            kind,
        }
    }

    /// Badge reward.
    #[must_use]
    pub fn badge(id: impl Into<String>) -> Self {
        Self::new(id, RewardKind::Badge { icon_url: None })
    }

    /// Sequence reward over `rewards`.
    #[must_use]
    pub fn sequence(id: impl Into<String>, rewards: Vec<Reward>) -> Self {
        Self::new(id, RewardKind::Sequence { rewards })
    }

    /// Random reward over `rewards`.
    #[must_use]
    pub fn random(id: impl Into<String>, rewards: Vec<Reward>) -> Self {
        Self::new(id, RewardKind::Random { rewards })
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the activation schedule.
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

    /// Reward variant.
    #[must_use]
    pub const fn kind(&self) -> &RewardKind {
        &self.kind
    }

    /// Activation schedule.
    #[must_use]
    pub const fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Mutable activation schedule.
    pub fn schedule_mut(&mut self) -> &mut Schedule {
        &mut self.schedule
    }

    /// How many times the reward is currently given.
    pub fn times_given<S: RewardStorage + ?Sized>(&self, storage: &S) -> u32 {
        storage.times_given(&self.id)
    }

    /// Whether the reward is currently owned.
    pub fn is_owned<S: RewardStorage + ?Sized>(&self, storage: &S) -> bool {
        storage.is_reward_given(&self.id)
    }

    /// Gives the reward. Returns false when the schedule refuses or a
    /// sequence is exhausted.
    pub fn give<S: RewardStorage + ?Sized>(&self, storage: &mut S) -> bool {
        let times = storage.times_given(&self.id);
        if !self.schedule.approve(times) {
            debug!("Reward {} not approved by schedule ({times} given)", self.id);
            return false;
        }
        if !self.give_inner(storage) {
            return false;
        }
        storage.set_reward_status(&self.id, true);
        debug!("Gave reward {}", self.id);
        true
    }

    /// Takes the reward back. Returns false when it was never given.
    pub fn take<S: RewardStorage + ?Sized>(&self, storage: &mut S) -> bool {
        if !storage.is_reward_given(&self.id) {
            debug!("Reward {} not given, nothing to take", self.id);
            return false;
        }
        if !self.take_inner(storage) {
            return false;
        }
        storage.set_reward_status(&self.id, false);
        debug!("Took reward {}", self.id);
        true
    }

    fn give_inner<S: RewardStorage + ?Sized>(&self, storage: &mut S) -> bool {
        match &self.kind {
            RewardKind::Badge { .. } => true,
            RewardKind::Sequence { rewards } => {
                let next = storage.last_given_index(&self.id).map_or(0, |i| i + 1);
                let Some(member) = rewards.get(next) else {
                    debug!("Sequence reward {} exhausted", self.id);
                    return false;
                };
                member.give(storage);
                storage.set_last_given_index(&self.id, Some(next));
                true
            },
            RewardKind::Random { rewards } => {
                if rewards.is_empty() {
                    return false;
                }
                let index = fastrand::usize(..rewards.len());
                rewards[index].give(storage);
                storage.set_last_given_index(&self.id, Some(index));
                true
            },
        }
    }

    fn take_inner<S: RewardStorage + ?Sized>(&self, storage: &mut S) -> bool {
        match &self.kind {
            RewardKind::Badge { .. } => true,
            RewardKind::Sequence { rewards } => {
                let Some(last) = storage.last_given_index(&self.id) else {
                    return false;
                };
                if let Some(member) = rewards.get(last) {
                    member.take(storage);
                }
                storage.set_last_given_index(&self.id, last.checked_sub(1));
                true
            },
            RewardKind::Random { rewards } => {
                let Some(last) = storage.last_given_index(&self.id) else {
                    return false;
                };
                if let Some(member) = rewards.get(last) {
                    member.take(storage);
                }
                storage.set_last_given_index(&self.id, None);
                true
            },
        }
    }

    /// Finds this reward or a nested member by id.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Reward> {
        if self.id == id {
            return Some(self);
        }
        match &self.kind {
            RewardKind::Badge { .. } => None,
            RewardKind::Sequence { rewards } | RewardKind::Random { rewards } => {
                rewards.iter().find_map(|r| r.find(id))
            },
        }
    }
}

impl Entity for Reward {
    const KIND: EntityKind = EntityKind::Reward;
    const TYPE_TAGS: &'static [&'static str] = &["BadgeReward", "SequenceReward", "RandomReward"];

    fn id(&self) -> &str {
        &self.id
    }

    fn type_tag(&self) -> &'static str {
        match self.kind {
            RewardKind::Badge { .. } => "BadgeReward",
            RewardKind::Sequence { .. } => "SequenceReward",
            RewardKind::Random { .. } => "RandomReward",
        }
    }

    fn to_json(&self) -> LevelUpResult<Value> {
        encode(self)
    }

    fn from_json(value: &Value) -> LevelUpResult<Self> {
        decode_tagged(value)
    }
}

/// Session-wide lookup of rewards by id, in registration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RewardRegistry {
    rewards: IndexMap<String, Reward>,
}

impl RewardRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a reward. Fails if the id is taken.
    pub fn register(&mut self, reward: Reward) -> LevelUpResult<()> {
        if self.rewards.contains_key(reward.id()) {
            return Err(LevelUpError::duplicate(EntityKind::Reward, reward.id()));
        }
        self.rewards.insert(reward.id().to_string(), reward);
        Ok(())
    }

    /// Gets a registered reward.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Reward> {
        self.rewards.get(id)
    }

    /// Gets a registered reward mutably.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Reward> {
        self.rewards.get_mut(id)
    }

    /// Finds a registered reward or a member nested inside one.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Reward> {
        self.rewards.values().find_map(|r| r.find(id))
    }

    /// Removes a reward, keeping the order of the rest.
    pub fn remove(&mut self, id: &str) -> Option<Reward> {
        self.rewards.shift_remove(id)
    }

    /// Whether a reward is registered under `id`.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.rewards.contains_key(id)
    }

    /// Iterates rewards in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Reward> {
        self.rewards.values()
    }

    /// Number of registered rewards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// Serializes every reward as a JSON array.
    pub fn to_json(&self) -> LevelUpResult<Value> {
        self.rewards
            .values()
            .map(Entity::to_json)
            .collect::<LevelUpResult<Vec<_>>>()
            .map(Value::Array)
    }

    /// Rebuilds a registry from a JSON array of rewards.
    pub fn from_json(value: &Value) -> LevelUpResult<Self> {
        let items = value.as_array().ok_or_else(|| {
            LevelUpError::Deserialization("rewards representation is not an array".to_string())
        })?;
        let mut registry = Self::new();
        for item in items {
            registry.register(Reward::from_json(item)?)?;
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use serde_json::json;

    #[test]
    fn test_badge_give_take() {
        let mut storage = MemoryStorage::new();
        let badge = Reward::badge("b");

        assert!(!badge.take(&mut storage));
        assert!(badge.give(&mut storage));
        assert!(badge.is_owned(&storage));
        assert!(badge.take(&mut storage));
        assert!(!badge.is_owned(&storage));
    }

    #[test]
    fn test_schedule_limits_give() {
        let mut storage = MemoryStorage::new();
        let badge = Reward::badge("b").with_schedule(Schedule::with_limit(2));

        assert!(badge.give(&mut storage));
        assert!(badge.give(&mut storage));
        assert!(!badge.give(&mut storage));
        assert_eq!(badge.times_given(&storage), 2);
    }

    #[test]
    fn test_unlimited_schedule_gives_forever() {
        let mut storage = MemoryStorage::new();
        let badge = Reward::badge("b");
        for _ in 0..50 {
            assert!(badge.give(&mut storage));
        }
        assert_eq!(badge.times_given(&storage), 50);
    }

    #[test]
    fn test_sequence_hands_out_in_order() {
        let mut storage = MemoryStorage::new();
        let seq = Reward::sequence("seq", vec![Reward::badge("first"), Reward::badge("second")]);

        assert!(seq.give(&mut storage));
        assert_eq!(storage.last_given_index("seq"), Some(0));
        assert!(storage.is_reward_given("first"));
        assert!(!storage.is_reward_given("second"));

        assert!(seq.give(&mut storage));
        assert!(storage.is_reward_given("second"));

        assert!(!seq.give(&mut storage), "sequence is exhausted");
        assert_eq!(seq.times_given(&storage), 2);
    }

    #[test]
    fn test_sequence_take_steps_back() {
        let mut storage = MemoryStorage::new();
        let seq = Reward::sequence("seq", vec![Reward::badge("first"), Reward::badge("second")]);
        seq.give(&mut storage);
        seq.give(&mut storage);

        assert!(seq.take(&mut storage));
        assert_eq!(storage.last_given_index("seq"), Some(0));
        assert!(!storage.is_reward_given("second"));

        assert!(seq.take(&mut storage));
        assert_eq!(storage.last_given_index("seq"), None);
        assert!(!seq.take(&mut storage));
    }

    #[test]
    fn test_random_single_member() {
        let mut storage = MemoryStorage::new();
        let random = Reward::random("rnd", vec![Reward::badge("only")]);

        assert!(random.give(&mut storage));
        assert!(storage.is_reward_given("only"));
        assert!(random.take(&mut storage));
        assert!(!storage.is_reward_given("only"));
    }

    #[test]
    fn test_random_empty_refuses() {
        let mut storage = MemoryStorage::new();
        assert!(!Reward::random("rnd", Vec::new()).give(&mut storage));
    }

    #[test]
    fn test_registry_duplicates() {
        let mut registry = RewardRegistry::new();
        registry.register(Reward::badge("a")).expect("first");
        let err = registry.register(Reward::badge("a")).expect_err("duplicate");
        assert!(matches!(err, LevelUpError::DuplicateKey { kind: EntityKind::Reward, .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_find_nested() {
        let mut registry = RewardRegistry::new();
        registry
            .register(Reward::sequence("seq", vec![Reward::badge("inner")]))
            .expect("register");
        assert!(registry.get("inner").is_none());
        assert!(registry.find("inner").is_some());
    }

    #[test]
    fn test_registry_keeps_order_on_remove() {
        let mut registry = RewardRegistry::new();
        for id in ["a", "b", "c"] {
            registry.register(Reward::badge(id)).expect("register");
        }
        registry.remove("a");
        let ids: Vec<_> = registry.iter().map(Reward::id).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn test_registry_json_round_trip() {
        let mut registry = RewardRegistry::new();
        registry
            .register(
                Reward::badge("b")
                    .with_name("Gold")
                    .with_schedule(Schedule::once()),
            )
            .expect("register");
        registry
            .register(Reward::random("r", vec![Reward::badge("x")]))
            .expect("register");

        let json = registry.to_json().expect("encode");
        assert_eq!(json[0]["className"], "BadgeReward");
        assert_eq!(json[0]["schedule"]["activationLimit"], 1);

        let decoded = RewardRegistry::from_json(&json).expect("decode");
        assert_eq!(decoded, registry);
    }

    #[test]
    fn test_badge_icon_url() {
        let json = json!({
            "className": "BadgeReward",
            "itemId": "b",
            "iconUrl": "badges/gold.png"
        });
        let reward = Reward::from_json(&json).expect("decode");
        assert_eq!(
            reward.kind(),
            &RewardKind::Badge {
                icon_url: Some("badges/gold.png".to_string())
            }
        );
        assert!(reward.schedule().is_unlimited());
    }

    #[test]
    fn test_unknown_reward_tag() {
        let json = json!({"className": "VirtualItemReward", "itemId": "v"});
        let err = Reward::from_json(&json).expect_err("unknown");
        assert!(err.to_string().contains("VirtualItemReward"));
    }
}
