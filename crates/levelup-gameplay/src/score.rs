//! Scores: named numeric progress metrics.
//!
//! A score keeps a provisional "temp" value in memory while a level is being
//! played. Saving commits the temp value as the latest value and, when it
//! improves on the record in the score's direction, as the new record. Both
//! committed values live in [`ScoreStorage`] under a key that includes the
//! owning world.

use crate::entity::{decode_tagged, encode, Entity};
use crate::storage::ScoreStorage;
use levelup_common::{EntityKind, LevelUpError, LevelUpResult, ScoreKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Inclusive bounds for a range score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRange {
    /// Lowest allowed value
    pub low: f64,
    /// Highest allowed value
    pub high: f64,
}

impl ScoreRange {
    /// Creates a range.
    #[must_use]
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Clamps a value into the range.
    #[must_use]
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.low).min(self.high)
    }
}

/// Score variant, stored under `className`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "className")]
pub enum ScoreKind {
    /// Unbounded score
    #[serde(rename = "Score")]
    Plain,
    /// Score clamped into a range
    #[serde(rename = "RangeScore")]
    Range {
        /// Allowed values
        range: ScoreRange,
    },
}

const fn default_higher_better() -> bool {
    true
}

/// A tracked numeric metric with latest and record values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    #[serde(rename = "itemId")]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    start_value: f64,
    #[serde(default = "default_higher_better")]
    higher_better: bool,
    #[serde(flatten)]
    kind: ScoreKind,
    #[serde(skip)]
    temp_score: f64,
    /// Id of the world holding this score; set when the score is added.
    #[serde(skip)]
    owner: String,
}

impl Score {
    /// Creates an unbounded score starting at 0 where higher is better.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            start_value: 0.0,
            higher_better: true,
            kind: ScoreKind::Plain,
            temp_score: 0.0,
            owner: String::new(),
        }
    }

    /// Creates a range score. It starts at the worst end of the range.
    #[must_use]
    pub fn range(id: impl Into<String>, range: ScoreRange, higher_better: bool) -> Self {
        let start_value = if higher_better { range.low } else { range.high };
        Self {
            id: id.into(),
            name: String::new(),
            start_value,
            higher_better,
            kind: ScoreKind::Range { range },
            temp_score: start_value,
            owner: String::new(),
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the start value; the temp score moves with it.
    #[must_use]
    pub fn with_start_value(mut self, start_value: f64) -> Self {
        self.start_value = self.clamp(start_value);
        self.temp_score = self.start_value;
        self
    }

    /// Makes lower values count as better (e.g. completion time).
    #[must_use]
    pub const fn lower_is_better(mut self) -> Self {
        self.higher_better = false;
        self
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value the score resets to.
    #[must_use]
    pub const fn start_value(&self) -> f64 {
        self.start_value
    }

    /// Whether higher values are better.
    #[must_use]
    pub const fn higher_better(&self) -> bool {
        self.higher_better
    }

    /// Score variant.
    #[must_use]
    pub const fn kind(&self) -> ScoreKind {
        self.kind
    }

    /// Bounds, for range scores.
    #[must_use]
    pub const fn range_bounds(&self) -> Option<ScoreRange> {
        match self.kind {
            ScoreKind::Plain => None,
            ScoreKind::Range { range } => Some(range),
        }
    }

    /// Provisional, uncommitted value.
    #[must_use]
    pub const fn temp_score(&self) -> f64 {
        self.temp_score
    }

    /// Id of the owning world, empty until the score is added to one.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub(crate) fn set_owner(&mut self, world_id: &str) {
        world_id.clone_into(&mut self.owner);
    }

    /// Storage key for this score's committed values.
    #[must_use]
    pub fn key(&self) -> ScoreKey {
        ScoreKey::new(&self.owner, self.type_tag(), &self.id)
    }

    fn clamp(&self, value: f64) -> f64 {
        match self.kind {
            ScoreKind::Plain => value,
            ScoreKind::Range { range } => range.clamp(value),
        }
    }

    /// Whether `a` is at least as good as `b` in this score's direction.
    fn reaches(&self, a: f64, b: f64) -> bool {
        if self.higher_better {
            a >= b
        } else {
            a <= b
        }
    }

    /// Adds to the temp score.
    pub fn inc(&mut self, amount: f64) {
        self.set_temp_score(self.temp_score + amount, false);
    }

    /// Subtracts from the temp score.
    pub fn dec(&mut self, amount: f64) {
        self.set_temp_score(self.temp_score - amount, false);
    }

    /// Sets the temp score. With `only_if_better`, values that do not reach
    /// the current temp score are ignored.
    pub fn set_temp_score(&mut self, value: f64, only_if_better: bool) {
        let value = self.clamp(value);
        if only_if_better && !self.reaches(value, self.temp_score) {
            return;
        }
        self.temp_score = value;
    }

    /// Whether the temp score reaches `value`.
    #[must_use]
    pub fn has_temp_reached(&self, value: f64) -> bool {
        self.reaches(self.temp_score, value)
    }

    /// Whether the committed record reaches `value`. False when nothing was
    /// ever committed.
    pub fn has_record_reached<S: ScoreStorage + ?Sized>(&self, storage: &S, value: f64) -> bool {
        self.record(storage)
            .is_some_and(|record| self.reaches(record, value))
    }

    /// Last committed value.
    pub fn latest<S: ScoreStorage + ?Sized>(&self, storage: &S) -> Option<f64> {
        storage.latest_score(&self.key())
    }

    /// Best committed value.
    pub fn record<S: ScoreStorage + ?Sized>(&self, storage: &S) -> Option<f64> {
        storage.record_score(&self.key())
    }

    /// Commits the temp score as latest, and as record when it improves on it.
    pub fn save<S: ScoreStorage + ?Sized>(&self, storage: &mut S) {
        let key = self.key();
        let improves = storage
            .record_score(&key)
            .map_or(true, |record| self.reaches(self.temp_score, record));
        if improves {
            debug!("New record for score {}: {}", self.id, self.temp_score);
            storage.set_record_score(&key, self.temp_score);
        }
        storage.set_latest_score(&key, self.temp_score);
    }

    /// Returns the temp score to the start value, saving it first if asked.
    pub fn reset<S: ScoreStorage + ?Sized>(&mut self, save: bool, storage: &mut S) {
        if save {
            self.save(storage);
        }
        self.temp_score = self.start_value;
    }

    /// Independent copy under a new id, with the temp score at its start value.
    #[must_use]
    pub fn clone_with_id(&self, new_id: impl Into<String>) -> Self {
        Self {
            id: new_id.into(),
            temp_score: self.start_value,
            ..self.clone()
        }
    }
}

impl Entity for Score {
    const KIND: EntityKind = EntityKind::Score;
    const TYPE_TAGS: &'static [&'static str] = &["Score", "RangeScore"];

    fn id(&self) -> &str {
        &self.id
    }

    fn type_tag(&self) -> &'static str {
        match self.kind {
            ScoreKind::Plain => "Score",
            ScoreKind::Range { .. } => "RangeScore",
        }
    }

    fn to_json(&self) -> LevelUpResult<Value> {
        encode(self)
    }

    fn from_json(value: &Value) -> LevelUpResult<Self> {
        let mut score: Self = decode_tagged(value)?;
        if let Some(range) = score.range_bounds() {
            if range.low > range.high {
                return Err(LevelUpError::Deserialization(format!(
                    "score {} has an inverted range {}..{}",
                    score.id, range.low, range.high
                )));
            }
        }
        score.temp_score = score.start_value;
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use serde_json::json;

    #[test]
    fn test_inc_dec() {
        let mut score = Score::new("coins");
        score.inc(5.0);
        score.dec(2.0);
        assert_eq!(score.temp_score(), 3.0);
    }

    #[test]
    fn test_range_clamps() {
        let mut score = Score::range("stars", ScoreRange::new(0.0, 3.0), true);
        score.inc(10.0);
        assert_eq!(score.temp_score(), 3.0);
        score.dec(7.0);
        assert_eq!(score.temp_score(), 0.0);
    }

    #[test]
    fn test_range_start_value_depends_on_direction() {
        let range = ScoreRange::new(10.0, 60.0);
        assert_eq!(Score::range("a", range, true).temp_score(), 10.0);
        assert_eq!(Score::range("b", range, false).temp_score(), 60.0);
    }

    #[test]
    fn test_set_temp_only_if_better() {
        let mut score = Score::new("pts");
        score.set_temp_score(10.0, true);
        score.set_temp_score(4.0, true);
        assert_eq!(score.temp_score(), 10.0);

        score.set_temp_score(4.0, false);
        assert_eq!(score.temp_score(), 4.0);
    }

    #[test]
    fn test_set_temp_only_if_better_lower_is_better() {
        let mut score = Score::new("time").with_start_value(100.0).lower_is_better();
        score.set_temp_score(120.0, true);
        assert_eq!(score.temp_score(), 100.0);
        score.set_temp_score(80.0, true);
        assert_eq!(score.temp_score(), 80.0);
    }

    #[test]
    fn test_save_keeps_best_record() {
        let mut storage = MemoryStorage::new();
        let mut score = Score::new("pts");

        score.set_temp_score(7.0, false);
        score.save(&mut storage);
        score.set_temp_score(3.0, false);
        score.save(&mut storage);

        assert_eq!(score.latest(&storage), Some(3.0));
        assert_eq!(score.record(&storage), Some(7.0));
        assert!(score.has_record_reached(&storage, 7.0));
        assert!(!score.has_record_reached(&storage, 7.5));
    }

    #[test]
    fn test_save_lower_is_better_record() {
        let mut storage = MemoryStorage::new();
        let mut score = Score::new("time").with_start_value(999.0).lower_is_better();

        score.set_temp_score(50.0, false);
        score.save(&mut storage);
        score.set_temp_score(70.0, false);
        score.save(&mut storage);

        assert_eq!(score.record(&storage), Some(50.0));
        assert!(score.has_record_reached(&storage, 60.0));
    }

    #[test]
    fn test_no_record_before_commit() {
        let storage = MemoryStorage::new();
        let score = Score::new("pts");
        assert_eq!(score.record(&storage), None);
        assert!(!score.has_record_reached(&storage, 0.0));
    }

    #[test]
    fn test_reset_with_and_without_save() {
        let mut storage = MemoryStorage::new();
        let mut score = Score::new("pts").with_start_value(1.0);

        score.inc(4.0);
        score.reset(false, &mut storage);
        assert_eq!(score.temp_score(), 1.0);
        assert_eq!(score.latest(&storage), None);

        score.inc(4.0);
        score.reset(true, &mut storage);
        assert_eq!(score.temp_score(), 1.0);
        assert_eq!(score.latest(&storage), Some(5.0));
        assert_eq!(score.record(&storage), Some(5.0));
    }

    #[test]
    fn test_key_follows_owner() {
        let mut storage = MemoryStorage::new();
        let mut a = Score::new("stars");
        let mut b = Score::new("stars");
        a.set_owner("a");
        b.set_owner("b");
        assert_eq!(a.key().as_str(), "a/Score:stars");

        a.set_temp_score(3.0, false);
        a.save(&mut storage);
        b.set_temp_score(7.5, false);
        b.save(&mut storage);

        assert_eq!(a.record(&storage), Some(3.0));
        assert_eq!(b.record(&storage), Some(7.5));
    }

    #[test]
    fn test_clone_with_id_is_independent() {
        let mut template = Score::new("tpl").with_name("Points");
        template.inc(9.0);

        let mut copy = template.clone_with_id("lvl_score0");
        assert_eq!(copy.id(), "lvl_score0");
        assert_eq!(copy.name(), "Points");
        assert_eq!(copy.temp_score(), 0.0);

        copy.inc(1.0);
        assert_eq!(template.temp_score(), 9.0);
    }

    #[test]
    fn test_json_shape() {
        let score = Score::range("stars", ScoreRange::new(0.0, 3.0), true).with_name("Stars");
        let json = score.to_json().expect("encode");
        assert_eq!(json["className"], "RangeScore");
        assert_eq!(json["itemId"], "stars");
        assert_eq!(json["range"]["high"], 3.0);
        assert_eq!(json["higherBetter"], true);
    }

    #[test]
    fn test_from_json_restores_temp_to_start() {
        let json = json!({
            "className": "Score",
            "itemId": "pts",
            "startValue": 2.0,
            "higherBetter": false
        });
        let score = Score::from_json(&json).expect("decode");
        assert_eq!(score.temp_score(), 2.0);
        assert!(!score.higher_better());
        assert_eq!(score.kind(), ScoreKind::Plain);
    }

    #[test]
    fn test_from_json_unknown_tag() {
        let json = json!({"className": "VirtualItemScore", "itemId": "gems"});
        let err = Score::from_json(&json).expect_err("unknown tag");
        assert!(matches!(
            err,
            LevelUpError::UnknownType { kind: EntityKind::Score, ref tag } if tag == "VirtualItemScore"
        ));
    }

    #[test]
    fn test_from_json_inverted_range() {
        let json = json!({
            "className": "RangeScore",
            "itemId": "bad",
            "range": {"low": 5.0, "high": 1.0}
        });
        assert!(Score::from_json(&json).is_err());
    }

    #[test]
    fn test_key_uses_type_tag() {
        assert_eq!(Score::new("a").key().as_str(), "Score:a");
    }
}
