//! Read-only view of persisted progress used to evaluate gates and missions.

use crate::storage::{MissionStorage, ScoreStorage, WorldStorage};
use crate::world::World;
use tracing::warn;

/// Questions gates and missions ask about the current progress.
pub trait ProgressQuery {
    /// Whether the world is marked completed.
    fn is_world_completed(&self, world_id: &str) -> bool;

    /// Whether the score's record reaches `desired` in the score's direction.
    fn has_record_reached(&self, score_id: &str, desired: f64) -> bool;

    /// Whether the mission was completed at least once.
    fn is_mission_completed(&self, mission_id: &str) -> bool;
}

/// Answers [`ProgressQuery`] from a world tree and its storage.
#[derive(Debug)]
pub struct Progress<'a, S: ?Sized> {
    root: &'a World,
    storage: &'a S,
}

impl<'a, S: ?Sized> Progress<'a, S> {
    /// Creates a view over `root` and everything below it.
    #[must_use]
    pub const fn new(root: &'a World, storage: &'a S) -> Self {
        Self { root, storage }
    }

    /// The world tree being queried.
    #[must_use]
    pub const fn root(&self) -> &'a World {
        self.root
    }
}

impl<S> ProgressQuery for Progress<'_, S>
where
    S: WorldStorage + ScoreStorage + MissionStorage + ?Sized,
{
    fn is_world_completed(&self, world_id: &str) -> bool {
        self.storage.is_world_completed(world_id)
    }

    fn has_record_reached(&self, score_id: &str, desired: f64) -> bool {
        match self.root.find_score(score_id) {
            Some(score) => score.has_record_reached(self.storage, desired),
            None => {
                warn!("Record check on unknown score: {score_id}");
                false
            },
        }
    }

    fn is_mission_completed(&self, mission_id: &str) -> bool {
        self.storage.is_mission_completed(mission_id)
    }
}
