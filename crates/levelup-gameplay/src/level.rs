//! Level play sessions.
//!
//! A [`LevelRun`] tracks one attempt at a level. Time is supplied by the
//! caller in milliseconds of game time, so runs are deterministic and can be
//! driven from any clock.

use serde::{Deserialize, Serialize};

/// Where a run is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LevelState {
    /// Not started yet.
    #[default]
    Idle,
    /// Being played.
    Running,
    /// Started, clock stopped.
    Paused,
    /// Finished without completing.
    Ended,
    /// Finished and completed.
    Completed,
}

impl LevelState {
    /// Running or paused.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }

    /// Ended or completed.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(self, Self::Ended | Self::Completed)
    }
}

/// One attempt at playing a level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelRun {
    level_id: String,
    state: LevelState,
    started_at_ms: u64,
    /// When the current pause began.
    paused_at_ms: Option<u64>,
    /// Paused time from completed pauses.
    paused_total_ms: u64,
    ended_at_ms: Option<u64>,
}

impl LevelRun {
    /// Creates an idle run for `level_id`.
    #[must_use]
    pub fn new(level_id: impl Into<String>) -> Self {
        Self {
            level_id: level_id.into(),
            state: LevelState::Idle,
            started_at_ms: 0,
            paused_at_ms: None,
            paused_total_ms: 0,
            ended_at_ms: None,
        }
    }

    /// Level being played.
    #[must_use]
    pub fn level_id(&self) -> &str {
        &self.level_id
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> LevelState {
        self.state
    }

    /// Starts the clock. Only from idle.
    pub fn start(&mut self, now_ms: u64) -> bool {
        if self.state != LevelState::Idle {
            return false;
        }
        self.state = LevelState::Running;
        self.started_at_ms = now_ms;
        true
    }

    /// Stops the clock. Only while running.
    pub fn pause(&mut self, now_ms: u64) -> bool {
        if self.state != LevelState::Running {
            return false;
        }
        self.state = LevelState::Paused;
        self.paused_at_ms = Some(now_ms);
        true
    }

    /// Restarts the clock. Only while paused.
    pub fn resume(&mut self, now_ms: u64) -> bool {
        if self.state != LevelState::Paused {
            return false;
        }
        if let Some(paused_at) = self.paused_at_ms.take() {
            self.paused_total_ms = self
                .paused_total_ms
                .saturating_add(now_ms.saturating_sub(paused_at));
        }
        self.state = LevelState::Running;
        true
    }

    /// Ends the run. Only while running or paused.
    pub fn finish(&mut self, completed: bool, now_ms: u64) -> bool {
        if !self.state.is_active() {
            return false;
        }
        if self.state == LevelState::Paused {
            self.resume(now_ms);
        }
        self.ended_at_ms = Some(now_ms);
        self.state = if completed {
            LevelState::Completed
        } else {
            LevelState::Ended
        };
        true
    }

    /// Active play time up to `now_ms`, or up to the end for finished runs.
    /// Paused time is excluded.
    #[must_use]
    pub fn play_duration_ms(&self, now_ms: u64) -> u64 {
        if self.state == LevelState::Idle {
            return 0;
        }
        let until = self
            .ended_at_ms
            .or(self.paused_at_ms)
            .unwrap_or(now_ms);
        until
            .saturating_sub(self.started_at_ms)
            .saturating_sub(self.paused_total_ms)
    }
}
