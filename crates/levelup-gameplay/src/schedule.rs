//! Activation schedules for rewards and missions.

use serde::{Deserialize, Serialize};

/// Limits how many times a reward or mission may activate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    /// Maximum activations; 0 means unlimited
    pub activation_limit: u32,
}

impl Schedule {
    /// A schedule that never refuses.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            activation_limit: 0,
        }
    }

    /// A schedule that approves a single activation.
    #[must_use]
    pub const fn once() -> Self {
        Self::with_limit(1)
    }

    /// A schedule approving up to `limit` activations.
    #[must_use]
    pub const fn with_limit(limit: u32) -> Self {
        Self {
            activation_limit: limit,
        }
    }

    /// Returns whether the schedule is unlimited.
    #[must_use]
    pub const fn is_unlimited(&self) -> bool {
        self.activation_limit == 0
    }

    /// Returns whether another activation is allowed after `times_activated`.
    #[must_use]
    pub const fn approve(&self, times_activated: u32) -> bool {
        self.is_unlimited() || times_activated < self.activation_limit
    }
}
