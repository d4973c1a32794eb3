//! Progress notifications.
//!
//! State changes made through [`crate::levelup::LevelUp`] are published here.
//! The bus is a bounded queue: consumers drain it at their own pace and
//! events published while it is full are dropped.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Something that happened to the progression state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProgressEvent {
    /// World completion flag changed
    WorldCompleted {
        /// World id
        world_id: String,
        /// New flag value
        completed: bool,
    },
    /// Reward assigned to a world
    RewardAssigned {
        /// World id
        world_id: String,
        /// Reward now assigned
        reward_id: String,
    },
    /// Mission completed
    MissionCompleted {
        /// Mission id
        mission_id: String,
    },
    /// Level play started
    LevelStarted {
        /// Level id
        level_id: String,
    },
    /// Level play ended
    LevelEnded {
        /// Level id
        level_id: String,
        /// Whether the level was completed
        completed: bool,
        /// Active play time
        duration_ms: u64,
    },
    /// A world's scores were reset
    ScoresReset {
        /// World id
        world_id: String,
        /// Whether temp scores were committed first
        saved: bool,
    },
}

/// Bounded queue of [`ProgressEvent`]s.
#[derive(Debug)]
pub struct EventBus {
    sender: Sender<ProgressEvent>,
    receiver: Receiver<ProgressEvent>,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventBus {
    /// Creates a bus holding at most `capacity` undrained events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes an event. Returns false if it was dropped.
    pub fn publish(&self, event: ProgressEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                warn!("Event queue full, dropping {event:?}");
                false
            },
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Drains all pending events in publish order.
    pub fn drain(&self) -> Vec<ProgressEvent> {
        self.receiver.try_iter().collect()
    }

    /// Number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sender handle for publishing from elsewhere.
    #[must_use]
    pub fn sender(&self) -> Sender<ProgressEvent> {
        self.sender.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mission(id: &str) -> ProgressEvent {
        ProgressEvent::MissionCompleted {
            mission_id: id.to_string(),
        }
    }

    #[test]
    fn test_drain_in_order() {
        let bus = EventBus::new(8);
        assert!(bus.publish(mission("a")));
        assert!(bus.publish(mission("b")));
        assert_eq!(bus.pending_count(), 2);

        assert_eq!(bus.drain(), vec![mission("a"), mission("b")]);
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn test_full_queue_drops() {
        let bus = EventBus::new(1);
        assert!(bus.publish(mission("kept")));
        assert!(!bus.publish(mission("dropped")));
        assert_eq!(bus.drain(), vec![mission("kept")]);
    }

    #[test]
    fn test_external_sender() {
        let bus = EventBus::default();
        assert_eq!(bus.capacity(), 256);
        bus.sender()
            .send(mission("remote"))
            .expect("bus owns a receiver");
        assert_eq!(bus.drain(), vec![mission("remote")]);
    }
}
