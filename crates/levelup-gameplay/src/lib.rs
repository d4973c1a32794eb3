//! # LevelUp Gameplay
//!
//! Hierarchical game progression.
//!
//! This crate provides the progression model and everything that acts on it:
//! - Worlds and levels arranged as a tree, with batch level generation
//! - Scores (plain and ranged) with temp values, latest values, and records
//! - Gates that lock worlds behind completion, records, or missions
//! - Missions and rewards (badges, sequences, random picks) with schedules
//! - A storage interface with in-memory and key-value implementations
//! - Tagged JSON serialization of the whole model
//! - Level play sessions and a progress event bus

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod entity;
pub mod events;
pub mod gate;
pub mod kv_storage;
pub mod level;
pub mod levelup;
pub mod mission;
pub mod progress;
pub mod reward;
pub mod schedule;
pub mod score;
pub mod storage;
pub mod world;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::entity::*;
    pub use crate::events::*;
    pub use crate::gate::*;
    pub use crate::kv_storage::*;
    pub use crate::level::*;
    pub use crate::levelup::*;
    pub use crate::mission::*;
    pub use crate::progress::*;
    pub use crate::reward::*;
    pub use crate::schedule::*;
    pub use crate::score::*;
    pub use crate::storage::*;
    pub use crate::world::*;
}

pub use prelude::*;
