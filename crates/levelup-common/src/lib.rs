//! # LevelUp Common
//!
//! Common types, utilities, and shared abstractions for LevelUp.
//!
//! This crate provides foundational types used by the progression crates:
//! - Entity kinds and score storage keys
//! - Id derivation for batch-generated levels
//! - Version information for the model schema
//! - Common error types
//! - Configuration
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod error;
pub mod ids;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::*;
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::version::*;
}

pub use prelude::*;
