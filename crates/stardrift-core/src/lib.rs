//! # Stardrift Core
//!
//! World streaming and entity lifecycle for an unbounded 2D space map.
//!
//! The map is tiled into fixed-size [`Cluster`]s that are generated the
//! first time anything looks at them. Only the clusters around a moving
//! focal point are simulated; everything else stays filed but frozen.
//!
//! ## Architecture
//!
//! - **Entities** ([`entity`]): ships, asteroids, blaster charges and dropped
//!   resources, built by composing capability components
//! - **Clusters** ([`cluster`], [`store`], [`generator`]): spatial cells,
//!   sparse storage and seeded procedural content
//! - **World** ([`world`]): active-set tracking, physics sync, command
//!   resolution and re-filing
//! - **Persistence** ([`persistence`]): two-pass documents and save files
//!
//! Entities never touch each other directly. They queue [`Command`]s that
//! the world applies and [`Event`]s that callers drain once per tick.
//!
//! ## Usage
//!
//! ```
//! use glam::Vec2;
//! use stardrift_core::{SaveFile, World, WorldConfig};
//!
//! let mut world = World::new(WorldConfig { seed: 7, ..WorldConfig::default() }).unwrap();
//! for step in 0..10u8 {
//!     world.update_at(Vec2::new(f32::from(step) * 50.0, 0.0), 0.1);
//! }
//!
//! let save = SaveFile::capture(&world, None).unwrap();
//! let restored = save.restore().unwrap();
//! assert_eq!(restored.store().len(), world.store().len());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cluster;
pub mod config;
pub mod directory;
pub mod effects;
pub mod entity;
pub mod error;
pub mod generator;
pub mod persistence;
pub mod render;
pub mod store;
pub mod world;

pub use cluster::{Cluster, ClusterCoord};
pub use config::{GameplayConfig, GenerationConfig, ShipConfig, WorldConfig};
pub use directory::EntityDirectory;
pub use effects::{Command, EffectQueue, Event, TickContext};
pub use entity::{Capabilities, Entity, EntityId, EntityKind, SaveStrategy, Team};
pub use error::{ConfigError, PersistError, RegistryError, UpgradeError, WorldError};
pub use generator::{AsteroidFieldGenerator, ClusterGenerator, VoidGenerator};
pub use persistence::{ClusterDocument, EntityDocument, EntityRegistry, MapDocument, SaveFile, SAVE_VERSION};
pub use render::{Camera, RecordingRenderer, Renderer};
pub use store::ClusterStore;
pub use world::{TickReport, World};

pub use stardrift_physics;

#[cfg(test)]
mod tests;
