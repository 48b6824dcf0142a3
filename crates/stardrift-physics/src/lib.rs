//! # Stardrift Physics
//!
//! A small 2D rigid-body space for the Stardrift world streamer.
//!
//! The space stores circle-shaped bodies behind opaque [`BodyHandle`]s and
//! advances them with explicit Euler integration. Contacts are found with a
//! uniform-grid broad phase and reported to a caller-supplied
//! [`CollisionHandler`] for every registered pair of [`CollisionType`]s. The
//! handler decides whether the engine should also bounce the bodies apart.
//!
//! The space knows nothing about game entities: every body carries a plain
//! `u64` user tag which the caller maps back to its own identifiers.
//!
//! ## Quick Start
//!
//! ```
//! use glam::Vec2;
//! use stardrift_physics::{BodyState, CollisionType, RigidBody, Shape, Space};
//!
//! let mut space = Space::new();
//! let ball = CollisionType::new(1);
//! space.add_collision_handler(ball, ball);
//!
//! let mut left = BodyState::at(Vec2::new(-1.0, 0.0), 1.0);
//! left.velocity = Vec2::new(10.0, 0.0);
//! let right = BodyState::at(Vec2::new(1.5, 0.0), 1.0);
//!
//! let a = space.add_body(RigidBody::new(left, Shape::circle(1.0), ball, 7));
//! let b = space.add_body(RigidBody::new(right, Shape::circle(1.0), ball, 8));
//!
//! let mut seen = Vec::new();
//! space.step(0.1, &mut |contact: &stardrift_physics::Contact| {
//!     seen.push((contact.a.user_data, contact.b.user_data));
//!     true
//! });
//!
//! assert_eq!(seen, vec![(7, 8)]);
//! assert!(space.body(a).is_some() && space.body(b).is_some());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod body;
mod broad_phase;
pub mod hash;
pub mod space;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use body::{BodyState, RigidBody, Shape};
pub use hash::hash_space;
pub use space::{
    CollisionHandler, Contact, ContactBody, Space, SpaceConfig, SpaceError, StepStats,
};

/// Opaque handle to a body registered in a [`Space`].
///
/// Handles are never reused within one space, so a stale handle simply
/// fails to resolve instead of aliasing a newer body.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyHandle(u64);

impl BodyHandle {
    /// Returns the raw handle value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BodyHandle({})", self.0)
    }
}

impl fmt::Display for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Tag used to select which contacts are reported to the collision handler.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CollisionType(u32);

impl CollisionType {
    /// The type given to bodies that never asked for contact reports.
    pub const DEFAULT: Self = Self(0);

    /// Creates a collision type from its raw value.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl Default for CollisionType {
    fn default() -> Self {
        Self::DEFAULT
    }
}
