//! The simulation space: body registry, stepping and spatial queries.
//!
//! # Step Order
//!
//! [`Space::step`] runs three phases:
//!
//! 1. Integrate every body: damping, then `position += velocity * dt` and
//!    `angle += angular_velocity * dt`.
//! 2. Find overlapping circles (grid broad phase, exact narrow phase).
//! 3. For each contact, in ascending handle order: if the pair of collision
//!    types was registered with [`Space::add_collision_handler`], ask the
//!    handler. The contact is resolved (impulse plus positional correction)
//!    unless the handler returned `false`. Unregistered pairs always resolve.

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use crate::body::{BodyState, RigidBody};
use crate::broad_phase::BroadPhase;
use crate::{BodyHandle, CollisionType};

// =============================================================================
// Configuration and Errors
// =============================================================================

/// Errors reported by the space.
#[derive(Debug, Error, PartialEq)]
pub enum SpaceError {
    /// A configuration value is out of range.
    #[error("invalid space configuration: {0}")]
    InvalidConfig(&'static str),
    /// The handle does not name a body in this space.
    #[error("unknown body {0}")]
    UnknownBody(BodyHandle),
}

/// Tunables for a [`Space`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpaceConfig {
    /// Fraction of linear and angular velocity retained after one second.
    pub damping: f32,
    /// Edge length of the broad-phase grid cells.
    pub broad_phase_cell: f32,
    /// Coefficient of restitution for resolved contacts (1.0 is perfectly elastic).
    pub restitution: f32,
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self {
            damping: 1.0,
            broad_phase_cell: 64.0,
            restitution: 1.0,
        }
    }
}

impl SpaceConfig {
    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`SpaceError::InvalidConfig`] naming the first bad value.
    pub fn validate(&self) -> Result<(), SpaceError> {
        if !(0.0..=1.0).contains(&self.damping) {
            return Err(SpaceError::InvalidConfig("damping must be within 0..=1"));
        }
        if !(self.broad_phase_cell > 0.0 && self.broad_phase_cell.is_finite()) {
            return Err(SpaceError::InvalidConfig("broad_phase_cell must be positive"));
        }
        if !(0.0..=1.0).contains(&self.restitution) {
            return Err(SpaceError::InvalidConfig("restitution must be within 0..=1"));
        }
        Ok(())
    }
}

// =============================================================================
// Contacts
// =============================================================================

/// Snapshot of one side of a contact, taken after integration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactBody {
    /// Handle of the body.
    pub handle: BodyHandle,
    /// Caller tag of the body.
    pub user_data: u64,
    /// Collision type of the body.
    pub collision_type: CollisionType,
    /// Position at contact time.
    pub position: Vec2,
    /// Velocity at contact time, before resolution.
    pub velocity: Vec2,
    /// Mass of the body.
    pub mass: f32,
}

/// An overlap between two bodies.
///
/// `a` always has the lower handle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Lower-handle side.
    pub a: ContactBody,
    /// Higher-handle side.
    pub b: ContactBody,
    /// Unit normal pointing from `a` to `b`.
    pub normal: Vec2,
    /// Penetration depth.
    pub depth: f32,
}

/// Receives contacts between bodies of registered collision-type pairs.
pub trait CollisionHandler {
    /// Called once per contact during [`Space::step`].
    ///
    /// Return `true` to let the space bounce the bodies apart as well.
    fn begin(&mut self, contact: &Contact) -> bool;
}

impl<F> CollisionHandler for F
where
    F: FnMut(&Contact) -> bool,
{
    fn begin(&mut self, contact: &Contact) -> bool {
        self(contact)
    }
}

/// Counters describing one [`Space::step`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepStats {
    /// Bodies integrated.
    pub integrated: usize,
    /// Overlapping pairs found.
    pub contacts: usize,
    /// Contacts handed to the collision handler.
    pub dispatched: usize,
    /// Contacts resolved by the space.
    pub resolved: usize,
}

// =============================================================================
// Space
// =============================================================================

/// A 2D rigid-body simulation space.
///
/// Bodies live in a `BTreeMap` keyed by handle so that integration, contact
/// dispatch and queries visit them in a stable order.
#[derive(Debug, Clone, Default)]
pub struct Space {
    config: SpaceConfig,
    bodies: BTreeMap<BodyHandle, RigidBody>,
    next_handle: u64,
    handlers: BTreeSet<(CollisionType, CollisionType)>,
    tick: u64,
}

fn type_pair(a: CollisionType, b: CollisionType) -> (CollisionType, CollisionType) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl Space {
    /// Creates an empty space with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty space with a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SpaceError::InvalidConfig`] if `config` fails validation.
    pub fn with_config(config: SpaceConfig) -> Result<Self, SpaceError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &SpaceConfig {
        &self.config
    }

    /// Number of completed steps.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Registers a body and returns its handle.
    pub fn add_body(&mut self, body: RigidBody) -> BodyHandle {
        let handle = BodyHandle(self.next_handle);
        self.next_handle += 1;
        trace!(handle = handle.as_u64(), user_data = body.user_data, "body added");
        self.bodies.insert(handle, body);
        handle
    }

    /// Unregisters a body, returning it if it was present.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Option<RigidBody> {
        let removed = self.bodies.remove(&handle);
        if removed.is_some() {
            trace!(handle = handle.as_u64(), "body removed");
        }
        removed
    }

    /// Returns true if `handle` names a registered body.
    #[must_use]
    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.bodies.contains_key(&handle)
    }

    /// Looks up a body.
    #[must_use]
    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(&handle)
    }

    /// Looks up a body mutably.
    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(&handle)
    }

    /// Returns the kinematic state of a body.
    ///
    /// # Errors
    ///
    /// Returns [`SpaceError::UnknownBody`] if the handle is not registered.
    pub fn state(&self, handle: BodyHandle) -> Result<BodyState, SpaceError> {
        self.bodies
            .get(&handle)
            .map(|body| body.state)
            .ok_or(SpaceError::UnknownBody(handle))
    }

    /// Overwrites the kinematic state of a body.
    ///
    /// # Errors
    ///
    /// Returns [`SpaceError::UnknownBody`] if the handle is not registered.
    pub fn set_state(&mut self, handle: BodyHandle, state: BodyState) -> Result<(), SpaceError> {
        let body = self
            .bodies
            .get_mut(&handle)
            .ok_or(SpaceError::UnknownBody(handle))?;
        body.state = state;
        Ok(())
    }

    /// Number of registered bodies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Returns true if no bodies are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Handles of all bodies, ascending.
    pub fn handles(&self) -> impl Iterator<Item = BodyHandle> + '_ {
        self.bodies.keys().copied()
    }

    /// Iterates bodies in handle order.
    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &RigidBody)> {
        self.bodies.iter().map(|(handle, body)| (*handle, body))
    }

    /// Reports contacts between bodies of types `a` and `b` to the handler
    /// passed to [`Space::step`]. Order of the two types does not matter.
    pub fn add_collision_handler(&mut self, a: CollisionType, b: CollisionType) {
        self.handlers.insert(type_pair(a, b));
    }

    /// Returns true if contacts between `a` and `b` are reported.
    #[must_use]
    pub fn has_collision_handler(&self, a: CollisionType, b: CollisionType) -> bool {
        self.handlers.contains(&type_pair(a, b))
    }

    /// Advances the simulation by `dt` seconds.
    pub fn step(&mut self, dt: f32, handler: &mut dyn CollisionHandler) -> StepStats {
        let mut stats = StepStats {
            integrated: self.integrate(dt),
            ..StepStats::default()
        };

        for contact in self.find_contacts() {
            stats.contacts += 1;
            let registered =
                self.has_collision_handler(contact.a.collision_type, contact.b.collision_type);
            let resolve = if registered {
                stats.dispatched += 1;
                handler.begin(&contact)
            } else {
                true
            };
            if resolve && self.resolve_contact(&contact) {
                stats.resolved += 1;
            }
        }

        self.tick += 1;
        trace!(
            tick = self.tick,
            bodies = self.bodies.len(),
            contacts = stats.contacts,
            dispatched = stats.dispatched,
            "space stepped"
        );
        stats
    }

    fn integrate(&mut self, dt: f32) -> usize {
        let retain = self.config.damping.powf(dt);
        for body in self.bodies.values_mut() {
            let state = &mut body.state;
            state.velocity *= retain;
            state.angular_velocity *= retain;
            state.position += state.velocity * dt;
            state.angle += state.angular_velocity * dt;
        }
        self.bodies.len()
    }

    fn contact_body(handle: BodyHandle, body: &RigidBody) -> ContactBody {
        ContactBody {
            handle,
            user_data: body.user_data,
            collision_type: body.collision_type,
            position: body.state.position,
            velocity: body.state.velocity,
            mass: body.state.mass,
        }
    }

    fn find_contacts(&self) -> Vec<Contact> {
        let mut grid = BroadPhase::new(self.config.broad_phase_cell);
        for (handle, body) in &self.bodies {
            grid.insert(*handle, body.state.position, body.shape.bounding_radius());
        }

        let mut contacts = Vec::new();
        for (ha, hb) in grid.pairs() {
            let (Some(a), Some(b)) = (self.bodies.get(&ha), self.bodies.get(&hb)) else {
                continue;
            };
            let offset = b.state.position - a.state.position;
            let distance = offset.length();
            let reach = a.shape.bounding_radius() + b.shape.bounding_radius();
            if distance >= reach {
                continue;
            }
            let normal = if distance > f32::EPSILON {
                offset / distance
            } else {
                Vec2::X
            };
            contacts.push(Contact {
                a: Self::contact_body(ha, a),
                b: Self::contact_body(hb, b),
                normal,
                depth: reach - distance,
            });
        }
        contacts
    }

    /// Applies an impulse along the contact normal and pushes the bodies apart.
    ///
    /// Returns false if either body vanished or both are immovable.
    fn resolve_contact(&mut self, contact: &Contact) -> bool {
        let (Some(a), Some(b)) = (
            self.bodies.get(&contact.a.handle).map(|body| body.state),
            self.bodies.get(&contact.b.handle).map(|body| body.state),
        ) else {
            return false;
        };
        let inv_a = a.inverse_mass();
        let inv_b = b.inverse_mass();
        let inv_sum = inv_a + inv_b;
        if inv_sum <= 0.0 {
            return false;
        }

        let normal = contact.normal;
        let approach = (b.velocity - a.velocity).dot(normal);
        let impulse = if approach < 0.0 {
            -(1.0 + self.config.restitution) * approach / inv_sum
        } else {
            0.0
        };
        let correction = normal * (contact.depth / inv_sum);

        if let Some(body) = self.bodies.get_mut(&contact.a.handle) {
            body.state.velocity -= normal * impulse * inv_a;
            body.state.position -= correction * inv_a;
        }
        if let Some(body) = self.bodies.get_mut(&contact.b.handle) {
            body.state.velocity += normal * impulse * inv_b;
            body.state.position += correction * inv_b;
        }
        true
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Bodies whose shape lies within `radius` of `center`, sorted by handle.
    ///
    /// Distance is measured to the shape surface, so a large body whose
    /// centre is outside the radius is still reported when it reaches inside.
    #[must_use]
    pub fn query_radius(&self, center: Vec2, radius: f32) -> Vec<(BodyHandle, u64)> {
        self.bodies
            .iter()
            .filter(|(_, body)| body.shape.surface_distance(body.state.position, center) <= radius)
            .map(|(handle, body)| (*handle, body.user_data))
            .collect()
    }

    /// The body whose surface is closest to `point`, if within `max_distance`.
    ///
    /// A point inside a shape has distance zero; ties go to the lower handle.
    /// With `max_distance == 0.0` this is a point-containment query.
    #[must_use]
    pub fn nearest(&self, point: Vec2, max_distance: f32) -> Option<(BodyHandle, u64)> {
        let mut best: Option<(f32, BodyHandle, u64)> = None;
        for (handle, body) in &self.bodies {
            let distance = body.shape.surface_distance(body.state.position, point).max(0.0);
            if distance > max_distance {
                continue;
            }
            if best.map_or(true, |(current, _, _)| distance < current) {
                best = Some((distance, *handle, body.user_data));
            }
        }
        best.map(|(_, handle, user_data)| (handle, user_data))
    }
}
