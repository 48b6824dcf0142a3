//! Rigid bodies and their collision shapes.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::CollisionType;

/// Kinematic and inertial state of a rigid body.
///
/// This is the part of a body that entities persist: the field names double
/// as the keys of the `body` object in saved documents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyState {
    /// World-space position of the centre of mass.
    pub position: Vec2,
    /// Linear velocity in units per second.
    pub velocity: Vec2,
    /// Orientation in radians.
    pub angle: f32,
    /// Angular velocity in radians per second.
    pub angular_velocity: f32,
    /// Mass. Zero or non-finite mass makes the body immovable by contacts.
    pub mass: f32,
    /// Moment of inertia.
    pub moment: f32,
}

impl Default for BodyState {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            angle: 0.0,
            angular_velocity: 0.0,
            mass: 1.0,
            moment: 1.0,
        }
    }
}

impl BodyState {
    /// Creates a body at rest at `position` with the given mass and a unit moment.
    #[must_use]
    pub fn at(position: Vec2, mass: f32) -> Self {
        Self {
            position,
            mass,
            ..Self::default()
        }
    }

    /// Moment of inertia of a solid disc, as used for circle bodies.
    #[must_use]
    pub fn disc_moment(mass: f32, radius: f32) -> f32 {
        0.5 * mass * radius * radius
    }

    /// Inverse mass; zero for immovable bodies.
    #[must_use]
    pub fn inverse_mass(&self) -> f32 {
        if self.mass > 0.0 && self.mass.is_finite() {
            1.0 / self.mass
        } else {
            0.0
        }
    }

    /// Unit vector pointing along the body's heading.
    #[must_use]
    pub fn heading(&self) -> Vec2 {
        Vec2::from_angle(self.angle)
    }

    /// Speed (length of the velocity vector).
    #[must_use]
    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    /// Applies an instantaneous impulse through the centre of mass.
    pub fn apply_impulse(&mut self, impulse: Vec2) {
        self.velocity += impulse * self.inverse_mass();
    }

    /// Applies a constant force for `dt` seconds.
    pub fn apply_force(&mut self, force: Vec2, dt: f32) {
        self.apply_impulse(force * dt);
    }
}

/// Collision geometry attached to a body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    /// A circle centred on the body's position.
    Circle {
        /// Radius of the circle.
        radius: f32,
    },
}

impl Shape {
    /// Shorthand for a circle shape.
    #[must_use]
    pub const fn circle(radius: f32) -> Self {
        Self::Circle { radius }
    }

    /// Radius of the smallest circle around the body centre enclosing the shape.
    #[must_use]
    pub fn bounding_radius(&self) -> f32 {
        match *self {
            Self::Circle { radius } => radius,
        }
    }

    /// Distance from `point` to the shape surface for a body at `centre`.
    ///
    /// Negative when the point lies inside the shape.
    #[must_use]
    pub fn surface_distance(&self, centre: Vec2, point: Vec2) -> f32 {
        match *self {
            Self::Circle { radius } => centre.distance(point) - radius,
        }
    }
}

/// A body as stored in the [`Space`](crate::Space).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigidBody {
    /// Kinematic state.
    pub state: BodyState,
    /// Collision geometry.
    pub shape: Shape,
    /// Tag selecting which contacts are reported for this body.
    pub collision_type: CollisionType,
    /// Caller-defined tag, typically an entity id.
    pub user_data: u64,
}

impl RigidBody {
    /// Creates a rigid body.
    #[must_use]
    pub fn new(state: BodyState, shape: Shape, collision_type: CollisionType, user_data: u64) -> Self {
        Self {
            state,
            shape,
            collision_type,
            user_data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod body_state_tests {
        use super::*;

        #[test]
        fn default_is_at_rest_with_unit_mass() {
            let state = BodyState::default();
            assert_eq!(state.position, Vec2::ZERO);
            assert_eq!(state.velocity, Vec2::ZERO);
            assert!((state.mass - 1.0).abs() < f32::EPSILON);
        }

        #[test]
        fn impulse_scales_with_inverse_mass() {
            let mut state = BodyState::at(Vec2::ZERO, 4.0);
            state.apply_impulse(Vec2::new(8.0, 0.0));
            assert!((state.velocity.x - 2.0).abs() < 1e-6);
        }

        #[test]
        fn massless_body_ignores_impulses() {
            let mut state = BodyState::at(Vec2::ZERO, 0.0);
            state.apply_impulse(Vec2::new(8.0, 0.0));
            assert_eq!(state.velocity, Vec2::ZERO);
        }

        #[test]
        fn heading_follows_angle() {
            let state = BodyState {
                angle: std::f32::consts::FRAC_PI_2,
                ..BodyState::default()
            };
            assert!(state.heading().x.abs() < 1e-6);
            assert!((state.heading().y - 1.0).abs() < 1e-6);
        }

        #[test]
        fn serializes_with_document_field_names() {
            let json = serde_json::to_value(BodyState::default()).unwrap();
            for key in ["position", "velocity", "angle", "angular_velocity", "mass", "moment"] {
                assert!(json.get(key).is_some(), "missing {key}");
            }
        }
    }

    mod shape_tests {
        use super::*;

        #[test]
        fn circle_surface_distance() {
            let shape = Shape::circle(2.0);
            assert!((shape.surface_distance(Vec2::ZERO, Vec2::new(5.0, 0.0)) - 3.0).abs() < 1e-6);
            assert!(shape.surface_distance(Vec2::ZERO, Vec2::new(1.0, 0.0)) < 0.0);
        }
    }
}
