//! State hashing for determinism checks.
//!
//! Two spaces that received the same bodies and the same sequence of steps
//! must hash identically.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::body::{BodyState, Shape};
use crate::Space;

/// Computes a hash over the tick and every body, in handle order.
///
/// Floats are hashed by bit pattern.
#[must_use]
pub fn hash_space(space: &Space) -> u64 {
    let mut hasher = DefaultHasher::new();
    space.tick().hash(&mut hasher);
    space.len().hash(&mut hasher);
    for (handle, body) in space.bodies() {
        handle.hash(&mut hasher);
        body.user_data.hash(&mut hasher);
        body.collision_type.hash(&mut hasher);
        hash_state(&body.state, &mut hasher);
        match body.shape {
            Shape::Circle { radius } => {
                0u8.hash(&mut hasher);
                radius.to_bits().hash(&mut hasher);
            }
        }
    }
    hasher.finish()
}

fn hash_state<H: Hasher>(state: &BodyState, hasher: &mut H) {
    for value in [
        state.position.x,
        state.position.y,
        state.velocity.x,
        state.velocity.y,
        state.angle,
        state.angular_velocity,
        state.mass,
        state.moment,
    ] {
        value.to_bits().hash(hasher);
    }
}
