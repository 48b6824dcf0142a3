//! Entities: identity, physical body, lifecycle and domain behaviour.
//!
//! This module provides:
//! - [`EntityId`]: process-unique identifier handed out by the
//!   [`EntityDirectory`]
//! - [`EntityKind`]: the variant tag, doubling as the persisted `class_name`
//! - [`EntityInner`]: type-safe storage for the variant's components
//! - [`Entity`]: the complete entity container
//!
//! # Lifecycle
//!
//! An entity is *active* from the moment it is filed into a cluster until
//! its own logic decides it should disappear (destroyed, collected, expired).
//! Deactivation removes it from the directory at once; the world then pops
//! it out of its cluster and the physics space at the end of the tick.
//!
//! Separately, an entity is *alive* while its domain state says so (health
//! above zero, countdown running). Dead entities stay filed until they
//! deactivate but are never simulated.
//!
//! # Physics Registration
//!
//! The entity owns its [`BodyState`]. While registered, the space holds a
//! copy behind a [`BodyHandle`]; [`Entity::add_to_space`] and
//! [`Entity::remove_from_space`] are idempotent.
//!
//! # Example
//!
//! ```
//! use glam::Vec2;
//! use stardrift_core::config::WorldConfig;
//! use stardrift_core::entity::{Capabilities, Entity, EntityId, EntityKind, Team};
//! use stardrift_physics::Space;
//!
//! let config = WorldConfig::default();
//! let mut ship = Entity::ship(EntityId::new(1), Vec2::ZERO, &config.ship, Capabilities::all(), Team::Player);
//! let mut space = Space::new();
//!
//! assert!(ship.add_to_space(&mut space));
//! assert!(!ship.add_to_space(&mut space));
//! assert_eq!(space.len(), 1);
//! assert!(ship.remove_from_space(&mut space));
//! assert!(!ship.remove_from_space(&mut space));
//! assert_eq!(ship.kind(), EntityKind::Ship);
//! ```

pub mod capabilities;
pub mod components;
pub mod gadgets;

use std::f32::consts::PI;
use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use stardrift_physics::{BodyHandle, BodyState, CollisionType, RigidBody, Shape, Space};

use crate::cluster::ClusterCoord;
use crate::config::{ChargeConfig, GameplayConfig, GenerationConfig, ShipConfig};
use crate::directory::EntityDirectory;
use crate::effects::{Command, EffectQueue, Event, TickContext};

pub use capabilities::{
    AsteroidLife, Capabilities, Cargo, HealthTrack, Lifetime, Resource, ResourceKind, Team,
};
pub use components::{
    AsteroidComponents, ChargeComponents, PickupComponents, ShipComponents, ShipControls,
};
pub use gadgets::{Drill, Engine, UpgradeKind, UpgradeTrack, Weapon};

/// Collision type shared by every entity body.
pub const ENTITY_COLLISION: CollisionType = CollisionType::new(1);

// =============================================================================
// Identity
// =============================================================================

/// Unique identifier for an entity.
///
/// Ids are ordered by value, which gives clusters a deterministic iteration
/// order. They are never recycled within a world and are preserved verbatim
/// across save and load, so cross-references stay valid.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates an id from its raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

/// How an entity is persisted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SaveStrategy {
    /// Written as an independent document.
    Entity,
    /// Written beside its cluster and restored after its owner.
    Depended,
    /// Never written.
    NotSave,
}

/// Entity variant tag.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// A ship.
    Ship,
    /// An asteroid.
    Asteroid,
    /// A blaster charge in flight.
    BlasterCharge,
    /// A dropped resource.
    PickupableResource,
}

impl EntityKind {
    /// Every kind; the decoder registry must cover all of them.
    pub const ALL: [Self; 4] = [
        Self::Ship,
        Self::Asteroid,
        Self::BlasterCharge,
        Self::PickupableResource,
    ];

    /// Stable `class_name` used in documents.
    #[must_use]
    pub const fn class_name(self) -> &'static str {
        match self {
            Self::Ship => "Ship",
            Self::Asteroid => "Asteroid",
            Self::BlasterCharge => "BlasterCharge",
            Self::PickupableResource => "PickupableResource",
        }
    }

    /// Persistence strategy new entities of this kind start with.
    #[must_use]
    pub const fn default_save_strategy(self) -> SaveStrategy {
        match self {
            Self::BlasterCharge => SaveStrategy::Depended,
            Self::Ship | Self::Asteroid | Self::PickupableResource => SaveStrategy::Entity,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class_name())
    }
}

/// Type-safe storage for variant components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityInner {
    /// Ship components.
    Ship(ShipComponents),
    /// Asteroid components.
    Asteroid(AsteroidComponents),
    /// Blaster charge components.
    BlasterCharge(ChargeComponents),
    /// Dropped resource components.
    Pickup(PickupComponents),
}

impl EntityInner {
    /// The tag of this variant.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Ship(_) => EntityKind::Ship,
            Self::Asteroid(_) => EntityKind::Asteroid,
            Self::BlasterCharge(_) => EntityKind::BlasterCharge,
            Self::Pickup(_) => EntityKind::PickupableResource,
        }
    }
}

/// What an entity learns about the body it touched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPeer {
    /// The other entity.
    pub id: EntityId,
    /// Its kind.
    pub kind: EntityKind,
    /// Its position at contact time.
    pub position: Vec2,
    /// Its velocity at contact time.
    pub velocity: Vec2,
    /// Its mass.
    pub mass: f32,
}

// =============================================================================
// Entity
// =============================================================================

/// A simulated object.
///
/// Equality compares identity and state but ignores physics registration,
/// so a world and its reloaded copy compare equal.
#[derive(Debug, Clone)]
pub struct Entity {
    id: EntityId,
    body: BodyState,
    radius: f32,
    in_space: Option<BodyHandle>,
    active: bool,
    save_strategy: SaveStrategy,
    inner: EntityInner,
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.body == other.body
            && self.radius == other.radius
            && self.active == other.active
            && self.save_strategy == other.save_strategy
            && self.inner == other.inner
    }
}

impl Entity {
    /// Creates an active entity that is not yet in any space.
    #[must_use]
    pub fn new(id: EntityId, body: BodyState, radius: f32, inner: EntityInner) -> Self {
        Self {
            id,
            body,
            radius,
            in_space: None,
            active: true,
            save_strategy: inner.kind().default_save_strategy(),
            inner,
        }
    }

    /// Builds a ship from a template.
    #[must_use]
    pub fn ship(id: EntityId, position: Vec2, config: &ShipConfig, caps: Capabilities, team: Team) -> Self {
        let body = BodyState {
            moment: BodyState::disc_moment(config.mass, config.radius),
            ..BodyState::at(position, config.mass)
        };
        let components = ShipComponents::from_config(config, caps, team);
        Self::new(id, body, config.radius, EntityInner::Ship(components))
    }

    /// Builds an asteroid whose mass and integrity scale with its area.
    #[must_use]
    pub fn asteroid(id: EntityId, position: Vec2, radius: f32, resource: Resource, config: &GenerationConfig) -> Self {
        let area = PI * radius * radius;
        let mass = area * config.density;
        let body = BodyState {
            moment: BodyState::disc_moment(mass, radius),
            ..BodyState::at(position, mass)
        };
        let components = AsteroidComponents {
            life: AsteroidLife::new(area * config.health_per_area, area * config.mining_health_per_area),
            resource,
            resource_launched: false,
        };
        Self::new(id, body, radius, EntityInner::Asteroid(components))
    }

    /// Builds a charge flying along `angle` at the charge's speed.
    #[must_use]
    pub fn blaster_charge(
        id: EntityId,
        owner: EntityId,
        team: Team,
        position: Vec2,
        angle: f32,
        charge: &ChargeConfig,
        damage_coef: f32,
    ) -> Self {
        let body = BodyState {
            velocity: Vec2::from_angle(angle) * charge.speed,
            angle,
            moment: BodyState::disc_moment(charge.mass, charge.radius),
            ..BodyState::at(position, charge.mass)
        };
        let components = ChargeComponents {
            owner,
            level: charge.level,
            team,
            damage: charge.damage * damage_coef,
            explosion_radius: charge.explosion_radius,
            life: Lifetime::new(charge.life_time),
            exploding: false,
            explosion_elapsed: 0.0,
        };
        Self::new(id, body, charge.radius, EntityInner::BlasterCharge(components))
    }

    /// Builds a floating resource.
    #[must_use]
    pub fn pickup(id: EntityId, position: Vec2, resource: Resource, gameplay: &GameplayConfig) -> Self {
        let body = BodyState::at(position, 1.0);
        let components = PickupComponents {
            resource,
            life: Lifetime::new(gameplay.pickup_life_time),
            collected: false,
        };
        Self::new(id, body, gameplay.pickup_radius, EntityInner::Pickup(components))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Returns the entity's id.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Returns the variant tag.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.inner.kind()
    }

    /// Kinematic state.
    #[must_use]
    pub fn body(&self) -> &BodyState {
        &self.body
    }

    /// Mutable kinematic state. Changes reach the space on the next tick.
    pub fn body_mut(&mut self) -> &mut BodyState {
        &mut self.body
    }

    /// Current position.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.body.position
    }

    /// Collision radius.
    #[must_use]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// True while registered in a physics space.
    #[must_use]
    pub fn in_space(&self) -> bool {
        self.in_space.is_some()
    }

    /// Physics handle while registered.
    #[must_use]
    pub fn body_handle(&self) -> Option<BodyHandle> {
        self.in_space
    }

    /// True until the entity's logic retires it.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Persistence strategy.
    #[must_use]
    pub fn save_strategy(&self) -> SaveStrategy {
        self.save_strategy
    }

    /// Overrides the persistence strategy.
    pub fn set_save_strategy(&mut self, strategy: SaveStrategy) {
        self.save_strategy = strategy;
    }

    /// Variant components.
    #[must_use]
    pub fn inner(&self) -> &EntityInner {
        &self.inner
    }

    /// Mutable variant components.
    pub fn inner_mut(&mut self) -> &mut EntityInner {
        &mut self.inner
    }

    /// Ship components, if this is a ship.
    #[must_use]
    pub fn as_ship(&self) -> Option<&ShipComponents> {
        match &self.inner {
            EntityInner::Ship(ship) => Some(ship),
            _ => None,
        }
    }

    /// Mutable ship components, if this is a ship.
    pub fn as_ship_mut(&mut self) -> Option<&mut ShipComponents> {
        match &mut self.inner {
            EntityInner::Ship(ship) => Some(ship),
            _ => None,
        }
    }

    /// Asteroid components, if this is an asteroid.
    #[must_use]
    pub fn as_asteroid(&self) -> Option<&AsteroidComponents> {
        match &self.inner {
            EntityInner::Asteroid(asteroid) => Some(asteroid),
            _ => None,
        }
    }

    /// Charge components, if this is a blaster charge.
    #[must_use]
    pub fn as_charge(&self) -> Option<&ChargeComponents> {
        match &self.inner {
            EntityInner::BlasterCharge(charge) => Some(charge),
            _ => None,
        }
    }

    /// Pickup components, if this is a dropped resource.
    #[must_use]
    pub fn as_pickup(&self) -> Option<&PickupComponents> {
        match &self.inner {
            EntityInner::Pickup(pickup) => Some(pickup),
            _ => None,
        }
    }

    /// The entity this one depends on for persistence.
    #[must_use]
    pub fn owner(&self) -> Option<EntityId> {
        self.as_charge().map(|charge| charge.owner)
    }

    /// Domain liveness.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        match &self.inner {
            EntityInner::Ship(ship) => ship.health.is_alive(),
            EntityInner::Asteroid(asteroid) => asteroid.life.is_alive(),
            EntityInner::BlasterCharge(charge) => !charge.exploding && charge.life.is_alive(),
            EntityInner::Pickup(pickup) => !pickup.collected && pickup.life.is_alive(),
        }
    }

    // =========================================================================
    // Physics Registration
    // =========================================================================

    /// Registers the body with `space`. Returns false if already registered.
    pub fn add_to_space(&mut self, space: &mut Space) -> bool {
        if self.in_space.is_some() {
            return false;
        }
        let body = RigidBody::new(self.body, Shape::circle(self.radius), ENTITY_COLLISION, self.id.as_u64());
        self.in_space = Some(space.add_body(body));
        true
    }

    /// Unregisters the body, keeping the latest simulated state.
    /// Returns false if it was not registered.
    pub fn remove_from_space(&mut self, space: &mut Space) -> bool {
        let Some(handle) = self.in_space.take() else {
            return false;
        };
        if let Some(body) = space.remove_body(handle) {
            self.body = body.state;
        }
        true
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Marks the entity active and records it in `coord`.
    pub fn activate(&mut self, coord: ClusterCoord, directory: &mut EntityDirectory) {
        self.active = true;
        directory.insert(self.id, coord);
    }

    /// Retires the entity and drops it from the directory.
    pub fn deactivate(&mut self, directory: &mut EntityDirectory) {
        self.active = false;
        directory.remove(self.id);
    }

    /// Advances domain logic by `dt`.
    ///
    /// May steer the body through forces but never moves it directly.
    /// Retires the entity when its logic says it should disappear.
    pub fn update(&mut self, dt: f32, ctx: &mut TickContext<'_>) {
        if !self.active {
            return;
        }
        let Self {
            id,
            body,
            radius,
            inner,
            ..
        } = self;
        let keep = match inner {
            EntityInner::Ship(ship) => update_ship(*id, ship, body, *radius, dt, ctx),
            EntityInner::Asteroid(asteroid) => update_asteroid(*id, asteroid, body, ctx),
            EntityInner::BlasterCharge(charge) => update_charge(*id, charge, body, dt, ctx),
            EntityInner::Pickup(pickup) => {
                pickup.life.decrease(dt);
                !pickup.collected && pickup.life.is_alive()
            }
        };
        if !keep {
            self.save_strategy = SaveStrategy::NotSave;
            self.deactivate(ctx.directory);
        }
    }

    /// Applies a hit; returns the damage actually taken.
    pub fn take_damage(&mut self, amount: f32, sender: EntityId) -> f32 {
        tracing::trace!(entity = %self.id, %sender, amount, "damage");
        match &mut self.inner {
            EntityInner::Ship(ship) => ship.health.decrease(amount),
            EntityInner::Asteroid(asteroid) => {
                let before = asteroid.life.health;
                asteroid.life.decrease(amount);
                before - asteroid.life.health
            }
            EntityInner::BlasterCharge(charge) => {
                charge.life.expire();
                0.0
            }
            EntityInner::Pickup(_) => 0.0,
        }
    }

    /// Drills an asteroid; returns false for anything else or a dead asteroid.
    pub fn mine(&mut self, amount: f32) -> bool {
        match &mut self.inner {
            EntityInner::Asteroid(asteroid) if asteroid.life.is_alive() => {
                asteroid.life.decrease_by_mining(amount);
                true
            }
            _ => false,
        }
    }

    /// Reacts to touching `other`.
    ///
    /// Returns true if the physics engine should also bounce the bodies.
    pub fn collide(&mut self, other: &ContactPeer, ctx: &mut TickContext<'_>) -> bool {
        if !self.active {
            return false;
        }
        let touches_pickup = other.kind == EntityKind::PickupableResource;
        match &mut self.inner {
            EntityInner::Ship(_) | EntityInner::Asteroid(_) => {
                if !touches_pickup {
                    let amount = self.body.mass * self.body.speed() * ctx.gameplay.collision_damage_coef;
                    if amount > 0.0 {
                        ctx.effects.push(Command::Damage {
                            target: other.id,
                            amount,
                            sender: self.id,
                        });
                    }
                }
                !touches_pickup
            }
            EntityInner::BlasterCharge(charge) => {
                if !touches_pickup && !charge.exploding {
                    explode(self.id, charge, &mut self.body, ctx.effects);
                }
                false
            }
            EntityInner::Pickup(pickup) => {
                if other.kind == EntityKind::Ship && !pickup.collected && pickup.life.is_alive() {
                    pickup.collected = true;
                    ctx.effects.push(Command::Collect {
                        collector: other.id,
                        pickup: self.id,
                    });
                }
                false
            }
        }
    }

    /// Copies the body into the space registration, if any.
    pub(crate) fn push_to_space(&self, space: &mut Space) {
        if let Some(handle) = self.in_space {
            if let Err(err) = space.set_state(handle, self.body) {
                tracing::warn!(entity = %self.id, %err, "registered body missing from space");
            }
        }
    }

    /// Copies the simulated state back from the space, if registered.
    pub(crate) fn pull_from_space(&mut self, space: &Space) {
        if let Some(handle) = self.in_space {
            if let Ok(state) = space.state(handle) {
                self.body = state;
            }
        }
    }

}

// =============================================================================
// Variant Logic
// =============================================================================

fn update_ship(
    id: EntityId,
    ship: &mut ShipComponents,
    body: &mut BodyState,
    radius: f32,
    dt: f32,
    ctx: &mut TickContext<'_>,
) -> bool {
    if !ship.health.is_alive() {
        ctx.effects.emit(Event::Destroyed {
            id,
            kind: EntityKind::Ship,
        });
        return false;
    }

    let controls = ship.controls;
    if let Some(engine) = &ship.engine {
        if controls.brake {
            engine.stop(body, dt);
        } else {
            if controls.thrust != 0.0 {
                let target = body.heading() * engine.max_speed() * controls.thrust.clamp(-1.0, 1.0);
                engine.bring_speed_to(body, target, dt);
            }
            let spin = engine.config.max_rotation_speed * controls.turn.clamp(-1.0, 1.0);
            engine.bring_rotation_to(body, spin, dt);
        }
    }

    if let Some(weapon) = &mut ship.weapon {
        weapon.tick(dt);
        if controls.fire {
            if let Some(charge) = weapon.fire(id, body, radius, ship.team, ctx.gameplay, ctx.directory) {
                ctx.effects.emit(Event::WeaponFired {
                    shooter: id,
                    charge: charge.id(),
                });
                ctx.effects.push(Command::Spawn(Box::new(charge)));
            }
        }
    }

    if let Some(command) = ship.drill.as_ref().and_then(|drill| drill.mine_command(id, dt)) {
        ctx.effects.push(command);
    }
    true
}

fn update_asteroid(
    id: EntityId,
    asteroid: &mut AsteroidComponents,
    body: &BodyState,
    ctx: &mut TickContext<'_>,
) -> bool {
    if asteroid.life.is_alive() {
        return true;
    }
    if !asteroid.resource_launched {
        asteroid.resource_launched = true;
        let resource = if asteroid.life.is_destroyed() {
            asteroid.resource.scaled(ctx.gameplay.losses_coef)
        } else {
            asteroid.resource
        };
        let pickup = Entity::pickup(ctx.directory.allocate(), body.position, resource, ctx.gameplay);
        ctx.effects.push(Command::Spawn(Box::new(pickup)));
    }
    ctx.effects.emit(Event::Destroyed {
        id,
        kind: EntityKind::Asteroid,
    });
    false
}

fn update_charge(
    id: EntityId,
    charge: &mut ChargeComponents,
    body: &mut BodyState,
    dt: f32,
    ctx: &mut TickContext<'_>,
) -> bool {
    if charge.exploding {
        body.velocity = Vec2::ZERO;
        charge.explosion_elapsed += dt;
        return charge.explosion_elapsed < ctx.gameplay.explosion_time;
    }
    charge.life.decrease(dt);
    if !charge.life.is_alive() {
        explode(id, charge, body, ctx.effects);
    }
    true
}

fn explode(id: EntityId, charge: &mut ChargeComponents, body: &mut BodyState, effects: &mut EffectQueue) {
    body.velocity = Vec2::ZERO;
    charge.life.expire();
    charge.exploding = true;
    effects.push(Command::Explode {
        source: id,
        owner: Some(charge.owner),
        center: body.position,
        radius: charge.explosion_radius,
        damage: charge.damage,
    });
    effects.emit(Event::Exploded {
        source: id,
        center: body.position,
        radius: charge.explosion_radius,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;

    struct Harness {
        effects: EffectQueue,
        directory: EntityDirectory,
        gameplay: GameplayConfig,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                effects: EffectQueue::new(),
                directory: EntityDirectory::new(),
                gameplay: GameplayConfig::default(),
            }
        }

        fn ctx(&mut self) -> TickContext<'_> {
            TickContext {
                effects: &mut self.effects,
                directory: &mut self.directory,
                gameplay: &self.gameplay,
            }
        }

        fn file(&mut self, entity: &mut Entity) {
            entity.activate(ClusterCoord::new(0, 0), &mut self.directory);
        }
    }

    fn armed_ship(id: u64) -> Entity {
        Entity::ship(
            EntityId::new(id),
            Vec2::ZERO,
            &WorldConfig::default().ship,
            Capabilities::all(),
            Team::Player,
        )
    }

    fn asteroid(id: u64) -> Entity {
        Entity::asteroid(
            EntityId::new(id),
            Vec2::new(50.0, 50.0),
            30.0,
            Resource::new(ResourceKind::Gold, 10.0),
            &GenerationConfig::default(),
        )
    }

    fn peer(entity: &Entity) -> ContactPeer {
        ContactPeer {
            id: entity.id(),
            kind: entity.kind(),
            position: entity.position(),
            velocity: entity.body().velocity,
            mass: entity.body().mass,
        }
    }

    mod identity_tests {
        use super::*;

        #[test]
        fn entity_id_ordering_and_display() {
            assert!(EntityId::new(1) < EntityId::new(2));
            assert_eq!(EntityId::new(7).to_string(), "7");
            assert_eq!(format!("{:?}", EntityId::new(7)), "EntityId(7)");
        }

        #[test]
        fn kinds_carry_class_names_and_strategies() {
            assert_eq!(EntityKind::BlasterCharge.class_name(), "BlasterCharge");
            assert_eq!(EntityKind::BlasterCharge.default_save_strategy(), SaveStrategy::Depended);
            assert_eq!(EntityKind::Asteroid.default_save_strategy(), SaveStrategy::Entity);
            assert_eq!(asteroid(1).save_strategy(), SaveStrategy::Entity);
        }

        #[test]
        fn equality_ignores_physics_registration() {
            let mut a = asteroid(3);
            let b = asteroid(3);
            let mut space = Space::new();
            a.add_to_space(&mut space);
            assert_eq!(a, b);
        }
    }

    mod space_tests {
        use super::*;

        #[test]
        fn removal_keeps_simulated_state() {
            let mut ship = armed_ship(1);
            let mut space = Space::new();
            ship.add_to_space(&mut space);
            let handle = ship.body_handle().unwrap();
            space.body_mut(handle).unwrap().state.position = Vec2::new(9.0, 9.0);
            ship.remove_from_space(&mut space);
            assert_eq!(ship.position(), Vec2::new(9.0, 9.0));
            assert!(space.is_empty());
        }

        #[test]
        fn push_and_pull_sync_body() {
            let mut ship = armed_ship(1);
            let mut space = Space::new();
            ship.add_to_space(&mut space);
            ship.body_mut().velocity = Vec2::new(3.0, 0.0);
            ship.push_to_space(&mut space);
            space.step(1.0, &mut |_: &stardrift_physics::Contact| true);
            ship.pull_from_space(&space);
            assert!((ship.position().x - 3.0).abs() < 1e-5);
        }
    }

    mod lifecycle_tests {
        use super::*;

        #[test]
        fn activation_tracks_directory() {
            let mut harness = Harness::new();
            let mut ship = armed_ship(4);
            harness.file(&mut ship);
            assert!(harness.directory.contains(ship.id()));
            ship.deactivate(&mut harness.directory);
            assert!(!ship.is_active());
            assert!(!harness.directory.contains(ship.id()));
        }

        #[test]
        fn dead_ship_reports_and_deactivates() {
            let mut harness = Harness::new();
            let mut ship = armed_ship(4);
            harness.file(&mut ship);
            ship.take_damage(1e6, EntityId::new(0));
            assert!(!ship.is_alive());
            ship.update(0.1, &mut harness.ctx());
            assert!(!ship.is_active());
            assert!(matches!(
                harness.effects.take_events().as_slice(),
                [Event::Destroyed { kind: EntityKind::Ship, .. }]
            ));
        }

        #[test]
        fn firing_spawns_a_charge() {
            let mut harness = Harness::new();
            harness.directory.reserve(EntityId::new(10));
            let mut ship = armed_ship(4);
            harness.file(&mut ship);
            ship.as_ship_mut().unwrap().controls.fire = true;
            ship.update(0.1, &mut harness.ctx());

            let commands = harness.effects.take_commands();
            let spawned: Vec<_> = commands
                .iter()
                .filter_map(|command| match command {
                    Command::Spawn(entity) => Some(entity.kind()),
                    _ => None,
                })
                .collect();
            assert_eq!(spawned, vec![EntityKind::BlasterCharge]);
            assert!(harness
                .effects
                .events()
                .iter()
                .any(|event| matches!(event, Event::WeaponFired { .. })));
        }

        #[test]
        fn thrust_accelerates_along_heading() {
            let mut harness = Harness::new();
            let mut ship = armed_ship(4);
            harness.file(&mut ship);
            ship.as_ship_mut().unwrap().controls.thrust = 1.0;
            ship.update(0.5, &mut harness.ctx());
            assert!(ship.body().velocity.x > 0.0);
            assert!(ship.body().velocity.y.abs() < 1e-5);
        }

        #[test]
        fn destroyed_asteroid_drops_reduced_resource() {
            let mut harness = Harness::new();
            let mut rock = asteroid(2);
            harness.file(&mut rock);
            rock.take_damage(1e6, EntityId::new(0));
            rock.update(0.1, &mut harness.ctx());

            assert!(!rock.is_active());
            assert_eq!(rock.save_strategy(), SaveStrategy::NotSave);
            let dropped = harness.effects.take_commands().into_iter().find_map(|command| match command {
                Command::Spawn(entity) => entity.as_pickup().map(|pickup| pickup.resource),
                _ => None,
            });
            let expected = 10.0 * GameplayConfig::default().losses_coef;
            assert!((dropped.unwrap().quantity - expected).abs() < 1e-5);
        }

        #[test]
        fn mined_out_asteroid_drops_full_resource() {
            let mut harness = Harness::new();
            let mut rock = asteroid(2);
            harness.file(&mut rock);
            assert!(rock.mine(1e6));
            assert!(!rock.mine(1.0));
            rock.update(0.1, &mut harness.ctx());
            let dropped = harness.effects.take_commands().into_iter().find_map(|command| match command {
                Command::Spawn(entity) => entity.as_pickup().map(|pickup| pickup.resource),
                _ => None,
            });
            assert!((dropped.unwrap().quantity - 10.0).abs() < 1e-5);
        }

        #[test]
        fn charge_explodes_on_expiry_then_retires() {
            let mut harness = Harness::new();
            let gameplay = GameplayConfig::default();
            let charge_config = gameplay.charge_for_level(0).unwrap().clone();
            let mut charge = Entity::blaster_charge(
                EntityId::new(5),
                EntityId::new(1),
                Team::Player,
                Vec2::ZERO,
                0.0,
                &charge_config,
                1.0,
            );
            harness.file(&mut charge);

            charge.update(charge_config.life_time + 0.1, &mut harness.ctx());
            assert!(!charge.is_alive());
            assert!(charge.is_active());
            assert_eq!(charge.body().velocity, Vec2::ZERO);
            assert!(harness
                .effects
                .take_commands()
                .iter()
                .any(|command| matches!(command, Command::Explode { owner: Some(owner), .. } if *owner == EntityId::new(1))));

            charge.update(gameplay.explosion_time, &mut harness.ctx());
            assert!(!charge.is_active());
        }

        #[test]
        fn pickup_expires() {
            let mut harness = Harness::new();
            let gameplay = GameplayConfig::default();
            let mut pickup = Entity::pickup(
                EntityId::new(6),
                Vec2::ZERO,
                Resource::new(ResourceKind::Mithril, 1.0),
                &gameplay,
            );
            harness.file(&mut pickup);
            pickup.update(gameplay.pickup_life_time + 1.0, &mut harness.ctx());
            assert!(!pickup.is_active());
        }
    }

    mod collision_tests {
        use super::*;

        #[test]
        fn moving_ship_rams_asteroid() {
            let mut harness = Harness::new();
            let mut ship = armed_ship(1);
            ship.body_mut().velocity = Vec2::new(100.0, 0.0);
            let rock = asteroid(2);
            assert!(ship.collide(&peer(&rock), &mut harness.ctx()));
            match harness.effects.take_commands().as_slice() {
                [Command::Damage { target, amount, sender }] => {
                    assert_eq!(*target, rock.id());
                    assert_eq!(*sender, ship.id());
                    assert!((amount - 10.0 * 100.0 * 0.01).abs() < 1e-4);
                }
                other => panic!("unexpected {other:?}"),
            }
        }

        #[test]
        fn pickup_is_collected_by_ship_without_bounce() {
            let mut harness = Harness::new();
            let ship = armed_ship(1);
            let mut pickup = Entity::pickup(
                EntityId::new(3),
                Vec2::ZERO,
                Resource::new(ResourceKind::Gold, 2.0),
                &harness.gameplay,
            );
            assert!(!pickup.collide(&peer(&ship), &mut harness.ctx()));
            assert!(!pickup.is_alive());
            assert!(matches!(
                harness.effects.take_commands().as_slice(),
                [Command::Collect { .. }]
            ));
            assert!(!pickup.collide(&peer(&ship), &mut harness.ctx()));
            assert_eq!(harness.effects.pending_commands(), 0);
        }

        #[test]
        fn charge_ignores_pickups_but_explodes_on_rock() {
            let mut harness = Harness::new();
            let charge_config = harness.gameplay.charge_for_level(0).unwrap().clone();
            let mut charge = Entity::blaster_charge(
                EntityId::new(5),
                EntityId::new(1),
                Team::Player,
                Vec2::ZERO,
                0.0,
                &charge_config,
                1.0,
            );
            let pickup = Entity::pickup(
                EntityId::new(3),
                Vec2::ZERO,
                Resource::new(ResourceKind::Gold, 2.0),
                &harness.gameplay,
            );
            charge.collide(&peer(&pickup), &mut harness.ctx());
            assert!(charge.is_alive());
            charge.collide(&peer(&asteroid(2)), &mut harness.ctx());
            assert!(!charge.is_alive());
        }
    }
}
