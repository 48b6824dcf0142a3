//! Ship gadgets: engine, weapon, drill and upgrade track.
//!
//! Gadgets only ever touch the owning ship's own [`BodyState`]; effects on
//! other entities leave as [`Command`]s.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use stardrift_physics::BodyState;

use super::{Cargo, Entity, EntityId, Team};
use crate::config::{DrillConfig, EngineConfig, GameplayConfig, UpgradeConfig, WeaponConfig};
use crate::directory::EntityDirectory;
use crate::effects::Command;

// =============================================================================
// Engine
// =============================================================================

/// Drives a ship's velocity and spin toward targets within acceleration limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Engine {
    /// Base stats.
    pub config: EngineConfig,
    /// Multiplier on max speed from upgrades.
    pub speed_coef: f32,
}

impl Engine {
    /// An engine with no upgrades.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            speed_coef: 1.0,
        }
    }

    /// Speed cap after upgrades.
    #[must_use]
    pub fn max_speed(&self) -> f32 {
        self.config.max_speed * self.speed_coef
    }

    /// Moves velocity toward `target` by at most one tick of acceleration.
    pub fn bring_speed_to(&self, body: &mut BodyState, target: Vec2, dt: f32) {
        let delta = target - body.velocity;
        body.velocity += delta.clamp_length_max(self.config.acceleration * dt);
        self.clamp_speed(body);
    }

    /// Moves angular velocity toward `target` by at most one tick of
    /// rotational acceleration.
    pub fn bring_rotation_to(&self, body: &mut BodyState, target: f32, dt: f32) {
        let step = self.config.rotation_acceleration * dt;
        let delta = (target - body.angular_velocity).clamp(-step, step);
        let cap = self.config.max_rotation_speed;
        body.angular_velocity = (body.angular_velocity + delta).clamp(-cap, cap);
    }

    /// Pushes the body, then enforces the speed cap.
    pub fn apply_force(&self, body: &mut BodyState, force: Vec2, dt: f32) {
        body.apply_force(force, dt);
        self.clamp_speed(body);
    }

    /// Brakes toward a standstill.
    pub fn stop(&self, body: &mut BodyState, dt: f32) {
        self.bring_speed_to(body, Vec2::ZERO, dt);
        self.bring_rotation_to(body, 0.0, dt);
    }

    fn clamp_speed(&self, body: &mut BodyState) {
        body.velocity = body.velocity.clamp_length_max(self.max_speed());
    }
}

// =============================================================================
// Weapon
// =============================================================================

/// Blaster with a cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weapon {
    /// Current stats.
    pub config: WeaponConfig,
    /// Seconds until the next shot is allowed.
    pub remaining: f32,
}

impl Weapon {
    /// A loaded weapon.
    #[must_use]
    pub fn new(config: WeaponConfig) -> Self {
        Self {
            config,
            remaining: 0.0,
        }
    }

    /// Counts the cooldown down.
    pub fn tick(&mut self, dt: f32) {
        self.remaining = (self.remaining - dt).max(0.0);
    }

    /// True when a shot is allowed.
    #[must_use]
    pub fn ready(&self) -> bool {
        self.remaining <= 0.0
    }

    /// Launches a charge along the shooter's heading if the weapon is ready.
    ///
    /// The charge spawns just outside the shooter's hull so the two do not
    /// start out overlapping.
    pub fn fire(
        &mut self,
        shooter: EntityId,
        body: &BodyState,
        shooter_radius: f32,
        team: Team,
        gameplay: &GameplayConfig,
        directory: &mut EntityDirectory,
    ) -> Option<Entity> {
        if !self.ready() {
            return None;
        }
        let charge = gameplay.charge_for_level(self.config.level)?;
        let direction = body.heading();
        let position = body.position + direction * (shooter_radius + charge.radius + 1.0);
        self.remaining = self.config.cooldown;
        Some(Entity::blaster_charge(
            directory.allocate(),
            shooter,
            team,
            position,
            body.angle,
            charge,
            self.config.damage_coef,
        ))
    }
}

// =============================================================================
// Drill
// =============================================================================

/// Mining laser aimed at one asteroid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Drill {
    /// Base stats.
    pub config: DrillConfig,
    /// Multiplier on damage from upgrades.
    pub damage_coef: f32,
    /// Asteroid being drilled.
    pub target: Option<EntityId>,
}

impl Drill {
    /// An idle drill.
    #[must_use]
    pub fn new(config: DrillConfig) -> Self {
        Self {
            config,
            damage_coef: 1.0,
            target: None,
        }
    }

    /// Mining damage per second after upgrades.
    #[must_use]
    pub fn damage(&self) -> f32 {
        self.config.damage * self.damage_coef
    }

    /// The mining request for this tick, if a target is set.
    #[must_use]
    pub fn mine_command(&self, miner: EntityId, dt: f32) -> Option<Command> {
        self.target.map(|target| Command::Mine {
            miner,
            target,
            amount: self.damage() * dt,
            range: self.config.range,
        })
    }
}

// =============================================================================
// Upgrades
// =============================================================================

/// Things a ship can buy levels of.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeKind {
    /// Max health.
    Health,
    /// Armour.
    Armor,
    /// Weapon level and damage.
    Weapon,
    /// Engine speed.
    Engine,
    /// Drill damage.
    Drill,
}

/// Levels bought so far, per upgrade kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpgradeTrack {
    levels: BTreeMap<UpgradeKind, u32>,
}

impl UpgradeTrack {
    /// Level of `kind`; zero if never bought.
    #[must_use]
    pub fn level(&self, kind: UpgradeKind) -> u32 {
        self.levels.get(&kind).copied().unwrap_or(0)
    }

    /// Price of the next level of `kind`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn price(&self, kind: UpgradeKind, config: &UpgradeConfig) -> Cargo {
        config
            .start
            .plus(&config.step.scaled(self.level(kind) as f32))
    }

    /// True if `kind` is below the configured maximum.
    #[must_use]
    pub fn can_raise(&self, kind: UpgradeKind, config: &UpgradeConfig) -> bool {
        self.level(kind) < config.max_level
    }

    pub(crate) fn raise(&mut self, kind: UpgradeKind) {
        *self.levels.entry(kind).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ResourceKind;

    mod engine_tests {
        use super::*;

        #[test]
        fn acceleration_is_limited_per_tick() {
            let engine = Engine::new(EngineConfig::default());
            let mut body = BodyState::default();
            engine.bring_speed_to(&mut body, Vec2::new(1000.0, 0.0), 0.5);
            assert!((body.velocity.x - 100.0).abs() < 1e-3);
        }

        #[test]
        fn speed_is_capped() {
            let engine = Engine::new(EngineConfig::default());
            let mut body = BodyState::default();
            engine.apply_force(&mut body, Vec2::new(1e6, 0.0), 1.0);
            assert!((body.speed() - engine.max_speed()).abs() < 1e-3);
        }

        #[test]
        fn stop_brakes_toward_zero() {
            let engine = Engine::new(EngineConfig::default());
            let mut body = BodyState {
                velocity: Vec2::new(50.0, 0.0),
                angular_velocity: 1.0,
                ..BodyState::default()
            };
            engine.stop(&mut body, 1.0);
            assert!(body.velocity.length() < 1e-3);
            assert!(body.angular_velocity.abs() < 1e-3);
        }
    }

    mod weapon_tests {
        use super::*;

        #[test]
        fn fires_then_cools_down() {
            let mut weapon = Weapon::new(WeaponConfig::default());
            let mut directory = EntityDirectory::new();
            let gameplay = GameplayConfig::default();
            let body = BodyState::default();
            let shooter = EntityId::new(100);

            let charge = weapon
                .fire(shooter, &body, 10.0, Team::Player, &gameplay, &mut directory)
                .expect("ready weapon fires");
            assert_eq!(charge.owner(), Some(shooter));
            assert!(charge.position().x > 10.0);
            assert!(charge.body().velocity.x > 0.0);

            assert!(weapon
                .fire(shooter, &body, 10.0, Team::Player, &gameplay, &mut directory)
                .is_none());
            weapon.tick(weapon.config.cooldown);
            assert!(weapon.ready());
        }
    }

    mod drill_tests {
        use super::*;

        #[test]
        fn idle_drill_mines_nothing() {
            let drill = Drill::new(DrillConfig::default());
            assert!(drill.mine_command(EntityId::new(1), 1.0).is_none());
        }

        #[test]
        fn targeted_drill_emits_scaled_mining() {
            let mut drill = Drill::new(DrillConfig::default());
            drill.target = Some(EntityId::new(9));
            drill.damage_coef = 2.0;
            match drill.mine_command(EntityId::new(1), 0.5) {
                Some(Command::Mine { target, amount, .. }) => {
                    assert_eq!(target, EntityId::new(9));
                    assert!((amount - DrillConfig::default().damage).abs() < 1e-6);
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    mod upgrade_tests {
        use super::*;

        #[test]
        fn price_grows_with_level() {
            let config = UpgradeConfig::default();
            let mut track = UpgradeTrack::default();
            let first = track.price(UpgradeKind::Armor, &config);
            track.raise(UpgradeKind::Armor);
            let second = track.price(UpgradeKind::Armor, &config);
            assert!(second.amount(ResourceKind::Gold) > first.amount(ResourceKind::Gold));
            assert_eq!(track.level(UpgradeKind::Armor), 1);
            assert_eq!(track.level(UpgradeKind::Engine), 0);
        }
    }
}
