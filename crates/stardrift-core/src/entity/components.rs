//! Per-variant component bundles.
//!
//! Each entity variant is a composition of the building blocks in
//! [`capabilities`](super::capabilities) and [`gadgets`](super::gadgets).
//! The bundles serialize to the domain fields of an entity document.

use serde::{Deserialize, Serialize};

use super::capabilities::{AsteroidLife, Capabilities, Cargo, HealthTrack, Lifetime, Resource, Team};
use super::gadgets::{Drill, Engine, UpgradeKind, UpgradeTrack, Weapon};
use super::EntityId;
use crate::config::{ShipConfig, UpgradeConfig};
use crate::error::UpgradeError;

/// Pilot intent, set by the driver between ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ShipControls {
    /// Forward thrust in `-1..=1`; zero leaves velocity alone.
    pub thrust: f32,
    /// Turn rate in `-1..=1` of the engine's maximum.
    pub turn: f32,
    /// Brake toward a standstill, overriding thrust.
    pub brake: bool,
    /// Fire whenever the weapon is ready.
    pub fire: bool,
}

/// Components for ships.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipComponents {
    /// Hull integrity.
    pub health: HealthTrack,
    /// Propulsion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<Engine>,
    /// Blaster.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weapon: Option<Weapon>,
    /// Mining laser.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drill: Option<Drill>,
    /// Purchased upgrade levels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgrades: Option<UpgradeTrack>,
    /// Resource hold.
    #[serde(default)]
    pub cargo: Cargo,
    /// Allegiance.
    #[serde(default)]
    pub team: Team,
    /// Current pilot intent.
    #[serde(default)]
    pub controls: ShipControls,
}

impl ShipComponents {
    /// Assembles a ship from a template, fitting only the requested gadgets.
    ///
    /// Every ship has a health track regardless of `caps`.
    #[must_use]
    pub fn from_config(config: &ShipConfig, caps: Capabilities, team: Team) -> Self {
        Self {
            health: HealthTrack {
                armor: config.armor,
                ..HealthTrack::full(config.max_health)
            },
            engine: caps
                .contains(Capabilities::ENGINE)
                .then(|| Engine::new(config.engine)),
            weapon: caps
                .contains(Capabilities::WEAPON)
                .then(|| Weapon::new(config.weapon)),
            drill: caps
                .contains(Capabilities::DRILL)
                .then(|| Drill::new(config.drill)),
            upgrades: caps
                .contains(Capabilities::UPGRADES)
                .then(UpgradeTrack::default),
            cargo: Cargo::new(),
            team,
            controls: ShipControls::default(),
        }
    }

    /// The capability set this ship was fitted with.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        let mut caps = Capabilities::HEALTH;
        caps.set(Capabilities::ENGINE, self.engine.is_some());
        caps.set(Capabilities::WEAPON, self.weapon.is_some());
        caps.set(Capabilities::DRILL, self.drill.is_some());
        caps.set(Capabilities::UPGRADES, self.upgrades.is_some());
        caps
    }

    /// Buys the next level of `kind` with cargo and applies its effect.
    ///
    /// # Errors
    ///
    /// Fails without side effects if the ship has no upgrade track, lacks the
    /// gadget being improved, is at the maximum level, or cannot pay.
    pub fn upgrade(&mut self, kind: UpgradeKind, config: &UpgradeConfig) -> Result<(), UpgradeError> {
        let track = self.upgrades.as_mut().ok_or(UpgradeError::NotUpgradeable)?;
        let has_gadget = match kind {
            UpgradeKind::Health | UpgradeKind::Armor => true,
            UpgradeKind::Weapon => self.weapon.is_some(),
            UpgradeKind::Engine => self.engine.is_some(),
            UpgradeKind::Drill => self.drill.is_some(),
        };
        if !has_gadget {
            return Err(UpgradeError::MissingGadget);
        }
        if !track.can_raise(kind, config) {
            return Err(UpgradeError::MaxLevel);
        }
        if !self.cargo.pay(&track.price(kind, config)) {
            return Err(UpgradeError::Unaffordable);
        }
        track.raise(kind);

        match kind {
            UpgradeKind::Health => {
                let gained = self.health.max_health * config.health_step;
                self.health.max_health += gained;
                self.health.increase(gained);
            }
            UpgradeKind::Armor => self.health.armor += config.armor_step,
            UpgradeKind::Weapon => {
                if let Some(weapon) = &mut self.weapon {
                    weapon.config.level += 1;
                    weapon.config.damage_coef += config.weapon_damage_step;
                }
            }
            UpgradeKind::Engine => {
                if let Some(engine) = &mut self.engine {
                    engine.speed_coef += config.engine_speed_step;
                }
            }
            UpgradeKind::Drill => {
                if let Some(drill) = &mut self.drill {
                    drill.damage_coef += config.drill_damage_step;
                }
            }
        }
        Ok(())
    }
}

/// Components for asteroids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsteroidComponents {
    /// Structural and mining integrity.
    pub life: AsteroidLife,
    /// Resource released when the asteroid breaks up.
    pub resource: Resource,
    /// Set once the resource has been dropped.
    #[serde(default)]
    pub resource_launched: bool,
}

/// Components for blaster charges.
///
/// A charge depends on the ship that fired it and is only persisted next to
/// a cluster while that ship is tracked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeComponents {
    /// Ship that fired the charge.
    pub owner: EntityId,
    /// Charge level.
    pub level: u32,
    /// Allegiance inherited from the owner.
    #[serde(default)]
    pub team: Team,
    /// Damage dealt to everything in the blast.
    pub damage: f32,
    /// Blast radius.
    pub explosion_radius: f32,
    /// Flight time left.
    pub life: Lifetime,
    /// Set once detonated.
    #[serde(default)]
    pub exploding: bool,
    /// Seconds since detonation.
    #[serde(default)]
    pub explosion_elapsed: f32,
}

/// Components for dropped resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickupComponents {
    /// What a ship gains by touching it.
    pub resource: Resource,
    /// Time left before it vanishes.
    pub life: Lifetime,
    /// Set once a ship has touched it.
    #[serde(default)]
    pub collected: bool,
}
