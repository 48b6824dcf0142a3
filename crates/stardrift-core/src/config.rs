//! Configuration consumed by the world at startup.
//!
//! Every section deserializes with `#[serde(default)]`, so a config file
//! only needs to name the values it overrides:
//!
//! ```
//! use stardrift_core::config::WorldConfig;
//!
//! let config = WorldConfig::from_json_str(r#"{ "seed": 7, "vision_radius": 2 }"#).unwrap();
//! assert_eq!(config.seed, 7);
//! assert_eq!(config.vision_radius, 2);
//! assert_eq!(config.cluster_size, WorldConfig::default().cluster_size);
//! ```

use std::fs;
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use stardrift_physics::SpaceConfig;

use crate::entity::Cargo;
use crate::error::ConfigError;

// =============================================================================
// World
// =============================================================================

/// Top-level world configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Width and height of one cluster.
    pub cluster_size: Vec2,
    /// Chebyshev radius, in clusters, of the active neighbourhood.
    pub vision_radius: i32,
    /// Seed mixed into every cluster's generator.
    pub seed: u64,
    /// Procedural content parameters.
    pub generation: GenerationConfig,
    /// Rules shared by all entities.
    pub gameplay: GameplayConfig,
    /// Template for ships spawned by drivers.
    pub ship: ShipConfig,
    /// Physics space tunables.
    pub physics: SpaceConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            cluster_size: Vec2::new(1000.0, 1000.0),
            vision_radius: 1,
            seed: 0,
            generation: GenerationConfig::default(),
            gameplay: GameplayConfig::default(),
            ship: ShipConfig::default(),
            physics: SpaceConfig::default(),
        }
    }
}

impl WorldConfig {
    /// Parses and validates a JSON config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] on malformed input and
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`WorldConfig::from_json_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.cluster_size.x > 0.0 && self.cluster_size.y > 0.0) || !self.cluster_size.is_finite() {
            return Err(ConfigError::Invalid("cluster_size must be positive".into()));
        }
        if self.vision_radius < 0 {
            return Err(ConfigError::Invalid("vision_radius must not be negative".into()));
        }
        self.generation.validate()?;
        self.gameplay.validate()?;
        self.physics
            .validate()
            .map_err(|err| ConfigError::Invalid(err.to_string()))
    }
}

// =============================================================================
// Generation
// =============================================================================

/// Parameters of the default asteroid-field generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Fewest asteroids per cluster.
    pub asteroids_min: u32,
    /// Most asteroids per cluster (inclusive).
    pub asteroids_max: u32,
    /// Smallest asteroid radius.
    pub radius_min: f32,
    /// Largest asteroid radius.
    pub radius_max: f32,
    /// Smallest resource stack carried by an asteroid.
    pub resource_min: f32,
    /// Largest resource stack carried by an asteroid.
    pub resource_max: f32,
    /// Mass per unit of area.
    pub density: f32,
    /// Structural health per unit of area.
    pub health_per_area: f32,
    /// Minable material per unit of area.
    pub mining_health_per_area: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            asteroids_min: 4,
            asteroids_max: 7,
            radius_min: 20.0,
            radius_max: 60.0,
            resource_min: 5.0,
            resource_max: 25.0,
            density: 0.05,
            health_per_area: 0.02,
            mining_health_per_area: 0.01,
        }
    }
}

impl GenerationConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.asteroids_min > self.asteroids_max {
            return Err(ConfigError::Invalid("asteroids_min exceeds asteroids_max".into()));
        }
        if !(self.radius_min > 0.0 && self.radius_min <= self.radius_max) {
            return Err(ConfigError::Invalid("asteroid radius range is empty".into()));
        }
        if !(self.resource_min >= 0.0 && self.resource_min <= self.resource_max) {
            return Err(ConfigError::Invalid("resource range is empty".into()));
        }
        Ok(())
    }
}

// =============================================================================
// Gameplay
// =============================================================================

/// Stats of one blaster charge level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeConfig {
    /// Minimum weapon level that fires this charge.
    pub level: u32,
    /// Collision radius.
    pub radius: f32,
    /// Mass.
    pub mass: f32,
    /// Launch speed.
    pub speed: f32,
    /// Damage dealt to everything in the blast.
    pub damage: f32,
    /// Seconds before the charge detonates on its own.
    pub life_time: f32,
    /// Blast radius.
    pub explosion_radius: f32,
}

/// Rules shared by every entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameplayConfig {
    /// Seconds a dropped resource floats before vanishing.
    pub pickup_life_time: f32,
    /// Collision radius of dropped resources.
    pub pickup_radius: f32,
    /// Fraction of an asteroid's resource kept when it is shot rather than mined.
    pub losses_coef: f32,
    /// Ram damage per unit of momentum.
    pub collision_damage_coef: f32,
    /// Seconds an exploded charge lingers before it is removed.
    pub explosion_time: f32,
    /// Charge levels; a weapon fires the highest level not above its own.
    pub charges: Vec<ChargeConfig>,
}

impl Default for GameplayConfig {
    fn default() -> Self {
        Self {
            pickup_life_time: 30.0,
            pickup_radius: 8.0,
            losses_coef: 0.5,
            collision_damage_coef: 0.01,
            explosion_time: 0.5,
            charges: vec![
                ChargeConfig {
                    level: 0,
                    radius: 4.0,
                    mass: 1.0,
                    speed: 600.0,
                    damage: 10.0,
                    life_time: 2.0,
                    explosion_radius: 30.0,
                },
                ChargeConfig {
                    level: 2,
                    radius: 5.0,
                    mass: 1.5,
                    speed: 700.0,
                    damage: 18.0,
                    life_time: 2.5,
                    explosion_radius: 40.0,
                },
                ChargeConfig {
                    level: 4,
                    radius: 6.0,
                    mass: 2.0,
                    speed: 800.0,
                    damage: 30.0,
                    life_time: 3.0,
                    explosion_radius: 55.0,
                },
            ],
        }
    }
}

impl GameplayConfig {
    /// The charge a weapon of `weapon_level` fires: the highest configured
    /// level not above it.
    #[must_use]
    pub fn charge_for_level(&self, weapon_level: u32) -> Option<&ChargeConfig> {
        self.charges
            .iter()
            .filter(|charge| charge.level <= weapon_level)
            .max_by_key(|charge| charge.level)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.charge_for_level(0).is_none() {
            return Err(ConfigError::Invalid("a level 0 charge must be configured".into()));
        }
        if !(0.0..=1.0).contains(&self.losses_coef) {
            return Err(ConfigError::Invalid("losses_coef must be within 0..=1".into()));
        }
        Ok(())
    }
}

// =============================================================================
// Ships
// =============================================================================

/// Engine limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Speed cap.
    pub max_speed: f32,
    /// Change of speed per second.
    pub acceleration: f32,
    /// Angular speed cap, radians per second.
    pub max_rotation_speed: f32,
    /// Change of angular speed per second.
    pub rotation_acceleration: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_speed: 300.0,
            acceleration: 200.0,
            max_rotation_speed: 3.0,
            rotation_acceleration: 6.0,
        }
    }
}

/// Weapon stats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeaponConfig {
    /// Weapon level; selects the charge fired.
    pub level: u32,
    /// Seconds between shots.
    pub cooldown: f32,
    /// Multiplier on charge damage.
    pub damage_coef: f32,
}

impl Default for WeaponConfig {
    fn default() -> Self {
        Self {
            level: 0,
            cooldown: 0.4,
            damage_coef: 1.0,
        }
    }
}

/// Drill stats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrillConfig {
    /// Mining damage per second.
    pub damage: f32,
    /// Maximum centre-to-centre distance to the target.
    pub range: f32,
}

impl Default for DrillConfig {
    fn default() -> Self {
        Self {
            damage: 5.0,
            range: 150.0,
        }
    }
}

/// Upgrade pricing and effects.
///
/// The price of the next level of any upgrade is `start + step * level`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeConfig {
    /// Price of the first level.
    pub start: Cargo,
    /// Price increase per level.
    pub step: Cargo,
    /// Highest level any upgrade can reach.
    pub max_level: u32,
    /// Fraction of base max health added per level.
    pub health_step: f32,
    /// Armour added per level.
    pub armor_step: f32,
    /// Fraction of base damage added per weapon level.
    pub weapon_damage_step: f32,
    /// Fraction of base max speed added per engine level.
    pub engine_speed_step: f32,
    /// Fraction of base drill damage added per level.
    pub drill_damage_step: f32,
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        use crate::entity::ResourceKind;
        Self {
            start: Cargo::from_pairs(&[(ResourceKind::Gold, 10.0)]),
            step: Cargo::from_pairs(&[(ResourceKind::Gold, 5.0), (ResourceKind::Mithril, 2.0)]),
            max_level: 5,
            health_step: 0.2,
            armor_step: 1.0,
            weapon_damage_step: 0.25,
            engine_speed_step: 0.1,
            drill_damage_step: 0.3,
        }
    }
}

/// Template for building ships.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipConfig {
    /// Collision radius.
    pub radius: f32,
    /// Mass.
    pub mass: f32,
    /// Starting and maximum health.
    pub max_health: f32,
    /// Starting armour.
    pub armor: f32,
    /// Engine stats.
    pub engine: EngineConfig,
    /// Weapon stats.
    pub weapon: WeaponConfig,
    /// Drill stats.
    pub drill: DrillConfig,
    /// Upgrade pricing.
    pub upgrades: UpgradeConfig,
}

impl Default for ShipConfig {
    fn default() -> Self {
        Self {
            radius: 20.0,
            mass: 10.0,
            max_health: 100.0,
            armor: 0.0,
            engine: EngineConfig::default(),
            weapon: WeaponConfig::default(),
            drill: DrillConfig::default(),
            upgrades: UpgradeConfig::default(),
        }
    }
}
