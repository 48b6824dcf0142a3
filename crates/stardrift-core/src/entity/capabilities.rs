//! Independent building blocks that entity variants are composed from.
//!
//! Each type here owns one concern (health, a countdown, a resource stock)
//! and knows nothing about the entity that carries it.

use std::collections::BTreeMap;
use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

// =============================================================================
// Capability Set
// =============================================================================

bitflags! {
    /// Capabilities a ship is assembled from.
    ///
    /// Used when building a ship from a [`ShipConfig`](crate::config::ShipConfig)
    /// and reported back by [`ShipComponents::capabilities`](super::ShipComponents::capabilities).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Capabilities: u8 {
        /// Can accelerate and turn.
        const ENGINE = 1 << 0;
        /// Can fire blaster charges.
        const WEAPON = 1 << 1;
        /// Can mine asteroids.
        const DRILL = 1 << 2;
        /// Can buy upgrades with cargo.
        const UPGRADES = 1 << 3;
        /// Has a health track and can be destroyed.
        const HEALTH = 1 << 4;
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::ENGINE | Self::HEALTH | Self::UPGRADES
    }
}

// =============================================================================
// Resources
// =============================================================================

/// Kinds of minable resource.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Gold.
    Gold,
    /// Eternium.
    Eternium,
    /// Infinitum.
    Infinitum,
    /// Mithril.
    Mithril,
    /// Crystallium.
    Crystallium,
}

impl ResourceKind {
    /// Every resource kind, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Gold,
        Self::Eternium,
        Self::Infinitum,
        Self::Mithril,
        Self::Crystallium,
    ];
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Gold => "gold",
            Self::Eternium => "eternium",
            Self::Infinitum => "infinitum",
            Self::Mithril => "mithril",
            Self::Crystallium => "crystallium",
        };
        f.write_str(name)
    }
}

/// A quantity of one resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// What is carried.
    pub kind: ResourceKind,
    /// How much of it.
    pub quantity: f32,
}

impl Resource {
    /// Creates a resource stack.
    #[must_use]
    pub const fn new(kind: ResourceKind, quantity: f32) -> Self {
        Self { kind, quantity }
    }

    /// Returns the same kind with the quantity multiplied by `factor`.
    #[must_use]
    pub fn scaled(self, factor: f32) -> Self {
        Self {
            quantity: self.quantity * factor,
            ..self
        }
    }
}

/// A mixed stock of resources, used for ship holds and upgrade prices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cargo {
    amounts: BTreeMap<ResourceKind, f32>,
}

impl Cargo {
    /// Creates an empty stock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a stock from `(kind, quantity)` pairs; repeated kinds add up.
    #[must_use]
    pub fn from_pairs(pairs: &[(ResourceKind, f32)]) -> Self {
        let mut cargo = Self::new();
        for &(kind, quantity) in pairs {
            cargo.add(Resource::new(kind, quantity));
        }
        cargo
    }

    /// Quantity held of `kind`.
    #[must_use]
    pub fn amount(&self, kind: ResourceKind) -> f32 {
        self.amounts.get(&kind).copied().unwrap_or(0.0)
    }

    /// Adds a resource stack.
    pub fn add(&mut self, resource: Resource) {
        *self.amounts.entry(resource.kind).or_insert(0.0) += resource.quantity;
    }

    /// Returns true if every quantity in `price` is covered.
    #[must_use]
    pub fn can_afford(&self, price: &Cargo) -> bool {
        price
            .amounts
            .iter()
            .all(|(kind, quantity)| self.amount(*kind) >= *quantity)
    }

    /// Removes `price` from the stock if affordable; returns whether it was.
    pub fn pay(&mut self, price: &Cargo) -> bool {
        if !self.can_afford(price) {
            return false;
        }
        for (kind, quantity) in &price.amounts {
            *self.amounts.entry(*kind).or_insert(0.0) -= quantity;
        }
        true
    }

    /// Element-wise sum.
    #[must_use]
    pub fn plus(&self, other: &Cargo) -> Cargo {
        let mut sum = self.clone();
        for (kind, quantity) in &other.amounts {
            sum.add(Resource::new(*kind, *quantity));
        }
        sum
    }

    /// Every quantity multiplied by `factor`.
    #[must_use]
    pub fn scaled(&self, factor: f32) -> Cargo {
        Cargo {
            amounts: self
                .amounts
                .iter()
                .map(|(kind, quantity)| (*kind, quantity * factor))
                .collect(),
        }
    }

    /// Total quantity across all kinds.
    #[must_use]
    pub fn total(&self) -> f32 {
        self.amounts.values().sum()
    }
}

// =============================================================================
// Life Tracks
// =============================================================================

/// Hit points with armour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthTrack {
    /// Current health.
    pub health: f32,
    /// Upper bound for healing.
    pub max_health: f32,
    /// Flat reduction applied to every hit.
    pub armor: f32,
}

impl HealthTrack {
    /// Full health with no armour.
    #[must_use]
    pub const fn full(max_health: f32) -> Self {
        Self {
            health: max_health,
            max_health,
            armor: 0.0,
        }
    }

    /// Applies a hit, reduced by armour; health never drops below zero.
    ///
    /// Returns the damage actually taken.
    pub fn decrease(&mut self, damage: f32) -> f32 {
        let taken = (damage - self.armor).max(0.0).min(self.health);
        self.health -= taken;
        taken
    }

    /// Heals, capped at `max_health`.
    pub fn increase(&mut self, healing: f32) {
        self.health = (self.health + healing).min(self.max_health);
    }

    /// Alive while health is positive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    /// Health as a fraction of maximum.
    #[must_use]
    pub fn fullness(&self) -> f32 {
        if self.max_health > 0.0 {
            self.health / self.max_health
        } else {
            0.0
        }
    }
}

/// A countdown for temporary objects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lifetime {
    /// Seconds left.
    pub life_time: f32,
}

impl Lifetime {
    /// Starts a countdown.
    #[must_use]
    pub const fn new(life_time: f32) -> Self {
        Self { life_time }
    }

    /// Counts down by `dt`, stopping at zero.
    pub fn decrease(&mut self, dt: f32) {
        self.life_time = (self.life_time - dt).max(0.0);
    }

    /// Ends the countdown immediately.
    pub fn expire(&mut self) {
        self.life_time = 0.0;
    }

    /// Alive while time remains.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.life_time > 0.0
    }
}

/// Structural and mining integrity of an asteroid.
///
/// An asteroid dies either by being shot apart (`health` reaches zero) or by
/// being drilled out (`mining_health` reaches zero).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AsteroidLife {
    /// Structural integrity.
    pub health: f32,
    /// Initial structural integrity.
    pub max_health: f32,
    /// Remaining minable material.
    pub mining_health: f32,
    /// Initial minable material.
    pub max_mining_health: f32,
}

impl AsteroidLife {
    /// Fresh asteroid with both tracks full.
    #[must_use]
    pub const fn new(health: f32, mining_health: f32) -> Self {
        Self {
            health,
            max_health: health,
            mining_health,
            max_mining_health: mining_health,
        }
    }

    /// Structural damage.
    pub fn decrease(&mut self, damage: f32) {
        self.health = (self.health - damage).max(0.0);
    }

    /// Drilling damage.
    pub fn decrease_by_mining(&mut self, damage: f32) {
        self.mining_health = (self.mining_health - damage).max(0.0);
    }

    /// Drilled out.
    #[must_use]
    pub fn is_mined(&self) -> bool {
        self.mining_health <= 0.0
    }

    /// Shot apart.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.health <= 0.0
    }

    /// Neither mined nor destroyed.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !(self.is_mined() || self.is_destroyed())
    }
}

/// Allegiance of a ship and the charges it fires.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    /// Belongs to no one.
    #[default]
    Neutral,
    /// The player's side.
    Player,
    /// Hostile ships.
    Hostile,
}

#[cfg(test)]
mod tests {
    use super::*;

    mod cargo_tests {
        use super::*;

        #[test]
        fn add_accumulates_per_kind() {
            let mut cargo = Cargo::new();
            cargo.add(Resource::new(ResourceKind::Gold, 3.0));
            cargo.add(Resource::new(ResourceKind::Gold, 2.0));
            cargo.add(Resource::new(ResourceKind::Mithril, 1.0));
            assert!((cargo.amount(ResourceKind::Gold) - 5.0).abs() < 1e-6);
            assert!((cargo.total() - 6.0).abs() < 1e-6);
            assert_eq!(cargo.amount(ResourceKind::Eternium), 0.0);
        }

        #[test]
        fn pay_requires_every_kind() {
            let mut cargo = Cargo::from_pairs(&[(ResourceKind::Gold, 10.0)]);
            let price = Cargo::from_pairs(&[(ResourceKind::Gold, 4.0), (ResourceKind::Mithril, 1.0)]);
            assert!(!cargo.pay(&price));
            assert!((cargo.amount(ResourceKind::Gold) - 10.0).abs() < 1e-6);

            cargo.add(Resource::new(ResourceKind::Mithril, 1.0));
            assert!(cargo.pay(&price));
            assert!((cargo.amount(ResourceKind::Gold) - 6.0).abs() < 1e-6);
            assert!(cargo.amount(ResourceKind::Mithril).abs() < 1e-6);
        }

        #[test]
        fn plus_and_scaled() {
            let base = Cargo::from_pairs(&[(ResourceKind::Gold, 2.0)]);
            let step = Cargo::from_pairs(&[(ResourceKind::Gold, 1.0), (ResourceKind::Infinitum, 0.5)]);
            let price = base.plus(&step.scaled(2.0));
            assert!((price.amount(ResourceKind::Gold) - 4.0).abs() < 1e-6);
            assert!((price.amount(ResourceKind::Infinitum) - 1.0).abs() < 1e-6);
        }

        #[test]
        fn serializes_as_plain_map() {
            let cargo = Cargo::from_pairs(&[(ResourceKind::Crystallium, 1.5)]);
            let json = serde_json::to_string(&cargo).unwrap();
            assert_eq!(json, r#"{"crystallium":1.5}"#);
        }
    }

    mod life_tests {
        use super::*;

        #[test]
        fn health_floors_at_zero_and_respects_armor() {
            let mut track = HealthTrack {
                armor: 2.0,
                ..HealthTrack::full(10.0)
            };
            assert!((track.decrease(5.0) - 3.0).abs() < 1e-6);
            assert!((track.health - 7.0).abs() < 1e-6);
            assert!(track.decrease(1.0).abs() < 1e-6);
            track.decrease(100.0);
            assert_eq!(track.health, 0.0);
            assert!(!track.is_alive());
        }

        #[test]
        fn healing_is_capped() {
            let mut track = HealthTrack::full(10.0);
            track.decrease(4.0);
            track.increase(100.0);
            assert!((track.fullness() - 1.0).abs() < 1e-6);
        }

        #[test]
        fn lifetime_counts_down() {
            let mut life = Lifetime::new(1.0);
            life.decrease(0.4);
            assert!(life.is_alive());
            life.decrease(0.7);
            assert!(!life.is_alive());
            assert_eq!(life.life_time, 0.0);
        }

        #[test]
        fn asteroid_dies_either_way() {
            let mut shot = AsteroidLife::new(5.0, 5.0);
            shot.decrease(6.0);
            assert!(shot.is_destroyed() && !shot.is_mined() && !shot.is_alive());

            let mut drilled = AsteroidLife::new(5.0, 5.0);
            drilled.decrease_by_mining(2.0);
            assert!(drilled.is_alive());
            drilled.decrease_by_mining(3.0);
            assert!(drilled.is_mined() && !drilled.is_destroyed());
        }
    }

    #[test]
    fn default_capabilities() {
        let caps = Capabilities::default();
        assert!(caps.contains(Capabilities::ENGINE | Capabilities::HEALTH));
        assert!(!caps.contains(Capabilities::WEAPON));
    }
}
