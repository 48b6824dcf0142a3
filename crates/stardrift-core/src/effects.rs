//! Commands and events emitted by entity logic.
//!
//! Entities never reach into other entities. During an update or a
//! collision they push a [`Command`] describing the change they want; the
//! world applies queued commands after the update pass and again after the
//! physics step. Things that *happened* are reported as [`Event`]s, which
//! accumulate until a subscriber drains them with
//! [`World::drain_events`](crate::World::drain_events), once per tick.
//!
//! # Example
//!
//! ```
//! use stardrift_core::effects::{Command, EffectQueue, Event};
//! use stardrift_core::entity::{EntityId, EntityKind};
//!
//! let mut queue = EffectQueue::new();
//! queue.push(Command::Damage {
//!     target: EntityId::new(2),
//!     amount: 5.0,
//!     sender: EntityId::new(1),
//! });
//! queue.emit(Event::Destroyed { id: EntityId::new(3), kind: EntityKind::Asteroid });
//!
//! assert_eq!(queue.take_commands().len(), 1);
//! assert_eq!(queue.take_events().len(), 1);
//! assert!(queue.is_empty());
//! ```

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::cluster::ClusterCoord;
use crate::config::GameplayConfig;
use crate::directory::EntityDirectory;
use crate::entity::{Entity, EntityId, EntityKind, Resource};

// =============================================================================
// Commands
// =============================================================================

/// A state change requested by entity logic, applied by the world.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// File a new entity into the world.
    Spawn(Box<Entity>),
    /// Damage one entity.
    Damage {
        /// Entity to damage.
        target: EntityId,
        /// Raw damage before armour.
        amount: f32,
        /// Entity credited with the damage.
        sender: EntityId,
    },
    /// Drill into an asteroid.
    Mine {
        /// Ship doing the drilling.
        miner: EntityId,
        /// Asteroid being drilled.
        target: EntityId,
        /// Mining damage for this tick.
        amount: f32,
        /// Maximum centre-to-centre distance.
        range: f32,
    },
    /// Damage everything within a radius.
    Explode {
        /// The exploding entity.
        source: EntityId,
        /// Entity credited with the damage if it is still tracked.
        owner: Option<EntityId>,
        /// Blast centre.
        center: Vec2,
        /// Blast radius.
        radius: f32,
        /// Damage dealt to each entity hit.
        damage: f32,
    },
    /// Move a pickup's resource into a ship's cargo hold.
    Collect {
        /// Ship collecting.
        collector: EntityId,
        /// Pickup being collected.
        pickup: EntityId,
    },
}

impl Command {
    /// Returns the entity this command acts on, if it names one.
    #[must_use]
    pub fn target(&self) -> Option<EntityId> {
        match self {
            Self::Spawn(entity) => Some(entity.id()),
            Self::Damage { target, .. } | Self::Mine { target, .. } => Some(*target),
            Self::Explode { .. } => None,
            Self::Collect { pickup, .. } => Some(*pickup),
        }
    }
}

// =============================================================================
// Events
// =============================================================================

/// A notification of something that happened during a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// A cluster was generated on first visit.
    ClusterGenerated {
        /// Cluster coordinate.
        coord: ClusterCoord,
        /// Entities it was populated with.
        entities: usize,
    },
    /// An entity was filed into the world.
    Spawned {
        /// The new entity.
        id: EntityId,
        /// Its kind.
        kind: EntityKind,
    },
    /// An entity left the world.
    Removed {
        /// The removed entity.
        id: EntityId,
    },
    /// Damage was dealt.
    Damaged {
        /// Entity hit.
        target: EntityId,
        /// Damage actually taken.
        amount: f32,
        /// Entity credited.
        sender: EntityId,
    },
    /// A ship or asteroid was destroyed.
    Destroyed {
        /// The destroyed entity.
        id: EntityId,
        /// Its kind.
        kind: EntityKind,
    },
    /// A ship fired its weapon.
    WeaponFired {
        /// The ship.
        shooter: EntityId,
        /// The charge it launched.
        charge: EntityId,
    },
    /// A charge detonated.
    Exploded {
        /// The charge.
        source: EntityId,
        /// Blast centre.
        center: Vec2,
        /// Blast radius.
        radius: f32,
    },
    /// A ship picked up a resource.
    ResourceCollected {
        /// The ship.
        collector: EntityId,
        /// What it gained.
        resource: Resource,
    },
}

impl Event {
    /// Returns the primary entity involved in this event.
    #[must_use]
    pub fn primary_entity(&self) -> Option<EntityId> {
        match self {
            Self::ClusterGenerated { .. } => None,
            Self::Spawned { id, .. } | Self::Removed { id } | Self::Destroyed { id, .. } => {
                Some(*id)
            }
            Self::Damaged { target, .. } => Some(*target),
            Self::WeaponFired { shooter, .. } => Some(*shooter),
            Self::Exploded { source, .. } => Some(*source),
            Self::ResourceCollected { collector, .. } => Some(*collector),
        }
    }
}

// =============================================================================
// Queue
// =============================================================================

/// Pending commands and undelivered events.
#[derive(Debug, Clone, Default)]
pub struct EffectQueue {
    commands: Vec<Command>,
    events: Vec<Event>,
}

impl EffectQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a command.
    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Records an event.
    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Drains queued commands in push order.
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    /// Drains recorded events in emission order.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Recorded events not yet drained.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Number of queued commands.
    #[must_use]
    pub fn pending_commands(&self) -> usize {
        self.commands.len()
    }

    /// True if there is nothing queued or recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.events.is_empty()
    }
}

/// What entity logic may touch while updating or colliding.
#[derive(Debug)]
pub struct TickContext<'a> {
    /// Where commands and events go.
    pub effects: &'a mut EffectQueue,
    /// Id allocation and membership lookups.
    pub directory: &'a mut EntityDirectory,
    /// Shared rules.
    pub gameplay: &'a GameplayConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_drain_in_push_order() {
        let mut queue = EffectQueue::new();
        for i in 0..3 {
            queue.push(Command::Collect {
                collector: EntityId::new(0),
                pickup: EntityId::new(i),
            });
        }
        assert_eq!(queue.pending_commands(), 3);
        let targets: Vec<_> = queue.take_commands().iter().filter_map(Command::target).collect();
        assert_eq!(targets, vec![EntityId::new(0), EntityId::new(1), EntityId::new(2)]);
        assert_eq!(queue.pending_commands(), 0);
    }

    #[test]
    fn explode_has_no_single_target() {
        let command = Command::Explode {
            source: EntityId::new(1),
            owner: None,
            center: Vec2::ZERO,
            radius: 10.0,
            damage: 1.0,
        };
        assert_eq!(command.target(), None);
    }

    #[test]
    fn events_report_primary_entity() {
        let event = Event::WeaponFired {
            shooter: EntityId::new(4),
            charge: EntityId::new(5),
        };
        assert_eq!(event.primary_entity(), Some(EntityId::new(4)));
        let generated = Event::ClusterGenerated {
            coord: ClusterCoord::new(0, 0),
            entities: 3,
        };
        assert_eq!(generated.primary_entity(), None);
    }
}
