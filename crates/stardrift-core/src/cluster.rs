//! Spatial cells.
//!
//! The world is tiled by fixed-size rectangular [`Cluster`]s addressed by
//! integer [`ClusterCoord`]s. A cluster owns every entity whose position
//! currently maps to its coordinate; the world keeps that true by
//! re-filing entities after each physics step.

use std::collections::BTreeMap;
use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use stardrift_physics::Space;

use crate::effects::TickContext;
use crate::entity::{Entity, EntityId};
use crate::render::{Camera, Renderer};

/// Integer address of a cluster.
///
/// Ordered row-major by `y` then `x`, which is the order clusters are
/// updated, saved and re-filed in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClusterCoord {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl PartialOrd for ClusterCoord {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ClusterCoord {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.y, self.x).cmp(&(other.y, other.x))
    }
}

impl ClusterCoord {
    /// Creates a coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The cluster containing `position`, using floor division so negative
    /// positions land in negative clusters.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn of(position: Vec2, cluster_size: Vec2) -> Self {
        let cell = (position / cluster_size).floor();
        Self::new(cell.x as i32, cell.y as i32)
    }

    /// World-space corner with the smallest coordinates.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn origin(self, cluster_size: Vec2) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32) * cluster_size
    }

    /// Every coordinate within Chebyshev distance `radius`, in ascending order.
    ///
    /// Coordinates saturate at the `i32` range, so at the edge of the map
    /// the outermost cells repeat.
    pub fn neighbourhood(self, radius: i32) -> impl Iterator<Item = ClusterCoord> {
        let radius = radius.max(0);
        (-radius..=radius).flat_map(move |dy| {
            (-radius..=radius)
                .map(move |dx| ClusterCoord::new(self.x.saturating_add(dx), self.y.saturating_add(dy)))
        })
    }
}

impl fmt::Display for ClusterCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A cell of the world and the entities inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    coord: ClusterCoord,
    size: Vec2,
    entities: BTreeMap<EntityId, Entity>,
}

impl Cluster {
    /// Creates an empty cluster.
    #[must_use]
    pub fn new(coord: ClusterCoord, size: Vec2) -> Self {
        Self {
            coord,
            size,
            entities: BTreeMap::new(),
        }
    }

    /// This cluster's coordinate.
    #[must_use]
    pub fn coord(&self) -> ClusterCoord {
        self.coord
    }

    /// Cell width and height.
    #[must_use]
    pub fn size(&self) -> Vec2 {
        self.size
    }

    /// Files `entity` here. Returns false, leaving the cluster unchanged, if
    /// an entity with the same id is already present.
    pub fn add_entity(&mut self, entity: Entity) -> bool {
        if self.entities.contains_key(&entity.id()) {
            return false;
        }
        self.entities.insert(entity.id(), entity);
        true
    }

    /// Takes an entity out of the cluster.
    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    /// Looks up an entity.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Looks up an entity mutably.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Entities in id order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Entities in id order, mutably.
    pub fn entities_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    /// True if `id` is filed here.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Number of filed entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True when nothing is filed here.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }

    /// Entities whose position now maps to another cluster, with the
    /// cluster they belong in.
    #[must_use]
    pub fn extra_entities(&self) -> Vec<(EntityId, ClusterCoord)> {
        self.entities
            .values()
            .filter_map(|entity| {
                let actual = ClusterCoord::of(entity.position(), self.size);
                (actual != self.coord).then_some((entity.id(), actual))
            })
            .collect()
    }

    /// Entities still registered in physics although no longer alive.
    #[must_use]
    pub fn dead_entities(&self) -> Vec<EntityId> {
        self.entities
            .values()
            .filter(|entity| !entity.is_alive() && entity.in_space())
            .map(Entity::id)
            .collect()
    }

    /// Removes and returns every inactive entity.
    pub fn pop_inactive_entities(&mut self) -> Vec<Entity> {
        let inactive: Vec<EntityId> = self
            .entities
            .values()
            .filter(|entity| !entity.is_active())
            .map(Entity::id)
            .collect();
        inactive
            .into_iter()
            .filter_map(|id| self.entities.remove(&id))
            .collect()
    }

    /// Adds every alive, active entity to `space`; returns how many were added.
    pub fn add_to_space(&mut self, space: &mut Space) -> usize {
        self.entities
            .values_mut()
            .filter(|entity| entity.is_alive() && entity.is_active())
            .map(|entity| usize::from(entity.add_to_space(space)))
            .sum()
    }

    /// Removes every entity from `space`; returns how many were registered.
    pub fn remove_from_space(&mut self, space: &mut Space) -> usize {
        self.entities
            .values_mut()
            .map(|entity| usize::from(entity.remove_from_space(space)))
            .sum()
    }

    /// Advances every entity's domain logic.
    pub fn update(&mut self, dt: f32, ctx: &mut TickContext<'_>) {
        for entity in self.entities.values_mut() {
            entity.update(dt, ctx);
        }
    }

    /// Draws the cluster, then its active entities.
    pub fn render(&self, renderer: &mut dyn Renderer, camera: &Camera) {
        renderer.draw_cluster(self, camera);
        for entity in self.entities.values().filter(|entity| entity.is_active()) {
            renderer.draw_entity(entity, camera);
        }
    }
}
