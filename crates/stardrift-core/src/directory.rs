//! Id allocation and cross-reference lookup for live entities.
//!
//! The directory maps every *active* entity id to the cluster that currently
//! owns it. Entities hold each other by plain [`EntityId`]; resolving a
//! reference means asking the directory where the target lives and then
//! borrowing it from that cluster.
//!
//! Deactivating an entity removes it from the directory immediately, so a
//! dangling reference fails to resolve instead of reaching a dead entity.

use std::collections::BTreeMap;

use crate::cluster::ClusterCoord;
use crate::entity::EntityId;

/// Registry of live entities, owned by one world.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityDirectory {
    next_id: u64,
    locations: BTreeMap<EntityId, ClusterCoord>,
}

impl EntityDirectory {
    /// Creates an empty directory whose first allocated id is zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out a fresh id. Ids are never recycled.
    ///
    /// The counter saturates at `u64::MAX`.
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    /// Makes sure future allocations never return `id`.
    ///
    /// Returns `false`, leaving the counter untouched, if no id follows `id`.
    pub fn reserve(&mut self, id: EntityId) -> bool {
        match id.as_u64().checked_add(1) {
            Some(next) => {
                self.next_id = self.next_id.max(next);
                true
            }
            None => false,
        }
    }

    /// The id the next [`allocate`](Self::allocate) will return.
    #[must_use]
    pub fn peek_next(&self) -> EntityId {
        EntityId::new(self.next_id)
    }

    /// Records `id` as living in `coord`, returning its previous location.
    pub fn insert(&mut self, id: EntityId, coord: ClusterCoord) -> Option<ClusterCoord> {
        self.reserve(id);
        self.locations.insert(id, coord)
    }

    /// Forgets `id`, returning where it lived.
    pub fn remove(&mut self, id: EntityId) -> Option<ClusterCoord> {
        self.locations.remove(&id)
    }

    /// Cluster currently owning `id`.
    #[must_use]
    pub fn locate(&self, id: EntityId) -> Option<ClusterCoord> {
        self.locations.get(&id).copied()
    }

    /// True if `id` is live.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.locations.contains_key(&id)
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// True if no entity is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Live ids, ascending.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.locations.keys().copied()
    }
}
