//! Sparse cluster storage with lazy generation.

use std::collections::BTreeMap;

use glam::Vec2;
use tracing::debug;

use crate::cluster::{Cluster, ClusterCoord};
use crate::directory::EntityDirectory;
use crate::entity::{Entity, EntityId};
use crate::generator::ClusterGenerator;

/// Sparse map from coordinates to clusters.
///
/// [`get`](Self::get) never reports a missing cluster: unknown coordinates
/// are filled in by the generator on first access. The read-only accessors
/// never generate.
///
/// Two stores are equal when they hold the same coordinates and each pair
/// of clusters is structurally equal; generators are not compared.
#[derive(Debug)]
pub struct ClusterStore {
    cluster_size: Vec2,
    clusters: BTreeMap<ClusterCoord, Cluster>,
    generator: Box<dyn ClusterGenerator>,
}

impl PartialEq for ClusterStore {
    fn eq(&self, other: &Self) -> bool {
        self.cluster_size == other.cluster_size && self.clusters == other.clusters
    }
}

impl ClusterStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(cluster_size: Vec2, generator: Box<dyn ClusterGenerator>) -> Self {
        Self {
            cluster_size,
            clusters: BTreeMap::new(),
            generator,
        }
    }

    /// Width and height of every cluster.
    #[must_use]
    pub fn cluster_size(&self) -> Vec2 {
        self.cluster_size
    }

    /// Coordinate of the cluster containing `position`.
    #[must_use]
    pub fn coord_of(&self, position: Vec2) -> ClusterCoord {
        ClusterCoord::of(position, self.cluster_size)
    }

    /// Returns the cluster at `coord`, generating it on first access.
    ///
    /// Generated entities are recorded in `directory`. Clusters the
    /// generator returns for other coordinates are kept unless already
    /// present.
    pub fn get(&mut self, coord: ClusterCoord, directory: &mut EntityDirectory) -> &mut Cluster {
        if !self.clusters.contains_key(&coord) {
            self.generate(coord, directory);
        }
        let size = self.cluster_size;
        self.clusters
            .entry(coord)
            .or_insert_with(|| Cluster::new(coord, size))
    }

    fn generate(&mut self, coord: ClusterCoord, directory: &mut EntityDirectory) {
        let generated = self.generator.generate_clusters(coord, self, directory);
        for cluster in generated {
            let key = cluster.coord();
            if self.clusters.contains_key(&key) {
                continue;
            }
            for id in cluster.ids() {
                directory.insert(id, key);
            }
            debug!(cluster = %key, entities = cluster.len(), "cluster generated");
            self.clusters.insert(key, cluster);
        }
    }

    /// The cluster at `coord`, if it exists. Never generates.
    #[must_use]
    pub fn cluster(&self, coord: ClusterCoord) -> Option<&Cluster> {
        self.clusters.get(&coord)
    }

    /// Mutable cluster at `coord`, if it exists. Never generates.
    pub fn cluster_mut(&mut self, coord: ClusterCoord) -> Option<&mut Cluster> {
        self.clusters.get_mut(&coord)
    }

    /// Entity `id` filed in `coord`.
    #[must_use]
    pub fn entity(&self, coord: ClusterCoord, id: EntityId) -> Option<&Entity> {
        self.clusters.get(&coord)?.entity(id)
    }

    /// Mutable entity `id` filed in `coord`.
    pub fn entity_mut(&mut self, coord: ClusterCoord, id: EntityId) -> Option<&mut Entity> {
        self.clusters.get_mut(&coord)?.entity_mut(id)
    }

    /// True if a cluster exists at `coord`.
    #[must_use]
    pub fn exists(&self, coord: ClusterCoord) -> bool {
        self.clusters.contains_key(&coord)
    }

    /// True if `entity` is filed in the cluster its position maps to.
    #[must_use]
    pub fn contains(&self, entity: &Entity) -> bool {
        self.cluster(self.coord_of(entity.position()))
            .is_some_and(|cluster| cluster.contains(entity.id()))
    }

    /// Stores `cluster`, returning any cluster it replaced.
    pub fn insert(&mut self, cluster: Cluster) -> Option<Cluster> {
        self.clusters.insert(cluster.coord(), cluster)
    }

    /// Known coordinates in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = ClusterCoord> + '_ {
        self.clusters.keys().copied()
    }

    /// Known clusters in coordinate order.
    pub fn clusters(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.values()
    }

    /// Number of known clusters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    /// True before any cluster has been generated or loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Entities across all clusters.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.clusters.values().map(Cluster::len).sum()
    }
}
