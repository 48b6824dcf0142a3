//! Procedural cluster content.
//!
//! A [`ClusterGenerator`] is asked for content the first time a coordinate
//! is visited. The default [`AsteroidFieldGenerator`] scatters asteroids
//! using a random source seeded from the world seed and the coordinate, so
//! the same seed always produces the same field regardless of the order in
//! which clusters are discovered.

use std::f32::consts::PI;
use std::fmt;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::cluster::{Cluster, ClusterCoord};
use crate::config::GenerationConfig;
use crate::directory::EntityDirectory;
use crate::entity::{Entity, Resource, ResourceKind};
use crate::store::ClusterStore;

/// Produces content for undiscovered clusters.
///
/// Implementations must return a cluster for `coord` and may return
/// neighbours as well; the store never overwrites clusters it already has.
/// Entity ids must come from `directory`.
pub trait ClusterGenerator: fmt::Debug + Send {
    /// Builds the cluster at `coord` and any neighbours it wants to seed.
    fn generate_clusters(
        &self,
        coord: ClusterCoord,
        store: &ClusterStore,
        directory: &mut EntityDirectory,
    ) -> Vec<Cluster>;
}

/// Generator that produces empty clusters.
#[derive(Debug, Clone, Copy, Default)]
pub struct VoidGenerator;

impl ClusterGenerator for VoidGenerator {
    fn generate_clusters(
        &self,
        coord: ClusterCoord,
        store: &ClusterStore,
        _directory: &mut EntityDirectory,
    ) -> Vec<Cluster> {
        vec![Cluster::new(coord, store.cluster_size())]
    }
}

/// Scatters a random number of asteroids across each new cluster.
#[derive(Debug, Clone)]
pub struct AsteroidFieldGenerator {
    seed: u64,
    config: GenerationConfig,
}

impl AsteroidFieldGenerator {
    /// Creates a generator for a world seed.
    #[must_use]
    pub fn new(seed: u64, config: GenerationConfig) -> Self {
        Self { seed, config }
    }

    /// The random source for one cluster.
    #[must_use]
    pub fn rng_for(&self, coord: ClusterCoord) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(cell_seed(self.seed, coord))
    }

    fn random_position(rng: &mut ChaCha8Rng, origin: Vec2, size: Vec2, radius: f32) -> Vec2 {
        let axis = |rng: &mut ChaCha8Rng, extent: f32| {
            if extent > 2.0 * radius {
                rng.gen_range(radius..extent - radius)
            } else {
                extent / 2.0
            }
        };
        let x = axis(rng, size.x);
        let y = axis(rng, size.y);
        origin + Vec2::new(x, y)
    }
}

impl ClusterGenerator for AsteroidFieldGenerator {
    fn generate_clusters(
        &self,
        coord: ClusterCoord,
        store: &ClusterStore,
        directory: &mut EntityDirectory,
    ) -> Vec<Cluster> {
        let size = store.cluster_size();
        let origin = coord.origin(size);
        let mut rng = self.rng_for(coord);
        let mut cluster = Cluster::new(coord, size);

        let count = rng.gen_range(self.config.asteroids_min..=self.config.asteroids_max);
        for _ in 0..count {
            let radius = rng.gen_range(self.config.radius_min..=self.config.radius_max);
            let position = Self::random_position(&mut rng, origin, size, radius);
            let kind = ResourceKind::ALL[rng.gen_range(0..ResourceKind::ALL.len())];
            let quantity = rng.gen_range(self.config.resource_min..=self.config.resource_max);
            let mut asteroid = Entity::asteroid(
                directory.allocate(),
                position,
                radius,
                Resource::new(kind, quantity),
                &self.config,
            );
            asteroid.body_mut().angle = rng.gen_range(0.0..2.0 * PI);
            cluster.add_entity(asteroid);
        }
        vec![cluster]
    }
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[allow(clippy::cast_sign_loss)]
fn cell_seed(seed: u64, coord: ClusterCoord) -> u64 {
    let x = u64::from(coord.x as u32);
    let y = u64::from(coord.y as u32);
    splitmix64(splitmix64(seed ^ splitmix64(x)) ^ ((y << 1) | 1))
}
