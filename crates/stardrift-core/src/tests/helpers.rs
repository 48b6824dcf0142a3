//! World and entity factories shared by the scenario tests.

use glam::Vec2;

use crate::config::WorldConfig;
use crate::entity::{Capabilities, Entity, EntityId, Resource, ResourceKind, Team};
use crate::generator::VoidGenerator;
use crate::world::World;

/// 100×100 clusters, vision radius 1, empty generation.
pub fn small_config() -> WorldConfig {
    WorldConfig {
        cluster_size: Vec2::splat(100.0),
        vision_radius: 1,
        ..WorldConfig::default()
    }
}

/// An empty world on [`small_config`].
pub fn empty_world() -> World {
    World::with_generator(small_config(), Box::new(VoidGenerator)).expect("valid config")
}

/// A world on [`small_config`] that scatters asteroids from `seed`.
pub fn seeded_world(seed: u64) -> World {
    World::new(WorldConfig {
        seed,
        ..small_config_with_small_rocks()
    })
    .expect("valid config")
}

fn small_config_with_small_rocks() -> WorldConfig {
    let mut config = small_config();
    config.generation.asteroids_min = 1;
    config.generation.asteroids_max = 3;
    config.generation.radius_min = 1.0;
    config.generation.radius_max = 2.0;
    config
}

/// Files a fully fitted player ship at `position`.
pub fn spawn_ship(world: &mut World, position: Vec2) -> EntityId {
    let id = world.allocate_id();
    let template = world.config().ship.clone();
    world
        .add_entity(Entity::ship(id, position, &template, Capabilities::all(), Team::Player))
        .expect("fresh id")
}

/// Files an asteroid at `position`.
pub fn spawn_asteroid(world: &mut World, position: Vec2, radius: f32) -> EntityId {
    let id = world.allocate_id();
    let generation = world.config().generation.clone();
    world
        .add_entity(Entity::asteroid(
            id,
            position,
            radius,
            Resource::new(ResourceKind::Gold, 10.0),
            &generation,
        ))
        .expect("fresh id")
}

/// Files a blaster charge fired by `owner` flying along `angle`.
pub fn spawn_charge(world: &mut World, owner: EntityId, position: Vec2, angle: f32) -> EntityId {
    let id = world.allocate_id();
    let charge = world.config().gameplay.charges[0].clone();
    world
        .add_entity(Entity::blaster_charge(id, owner, Team::Player, position, angle, &charge, 1.0))
        .expect("fresh id")
}

/// Every filed entity in `world` with the cluster it is filed in.
pub fn filed_entities(world: &World) -> Vec<(crate::cluster::ClusterCoord, &Entity)> {
    world
        .store()
        .clusters()
        .flat_map(|cluster| cluster.entities().map(move |entity| (cluster.coord(), entity)))
        .collect()
}

/// Checks the physics membership invariant for every filed entity.
pub fn assert_physics_membership(world: &World) {
    for (coord, entity) in filed_entities(world) {
        let expected = entity.is_alive() && entity.is_active() && world.is_active(coord);
        assert_eq!(
            entity.in_space(),
            expected,
            "entity {} in {coord}: alive={} active={} cluster_active={}",
            entity.id(),
            entity.is_alive(),
            entity.is_active(),
            world.is_active(coord)
        );
    }
    let registered = filed_entities(world)
        .iter()
        .filter(|(_, entity)| entity.in_space())
        .count();
    assert_eq!(world.space().len(), registered);
}

/// Checks that every entity is filed under the cluster its position maps to.
pub fn assert_coordinates(world: &World) {
    let size = world.config().cluster_size;
    for (coord, entity) in filed_entities(world) {
        assert_eq!(
            crate::cluster::ClusterCoord::of(entity.position(), size),
            coord,
            "entity {} misfiled",
            entity.id()
        );
        if entity.is_active() {
            assert_eq!(world.directory().locate(entity.id()), Some(coord));
        }
    }
}
