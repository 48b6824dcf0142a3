//! The streaming world.
//!
//! [`World`] owns the cluster store, the physics space and the entity
//! directory, and keeps the three consistent while a focal point moves
//! through an unbounded map.
//!
//! # Tick
//!
//! [`World::update_at`] runs, in order:
//!
//! 1. **Activate**: the clusters within `vision_radius` of the focal cluster
//!    become the active set. Missing clusters are generated; clusters leaving
//!    the set take all their entities out of physics; clusters entering it
//!    put their alive entities in.
//! 2. **Update**: entity logic runs for every active cluster, queuing
//!    commands and events.
//! 3. **Resolve**: queued commands are applied.
//! 4. **Step**: bodies are synced into the space, the space is stepped with
//!    contacts dispatched to both entities, and the results are synced back.
//!    Commands queued by collisions are applied.
//! 5. **Cleanup**: dead entities leave physics; inactive entities leave the
//!    world.
//! 6. **Re-file**: entities whose position left their cluster move to the
//!    cluster they are now in. Entities landing in an inactive cluster are
//!    taken out of physics after all moves are done.
//!
//! After every tick an entity is registered in physics exactly when it is
//! alive, active and filed in an active cluster, and every entity is filed
//! in the cluster its position maps to.
//!
//! # Example
//!
//! ```
//! use glam::Vec2;
//! use stardrift_core::{Capabilities, Entity, Team, World, WorldConfig};
//!
//! let mut world = World::new(WorldConfig::default()).unwrap();
//! let ship = Entity::ship(world.allocate_id(), Vec2::new(500.0, 500.0), &world.config().ship, Capabilities::all(), Team::Player);
//! let id = world.add_entity(ship).unwrap();
//!
//! world.update_at(Vec2::new(500.0, 500.0), 1.0 / 60.0);
//! assert_eq!(world.active_clusters().count(), 9);
//! assert!(world.entity(id).unwrap().in_space());
//! ```

use std::collections::BTreeSet;

use glam::Vec2;
use rayon::prelude::*;
use stardrift_physics::{CollisionHandler, Contact, ContactBody, Space, StepStats};
use tracing::{debug, info_span, trace, warn};

use crate::cluster::{Cluster, ClusterCoord};
use crate::config::{GameplayConfig, WorldConfig};
use crate::directory::EntityDirectory;
use crate::effects::{Command, EffectQueue, Event, TickContext};
use crate::entity::{ContactPeer, Entity, EntityId, SaveStrategy, UpgradeKind, ENTITY_COLLISION};
use crate::error::{ConfigError, UpgradeError, WorldError};
use crate::generator::{AsteroidFieldGenerator, ClusterGenerator};
use crate::render::{Camera, Renderer};
use crate::store::ClusterStore;

/// Per-tick bookkeeping returned by [`World::update_at`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tick that was just completed.
    pub tick: u64,
    /// Clusters that entered the active set.
    pub activated: usize,
    /// Clusters that left the active set.
    pub deactivated: usize,
    /// Commands applied.
    pub commands: usize,
    /// Contacts the space detected.
    pub contacts: usize,
    /// Dead entities taken out of physics.
    pub dead: usize,
    /// Inactive entities removed from the world.
    pub popped: usize,
    /// Entities re-filed into another cluster.
    pub moved: usize,
}

/// The streaming world.
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    store: ClusterStore,
    space: Space,
    directory: EntityDirectory,
    active: BTreeSet<ClusterCoord>,
    effects: EffectQueue,
    tick: u64,
}

impl PartialEq for World {
    /// Worlds are equal when their stores are; runtime state is ignored.
    fn eq(&self, other: &Self) -> bool {
        self.store == other.store
    }
}

impl World {
    /// Creates an empty world generating asteroid fields from `config.seed`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the configuration is unusable.
    pub fn new(config: WorldConfig) -> Result<Self, ConfigError> {
        let generator = AsteroidFieldGenerator::new(config.seed, config.generation.clone());
        Self::with_generator(config, Box::new(generator))
    }

    /// Creates an empty world with a custom generator.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the configuration is unusable.
    pub fn with_generator(
        config: WorldConfig,
        generator: Box<dyn ClusterGenerator>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut space =
            Space::with_config(config.physics).map_err(|err| ConfigError::Invalid(err.to_string()))?;
        space.add_collision_handler(ENTITY_COLLISION, ENTITY_COLLISION);
        Ok(Self {
            store: ClusterStore::new(config.cluster_size, generator),
            config,
            space,
            directory: EntityDirectory::new(),
            active: BTreeSet::new(),
            effects: EffectQueue::new(),
            tick: 0,
        })
    }

    // =========================================================================
    // Tick
    // =========================================================================

    /// Runs one tick around `focal` and returns what happened.
    pub fn update_at(&mut self, focal: Vec2, dt: f32) -> TickReport {
        let span = info_span!("world_update", tick = self.tick);
        let _enter = span.enter();

        let (activated, deactivated) = self.refresh_active(focal);
        let mut report = TickReport {
            tick: self.tick,
            activated,
            deactivated,
            ..TickReport::default()
        };

        self.update_entities(dt);
        report.commands += self.apply_commands();

        self.push_bodies();
        let stats = self.step_space(dt);
        self.pull_bodies();
        report.contacts = stats.contacts;
        report.commands += self.apply_commands();

        report.dead = self.remove_dead();
        report.popped = self.pop_inactive();
        report.moved = self.refile();

        self.tick += 1;
        trace!(
            cells_activated = report.activated,
            cells_deactivated = report.deactivated,
            commands = report.commands,
            contacts = report.contacts,
            dead = report.dead,
            popped = report.popped,
            moved = report.moved,
            "world updated"
        );
        report
    }

    /// Recomputes the active set around `focal` and draws it.
    pub fn render_at(&mut self, focal: Vec2, camera: &Camera, renderer: &mut dyn Renderer) {
        self.refresh_active(focal);
        for coord in &self.active {
            if let Some(cluster) = self.store.cluster(*coord) {
                cluster.render(renderer, camera);
            }
        }
    }

    /// Makes the neighbourhood of `focal` the active set, syncing physics.
    /// Returns the number of clusters activated and deactivated.
    fn refresh_active(&mut self, focal: Vec2) -> (usize, usize) {
        let centre = self.store.coord_of(focal);
        let wanted: BTreeSet<ClusterCoord> = centre.neighbourhood(self.config.vision_radius).collect();
        if wanted == self.active {
            return (0, 0);
        }
        for coord in &wanted {
            self.ensure_cluster(*coord);
        }

        let leaving: Vec<ClusterCoord> = self.active.difference(&wanted).copied().collect();
        let entering: Vec<ClusterCoord> = wanted.difference(&self.active).copied().collect();
        for coord in &leaving {
            if let Some(cluster) = self.store.cluster_mut(*coord) {
                let removed = cluster.remove_from_space(&mut self.space);
                debug!(cluster = %coord, bodies = removed, "cluster deactivated");
            }
        }
        for coord in &entering {
            if let Some(cluster) = self.store.cluster_mut(*coord) {
                let added = cluster.add_to_space(&mut self.space);
                debug!(cluster = %coord, bodies = added, "cluster activated");
            }
        }
        self.active = wanted;
        (entering.len(), leaving.len())
    }

    /// Generates the cluster at `coord` if it is unknown.
    fn ensure_cluster(&mut self, coord: ClusterCoord) {
        if self.store.exists(coord) {
            return;
        }
        let entities = self.store.get(coord, &mut self.directory).len();
        self.effects.emit(Event::ClusterGenerated { coord, entities });
    }

    fn update_entities(&mut self, dt: f32) {
        let Self {
            config,
            store,
            directory,
            active,
            effects,
            ..
        } = self;
        let mut ctx = TickContext {
            effects,
            directory,
            gameplay: &config.gameplay,
        };
        for coord in active.iter() {
            if let Some(cluster) = store.cluster_mut(*coord) {
                cluster.update(dt, &mut ctx);
            }
        }
    }

    fn push_bodies(&mut self) {
        for coord in &self.active {
            if let Some(cluster) = self.store.cluster(*coord) {
                for entity in cluster.entities() {
                    entity.push_to_space(&mut self.space);
                }
            }
        }
    }

    fn step_space(&mut self, dt: f32) -> StepStats {
        let Self {
            config,
            store,
            space,
            directory,
            effects,
            ..
        } = self;
        let mut dispatcher = ContactDispatcher {
            store,
            directory,
            effects,
            gameplay: &config.gameplay,
        };
        space.step(dt, &mut dispatcher)
    }

    fn pull_bodies(&mut self) {
        for coord in &self.active {
            if let Some(cluster) = self.store.cluster_mut(*coord) {
                for entity in cluster.entities_mut() {
                    entity.pull_from_space(&self.space);
                }
            }
        }
    }

    fn remove_dead(&mut self) -> usize {
        let mut removed = 0;
        for coord in &self.active {
            if let Some(cluster) = self.store.cluster_mut(*coord) {
                for id in cluster.dead_entities() {
                    if let Some(entity) = cluster.entity_mut(id) {
                        removed += usize::from(entity.remove_from_space(&mut self.space));
                    }
                }
            }
        }
        removed
    }

    fn pop_inactive(&mut self) -> usize {
        let mut popped = 0;
        for coord in &self.active {
            let Some(cluster) = self.store.cluster_mut(*coord) else {
                continue;
            };
            for mut entity in cluster.pop_inactive_entities() {
                entity.remove_from_space(&mut self.space);
                self.directory.remove(entity.id());
                self.effects.emit(Event::Removed { id: entity.id() });
                debug!(entity = %entity.id(), kind = %entity.kind(), "entity removed");
                popped += 1;
            }
        }
        popped
    }

    /// Moves every entity that left its cluster, at most once per tick.
    fn refile(&mut self) -> usize {
        let clusters: Vec<&Cluster> = self
            .active
            .iter()
            .filter_map(|coord| self.store.cluster(*coord))
            .collect();
        let mut moves: Vec<(ClusterCoord, EntityId, ClusterCoord)> = clusters
            .par_iter()
            .flat_map_iter(|cluster| {
                let from = cluster.coord();
                cluster
                    .extra_entities()
                    .into_iter()
                    .map(move |(id, to)| (from, id, to))
            })
            .collect();
        moves.sort_unstable();

        let mut leaving = Vec::new();
        let mut moved = 0;
        for (from, id, to) in moves {
            let Some(entity) = self.store.cluster_mut(from).and_then(|cluster| cluster.remove_entity(id)) else {
                continue;
            };
            self.ensure_cluster(to);
            self.store.get(to, &mut self.directory).add_entity(entity);
            if self.directory.contains(id) {
                self.directory.insert(id, to);
            }
            if !self.active.contains(&to) {
                leaving.push((to, id));
            }
            moved += 1;
        }

        for (coord, id) in leaving {
            if let Some(entity) = self.store.entity_mut(coord, id) {
                entity.remove_from_space(&mut self.space);
            }
        }
        moved
    }

    // =========================================================================
    // Commands
    // =========================================================================

    fn apply_commands(&mut self) -> usize {
        let commands = self.effects.take_commands();
        let count = commands.len();
        for command in commands {
            self.apply_command(command);
        }
        count
    }

    fn apply_command(&mut self, command: Command) {
        match command {
            Command::Spawn(entity) => {
                if let Err(err) = self.add_entity(*entity) {
                    warn!(%err, "spawn rejected");
                }
            }
            Command::Damage {
                target,
                amount,
                sender,
            } => self.damage(target, amount, sender),
            Command::Mine {
                miner,
                target,
                amount,
                range,
            } => self.mine(miner, target, amount, range),
            Command::Explode {
                source,
                owner,
                center,
                radius,
                damage,
            } => {
                let sender = owner
                    .filter(|owner| self.directory.contains(*owner))
                    .unwrap_or(source);
                let targets: Vec<EntityId> = self
                    .space
                    .query_radius(center, radius)
                    .into_iter()
                    .map(|(_, tag)| EntityId::new(tag))
                    .filter(|id| *id != source)
                    .collect();
                for target in targets {
                    self.damage(target, damage, sender);
                }
            }
            Command::Collect { collector, pickup } => self.collect(collector, pickup),
        }
    }

    fn damage(&mut self, target: EntityId, amount: f32, sender: EntityId) {
        let Some(entity) = self.entity_mut(target) else {
            warn!(%target, "damage target no longer exists");
            return;
        };
        let taken = entity.take_damage(amount, sender);
        self.effects.emit(Event::Damaged {
            target,
            amount: taken,
            sender,
        });
    }

    fn mine(&mut self, miner: EntityId, target: EntityId, amount: f32, range: f32) {
        let Some(origin) = self.entity(miner).map(Entity::position) else {
            warn!(%miner, "miner no longer exists");
            return;
        };
        let reach = self
            .entity(target)
            .map(|asteroid| origin.distance(asteroid.position()) - asteroid.radius());
        let keep_target = match reach {
            Some(distance) if distance > range => true,
            Some(_) => self.entity_mut(target).is_some_and(|asteroid| asteroid.mine(amount)),
            None => false,
        };
        if !keep_target {
            if let Some(drill) = self
                .entity_mut(miner)
                .and_then(Entity::as_ship_mut)
                .and_then(|ship| ship.drill.as_mut())
            {
                drill.target = None;
            }
        }
    }

    fn collect(&mut self, collector: EntityId, pickup: EntityId) {
        let Some(coord) = self.directory.locate(pickup) else {
            warn!(%pickup, "pickup no longer exists");
            return;
        };
        let Some(resource) = self
            .store
            .entity(coord, pickup)
            .and_then(Entity::as_pickup)
            .map(|pickup| pickup.resource)
        else {
            return;
        };
        let Some(ship) = self.entity_mut(collector).and_then(Entity::as_ship_mut) else {
            warn!(%collector, "collector no longer exists");
            return;
        };
        ship.cargo.add(resource);
        if let Some(entity) = self.store.entity_mut(coord, pickup) {
            entity.set_save_strategy(SaveStrategy::NotSave);
            entity.deactivate(&mut self.directory);
        }
        self.effects.emit(Event::ResourceCollected { collector, resource });
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Reserves a fresh entity id.
    pub fn allocate_id(&mut self) -> EntityId {
        self.directory.allocate()
    }

    /// Files `entity` into the cluster its position maps to.
    ///
    /// The entity joins physics at once if that cluster is active and the
    /// entity is alive; otherwise it joins when its cluster activates.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::AlreadyTracked`] if an entity with the same id
    /// is already filed.
    pub fn add_entity(&mut self, mut entity: Entity) -> Result<EntityId, WorldError> {
        let id = entity.id();
        if self.directory.contains(id) || self.store.contains(&entity) {
            return Err(WorldError::AlreadyTracked(id));
        }
        let coord = self.store.coord_of(entity.position());
        self.ensure_cluster(coord);
        entity.activate(coord, &mut self.directory);
        if self.active.contains(&coord) && entity.is_alive() {
            entity.add_to_space(&mut self.space);
        }
        let kind = entity.kind();
        self.store.get(coord, &mut self.directory).add_entity(entity);
        self.effects.emit(Event::Spawned { id, kind });
        debug!(entity = %id, %kind, cluster = %coord, "entity added");
        Ok(id)
    }

    /// Takes an entity out of the world and out of physics.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NotTracked`] if no such entity is filed.
    pub fn remove_entity(&mut self, id: EntityId) -> Result<Entity, WorldError> {
        let coord = self.directory.locate(id).ok_or(WorldError::NotTracked(id))?;
        let mut entity = self
            .store
            .cluster_mut(coord)
            .and_then(|cluster| cluster.remove_entity(id))
            .ok_or(WorldError::NotTracked(id))?;
        entity.remove_from_space(&mut self.space);
        self.directory.remove(id);
        self.effects.emit(Event::Removed { id });
        debug!(entity = %id, "entity removed");
        Ok(entity)
    }

    /// Buys the next upgrade level for a ship, paying from its cargo.
    ///
    /// # Errors
    ///
    /// Returns [`UpgradeError::NotUpgradeable`] if `id` is not a tracked ship
    /// with an upgrade track, or the ship's own refusal.
    pub fn upgrade_ship(&mut self, id: EntityId, kind: UpgradeKind) -> Result<(), UpgradeError> {
        let coord = self.directory.locate(id).ok_or(UpgradeError::NotUpgradeable)?;
        let ship = self
            .store
            .entity_mut(coord, id)
            .and_then(Entity::as_ship_mut)
            .ok_or(UpgradeError::NotUpgradeable)?;
        ship.upgrade(kind, &self.config.ship.upgrades)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Looks up a tracked entity.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.store.entity(self.directory.locate(id)?, id)
    }

    /// Looks up a tracked entity mutably.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        let coord = self.directory.locate(id)?;
        self.store.entity_mut(coord, id)
    }

    /// True if `id` is tracked.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.directory.contains(id)
    }

    /// Simulated entities within `radius` of `position`, in id order.
    #[must_use]
    pub fn entities_near(&self, position: Vec2, radius: f32) -> Vec<&Entity> {
        self.space
            .query_radius(position, radius)
            .into_iter()
            .filter_map(|(_, tag)| self.entity(EntityId::new(tag)))
            .collect()
    }

    /// The simulated entity whose shape contains `position`.
    #[must_use]
    pub fn entity_at(&self, position: Vec2) -> Option<&Entity> {
        let (_, tag) = self.space.nearest(position, 0.0)?;
        self.entity(EntityId::new(tag))
    }

    /// Takes every event emitted since the last call.
    pub fn drain_events(&mut self) -> Vec<Event> {
        self.effects.take_events()
    }

    /// Configuration the world was built with.
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Active cluster coordinates in ascending order.
    pub fn active_clusters(&self) -> impl Iterator<Item = ClusterCoord> + '_ {
        self.active.iter().copied()
    }

    /// True if `coord` is in the active set.
    #[must_use]
    pub fn is_active(&self, coord: ClusterCoord) -> bool {
        self.active.contains(&coord)
    }

    /// The physics space.
    #[must_use]
    pub fn space(&self) -> &Space {
        &self.space
    }

    /// The cluster store.
    #[must_use]
    pub fn store(&self) -> &ClusterStore {
        &self.store
    }

    /// The entity directory.
    #[must_use]
    pub fn directory(&self) -> &EntityDirectory {
        &self.directory
    }

    /// Completed ticks.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut ClusterStore, &mut EntityDirectory) {
        (&mut self.store, &mut self.directory)
    }

    pub(crate) fn set_tick(&mut self, tick: u64) {
        self.tick = tick;
    }

    pub(crate) fn clear_events(&mut self) {
        self.effects = EffectQueue::new();
    }
}

// =============================================================================
// Contact Dispatch
// =============================================================================

/// Forwards physics contacts to both entities involved.
struct ContactDispatcher<'a> {
    store: &'a mut ClusterStore,
    directory: &'a mut EntityDirectory,
    effects: &'a mut EffectQueue,
    gameplay: &'a GameplayConfig,
}

impl ContactDispatcher<'_> {
    fn peer(&self, body: &ContactBody) -> Option<ContactPeer> {
        let id = EntityId::new(body.user_data);
        let entity = self.store.entity(self.directory.locate(id)?, id)?;
        Some(ContactPeer {
            id,
            kind: entity.kind(),
            position: body.position,
            velocity: body.velocity,
            mass: body.mass,
        })
    }

    fn collide(&mut self, id: EntityId, other: &ContactPeer) -> bool {
        let Some(coord) = self.directory.locate(id) else {
            return false;
        };
        let Some(entity) = self.store.entity_mut(coord, id) else {
            return false;
        };
        let mut ctx = TickContext {
            effects: &mut *self.effects,
            directory: &mut *self.directory,
            gameplay: self.gameplay,
        };
        entity.collide(other, &mut ctx)
    }
}

impl CollisionHandler for ContactDispatcher<'_> {
    fn begin(&mut self, contact: &Contact) -> bool {
        let (Some(a), Some(b)) = (self.peer(&contact.a), self.peer(&contact.b)) else {
            return false;
        };
        let bounce_a = self.collide(a.id, &b);
        let bounce_b = self.collide(b.id, &a);
        bounce_a && bounce_b
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Capabilities, Resource, ResourceKind, Team};
    use crate::generator::VoidGenerator;

    fn empty_world() -> World {
        let config = WorldConfig {
            cluster_size: Vec2::splat(100.0),
            ..WorldConfig::default()
        };
        World::with_generator(config, Box::new(VoidGenerator)).unwrap()
    }

    fn ship_at(world: &mut World, position: Vec2) -> EntityId {
        let id = world.allocate_id();
        let ship = Entity::ship(id, position, &world.config().ship.clone(), Capabilities::all(), Team::Player);
        world.add_entity(ship).unwrap()
    }

    fn pickup_at(world: &mut World, position: Vec2) -> EntityId {
        let id = world.allocate_id();
        let gameplay = world.config().gameplay.clone();
        let pickup = Entity::pickup(id, position, Resource::new(ResourceKind::Mithril, 3.0), &gameplay);
        world.add_entity(pickup).unwrap()
    }

    mod command_tests {
        use super::*;

        #[test]
        fn spawn_command_files_entity() {
            let mut world = empty_world();
            world.update_at(Vec2::ZERO, 0.0);
            let id = world.allocate_id();
            let gameplay = world.config().gameplay.clone();
            let pickup = Entity::pickup(id, Vec2::new(20.0, 20.0), Resource::new(ResourceKind::Gold, 1.0), &gameplay);
            world.apply_command(Command::Spawn(Box::new(pickup)));
            assert!(world.entity(id).unwrap().in_space());
        }

        #[test]
        fn damage_reports_taken_amount() {
            let mut world = empty_world();
            let ship = ship_at(&mut world, Vec2::new(50.0, 50.0));
            world.drain_events();
            world.apply_command(Command::Damage {
                target: ship,
                amount: 30.0,
                sender: EntityId::new(999),
            });
            let health = world.entity(ship).unwrap().as_ship().unwrap().health.health;
            assert!((health - 70.0).abs() < 1e-5);
            assert!(matches!(
                world.drain_events().as_slice(),
                [Event::Damaged { amount, .. }] if (*amount - 30.0).abs() < 1e-5
            ));
        }

        #[test]
        fn damage_to_missing_target_is_ignored() {
            let mut world = empty_world();
            world.apply_command(Command::Damage {
                target: EntityId::new(42),
                amount: 1.0,
                sender: EntityId::new(1),
            });
            assert!(world.drain_events().is_empty());
        }

        #[test]
        fn explosion_hits_everything_in_radius_but_source() {
            let mut world = empty_world();
            world.update_at(Vec2::ZERO, 0.0);
            let near = ship_at(&mut world, Vec2::new(10.0, 0.0));
            let far = ship_at(&mut world, Vec2::new(-90.0, 90.0));
            world.drain_events();
            world.apply_command(Command::Explode {
                source: near,
                owner: None,
                center: Vec2::new(30.0, 0.0),
                radius: 40.0,
                damage: 5.0,
            });
            assert!(world.drain_events().is_empty());

            world.apply_command(Command::Explode {
                source: EntityId::new(500),
                owner: Some(EntityId::new(501)),
                center: Vec2::new(30.0, 0.0),
                radius: 40.0,
                damage: 5.0,
            });
            let events = world.drain_events();
            assert_eq!(events.len(), 1);
            assert!(matches!(
                events[0],
                Event::Damaged { target, sender, .. } if target == near && sender == EntityId::new(500)
            ));
            assert!(world.entity(far).unwrap().is_alive());
        }

        #[test]
        fn collect_credits_cargo_and_retires_pickup() {
            let mut world = empty_world();
            let ship = ship_at(&mut world, Vec2::new(50.0, 50.0));
            let pickup = pickup_at(&mut world, Vec2::new(70.0, 50.0));
            world.apply_command(Command::Collect { collector: ship, pickup });
            let cargo = &world.entity(ship).unwrap().as_ship().unwrap().cargo;
            assert!((cargo.amount(ResourceKind::Mithril) - 3.0).abs() < 1e-5);
            assert!(!world.contains(pickup));
        }

        #[test]
        fn drill_target_cleared_when_asteroid_missing() {
            let mut world = empty_world();
            let ship = ship_at(&mut world, Vec2::new(50.0, 50.0));
            world
                .entity_mut(ship)
                .and_then(Entity::as_ship_mut)
                .and_then(|ship| ship.drill.as_mut())
                .unwrap()
                .target = Some(EntityId::new(77));
            world.apply_command(Command::Mine {
                miner: ship,
                target: EntityId::new(77),
                amount: 1.0,
                range: 100.0,
            });
            let drill = world.entity(ship).unwrap().as_ship().unwrap().drill.unwrap();
            assert_eq!(drill.target, None);
        }
    }

    mod contact_tests {
        use super::*;

        #[test]
        fn ship_collects_overlapping_pickup() {
            let mut world = empty_world();
            let ship = ship_at(&mut world, Vec2::new(50.0, 50.0));
            let pickup = pickup_at(&mut world, Vec2::new(55.0, 50.0));
            world.update_at(Vec2::new(50.0, 50.0), 0.01);

            let cargo = &world.entity(ship).unwrap().as_ship().unwrap().cargo;
            assert!((cargo.amount(ResourceKind::Mithril) - 3.0).abs() < 1e-5);
            assert!(!world.contains(pickup));
            assert!(world
                .drain_events()
                .iter()
                .any(|event| matches!(event, Event::Removed { id } if *id == pickup)));
        }

        #[test]
        fn ramming_ships_bounce_and_take_damage() {
            let mut world = empty_world();
            let a = ship_at(&mut world, Vec2::new(30.0, 50.0));
            let b = ship_at(&mut world, Vec2::new(69.0, 50.0));
            world.entity_mut(a).unwrap().body_mut().velocity = Vec2::new(50.0, 0.0);
            world.update_at(Vec2::new(50.0, 50.0), 0.01);

            assert!(world.entity(a).unwrap().body().velocity.x < 50.0);
            assert!(world.entity(b).unwrap().body().velocity.x > 0.0);
            let health = world.entity(b).unwrap().as_ship().unwrap().health.health;
            assert!(health < 100.0);
        }
    }

    mod query_tests {
        use super::*;

        #[test]
        fn queries_only_see_simulated_entities() {
            let mut world = empty_world();
            world.update_at(Vec2::ZERO, 0.0);
            let inside = ship_at(&mut world, Vec2::new(10.0, 10.0));
            let outside = ship_at(&mut world, Vec2::new(250.0, 10.0));

            let near: Vec<EntityId> = world
                .entities_near(Vec2::new(10.0, 10.0), 1000.0)
                .into_iter()
                .map(Entity::id)
                .collect();
            assert_eq!(near, vec![inside]);
            assert_eq!(world.entity_at(Vec2::new(12.0, 10.0)).map(Entity::id), Some(inside));
            assert!(world.entity_at(Vec2::new(250.0, 10.0)).is_none());
            assert!(world.contains(outside));
        }

        #[test]
        fn render_draws_active_clusters() {
            let mut world = empty_world();
            ship_at(&mut world, Vec2::new(10.0, 10.0));
            let mut renderer = crate::render::RecordingRenderer::new();
            world.render_at(Vec2::ZERO, &Camera::default(), &mut renderer);
            assert_eq!(renderer.clusters().len(), 9);
            assert_eq!(renderer.entity_count(), 1);
        }

        #[test]
        fn upgrade_needs_cargo() {
            let mut world = empty_world();
            let ship = ship_at(&mut world, Vec2::new(10.0, 10.0));
            assert_eq!(
                world.upgrade_ship(ship, UpgradeKind::Armor),
                Err(UpgradeError::Unaffordable)
            );
            world
                .entity_mut(ship)
                .and_then(Entity::as_ship_mut)
                .unwrap()
                .cargo
                .add(Resource::new(ResourceKind::Gold, 100.0));
            assert_eq!(world.upgrade_ship(ship, UpgradeKind::Armor), Ok(()));
            assert_eq!(
                world.upgrade_ship(EntityId::new(9999), UpgradeKind::Armor),
                Err(UpgradeError::NotUpgradeable)
            );
        }
    }
}
