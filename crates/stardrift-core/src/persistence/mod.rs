//! Save and load.
//!
//! A world is written as a [`MapDocument`]:
//!
//! ```text
//! { "clusters": { "<y>": { "<x>": { "x": .., "y": ..,
//!     "independent_entities": [ .. ],
//!     "dependent_entities": [ .. ] } } } }
//! ```
//!
//! Each entity becomes an [`EntityDocument`] tagged with its `class_name`.
//! Entities with [`SaveStrategy::Entity`] are written as independent
//! documents. [`SaveStrategy::Depended`] entities (blaster charges) are
//! written beside their cluster and only while their owner is tracked;
//! [`SaveStrategy::NotSave`], inactive and dead entities are skipped.
//!
//! Loading happens in two passes: every cluster's independent entities
//! first, then the focal entity, then every dependent entity, so owner
//! references always resolve. Any failure aborts the whole load.

mod registry;

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use stardrift_physics::BodyState;
use tracing::{debug, info_span};

pub use registry::{Decoder, EntityRegistry};

use crate::cluster::{Cluster, ClusterCoord};
use crate::config::WorldConfig;
use crate::directory::EntityDirectory;
use crate::entity::{Entity, EntityId, SaveStrategy};
use crate::error::PersistError;
use crate::generator::{AsteroidFieldGenerator, ClusterGenerator};
use crate::world::World;

/// Save file format version written by this build.
pub const SAVE_VERSION: u32 = 1;

// =============================================================================
// Documents
// =============================================================================

/// One persisted entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDocument {
    /// Decoder tag.
    pub class_name: String,
    /// Id, restored verbatim.
    pub id: EntityId,
    /// Kinematics.
    pub body: BodyState,
    /// Radius and variant fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// One persisted cluster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterDocument {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
    /// Entities restored in the first pass.
    #[serde(default)]
    pub independent_entities: Vec<EntityDocument>,
    /// Entities restored once their owners exist.
    #[serde(default)]
    pub dependent_entities: Vec<EntityDocument>,
}

impl ClusterDocument {
    /// Coordinate the document declares.
    #[must_use]
    pub fn coord(&self) -> ClusterCoord {
        ClusterCoord::new(self.x, self.y)
    }
}

/// A persisted cluster store, keyed by row then column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapDocument {
    /// `clusters[y][x]`.
    pub clusters: BTreeMap<i32, BTreeMap<i32, ClusterDocument>>,
}

impl MapDocument {
    /// Adds a cluster document under its own coordinates.
    pub fn insert(&mut self, cluster: ClusterDocument) {
        self.clusters.entry(cluster.y).or_default().insert(cluster.x, cluster);
    }

    /// Cluster documents with the coordinate implied by their map keys.
    pub fn cluster_documents(&self) -> impl Iterator<Item = (ClusterCoord, &ClusterDocument)> {
        self.clusters.iter().flat_map(|(y, row)| {
            row.iter()
                .map(move |(x, document)| (ClusterCoord::new(*x, *y), document))
        })
    }

    /// Number of cluster documents.
    #[must_use]
    pub fn cluster_count(&self) -> usize {
        self.clusters.values().map(BTreeMap::len).sum()
    }

    /// Number of entity documents, independent and dependent.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.cluster_documents()
            .map(|(_, cluster)| cluster.independent_entities.len() + cluster.dependent_entities.len())
            .sum()
    }

    fn entity_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.cluster_documents().flat_map(|(_, cluster)| {
            cluster
                .independent_entities
                .iter()
                .chain(&cluster.dependent_entities)
                .map(|document| document.id)
        })
    }
}

// =============================================================================
// Cluster Codec
// =============================================================================

impl Cluster {
    /// Encodes the cluster, leaving out `exclude`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Json`] if an entity cannot be encoded.
    pub fn to_document(
        &self,
        directory: &EntityDirectory,
        exclude: Option<EntityId>,
    ) -> Result<ClusterDocument, PersistError> {
        let coord = self.coord();
        let mut document = ClusterDocument {
            x: coord.x,
            y: coord.y,
            ..ClusterDocument::default()
        };
        for entity in self.entities() {
            if !entity.is_active() || !entity.is_alive() || Some(entity.id()) == exclude {
                continue;
            }
            match entity.save_strategy() {
                SaveStrategy::Entity => document.independent_entities.push(entity.to_document()?),
                SaveStrategy::Depended => {
                    if entity.owner().is_some_and(|owner| directory.contains(owner)) {
                        document.dependent_entities.push(entity.to_document()?);
                    }
                }
                SaveStrategy::NotSave => {}
            }
        }
        Ok(document)
    }

    /// Rebuilds a cluster with its independent entities.
    ///
    /// Dependent entities are left for
    /// [`load_dependent_entities`](Self::load_dependent_entities).
    ///
    /// # Errors
    ///
    /// Fails on an undecodable entity, a dependent entity, a repeated id, or
    /// an entity whose position lies outside the cluster.
    pub fn from_document(
        document: &ClusterDocument,
        size: Vec2,
        registry: &EntityRegistry,
        directory: &mut EntityDirectory,
    ) -> Result<Self, PersistError> {
        let mut cluster = Self::new(document.coord(), size);
        for entity_document in &document.independent_entities {
            let entity = registry.decode(entity_document)?;
            if entity.save_strategy() == SaveStrategy::Depended {
                return Err(PersistError::MisplacedDependent {
                    entity: entity.id(),
                    class: entity.kind().class_name(),
                });
            }
            cluster.file_loaded(entity, directory)?;
        }
        Ok(cluster)
    }

    /// Restores dependent entities once their owners are tracked.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::MissingOwner`] if an owner is not tracked, and
    /// the same errors as [`from_document`](Self::from_document).
    pub fn load_dependent_entities(
        &mut self,
        documents: &[EntityDocument],
        registry: &EntityRegistry,
        directory: &mut EntityDirectory,
    ) -> Result<usize, PersistError> {
        for document in documents {
            let entity = registry.decode(document)?;
            if let Some(owner) = entity.owner() {
                if !directory.contains(owner) {
                    return Err(PersistError::MissingOwner {
                        entity: entity.id(),
                        owner,
                    });
                }
            }
            self.file_loaded(entity, directory)?;
        }
        Ok(documents.len())
    }

    fn file_loaded(&mut self, mut entity: Entity, directory: &mut EntityDirectory) -> Result<(), PersistError> {
        let id = entity.id();
        if directory.contains(id) || self.contains(id) {
            return Err(PersistError::DuplicateId(id));
        }
        let actual = ClusterCoord::of(entity.position(), self.size());
        if actual != self.coord() {
            return Err(PersistError::Misfiled {
                entity: id,
                cluster: self.coord(),
                actual,
            });
        }
        entity.activate(self.coord(), directory);
        self.add_entity(entity);
        Ok(())
    }
}

// =============================================================================
// World Codec
// =============================================================================

impl World {
    /// Encodes every cluster of the world.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Json`] if an entity cannot be encoded.
    pub fn to_document(&self) -> Result<MapDocument, PersistError> {
        self.encode(None)
    }

    /// Encodes the world without `focus`, which is saved beside the map.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Json`] if an entity cannot be encoded.
    pub fn to_document_without(&self, focus: EntityId) -> Result<MapDocument, PersistError> {
        self.encode(Some(focus))
    }

    fn encode(&self, exclude: Option<EntityId>) -> Result<MapDocument, PersistError> {
        let mut document = MapDocument::default();
        for cluster in self.store().clusters() {
            document.insert(cluster.to_document(self.directory(), exclude)?);
        }
        debug!(
            clusters = document.cluster_count(),
            entities = document.entity_count(),
            "world encoded"
        );
        Ok(document)
    }

    /// Rebuilds a world using the standard registry and generator.
    ///
    /// # Errors
    ///
    /// See [`from_document_with`](Self::from_document_with).
    pub fn from_document(
        config: WorldConfig,
        document: &MapDocument,
        focus: Option<&EntityDocument>,
    ) -> Result<Self, PersistError> {
        let generator = AsteroidFieldGenerator::new(config.seed, config.generation.clone());
        Self::from_document_with(config, document, focus, Box::new(generator), &EntityRegistry::standard())
    }

    /// Rebuilds a world from `document`, filing `focus` after the
    /// independent entities and before the dependent ones.
    ///
    /// Nothing is added to physics; clusters join it when they activate.
    /// Ids are kept and the allocator continues after the largest one.
    ///
    /// # Errors
    ///
    /// Fails on an incomplete registry, an invalid config, or any malformed
    /// document. No partially loaded world is ever returned.
    pub fn from_document_with(
        config: WorldConfig,
        document: &MapDocument,
        focus: Option<&EntityDocument>,
        generator: Box<dyn ClusterGenerator>,
        registry: &EntityRegistry,
    ) -> Result<Self, PersistError> {
        let span = info_span!("world_load");
        let _enter = span.enter();

        registry.validate()?;
        let size = config.cluster_size;
        let mut world = World::with_generator(config, generator)?;

        let (store, directory) = world.parts_mut();
        let ids: BTreeSet<EntityId> = document.entity_ids().chain(focus.map(|focus| focus.id)).collect();
        if let Some(&max) = ids.last() {
            if !directory.reserve(max) {
                return Err(PersistError::IdOverflow(max));
            }
        }

        for (key, cluster_document) in document.cluster_documents() {
            if key != cluster_document.coord() {
                return Err(PersistError::ClusterKeyMismatch {
                    key,
                    declared: cluster_document.coord(),
                });
            }
            let cluster = Cluster::from_document(cluster_document, size, registry, directory)?;
            store.insert(cluster);
        }

        if let Some(focus) = focus {
            let entity = registry.decode(focus)?;
            let id = entity.id();
            world
                .add_entity(entity)
                .map_err(|_| PersistError::DuplicateId(id))?;
        }

        let (store, directory) = world.parts_mut();
        for (key, cluster_document) in document.cluster_documents() {
            if cluster_document.dependent_entities.is_empty() {
                continue;
            }
            let Some(cluster) = store.cluster_mut(key) else {
                continue;
            };
            cluster.load_dependent_entities(&cluster_document.dependent_entities, registry, directory)?;
        }

        world.clear_events();
        debug!(
            clusters = world.store().len(),
            entities = world.store().entity_count(),
            "world loaded"
        );
        Ok(world)
    }
}

// =============================================================================
// Save Files
// =============================================================================

/// A complete saved session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveFile {
    /// Format version.
    pub version: u32,
    /// Ticks completed when saved.
    #[serde(default)]
    pub tick: u64,
    /// Configuration the world runs with.
    pub config: WorldConfig,
    /// The focal entity, stored outside the map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus: Option<EntityDocument>,
    /// The map.
    pub world: MapDocument,
}

impl SaveFile {
    /// Captures `world`, storing `focus` (if tracked) beside the map.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Json`] if an entity cannot be encoded.
    pub fn capture(world: &World, focus: Option<EntityId>) -> Result<Self, PersistError> {
        let focus_document = focus
            .and_then(|id| world.entity(id))
            .map(Entity::to_document)
            .transpose()?;
        let map = match focus_document.as_ref() {
            Some(document) => world.to_document_without(document.id)?,
            None => world.to_document()?,
        };
        Ok(Self {
            version: SAVE_VERSION,
            tick: world.tick(),
            config: world.config().clone(),
            focus: focus_document,
            world: map,
        })
    }

    /// Rebuilds the saved world.
    ///
    /// # Errors
    ///
    /// See [`World::from_document`].
    pub fn restore(&self) -> Result<World, PersistError> {
        self.check_version()?;
        let mut world = World::from_document(self.config.clone(), &self.world, self.focus.as_ref())?;
        world.set_tick(self.tick);
        Ok(world)
    }

    /// Writes the save as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Io`] or [`PersistError::Json`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Reads a save written by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::SchemaMismatch`] for another format version,
    /// or an IO or JSON error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let reader = BufReader::new(File::open(path)?);
        let save: Self = serde_json::from_reader(reader)?;
        save.check_version()?;
        Ok(save)
    }

    fn check_version(&self) -> Result<(), PersistError> {
        if self.version == SAVE_VERSION {
            Ok(())
        } else {
            Err(PersistError::SchemaMismatch {
                found: self.version,
                expected: SAVE_VERSION,
            })
        }
    }
}
