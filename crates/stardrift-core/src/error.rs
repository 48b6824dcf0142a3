//! Error types.
//!
//! Runtime precondition violations on the [`World`](crate::World) surface as
//! [`WorldError`]; anything that goes wrong while reading a saved world is a
//! [`PersistError`] and aborts the whole load.

use thiserror::Error;

use crate::cluster::ClusterCoord;
use crate::entity::{EntityId, EntityKind};

/// Bookkeeping violations reported by the world.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorldError {
    /// The entity is already filed in the world.
    #[error("entity {0} is already tracked")]
    AlreadyTracked(EntityId),
    /// The entity is not filed in the world.
    #[error("entity {0} is not tracked")]
    NotTracked(EntityId),
}

/// Failures while loading or saving a world.
#[derive(Debug, Error)]
pub enum PersistError {
    /// No decoder is registered for the document's `class_name`.
    #[error("unknown entity class `{0}`")]
    UnknownClass(String),
    /// A dependent entity names an owner that was not loaded.
    #[error("entity {entity} references missing owner {owner}")]
    MissingOwner {
        /// The dependent entity.
        entity: EntityId,
        /// The owner it refers to.
        owner: EntityId,
    },
    /// A dependent entity is listed among a cluster's independent entities.
    #[error("dependent entity {entity} (`{class}`) is saved as independent")]
    MisplacedDependent {
        /// The entity.
        entity: EntityId,
        /// Its class name.
        class: &'static str,
    },
    /// An id leaves no room for the allocator to continue after it.
    #[error("entity id {0} is too large")]
    IdOverflow(EntityId),
    /// Two documents carry the same id.
    #[error("entity id {0} appears more than once")]
    DuplicateId(EntityId),
    /// An entity's position lies outside the cluster that lists it.
    #[error("entity {entity} is filed under cluster {cluster} but positioned in {actual}")]
    Misfiled {
        /// The entity.
        entity: EntityId,
        /// Cluster the document lists it under.
        cluster: ClusterCoord,
        /// Cluster its position maps to.
        actual: ClusterCoord,
    },
    /// A cluster document's coordinates disagree with its map keys.
    #[error("cluster keyed at {key} declares coordinates {declared}")]
    ClusterKeyMismatch {
        /// Coordinates from the enclosing map keys.
        key: ClusterCoord,
        /// Coordinates inside the document.
        declared: ClusterCoord,
    },
    /// The save file was written by an incompatible version.
    #[error("save file version {found} is not supported (expected {expected})")]
    SchemaMismatch {
        /// Version found in the file.
        found: u32,
        /// Version this build reads.
        expected: u32,
    },
    /// A domain field failed to decode.
    #[error("invalid `{class}` document: {source}")]
    InvalidFields {
        /// Class being decoded.
        class: &'static str,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },
    /// The decoder registry is incomplete.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// The embedded configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Startup validation failures of the entity decoder registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// An entity kind has no decoder.
    #[error("no decoder registered for {0}")]
    Unregistered(EntityKind),
}

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons an upgrade purchase is refused.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeError {
    /// The entity is not a ship with upgrades.
    #[error("entity cannot be upgraded")]
    NotUpgradeable,
    /// The ship lacks the gadget the upgrade improves.
    #[error("ship has no gadget for this upgrade")]
    MissingGadget,
    /// The upgrade is at its maximum level.
    #[error("upgrade is already at its maximum level")]
    MaxLevel,
    /// The cargo hold cannot cover the price.
    #[error("not enough resources")]
    Unaffordable,
}
