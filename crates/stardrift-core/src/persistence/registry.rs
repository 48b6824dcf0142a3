//! `class_name` keyed entity decoders.
//!
//! Every [`EntityKind`] must have a decoder; [`EntityRegistry::validate`]
//! is run before any load so a missing registration fails at startup rather
//! than halfway through a file.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::EntityDocument;
use crate::entity::{
    AsteroidComponents, ChargeComponents, Entity, EntityInner, EntityKind, PickupComponents,
    ShipComponents,
};
use crate::error::{PersistError, RegistryError};

/// Builds an entity from its document.
pub type Decoder = fn(&EntityDocument) -> Result<Entity, PersistError>;

/// Domain fields shared by every document: the collision radius plus the
/// variant's components, flattened.
#[derive(Serialize, Deserialize)]
struct Fields<T> {
    radius: f32,
    #[serde(flatten)]
    components: T,
}

/// Maps `class_name`s to decoders.
#[derive(Clone, Default)]
pub struct EntityRegistry {
    decoders: BTreeMap<String, Decoder>,
}

impl fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.decoders.keys()).finish()
    }
}

impl EntityRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with a decoder for every built-in kind.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(EntityKind::Ship, decode_ship);
        registry.register(EntityKind::Asteroid, decode_asteroid);
        registry.register(EntityKind::BlasterCharge, decode_charge);
        registry.register(EntityKind::PickupableResource, decode_pickup);
        registry
    }

    /// Registers or replaces the decoder for `kind`.
    pub fn register(&mut self, kind: EntityKind, decoder: Decoder) {
        self.decoders.insert(kind.class_name().to_owned(), decoder);
    }

    /// True if `class_name` has a decoder.
    #[must_use]
    pub fn contains(&self, class_name: &str) -> bool {
        self.decoders.contains_key(class_name)
    }

    /// Checks that every kind has a decoder.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Unregistered`] for the first kind missing.
    pub fn validate(&self) -> Result<(), RegistryError> {
        match EntityKind::ALL.iter().find(|kind| !self.contains(kind.class_name())) {
            Some(kind) => Err(RegistryError::Unregistered(*kind)),
            None => Ok(()),
        }
    }

    /// Decodes one document. The entity comes back active, outside any space.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::UnknownClass`] for an unregistered
    /// `class_name`, or the decoder's error.
    pub fn decode(&self, document: &EntityDocument) -> Result<Entity, PersistError> {
        let decoder = self
            .decoders
            .get(&document.class_name)
            .ok_or_else(|| PersistError::UnknownClass(document.class_name.clone()))?;
        decoder(document)
    }
}

fn fields<T: DeserializeOwned>(document: &EntityDocument, kind: EntityKind) -> Result<Fields<T>, PersistError> {
    serde_json::from_value(Value::Object(document.fields.clone())).map_err(|source| {
        PersistError::InvalidFields {
            class: kind.class_name(),
            source,
        }
    })
}

fn decode_ship(document: &EntityDocument) -> Result<Entity, PersistError> {
    let Fields { radius, components } = fields::<ShipComponents>(document, EntityKind::Ship)?;
    Ok(Entity::new(document.id, document.body, radius, EntityInner::Ship(components)))
}

fn decode_asteroid(document: &EntityDocument) -> Result<Entity, PersistError> {
    let Fields { radius, components } = fields::<AsteroidComponents>(document, EntityKind::Asteroid)?;
    Ok(Entity::new(document.id, document.body, radius, EntityInner::Asteroid(components)))
}

fn decode_charge(document: &EntityDocument) -> Result<Entity, PersistError> {
    let Fields { radius, components } = fields::<ChargeComponents>(document, EntityKind::BlasterCharge)?;
    Ok(Entity::new(document.id, document.body, radius, EntityInner::BlasterCharge(components)))
}

fn decode_pickup(document: &EntityDocument) -> Result<Entity, PersistError> {
    let Fields { radius, components } =
        fields::<PickupComponents>(document, EntityKind::PickupableResource)?;
    Ok(Entity::new(document.id, document.body, radius, EntityInner::Pickup(components)))
}

impl Entity {
    /// Encodes the entity as a document.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Json`] if a field cannot be represented.
    pub fn to_document(&self) -> Result<EntityDocument, PersistError> {
        let radius = self.radius();
        let value = match self.inner() {
            EntityInner::Ship(components) => serde_json::to_value(Fields { radius, components })?,
            EntityInner::Asteroid(components) => serde_json::to_value(Fields { radius, components })?,
            EntityInner::BlasterCharge(components) => {
                serde_json::to_value(Fields { radius, components })?
            }
            EntityInner::Pickup(components) => serde_json::to_value(Fields { radius, components })?,
        };
        Ok(EntityDocument {
            class_name: self.kind().class_name().to_owned(),
            id: self.id(),
            body: *self.body(),
            fields: serde_json::from_value::<Map<String, Value>>(value)?,
        })
    }

    /// Decodes an entity through `registry`.
    ///
    /// # Errors
    ///
    /// See [`EntityRegistry::decode`].
    pub fn from_document(document: &EntityDocument, registry: &EntityRegistry) -> Result<Self, PersistError> {
        registry.decode(document)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::config::{GameplayConfig, GenerationConfig, ShipConfig};
    use crate::entity::{Capabilities, EntityId, Resource, ResourceKind, Team};

    fn samples() -> Vec<Entity> {
        let gameplay = GameplayConfig::default();
        vec![
            Entity::ship(EntityId::new(1), Vec2::new(1.0, 2.0), &ShipConfig::default(), Capabilities::all(), Team::Player),
            Entity::asteroid(
                EntityId::new(2),
                Vec2::new(5.0, 5.0),
                25.0,
                Resource::new(ResourceKind::Eternium, 12.0),
                &GenerationConfig::default(),
            ),
            Entity::blaster_charge(
                EntityId::new(3),
                EntityId::new(1),
                Team::Player,
                Vec2::new(40.0, 2.0),
                0.5,
                &gameplay.charges[0],
                1.0,
            ),
            Entity::pickup(EntityId::new(4), Vec2::new(-3.0, 8.0), Resource::new(ResourceKind::Gold, 2.0), &gameplay),
        ]
    }

    #[test]
    fn standard_registry_is_complete() {
        assert_eq!(EntityRegistry::standard().validate(), Ok(()));
    }

    #[test]
    fn missing_decoder_fails_validation() {
        let mut registry = EntityRegistry::new();
        registry.register(EntityKind::Ship, decode_ship);
        assert_eq!(
            registry.validate(),
            Err(RegistryError::Unregistered(EntityKind::Asteroid))
        );
    }

    #[test]
    fn every_kind_survives_a_document() {
        let registry = EntityRegistry::standard();
        for entity in samples() {
            let document = entity.to_document().unwrap();
            assert_eq!(document.class_name, entity.kind().class_name());
            let json = serde_json::to_string(&document).unwrap();
            let parsed: EntityDocument = serde_json::from_str(&json).unwrap();
            let decoded = Entity::from_document(&parsed, &registry).unwrap();
            assert_eq!(decoded.kind(), entity.kind());
            assert_eq!(decoded.id(), entity.id());
            assert_eq!(decoded.save_strategy(), entity.save_strategy());
            assert!(!decoded.in_space());
            assert!((decoded.radius() - entity.radius()).abs() < 1e-5);
            assert!(decoded.position().distance(entity.position()) < 1e-4);
        }
    }

    #[test]
    fn document_carries_kinematics_and_class() {
        let ship = &samples()[0];
        let value = serde_json::to_value(ship.to_document().unwrap()).unwrap();
        assert_eq!(value["class_name"], "Ship");
        for key in ["position", "velocity", "angle", "angular_velocity", "mass", "moment"] {
            assert!(value["body"].get(key).is_some(), "missing {key}");
        }
        assert!(value.get("radius").is_some());
        assert!(value.get("health").is_some());
    }

    #[test]
    fn unknown_class_is_rejected() {
        let mut document = samples()[1].to_document().unwrap();
        document.class_name = "Comet".into();
        assert!(matches!(
            EntityRegistry::standard().decode(&document),
            Err(PersistError::UnknownClass(name)) if name == "Comet"
        ));
    }

    #[test]
    fn malformed_fields_are_rejected() {
        let mut document = samples()[1].to_document().unwrap();
        document.fields.remove("life");
        assert!(matches!(
            EntityRegistry::standard().decode(&document),
            Err(PersistError::InvalidFields { class: "Asteroid", .. })
        ));
    }
}
