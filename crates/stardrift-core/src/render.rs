//! Rendering contract.
//!
//! The core never draws anything itself. It walks the active clusters and
//! hands each cluster and entity to a [`Renderer`] together with a
//! [`Camera`] that maps world positions to screen positions.

use glam::Vec2;

use crate::cluster::{Cluster, ClusterCoord};
use crate::entity::{Entity, EntityId};

/// World-to-screen offset.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Camera {
    /// Subtracted from world positions.
    pub offset: Vec2,
}

impl Camera {
    /// Camera placing `focal` at the centre of a `viewport`.
    #[must_use]
    pub fn centered_on(focal: Vec2, viewport: Vec2) -> Self {
        Self {
            offset: focal - viewport / 2.0,
        }
    }

    /// Screen position of a world point.
    #[must_use]
    pub fn to_screen(&self, world: Vec2) -> Vec2 {
        world - self.offset
    }
}

/// Receives draw calls.
pub trait Renderer {
    /// Called once per active cluster before its entities.
    fn draw_cluster(&mut self, cluster: &Cluster, camera: &Camera);

    /// Called for each active entity.
    fn draw_entity(&mut self, entity: &Entity, camera: &Camera);
}

/// A draw call captured by [`RecordingRenderer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawCall {
    /// A cluster was drawn.
    Cluster(ClusterCoord),
    /// An entity was drawn at a screen position.
    Entity(EntityId, Vec2),
}

/// Renderer that records its calls; used headlessly and in tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    /// Calls in the order received.
    pub calls: Vec<DrawCall>,
}

impl RecordingRenderer {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Coordinates of the clusters drawn.
    #[must_use]
    pub fn clusters(&self) -> Vec<ClusterCoord> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DrawCall::Cluster(coord) => Some(*coord),
                DrawCall::Entity(..) => None,
            })
            .collect()
    }

    /// Number of entities drawn.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, DrawCall::Entity(..)))
            .count()
    }
}

impl Renderer for RecordingRenderer {
    fn draw_cluster(&mut self, cluster: &Cluster, _camera: &Camera) {
        self.calls.push(DrawCall::Cluster(cluster.coord()));
    }

    fn draw_entity(&mut self, entity: &Entity, camera: &Camera) {
        self.calls
            .push(DrawCall::Entity(entity.id(), camera.to_screen(entity.position())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationConfig;
    use crate::entity::{Resource, ResourceKind};

    #[test]
    fn camera_centres_focal_point() {
        let camera = Camera::centered_on(Vec2::new(500.0, 500.0), Vec2::new(800.0, 600.0));
        assert_eq!(camera.to_screen(Vec2::new(500.0, 500.0)), Vec2::new(400.0, 300.0));
    }

    #[test]
    fn cluster_render_draws_cluster_then_entities() {
        let mut cluster = Cluster::new(ClusterCoord::new(0, 0), Vec2::splat(100.0));
        cluster.add_entity(Entity::asteroid(
            EntityId::new(1),
            Vec2::new(30.0, 40.0),
            10.0,
            Resource::new(ResourceKind::Gold, 1.0),
            &GenerationConfig::default(),
        ));
        let mut renderer = RecordingRenderer::new();
        cluster.render(&mut renderer, &Camera { offset: Vec2::new(10.0, 10.0) });
        assert_eq!(
            renderer.calls,
            vec![
                DrawCall::Cluster(ClusterCoord::new(0, 0)),
                DrawCall::Entity(EntityId::new(1), Vec2::new(20.0, 30.0)),
            ]
        );
    }
}
