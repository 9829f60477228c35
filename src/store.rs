//! Bookkeeping of the mesh and body created for each spawned object.

use crate::physics::BodyId;
use crate::scene::MeshId;

/// Two parallel append-only lists. Index `i` of each belongs to the same
/// spawned object; the lists never differ in length.
#[derive(Debug, Default, Clone)]
pub struct WorldState {
    meshes: Vec<MeshId>,
    bodies: Vec<BodyId>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_pair(&mut self, mesh: MeshId, body: BodyId) {
        self.meshes.push(mesh);
        self.bodies.push(body);
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn meshes(&self) -> &[MeshId] {
        &self.meshes
    }

    pub fn bodies(&self) -> &[BodyId] {
        &self.bodies
    }

    /// `(mesh, body)` in spawn order.
    pub fn pairs(&self) -> impl Iterator<Item = (MeshId, BodyId)> + '_ {
        self.meshes.iter().copied().zip(self.bodies.iter().copied())
    }
}
