//! Boundary to the renderer, the physics engine and the instance scatterer.
//!
//! Chunks talk to the outside world only through [`SceneBackend`]. Every call
//! happens on the update thread, at `init`, during culling or at `dispose`.

use glam::DVec3;
use rustc_hash::FxHashMap;
use tellus_terrain::{ChunkMeshData, FLOATS_PER_MATRIX};

use crate::ChunkId;

/// Renderer mesh owned by one chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u64);

/// Static physics body attached to a chunk mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ColliderHandle(pub u64);

/// Batch of decoration instances scattered over one chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PatchHandle(pub u64);

/// The decoration assets a chunk can scatter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PatchKind {
    Rocks,
    Trees,
    Butterflies,
    Grass,
}

/// Renderer, physics and instancing calls made by chunks.
///
/// Meshes are uploaded once with their full payload; there are no partial
/// updates. Positions are planet-local and parented to the planet body.
pub trait SceneBackend {
    fn create_mesh(
        &mut self,
        chunk: ChunkId,
        name: &str,
        local_position: DVec3,
        geometry: &ChunkMeshData,
    ) -> MeshHandle;
    fn set_mesh_enabled(&mut self, mesh: MeshHandle, enabled: bool);
    fn dispose_mesh(&mut self, mesh: MeshHandle);

    fn create_static_collider(&mut self, mesh: MeshHandle, local_position: DVec3) -> ColliderHandle;
    fn dispose_collider(&mut self, collider: ColliderHandle);

    /// `matrices` holds column-major 4x4 matrices relative to `local_position`.
    fn scatter_instances(&mut self, kind: PatchKind, local_position: DVec3, matrices: Vec<f32>) -> PatchHandle;
    fn set_patch_enabled(&mut self, patch: PatchHandle, enabled: bool);
    fn dispose_patch(&mut self, patch: PatchHandle);
}

// ---------------------------------------------------------------------------
// Headless backend
// ---------------------------------------------------------------------------

/// A mesh as seen by [`HeadlessScene`].
#[derive(Clone, Debug)]
pub struct MeshRecord {
    pub chunk: ChunkId,
    pub name: String,
    pub local_position: DVec3,
    pub vertex_count: usize,
    pub enabled: bool,
}

/// A decoration patch as seen by [`HeadlessScene`].
#[derive(Clone, Debug)]
pub struct PatchRecord {
    pub kind: PatchKind,
    pub instance_count: usize,
    pub enabled: bool,
}

/// In-memory [`SceneBackend`] that records what a renderer would hold.
///
/// Releasing a handle twice, or one it never issued, panics: a real backend
/// would free foreign memory there.
#[derive(Default)]
pub struct HeadlessScene {
    next_handle: u64,
    meshes: FxHashMap<MeshHandle, MeshRecord>,
    colliders: FxHashMap<ColliderHandle, MeshHandle>,
    patches: FxHashMap<PatchHandle, PatchRecord>,
    meshes_created: u64,
    meshes_disposed: u64,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    pub fn mesh(&self, handle: MeshHandle) -> Option<&MeshRecord> {
        self.meshes.get(&handle)
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn enabled_mesh_count(&self) -> usize {
        self.meshes.values().filter(|m| m.enabled).count()
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    pub fn patch(&self, handle: PatchHandle) -> Option<&PatchRecord> {
        self.patches.get(&handle)
    }

    pub fn patch_count(&self) -> usize {
        self.patches.len()
    }

    /// Total number of instances across all live patches.
    pub fn instance_count(&self) -> usize {
        self.patches.values().map(|p| p.instance_count).sum()
    }

    pub fn meshes_created(&self) -> u64 {
        self.meshes_created
    }

    pub fn meshes_disposed(&self) -> u64 {
        self.meshes_disposed
    }
}

impl SceneBackend for HeadlessScene {
    fn create_mesh(
        &mut self,
        chunk: ChunkId,
        name: &str,
        local_position: DVec3,
        geometry: &ChunkMeshData,
    ) -> MeshHandle {
        let handle = MeshHandle(self.next());
        self.meshes.insert(
            handle,
            MeshRecord {
                chunk,
                name: name.to_owned(),
                local_position,
                vertex_count: geometry.vertex_count(),
                enabled: true,
            },
        );
        self.meshes_created += 1;
        handle
    }

    fn set_mesh_enabled(&mut self, mesh: MeshHandle, enabled: bool) {
        match self.meshes.get_mut(&mesh) {
            Some(record) => record.enabled = enabled,
            None => panic!("mesh {mesh:?} is not alive"),
        }
    }

    fn dispose_mesh(&mut self, mesh: MeshHandle) {
        if self.meshes.remove(&mesh).is_none() {
            panic!("mesh {mesh:?} disposed twice");
        }
        self.meshes_disposed += 1;
    }

    fn create_static_collider(&mut self, mesh: MeshHandle, _local_position: DVec3) -> ColliderHandle {
        assert!(self.meshes.contains_key(&mesh), "collider for dead mesh {mesh:?}");
        let handle = ColliderHandle(self.next());
        self.colliders.insert(handle, mesh);
        handle
    }

    fn dispose_collider(&mut self, collider: ColliderHandle) {
        if self.colliders.remove(&collider).is_none() {
            panic!("collider {collider:?} disposed twice");
        }
    }

    fn scatter_instances(&mut self, kind: PatchKind, _local_position: DVec3, matrices: Vec<f32>) -> PatchHandle {
        let handle = PatchHandle(self.next());
        self.patches.insert(
            handle,
            PatchRecord {
                kind,
                instance_count: matrices.len() / FLOATS_PER_MATRIX,
                enabled: true,
            },
        );
        handle
    }

    fn set_patch_enabled(&mut self, patch: PatchHandle, enabled: bool) {
        match self.patches.get_mut(&patch) {
            Some(record) => record.enabled = enabled,
            None => panic!("patch {patch:?} is not alive"),
        }
    }

    fn dispose_patch(&mut self, patch: PatchHandle) {
        if self.patches.remove(&patch).is_none() {
            panic!("patch {patch:?} disposed twice");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh_data() -> ChunkMeshData {
        ChunkMeshData {
            positions: vec![0.0; 12],
            normals: vec![0.0; 12],
            indices: vec![0, 1, 2, 0, 2, 3],
            ..Default::default()
        }
    }

    #[test]
    fn test_mesh_lifecycle_is_recorded() {
        let mut scene = HeadlessScene::new();
        let mesh = scene.create_mesh(ChunkId(1), "chunk", DVec3::ZERO, &mesh_data());
        assert_eq!(scene.mesh(mesh).map(|m| m.vertex_count), Some(4));
        scene.set_mesh_enabled(mesh, false);
        assert_eq!(scene.enabled_mesh_count(), 0);
        scene.dispose_mesh(mesh);
        assert_eq!(scene.mesh_count(), 0);
        assert_eq!((scene.meshes_created(), scene.meshes_disposed()), (1, 1));
    }

    #[test]
    #[should_panic(expected = "disposed twice")]
    fn test_double_mesh_dispose_panics() {
        let mut scene = HeadlessScene::new();
        let mesh = scene.create_mesh(ChunkId(1), "chunk", DVec3::ZERO, &mesh_data());
        scene.dispose_mesh(mesh);
        scene.dispose_mesh(mesh);
    }

    #[test]
    fn test_patches_count_whole_matrices() {
        let mut scene = HeadlessScene::new();
        let patch = scene.scatter_instances(PatchKind::Rocks, DVec3::ZERO, vec![0.0; 3 * FLOATS_PER_MATRIX]);
        assert_eq!(scene.instance_count(), 3);
        scene.set_patch_enabled(patch, false);
        assert_eq!(scene.patch(patch).map(|p| p.enabled), Some(false));
        scene.dispose_patch(patch);
        assert_eq!(scene.patch_count(), 0);
    }

    #[test]
    fn test_colliders_follow_their_mesh() {
        let mut scene = HeadlessScene::new();
        let mesh = scene.create_mesh(ChunkId(7), "chunk", DVec3::ZERO, &mesh_data());
        let collider = scene.create_static_collider(mesh, DVec3::ZERO);
        assert_eq!(scene.collider_count(), 1);
        scene.dispose_collider(collider);
        scene.dispose_mesh(mesh);
        assert_eq!(scene.collider_count(), 0);
    }
}
