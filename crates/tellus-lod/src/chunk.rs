//! One terrain patch of a face quadtree and its lifecycle.

use std::fmt;

use glam::DVec3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tellus_cubesphere::{ChunkPath, CubeFace, cube_space_position, sphere_space_position};
use tellus_terrain::{ChunkMeshData, random_down_sample};

use crate::culling::{is_above_horizon, is_large_enough_on_screen, tangential_distance};
use crate::scene::{ColliderHandle, MeshHandle, PatchHandle, PatchKind, SceneBackend};
use crate::{ChunkSettings, CullingSettings, PlanetTransform};

/// Stable identity of a chunk. Never reused within a [`ChunkStore`](crate::ChunkStore).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId(pub u64);

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// ```text
/// Pending --init--> Ready --dispose--> Disposed
///    \____________dispose_____________/
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkState {
    /// Created and queued for building; nothing to show yet.
    Pending,
    /// Geometry uploaded. May still be hidden by culling.
    Ready,
    /// Resources released. Terminal.
    Disposed,
}

/// Lifecycle notifications published by the chunk store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkEvent {
    /// Sent exactly once per chunk, on `Pending -> Ready`.
    GeometryReady(ChunkId),
    Disposed(ChunkId),
}

/// A square patch of one cube face at some quadtree depth.
///
/// Geometry never changes after `init`; a different level of detail is always
/// a different chunk.
#[derive(Debug)]
pub struct Chunk {
    id: ChunkId,
    face: CubeFace,
    path: ChunkPath,
    side_length: f64,
    cube_position: DVec3,
    sphere_position: DVec3,
    state: ChunkState,
    enabled: bool,
    decorations_visible: bool,
    average_height: f64,
    mesh: Option<MeshHandle>,
    collider: Option<ColliderHandle>,
    patches: Vec<PatchHandle>,
}

impl Chunk {
    /// A pending chunk on a face whose root has side `root_length`.
    pub fn new(id: ChunkId, face: CubeFace, path: ChunkPath, root_length: f64) -> Self {
        let side_length = root_length / 2f64.powi(path.depth() as i32);
        Self {
            id,
            face,
            cube_position: cube_space_position(root_length, &path, face),
            sphere_position: sphere_space_position(root_length, &path, face),
            path,
            side_length,
            state: ChunkState::Pending,
            enabled: false,
            decorations_visible: true,
            average_height: 0.0,
            mesh: None,
            collider: None,
            patches: Vec::new(),
        }
    }

    pub fn id(&self) -> ChunkId {
        self.id
    }

    pub fn face(&self) -> CubeFace {
        self.face
    }

    pub fn path(&self) -> &ChunkPath {
        &self.path
    }

    pub fn depth(&self) -> usize {
        self.path.depth()
    }

    pub fn side_length(&self) -> f64 {
        self.side_length
    }

    pub fn bounding_radius(&self) -> f64 {
        self.side_length / 2.0
    }

    /// Center on the cube surface; what geometry workers are given.
    pub fn cube_position(&self) -> DVec3 {
        self.cube_position
    }

    /// Center projected onto the base sphere, planet-local.
    pub fn sphere_position(&self) -> DVec3 {
        self.sphere_position
    }

    pub fn world_position(&self, transform: &PlanetTransform) -> DVec3 {
        transform.to_world(self.sphere_position)
    }

    pub fn state(&self) -> ChunkState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == ChunkState::Ready
    }

    pub fn is_disposed(&self) -> bool {
        self.state == ChunkState::Disposed
    }

    /// Whether the mesh is currently shown. Always false unless ready.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn decorations_visible(&self) -> bool {
        self.decorations_visible
    }

    pub fn average_height(&self) -> f64 {
        self.average_height
    }

    pub fn mesh(&self) -> Option<MeshHandle> {
        self.mesh
    }

    pub fn collider(&self) -> Option<ColliderHandle> {
        self.collider
    }

    pub fn patches(&self) -> &[PatchHandle] {
        &self.patches
    }

    pub fn name(&self) -> String {
        format!("chunk {}/{} {}", self.face, self.path, self.id)
    }

    /// Upload geometry and attach collider and decorations: `Pending -> Ready`.
    ///
    /// # Panics
    ///
    /// Panics unless the chunk is pending. Initializing a disposed chunk means
    /// a stale build result slipped past the forge.
    pub fn init(&mut self, geometry: ChunkMeshData, settings: &ChunkSettings, scene: &mut dyn SceneBackend) {
        match self.state {
            ChunkState::Pending => {}
            ChunkState::Ready => panic!("tried to init {} twice", self.name()),
            ChunkState::Disposed => panic!("tried to init {} but it has been disposed", self.name()),
        }

        let mesh = scene.create_mesh(self.id, &self.name(), self.sphere_position, &geometry);
        if self.depth() > settings.collision_min_depth {
            self.collider = Some(scene.create_static_collider(mesh, self.sphere_position));
        }
        self.mesh = Some(mesh);
        self.average_height = geometry.average_height;
        self.enabled = true;
        self.state = ChunkState::Ready;

        if geometry.upright_instances.is_empty() {
            return;
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.id.0);
        let rocks = random_down_sample(&geometry.aligned_instances, settings.max_rock_instances, &mut rng);
        self.scatter(scene, PatchKind::Rocks, rocks);

        if self.average_height > settings.vegetation_min_height {
            let upright = geometry.upright_instances;
            let trees = random_down_sample(&upright, settings.max_tree_instances, &mut rng);
            let butterflies = random_down_sample(&upright, settings.max_butterfly_instances, &mut rng);
            self.scatter(scene, PatchKind::Trees, trees);
            self.scatter(scene, PatchKind::Butterflies, butterflies);
            self.scatter(scene, PatchKind::Grass, upright);
        }
    }

    fn scatter(&mut self, scene: &mut dyn SceneBackend, kind: PatchKind, matrices: Vec<f32>) {
        if matrices.is_empty() {
            return;
        }
        let patch = scene.scatter_instances(kind, self.sphere_position, matrices);
        self.patches.push(patch);
    }

    /// Toggle mesh and decoration visibility for the observer. Geometry is untouched.
    pub fn compute_culling(
        &mut self,
        observer: DVec3,
        transform: &PlanetTransform,
        settings: &CullingSettings,
        scene: &mut dyn SceneBackend,
    ) {
        let Some(mesh) = self.mesh.filter(|_| self.is_ready()) else {
            return;
        };
        let center = self.world_position(transform);
        let planet_center = transform.center();
        let radius = self.bounding_radius();

        let visible = is_above_horizon(center, radius, planet_center, observer)
            && is_large_enough_on_screen(center, radius, observer, settings.fov, settings.min_screen_fraction);
        if visible != self.enabled {
            scene.set_mesh_enabled(mesh, visible);
            self.enabled = visible;
        }

        let near = tangential_distance(center, planet_center, observer) < settings.decoration_distance;
        if near != self.decorations_visible {
            for &patch in &self.patches {
                scene.set_patch_enabled(patch, near);
            }
            self.decorations_visible = near;
        }
    }

    /// Release every scene resource: `-> Disposed`.
    ///
    /// # Panics
    ///
    /// Panics if the chunk was already disposed.
    pub fn dispose(&mut self, scene: &mut dyn SceneBackend) {
        assert!(!self.is_disposed(), "{} disposed twice", self.name());
        if let Some(collider) = self.collider.take() {
            scene.dispose_collider(collider);
        }
        for patch in self.patches.drain(..) {
            scene.dispose_patch(patch);
        }
        if let Some(mesh) = self.mesh.take() {
            scene.dispose_mesh(mesh);
        }
        self.enabled = false;
        self.state = ChunkState::Disposed;
    }
}
