//! Arena owning every live chunk of a planet.

use crossbeam_channel::Sender;
use glam::DVec3;
use rustc_hash::FxHashMap;
use tellus_cubesphere::{ChunkPath, CubeFace};
use tellus_terrain::ChunkMeshData;
use tracing::trace;

use crate::scene::SceneBackend;
use crate::{Chunk, ChunkEvent, ChunkId, ChunkSettings, CullingSettings, PlanetTransform};

/// Live chunks keyed by [`ChunkId`].
///
/// A disposed chunk is removed, so "not in the store" and "disposed" are the
/// same thing. Lifecycle transitions are published on the event channel.
pub struct ChunkStore {
    chunks: FxHashMap<ChunkId, Chunk>,
    next_id: u64,
    settings: ChunkSettings,
    events: Sender<ChunkEvent>,
}

impl ChunkStore {
    pub fn new(settings: ChunkSettings, events: Sender<ChunkEvent>) -> Self {
        Self {
            chunks: FxHashMap::default(),
            next_id: 0,
            settings,
            events,
        }
    }

    /// Create a pending chunk and return its fresh id.
    pub fn create(&mut self, face: CubeFace, path: ChunkPath, root_length: f64) -> ChunkId {
        self.next_id += 1;
        let id = ChunkId(self.next_id);
        self.chunks.insert(id, Chunk::new(id, face, path, root_length));
        id
    }

    pub fn get(&self, id: ChunkId) -> Option<&Chunk> {
        self.chunks.get(&id)
    }

    pub fn contains(&self, id: ChunkId) -> bool {
        self.chunks.contains_key(&id)
    }

    pub fn is_ready(&self, id: ChunkId) -> bool {
        self.get(id).is_some_and(Chunk::is_ready)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn ready_count(&self) -> usize {
        self.chunks.values().filter(|c| c.is_ready()).count()
    }

    /// Total number of chunks ever created.
    pub fn created_count(&self) -> u64 {
        self.next_id
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    pub fn settings(&self) -> &ChunkSettings {
        &self.settings
    }

    /// Apply built geometry to a chunk. Returns false when the chunk has
    /// already been disposed, in which case the geometry is dropped.
    pub fn init(&mut self, id: ChunkId, geometry: ChunkMeshData, scene: &mut dyn SceneBackend) -> bool {
        let Some(chunk) = self.chunks.get_mut(&id) else {
            trace!(chunk = %id, "dropping geometry for disposed chunk");
            return false;
        };
        chunk.init(geometry, &self.settings, scene);
        self.publish(ChunkEvent::GeometryReady(id));
        true
    }

    /// Dispose a chunk and forget it.
    ///
    /// # Panics
    ///
    /// Panics if the chunk is unknown, which means it was disposed before.
    pub fn dispose(&mut self, id: ChunkId, scene: &mut dyn SceneBackend) {
        let Some(mut chunk) = self.chunks.remove(&id) else {
            panic!("chunk {id} disposed twice");
        };
        chunk.dispose(scene);
        self.publish(ChunkEvent::Disposed(id));
    }

    /// Run the visibility tests of every ready chunk.
    pub fn compute_culling(
        &mut self,
        observer: DVec3,
        transform: &PlanetTransform,
        settings: &CullingSettings,
        scene: &mut dyn SceneBackend,
    ) {
        for chunk in self.chunks.values_mut().filter(|c| c.is_ready()) {
            chunk.compute_culling(observer, transform, settings, scene);
        }
    }

    fn publish(&self, event: ChunkEvent) {
        // Nobody listening means the planet is being torn down.
        let _ = self.events.send(event);
    }
}
