//! Planet surface streaming: face quadtrees of chunks, an off-thread chunk forge, and deferred deletion of replaced chunks.

mod chunk;
mod chunk_tree;
mod deferred_deletion;
mod error;
mod forge;
mod latch;
mod planet;
mod scene;
mod settings;
mod store;
mod transform;

pub mod culling;

pub use chunk::{Chunk, ChunkEvent, ChunkId, ChunkState};
pub use chunk_tree::{ChunkTree, NodeId, TreeContext};
pub use deferred_deletion::{DeferredDeletion, DeletionStats, ReplacementSet, SetId};
pub use error::LodError;
pub use forge::{
    ApplyTask, BuildTask, ChunkForge, DeleteTask, ForgeError, ForgeStats, ForgeTask, default_worker_count,
};
pub use latch::{CompletionLatch, LatchState};
pub use planet::{PlanetSurface, PlanetTerrain, TerrainStats};
pub use scene::{
    ColliderHandle, HeadlessScene, MeshHandle, MeshRecord, PatchHandle, PatchKind, PatchRecord, SceneBackend,
};
pub use settings::{ChunkSettings, CullingSettings, ForgeSettings, LodSettings, StreamingSettings};
pub use store::ChunkStore;
pub use transform::PlanetTransform;
