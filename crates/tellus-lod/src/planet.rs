//! A planet's streamed surface: six chunk trees around one shared pipeline.

use std::sync::Arc;

use crossbeam_channel::unbounded;
use glam::DVec3;
use tellus_cubesphere::{CubeFace, PlanetDef};
use tellus_terrain::{TerrainGenerator, TerrainSettings};
use tracing::info;

use crate::chunk_tree::TreeContext;
use crate::scene::SceneBackend;
use crate::{
    ChunkForge, ChunkStore, ChunkTree, DeferredDeletion, DeletionStats, ForgeStats, LodError, PlanetTransform,
    StreamingSettings,
};

/// What every chunk of a planet is generated from.
#[derive(Clone, Debug, PartialEq)]
pub struct PlanetSurface {
    pub planet: PlanetDef,
    pub terrain: TerrainSettings,
}

impl PlanetSurface {
    pub fn new(planet: PlanetDef, terrain: TerrainSettings) -> Self {
        Self { planet, terrain }
    }

    /// Side length of a face root chunk.
    pub fn root_length(&self) -> f64 {
        self.planet.diameter()
    }
}

/// Per-frame summary of a planet's streaming state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TerrainStats {
    pub leaves: usize,
    pub chunks: usize,
    pub ready_chunks: usize,
    pub max_leaf_depth: usize,
    pub forge: ForgeStats,
    pub deletion: DeletionStats,
}

/// Streams the surface of one planet.
///
/// Call [`update`](Self::update) once per frame with the observer position;
/// [`compute_culling`](Self::compute_culling) may run at its own cadence.
pub struct PlanetTerrain {
    surface: Arc<PlanetSurface>,
    settings: StreamingSettings,
    transform: PlanetTransform,
    trees: Vec<ChunkTree>,
    store: ChunkStore,
    forge: ChunkForge,
    deletion: DeferredDeletion,
}

impl PlanetTerrain {
    pub fn new(
        planet: PlanetDef,
        terrain: TerrainSettings,
        settings: StreamingSettings,
        generator: Arc<dyn TerrainGenerator>,
    ) -> Result<Self, LodError> {
        settings.lod.validate_for_root(planet.diameter())?;
        let surface = Arc::new(PlanetSurface::new(planet, terrain));
        let (events_tx, events_rx) = unbounded();
        let forge = ChunkForge::new(
            settings.forge.resolved_worker_count(),
            settings.forge.max_applies_per_frame,
            generator,
        )?;
        let trees: Vec<ChunkTree> = CubeFace::ALL
            .iter()
            .map(|&face| ChunkTree::new(face, Arc::clone(&surface), settings.lod.clone()))
            .collect();

        info!(
            planet = %surface.planet.name,
            radius = surface.planet.radius,
            max_depth = trees[0].max_depth(),
            "planet terrain created"
        );
        Ok(Self {
            store: ChunkStore::new(settings.chunk.clone(), events_tx),
            deletion: DeferredDeletion::new(events_rx),
            surface,
            settings,
            transform: PlanetTransform::default(),
            trees,
            forge,
        })
    }

    /// One frame: walk every face, run the forge, then release replaced chunks.
    pub fn update(&mut self, observer: DVec3, scene: &mut dyn SceneBackend) {
        let mut ctx = TreeContext {
            store: &mut self.store,
            forge: &mut self.forge,
            deletion: &mut self.deletion,
        };
        for tree in &mut self.trees {
            tree.update(observer, &self.transform, &mut ctx);
        }
        self.forge.update(&mut self.store, scene);
        self.deletion.update(&mut self.store, scene);
    }

    pub fn compute_culling(&mut self, observer: DVec3, scene: &mut dyn SceneBackend) {
        self.store
            .compute_culling(observer, &self.transform, &self.settings.culling, scene);
    }

    /// Regenerate every face. The current surface stays until its
    /// replacement is ready.
    pub fn reset(&mut self) {
        self.forge.reset();
        let mut ctx = TreeContext {
            store: &mut self.store,
            forge: &mut self.forge,
            deletion: &mut self.deletion,
        };
        for tree in &mut self.trees {
            tree.reset(&mut ctx);
        }
    }

    /// Release every chunk of the planet.
    pub fn dispose(&mut self, scene: &mut dyn SceneBackend) {
        self.deletion.dispose(&mut self.store, scene);
        for tree in &mut self.trees {
            tree.dispose(&mut self.store, scene);
        }
        self.forge.reset();
        info!(planet = %self.surface.planet.name, "planet terrain disposed");
    }

    pub fn transform(&self) -> &PlanetTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: PlanetTransform) {
        self.transform = transform;
    }

    pub fn surface(&self) -> &PlanetSurface {
        &self.surface
    }

    pub fn settings(&self) -> &StreamingSettings {
        &self.settings
    }

    pub fn trees(&self) -> &[ChunkTree] {
        &self.trees
    }

    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    pub fn deletion(&self) -> &DeferredDeletion {
        &self.deletion
    }

    /// True when no build is queued, running or waiting, and no replacement is pending.
    pub fn is_settled(&self) -> bool {
        self.forge.is_idle() && self.deletion.live_sets() == 0
    }

    pub fn stats(&self) -> TerrainStats {
        TerrainStats {
            leaves: self.trees.iter().map(ChunkTree::leaf_count).sum(),
            chunks: self.store.len(),
            ready_chunks: self.store.ready_count(),
            max_leaf_depth: self.trees.iter().map(ChunkTree::max_leaf_depth).max().unwrap_or(0),
            forge: self.forge.stats(),
            deletion: self.deletion.stats(),
        }
    }
}
