//! Per-face chunk quadtree that subdivides and collapses around the observer.

use std::sync::Arc;

use glam::DVec3;
use tellus_cubesphere::{ChunkPath, CubeFace, cube_space_position, sphere_space_position};
use tellus_terrain::BuildRequest;
use tracing::debug;

use crate::scene::SceneBackend;
use crate::{ChunkForge, ChunkId, ChunkStore, DeferredDeletion, LodSettings, PlanetSurface, PlanetTransform};

/// Index of a node in a tree's arena. Slots are recycled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

#[derive(Clone, Copy, Debug)]
enum Node {
    Leaf(ChunkId),
    Internal([NodeId; 4]),
}

#[derive(Debug)]
struct TreeNode {
    path: ChunkPath,
    /// Unit vector from the planet center through the node center, planet-local.
    direction: DVec3,
    /// Terrain height used for distances until the node's own chunk is ready.
    height_estimate: f64,
    node: Node,
}

/// The shared per-planet state a tree mutates during a frame.
pub struct TreeContext<'a> {
    pub store: &'a mut ChunkStore,
    pub forge: &'a mut ChunkForge,
    pub deletion: &'a mut DeferredDeletion,
}

/// Quadtree of chunks covering one cube face.
///
/// Leaves own exactly one chunk each. Chunks replaced by a subdivision or a
/// collapse leave the tree immediately but stay alive in the store until the
/// deferred-deletion coordinator releases them.
pub struct ChunkTree {
    face: CubeFace,
    surface: Arc<PlanetSurface>,
    settings: LodSettings,
    root_length: f64,
    max_depth: usize,
    nodes: Vec<Option<TreeNode>>,
    free: Vec<NodeId>,
    root: Option<NodeId>,
}

impl ChunkTree {
    pub fn new(face: CubeFace, surface: Arc<PlanetSurface>, settings: LodSettings) -> Self {
        let root_length = surface.root_length();
        let max_depth = settings.max_depth(root_length);
        Self {
            face,
            surface,
            settings,
            root_length,
            max_depth,
            nodes: Vec::new(),
            free: Vec::new(),
            root: None,
        }
    }

    pub fn face(&self) -> CubeFace {
        self.face
    }

    /// Depth no leaf of this tree ever exceeds.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn has_root(&self) -> bool {
        self.root.is_some()
    }

    pub fn root_is_internal(&self) -> bool {
        self.root
            .is_some_and(|id| matches!(self.get(id).node, Node::Internal(_)))
    }

    /// Walk the tree once for `observer` (world space).
    pub fn update(&mut self, observer: DVec3, transform: &PlanetTransform, ctx: &mut TreeContext<'_>) {
        match self.root {
            Some(root) => self.update_node(root, observer, transform, ctx),
            None => {
                let estimate = self.surface.terrain.mean_height_estimate();
                let chunk = self.spawn_chunk(&ChunkPath::root(), ctx);
                self.root = Some(self.alloc(ChunkPath::root(), estimate, Node::Leaf(chunk)));
                debug!(face = %self.face, chunk = %chunk, "root chunk created");
            }
        }
    }

    fn update_node(&mut self, id: NodeId, observer: DVec3, transform: &PlanetTransform, ctx: &mut TreeContext<'_>) {
        let node = self.get(id);
        let kind = node.node;
        let depth = node.path.depth();
        let height = match kind {
            Node::Leaf(chunk) => ctx
                .store
                .get(chunk)
                .filter(|c| c.is_ready())
                .map_or(node.height_estimate, |c| c.average_height()),
            Node::Internal(_) => node.height_estimate,
        };
        let position = transform.to_world(node.direction * (self.root_length / 2.0 + height));
        let distance_sq = position.distance_squared(observer);

        match kind {
            Node::Internal(children) => {
                let threshold = self.settings.deletion_threshold(self.root_length, depth);
                if depth >= self.settings.min_depth && distance_sq > threshold * threshold {
                    self.collapse(id, ctx);
                } else {
                    for child in children {
                        self.update_node(child, observer, transform, ctx);
                    }
                }
            }
            Node::Leaf(chunk) => {
                let threshold = self.settings.subdivision_threshold(self.root_length, depth);
                let wanted = depth < self.settings.min_depth || distance_sq < threshold * threshold;
                let shown = ctx.store.get(chunk).is_some_and(|c| c.is_ready() && c.is_enabled());
                if wanted && depth < self.max_depth && shown {
                    self.subdivide(id, height, ctx);
                }
            }
        }
    }

    /// Replace the leaf `id` by four pending children. The leaf's chunk stays
    /// on screen until all four are ready.
    fn subdivide(&mut self, id: NodeId, height: f64, ctx: &mut TreeContext<'_>) {
        let Node::Leaf(old) = self.get(id).node else {
            return;
        };
        let path = self.get(id).path.clone();
        let mut new_chunks = Vec::with_capacity(4);
        let children = path.children().map(|child_path| {
            let chunk = self.spawn_chunk(&child_path, ctx);
            new_chunks.push(chunk);
            self.alloc(child_path, height, Node::Leaf(chunk))
        });

        let node = self.get_mut(id);
        node.node = Node::Internal(children);
        node.height_estimate = height;
        debug!(face = %self.face, path = %path, depth = path.depth(), "subdividing");
        ctx.deletion.register(ctx.store, new_chunks, vec![old]);
    }

    /// Replace the subtree under `id` by one pending chunk at the same path.
    fn collapse(&mut self, id: NodeId, ctx: &mut TreeContext<'_>) {
        let Node::Internal(children) = self.get(id).node else {
            return;
        };
        let mut old_chunks = Vec::new();
        for child in children {
            self.release(child, &mut old_chunks);
        }
        let path = self.get(id).path.clone();
        let chunk = self.spawn_chunk(&path, ctx);
        self.get_mut(id).node = Node::Leaf(chunk);
        debug!(
            face = %self.face,
            path = %path,
            depth = path.depth(),
            old = old_chunks.len(),
            "collapsing"
        );
        ctx.deletion.register(ctx.store, vec![chunk], old_chunks);
    }

    /// Rebuild the whole face from a fresh root chunk. The current leaves are
    /// released once the new root is ready.
    pub fn reset(&mut self, ctx: &mut TreeContext<'_>) {
        let Some(root) = self.root.take() else {
            return;
        };
        let mut old_chunks = Vec::new();
        self.release(root, &mut old_chunks);

        let estimate = self.surface.terrain.mean_height_estimate();
        let chunk = self.spawn_chunk(&ChunkPath::root(), ctx);
        self.root = Some(self.alloc(ChunkPath::root(), estimate, Node::Leaf(chunk)));
        debug!(face = %self.face, old = old_chunks.len(), "tree reset");
        ctx.deletion.register(ctx.store, vec![chunk], old_chunks);
    }

    /// Dispose every leaf chunk and empty the tree.
    pub fn dispose(&mut self, store: &mut ChunkStore, scene: &mut dyn SceneBackend) {
        for chunk in self.leaves() {
            if store.contains(chunk) {
                store.dispose(chunk, scene);
            }
        }
        self.nodes.clear();
        self.free.clear();
        self.root = None;
    }

    /// Chunks currently at the leaves, depth first.
    pub fn leaves(&self) -> Vec<ChunkId> {
        let mut leaves = Vec::new();
        if let Some(root) = self.root {
            self.visit_leaves(root, &mut |_, chunk| leaves.push(chunk));
        }
        leaves
    }

    pub fn leaf_count(&self) -> usize {
        let mut count = 0;
        if let Some(root) = self.root {
            self.visit_leaves(root, &mut |_, _| count += 1);
        }
        count
    }

    pub fn max_leaf_depth(&self) -> usize {
        let mut depth = 0;
        if let Some(root) = self.root {
            self.visit_leaves(root, &mut |path, _| depth = depth.max(path.depth()));
        }
        depth
    }

    /// Live nodes, internal ones included.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    fn visit_leaves(&self, id: NodeId, f: &mut impl FnMut(&ChunkPath, ChunkId)) {
        let node = self.get(id);
        match node.node {
            Node::Leaf(chunk) => f(&node.path, chunk),
            Node::Internal(children) => {
                for child in children {
                    self.visit_leaves(child, f);
                }
            }
        }
    }

    /// Free the subtree at `id`, collecting its leaf chunks.
    fn release(&mut self, id: NodeId, chunks: &mut Vec<ChunkId>) {
        let Some(node) = self.nodes[id.0 as usize].take() else {
            panic!("tree node {id:?} released twice");
        };
        self.free.push(id);
        match node.node {
            Node::Leaf(chunk) => chunks.push(chunk),
            Node::Internal(children) => {
                for child in children {
                    self.release(child, chunks);
                }
            }
        }
    }

    fn spawn_chunk(&self, path: &ChunkPath, ctx: &mut TreeContext<'_>) -> ChunkId {
        let chunk = ctx.store.create(self.face, path.clone(), self.root_length);
        ctx.forge.submit_build(chunk, self.build_request(path));
        chunk
    }

    fn build_request(&self, path: &ChunkPath) -> BuildRequest {
        let planet = &self.surface.planet;
        BuildRequest {
            face: self.face,
            depth: path.depth(),
            cube_position: cube_space_position(self.root_length, path, self.face),
            planet_name: planet.name.clone(),
            planet_seed: planet.seed,
            planet_diameter: planet.diameter(),
            terrain: self.surface.terrain.clone(),
            vertex_resolution: self.settings.vertex_resolution,
        }
    }

    fn alloc(&mut self, path: ChunkPath, height_estimate: f64, node: Node) -> NodeId {
        let direction = sphere_space_position(self.root_length, &path, self.face).normalize();
        let slot = Some(TreeNode {
            path,
            direction,
            height_estimate,
            node,
        });
        match self.free.pop() {
            Some(id) => {
                self.nodes[id.0 as usize] = slot;
                id
            }
            None => {
                self.nodes.push(slot);
                NodeId((self.nodes.len() - 1) as u32)
            }
        }
    }

    fn get(&self, id: NodeId) -> &TreeNode {
        match &self.nodes[id.0 as usize] {
            Some(node) => node,
            None => panic!("tree node {id:?} used after release"),
        }
    }

    fn get_mut(&mut self, id: NodeId) -> &mut TreeNode {
        match &mut self.nodes[id.0 as usize] {
            Some(node) => node,
            None => panic!("tree node {id:?} used after release"),
        }
    }
}
