//! Messages exchanged with geometry workers.

use glam::DVec3;
use tellus_cubesphere::CubeFace;

use crate::TerrainSettings;

/// Number of `f32` values per instance matrix (column-major 4x4).
pub const FLOATS_PER_MATRIX: usize = 16;

/// Everything a worker needs to build one chunk. Sent by value.
#[derive(Clone, Debug)]
pub struct BuildRequest {
    pub face: CubeFace,
    pub depth: usize,
    /// Center of the chunk on the cube surface, already rotated onto `face`.
    pub cube_position: DVec3,
    pub planet_name: String,
    pub planet_seed: u64,
    pub planet_diameter: f64,
    pub terrain: TerrainSettings,
    /// Vertices per grid row. The mesh has `vertex_resolution^2` vertices.
    pub vertex_resolution: u32,
}

impl BuildRequest {
    /// Side length of the chunk on the cube.
    pub fn chunk_length(&self) -> f64 {
        self.planet_diameter / 2f64.powi(self.depth as i32)
    }

    pub fn planet_radius(&self) -> f64 {
        self.planet_diameter / 2.0
    }

    /// Center of the chunk projected on the base sphere. Mesh positions are
    /// expressed relative to this point.
    pub fn sphere_position(&self) -> DVec3 {
        self.cube_position.normalize() * self.planet_radius()
    }
}

/// Geometry produced by a worker for one chunk.
#[derive(Clone, Debug, Default)]
pub struct ChunkMeshData {
    /// Flat `xyz` triples relative to the chunk's sphere position.
    pub positions: Vec<f32>,
    /// Flat unit `xyz` triples, one per vertex.
    pub normals: Vec<f32>,
    /// Triangle list, counter-clockwise seen from outside the planet.
    pub indices: Vec<u32>,
    /// Instance matrices oriented along the terrain normal.
    pub aligned_instances: Vec<f32>,
    /// Instance matrices oriented along the planet's radial direction.
    pub upright_instances: Vec<f32>,
    /// Mean vertex height above the base radius.
    pub average_height: f64,
}

impl ChunkMeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn aligned_instance_count(&self) -> usize {
        self.aligned_instances.len() / FLOATS_PER_MATRIX
    }

    pub fn upright_instance_count(&self) -> usize {
        self.upright_instances.len() / FLOATS_PER_MATRIX
    }

    pub fn has_instances(&self) -> bool {
        !self.aligned_instances.is_empty() || !self.upright_instances.is_empty()
    }
}
