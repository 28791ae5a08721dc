//! Worker-side chunk geometry: a displaced grid over one patch of the cubesphere.

use glam::DVec3;

use crate::heightmap::{FbmLayer, FbmSampler};
use crate::scatter::{Placements, ScatterParams};
use crate::seed::chunk_rng;
use crate::{BuildRequest, ChunkMeshData, TerrainSettings};

/// Builds chunk geometry from a [`BuildRequest`].
///
/// Implementations run on forge worker threads and must be deterministic:
/// the same request always yields the same mesh.
pub trait TerrainGenerator: Send + Sync {
    fn generate(&self, request: &BuildRequest) -> ChunkMeshData;
}

/// Continents, ridged mountains and bumps layered over 3D simplex noise.
#[derive(Clone, Debug, Default)]
pub struct NoiseTerrainGenerator {
    scatter: ScatterParams,
}

impl NoiseTerrainGenerator {
    pub fn new(scatter: ScatterParams) -> Self {
        Self { scatter }
    }

    pub fn scatter_params(&self) -> &ScatterParams {
        &self.scatter
    }
}

/// The three noise layers of one planet, normalized to `[0, 1]` or `[-1, 1]`.
struct HeightField<'a> {
    settings: &'a TerrainSettings,
    continents: FbmSampler,
    mountains: FbmSampler,
    bumps: FbmSampler,
}

impl<'a> HeightField<'a> {
    fn new(seed: u64, settings: &'a TerrainSettings) -> Self {
        let base = (seed ^ (seed >> 32)) as u32;
        let layer = |frequency: f64, octaves: u32| FbmLayer {
            frequency,
            octaves,
            ..Default::default()
        };
        Self {
            settings,
            continents: FbmSampler::new(base, layer(settings.continents_frequency, 4)),
            mountains: FbmSampler::new(base.wrapping_add(1), layer(settings.mountains_frequency, 5)),
            bumps: FbmSampler::new(base.wrapping_add(2), layer(settings.bumps_frequency, 6)),
        }
    }

    /// Height above the base radius at a point of the unit sphere, in
    /// `[0, settings.max_height()]`.
    fn height(&self, unit: DVec3) -> f64 {
        let s = self.settings;
        let fragmentation = s.continents_fragmentation.clamp(0.0, 0.99);

        let continent = self.continents.sample(unit) / self.continents.max_amplitude();
        let mask = ((continent * 0.5 + 0.5 - fragmentation) / (1.0 - fragmentation)).clamp(0.0, 1.0);
        let mask = mask * mask * (3.0 - 2.0 * mask);

        let ridges = self.mountains.sample_ridged(unit) / self.mountains.max_amplitude();
        let bumps = self.bumps.sample(unit) / self.bumps.max_amplitude() * 0.5 + 0.5;

        mask * s.continent_base_height
            + mask * ridges.clamp(0.0, 1.0) * s.max_mountain_height
            + bumps.clamp(0.0, 1.0) * s.max_bump_height
    }
}

impl TerrainGenerator for NoiseTerrainGenerator {
    fn generate(&self, request: &BuildRequest) -> ChunkMeshData {
        let n = request.vertex_resolution.max(2) as usize;
        let field = HeightField::new(request.planet_seed, &request.terrain);
        let rotation = request.face.rotation();
        let size = request.chunk_length();
        let radius = request.planet_radius();
        let center = request.sphere_position();

        let mut local = Vec::with_capacity(n * n);
        let mut radial = Vec::with_capacity(n * n);
        let mut height_sum = 0.0;
        for x in 0..n {
            for y in 0..n {
                let ox = (x as f64 / (n - 1) as f64 - 0.5) * size;
                let oy = (y as f64 / (n - 1) as f64 - 0.5) * size;
                let unit = (request.cube_position + rotation * DVec3::new(ox, oy, 0.0)).normalize();
                let height = field.height(unit);
                height_sum += height;
                local.push(unit * (radius + height) - center);
                radial.push(unit);
            }
        }

        let mut indices = Vec::with_capacity((n - 1) * (n - 1) * 6);
        for x in 0..n - 1 {
            for y in 0..n - 1 {
                let i = (x * n + y) as u32;
                let row = n as u32;
                indices.extend_from_slice(&[i, i + 1, i + row + 1, i, i + row + 1, i + row]);
            }
        }

        let mut normals = vec![DVec3::ZERO; n * n];
        for tri in indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            // Unnormalized cross product weights each face by its area.
            let face_normal = (local[b] - local[a]).cross(local[c] - local[a]);
            normals[a] += face_normal;
            normals[b] += face_normal;
            normals[c] += face_normal;
        }
        for (normal, up) in normals.iter_mut().zip(&radial) {
            *normal = normal.try_normalize().unwrap_or(*up);
        }

        let mut placements = Placements::default();
        if request.depth >= self.scatter.min_depth {
            let mut rng = chunk_rng(request.planet_seed, request.face, request.depth, request.cube_position);
            for x in 0..n - 1 {
                for y in 0..n - 1 {
                    let quad = [x * n + y, (x + 1) * n + y, (x + 1) * n + y + 1, x * n + y + 1];
                    let corners = quad.map(|i| local[i]);
                    let normal = quad.iter().map(|&i| normals[i]).sum::<DVec3>().normalize();
                    let up = quad.iter().map(|&i| radial[i]).sum::<DVec3>().normalize();
                    placements.scatter_cell(&self.scatter, corners, normal, up, &mut rng);
                }
            }
        }

        ChunkMeshData {
            positions: flatten(&local),
            normals: flatten(&normals),
            indices,
            aligned_instances: placements.aligned,
            upright_instances: placements.upright,
            average_height: height_sum / (n * n) as f64,
        }
    }
}

fn flatten(vectors: &[DVec3]) -> Vec<f32> {
    vectors
        .iter()
        .flat_map(|v| [v.x as f32, v.y as f32, v.z as f32])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tellus_cubesphere::{ChunkPath, CubeFace, cube_space_position};

    const DIAMETER: f64 = 2.0 * 6_371_000.0;

    fn request(face: CubeFace, path: &ChunkPath, diameter: f64, resolution: u32) -> BuildRequest {
        BuildRequest {
            face,
            depth: path.depth(),
            cube_position: cube_space_position(diameter, path, face),
            planet_name: "Terra".into(),
            planet_seed: 42,
            planet_diameter: diameter,
            terrain: TerrainSettings::default(),
            vertex_resolution: resolution,
        }
    }

    fn vec3(buffer: &[f32], i: usize) -> DVec3 {
        DVec3::new(buffer[3 * i] as f64, buffer[3 * i + 1] as f64, buffer[3 * i + 2] as f64)
    }

    #[test]
    fn test_buffer_sizes_follow_resolution() {
        let generator = NoiseTerrainGenerator::default();
        let mesh = generator.generate(&request(CubeFace::PosX, &ChunkPath::from_indices(&[1, 2]), DIAMETER, 16));
        assert_eq!(mesh.vertex_count(), 16 * 16);
        assert_eq!(mesh.normals.len(), mesh.positions.len());
        assert_eq!(mesh.triangle_count(), 15 * 15 * 2);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertex_count()));
    }

    #[test]
    fn test_same_request_same_mesh() {
        let generator = NoiseTerrainGenerator::new(ScatterParams { min_depth: 0, ..Default::default() });
        let req = request(CubeFace::NegY, &ChunkPath::from_indices(&[3, 0, 2]), DIAMETER, 12);
        let a = generator.generate(&req);
        let b = generator.generate(&req);
        assert_eq!(a.positions, b.positions);
        assert_eq!(a.upright_instances, b.upright_instances);
        assert_eq!(a.average_height, b.average_height);
    }

    #[test]
    fn test_average_height_within_terrain_bounds() {
        let generator = NoiseTerrainGenerator::default();
        for face in CubeFace::ALL {
            let mesh = generator.generate(&request(face, &ChunkPath::from_indices(&[0]), DIAMETER, 8));
            let max = TerrainSettings::default().max_height();
            assert!(
                (0.0..=max).contains(&mesh.average_height),
                "face {face}: average height {} outside [0, {max}]",
                mesh.average_height
            );
        }
    }

    #[test]
    fn test_normals_are_unit_and_point_outward() {
        let generator = NoiseTerrainGenerator::default();
        let req = request(CubeFace::PosZ, &ChunkPath::from_indices(&[2, 2, 1, 0, 3]), DIAMETER, 16);
        let mesh = generator.generate(&req);
        let center = req.sphere_position();
        for i in 0..mesh.vertex_count() {
            let normal = vec3(&mesh.normals, i);
            let up = (center + vec3(&mesh.positions, i)).normalize();
            assert!((normal.length() - 1.0).abs() < 1e-5);
            assert!(normal.dot(up) > 0.0, "vertex {i} normal points inward");
        }
    }

    #[test]
    fn test_positions_are_relative_to_sphere_position() {
        let generator = NoiseTerrainGenerator::default();
        let req = request(CubeFace::NegX, &ChunkPath::from_indices(&[1, 1, 1, 1, 1, 1]), DIAMETER, 9);
        let mesh = generator.generate(&req);
        // The middle vertex sits straight above the chunk center.
        let middle = vec3(&mesh.positions, 4 * 9 + 4);
        let max = req.terrain.max_height();
        assert!(middle.length() <= max + 1.0, "middle vertex {middle:?} too far from center");
        assert!(middle.normalize_or_zero().dot(req.sphere_position().normalize()) > 0.99 || middle.length() < 1.0);
    }

    #[test]
    fn test_sibling_chunks_share_edge_vertices() {
        let diameter = 20_000.0;
        let n = 9;
        let generator = NoiseTerrainGenerator::default();
        let left = request(CubeFace::PosY, &ChunkPath::from_indices(&[0]), diameter, n);
        let right = request(CubeFace::PosY, &ChunkPath::from_indices(&[1]), diameter, n);
        let left_mesh = generator.generate(&left);
        let right_mesh = generator.generate(&right);
        let n = n as usize;
        for y in 0..n {
            let a = left.sphere_position() + vec3(&left_mesh.positions, (n - 1) * n + y);
            let b = right.sphere_position() + vec3(&right_mesh.positions, y);
            assert!((a - b).length() < 1e-2, "seam at row {y}: {a:?} vs {b:?}");
        }
    }

    #[test]
    fn test_shallow_chunks_have_no_instances() {
        let generator = NoiseTerrainGenerator::new(ScatterParams { min_depth: 4, density: 1.0, ..Default::default() });
        let mesh = generator.generate(&request(CubeFace::PosX, &ChunkPath::from_indices(&[0, 0]), DIAMETER, 8));
        assert!(!mesh.has_instances());
    }

    #[test]
    fn test_deep_chunks_get_one_upright_instance_per_cell() {
        let generator = NoiseTerrainGenerator::new(ScatterParams { min_depth: 4, density: 1.0, ..Default::default() });
        let mesh = generator.generate(&request(CubeFace::PosX, &ChunkPath::from_indices(&[0, 1, 2, 3, 0]), DIAMETER, 8));
        assert_eq!(mesh.upright_instance_count(), 7 * 7);
        assert!(mesh.aligned_instance_count() <= mesh.upright_instance_count());
    }
}
