//! Instance placement for decoration patches (rocks, vegetation).

use glam::{DMat4, DQuat, DVec3};
use rand::Rng;

use crate::FLOATS_PER_MATRIX;

/// How densely a generator scatters instance placements.
#[derive(Clone, Debug, PartialEq)]
pub struct ScatterParams {
    /// Chunks shallower than this get no placements at all.
    pub min_depth: usize,
    /// Probability that a grid cell receives one placement.
    pub density: f64,
    /// Minimum cosine between terrain normal and radial up for a placement to
    /// also appear in the terrain-aligned buffer.
    pub max_slope_cos: f64,
}

impl Default for ScatterParams {
    fn default() -> Self {
        Self {
            min_depth: 6,
            density: 0.5,
            max_slope_cos: 0.8,
        }
    }
}

/// Instance buffers under construction.
#[derive(Default)]
pub(crate) struct Placements {
    pub aligned: Vec<f32>,
    pub upright: Vec<f32>,
}

impl Placements {
    /// Scatter at most one instance inside the quad `corners` (chunk-local).
    ///
    /// `up` is the radial direction at the quad, `normal` its terrain normal.
    pub fn scatter_cell(
        &mut self,
        params: &ScatterParams,
        corners: [DVec3; 4],
        normal: DVec3,
        up: DVec3,
        rng: &mut impl Rng,
    ) {
        if !rng.random_bool(params.density.clamp(0.0, 1.0)) {
            return;
        }
        let (u, v): (f64, f64) = (rng.random(), rng.random());
        let bottom = corners[0].lerp(corners[1], u);
        let top = corners[3].lerp(corners[2], u);
        let position = bottom.lerp(top, v);
        let scale = 0.7 + rng.random::<f64>() * 0.6;
        let yaw = DQuat::from_rotation_y(rng.random::<f64>() * std::f64::consts::TAU);

        let upright = DQuat::from_rotation_arc(DVec3::Y, up) * yaw;
        push_matrix(&mut self.upright, scale, upright, position);

        if normal.dot(up) >= params.max_slope_cos {
            let aligned = DQuat::from_rotation_arc(DVec3::Y, normal) * yaw;
            push_matrix(&mut self.aligned, scale, aligned, position);
        }
    }
}

fn push_matrix(buffer: &mut Vec<f32>, scale: f64, rotation: DQuat, translation: DVec3) {
    let m = DMat4::from_scale_rotation_translation(DVec3::splat(scale), rotation, translation);
    buffer.extend(m.to_cols_array().iter().map(|&c| c as f32));
}

/// Keep at most `max_matrices` matrices of `buffer`, chosen uniformly at
/// random without repetition and kept in their original order.
pub fn random_down_sample(buffer: &[f32], max_matrices: usize, rng: &mut impl Rng) -> Vec<f32> {
    let count = buffer.len() / FLOATS_PER_MATRIX;
    if count <= max_matrices {
        return buffer[..count * FLOATS_PER_MATRIX].to_vec();
    }
    let mut picked = rand::seq::index::sample(rng, count, max_matrices).into_vec();
    picked.sort_unstable();
    let mut out = Vec::with_capacity(max_matrices * FLOATS_PER_MATRIX);
    for i in picked {
        out.extend_from_slice(&buffer[i * FLOATS_PER_MATRIX..(i + 1) * FLOATS_PER_MATRIX]);
    }
    out
}
