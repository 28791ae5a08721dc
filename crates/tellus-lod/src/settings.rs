//! Tunables for the quadtree, chunk decorations and culling.

use crate::LodError;

/// Distance thresholds and depth bounds of the chunk trees.
///
/// A leaf at depth `d` subdivides when the observer is closer than
/// [`subdivision_threshold`](Self::subdivision_threshold); an internal node
/// collapses only once the observer is farther than
/// [`deletion_threshold`](Self::deletion_threshold). The gap between the two
/// keeps nodes from flickering between states.
#[derive(Clone, Debug, PartialEq)]
pub struct LodSettings {
    /// `k_sub`: subdivision distance in units of the node's side length.
    pub subdivision_factor: f64,
    /// `k_del`: deletion distance in units of the parent's side length.
    pub deletion_factor: f64,
    /// Constant added to every deletion threshold.
    pub deletion_constant: f64,
    /// Leaves shallower than this subdivide regardless of distance.
    pub min_depth: usize,
    /// Upper bound on the depth derived from the vertex spacing.
    pub max_depth_cap: usize,
    /// Vertices per grid row of every chunk mesh.
    pub vertex_resolution: u32,
    /// Smallest distance between neighbouring vertices the trees refine to.
    pub min_vertex_spacing: f64,
}

impl Default for LodSettings {
    fn default() -> Self {
        Self {
            subdivision_factor: 2.0,
            deletion_factor: 1.5,
            deletion_constant: 0.0,
            min_depth: 0,
            max_depth_cap: 24,
            vertex_resolution: 64,
            min_vertex_spacing: 1.0,
        }
    }
}

impl LodSettings {
    /// Observer distance under which a leaf at `depth` subdivides.
    pub fn subdivision_threshold(&self, root_length: f64, depth: usize) -> f64 {
        self.subdivision_factor * root_length / 2f64.powi(depth as i32)
    }

    /// Observer distance beyond which an internal node at `depth` collapses.
    pub fn deletion_threshold(&self, root_length: f64, depth: usize) -> f64 {
        self.deletion_constant + self.deletion_factor * root_length / 2f64.powi(depth as i32 - 1)
    }

    /// Deepest level a tree over a face of side `root_length` may reach:
    /// the depth at which vertices are `min_vertex_spacing` apart, capped by
    /// `max_depth_cap`.
    pub fn max_depth(&self, root_length: f64) -> usize {
        let cells = self.min_vertex_spacing * f64::from(self.vertex_resolution);
        let depth = (root_length / cells).log2().ceil();
        if depth.is_finite() && depth > 0.0 {
            (depth as usize).min(self.max_depth_cap)
        } else {
            0
        }
    }

    /// Reject settings under which a node could subdivide and collapse at the
    /// same distance.
    ///
    /// `deletion(d) - subdivision(d) = c + (2 k_del - k_sub) * L / 2^d`, which is
    /// positive at every depth exactly when `c >= 0` and `2 k_del > k_sub`.
    pub fn validate(&self) -> Result<(), LodError> {
        let factors_ok = self.subdivision_factor > 0.0 && self.deletion_factor > 0.0;
        if !factors_ok
            || self.deletion_constant < 0.0
            || 2.0 * self.deletion_factor <= self.subdivision_factor
        {
            return Err(LodError::Hysteresis {
                subdivision_factor: self.subdivision_factor,
                deletion_factor: self.deletion_factor,
                deletion_constant: self.deletion_constant,
            });
        }
        if self.vertex_resolution < 2 {
            return Err(LodError::VertexResolution(self.vertex_resolution));
        }
        if self.min_depth > self.max_depth_cap {
            return Err(LodError::DepthBounds {
                min_depth: self.min_depth,
                max_depth: self.max_depth_cap,
            });
        }
        Ok(())
    }

    /// [`validate`](Self::validate), then check that `min_depth` is reachable on
    /// a face of side `root_length`.
    pub fn validate_for_root(&self, root_length: f64) -> Result<(), LodError> {
        self.validate()?;
        let max_depth = self.max_depth(root_length);
        if self.min_depth > max_depth {
            return Err(LodError::DepthBounds {
                min_depth: self.min_depth,
                max_depth,
            });
        }
        Ok(())
    }
}

/// What a chunk attaches to itself once its geometry arrives.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkSettings {
    pub max_rock_instances: usize,
    pub max_tree_instances: usize,
    pub max_butterfly_instances: usize,
    /// Vegetation grows only on chunks whose average height exceeds this.
    pub vegetation_min_height: f64,
    /// Chunks deeper than this get a static collider.
    pub collision_min_depth: usize,
}

impl Default for ChunkSettings {
    fn default() -> Self {
        Self {
            max_rock_instances: 3200,
            max_tree_instances: 4800,
            max_butterfly_instances: 800,
            vegetation_min_height: 2_550.0,
            collision_min_depth: 3,
        }
    }
}

/// Visibility tests run by [`ChunkStore::compute_culling`](crate::ChunkStore::compute_culling).
#[derive(Clone, Debug, PartialEq)]
pub struct CullingSettings {
    /// Vertical field of view of the observer, in radians.
    pub fov: f64,
    /// Chunks whose angular size is below this fraction of the field of view are hidden.
    pub min_screen_fraction: f64,
    /// Decoration patches are shown within this tangential distance.
    pub decoration_distance: f64,
}

impl Default for CullingSettings {
    fn default() -> Self {
        Self {
            fov: std::f64::consts::FRAC_PI_3,
            min_screen_fraction: 0.002,
            decoration_distance: 200.0,
        }
    }
}

/// Size and per-frame throughput of the chunk forge.
#[derive(Clone, Debug, PartialEq)]
pub struct ForgeSettings {
    /// Worker threads; 0 picks one less than the number of cores.
    pub worker_count: usize,
    pub max_applies_per_frame: usize,
}

impl Default for ForgeSettings {
    fn default() -> Self {
        Self {
            worker_count: 0,
            max_applies_per_frame: 1,
        }
    }
}

impl ForgeSettings {
    pub fn resolved_worker_count(&self) -> usize {
        match self.worker_count {
            0 => crate::forge::default_worker_count(),
            n => n,
        }
    }
}

/// Every tunable of a planet's terrain streaming.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StreamingSettings {
    pub lod: LodSettings,
    pub chunk: ChunkSettings,
    pub culling: CullingSettings,
    pub forge: ForgeSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: f64 = 2_000.0;

    #[test]
    fn test_default_thresholds_have_hysteresis_at_every_depth() {
        let settings = LodSettings::default();
        settings.validate().unwrap();
        for depth in 0..30 {
            let sub = settings.subdivision_threshold(ROOT, depth);
            let del = settings.deletion_threshold(ROOT, depth);
            assert!(del > sub, "depth {depth}: deletion {del} <= subdivision {sub}");
        }
    }

    #[test]
    fn test_thresholds_halve_per_level() {
        let settings = LodSettings::default();
        assert_eq!(settings.subdivision_threshold(ROOT, 0), 4_000.0);
        assert_eq!(settings.subdivision_threshold(ROOT, 3), 500.0);
        assert_eq!(settings.deletion_threshold(ROOT, 1), 3_000.0);
        assert_eq!(settings.deletion_threshold(ROOT, 0), 6_000.0);
    }

    #[test]
    fn test_validate_rejects_overlapping_thresholds() {
        let settings = LodSettings {
            subdivision_factor: 4.0,
            deletion_factor: 2.0,
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(LodError::Hysteresis { .. })));

        let negative = LodSettings {
            deletion_constant: -1.0,
            ..Default::default()
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_degenerate_resolution_and_depths() {
        let settings = LodSettings { vertex_resolution: 1, ..Default::default() };
        assert!(matches!(settings.validate(), Err(LodError::VertexResolution(1))));

        let settings = LodSettings { min_depth: 5, max_depth_cap: 3, ..Default::default() };
        assert!(matches!(settings.validate(), Err(LodError::DepthBounds { .. })));
    }

    #[test]
    fn test_min_depth_beyond_derived_max_depth_is_rejected() {
        // 2000 / 64 ≈ 31, log2 ≈ 4.97, so faces of this planet stop at depth 5.
        let settings = LodSettings { vertex_resolution: 64, min_depth: 6, ..Default::default() };
        settings.validate().unwrap();
        assert!(matches!(
            settings.validate_for_root(ROOT),
            Err(LodError::DepthBounds { min_depth: 6, max_depth: 5 })
        ));

        let reachable = LodSettings { min_depth: 5, ..settings };
        reachable.validate_for_root(ROOT).unwrap();
    }

    #[test]
    fn test_max_depth_follows_vertex_spacing() {
        let settings = LodSettings {
            vertex_resolution: 64,
            min_vertex_spacing: 1.0,
            ..Default::default()
        };
        // 12_742_000 / 64 ≈ 199_093, log2 ≈ 17.6
        assert_eq!(settings.max_depth(12_742_000.0), 18);
        assert_eq!(settings.max_depth(32.0), 0);

        let capped = LodSettings { max_depth_cap: 6, ..settings };
        assert_eq!(capped.max_depth(12_742_000.0), 6);
    }

    #[test]
    fn test_zero_workers_resolves_to_at_least_one() {
        let forge = ForgeSettings::default();
        assert!(forge.resolved_worker_count() >= 1);
        let fixed = ForgeSettings {
            worker_count: 3,
            ..ForgeSettings::default()
        };
        assert_eq!(fixed.resolved_worker_count(), 3);
    }
}
