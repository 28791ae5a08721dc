//! Per-planet terrain shape parameters.

/// Radius the default frequencies are tuned for, in meters.
pub const EARTH_RADIUS: f64 = 6_371_000.0;

/// Shape parameters of a planet's height field.
///
/// Frequencies are expressed in cycles over the unit sphere, heights in meters
/// above the base radius.
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainSettings {
    /// Frequency of the continent mask.
    pub continents_frequency: f64,
    /// Fraction of the mask that falls under the sea floor, in `[0, 1)`.
    /// Higher values break continents into smaller islands.
    pub continents_fragmentation: f64,
    /// Height of the continental shelf above the ocean floor.
    pub continent_base_height: f64,
    /// Peak height of ridged mountain ranges.
    pub max_mountain_height: f64,
    /// Frequency of mountain ranges.
    pub mountains_frequency: f64,
    /// Peak height of small-scale bumps.
    pub max_bump_height: f64,
    /// Frequency of small-scale bumps.
    pub bumps_frequency: f64,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            continents_frequency: 1.0,
            continents_fragmentation: 0.65,
            continent_base_height: 5_000.0,
            max_mountain_height: 10_000.0,
            mountains_frequency: 20.0,
            max_bump_height: 1_500.0,
            bumps_frequency: 30.0,
        }
    }
}

impl TerrainSettings {
    /// Default settings with frequencies rescaled so features keep their
    /// size in meters on a planet of the given radius.
    pub fn scaled_to_radius(radius: f64) -> Self {
        let scale = radius / EARTH_RADIUS;
        let base = Self::default();
        Self {
            continents_frequency: base.continents_frequency * scale,
            mountains_frequency: base.mountains_frequency * scale,
            bumps_frequency: base.bumps_frequency * scale,
            ..base
        }
    }

    /// Upper bound on the displacement above the base radius.
    pub fn max_height(&self) -> f64 {
        self.continent_base_height + self.max_mountain_height + self.max_bump_height
    }

    /// Height used for nodes whose geometry is not known yet: half of the
    /// maximum displacement.
    pub fn mean_height_estimate(&self) -> f64 {
        self.max_height() * 0.5
    }
}
