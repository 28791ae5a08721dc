//! Planet definition: the immutable parameters a planet's terrain is built from.

/// Definition of a planet whose surface is streamed as a cubesphere.
///
/// Distances are in meters. Runtime state (chunk trees, worker pools) lives in
/// the LOD crate, never here.
#[derive(Clone, Debug, PartialEq)]
pub struct PlanetDef {
    /// Unique human-readable name (e.g., "Terra", "Luna").
    pub name: String,

    /// Radius of the base sphere, before terrain displacement. Must be positive.
    pub radius: f64,

    /// Seed for all procedural generation on this planet.
    pub seed: u64,
}

impl PlanetDef {
    /// Construct a new planet definition.
    ///
    /// # Panics
    ///
    /// Panics if `radius` is not positive and finite.
    pub fn new(name: impl Into<String>, radius: f64, seed: u64) -> Self {
        assert!(
            radius.is_finite() && radius > 0.0,
            "Planet radius must be positive, got {radius}"
        );
        Self {
            name: name.into(),
            radius,
            seed,
        }
    }

    /// Earth-like planet preset (radius 6,371 km).
    pub fn earth_like(name: impl Into<String>, seed: u64) -> Self {
        Self::new(name, 6_371_000.0, seed)
    }

    /// Moon-like body preset (radius 1,737.4 km).
    pub fn moon_like(name: impl Into<String>, seed: u64) -> Self {
        Self::new(name, 1_737_400.0, seed)
    }

    /// Planet diameter, which is also the side length of a face root chunk.
    pub fn diameter(&self) -> f64 {
        self.radius * 2.0
    }

    /// The circumference of the base sphere.
    pub fn circumference(&self) -> f64 {
        2.0 * std::f64::consts::PI * self.radius
    }
}
