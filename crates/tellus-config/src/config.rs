//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tellus_cubesphere::PlanetDef;
use tellus_lod::{ChunkSettings, CullingSettings, ForgeSettings, LodSettings, StreamingSettings};
use tellus_terrain::TerrainSettings;

use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Quadtree thresholds and depth bounds.
    pub lod: LodConfig,
    /// Geometry worker pool.
    pub forge: ForgeConfig,
    /// Visibility tests.
    pub culling: CullingConfig,
    /// Colliders and decorations attached to built chunks.
    pub chunk: ChunkConfig,
    /// The planet being streamed.
    pub planet: PlanetConfig,
    /// Observer path of the headless fly-by.
    pub flight: FlightConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LodConfig {
    /// Subdivision distance in units of a node's side length.
    pub subdivision_factor: f64,
    /// Deletion distance in units of the parent's side length.
    pub deletion_factor: f64,
    /// Added to every deletion distance, in meters.
    pub deletion_constant_m: f64,
    pub min_depth: usize,
    /// Upper bound on the depth derived from the vertex spacing.
    pub max_depth_cap: usize,
    /// Vertices per grid row of every chunk.
    pub vertex_resolution: u32,
    /// Finest vertex spacing the trees refine to, in meters.
    pub min_vertex_spacing_m: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ForgeConfig {
    /// Worker threads (0 = one less than the number of cores).
    pub worker_count: usize,
    /// Built chunks uploaded per frame.
    pub max_applies_per_frame: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CullingConfig {
    /// Vertical field of view in degrees.
    pub fov_degrees: f64,
    /// Chunks smaller than this fraction of the field of view are hidden.
    pub min_screen_fraction: f64,
    /// Decorations are shown within this distance along the surface.
    pub decoration_distance_m: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkConfig {
    pub max_rock_instances: usize,
    pub max_tree_instances: usize,
    pub max_butterfly_instances: usize,
    /// Vegetation grows above this average chunk height.
    pub vegetation_min_height_m: f64,
    /// Chunks deeper than this get a static collider.
    pub collision_min_depth: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlanetConfig {
    pub name: String,
    /// Planet radius in meters.
    pub radius_m: f64,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FlightConfig {
    /// Observer starting altitude above the surface in meters.
    pub start_altitude_m: f64,
    /// Lowest altitude the observer descends to, in meters.
    pub min_altitude_m: f64,
    /// Frames simulated by the fly-by.
    pub frames: u32,
    /// Simulated frame length in milliseconds.
    pub frame_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Log a streaming summary every this many frames (0 = never).
    pub stats_interval: u32,
}

// --- Default implementations ---

impl Default for LodConfig {
    fn default() -> Self {
        let lod = LodSettings::default();
        Self {
            subdivision_factor: lod.subdivision_factor,
            deletion_factor: lod.deletion_factor,
            deletion_constant_m: lod.deletion_constant,
            min_depth: lod.min_depth,
            max_depth_cap: lod.max_depth_cap,
            vertex_resolution: lod.vertex_resolution,
            min_vertex_spacing_m: lod.min_vertex_spacing,
        }
    }
}

impl Default for ForgeConfig {
    fn default() -> Self {
        let forge = ForgeSettings::default();
        Self {
            worker_count: forge.worker_count,
            max_applies_per_frame: forge.max_applies_per_frame,
        }
    }
}

impl Default for CullingConfig {
    fn default() -> Self {
        let culling = CullingSettings::default();
        Self {
            fov_degrees: culling.fov.to_degrees(),
            min_screen_fraction: culling.min_screen_fraction,
            decoration_distance_m: culling.decoration_distance,
        }
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        let chunk = ChunkSettings::default();
        Self {
            max_rock_instances: chunk.max_rock_instances,
            max_tree_instances: chunk.max_tree_instances,
            max_butterfly_instances: chunk.max_butterfly_instances,
            vegetation_min_height_m: chunk.vegetation_min_height,
            collision_min_depth: chunk.collision_min_depth,
        }
    }
}

impl Default for PlanetConfig {
    fn default() -> Self {
        Self {
            name: "Terra".to_string(),
            radius_m: 100_000.0,
            seed: 42,
        }
    }
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            start_altitude_m: 300_000.0,
            min_altitude_m: 50.0,
            frames: 600,
            frame_ms: 16,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            stats_interval: 60,
        }
    }
}

// --- Conversions into runtime settings ---

impl Config {
    /// Default location of the config directory, if the platform has one.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("tellus"))
    }

    pub fn lod_settings(&self) -> LodSettings {
        LodSettings {
            subdivision_factor: self.lod.subdivision_factor,
            deletion_factor: self.lod.deletion_factor,
            deletion_constant: self.lod.deletion_constant_m,
            min_depth: self.lod.min_depth,
            max_depth_cap: self.lod.max_depth_cap,
            vertex_resolution: self.lod.vertex_resolution,
            min_vertex_spacing: self.lod.min_vertex_spacing_m,
        }
    }

    pub fn streaming_settings(&self) -> StreamingSettings {
        StreamingSettings {
            lod: self.lod_settings(),
            chunk: ChunkSettings {
                max_rock_instances: self.chunk.max_rock_instances,
                max_tree_instances: self.chunk.max_tree_instances,
                max_butterfly_instances: self.chunk.max_butterfly_instances,
                vegetation_min_height: self.chunk.vegetation_min_height_m,
                collision_min_depth: self.chunk.collision_min_depth,
            },
            culling: CullingSettings {
                fov: self.culling.fov_degrees.to_radians(),
                min_screen_fraction: self.culling.min_screen_fraction,
                decoration_distance: self.culling.decoration_distance_m,
            },
            forge: ForgeSettings {
                worker_count: self.forge.worker_count,
                max_applies_per_frame: self.forge.max_applies_per_frame,
            },
        }
    }

    /// Call [`validate`](Self::validate) first; a non-positive radius panics here.
    pub fn planet_def(&self) -> PlanetDef {
        PlanetDef::new(self.planet.name.clone(), self.planet.radius_m, self.planet.seed)
    }

    /// Default terrain with feature sizes kept constant in meters.
    pub fn terrain_settings(&self) -> TerrainSettings {
        TerrainSettings::scaled_to_radius(self.planet.radius_m)
    }

    /// Reject values the streaming pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.planet.radius_m.is_finite() && self.planet.radius_m > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "planet.radius_m",
                reason: format!("must be positive, got {}", self.planet.radius_m),
            });
        }
        if !(self.culling.fov_degrees > 0.0 && self.culling.fov_degrees < 180.0) {
            return Err(ConfigError::InvalidValue {
                field: "culling.fov_degrees",
                reason: format!("must be in (0, 180), got {}", self.culling.fov_degrees),
            });
        }
        if self.forge.max_applies_per_frame == 0 {
            return Err(ConfigError::InvalidValue {
                field: "forge.max_applies_per_frame",
                reason: "must be at least 1".to_string(),
            });
        }
        self.lod_settings()
            .validate_for_root(self.planet.radius_m * 2.0)
            .map_err(ConfigError::InvalidLod)
    }
}

// --- Load / Save ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(2)
            .enumerate_arrays(false);
        let serialized = ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }
}
