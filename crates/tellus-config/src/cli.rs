//! Command-line argument parsing for the Tellus fly-by.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Tellus command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "tellus", about = "Headless planet surface streaming fly-by")]
pub struct CliArgs {
    /// Planet radius in meters.
    #[arg(long)]
    pub radius: Option<f64>,

    /// Seed for terrain generation.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Geometry worker threads (0 = auto).
    #[arg(long)]
    pub workers: Option<usize>,

    /// Built chunks uploaded per frame.
    #[arg(long)]
    pub max_applies: Option<usize>,

    /// Vertices per chunk grid row.
    #[arg(long)]
    pub vertex_resolution: Option<u32>,

    /// Number of frames to simulate.
    #[arg(long)]
    pub frames: Option<u32>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(radius) = args.radius {
            self.planet.radius_m = radius;
        }
        if let Some(seed) = args.seed {
            self.planet.seed = seed;
        }
        if let Some(workers) = args.workers {
            self.forge.worker_count = workers;
        }
        if let Some(applies) = args.max_applies {
            self.forge.max_applies_per_frame = applies;
        }
        if let Some(resolution) = args.vertex_resolution {
            self.lod.vertex_resolution = resolution;
        }
        if let Some(frames) = args.frames {
            self.flight.frames = frames;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
