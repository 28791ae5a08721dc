//! Headless fly-by: streams a planet's surface while an observer descends
//! from orbit, with no renderer attached.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use glam::DVec3;
use tellus_config::{CliArgs, Config, FlightConfig};
use tellus_lod::{HeadlessScene, PlanetTerrain, TerrainStats};
use tellus_terrain::NoiseTerrainGenerator;
use tracing::{error, info};

/// Observer position `t` of the way through the flight, planet-local.
///
/// The observer sweeps between two fixed directions while its altitude
/// decays geometrically from the start altitude to the minimum.
fn flight_position(flight: &FlightConfig, radius: f64, t: f64) -> DVec3 {
    let from = DVec3::new(1.0, 0.3, 0.2).normalize();
    let to = DVec3::new(0.2, 1.0, -0.4).normalize();
    let direction = from.lerp(to, t).normalize();
    let ratio = flight.min_altitude_m / flight.start_altitude_m;
    let altitude = flight.start_altitude_m * ratio.powf(t);
    direction * (radius + altitude)
}

fn log_stats(frame: u32, stats: &TerrainStats, scene: &HeadlessScene) {
    info!(
        frame,
        leaves = stats.leaves,
        chunks = stats.chunks,
        ready = stats.ready_chunks,
        depth = stats.max_leaf_depth,
        queued = stats.forge.queued_tasks,
        busy = stats.forge.busy_workers,
        pending_sets = stats.deletion.live_sets,
        visible = scene.enabled_mesh_count(),
        "streaming"
    );
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config_dir = args
        .config
        .clone()
        .or_else(Config::default_dir)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    tellus_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {e}");
        return ExitCode::FAILURE;
    }

    let planet = config.planet_def();
    let radius = planet.radius;
    let mut terrain = match PlanetTerrain::new(
        planet,
        config.terrain_settings(),
        config.streaming_settings(),
        Arc::new(NoiseTerrainGenerator::default()),
    ) {
        Ok(terrain) => terrain,
        Err(e) => {
            error!("Failed to start terrain streaming: {e}");
            return ExitCode::FAILURE;
        }
    };
    let mut scene = HeadlessScene::new();

    let flight = &config.flight;
    let frame_time = Duration::from_millis(flight.frame_ms);
    let started = Instant::now();
    let mut observer = DVec3::ZERO;
    for frame in 0..flight.frames {
        let t = f64::from(frame) / f64::from(flight.frames.max(1));
        observer = terrain.transform().to_world(flight_position(flight, radius, t));

        terrain.update(observer, &mut scene);
        terrain.compute_culling(observer, &mut scene);

        let interval = config.debug.stats_interval;
        if interval > 0 && frame % interval == 0 {
            log_stats(frame, &terrain.stats(), &scene);
        }
        std::thread::sleep(frame_time);
    }

    // Let the last requests land before tearing down.
    let deadline = Instant::now() + Duration::from_secs(30);
    while !terrain.is_settled() && Instant::now() < deadline {
        terrain.update(observer, &mut scene);
        std::thread::sleep(frame_time);
    }
    log_stats(flight.frames, &terrain.stats(), &scene);

    let stats = terrain.stats();
    info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        meshes_created = scene.meshes_created(),
        applied = stats.forge.applied,
        discarded = stats.forge.discarded,
        avg_build_us = stats.forge.average_build_time_us,
        sets_resolved = stats.deletion.resolved,
        sets_cancelled = stats.deletion.cancelled,
        "fly-by finished"
    );

    terrain.dispose(&mut scene);
    ExitCode::SUCCESS
}
