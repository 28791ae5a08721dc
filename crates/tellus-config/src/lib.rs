//! Configuration for Tellus planet streaming.
//!
//! Settings persist to disk as `config.ron`. Every section defaults
//! independently, so old and partial files keep loading; CLI flags parsed with
//! clap override what was loaded.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    ChunkConfig, Config, CullingConfig, DebugConfig, FlightConfig, ForgeConfig, LodConfig, PlanetConfig,
};
pub use error::ConfigError;
