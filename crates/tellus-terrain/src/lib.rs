//! Worker-side terrain geometry: height fields over the sphere, chunk meshes,
//! and the instance placements scattered on top of them.
//!
//! Everything in this crate is a pure function of a [`BuildRequest`], so it can
//! run on any thread and be replayed bit-for-bit.

mod generator;
mod heightmap;
mod request;
mod scatter;
mod seed;
mod settings;

pub use generator::{NoiseTerrainGenerator, TerrainGenerator};
pub use heightmap::{FbmLayer, FbmSampler};
pub use request::{BuildRequest, ChunkMeshData, FLOATS_PER_MATRIX};
pub use scatter::{ScatterParams, random_down_sample};
pub use seed::{chunk_rng, derive_chunk_seed};
pub use settings::{EARTH_RADIUS, TerrainSettings};
