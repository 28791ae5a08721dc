//! Terrain streaming error types.

use crate::ForgeError;

/// Errors raised while setting up a planet's terrain streaming.
#[derive(Debug, thiserror::Error)]
pub enum LodError {
    /// A node could subdivide and collapse at the same observer distance.
    #[error(
        "deletion threshold must exceed subdivision threshold at every depth \
         (k_sub = {subdivision_factor}, k_del = {deletion_factor}, constant = {deletion_constant})"
    )]
    Hysteresis {
        subdivision_factor: f64,
        deletion_factor: f64,
        deletion_constant: f64,
    },

    #[error("vertex resolution must be at least 2, got {0}")]
    VertexResolution(u32),

    #[error("min depth {min_depth} exceeds max depth {max_depth}")]
    DepthBounds { min_depth: usize, max_depth: usize },

    /// The worker pool could not be started.
    #[error(transparent)]
    Forge(#[from] ForgeError),
}
