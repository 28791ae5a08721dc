//! Cube-sphere addressing: cube faces, quadtree paths, and the closed-form
//! mapping from a path on a face to a position on the planet sphere.

mod addressing;
mod cube_face;
mod path;
mod planet_def;

pub use addressing::{cube_space_position, plane_space_position, sphere_space_position};
pub use cube_face::CubeFace;
pub use path::{ChunkPath, Quadrant};
pub use planet_def::PlanetDef;
