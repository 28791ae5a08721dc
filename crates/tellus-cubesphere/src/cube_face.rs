//! The six faces of a cubesphere and the rotation that places each one.

use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;

use glam::{DQuat, DVec3};

/// The six faces of the cube that forms the cubesphere.
///
/// Every face is built in the same reference frame, a plane at `z = -L/2`
/// facing `-Z`, and then rotated into place by [`CubeFace::rotation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum CubeFace {
    /// +X face
    PosX = 0,
    /// −X face
    NegX = 1,
    /// +Y face
    PosY = 2,
    /// −Y face
    NegY = 3,
    /// +Z face
    PosZ = 4,
    /// −Z face (the reference face, identity rotation)
    NegZ = 5,
}

impl CubeFace {
    /// All six faces in canonical order.
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PosX,
        CubeFace::NegX,
        CubeFace::PosY,
        CubeFace::NegY,
        CubeFace::PosZ,
        CubeFace::NegZ,
    ];

    /// The opposite face (e.g., `PosX` → `NegX`).
    #[must_use]
    pub fn opposite(self) -> CubeFace {
        match self {
            CubeFace::PosX => CubeFace::NegX,
            CubeFace::NegX => CubeFace::PosX,
            CubeFace::PosY => CubeFace::NegY,
            CubeFace::NegY => CubeFace::PosY,
            CubeFace::PosZ => CubeFace::NegZ,
            CubeFace::NegZ => CubeFace::PosZ,
        }
    }

    /// Outward-pointing unit normal for this face.
    #[must_use]
    pub fn normal(self) -> DVec3 {
        match self {
            CubeFace::PosX => DVec3::X,
            CubeFace::NegX => DVec3::NEG_X,
            CubeFace::PosY => DVec3::Y,
            CubeFace::NegY => DVec3::NEG_Y,
            CubeFace::PosZ => DVec3::Z,
            CubeFace::NegZ => DVec3::NEG_Z,
        }
    }

    /// Rotation taking the reference face (`-Z`) onto this face.
    #[must_use]
    pub fn rotation(self) -> DQuat {
        match self {
            CubeFace::PosX => DQuat::from_rotation_y(-FRAC_PI_2),
            CubeFace::NegX => DQuat::from_rotation_y(FRAC_PI_2),
            CubeFace::PosY => DQuat::from_rotation_x(FRAC_PI_2),
            CubeFace::NegY => DQuat::from_rotation_x(-FRAC_PI_2),
            CubeFace::PosZ => DQuat::from_rotation_y(PI),
            CubeFace::NegZ => DQuat::IDENTITY,
        }
    }

    /// Short label used in chunk names and log output.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            CubeFace::PosX => "+X",
            CubeFace::NegX => "-X",
            CubeFace::PosY => "+Y",
            CubeFace::NegY => "-Y",
            CubeFace::PosZ => "+Z",
            CubeFace::NegZ => "-Z",
        }
    }
}

impl fmt::Display for CubeFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
