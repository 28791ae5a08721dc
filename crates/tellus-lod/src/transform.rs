use glam::{DQuat, DVec3};

/// Rigid placement of a planet in the world.
///
/// Chunk positions are planet-local; the transform maps them to world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlanetTransform {
    pub translation: DVec3,
    pub rotation: DQuat,
}

impl Default for PlanetTransform {
    fn default() -> Self {
        Self {
            translation: DVec3::ZERO,
            rotation: DQuat::IDENTITY,
        }
    }
}

impl PlanetTransform {
    pub fn new(translation: DVec3, rotation: DQuat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub fn from_translation(translation: DVec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    pub fn to_world(&self, local: DVec3) -> DVec3 {
        self.rotation * local + self.translation
    }

    pub fn to_local(&self, world: DVec3) -> DVec3 {
        self.rotation.inverse() * (world - self.translation)
    }

    /// World position of the planet center.
    pub fn center(&self) -> DVec3 {
        self.translation
    }
}
