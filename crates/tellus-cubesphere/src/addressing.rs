//! Closed-form mapping from a quadtree path to positions on the cube and the sphere.
//!
//! `chunk_length` is always the side length of the face root, i.e. the planet
//! diameter. Every function walks the path once and never iterates further.

use glam::{DVec2, DVec3};

use crate::{ChunkPath, CubeFace};

/// Center of the node at `path`, in the flat coordinates of its face plane.
///
/// At depth level `i` the center moves by `chunk_length / 4 / 2^i` along x and y,
/// with the sign given by the quadrant.
#[must_use]
pub fn plane_space_position(chunk_length: f64, path: &ChunkPath) -> DVec2 {
    let mut position = DVec2::ZERO;
    let mut step = chunk_length / 4.0;
    for quadrant in path.quadrants() {
        let (sx, sy) = quadrant.offset_sign();
        position.x += sx * step;
        position.y += sy * step;
        step *= 0.5;
    }
    position
}

/// Center of the node on the surface of the cube, rotated onto `face`.
///
/// This is the un-projected point handed to geometry workers.
#[must_use]
pub fn cube_space_position(chunk_length: f64, path: &ChunkPath, face: CubeFace) -> DVec3 {
    let plane = plane_space_position(chunk_length, path);
    face.rotation() * DVec3::new(plane.x, plane.y, -chunk_length / 2.0)
}

/// Center of the node projected onto the sphere of radius `chunk_length / 2`.
#[must_use]
pub fn sphere_space_position(chunk_length: f64, path: &ChunkPath, face: CubeFace) -> DVec3 {
    let plane = plane_space_position(chunk_length, path);
    let on_cube = DVec3::new(plane.x, plane.y, -chunk_length / 2.0);
    face.rotation() * (on_cube.normalize() * (chunk_length / 2.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Quadrant;

    const LENGTH: f64 = 2_000.0;

    /// Deterministic path of the given length that visits every quadrant.
    fn scrambled_path(len: usize, salt: usize) -> ChunkPath {
        let indices: Vec<u8> = (0..len).map(|i| ((i * 7 + salt * 3) % 4) as u8).collect();
        ChunkPath::from_indices(&indices)
    }

    #[test]
    fn test_root_plane_position_is_origin() {
        assert_eq!(plane_space_position(LENGTH, &ChunkPath::root()), DVec2::ZERO);
    }

    #[test]
    fn test_first_level_offsets_are_quarter_length() {
        let bl = plane_space_position(LENGTH, &ChunkPath::from_indices(&[0]));
        let tr = plane_space_position(LENGTH, &ChunkPath::from_indices(&[2]));
        assert!((bl - DVec2::new(-500.0, -500.0)).length() < 1e-9);
        assert!((tr - DVec2::new(500.0, 500.0)).length() < 1e-9);
    }

    #[test]
    fn test_children_average_to_parent_center() {
        let parent = scrambled_path(4, 1);
        let parent_center = plane_space_position(LENGTH, &parent);
        let sum: DVec2 = parent
            .children()
            .iter()
            .map(|c| plane_space_position(LENGTH, c))
            .sum();
        assert!((sum / 4.0 - parent_center).length() < 1e-9);
    }

    #[test]
    fn test_sphere_position_has_radius_half_length() {
        for face in CubeFace::ALL {
            for len in 0..=10 {
                for salt in 0..4 {
                    let path = scrambled_path(len, salt);
                    let p = sphere_space_position(LENGTH, &path, face);
                    assert!(
                        (p.length() - LENGTH / 2.0).abs() < 1e-9,
                        "face {face:?} path {path} at distance {}",
                        p.length()
                    );
                }
            }
        }
    }

    #[test]
    fn test_root_maps_to_face_center() {
        for face in CubeFace::ALL {
            let p = sphere_space_position(LENGTH, &ChunkPath::root(), face);
            assert!((p - face.normal() * (LENGTH / 2.0)).length() < 1e-9);
        }
    }

    #[test]
    fn test_nodes_stay_on_their_face_hemisphere() {
        for face in CubeFace::ALL {
            for q in Quadrant::ALL {
                let path = ChunkPath::root().child(q).child(q);
                let p = sphere_space_position(LENGTH, &path, face);
                assert!(p.normalize().dot(face.normal()) > 0.5);
            }
        }
    }

    #[test]
    fn test_cube_position_lies_on_face_plane() {
        for face in CubeFace::ALL {
            let path = scrambled_path(6, 2);
            let p = cube_space_position(LENGTH, &path, face);
            assert!((p.dot(face.normal()) - LENGTH / 2.0).abs() < 1e-9);
            let s = sphere_space_position(LENGTH, &path, face);
            assert!((p.normalize() - s.normalize()).length() < 1e-12);
        }
    }
}
