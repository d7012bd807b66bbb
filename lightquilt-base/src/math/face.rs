//! Axis-aligned unit vectors: the [`CubeFace`] type.
//! This module is private but reexported by its parent.

use euclid::{Vector3D, vec3};

use crate::math::{FreePoint, FreeVector};

/// Identifies one of the six faces of an axis-aligned cube, or equivalently
/// an orthogonal unit vector.
///
/// The binning grids and their perspective cameras are organized as one grid
/// per face, so this type also carries each face's camera basis.
#[expect(clippy::exhaustive_enums)]
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
#[repr(u8)]
pub enum CubeFace {
    /// Negative X; the face whose normal vector is `(-1, 0, 0)`.
    NX = 0,
    /// Negative Y; the face whose normal vector is `(0, -1, 0)`; downward.
    NY = 1,
    /// Negative Z; the face whose normal vector is `(0, 0, -1)`.
    NZ = 2,
    /// Positive X; the face whose normal vector is `(1, 0, 0)`.
    PX = 3,
    /// Positive Y; the face whose normal vector is `(0, 1, 0)`; upward.
    PY = 4,
    /// Positive Z; the face whose normal vector is `(0, 0, 1)`.
    PZ = 5,
}

impl CubeFace {
    /// All the values of [`CubeFace`], in discriminant order.
    pub const ALL: [CubeFace; 6] = [
        CubeFace::NX,
        CubeFace::NY,
        CubeFace::NZ,
        CubeFace::PX,
        CubeFace::PY,
        CubeFace::PZ,
    ];

    /// The face's discriminant as an array/grid index in `0..6`.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns the face's outward unit normal vector.
    #[inline]
    pub fn normal_vector(self) -> FreeVector {
        match self {
            CubeFace::NX => vec3(-1., 0., 0.),
            CubeFace::NY => vec3(0., -1., 0.),
            CubeFace::NZ => vec3(0., 0., -1.),
            CubeFace::PX => vec3(1., 0., 0.),
            CubeFace::PY => vec3(0., 1., 0.),
            CubeFace::PZ => vec3(0., 0., 1.),
        }
    }

    /// Returns the [`CubeFace`] whose normal vector is closest in direction to the
    /// given vector.
    ///
    /// Edge cases:
    /// *   Ties are broken by preferring Z faces over Y faces, and Y faces over X faces.
    /// *   If all magnitudes are zero, the Z axis's sign is used. (Remember that
    ///     floating-point numbers include distinct positive and negative zeroes.)
    /// *   If any coordinate is NaN, returns [`None`].
    pub fn from_snapped_vector(vector: FreeVector) -> Option<Self> {
        let Vector3D { x, y, z, _unit } = vector;

        if x.is_nan() || y.is_nan() || z.is_nan() {
            return None;
        }

        // Note that the Rust signum() reads the sign of zeroes rather than
        // returning zero for zero, which is exactly what we want here.
        let (neg_face, pos_face, sign) = if x.abs() > y.abs() && x.abs() > z.abs() {
            (CubeFace::NX, CubeFace::PX, x.signum())
        } else if y.abs() > z.abs() {
            (CubeFace::NY, CubeFace::PY, y.signum())
        } else {
            (CubeFace::NZ, CubeFace::PZ, z.signum())
        };
        Some(if sign < 0.0 { neg_face } else { pos_face })
    }

    /// Returns the orthonormal right-handed basis `(right, up, forward)` of the
    /// perspective camera looking out through this face from the cube's center.
    ///
    /// `forward` is the face normal. `up` is world +Y except for the ±Y faces,
    /// which use world +Z. `right = up × forward`.
    #[inline]
    pub fn camera_basis(self) -> (FreeVector, FreeVector, FreeVector) {
        let forward = self.normal_vector();
        let up: FreeVector = match self {
            CubeFace::NY | CubeFace::PY => vec3(0., 0., 1.),
            _ => vec3(0., 1., 0.),
        };
        (up.cross(forward), up, forward)
    }

    /// Transforms a world-space point into this face's camera's eye space:
    /// `x` right, `y` up, looking along `-z` (so points in front of the camera
    /// have negative `z`).
    #[inline]
    pub fn eye_from_world(self, point: FreePoint) -> FreePoint {
        let (right, up, forward) = self.camera_basis();
        let v = point.to_vector();
        FreePoint::new(v.dot(right), v.dot(up), -v.dot(forward))
    }

    /// Inverse of [`CubeFace::eye_from_world()`].
    #[inline]
    pub fn world_from_eye(self, eye: FreePoint) -> FreePoint {
        let (right, up, forward) = self.camera_basis();
        (right * eye.x + up * eye.y + forward * -eye.z).to_point()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use euclid::point3;

    #[test]
    fn normals_are_distinct_units() {
        for face in CubeFace::ALL {
            let n = face.normal_vector();
            assert_eq!(n.length(), 1.0, "{face:?}");
            for other in CubeFace::ALL {
                if face != other {
                    assert_ne!(n, other.normal_vector());
                }
            }
        }
    }

    #[test]
    fn snapped_vector_axes() {
        for face in CubeFace::ALL {
            assert_eq!(
                CubeFace::from_snapped_vector(face.normal_vector() * 3.5),
                Some(face),
            );
        }
    }

    #[test]
    fn snapped_vector_ties_and_nan() {
        // Ties prefer Z over Y over X.
        assert_eq!(
            CubeFace::from_snapped_vector(vec3(1., 1., 1.)),
            Some(CubeFace::PZ)
        );
        assert_eq!(
            CubeFace::from_snapped_vector(vec3(1., 1., 0.)),
            Some(CubeFace::PY)
        );
        // Zero vector reads the Z sign.
        assert_eq!(
            CubeFace::from_snapped_vector(vec3(0., 0., 0.)),
            Some(CubeFace::PZ)
        );
        assert_eq!(
            CubeFace::from_snapped_vector(vec3(0., 0., -0.)),
            Some(CubeFace::NZ)
        );
        assert_eq!(CubeFace::from_snapped_vector(vec3(0., f64::NAN, 0.)), None);
    }

    #[test]
    fn camera_basis_is_right_handed_orthonormal() {
        for face in CubeFace::ALL {
            let (right, up, forward) = face.camera_basis();
            assert_eq!(right.cross(up), forward, "{face:?}");
            assert_eq!(right.dot(up), 0.0);
            assert_eq!(right.dot(forward), 0.0);
            assert_eq!(right.length(), 1.0);
            assert_eq!(up.length(), 1.0);
        }
    }

    #[test]
    fn eye_from_world_round_trip() {
        let point = point3(0.1, -2.5, 7.0);
        for face in CubeFace::ALL {
            let eye = face.eye_from_world(point);
            let back = face.world_from_eye(eye);
            assert!((back - point).length() < 1e-12, "{face:?}: {back:?}");
            // A point along the face normal is in front of the camera.
            let ahead = face.eye_from_world((face.normal_vector() * 4.0).to_point());
            assert_eq!(ahead, point3(0., 0., -4.));
        }
    }
}
