//! Rotation quaternions

use super::Coord3D;
use super::is_equal;

/// Order in which Euler angles are applied when building a quaternion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EulerOrder {
    /// X, then Y, then Z
    #[default]
    XYZ,
    /// Y, then X, then Z
    YXZ,
    /// Z, then X, then Y
    ZXY,
    /// Z, then Y, then X
    ZYX,
    /// Y, then Z, then X
    YZX,
    /// X, then Z, then Y
    XZY,
}

/// A rotation quaternion
///
/// Quaternions are only used to carry rotations; they are converted to a
/// [`Matrix`](super::Matrix) before being composed with anything else.
#[derive(Debug, Clone, Copy)]
pub struct Quaternion {
    /// X component
    pub x: f64,
    /// Y component
    pub y: f64,
    /// Z component
    pub z: f64,
    /// W (scalar) component
    pub w: f64,
}

impl Quaternion {
    /// Create a quaternion from its raw components
    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// The identity rotation
    pub fn identity() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }

    /// Build from the first four elements of a slice (`x, y, z, w`)
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        match values {
            [x, y, z, w, ..] => Some(Self::new(*x, *y, *z, *w)),
            _ => None,
        }
    }

    /// Rotation of `angle` radians around `axis`
    ///
    /// The axis is expected to be normalized.
    pub fn from_axis_angle(axis: Coord3D, angle: f64) -> Self {
        let half = angle / 2.0;
        let s = half.sin();
        Self::new(axis.x * s, axis.y * s, axis.z * s, half.cos())
    }

    /// Rotation from Euler angles (radians) applied in the given order
    pub fn from_euler(x: f64, y: f64, z: f64, order: EulerOrder) -> Self {
        let c1 = (x / 2.0).cos();
        let c2 = (y / 2.0).cos();
        let c3 = (z / 2.0).cos();
        let s1 = (x / 2.0).sin();
        let s2 = (y / 2.0).sin();
        let s3 = (z / 2.0).sin();

        // Each order differs only in the signs of the cross terms.
        let (sx, sy, sz, sw) = match order {
            EulerOrder::XYZ => (1.0, -1.0, 1.0, -1.0),
            EulerOrder::YXZ => (1.0, -1.0, -1.0, 1.0),
            EulerOrder::ZXY => (-1.0, 1.0, 1.0, -1.0),
            EulerOrder::ZYX => (-1.0, 1.0, -1.0, 1.0),
            EulerOrder::YZX => (1.0, 1.0, -1.0, -1.0),
            EulerOrder::XZY => (-1.0, -1.0, 1.0, 1.0),
        };

        Self::new(
            s1 * c2 * c3 + sx * c1 * s2 * s3,
            c1 * s2 * c3 + sy * s1 * c2 * s3,
            c1 * c2 * s3 + sz * s1 * s2 * c3,
            c1 * c2 * c3 + sw * s1 * s2 * s3,
        )
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

impl PartialEq for Quaternion {
    fn eq(&self, other: &Self) -> bool {
        is_equal(self.x, other.x)
            && is_equal(self.y, other.y)
            && is_equal(self.z, other.z)
            && is_equal(self.w, other.w)
    }
}
