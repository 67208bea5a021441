//! 2D, 3D and 4D coordinates

use super::{is_equal, is_zero};
use std::ops::{Add, Mul, Neg, Sub};

/// A 2D coordinate, used for texture UVs and texture map offsets
#[derive(Debug, Clone, Copy, Default)]
pub struct Coord2D {
    /// X component
    pub x: f64,
    /// Y component
    pub y: f64,
}

impl Coord2D {
    /// Create a new coordinate
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns true if no component is NaN
    pub fn is_valid(&self) -> bool {
        !self.x.is_nan() && !self.y.is_nan()
    }
}

impl PartialEq for Coord2D {
    fn eq(&self, other: &Self) -> bool {
        is_equal(self.x, other.x) && is_equal(self.y, other.y)
    }
}

impl Add for Coord2D {
    type Output = Coord2D;

    fn add(self, rhs: Coord2D) -> Coord2D {
        Coord2D::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Coord2D {
    type Output = Coord2D;

    fn sub(self, rhs: Coord2D) -> Coord2D {
        Coord2D::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Distance between two 2D coordinates
pub fn coord_distance_2d(a: Coord2D, b: Coord2D) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

/// A 3D coordinate or direction
///
/// Equality is epsilon based: two coordinates compare equal when every
/// component differs by less than [`EPS`](super::EPS).
#[derive(Debug, Clone, Copy, Default)]
pub struct Coord3D {
    /// X component
    pub x: f64,
    /// Y component
    pub y: f64,
    /// Z component
    pub z: f64,
}

impl Coord3D {
    /// Create a new coordinate
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Build a coordinate from the first three elements of a slice
    ///
    /// Returns `None` when the slice holds fewer than three values.
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        match values {
            [x, y, z, ..] => Some(Self::new(*x, *y, *z)),
            _ => None,
        }
    }

    /// Euclidean length
    pub fn length(&self) -> f64 {
        vector_length_3d(self.x, self.y, self.z)
    }

    /// Scale every component in place
    pub fn multiply_scalar(&mut self, scalar: f64) -> &mut Self {
        self.x *= scalar;
        self.y *= scalar;
        self.z *= scalar;
        self
    }

    /// Scale to unit length in place; a zero vector stays zero
    pub fn normalize(&mut self) -> &mut Self {
        let length = self.length();
        if length > 0.0 {
            self.multiply_scalar(1.0 / length);
        }
        self
    }

    /// Unit-length copy of this vector
    pub fn normalized(&self) -> Coord3D {
        let mut result = *self;
        result.normalize();
        result
    }

    /// Move along `direction` by `distance`
    ///
    /// The direction is normalized first, so only its orientation matters.
    pub fn offset(&mut self, direction: Coord3D, distance: f64) -> &mut Self {
        let normal = direction.normalized();
        self.x += normal.x * distance;
        self.y += normal.y * distance;
        self.z += normal.z * distance;
        self
    }

    /// Rotate around an axis going through `origin` by `angle` radians
    pub fn rotate(&mut self, axis: Coord3D, angle: f64, origin: Coord3D) -> &mut Self {
        let normal = axis.normalized();
        let (u, v, w) = (normal.x, normal.y, normal.z);

        let x = self.x - origin.x;
        let y = self.y - origin.y;
        let z = self.z - origin.z;

        let si = angle.sin();
        let co = angle.cos();
        let projection = -u * x - v * y - w * z;

        self.x = -u * projection * (1.0 - co) + x * co + (-w * y + v * z) * si + origin.x;
        self.y = -v * projection * (1.0 - co) + y * co + (w * x - u * z) * si + origin.y;
        self.z = -w * projection * (1.0 - co) + z * co + (-v * x + u * y) * si + origin.z;
        self
    }

    /// Returns true if no component is NaN
    pub fn is_valid(&self) -> bool {
        !self.x.is_nan() && !self.y.is_nan() && !self.z.is_nan()
    }
}

impl PartialEq for Coord3D {
    fn eq(&self, other: &Self) -> bool {
        is_equal(self.x, other.x) && is_equal(self.y, other.y) && is_equal(self.z, other.z)
    }
}

impl Add for Coord3D {
    type Output = Coord3D;

    fn add(self, rhs: Coord3D) -> Coord3D {
        Coord3D::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Coord3D {
    type Output = Coord3D;

    fn sub(self, rhs: Coord3D) -> Coord3D {
        Coord3D::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Coord3D {
    type Output = Coord3D;

    fn mul(self, rhs: f64) -> Coord3D {
        Coord3D::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Coord3D {
    type Output = Coord3D;

    fn neg(self) -> Coord3D {
        Coord3D::new(-self.x, -self.y, -self.z)
    }
}

/// Length of the vector `(x, y, z)`
pub fn vector_length_3d(x: f64, y: f64, z: f64) -> f64 {
    (x * x + y * y + z * z).sqrt()
}

/// Distance between two points
pub fn coord_distance_3d(a: Coord3D, b: Coord3D) -> f64 {
    (b - a).length()
}

/// Dot product
pub fn dot_vector_3d(a: Coord3D, b: Coord3D) -> f64 {
    a.x * b.x + a.y * b.y + a.z * b.z
}

/// Cross product `a × b`
pub fn cross_vector_3d(a: Coord3D, b: Coord3D) -> Coord3D {
    Coord3D::new(
        a.y * b.z - a.z * b.y,
        a.z * b.x - a.x * b.z,
        a.x * b.y - a.y * b.x,
    )
}

/// Angle between two vectors in radians
///
/// Returns 0 when either vector has zero length.
pub fn vector_angle_3d(a: Coord3D, b: Coord3D) -> f64 {
    if is_zero(a.length()) || is_zero(b.length()) {
        return 0.0;
    }
    let product = dot_vector_3d(a.normalized(), b.normalized()).clamp(-1.0, 1.0);
    product.acos()
}

/// A 4D coordinate
#[derive(Debug, Clone, Copy, Default)]
pub struct Coord4D {
    /// X component
    pub x: f64,
    /// Y component
    pub y: f64,
    /// Z component
    pub z: f64,
    /// W component
    pub w: f64,
}

impl Coord4D {
    /// Create a new coordinate
    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }
}

impl PartialEq for Coord4D {
    fn eq(&self, other: &Self) -> bool {
        is_equal(self.x, other.x)
            && is_equal(self.y, other.y)
            && is_equal(self.z, other.z)
            && is_equal(self.w, other.w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_epsilon_equality() {
        let a = Coord3D::new(1.0, 2.0, 3.0);
        let b = Coord3D::new(1.0 + 1.0e-10, 2.0, 3.0 - 1.0e-10);
        assert_eq!(a, b);
        assert_ne!(a, Coord3D::new(1.0, 2.0, 3.001));
        assert_eq!(Coord2D::new(0.5, 0.5), Coord2D::new(0.5, 0.5 + 1.0e-12));
    }

    #[test]
    fn test_normalize() {
        let mut v = Coord3D::new(3.0, 0.0, 4.0);
        v.normalize();
        assert_eq!(v, Coord3D::new(0.6, 0.0, 0.8));

        let mut zero = Coord3D::default();
        zero.normalize();
        assert_eq!(zero, Coord3D::default());
    }

    #[test]
    fn test_cross_and_dot() {
        let x = Coord3D::new(1.0, 0.0, 0.0);
        let y = Coord3D::new(0.0, 1.0, 0.0);
        assert_eq!(cross_vector_3d(x, y), Coord3D::new(0.0, 0.0, 1.0));
        assert_eq!(dot_vector_3d(x, y), 0.0);
        assert!(crate::geometry::is_equal(vector_angle_3d(x, y), PI / 2.0));
    }

    #[test]
    fn test_offset_normalizes_direction() {
        let mut p = Coord3D::new(1.0, 1.0, 1.0);
        p.offset(Coord3D::new(0.0, 0.0, 10.0), 2.0);
        assert_eq!(p, Coord3D::new(1.0, 1.0, 3.0));
    }

    #[test]
    fn test_rotate_around_origin() {
        let mut p = Coord3D::new(1.0, 0.0, 0.0);
        p.rotate(Coord3D::new(0.0, 0.0, 1.0), PI / 2.0, Coord3D::default());
        assert_eq!(p, Coord3D::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_rotate_around_offset_origin() {
        let mut p = Coord3D::new(2.0, 1.0, 0.0);
        p.rotate(Coord3D::new(0.0, 0.0, 1.0), PI, Coord3D::new(1.0, 1.0, 0.0));
        assert_eq!(p, Coord3D::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_distances() {
        assert_eq!(
            coord_distance_3d(Coord3D::new(0.0, 0.0, 0.0), Coord3D::new(1.0, 2.0, 2.0)),
            3.0
        );
        assert_eq!(
            coord_distance_2d(Coord2D::new(0.0, 0.0), Coord2D::new(3.0, 4.0)),
            5.0
        );
    }

    #[test]
    fn test_from_slice() {
        assert_eq!(
            Coord3D::from_slice(&[1.0, 2.0, 3.0, 4.0]),
            Some(Coord3D::new(1.0, 2.0, 3.0))
        );
        assert_eq!(Coord3D::from_slice(&[1.0, 2.0]), None);
    }
}
