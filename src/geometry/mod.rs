//! Geometry kernel
//!
//! Vectors, quaternions, 4x4 matrices and composed transformations used by
//! every decoder and by the data model. Floating point comparisons go
//! through the epsilon predicates in this module, never through `==` on raw
//! `f64` values.

mod coord;
mod matrix;
mod quaternion;
mod transformation;
mod tween;

pub use coord::{
    Coord2D, Coord3D, Coord4D, coord_distance_2d, coord_distance_3d, cross_vector_3d,
    dot_vector_3d, vector_angle_3d, vector_length_3d,
};
pub use matrix::{Matrix, Trs};
pub use quaternion::{EulerOrder, Quaternion};
pub use transformation::Transformation;
pub use tween::{TweenFunction, bezier_tween, linear_tween, parabolic_tween, tween_coord_3d};

/// Tolerance used by all "is equal" style comparisons
pub const EPS: f64 = 1.0e-8;

/// Looser tolerance for values that went through several float operations
pub const BIG_EPS: f64 = 1.0e-4;

/// Multiply radians by this to get degrees
pub const RAD_DEG: f64 = 57.295_779_513_082_32;

/// Multiply degrees by this to get radians
pub const DEG_RAD: f64 = 0.017_453_292_519_943_295;

/// Coordinate axis, used for the format-native up direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// X axis
    X,
    /// Y axis
    Y,
    /// Z axis
    Z,
}

impl Direction {
    /// Unit vector pointing along this axis
    pub fn to_vector(self) -> Coord3D {
        match self {
            Direction::X => Coord3D::new(1.0, 0.0, 0.0),
            Direction::Y => Coord3D::new(0.0, 1.0, 0.0),
            Direction::Z => Coord3D::new(0.0, 0.0, 1.0),
        }
    }
}

/// `|a| < EPS`
pub fn is_zero(a: f64) -> bool {
    a.abs() < EPS
}

/// `b - a > EPS`
pub fn is_lower(a: f64, b: f64) -> bool {
    b - a > EPS
}

/// `a - b > EPS`
pub fn is_greater(a: f64, b: f64) -> bool {
    a - b > EPS
}

/// `a < b` or `a ≈ b`
pub fn is_lower_or_equal(a: f64, b: f64) -> bool {
    b - a > -EPS
}

/// `a > b` or `a ≈ b`
pub fn is_greater_or_equal(a: f64, b: f64) -> bool {
    a - b > -EPS
}

/// `|a - b| < EPS`
pub fn is_equal(a: f64, b: f64) -> bool {
    (b - a).abs() < EPS
}

/// `|a - b| < eps`
pub fn is_equal_eps(a: f64, b: f64, eps: f64) -> bool {
    (b - a).abs() < eps
}

/// `a > EPS`
pub fn is_positive(a: f64) -> bool {
    a > EPS
}

/// `a < -EPS`
pub fn is_negative(a: f64) -> bool {
    a < -EPS
}
