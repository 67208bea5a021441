//! 4x4 transformation matrices
//!
//! Matrices are stored row-major with the translation in elements 12..14 and
//! follow the row-vector convention: a point is transformed as `v * M`, so
//! `a.multiply_matrix(&b)` applies `a` first and `b` second.

use super::{Coord3D, Quaternion, is_equal, is_negative, is_zero, vector_length_3d};
use crate::error::{Error, Result};

/// Result of decomposing a matrix into translation, rotation and scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trs {
    /// Translation part
    pub translation: Coord3D,
    /// Rotation part
    pub rotation: Quaternion,
    /// Per-axis scale; the X scale is negative for mirrored bases
    pub scale: Coord3D,
}

/// A 4x4 matrix of `f64` values
#[derive(Debug, Clone, Copy)]
pub struct Matrix {
    values: [f64; 16],
}

impl Matrix {
    /// Wrap 16 row-major values
    pub fn new(values: [f64; 16]) -> Self {
        Self { values }
    }

    /// Build from a slice of at least 16 row-major values
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        let array: [f64; 16] = values.get(..16)?.try_into().ok()?;
        Some(Self::new(array))
    }

    /// The identity matrix
    pub fn identity() -> Self {
        Self::new([
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    /// Translation by `(x, y, z)`
    pub fn translation(x: f64, y: f64, z: f64) -> Self {
        Self::new([
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            x, y, z, 1.0,
        ])
    }

    /// Rotation matrix of a quaternion
    pub fn rotation(quaternion: Quaternion) -> Self {
        Self::compose_trs(
            Coord3D::default(),
            quaternion,
            Coord3D::new(1.0, 1.0, 1.0),
        )
    }

    /// Rotation of `angle` radians around a normalized `axis`
    pub fn rotation_axis_angle(axis: Coord3D, angle: f64) -> Self {
        Self::rotation(Quaternion::from_axis_angle(axis, angle))
    }

    /// Per-axis scale
    pub fn scale(x: f64, y: f64, z: f64) -> Self {
        Self::new([
            x, 0.0, 0.0, 0.0, //
            0.0, y, 0.0, 0.0, //
            0.0, 0.0, z, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    /// Compose scale, then rotation, then translation
    pub fn compose_trs(translation: Coord3D, rotation: Quaternion, scale: Coord3D) -> Self {
        let Quaternion { x, y, z, w } = rotation;

        let x2 = x + x;
        let y2 = y + y;
        let z2 = z + z;
        let xx = x * x2;
        let xy = x * y2;
        let xz = x * z2;
        let yy = y * y2;
        let yz = y * z2;
        let zz = z * z2;
        let wx = w * x2;
        let wy = w * y2;
        let wz = w * z2;

        let (sx, sy, sz) = (scale.x, scale.y, scale.z);
        Self::new([
            (1.0 - (yy + zz)) * sx,
            (xy + wz) * sx,
            (xz - wy) * sx,
            0.0,
            (xy - wz) * sy,
            (1.0 - (xx + zz)) * sy,
            (yz + wx) * sy,
            0.0,
            (xz + wy) * sz,
            (yz - wx) * sz,
            (1.0 - (xx + yy)) * sz,
            0.0,
            translation.x,
            translation.y,
            translation.z,
            1.0,
        ])
    }

    /// Split into translation, rotation and scale
    ///
    /// A negative determinant is attributed to the X axis. Compose and
    /// decompose are not exact inverses for non-uniform or mirrored scale.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DegenerateScale`] when any basis vector has zero
    /// length, since the rotation is undefined in that case.
    pub fn decompose_trs(&self) -> Result<Trs> {
        let m = &self.values;
        let translation = Coord3D::new(m[12], m[13], m[14]);

        let mut sx = vector_length_3d(m[0], m[1], m[2]);
        let sy = vector_length_3d(m[4], m[5], m[6]);
        let sz = vector_length_3d(m[8], m[9], m[10]);
        if is_zero(sx) || is_zero(sy) || is_zero(sz) {
            return Err(Error::DegenerateScale);
        }
        if is_negative(self.determinant()) {
            sx *= -1.0;
        }
        let scale = Coord3D::new(sx, sy, sz);

        let m00 = m[0] / sx;
        let m01 = m[4] / sy;
        let m02 = m[8] / sz;
        let m10 = m[1] / sx;
        let m11 = m[5] / sy;
        let m12 = m[9] / sz;
        let m20 = m[2] / sx;
        let m21 = m[6] / sy;
        let m22 = m[10] / sz;

        let trace = m00 + m11 + m22;
        let rotation = if trace > 0.0 {
            let s = (trace + 1.0).sqrt() * 2.0;
            Quaternion::new((m21 - m12) / s, (m02 - m20) / s, (m10 - m01) / s, 0.25 * s)
        } else if m00 > m11 && m00 > m22 {
            let s = (1.0 + m00 - m11 - m22).sqrt() * 2.0;
            Quaternion::new(0.25 * s, (m01 + m10) / s, (m02 + m20) / s, (m21 - m12) / s)
        } else if m11 > m22 {
            let s = (1.0 + m11 - m00 - m22).sqrt() * 2.0;
            Quaternion::new((m01 + m10) / s, 0.25 * s, (m12 + m21) / s, (m02 - m20) / s)
        } else {
            let s = (1.0 + m22 - m00 - m11).sqrt() * 2.0;
            Quaternion::new((m02 + m20) / s, (m12 + m21) / s, 0.25 * s, (m10 - m01) / s)
        };

        Ok(Trs {
            translation,
            rotation,
            scale,
        })
    }

    /// Determinant of the full 4x4 matrix
    pub fn determinant(&self) -> f64 {
        let c = Cofactors::new(&self.values);
        c.determinant()
    }

    /// Inverse matrix, or `None` when the determinant is (nearly) zero
    pub fn invert(&self) -> Option<Matrix> {
        let m = &self.values;
        let c = Cofactors::new(m);
        let det = c.determinant();
        if is_equal(det, 0.0) {
            return None;
        }

        let (a00, a01, a02, a03) = (m[0], m[1], m[2], m[3]);
        let (a10, a11, a12, a13) = (m[4], m[5], m[6], m[7]);
        let (a20, a21, a22, a23) = (m[8], m[9], m[10], m[11]);
        let (a30, a31, a32, a33) = (m[12], m[13], m[14], m[15]);
        let [b00, b01, b02, b03, b04, b05, b06, b07, b08, b09, b10, b11] = c.b;

        Some(Matrix::new([
            (a11 * b11 - a12 * b10 + a13 * b09) / det,
            (a02 * b10 - a01 * b11 - a03 * b09) / det,
            (a31 * b05 - a32 * b04 + a33 * b03) / det,
            (a22 * b04 - a21 * b05 - a23 * b03) / det,
            (a12 * b08 - a10 * b11 - a13 * b07) / det,
            (a00 * b11 - a02 * b08 + a03 * b07) / det,
            (a32 * b02 - a30 * b05 - a33 * b01) / det,
            (a20 * b05 - a22 * b02 + a23 * b01) / det,
            (a10 * b10 - a11 * b08 + a13 * b06) / det,
            (a01 * b08 - a00 * b10 - a03 * b06) / det,
            (a30 * b04 - a31 * b02 + a33 * b00) / det,
            (a21 * b02 - a20 * b04 - a23 * b00) / det,
            (a11 * b07 - a10 * b09 - a12 * b06) / det,
            (a00 * b09 - a01 * b07 + a02 * b06) / det,
            (a31 * b01 - a30 * b03 - a32 * b00) / det,
            (a20 * b03 - a21 * b01 + a22 * b00) / det,
        ]))
    }

    /// Multiply a row vector by this matrix (`v * M`)
    pub fn multiply_vector(&self, vector: [f64; 4]) -> [f64; 4] {
        let m = &self.values;
        let mut result = [0.0; 4];
        for (col, value) in result.iter_mut().enumerate() {
            *value = (0..4).map(|row| vector[row] * m[row * 4 + col]).sum();
        }
        result
    }

    /// Matrix product `self * other`
    pub fn multiply_matrix(&self, other: &Matrix) -> Matrix {
        let a = &self.values;
        let b = &other.values;
        let mut result = [0.0; 16];
        for row in 0..4 {
            for col in 0..4 {
                result[row * 4 + col] = (0..4).map(|k| a[row * 4 + k] * b[k * 4 + col]).sum();
            }
        }
        Matrix::new(result)
    }

    /// Returns true if every element is within epsilon of the identity
    pub fn is_identity(&self) -> bool {
        self.is_equal(&Matrix::identity())
    }

    /// Element-wise epsilon comparison
    pub fn is_equal(&self, other: &Matrix) -> bool {
        self.values
            .iter()
            .zip(other.values.iter())
            .all(|(a, b)| is_equal(*a, *b))
    }

    /// The 16 row-major values
    pub fn values(&self) -> &[f64; 16] {
        &self.values
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl PartialEq for Matrix {
    fn eq(&self, other: &Self) -> bool {
        self.is_equal(other)
    }
}

/// 2x2 sub-determinants shared by the determinant and the inverse
struct Cofactors {
    b: [f64; 12],
}

impl Cofactors {
    fn new(m: &[f64; 16]) -> Self {
        let (a00, a01, a02, a03) = (m[0], m[1], m[2], m[3]);
        let (a10, a11, a12, a13) = (m[4], m[5], m[6], m[7]);
        let (a20, a21, a22, a23) = (m[8], m[9], m[10], m[11]);
        let (a30, a31, a32, a33) = (m[12], m[13], m[14], m[15]);
        Self {
            b: [
                a00 * a11 - a01 * a10,
                a00 * a12 - a02 * a10,
                a00 * a13 - a03 * a10,
                a01 * a12 - a02 * a11,
                a01 * a13 - a03 * a11,
                a02 * a13 - a03 * a12,
                a20 * a31 - a21 * a30,
                a20 * a32 - a22 * a30,
                a20 * a33 - a23 * a30,
                a21 * a32 - a22 * a31,
                a21 * a33 - a23 * a31,
                a22 * a33 - a23 * a32,
            ],
        }
    }

    fn determinant(&self) -> f64 {
        let b = &self.b;
        b[0] * b[11] - b[1] * b[10] + b[2] * b[9] + b[3] * b[8] - b[4] * b[7] + b[5] * b[6]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn transform_point(matrix: &Matrix, p: Coord3D) -> Coord3D {
        let r = matrix.multiply_vector([p.x, p.y, p.z, 1.0]);
        Coord3D::new(r[0], r[1], r[2])
    }

    #[test]
    fn test_identity_and_translation() {
        assert!(Matrix::identity().is_identity());
        let t = Matrix::translation(1.0, 2.0, 3.0);
        assert!(!t.is_identity());
        assert_eq!(
            transform_point(&t, Coord3D::new(1.0, 1.0, 1.0)),
            Coord3D::new(2.0, 3.0, 4.0)
        );
    }

    #[test]
    fn test_rotation_row_vector_convention() {
        let r = Matrix::rotation_axis_angle(Coord3D::new(0.0, 0.0, 1.0), PI / 2.0);
        assert_eq!(
            transform_point(&r, Coord3D::new(1.0, 0.0, 0.0)),
            Coord3D::new(0.0, 1.0, 0.0)
        );
    }

    #[test]
    fn test_multiply_order_applies_left_first() {
        let scale = Matrix::scale(2.0, 2.0, 2.0);
        let translate = Matrix::translation(1.0, 0.0, 0.0);
        let combined = scale.multiply_matrix(&translate);
        assert_eq!(
            transform_point(&combined, Coord3D::new(1.0, 0.0, 0.0)),
            Coord3D::new(3.0, 0.0, 0.0)
        );
    }

    #[test]
    fn test_determinant() {
        assert!(is_equal(Matrix::identity().determinant(), 1.0));
        assert!(is_equal(Matrix::scale(2.0, 3.0, 4.0).determinant(), 24.0));
        assert!(is_equal(Matrix::scale(-1.0, 1.0, 1.0).determinant(), -1.0));
    }

    #[test]
    fn test_invert() {
        let m = Matrix::compose_trs(
            Coord3D::new(1.0, -2.0, 3.0),
            Quaternion::from_axis_angle(Coord3D::new(0.0, 1.0, 0.0), 0.4),
            Coord3D::new(2.0, 2.0, 2.0),
        );
        let inverse = m.invert().unwrap();
        assert!(m.multiply_matrix(&inverse).is_identity());
        assert!(Matrix::scale(0.0, 1.0, 1.0).invert().is_none());
    }

    #[test]
    fn test_compose_decompose() {
        let translation = Coord3D::new(1.0, 2.0, 3.0);
        let rotation = Quaternion::from_axis_angle(Coord3D::new(1.0, 0.0, 0.0), 0.5);
        let scale = Coord3D::new(1.0, 2.0, 3.0);
        let matrix = Matrix::compose_trs(translation, rotation, scale);
        let trs = matrix.decompose_trs().unwrap();
        assert_eq!(trs.translation, translation);
        assert_eq!(trs.rotation, rotation);
        assert_eq!(trs.scale, scale);
    }

    #[test]
    fn test_decompose_mirrored() {
        let trs = Matrix::scale(-2.0, 1.0, 1.0).decompose_trs().unwrap();
        assert_eq!(trs.scale, Coord3D::new(-2.0, 1.0, 1.0));
        assert_eq!(trs.rotation, Quaternion::identity());
    }

    #[test]
    fn test_decompose_degenerate_scale() {
        let result = Matrix::scale(1.0, 0.0, 1.0).decompose_trs();
        assert!(matches!(result, Err(Error::DegenerateScale)));
    }

    #[test]
    fn test_from_slice() {
        let values: Vec<f64> = (0..16).map(|i| i as f64).collect();
        let m = Matrix::from_slice(&values).unwrap();
        assert_eq!(m.values()[15], 15.0);
        assert!(Matrix::from_slice(&values[..15]).is_none());
    }
}
