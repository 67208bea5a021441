//! Composable transformations

use super::{Coord3D, Matrix};

/// A transformation backed by a [`Matrix`]
///
/// Transformations compose child-then-parent: `child.append(&parent)`
/// produces the transformation that first applies `child` and then `parent`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Transformation {
    matrix: Matrix,
}

impl Transformation {
    /// The identity transformation
    pub fn new() -> Self {
        Self {
            matrix: Matrix::identity(),
        }
    }

    /// Wrap an existing matrix
    pub fn from_matrix(matrix: Matrix) -> Self {
        Self { matrix }
    }

    /// The underlying matrix
    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    /// Replace the underlying matrix
    pub fn set_matrix(&mut self, matrix: Matrix) -> &mut Self {
        self.matrix = matrix;
        self
    }

    /// Append `other`, so it is applied after the current transformation
    pub fn append(&mut self, other: &Transformation) -> &mut Self {
        if other.is_identity() {
            return self;
        }
        if self.is_identity() {
            self.matrix = other.matrix;
            return self;
        }
        self.matrix = self.matrix.multiply_matrix(&other.matrix);
        self
    }

    /// Returns true if the matrix is the identity (within epsilon)
    pub fn is_identity(&self) -> bool {
        self.matrix.is_identity()
    }

    /// Transform a point
    pub fn transform_coord_3d(&self, coord: Coord3D) -> Coord3D {
        let result = self
            .matrix
            .multiply_vector([coord.x, coord.y, coord.z, 1.0]);
        Coord3D::new(result[0], result[1], result[2])
    }
}
