//! Geometric operations on whole meshes

use super::mesh::Mesh;
use crate::geometry::{
    Coord3D, Matrix, Transformation, cross_vector_3d,
};

/// Unit normal of the triangle `v0, v1, v2` (counter-clockwise winding)
///
/// Degenerate triangles produce a zero vector.
pub fn calculate_triangle_normal(v0: Coord3D, v1: Coord3D, v2: Coord3D) -> Coord3D {
    cross_vector_3d(v1 - v0, v2 - v0).normalized()
}

/// Transform the vertices of a mesh in place
///
/// Normals are rotated by the rotation part of the transformation only.
/// When the matrix cannot be decomposed the normals are left untouched.
pub fn transform_mesh(mesh: &mut Mesh, transformation: &Transformation) {
    if transformation.is_identity() {
        return;
    }

    for vertex in &mut mesh.vertices {
        *vertex = transformation.transform_coord_3d(*vertex);
    }

    if mesh.normals.is_empty() {
        return;
    }
    let Ok(trs) = transformation.matrix().decompose_trs() else {
        return;
    };
    let normal_transformation = Transformation::from_matrix(Matrix::compose_trs(
        Coord3D::default(),
        trs.rotation,
        Coord3D::new(1.0, 1.0, 1.0),
    ));
    for normal in &mut mesh.normals {
        *normal = normal_transformation.transform_coord_3d(*normal);
    }
}

/// Reverse the winding of every triangle
pub fn flip_mesh_triangles_orientation(mesh: &mut Mesh) {
    for triangle in &mut mesh.triangles {
        triangle.flip();
    }
}
