//! Triangle meshes

use super::color::RGBColor;
use super::property::PropertyGroup;
use crate::geometry::{Coord2D, Coord3D};

/// A triangle referencing the arrays of its owning [`Mesh`]
///
/// Vertex indices are mandatory. Vertex colors, normals and texture UVs are
/// stored as whole triples, so a triangle either has all three corners of an
/// attribute or none of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triangle {
    /// Index of the first vertex
    pub v0: usize,
    /// Index of the second vertex
    pub v1: usize,
    /// Index of the third vertex
    pub v2: usize,
    /// Vertex color indices per corner
    pub colors: Option<[usize; 3]>,
    /// Normal indices per corner
    pub normals: Option<[usize; 3]>,
    /// Texture UV indices per corner
    pub uvs: Option<[usize; 3]>,
    /// Index into the model's materials
    pub mat: Option<usize>,
    /// Smoothing group; 0 means flat shading
    pub curve: Option<u32>,
}

impl Triangle {
    /// Create a triangle from three vertex indices
    pub fn new(v0: usize, v1: usize, v2: usize) -> Self {
        Self {
            v0,
            v1,
            v2,
            colors: None,
            normals: None,
            uvs: None,
            mat: None,
            curve: None,
        }
    }

    /// The three vertex indices
    pub fn vertices(&self) -> [usize; 3] {
        [self.v0, self.v1, self.v2]
    }

    /// Replace the vertex indices
    pub fn set_vertices(&mut self, v0: usize, v1: usize, v2: usize) -> &mut Self {
        self.v0 = v0;
        self.v1 = v1;
        self.v2 = v2;
        self
    }

    /// Set per-corner vertex color indices
    pub fn set_vertex_colors(&mut self, c0: usize, c1: usize, c2: usize) -> &mut Self {
        self.colors = Some([c0, c1, c2]);
        self
    }

    /// Set per-corner normal indices
    pub fn set_normals(&mut self, n0: usize, n1: usize, n2: usize) -> &mut Self {
        self.normals = Some([n0, n1, n2]);
        self
    }

    /// Set per-corner texture UV indices
    pub fn set_texture_uvs(&mut self, u0: usize, u1: usize, u2: usize) -> &mut Self {
        self.uvs = Some([u0, u1, u2]);
        self
    }

    /// Set the material index
    pub fn set_material(&mut self, mat: usize) -> &mut Self {
        self.mat = Some(mat);
        self
    }

    /// Set the smoothing group
    pub fn set_curve(&mut self, curve: u32) -> &mut Self {
        self.curve = Some(curve);
        self
    }

    /// Returns true if the triangle has vertex colors
    pub fn has_vertex_colors(&self) -> bool {
        self.colors.is_some()
    }

    /// Returns true if the triangle has normals
    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    /// Returns true if the triangle has texture UVs
    pub fn has_texture_uvs(&self) -> bool {
        self.uvs.is_some()
    }

    /// Swap the second and third corner, reversing the winding
    ///
    /// Per-corner colors, normals and UVs move with their vertex.
    pub fn flip(&mut self) {
        std::mem::swap(&mut self.v1, &mut self.v2);
        for corners in [&mut self.colors, &mut self.normals, &mut self.uvs]
            .into_iter()
            .flatten()
        {
            corners.swap(1, 2);
        }
    }
}

/// A triangle mesh
///
/// Vertices, vertex colors, normals and UVs are flat arrays; triangles refer
/// to them by index. Indices are stable for the lifetime of the mesh, and
/// every `add_*` method returns the index of the new element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Mesh name
    pub name: String,
    /// Vertex positions
    pub vertices: Vec<Coord3D>,
    /// Vertex colors
    pub vertex_colors: Vec<RGBColor>,
    /// Normals
    pub normals: Vec<Coord3D>,
    /// Texture UVs
    pub uvs: Vec<Coord2D>,
    /// Triangles
    pub triangles: Vec<Triangle>,
    /// Metadata attached to the mesh
    pub property_groups: Vec<PropertyGroup>,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new mesh with pre-allocated capacity
    ///
    /// This is useful for performance when the number of vertices and triangles
    /// is known in advance, as it avoids multiple reallocations.
    pub fn with_capacity(vertices: usize, triangles: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertices),
            triangles: Vec::with_capacity(triangles),
            ..Self::default()
        }
    }

    /// Create an empty mesh with a name
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of vertex colors
    pub fn vertex_color_count(&self) -> usize {
        self.vertex_colors.len()
    }

    /// Number of normals
    pub fn normal_count(&self) -> usize {
        self.normals.len()
    }

    /// Number of texture UVs
    pub fn texture_uv_count(&self) -> usize {
        self.uvs.len()
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Append a vertex and return its index
    pub fn add_vertex(&mut self, vertex: Coord3D) -> usize {
        self.vertices.push(vertex);
        self.vertices.len() - 1
    }

    /// Append a vertex color and return its index
    pub fn add_vertex_color(&mut self, color: RGBColor) -> usize {
        self.vertex_colors.push(color);
        self.vertex_colors.len() - 1
    }

    /// Append a normal and return its index
    pub fn add_normal(&mut self, normal: Coord3D) -> usize {
        self.normals.push(normal);
        self.normals.len() - 1
    }

    /// Append a texture UV and return its index
    pub fn add_texture_uv(&mut self, uv: Coord2D) -> usize {
        self.uvs.push(uv);
        self.uvs.len() - 1
    }

    /// Append a triangle and return its index
    pub fn add_triangle(&mut self, triangle: Triangle) -> usize {
        self.triangles.push(triangle);
        self.triangles.len() - 1
    }

    /// Attach a property group
    pub fn add_property_group(&mut self, group: PropertyGroup) -> usize {
        self.property_groups.push(group);
        self.property_groups.len() - 1
    }

    /// Returns true if the mesh has no triangles or no vertices
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty() || self.vertices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_returns_indices() {
        let mut mesh = Mesh::new();
        assert_eq!(mesh.add_vertex(Coord3D::new(0.0, 0.0, 0.0)), 0);
        assert_eq!(mesh.add_vertex(Coord3D::new(1.0, 0.0, 0.0)), 1);
        assert_eq!(mesh.add_normal(Coord3D::new(0.0, 0.0, 1.0)), 0);
        assert_eq!(mesh.add_texture_uv(Coord2D::new(0.0, 1.0)), 0);
        assert_eq!(mesh.add_vertex_color(RGBColor::new(1, 2, 3)), 0);
        assert_eq!(mesh.add_triangle(Triangle::new(0, 1, 0)), 0);
        assert_eq!(mesh.vertex_count(), 2);
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn test_is_empty() {
        let mut mesh = Mesh::with_name("a");
        assert!(mesh.is_empty());
        mesh.add_vertex(Coord3D::default());
        assert!(mesh.is_empty());
        mesh.add_triangle(Triangle::new(0, 0, 0));
        assert!(!mesh.is_empty());
    }

    #[test]
    fn test_triangle_attributes() {
        let mut triangle = Triangle::new(0, 1, 2);
        assert!(!triangle.has_normals());
        triangle.set_normals(3, 4, 5).set_material(1).set_curve(2);
        assert!(triangle.has_normals());
        assert_eq!(triangle.normals, Some([3, 4, 5]));
        assert_eq!(triangle.mat, Some(1));
        assert_eq!(triangle.curve, Some(2));
        triangle.set_texture_uvs(6, 7, 8);
        triangle.flip();
        assert_eq!(triangle.vertices(), [0, 2, 1]);
        assert_eq!(triangle.normals, Some([3, 5, 4]));
        assert_eq!(triangle.uvs, Some([6, 8, 7]));
        assert_eq!(triangle.colors, None);
    }
}
