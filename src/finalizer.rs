//! Post-import repair of decoded models
//!
//! The finalizer never rejects a model. It removes empty meshes, assigns a
//! default material to triangles without one, computes missing normals
//! (flat or per smoothing group), flags materials whose triangles all carry
//! vertex colors, and prunes empty nodes. Running it twice is a no-op.

use crate::geometry::Coord3D;
use crate::model::{Material, Mesh, Model, RGBColor, calculate_triangle_normal};
use std::collections::HashMap;
use tracing::debug;

/// What a finalization pass changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalizationReport {
    /// Number of meshes removed because they had no triangles
    pub removed_meshes: usize,
    /// Index of the default material, if one had to be created
    pub default_material: Option<usize>,
    /// Number of nodes pruned from the hierarchy
    pub removed_nodes: usize,
}

/// Finalizes models, creating at most one default material per pass
#[derive(Debug, Clone)]
pub struct ModelFinalizer {
    default_color: RGBColor,
    default_material: Option<usize>,
}

impl ModelFinalizer {
    /// Create a finalizer whose default material gets `default_color`
    pub fn new(default_color: RGBColor) -> Self {
        Self {
            default_color,
            default_material: None,
        }
    }

    /// Run every finalization step on `model`
    pub fn finalize(&mut self, model: &mut Model) -> FinalizationReport {
        self.default_material = None;

        let removed_meshes = remove_empty_meshes(model);
        for mesh_index in 0..model.meshes.len() {
            self.finalize_mesh(model, mesh_index);
        }
        finalize_materials(model);
        let removed_nodes = prune_empty_nodes(model);

        let report = FinalizationReport {
            removed_meshes,
            default_material: self.default_material,
            removed_nodes,
        };
        debug!(
            removed_meshes = report.removed_meshes,
            removed_nodes = report.removed_nodes,
            default_material = ?report.default_material,
            "model finalized"
        );
        report
    }

    fn finalize_mesh(&mut self, model: &mut Model, mesh_index: usize) {
        let mut needs_curve_normals = false;
        let mut needs_default_material = false;

        let mesh = &mut model.meshes[mesh_index];
        for index in 0..mesh.triangles.len() {
            let triangle = &mesh.triangles[index];
            if !triangle.has_normals() {
                if triangle.curve.unwrap_or(0) == 0 {
                    let normal = face_normal(mesh, index);
                    let normal_index = mesh.add_normal(normal);
                    mesh.triangles[index].set_normals(normal_index, normal_index, normal_index);
                } else {
                    needs_curve_normals = true;
                }
            }
            let triangle = &mut mesh.triangles[index];
            if triangle.curve.is_none() {
                triangle.curve = Some(0);
            }
            if triangle.mat.is_none() {
                needs_default_material = true;
            }
        }

        if needs_curve_normals {
            calculate_curve_normals(&mut model.meshes[mesh_index]);
        }
        if needs_default_material {
            let material = self.default_material_index(model);
            for triangle in &mut model.meshes[mesh_index].triangles {
                if triangle.mat.is_none() {
                    triangle.mat = Some(material);
                }
            }
        }
    }

    fn default_material_index(&mut self, model: &mut Model) -> usize {
        if let Some(index) = self.default_material {
            return index;
        }
        let mut material = Material::phong();
        material.color = self.default_color;
        material.is_default = true;
        let index = model.add_material(material);
        self.default_material = Some(index);
        index
    }
}

/// Finalize `model` with a default material of `default_color`
pub fn finalize_model(model: &mut Model, default_color: RGBColor) -> FinalizationReport {
    ModelFinalizer::new(default_color).finalize(model)
}

fn remove_empty_meshes(model: &mut Model) -> usize {
    let empty: Vec<usize> = model
        .meshes
        .iter()
        .enumerate()
        .filter(|(_, mesh)| mesh.is_empty())
        .map(|(index, _)| index)
        .collect();
    // Highest first, so earlier removals do not shift pending indices.
    for index in empty.iter().rev() {
        model.remove_mesh(*index);
    }
    empty.len()
}

fn face_normal(mesh: &Mesh, triangle_index: usize) -> Coord3D {
    let triangle = &mesh.triangles[triangle_index];
    match (
        mesh.vertices.get(triangle.v0),
        mesh.vertices.get(triangle.v1),
        mesh.vertices.get(triangle.v2),
    ) {
        (Some(v0), Some(v1), Some(v2)) => calculate_triangle_normal(*v0, *v1, *v2),
        _ => Coord3D::default(),
    }
}

fn calculate_curve_normals(mesh: &mut Mesh) {
    let triangle_normals: Vec<Coord3D> = (0..mesh.triangles.len())
        .map(|index| face_normal(mesh, index))
        .collect();

    let mut vertex_to_triangles: Vec<Vec<usize>> = vec![Vec::new(); mesh.vertices.len()];
    for (index, triangle) in mesh.triangles.iter().enumerate() {
        for vertex in triangle.vertices() {
            if let Some(list) = vertex_to_triangles.get_mut(vertex) {
                list.push(index);
            }
        }
    }

    let average_normal = |mesh: &Mesh, triangle_index: usize, vertex: usize| -> Coord3D {
        let curve = mesh.triangles[triangle_index].curve;
        let mut distinct: Vec<Coord3D> = Vec::new();
        for &neighbour in vertex_to_triangles.get(vertex).map_or(&[][..], Vec::as_slice) {
            if mesh.triangles[neighbour].curve != curve {
                continue;
            }
            let normal = triangle_normals[neighbour];
            if !distinct.contains(&normal) {
                distinct.push(normal);
            }
        }
        if distinct.is_empty() {
            return triangle_normals[triangle_index];
        }
        let count = distinct.len() as f64;
        let sum = distinct
            .into_iter()
            .fold(Coord3D::default(), |acc, normal| acc + normal);
        (sum * (1.0 / count)).normalized()
    };

    for index in 0..mesh.triangles.len() {
        if mesh.triangles[index].has_normals() {
            continue;
        }
        let [v0, v1, v2] = mesh.triangles[index].vertices();
        let n0 = average_normal(mesh, index, v0);
        let n1 = average_normal(mesh, index, v1);
        let n2 = average_normal(mesh, index, v2);
        let i0 = mesh.add_normal(n0);
        let i1 = mesh.add_normal(n1);
        let i2 = mesh.add_normal(n2);
        mesh.triangles[index].set_normals(i0, i1, i2);
    }
}

fn finalize_materials(model: &mut Model) {
    if model.vertex_color_count() == 0 {
        return;
    }
    let mut material_has_vertex_colors: HashMap<usize, bool> = HashMap::new();
    for triangle in model.meshes.iter().flat_map(|mesh| mesh.triangles.iter()) {
        let Some(mat) = triangle.mat else {
            continue;
        };
        let entry = material_has_vertex_colors.entry(mat).or_insert(true);
        *entry = *entry && triangle.has_vertex_colors();
    }
    for (mat, has_vertex_colors) in material_has_vertex_colors {
        if let Some(material) = model.materials.get_mut(mat) {
            material.vertex_colors = has_vertex_colors;
        }
    }
}

fn prune_empty_nodes(model: &mut Model) -> usize {
    let root = model.root();
    let mut pending: Vec<_> = model
        .nodes
        .enumerate_children(root)
        .into_iter()
        .filter(|handle| model.nodes.get(*handle).is_empty())
        .collect();

    let mut removed = 0;
    while let Some(handle) = pending.pop() {
        let Some(parent) = model.nodes.get(handle).parent() else {
            continue;
        };
        model.nodes.remove_child_node(parent, handle);
        removed += 1;
        if parent != root && model.nodes.get(parent).is_empty() {
            pending.push(parent);
        }
    }
    removed
}
