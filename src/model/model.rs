//! The aggregate root of an imported scene

use super::material::Material;
use super::mesh::Mesh;
use super::mesh_utils::transform_mesh;
use super::node::{NodeHandle, NodeTree};
use super::property::PropertyGroup;
use crate::geometry::Transformation;

/// One placement of a mesh: the node that references it and the mesh index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshInstance {
    /// Node holding the reference
    pub node: NodeHandle,
    /// Index into [`Model::meshes`]
    pub mesh_index: usize,
}

impl MeshInstance {
    /// World transformation of the instance
    pub fn transformation(&self, model: &Model) -> Transformation {
        model.nodes.world_transformation(self.node)
    }

    /// A copy of the mesh with the instance's world transformation applied
    pub fn transformed_mesh(&self, model: &Model) -> Option<Mesh> {
        let mut mesh = model.meshes.get(self.mesh_index)?.clone();
        transform_mesh(&mut mesh, &self.transformation(model));
        Some(mesh)
    }
}

/// An imported scene: meshes, materials, a node hierarchy and metadata
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Model {
    /// Meshes, referenced by index from nodes
    pub meshes: Vec<Mesh>,
    /// Materials, referenced by index from triangles
    pub materials: Vec<Material>,
    /// Node hierarchy
    pub nodes: NodeTree,
    /// Metadata attached to the whole model
    pub property_groups: Vec<PropertyGroup>,
}

impl Model {
    /// Create an empty model with a bare root node
    pub fn new() -> Self {
        Self::default()
    }

    /// The root node
    pub fn root(&self) -> NodeHandle {
        self.nodes.root()
    }

    /// Number of meshes
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Number of materials
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    /// Number of nodes reachable from the root, excluding the root
    pub fn node_count(&self) -> usize {
        self.nodes.enumerate_children(self.root()).len()
    }

    /// Append a material and return its index
    pub fn add_material(&mut self, material: Material) -> usize {
        self.materials.push(material);
        self.materials.len() - 1
    }

    /// Return the index of an equal material, adding it if there is none
    pub fn add_unique_material(&mut self, material: Material) -> usize {
        match self.materials.iter().position(|m| *m == material) {
            Some(index) => index,
            None => self.add_material(material),
        }
    }

    /// Append a mesh without referencing it from any node
    pub fn add_mesh(&mut self, mesh: Mesh) -> usize {
        self.meshes.push(mesh);
        self.meshes.len() - 1
    }

    /// Append a mesh and instance it on the root node
    pub fn add_mesh_to_root_node(&mut self, mesh: Mesh) -> usize {
        let index = self.add_mesh(mesh);
        let root = self.root();
        self.nodes.get_mut(root).add_mesh_index(index);
        index
    }

    /// Remove a mesh, dropping node references to it and shifting later indices
    pub fn remove_mesh(&mut self, index: usize) {
        if index >= self.meshes.len() {
            return;
        }
        self.meshes.remove(index);
        for handle in self.nodes.enumerate(self.root()) {
            let node = self.nodes.get_mut(handle);
            node.mesh_indices.retain(|i| *i != index);
            for mesh_index in &mut node.mesh_indices {
                if *mesh_index > index {
                    *mesh_index -= 1;
                }
            }
        }
    }

    /// Attach a property group to the model
    pub fn add_property_group(&mut self, group: PropertyGroup) -> usize {
        self.property_groups.push(group);
        self.property_groups.len() - 1
    }

    /// Every (node, mesh) pair reachable from the root, in pre-order
    pub fn mesh_instances(&self) -> Vec<MeshInstance> {
        self.nodes
            .enumerate(self.root())
            .into_iter()
            .flat_map(|node| {
                self.nodes
                    .get(node)
                    .mesh_indices
                    .iter()
                    .map(move |&mesh_index| MeshInstance { node, mesh_index })
            })
            .collect()
    }

    /// Number of mesh instances
    pub fn mesh_instance_count(&self) -> usize {
        self.nodes
            .enumerate(self.root())
            .into_iter()
            .map(|node| self.nodes.get(node).mesh_indices.len())
            .sum()
    }

    fn sum_over_instances(&self, count: impl Fn(&Mesh) -> usize) -> usize {
        self.mesh_instances()
            .iter()
            .filter_map(|instance| self.meshes.get(instance.mesh_index))
            .map(count)
            .sum()
    }

    /// Vertices over all mesh instances
    pub fn vertex_count(&self) -> usize {
        self.sum_over_instances(Mesh::vertex_count)
    }

    /// Vertex colors over all mesh instances
    pub fn vertex_color_count(&self) -> usize {
        self.sum_over_instances(Mesh::vertex_color_count)
    }

    /// Normals over all mesh instances
    pub fn normal_count(&self) -> usize {
        self.sum_over_instances(Mesh::normal_count)
    }

    /// Texture UVs over all mesh instances
    pub fn texture_uv_count(&self) -> usize {
        self.sum_over_instances(Mesh::texture_uv_count)
    }

    /// Triangles over all mesh instances
    pub fn triangle_count(&self) -> usize {
        self.sum_over_instances(Mesh::triangle_count)
    }

    /// Returns true if no mesh instance has a triangle
    pub fn is_empty(&self) -> bool {
        self.triangle_count() == 0
    }
}
