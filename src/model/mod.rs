//! Unified in-memory scene representation
//!
//! Every decoder produces a [`Model`]: an ordered list of [`Mesh`]es, an
//! ordered list of [`Material`]s, a node hierarchy ([`NodeTree`]) instancing
//! the meshes, and optional [`PropertyGroup`]s carrying source metadata.

mod color;
mod material;
mod mesh;
mod mesh_utils;
#[allow(clippy::module_inception)]
mod model;
mod node;
mod property;

pub use color::{
    RGBAColor, RGBColor, color_component_from_float, color_component_to_float, linear_to_srgb,
    srgb_to_linear,
};
pub use material::{Material, MaterialKind, TextureMap};
pub use mesh::{Mesh, Triangle};
pub use mesh_utils::{calculate_triangle_normal, flip_mesh_triangles_orientation, transform_mesh};
pub use model::{MeshInstance, Model};
pub use node::{Node, NodeHandle, NodeTree};
pub use property::{Property, PropertyGroup, PropertyValue};
