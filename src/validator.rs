//! Invariant checks for imported models
//!
//! A model produced by a successful import satisfies the following:
//! - Every triangle vertex, color, normal and UV index is within its mesh array
//! - Every triangle has normals, a material and a smoothing group
//! - Every material index is below the model's material count
//! - No vertex, color, normal or UV component is NaN

use crate::error::{Error, Result};
use crate::model::{Mesh, Model, Triangle};

/// Returns true if the model satisfies every invariant listed in the module docs
pub fn check_model(model: &Model) -> bool {
    validate_model(model).is_ok()
}

/// Validate a finalized model, describing the first violation found
pub fn validate_model(model: &Model) -> Result<()> {
    for (mesh_index, mesh) in model.meshes.iter().enumerate() {
        validate_mesh_values(mesh_index, mesh)?;
        for (triangle_index, triangle) in mesh.triangles.iter().enumerate() {
            validate_triangle(model, mesh_index, mesh, triangle_index, triangle)?;
        }
    }
    Ok(())
}

fn validate_mesh_values(mesh_index: usize, mesh: &Mesh) -> Result<()> {
    if let Some(i) = mesh.vertices.iter().position(|v| !v.is_valid()) {
        return Err(Error::InvalidModel(format!(
            "Mesh {}: Vertex {} has a NaN coordinate. \
             Check the source file for malformed numeric values.",
            mesh_index, i
        )));
    }
    if let Some(i) = mesh.normals.iter().position(|n| !n.is_valid()) {
        return Err(Error::InvalidModel(format!(
            "Mesh {}: Normal {} has a NaN component.",
            mesh_index, i
        )));
    }
    if let Some(i) = mesh.uvs.iter().position(|uv| !uv.is_valid()) {
        return Err(Error::InvalidModel(format!(
            "Mesh {}: Texture UV {} has a NaN component.",
            mesh_index, i
        )));
    }
    Ok(())
}

fn validate_triangle(
    model: &Model,
    mesh_index: usize,
    mesh: &Mesh,
    triangle_index: usize,
    triangle: &Triangle,
) -> Result<()> {
    check_indices(
        mesh_index,
        triangle_index,
        "vertex",
        &triangle.vertices(),
        mesh.vertex_count(),
    )?;
    if let Some(colors) = &triangle.colors {
        check_indices(
            mesh_index,
            triangle_index,
            "vertex color",
            colors,
            mesh.vertex_color_count(),
        )?;
    }
    match &triangle.normals {
        Some(normals) => check_indices(
            mesh_index,
            triangle_index,
            "normal",
            normals,
            mesh.normal_count(),
        )?,
        None => {
            return Err(Error::InvalidModel(format!(
                "Mesh {}: Triangle {} has no normals. \
                 Finalized models carry normals on every triangle.",
                mesh_index, triangle_index
            )));
        }
    }
    if let Some(uvs) = &triangle.uvs {
        check_indices(
            mesh_index,
            triangle_index,
            "texture uv",
            uvs,
            mesh.texture_uv_count(),
        )?;
    }
    match triangle.mat {
        Some(mat) if mat < model.material_count() => {}
        Some(mat) => {
            return Err(Error::InvalidModel(format!(
                "Mesh {}: Triangle {} references material {} but the model has {} material(s).",
                mesh_index,
                triangle_index,
                mat,
                model.material_count()
            )));
        }
        None => {
            return Err(Error::InvalidModel(format!(
                "Mesh {}: Triangle {} has no material.",
                mesh_index, triangle_index
            )));
        }
    }
    if triangle.curve.is_none() {
        return Err(Error::InvalidModel(format!(
            "Mesh {}: Triangle {} has no smoothing group.",
            mesh_index, triangle_index
        )));
    }
    Ok(())
}

fn check_indices(
    mesh_index: usize,
    triangle_index: usize,
    kind: &str,
    indices: &[usize; 3],
    count: usize,
) -> Result<()> {
    for index in indices {
        if *index >= count {
            return Err(Error::InvalidModel(format!(
                "Mesh {}: Triangle {} {} index {} is out of bounds (mesh has {} {} entries). \
                 Indices must reference existing elements of the mesh.",
                mesh_index, triangle_index, kind, index, count, kind
            )));
        }
    }
    Ok(())
}
