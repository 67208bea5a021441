//! Wavefront OBJ decoder
//!
//! OBJ files keep vertices, normals and texture coordinates in file-global
//! arrays. Each mesh (`g`/`o`) gets a [`MeshBuilder`] that maps global indices
//! to mesh-local ones on first use, so a mesh only stores the elements its
//! faces reference. Material libraries (`mtllib`) are read through the
//! import context and processed as if their lines were part of the file.

use super::{ImportContext, Importer};
use crate::error::{Error, Result};
use crate::geometry::{Coord2D, Coord3D, Direction};
use crate::io::{
    name_from_line, parameters_from_line, parse_number, read_lines, utf8_string_from_bytes,
};
use crate::model::{Material, MaterialKind, Mesh, RGBColor, TextureMap, Triangle};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Decoder for `.obj` files (and the `.mtl` libraries they reference)
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjImporter;

impl ObjImporter {
    /// Create a new OBJ decoder
    pub fn new() -> Self {
        Self
    }
}

impl Importer for ObjImporter {
    fn name(&self) -> &str {
        "obj"
    }

    fn can_import_extension(&self, extension: &str) -> bool {
        extension == "obj"
    }

    fn up_direction(&self) -> Direction {
        Direction::Y
    }

    fn import_content(&self, content: &[u8], ctx: &mut ImportContext<'_>) -> Result<()> {
        let text = utf8_string_from_bytes(content);
        let mut state = ObjState::default();
        state.process_text(&text, ctx)?;
        debug!(
            vertices = state.vertices.len(),
            meshes = state.builders.len(),
            "obj decoded"
        );
        Ok(())
    }
}

/// Global-to-local index maps for one mesh
#[derive(Debug)]
struct MeshBuilder {
    mesh_index: usize,
    vertices: HashMap<usize, usize>,
    normals: HashMap<usize, usize>,
    uvs: HashMap<usize, usize>,
}

impl MeshBuilder {
    fn new(mesh_index: usize) -> Self {
        Self {
            mesh_index,
            vertices: HashMap::new(),
            normals: HashMap::new(),
            uvs: HashMap::new(),
        }
    }
}

/// Map a global index to the mesh-local one, copying the value on first use
fn local_index<T: Copy>(
    global_index: Option<usize>,
    values: &[T],
    map: &mut HashMap<usize, usize>,
    add: impl FnOnce(T) -> usize,
) -> Option<usize> {
    let global_index = global_index?;
    let value = *values.get(global_index)?;
    Some(*map.entry(global_index).or_insert_with(|| add(value)))
}

/// Resolve an OBJ index: positive is 1-based, negative counts back from `count`
fn relative_index(token: &str, count: usize) -> Option<usize> {
    let index = token.parse::<i64>().ok()?;
    let resolved = if index > 0 {
        index - 1
    } else {
        count as i64 + index
    };
    usize::try_from(resolved).ok()
}

#[derive(Debug, Default)]
struct ObjState {
    vertices: Vec<Coord3D>,
    normals: Vec<Coord3D>,
    uvs: Vec<Coord2D>,
    builders: Vec<MeshBuilder>,
    builder_by_name: HashMap<String, usize>,
    current_builder: Option<usize>,
    // Material being defined by `newmtl`, and the one faces are assigned with `usemtl`
    edited_material: Option<usize>,
    used_material: Option<usize>,
    material_by_name: HashMap<String, usize>,
    loaded_libraries: HashSet<String>,
}

impl ObjState {
    fn process_text(&mut self, text: &str, ctx: &mut ImportContext<'_>) -> Result<()> {
        let mut result = Ok(());
        read_lines(text, |line| {
            if result.is_ok() {
                result = self.process_line(line, ctx);
            }
        });
        result
    }

    fn process_line(&mut self, line: &str, ctx: &mut ImportContext<'_>) -> Result<()> {
        if line.starts_with('#') {
            return Ok(());
        }
        let mut parameters = parameters_from_line(line, Some('#'));
        if parameters.is_empty() {
            return Ok(());
        }
        let keyword = parameters.remove(0).to_lowercase();

        if self.process_mesh_parameter(&keyword, &parameters, line, ctx)? {
            return Ok(());
        }
        self.process_material_parameter(&keyword, &parameters, line, ctx)?;
        Ok(())
    }

    fn add_new_mesh(&mut self, name: &str, ctx: &mut ImportContext<'_>) {
        if let Some(&builder) = self.builder_by_name.get(name) {
            self.current_builder = Some(builder);
            return;
        }
        let mesh_index = ctx.model.add_mesh_to_root_node(Mesh::with_name(name));
        self.builders.push(MeshBuilder::new(mesh_index));
        let builder = self.builders.len() - 1;
        self.builder_by_name.insert(name.to_string(), builder);
        self.current_builder = Some(builder);
    }

    fn process_mesh_parameter(
        &mut self,
        keyword: &str,
        parameters: &[&str],
        line: &str,
        ctx: &mut ImportContext<'_>,
    ) -> Result<bool> {
        match keyword {
            "g" | "o" => {
                if !parameters.is_empty() {
                    let name = name_from_line(line, keyword.len(), '#');
                    self.add_new_mesh(name, ctx);
                }
            }
            "v" => {
                if parameters.len() >= 3 {
                    self.vertices.push(parse_coord_3d(parameters, "vertex")?);
                }
            }
            "vn" => {
                if parameters.len() >= 3 {
                    self.normals.push(parse_coord_3d(parameters, "normal")?);
                }
            }
            "vt" => {
                if parameters.len() >= 2 {
                    self.uvs.push(Coord2D::new(
                        parse_number(parameters[0], "texture u")?,
                        parse_number(parameters[1], "texture v")?,
                    ));
                }
            }
            "f" => {
                if parameters.len() >= 3 {
                    self.process_face(parameters, ctx)?;
                }
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn process_material_parameter(
        &mut self,
        keyword: &str,
        parameters: &[&str],
        line: &str,
        ctx: &mut ImportContext<'_>,
    ) -> Result<bool> {
        match keyword {
            "newmtl" => {
                if parameters.is_empty() {
                    return Ok(true);
                }
                let name = name_from_line(line, keyword.len(), '#');
                let mut material = Material::phong();
                material.name = name.to_string();
                let index = ctx.model.add_material(material);
                self.edited_material = Some(index);
                self.material_by_name.insert(name.to_string(), index);
            }
            "usemtl" => {
                if parameters.is_empty() {
                    return Ok(true);
                }
                let name = name_from_line(line, keyword.len(), '#');
                if let Some(&index) = self.material_by_name.get(name) {
                    self.used_material = Some(index);
                }
            }
            "mtllib" => {
                if parameters.is_empty() {
                    return Ok(true);
                }
                let file_name = name_from_line(line, keyword.len(), '#').to_string();
                if !self.loaded_libraries.insert(file_name.clone()) {
                    return Ok(true);
                }
                if let Some(buffer) = ctx.get_file_buffer(&file_name) {
                    let text = utf8_string_from_bytes(&buffer);
                    self.process_text(&text, ctx)?;
                }
            }
            "map_kd" | "map_ks" | "map_bump" | "bump" => {
                if parameters.is_empty() {
                    return Ok(true);
                }
                let Some(index) = self.edited_material else {
                    return Ok(true);
                };
                let texture = create_texture(keyword, line, ctx);
                let material = &mut ctx.model.materials[index];
                match keyword {
                    "map_kd" => {
                        material.diffuse_map = Some(texture);
                        material.update_transparency();
                    }
                    "map_ks" => {
                        if let MaterialKind::Phong { specular_map, .. } = &mut material.kind {
                            *specular_map = Some(texture);
                        }
                    }
                    _ => material.bump_map = Some(texture),
                }
            }
            "ka" | "kd" | "ks" => {
                if parameters.len() < 3 {
                    return Ok(true);
                }
                let Some(index) = self.edited_material else {
                    return Ok(true);
                };
                let color = RGBColor::from_float_components(
                    parse_number(parameters[0], "color red")?,
                    parse_number(parameters[1], "color green")?,
                    parse_number(parameters[2], "color blue")?,
                );
                let material = &mut ctx.model.materials[index];
                match (keyword, &mut material.kind) {
                    ("kd", _) => material.color = color,
                    ("ka", MaterialKind::Phong { ambient, .. }) => *ambient = color,
                    ("ks", MaterialKind::Phong { specular, .. }) => *specular = color,
                    _ => {}
                }
            }
            "ns" | "tr" | "d" => {
                if parameters.is_empty() {
                    return Ok(true);
                }
                let Some(index) = self.edited_material else {
                    return Ok(true);
                };
                let value = parse_number(parameters[0], keyword)?;
                let material = &mut ctx.model.materials[index];
                match keyword {
                    "ns" => {
                        if let MaterialKind::Phong { shininess, .. } = &mut material.kind {
                            *shininess = value / 1000.0;
                        }
                    }
                    "tr" => {
                        material.opacity = 1.0 - value;
                        material.update_transparency();
                    }
                    _ => {
                        material.opacity = value;
                        material.update_transparency();
                    }
                }
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn process_face(&mut self, parameters: &[&str], ctx: &mut ImportContext<'_>) -> Result<()> {
        let mut vertices = Vec::with_capacity(parameters.len());
        let mut normals = Vec::with_capacity(parameters.len());
        let mut uvs = Vec::with_capacity(parameters.len());

        // Relative indices resolve against the array lengths at this line
        for parameter in parameters {
            let mut parts = parameter.split('/');
            let vertex = parts.next().unwrap_or("");
            vertices.push(relative_index(vertex, self.vertices.len()));
            if let Some(uv) = parts.next().filter(|uv| !uv.is_empty()) {
                uvs.push(relative_index(uv, self.uvs.len()));
            }
            if let Some(normal) = parts.next().filter(|normal| !normal.is_empty()) {
                normals.push(relative_index(normal, self.normals.len()));
            }
        }

        let builder_index = match self.current_builder {
            Some(builder) => builder,
            None => {
                self.add_new_mesh("", ctx);
                self.builders.len() - 1
            }
        };
        let builder = &mut self.builders[builder_index];
        let mesh = &mut ctx.model.meshes[builder.mesh_index];

        for i in 0..vertices.len() - 2 {
            let corners = [0, i + 1, i + 2];

            let mut v = [0usize; 3];
            for (slot, corner) in v.iter_mut().zip(corners) {
                *slot = local_index(vertices[corner], &self.vertices, &mut builder.vertices, |c| {
                    mesh.add_vertex(c)
                })
                .ok_or(Error::InvalidVertexIndex)?;
            }
            let mut triangle = Triangle::new(v[0], v[1], v[2]);

            if normals.len() == vertices.len() {
                let mut n = [0usize; 3];
                for (slot, corner) in n.iter_mut().zip(corners) {
                    *slot = local_index(normals[corner], &self.normals, &mut builder.normals, |c| {
                        mesh.add_normal(c)
                    })
                    .ok_or(Error::InvalidNormalIndex)?;
                }
                triangle.set_normals(n[0], n[1], n[2]);
            }

            if uvs.len() == vertices.len() {
                let mut u = [0usize; 3];
                for (slot, corner) in u.iter_mut().zip(corners) {
                    *slot = local_index(uvs[corner], &self.uvs, &mut builder.uvs, |c| {
                        mesh.add_texture_uv(c)
                    })
                    .ok_or(Error::InvalidUvIndex)?;
                }
                triangle.set_texture_uvs(u[0], u[1], u[2]);
            }

            if let Some(material) = self.used_material {
                triangle.set_material(material);
            }
            mesh.add_triangle(triangle);
        }
        Ok(())
    }
}

fn parse_coord_3d(parameters: &[&str], what: &str) -> Result<Coord3D> {
    Ok(Coord3D::new(
        parse_number(parameters[0], &format!("{} x", what))?,
        parse_number(parameters[1], &format!("{} y", what))?,
        parse_number(parameters[2], &format!("{} z", what))?,
    ))
}

fn create_texture(keyword: &str, line: &str, ctx: &mut ImportContext<'_>) -> TextureMap {
    let name = name_from_line(line, keyword.len(), '#');
    let mut texture = TextureMap::new(name);
    texture.buffer = ctx.get_file_buffer(name);
    texture
}
