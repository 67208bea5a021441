//! Autodesk 3D Studio (3DS) decoder
//!
//! A 3DS file is a tree of chunks. Every chunk starts with a 6-byte header,
//! a `u16` id and a `u32` length that includes the header itself. Container
//! chunks hold child chunks up to their end offset; unknown ids are skipped.
//!
//! The editor section carries materials and meshes, the keyframer section
//! carries the node hierarchy. Without a keyframer section every mesh is
//! placed directly under the root node.

use super::{ImportContext, Importer};
use crate::error::{Error, Result};
use crate::geometry::{
    Coord2D, Coord3D, DEG_RAD, Direction, Matrix, Quaternion, Transformation, is_negative,
};
use crate::io::BinaryReader;
use crate::model::{
    Material, MaterialKind, Mesh, NodeHandle, RGBColor, TextureMap, Triangle,
    color_component_from_float, flip_mesh_triangles_orientation, transform_mesh,
};
use std::collections::HashMap;
use tracing::{debug, trace, warn};

const CHUNK_HEADER_SIZE: usize = 6;
const MAX_NAME_LENGTH: usize = 64;
const ROOT_PARENT_ID: u16 = 65535;
const DUMMY_NODE_NAME: &str = "$$$DUMMY";

mod chunk {
    pub const MAIN: u16 = 0x4D4D;
    pub const EDITOR: u16 = 0x3D3D;
    pub const MATERIAL: u16 = 0xAFFF;
    pub const MAT_NAME: u16 = 0xA000;
    pub const MAT_AMBIENT: u16 = 0xA010;
    pub const MAT_DIFFUSE: u16 = 0xA020;
    pub const MAT_SPECULAR: u16 = 0xA030;
    pub const MAT_SHININESS: u16 = 0xA040;
    pub const MAT_SHININESS_STRENGTH: u16 = 0xA041;
    pub const MAT_TRANSPARENCY: u16 = 0xA050;
    pub const COLOR_F: u16 = 0x0010;
    pub const COLOR_24: u16 = 0x0011;
    pub const LIN_COLOR_24: u16 = 0x0012;
    pub const LIN_COLOR_F: u16 = 0x0013;
    pub const PERCENTAGE_INT: u16 = 0x0030;
    pub const PERCENTAGE_F: u16 = 0x0031;
    pub const MAT_TEXMAP: u16 = 0xA200;
    pub const MAT_SPECMAP: u16 = 0xA204;
    pub const MAT_BUMPMAP: u16 = 0xA230;
    pub const MAP_NAME: u16 = 0xA300;
    pub const MAP_USCALE: u16 = 0xA354;
    pub const MAP_VSCALE: u16 = 0xA356;
    pub const MAP_UOFFSET: u16 = 0xA358;
    pub const MAP_VOFFSET: u16 = 0xA35A;
    pub const MAP_ROTATION: u16 = 0xA35C;
    pub const OBJECT: u16 = 0x4000;
    pub const TRIMESH: u16 = 0x4100;
    pub const VERTICES: u16 = 0x4110;
    pub const FACES: u16 = 0x4120;
    pub const FACE_MATERIAL: u16 = 0x4130;
    pub const TEXTURE_VERTICES: u16 = 0x4140;
    pub const SMOOTHING_GROUPS: u16 = 0x4150;
    pub const LOCAL_TRANSFORMATION: u16 = 0x4160;
    pub const KEYFRAMER: u16 = 0xB000;
    pub const OBJECT_NODE: u16 = 0xB002;
    pub const NODE_HIERARCHY: u16 = 0xB010;
    pub const NODE_INSTANCE_NAME: u16 = 0xB011;
    pub const NODE_PIVOT: u16 = 0xB013;
    pub const POSITION_TRACK: u16 = 0xB020;
    pub const ROTATION_TRACK: u16 = 0xB021;
    pub const SCALE_TRACK: u16 = 0xB022;
    pub const NODE_ID: u16 = 0xB030;
}

/// Decoder for `.3ds` files
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreeDsImporter;

impl ThreeDsImporter {
    /// Create a new 3DS decoder
    pub fn new() -> Self {
        Self
    }
}

impl Importer for ThreeDsImporter {
    fn name(&self) -> &str {
        "3ds"
    }

    fn can_import_extension(&self, extension: &str) -> bool {
        extension == "3ds"
    }

    fn up_direction(&self) -> Direction {
        Direction::Z
    }

    fn import_content(&self, content: &[u8], ctx: &mut ImportContext<'_>) -> Result<()> {
        let mut reader = BinaryReader::little_endian(content);
        let mut state = ThreeDsState::new(ctx);
        let end = reader.len();
        read_chunks(&mut reader, end, |reader, id, end| match id {
            chunk::MAIN => state.read_main(reader, end),
            _ => Ok(()),
        })
    }
}

/// A node of the keyframer section
#[derive(Debug, Clone)]
struct KeyframeNode {
    id: Option<u16>,
    name: String,
    parent_id: u16,
    instance_name: String,
    pivot: Coord3D,
    positions: Vec<Coord3D>,
    rotations: Vec<[f64; 4]>,
    scales: Vec<Coord3D>,
}

impl Default for KeyframeNode {
    fn default() -> Self {
        Self {
            id: None,
            name: String::new(),
            parent_id: ROOT_PARENT_ID,
            instance_name: String::new(),
            pivot: Coord3D::default(),
            positions: Vec::new(),
            rotations: Vec::new(),
            scales: Vec::new(),
        }
    }
}

impl KeyframeNode {
    fn display_name(&self) -> String {
        if self.name.is_empty() || self.name == DUMMY_NODE_NAME {
            return String::new();
        }
        if self.instance_name.is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", self.name, self.instance_name)
        }
    }

    /// Local transformation built from the first key of each track
    fn transformation(&self, is_mesh_node: bool) -> Transformation {
        let position = self.positions.first().copied().unwrap_or_default();
        let rotation = self
            .rotations
            .first()
            .map_or_else(Quaternion::identity, |axis_angle| {
                quaternion_from_axis_angle(*axis_angle)
            });
        let scale = self
            .scales
            .first()
            .copied()
            .unwrap_or(Coord3D::new(1.0, 1.0, 1.0));

        let mut matrix = Matrix::compose_trs(position, rotation, scale);
        if is_mesh_node {
            let pivot = Matrix::translation(-self.pivot.x, -self.pivot.y, -self.pivot.z);
            matrix = pivot.multiply_matrix(&matrix);
        }
        Transformation::from_matrix(matrix)
    }
}

/// Rotation keys are `[x, y, z, angle]` with an unnormalized axis and the
/// angle measured in the opposite direction
fn quaternion_from_axis_angle(axis_angle: [f64; 4]) -> Quaternion {
    let [x, y, z, angle] = axis_angle;
    let length = (x * x + y * y + z * z).sqrt();
    if length <= 0.0 {
        return Quaternion::identity();
    }
    let omega = angle * -0.5;
    let s = omega.sin() / length;
    Quaternion::new(s * x, s * y, s * z, omega.cos())
}

struct ThreeDsState<'c, 'a> {
    ctx: &'c mut ImportContext<'a>,
    material_by_name: HashMap<String, usize>,
    mesh_by_name: HashMap<String, usize>,
    nodes: Vec<KeyframeNode>,
}

impl<'c, 'a> ThreeDsState<'c, 'a> {
    fn new(ctx: &'c mut ImportContext<'a>) -> Self {
        Self {
            ctx,
            material_by_name: HashMap::new(),
            mesh_by_name: HashMap::new(),
            nodes: Vec::new(),
        }
    }

    fn read_main(&mut self, reader: &mut BinaryReader<'_>, end: usize) -> Result<()> {
        read_chunks(reader, end, |reader, id, end| match id {
            chunk::EDITOR => self.read_editor(reader, end),
            chunk::KEYFRAMER => self.read_keyframer(reader, end),
            _ => Ok(()),
        })?;
        self.build_node_hierarchy();
        Ok(())
    }

    fn read_editor(&mut self, reader: &mut BinaryReader<'_>, end: usize) -> Result<()> {
        read_chunks(reader, end, |reader, id, end| match id {
            chunk::MATERIAL => self.read_material(reader, end),
            chunk::OBJECT => self.read_object(reader, end),
            _ => Ok(()),
        })
    }

    fn read_material(&mut self, reader: &mut BinaryReader<'_>, end: usize) -> Result<()> {
        let mut material = Material::phong();
        let mut ambient = RGBColor::default();
        let mut specular = RGBColor::default();
        let mut specular_map = None;
        let mut shininess = None;
        let mut shininess_strength = None;

        read_chunks(reader, end, |reader, id, end| {
            match id {
                chunk::MAT_NAME => material.name = read_name(reader)?,
                chunk::MAT_AMBIENT => ambient = read_color(reader, end)?,
                chunk::MAT_DIFFUSE => material.color = read_color(reader, end)?,
                chunk::MAT_SPECULAR => specular = read_color(reader, end)?,
                chunk::MAT_SHININESS => shininess = Some(read_percentage(reader, end)?),
                chunk::MAT_SHININESS_STRENGTH => {
                    shininess_strength = Some(read_percentage(reader, end)?)
                }
                chunk::MAT_TRANSPARENCY => {
                    material.opacity = 1.0 - read_percentage(reader, end)?;
                    material.update_transparency();
                }
                chunk::MAT_TEXMAP => {
                    material.diffuse_map = Some(self.read_texture_map(reader, end)?);
                    material.update_transparency();
                }
                chunk::MAT_SPECMAP => specular_map = Some(self.read_texture_map(reader, end)?),
                chunk::MAT_BUMPMAP => material.bump_map = Some(self.read_texture_map(reader, end)?),
                _ => {}
            }
            Ok(())
        })?;

        let shininess = match (shininess, shininess_strength) {
            (Some(shininess), Some(strength)) => shininess * strength / 10.0,
            _ => 0.0,
        };
        material.kind = MaterialKind::Phong {
            ambient,
            specular,
            shininess,
            specular_map,
        };
        trace!(name = %material.name, "3ds material");
        let name = material.name.clone();
        let index = self.ctx.model.add_material(material);
        self.material_by_name.insert(name, index);
        Ok(())
    }

    fn read_texture_map(
        &mut self,
        reader: &mut BinaryReader<'_>,
        end: usize,
    ) -> Result<TextureMap> {
        let mut texture = TextureMap::new("");
        read_chunks(reader, end, |reader, id, _| {
            match id {
                chunk::MAP_NAME => {
                    texture.name = read_name(reader)?;
                    texture.buffer = self.ctx.get_file_buffer(&texture.name);
                }
                chunk::MAP_UOFFSET => texture.offset.x = reader.read_f32()? as f64,
                chunk::MAP_VOFFSET => texture.offset.y = reader.read_f32()? as f64,
                chunk::MAP_USCALE => texture.scale.x = reader.read_f32()? as f64,
                chunk::MAP_VSCALE => texture.scale.y = reader.read_f32()? as f64,
                chunk::MAP_ROTATION => texture.rotation = reader.read_f32()? as f64 * DEG_RAD,
                _ => {}
            }
            Ok(())
        })?;
        Ok(texture)
    }

    fn read_object(&mut self, reader: &mut BinaryReader<'_>, end: usize) -> Result<()> {
        let name = read_name(reader)?;
        read_chunks(reader, end, |reader, id, end| match id {
            chunk::TRIMESH => self.read_mesh(reader, end, &name),
            _ => {
                trace!(object = %name, "skipping 3ds object chunk");
                Ok(())
            }
        })
    }

    fn read_mesh(&mut self, reader: &mut BinaryReader<'_>, end: usize, name: &str) -> Result<()> {
        let mut mesh = Mesh::with_name(name);
        let mut local_matrix = None;

        read_chunks(reader, end, |reader, id, end| {
            match id {
                chunk::VERTICES => {
                    let count = reader.read_u16()?;
                    for _ in 0..count {
                        let [x, y, z] = reader.read_f32_triple()?;
                        mesh.add_vertex(Coord3D::new(x, y, z));
                    }
                }
                chunk::TEXTURE_VERTICES => {
                    let count = reader.read_u16()?;
                    for _ in 0..count {
                        let u = reader.read_f32()? as f64;
                        let v = reader.read_f32()? as f64;
                        mesh.add_texture_uv(Coord2D::new(u, v));
                    }
                }
                chunk::FACES => self.read_faces(reader, end, &mut mesh)?,
                chunk::LOCAL_TRANSFORMATION => local_matrix = Some(read_local_matrix(reader)?),
                _ => {}
            }
            Ok(())
        })?;

        let vertex_count = mesh.vertex_count();
        if mesh
            .triangles
            .iter()
            .any(|t| t.vertices().iter().any(|v| *v >= vertex_count))
        {
            return Err(Error::InvalidVertexIndex);
        }
        if vertex_count == mesh.texture_uv_count() {
            for triangle in &mut mesh.triangles {
                let [v0, v1, v2] = triangle.vertices();
                triangle.set_texture_uvs(v0, v1, v2);
            }
        }
        if let Some(matrix) = local_matrix {
            apply_local_matrix(&mut mesh, matrix);
        }

        debug!(
            mesh = %mesh.name,
            vertices = mesh.vertex_count(),
            triangles = mesh.triangle_count(),
            "3ds mesh"
        );
        let index = self.ctx.model.add_mesh(mesh);
        self.mesh_by_name.insert(name.to_string(), index);
        Ok(())
    }

    fn read_faces(
        &mut self,
        reader: &mut BinaryReader<'_>,
        end: usize,
        mesh: &mut Mesh,
    ) -> Result<()> {
        let face_count = reader.read_u16()? as usize;
        for _ in 0..face_count {
            let v0 = reader.read_u16()? as usize;
            let v1 = reader.read_u16()? as usize;
            let v2 = reader.read_u16()? as usize;
            // edge visibility flags
            reader.skip(2)?;
            mesh.add_triangle(Triangle::new(v0, v1, v2));
        }

        read_chunks(reader, end, |reader, id, _| {
            match id {
                chunk::FACE_MATERIAL => {
                    let material_name = read_name(reader)?;
                    let material = self.material_by_name.get(&material_name).copied();
                    if material.is_none() {
                        warn!(
                            material = %material_name,
                            "3ds face group refers to an unknown material"
                        );
                    }
                    let count = reader.read_u16()?;
                    for _ in 0..count {
                        let face = reader.read_u16()? as usize;
                        if let (Some(triangle), Some(material)) =
                            (mesh.triangles.get_mut(face), material)
                        {
                            triangle.set_material(material);
                        }
                    }
                }
                chunk::SMOOTHING_GROUPS => {
                    for triangle in mesh.triangles.iter_mut().take(face_count) {
                        triangle.set_curve(reader.read_u32()?);
                    }
                }
                _ => {}
            }
            Ok(())
        })
    }

    fn read_keyframer(&mut self, reader: &mut BinaryReader<'_>, end: usize) -> Result<()> {
        read_chunks(reader, end, |reader, id, end| match id {
            chunk::OBJECT_NODE => {
                let node = read_object_node(reader, end)?;
                self.nodes.push(node);
                Ok(())
            }
            _ => Ok(()),
        })
    }

    fn build_node_hierarchy(&mut self) {
        let model = &mut self.ctx.model;
        let root = model.root();
        if self.nodes.is_empty() {
            for mesh_index in 0..model.mesh_count() {
                model.nodes.get_mut(root).add_mesh_index(mesh_index);
            }
            return;
        }

        let mut handle_by_id: HashMap<u16, NodeHandle> = HashMap::new();
        for node_3ds in &self.nodes {
            let parent = match node_3ds.parent_id {
                ROOT_PARENT_ID => root,
                parent_id => handle_by_id.get(&parent_id).copied().unwrap_or(root),
            };
            let handle = model.nodes.add_new_child(parent);
            if let Some(id) = node_3ds.id {
                handle_by_id.insert(id, handle);
            }

            let mesh_index = self.mesh_by_name.get(&node_3ds.name).copied();
            let node = model.nodes.get_mut(handle);
            node.name = node_3ds.display_name();
            node.transformation = node_3ds.transformation(mesh_index.is_some());
            if let Some(mesh_index) = mesh_index {
                node.add_mesh_index(mesh_index);
            }
        }
        debug!(nodes = self.nodes.len(), "3ds node hierarchy");
    }
}

/// Iterate the child chunks of a container ending at `end`
///
/// The handler receives the chunk id and the end offset of the chunk. After
/// the handler returns, the reader is moved to the end of the chunk, so
/// handlers may leave trailing data unread.
fn read_chunks<'d>(
    reader: &mut BinaryReader<'d>,
    end: usize,
    mut on_chunk: impl FnMut(&mut BinaryReader<'d>, u16, usize) -> Result<()>,
) -> Result<()> {
    while reader.position() + CHUNK_HEADER_SIZE <= end {
        let start = reader.position();
        let id = reader.read_u16()?;
        let length = reader.read_u32()? as usize;
        if length < CHUNK_HEADER_SIZE {
            return Err(Error::invalid_format_context(
                "3DS chunk",
                &format!("chunk {:#06x} at offset {} has length {}", id, start, length),
            ));
        }
        let chunk_end = start.saturating_add(length);
        trace!(offset = start, length, "3ds chunk");
        on_chunk(reader, id, chunk_end)?;
        reader.set_position(chunk_end)?;
    }
    Ok(())
}

/// Zero-terminated name of at most 64 characters
fn read_name(reader: &mut BinaryReader<'_>) -> Result<String> {
    let mut bytes = Vec::new();
    while bytes.len() < MAX_NAME_LENGTH {
        match reader.read_u8()? {
            0 => break,
            byte => bytes.push(byte),
        }
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn read_vector(reader: &mut BinaryReader<'_>) -> Result<Coord3D> {
    let [x, y, z] = reader.read_f32_triple()?;
    Ok(Coord3D::new(x, y, z))
}

/// Color sub-chunk; a linear (gamma corrected) variant wins over the plain one
fn read_color(reader: &mut BinaryReader<'_>, end: usize) -> Result<RGBColor> {
    let mut color = RGBColor::default();
    let mut has_linear_color = false;
    read_chunks(reader, end, |reader, id, _| {
        let is_linear = matches!(id, chunk::LIN_COLOR_24 | chunk::LIN_COLOR_F);
        if has_linear_color && !is_linear {
            return Ok(());
        }
        match id {
            chunk::COLOR_24 | chunk::LIN_COLOR_24 => {
                color = RGBColor::new(reader.read_u8()?, reader.read_u8()?, reader.read_u8()?);
            }
            chunk::COLOR_F | chunk::LIN_COLOR_F => {
                let [r, g, b] = reader.read_f32_triple()?;
                color = RGBColor::new(
                    color_component_from_float(r),
                    color_component_from_float(g),
                    color_component_from_float(b),
                );
            }
            _ => return Ok(()),
        }
        has_linear_color |= is_linear;
        Ok(())
    })?;
    Ok(color)
}

/// Percentage sub-chunk as a fraction
fn read_percentage(reader: &mut BinaryReader<'_>, end: usize) -> Result<f64> {
    let mut percentage = 0.0;
    read_chunks(reader, end, |reader, id, _| {
        match id {
            chunk::PERCENTAGE_INT => percentage = reader.read_u16()? as f64 / 100.0,
            chunk::PERCENTAGE_F => percentage = reader.read_f32()? as f64,
            _ => {}
        }
        Ok(())
    })?;
    Ok(percentage)
}

/// 4x3 matrix stored row by row, extended to 4x4
fn read_local_matrix(reader: &mut BinaryReader<'_>) -> Result<Matrix> {
    let mut values = [0.0; 16];
    for row in 0..4 {
        let [x, y, z] = reader.read_f32_triple()?;
        values[row * 4..row * 4 + 3].copy_from_slice(&[x, y, z]);
        values[row * 4 + 3] = if row == 3 { 1.0 } else { 0.0 };
    }
    Ok(Matrix::new(values))
}

/// Move the vertices back into object space
///
/// A mirrored basis (negative determinant) is first flipped along X, and the
/// triangle winding is reversed after the transformation.
fn apply_local_matrix(mesh: &mut Mesh, matrix: Matrix) {
    let mirrored = is_negative(matrix.determinant());
    let matrix = if mirrored {
        Matrix::scale(-1.0, 1.0, 1.0).multiply_matrix(&matrix)
    } else {
        matrix
    };
    let Some(inverse) = matrix.invert() else {
        warn!(mesh = %mesh.name, "3ds local matrix is not invertible");
        return;
    };
    transform_mesh(mesh, &Transformation::from_matrix(inverse));
    if mirrored {
        flip_mesh_triangles_orientation(mesh);
    }
}

fn read_object_node(reader: &mut BinaryReader<'_>, end: usize) -> Result<KeyframeNode> {
    let mut node = KeyframeNode::default();
    read_chunks(reader, end, |reader, id, _| {
        match id {
            chunk::NODE_HIERARCHY => {
                node.name = read_name(reader)?;
                // flags
                reader.skip(4)?;
                node.parent_id = reader.read_u16()?;
            }
            chunk::NODE_INSTANCE_NAME => node.instance_name = read_name(reader)?,
            chunk::NODE_PIVOT => node.pivot = read_vector(reader)?,
            chunk::POSITION_TRACK => {
                node.positions = read_track(reader, |reader| read_vector(reader))?
            }
            chunk::ROTATION_TRACK => {
                node.rotations = read_track(reader, |reader| {
                    let angle = reader.read_f32()? as f64;
                    let axis = read_vector(reader)?;
                    Ok([axis.x, axis.y, axis.z, angle])
                })?
            }
            chunk::SCALE_TRACK => node.scales = read_track(reader, |reader| read_vector(reader))?,
            chunk::NODE_ID => node.id = Some(reader.read_u16()?),
            _ => {}
        }
        Ok(())
    })?;
    Ok(node)
}

/// Keys of an animation track
fn read_track<T>(
    reader: &mut BinaryReader<'_>,
    mut read_key: impl FnMut(&mut BinaryReader<'_>) -> Result<T>,
) -> Result<Vec<T>> {
    // track flags and reserved words
    reader.skip(10)?;
    let key_count = reader.read_i32()?.max(0);
    let mut keys = Vec::new();
    for _ in 0..key_count {
        // frame number
        reader.skip(4)?;
        let spline_flags = reader.read_u16()?;
        if spline_flags != 0 {
            reader.skip(4)?;
        }
        keys.push(read_key(reader)?);
    }
    Ok(keys)
}
