//! glTF 2.0 decoder for `.gltf` (JSON) and `.glb` (binary container) files
//!
//! Buffers come from the GLB binary chunk, from base64 data URIs, or from
//! side files requested through the [`ImportContext`]. Accessor data is read
//! with [`AccessorReader`], which also applies sparse overlays.
//!
//! Primitives compressed with `KHR_draco_mesh_compression` produce no
//! geometry. Point and line primitives are skipped.

mod accessor;
mod document;

pub use accessor::{AccessorLayout, AccessorReader, AccessorType, ComponentType};

use super::topology::{fan_triangles, list_triangles, strip_triangles};
use super::{ImportContext, Importer};
use crate::error::{Error, Result};
use crate::geometry::{Coord2D, Coord3D, Direction, Matrix, Quaternion, Transformation};
use crate::io::{
    BinaryReader, base64_data_uri_to_buffer, file_extension_from_mime_type, utf8_string_from_bytes,
};
use crate::model::{
    Material, MaterialKind, Mesh, NodeHandle, Property, PropertyGroup, PropertyValue, RGBColor,
    TextureMap, Triangle, color_component_from_float, linear_to_srgb,
};
use document::{Document, TextureInfo};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

const GLB_MAGIC: u32 = 0x4654_6C67;
const GLB_VERSION: u32 = 2;
const GLB_JSON_CHUNK: u32 = 0x4E4F_534A;
const GLB_BINARY_CHUNK: u32 = 0x004E_4942;

const DRACO_EXTENSION: &str = "KHR_draco_mesh_compression";
const SUPPORTED_EXTENSIONS: &[&str] = &[
    "KHR_materials_pbrSpecularGlossiness",
    "KHR_texture_transform",
];

const MODE_TRIANGLES: u32 = 4;
const MODE_TRIANGLE_STRIP: u32 = 5;
const MODE_TRIANGLE_FAN: u32 = 6;

/// Decoder for `.gltf` and `.glb` files
#[derive(Debug, Clone, Copy, Default)]
pub struct GltfImporter;

impl GltfImporter {
    /// Create a new glTF decoder
    pub fn new() -> Self {
        Self
    }
}

impl Importer for GltfImporter {
    fn name(&self) -> &str {
        "gltf"
    }

    fn can_import_extension(&self, extension: &str) -> bool {
        extension == "gltf" || extension == "glb"
    }

    fn up_direction(&self) -> Direction {
        Direction::Y
    }

    fn import_content(&self, content: &[u8], ctx: &mut ImportContext<'_>) -> Result<()> {
        let (document, binary_chunk) = if ctx.extension() == "glb" {
            read_glb(content)?
        } else {
            let text = utf8_string_from_bytes(content);
            (serde_json::from_str::<Document>(&text)?, None)
        };

        if !document.version().is_some_and(|version| version.starts_with("2.")) {
            return Err(Error::InvalidGltfVersion);
        }
        let unsupported: Vec<String> = document
            .extensions_required
            .iter()
            .filter(|name| !SUPPORTED_EXTENSIONS.contains(&name.as_str()))
            .cloned()
            .collect();
        if !unsupported.is_empty() {
            return Err(Error::UnsupportedExtension(unsupported));
        }

        let buffers = resolve_buffers(&document, binary_chunk, ctx)?;
        let mut decoder = GltfDecoder {
            document: &document,
            buffers,
            ctx,
            images: HashMap::new(),
        };
        decoder.import_model()
    }
}

/// Split a GLB container into its JSON document and binary chunk
fn read_glb(content: &[u8]) -> Result<(Document, Option<&[u8]>)> {
    let mut reader = BinaryReader::little_endian(content);
    if reader.read_u32()? != GLB_MAGIC {
        return Err(Error::InvalidGltf);
    }
    if reader.read_u32()? != GLB_VERSION {
        return Err(Error::InvalidGltfVersion);
    }
    if reader.read_u32()? as usize != content.len() {
        return Err(Error::InvalidGltf);
    }

    let mut json = None;
    let mut binary = None;
    while !reader.at_end() {
        let length = reader.read_u32()? as usize;
        let chunk_type = reader.read_u32()?;
        let data = reader.read_bytes(length)?;
        match chunk_type {
            GLB_JSON_CHUNK => json = Some(data),
            GLB_BINARY_CHUNK if binary.is_none() => binary = Some(data),
            _ => debug!(chunk_type, length, "skipping glb chunk"),
        }
    }

    let json = json.ok_or(Error::InvalidGltf)?;
    let document = serde_json::from_str(&utf8_string_from_bytes(json))?;
    Ok((document, binary))
}

fn resolve_buffers(
    document: &Document,
    binary_chunk: Option<&[u8]>,
    ctx: &mut ImportContext<'_>,
) -> Result<Vec<Arc<[u8]>>> {
    document
        .buffers
        .iter()
        .map(|buffer| {
            let resolved = match &buffer.uri {
                None => binary_chunk.map(Arc::<[u8]>::from),
                Some(uri) => match base64_data_uri_to_buffer(uri) {
                    Some(data_uri) => Some(Arc::from(data_uri.buffer)),
                    None => ctx.get_file_buffer(uri),
                },
            };
            resolved.ok_or(Error::MissingBuffer)
        })
        .collect()
}

fn lookup<'d, T>(items: &'d [T], index: usize, what: &str) -> Result<&'d T> {
    items.get(index).ok_or_else(|| {
        Error::invalid_format_context("glTF", &format!("{} {} does not exist", what, index))
    })
}

/// A whole, non-negative index below `vertex_count`
fn vertex_index(value: f64, vertex_count: usize) -> Result<usize> {
    if value >= 0.0 && value.fract() == 0.0 && value < vertex_count as f64 {
        Ok(value as usize)
    } else {
        Err(Error::InvalidVertexIndex)
    }
}

/// Linear float color to an sRGB color
fn srgb_color(components: &[f64]) -> RGBColor {
    RGBColor::from_float_components(
        linear_to_srgb(components[0]),
        linear_to_srgb(components[1]),
        linear_to_srgb(components[2]),
    )
}

fn vertex_color(element: &[f64; 4], component_type: ComponentType) -> RGBColor {
    let scale = match component_type {
        ComponentType::UInt8 => 255.0,
        ComponentType::UInt16 => 65535.0,
        _ => 1.0,
    };
    let component = |value: f64| color_component_from_float(linear_to_srgb(value / scale));
    RGBColor::new(
        component(element[0]),
        component(element[1]),
        component(element[2]),
    )
}

/// `asset` and `extras` objects become property groups; only text and
/// number members are kept
fn property_group(name: &str, value: Option<&Value>) -> Option<PropertyGroup> {
    let object = value?.as_object()?;
    let mut group = PropertyGroup::new(name);
    for (key, value) in object {
        let value = match value {
            Value::String(text) => PropertyValue::Text(text.clone()),
            Value::Number(number) => match number.as_i64() {
                Some(integer) => PropertyValue::Integer(integer),
                None => PropertyValue::Number(number.as_f64().unwrap_or_default()),
            },
            _ => continue,
        };
        group.add_property(Property::new(key.clone(), value));
    }
    (group.property_count() > 0).then_some(group)
}

#[derive(Debug, Clone)]
struct ImageContent {
    name: String,
    mime_type: Option<String>,
    buffer: Option<Arc<[u8]>>,
}

/// Per-attribute data of one primitive
struct AttributeData {
    elements: Vec<[f64; 4]>,
    component_type: ComponentType,
}

struct GltfDecoder<'d, 'c, 'a> {
    document: &'d Document,
    buffers: Vec<Arc<[u8]>>,
    ctx: &'c mut ImportContext<'a>,
    images: HashMap<usize, ImageContent>,
}

impl GltfDecoder<'_, '_, '_> {
    fn import_model(&mut self) -> Result<()> {
        let document = self.document;
        for material in &document.materials {
            self.import_material(material)?;
        }
        for mesh in &document.meshes {
            self.import_mesh(mesh)?;
        }

        let asset = Value::Object(document.asset.clone());
        if let Some(group) = property_group("Asset properties", Some(&asset)) {
            self.ctx.model.add_property_group(group);
        }
        self.import_scene()?;

        debug!(
            meshes = self.ctx.model.mesh_count(),
            materials = self.ctx.model.material_count(),
            nodes = self.ctx.model.node_count(),
            "gltf model"
        );
        Ok(())
    }

    fn import_material(&mut self, gltf_material: &document::Material) -> Result<()> {
        let mut material = Material::physical();
        material.name = gltf_material.name.clone().unwrap_or_default();
        material.color = srgb_color(&[1.0, 1.0, 1.0]);

        if let Some(emissive) = &gltf_material.emissive_factor {
            material.emissive = srgb_color(emissive);
        }
        material.normal_map = self.texture(gltf_material.normal_texture.as_ref())?;
        material.emissive_map = self.texture(gltf_material.emissive_texture.as_ref())?;

        if let Some(pbr) = &gltf_material.pbr_metallic_roughness {
            if let Some(base_color) = &pbr.base_color_factor {
                material.color = srgb_color(base_color);
                material.opacity = base_color[3];
            }
            material.diffuse_map = self.texture(pbr.base_color_texture.as_ref())?;
            material.multiply_diffuse_map = material.diffuse_map.is_some();
            material.kind = MaterialKind::Physical {
                metalness: pbr.metallic_factor.unwrap_or(0.0),
                roughness: pbr.roughness_factor.unwrap_or(1.0),
                metalness_map: self.texture(pbr.metallic_roughness_texture.as_ref())?,
            };
        }

        match gltf_material.alpha_mode.as_deref() {
            Some("BLEND") => material.transparent = true,
            Some("MASK") => {
                material.transparent = true;
                material.alpha_test = gltf_material.alpha_cutoff.unwrap_or(0.5);
            }
            _ => {}
        }

        if let Some(specular_glossiness) = &gltf_material.extensions.specular_glossiness {
            let mut phong = Material::phong();
            phong.name = material.name.clone();
            if let Some(diffuse) = &specular_glossiness.diffuse_factor {
                phong.color = srgb_color(diffuse);
                phong.opacity = diffuse[3];
            }
            phong.diffuse_map = self.texture(specular_glossiness.diffuse_texture.as_ref())?;
            let specular = specular_glossiness
                .specular_factor
                .as_ref()
                .map(|factor| srgb_color(factor))
                .unwrap_or_default();
            let shininess = specular_glossiness.glossiness_factor.unwrap_or(0.0);
            phong.kind = MaterialKind::Phong {
                ambient: RGBColor::default(),
                specular,
                shininess,
                specular_map: self
                    .texture(specular_glossiness.specular_glossiness_texture.as_ref())?,
            };
            material = phong;
        }

        self.ctx.model.add_material(material);
        Ok(())
    }

    fn texture(&mut self, info: Option<&TextureInfo>) -> Result<Option<TextureMap>> {
        let Some(info) = info else {
            return Ok(None);
        };
        let document = self.document;
        let texture = lookup(&document.textures, info.index, "texture")?;
        let Some(source) = texture.source else {
            return Ok(None);
        };
        let image = self.image_content(source)?;

        let mut texture_map = TextureMap::new(image.name);
        texture_map.mime_type = image.mime_type;
        texture_map.buffer = image.buffer;
        if let Some(transform) = &info.extensions.texture_transform {
            if let Some([x, y]) = transform.offset {
                texture_map.offset = Coord2D::new(x, -y);
            }
            if let Some([x, y]) = transform.scale {
                texture_map.scale = Coord2D::new(x, y);
            }
            if let Some(rotation) = transform.rotation {
                texture_map.rotation = -rotation;
            }
        }
        Ok(Some(texture_map))
    }

    /// Image content, resolved once per image index
    fn image_content(&mut self, index: usize) -> Result<ImageContent> {
        if let Some(content) = self.images.get(&index) {
            return Ok(content.clone());
        }
        let document = self.document;
        let image = lookup(&document.images, index, "image")?;
        let content = if let Some(uri) = &image.uri {
            match base64_data_uri_to_buffer(uri) {
                Some(data_uri) => ImageContent {
                    name: format!(
                        "Embedded_{}.{}",
                        index,
                        file_extension_from_mime_type(&data_uri.mime_type)
                    ),
                    mime_type: Some(data_uri.mime_type),
                    buffer: Some(Arc::from(data_uri.buffer)),
                },
                None => ImageContent {
                    name: uri.clone(),
                    mime_type: None,
                    buffer: self.ctx.get_file_buffer(uri),
                },
            }
        } else if let Some(view_index) = image.buffer_view {
            let mime_type = image.mime_type.clone().unwrap_or_default();
            ImageContent {
                name: format!("Binary_{}.{}", index, file_extension_from_mime_type(&mime_type)),
                buffer: Some(Arc::from(self.buffer_view_bytes(view_index)?)),
                mime_type: Some(mime_type),
            }
        } else {
            ImageContent {
                name: String::new(),
                mime_type: None,
                buffer: None,
            }
        };
        self.images.insert(index, content.clone());
        Ok(content)
    }

    fn buffer_view_bytes(&self, index: usize) -> Result<&[u8]> {
        let view = lookup(&self.document.buffer_views, index, "buffer view")?;
        let buffer = lookup(&self.buffers, view.buffer, "buffer")?;
        let end = view.byte_offset.saturating_add(view.byte_length);
        buffer
            .get(view.byte_offset..end)
            .ok_or_else(|| Error::truncated(view.byte_length, view.byte_offset, buffer.len()))
    }

    fn accessor_reader(&self, index: usize) -> Result<AccessorReader<'_>> {
        let accessor = lookup(&self.document.accessors, index, "accessor")?;
        let value_type = component_type(accessor.component_type)?;
        let accessor_type = AccessorType::from_name(&accessor.accessor_type).ok_or_else(|| {
            Error::invalid_format_context(
                "glTF accessor",
                &format!("unsupported type {}", accessor.accessor_type),
            )
        })?;
        let layout = AccessorLayout::packed(value_type, accessor_type, accessor.count);

        let reader = match accessor.buffer_view {
            Some(view_index) => {
                let (buffer, view_offset, stride) = self.view_buffer(view_index)?;
                let layout = layout
                    .with_byte_offset(view_offset + accessor.byte_offset)
                    .with_byte_stride(stride);
                AccessorReader::new(buffer, layout)
            }
            None => AccessorReader::zeroed(layout),
        };

        let Some(sparse) = &accessor.sparse else {
            return Ok(reader);
        };
        let (index_buffer, index_view_offset, _) = self.view_buffer(sparse.indices.buffer_view)?;
        let indices = AccessorReader::new(
            index_buffer,
            AccessorLayout::packed(
                component_type(sparse.indices.component_type)?,
                AccessorType::Scalar,
                sparse.count,
            )
            .with_byte_offset(index_view_offset + sparse.indices.byte_offset),
        );
        let (value_buffer, value_view_offset, _) = self.view_buffer(sparse.values.buffer_view)?;
        let values = AccessorReader::new(
            value_buffer,
            AccessorLayout::packed(value_type, accessor_type, sparse.count)
                .with_byte_offset(value_view_offset + sparse.values.byte_offset),
        );
        Ok(reader.with_sparse(indices, values))
    }

    /// Whole buffer behind a view, with the view offset and stride
    fn view_buffer(&self, index: usize) -> Result<(&[u8], usize, usize)> {
        let view = lookup(&self.document.buffer_views, index, "buffer view")?;
        let buffer = lookup(&self.buffers, view.buffer, "buffer")?;
        Ok((&buffer[..], view.byte_offset, view.byte_stride.unwrap_or(0)))
    }

    /// Elements of a primitive attribute; `None` if absent or empty
    fn attribute(
        &self,
        primitive: &document::Primitive,
        name: &str,
    ) -> Result<Option<AttributeData>> {
        let Some(&index) = primitive.attributes.get(name) else {
            return Ok(None);
        };
        let reader = self.accessor_reader(index)?;
        if reader.count() == 0 {
            return Ok(None);
        }
        Ok(Some(AttributeData {
            component_type: reader.layout().component_type,
            elements: reader.read_elements()?,
        }))
    }

    fn import_mesh(&mut self, gltf_mesh: &document::Mesh) -> Result<()> {
        let mut mesh = Mesh::with_name(gltf_mesh.name.clone().unwrap_or_default());
        for primitive in &gltf_mesh.primitives {
            self.import_primitive(primitive, &mut mesh)?;
        }
        if let Some(group) = property_group("Mesh properties", gltf_mesh.extras.as_ref()) {
            mesh.add_property_group(group);
        }
        self.ctx.model.add_mesh(mesh);
        Ok(())
    }

    fn import_primitive(&self, primitive: &document::Primitive, mesh: &mut Mesh) -> Result<()> {
        if primitive.extensions.contains_key(DRACO_EXTENSION) {
            warn!(mesh = %mesh.name, "draco compressed primitive produces no geometry");
            return Ok(());
        }
        let mode = primitive.mode.unwrap_or(MODE_TRIANGLES);
        if !matches!(mode, MODE_TRIANGLES | MODE_TRIANGLE_STRIP | MODE_TRIANGLE_FAN) {
            debug!(mode, "skipping point or line primitive");
            return Ok(());
        }
        let Some(positions) = self.attribute(primitive, "POSITION")? else {
            return Ok(());
        };
        let vertex_count = positions.elements.len();
        let vertex_offset = mesh.vertex_count();
        let color_offset = mesh.vertex_color_count();
        let normal_offset = mesh.normal_count();
        let uv_offset = mesh.texture_uv_count();

        for [x, y, z, _] in positions.elements {
            mesh.add_vertex(Coord3D::new(x, y, z));
        }

        let colors = self
            .attribute(primitive, "COLOR_0")?
            .filter(|colors| colors.elements.len() == vertex_count);
        let has_colors = colors.is_some();
        if let Some(colors) = colors {
            for element in &colors.elements {
                mesh.add_vertex_color(vertex_color(element, colors.component_type));
            }
        }

        let normals = self
            .attribute(primitive, "NORMAL")?
            .filter(|normals| normals.elements.len() == vertex_count);
        let has_normals = normals.is_some();
        for [x, y, z, _] in normals.map(|n| n.elements).unwrap_or_default() {
            mesh.add_normal(Coord3D::new(x, y, z));
        }

        let uvs = self
            .attribute(primitive, "TEXCOORD_0")?
            .filter(|uvs| uvs.elements.len() == vertex_count);
        let has_uvs = uvs.is_some();
        for [u, v, _, _] in uvs.map(|uvs| uvs.elements).unwrap_or_default() {
            mesh.add_texture_uv(Coord2D::new(u, -v));
        }

        let indices: Vec<usize> = match primitive.indices {
            Some(index) => self
                .accessor_reader(index)?
                .read_scalars()?
                .into_iter()
                .map(|value| vertex_index(value, vertex_count))
                .collect::<Result<_>>()?,
            None => (0..vertex_count).collect(),
        };

        let triangles = match mode {
            MODE_TRIANGLE_STRIP => strip_triangles(&indices),
            MODE_TRIANGLE_FAN => fan_triangles(&indices),
            _ => list_triangles(&indices),
        };
        let material = primitive
            .material
            .filter(|material| *material < self.ctx.model.material_count());

        for [v0, v1, v2] in triangles {
            let mut triangle =
                Triangle::new(vertex_offset + v0, vertex_offset + v1, vertex_offset + v2);
            if has_colors {
                triangle.set_vertex_colors(color_offset + v0, color_offset + v1, color_offset + v2);
            }
            if has_normals {
                triangle.set_normals(normal_offset + v0, normal_offset + v1, normal_offset + v2);
            }
            if has_uvs {
                triangle.set_texture_uvs(uv_offset + v0, uv_offset + v1, uv_offset + v2);
            }
            if let Some(material) = material {
                triangle.set_material(material);
            }
            mesh.add_triangle(triangle);
        }
        Ok(())
    }

    fn import_scene(&mut self) -> Result<()> {
        let document = self.document;
        let Some(scene) = document.scenes.get(document.scene.unwrap_or(0)) else {
            return Ok(());
        };
        let root = self.ctx.model.root();
        let mut ancestors = Vec::new();
        for &node_index in &scene.nodes {
            self.import_node(node_index, root, &mut ancestors)?;
        }
        if let Some(group) = property_group("Scene properties", scene.extras.as_ref()) {
            self.ctx.model.add_property_group(group);
        }
        Ok(())
    }

    fn import_node(
        &mut self,
        index: usize,
        parent: NodeHandle,
        ancestors: &mut Vec<usize>,
    ) -> Result<()> {
        if ancestors.contains(&index) {
            warn!(node = index, "gltf node hierarchy contains a cycle");
            return Ok(());
        }
        let document = self.document;
        let gltf_node = lookup(&document.nodes, index, "node")?;
        if gltf_node.children.is_none() && gltf_node.mesh.is_none() {
            return Ok(());
        }

        let transformation = node_transformation(gltf_node)?;
        let model = &mut self.ctx.model;
        let handle = model.nodes.add_new_child(parent);
        let node = model.nodes.get_mut(handle);
        node.name = gltf_node.name.clone().unwrap_or_default();
        node.transformation = transformation;

        ancestors.push(index);
        for &child in gltf_node.children.iter().flatten() {
            self.import_node(child, handle, ancestors)?;
        }
        ancestors.pop();

        if let Some(mesh_index) = gltf_node.mesh {
            let model = &mut self.ctx.model;
            let mesh = model.meshes.get_mut(mesh_index).ok_or_else(|| {
                let message = format!("mesh {} does not exist", mesh_index);
                Error::invalid_format_context("glTF", &message)
            })?;
            if let Some(group) = property_group("Node properties", gltf_node.extras.as_ref()) {
                mesh.add_property_group(group);
            }
            model.nodes.get_mut(handle).add_mesh_index(mesh_index);
        }
        Ok(())
    }
}

fn component_type(code: u32) -> Result<ComponentType> {
    ComponentType::from_code(code).ok_or_else(|| {
        Error::invalid_format_context("glTF accessor", &format!("unknown component type {}", code))
    })
}

/// Explicit matrix, or translation, rotation and scale with identity defaults
fn node_transformation(node: &document::Node) -> Result<Transformation> {
    let matrix = match &node.matrix {
        Some(values) => Matrix::from_slice(values).ok_or_else(|| {
            Error::invalid_format_context("glTF node", "matrix must have 16 elements")
        })?,
        None => {
            let [tx, ty, tz] = node.translation.unwrap_or([0.0; 3]);
            let rotation = node
                .rotation
                .map_or_else(Quaternion::identity, |[x, y, z, w]| Quaternion::new(x, y, z, w));
            let [sx, sy, sz] = node.scale.unwrap_or([1.0; 3]);
            Matrix::compose_trs(Coord3D::new(tx, ty, tz), rotation, Coord3D::new(sx, sy, sz))
        }
    };
    Ok(Transformation::from_matrix(matrix))
}
