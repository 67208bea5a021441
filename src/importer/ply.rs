//! Polygon File Format (PLY) decoder
//!
//! The ASCII header declares the payload format and a list of elements, each
//! with an ordered list of scalar or list properties. The payload is read
//! strictly in declaration order, since that order (not the property names)
//! defines the layout. ASCII and binary payloads share one element reader
//! through the [`ValueSource`] trait.

use super::topology::{fan_triangles, restarting_strip_triangles};
use super::{ImportContext, Importer};
use crate::error::{Error, Result};
use crate::geometry::{Coord3D, Direction};
use crate::io::{BinaryReader, Endianness, parameters_from_line, read_lines};
use crate::model::{
    Material, Mesh, Model, RGBAColor, RGBColor, Triangle, color_component_from_float,
};
use std::collections::HashMap;
use tracing::{debug, warn};

const END_HEADER: &[u8] = b"end_header";

/// Decoder for `.ply` files
#[derive(Debug, Clone, Copy, Default)]
pub struct PlyImporter;

impl PlyImporter {
    /// Create a new PLY decoder
    pub fn new() -> Self {
        Self
    }
}

impl Importer for PlyImporter {
    fn name(&self) -> &str {
        "ply"
    }

    fn can_import_extension(&self, extension: &str) -> bool {
        extension == "ply"
    }

    fn up_direction(&self) -> Direction {
        Direction::Y
    }

    fn import_content(&self, content: &[u8], ctx: &mut ImportContext<'_>) -> Result<()> {
        let header_length = header_length(content).ok_or(Error::InvalidHeader)?;
        let header = PlyHeader::parse(&String::from_utf8_lossy(&content[..header_length]))?;
        header.check()?;
        debug!(format = ?header.format, elements = header.elements.len(), "ply header");

        let payload = &content[header_length..];
        let mut decoder = PlyDecoder::new(&mut ctx.model);
        match header.format {
            PlyFormat::Ascii => {
                let text = String::from_utf8_lossy(payload);
                let mut source = AsciiSource {
                    tokens: text.split_whitespace(),
                };
                decoder.read_elements(&header, &mut source)?;
            }
            PlyFormat::BinaryLittleEndian | PlyFormat::BinaryBigEndian => {
                let endianness = if header.format == PlyFormat::BinaryLittleEndian {
                    Endianness::Little
                } else {
                    Endianness::Big
                };
                let mut source = BinarySource {
                    reader: BinaryReader::new(payload, endianness),
                };
                decoder.read_elements(&header, &mut source)?;
            }
        }
        let mesh = decoder.finish()?;
        ctx.model.add_mesh_to_root_node(mesh);
        Ok(())
    }
}

/// Length of the header: everything up to `end_header` and the line break after it
fn header_length(content: &[u8]) -> Option<usize> {
    let end = content
        .windows(END_HEADER.len())
        .position(|window| window == END_HEADER)?
        + END_HEADER.len();
    let line_end = content[end..]
        .iter()
        .position(|byte| *byte == b'\n')
        .map_or(content.len(), |offset| end + offset + 1);
    Some(line_end)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlyFormat {
    Ascii,
    BinaryLittleEndian,
    BinaryBigEndian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScalarType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float32,
    Float64,
}

impl ScalarType {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "char" | "int8" => ScalarType::Int8,
            "uchar" | "uint8" => ScalarType::UInt8,
            "short" | "int16" => ScalarType::Int16,
            "ushort" | "uint16" => ScalarType::UInt16,
            "int" | "int32" => ScalarType::Int32,
            "uint" | "uint32" => ScalarType::UInt32,
            "float" | "float32" => ScalarType::Float32,
            "double" | "float64" | "double64" => ScalarType::Float64,
            _ => return None,
        })
    }

    fn is_float(self) -> bool {
        matches!(self, ScalarType::Float32 | ScalarType::Float64)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum PlyProperty {
    Scalar {
        name: String,
        value_type: ScalarType,
    },
    List {
        name: String,
        count_type: ScalarType,
        item_type: ScalarType,
    },
}

impl PlyProperty {
    fn name(&self) -> &str {
        match self {
            PlyProperty::Scalar { name, .. } | PlyProperty::List { name, .. } => name,
        }
    }

    fn is_list(&self) -> bool {
        matches!(self, PlyProperty::List { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
struct PlyElement {
    name: String,
    count: usize,
    properties: Vec<PlyProperty>,
}

impl PlyElement {
    fn has_list(&self) -> bool {
        self.properties.iter().any(PlyProperty::is_list)
    }

    /// Position of the index list: `vertex_indices`/`vertex_index` when
    /// present, otherwise the first list property
    fn index_list(&self) -> Option<usize> {
        self.properties
            .iter()
            .position(|p| {
                p.is_list() && matches!(p.name(), "vertex_indices" | "vertex_index")
            })
            .or_else(|| self.properties.iter().position(PlyProperty::is_list))
    }
}

#[derive(Debug, Clone)]
struct PlyHeader {
    format: PlyFormat,
    elements: Vec<PlyElement>,
}

impl PlyHeader {
    fn parse(text: &str) -> Result<Self> {
        let mut format_name: Option<String> = None;
        let mut elements: Vec<PlyElement> = Vec::new();
        let mut result = Ok(());

        read_lines(text, |line| {
            if result.is_err() {
                return;
            }
            let parameters = parameters_from_line(line, None);
            match parameters.as_slice() {
                ["format", format, ..] => format_name = Some(format.to_string()),
                ["element", name, count, ..] => match count.parse::<usize>() {
                    Ok(count) => elements.push(PlyElement {
                        name: name.to_string(),
                        count,
                        properties: Vec::new(),
                    }),
                    Err(_) => result = Err(Error::InvalidHeader),
                },
                ["property", "list", count_type, item_type, name, ..] => {
                    let property = ScalarType::from_name(count_type)
                        .zip(ScalarType::from_name(item_type))
                        .map(|(count_type, item_type)| PlyProperty::List {
                            name: name.to_string(),
                            count_type,
                            item_type,
                        });
                    result = add_property(&mut elements, property);
                }
                ["property", value_type, name, ..] if *value_type != "list" => {
                    let property =
                        ScalarType::from_name(value_type).map(|value_type| PlyProperty::Scalar {
                            name: name.to_string(),
                            value_type,
                        });
                    result = add_property(&mut elements, property);
                }
                _ => {}
            }
        });
        result?;

        let format = match format_name.as_deref() {
            Some("ascii") => PlyFormat::Ascii,
            Some("binary_little_endian") => PlyFormat::BinaryLittleEndian,
            Some("binary_big_endian") => PlyFormat::BinaryBigEndian,
            _ => return Err(Error::InvalidHeader),
        };
        Ok(Self { format, elements })
    }

    fn element(&self, name: &str) -> Option<&PlyElement> {
        self.elements.iter().find(|e| e.name == name)
    }

    /// Require a vertex element with x, y, z and a face or tristrips element
    fn check(&self) -> Result<()> {
        let has_vertices = self.element("vertex").is_some_and(|vertex| {
            vertex.properties.len() >= 3 && vertex.properties[..3].iter().all(|p| !p.is_list())
        });
        if !has_vertices {
            return Err(Error::NoVertices);
        }
        let has_polygons = ["face", "tristrips"].iter().any(|name| {
            self.element(name)
                .is_some_and(|element| element.count > 0 && element.has_list())
        });
        if !has_polygons {
            return Err(Error::NoFaces);
        }
        Ok(())
    }
}

fn add_property(elements: &mut [PlyElement], property: Option<PlyProperty>) -> Result<()> {
    let element = elements.last_mut().ok_or(Error::InvalidHeader)?;
    element.properties.push(property.ok_or(Error::InvalidHeader)?);
    Ok(())
}

/// Typed value reads shared by ASCII and binary payloads
trait ValueSource {
    fn read_value(&mut self, value_type: ScalarType) -> Result<f64>;
}

struct BinarySource<'a> {
    reader: BinaryReader<'a>,
}

impl ValueSource for BinarySource<'_> {
    fn read_value(&mut self, value_type: ScalarType) -> Result<f64> {
        let reader = &mut self.reader;
        Ok(match value_type {
            ScalarType::Int8 => reader.read_i8()? as f64,
            ScalarType::UInt8 => reader.read_u8()? as f64,
            ScalarType::Int16 => reader.read_i16()? as f64,
            ScalarType::UInt16 => reader.read_u16()? as f64,
            ScalarType::Int32 => reader.read_i32()? as f64,
            ScalarType::UInt32 => reader.read_u32()? as f64,
            ScalarType::Float32 => reader.read_f32()? as f64,
            ScalarType::Float64 => reader.read_f64()?,
        })
    }
}

struct AsciiSource<'a> {
    tokens: std::str::SplitWhitespace<'a>,
}

impl ValueSource for AsciiSource<'_> {
    fn read_value(&mut self, _value_type: ScalarType) -> Result<f64> {
        let token = self.tokens.next().ok_or_else(|| {
            Error::invalid_format_context("PLY data", "unexpected end of ascii content")
        })?;
        token
            .parse::<f64>()
            .map_err(|_| Error::parse_error_with_context("PLY property", token, "number"))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum PlyValue {
    Scalar(f64),
    List(Vec<f64>),
}

fn read_property(source: &mut dyn ValueSource, property: &PlyProperty) -> Result<PlyValue> {
    match property {
        PlyProperty::Scalar { value_type, .. } => {
            Ok(PlyValue::Scalar(source.read_value(*value_type)?))
        }
        PlyProperty::List {
            count_type,
            item_type,
            ..
        } => {
            let count = source.read_value(*count_type)?;
            if !(count >= 0.0) {
                return Err(Error::invalid_format_context(
                    "PLY data",
                    &format!("negative list length {}", count),
                ));
            }
            let count = count as usize;
            let mut items = Vec::with_capacity(count.min(1024));
            for _ in 0..count {
                items.push(source.read_value(*item_type)?);
            }
            Ok(PlyValue::List(items))
        }
    }
}

/// Color channel from a property value; float channels are in `0.0..=1.0`
fn color_channel(value: f64, value_type: ScalarType) -> u8 {
    if value_type.is_float() {
        color_component_from_float(value)
    } else {
        value.clamp(0.0, 255.0) as u8
    }
}

/// Collects `red`/`green`/`blue`/`alpha` properties of one element item
#[derive(Debug, Default)]
struct ColorChannels {
    r: Option<u8>,
    g: Option<u8>,
    b: Option<u8>,
    a: Option<u8>,
}

impl ColorChannels {
    fn set(&mut self, property: &PlyProperty, value: &PlyValue) {
        let (PlyProperty::Scalar { name, value_type }, PlyValue::Scalar(value)) = (property, value)
        else {
            return;
        };
        let channel = Some(color_channel(*value, *value_type));
        match name.as_str() {
            "red" => self.r = channel,
            "green" => self.g = channel,
            "blue" => self.b = channel,
            "alpha" => self.a = channel,
            _ => {}
        }
    }

    fn color(&self) -> Option<RGBAColor> {
        Some(RGBAColor::new(self.r?, self.g?, self.b?, self.a.unwrap_or(255)))
    }
}

struct PlyDecoder<'m> {
    model: &'m mut Model,
    mesh: Mesh,
    material_by_color: HashMap<RGBAColor, usize>,
}

impl<'m> PlyDecoder<'m> {
    fn new(model: &'m mut Model) -> Self {
        Self {
            model,
            mesh: Mesh::new(),
            material_by_color: HashMap::new(),
        }
    }

    fn read_elements(&mut self, header: &PlyHeader, source: &mut dyn ValueSource) -> Result<()> {
        for element in &header.elements {
            match element.name.as_str() {
                "vertex" => self.read_vertices(element, source)?,
                "face" => self.read_faces(element, source)?,
                "tristrips" => self.read_tristrips(element, source)?,
                _ => {
                    warn!(element = %element.name, count = element.count, "skipping ply element");
                    skip_element(element, source)?;
                }
            }
        }
        Ok(())
    }

    fn read_vertices(&mut self, element: &PlyElement, source: &mut dyn ValueSource) -> Result<()> {
        for _ in 0..element.count {
            let mut position = [0.0; 3];
            let mut colors = ColorChannels::default();
            for (index, property) in element.properties.iter().enumerate() {
                let value = read_property(source, property)?;
                match (index, &value) {
                    (0..=2, PlyValue::Scalar(v)) => position[index] = *v,
                    _ => colors.set(property, &value),
                }
            }
            if let Some(color) = colors.color() {
                self.mesh.add_vertex_color(color.rgb());
            }
            self.mesh
                .add_vertex(Coord3D::new(position[0], position[1], position[2]));
        }
        Ok(())
    }

    fn read_faces(&mut self, element: &PlyElement, source: &mut dyn ValueSource) -> Result<()> {
        let index_list = element.index_list();
        for _ in 0..element.count {
            let mut indices = Vec::new();
            let mut colors = ColorChannels::default();
            for (index, property) in element.properties.iter().enumerate() {
                let value = read_property(source, property)?;
                match value {
                    PlyValue::List(values) if Some(index) == index_list => {
                        indices = to_vertex_indices(&values)?;
                    }
                    value => colors.set(property, &value),
                }
            }
            let material = colors.color().map(|color| self.material_for_color(color));
            for [v0, v1, v2] in fan_triangles(&indices) {
                let mut triangle = Triangle::new(v0, v1, v2);
                if let Some(material) = material {
                    triangle.set_material(material);
                }
                self.mesh.add_triangle(triangle);
            }
        }
        Ok(())
    }

    fn read_tristrips(&mut self, element: &PlyElement, source: &mut dyn ValueSource) -> Result<()> {
        let index_list = element.index_list();
        for _ in 0..element.count {
            for (index, property) in element.properties.iter().enumerate() {
                let value = read_property(source, property)?;
                if let PlyValue::List(values) = value {
                    if Some(index) == index_list {
                        let strip: Vec<i64> = values.iter().map(|v| *v as i64).collect();
                        for [v0, v1, v2] in restarting_strip_triangles(&strip) {
                            self.mesh.add_triangle(Triangle::new(v0, v1, v2));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn material_for_color(&mut self, color: RGBAColor) -> usize {
        if let Some(&index) = self.material_by_color.get(&color) {
            return index;
        }
        let mut material = Material::phong();
        material.name = format!("Color {}", color.to_hex_string());
        material.color = RGBColor::new(color.r, color.g, color.b);
        material.opacity = color.a as f64 / 255.0;
        material.update_transparency();
        let index = self.model.add_material(material);
        self.material_by_color.insert(color, index);
        index
    }

    /// Validate indices and attach per-vertex colors to uncolored faces
    fn finish(mut self) -> Result<Mesh> {
        let vertex_count = self.mesh.vertex_count();
        let has_vertex_colors =
            vertex_count > 0 && self.mesh.vertex_color_count() == vertex_count;
        for triangle in &mut self.mesh.triangles {
            if triangle.vertices().iter().any(|v| *v >= vertex_count) {
                return Err(Error::InvalidVertexIndex);
            }
            if has_vertex_colors && triangle.mat.is_none() {
                let [v0, v1, v2] = triangle.vertices();
                triangle.set_vertex_colors(v0, v1, v2);
            }
        }
        if !has_vertex_colors && self.mesh.vertex_color_count() > 0 {
            warn!(
                colors = self.mesh.vertex_color_count(),
                vertices = vertex_count,
                "ply vertex colors do not cover every vertex, ignoring them"
            );
            self.mesh.vertex_colors.clear();
        }
        Ok(self.mesh)
    }
}

fn to_vertex_indices(values: &[f64]) -> Result<Vec<usize>> {
    values
        .iter()
        .map(|v| {
            if *v >= 0.0 {
                Ok(*v as usize)
            } else {
                Err(Error::InvalidVertexIndex)
            }
        })
        .collect()
}

fn skip_element(element: &PlyElement, source: &mut dyn ValueSource) -> Result<()> {
    for _ in 0..element.count {
        for property in &element.properties {
            read_property(source, property)?;
        }
    }
    Ok(())
}
