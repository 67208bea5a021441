//! STL decoder (binary and ASCII)

use super::{ImportContext, Importer};
use crate::error::Result;
use crate::geometry::{Coord3D, Direction, is_positive};
use crate::io::{
    BinaryReader, name_from_line, parameters_from_line, parse_number, read_lines,
    utf8_string_from_bytes,
};
use crate::model::{Mesh, Triangle};
use tracing::{debug, warn};

const HEADER_SIZE: usize = 80;
const TRIANGLE_RECORD_SIZE: usize = 50;

/// Decoder for `.stl` files
///
/// A buffer is binary STL if and only if its length equals
/// `80 + 4 + count * 50`, where `count` is the little-endian triangle count
/// stored after the 80-byte header. Everything else is parsed as ASCII.
#[derive(Debug, Clone, Copy, Default)]
pub struct StlImporter;

impl StlImporter {
    /// Create a new STL decoder
    pub fn new() -> Self {
        Self
    }
}

impl Importer for StlImporter {
    fn name(&self) -> &str {
        "stl"
    }

    fn can_import_extension(&self, extension: &str) -> bool {
        extension == "stl"
    }

    fn up_direction(&self) -> Direction {
        Direction::Z
    }

    fn import_content(&self, content: &[u8], ctx: &mut ImportContext<'_>) -> Result<()> {
        let mesh = if is_binary_stl(content) {
            debug!("binary stl");
            read_binary(content)?
        } else {
            debug!("ascii stl");
            read_ascii(&utf8_string_from_bytes(content))?
        };
        ctx.model.add_mesh_to_root_node(mesh);
        Ok(())
    }
}

/// Returns true if the buffer length matches the binary layout exactly
pub fn is_binary_stl(content: &[u8]) -> bool {
    let mut reader = BinaryReader::little_endian(content);
    if reader.skip(HEADER_SIZE).is_err() {
        return false;
    }
    let Ok(triangle_count) = reader.read_u32() else {
        return false;
    };
    (triangle_count as usize)
        .checked_mul(TRIANGLE_RECORD_SIZE)
        .and_then(|size| size.checked_add(HEADER_SIZE + 4))
        == Some(content.len())
}

fn read_binary(content: &[u8]) -> Result<Mesh> {
    let mut reader = BinaryReader::little_endian(content);
    reader.skip(HEADER_SIZE)?;
    let triangle_count = reader.read_u32()? as usize;

    let mut mesh = Mesh::with_capacity(triangle_count * 3, triangle_count);
    for _ in 0..triangle_count {
        let normal = coord_from_array(reader.read_f32_triple()?);
        let v0 = mesh.add_vertex(coord_from_array(reader.read_f32_triple()?));
        let v1 = mesh.add_vertex(coord_from_array(reader.read_f32_triple()?));
        let v2 = mesh.add_vertex(coord_from_array(reader.read_f32_triple()?));
        // attribute byte count
        reader.skip(2)?;

        let mut triangle = Triangle::new(v0, v1, v2);
        if is_positive(normal.length()) {
            let n = mesh.add_normal(normal);
            triangle.set_normals(n, n, n);
        }
        mesh.add_triangle(triangle);
    }
    Ok(mesh)
}

fn coord_from_array(values: [f64; 3]) -> Coord3D {
    Coord3D::new(values[0], values[1], values[2])
}

/// A facet between `facet` and `endfacet`
#[derive(Debug, Default)]
struct PendingFacet {
    normal: Option<Coord3D>,
    vertices: Vec<Coord3D>,
}

fn read_ascii(text: &str) -> Result<Mesh> {
    let mut mesh = Mesh::new();
    let mut facet: Option<PendingFacet> = None;
    let mut dropped = 0usize;
    let mut result = Ok(());

    read_lines(text, |line| {
        if result.is_err() || line.starts_with('#') {
            return;
        }
        result = process_line(line, &mut mesh, &mut facet, &mut dropped);
    });
    result?;

    if dropped > 0 {
        warn!(dropped, "dropped stl facets with fewer than three vertices");
    }
    Ok(mesh)
}

fn process_line(
    line: &str,
    mesh: &mut Mesh,
    facet: &mut Option<PendingFacet>,
    dropped: &mut usize,
) -> Result<()> {
    let parameters = parameters_from_line(line, Some('#'));
    let Some(&keyword) = parameters.first() else {
        return Ok(());
    };

    match keyword {
        "solid" => {
            if parameters.len() > 1 {
                mesh.name = name_from_line(line, keyword.len(), '#').to_string();
            }
        }
        "facet" => {
            let mut pending = PendingFacet::default();
            if parameters.len() >= 5 && parameters[1] == "normal" {
                let normal = parse_coord(&parameters[2..5], "facet normal")?;
                if is_positive(normal.length()) {
                    pending.normal = Some(normal);
                }
            }
            *facet = Some(pending);
        }
        "vertex" => {
            if let Some(pending) = facet.as_mut() {
                if parameters.len() >= 4 && pending.vertices.len() < 3 {
                    pending.vertices.push(parse_coord(&parameters[1..4], "vertex")?);
                }
            }
        }
        "endfacet" => {
            if let Some(pending) = facet.take() {
                add_facet(mesh, pending, dropped);
            }
        }
        _ => {}
    }
    Ok(())
}

fn add_facet(mesh: &mut Mesh, facet: PendingFacet, dropped: &mut usize) {
    if facet.vertices.len() < 3 {
        *dropped += 1;
        return;
    }
    let v0 = mesh.add_vertex(facet.vertices[0]);
    let v1 = mesh.add_vertex(facet.vertices[1]);
    let v2 = mesh.add_vertex(facet.vertices[2]);
    let mut triangle = Triangle::new(v0, v1, v2);
    if let Some(normal) = facet.normal {
        let n = mesh.add_normal(normal);
        triangle.set_normals(n, n, n);
    }
    mesh.add_triangle(triangle);
}

fn parse_coord(values: &[&str], what: &str) -> Result<Coord3D> {
    Ok(Coord3D::new(
        parse_number(values[0], what)?,
        parse_number(values[1], what)?,
        parse_number(values[2], what)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::importer::{ImportDriver, NoFileAccess};
    use crate::model::Model;

    fn import(content: &[u8]) -> Result<Model> {
        ImportDriver::default().import(&StlImporter::new(), content, "stl", &mut NoFileAccess)
    }

    fn binary_stl(triangles: &[[[f32; 3]; 4]]) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_SIZE];
        data.extend_from_slice(&(triangles.len() as u32).to_le_bytes());
        for triangle in triangles {
            for vector in triangle {
                for value in vector {
                    data.extend_from_slice(&value.to_le_bytes());
                }
            }
            data.extend_from_slice(&[0, 0]);
        }
        data
    }

    #[test]
    fn test_binary_detection() {
        let data = binary_stl(&[[[0.0, 0.0, 1.0], [0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]]);
        assert_eq!(data.len(), 134);
        assert!(is_binary_stl(&data));
        assert!(!is_binary_stl(&data[..133]));
        assert!(!is_binary_stl(&data[..83]));
        assert!(!is_binary_stl(b"solid a\nendsolid a\n"));
    }

    #[test]
    fn test_binary_import() {
        let data = binary_stl(&[
            [[0.0, 0.0, 1.0], [0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
        ]);
        let model = import(&data).unwrap();
        let mesh = &model.meshes[0];
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.triangle_count(), 2);
        // the zero normal of the second facet is replaced by a computed one
        assert_eq!(mesh.normal_count(), 2);
        assert_eq!(mesh.normals[1], Coord3D::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_ascii_import() {
        let text = "solid my part\n\
                    facet normal 0 0 1\n outer loop\n\
                    vertex 0 0 0\n vertex 1 0 0\n vertex 0 1 0\n\
                    endloop\nendfacet\n\
                    facet normal 0 0 1\n outer loop\n\
                    vertex 0 0 0\n vertex 1 0 0\n\
                    endloop\nendfacet\n\
                    endsolid my part\n";
        let model = import(text.as_bytes()).unwrap();
        let mesh = &model.meshes[0];
        assert_eq!(mesh.name, "my part");
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangles[0].normals, Some([0, 0, 0]));
    }

    #[test]
    fn test_ascii_bad_number() {
        let text = "solid\nfacet normal 0 0 1\nvertex a 0 0\nendfacet\n";
        assert!(matches!(import(text.as_bytes()), Err(Error::ParseError(_))));
    }

    #[test]
    fn test_empty_solid_is_empty_model() {
        let err = import(b"solid empty\nendsolid empty\n").unwrap_err();
        assert!(matches!(err, Error::EmptyModel));
    }
}
