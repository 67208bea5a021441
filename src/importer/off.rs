//! Object File Format (OFF) decoder

use super::{ImportContext, Importer};
use crate::error::{Error, Result};
use crate::geometry::{Coord3D, Direction};
use crate::io::{
    parameters_from_line, parse_integer, parse_number, read_lines, utf8_string_from_bytes,
};
use crate::model::{Mesh, Triangle};

/// Decoder for `.off` files
///
/// The optional `OFF` keyword line is followed by a `vertices faces [edges]`
/// count line, the vertex coordinates and the polygons. Polygons are fan
/// triangulated; lines past the declared counts are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct OffImporter;

impl OffImporter {
    /// Create a new OFF decoder
    pub fn new() -> Self {
        Self
    }
}

impl Importer for OffImporter {
    fn name(&self) -> &str {
        "off"
    }

    fn can_import_extension(&self, extension: &str) -> bool {
        extension == "off"
    }

    fn up_direction(&self) -> Direction {
        Direction::Y
    }

    fn import_content(&self, content: &[u8], ctx: &mut ImportContext<'_>) -> Result<()> {
        let text = utf8_string_from_bytes(content);
        let mut state = OffState::default();
        let mut result = Ok(());
        read_lines(&text, |line| {
            if result.is_ok() {
                result = state.process_line(line);
            }
        });
        result?;
        ctx.model.add_mesh_to_root_node(state.mesh);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct OffState {
    mesh: Mesh,
    counts: Option<(usize, usize)>,
    found_faces: usize,
}

impl OffState {
    fn process_line(&mut self, line: &str) -> Result<()> {
        if line.starts_with('#') {
            return Ok(());
        }
        let parameters = parameters_from_line(line, Some('#'));
        if parameters.is_empty() || parameters[0] == "OFF" {
            return Ok(());
        }

        let Some((vertex_count, face_count)) = self.counts else {
            if parameters.len() > 1 {
                self.counts = Some((
                    parse_count(parameters[0])?,
                    parse_count(parameters[1])?,
                ));
            }
            return Ok(());
        };

        if self.mesh.vertex_count() < vertex_count {
            if parameters.len() >= 3 {
                self.mesh.add_vertex(Coord3D::new(
                    parse_number(parameters[0], "vertex x")?,
                    parse_number(parameters[1], "vertex y")?,
                    parse_number(parameters[2], "vertex z")?,
                ));
            }
            return Ok(());
        }

        if self.found_faces < face_count && parameters.len() >= 4 {
            let corner_count = parse_count(parameters[0])?;
            if parameters.len() < corner_count + 1 {
                return Ok(());
            }
            let corners = parameters[1..=corner_count]
                .iter()
                .map(|p| self.vertex_index(p))
                .collect::<Result<Vec<usize>>>()?;
            for i in 0..corner_count.saturating_sub(2) {
                self.mesh
                    .add_triangle(Triangle::new(corners[0], corners[i + 1], corners[i + 2]));
            }
            self.found_faces += 1;
        }
        Ok(())
    }

    fn vertex_index(&self, token: &str) -> Result<usize> {
        let index = parse_integer(token, "face vertex index")?;
        usize::try_from(index)
            .ok()
            .filter(|i| *i < self.mesh.vertex_count())
            .ok_or(Error::InvalidVertexIndex)
    }
}

fn parse_count(token: &str) -> Result<usize> {
    let count = parse_integer(token, "element count")?;
    usize::try_from(count).map_err(|_| {
        Error::parse_error_with_context("element count", token, "non-negative integer")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::{ImportDriver, NoFileAccess};
    use crate::model::Model;

    fn import(content: &str) -> Result<Model> {
        ImportDriver::default().import(
            &OffImporter::new(),
            content.as_bytes(),
            "off",
            &mut NoFileAccess,
        )
    }

    #[test]
    fn test_quad_is_fan_triangulated() {
        let content = "OFF\n# comment\n4 1 0\n0 0 0\n1 0 0\n1 1 0\n0 1 0\n4 0 1 2 3\n";
        let model = import(content).unwrap();
        let mesh = &model.meshes[0];
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.triangles[0].vertices(), [0, 1, 2]);
        assert_eq!(mesh.triangles[1].vertices(), [0, 2, 3]);
    }

    #[test]
    fn test_header_is_optional() {
        let model = import("3 1\n0 0 0\n1 0 0\n0 1 0\n3 0 1 2\n").unwrap();
        assert_eq!(model.triangle_count(), 1);
    }

    #[test]
    fn test_extra_faces_are_ignored() {
        let model = import("OFF\n3 1 0\n0 0 0\n1 0 0\n0 1 0\n3 0 1 2\n3 2 1 0\n").unwrap();
        assert_eq!(model.triangle_count(), 1);
    }

    #[test]
    fn test_short_face_is_skipped() {
        let model = import("OFF\n3 2 0\n0 0 0\n1 0 0\n0 1 0\n4 0 1 2\n3 0 1 2\n").unwrap();
        assert_eq!(model.triangle_count(), 1);
    }

    #[test]
    fn test_out_of_range_index() {
        let err = import("OFF\n3 1 0\n0 0 0\n1 0 0\n0 1 0\n3 0 1 3\n").unwrap_err();
        assert!(matches!(err, Error::InvalidVertexIndex));
    }
}
