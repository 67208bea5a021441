//! Integration tests for mesh3d_import
//!
//! These tests run whole import sessions through the public API: zip
//! bundles, files on disk and missing side files.

use mesh3d_import::geometry::Direction;
use mesh3d_import::importer::ImportSettings;
use mesh3d_import::model::RGBColor;
use mesh3d_import::{DecodeStatus, ImportError, InputFile, ModelImporter};
use std::io::{Cursor, Write};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const CUBE_OBJ: &str = "\
mtllib cube.mtl
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
usemtl wood
f 1/1 2/2 3/3 4/4
";

const CUBE_MTL: &str = "\
newmtl wood
Kd 1 0 0
map_Kd textures/wood.png
";

/// Create a zip bundle from `(name, content)` entries
fn create_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut buffer = Vec::new();
    let cursor = Cursor::new(&mut buffer);
    let mut zip = ZipWriter::new(cursor);
    let options = SimpleFileOptions::default();

    for (name, content) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(content).unwrap();
    }

    zip.finish().unwrap();
    buffer
}

/// Binary STL with one triangle per entry of `triangles`
fn create_binary_stl(triangles: &[[[f32; 3]; 3]]) -> Vec<u8> {
    let mut data = vec![0u8; 80];
    data.extend_from_slice(&(triangles.len() as u32).to_le_bytes());
    for triangle in triangles {
        data.extend_from_slice(&[0u8; 12]);
        for vertex in triangle {
            for component in vertex {
                data.extend_from_slice(&component.to_le_bytes());
            }
        }
        data.extend_from_slice(&0u16.to_le_bytes());
    }
    data
}

#[test]
fn test_zip_bundle_with_side_files() {
    let bundle = create_zip(&[
        ("cube/cube.obj", CUBE_OBJ.as_bytes()),
        ("cube/cube.mtl", CUBE_MTL.as_bytes()),
        ("cube/textures/wood.png", &[0x89, b'P', b'N', b'G']),
    ]);

    let mut importer = ModelImporter::new();
    let result = importer
        .import(vec![InputFile::from_bytes("cube.zip", bundle)], ImportSettings::default())
        .wait()
        .unwrap();

    assert_eq!(result.main_file, "cube.obj");
    assert_eq!(result.up_vector, Direction::Y);
    assert_eq!(
        result.used_files,
        vec!["cube.obj".to_string(), "cube.mtl".to_string(), "wood.png".to_string()]
    );
    assert!(result.missing_files.is_empty());

    let model = &result.model;
    assert_eq!(model.triangle_count(), 2);
    let material = &model.materials[0];
    assert_eq!(material.name, "wood");
    assert_eq!(material.color, RGBColor::new(255, 0, 0));
    let diffuse = material.diffuse_map.as_ref().unwrap();
    assert_eq!(diffuse.buffer.as_deref(), Some(&[0x89, b'P', b'N', b'G'][..]));
}

#[test]
fn test_missing_texture_reported() {
    let mut importer = ModelImporter::new();
    let result = importer
        .import(
            vec![
                InputFile::from_bytes("cube.obj", CUBE_OBJ.as_bytes()),
                InputFile::from_bytes("cube.mtl", CUBE_MTL.as_bytes()),
            ],
            ImportSettings::default(),
        )
        .wait()
        .unwrap();
    assert_eq!(result.missing_files, vec!["wood.png".to_string()]);
    assert!(result.model.materials[0].diffuse_map.as_ref().unwrap().buffer.is_none());

    // Supplying the missing texture re-imports the same main file
    let result = importer
        .import(vec![InputFile::from_bytes("Wood.png", &b"png"[..])], ImportSettings::default())
        .wait()
        .unwrap();
    assert_eq!(result.main_file, "cube.obj");
    assert!(result.missing_files.is_empty());
    assert_eq!(importer.file_list().len(), 3);
}

#[test]
fn test_files_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let stl_path = dir.path().join("wedge.stl");
    std::fs::write(
        &stl_path,
        create_binary_stl(&[
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            [[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        ]),
    )
    .unwrap();

    let mut importer = ModelImporter::new();
    let result = importer
        .import(vec![InputFile::from_path(&stl_path)], ImportSettings::default())
        .wait()
        .unwrap();
    assert_eq!(result.main_file, "wedge.stl");
    assert_eq!(result.up_vector, Direction::Z);
    assert_eq!(result.model.triangle_count(), 2);
}

#[test]
fn test_main_file_selection() {
    let stl = create_binary_stl(&[[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]]);
    let off = b"OFF\n4 2 0\n0 0 0\n1 0 0\n1 1 0\n0 1 0\n3 0 1 2\n3 0 2 3\n".to_vec();

    let mut importer = ModelImporter::new();
    let mut handle = importer.import(
        vec![InputFile::from_bytes("a.stl", stl), InputFile::from_bytes("b.off", off)],
        ImportSettings::default(),
    );
    match handle.poll() {
        DecodeStatus::NeedsSelection(names) => assert_eq!(names, vec!["a.stl", "b.off"]),
        other => panic!("expected a selection, got {other:?}"),
    }
    handle.select(1);
    assert_eq!(handle.poll(), DecodeStatus::Finished);
    let result = handle.wait().unwrap();
    assert_eq!(result.main_file, "b.off");
    assert_eq!(result.model.triangle_count(), 2);
}

#[test]
fn test_import_failed_carries_message() {
    let mut importer = ModelImporter::new();
    let err = importer
        .import(
            vec![InputFile::from_bytes("broken.ply", &b"ply\nformat ascii 1.0\n"[..])],
            ImportSettings::default(),
        )
        .wait()
        .unwrap_err();
    match err {
        ImportError::ImportFailed { main_file, message, .. } => {
            assert_eq!(main_file, "broken.ply");
            assert_eq!(message, "Invalid header information.");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_default_color_setting() {
    let off = b"OFF\n3 1 0\n0 0 0\n1 0 0\n0 1 0\n3 0 1 2\n".to_vec();
    let settings = ImportSettings::new().with_default_color(RGBColor::new(10, 20, 30));
    let mut importer = ModelImporter::new();
    let result = importer
        .import(vec![InputFile::from_bytes("tri.off", off)], settings)
        .wait()
        .unwrap();
    let default_material = result.model.materials.iter().find(|m| m.is_default).unwrap();
    assert_eq!(default_material.color, RGBColor::new(10, 20, 30));
}
