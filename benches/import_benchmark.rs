use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use mesh3d_import::importer::{
    ImportDriver, ImportSettings, NoFileAccess, ObjImporter, PlyImporter, StlImporter,
};
use mesh3d_import::orchestrator::{InputFile, ModelImporter};
use std::hint::black_box;
use std::io::Write;
use tempfile::NamedTempFile;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Vertex positions of a `size` x `size` grid and the two triangles per cell
fn grid(size: usize) -> (Vec<[f32; 3]>, Vec<[usize; 3]>) {
    let mut vertices = Vec::with_capacity(size * size);
    for y in 0..size {
        for x in 0..size {
            vertices.push([x as f32, y as f32, ((x * y) % 7) as f32 * 0.1]);
        }
    }
    let mut triangles = Vec::with_capacity(2 * (size - 1) * (size - 1));
    for y in 0..size - 1 {
        for x in 0..size - 1 {
            let i = y * size + x;
            triangles.push([i, i + 1, i + size + 1]);
            triangles.push([i, i + size + 1, i + size]);
        }
    }
    (vertices, triangles)
}

fn generate_obj(size: usize) -> Vec<u8> {
    let (vertices, triangles) = grid(size);
    let mut obj = String::new();
    for [x, y, z] in vertices {
        obj.push_str(&format!("v {} {} {}\n", x, y, z));
    }
    for [a, b, c] in triangles {
        obj.push_str(&format!("f {} {} {}\n", a + 1, b + 1, c + 1));
    }
    obj.into_bytes()
}

fn generate_binary_stl(size: usize) -> Vec<u8> {
    let (vertices, triangles) = grid(size);
    let mut stl = vec![0u8; 80];
    stl.extend_from_slice(&(triangles.len() as u32).to_le_bytes());
    for triangle in triangles {
        stl.extend_from_slice(&[0u8; 12]);
        for index in triangle {
            for component in vertices[index] {
                stl.extend_from_slice(&component.to_le_bytes());
            }
        }
        stl.extend_from_slice(&[0, 0]);
    }
    stl
}

fn generate_binary_ply(size: usize) -> Vec<u8> {
    let (vertices, triangles) = grid(size);
    let mut ply = format!(
        "ply\nformat binary_little_endian 1.0\nelement vertex {}\nproperty float x\n\
         property float y\nproperty float z\nelement face {}\n\
         property list uchar uint vertex_indices\nend_header\n",
        vertices.len(),
        triangles.len()
    )
    .into_bytes();
    for vertex in vertices {
        for component in vertex {
            ply.extend_from_slice(&component.to_le_bytes());
        }
    }
    for triangle in triangles {
        ply.push(3);
        for index in triangle {
            ply.extend_from_slice(&(index as u32).to_le_bytes());
        }
    }
    ply
}

/// A zip bundle on disk holding the OBJ grid
fn generate_zip_bundle(size: usize) -> NamedTempFile {
    let temp_file = NamedTempFile::new().unwrap();
    let mut zip = ZipWriter::new(temp_file.reopen().unwrap());
    let options = SimpleFileOptions::default();
    zip.start_file("grid/grid.obj", options).unwrap();
    zip.write_all(&generate_obj(size)).unwrap();
    zip.finish().unwrap();
    temp_file
}

fn bench_decoders(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    let driver = ImportDriver::new(ImportSettings::default());

    for &size in &[16, 64, 128] {
        let label = format!("{}x{}", size, size);

        let obj = generate_obj(size);
        group.bench_with_input(BenchmarkId::new("obj", &label), &obj, |b, content| {
            b.iter(|| {
                black_box(
                    driver
                        .import(&ObjImporter::new(), content, "obj", &mut NoFileAccess)
                        .unwrap(),
                )
            });
        });

        let stl = generate_binary_stl(size);
        group.bench_with_input(BenchmarkId::new("stl", &label), &stl, |b, content| {
            b.iter(|| {
                black_box(
                    driver
                        .import(&StlImporter::new(), content, "stl", &mut NoFileAccess)
                        .unwrap(),
                )
            });
        });

        let ply = generate_binary_ply(size);
        group.bench_with_input(BenchmarkId::new("ply", &label), &ply, |b, content| {
            b.iter(|| {
                black_box(
                    driver
                        .import(&PlyImporter::new(), content, "ply", &mut NoFileAccess)
                        .unwrap(),
                )
            });
        });
    }

    group.finish();
}

fn bench_zip_session(c: &mut Criterion) {
    let mut group = c.benchmark_group("session");
    group.sample_size(20);

    let temp_file = generate_zip_bundle(128);
    let path = temp_file.path().with_extension("zip");
    std::fs::copy(temp_file.path(), &path).unwrap();

    group.bench_function("zip_obj_128x128", |b| {
        b.iter(|| {
            let mut importer = ModelImporter::new();
            black_box(
                importer
                    .import(vec![InputFile::from_path(&path)], ImportSettings::default())
                    .wait()
                    .unwrap(),
            )
        });
    });

    group.finish();
    let _ = std::fs::remove_file(&path);
}

criterion_group!(benches, bench_decoders, bench_zip_session);
criterion_main!(benches);
