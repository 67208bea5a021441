//! # mesh3d_import
//!
//! A pure Rust importer that turns common 3D model files into one unified,
//! renderer-independent scene model.
//!
//! Supported formats: Wavefront OBJ (with MTL material libraries), STL
//! (ASCII and binary), OFF, PLY (ASCII and binary), 3DS, and glTF 2.0
//! (`.gltf` and `.glb`).
//!
//! ## Features
//!
//! - Pure Rust implementation with no unsafe code
//! - One [`Model`] for every format: meshes with vertices, colors, normals,
//!   texture coordinates and triangles, materials, a node hierarchy and
//!   property groups
//! - Decoders never touch the file system; side files (material libraries,
//!   textures, external buffers) are requested through a callback
//! - Import sessions over several files, with zip archive expansion and
//!   missing-file round trips (`archive` feature, on by default)
//! - Every decoded model is finalized: default material, computed normals,
//!   pruned empty meshes and nodes
//!
//! ## Example
//!
//! ```
//! use mesh3d_import::importer::ImportSettings;
//! use mesh3d_import::orchestrator::{InputFile, ModelImporter};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let off = b"OFF\n3 1 0\n0 0 0\n1 0 0\n0 1 0\n3 0 1 2\n".to_vec();
//! let mut importer = ModelImporter::new();
//! let result = importer
//!     .import(vec![InputFile::from_bytes("triangle.off", off)], ImportSettings::default())
//!     .wait()?;
//!
//! println!("{} contains {} triangles", result.main_file, result.model.triangle_count());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod finalizer;
pub mod geometry;
pub mod importer;
pub mod io;
pub mod model;
pub mod orchestrator;
pub mod validator;

pub use error::{Error, Result};
pub use finalizer::{FinalizationReport, ModelFinalizer, finalize_model};
pub use importer::{
    FileAccessor, GltfImporter, ImportContext, ImportDriver, ImportSettings, Importer,
    NoFileAccess, ObjImporter, OffImporter, PlyImporter, StlImporter, ThreeDsImporter,
    default_importers,
};
pub use model::{Material, Mesh, Model, Node, NodeHandle, Triangle};
pub use orchestrator::{
    DecodeHandle, DecodeStatus, ImportError, ImportResult, InputFile, ModelImporter,
};
pub use validator::{check_model, validate_model};
