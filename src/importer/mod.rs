//! Importer contract and per-format decoders
//!
//! Every format decoder implements [`Importer`]. The shared [`ImportDriver`]
//! owns the lifecycle around a decoder: it creates a fresh [`Model`], hands it
//! to the decoder through an [`ImportContext`], rejects models without any
//! triangles and finally runs the model finalizer.
//!
//! Decoders never perform I/O. Side files (material libraries, textures,
//! external buffers) are requested by name through the context, which routes
//! the request to a [`FileAccessor`] and caches the answer.
//!
//! # Example
//!
//! ```
//! use mesh3d_import::importer::{ImportDriver, ImportSettings, NoFileAccess, ObjImporter};
//!
//! let content = b"v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
//! let driver = ImportDriver::new(ImportSettings::default());
//! let model = driver
//!     .import(&ObjImporter::new(), content, "obj", &mut NoFileAccess)
//!     .unwrap();
//! assert_eq!(model.triangle_count(), 1);
//! ```

mod gltf;
mod obj;
mod off;
mod ply;
mod stl;
mod three_ds;
mod topology;

pub use gltf::{AccessorLayout, AccessorReader, AccessorType, ComponentType, GltfImporter};
pub use obj::ObjImporter;
pub use off::OffImporter;
pub use ply::PlyImporter;
pub use stl::{StlImporter, is_binary_stl};
pub use three_ds::ThreeDsImporter;

use crate::error::{Error, Result};
use crate::finalizer::finalize_model;
use crate::geometry::Direction;
use crate::io::get_file_name;
use crate::model::{Model, RGBColor};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// A format decoder
///
/// Implementations hold no per-import state: everything a decode needs is
/// built inside [`import_content`](Importer::import_content), so one decoder
/// instance can serve any number of imports.
///
/// # Example
///
/// ```
/// use mesh3d_import::geometry::{Coord3D, Direction};
/// use mesh3d_import::importer::{ImportContext, Importer};
/// use mesh3d_import::model::{Mesh, Triangle};
/// use mesh3d_import::Result;
///
/// struct PointCloudImporter;
///
/// impl Importer for PointCloudImporter {
///     fn name(&self) -> &str {
///         "xyz"
///     }
///
///     fn can_import_extension(&self, extension: &str) -> bool {
///         extension == "xyz"
///     }
///
///     fn up_direction(&self) -> Direction {
///         Direction::Z
///     }
///
///     fn import_content(&self, _content: &[u8], ctx: &mut ImportContext<'_>) -> Result<()> {
///         let mut mesh = Mesh::new();
///         mesh.add_vertex(Coord3D::new(0.0, 0.0, 0.0));
///         mesh.add_vertex(Coord3D::new(1.0, 0.0, 0.0));
///         mesh.add_vertex(Coord3D::new(0.0, 1.0, 0.0));
///         mesh.add_triangle(Triangle::new(0, 1, 2));
///         ctx.model.add_mesh_to_root_node(mesh);
///         Ok(())
///     }
/// }
/// ```
pub trait Importer: Send + Sync {
    /// Short human readable decoder name, used in log output
    fn name(&self) -> &str;

    /// Returns true if the decoder handles `extension` (lowercase, no dot)
    fn can_import_extension(&self, extension: &str) -> bool;

    /// The format's native up axis
    fn up_direction(&self) -> Direction;

    /// Decode `content` into `ctx.model`
    ///
    /// Any error aborts the import; geometry added before the error is
    /// discarded by the driver.
    fn import_content(&self, content: &[u8], ctx: &mut ImportContext<'_>) -> Result<()>;
}

/// Source of side files requested during a decode
pub trait FileAccessor {
    /// Return the content of the file called `name`, if available
    fn get_file_buffer(&mut self, name: &str) -> Option<Arc<[u8]>>;
}

impl<F> FileAccessor for F
where
    F: FnMut(&str) -> Option<Arc<[u8]>>,
{
    fn get_file_buffer(&mut self, name: &str) -> Option<Arc<[u8]>> {
        self(name)
    }
}

/// Accessor for decodes that have no side files
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFileAccess;

impl FileAccessor for NoFileAccess {
    fn get_file_buffer(&mut self, _name: &str) -> Option<Arc<[u8]>> {
        None
    }
}

/// Settings shared by every import
///
/// # Example
///
/// ```
/// use mesh3d_import::importer::ImportSettings;
/// use mesh3d_import::model::RGBColor;
///
/// let settings = ImportSettings::new().with_default_color(RGBColor::new(255, 0, 0));
/// assert_eq!(settings.default_color(), RGBColor::new(255, 0, 0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSettings {
    default_color: RGBColor,
    default_line_color: RGBColor,
}

impl ImportSettings {
    /// Settings with the default colors
    pub fn new() -> Self {
        Self {
            default_color: RGBColor::new(200, 200, 200),
            default_line_color: RGBColor::new(100, 100, 100),
        }
    }

    /// Set the color of the material assigned to triangles without one
    pub fn with_default_color(mut self, color: RGBColor) -> Self {
        self.default_color = color;
        self
    }

    /// Set the color a renderer should use for line geometry
    pub fn with_default_line_color(mut self, color: RGBColor) -> Self {
        self.default_line_color = color;
        self
    }

    /// Color of the default material
    pub fn default_color(&self) -> RGBColor {
        self.default_color
    }

    /// Color for line geometry
    pub fn default_line_color(&self) -> RGBColor {
        self.default_line_color
    }
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self::new()
    }
}

/// State a decoder works with during one import
pub struct ImportContext<'a> {
    /// The model under construction
    pub model: Model,
    extension: String,
    accessor: &'a mut dyn FileAccessor,
    file_cache: HashMap<String, Option<Arc<[u8]>>>,
}

impl<'a> ImportContext<'a> {
    /// Create a context around an empty model
    pub fn new(extension: impl Into<String>, accessor: &'a mut dyn FileAccessor) -> Self {
        Self {
            model: Model::new(),
            extension: extension.into(),
            accessor,
            file_cache: HashMap::new(),
        }
    }

    /// Extension of the file being decoded
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Resolve a side file by path
    ///
    /// The path is reduced to its file name before the lookup, and each name
    /// is requested from the accessor at most once per import, misses
    /// included.
    pub fn get_file_buffer(&mut self, path: &str) -> Option<Arc<[u8]>> {
        let file_name = get_file_name(path);
        if let Some(cached) = self.file_cache.get(&file_name) {
            return cached.clone();
        }
        let buffer = self.accessor.get_file_buffer(&file_name);
        if buffer.is_none() {
            warn!(file = %file_name, "side file is not available");
        }
        self.file_cache.insert(file_name, buffer.clone());
        buffer
    }

    /// Consume the context and return the model
    pub fn into_model(self) -> Model {
        self.model
    }
}

/// Receives the outcome of [`ImportDriver::import_with_callbacks`]
///
/// Exactly one of `on_success` or `on_error` is called, then `on_complete`.
pub trait ImportCallbacks {
    /// The import produced a finalized model
    fn on_success(&mut self, model: Model);

    /// The import failed
    fn on_error(&mut self, error: Error);

    /// Called once after either terminal callback
    fn on_complete(&mut self) {}
}

/// Runs a decoder and finalizes its output
#[derive(Debug, Clone, Default)]
pub struct ImportDriver {
    settings: ImportSettings,
}

impl ImportDriver {
    /// Create a driver using `settings`
    pub fn new(settings: ImportSettings) -> Self {
        Self { settings }
    }

    /// The driver's settings
    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    /// Decode `content` with `importer` and return the finalized model
    ///
    /// # Errors
    ///
    /// Returns the decoder's error, or [`Error::EmptyModel`] when no mesh
    /// instance has a triangle.
    pub fn import(
        &self,
        importer: &dyn Importer,
        content: &[u8],
        extension: &str,
        accessor: &mut dyn FileAccessor,
    ) -> Result<Model> {
        debug!(importer = importer.name(), extension, bytes = content.len(), "decoding");
        let mut ctx = ImportContext::new(extension, accessor);
        importer.import_content(content, &mut ctx)?;

        let mut model = ctx.into_model();
        if model.is_empty() {
            return Err(Error::EmptyModel);
        }
        finalize_model(&mut model, self.settings.default_color());
        Ok(model)
    }

    /// Like [`import`](Self::import), reporting the outcome through `callbacks`
    pub fn import_with_callbacks(
        &self,
        importer: &dyn Importer,
        content: &[u8],
        extension: &str,
        accessor: &mut dyn FileAccessor,
        callbacks: &mut dyn ImportCallbacks,
    ) {
        match self.import(importer, content, extension, accessor) {
            Ok(model) => callbacks.on_success(model),
            Err(err) => callbacks.on_error(err),
        }
        callbacks.on_complete();
    }
}

/// The built-in decoders in registration order
pub fn default_importers() -> Vec<Box<dyn Importer>> {
    vec![
        Box::new(ObjImporter::new()),
        Box::new(StlImporter::new()),
        Box::new(OffImporter::new()),
        Box::new(PlyImporter::new()),
        Box::new(ThreeDsImporter::new()),
        Box::new(GltfImporter::new()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Coord3D;
    use crate::model::{Mesh, Triangle};

    struct SingleTriangle {
        with_triangle: bool,
        fail: bool,
    }

    impl Importer for SingleTriangle {
        fn name(&self) -> &str {
            "test"
        }

        fn can_import_extension(&self, extension: &str) -> bool {
            extension == "tst"
        }

        fn up_direction(&self) -> Direction {
            Direction::Z
        }

        fn import_content(&self, _content: &[u8], ctx: &mut ImportContext<'_>) -> Result<()> {
            if self.fail {
                return Err(Error::InvalidFormat("broken".to_string()));
            }
            let mut mesh = Mesh::new();
            mesh.add_vertex(Coord3D::new(0.0, 0.0, 0.0));
            mesh.add_vertex(Coord3D::new(1.0, 0.0, 0.0));
            mesh.add_vertex(Coord3D::new(0.0, 1.0, 0.0));
            if self.with_triangle {
                mesh.add_triangle(Triangle::new(0, 1, 2));
            }
            ctx.model.add_mesh_to_root_node(mesh);
            Ok(())
        }
    }

    #[derive(Default)]
    struct Recorder {
        success: usize,
        errors: Vec<String>,
        complete: usize,
    }

    impl ImportCallbacks for Recorder {
        fn on_success(&mut self, _model: Model) {
            self.success += 1;
        }

        fn on_error(&mut self, error: Error) {
            self.errors.push(error.message());
        }

        fn on_complete(&mut self) {
            self.complete += 1;
        }
    }

    #[test]
    fn test_driver_finalizes_model() {
        let importer = SingleTriangle {
            with_triangle: true,
            fail: false,
        };
        let driver = ImportDriver::new(ImportSettings::new());
        let model = driver
            .import(&importer, &[], "tst", &mut NoFileAccess)
            .unwrap();
        assert_eq!(model.material_count(), 1);
        assert!(model.materials[0].is_default);
        assert_eq!(model.materials[0].color, RGBColor::new(200, 200, 200));
        assert!(model.meshes[0].triangles[0].has_normals());
    }

    #[test]
    fn test_driver_rejects_empty_model() {
        let importer = SingleTriangle {
            with_triangle: false,
            fail: false,
        };
        let driver = ImportDriver::default();
        let err = driver
            .import(&importer, &[], "tst", &mut NoFileAccess)
            .unwrap_err();
        assert!(matches!(err, Error::EmptyModel));
        assert_eq!(err.message(), "The model doesn't contain any meshes.");
    }

    #[test]
    fn test_callbacks_complete_once() {
        let driver = ImportDriver::default();
        let mut recorder = Recorder::default();
        let failing = SingleTriangle {
            with_triangle: true,
            fail: true,
        };
        driver.import_with_callbacks(&failing, &[], "tst", &mut NoFileAccess, &mut recorder);
        assert_eq!(recorder.success, 0);
        assert_eq!(recorder.errors, vec!["broken".to_string()]);
        assert_eq!(recorder.complete, 1);

        let working = SingleTriangle {
            with_triangle: true,
            fail: false,
        };
        driver.import_with_callbacks(&working, &[], "tst", &mut NoFileAccess, &mut recorder);
        assert_eq!(recorder.success, 1);
        assert_eq!(recorder.complete, 2);
    }

    #[test]
    fn test_context_caches_by_file_name() {
        let mut requests = Vec::new();
        let mut accessor = |name: &str| -> Option<Arc<[u8]>> {
            requests.push(name.to_string());
            (name == "a.mtl").then(|| Arc::from(b"x".to_vec()))
        };
        {
            let mut ctx = ImportContext::new("obj", &mut accessor);
            assert!(ctx.get_file_buffer("dir/a.mtl").is_some());
            assert!(ctx.get_file_buffer("a.mtl").is_some());
            assert!(ctx.get_file_buffer("b.png").is_none());
            assert!(ctx.get_file_buffer("textures/b.png").is_none());
            assert_eq!(ctx.extension(), "obj");
        }
        assert_eq!(requests, vec!["a.mtl".to_string(), "b.png".to_string()]);
    }

    #[test]
    fn test_settings_builder() {
        let settings = ImportSettings::new()
            .with_default_color(RGBColor::new(1, 2, 3))
            .with_default_line_color(RGBColor::new(4, 5, 6));
        assert_eq!(settings.default_color(), RGBColor::new(1, 2, 3));
        assert_eq!(settings.default_line_color(), RGBColor::new(4, 5, 6));
        assert_eq!(
            ImportSettings::default().default_line_color(),
            RGBColor::new(100, 100, 100)
        );
    }

    #[test]
    fn test_default_importer_order() {
        let names: Vec<String> = default_importers()
            .iter()
            .map(|i| i.name().to_string())
            .collect();
        assert_eq!(names, vec!["obj", "stl", "off", "ply", "3ds", "gltf"]);
    }
}
