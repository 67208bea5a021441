//! Import sessions over a set of named files
//!
//! [`ModelImporter`] keeps the working file set between imports. A new
//! upload that contains an importable file starts a fresh session; an upload
//! that only supplies files the previous import reported as missing extends
//! the current set instead. Zip archives are expanded into their entries
//! before importable files are picked.
//!
//! Decoding is deferred: [`ModelImporter::import`] only loads and prepares
//! the files and returns a [`DecodeHandle`]. The decode itself runs on the
//! first [`DecodeHandle::poll`].
//!
//! # Example
//!
//! ```
//! use mesh3d_import::importer::ImportSettings;
//! use mesh3d_import::orchestrator::{InputFile, ModelImporter};
//!
//! let obj = b"mtllib cube.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n".to_vec();
//! let mut importer = ModelImporter::new();
//! let result = importer
//!     .import(vec![InputFile::from_bytes("cube.obj", obj)], ImportSettings::default())
//!     .wait()
//!     .unwrap();
//! assert_eq!(result.main_file, "cube.obj");
//! assert_eq!(result.missing_files, vec!["cube.mtl".to_string()]);
//! ```

mod archive;
mod file_list;

pub use file_list::{FileList, FileSource, ImportFile, InputFile};

use crate::error::Error;
use crate::geometry::Direction;
use crate::importer::{ImportDriver, ImportSettings, Importer, default_importers};
use crate::model::Model;
use archive::expand_archives;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why an import session produced no model
#[derive(Error, Debug)]
pub enum ImportError {
    /// None of the files has an extension a registered decoder handles,
    /// or no main file was selected
    #[error("No importable file found.")]
    NoImportableFile,

    /// The main file was picked but its content could not be loaded
    #[error("Failed to load file: {file}.")]
    FailedToLoadFile {
        /// Name of the main file
        file: String,
    },

    /// The decoder rejected the main file
    #[error("Failed to import {main_file}: {message}")]
    ImportFailed {
        /// Name of the main file
        main_file: String,
        /// Decoder message, without the error code prefix
        message: String,
        /// The decoder error
        #[source]
        source: Error,
    },

    /// The session ended in a state that carries no result
    #[error("Unknown error: {0}")]
    UnknownError(String),
}

impl ImportError {
    /// Numeric error code: 1 no importable file, 2 failed to load,
    /// 3 import failed, 4 unknown
    pub fn code(&self) -> u32 {
        match self {
            ImportError::NoImportableFile => 1,
            ImportError::FailedToLoadFile { .. } => 2,
            ImportError::ImportFailed { .. } => 3,
            ImportError::UnknownError(_) => 4,
        }
    }
}

/// A finished import
#[derive(Debug)]
pub struct ImportResult {
    /// The finalized model
    pub model: Model,
    /// Name of the decoded file
    pub main_file: String,
    /// Up axis of the decoded format
    pub up_vector: Direction,
    /// Main file first, then every side file the decoder received
    pub used_files: Vec<String>,
    /// Side files the decoder asked for that were not in the file set
    pub missing_files: Vec<String>,
}

/// Progress of a [`DecodeHandle`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeStatus {
    /// Decode is scheduled but has not run yet
    Pending,
    /// Several files are importable; call [`DecodeHandle::select`]
    NeedsSelection(Vec<String>),
    /// A result is available through [`DecodeHandle::wait`]
    Finished,
}

/// Owns the decoder registry and the working file set
pub struct ModelImporter {
    importers: Vec<Box<dyn Importer>>,
    file_list: FileList,
    missing_files: Vec<String>,
}

impl Default for ModelImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelImporter {
    /// An importer with every built-in decoder registered
    pub fn new() -> Self {
        Self::with_importers(default_importers())
    }

    /// An importer with exactly `importers`, in match order
    pub fn with_importers(importers: Vec<Box<dyn Importer>>) -> Self {
        Self {
            importers,
            file_list: FileList::new(),
            missing_files: Vec::new(),
        }
    }

    /// Register a decoder after the existing ones
    pub fn add_importer(&mut self, importer: Box<dyn Importer>) {
        self.importers.push(importer);
    }

    /// The current working file set
    pub fn file_list(&self) -> &FileList {
        &self.file_list
    }

    /// Side files the last decode asked for but did not get
    pub fn missing_files(&self) -> &[String] {
        &self.missing_files
    }

    /// Load `files` into the working set and schedule a decode
    ///
    /// Archive expansion happens here; the decode runs on the first
    /// [`DecodeHandle::poll`].
    pub fn import(&mut self, files: Vec<InputFile>, settings: ImportSettings) -> DecodeHandle<'_> {
        let new_files = FileList::from_inputs(files);
        if self.has_importable_file(&new_files) {
            self.file_list = new_files;
        } else if self
            .missing_files
            .iter()
            .any(|missing| new_files.contains_file(missing))
        {
            debug!(files = new_files.len(), "extending file set with missing files");
            self.file_list.extend(new_files);
        } else {
            self.file_list = new_files;
        }
        expand_archives(&mut self.file_list);

        DecodeHandle {
            importer: self,
            settings,
            state: HandleState::Scheduled,
        }
    }

    fn find_importer(&self, extension: &str) -> Option<usize> {
        self.importers
            .iter()
            .position(|importer| importer.can_import_extension(extension))
    }

    fn has_importable_file(&self, file_list: &FileList) -> bool {
        file_list
            .files()
            .iter()
            .any(|file| self.find_importer(&file.extension).is_some())
    }

    /// Indices into the file list of importable files, with their decoder
    fn importable_files(&self) -> Vec<(usize, usize)> {
        self.file_list
            .files()
            .iter()
            .enumerate()
            .filter_map(|(file_index, file)| {
                self.find_importer(&file.extension)
                    .map(|importer_index| (file_index, importer_index))
            })
            .collect()
    }

    fn import_main_file(
        &mut self,
        file_index: usize,
        importer_index: usize,
        settings: ImportSettings,
    ) -> Result<ImportResult, ImportError> {
        let main = &self.file_list.files()[file_index];
        let main_file = main.name.clone();
        let Some(content) = main.content.clone() else {
            return Err(ImportError::FailedToLoadFile { file: main_file });
        };
        let extension = main.extension.clone();

        let importer = self.importers[importer_index].as_ref();
        let file_list = &self.file_list;
        let mut used_files = vec![main_file.clone()];
        let mut missing_files = Vec::new();
        let mut accessor = |name: &str| -> Option<Arc<[u8]>> {
            match file_list.find_file_by_path(name).and_then(|file| file.content.clone()) {
                Some(content) => {
                    used_files.push(name.to_string());
                    Some(content)
                }
                None => {
                    missing_files.push(name.to_string());
                    None
                }
            }
        };

        info!(file = %main_file, importer = importer.name(), "importing");
        let decoded = ImportDriver::new(settings).import(
            importer,
            &content,
            &extension,
            &mut accessor,
        );
        let up_vector = importer.up_direction();
        self.missing_files = missing_files.clone();

        match decoded {
            Ok(model) => Ok(ImportResult {
                model,
                main_file,
                up_vector,
                used_files,
                missing_files,
            }),
            Err(source) => {
                warn!(file = %main_file, error = %source, "import failed");
                Err(ImportError::ImportFailed {
                    main_file,
                    message: source.message().to_string(),
                    source,
                })
            }
        }
    }
}

enum HandleState {
    Scheduled,
    NeedsSelection(Vec<(usize, usize)>),
    Selected(usize, usize),
    Finished(Option<Result<ImportResult, ImportError>>),
}

/// A scheduled decode of a [`ModelImporter`] session
pub struct DecodeHandle<'m> {
    importer: &'m mut ModelImporter,
    settings: ImportSettings,
    state: HandleState,
}

impl DecodeHandle<'_> {
    /// Current progress, without doing any work
    pub fn status(&self) -> DecodeStatus {
        match &self.state {
            HandleState::Scheduled | HandleState::Selected(..) => DecodeStatus::Pending,
            HandleState::NeedsSelection(candidates) => {
                DecodeStatus::NeedsSelection(self.candidate_names(candidates))
            }
            HandleState::Finished(_) => DecodeStatus::Finished,
        }
    }

    /// Run the scheduled work and report the new status
    pub fn poll(&mut self) -> DecodeStatus {
        match self.state {
            HandleState::Scheduled => {
                let candidates = self.importer.importable_files();
                self.state = match candidates.as_slice() {
                    [] => HandleState::Finished(Some(Err(ImportError::NoImportableFile))),
                    [(file_index, importer_index)] => {
                        self.decode(*file_index, *importer_index)
                    }
                    _ => HandleState::NeedsSelection(candidates),
                };
            }
            HandleState::Selected(file_index, importer_index) => {
                self.state = self.decode(file_index, importer_index);
            }
            HandleState::NeedsSelection(_) | HandleState::Finished(_) => {}
        }
        self.status()
    }

    /// Pick the main file among the candidates of
    /// [`DecodeStatus::NeedsSelection`]
    ///
    /// The decode runs on the next [`poll`](Self::poll). An index out of
    /// range finishes the session with [`ImportError::NoImportableFile`].
    pub fn select(&mut self, index: usize) {
        let HandleState::NeedsSelection(candidates) = &self.state else {
            warn!(index, "no main file selection pending");
            return;
        };
        self.state = match candidates.get(index) {
            Some(&(file_index, importer_index)) => {
                HandleState::Selected(file_index, importer_index)
            }
            None => HandleState::Finished(Some(Err(ImportError::NoImportableFile))),
        };
    }

    /// Drive the decode to completion
    ///
    /// A pending selection picks the first candidate.
    pub fn wait(mut self) -> Result<ImportResult, ImportError> {
        loop {
            match self.poll() {
                DecodeStatus::Finished => break,
                DecodeStatus::NeedsSelection(_) => self.select(0),
                DecodeStatus::Pending => {}
            }
        }
        match &mut self.state {
            HandleState::Finished(result) => result
                .take()
                .unwrap_or_else(|| Err(ImportError::UnknownError("result already taken".into()))),
            _ => Err(ImportError::UnknownError("decode did not finish".into())),
        }
    }

    fn decode(&mut self, file_index: usize, importer_index: usize) -> HandleState {
        let result = self
            .importer
            .import_main_file(file_index, importer_index, self.settings);
        HandleState::Finished(Some(result))
    }

    fn candidate_names(&self, candidates: &[(usize, usize)]) -> Vec<String> {
        let files = self.importer.file_list.files();
        candidates
            .iter()
            .map(|(file_index, _)| files[*file_index].name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE_OBJ: &[u8] = b"mtllib tri.mtl\nusemtl red\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
    const TRIANGLE_OFF: &[u8] = b"OFF\n3 1 0\n0 0 0\n1 0 0\n0 1 0\n3 0 1 2\n";

    #[test]
    fn test_single_file() {
        let mut importer = ModelImporter::new();
        let files = vec![InputFile::from_bytes("tri.off", TRIANGLE_OFF)];
        let mut handle = importer.import(files, ImportSettings::default());
        assert_eq!(handle.status(), DecodeStatus::Pending);
        assert_eq!(handle.poll(), DecodeStatus::Finished);

        let result = handle.wait().unwrap();
        assert_eq!(result.main_file, "tri.off");
        assert_eq!(result.used_files, vec!["tri.off".to_string()]);
        assert!(result.missing_files.is_empty());
        assert_eq!(result.up_vector, Direction::Y);
        assert_eq!(result.model.triangle_count(), 1);
    }

    #[test]
    fn test_no_importable_file() {
        let mut importer = ModelImporter::new();
        let files = vec![InputFile::from_bytes("notes.txt", &b"hello"[..])];
        let err = importer
            .import(files, ImportSettings::default())
            .wait()
            .unwrap_err();
        assert!(matches!(err, ImportError::NoImportableFile));
        assert_eq!(err.code(), 1);
    }

    #[test]
    fn test_selection() {
        let mut importer = ModelImporter::new();
        let mut handle = importer.import(
            vec![
                InputFile::from_bytes("a.off", TRIANGLE_OFF),
                InputFile::from_bytes("b.obj", TRIANGLE_OBJ),
            ],
            ImportSettings::default(),
        );
        assert_eq!(
            handle.poll(),
            DecodeStatus::NeedsSelection(vec!["a.off".to_string(), "b.obj".to_string()])
        );
        handle.select(1);
        assert_eq!(handle.status(), DecodeStatus::Pending);
        let result = handle.wait().unwrap();
        assert_eq!(result.main_file, "b.obj");
    }

    #[test]
    fn test_selection_out_of_range() {
        let mut importer = ModelImporter::new();
        let mut handle = importer.import(
            vec![
                InputFile::from_bytes("a.off", TRIANGLE_OFF),
                InputFile::from_bytes("b.off", TRIANGLE_OFF),
            ],
            ImportSettings::default(),
        );
        handle.poll();
        handle.select(5);
        assert!(matches!(handle.wait(), Err(ImportError::NoImportableFile)));
    }

    #[test]
    fn test_missing_file_round_trip() {
        let mut importer = ModelImporter::new();
        let first = importer
            .import(vec![InputFile::from_bytes("tri.obj", TRIANGLE_OBJ)], ImportSettings::default())
            .wait()
            .unwrap();
        assert_eq!(first.missing_files, vec!["tri.mtl".to_string()]);
        assert_eq!(importer.missing_files(), ["tri.mtl".to_string()]);

        let mtl = b"newmtl red\nKd 1 0 0\n".to_vec();
        let second = importer
            .import(vec![InputFile::from_bytes("TRI.MTL", mtl)], ImportSettings::default())
            .wait()
            .unwrap();
        assert_eq!(second.main_file, "tri.obj");
        assert_eq!(second.used_files, vec!["tri.obj".to_string(), "tri.mtl".to_string()]);
        assert!(second.missing_files.is_empty());
        assert_eq!(importer.file_list().len(), 2);
    }

    #[test]
    fn test_unrelated_upload_resets() {
        let mut importer = ModelImporter::new();
        importer
            .import(vec![InputFile::from_bytes("tri.obj", TRIANGLE_OBJ)], ImportSettings::default())
            .wait()
            .unwrap();
        let files = vec![InputFile::from_bytes("other.png", &b"png"[..])];
        let err = importer
            .import(files, ImportSettings::default())
            .wait()
            .unwrap_err();
        assert!(matches!(err, ImportError::NoImportableFile));
        assert_eq!(importer.file_list().len(), 1);
    }

    #[test]
    fn test_decoder_failure() {
        let mut importer = ModelImporter::new();
        let files = vec![InputFile::from_bytes("broken.off", &b"OFF\n3 1 0\n0 0 0\n"[..])];
        let err = importer
            .import(files, ImportSettings::default())
            .wait()
            .unwrap_err();
        match &err {
            ImportError::ImportFailed { main_file, .. } => assert_eq!(main_file, "broken.off"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.code(), 3);
    }

    #[test]
    fn test_failed_to_load() {
        let mut importer = ModelImporter::new();
        let err = importer
            .import(vec![InputFile::from_path("/nonexistent/model.stl")], ImportSettings::default())
            .wait()
            .unwrap_err();
        assert!(matches!(err, ImportError::FailedToLoadFile { ref file } if file == "model.stl"));
        assert_eq!(err.code(), 2);
    }
}
