//! Named input buffers and the working file set of an import session

use crate::io::{get_file_extension, get_file_name};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Where the content of an input file comes from
#[derive(Debug, Clone)]
pub enum FileSource {
    /// Content already in memory
    Bytes(Arc<[u8]>),
    /// A file on disk, read when the import starts
    Path(PathBuf),
}

/// A file handed to [`ModelImporter::import`](super::ModelImporter::import)
#[derive(Debug, Clone)]
pub struct InputFile {
    /// Name used for extension detection and side-file lookup
    pub name: String,
    /// Content source
    pub source: FileSource,
}

impl InputFile {
    /// An in-memory file
    pub fn from_bytes(name: impl Into<String>, content: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            source: FileSource::Bytes(content.into()),
        }
    }

    /// A file on disk; its name is the last path component
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name,
            source: FileSource::Path(path),
        }
    }

    fn load(self) -> ImportFile {
        let content = match self.source {
            FileSource::Bytes(content) => Some(content),
            FileSource::Path(path) => match std::fs::read(&path) {
                Ok(content) => Some(Arc::from(content)),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "failed to read input file");
                    None
                }
            },
        };
        ImportFile::new(&self.name, content)
    }
}

/// A loaded file of the working set
#[derive(Debug, Clone)]
pub struct ImportFile {
    /// Bare file name
    pub name: String,
    /// Lowercase extension without the dot
    pub extension: String,
    /// File content; `None` if loading failed
    pub content: Option<Arc<[u8]>>,
}

impl ImportFile {
    /// Create a file; directories are stripped from `path`
    pub fn new(path: &str, content: Option<Arc<[u8]>>) -> Self {
        Self {
            name: get_file_name(path),
            extension: get_file_extension(path),
            content,
        }
    }
}

/// Ordered set of loaded files
///
/// Lookups match the bare file name case-insensitively, so
/// `textures/Wood.PNG` finds a file added as `wood.png`.
#[derive(Debug, Clone, Default)]
pub struct FileList {
    files: Vec<ImportFile>,
}

impl FileList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every input file, in order
    pub fn from_inputs(inputs: Vec<InputFile>) -> Self {
        Self {
            files: inputs.into_iter().map(InputFile::load).collect(),
        }
    }

    /// Append a file
    pub fn add(&mut self, file: ImportFile) {
        self.files.push(file);
    }

    /// All files, in insertion order
    pub fn files(&self) -> &[ImportFile] {
        &self.files
    }

    /// Number of files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True if the list holds no files
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The first file whose name matches the file name of `path`
    pub fn find_file_by_path(&self, path: &str) -> Option<&ImportFile> {
        let name = get_file_name(path).to_lowercase();
        self.files.iter().find(|file| file.name.to_lowercase() == name)
    }

    /// True if a file matching `path` is in the list
    pub fn contains_file(&self, path: &str) -> bool {
        self.find_file_by_path(path).is_some()
    }

    /// True if every file is a zip archive
    pub fn is_only_archive(&self) -> bool {
        !self.files.is_empty() && self.files.iter().all(|file| file.extension == "zip")
    }

    /// Append the files of `other` that are not already present
    pub fn extend(&mut self, other: FileList) {
        for file in other.files {
            if !self.contains_file(&file.name) {
                self.files.push(file);
            }
        }
    }
}
