//! Expansion of zip archives into named entries

use super::file_list::FileList;
#[cfg(feature = "archive")]
use super::file_list::ImportFile;
#[cfg(feature = "archive")]
use crate::error::Result;
#[cfg(feature = "archive")]
use std::io::{Cursor, Read};
#[cfg(feature = "archive")]
use std::sync::Arc;
use tracing::{debug, warn};
#[cfg(feature = "archive")]
use zip::ZipArchive;

/// Add the entries of every `.zip` file in `file_list` to the list
///
/// Entries whose name is already present are not added twice, so expanding
/// an extended list again leaves earlier entries alone. An archive that
/// cannot be read is logged and skipped.
#[cfg(feature = "archive")]
pub(crate) fn expand_archives(file_list: &mut FileList) {
    let archives: Vec<(String, Arc<[u8]>)> = file_list
        .files()
        .iter()
        .filter(|file| file.extension == "zip")
        .filter_map(|file| Some((file.name.clone(), file.content.clone()?)))
        .collect();

    for (name, content) in archives {
        match read_entries(&content) {
            Ok(entries) => {
                debug!(archive = %name, entries = entries.len(), "expanded archive");
                for (entry_name, bytes) in entries {
                    if !file_list.contains_file(&entry_name) {
                        file_list.add(ImportFile::new(&entry_name, Some(Arc::from(bytes))));
                    }
                }
            }
            Err(err) => warn!(archive = %name, error = %err, "failed to expand archive"),
        }
    }
}

#[cfg(feature = "archive")]
fn read_entries(content: &[u8]) -> Result<Vec<(String, Vec<u8>)>> {
    let mut archive = ZipArchive::new(Cursor::new(content))?;
    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        entries.push((entry.name().to_string(), bytes));
    }
    Ok(entries)
}

/// Without archive support zip files stay opaque
#[cfg(not(feature = "archive"))]
pub(crate) fn expand_archives(file_list: &mut FileList) {
    if file_list.files().iter().any(|file| file.extension == "zip") {
        warn!("zip input ignored, archive support is disabled");
    } else {
        debug!("no archives to expand");
    }
}
