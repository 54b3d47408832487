//! Zip archive ingestion.

use super::{DataIngestor, IngestedData, is_data_file, load_csv, select_data_file};
use crate::error::Result;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Resource-fork folder macOS adds to archives it creates
const MACOS_METADATA_DIR: &str = "__MACOSX";

/// Ingests `.zip` archives
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipIngestor;

impl DataIngestor for ZipIngestor {
    fn name(&self) -> &'static str {
        "zip"
    }

    fn ingest(&self, archive_path: &Path, work_dir: &Path) -> Result<IngestedData> {
        let file = File::open(archive_path)?;
        let mut archive = ZipArchive::new(file)?;

        // Only the archive's own entries are candidates; anything already in
        // the working directory from earlier runs is ignored.
        let candidates = data_file_entries(&mut archive)?;

        std::fs::create_dir_all(work_dir)?;
        archive.extract(work_dir)?;
        tracing::info!(
            "Extracted {} entries from {} into {}",
            archive.len(),
            archive_path.display(),
            work_dir.display()
        );

        let file_path = select_data_file(candidates, work_dir)?;
        let dataset = load_csv(&file_path)?;

        Ok(IngestedData { dataset, file_path })
    }
}

/// Relative paths of the CSV entries, skipping directories and macOS metadata.
fn data_file_entries<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for index in 0..archive.len() {
        let entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        let Some(path) = entry.enclosed_name() else {
            tracing::warn!("Skipping archive entry with unsafe path: {}", entry.name());
            continue;
        };
        if path
            .components()
            .any(|c| c.as_os_str() == MACOS_METADATA_DIR)
        {
            continue;
        }
        if is_data_file(&path) {
            found.push(path);
        }
    }
    Ok(found)
}
