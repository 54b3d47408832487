//! Archive ingestion.
//!
//! An archive is unpacked into a working directory, exactly one CSV file is
//! picked out of its entries and loaded as a [`TabularDataset`].
//!
//! Ingestors are looked up by file extension through an [`IngestorRegistry`],
//! so new archive formats plug in without touching existing ones:
//!
//! ```no_run
//! use prices_predictor::ingest::{IngestorRegistry, DEFAULT_WORK_DIR};
//! use std::path::Path;
//!
//! let registry = IngestorRegistry::with_defaults();
//! let archive = Path::new("data/archive.zip");
//! let ingested = registry
//!     .ingestor_for(archive)?
//!     .ingest(archive, Path::new(DEFAULT_WORK_DIR))?;
//! println!("{} rows from {}", ingested.dataset.height(), ingested.file_path.display());
//! # Ok::<(), prices_predictor::error::PipelineError>(())
//! ```

pub mod zip_archive;

pub use zip_archive::ZipIngestor;

use crate::dataset::TabularDataset;
use crate::error::{PipelineError, Result};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Directory archives are extracted into unless told otherwise
pub const DEFAULT_WORK_DIR: &str = "artifacts/dataset";

/// Extension of the tabular files looked for inside archives
pub const DATA_FILE_EXTENSION: &str = "csv";

/// Loaded data file together with where it was found
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub dataset: TabularDataset,
    pub file_path: PathBuf,
}

/// One archive format
pub trait DataIngestor: Send + Sync {
    /// Short format name, used in logs
    fn name(&self) -> &str;

    /// Extract `archive_path` into `work_dir` and load its single data file.
    ///
    /// # Errors
    ///
    /// `NoDataFileFound` / `AmbiguousDataFile` when the archive does not hold
    /// exactly one CSV file, plus I/O and parse failures.
    fn ingest(&self, archive_path: &Path, work_dir: &Path) -> Result<IngestedData>;
}

/// Ingestors keyed by lowercase file extension
pub struct IngestorRegistry {
    ingestors: BTreeMap<String, Box<dyn DataIngestor>>,
}

impl IngestorRegistry {
    /// Registry without any format
    pub fn empty() -> Self {
        Self {
            ingestors: BTreeMap::new(),
        }
    }

    /// Registry with the built-in formats (`zip`)
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register("zip", ZipIngestor);
        registry
    }

    /// Add (or replace) the ingestor for an extension.
    pub fn register(&mut self, extension: &str, ingestor: impl DataIngestor + 'static) {
        self.ingestors.insert(
            extension.trim_start_matches('.').to_lowercase(),
            Box::new(ingestor),
        );
    }

    pub fn extensions(&self) -> Vec<&str> {
        self.ingestors.keys().map(String::as_str).collect()
    }

    /// Pick the ingestor matching the archive's extension.
    ///
    /// # Errors
    ///
    /// `UnsupportedFormat` if no ingestor is registered for it.
    pub fn ingestor_for(&self, archive_path: &Path) -> Result<&dyn DataIngestor> {
        let extension = file_extension(archive_path);
        self.ingestors
            .get(&extension)
            .map(Box::as_ref)
            .ok_or_else(|| {
                tracing::error!(
                    "No data ingestor for file with extension '{extension}': {}",
                    archive_path.display()
                );
                PipelineError::UnsupportedFormat(if extension.is_empty() {
                    archive_path.display().to_string()
                } else {
                    extension
                })
            })
    }
}

impl Default for IngestorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Extract an archive with the default registry and load its data file.
///
/// # Errors
///
/// See [`IngestorRegistry::ingestor_for`] and [`DataIngestor::ingest`].
pub fn extract_and_load(archive_path: &Path, work_dir: &Path) -> Result<IngestedData> {
    IngestorRegistry::with_defaults()
        .ingestor_for(archive_path)?
        .ingest(archive_path, work_dir)
}

pub(crate) fn file_extension(path: &Path) -> String {
    path.extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase()
}

pub(crate) fn is_data_file(path: &Path) -> bool {
    file_extension(path) == DATA_FILE_EXTENSION
}

/// Require exactly one candidate; return it resolved under `work_dir`.
///
/// # Errors
///
/// `NoDataFileFound` for zero candidates, `AmbiguousDataFile` for several.
pub fn select_data_file(mut candidates: Vec<PathBuf>, work_dir: &Path) -> Result<PathBuf> {
    candidates.sort();
    match candidates.as_slice() {
        [] => Err(PipelineError::NoDataFileFound(work_dir.to_path_buf())),
        [single] => Ok(work_dir.join(single)),
        _ => Err(PipelineError::AmbiguousDataFile(candidates)),
    }
}

/// Read a CSV file with a header row, inferring column types.
///
/// # Errors
///
/// Fails if the file cannot be read or parsed.
pub fn load_csv(path: &Path) -> Result<TabularDataset> {
    let df = LazyCsvReader::new(path)
        .with_infer_schema_length(Some(10000))
        .with_has_header(true)
        .finish()?
        .collect()?;
    tracing::debug!(
        "Loaded {} rows and {} columns from {}",
        df.height(),
        df.width(),
        path.display()
    );
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeIngestor;

    impl DataIngestor for FakeIngestor {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn ingest(&self, archive_path: &Path, _work_dir: &Path) -> Result<IngestedData> {
            Ok(IngestedData {
                dataset: df!("a" => &[1i64, 2])?,
                file_path: archive_path.to_path_buf(),
            })
        }
    }

    #[test]
    fn test_registry_rejects_unknown_extension() {
        let registry = IngestorRegistry::with_defaults();
        let err = registry
            .ingestor_for(Path::new("data/archive.rar"))
            .err()
            .expect("rar is not registered");
        assert!(matches!(err, PipelineError::UnsupportedFormat(ref ext) if ext == "rar"));
    }

    #[test]
    fn test_registry_matches_case_insensitively() -> Result<()> {
        let registry = IngestorRegistry::with_defaults();
        assert_eq!(registry.ingestor_for(Path::new("DATA.ZIP"))?.name(), "zip");
        Ok(())
    }

    #[test]
    fn test_registry_is_open_for_new_formats() -> Result<()> {
        let mut registry = IngestorRegistry::with_defaults();
        registry.register(".fake", FakeIngestor);
        assert_eq!(registry.extensions(), vec!["fake", "zip"]);

        let path = Path::new("input.fake");
        let ingested = registry.ingestor_for(path)?.ingest(path, Path::new("unused"))?;
        assert_eq!(ingested.dataset.height(), 2);
        Ok(())
    }

    #[test]
    fn test_select_data_file() {
        let dir = Path::new("work");
        assert!(matches!(
            select_data_file(vec![], dir),
            Err(PipelineError::NoDataFileFound(_))
        ));
        assert_eq!(
            select_data_file(vec![PathBuf::from("houses.csv")], dir).expect("single file"),
            PathBuf::from("work/houses.csv")
        );
        assert!(matches!(
            select_data_file(vec![PathBuf::from("b.csv"), PathBuf::from("a.csv")], dir),
            Err(PipelineError::AmbiguousDataFile(ref files)) if files.len() == 2
        ));
    }

    #[test]
    fn test_is_data_file() {
        assert!(is_data_file(Path::new("nested/AmesHousing.CSV")));
        assert!(!is_data_file(Path::new("README.md")));
        assert!(!is_data_file(Path::new("csv")));
    }
}
