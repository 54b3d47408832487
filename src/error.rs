//! Error taxonomy for the data-preparation pipeline.
//!
//! Every stage (ingestion, missing values, feature engineering, splitting)
//! returns [`Result<T>`], whose error side is [`PipelineError`]. All variants
//! are terminal for the current run: the orchestrator never retries, it
//! records the first failure and stops.
//!
//! ```
//! use prices_predictor::error::PipelineError;
//!
//! fn describe(err: &PipelineError) -> &'static str {
//!     match err {
//!         PipelineError::ColumnNotFound(_) => "check the column names",
//!         PipelineError::UnknownStrategy(_) => "check the strategy names",
//!         _ => "see the error message",
//!     }
//! }
//! ```
//!
//! Library glue (I/O, polars, zip, JSON) converts through `From`, so the `?`
//! operator works across those boundaries.

use std::fmt;
use std::path::PathBuf;

/// Main error type for pipeline operations.
#[derive(Debug)]
pub enum PipelineError {
    /// No ingestor is registered for the archive extension
    UnsupportedFormat(String),

    /// The archive contained no tabular data file
    NoDataFileFound(PathBuf),

    /// The archive contained more than one tabular data file
    AmbiguousDataFile(Vec<PathBuf>),

    /// A referenced column does not exist in the dataset
    ColumnNotFound(String),

    /// A strategy parameter is out of range or malformed
    InvalidParameter(String),

    /// Column values outside the domain of a transform
    InvalidTransformInput { column: String, reason: String },

    /// A column whose spread is zero (or empty) where a scale is required
    DegenerateColumn(String),

    /// A strategy name that maps to no known algorithm
    UnknownStrategy(String),

    /// I/O errors (archive access, extraction)
    Io(std::io::Error),

    /// Archive decoding errors
    Archive(String),

    /// Polars processing errors (CSV parsing, frame operations)
    DataProcessing(String),

    /// Configuration parsing errors
    Config(String),
}

impl PipelineError {
    /// Stable short name of the error category, used in failure reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat(_) => "UnsupportedFormat",
            Self::NoDataFileFound(_) => "NoDataFileFound",
            Self::AmbiguousDataFile(_) => "AmbiguousDataFile",
            Self::ColumnNotFound(_) => "ColumnNotFound",
            Self::InvalidParameter(_) => "InvalidParameter",
            Self::InvalidTransformInput { .. } => "InvalidTransformInput",
            Self::DegenerateColumn(_) => "DegenerateColumn",
            Self::UnknownStrategy(_) => "UnknownStrategy",
            Self::Io(_) => "Io",
            Self::Archive(_) => "Archive",
            Self::DataProcessing(_) => "DataProcessing",
            Self::Config(_) => "Config",
        }
    }

    pub(crate) fn invalid_input(column: &str, reason: impl Into<String>) -> Self {
        Self::InvalidTransformInput {
            column: column.to_owned(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedFormat(ext) => write!(f, "Unsupported archive format: {ext}"),
            Self::NoDataFileFound(dir) => {
                write!(f, "No CSV data file found in archive (extracted to {})", dir.display())
            }
            Self::AmbiguousDataFile(files) => {
                let names = files
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "More than one CSV data file in archive: {names}")
            }
            Self::ColumnNotFound(name) => write!(f, "Column not found: {name}"),
            Self::InvalidParameter(msg) => write!(f, "Invalid parameter: {msg}"),
            Self::InvalidTransformInput { column, reason } => {
                write!(f, "Invalid input in column '{column}': {reason}")
            }
            Self::DegenerateColumn(name) => {
                write!(f, "Column '{name}' has no spread and cannot be scaled")
            }
            Self::UnknownStrategy(name) => write!(f, "Unknown strategy: {name}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Archive(msg) => write!(f, "Archive error: {msg}"),
            Self::DataProcessing(msg) => write!(f, "Data processing error: {msg}"),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<polars::error::PolarsError> for PipelineError {
    fn from(err: polars::error::PolarsError) -> Self {
        Self::DataProcessing(err.to_string())
    }
}

impl From<zip::result::ZipError> for PipelineError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Self::Io(e),
            other => Self::Archive(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("JSON error: {err}"))
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
