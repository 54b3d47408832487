//! Pipeline configuration file.
//!
//! A JSON document names the archive, the strategy for each stage and its
//! parameters. Strategy names are resolved into the closed policy types
//! only when [`PipelineConfig::params`] is called, so an unknown name fails
//! loudly at that boundary instead of being silently defaulted.
//!
//! ```json
//! {
//!   "version": "0.1",
//!   "archive_path": "data/archive.zip",
//!   "work_dir": "artifacts/dataset",
//!   "missing_values": { "strategy": "mean" },
//!   "feature_engineering": { "strategy": "log", "columns": ["Gr Liv Area", "SalePrice"] },
//!   "target_column": "SalePrice",
//!   "split": { "strategy": "simple", "test_fraction": 0.2, "seed": 42 },
//!   "training": { "enabled": true, "model_path": "artifacts/model.json" }
//! }
//! ```

use crate::dataset::ColumnSelector;
use crate::error::{PipelineError, Result};
use crate::features::FeaturePolicy;
use crate::ingest::DEFAULT_WORK_DIR;
use crate::missing::{DropAxis, FillValue, MissingValuePolicy};
use crate::pipeline::PipelineParams;
use crate::split::{DEFAULT_SEED, DEFAULT_TEST_FRACTION, SplitPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Current configuration format version
pub const CONFIG_VERSION: &str = "0.1";

/// Normalise a strategy name for matching: lowercase ASCII alphanumerics
/// only, so `"MinMaxScaling"`, `"min_max_scaling"` and `"min-max"` agree.
pub fn strategy_key(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Format version for future migrations
    #[serde(default = "default_version")]
    pub version: String,

    /// Archive holding the raw data file
    pub archive_path: PathBuf,

    /// Directory the archive is extracted into
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    #[serde(default)]
    pub missing_values: MissingValuesConfig,

    pub feature_engineering: FeatureEngineeringConfig,

    /// Column to predict
    pub target_column: String,

    #[serde(default)]
    pub split: SplitConfig,

    #[serde(default)]
    pub training: TrainingConfig,
}

/// Missing-value stage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissingValuesConfig {
    /// `drop`, `mean`, `median`, `mode` or `constant`
    #[serde(default = "default_missing_strategy")]
    pub strategy: String,

    /// Axis for `drop`
    #[serde(default)]
    pub axis: DropAxis,

    /// Minimum present values for `drop`; absent means all
    #[serde(default)]
    pub min_non_null: Option<usize>,

    /// Value for `constant`
    #[serde(default)]
    pub fill_value: Option<FillValue>,
}

impl Default for MissingValuesConfig {
    fn default() -> Self {
        Self {
            strategy: default_missing_strategy(),
            axis: DropAxis::Rows,
            min_non_null: None,
            fill_value: None,
        }
    }
}

/// Feature-engineering stage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureEngineeringConfig {
    /// `log`, `standard_scaling`, `min_max_scaling` or `one_hot_encoding`
    pub strategy: String,

    /// Columns to transform
    pub columns: Vec<String>,

    /// Target range for `min_max_scaling`
    #[serde(default)]
    pub range: Option<(f64, f64)>,
}

/// Split stage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    #[serde(default = "default_split_strategy")]
    pub strategy: String,

    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,

    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            strategy: default_split_strategy(),
            test_fraction: default_test_fraction(),
            seed: default_seed(),
        }
    }
}

/// Optional model-building step after the split
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Where to write the trained model artifact
    #[serde(default)]
    pub model_path: Option<PathBuf>,
}

impl PipelineConfig {
    /// Minimal configuration; feature engineering defaults to log-transforming
    /// the target.
    pub fn new(archive_path: impl Into<PathBuf>, target_column: impl Into<String>) -> Self {
        let target_column = target_column.into();
        Self {
            version: default_version(),
            archive_path: archive_path.into(),
            work_dir: default_work_dir(),
            missing_values: MissingValuesConfig::default(),
            feature_engineering: FeatureEngineeringConfig {
                strategy: "log".to_owned(),
                columns: vec![target_column.clone()],
                range: None,
            },
            target_column,
            split: SplitConfig::default(),
            training: TrainingConfig::default(),
        }
    }

    /// Starting point written by `init-config`
    pub fn template() -> Self {
        let mut config = Self::new("data/archive.zip", "SalePrice");
        config.feature_engineering.columns = vec!["Gr Liv Area".to_owned(), "SalePrice".to_owned()];
        config.training = TrainingConfig {
            enabled: true,
            model_path: Some(PathBuf::from("artifacts/model.json")),
        };
        config
    }

    /// Load a configuration from a JSON file
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not valid configuration JSON.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Parse a configuration from a JSON string
    ///
    /// # Errors
    ///
    /// `Config` if the JSON does not match the configuration schema.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// # Errors
    ///
    /// Fails if serialisation or the write fails.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = self.to_json()?;
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Fails if serialisation fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Resolve strategy names into the policies the pipeline runs with.
    ///
    /// # Errors
    ///
    /// `Config` for an unsupported version, `UnknownStrategy` for any
    /// unrecognised strategy name, `InvalidParameter` for missing parameters.
    pub fn params(&self) -> Result<PipelineParams> {
        if self.version != CONFIG_VERSION {
            return Err(PipelineError::Config(format!(
                "unsupported config version '{}', expected '{CONFIG_VERSION}'",
                self.version
            )));
        }

        let missing = &self.missing_values;
        let features = &self.feature_engineering;
        Ok(PipelineParams {
            missing_policy: MissingValuePolicy::from_name(
                &missing.strategy,
                missing.axis,
                missing.min_non_null,
                missing.fill_value.clone(),
            )?,
            feature_policy: FeaturePolicy::from_name(&features.strategy, features.range)?,
            feature_columns: ColumnSelector::new(features.columns.iter().cloned()),
            target_column: self.target_column.clone(),
            split_policy: SplitPolicy::from_name(
                &self.split.strategy,
                self.split.test_fraction,
                self.split.seed,
            )?,
        })
    }
}

// Default value functions
fn default_version() -> String {
    CONFIG_VERSION.to_owned()
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(DEFAULT_WORK_DIR)
}

fn default_missing_strategy() -> String {
    "mean".to_owned()
}

fn default_split_strategy() -> String {
    "simple".to_owned()
}

fn default_test_fraction() -> f64 {
    DEFAULT_TEST_FRACTION
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::missing::FillMethod;

    #[test]
    fn test_strategy_key() {
        assert_eq!(strategy_key("MinMaxScaling"), "minmaxscaling");
        assert_eq!(strategy_key("min_max-scaling "), "minmaxscaling");
    }

    #[test]
    fn test_config_round_trip() -> Result<()> {
        let config = PipelineConfig::template();
        let json = config.to_json()?;
        assert!(json.contains("\"target_column\": \"SalePrice\""));

        let parsed = PipelineConfig::from_json(&json)?;
        assert_eq!(parsed.feature_engineering.columns, ["Gr Liv Area", "SalePrice"]);
        assert!(parsed.training.enabled);
        Ok(())
    }

    #[test]
    fn test_minimal_json_uses_defaults() -> Result<()> {
        let json = r#"{
            "archive_path": "data/archive.zip",
            "feature_engineering": { "strategy": "LogTransformation", "columns": ["Price"] },
            "target_column": "Price"
        }"#;
        let config = PipelineConfig::from_json(json)?;
        assert_eq!(config.work_dir, PathBuf::from(DEFAULT_WORK_DIR));

        let params = config.params()?;
        assert_eq!(
            params.missing_policy,
            MissingValuePolicy::Fill {
                method: FillMethod::Mean
            }
        );
        assert_eq!(params.feature_policy, FeaturePolicy::LogTransform);
        assert_eq!(params.split_policy, SplitPolicy::default());
        Ok(())
    }

    #[test]
    fn test_constant_fill_value_parses() -> Result<()> {
        let json = r#"{
            "archive_path": "a.zip",
            "missing_values": { "strategy": "constant", "fill_value": "None" },
            "feature_engineering": { "strategy": "onehot", "columns": ["Zone"] },
            "target_column": "Price"
        }"#;
        let params = PipelineConfig::from_json(json)?.params()?;
        assert_eq!(
            params.missing_policy,
            MissingValuePolicy::Fill {
                method: FillMethod::Constant(FillValue::Text("None".to_owned()))
            }
        );
        Ok(())
    }

    #[test]
    fn test_unknown_strategy_fails_loudly() {
        let mut config = PipelineConfig::new("a.zip", "Price");
        config.missing_values.strategy = "interpolate".to_owned();
        assert!(matches!(
            config.params(),
            Err(PipelineError::UnknownStrategy(ref s)) if s == "interpolate"
        ));

        let mut config = PipelineConfig::new("a.zip", "Price");
        config.feature_engineering.strategy = "pca".to_owned();
        assert!(matches!(config.params(), Err(PipelineError::UnknownStrategy(_))));

        let mut config = PipelineConfig::new("a.zip", "Price");
        config.split.strategy = "stratified".to_owned();
        assert!(matches!(config.params(), Err(PipelineError::UnknownStrategy(_))));
    }

    #[test]
    fn test_version_mismatch() {
        let mut config = PipelineConfig::new("a.zip", "Price");
        config.version = "9.9".to_owned();
        assert!(matches!(config.params(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_to_file_and_back() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("pipeline.json");
        PipelineConfig::template().to_file(&path)?;
        let loaded = PipelineConfig::from_file(&path)?;
        assert_eq!(loaded.target_column, "SalePrice");
        Ok(())
    }
}
