//! Linear regression on a prepared split.
//!
//! Downstream of the pipeline: takes the training fragments, encodes them
//! into a dense matrix and fits an ordinary least squares model with
//! `linfa-linear`. The fitted model is a self-contained JSON artifact that
//! remembers how to encode new rows.

use crate::dataset::{float_chunked, float_values, is_numeric_dtype, modal_value, text_values};
use crate::pipeline::PipelineOutput;
use anyhow::{Context as _, Result, anyhow, bail};
use chrono::{DateTime, Utc};
use linfa::prelude::*;
use linfa_linear::LinearRegression;
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How one input column becomes model features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureEncoding {
    /// Used as is; missing values take the training mean
    Numeric { column: String, fill: f64 },
    /// Indicator per category except the first. Missing values take the
    /// training mode; unseen values encode as all zeros.
    Categorical {
        column: String,
        categories: Vec<String>,
        #[serde(default)]
        fill: Option<String>,
    },
}

impl FeatureEncoding {
    pub fn column(&self) -> &str {
        match self {
            Self::Numeric { column, .. } | Self::Categorical { column, .. } => column,
        }
    }

    fn feature_names(&self) -> Vec<String> {
        match self {
            Self::Numeric { column, .. } => vec![column.clone()],
            Self::Categorical {
                column, categories, ..
            } => categories
                .iter()
                .skip(1)
                .map(|category| format!("{column}_{category}"))
                .collect(),
        }
    }

    fn width(&self) -> usize {
        match self {
            Self::Numeric { .. } => 1,
            Self::Categorical { categories, .. } => categories.len().saturating_sub(1),
        }
    }

    /// Feature values of this column, one `Vec` per row
    fn encode(&self, series: &Series) -> Result<Vec<Vec<f64>>> {
        match self {
            Self::Numeric { column, fill } => {
                let values = float_values(&numeric_view(series)?)
                    .with_context(|| format!("Column '{column}' must be numeric"))?;
                Ok(values
                    .into_iter()
                    .map(|v| vec![v.unwrap_or(*fill)])
                    .collect())
            }
            Self::Categorical {
                categories, fill, ..
            } => {
                let values = text_values(series)?;
                Ok(values
                    .into_iter()
                    .map(|value| {
                        let value = value.or_else(|| fill.clone());
                        categories
                            .iter()
                            .skip(1)
                            .map(|category| {
                                if value.as_deref() == Some(category.as_str()) {
                                    1.0
                                } else {
                                    0.0
                                }
                            })
                            .collect()
                    })
                    .collect())
            }
        }
    }
}

/// Fitted model plus the encodings needed to score new rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel {
    pub target: String,
    pub encodings: Vec<FeatureEncoding>,
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    pub trained_rows: usize,
    pub trained_at: DateTime<Utc>,
}

/// Goodness of fit on a labelled set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub r2: f64,
    pub mse: f64,
    pub rows: usize,
}

/// Fit a linear regression of `y` on every column of `x`.
///
/// Numeric columns are mean-imputed with training means, text columns are
/// mode-imputed and one-hot encoded over the categories seen here.
pub fn train_linear_regression(x: &DataFrame, y: &Series) -> Result<TrainedModel> {
    if x.height() != y.len() {
        bail!(
            "Feature rows ({}) and target rows ({}) differ",
            x.height(),
            y.len()
        );
    }
    if y.null_count() > 0 {
        bail!(
            "Target column '{}' has {} missing values; clean it before training",
            y.name(),
            y.null_count()
        );
    }
    if x.height() == 0 {
        bail!("Cannot train on an empty dataset");
    }

    let encodings = x
        .get_columns()
        .iter()
        .map(|column| fit_encoding(column.as_materialized_series()))
        .collect::<Result<Vec<_>>>()?;
    let feature_names: Vec<String> = encodings
        .iter()
        .flat_map(FeatureEncoding::feature_names)
        .collect();
    if feature_names.is_empty() {
        bail!("No feature columns available for training");
    }

    let matrix = encode_matrix(&encodings, x)?;
    let targets: Array1<f64> = float_values(y)
        .with_context(|| format!("Target column '{}' must be numeric", y.name()))?
        .into_iter()
        .flatten()
        .collect();

    let dataset = Dataset::new(matrix, targets);
    let model = LinearRegression::default()
        .fit(&dataset)
        .map_err(|e| anyhow!("Linear Regression training failed: {e}"))?;

    tracing::info!(
        "Trained linear regression on {} rows, {} features",
        x.height(),
        feature_names.len()
    );

    Ok(TrainedModel {
        target: y.name().to_string(),
        encodings,
        feature_names,
        coefficients: model.params().to_vec(),
        intercept: model.intercept(),
        trained_rows: x.height(),
        trained_at: Utc::now(),
    })
}

impl TrainedModel {
    /// Score every row of `x`. Extra columns are ignored.
    pub fn predict(&self, x: &DataFrame) -> Result<Vec<f64>> {
        let matrix = encode_matrix(&self.encodings, x)?;
        let coefficients = Array1::from(self.coefficients.clone());
        if matrix.ncols() != coefficients.len() {
            bail!(
                "Model has {} coefficients but the input encodes to {} features",
                coefficients.len(),
                matrix.ncols()
            );
        }
        Ok((matrix.dot(&coefficients) + self.intercept).to_vec())
    }

    pub fn evaluate(&self, x: &DataFrame, y: &Series) -> Result<ModelMetrics> {
        let predictions = self.predict(x)?;
        let actual: Vec<f64> = float_values(y)?
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| anyhow!("Target column '{}' has missing values", y.name()))?;
        if actual.len() != predictions.len() {
            bail!("Feature rows and target rows differ");
        }
        if actual.is_empty() {
            bail!("Cannot evaluate on an empty dataset");
        }

        let n = actual.len() as f64;
        let mean = actual.iter().sum::<f64>() / n;
        let ss_res: f64 = actual
            .iter()
            .zip(&predictions)
            .map(|(a, p)| (a - p).powi(2))
            .sum();
        let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
        let r2 = if ss_tot > 0.0 {
            1.0 - ss_res / ss_tot
        } else if ss_res == 0.0 {
            1.0
        } else {
            0.0
        };

        Ok(ModelMetrics {
            r2,
            mse: ss_res / n,
            rows: actual.len(),
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write model to {}", path.display()))?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model from {}", path.display()))?;
        serde_json::from_str(&json).context("Model file is not a valid model artifact")
    }
}

/// Train on the training fragments of a run and score the test fragments.
pub fn train_and_evaluate(output: &PipelineOutput) -> Result<(TrainedModel, ModelMetrics)> {
    let split = &output.split;
    let model = train_linear_regression(&split.x_train, &split.y_train)?;
    let metrics = model.evaluate(&split.x_test, &split.y_test)?;
    Ok((model, metrics))
}

fn numeric_view(series: &Series) -> Result<Series> {
    if series.dtype().is_bool() {
        return Ok(series.cast(&DataType::Float64)?);
    }
    Ok(series.clone())
}

fn fit_encoding(series: &Series) -> Result<FeatureEncoding> {
    let column = series.name().to_string();
    if is_numeric_dtype(series.dtype()) || series.dtype().is_bool() {
        let fill = float_chunked(&numeric_view(series)?)?.mean().unwrap_or(0.0);
        return Ok(FeatureEncoding::Numeric { column, fill });
    }

    let distinct = series.drop_nulls().unique()?.sort(SortOptions::default())?;
    let categories: Vec<String> = text_values(&distinct)?.into_iter().flatten().collect();
    let fill = text_values(&modal_value(series)?)?.into_iter().flatten().next();
    Ok(FeatureEncoding::Categorical {
        column,
        categories,
        fill,
    })
}

fn encode_matrix(encodings: &[FeatureEncoding], x: &DataFrame) -> Result<Array2<f64>> {
    let rows = x.height();
    let width: usize = encodings.iter().map(FeatureEncoding::width).sum();
    let mut data = vec![Vec::with_capacity(width); rows];

    for encoding in encodings {
        let series = x
            .column(encoding.column())
            .with_context(|| format!("Input is missing feature column '{}'", encoding.column()))?
            .as_materialized_series();
        for (row, features) in data.iter_mut().zip(encoding.encode(series)?) {
            row.extend(features);
        }
    }

    let flat: Vec<f64> = data.into_iter().flatten().collect();
    Array2::from_shape_vec((rows, width), flat).context("Failed to build feature matrix")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn houses() -> (DataFrame, Series) {
        let area: Vec<f64> = (0..12).map(|i| f64::from(i) * 1.5).collect();
        let zone: Vec<&str> = (0..12).map(|i| if i % 3 == 0 { "B" } else { "A" }).collect();
        let price: Vec<f64> = area
            .iter()
            .zip(&zone)
            .map(|(a, z)| 2.0 * a + 3.0 + if *z == "B" { 5.0 } else { 0.0 })
            .collect();
        let x = df!("Area" => area, "Zone" => zone).expect("valid frame");
        (x, Series::new("Price".into(), price))
    }

    #[test]
    fn test_recovers_exact_linear_relationship() -> Result<()> {
        let (x, y) = houses();
        let model = train_linear_regression(&x, &y)?;

        assert_eq!(model.feature_names, ["Area", "Zone_B"]);
        assert!((model.coefficients[0] - 2.0).abs() < 1e-6);
        assert!((model.coefficients[1] - 5.0).abs() < 1e-6);
        assert!((model.intercept - 3.0).abs() < 1e-6);

        let metrics = model.evaluate(&x, &y)?;
        assert!(metrics.r2 > 0.999_999);
        assert!(metrics.mse < 1e-9);
        assert_eq!(metrics.rows, 12);
        Ok(())
    }

    #[test]
    fn test_predict_imputes_and_ignores_unseen_categories() -> Result<()> {
        let (x, y) = houses();
        let model = train_linear_regression(&x, &y)?;

        let fresh = df!(
            "Zone" => &[Some("C"), None],
            "Area" => &[Some(10.0), None]
        )?;
        let predictions = model.predict(&fresh)?;
        assert!((predictions[0] - 23.0).abs() < 1e-6);

        let mean_area = 8.25; // mean of 0, 1.5, ..., 16.5
        assert!((predictions[1] - (2.0 * mean_area + 3.0)).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_missing_category_takes_training_mode() -> Result<()> {
        // "B" is the most frequent zone but "A" is the dropped first category
        let area: Vec<f64> = (0..12).map(|i| f64::from(i) * 1.5).collect();
        let zone: Vec<&str> = (0..12).map(|i| if i % 3 == 0 { "A" } else { "B" }).collect();
        let price: Vec<f64> = area
            .iter()
            .zip(&zone)
            .map(|(a, z)| 2.0 * a + 3.0 + if *z == "B" { 5.0 } else { 0.0 })
            .collect();
        let x = df!("Area" => area, "Zone" => zone)?;
        let model = train_linear_regression(&x, &Series::new("Price".into(), price))?;

        let fresh = df!(
            "Area" => &[10.0, 10.0, 10.0],
            "Zone" => &[Some("A"), Some("B"), None]
        )?;
        let predictions = model.predict(&fresh)?;
        assert!((predictions[0] - 23.0).abs() < 1e-6);
        assert!((predictions[1] - 28.0).abs() < 1e-6);
        assert!((predictions[2] - predictions[1]).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_rejects_missing_target() {
        let (x, _) = houses();
        let mut price: Vec<Option<f64>> = vec![Some(1.0); 12];
        price[4] = None;
        let y = Series::new("Price".into(), price);
        let err = train_linear_regression(&x, &y).unwrap_err();
        assert!(err.to_string().contains("missing values"));
    }

    #[test]
    fn test_predict_requires_feature_columns() -> Result<()> {
        let (x, y) = houses();
        let model = train_linear_regression(&x, &y)?;
        let err = model.predict(&df!("Area" => &[1.0])?).unwrap_err();
        assert!(err.to_string().contains("Zone"));
        Ok(())
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let (x, y) = houses();
        let model = train_linear_regression(&x, &y)?;
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("models").join("model.json");

        model.save(&path)?;
        let loaded = TrainedModel::load(&path)?;
        assert_eq!(loaded.encodings, model.encodings);
        assert_eq!(loaded.predict(&x)?, model.predict(&x)?);
        Ok(())
    }
}
