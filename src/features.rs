//! Column-wise feature engineering.
//!
//! Every transform keeps row count and row order and only rewrites the
//! selected columns. Statistics (mean, std, min, max) are fitted on the
//! current values of the frame being transformed.

use crate::config::strategy_key;
use crate::dataset::{ColumnSelector, float_chunked, require_column, text_values};
use crate::error::{PipelineError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Feature-engineering strategy descriptor
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum FeaturePolicy {
    /// `log(1 + v)`, defined for `v > -1`
    LogTransform,
    /// `(v - mean) / std` with the population standard deviation
    #[default]
    StandardScale,
    /// Rescale linearly onto `[low, high]`
    MinMaxScale { low: f64, high: f64 },
    /// Drop-first indicator columns for each category
    OneHotEncode,
}

impl FeaturePolicy {
    /// Build a policy from its strategy name. `range` is only read by
    /// min-max scaling and defaults to `(0, 1)`.
    ///
    /// # Errors
    ///
    /// `UnknownStrategy` for an unrecognised name.
    pub fn from_name(name: &str, range: Option<(f64, f64)>) -> Result<Self> {
        match strategy_key(name).as_str() {
            "log" | "log1p" | "logtransform" | "logtransformation" => Ok(Self::LogTransform),
            "standard" | "standardscale" | "standardscaling" | "zscore" => Ok(Self::StandardScale),
            "minmax" | "minmaxscale" | "minmaxscaling" => {
                let (low, high) = range.unwrap_or((0.0, 1.0));
                Ok(Self::MinMaxScale { low, high })
            }
            "onehot" | "onehotencode" | "onehotencoding" => Ok(Self::OneHotEncode),
            _ => Err(PipelineError::UnknownStrategy(name.to_owned())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::LogTransform => "log_transform",
            Self::StandardScale => "standard_scale",
            Self::MinMaxScale { .. } => "min_max_scale",
            Self::OneHotEncode => "one_hot_encode",
        }
    }
}

/// Apply one feature-engineering policy to the selected columns.
///
/// # Errors
///
/// - `ColumnNotFound` / `InvalidParameter` if the selector does not fit `df`
/// - `InvalidTransformInput` for values outside the transform's domain
/// - `DegenerateColumn` when a scaler would divide by zero
pub fn apply(df: &DataFrame, policy: &FeaturePolicy, columns: &ColumnSelector) -> Result<DataFrame> {
    let selected = columns.resolve(df)?;
    tracing::debug!("Applying {} to columns {:?}", policy.name(), selected);

    match policy {
        FeaturePolicy::LogTransform => rewrite_numeric(df, selected, log_transform),
        FeaturePolicy::StandardScale => rewrite_numeric(df, selected, standard_scale),
        FeaturePolicy::MinMaxScale { low, high } => {
            let (low, high) = (*low, *high);
            if !low.is_finite() || !high.is_finite() || low >= high {
                return Err(PipelineError::InvalidParameter(format!(
                    "min-max range must satisfy low < high, got ({low}, {high})"
                )));
            }
            rewrite_numeric(df, selected, |name, values| {
                min_max_scale(name, values, low, high)
            })
        }
        FeaturePolicy::OneHotEncode => one_hot_encode(df, selected),
    }
}

/// Compute every replacement column first, then write them, so a failure in
/// any column leaves nothing half-applied.
fn rewrite_numeric<F>(df: &DataFrame, selected: &[String], transform: F) -> Result<DataFrame>
where
    F: Fn(&str, &Float64Chunked) -> Result<Float64Chunked>,
{
    let mut replacements = Vec::with_capacity(selected.len());
    for name in selected {
        let values = float_chunked(require_column(df, name)?)?;
        let transformed = transform(name, &values)?;
        replacements.push(transformed.with_name(name.as_str().into()).into_series());
    }

    let mut out = df.clone();
    for series in replacements {
        out.with_column(series)?;
    }
    Ok(out)
}

fn log_transform(name: &str, values: &Float64Chunked) -> Result<Float64Chunked> {
    if let Some(v) = values
        .into_iter()
        .flatten()
        .find(|v| !(*v > -1.0 && v.is_finite()))
    {
        return Err(PipelineError::invalid_input(
            name,
            format!("log transform requires values greater than -1, found {v}"),
        ));
    }
    Ok(values.apply_values(f64::ln_1p))
}

fn standard_scale(name: &str, values: &Float64Chunked) -> Result<Float64Chunked> {
    // population std, nulls excluded from both statistics
    let (Some(mean), Some(std)) = (values.mean(), values.std(0)) else {
        return Err(PipelineError::DegenerateColumn(name.to_owned()));
    };
    if std <= 0.0 || !std.is_finite() {
        return Err(PipelineError::DegenerateColumn(name.to_owned()));
    }
    Ok((values - mean) / std)
}

fn min_max_scale(name: &str, values: &Float64Chunked, low: f64, high: f64) -> Result<Float64Chunked> {
    let (Some(min), Some(max)) = (values.min(), values.max()) else {
        return Err(PipelineError::DegenerateColumn(name.to_owned()));
    };
    let spread = max - min;
    if spread <= 0.0 || !spread.is_finite() {
        return Err(PipelineError::DegenerateColumn(name.to_owned()));
    }
    Ok((values - min) * ((high - low) / spread) + low)
}

/// Replace each selected column with `k - 1` indicator columns.
///
/// Remaining columns keep their order; indicators are appended grouped by
/// source column, categories in the column's own sort order (numeric for
/// numbers), first category dropped.
fn one_hot_encode(df: &DataFrame, selected: &[String]) -> Result<DataFrame> {
    let remaining: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.as_str().to_owned())
        .filter(|name| !selected.contains(name))
        .collect();

    let mut taken: HashSet<String> = remaining.iter().cloned().collect();
    let mut indicators = Vec::new();

    for name in selected {
        let series = require_column(df, name)?;
        if series.null_count() > 0 {
            return Err(PipelineError::invalid_input(
                name,
                format!(
                    "{} missing values cannot be one-hot encoded",
                    series.null_count()
                ),
            ));
        }
        let labels: Vec<String> = text_values(series)?.into_iter().flatten().collect();
        let distinct = series.unique()?.sort(SortOptions::default())?;
        let categories: Vec<String> = text_values(&distinct)?.into_iter().flatten().collect();

        for category in categories.iter().skip(1) {
            let indicator = format!("{name}_{category}");
            if !taken.insert(indicator.clone()) {
                return Err(PipelineError::InvalidParameter(format!(
                    "one-hot column '{indicator}' collides with an existing column"
                )));
            }
            let values: Vec<f64> = labels
                .iter()
                .map(|label| if label == category { 1.0 } else { 0.0 })
                .collect();
            indicators.push(Series::new(indicator.into(), values));
        }
    }

    let mut out = df.select(remaining)?;
    for series in indicators {
        out.with_column(series)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::float_values;

    fn floats(df: &DataFrame, name: &str) -> Vec<f64> {
        float_values(require_column(df, name).expect("column exists"))
            .expect("numeric column")
            .into_iter()
            .flatten()
            .collect()
    }

    fn approx(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    fn approx_with_gaps(a: &[Option<f64>], b: &[Option<f64>]) -> bool {
        a.len() == b.len()
            && a.iter().zip(b).all(|pair| match pair {
                (Some(x), Some(y)) => (x - y).abs() < 1e-9,
                (None, None) => true,
                _ => false,
            })
    }

    #[test]
    fn test_log_transform() -> Result<()> {
        let df = df!(
            "Price" => &[0.0, 1.0, 99.0],
            "Area" => &[10i64, 20, 30]
        )?;
        let out = apply(&df, &FeaturePolicy::LogTransform, &ColumnSelector::new(["Price"]))?;

        assert!(approx(
            &floats(&out, "Price"),
            &[0.0, 2.0_f64.ln(), 100.0_f64.ln()]
        ));
        // unselected column untouched
        assert_eq!(floats(&out, "Area"), vec![10.0, 20.0, 30.0]);
        assert_eq!(out.get_column_names(), df.get_column_names());
        Ok(())
    }

    #[test]
    fn test_log_transform_rejects_out_of_domain() -> Result<()> {
        let df = df!("Price" => &[3.0, -1.0, 5.0])?;
        let err = apply(&df, &FeaturePolicy::LogTransform, &ColumnSelector::new(["Price"]))
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidTransformInput { ref column, .. } if column == "Price"));

        let df = df!("Price" => &[-2.5])?;
        assert!(matches!(
            apply(&df, &FeaturePolicy::LogTransform, &ColumnSelector::new(["Price"])),
            Err(PipelineError::InvalidTransformInput { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_log_transform_keeps_missing() -> Result<()> {
        let df = df!("Price" => &[Some(1.0), None])?;
        let out = apply(&df, &FeaturePolicy::LogTransform, &ColumnSelector::new(["Price"]))?;
        assert_eq!(require_column(&out, "Price")?.null_count(), 1);
        Ok(())
    }

    #[test]
    fn test_standard_scale() -> Result<()> {
        let df = df!("Area" => &[1.0, 2.0, 3.0, 4.0])?;
        let out = apply(&df, &FeaturePolicy::StandardScale, &ColumnSelector::new(["Area"]))?;
        let values = floats(&out, "Area");

        let std = 1.25_f64.sqrt();
        assert!(approx(
            &values,
            &[-1.5 / std, -0.5 / std, 0.5 / std, 1.5 / std]
        ));
        let mean: f64 = values.iter().sum::<f64>() / 4.0;
        assert!(mean.abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_standard_scale_degenerate() -> Result<()> {
        let df = df!("Area" => &[7.0, 7.0, 7.0])?;
        assert!(matches!(
            apply(&df, &FeaturePolicy::StandardScale, &ColumnSelector::new(["Area"])),
            Err(PipelineError::DegenerateColumn(_))
        ));
        Ok(())
    }

    #[test]
    fn test_standard_scale_keeps_missing() -> Result<()> {
        let df = df!("Area" => &[Some(1.0), None, Some(3.0)])?;
        let out = apply(&df, &FeaturePolicy::StandardScale, &ColumnSelector::new(["Area"]))?;
        let area = float_values(require_column(&out, "Area")?)?;
        // mean 2 and std 1 over the two present values
        assert!(approx_with_gaps(&area, &[Some(-1.0), None, Some(1.0)]));
        Ok(())
    }

    #[test]
    fn test_min_max_scale_keeps_missing() -> Result<()> {
        let df = df!("Area" => &[Some(10i64), None, Some(30), Some(20)])?;
        let policy = FeaturePolicy::MinMaxScale {
            low: 0.0,
            high: 1.0,
        };
        let out = apply(&df, &policy, &ColumnSelector::new(["Area"]))?;
        let area = float_values(require_column(&out, "Area")?)?;
        assert!(approx_with_gaps(&area, &[Some(0.0), None, Some(1.0), Some(0.5)]));
        Ok(())
    }

    #[test]
    fn test_all_missing_column_is_degenerate() -> Result<()> {
        let df = df!("Area" => &[None::<f64>, None])?;
        let selector = ColumnSelector::new(["Area"]);
        assert!(matches!(
            apply(&df, &FeaturePolicy::StandardScale, &selector),
            Err(PipelineError::DegenerateColumn(ref column)) if column == "Area"
        ));
        let unit = FeaturePolicy::MinMaxScale {
            low: 0.0,
            high: 1.0,
        };
        assert!(matches!(
            apply(&df, &unit, &selector),
            Err(PipelineError::DegenerateColumn(ref column)) if column == "Area"
        ));
        Ok(())
    }

    #[test]
    fn test_min_max_scale_range() -> Result<()> {
        let df = df!("Area" => &[10i64, 20, 30])?;
        let policy = FeaturePolicy::MinMaxScale {
            low: -1.0,
            high: 1.0,
        };
        let out = apply(&df, &policy, &ColumnSelector::new(["Area"]))?;
        assert!(approx(&floats(&out, "Area"), &[-1.0, 0.0, 1.0]));
        Ok(())
    }

    #[test]
    fn test_min_max_scale_invalid() -> Result<()> {
        let df = df!("Area" => &[5.0, 5.0])?;
        let unit = FeaturePolicy::MinMaxScale {
            low: 0.0,
            high: 1.0,
        };
        assert!(matches!(
            apply(&df, &unit, &ColumnSelector::new(["Area"])),
            Err(PipelineError::DegenerateColumn(_))
        ));

        let inverted = FeaturePolicy::MinMaxScale {
            low: 1.0,
            high: 0.0,
        };
        assert!(matches!(
            apply(&df, &inverted, &ColumnSelector::new(["Area"])),
            Err(PipelineError::InvalidParameter(_))
        ));
        Ok(())
    }

    #[test]
    fn test_one_hot_drop_first() -> Result<()> {
        let df = df!(
            "Zone" => &["RM", "RL", "FV", "RL"],
            "Area" => &[1.0, 2.0, 3.0, 4.0],
            "Street" => &["Pave", "Grvl", "Pave", "Pave"]
        )?;
        let out = apply(
            &df,
            &FeaturePolicy::OneHotEncode,
            &ColumnSelector::new(["Zone", "Street"]),
        )?;

        let names: Vec<String> = out
            .get_column_names()
            .iter()
            .map(|n| n.as_str().to_owned())
            .collect();
        // 3 zones -> 2 indicators, 2 streets -> 1 indicator
        assert_eq!(names, vec!["Area", "Zone_RL", "Zone_RM", "Street_Pave"]);
        assert_eq!(out.height(), 4);
        assert_eq!(floats(&out, "Zone_RL"), vec![0.0, 1.0, 0.0, 1.0]);
        assert_eq!(floats(&out, "Zone_RM"), vec![1.0, 0.0, 0.0, 0.0]);
        assert_eq!(floats(&out, "Street_Pave"), vec![1.0, 0.0, 1.0, 1.0]);
        assert_eq!(floats(&out, "Area"), vec![1.0, 2.0, 3.0, 4.0]);
        Ok(())
    }

    #[test]
    fn test_one_hot_orders_integer_categories() -> Result<()> {
        let df = df!("SubClass" => &[20i64, 120, 60, 20])?;
        let out = apply(&df, &FeaturePolicy::OneHotEncode, &ColumnSelector::new(["SubClass"]))?;

        let names: Vec<&str> = out.get_column_names().iter().map(|n| n.as_str()).collect();
        // 20 is the smallest class and is dropped
        assert_eq!(names, ["SubClass_60", "SubClass_120"]);
        assert_eq!(floats(&out, "SubClass_60"), vec![0.0, 0.0, 1.0, 0.0]);
        assert_eq!(floats(&out, "SubClass_120"), vec![0.0, 1.0, 0.0, 0.0]);
        Ok(())
    }

    #[test]
    fn test_one_hot_rejects_missing() -> Result<()> {
        let df = df!("Zone" => &[Some("RM"), None])?;
        assert!(matches!(
            apply(&df, &FeaturePolicy::OneHotEncode, &ColumnSelector::new(["Zone"])),
            Err(PipelineError::InvalidTransformInput { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_one_hot_name_collision() -> Result<()> {
        let df = df!(
            "Zone" => &["A", "B"],
            "Zone_B" => &[1.0, 2.0]
        )?;
        assert!(matches!(
            apply(&df, &FeaturePolicy::OneHotEncode, &ColumnSelector::new(["Zone"])),
            Err(PipelineError::InvalidParameter(_))
        ));
        Ok(())
    }

    #[test]
    fn test_unknown_column() -> Result<()> {
        let df = df!("Area" => &[1.0, 2.0])?;
        assert!(matches!(
            apply(&df, &FeaturePolicy::LogTransform, &ColumnSelector::new(["Price"])),
            Err(PipelineError::ColumnNotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn test_from_name() {
        assert_eq!(
            FeaturePolicy::from_name("LogTransformation", None).expect("known"),
            FeaturePolicy::LogTransform
        );
        assert_eq!(
            FeaturePolicy::from_name("min_max_scaling", Some((0.0, 10.0))).expect("known"),
            FeaturePolicy::MinMaxScale {
                low: 0.0,
                high: 10.0
            }
        );
        assert!(matches!(
            FeaturePolicy::from_name("polynomial", None),
            Err(PipelineError::UnknownStrategy(_))
        ));
    }
}
