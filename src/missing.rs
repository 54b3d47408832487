//! Missing-value handling.
//!
//! A [`MissingValuePolicy`] either drops incomplete rows/columns or fills the
//! gaps. [`handle`] never touches its input; it returns a new frame.

use crate::config::strategy_key;
use crate::dataset::is_numeric_dtype;
use crate::error::{PipelineError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Axis along which incomplete entries are dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropAxis {
    #[default]
    Rows,
    Columns,
}

/// Constant used by [`FillMethod::Constant`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FillValue {
    Number(f64),
    Text(String),
}

impl FillValue {
    fn as_text(&self) -> String {
        match self {
            Self::Number(v) => v.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

/// How missing entries get replaced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillMethod {
    /// Column mean, numeric columns only
    Mean,
    /// Column median, numeric columns only
    Median,
    /// Most frequent present value, every column
    Mode,
    /// One fixed value, every column
    Constant(FillValue),
}

/// Missing-value strategy descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum MissingValuePolicy {
    /// Remove rows (or columns) with fewer than `min_non_null` present values.
    /// `None` requires every value to be present.
    Drop {
        axis: DropAxis,
        min_non_null: Option<usize>,
    },
    Fill { method: FillMethod },
}

impl Default for MissingValuePolicy {
    fn default() -> Self {
        Self::Fill {
            method: FillMethod::Mean,
        }
    }
}

impl MissingValuePolicy {
    /// Build a policy from its strategy name.
    ///
    /// `axis` and `min_non_null` only matter for `drop`; `fill_value` is
    /// required by `constant`.
    ///
    /// # Errors
    ///
    /// `UnknownStrategy` for an unrecognised name, `InvalidParameter` when
    /// `constant` has no value.
    pub fn from_name(
        name: &str,
        axis: DropAxis,
        min_non_null: Option<usize>,
        fill_value: Option<FillValue>,
    ) -> Result<Self> {
        let method = match strategy_key(name).as_str() {
            "drop" | "dropna" => return Ok(Self::Drop { axis, min_non_null }),
            "mean" => FillMethod::Mean,
            "median" => FillMethod::Median,
            "mode" | "mostfrequent" => FillMethod::Mode,
            "constant" => FillMethod::Constant(fill_value.ok_or_else(|| {
                PipelineError::InvalidParameter(
                    "the 'constant' strategy requires a fill value".to_owned(),
                )
            })?),
            _ => return Err(PipelineError::UnknownStrategy(name.to_owned())),
        };
        Ok(Self::Fill { method })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Drop { .. } => "drop",
            Self::Fill { method } => match method {
                FillMethod::Mean => "mean",
                FillMethod::Median => "median",
                FillMethod::Mode => "mode",
                FillMethod::Constant(_) => "constant",
            },
        }
    }
}

/// Apply a missing-value policy, returning a new frame.
///
/// # Errors
///
/// Propagates polars failures while rebuilding columns.
pub fn handle(df: &DataFrame, policy: &MissingValuePolicy) -> Result<DataFrame> {
    tracing::debug!(
        "Handling missing values with '{}' over {} columns",
        policy.name(),
        df.width()
    );
    match policy {
        MissingValuePolicy::Drop {
            axis: DropAxis::Rows,
            min_non_null,
        } => drop_rows(df, *min_non_null),
        MissingValuePolicy::Drop {
            axis: DropAxis::Columns,
            min_non_null,
        } => drop_columns(df, *min_non_null),
        MissingValuePolicy::Fill { method } => match method {
            FillMethod::Mean | FillMethod::Median => fill_statistic(df, method),
            FillMethod::Mode => fill_mode(df),
            FillMethod::Constant(value) => fill_constant(df, value),
        },
    }
}

fn drop_rows(df: &DataFrame, min_non_null: Option<usize>) -> Result<DataFrame> {
    let required = min_non_null.unwrap_or(df.width());
    let mut present_counts = vec![0usize; df.height()];

    for column in df.get_columns() {
        let present = column.as_materialized_series().is_not_null();
        for (count, is_present) in present_counts.iter_mut().zip(present.into_iter()) {
            if is_present.unwrap_or(false) {
                *count += 1;
            }
        }
    }

    let keep: Vec<bool> = present_counts.iter().map(|&c| c >= required).collect();
    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    Ok(df.filter(&mask)?)
}

fn drop_columns(df: &DataFrame, min_non_null: Option<usize>) -> Result<DataFrame> {
    let required = min_non_null.unwrap_or(df.height());
    let keep: Vec<String> = df
        .get_columns()
        .iter()
        .filter(|c| c.len() - c.null_count() >= required)
        .map(|c| c.name().to_string())
        .collect();
    Ok(df.select(keep)?)
}

/// Columns that actually contain gaps; untouched columns keep their dtype.
fn columns_with_nulls(df: &DataFrame) -> impl Iterator<Item = &Column> {
    df.get_columns().iter().filter(|c| c.null_count() > 0)
}

fn fill_statistic(df: &DataFrame, method: &FillMethod) -> Result<DataFrame> {
    let exprs: Vec<Expr> = columns_with_nulls(df)
        .filter(|c| is_numeric_dtype(c.dtype()))
        .map(|c| {
            let name = c.name().as_str();
            let stat = match method {
                FillMethod::Median => col(name).median(),
                _ => col(name).mean(),
            };
            col(name).fill_null(stat).alias(name)
        })
        .collect();

    if exprs.is_empty() {
        return Ok(df.clone());
    }
    Ok(df.clone().lazy().with_columns(exprs).collect()?)
}

/// Fill each gap with the column's most frequent present value, ties going
/// to the smallest. Every column keeps its dtype.
fn fill_mode(df: &DataFrame) -> Result<DataFrame> {
    let exprs: Vec<Expr> = columns_with_nulls(df)
        .map(|c| {
            let name = c.name().as_str();
            let mode = col(name)
                .drop_nulls()
                .mode()
                .sort(SortOptions::default())
                .first();
            col(name).fill_null(mode).alias(name)
        })
        .collect();

    if exprs.is_empty() {
        return Ok(df.clone());
    }
    Ok(df.clone().lazy().with_columns(exprs).collect()?)
}

fn fill_constant(df: &DataFrame, value: &FillValue) -> Result<DataFrame> {
    let exprs: Vec<Expr> = columns_with_nulls(df)
        .map(|c| {
            let name = c.name().as_str();
            match value {
                FillValue::Number(v) if is_numeric_dtype(c.dtype()) => {
                    col(name).fill_null(lit(*v)).alias(name)
                }
                _ => col(name)
                    .cast(DataType::String)
                    .fill_null(lit(value.as_text()))
                    .alias(name),
            }
        })
        .collect();

    if exprs.is_empty() {
        return Ok(df.clone());
    }
    Ok(df.clone().lazy().with_columns(exprs).collect()?)
}
