//! Tabular dataset primitives shared by every stage.

use crate::error::{PipelineError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// In-memory table of named, equal-length columns.
///
/// Polars enforces both invariants (unique names, equal heights), so the
/// pipeline works on frames directly. Numeric columns hold polars numeric
/// dtypes, categorical columns hold strings, missing entries are nulls.
pub type TabularDataset = DataFrame;

/// Ordered set of column names a strategy operates on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnSelector(Vec<String>);

impl ColumnSelector {
    /// Build a selector, dropping repeated names but keeping first-seen order.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut columns: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if !columns.contains(&name) {
                columns.push(name);
            }
        }
        Self(columns)
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|c| c == name)
    }

    /// Check the selector against a dataset and return the column names.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` when the selector is empty, `ColumnNotFound` for
    /// the first name missing from `df`.
    pub fn resolve(&self, df: &DataFrame) -> Result<&[String]> {
        if self.0.is_empty() {
            return Err(PipelineError::InvalidParameter(
                "no columns were selected for feature engineering".to_owned(),
            ));
        }
        for name in &self.0 {
            require_column(df, name)?;
        }
        Ok(&self.0)
    }
}

impl<S: Into<String>> FromIterator<S> for ColumnSelector {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Look up a column, mapping absence to `ColumnNotFound`.
///
/// # Errors
///
/// Returns `ColumnNotFound` if `name` is not a column of `df`.
pub fn require_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map(Column::as_materialized_series)
        .map_err(|_err| PipelineError::ColumnNotFound(name.to_owned()))
}

/// Numeric in the statistical sense: integers and floats, not booleans.
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    dtype.is_primitive_numeric() && !dtype.is_bool()
}

/// Names of the columns holding numeric values.
pub fn numeric_column_names(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|c| is_numeric_dtype(c.dtype()))
        .map(|c| c.name().to_string())
        .collect()
}

/// View a numeric column as `Float64`, keeping missing entries.
///
/// # Errors
///
/// `InvalidTransformInput` if the column is not numeric.
pub fn float_chunked(series: &Series) -> Result<Float64Chunked> {
    if !is_numeric_dtype(series.dtype()) {
        return Err(PipelineError::invalid_input(
            series.name().as_str(),
            format!("expected a numeric column, found {}", series.dtype()),
        ));
    }
    let casted = series.cast(&DataType::Float64)?;
    Ok(casted.f64()?.clone())
}

/// Extract a numeric column as `f64` values, keeping missing entries.
///
/// # Errors
///
/// `InvalidTransformInput` if the column is not numeric.
pub fn float_values(series: &Series) -> Result<Vec<Option<f64>>> {
    Ok(float_chunked(series)?.into_iter().collect())
}

/// Most frequent present value as a one-row series in the column's dtype,
/// empty when every entry is missing. Ties go to the smallest value.
///
/// # Errors
///
/// Fails if polars cannot compute the mode for the dtype.
pub fn modal_value(series: &Series) -> Result<Series> {
    let modes = mode::mode(&series.drop_nulls())?;
    Ok(modes.sort(SortOptions::default())?.head(Some(1)))
}

/// Extract any column through its textual form, keeping missing entries.
///
/// # Errors
///
/// Fails if polars cannot cast the column to strings.
pub fn text_values(series: &Series) -> Result<Vec<Option<String>>> {
    let casted = series.cast(&DataType::String)?;
    Ok(casted
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_owned))
        .collect())
}

/// Gather rows by position, in the order given.
///
/// # Errors
///
/// `InvalidParameter` if an index does not fit the polars index type.
pub fn take_rows(df: &DataFrame, rows: &[usize]) -> Result<DataFrame> {
    let idx = rows
        .iter()
        .map(|&row| {
            IdxSize::try_from(row).map_err(|_err| {
                PipelineError::InvalidParameter(format!("row index {row} is out of range"))
            })
        })
        .collect::<Result<Vec<IdxSize>>>()?;
    let idx = IdxCa::from_vec("idx".into(), idx);
    Ok(df.take(&idx)?)
}
