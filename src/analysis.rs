//! Column-level profile of a loaded dataset.
//!
//! Used by `inspect` to decide on strategies before configuring a run.

use crate::dataset::{float_chunked, is_numeric_dtype, modal_value};
use anyhow::Result;
use polars::prelude::*;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Text,
    Other,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Text => "text",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub mean: f64,
    /// Sample standard deviation; `None` below two values
    pub std: Option<f64>,
    pub min: f64,
    pub max: f64,
    pub median: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextSummary {
    pub distinct: usize,
    pub top: String,
    pub top_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub kind: ColumnKind,
    pub dtype: String,
    pub non_null: usize,
    pub missing: usize,
    pub missing_ratio: f64,
    pub numeric: Option<NumericSummary>,
    pub text: Option<TextSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetProfile {
    pub rows: usize,
    pub columns: Vec<ColumnProfile>,
}

impl DatasetProfile {
    /// Columns with at least one missing value, most incomplete first
    pub fn missing_columns(&self) -> Vec<&ColumnProfile> {
        let mut columns: Vec<&ColumnProfile> =
            self.columns.iter().filter(|c| c.missing > 0).collect();
        columns.sort_by(|a, b| b.missing.cmp(&a.missing).then_with(|| a.name.cmp(&b.name)));
        columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnProfile> {
        self.columns.iter().find(|c| c.name == name)
    }
}

pub fn profile(df: &DataFrame) -> Result<DatasetProfile> {
    let rows = df.height();
    let columns = df
        .get_columns()
        .iter()
        .map(|column| profile_column(column.as_materialized_series(), rows))
        .collect::<Result<Vec<_>>>()?;
    Ok(DatasetProfile { rows, columns })
}

fn profile_column(series: &Series, rows: usize) -> Result<ColumnProfile> {
    let missing = series.null_count();
    let non_null = rows - missing;
    let dtype = series.dtype();

    let kind = if is_numeric_dtype(dtype) {
        ColumnKind::Numeric
    } else if matches!(dtype, DataType::String) {
        ColumnKind::Text
    } else {
        ColumnKind::Other
    };

    let numeric = match kind {
        ColumnKind::Numeric => numeric_summary(series)?,
        _ => None,
    };
    let text = match kind {
        ColumnKind::Text => text_summary(series)?,
        _ => None,
    };

    Ok(ColumnProfile {
        name: series.name().to_string(),
        kind,
        dtype: dtype.to_string(),
        non_null,
        missing,
        missing_ratio: if rows == 0 {
            0.0
        } else {
            missing as f64 / rows as f64
        },
        numeric,
        text,
    })
}

fn numeric_summary(series: &Series) -> Result<Option<NumericSummary>> {
    let ca = float_chunked(series)?;
    let (Some(mean), Some(min), Some(max), Some(median)) =
        (ca.mean(), ca.min(), ca.max(), ca.median())
    else {
        return Ok(None);
    };
    Ok(Some(NumericSummary {
        mean,
        std: ca.std(1),
        min,
        max,
        median,
    }))
}

fn text_summary(series: &Series) -> Result<Option<TextSummary>> {
    let present = series.drop_nulls();
    let top = modal_value(&present)?;
    let Some(top) = top.str()?.get(0).map(str::to_owned) else {
        return Ok(None);
    };
    let top_count = present.str()?.equal(top.as_str()).sum().unwrap_or(0) as usize;
    Ok(Some(TextSummary {
        distinct: present.n_unique()?,
        top,
        top_count,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        df!(
            "Area" => &[Some(800.0), None, Some(1200.0), Some(1000.0)],
            "Zone" => &[Some("RL"), Some("RM"), Some("RL"), None],
            "Pool" => &[None::<&str>, None, None, None],
            "Sold" => &[true, false, true, true]
        )
        .expect("valid frame")
    }

    #[test]
    fn test_profile_numeric_column() -> Result<()> {
        let profile = profile(&frame())?;
        assert_eq!(profile.rows, 4);

        let area = profile.column("Area").expect("Area profiled");
        assert_eq!(area.kind, ColumnKind::Numeric);
        assert_eq!(area.missing, 1);
        assert!((area.missing_ratio - 0.25).abs() < 1e-12);

        let summary = area.numeric.as_ref().expect("numeric summary");
        assert!((summary.mean - 1000.0).abs() < 1e-9);
        assert!((summary.median - 1000.0).abs() < 1e-9);
        assert!((summary.std.unwrap_or_default() - 200.0).abs() < 1e-9);
        assert_eq!(summary.min, 800.0);
        assert_eq!(summary.max, 1200.0);
        Ok(())
    }

    #[test]
    fn test_profile_text_column() -> Result<()> {
        let profile = profile(&frame())?;
        let zone = profile.column("Zone").expect("Zone profiled");
        assert_eq!(zone.kind, ColumnKind::Text);
        let summary = zone.text.as_ref().expect("text summary");
        assert_eq!(summary.distinct, 2);
        assert_eq!(summary.top, "RL");
        assert_eq!(summary.top_count, 2);

        assert_eq!(profile.column("Sold").map(|c| c.kind), Some(ColumnKind::Other));
        Ok(())
    }

    #[test]
    fn test_text_top_value_tie_goes_to_smallest() -> Result<()> {
        let df = df!("Street" => &[Some("Pave"), Some("Grvl"), None, Some("Pave"), Some("Grvl")])?;
        let profile = profile(&df)?;
        let summary = profile
            .column("Street")
            .and_then(|c| c.text.as_ref())
            .expect("text summary");
        assert_eq!(summary.top, "Grvl");
        assert_eq!(summary.top_count, 2);
        assert_eq!(summary.distinct, 2);
        Ok(())
    }

    #[test]
    fn test_missing_columns_sorted_by_count() -> Result<()> {
        let profile = profile(&frame())?;
        let names: Vec<&str> = profile
            .missing_columns()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, ["Pool", "Area", "Zone"]);
        Ok(())
    }
}
