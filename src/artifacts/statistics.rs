//! Descriptive statistics.
//!
//! Numeric columns are summarised by count, mean, sample standard deviation, minimum,
//! quartiles and maximum. Boolean and text columns are summarised by count, number of unique
//! values, most frequent value and its frequency. Statistics that do not apply to a column are
//! null.

use crate::artifacts::Artifact;
use crate::error::DatasetError;
use crate::table::{Column, ColumnData, DType, Table};

use indexmap::IndexMap;
use ndarray::Array1;
use ndarray_stats::{interpolate::Linear, Quantile1dExt};
use noisy_float::types::{n64, N64};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Summary of a single column
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ColumnSummary {
    /// Number of non-missing values
    pub count: usize,
    pub unique: Option<usize>,
    pub top: Option<Value>,
    pub freq: Option<usize>,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub q25: Option<f64>,
    #[serde(rename = "50%")]
    pub q50: Option<f64>,
    #[serde(rename = "75%")]
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

/// Table-level information that accompanies the per-column summaries
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct AdditionalInfo {
    /// Number of rows and columns
    pub shape: [usize; 2],
    pub dtypes: IndexMap<String, DType>,
    pub null_counts: IndexMap<String, usize>,
    /// Approximate size of each column's values in bytes
    pub memory_usage: IndexMap<String, usize>,
}

/// Statistics document for a table
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Statistics {
    pub describe: IndexMap<String, ColumnSummary>,
    pub additional_info: AdditionalInfo,
}

/// Replace non-finite values with `None` so that they serialise as JSON null.
fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Summarise the non-missing values of a numeric column.
fn numeric_summary(values: Vec<f64>) -> Result<ColumnSummary, DatasetError> {
    let count = values.len();
    if count == 0 {
        return Ok(ColumnSummary::default());
    }
    let array = Array1::from(values);
    let mean = array.mean().and_then(finite);
    let std = if count > 1 {
        finite(array.std(1.0))
    } else {
        None
    };

    let mut sorted: Array1<N64> = array.mapv(n64);
    let mut quantile = |q: f64| -> Result<Option<f64>, DatasetError> {
        let value = sorted.quantile_mut(n64(q), &Linear)?;
        Ok(finite(value.raw()))
    };

    Ok(ColumnSummary {
        count,
        mean,
        std,
        min: quantile(0.0)?,
        q25: quantile(0.25)?,
        q50: quantile(0.5)?,
        q75: quantile(0.75)?,
        max: quantile(1.0)?,
        ..Default::default()
    })
}

/// A distinct non-numeric value.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
enum Category<'a> {
    Bool(bool),
    Text(&'a str),
}

impl From<Category<'_>> for Value {
    fn from(category: Category<'_>) -> Self {
        match category {
            Category::Bool(v) => Value::Bool(v),
            Category::Text(v) => Value::String(v.to_string()),
        }
    }
}

/// Summarise the non-missing values of a boolean or text column.
///
/// Ties for the most frequent value are broken by first appearance.
fn categorical_summary(column: &Column) -> ColumnSummary {
    let categories: Vec<Category<'_>> = match &column.data {
        ColumnData::Bool(values) => values.iter().map(|v| Category::Bool(*v)).collect(),
        ColumnData::Object(values) => values.iter().flatten().map(|v| Category::Text(v)).collect(),
        ColumnData::Int64(_) | ColumnData::Float64(_) => Vec::new(),
    };

    let mut counts: IndexMap<Category<'_>, usize> = IndexMap::new();
    for category in &categories {
        *counts.entry(*category).or_insert(0) += 1;
    }

    let mut top: Option<(Category<'_>, usize)> = None;
    for (category, freq) in &counts {
        if top.map_or(true, |(_, best)| *freq > best) {
            top = Some((*category, *freq));
        }
    }

    ColumnSummary {
        count: categories.len(),
        unique: Some(counts.len()),
        top: top.map(|(category, _)| category.into()),
        freq: top.map(|(_, freq)| freq),
        ..Default::default()
    }
}

/// Compute descriptive statistics for a table.
pub struct Describe {}

impl Artifact for Describe {
    type Output = Statistics;

    fn generate(table: &Table) -> Result<Statistics, DatasetError> {
        let rows = table.num_rows();
        let mut describe = IndexMap::new();
        let mut dtypes = IndexMap::new();
        let mut null_counts = IndexMap::new();
        let mut memory_usage = IndexMap::new();

        for column in &table.columns {
            let dtype = column.dtype();
            let summary = match column.numeric_values() {
                Some(values) => numeric_summary(values)?,
                None => categorical_summary(column),
            };
            describe.insert(column.name.clone(), summary);
            dtypes.insert(column.name.clone(), dtype);
            null_counts.insert(column.name.clone(), column.null_count());
            memory_usage.insert(column.name.clone(), dtype.size_of() * rows);
        }

        Ok(Statistics {
            describe,
            additional_info: AdditionalInfo {
                shape: [rows, table.num_columns()],
                dtypes,
                null_counts,
                memory_usage,
            },
        })
    }
}
