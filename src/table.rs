//! In-memory tabular data.
//!
//! A [Table] is an ordered list of named, typed [Column]s of equal length. Tables are built from
//! uploaded CSV content by [Table::from_csv], which infers a [DType] for each column from its
//! cells.

use crate::error::DatasetError;

use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Cell contents treated as missing when parsing CSV.
const NULL_MARKERS: [&str; 9] = ["", "NA", "N/A", "NaN", "nan", "NULL", "null", "None", "<NA>"];

/// Supported column data types
#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DType {
    /// [i64]
    Int64,
    /// [f64]
    Float64,
    /// [bool]
    Bool,
    /// [String]
    Object,
}

impl DType {
    /// Returns the size of a single cell of the associated type in bytes.
    ///
    /// Text cells are counted as a pointer to their content.
    pub fn size_of(self) -> usize {
        match self {
            Self::Int64 => std::mem::size_of::<i64>(),
            Self::Float64 => std::mem::size_of::<f64>(),
            Self::Bool => std::mem::size_of::<bool>(),
            Self::Object => std::mem::size_of::<usize>(),
        }
    }

    /// Returns whether values of this type take part in numeric statistics and plots.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Int64 | Self::Float64)
    }
}

/// Values of a single column
///
/// Integer and boolean columns never contain nulls: a missing cell in an otherwise integer
/// column promotes it to [DType::Float64].
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "dtype", content = "values", rename_all = "lowercase")]
pub enum ColumnData {
    Int64(Vec<i64>),
    Float64(Vec<Option<f64>>),
    Bool(Vec<bool>),
    Object(Vec<Option<String>>),
}

/// A borrowed view of one cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Cell<'a> {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(&'a str),
}

/// A named column
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    /// Return a new Column object.
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Column {
            name: name.into(),
            data,
        }
    }

    pub fn dtype(&self) -> DType {
        match &self.data {
            ColumnData::Int64(_) => DType::Int64,
            ColumnData::Float64(_) => DType::Float64,
            ColumnData::Bool(_) => DType::Bool,
            ColumnData::Object(_) => DType::Object,
        }
    }

    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::Int64(values) => values.len(),
            ColumnData::Float64(values) => values.len(),
            ColumnData::Bool(values) => values.len(),
            ColumnData::Object(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of missing cells.
    pub fn null_count(&self) -> usize {
        match &self.data {
            ColumnData::Int64(_) | ColumnData::Bool(_) => 0,
            ColumnData::Float64(values) => values.iter().filter(|v| v.is_none()).count(),
            ColumnData::Object(values) => values.iter().filter(|v| v.is_none()).count(),
        }
    }

    /// Return the cell at `row`, or [Cell::Null] if out of range.
    pub fn cell(&self, row: usize) -> Cell<'_> {
        match &self.data {
            ColumnData::Int64(values) => values.get(row).map_or(Cell::Null, |v| Cell::Int(*v)),
            ColumnData::Float64(values) => match values.get(row) {
                Some(Some(v)) => Cell::Float(*v),
                _ => Cell::Null,
            },
            ColumnData::Bool(values) => values.get(row).map_or(Cell::Null, |v| Cell::Bool(*v)),
            ColumnData::Object(values) => match values.get(row) {
                Some(Some(v)) => Cell::Str(v),
                _ => Cell::Null,
            },
        }
    }

    /// Non-missing values of a numeric column as [f64], in row order.
    ///
    /// Returns `None` for non-numeric columns.
    pub fn numeric_values(&self) -> Option<Vec<f64>> {
        match &self.data {
            ColumnData::Int64(values) => Some(values.iter().map(|v| *v as f64).collect()),
            ColumnData::Float64(values) => Some(values.iter().flatten().copied().collect()),
            ColumnData::Bool(_) | ColumnData::Object(_) => None,
        }
    }
}

/// An ordered collection of equal-length columns
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<Column>,
}

impl Table {
    /// Return a new Table object.
    ///
    /// All columns are expected to have the same length.
    pub fn new(columns: Vec<Column>) -> Self {
        debug_assert!(columns.windows(2).all(|w| w[0].len() == w[1].len()));
        Table { columns }
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Columns that take part in numeric statistics and plots.
    pub fn numeric_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.dtype().is_numeric())
    }

    /// Parse CSV content into a table.
    ///
    /// The first record is the header. Records shorter than the header are padded with missing
    /// cells; records longer than the header are an error. Column types are inferred from the
    /// non-missing cells of each column.
    ///
    /// # Arguments
    ///
    /// * `content`: Raw CSV bytes, which must be UTF-8 encoded
    pub fn from_csv(content: &[u8]) -> Result<Self, DatasetError> {
        let text = std::str::from_utf8(content)?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();
        if headers.is_empty() {
            return Err(DatasetError::EmptyCsv);
        }
        let names = column_names(&headers);

        let mut raw: Vec<Vec<Option<String>>> = vec![Vec::new(); names.len()];
        for record in reader.records() {
            let record = record?;
            if record.len() > names.len() {
                return Err(DatasetError::TooManyFields {
                    line: record.position().map_or(0, |position| position.line()),
                    expected: names.len(),
                    found: record.len(),
                });
            }
            // Short records are padded with missing cells.
            for (index, cells) in raw.iter_mut().enumerate() {
                match record.get(index) {
                    Some(field) if !NULL_MARKERS.contains(&field) => {
                        cells.push(Some(field.to_string()))
                    }
                    _ => cells.push(None),
                }
            }
        }

        let columns = names
            .into_iter()
            .zip(raw)
            .map(|(name, cells)| Column::new(name, infer_column(cells)))
            .collect();
        Ok(Table::new(columns))
    }
}

/// Build unique column names from a header record.
///
/// Blank names become `Unnamed: <index>`; repeated names get a `.<n>` suffix.
fn column_names(headers: &csv::StringRecord) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(headers.len());
    for (index, header) in headers.iter().enumerate() {
        let base = if header.trim().is_empty() {
            format!("Unnamed: {}", index)
        } else {
            header.to_string()
        };
        let mut name = base.clone();
        let mut suffix = 1;
        while names.contains(&name) {
            name = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        names.push(name);
    }
    names
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "True" | "true" | "TRUE" => Some(true),
        "False" | "false" | "FALSE" => Some(false),
        _ => None,
    }
}

/// Only finite numbers count, so that stored content survives a JSON round trip.
fn parse_float(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Choose the narrowest column type that represents every non-missing cell.
fn infer_column(cells: Vec<Option<String>>) -> ColumnData {
    if cells.is_empty() {
        return ColumnData::Object(cells);
    }
    let has_nulls = cells.iter().any(Option::is_none);
    let present = || cells.iter().flatten();

    if present().next().is_none() {
        return ColumnData::Float64(vec![None; cells.len()]);
    }
    if !has_nulls && present().all(|v| v.trim().parse::<i64>().is_ok()) {
        return ColumnData::Int64(present().filter_map(|v| v.trim().parse().ok()).collect());
    }
    if present().all(|v| parse_float(v).is_some()) {
        return ColumnData::Float64(
            cells
                .iter()
                .map(|v| v.as_deref().and_then(parse_float))
                .collect(),
        );
    }
    if !has_nulls && present().all(|v| parse_bool(v).is_some()) {
        return ColumnData::Bool(present().filter_map(|v| parse_bool(v)).collect());
    }
    ColumnData::Object(cells)
}
