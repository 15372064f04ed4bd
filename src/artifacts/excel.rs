//! Excel workbook export.

use crate::artifacts::Artifact;
use crate::error::DatasetError;
use crate::table::{Cell, Table};

use rust_xlsxwriter::Workbook;

/// MIME type of `.xlsx` workbooks.
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Name of the single worksheet in exported workbooks.
const SHEET_NAME: &str = "Sheet1";

/// Derive the download name of an exported workbook from the dataset's filename.
///
/// The extension is replaced with `.xlsx` (or appended if there is none), then every character
/// other than ASCII letters, digits, `-`, `_`, `.` and space is replaced with `_`.
pub fn export_filename(filename: &str) -> String {
    let stem = match filename.rfind('.') {
        Some(dot) if dot > 0 => &filename[..dot],
        _ => filename,
    };
    format!("{}.xlsx", stem)
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Render the full table to a single-sheet workbook.
///
/// The first row holds the column names. Numbers and booleans keep their type and missing
/// cells are left blank.
pub struct ExcelExport {}

impl Artifact for ExcelExport {
    type Output = Vec<u8>;

    fn generate(table: &Table) -> Result<Vec<u8>, DatasetError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(SHEET_NAME)?;

        for (col, column) in table.columns.iter().enumerate() {
            let col = u16::try_from(col)?;
            worksheet.write_string(0, col, column.name.as_str())?;
            for row in 0..column.len() {
                let xl_row = u32::try_from(row + 1)?;
                match column.cell(row) {
                    Cell::Null => continue,
                    Cell::Int(v) => worksheet.write_number(xl_row, col, v as f64)?,
                    Cell::Float(v) => worksheet.write_number(xl_row, col, v)?,
                    Cell::Bool(v) => worksheet.write_boolean(xl_row, col, v)?,
                    Cell::Str(v) => worksheet.write_string(xl_row, col, v)?,
                };
            }
        }

        Ok(workbook.save_to_buffer()?)
    }
}
