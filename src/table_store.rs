//! Persistence of table content files.
//!
//! Each dataset's table is stored as a single JSON document holding its columns, their types and
//! their values, so that a table read back with [load] is identical to the one passed to [save].

use crate::error::DatasetError;
use crate::table::Table;

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::Path;

/// File extension of content files.
pub const CONTENT_EXTENSION: &str = "json";

fn storage_error(path: &Path) -> impl FnOnce(std::io::Error) -> DatasetError + '_ {
    move |source| DatasetError::Storage {
        path: path.to_path_buf(),
        source,
    }
}

/// Write a table to `path`, replacing any existing content.
///
/// The parent directory is created if it does not exist.
pub fn save(path: &Path, table: &Table) -> Result<(), DatasetError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(storage_error(path))?;
    }
    let file = File::create(path).map_err(storage_error(path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, table)?;
    writer.flush().map_err(storage_error(path))?;
    tracing::debug!("saved table content to {}", path.display());
    Ok(())
}

/// Read a table from `path`.
pub fn load(path: &Path) -> Result<Table, DatasetError> {
    let file = File::open(path).map_err(storage_error(path))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| DatasetError::ContentCorrupt {
        path: path.to_path_buf(),
        source,
    })
}

/// Remove the content file at `path`. A missing file is not an error.
pub fn delete(path: &Path) -> Result<(), DatasetError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(storage_error(path)(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Column, ColumnData};

    fn test_table() -> Table {
        Table::new(vec![
            Column::new("i", ColumnData::Int64(vec![3, -1, 7])),
            Column::new("f", ColumnData::Float64(vec![Some(0.1), None, Some(1e300)])),
            Column::new("b", ColumnData::Bool(vec![true, false, true])),
            Column::new(
                "s",
                ColumnData::Object(vec![Some("x".into()), None, Some("\"quoted\"".into())]),
            ),
        ])
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("table.json");
        let table = test_table();
        save(&path, &table).unwrap();
        assert_eq!(table, load(&path).unwrap());
    }

    #[test]
    fn load_missing() {
        let dir = tempfile::tempdir().unwrap();
        let result = load(&dir.path().join("missing.json"));
        assert!(matches!(result, Err(DatasetError::Storage { .. })));
    }

    #[test]
    fn load_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.json");
        fs::write(&path, b"{\"columns\": [").unwrap();
        let result = load(&path);
        assert!(matches!(result, Err(DatasetError::ContentCorrupt { .. })));
    }

    #[test]
    fn delete_present_and_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.json");
        save(&path, &test_table()).unwrap();
        delete(&path).unwrap();
        assert!(!path.exists());
        delete(&path).unwrap();
    }
}
