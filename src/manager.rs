//! Dataset manager.
//!
//! Orchestrates the table store and the metadata index to create, look up, list and delete
//! datasets. Every index read-modify-write sequence runs under a lock owned by the manager, so
//! concurrent requests within one process cannot lose each other's updates. Nothing coordinates
//! multiple processes sharing a storage directory.

use crate::error::DatasetError;
use crate::metadata::{JsonFileIndex, MetadataIndex};
use crate::metrics::{DATASETS_CREATED, DATASETS_DELETED};
use crate::models::Dataset;
use crate::table::Table;
use crate::table_store;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Name of the metadata index document within the storage directory.
pub const METADATA_FILE: &str = "datasets_metadata.json";
/// Name of the content directory within the storage directory.
pub const DATA_DIR: &str = "data";

/// Dataset manager
pub struct DatasetManager {
    /// Directory holding one content file per dataset.
    data_dir: PathBuf,
    /// Metadata index backend.
    index: Box<dyn MetadataIndex>,
    /// Serialises index read-modify-write sequences.
    lock: Mutex<()>,
}

impl std::fmt::Debug for DatasetManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetManager")
            .field("data_dir", &self.data_dir)
            .finish_non_exhaustive()
    }
}

impl DatasetManager {
    /// Create a manager rooted at `storage_dir`.
    ///
    /// Creates the storage and content directories and an empty metadata index if they do not
    /// exist.
    ///
    /// # Arguments
    ///
    /// * `storage_dir`: Root directory for the index document and content files
    pub fn new(storage_dir: &Path) -> Result<Self, DatasetError> {
        let data_dir = storage_dir.join(DATA_DIR);
        fs::create_dir_all(&data_dir).map_err(|source| DatasetError::Storage {
            path: data_dir.clone(),
            source,
        })?;
        let index = JsonFileIndex::new(storage_dir.join(METADATA_FILE))?;
        Ok(Self::with_index(data_dir, Box::new(index)))
    }

    /// Create a manager with an injected metadata index.
    ///
    /// # Arguments
    ///
    /// * `data_dir`: Directory for content files
    /// * `index`: Metadata index backend
    pub fn with_index(data_dir: PathBuf, index: Box<dyn MetadataIndex>) -> Self {
        DatasetManager {
            data_dir,
            index,
            lock: Mutex::new(()),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        // The guarded data is a unit, so a poisoned lock carries no broken state.
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn content_path(&self, id: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}.{}", id, table_store::CONTENT_EXTENSION))
    }

    /// Create and persist a new dataset.
    ///
    /// If the index cannot be updated, the content file that was just written is removed again
    /// before the error is returned.
    ///
    /// # Arguments
    ///
    /// * `original_filename`: Name of the uploaded file
    /// * `file_size`: Size of the uploaded file in bytes
    /// * `table`: Parsed table content
    #[tracing::instrument(level = "DEBUG", skip(self, table))]
    pub fn create(
        &self,
        original_filename: &str,
        file_size: u64,
        table: &Table,
    ) -> Result<Dataset, DatasetError> {
        let id = Uuid::new_v4().to_string();
        let dataset = Dataset::new(
            id.clone(),
            original_filename.to_string(),
            file_size,
            self.content_path(&id),
        );
        table_store::save(&dataset.data_path, table)?;

        let _guard = self.guard();
        let mut metadata = self.index.load();
        metadata.insert(id.clone(), dataset.clone());
        if let Err(err) = self.index.save(&metadata) {
            if let Err(cleanup_err) = table_store::delete(&dataset.data_path) {
                tracing::error!("Failed to remove orphaned content for {}: {}", id, cleanup_err);
            }
            return Err(err);
        }

        DATASETS_CREATED.inc();
        tracing::info!("Dataset {} created successfully", id);
        Ok(dataset)
    }

    /// Look up a dataset by ID. Returns `None` if the ID is unknown.
    ///
    /// Reads take no lock; the index backend replaces its document atomically.
    pub fn get(&self, id: &str) -> Option<Dataset> {
        self.index.load().shift_remove(id)
    }

    /// List all datasets in index order.
    pub fn list(&self) -> Vec<Dataset> {
        self.index.load().into_values().collect()
    }

    /// Delete a dataset and its content.
    ///
    /// Returns `false` if the ID is unknown. Failure to remove the content file is logged but
    /// does not prevent removal of the index entry.
    #[tracing::instrument(level = "DEBUG", skip(self))]
    pub fn delete(&self, id: &str) -> Result<bool, DatasetError> {
        let _guard = self.guard();
        let mut metadata = self.index.load();
        let Some(dataset) = metadata.shift_remove(id) else {
            return Ok(false);
        };
        if let Err(err) = table_store::delete(&dataset.data_path) {
            tracing::error!("Error deleting content of dataset {}: {}", id, err);
        }
        self.index.save(&metadata)?;

        DATASETS_DELETED.inc();
        tracing::info!("Dataset {} deleted", id);
        Ok(true)
    }

    /// Load the table content of a dataset.
    pub fn load_table(&self, dataset: &Dataset) -> Result<Table, DatasetError> {
        table_store::load(&dataset.data_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{InMemoryIndex, Metadata};
    use crate::table::{Column, ColumnData};

    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn test_table() -> Table {
        Table::new(vec![
            Column::new("a", ColumnData::Int64(vec![1, 2, 3])),
            Column::new(
                "b",
                ColumnData::Object(vec![Some("x".into()), Some("y".into()), Some("z".into())]),
            ),
        ])
    }

    /// Index whose saves always fail.
    struct ReadOnlyIndex;

    impl MetadataIndex for ReadOnlyIndex {
        fn load(&self) -> Metadata {
            Metadata::new()
        }

        fn save(&self, _metadata: &Metadata) -> Result<(), DatasetError> {
            Err(DatasetError::Metadata {
                path: PathBuf::from("read-only"),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            })
        }
    }

    #[test]
    fn new_creates_layout() {
        let dir = tempfile::tempdir().unwrap();
        let manager = DatasetManager::new(dir.path()).unwrap();
        assert!(dir.path().join(METADATA_FILE).is_file());
        assert!(dir.path().join(DATA_DIR).is_dir());
        assert_eq!(dir.path().join(DATA_DIR), manager.data_dir());
    }

    #[test]
    fn create_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let manager = DatasetManager::new(dir.path()).unwrap();
        let table = test_table();
        let dataset = manager.create("data.csv", 24, &table).unwrap();
        assert_eq!("data.csv", dataset.filename);
        assert_eq!(24, dataset.file_size);
        assert_eq!(
            dir.path().join("data").join(format!("{}.json", dataset.id)),
            dataset.data_path
        );
        assert!(dataset.data_path.is_file());
        assert_eq!(Some(dataset.clone()), manager.get(&dataset.id));
        assert_eq!(table, manager.load_table(&dataset).unwrap());
    }

    #[test]
    fn create_persists_across_managers() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = DatasetManager::new(dir.path())
            .unwrap()
            .create("data.csv", 24, &test_table())
            .unwrap();
        let manager = DatasetManager::new(dir.path()).unwrap();
        assert_eq!(vec![dataset], manager.list());
    }

    #[test]
    fn ids_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let manager = DatasetManager::with_index(
            dir.path().to_path_buf(),
            Box::<InMemoryIndex>::default(),
        );
        let table = test_table();
        let ids: HashSet<String> = (0..50)
            .map(|_| manager.create("data.csv", 1, &table).unwrap().id)
            .collect();
        assert_eq!(50, ids.len());
    }

    #[test]
    fn list_returns_all_created() {
        let dir = tempfile::tempdir().unwrap();
        let manager = DatasetManager::new(dir.path()).unwrap();
        let table = test_table();
        let created: Vec<Dataset> = (0..5)
            .map(|i| manager.create(&format!("{i}.csv"), i, &table).unwrap())
            .collect();
        let listed = manager.list();
        assert_eq!(created.len(), listed.len());
        for dataset in &created {
            assert!(listed.contains(dataset));
        }
    }

    #[test]
    fn delete_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let manager = DatasetManager::new(dir.path()).unwrap();
        let dataset = manager.create("data.csv", 24, &test_table()).unwrap();
        assert!(manager.delete(&dataset.id).unwrap());
        assert_eq!(None, manager.get(&dataset.id));
        assert!(!dataset.data_path.exists());
        assert!(manager.list().is_empty());
    }

    #[test]
    fn delete_with_missing_content() {
        let dir = tempfile::tempdir().unwrap();
        let manager = DatasetManager::new(dir.path()).unwrap();
        let dataset = manager.create("data.csv", 24, &test_table()).unwrap();
        fs::remove_file(&dataset.data_path).unwrap();
        assert!(manager.delete(&dataset.id).unwrap());
        assert_eq!(None, manager.get(&dataset.id));
    }

    #[test]
    fn unknown_ids() {
        let dir = tempfile::tempdir().unwrap();
        let manager = DatasetManager::new(dir.path()).unwrap();
        assert_eq!(None, manager.get("never-issued"));
        assert!(!manager.delete("never-issued").unwrap());
    }

    #[test]
    fn failed_index_save_removes_content() {
        let dir = tempfile::tempdir().unwrap();
        let manager =
            DatasetManager::with_index(dir.path().to_path_buf(), Box::new(ReadOnlyIndex));
        let result = manager.create("data.csv", 24, &test_table());
        assert!(matches!(result, Err(DatasetError::Metadata { .. })));
        assert_eq!(0, fs::read_dir(dir.path()).unwrap().count());
    }

    #[test]
    fn concurrent_creates_keep_every_record() {
        let dir = tempfile::tempdir().unwrap();
        let manager = Arc::new(DatasetManager::new(dir.path()).unwrap());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let manager = manager.clone();
                std::thread::spawn(move || {
                    for j in 0..5 {
                        manager
                            .create(&format!("{i}-{j}.csv"), 1, &test_table())
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(40, manager.list().len());
    }

    #[test]
    fn reads_during_writes_see_existing_records() {
        let dir = tempfile::tempdir().unwrap();
        let manager = Arc::new(DatasetManager::new(dir.path()).unwrap());
        let known = manager.create("known.csv", 1, &test_table()).unwrap();
        let done = Arc::new(AtomicBool::new(false));

        let writer = {
            let manager = manager.clone();
            let done = done.clone();
            std::thread::spawn(move || {
                while !done.load(Ordering::Relaxed) {
                    let dataset = manager.create("other.csv", 1, &test_table()).unwrap();
                    assert!(manager.delete(&dataset.id).unwrap());
                }
            })
        };

        for _ in 0..500 {
            assert_eq!(Some(known.clone()), manager.get(&known.id));
            assert!(manager.list().iter().any(|dataset| dataset.id == known.id));
        }
        done.store(true, Ordering::Relaxed);
        writer.join().unwrap();
        assert_eq!(vec![known], manager.list());
    }
}
