//! Metadata index.
//!
//! The index maps dataset IDs to their [Dataset] records. It is always read and written in full.
//! [JsonFileIndex] keeps the index as a single JSON document on disk; [InMemoryIndex] keeps it in
//! memory and is useful for tests.

use crate::error::DatasetError;
use crate::models::Dataset;

use indexmap::IndexMap;
use tempfile::NamedTempFile;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Dataset records keyed by ID, in insertion order.
pub type Metadata = IndexMap<String, Dataset>;

/// Metadata index trait.
///
/// Defines the interface for metadata index backends. Implementations do not coordinate
/// concurrent read-modify-write sequences; callers are expected to serialise them.
pub trait MetadataIndex: Send + Sync {
    /// Load the full index.
    ///
    /// Backends may degrade to an empty index rather than fail.
    fn load(&self) -> Metadata;

    /// Replace the full index.
    ///
    /// # Arguments
    ///
    /// * `metadata`: The new index contents
    fn save(&self, metadata: &Metadata) -> Result<(), DatasetError>;
}

/// Index stored as a JSON document on the local filesystem.
#[derive(Debug)]
pub struct JsonFileIndex {
    path: PathBuf,
}

impl JsonFileIndex {
    /// Open the index at `path`, writing an empty index if the document does not yet exist.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, DatasetError> {
        let index = JsonFileIndex { path: path.into() };
        if !index.path.exists() {
            index.save(&Metadata::new())?;
        }
        Ok(index)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MetadataIndex for JsonFileIndex {
    /// Load the index document.
    ///
    /// A missing document is logged as a warning and a corrupt or unreadable one as an error;
    /// in both cases the index is treated as empty. A subsequent save will overwrite a corrupt
    /// document, discarding its previous contents.
    fn load(&self) -> Metadata {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::warn!(
                    "Metadata file {} not found, initializing a new one",
                    self.path.display()
                );
                return Metadata::new();
            }
            Err(err) => {
                tracing::error!(
                    "Failed to read metadata file {}: {}",
                    self.path.display(),
                    err
                );
                return Metadata::new();
            }
        };
        match serde_json::from_slice(&content) {
            Ok(metadata) => metadata,
            Err(err) => {
                tracing::error!("Metadata file {} is corrupted: {}", self.path.display(), err);
                Metadata::new()
            }
        }
    }

    /// Replace the index document.
    ///
    /// The document is written to a temporary file in the same directory and renamed over the
    /// old one, so a concurrent [MetadataIndex::load] sees either the old or the new index.
    fn save(&self, metadata: &Metadata) -> Result<(), DatasetError> {
        let json = serde_json::to_string_pretty(metadata)?;
        let to_error = |source| DatasetError::Metadata {
            path: self.path.clone(),
            source,
        };
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(dir).map_err(to_error)?;
        file.write_all(json.as_bytes()).map_err(to_error)?;
        file.persist(&self.path).map_err(|err| to_error(err.error))?;
        tracing::info!("Metadata updated successfully");
        Ok(())
    }
}

/// Index held in memory.
#[derive(Debug, Default)]
pub struct InMemoryIndex {
    metadata: Mutex<Metadata>,
}

impl MetadataIndex for InMemoryIndex {
    fn load(&self) -> Metadata {
        self.metadata
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn save(&self, metadata: &Metadata) -> Result<(), DatasetError> {
        *self
            .metadata
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = metadata.clone();
        Ok(())
    }
}
