use crate::cli::CommandLineArgs;
use crate::error::DatasetError;
use crate::manager::DatasetManager;

use expanduser::expanduser;
use std::sync::Arc;

/// Shared application state passed to each request handler.
#[derive(Debug)]
pub struct AppState {
    /// Command line arguments.
    pub args: CommandLineArgs,

    /// Dataset manager.
    pub manager: DatasetManager,
}

impl AppState {
    /// Create and return an [AppState].
    ///
    /// Expands `~` in the storage directory and creates the storage layout if it does not
    /// exist.
    pub fn new(args: &CommandLineArgs) -> Result<Self, DatasetError> {
        let storage_dir =
            expanduser(&args.storage_dir).map_err(|source| DatasetError::Storage {
                path: args.storage_dir.clone().into(),
                source,
            })?;
        let manager = DatasetManager::new(&storage_dir)?;
        tracing::info!("Storing datasets under {}", storage_dir.display());

        Ok(Self {
            args: args.clone(),
            manager,
        })
    }
}

/// AppState wrapped in an Atomic Reference Count (Arc) to allow multiple references.
pub type SharedAppState = Arc<AppState>;
