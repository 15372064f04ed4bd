//! Artifacts derived on demand from a dataset's table.
//!
//! Each artifact is implemented as a struct that implements the [Artifact] trait.

use crate::error::DatasetError;
use crate::table::Table;

pub mod excel;
pub mod plot;
pub mod statistics;

pub use excel::ExcelExport;
pub use plot::HistogramPlot;
pub use statistics::Describe;

/// Trait for artifact generators.
///
/// This forms the contract between the API layer and artifact generators. Generators are
/// stateless and only see the in-memory table.
pub trait Artifact {
    /// Generated artifact type.
    type Output: Send + 'static;

    /// Generate the artifact.
    ///
    /// # Arguments
    ///
    /// * `table`: Table to derive the artifact from
    fn generate(table: &Table) -> Result<Self::Output, DatasetError>;
}
