//! Data types and associated functions and methods

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// Descriptive record of an uploaded dataset, as stored in the metadata index.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Dataset {
    /// Unique identifier, assigned at creation
    pub id: String,
    /// Name of the uploaded file
    pub filename: String,
    /// Size of the uploaded file in bytes
    pub file_size: u64,
    /// Time of upload
    #[serde(deserialize_with = "deserialize_upload_date")]
    pub upload_date: DateTime<Utc>,
    /// Location of the persisted table content
    pub data_path: PathBuf,
}

impl Dataset {
    /// Return a Dataset object
    pub fn new(id: String, filename: String, file_size: u64, data_path: PathBuf) -> Dataset {
        Dataset {
            id,
            filename,
            file_size,
            upload_date: Utc::now(),
            data_path,
        }
    }

    /// Return the name and size of the dataset only.
    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            filename: self.filename.clone(),
            file_size: self.file_size,
        }
    }
}

/// Parse an upload date written as RFC 3339 or as an ISO 8601 timestamp without offset.
///
/// Timestamps without an offset are taken to be UTC.
fn deserialize_upload_date<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    if let Ok(date) = DateTime::parse_from_rfc3339(&value) {
        return Ok(date.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&value, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(serde::de::Error::custom)
}

/// Name and size of a dataset
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub filename: String,
    pub file_size: u64,
}

/// Response body for a successful upload
#[derive(Debug, Deserialize, Serialize)]
pub struct DatasetCreated {
    pub id: String,
    pub message: String,
    pub dataset: Dataset,
}

/// Response body carrying only a message
#[derive(Debug, Deserialize, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Message {
            message: message.into(),
        }
    }
}
