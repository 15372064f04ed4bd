//! Error handling.

use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    http::header,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ndarray_stats::errors::QuantileError;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::PathBuf;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{event, Level};

/// Dataset server error type
///
/// This type encapsulates the various errors that may occur.
/// Each variant may result in a different API error response.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// No dataset exists with the requested ID
    #[error("dataset {id} not found")]
    NotFound { id: String },

    /// Upload request did not contain a file
    #[error("no file was uploaded")]
    NoFile,

    /// Uploaded file does not have an accepted extension
    #[error("only csv files are accepted (got {filename})")]
    UnsupportedExtension { filename: String },

    /// Upload request is not a multipart form
    #[error("request is not a valid multipart form")]
    MultipartRequest(#[from] MultipartRejection),

    /// Error reading the multipart upload body
    #[error("failed to read upload")]
    Multipart(#[from] MultipartError),

    /// Uploaded content is not valid UTF-8
    #[error("corrupted file")]
    CsvEncoding(#[from] std::str::Utf8Error),

    /// Uploaded content could not be parsed as CSV
    #[error("corrupted file")]
    CsvParse(#[from] csv::Error),

    /// Uploaded content has a record with more fields than the header
    #[error("corrupted file: expected {expected} fields in line {line}, saw {found}")]
    TooManyFields {
        line: u64,
        expected: usize,
        found: usize,
    },

    /// Uploaded content has no header row
    #[error("corrupted file: no columns to parse")]
    EmptyCsv,

    /// Plot requested for a table without numeric columns
    #[error("dataset has no numeric columns to plot")]
    NoNumericColumns,

    /// Error reading or writing a dataset content file
    #[error("failed to access dataset content at {}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Dataset content file exists but cannot be decoded
    #[error("dataset content at {} is corrupt", .path.display())]
    ContentCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Error writing the metadata index
    #[error("failed to write metadata index at {}", .path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error serialising to JSON
    #[error("failed to serialise data")]
    Serialization(#[from] serde_json::Error),

    /// Error computing quantiles
    #[error("failed to compute statistics")]
    Statistics(#[from] QuantileError),

    /// Error building an Excel workbook
    #[error("failed to generate Excel workbook")]
    Excel(#[from] rust_xlsxwriter::XlsxError),

    /// Error building a PDF document
    #[error("failed to generate plot: {reason}")]
    Plot { reason: String },

    /// Error converting between integer types
    #[error(transparent)]
    TryFromInt(#[from] std::num::TryFromIntError),

    /// A blocking task panicked or was cancelled
    #[error("background task failed")]
    TaskJoin(#[from] JoinError),
}

impl IntoResponse for DatasetError {
    /// Convert from a `DatasetError` into an [axum::response::Response].
    fn into_response(self) -> Response {
        ErrorResponse::from(self).into_response()
    }
}

/// Body of error response
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorBody {
    /// Main error message
    message: String,

    /// Optional list of causes
    #[serde(skip_serializing_if = "Option::is_none")]
    caused_by: Option<Vec<String>>,
}

impl ErrorBody {
    /// Return a new ErrorBody
    ///
    /// # Arguments
    ///
    /// * `error`: The error that occurred
    fn new<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        let message = error.to_string();
        let mut caused_by = None;
        let mut current = error.source();
        while let Some(source) = current {
            let mut causes: Vec<String> = caused_by.unwrap_or_default();
            causes.push(source.to_string());
            caused_by = Some(causes);
            current = source.source();
        }
        // Remove duplicate entries.
        if let Some(caused_by) = caused_by.as_mut() {
            caused_by.dedup()
        }
        ErrorBody { message, caused_by }
    }
}

/// A response to send in error cases
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorResponse {
    /// HTTP status of the response
    #[serde(skip)]
    status: StatusCode,

    /// Response body
    error: ErrorBody,
}

impl ErrorResponse {
    /// Return a new ErrorResponse
    ///
    /// # Arguments
    ///
    /// * `status`: HTTP status of the response
    /// * `error`: The error that occurred. This will be formatted into a suitable `ErrorBody`
    fn new<E>(status: StatusCode, error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        ErrorResponse {
            status,
            error: ErrorBody::new(error),
        }
    }

    /// Return a 400 bad request ErrorResponse
    fn bad_request<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    /// Return a 404 not found ErrorResponse
    fn not_found<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::NOT_FOUND, error)
    }

    /// Return a 500 internal server error ErrorResponse
    fn internal_server_error<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error)
    }
}

impl From<DatasetError> for ErrorResponse {
    /// Convert from a `DatasetError` into an `ErrorResponse`.
    fn from(error: DatasetError) -> Self {
        let response = match &error {
            // Bad request
            DatasetError::NoFile
            | DatasetError::UnsupportedExtension { filename: _ }
            | DatasetError::MultipartRequest(_)
            | DatasetError::Multipart(_)
            | DatasetError::CsvEncoding(_)
            | DatasetError::CsvParse(_)
            | DatasetError::TooManyFields { .. }
            | DatasetError::EmptyCsv
            | DatasetError::NoNumericColumns => Self::bad_request(&error),

            // Not found
            DatasetError::NotFound { id: _ } => Self::not_found(&error),

            // Internal server error
            DatasetError::Storage { path: _, source: _ }
            | DatasetError::ContentCorrupt { path: _, source: _ }
            | DatasetError::Metadata { path: _, source: _ }
            | DatasetError::Serialization(_)
            | DatasetError::Statistics(_)
            | DatasetError::Excel(_)
            | DatasetError::Plot { reason: _ }
            | DatasetError::TryFromInt(_)
            | DatasetError::TaskJoin(_) => Self::internal_server_error(&error),
        };

        // Log server errors.
        if response.status.is_server_error() {
            event!(Level::ERROR, "{}", error.to_string());
            let mut current = error.source();
            while let Some(source) = current {
                event!(Level::ERROR, "Caused by: {}", source.to_string());
                current = source.source();
            }
        }

        response
    }
}

impl IntoResponse for ErrorResponse {
    /// Convert from an `ErrorResponse` into an `axum::response::Response`.
    ///
    /// Renders the response as JSON.
    fn into_response(self) -> Response {
        let json_body = serde_json::to_string_pretty(&self);
        match json_body {
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to serialise error response: {}", err),
            )
                .into_response(),
            Ok(json_body) => (
                self.status,
                [(&header::CONTENT_TYPE, mime::APPLICATION_JSON.to_string())],
                json_body,
            )
                .into_response(),
        }
    }
}
