//! Axum extractor for CSV file uploads

use crate::error::DatasetError;

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{
        multipart::{Multipart, MultipartRejection},
        FromRequest,
    },
    http::Request,
};

/// Name of the multipart form field carrying the uploaded file.
pub const FILE_FIELD: &str = "file";

/// Return whether `filename` has a `csv` extension, ignoring case.
pub fn is_csv_filename(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map_or(false, |(_, extension)| extension.eq_ignore_ascii_case("csv"))
}

/// An axum extractor that reads an uploaded CSV file from a multipart form.
///
/// The file must be in the `file` field and have a name ending in `.csv`. The filename is
/// checked before the content is read.
#[derive(Clone, Debug)]
pub struct CsvUpload {
    /// Name of the uploaded file
    pub filename: String,
    /// Raw file content
    pub content: Bytes,
}

#[async_trait]
impl<S, B> FromRequest<S, B> for CsvUpload
where
    S: Send + Sync,
    Multipart: FromRequest<S, B, Rejection = MultipartRejection>,
    B: Send + 'static,
{
    type Rejection = DatasetError;

    /// Extract a `CsvUpload` from a `Request`.
    async fn from_request(req: Request<B>, state: &S) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state).await?;
        while let Some(field) = multipart.next_field().await? {
            if field.name() != Some(FILE_FIELD) {
                continue;
            }
            let filename = field.file_name().unwrap_or_default().to_string();
            if filename.is_empty() {
                return Err(DatasetError::NoFile);
            }
            if !is_csv_filename(&filename) {
                return Err(DatasetError::UnsupportedExtension { filename });
            }
            let content = field.bytes().await?;
            return Ok(CsvUpload { filename, content });
        }
        Err(DatasetError::NoFile)
    }
}
