//! Dataset server API

use crate::app_state::SharedAppState;
use crate::artifacts::{excel, Artifact, Describe, ExcelExport, HistogramPlot};
use crate::error::DatasetError;
use crate::metrics::{metrics_handler, record_response_metrics, request_counter};
use crate::models::{Dataset, DatasetCreated, DatasetSummary, Message};
use crate::table::Table;
use crate::upload::CsvUpload;

use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::header,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tokio::task;
use tower::Layer;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::normalize_path::NormalizePath;
use tower_http::normalize_path::NormalizePathLayer;
use tower_http::trace::TraceLayer;

/// Returns a [axum::Router] for the dataset API
///
/// The router is populated with all routes as well as the following middleware:
///
/// * a [tower_http::trace::TraceLayer] for tracing requests and responses
/// * a [tower_http::cors::CorsLayer] allowing requests from any origin
/// * a [axum::extract::DefaultBodyLimit] bounding the size of uploads
///
/// # Arguments
///
/// * `state`: Shared application state
pub fn router(state: SharedAppState) -> Router {
    let max_upload_bytes = state.args.max_upload_bytes();
    Router::new()
        .route("/", get(root))
        .route("/metrics", get(metrics_handler))
        .route("/datasets", get(list).post(create))
        .route("/datasets/:id", get(summary).delete(remove))
        .route("/datasets/:id/excel", get(excel_export))
        .route("/datasets/:id/stats", get(stats))
        .route("/datasets/:id/plot", get(plot))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .on_request(request_counter)
                        .on_response(record_response_metrics),
                )
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .with_state(state)
}

/// The dataset API service type
pub type Service = NormalizePath<Router>;

/// Returns a [crate::app::Service] for the dataset API
///
/// The service is populated with all routes as well as the following middleware:
///
/// * a [tower_http::normalize_path::NormalizePathLayer] for trimming trailing slashes from
///   requests
///
/// # Arguments
///
/// * `state`: Shared application state
pub fn service(state: SharedAppState) -> Service {
    // Note that any middleware that should affect routing must wrap the router.
    // See
    // https://docs.rs/axum/0.6.18/axum/middleware/index.html#rewriting-request-uri-in-middleware.
    NormalizePathLayer::trim_trailing_slash().layer(router(state))
}

async fn root() -> Json<Message> {
    Json(Message::new("CSV Dataset API"))
}

/// Look up a dataset, converting an unknown ID into [DatasetError::NotFound].
fn find(state: &SharedAppState, id: &str) -> Result<Dataset, DatasetError> {
    state.manager.get(id).ok_or_else(|| DatasetError::NotFound { id: id.to_string() })
}

/// Handler for listing datasets
async fn list(State(state): State<SharedAppState>) -> Result<Json<Vec<Dataset>>, DatasetError> {
    let datasets = task::spawn_blocking(move || state.manager.list()).await?;
    Ok(Json(datasets))
}

/// Handler for creating a dataset from an uploaded CSV file
///
/// The content is parsed before anything is persisted, so unparsable uploads leave no trace.
async fn create(
    State(state): State<SharedAppState>,
    upload: CsvUpload,
) -> Result<(StatusCode, Json<DatasetCreated>), DatasetError> {
    let dataset = task::spawn_blocking(move || {
        let table = Table::from_csv(&upload.content)?;
        state
            .manager
            .create(&upload.filename, upload.content.len() as u64, &table)
    })
    .await??;
    Ok((
        StatusCode::CREATED,
        Json(DatasetCreated {
            id: dataset.id.clone(),
            message: "Dataset create with success".to_string(),
            dataset,
        }),
    ))
}

/// Handler for describing a single dataset
async fn summary(
    State(state): State<SharedAppState>,
    Path(id): Path<String>,
) -> Result<Json<DatasetSummary>, DatasetError> {
    let dataset = task::spawn_blocking(move || find(&state, &id)).await??;
    Ok(Json(dataset.summary()))
}

/// Handler for deleting a dataset
async fn remove(
    State(state): State<SharedAppState>,
    Path(id): Path<String>,
) -> Result<Json<Message>, DatasetError> {
    task::spawn_blocking(move || {
        if state.manager.delete(&id)? {
            Ok(Json(Message::new(format!("Dataset {} deleted", id))))
        } else {
            Err(DatasetError::NotFound { id })
        }
    })
    .await?
}

/// Generic handler for artifacts
///
/// Looks up the dataset, loads its table and generates the artifact on the blocking thread
/// pool.
///
/// # Arguments
///
/// * `state`: Shared application state
/// * `id`: ID of the dataset
async fn artifact_handler<A: Artifact + 'static>(
    state: SharedAppState,
    id: String,
) -> Result<(Dataset, A::Output), DatasetError> {
    task::spawn_blocking(move || {
        let dataset = find(&state, &id)?;
        let table = state.manager.load_table(&dataset)?;
        let output = A::generate(&table)?;
        Ok((dataset, output))
    })
    .await?
}

async fn excel_export(
    State(state): State<SharedAppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DatasetError> {
    let (dataset, bytes) = artifact_handler::<ExcelExport>(state, id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, excel::XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!(
                    "attachment; filename=\"{}\"",
                    excel::export_filename(&dataset.filename)
                ),
            ),
        ],
        bytes,
    ))
}

async fn stats(
    State(state): State<SharedAppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DatasetError> {
    let (_, statistics) = artifact_handler::<Describe>(state, id).await?;
    Ok(Json(statistics))
}

async fn plot(
    State(state): State<SharedAppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DatasetError> {
    let (_, bytes) = artifact_handler::<HistogramPlot>(state, id).await?;
    Ok(([(header::CONTENT_TYPE, mime::APPLICATION_PDF.to_string())], bytes))
}
