use crate::config::ServerConfig;
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Json, Multipart, Path, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use pdf_regions::{
    ComposeError, ComposeOptions, CompositionOutput, CompositionRequest, Compositor,
};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use thiserror::Error;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{debug, info, warn};

/// Multipart field carrying the source PDF
pub const PDF_FIELD: &str = "pdf";
/// Multipart field carrying the region JSON
pub const SELECTION_FIELD: &str = "selectionData";

/// Standard error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,
    /// Human-readable error message describing what went wrong
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportData {
    /// URL path the exported PDF is served from
    pub pdf_url: String,
}

/// Response for the export endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ExportResponse {
    pub success: bool,
    pub data: ExportData,
}

/// Application-specific error types for the API
#[derive(Debug, Error)]
pub enum AppError {
    /// Composition errors, split into input and processing failures
    #[error(transparent)]
    Compose(#[from] ComposeError),
    /// The multipart body could not be read
    #[error("Failed to read upload: {0}")]
    Multipart(#[from] MultipartError),
    /// The request is not a usable multipart upload at all
    #[error("Expected a multipart upload: {0}")]
    NotMultipart(#[from] MultipartRejection),
    #[error("Invalid test id '{0}'")]
    InvalidId(String),
    /// I/O errors while persisting exports
    #[error("Failed to save exported PDF: {0}")]
    Io(#[from] std::io::Error),
    /// The blocking composition task panicked or was cancelled
    #[error("Composition task failed: {0}")]
    Task(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Compose(e) if e.is_input_error() => StatusCode::BAD_REQUEST,
            AppError::Multipart(e) => e.status(),
            AppError::NotMultipart(e) => e.status(),
            AppError::InvalidId(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("Request failed: {}", self);
        } else {
            debug!("Rejected request: {}", self);
        }

        let error_response = ErrorResponse {
            success: false,
            message: self.to_string(),
        };

        (status, Json(error_response)).into_response()
    }
}

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub compositor: Arc<Compositor>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let options = ComposeOptions::default().with_bounds(config.bounds);
        Self {
            config: Arc::new(config),
            compositor: Arc::new(Compositor::new(options)),
        }
    }
}

/// Build the application router with all routes configured
pub fn app(state: AppState) -> Router {
    let uploads = ServeDir::new(&state.config.upload_dir);
    let body_limit = state.config.max_upload_bytes();

    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/tests/preview", post(preview_pdf))
        .route("/api/tests/{id}/export", post(export_pdf))
        .nest_service("/uploads", uploads)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancing
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "pdf-regions API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Compose the upload and return the result inline
pub async fn preview_pdf(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let request = read_upload(multipart?).await?;
    let output = compose(&state, request).await?;

    info!("Preview generated: {} bytes", output.bytes.len());

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (header::CONTENT_DISPOSITION, "inline; filename=preview.pdf"),
        ],
        output.bytes,
    )
        .into_response())
}

/// Compose the upload and save it under the uploads directory
pub async fn export_pdf(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    if !is_valid_id(&id) {
        return Err(AppError::InvalidId(id));
    }

    let request = read_upload(multipart?).await?;
    let output = compose(&state, request).await?;

    let file_name = format!("{}-{}.pdf", id, uuid::Uuid::new_v4());
    let upload_dir = state.config.upload_dir.clone();
    let name = file_name.clone();
    let saved = tokio::task::spawn_blocking(move || persist_export(&upload_dir, &name, &output.bytes))
        .await
        .map_err(|e| AppError::Task(e.to_string()))??;

    info!("Exported test {} to {}", id, saved.display());

    let response = ExportResponse {
        success: true,
        data: ExportData {
            pdf_url: format!("/uploads/{file_name}"),
        },
    };
    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Collect the `pdf` and `selectionData` fields. Unknown fields are ignored.
async fn read_upload(mut multipart: Multipart) -> Result<CompositionRequest, AppError> {
    let mut pdf = None;
    let mut selection_data = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            PDF_FIELD => pdf = Some(field.bytes().await?.to_vec()),
            SELECTION_FIELD => selection_data = Some(field.text().await?),
            other => debug!("Ignoring multipart field '{}'", other),
        }
    }

    Ok(CompositionRequest::from_upload(
        pdf,
        selection_data.as_deref(),
    )?)
}

async fn compose(state: &AppState, request: CompositionRequest) -> Result<CompositionOutput, AppError> {
    let compositor = Arc::clone(&state.compositor);
    let output = tokio::task::spawn_blocking(move || compositor.compose(request))
        .await
        .map_err(|e| AppError::Task(e.to_string()))??;

    for skipped in &output.report.skipped {
        warn!(
            "Paste {} on page {} left out: {}",
            skipped.id, skipped.page_number, skipped.reason
        );
    }
    Ok(output)
}

/// Ids become part of a file name.
fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Write through a temp file in `dir` so a failed write never leaves a
/// partial export behind.
fn persist_export(dir: &FsPath, file_name: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;

    let target = dir.join(file_name);
    match temp.persist(&target) {
        Ok(_) => Ok(target),
        Err(e) => {
            if let Err(cleanup) = e.file.close() {
                warn!("Failed to remove temporary export file: {}", cleanup);
            }
            Err(e.error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_id() {
        assert!(is_valid_id("42"));
        assert!(is_valid_id("test_7-b"));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id("../etc"));
        assert!(!is_valid_id("a b"));
        assert!(!is_valid_id(&"x".repeat(129)));
    }

    #[test]
    fn test_error_status() {
        assert_eq!(
            AppError::Compose(ComposeError::MissingPdf).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Compose(ComposeError::InvalidSelectionData("x".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Compose(ComposeError::Parse("x".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Compose(ComposeError::Output("12 bytes".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AppError::InvalidId("..".into()).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_persist_export() {
        let dir = tempfile::tempdir().unwrap();
        let target = persist_export(&dir.path().join("nested"), "a.pdf", b"%PDF-1.5").unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"%PDF-1.5");
        let entries: Vec<_> = std::fs::read_dir(dir.path().join("nested")).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
