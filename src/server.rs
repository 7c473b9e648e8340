//! HTTP surface: `POST /convert` and the `GET /` health check.
//!
//! A conversion request moves linearly through validate → download →
//! convert → respond. Every failure becomes a `400 {"error": ...}`; the
//! request's [`ScratchFile`] is dropped on whichever path the handler leaves
//! by, and a panic inside the handler is turned into a 400 by
//! [`CatchPanicLayer`] after unwinding has dropped it.

use crate::config::ServiceConfig;
use crate::convert::{ConversionMode, DocumentConverter, PdfConverter};
use crate::error::FetchError;
use crate::scratch::ScratchFile;
use crate::storage::{self, GcsClient, ObjectStore};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::signal;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

// ── State ────────────────────────────────────────────────────────────────

/// Shared, immutable handler state.
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn ObjectStore>,
    converter: Arc<dyn DocumentConverter>,
    scratch_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(store: Arc<dyn ObjectStore>, converter: Arc<dyn DocumentConverter>) -> Self {
        Self {
            store,
            converter,
            scratch_dir: None,
        }
    }

    /// Stage downloads in `dir` instead of the OS temp dir.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Production state: GCS client plus the pdfium/tesseract converter.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, FetchError> {
        let store = GcsClient::new(&config.storage)?;
        let converter = PdfConverter::new(config.ocr.clone(), config.engine.clone());
        let mut state = Self::new(Arc::new(store), Arc::new(converter));
        state.scratch_dir = config.scratch_dir.clone();
        Ok(state)
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

/// A validated conversion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    /// `gs://bucket/key` reference to the PDF.
    pub file: String,
    pub mode: ConversionMode,
}

impl ConversionRequest {
    /// Validate a raw request body. No I/O happens before this succeeds.
    pub fn from_body(body: &[u8]) -> Result<Self, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(ApiError::MissingFile);
        }

        let value: Value =
            serde_json::from_slice(body).map_err(|e| ApiError::MalformedBody(e.to_string()))?;
        let Value::Object(fields) = value else {
            return Err(ApiError::MissingFile);
        };

        // Any present `file` counts. A non-string value is kept as its JSON
        // text, which is never a valid `gs://` reference, so it fails as a
        // download.
        let file = match fields.get("file") {
            Some(Value::String(file)) => file.clone(),
            Some(other) => other.to_string(),
            None => return Err(ApiError::MissingFile),
        };

        let mode = match fields.get("mode") {
            None => ConversionMode::default(),
            Some(Value::String(mode)) => mode.parse().map_err(|_| ApiError::InvalidMode)?,
            Some(_) => return Err(ApiError::InvalidMode),
        };

        Ok(Self { file, mode })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkdownResponse {
    pub markdown: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

// ── Errors ───────────────────────────────────────────────────────────────

/// Client-facing failures. All map to `400 Bad Request`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing \"file\" parameter in request")]
    MissingFile,

    #[error("Invalid mode parameter. Must be \"ocr\" or \"direct\"")]
    InvalidMode,

    #[error("Request body is not valid JSON: {0}")]
    MalformedBody(String),

    #[error("Failed to download file from GCS")]
    DownloadFailed,

    #[error("Failed to convert PDF to markdown: {0}")]
    ConversionFailed(String),

    #[error("{0}")]
    Unexpected(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (StatusCode::BAD_REQUEST, body).into_response()
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────

/// Liveness check.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn convert_pdf(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<MarkdownResponse>, ApiError> {
    let request = ConversionRequest::from_body(&body)?;
    info!(file = %request.file, mode = %request.mode, "Conversion requested");

    let scratch = ScratchFile::new(state.scratch_dir.as_deref())
        .map_err(|e| ApiError::Unexpected(format!("Failed to create scratch file: {e}")))?;

    if !storage::fetch(state.store.as_ref(), &request.file, scratch.path()).await {
        return Err(ApiError::DownloadFailed);
    }

    let markdown = state
        .converter
        .convert(scratch.path(), request.mode)
        .await
        .map_err(|e| {
            warn!(file = %request.file, "Conversion failed: {e}");
            ApiError::ConversionFailed(e.to_string())
        })?;

    Ok(Json(MarkdownResponse { markdown }))
}

fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "request handler panicked".to_string()
    };
    error!("Request handler panicked: {detail}");
    ApiError::Unexpected(detail).into_response()
}

// ── Router / startup ─────────────────────────────────────────────────────

/// Build the routing table.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/convert", post(convert_pdf))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind to the configured address and serve until Ctrl-C / SIGTERM.
pub async fn serve(config: &ServiceConfig, state: AppState) -> io::Result<()> {
    let addr = config
        .bind_addr()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("pdf2md service listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting graceful shutdown..."),
    }
}
