//! HTTP routes for browsing and reading the host filesystem.
//!
//! This module provides the axum [`Router`] that maps each route onto the
//! file access engine in [`crate::files`]. Listing and volume routes never
//! fail: unreadable locations yield an empty JSON array. Content routes
//! report missing files and bad requests as an [`ErrorResponse`] body.

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::QueryRejection;
use axum::extract::{OriginalUri, Query, State};
use axum::http::header::{
    ACCEPT_RANGES, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, RANGE,
};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use protocol::{ErrorResponse, FileEntry};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::files::volumes::{list_all_async, list_removable_async};
use crate::files::{
    platform_volume_source, DirectoryBrowser, FileStream, FileTransfer, TransferError,
    VolumeSource,
};

/// Errors returned by the content routes.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// Malformed or incomplete request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The file could not be opened or read.
    #[error("{source}")]
    Transfer {
        path: String,
        #[source]
        source: TransferError,
    },

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RouterError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            RouterError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RouterError::Transfer { source, .. } if source.is_not_found() => StatusCode::NOT_FOUND,
            RouterError::Transfer { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            RouterError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert the error to the JSON error body for `request_path`.
    pub fn to_error_response(&self, request_path: &str) -> ErrorResponse {
        ErrorResponse::new(request_path, self.to_string(), self.status().as_u16())
    }

    /// Bind the error to the request path it occurred on.
    pub fn at(self, request_path: impl Into<String>) -> RouteFailure {
        RouteFailure {
            request_path: request_path.into(),
            error: self,
        }
    }
}

/// A [`RouterError`] together with the URI path of the failed request.
#[derive(Debug)]
pub struct RouteFailure {
    pub request_path: String,
    pub error: RouterError,
}

impl IntoResponse for RouteFailure {
    fn into_response(self) -> Response {
        let status = self.error.status();
        if status.is_server_error() {
            error!(route = %self.request_path, error = %self.error, "Request failed");
        } else {
            debug!(
                route = %self.request_path,
                error = %self.error,
                status = status.as_u16(),
                "Request rejected"
            );
        }
        let body = self.error.to_error_response(&self.request_path);
        (status, Json(body)).into_response()
    }
}

/// Query string shared by every path-taking route.
#[derive(Debug, Default, Deserialize)]
pub struct PathQuery {
    pub path: Option<String>,
}

/// Shared, immutable handles to the file access engine.
#[derive(Clone)]
pub struct AppState {
    pub browser: Arc<DirectoryBrowser>,
    pub volumes: Arc<dyn VolumeSource>,
    pub transfer: Arc<FileTransfer>,
}

impl AppState {
    pub fn new(
        browser: DirectoryBrowser,
        volumes: Arc<dyn VolumeSource>,
        transfer: FileTransfer,
    ) -> Self {
        Self {
            browser: Arc::new(browser),
            volumes,
            transfer: Arc::new(transfer),
        }
    }

    /// Wire the platform components described by `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            DirectoryBrowser::new(config.file.default_path.clone()),
            platform_volume_source(&config.file),
            FileTransfer::new(config.file.chunk_size),
        )
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_default_root))
        .route("/browse", get(browse))
        .route("/drives", get(drives))
        .route("/removables", get(removables))
        .route("/download", get(download))
        .route("/stream", get(stream))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Extract a required, non-empty `path` parameter.
fn required_path(query: Result<Query<PathQuery>, QueryRejection>) -> Result<String, RouterError> {
    let Query(query) = query.map_err(|e| RouterError::InvalidRequest(e.body_text()))?;
    match query.path {
        Some(path) if !path.is_empty() => Ok(path),
        _ => Err(RouterError::InvalidRequest(
            "missing required query parameter: path".to_string(),
        )),
    }
}

/// Quote a file name for a `Content-Disposition` header.
fn attachment_disposition(file_name: &str) -> String {
    let escaped = file_name.replace('\\', "\\\\").replace('"', "\\\"");
    format!("attachment; filename=\"{escaped}\"")
}

/// Body of a file response. The stream owns the file handle.
fn file_body(stream: FileStream) -> Body {
    Body::from_stream(stream.into_stream())
}

// =========================================================================
// Listing Handlers
// =========================================================================

async fn list_default_root(State(state): State<AppState>) -> Json<Vec<FileEntry>> {
    Json(state.browser.list_async(None).await)
}

async fn browse(
    State(state): State<AppState>,
    query: Result<Query<PathQuery>, QueryRejection>,
) -> Json<Vec<FileEntry>> {
    let path = match query {
        Ok(Query(query)) => query.path,
        Err(e) => {
            warn!(error = %e.body_text(), "Ignoring malformed browse query");
            None
        }
    };
    debug!(path = ?path, "Browse requested");
    Json(state.browser.list_async(path).await)
}

async fn drives(State(state): State<AppState>) -> Json<Vec<FileEntry>> {
    Json(list_all_async(Arc::clone(&state.volumes)).await)
}

async fn removables(State(state): State<AppState>) -> Json<Vec<FileEntry>> {
    Json(list_removable_async(Arc::clone(&state.volumes)).await)
}

// =========================================================================
// File Handlers
// =========================================================================

async fn download(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    query: Result<Query<PathQuery>, QueryRejection>,
) -> Result<Response, RouteFailure> {
    serve_download(&state, query)
        .await
        .map_err(|e| e.at(uri.path()))
}

async fn serve_download(
    state: &AppState,
    query: Result<Query<PathQuery>, QueryRejection>,
) -> Result<Response, RouterError> {
    let path = required_path(query)?;
    debug!(path = %path, "Download requested");

    let stream = state
        .transfer
        .open_download(Path::new(&path))
        .await
        .map_err(|source| RouterError::Transfer {
            path: path.clone(),
            source,
        })?;

    axum::http::Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, stream.content_type.clone())
        .header(CONTENT_LENGTH, stream.len())
        .header(CONTENT_DISPOSITION, attachment_disposition(&stream.file_name))
        .body(file_body(stream))
        .map_err(|e| RouterError::Internal(e.to_string()))
}

async fn stream(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    query: Result<Query<PathQuery>, QueryRejection>,
    headers: HeaderMap,
) -> Result<Response, RouteFailure> {
    serve_stream(&state, query, &headers)
        .await
        .map_err(|e| e.at(uri.path()))
}

/// Raw `Range` header value. Bytes that are not UTF-8 are replaced, so a
/// present but garbled header still counts as a range request.
fn range_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(RANGE)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
}

async fn serve_stream(
    state: &AppState,
    query: Result<Query<PathQuery>, QueryRejection>,
    headers: &HeaderMap,
) -> Result<Response, RouterError> {
    let path = required_path(query)?;
    let range_header = range_header(headers);
    debug!(path = %path, range = ?range_header, "Stream requested");

    let stream = state
        .transfer
        .open_range(Path::new(&path), range_header.as_deref())
        .await
        .map_err(|source| RouterError::Transfer {
            path: path.clone(),
            source,
        })?;

    let status = StatusCode::from_u16(stream.range.status_code())
        .map_err(|e| RouterError::Internal(e.to_string()))?;

    axum::http::Response::builder()
        .status(status)
        .header(CONTENT_TYPE, stream.content_type.clone())
        .header(ACCEPT_RANGES, "bytes")
        .header(CONTENT_RANGE, stream.range.content_range())
        .header(CONTENT_LENGTH, stream.len())
        .body(file_body(stream))
        .map_err(|e| RouterError::Internal(e.to_string()))
}
