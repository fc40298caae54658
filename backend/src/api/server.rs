//! HTTP server for the rateload upload API.
//!
//! Exposes the upload lifecycle only; rating CRUD lives elsewhere.
//!
//! # API Endpoints
//!
//! | Method | Path                        | Description                         |
//! |--------|-----------------------------|-------------------------------------|
//! | GET    | `/health`                   | Health check                        |
//! | POST   | `/api/uploads`              | Submit a delimited file (multipart) |
//! | GET    | `/api/uploads`              | List upload jobs, newest first      |
//! | GET    | `/api/uploads/stats`        | Aggregate counters                  |
//! | GET    | `/api/uploads/{id}`         | Job detail with error summary       |
//! | POST   | `/api/uploads/{id}/process` | Run the ingestion pipeline          |
//! | POST   | `/api/uploads/{id}/reject`  | Cancel a pending upload             |
//! | GET    | `/api/uploads/{id}/items`   | Row ledger, `?status=OK\|ERROR`     |
//! | GET    | `/api/events`               | SSE stream for pipeline logs        |

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::{convert::Infallible, net::SocketAddr, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use super::logs::LOG_BROADCASTER;
use super::types::{error_response, JobView, RowItemView, UploadAccepted, UploadStats};
use crate::audit;
use crate::error::{AcceptError, UploadError};
use crate::registry::UploadArchive;
use crate::store::{RatingStore, ReferenceData};
use crate::upload::{process_upload, RowStatus, UploadJob, UploadRowResult};

/// Default upload size ceiling (bytes) unless `RATELOAD_MAX_UPLOAD_BYTES`
/// overrides it.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Extensions accepted by the gate: plain-text delimited files only.
const ACCEPTED_EXTENSIONS: [&str; 2] = ["txt", "tsv"];

/// One upload known to the server: the job, its source bytes (empty for
/// jobs reloaded from the archive) and its row ledger once processed.
pub struct UploadEntry {
    pub job: UploadJob,
    pub bytes: Vec<u8>,
    pub rows: Vec<UploadRowResult>,
}

/// Shared server state.
pub struct AppState {
    pub refs: Arc<dyn ReferenceData>,
    pub store: Arc<dyn RatingStore>,
    pub uploads: Mutex<HashMap<Uuid, UploadEntry>>,
    pub archive: Mutex<UploadArchive>,
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Build state over the given collaborators, reloading terminal jobs
    /// from the archive so they stay listable after a restart.
    pub fn new(refs: Arc<dyn ReferenceData>, store: Arc<dyn RatingStore>) -> Self {
        let archive = UploadArchive::new();
        let mut uploads = HashMap::new();
        for stored in archive.list() {
            uploads.insert(
                stored.job.id,
                UploadEntry {
                    job: stored.job.clone(),
                    bytes: Vec::new(),
                    rows: stored.rows.clone(),
                },
            );
        }

        let max_upload_bytes = std::env::var("RATELOAD_MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        Self {
            refs,
            store,
            uploads: Mutex::new(uploads),
            archive: Mutex::new(archive),
            max_upload_bytes,
        }
    }
}

/// Upload acceptance gate: extension, size ceiling, strict UTF-8.
///
/// These pre-checks run before a job exists, so the orchestrator can assume
/// they already passed.
pub fn accept_upload(file_name: &str, bytes: &[u8], limit: usize) -> Result<(), AcceptError> {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    if !ACCEPTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(AcceptError::UnsupportedExtension(extension));
    }

    if bytes.len() > limit {
        return Err(AcceptError::TooLarge {
            size: bytes.len(),
            limit,
        });
    }

    if std::str::from_utf8(bytes).is_err() {
        return Err(AcceptError::NotUtf8);
    }

    Ok(())
}

/// Start the HTTP server
pub async fn start_server(
    port: u16,
    state: Arc<AppState>,
) -> Result<(), Box<dyn std::error::Error>> {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    let body_limit = state.max_upload_bytes + 64 * 1024;

    let app = Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/uploads", post(create_upload).get(list_uploads))
        .route("/api/uploads/stats", get(upload_stats))
        .route("/api/uploads/{id}", get(get_upload))
        .route("/api/uploads/{id}/process", post(run_upload))
        .route("/api/uploads/{id}/reject", post(reject_upload))
        .route("/api/uploads/{id}/items", get(list_items))
        .route("/api/events", get(sse_events))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 rateload server running on http://localhost:{}", port);
    println!("   POST /api/uploads               - Submit upload file");
    println!("   POST /api/uploads/{{id}}/process  - Run ingestion");
    println!("   GET  /api/uploads/{{id}}/items    - Row ledger");
    println!("   GET  /api/events                - SSE log stream");
    println!("   GET  /health                    - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "rateload",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "uploads": "POST /api/uploads",
            "events": "GET /api/events (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_events() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

type ApiError = (StatusCode, Json<Value>);

fn not_found(id: Uuid) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(error_response(&UploadError::NotFound(id).to_string())),
    )
}

fn conflict(err: &UploadError) -> ApiError {
    (StatusCode::CONFLICT, Json(error_response(&err.to_string())))
}

/// Submit a new upload file (multipart `file` field).
async fn create_upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadAccepted>), ApiError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut user: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(error_response(&format!("Multipart error: {}", e))),
        )
    })? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());
                file_data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| {
                            (
                                StatusCode::BAD_REQUEST,
                                Json(error_response(&format!("Read error: {}", e))),
                            )
                        })?
                        .to_vec(),
                );
            }
            "user" => {
                user = field.text().await.ok();
            }
            _ => {}
        }
    }

    let bytes = file_data.ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(error_response(&AcceptError::MissingFile.to_string())),
        )
    })?;
    let file_name = file_name.unwrap_or_else(|| "upload.txt".to_string());
    let user = user.unwrap_or_else(|| "anonymous".to_string());

    accept_upload(&file_name, &bytes, state.max_upload_bytes).map_err(|e| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(error_response(&e.to_string())),
        )
    })?;

    let job = UploadJob::new(file_name, user);
    audit::record_created(&job);

    let response = UploadAccepted {
        job_id: job.id,
        file_name: job.file_name.clone(),
        state: job.state,
    };

    state
        .uploads
        .lock()
        .expect("uploads mutex poisoned")
        .insert(
            job.id,
            UploadEntry {
                job,
                bytes,
                rows: Vec::new(),
            },
        );

    Ok((StatusCode::CREATED, Json(response)))
}

/// Run the ingestion pipeline on a pending upload.
async fn run_upload(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobView>, ApiError> {
    let mut uploads = state.uploads.lock().expect("uploads mutex poisoned");
    let entry = uploads.get_mut(&id).ok_or_else(|| not_found(id))?;

    let bytes = entry.bytes.clone();
    let results = process_upload(
        &mut entry.job,
        &bytes,
        state.refs.as_ref(),
        state.store.as_ref(),
    )
    .map_err(|e| conflict(&e))?;
    entry.rows = results;

    let view = JobView::from(&entry.job);
    if let Err(e) = state
        .archive
        .lock()
        .expect("archive mutex poisoned")
        .save(entry.job.clone(), entry.rows.clone())
    {
        super::logs::log_warning(format!("Failed to archive upload {}: {}", id, e));
    }

    Ok(Json(view))
}

/// Cancel a pending upload.
async fn reject_upload(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobView>, ApiError> {
    let mut uploads = state.uploads.lock().expect("uploads mutex poisoned");
    let entry = uploads.get_mut(&id).ok_or_else(|| not_found(id))?;

    entry.job.reject().map_err(|e| conflict(&e))?;
    audit::record_rejected(&entry.job);

    let view = JobView::from(&entry.job);
    if let Err(e) = state
        .archive
        .lock()
        .expect("archive mutex poisoned")
        .save(entry.job.clone(), Vec::new())
    {
        super::logs::log_warning(format!("Failed to archive upload {}: {}", id, e));
    }

    Ok(Json(view))
}

/// Job detail.
async fn get_upload(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobView>, ApiError> {
    let uploads = state.uploads.lock().expect("uploads mutex poisoned");
    let entry = uploads.get(&id).ok_or_else(|| not_found(id))?;
    Ok(Json(JobView::from(&entry.job)))
}

/// List jobs, newest first.
async fn list_uploads(State(state): State<Arc<AppState>>) -> Json<Vec<JobView>> {
    let uploads = state.uploads.lock().expect("uploads mutex poisoned");
    let mut views: Vec<JobView> = uploads.values().map(|e| JobView::from(&e.job)).collect();
    views.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Json(views)
}

#[derive(Debug, Deserialize)]
struct ItemsQuery {
    status: Option<String>,
}

/// Row ledger for one job, optionally filtered by outcome status.
async fn list_items(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<ItemsQuery>,
) -> Result<Json<Vec<RowItemView>>, ApiError> {
    let filter = match query.status.as_deref().map(str::to_uppercase) {
        None => None,
        Some(s) => match s.as_str() {
            "OK" => Some(RowStatus::Ok),
            "ERROR" => Some(RowStatus::Error),
            other => {
                return Err((
                    StatusCode::BAD_REQUEST,
                    Json(error_response(&format!(
                        "Invalid status filter '{}': use OK or ERROR",
                        other
                    ))),
                ))
            }
        },
    };

    let uploads = state.uploads.lock().expect("uploads mutex poisoned");
    let entry = uploads.get(&id).ok_or_else(|| not_found(id))?;

    let items: Vec<RowItemView> = entry
        .rows
        .iter()
        .filter(|r| filter.map_or(true, |f| r.status == f))
        .map(RowItemView::from)
        .collect();

    Ok(Json(items))
}

/// Aggregate counters across all known uploads.
async fn upload_stats(State(state): State<Arc<AppState>>) -> Json<UploadStats> {
    let uploads = state.uploads.lock().expect("uploads mutex poisoned");
    let mut stats = UploadStats::default();
    for entry in uploads.values() {
        stats.add(&entry.job);
    }
    Json(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_accepts_plain_text() {
        assert!(accept_upload("ratings.txt", b"a|b\n1|2", 1024).is_ok());
        assert!(accept_upload("RATINGS.TSV", b"a\tb\n1\t2", 1024).is_ok());
    }

    #[test]
    fn test_gate_rejects_spreadsheet_formats() {
        let err = accept_upload("ratings.csv", b"a,b", 1024).unwrap_err();
        assert!(matches!(err, AcceptError::UnsupportedExtension(ext) if ext == "csv"));

        let err = accept_upload("ratings.xlsx", b"PK", 1024).unwrap_err();
        assert!(matches!(err, AcceptError::UnsupportedExtension(_)));
    }

    #[test]
    fn test_gate_rejects_missing_extension() {
        let err = accept_upload("ratings", b"a|b", 1024).unwrap_err();
        assert!(matches!(err, AcceptError::UnsupportedExtension(ext) if ext.is_empty()));
    }

    #[test]
    fn test_gate_enforces_size_ceiling() {
        let err = accept_upload("ratings.txt", &[b'a'; 100], 10).unwrap_err();
        assert!(matches!(err, AcceptError::TooLarge { size: 100, limit: 10 }));
    }

    #[test]
    fn test_gate_requires_utf8() {
        let err = accept_upload("ratings.txt", &[0xff, 0xfe], 1024).unwrap_err();
        assert!(matches!(err, AcceptError::NotUtf8));
    }
}
