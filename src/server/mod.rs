//! Web front end: upload page, conversion endpoint and progress stream.

pub mod sse;
pub mod ui;

use crate::{
    config::Config,
    core::converter::{MusicConverter, Toolchain},
    error::PlayerError,
    io::progress::{ConvertProgress, Reporter},
};
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::{fs, sync::Arc};
use thiserror::Error;
use tokio::sync::{broadcast, Mutex, RwLock};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub tools: Toolchain,
    /// Progress of the running conversion, fanned out to SSE clients
    pub events: broadcast::Sender<ConvertProgress>,
    /// Held for the duration of a conversion; the scratch directory is shared
    pub run_lock: Arc<Mutex<()>>,
    pub startup_time: DateTime<Utc>,
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(config: Arc<Config>, tools: Toolchain) -> Self {
        let (events, _) = broadcast::channel(100);
        Self {
            config,
            tools,
            events,
            run_lock: Arc::new(Mutex::new(())),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - a conversion is already running
    #[error("{0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Pipeline failure, shown to the user as-is
    #[error(transparent)]
    Pipeline(#[from] PlayerError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Pipeline(e) => match e {
                PlayerError::UnsupportedInput(_) => {
                    (StatusCode::UNSUPPORTED_MEDIA_TYPE, "UNSUPPORTED_INPUT")
                }
                PlayerError::NoSymbolicOutput | PlayerError::NotationParse => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "UNREADABLE_SCORE")
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "PIPELINE_ERROR"),
            },
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let max_upload = state.config.server.max_upload_mb * 1024 * 1024;

    Router::new()
        .route("/", get(ui::root_page))
        .route("/health", get(health_check))
        .route("/events", get(sse::event_stream))
        .route("/api/convert", post(convert_upload))
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: Arc<Config>, tools: Toolchain) -> anyhow::Result<()> {
    let bind = config.server.bind.clone();
    let app = build_router(AppState::new(config, tools));

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("Listening on http://{}", bind);

    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub busy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let last_error = state.last_error.read().await.clone();

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime.num_seconds().max(0) as u64,
        busy: state.run_lock.try_lock().is_err(),
        last_error,
    })
}

/// POST /api/convert
///
/// Multipart upload with a `file` field. Responds with the MP3 bytes, or a
/// JSON error whose message is meant to be shown verbatim.
pub async fn convert_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Response> {
    // Before the body is read.
    let _guard = state
        .run_lock
        .clone()
        .try_lock_owned()
        .map_err(|_| ApiError::Conflict("A conversion is already running. Try again shortly.".into()))?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        upload = Some((name, bytes));
    }
    let (file_name, bytes) =
        upload.ok_or_else(|| ApiError::BadRequest("missing `file` field".into()))?;
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("uploaded file is empty".into()));
    }

    info!("Converting {} ({} bytes)", file_name, bytes.len());

    let events = state.events.clone();
    let reporter: Reporter = Arc::new(move |p: ConvertProgress| {
        // No subscribers is fine.
        let _ = events.send(p);
    });
    let converter =
        MusicConverter::new(state.config.clone(), state.tools.clone()).with_reporter(reporter);

    let outcome = tokio::task::spawn_blocking(move || {
        let result = converter.convert(&bytes, &file_name)?;
        let mp3 = fs::read(&result.mp3_path)?;
        Ok::<_, PlayerError>((result, mp3))
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    let (result, mp3) = match outcome {
        Ok(v) => v,
        Err(e) => {
            error!("Conversion failed: {}", e);
            *state.last_error.write().await = Some(e.to_string());
            return Err(e.into());
        }
    };

    let disposition = format!(
        "inline; filename=\"{}\"",
        state.config.audio.download_name
    );
    let mut response = (
        [
            (header::CONTENT_TYPE, "audio/mpeg".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        mp3,
    )
        .into_response();

    if let Some(secs) = result.duration_secs {
        if let Ok(v) = format!("{secs:.2}").parse() {
            response.headers_mut().insert("x-audio-duration", v);
        }
    }
    Ok(response)
}
