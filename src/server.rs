//! HTTP front end for the analysis pipeline.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use eyre::Result;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};

use crate::error::AnalysisError;
use crate::metadata::{self, VideoInfo};
use crate::pipeline::Analyzer;
use crate::{AnalysisResult, extract_video_id};

/// Shared, read-only application state
pub struct AppState {
    analyzer: Analyzer,
    http: reqwest::Client,
    youtube_api_key: Option<String>,
}

impl AppState {
    pub fn new(analyzer: Analyzer, http: reqwest::Client, youtube_api_key: Option<String>) -> Self {
        Self {
            analyzer,
            http,
            youtube_api_key,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(rename = "videoId")]
    pub video_id: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

fn status_for(err: &AnalysisError) -> StatusCode {
    match err {
        AnalysisError::InvalidInput(_) | AnalysisError::NoTranscript { .. } => StatusCode::BAD_REQUEST,
        AnalysisError::Provider(_) => StatusCode::BAD_GATEWAY,
        AnalysisError::ParseFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        ApiError::new(status_for(&err), err.public_message())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/youtube/analyze", post(analyze))
        .route("/api/youtube/video/{id}", get(video_info))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(tracing::Level::INFO))
                .on_response(DefaultOnResponse::new().level(tracing::Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// Serve until Ctrl-C
pub async fn serve(bind: &str, state: AppState) -> Result<()> {
    let app = router(Arc::new(state));
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install Ctrl-C handler: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let Json(req) = payload.map_err(|rejection| {
        warn!("Rejected analysis request body: {}", rejection.body_text());
        ApiError::new(StatusCode::BAD_REQUEST, "Invalid request body")
    })?;
    let Some(video_id) = extract_video_id(&req.video_id) else {
        warn!("Rejected analysis request with unresolvable video ID {:?}", req.video_id);
        return Err(AnalysisError::InvalidInput(req.video_id).into());
    };

    let analysis = state.analyzer.analyze(&video_id).await?;
    Ok(Json(analysis))
}

async fn video_info(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<VideoInfo>, ApiError> {
    let Some(video_id) = extract_video_id(&id) else {
        return Err(AnalysisError::InvalidInput(id).into());
    };
    let Some(api_key) = state.youtube_api_key.as_deref() else {
        return Err(ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "YouTube API key is not configured",
        ));
    };

    match metadata::fetch_video_info(&state.http, api_key, &video_id).await {
        Ok(Some(info)) => Ok(Json(info)),
        Ok(None) => Err(ApiError::new(StatusCode::NOT_FOUND, "Video not found")),
        Err(e) => {
            warn!("Failed to fetch video info for {video_id}: {e:#}");
            Err(ApiError::new(StatusCode::BAD_GATEWAY, "Failed to fetch video information"))
        }
    }
}
