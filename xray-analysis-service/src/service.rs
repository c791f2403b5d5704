use axum::{
    Router,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{HeaderMap, StatusCode},
    middleware::from_fn,
    response::Json,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use xray_prompting::benchmark::{
    self, BenchmarkConfig, BenchmarkReport, DEFAULT_CASES, DEFAULT_ITERATIONS, DEFAULT_SEED,
};
use xray_prompting::tokens::{self, TokenAnalysis};
use xray_prompting::{
    AdaptiveController, AnalysisError, AnalysisRequest, AnalysisSession, Analyzer, BusyRegistry,
    ErrorKind, ImagePayload, ImageSummary, MediaType, VisionModel, render_adaptive_report,
    render_report,
};
use xray_prompting::models::MAX_IMAGE_BYTES;

use crate::models::{
    AdaptiveRequest, AnalyzeRequest, AnalyzeResponse, BenchmarkQuery, TokenEstimateRequest,
};
use crate::telemetry::correlation_id_middleware;

/// Identifies the caller for busy tracking. Missing means one shared owner.
pub const CLIENT_HEADER: &str = "x-client-id";
const ANONYMOUS_CLIENT: &str = "anonymous";

/// A maximum-size image after base64 encoding, plus room for the JSON fields
/// around it. Oversized images still reach `ImagePayload` and get a 400.
const MAX_BODY_BYTES: usize = MAX_IMAGE_BYTES.div_ceil(3) * 4 + 64 * 1024;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;
type ApiError = (StatusCode, Json<Value>);

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn not_found_error(message: &str, id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": message,
            "session_id": id
        })),
    )
}

fn analysis_error(err: &AnalysisError) -> ApiError {
    let (status, message) = match err.kind() {
        ErrorKind::InvalidInput => (StatusCode::BAD_REQUEST, "Invalid request"),
        ErrorKind::Busy => (StatusCode::CONFLICT, "An analysis is already running"),
        ErrorKind::Upstream => (StatusCode::BAD_GATEWAY, "Vision model call failed"),
        ErrorKind::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "Analysis failed"),
    };
    (
        status,
        Json(json!({
            "error": message,
            "details": err.to_string()
        })),
    )
}

fn session_error(err: &AnalysisError, session_id: &str) -> ApiError {
    let (status, Json(mut body)) = analysis_error(err);
    body["session_id"] = json!(session_id);
    (status, Json(body))
}

#[derive(Clone)]
pub struct AppState {
    pub analyzer: Analyzer,
    pub controller: AdaptiveController,
    pub busy: BusyRegistry,
}

impl AppState {
    /// Single-call and adaptive analyses share one busy registry.
    pub fn new(model: Arc<dyn VisionModel>) -> Self {
        let busy = BusyRegistry::new();
        Self {
            analyzer: Analyzer::new(model.clone()),
            controller: AdaptiveController::new(model).with_busy_registry(busy.clone()),
            busy,
        }
    }
}

pub fn create_app(model: Arc<dyn VisionModel>) -> Router {
    build_router(AppState::new(model))
}

fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/analyze", post(analyze))
        .route("/adaptive", post(start_adaptive))
        .route(
            "/adaptive/{session_id}",
            get(get_session).delete(clear_session),
        )
        .route("/adaptive/{session_id}/report", get(session_report))
        .route("/tokens/estimate", post(estimate_tokens))
        .route("/benchmark", get(run_benchmark))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(from_fn(correlation_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Chest X-ray Prompting Service",
        "version": "0.1.0",
        "description": "Pneumonia screening prompts for a vision model, for education and research only",
        "endpoints": {
            "POST /analyze": "Single analysis with one prompt variant",
            "POST /adaptive": "Two-step adaptive analysis",
            "GET /adaptive/{session_id}": "Adaptive session status and steps",
            "DELETE /adaptive/{session_id}": "Discard an adaptive session",
            "GET /adaptive/{session_id}/report": "Plain-text adaptive report",
            "POST /tokens/estimate": "Token estimate, optimization and cost",
            "GET /benchmark": "Synthetic technique comparison (simulated data)",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

fn client_id(headers: &HeaderMap) -> String {
    headers
        .get(CLIENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(ANONYMOUS_CLIENT)
        .to_string()
}

fn decode_image(image_base64: &str, media_type: MediaType) -> Result<ImagePayload, ApiError> {
    ImagePayload::from_base64(image_base64, media_type).map_err(|e| {
        warn!(error = %e, "Rejected image upload");
        analysis_error(&e)
    })
}

async fn analyze(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AnalyzeRequest>,
) -> ApiResult<AnalyzeResponse> {
    let client = client_id(&headers);
    info!(client = %client, variant = %request.variant, "Analysis requested");

    let image = decode_image(&request.image_base64, request.media_type)?;
    let summary = ImageSummary {
        name: request.file_name.clone(),
        size_bytes: image.len(),
    };
    let _guard = state.busy.try_acquire(&client).map_err(|e| analysis_error(&e))?;

    let mut analysis_request = AnalysisRequest::new(image, request.variant);
    analysis_request.temperature = request.temperature;

    match state.analyzer.analyze(analysis_request).await {
        Ok(outcome) => {
            let report = render_report(&outcome, &summary);
            Ok(Json(AnalyzeResponse {
                analysis: outcome,
                report,
            }))
        }
        Err(e) => {
            error!(client = %client, error = %e, "Analysis failed");
            Err(analysis_error(&e))
        }
    }
}

async fn start_adaptive(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AdaptiveRequest>,
) -> ApiResult<AnalysisSession> {
    let client = client_id(&headers);
    let image = decode_image(&request.image_base64, request.media_type)?;

    let session_id = state
        .controller
        .open(&image, request.patient_context)
        .await
        .map_err(|e| analysis_error(&e))?;
    info!(client = %client, session_id = %session_id, "Adaptive analysis requested");

    match state.controller.run(&client, &session_id).await {
        Ok(session) => Ok(Json(session)),
        Err(e @ AnalysisError::Busy(_)) => {
            // The rejected run never started, so its session has nothing to keep.
            if let Err(clear_err) = state.controller.clear(&session_id).await {
                warn!(session_id = %session_id, error = %clear_err, "Failed to discard session");
            }
            Err(analysis_error(&e))
        }
        Err(e) => {
            error!(session_id = %session_id, error = %e, "Adaptive analysis failed");
            Err(session_error(&e, &session_id))
        }
    }
}

async fn load_session(state: &AppState, session_id: &str) -> Result<AnalysisSession, ApiError> {
    match state.controller.get(session_id).await {
        Ok(Some(session)) => Ok(session),
        Ok(None) => Err(not_found_error("Session not found", session_id)),
        Err(e) => {
            error!(session_id = %session_id, error = %e, "Failed to load session");
            Err(analysis_error(&e))
        }
    }
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<AnalysisSession> {
    load_session(&state, &session_id).await.map(Json)
}

async fn clear_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Value> {
    load_session(&state, &session_id).await?;
    state
        .controller
        .clear(&session_id)
        .await
        .map_err(|e| session_error(&e, &session_id))?;

    Ok(Json(json!({
        "session_id": session_id,
        "status": "cleared"
    })))
}

async fn session_report(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<String, ApiError> {
    let session = load_session(&state, &session_id).await?;
    render_adaptive_report(&session)
        .ok_or_else(|| not_found_error("Session has no completed steps", &session_id))
}

async fn estimate_tokens(Json(request): Json<TokenEstimateRequest>) -> ApiResult<TokenAnalysis> {
    if request.text.trim().is_empty() {
        return Err(bad_request_error("Text is required"));
    }
    let strategy = request.strategy.unwrap_or_default();
    let model = request.model.as_deref().unwrap_or(tokens::DEFAULT_MODEL);

    tokens::analyze_text(&request.text, strategy, model)
        .map(Json)
        .map_err(|e| analysis_error(&e))
}

async fn run_benchmark(Query(query): Query<BenchmarkQuery>) -> ApiResult<BenchmarkReport> {
    let config = BenchmarkConfig {
        seed: query.seed.unwrap_or(DEFAULT_SEED),
        cases: query.cases.unwrap_or(DEFAULT_CASES),
        iterations: query.iterations.unwrap_or(DEFAULT_ITERATIONS),
    };
    benchmark::run_benchmark(config)
        .map(Json)
        .map_err(|e| analysis_error(&e))
}
