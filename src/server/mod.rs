//! HTTP adapter
//!
//! Thin axum layer over [`IntentPipeline`]: request bodies are decoded here,
//! every decision is made by the pipeline.

mod error;

pub use error::ApiError;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use http::{HeaderValue, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tracing::warn;

use crate::error::IntentError;
use crate::jobs::{JobRegistry, JobState};
use crate::pipeline::{Checked, FastFillRequest, FillRequest, IntentPipeline};
use error::invalid_document;

pub const SERVICE_NAME: &str = "cfd-intent";

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<IntentPipeline>,
    pub jobs: JobRegistry,
}

impl AppState {
    pub fn new(pipeline: IntentPipeline, jobs: JobRegistry) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            jobs,
        }
    }
}

pub fn app(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/intent/profiles", get(list_profiles))
        .route("/schemas/intent/:profile_slug", get(profile_documents))
        .route("/intent/summary", post(intent_summary))
        .route("/intent/fill_fast", post(intent_fill_fast))
        .route("/intent/validate", post(intent_validate))
        .route("/intent/save", post(intent_save))
        .route("/intent/fill", post(intent_fill))
        .route("/intent/apply", post(intent_apply))
        .route("/jobs", get(list_jobs))
        .route("/jobs/:job_id", get(get_job))
        .route("/jobs/:job_id/state", post(update_job_state))
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

/// Listed origins with credentials; a `*` entry opens CORS to any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(origin = %origin, error = %err, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    if body.is_empty() {
        return Err(ApiError::bad_request("request body is required"));
    }

    serde_json::from_slice(body)
        .map_err(|err| ApiError::bad_request(format!("invalid JSON body: {err}")))
}

#[derive(Debug, Deserialize)]
struct IntentBody {
    intent: Value,
}

#[derive(Debug, Deserialize)]
struct ValidateBody {
    intent: Value,
    #[serde(default)]
    profile_slug: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SaveBody {
    intent: Value,
    #[serde(default)]
    profile_slug: Option<String>,
    #[serde(default)]
    job_meta: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct JobStateBody {
    state: JobState,
    #[serde(default)]
    detail: Option<String>,
}

async fn health() -> Json<Value> {
    Json(json!({
        "ok": true,
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn list_profiles(State(state): State<AppState>) -> Json<Value> {
    Json(json!({"items": state.pipeline.registry().listings()}))
}

async fn profile_documents(
    State(state): State<AppState>,
    Path(profile_slug): Path<String>,
) -> Result<Response, ApiError> {
    match state.pipeline.profile_documents(&profile_slug) {
        Ok(documents) => Ok(Json(documents).into_response()),
        Err(IntentError::UnknownProfile(slug)) => {
            Err(ApiError::not_found(format!("unknown profile: {slug}")))
        }
        Err(err) => Err(err.into()),
    }
}

async fn intent_summary(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let request: IntentBody = parse_json(&body)?;
    match state.pipeline.summarize(&request.intent)? {
        Checked::Valid(summary) => {
            Ok(Json(json!({"valid": true, "human_summary": summary})).into_response())
        }
        Checked::Invalid(report) => Ok(invalid_document(report)),
    }
}

async fn intent_fill_fast(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request: FastFillRequest = parse_json(&body)?;
    let outcome = state.pipeline.fill_fast(request).await?;
    Ok(Json(outcome).into_response())
}

async fn intent_validate(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let request: ValidateBody = parse_json(&body)?;
    let outcome = state
        .pipeline
        .validate_intent(&request.intent, request.profile_slug.as_deref())?;
    Ok(Json(outcome).into_response())
}

async fn intent_save(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let request: SaveBody = parse_json(&body)?;
    let saved = match state.pipeline.save(
        &request.intent,
        request.profile_slug.as_deref(),
        request.job_meta.as_ref(),
    )? {
        Checked::Valid(saved) => saved,
        Checked::Invalid(report) => return Ok(invalid_document(report)),
    };

    if let Err(err) = state
        .jobs
        .register(saved.job_id.clone(), Some(saved.profile_slug.clone()))
        .await
    {
        warn!(job_id = %saved.job_id, error = %err, "saved intent not registered as a job");
    }
    Ok(Json(saved).into_response())
}

async fn intent_fill(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let request: FillRequest = parse_json(&body)?;
    let outcome = state.pipeline.fill(request).await?;
    Ok(Json(outcome).into_response())
}

async fn intent_apply(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let request: IntentBody = parse_json(&body)?;
    match state.pipeline.apply(&request.intent)? {
        Checked::Valid(archived) => Ok(Json(archived).into_response()),
        Checked::Invalid(report) => {
            let first = report
                .issues
                .first()
                .map(ToString::to_string)
                .unwrap_or_default();
            Err(ApiError::bad_request(format!("Schema validation failed: {first}")))
        }
    }
}

async fn list_jobs(State(state): State<AppState>) -> Result<Response, ApiError> {
    let jobs = state.jobs.list().await?;
    Ok(Json(json!({"items": jobs})).into_response())
}

async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Response, ApiError> {
    match state.jobs.get(job_id.clone()).await? {
        Some(record) => Ok(Json(record).into_response()),
        None => Err(ApiError::not_found(format!("unknown job: {job_id}"))),
    }
}

/// State reports from the solver supervisor.
async fn update_job_state(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request: JobStateBody = parse_json(&body)?;
    let record = state
        .jobs
        .transition(job_id, request.state, request.detail)
        .await?;
    Ok((StatusCode::OK, Json(record)).into_response())
}
