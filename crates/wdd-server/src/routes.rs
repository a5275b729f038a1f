use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use wdd_core::error::AppError;
use wdd_core::job_queue::JobQueue;
use wdd_core::models::{FingerprintKey, validate_timestamp};
use wdd_core::traits::FingerprintStore;

use crate::dto::{
    CAPTURE_NOT_FOUND, CalculateQuery, CalculateResponse, CompressedCapturesResponse,
    ErrorResponse, HealthResponse, JobQuery, JobStatusResponse, NOT_CAPTURED, STATUS_COMPLETE,
    STATUS_PENDING, STATUS_STARTED, SimhashQuery, SimhashResponse, capture_pairs,
};
use crate::error::{ApiError, error_response};
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Build the full router with all routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/calculate-simhash", get(calculate_simhash))
        .route("/simhash", get(get_simhash))
        .route("/job", get(get_job).delete(cancel_job))
        .route("/health", get(health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Parameter validation
// ---------------------------------------------------------------------------

fn require_url(url: Option<String>) -> Result<String, AppError> {
    match url.map(|u| u.trim().to_string()) {
        Some(u) if !u.is_empty() => Ok(u),
        _ => Err(AppError::InvalidInput("URL is required".into())),
    }
}

/// Parse a four-digit year.
fn parse_year(raw: &str) -> Result<i32, AppError> {
    match raw.trim().parse::<i32>() {
        Ok(year) if (1000..=9999).contains(&year) => Ok(year),
        _ => Err(AppError::InvalidInput(format!("Invalid year format: {raw:?}"))),
    }
}

fn parse_job_id(raw: Option<String>) -> Result<Uuid, AppError> {
    let raw = raw.ok_or_else(|| AppError::InvalidInput("Job ID is required".into()))?;
    raw.trim()
        .parse()
        .map_err(|_| AppError::InvalidInput(format!("Invalid job ID: {raw:?}")))
}

// ---------------------------------------------------------------------------
// Fingerprinting
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/calculate-simhash",
    params(CalculateQuery),
    responses(
        (status = 200, description = "Job started, or already active", body = CalculateResponse),
        (status = 400, description = "Missing URL or invalid year", body = ErrorResponse),
    ),
    tag = "simhash"
)]
pub async fn calculate_simhash(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CalculateQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let url = require_url(query.url)?;
    let year = parse_year(query.year.as_deref().unwrap_or_default())?;

    let enqueued = state.db.job_repo().enqueue(&url, year).await?;
    let task = enqueued.job.task_key();
    let status = if enqueued.created {
        tracing::info!(job_id = %enqueued.job.id, %task, "Job enqueued");
        STATUS_STARTED
    } else {
        tracing::debug!(job_id = %enqueued.job.id, %task, "Job already active");
        STATUS_PENDING
    };

    Ok(axum::Json(CalculateResponse {
        status: status.to_string(),
        job_id: enqueued.job.id,
    }))
}

#[utoipa::path(
    get,
    path = "/simhash",
    params(SimhashQuery),
    responses(
        (status = 200, description = "`{simhash}` for a timestamp; `[[timestamp, simhash], ...]` or a compressed listing for a year", body = SimhashResponse),
        (status = 400, description = "Missing URL, or neither timestamp nor year", body = ErrorResponse),
        (status = 404, description = "CAPTURE_NOT_FOUND or NOT_CAPTURED", body = ErrorResponse),
    ),
    tag = "simhash"
)]
pub async fn get_simhash(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SimhashQuery>,
) -> Result<Response, ApiError> {
    let url = require_url(query.url)?;

    if let Some(timestamp) = query.timestamp.filter(|t| !t.is_empty()) {
        validate_timestamp(&timestamp)?;
        let key = FingerprintKey::new(&url, &timestamp);
        return match state.db.fingerprint_repo().get(&key).await? {
            Some(simhash) => Ok(axum::Json(SimhashResponse { simhash }).into_response()),
            None => Ok(error_response(
                StatusCode::NOT_FOUND,
                "not_found",
                CAPTURE_NOT_FOUND,
            )),
        };
    }

    if let Some(raw_year) = query.year.filter(|y| !y.is_empty()) {
        let year = parse_year(&raw_year)?;

        let mut fingerprints = state.db.fingerprint_repo().list_for_url(&url).await?;
        fingerprints.retain(|f| f.in_year(year));
        if fingerprints.is_empty() {
            return Ok(error_response(
                StatusCode::NOT_FOUND,
                "not_found",
                NOT_CAPTURED,
            ));
        }

        let captures = capture_pairs(fingerprints);
        if query.compress.as_deref() == Some("1") {
            let status = match state.db.job_repo().find_active(&url, year).await? {
                Some(_) => STATUS_PENDING,
                None => STATUS_COMPLETE,
            };
            return Ok(axum::Json(CompressedCapturesResponse {
                total: captures.len(),
                captures,
                status: status.to_string(),
            })
            .into_response());
        }
        return Ok(axum::Json(captures).into_response());
    }

    Err(AppError::InvalidInput("Either timestamp or year is required".into()).into())
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/job",
    params(JobQuery),
    responses(
        (status = 200, description = "Job status", body = JobStatusResponse),
        (status = 400, description = "Missing or malformed job ID", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
    ),
    tag = "jobs"
)]
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Query(query): Query<JobQuery>,
) -> Result<Response, ApiError> {
    let id = parse_job_id(query.job_id)?;

    match state.db.job_repo().get_job(id).await? {
        Some(job) => Ok(axum::Json(JobStatusResponse::from(job)).into_response()),
        None => Ok(error_response(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("Job not found: {id}"),
        )),
    }
}

#[utoipa::path(
    delete,
    path = "/job",
    params(JobQuery),
    responses(
        (status = 204, description = "Job cancelled"),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 409, description = "Conflict", body = ErrorResponse),
    ),
    tag = "jobs"
)]
pub async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Query(query): Query<JobQuery>,
) -> Result<Response, ApiError> {
    let id = parse_job_id(query.job_id)?;
    let repo = state.db.job_repo();

    let Some(job) = repo.get_job(id).await? else {
        return Ok(error_response(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("Job not found: {id}"),
        ));
    };

    // The job may reach a terminal state between the read and the update.
    if job.status.is_terminal() || !repo.cancel_job(id).await? {
        let current = repo.get_job(id).await?.map_or(job.status, |j| j.status);
        return Ok(error_response(
            StatusCode::CONFLICT,
            "conflict",
            format!("Job {id} is already in terminal state: {current}"),
        ));
    }

    tracing::info!(job_id = %id, "Job cancellation requested");
    Ok(StatusCode::NO_CONTENT.into_response())
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is unhealthy", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let db_ok = state.db.health_check().await.is_ok();

    let response = HealthResponse {
        status: if db_ok { "healthy" } else { "unhealthy" },
        database: if db_ok { "ok" } else { "error" },
    };
    let status = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, axum::Json(response))
}
