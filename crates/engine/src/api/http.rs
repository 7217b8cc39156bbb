//! HTTP routes.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use storyforge_domain::{
    ChallengeLevel, GenerationRequest, Genre, Requester, StoryLength, StoryRun, StoryRunId,
    StoryStep,
};

use crate::app::App;
use crate::use_cases::gate::RateLimitDecision;
use crate::use_cases::generation::GenerationError;
use crate::use_cases::story::QuotaStatusOutput;

/// Create all HTTP routes.
pub fn routes() -> Router<Arc<App>> {
    Router::new()
        .route("/", get(health))
        .route("/api/health", get(health))
        .route("/api/stories", post(start_story))
        .route("/api/stories/{id}", get(get_story))
        .route("/api/stories/{id}/steps", get(list_steps).post(continue_story))
        .route("/api/quota", get(quota))
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartStoryRequest {
    genre: String,
    length: String,
    #[serde(default)]
    challenge: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StoryStepResponse {
    run: StoryRun,
    step: StoryStep,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    notices: Vec<String>,
    remaining_requests: u32,
}

async fn start_story(
    State(app): State<Arc<App>>,
    headers: HeaderMap,
    Json(body): Json<StartStoryRequest>,
) -> Result<Json<StoryStepResponse>, ApiError> {
    let requester = requester_from_headers(&headers)?;
    let genre = Genre::from_str(&body.genre).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let length =
        StoryLength::from_str(&body.length).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let challenge = match body.challenge.as_deref() {
        Some(raw) => {
            ChallengeLevel::from_str(raw).map_err(|e| ApiError::BadRequest(e.to_string()))?
        }
        None => ChallengeLevel::Casual,
    };

    let output = app
        .use_cases
        .story
        .start_run
        .execute(GenerationRequest::new(genre, length, challenge, requester))
        .await?;

    Ok(Json(StoryStepResponse {
        run: output.run,
        step: output.step,
        notices: output.notices,
        remaining_requests: output.remaining_requests,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContinueStoryRequest {
    choice_id: String,
}

async fn continue_story(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<ContinueStoryRequest>,
) -> Result<Json<StoryStepResponse>, ApiError> {
    let requester = requester_from_headers(&headers)?;
    if body.choice_id.trim().is_empty() {
        return Err(ApiError::BadRequest("choiceId cannot be empty".to_string()));
    }

    let output = app
        .use_cases
        .story
        .continue_run
        .execute(StoryRunId::from_uuid(id), &requester, &body.choice_id)
        .await?;

    Ok(Json(StoryStepResponse {
        run: output.run,
        step: output.step,
        notices: output.notices,
        remaining_requests: output.remaining_requests,
    }))
}

async fn get_story(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<StoryRun>, ApiError> {
    let requester = requester_from_headers(&headers)?;
    let run = app
        .use_cases
        .story
        .get_run
        .execute(StoryRunId::from_uuid(id), &requester)
        .await?;
    Ok(Json(run))
}

async fn list_steps(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<Vec<StoryStep>>, ApiError> {
    let requester = requester_from_headers(&headers)?;
    let steps = app
        .use_cases
        .story
        .get_run
        .steps(StoryRunId::from_uuid(id), &requester)
        .await?;
    Ok(Json(steps))
}

async fn quota(
    State(app): State<Arc<App>>,
    headers: HeaderMap,
) -> Result<Json<QuotaStatusOutput>, ApiError> {
    let requester = requester_from_headers(&headers)?;
    let status = app.use_cases.story.quota_status.execute(&requester).await;
    Ok(Json(status))
}

/// Resolve the caller's identity from headers.
///
/// Authenticated callers send `X-User-Id` (verified upstream by the auth
/// proxy); guests send their locally persisted `X-Session-Id`.
fn requester_from_headers(headers: &HeaderMap) -> Result<Requester, ApiError> {
    if let Some(user_id) = header_str(headers, "x-user-id") {
        return Ok(Requester::user(user_id));
    }
    if let Some(session_id) = header_str(headers, "x-session-id") {
        return Ok(Requester::guest(session_id));
    }
    Err(ApiError::BadRequest(
        "X-User-Id or X-Session-Id header required".to_string(),
    ))
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[derive(Debug)]
pub enum ApiError {
    NotFound,
    BadRequest(String),
    QuotaExceeded(RateLimitDecision),
    FeatureDenied(&'static str),
    UpstreamFailed { errors: Vec<String>, can_retry: bool },
    Conflict(String),
    Internal(String),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    can_retry: Option<bool>,
    #[serde(flatten)]
    quota: Option<&'a RateLimitDecision>,
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        match self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Not found").into_response(),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg).into_response(),
            ApiError::QuotaExceeded(decision) => (
                StatusCode::TOO_MANY_REQUESTS,
                Json(ErrorBody {
                    error: "daily_limit_reached",
                    reason: None,
                    details: None,
                    can_retry: None,
                    quota: Some(&decision),
                }),
            )
                .into_response(),
            ApiError::FeatureDenied(reason) => (
                StatusCode::FORBIDDEN,
                Json(ErrorBody {
                    error: "premium_required",
                    reason: Some(reason),
                    details: None,
                    can_retry: None,
                    quota: None,
                }),
            )
                .into_response(),
            ApiError::UpstreamFailed { errors, can_retry } => (
                StatusCode::BAD_GATEWAY,
                Json(ErrorBody {
                    error: "generation_failed",
                    reason: None,
                    details: Some(&errors),
                    can_retry: Some(can_retry),
                    quota: None,
                }),
            )
                .into_response(),
            ApiError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}

impl From<GenerationError> for ApiError {
    fn from(e: GenerationError) -> Self {
        match e {
            GenerationError::QuotaExceeded { decision } => ApiError::QuotaExceeded(decision),
            GenerationError::FeatureDenied { reason } => ApiError::FeatureDenied(reason.code()),
            GenerationError::ProducerExhausted {
                errors, can_retry, ..
            } => ApiError::UpstreamFailed { errors, can_retry },
            GenerationError::RunNotFound => ApiError::NotFound,
            GenerationError::RunCompleted => {
                ApiError::Conflict("Story run is already completed".to_string())
            }
            GenerationError::UnknownChoice(id) => {
                ApiError::BadRequest(format!("Unknown choice: {}", id))
            }
            GenerationError::Repo(e) => ApiError::Internal(e.to_string()),
            GenerationError::Domain(e) => ApiError::Internal(e.to_string()),
        }
    }
}
