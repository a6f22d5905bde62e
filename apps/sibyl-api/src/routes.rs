use axum::{
	Json, Router,
	extract::State,
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};

use sibyl_service::{AnswerRequest, AnswerResponse, Error as ServiceError};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/answer", post(answer))
		.with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
	Router::new().route("/v1/admin/invalidate", post(invalidate)).with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn answer(
	State(state): State<AppState>,
	Json(payload): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
	let response = state.service.answer(payload).await?;

	Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct InvalidateRequest {
	tenant_id: String,
}

#[derive(Debug, Serialize)]
struct InvalidateResponse {
	removed: usize,
}

async fn invalidate(
	State(state): State<AppState>,
	Json(payload): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>, ApiError> {
	if payload.tenant_id.trim().is_empty() {
		return Err(ApiError::new(
			StatusCode::BAD_REQUEST,
			"invalid_input",
			"tenant_id is required.",
		));
	}

	let removed = state.service.invalidate_tenant(&payload.tenant_id);

	Ok(Json(InvalidateResponse { removed }))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		let message = err.to_string();

		match err {
			ServiceError::QuotaExceeded { .. } => {
				Self::new(StatusCode::TOO_MANY_REQUESTS, "quota_exceeded", message)
			},
			ServiceError::InvalidInput { .. } => {
				Self::new(StatusCode::BAD_REQUEST, "invalid_input", message)
			},
			ServiceError::EmbeddingUnavailable { .. } => {
				Self::new(StatusCode::SERVICE_UNAVAILABLE, "embedding_unavailable", message)
			},
			ServiceError::RetrievalUnavailable { .. } => {
				Self::new(StatusCode::SERVICE_UNAVAILABLE, "retrieval_unavailable", message)
			},
			ServiceError::GenerationUnavailable { .. } => {
				Self::new(StatusCode::BAD_GATEWAY, "generation_unavailable", message)
			},
			ServiceError::Cache { .. } => {
				Self::new(StatusCode::INTERNAL_SERVER_ERROR, "cache_error", message)
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
