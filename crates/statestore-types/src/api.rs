//! HTTP payloads for the statestore front end.
//!
//! Successful responses are plain bodies: the raw stored bytes, or one of the
//! confirmation lines below. Failures that need an explanation are rendered
//! as an [`ErrorResponse`] JSON document through [`APIError`].

use axum::{
	http::StatusCode,
	response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Body returned after a successful write.
pub const WRITE_SUCCEEDED_BODY: &str = "Succeeded to store your request.\n";

/// Body returned when the write could not be persisted.
pub const WRITE_FAILED_BODY: &str = "Failed to store your request.\n";

/// Machine-readable failure codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	/// Submitted order body could not be decoded.
	InvalidOrder,
	/// The state store could not be reached in time.
	StateStoreUnavailable,
	/// The state store answered with a failure.
	StateStoreError,
}

/// JSON error document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	pub error: ErrorCode,
	pub message: String,
}

/// Failure returned from a route handler.
#[derive(Debug, Error)]
pub enum APIError {
	#[error("Bad Request: {message}")]
	BadRequest { code: ErrorCode, message: String },
	#[error("Service Unavailable: {message}")]
	ServiceUnavailable { code: ErrorCode, message: String },
	#[error("Internal Server Error: {message}")]
	InternalServerError { code: ErrorCode, message: String },
}

impl APIError {
	pub fn status(&self) -> StatusCode {
		match self {
			APIError::BadRequest { .. } => StatusCode::BAD_REQUEST,
			APIError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
			APIError::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	/// Builds the JSON document sent to the client.
	pub fn body(&self) -> ErrorResponse {
		let (code, message) = match self {
			APIError::BadRequest { code, message }
			| APIError::ServiceUnavailable { code, message }
			| APIError::InternalServerError { code, message } => (*code, message),
		};
		ErrorResponse {
			error: code,
			message: message.clone(),
		}
	}
}

impl IntoResponse for APIError {
	fn into_response(self) -> Response {
		(self.status(), Json(self.body())).into_response()
	}
}
