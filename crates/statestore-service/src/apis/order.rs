//! Order endpoints.
//!
//! `GET /order` hands back whatever the state store holds for the order key,
//! byte for byte. `POST /neworder` decodes the submitted order and replaces
//! the stored one.

use axum::{
	http::{header::CONTENT_TYPE, StatusCode},
	response::{IntoResponse, Response},
};
use statestore_storage::{StateService, StateStoreError};
use statestore_types::{
	APIError, DecodePolicy, ErrorCode, OrderDecodeError, OrderRecord, WRITE_FAILED_BODY,
	WRITE_SUCCEEDED_BODY,
};
use thiserror::Error;
use tracing::{info, warn};

/// Errors that can occur while storing a new order.
#[derive(Debug, Error)]
pub enum OrderError {
	#[error(transparent)]
	InvalidOrder(#[from] OrderDecodeError),
	#[error("Failed to persist order: {0}")]
	Store(#[from] StateStoreError),
}

impl IntoResponse for OrderError {
	fn into_response(self) -> Response {
		match self {
			OrderError::InvalidOrder(e) => APIError::BadRequest {
				code: ErrorCode::InvalidOrder,
				message: e.to_string(),
			}
			.into_response(),
			// Clients match on this exact body
			OrderError::Store(_) => {
				(StatusCode::INTERNAL_SERVER_ERROR, WRITE_FAILED_BODY).into_response()
			},
		}
	}
}

/// Maps a failed read to an HTTP error.
fn read_failure(err: StateStoreError) -> APIError {
	if err.is_unavailable() {
		APIError::ServiceUnavailable {
			code: ErrorCode::StateStoreUnavailable,
			message: err.to_string(),
		}
	} else {
		APIError::InternalServerError {
			code: ErrorCode::StateStoreError,
			message: err.to_string(),
		}
	}
}

/// Handles GET /order.
///
/// Returns the stored bytes verbatim; an order that was never written yields
/// an empty 200 response.
pub async fn get_order(state: &StateService) -> Result<Response, APIError> {
	let bytes = state.read_order().await.map_err(|e| {
		warn!(error = %e, "Unable to read order state");
		read_failure(e)
	})?;

	if bytes.is_empty() {
		return Ok(StatusCode::OK.into_response());
	}
	Ok(([(CONTENT_TYPE, "application/json")], bytes).into_response())
}

/// Handles POST /neworder.
pub async fn create_order(
	state: &StateService,
	body: &[u8],
	policy: DecodePolicy,
) -> Result<Response, OrderError> {
	let order = OrderRecord::decode(body, policy).inspect_err(|e| {
		warn!(error = %e, "Rejected malformed order");
	})?;
	info!(order_id = %order.order_id(), "Got a new order");

	state.write_order(&order).await.map_err(|e| {
		warn!(order_id = %order.order_id(), error = %e, "Failed to persist state");
		OrderError::Store(e)
	})?;

	info!(order_id = %order.order_id(), "Successfully persisted state");
	Ok((StatusCode::OK, WRITE_SUCCEEDED_BODY).into_response())
}
