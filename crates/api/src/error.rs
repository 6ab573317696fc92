//! Error rendering for HTTP responses.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use payout_core::instant_payout::PayoutError;
use payout_shared::AppError;
use tracing::error;

/// Handler error; renders the [`AppError`] envelope.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        Self(e)
    }
}

impl From<PayoutError> for ApiError {
    fn from(e: PayoutError) -> Self {
        Self(e.into())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        Self(AppError::Validation(e.body_text()))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self(AppError::Validation(e.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(error = %self.0, code = self.0.error_code(), "Request failed");
        }
        (status, Json(self.0.to_body())).into_response()
    }
}
