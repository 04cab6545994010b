use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::ErrorResponse;
use crate::domain::error::ErrorKind;
use crate::usecase::{
    CommitReservationError, ReserveQuotaError, ResetDueQuotasError, RollbackReservationError,
};

/// ApiError は REST ハンドラのエラー型。
#[derive(Debug)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.kind {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::AlreadyExists => StatusCode::CONFLICT,
            ErrorKind::RestrictionViolation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ReserveQuotaError> for ApiError {
    fn from(e: ReserveQuotaError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

impl From<CommitReservationError> for ApiError {
    fn from(e: CommitReservationError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

impl From<RollbackReservationError> for ApiError {
    fn from(e: RollbackReservationError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

impl From<ResetDueQuotasError> for ApiError {
    fn from(e: ResetDueQuotasError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.kind == ErrorKind::Internal {
            tracing::error!(error = %self.message, "request failed");
        }
        let body = ErrorResponse::new(self.kind.code(), &self.message);
        (self.status(), Json(body)).into_response()
    }
}
