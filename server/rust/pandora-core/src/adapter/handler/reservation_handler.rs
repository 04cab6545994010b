use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::error::ApiError;
use super::AppState;
use crate::domain::entity::Reservation;
use crate::usecase::reserve_quota::ReserveQuotaInput;
use crate::usecase::{CommitReservationError, ReserveQuotaError, RollbackReservationError};

/// POST /api/v1/reservations のリクエストボディ。
#[derive(Debug, Deserialize)]
pub struct ReserveQuotaRequest {
    pub environment_id: String,
    pub service_id: String,
}

/// POST /api/v1/reservations
///
/// クォータを1単位減算して予約を作成する。枯渇時は 422、紐づけが無ければ 404。
pub async fn reserve_quota(
    State(state): State<AppState>,
    Json(req): Json<ReserveQuotaRequest>,
) -> Result<(StatusCode, Json<Reservation>), ApiError> {
    let ctx = state.shutdown.child_token();
    let input = ReserveQuotaInput {
        environment_id: req.environment_id,
        service_id: req.service_id,
    };
    let result = state.reserve_uc.execute(&ctx, &input).await;
    state
        .metrics
        .record_reservation("reserve", result.as_ref().err().map(ReserveQuotaError::kind));
    Ok((StatusCode::CREATED, Json(result?)))
}

/// POST /api/v1/reservations/{id}/commit
pub async fn commit_reservation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let ctx = state.shutdown.child_token();
    let result = state.commit_uc.execute(&ctx, &id).await;
    state.metrics.record_reservation(
        "commit",
        result.as_ref().err().map(CommitReservationError::kind),
    );
    result?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/reservations/{id}/rollback
pub async fn rollback_reservation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let ctx = state.shutdown.child_token();
    let result = state.rollback_uc.execute(&ctx, &id).await;
    state.metrics.record_reservation(
        "rollback",
        result.as_ref().err().map(RollbackReservationError::kind),
    );
    result?;
    Ok(StatusCode::NO_CONTENT)
}
