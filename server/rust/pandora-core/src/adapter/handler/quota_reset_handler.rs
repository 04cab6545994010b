use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::error::ApiError;
use super::AppState;
use crate::domain::entity::{ProjectResetReport, ServiceResetFailure};

#[derive(Debug, Serialize)]
pub struct QuotaResetResponse {
    pub today: DateTime<Utc>,
    pub projects: Vec<ProjectResetReport>,
    pub failures: Vec<ServiceResetFailure>,
}

/// POST /api/v1/quota-resets
///
/// 定期実行と同じ直列ガードの下でリセットを即時実行する。
pub async fn run_quota_reset(
    State(state): State<AppState>,
) -> Result<Json<QuotaResetResponse>, ApiError> {
    let output = state.reset_scheduler.trigger().await?;
    Ok(Json(QuotaResetResponse {
        today: output.today,
        projects: output.projects,
        failures: output.failures,
    }))
}
