pub mod error;
pub mod health;
pub mod http_metrics;
pub mod quota_reset_handler;
pub mod reservation_handler;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use crate::infrastructure::metrics::Metrics;
use crate::infrastructure::reset_scheduler::QuotaResetScheduler;
use crate::usecase::{CommitReservationUseCase, ReserveQuotaUseCase, RollbackReservationUseCase};

/// AppState は REST ハンドラの共有状態。
#[derive(Clone)]
pub struct AppState {
    pub reserve_uc: Arc<ReserveQuotaUseCase>,
    pub commit_uc: Arc<CommitReservationUseCase>,
    pub rollback_uc: Arc<RollbackReservationUseCase>,
    pub reset_scheduler: Arc<QuotaResetScheduler>,
    pub metrics: Arc<Metrics>,
    /// インメモリストア利用時は None。
    pub db_pool: Option<Arc<PgPool>>,
    /// シャットダウン時に処理中のリクエストをキャンセルする親トークン。
    pub shutdown: CancellationToken,
}

/// REST API ルーターを構築する。
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/metrics", get(health::metrics))
        .route(
            "/api/v1/reservations",
            post(reservation_handler::reserve_quota),
        )
        .route(
            "/api/v1/reservations/{id}/commit",
            post(reservation_handler::commit_reservation),
        )
        .route(
            "/api/v1/reservations/{id}/rollback",
            post(reservation_handler::rollback_reservation),
        )
        .route(
            "/api/v1/quota-resets",
            post(quota_reset_handler::run_quota_reset),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.metrics.clone(),
            http_metrics::track_http_metrics,
        ))
        .with_state(state)
}

/// ErrorResponse は統一エラーレスポンス。
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, serde::Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub request_id: String,
    pub details: Vec<String>,
}

impl ErrorResponse {
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            error: ErrorBody {
                code: code.to_string(),
                message: message.to_string(),
                request_id: uuid::Uuid::new_v4().to_string(),
                details: vec![],
            },
        }
    }
}
