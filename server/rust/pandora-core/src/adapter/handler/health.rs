use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use super::AppState;

/// DB 疎通確認の上限時間。
const READINESS_DB_TIMEOUT: Duration = Duration::from_secs(2);

/// GET /healthz
///
/// プロセスが応答できることだけを示す。ストアには触れない。
pub async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /readyz
///
/// PostgreSQL 利用時は `SELECT 1` で疎通を確認する。インメモリストアでは skipped。
/// リセットスケジューラが停止済み（シャットダウン中）の場合も 503 を返す。
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let mut overall_ok = true;

    let db_status = match state.db_pool {
        Some(ref pool) => {
            let ping = sqlx::query("SELECT 1").execute(pool.as_ref());
            match tokio::time::timeout(READINESS_DB_TIMEOUT, ping).await {
                Ok(Ok(_)) => "ok",
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "readiness database check failed");
                    overall_ok = false;
                    "error"
                }
                Err(_) => {
                    tracing::warn!("readiness database check timed out");
                    overall_ok = false;
                    "timeout"
                }
            }
        }
        None => "skipped",
    };

    let scheduler_status = if state.reset_scheduler.is_stopped() {
        overall_ok = false;
        "stopped"
    } else {
        "running"
    };

    let status_code = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status_code,
        Json(serde_json::json!({
            "status": if overall_ok { "ready" } else { "not ready" },
            "checks": {
                "database": db_status,
                "quota_reset_scheduler": scheduler_status,
            }
        })),
    )
}

/// GET /metrics
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.gather_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
