//! テスト用ヘルパー。
//! 統合テスト（tests/）から利用する。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::adapter::handler::AppState;
use crate::adapter::repository::InMemoryQuotaStore;
use crate::domain::entity::{EnvironmentService, ProjectService, ResetFrequency};
use crate::infrastructure::metrics::Metrics;
use crate::infrastructure::reset_scheduler::QuotaResetScheduler;
use crate::usecase::{
    CommitReservationUseCase, ReserveQuotaUseCase, ResetDueQuotasUseCase,
    RollbackReservationUseCase,
};

/// インメモリストアを共有する AppState を作成する。
/// リセットの基準時刻は `now` に固定する。
pub fn make_test_app_state(
    store: Arc<InMemoryQuotaStore>,
    now: DateTime<Utc>,
) -> anyhow::Result<AppState> {
    let metrics = Arc::new(Metrics::new("pandora-core-test")?);
    let reserve_uc = Arc::new(ReserveQuotaUseCase::new(store.clone(), store.clone()));
    let commit_uc = Arc::new(CommitReservationUseCase::new(store.clone()));
    let rollback_uc = Arc::new(RollbackReservationUseCase::new(store.clone()));
    let reset_uc = Arc::new(ResetDueQuotasUseCase::new(store));

    let reset_scheduler = QuotaResetScheduler::new(reset_uc, "0 0 * * *", false)?
        .with_clock(move || now)
        .with_metrics(metrics.clone());

    Ok(AppState {
        reserve_uc,
        commit_uc,
        rollback_uc,
        reset_scheduler: Arc::new(reset_scheduler),
        metrics,
        db_pool: None,
        shutdown: CancellationToken::new(),
    })
}

/// プロジェクト・Environment・サービスの紐づけを 1 組投入する。
pub async fn seed_binding(
    store: &InMemoryQuotaStore,
    project_id: &str,
    environment_id: &str,
    service_id: &str,
    max_request: i64,
    available_request: i64,
) -> anyhow::Result<()> {
    store
        .add_project(project_id, &format!("{project_id}-name"))
        .await;
    store.add_environment(environment_id, project_id).await?;
    store
        .bind_service(EnvironmentService {
            environment_id: environment_id.to_string(),
            service_id: service_id.to_string(),
            max_request,
            available_request,
        })
        .await
}

/// 次回リセット日を明示したクォータポリシーを割り当てる。
pub async fn seed_policy(
    store: &InMemoryQuotaStore,
    project_id: &str,
    service_id: &str,
    max_requests: i64,
    reset_frequency: ResetFrequency,
    next_reset: DateTime<Utc>,
) -> anyhow::Result<()> {
    store
        .assign_service(
            project_id,
            ProjectService {
                service_id: service_id.to_string(),
                max_requests,
                reset_frequency,
                next_reset: Some(next_reset),
                assigned_at: next_reset,
            },
        )
        .await
}
