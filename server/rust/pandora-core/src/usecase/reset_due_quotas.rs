use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use super::cancellation::run_cancellable;
use crate::domain::entity::{
    EnvironmentServiceReset, Project, ProjectResetReport, ProjectService, ServiceResetFailure,
};
use crate::domain::error::ErrorKind;
use crate::domain::repository::ProjectServiceRepository;
use crate::domain::service::reset_schedule;

#[derive(Debug, Clone)]
pub struct ResetDueQuotasOutput {
    /// UTC 0 時に切り捨てた実行基準日。
    pub today: DateTime<Utc>,
    pub projects: Vec<ProjectResetReport>,
    /// 読み飛ばしたサービス。実行自体はエラーにしない。
    pub failures: Vec<ServiceResetFailure>,
}

#[derive(Debug, thiserror::Error)]
pub enum ResetDueQuotasError {
    #[error("internal error: {0}")]
    Internal(String),
}

impl ResetDueQuotasError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Internal
    }
}

/// ResetDueQuotasUseCase はリセット期日を迎えたクォータポリシーの次回日を進め、
/// 紐づく全 Environment の残量を上限まで補充する。
///
/// 一覧取得の失敗だけが実行全体を中断する。個々のサービスの失敗はログに残して
/// 読み飛ばし、そのサービスはレポートに何も寄与しない。
/// プロジェクトとサービスは一覧の返却順に逐次処理する。
pub struct ResetDueQuotasUseCase {
    project_service_repo: Arc<dyn ProjectServiceRepository>,
}

impl ResetDueQuotasUseCase {
    pub fn new(project_service_repo: Arc<dyn ProjectServiceRepository>) -> Self {
        Self {
            project_service_repo,
        }
    }

    pub async fn execute(
        &self,
        ctx: &CancellationToken,
        now: DateTime<Utc>,
    ) -> Result<ResetDueQuotasOutput, ResetDueQuotasError> {
        let today = reset_schedule::truncate_to_midnight(now);

        let projects = run_cancellable(
            ctx,
            self.project_service_repo
                .list_project_service_due_for_reset(today),
        )
        .await
        .map_err(|e| ResetDueQuotasError::Internal(e.to_string()))?
        .map_err(|e| ResetDueQuotasError::Internal(e.to_string()))?;

        let mut reports = Vec::with_capacity(projects.len());
        let mut failures = Vec::new();

        for project in projects {
            let report = self.reset_project(&project, today, &mut failures).await;
            reports.push(report);
        }

        if failures.is_empty() {
            tracing::info!(
                today = %today,
                projects = reports.len(),
                "quota reset run completed"
            );
        } else {
            tracing::warn!(
                today = %today,
                projects = reports.len(),
                failed_services = failures.len(),
                failures = ?failures,
                "quota reset run completed with skipped services"
            );
        }

        Ok(ResetDueQuotasOutput {
            today,
            projects: reports,
            failures,
        })
    }

    async fn reset_project(
        &self,
        project: &Project,
        today: DateTime<Utc>,
        failures: &mut Vec<ServiceResetFailure>,
    ) -> ProjectResetReport {
        let mut environment_services = Vec::new();

        for service in &project.services {
            match self.reset_service(project, service, today).await {
                Ok(resets) => environment_services.extend(resets),
                Err(reason) => {
                    tracing::warn!(
                        project_id = %project.id,
                        service_id = %service.service_id,
                        error = %reason,
                        "failed to reset project service usage, skipping"
                    );
                    failures.push(ServiceResetFailure {
                        project_id: project.id.clone(),
                        service_id: service.service_id.clone(),
                        reason,
                    });
                }
            }
        }

        ProjectResetReport {
            project_id: project.id.clone(),
            name: project.name.clone(),
            status: project.status.clone(),
            environment_services,
        }
    }

    async fn reset_service(
        &self,
        project: &Project,
        service: &ProjectService,
        today: DateTime<Utc>,
    ) -> Result<Vec<EnvironmentServiceReset>, String> {
        let previous = service
            .next_reset
            .ok_or_else(|| "project service has no next reset date".to_string())?;
        let next_reset =
            reset_schedule::next_reset_after(&service.reset_frequency, previous, today)
                .ok_or_else(|| {
                    format!(
                        "reset frequency '{}' does not produce a next reset date",
                        service.reset_frequency.as_str()
                    )
                })?;

        let resets = self
            .project_service_repo
            .reset_project_service_usage(&project.id, &service.service_id, next_reset)
            .await
            .map_err(|e| e.to_string())?;

        tracing::debug!(
            project_id = %project.id,
            service_id = %service.service_id,
            next_reset = %next_reset,
            environments = resets.len(),
            "project service usage reset"
        );
        Ok(resets)
    }
}
