use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::entity::{EnvironmentServiceReset, Project};

/// ProjectServiceRepository はクォータポリシーとそのリセットを扱う。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProjectServiceRepository: Send + Sync {
    /// `next_reset <= today` の ProjectService を持つプロジェクトを返す。
    /// 各 Project の `services` にはリセット対象のものだけが入る。
    /// 返却順はリセット処理の順序になる。
    async fn list_project_service_due_for_reset(
        &self,
        today: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Project>>;

    /// `next_reset` を保存し、紐づく全 EnvironmentService の残量を上限に戻す。
    async fn reset_project_service_usage(
        &self,
        project_id: &str,
        service_id: &str,
        next_reset: DateTime<Utc>,
    ) -> anyhow::Result<Vec<EnvironmentServiceReset>>;
}
