use async_trait::async_trait;

use crate::domain::entity::EnvironmentService;

/// EnvironmentServiceRepository は Environment×Service のクォータ残量を扱う。
/// すべての更新はストア側で原子的に行われる。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnvironmentServiceRepository: Send + Sync {
    async fn find(
        &self,
        environment_id: &str,
        service_id: &str,
    ) -> anyhow::Result<Option<EnvironmentService>>;

    /// 残量が正または無制限なら1減算して true、枯渇していれば false。
    async fn decrement_available_request(
        &self,
        environment_id: &str,
        service_id: &str,
    ) -> anyhow::Result<bool>;

    /// 1加算する。`max_request` が上限、無制限なら何もしない。
    async fn increase_available_request(
        &self,
        environment_id: &str,
        service_id: &str,
    ) -> anyhow::Result<()>;

    /// 残量を `max_request` に戻す。
    async fn reset_available_requests(
        &self,
        environment_id: &str,
        service_id: &str,
    ) -> anyhow::Result<()>;
}
