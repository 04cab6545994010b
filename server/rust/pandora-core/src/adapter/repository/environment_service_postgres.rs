use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::entity::EnvironmentService;
use crate::domain::repository::EnvironmentServiceRepository;

pub struct EnvironmentServicePostgresRepository {
    pool: Arc<PgPool>,
}

impl EnvironmentServicePostgresRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct EnvironmentServiceRow {
    environment_id: String,
    service_id: String,
    max_request: i64,
    available_request: i64,
}

impl From<EnvironmentServiceRow> for EnvironmentService {
    fn from(r: EnvironmentServiceRow) -> Self {
        EnvironmentService {
            environment_id: r.environment_id,
            service_id: r.service_id,
            max_request: r.max_request,
            available_request: r.available_request,
        }
    }
}

#[async_trait]
impl EnvironmentServiceRepository for EnvironmentServicePostgresRepository {
    async fn find(
        &self,
        environment_id: &str,
        service_id: &str,
    ) -> anyhow::Result<Option<EnvironmentService>> {
        let row: Option<EnvironmentServiceRow> = sqlx::query_as(
            "SELECT environment_id, service_id, max_request, available_request \
             FROM pandora.environment_services \
             WHERE environment_id = $1 AND service_id = $2",
        )
        .bind(environment_id)
        .bind(service_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Into::into))
    }

    async fn decrement_available_request(
        &self,
        environment_id: &str,
        service_id: &str,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE pandora.environment_services \
             SET available_request = CASE WHEN available_request = -1 THEN -1 \
                                          ELSE available_request - 1 END \
             WHERE environment_id = $1 AND service_id = $2 \
               AND (available_request > 0 OR available_request = -1)",
        )
        .bind(environment_id)
        .bind(service_id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn increase_available_request(
        &self,
        environment_id: &str,
        service_id: &str,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE pandora.environment_services \
             SET available_request = LEAST(available_request + 1, max_request) \
             WHERE environment_id = $1 AND service_id = $2 AND available_request <> -1",
        )
        .bind(environment_id)
        .bind(service_id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn reset_available_requests(
        &self,
        environment_id: &str,
        service_id: &str,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE pandora.environment_services \
             SET available_request = max_request \
             WHERE environment_id = $1 AND service_id = $2",
        )
        .bind(environment_id)
        .bind(service_id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }
}
