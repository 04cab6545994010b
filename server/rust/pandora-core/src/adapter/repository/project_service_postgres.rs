use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::entity::{
    EnvironmentServiceReset, Project, ProjectService, ResetFrequency,
};
use crate::domain::repository::ProjectServiceRepository;

pub struct ProjectServicePostgresRepository {
    pool: Arc<PgPool>,
}

impl ProjectServicePostgresRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct DueProjectServiceRow {
    project_id: String,
    project_name: String,
    project_status: String,
    service_id: String,
    max_requests: i64,
    reset_frequency: String,
    next_reset: Option<DateTime<Utc>>,
    assigned_at: DateTime<Utc>,
}

impl DueProjectServiceRow {
    fn to_service(&self) -> anyhow::Result<ProjectService> {
        let reset_frequency = ResetFrequency::from_str(&self.reset_frequency).ok_or_else(|| {
            anyhow::anyhow!(
                "unknown reset frequency '{}' for project service {}/{}",
                self.reset_frequency,
                self.project_id,
                self.service_id
            )
        })?;
        Ok(ProjectService {
            service_id: self.service_id.clone(),
            max_requests: self.max_requests,
            reset_frequency,
            next_reset: self.next_reset,
            assigned_at: self.assigned_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct EnvironmentServiceResetRow {
    environment_id: String,
    service_id: String,
    max_request: i64,
    available_request: i64,
}

/// 行はプロジェクト ID 順に並んでいる前提で、連続する行をプロジェクト単位にまとめる。
fn group_by_project(rows: Vec<DueProjectServiceRow>) -> anyhow::Result<Vec<Project>> {
    let mut projects: Vec<Project> = Vec::new();
    for row in rows {
        let service = row.to_service()?;
        match projects.last_mut() {
            Some(last) if last.id == row.project_id => last.services.push(service),
            _ => projects.push(Project {
                id: row.project_id,
                name: row.project_name,
                status: row.project_status,
                services: vec![service],
            }),
        }
    }
    Ok(projects)
}

#[async_trait]
impl ProjectServiceRepository for ProjectServicePostgresRepository {
    async fn list_project_service_due_for_reset(
        &self,
        today: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Project>> {
        let rows: Vec<DueProjectServiceRow> = sqlx::query_as(
            "SELECT p.id AS project_id, p.name AS project_name, p.status AS project_status, \
                    ps.service_id, ps.max_requests, ps.reset_frequency, ps.next_reset, \
                    ps.assigned_at \
             FROM pandora.projects p \
             JOIN pandora.project_services ps ON ps.project_id = p.id \
             WHERE ps.reset_frequency <> 'none' \
               AND ps.next_reset IS NOT NULL \
               AND ps.next_reset <= $1 \
             ORDER BY p.id, ps.service_id",
        )
        .bind(today)
        .fetch_all(self.pool.as_ref())
        .await?;

        group_by_project(rows)
    }

    async fn reset_project_service_usage(
        &self,
        project_id: &str,
        service_id: &str,
        next_reset: DateTime<Utc>,
    ) -> anyhow::Result<Vec<EnvironmentServiceReset>> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE pandora.project_services SET next_reset = $3 \
             WHERE project_id = $1 AND service_id = $2",
        )
        .bind(project_id)
        .bind(service_id)
        .bind(next_reset)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            anyhow::bail!("project service not found: {}/{}", project_id, service_id);
        }

        let mut rows: Vec<EnvironmentServiceResetRow> = sqlx::query_as(
            "UPDATE pandora.environment_services es \
             SET available_request = es.max_request \
             FROM pandora.environments e \
             WHERE e.id = es.environment_id AND e.project_id = $1 AND es.service_id = $2 \
             RETURNING es.environment_id, es.service_id, es.max_request, es.available_request",
        )
        .bind(project_id)
        .bind(service_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        rows.sort_by(|a, b| a.environment_id.cmp(&b.environment_id));
        Ok(rows
            .into_iter()
            .map(|r| EnvironmentServiceReset {
                environment_id: r.environment_id,
                service_id: r.service_id,
                max_request: r.max_request,
                available_request: r.available_request,
                next_reset,
            })
            .collect())
    }
}
