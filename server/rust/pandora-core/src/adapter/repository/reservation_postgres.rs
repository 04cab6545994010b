use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::entity::Reservation;
use crate::domain::repository::ReservationRepository;

pub struct ReservationPostgresRepository {
    pool: Arc<PgPool>,
}

impl ReservationPostgresRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ReservationRow {
    id: String,
    environment_id: String,
    service_id: String,
    created_at: DateTime<Utc>,
}

impl From<ReservationRow> for Reservation {
    fn from(r: ReservationRow) -> Self {
        Reservation {
            id: r.id,
            environment_id: r.environment_id,
            service_id: r.service_id,
            created_at: r.created_at,
        }
    }
}

#[async_trait]
impl ReservationRepository for ReservationPostgresRepository {
    async fn find_by_id(&self, id: &str) -> anyhow::Result<Option<Reservation>> {
        let row: Option<ReservationRow> = sqlx::query_as(
            "SELECT id, environment_id, service_id, created_at \
             FROM pandora.reservations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Into::into))
    }

    async fn create(&self, reservation: &Reservation) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO pandora.reservations (id, environment_id, service_id, created_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&reservation.id)
        .bind(&reservation.environment_id)
        .bind(&reservation.service_id)
        .bind(reservation.created_at)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &str) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM pandora.reservations WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn reserve(&self, reservation: &Reservation) -> anyhow::Result<bool> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE pandora.environment_services \
             SET available_request = CASE WHEN available_request = -1 THEN -1 \
                                          ELSE available_request - 1 END \
             WHERE environment_id = $1 AND service_id = $2 \
               AND (available_request > 0 OR available_request = -1)",
        )
        .bind(&reservation.environment_id)
        .bind(&reservation.service_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO pandora.reservations (id, environment_id, service_id, created_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&reservation.id)
        .bind(&reservation.environment_id)
        .bind(&reservation.service_id)
        .bind(reservation.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn rollback(&self, reservation: &Reservation) -> anyhow::Result<bool> {
        let mut tx = self.pool.begin().await?;

        // 削除できた側だけが残量を戻す。並行した確定・取消とは行ロックで直列化される。
        let deleted: Option<(String, String)> = sqlx::query_as(
            "DELETE FROM pandora.reservations WHERE id = $1 \
             RETURNING environment_id, service_id",
        )
        .bind(&reservation.id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((environment_id, service_id)) = deleted else {
            tx.rollback().await?;
            return Ok(false);
        };

        sqlx::query(
            "UPDATE pandora.environment_services \
             SET available_request = LEAST(available_request + 1, max_request) \
             WHERE environment_id = $1 AND service_id = $2 AND available_request <> -1",
        )
        .bind(&environment_id)
        .bind(&service_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}
