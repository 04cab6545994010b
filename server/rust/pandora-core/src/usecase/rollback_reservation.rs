use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::cancellation::run_cancellable;
use crate::domain::entity::reservation::validate_reservation_id;
use crate::domain::error::ErrorKind;
use crate::domain::repository::ReservationRepository;

#[derive(Debug, thiserror::Error)]
pub enum RollbackReservationError {
    #[error("reservation not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl RollbackReservationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RollbackReservationError::NotFound(_) => ErrorKind::NotFound,
            RollbackReservationError::Validation(_) => ErrorKind::Validation,
            RollbackReservationError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// RollbackReservationUseCase は予約を取り消し、クォータ1単位を返却する。
pub struct RollbackReservationUseCase {
    reservation_repo: Arc<dyn ReservationRepository>,
}

impl RollbackReservationUseCase {
    pub fn new(reservation_repo: Arc<dyn ReservationRepository>) -> Self {
        Self { reservation_repo }
    }

    pub async fn execute(
        &self,
        ctx: &CancellationToken,
        reservation_id: &str,
    ) -> Result<(), RollbackReservationError> {
        validate_reservation_id(reservation_id).map_err(RollbackReservationError::Validation)?;

        let reservation = run_cancellable(ctx, self.reservation_repo.find_by_id(reservation_id))
            .await
            .map_err(|e| RollbackReservationError::Internal(e.to_string()))?
            .map_err(|e| RollbackReservationError::Internal(e.to_string()))?
            .ok_or_else(|| RollbackReservationError::NotFound(reservation_id.to_string()))?;

        // 返却と削除は同一トランザクションで行う。開始後はキャンセルで中断しない
        let rolled_back = self
            .reservation_repo
            .rollback(&reservation)
            .await
            .map_err(|e| RollbackReservationError::Internal(e.to_string()))?;

        // 取得後に別リクエストが先に精算した
        if !rolled_back {
            return Err(RollbackReservationError::NotFound(reservation_id.to_string()));
        }

        tracing::info!(
            reservation_id = %reservation.id,
            environment_id = %reservation.environment_id,
            service_id = %reservation.service_id,
            "reservation rolled back"
        );
        Ok(())
    }
}
