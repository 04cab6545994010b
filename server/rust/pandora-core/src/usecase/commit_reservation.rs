use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::cancellation::run_cancellable;
use crate::domain::entity::reservation::validate_reservation_id;
use crate::domain::error::ErrorKind;
use crate::domain::repository::ReservationRepository;

#[derive(Debug, thiserror::Error)]
pub enum CommitReservationError {
    #[error("reservation not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CommitReservationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommitReservationError::NotFound(_) => ErrorKind::NotFound,
            CommitReservationError::Validation(_) => ErrorKind::Validation,
            CommitReservationError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// CommitReservationUseCase は予約を確定する。
/// 予約時点でクォータは消費済みのため、予約レコードを削除するだけで残量は変えない。
pub struct CommitReservationUseCase {
    reservation_repo: Arc<dyn ReservationRepository>,
}

impl CommitReservationUseCase {
    pub fn new(reservation_repo: Arc<dyn ReservationRepository>) -> Self {
        Self { reservation_repo }
    }

    pub async fn execute(
        &self,
        ctx: &CancellationToken,
        reservation_id: &str,
    ) -> Result<(), CommitReservationError> {
        validate_reservation_id(reservation_id).map_err(CommitReservationError::Validation)?;

        let deleted = run_cancellable(ctx, self.reservation_repo.delete(reservation_id))
            .await
            .map_err(|e| CommitReservationError::Internal(e.to_string()))?
            .map_err(|e| CommitReservationError::Internal(e.to_string()))?;

        if !deleted {
            return Err(CommitReservationError::NotFound(reservation_id.to_string()));
        }

        tracing::info!(reservation_id = %reservation_id, "reservation committed");
        Ok(())
    }
}
