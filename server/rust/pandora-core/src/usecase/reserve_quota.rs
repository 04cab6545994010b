use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::cancellation::run_cancellable;
use crate::domain::entity::Reservation;
use crate::domain::error::ErrorKind;
use crate::domain::repository::{EnvironmentServiceRepository, ReservationRepository};

#[derive(Debug, Clone)]
pub struct ReserveQuotaInput {
    pub environment_id: String,
    pub service_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ReserveQuotaError {
    #[error("environment service not found: {environment_id}/{service_id}")]
    NotFound {
        environment_id: String,
        service_id: String,
    },

    #[error("quota exhausted for {environment_id}/{service_id}")]
    Exhausted {
        environment_id: String,
        service_id: String,
    },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ReserveQuotaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReserveQuotaError::NotFound { .. } => ErrorKind::NotFound,
            ReserveQuotaError::Exhausted { .. } => ErrorKind::RestrictionViolation,
            ReserveQuotaError::Validation(_) => ErrorKind::Validation,
            ReserveQuotaError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// ReserveQuotaUseCase はクォータ1単位を減算し、同時に予約を作成する。
/// REST (`POST /api/v1/reservations`) と gRPC (`ReserveQuota`) から呼ばれる。
pub struct ReserveQuotaUseCase {
    reservation_repo: Arc<dyn ReservationRepository>,
    environment_service_repo: Arc<dyn EnvironmentServiceRepository>,
}

impl ReserveQuotaUseCase {
    pub fn new(
        reservation_repo: Arc<dyn ReservationRepository>,
        environment_service_repo: Arc<dyn EnvironmentServiceRepository>,
    ) -> Self {
        Self {
            reservation_repo,
            environment_service_repo,
        }
    }

    pub async fn execute(
        &self,
        ctx: &CancellationToken,
        input: &ReserveQuotaInput,
    ) -> Result<Reservation, ReserveQuotaError> {
        if input.environment_id.is_empty() || input.service_id.is_empty() {
            return Err(ReserveQuotaError::Validation(
                "environment_id and service_id are required".to_string(),
            ));
        }

        let reservation = Reservation::new(input.environment_id.clone(), input.service_id.clone());
        let reserved = run_cancellable(ctx, self.reservation_repo.reserve(&reservation))
            .await
            .map_err(|e| ReserveQuotaError::Internal(e.to_string()))?
            .map_err(|e| ReserveQuotaError::Internal(e.to_string()))?;

        if reserved {
            tracing::debug!(
                reservation_id = %reservation.id,
                environment_id = %reservation.environment_id,
                service_id = %reservation.service_id,
                "quota reserved"
            );
            return Ok(reservation);
        }

        // 枯渇か未登録かを区別する
        let binding = self
            .environment_service_repo
            .find(&input.environment_id, &input.service_id)
            .await
            .map_err(|e| ReserveQuotaError::Internal(e.to_string()))?;

        match binding {
            Some(_) => Err(ReserveQuotaError::Exhausted {
                environment_id: input.environment_id.clone(),
                service_id: input.service_id.clone(),
            }),
            None => Err(ReserveQuotaError::NotFound {
                environment_id: input.environment_id.clone(),
                service_id: input.service_id.clone(),
            }),
        }
    }
}
