//! Reservation gRPC サービス実装（ドメイン層ラッパー）。
//!
//! `Reserve(env, svc) -> Reservation`、`Commit(params{id}) -> empty`、
//! `Rollback(params{id}) -> empty` を提供する。
//! ドメインエラーは固定の対応表で tonic::Status に変換する。

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tonic::Status;

use crate::domain::entity::Reservation;
use crate::domain::error::ErrorKind;
use crate::infrastructure::metrics::Metrics;
use crate::usecase::reserve_quota::ReserveQuotaInput;
use crate::usecase::{
    CommitReservationError, CommitReservationUseCase, ReserveQuotaError, ReserveQuotaUseCase,
    RollbackReservationError, RollbackReservationUseCase,
};

/// GrpcError は gRPC レイヤーのエラー型。
#[derive(Debug, PartialEq, Eq)]
pub enum GrpcError {
    NotFound(String),
    PermissionDenied(String),
    FailedPrecondition(String),
    Internal(String),
    ResourceExhausted(String),
    Unknown(String),
}

impl GrpcError {
    /// NotFound→NotFound, Unauthorized→PermissionDenied, Internal→Internal,
    /// Validation→FailedPrecondition, それ以外→Unknown。
    pub fn from_kind(kind: ErrorKind, message: String) -> Self {
        match kind {
            ErrorKind::NotFound => GrpcError::NotFound(message),
            ErrorKind::Unauthorized => GrpcError::PermissionDenied(message),
            ErrorKind::Internal => GrpcError::Internal(message),
            ErrorKind::Validation => GrpcError::FailedPrecondition(message),
            ErrorKind::AlreadyExists | ErrorKind::RestrictionViolation => {
                GrpcError::Unknown(message)
            }
        }
    }
}

impl From<ReserveQuotaError> for GrpcError {
    fn from(e: ReserveQuotaError) -> Self {
        match e {
            ReserveQuotaError::Exhausted { .. } => GrpcError::ResourceExhausted(e.to_string()),
            e => GrpcError::from_kind(e.kind(), e.to_string()),
        }
    }
}

impl From<CommitReservationError> for GrpcError {
    fn from(e: CommitReservationError) -> Self {
        GrpcError::from_kind(e.kind(), e.to_string())
    }
}

impl From<RollbackReservationError> for GrpcError {
    fn from(e: RollbackReservationError) -> Self {
        GrpcError::from_kind(e.kind(), e.to_string())
    }
}

impl From<GrpcError> for Status {
    fn from(e: GrpcError) -> Self {
        match e {
            GrpcError::NotFound(msg) => Status::not_found(msg),
            GrpcError::PermissionDenied(msg) => Status::permission_denied(msg),
            GrpcError::FailedPrecondition(msg) => Status::failed_precondition(msg),
            GrpcError::Internal(msg) => Status::internal(msg),
            GrpcError::ResourceExhausted(msg) => Status::resource_exhausted(msg),
            GrpcError::Unknown(msg) => Status::unknown(msg),
        }
    }
}

/// ReservationParams は Commit / Rollback リクエストの内部表現。
#[derive(Debug, Clone)]
pub struct ReservationParams {
    pub id: String,
}

/// ReserveParams は Reserve リクエストの内部表現。
#[derive(Debug, Clone)]
pub struct ReserveParams {
    pub environment_id: String,
    pub service_id: String,
}

/// ReservationGrpcService は予約 gRPC サービスのビジネスロジック層。
pub struct ReservationGrpcService {
    pub reserve_uc: Arc<ReserveQuotaUseCase>,
    pub commit_uc: Arc<CommitReservationUseCase>,
    pub rollback_uc: Arc<RollbackReservationUseCase>,
    metrics: Option<Arc<Metrics>>,
}

impl ReservationGrpcService {
    pub fn new(
        reserve_uc: Arc<ReserveQuotaUseCase>,
        commit_uc: Arc<CommitReservationUseCase>,
        rollback_uc: Arc<RollbackReservationUseCase>,
    ) -> Self {
        Self {
            reserve_uc,
            commit_uc,
            rollback_uc,
            metrics: None,
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn record(&self, operation: &str, error: Option<ErrorKind>) {
        if let Some(metrics) = &self.metrics {
            metrics.record_reservation(operation, error);
        }
    }

    pub async fn reserve(
        &self,
        ctx: &CancellationToken,
        params: ReserveParams,
    ) -> Result<Reservation, GrpcError> {
        let input = ReserveQuotaInput {
            environment_id: params.environment_id,
            service_id: params.service_id,
        };
        let result = self.reserve_uc.execute(ctx, &input).await;
        self.record("reserve", result.as_ref().err().map(ReserveQuotaError::kind));
        result.map_err(GrpcError::from)
    }

    pub async fn commit(
        &self,
        ctx: &CancellationToken,
        params: ReservationParams,
    ) -> Result<(), GrpcError> {
        let result = self.commit_uc.execute(ctx, &params.id).await;
        self.record("commit", result.as_ref().err().map(CommitReservationError::kind));
        result.map_err(GrpcError::from)
    }

    pub async fn rollback(
        &self,
        ctx: &CancellationToken,
        params: ReservationParams,
    ) -> Result<(), GrpcError> {
        let result = self.rollback_uc.execute(ctx, &params.id).await;
        self.record(
            "rollback",
            result.as_ref().err().map(RollbackReservationError::kind),
        );
        result.map_err(GrpcError::from)
    }
}
