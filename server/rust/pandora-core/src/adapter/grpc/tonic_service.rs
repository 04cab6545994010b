//! tonic gRPC サービス実装。
//!
//! proto 生成コード (`src/proto/`) の ReservationService トレイトを実装する。
//! 各メソッドで proto 型 <-> ドメイン型の変換を行い、ReservationGrpcService に委譲する。

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status};

use crate::domain::entity::Reservation;
use crate::infrastructure::metrics::Metrics;
use crate::proto::pandora::v1::{
    reservation_service_server::ReservationService,
    CommitReservationRequest as ProtoCommitReservationRequest,
    CommitReservationResponse as ProtoCommitReservationResponse,
    Reservation as ProtoReservation, ReserveQuotaRequest as ProtoReserveQuotaRequest,
    ReserveQuotaResponse as ProtoReserveQuotaResponse,
    RollbackReservationRequest as ProtoRollbackReservationRequest,
    RollbackReservationResponse as ProtoRollbackReservationResponse,
};

use super::reservation_grpc::{ReservationGrpcService, ReservationParams, ReserveParams};

fn reservation_to_proto(r: &Reservation) -> ProtoReservation {
    ProtoReservation {
        id: r.id.clone(),
        environment_id: r.environment_id.clone(),
        service_id: r.service_id.clone(),
        created_at: r.created_at.to_rfc3339(),
    }
}

/// ReservationServiceTonic は tonic の ReservationService として ReservationGrpcService をラップする。
pub struct ReservationServiceTonic {
    inner: Arc<ReservationGrpcService>,
    metrics: Arc<Metrics>,
    shutdown: CancellationToken,
}

impl ReservationServiceTonic {
    /// shutdown がキャンセルされると処理中の呼び出しも中断される。
    pub fn new(
        inner: Arc<ReservationGrpcService>,
        metrics: Arc<Metrics>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            inner,
            metrics,
            shutdown,
        }
    }

    fn observe<T>(&self, method: &str, start: Instant, result: &Result<T, Status>) {
        let code = match result {
            Ok(_) => tonic::Code::Ok,
            Err(status) => status.code(),
        };
        self.metrics
            .record_grpc_request(method, &format!("{code:?}"));
        self.metrics
            .record_grpc_duration(method, start.elapsed().as_secs_f64());
    }
}

#[async_trait::async_trait]
impl ReservationService for ReservationServiceTonic {
    async fn reserve_quota(
        &self,
        request: Request<ProtoReserveQuotaRequest>,
    ) -> Result<Response<ProtoReserveQuotaResponse>, Status> {
        let start = Instant::now();
        let inner = request.into_inner();
        let params = ReserveParams {
            environment_id: inner.environment_id,
            service_id: inner.service_id,
        };
        let ctx = self.shutdown.child_token();
        let result = self
            .inner
            .reserve(&ctx, params)
            .await
            .map(|r| ProtoReserveQuotaResponse {
                reservation: Some(reservation_to_proto(&r)),
            })
            .map_err(Into::<Status>::into);
        self.observe("ReserveQuota", start, &result);
        result.map(Response::new)
    }

    async fn commit_reservation(
        &self,
        request: Request<ProtoCommitReservationRequest>,
    ) -> Result<Response<ProtoCommitReservationResponse>, Status> {
        let start = Instant::now();
        let params = ReservationParams {
            id: request.into_inner().id,
        };
        let ctx = self.shutdown.child_token();
        let result = self
            .inner
            .commit(&ctx, params)
            .await
            .map(|()| ProtoCommitReservationResponse {})
            .map_err(Into::<Status>::into);
        self.observe("CommitReservation", start, &result);
        result.map(Response::new)
    }

    async fn rollback_reservation(
        &self,
        request: Request<ProtoRollbackReservationRequest>,
    ) -> Result<Response<ProtoRollbackReservationResponse>, Status> {
        let start = Instant::now();
        let params = ReservationParams {
            id: request.into_inner().id,
        };
        let ctx = self.shutdown.child_token();
        let result = self
            .inner
            .rollback(&ctx, params)
            .await
            .map(|()| ProtoRollbackReservationResponse {})
            .map_err(Into::<Status>::into);
        self.observe("RollbackReservation", start, &result);
        result.map(Response::new)
    }
}
