use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use pandora_core::adapter::grpc::{ReservationGrpcService, ReservationServiceTonic};
use pandora_core::adapter::handler::{self, AppState};
use pandora_core::adapter::repository::{
    EnvironmentServicePostgresRepository, InMemoryQuotaStore, ProjectServicePostgresRepository,
    ReservationPostgresRepository,
};
use pandora_core::domain::repository::{
    EnvironmentServiceRepository, ProjectServiceRepository, ReservationRepository,
};
use pandora_core::infrastructure::config::Config;
use pandora_core::infrastructure::metrics::Metrics;
use pandora_core::infrastructure::reset_scheduler::QuotaResetScheduler;
use pandora_core::infrastructure::{database, telemetry};
use pandora_core::proto::pandora::v1::reservation_service_server::ReservationServiceServer;
use pandora_core::usecase::{
    CommitReservationUseCase, ReserveQuotaUseCase, ResetDueQuotasUseCase,
    RollbackReservationUseCase,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/config.yaml".to_string());
    let cfg = Config::load(&config_path)?;

    telemetry::init_telemetry(&cfg.observability)?;

    info!(
        app_name = %cfg.app.name,
        version = %cfg.app.version,
        environment = %cfg.app.environment,
        "starting pandora core server"
    );

    let metrics = Arc::new(Metrics::new(&cfg.app.name)?);

    // --- Repository initialization: PostgreSQL → InMemory fallback ---
    let (reservation_repo, environment_service_repo, project_service_repo, db_pool): (
        Arc<dyn ReservationRepository>,
        Arc<dyn EnvironmentServiceRepository>,
        Arc<dyn ProjectServiceRepository>,
        _,
    ) = if let Some(ref db_cfg) = cfg.database {
        info!(
            max_connections = db_cfg.max_connections,
            "connecting to PostgreSQL"
        );
        let pool = Arc::new(database::create_pool(db_cfg).await?);
        info!("PostgreSQL connection pool created successfully");

        if db_cfg.run_migrations {
            database::run_migrations(&pool).await?;
            info!("database migrations applied");
        }

        (
            Arc::new(ReservationPostgresRepository::new(pool.clone())),
            Arc::new(EnvironmentServicePostgresRepository::new(pool.clone())),
            Arc::new(ProjectServicePostgresRepository::new(pool.clone())),
            Some(pool),
        )
    } else {
        tracing::warn!("no database configured, using in-memory quota store");
        let store = Arc::new(InMemoryQuotaStore::new());
        (store.clone(), store.clone(), store, None)
    };

    // --- Use cases ---
    let reserve_uc = Arc::new(ReserveQuotaUseCase::new(
        reservation_repo.clone(),
        environment_service_repo,
    ));
    let commit_uc = Arc::new(CommitReservationUseCase::new(reservation_repo.clone()));
    let rollback_uc = Arc::new(RollbackReservationUseCase::new(reservation_repo));
    let reset_uc = Arc::new(ResetDueQuotasUseCase::new(project_service_repo));

    // --- Quota reset job ---
    let reset_scheduler = Arc::new(
        QuotaResetScheduler::new(
            reset_uc,
            &cfg.quota_reset.schedule,
            cfg.quota_reset.run_on_start,
        )?
        .with_metrics(metrics.clone()),
    );
    info!(
        schedule = %cfg.quota_reset.schedule,
        run_on_start = cfg.quota_reset.run_on_start,
        "quota reset scheduler configured"
    );
    let scheduler_handle = reset_scheduler.start();

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    // --- gRPC ---
    let grpc_svc = Arc::new(
        ReservationGrpcService::new(reserve_uc.clone(), commit_uc.clone(), rollback_uc.clone())
            .with_metrics(metrics.clone()),
    );
    let reservation_tonic =
        ReservationServiceTonic::new(grpc_svc, metrics.clone(), shutdown.clone());

    let grpc_addr: SocketAddr =
        format!("{}:{}", cfg.server.host, cfg.server.grpc_port).parse()?;
    info!(addr = %grpc_addr, "gRPC server starting");

    let grpc_shutdown = shutdown.clone();
    let grpc_future = async move {
        tonic::transport::Server::builder()
            .add_service(ReservationServiceServer::new(reservation_tonic))
            .serve_with_shutdown(grpc_addr, grpc_shutdown.cancelled_owned())
            .await
            .map_err(|e| anyhow::anyhow!("gRPC server error: {}", e))
    };

    // --- REST ---
    let state = AppState {
        reserve_uc,
        commit_uc,
        rollback_uc,
        reset_scheduler: reset_scheduler.clone(),
        metrics,
        db_pool,
        shutdown: shutdown.clone(),
    };

    let app = handler::router(state).layer(TraceLayer::new_for_http());

    let rest_addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port).parse()?;
    info!(addr = %rest_addr, "REST server starting");

    let listener = tokio::net::TcpListener::bind(rest_addr).await?;
    let rest_shutdown = shutdown.clone();
    let rest_future = async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(rest_shutdown.cancelled_owned())
            .await
    };

    // どちらかが終了した時点でサーバー全体を停止する
    tokio::select! {
        result = rest_future => {
            if let Err(e) = result {
                tracing::error!(error = %e, "REST server error");
            }
        }
        result = grpc_future => {
            if let Err(e) = result {
                tracing::error!(error = %e, "gRPC server error");
            }
        }
    }
    shutdown.cancel();

    reset_scheduler.stop();
    if let Err(e) = scheduler_handle.await {
        tracing::error!(error = %e, "quota reset scheduler task failed");
    }

    info!("pandora core server stopped");
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
    shutdown.cancel();
}
