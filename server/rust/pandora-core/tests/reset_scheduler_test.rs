//! クォータリセットのエンドツーエンドテスト（インメモリストア使用）

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, TimeZone, Utc};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use pandora_core::adapter::handler;
use pandora_core::adapter::repository::InMemoryQuotaStore;
use pandora_core::domain::entity::ResetFrequency;
use pandora_core::domain::repository::EnvironmentServiceRepository;
use pandora_core::infrastructure::reset_scheduler::QuotaResetScheduler;
use pandora_core::test_support::{make_test_app_state, seed_binding, seed_policy};
use pandora_core::usecase::ResetDueQuotasUseCase;

fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

async fn daily_store() -> Arc<InMemoryQuotaStore> {
    let store = Arc::new(InMemoryQuotaStore::new());
    seed_binding(&store, "p1", "env-1", "svc-1", 1000, 0)
        .await
        .unwrap();
    seed_policy(
        &store,
        "p1",
        "svc-1",
        1000,
        ResetFrequency::Daily,
        utc(2024, 1, 15),
    )
    .await
    .unwrap();
    store
}

#[tokio::test]
async fn test_daily_reset_end_to_end() {
    let store = daily_store().await;
    let uc = ResetDueQuotasUseCase::new(store.clone());

    let output = uc
        .execute(&CancellationToken::new(), utc(2024, 1, 15))
        .await
        .unwrap();

    assert_eq!(output.projects.len(), 1);
    assert_eq!(output.projects[0].environment_services.len(), 1);
    assert!(output.failures.is_empty());

    let policy = store.project_service("p1", "svc-1").await.unwrap();
    assert_eq!(policy.next_reset, Some(utc(2024, 1, 16)));
    let binding = store.find("env-1", "svc-1").await.unwrap().unwrap();
    assert_eq!(binding.available_request, 1000);
}

#[tokio::test]
async fn test_second_run_on_same_day_is_noop() {
    let store = daily_store().await;
    let uc = ResetDueQuotasUseCase::new(store.clone());
    let ctx = CancellationToken::new();

    uc.execute(&ctx, utc(2024, 1, 15)).await.unwrap();
    store.decrement_available_request("env-1", "svc-1").await.unwrap();

    let output = uc.execute(&ctx, utc(2024, 1, 15)).await.unwrap();
    assert!(output.projects.is_empty());
    let binding = store.find("env-1", "svc-1").await.unwrap().unwrap();
    assert_eq!(binding.available_request, 999);
}

#[tokio::test]
async fn test_late_run_stays_on_grid() {
    let store = Arc::new(InMemoryQuotaStore::new());
    seed_binding(&store, "p1", "env-1", "svc-1", 100, 3)
        .await
        .unwrap();
    seed_policy(
        &store,
        "p1",
        "svc-1",
        100,
        ResetFrequency::Weekly,
        utc(2024, 1, 1),
    )
    .await
    .unwrap();
    let uc = ResetDueQuotasUseCase::new(store.clone());

    uc.execute(&CancellationToken::new(), utc(2024, 1, 10))
        .await
        .unwrap();

    let policy = store.project_service("p1", "svc-1").await.unwrap();
    assert_eq!(policy.next_reset, Some(utc(2024, 1, 15)));
}

#[tokio::test]
async fn test_reset_endpoint_returns_report() {
    let store = daily_store().await;
    let app = handler::router(make_test_app_state(store.clone(), utc(2024, 1, 15)).unwrap());

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/quota-resets")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let resets = body["projects"][0]["environment_services"]
        .as_array()
        .unwrap();
    assert_eq!(resets.len(), 1);
    assert_eq!(resets[0]["available_request"], 1000);
    assert_eq!(body["failures"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_scheduler_runs_on_start() {
    let store = daily_store().await;
    let uc = Arc::new(ResetDueQuotasUseCase::new(store.clone()));
    let scheduler = QuotaResetScheduler::new(uc, "0 0 * * *", true)
        .unwrap()
        .with_clock(|| utc(2024, 1, 15));

    let handle = scheduler.start();
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    scheduler.stop();
    handle.await.unwrap();

    let binding = store.find("env-1", "svc-1").await.unwrap().unwrap();
    assert_eq!(binding.available_request, 1000);
}
