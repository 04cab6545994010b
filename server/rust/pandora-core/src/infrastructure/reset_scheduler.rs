//! クォータリセットの定期実行。
//!
//! cron 式（UTC）で次回時刻を求めて待機し、`ResetDueQuotasUseCase` を実行する。
//! 実行は常に直列で、実行中に発火したトリガーは前の実行の完了を待つ。

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use croner::Cron;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::metrics::Metrics;
use crate::usecase::{ResetDueQuotasError, ResetDueQuotasOutput, ResetDueQuotasUseCase};

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct QuotaResetScheduler {
    reset_uc: Arc<ResetDueQuotasUseCase>,
    schedule: Arc<Cron>,
    run_on_start: bool,
    run_guard: Arc<Mutex<()>>,
    clock: Clock,
    metrics: Option<Arc<Metrics>>,
    cancel_token: CancellationToken,
}

impl QuotaResetScheduler {
    pub fn new(
        reset_uc: Arc<ResetDueQuotasUseCase>,
        expression: &str,
        run_on_start: bool,
    ) -> anyhow::Result<Self> {
        let schedule = Cron::new(expression)
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid cron expression '{}': {}", expression, e))?;
        Ok(Self {
            reset_uc,
            schedule: Arc::new(schedule),
            run_on_start,
            run_guard: Arc::new(Mutex::new(())),
            clock: Arc::new(Utc::now),
            metrics: None,
            cancel_token: CancellationToken::new(),
        })
    }

    /// 実行基準時刻の取得元を差し替える。
    #[must_use]
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// now より後の最初の発火時刻。
    pub fn next_run_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.find_next_occurrence(&now, false).ok()
    }

    /// 定期実行ループを起動する。`stop()` で終了する。
    pub fn start(&self) -> tokio::task::JoinHandle<()> {
        let reset_uc = self.reset_uc.clone();
        let schedule = self.schedule.clone();
        let run_guard = self.run_guard.clone();
        let clock = self.clock.clone();
        let metrics = self.metrics.clone();
        let token = self.cancel_token.clone();
        let run_on_start = self.run_on_start;

        tokio::spawn(async move {
            let run = RunContext {
                reset_uc: &reset_uc,
                run_guard: &run_guard,
                clock: &clock,
                metrics: metrics.as_deref(),
                token: &token,
            };
            if run_on_start {
                run.run_logged("startup").await;
            }

            loop {
                let now = Utc::now();
                let fire_at = match schedule.find_next_occurrence(&now, false) {
                    Ok(next) => next,
                    Err(e) => {
                        tracing::error!(error = %e, "no next cron occurrence found, quota reset scheduler exiting");
                        return;
                    }
                };
                let wait = (fire_at - Utc::now())
                    .to_std()
                    .unwrap_or(Duration::from_secs(1));

                info!(
                    next_run = %fire_at,
                    wait_secs = wait.as_secs(),
                    "sleeping until next quota reset"
                );

                tokio::select! {
                    () = token.cancelled() => break,
                    () = tokio::time::sleep(wait) => {
                        run.run_logged("scheduled").await;
                    }
                }
            }

            info!("quota reset scheduler stopped");
        })
    }

    /// リセットを即時実行する。定期実行と同じガードで直列化される。
    pub async fn trigger(&self) -> Result<ResetDueQuotasOutput, ResetDueQuotasError> {
        let _running = self.run_guard.lock().await;
        let result = self
            .reset_uc
            .execute(&self.cancel_token.child_token(), (self.clock)())
            .await;
        if let Some(metrics) = &self.metrics {
            let skipped = result.as_ref().map_or(0, |o| o.failures.len());
            metrics.record_quota_reset_run("manual", result.is_ok(), skipped);
        }
        result
    }

    pub fn stop(&self) {
        self.cancel_token.cancel();
    }

    /// `stop()` 済みなら true。
    pub fn is_stopped(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

struct RunContext<'a> {
    reset_uc: &'a ResetDueQuotasUseCase,
    run_guard: &'a Mutex<()>,
    clock: &'a Clock,
    metrics: Option<&'a Metrics>,
    token: &'a CancellationToken,
}

impl RunContext<'_> {
    async fn run_logged(&self, trigger: &str) {
        let _running = self.run_guard.lock().await;
        info!(trigger = trigger, "running quota reset");
        let result = self
            .reset_uc
            .execute(&self.token.child_token(), (self.clock)())
            .await;
        if let Some(metrics) = self.metrics {
            let skipped = result.as_ref().map_or(0, |o| o.failures.len());
            metrics.record_quota_reset_run(trigger, result.is_ok(), skipped);
        }
        log_outcome(trigger, &result);
    }
}

fn log_outcome(trigger: &str, result: &Result<ResetDueQuotasOutput, ResetDueQuotasError>) {
    match result {
        Ok(output) => {
            let environments: usize = output
                .projects
                .iter()
                .map(|p| p.environment_services.len())
                .sum();
            info!(
                trigger = trigger,
                projects = output.projects.len(),
                environments = environments,
                skipped = output.failures.len(),
                "quota reset finished"
            );
        }
        Err(e) => {
            tracing::error!(trigger = trigger, error = %e, "quota reset aborted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::TimeZone;

    use crate::domain::entity::{EnvironmentServiceReset, Project};
    use crate::domain::repository::ProjectServiceRepository;

    /// 一覧取得中の同時実行数を記録するリポジトリ。
    #[derive(Default)]
    struct SlowRepository {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ProjectServiceRepository for SlowRepository {
        async fn list_project_service_due_for_reset(
            &self,
            _today: DateTime<Utc>,
        ) -> anyhow::Result<Vec<Project>> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(vec![])
        }

        async fn reset_project_service_usage(
            &self,
            _project_id: &str,
            _service_id: &str,
            _next_reset: DateTime<Utc>,
        ) -> anyhow::Result<Vec<EnvironmentServiceReset>> {
            Ok(vec![])
        }
    }

    fn scheduler(repo: Arc<SlowRepository>, run_on_start: bool) -> QuotaResetScheduler {
        let uc = Arc::new(ResetDueQuotasUseCase::new(repo));
        QuotaResetScheduler::new(uc, "0 0 * * *", run_on_start).unwrap()
    }

    #[test]
    fn test_invalid_expression() {
        let repo = Arc::new(SlowRepository::default());
        let uc = Arc::new(ResetDueQuotasUseCase::new(repo));
        assert!(QuotaResetScheduler::new(uc, "not a cron", false).is_err());
    }

    #[test]
    fn test_next_run_is_next_utc_midnight() {
        let s = scheduler(Arc::new(SlowRepository::default()), false);
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        assert_eq!(
            s.next_run_after(now),
            Some(Utc.with_ymd_and_hms(2024, 1, 16, 0, 0, 0).unwrap())
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_triggers_never_overlap() {
        let repo = Arc::new(SlowRepository::default());
        let s = Arc::new(scheduler(repo.clone(), false));

        let (a, b, c) = tokio::join!(s.trigger(), s.trigger(), s.trigger());
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(repo.calls.load(Ordering::SeqCst), 3);
        assert_eq!(repo.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_runs_once_on_start() {
        let repo = Arc::new(SlowRepository::default());
        let s = scheduler(repo.clone(), true);

        let handle = s.start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        s.stop();
        handle.await.unwrap();

        assert_eq!(repo.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_loop_keeps_waiting_for_next_occurrence() {
        let repo = Arc::new(SlowRepository::default());
        let s = scheduler(repo.clone(), false);

        let handle = s.start();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());

        s.stop();
        handle.await.unwrap();
        assert_eq!(repo.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_parses_configured_expressions() {
        for expr in ["0 0 * * *", "*/5 * * * *", "30 2 1 * *"] {
            let repo = Arc::new(SlowRepository::default());
            let uc = Arc::new(ResetDueQuotasUseCase::new(repo));
            assert!(QuotaResetScheduler::new(uc, expr, false).is_ok(), "{expr}");
        }
    }

    #[tokio::test]
    async fn test_no_run_on_start_when_disabled() {
        let repo = Arc::new(SlowRepository::default());
        let s = scheduler(repo.clone(), false);

        let handle = s.start();
        tokio::time::sleep(Duration::from_millis(50)).await;
        s.stop();
        handle.await.unwrap();

        assert_eq!(repo.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_runs_are_counted_in_metrics() {
        let metrics = Arc::new(Metrics::new("pandora-core").unwrap());
        let s = scheduler(Arc::new(SlowRepository::default()), true).with_metrics(metrics.clone());

        s.trigger().await.unwrap();
        let handle = s.start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        s.stop();
        handle.await.unwrap();

        let runs = |trigger: &str| {
            metrics
                .quota_reset_runs_total
                .with_label_values(&[trigger, "ok"])
                .get()
        };
        assert_eq!(runs("manual"), 1);
        assert_eq!(runs("startup"), 1);
        assert_eq!(metrics.quota_reset_skipped_services_total.get(), 0);
    }

    #[test]
    fn test_is_stopped_after_stop() {
        let s = scheduler(Arc::new(SlowRepository::default()), false);
        assert!(!s.is_stopped());
        s.stop();
        assert!(s.is_stopped());
    }

    #[tokio::test]
    async fn test_trigger_uses_injected_clock() {
        let repo = Arc::new(SlowRepository::default());
        let s = scheduler(repo, false)
            .with_clock(|| Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap());

        let output = s.trigger().await.unwrap();
        assert_eq!(output.today, Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap());
    }
}
