use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::domain::error::ErrorKind;

/// Metrics は Prometheus メトリクスのヘルパー構造体である。
/// HTTP / gRPC の RED メトリクスに加え、予約の精算とクォータリセットの件数を持つ。
pub struct Metrics {
    pub http_requests_total: IntCounterVec,
    pub http_request_duration: HistogramVec,
    pub grpc_handled_total: IntCounterVec,
    pub grpc_handling_duration: HistogramVec,
    pub reservations_total: IntCounterVec,
    pub quota_reset_runs_total: IntCounterVec,
    pub quota_reset_skipped_services_total: IntCounter,
    registry: Registry,
}

const DEFAULT_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

impl Metrics {
    /// new は Prometheus メトリクスを初期化して返す。
    /// service_name はメトリクスの service ラベルに使用される。
    pub fn new(service_name: &str) -> anyhow::Result<Self> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests")
                .const_label("service", service_name),
            &["method", "path", "status"],
        )?;

        let http_request_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "Histogram of HTTP request latency",
            )
            .const_label("service", service_name)
            .buckets(DEFAULT_BUCKETS.to_vec()),
            &["method", "path"],
        )?;

        let grpc_handled_total = IntCounterVec::new(
            Opts::new(
                "grpc_server_handled_total",
                "Total number of RPCs completed on the server",
            )
            .const_label("service", service_name),
            &["grpc_method", "grpc_code"],
        )?;

        let grpc_handling_duration = HistogramVec::new(
            HistogramOpts::new(
                "grpc_server_handling_seconds",
                "Histogram of response latency of gRPC",
            )
            .const_label("service", service_name)
            .buckets(DEFAULT_BUCKETS.to_vec()),
            &["grpc_method"],
        )?;

        let reservations_total = IntCounterVec::new(
            Opts::new(
                "pandora_reservations_total",
                "Total number of reservation operations by outcome",
            )
            .const_label("service", service_name),
            &["operation", "result"],
        )?;

        let quota_reset_runs_total = IntCounterVec::new(
            Opts::new(
                "pandora_quota_reset_runs_total",
                "Total number of quota reset runs",
            )
            .const_label("service", service_name),
            &["trigger", "result"],
        )?;

        let quota_reset_skipped_services_total = IntCounter::with_opts(
            Opts::new(
                "pandora_quota_reset_skipped_services_total",
                "Total number of project services skipped by a quota reset run",
            )
            .const_label("service", service_name),
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration.clone()))?;
        registry.register(Box::new(grpc_handled_total.clone()))?;
        registry.register(Box::new(grpc_handling_duration.clone()))?;
        registry.register(Box::new(reservations_total.clone()))?;
        registry.register(Box::new(quota_reset_runs_total.clone()))?;
        registry.register(Box::new(quota_reset_skipped_services_total.clone()))?;

        Ok(Self {
            http_requests_total,
            http_request_duration,
            grpc_handled_total,
            grpc_handling_duration,
            reservations_total,
            quota_reset_runs_total,
            quota_reset_skipped_services_total,
            registry,
        })
    }

    pub fn record_http_request(&self, method: &str, path: &str, status: &str) {
        self.http_requests_total
            .with_label_values(&[method, path, status])
            .inc();
    }

    pub fn record_http_duration(&self, method: &str, path: &str, duration_secs: f64) {
        self.http_request_duration
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    pub fn record_grpc_request(&self, method: &str, code: &str) {
        self.grpc_handled_total
            .with_label_values(&[method, code])
            .inc();
    }

    pub fn record_grpc_duration(&self, method: &str, duration_secs: f64) {
        self.grpc_handling_duration
            .with_label_values(&[method])
            .observe(duration_secs);
    }

    /// record_reservation は予約操作（reserve / commit / rollback）の結果を数える。
    /// 失敗時の result はエラー分類のコードになる。
    pub fn record_reservation(&self, operation: &str, error: Option<ErrorKind>) {
        let result = error.map_or("ok", |kind| kind.code());
        self.reservations_total
            .with_label_values(&[operation, result])
            .inc();
    }

    /// record_quota_reset_run はリセット 1 回分の結果とスキップ件数を記録する。
    pub fn record_quota_reset_run(&self, trigger: &str, ok: bool, skipped: usize) {
        let result = if ok { "ok" } else { "aborted" };
        self.quota_reset_runs_total
            .with_label_values(&[trigger, result])
            .inc();
        self.quota_reset_skipped_services_total
            .inc_by(u64::try_from(skipped).unwrap_or(u64::MAX));
    }

    /// gather_metrics は Prometheus テキストフォーマットでメトリクスを返す。
    pub fn gather_metrics(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
