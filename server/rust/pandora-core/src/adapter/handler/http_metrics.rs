use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::infrastructure::metrics::Metrics;

/// track_http_metrics は HTTP リクエスト数とレイテンシを記録する axum ミドルウェア。
/// path ラベルにはルート定義（`/api/v1/reservations/{id}/commit` など）を使う。
pub async fn track_http_metrics(
    State(metrics): State<Arc<Metrics>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().to_string();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| "unmatched".to_string(), |p| p.as_str().to_string());
    let start = Instant::now();

    let response = next.run(req).await;

    metrics.record_http_request(&method, &path, response.status().as_str());
    metrics.record_http_duration(&method, &path, start.elapsed().as_secs_f64());
    response
}
