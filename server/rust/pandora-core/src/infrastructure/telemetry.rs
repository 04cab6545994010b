use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use super::config::ObservabilityConfig;

/// ログ出力を初期化する。
///
/// `RUST_LOG` が設定されていればそちらを優先し、なければ設定ファイルの `log_level` を使う。
/// `log_format` が `text` 以外なら JSON で出力する。
pub fn init_telemetry(cfg: &ObservabilityConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.log_level))
        .map_err(|e| anyhow::anyhow!("invalid log level '{}': {}", cfg.log_level, e))?;
    let registry = tracing_subscriber::registry().with(filter);

    if cfg.log_format == "text" {
        registry
            .with(fmt::layer().with_target(true))
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to init telemetry: {}", e))?;
    } else {
        registry
            .with(fmt::layer().json().with_target(true))
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to init telemetry: {}", e))?;
    }
    Ok(())
}
