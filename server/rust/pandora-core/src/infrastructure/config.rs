use secrecy::Secret;
use serde::Deserialize;

/// Application configuration for pandora core server.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub quota_reset: QuotaResetConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let mut cfg: Config = serde_yaml::from_str(content)?;
        // DATABASE_URL は設定ファイルの値より優先する。
        if let Ok(url) = std::env::var("DATABASE_URL") {
            match cfg.database.as_mut() {
                Some(db) => db.url = Secret::new(url),
                None => cfg.database = Some(DatabaseConfig::from_url(url)),
            }
        }
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_environment")]
    pub environment: String,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_grpc_port")]
    pub grpc_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            grpc_port: default_grpc_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_grpc_port() -> u16 {
    50051
}

/// DatabaseConfig はデータベース接続の設定を表す（URL形式）。
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

impl DatabaseConfig {
    fn from_url(url: String) -> Self {
        Self {
            url: Secret::new(url),
            max_connections: default_max_connections(),
            connect_timeout_seconds: default_connect_timeout_seconds(),
            run_migrations: default_run_migrations(),
        }
    }
}

fn default_max_connections() -> u32 {
    10
}

fn default_connect_timeout_seconds() -> u64 {
    5
}

fn default_run_migrations() -> bool {
    true
}

/// QuotaResetConfig はリセットジョブの設定を表す。
#[derive(Debug, Clone, Deserialize)]
pub struct QuotaResetConfig {
    /// UTC で評価する cron 式。
    #[serde(default = "default_schedule")]
    pub schedule: String,
    #[serde(default = "default_run_on_start")]
    pub run_on_start: bool,
}

impl Default for QuotaResetConfig {
    fn default() -> Self {
        Self {
            schedule: default_schedule(),
            run_on_start: default_run_on_start(),
        }
    }
}

fn default_schedule() -> String {
    "0 0 * * *".to_string()
}

fn default_run_on_start() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}
