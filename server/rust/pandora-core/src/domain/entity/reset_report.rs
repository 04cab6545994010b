use serde::Serialize;

use super::environment_service::EnvironmentServiceReset;

/// ProjectResetReport は1プロジェクト分のリセット結果。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectResetReport {
    pub project_id: String,
    pub name: String,
    pub status: String,
    pub environment_services: Vec<EnvironmentServiceReset>,
}

/// ServiceResetFailure はリセットに失敗し読み飛ばしたサービス。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceResetFailure {
    pub project_id: String,
    pub service_id: String,
    pub reason: String,
}
