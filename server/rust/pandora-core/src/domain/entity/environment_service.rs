use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::project_service::UNLIMITED;

/// EnvironmentService は Environment×Service ごとのクォータ残量。
///
/// `available_request` は `-1`（無制限）か `0..=max_request` の範囲を取る。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentService {
    pub environment_id: String,
    pub service_id: String,
    pub max_request: i64,
    pub available_request: i64,
}

impl EnvironmentService {
    pub fn new(environment_id: String, service_id: String, max_request: i64) -> Self {
        Self {
            environment_id,
            service_id,
            max_request,
            available_request: max_request,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.available_request == UNLIMITED
    }

    /// 1単位消費する。残量がなければ何も変えずに false を返す。
    pub fn try_consume(&mut self) -> bool {
        if self.is_unlimited() {
            return true;
        }
        if self.available_request <= 0 {
            return false;
        }
        self.available_request -= 1;
        true
    }

    /// 1単位返却する。`max_request` を超えない。無制限なら何もしない。
    pub fn release(&mut self) {
        if self.is_unlimited() {
            return;
        }
        self.available_request = (self.available_request + 1).min(self.max_request);
    }

    /// 残量を上限まで戻す。
    pub fn refill(&mut self) {
        self.available_request = self.max_request;
    }
}

/// EnvironmentServiceReset はリセット処理で補充された1件の記録。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentServiceReset {
    pub environment_id: String,
    pub service_id: String,
    pub max_request: i64,
    pub available_request: i64,
    pub next_reset: DateTime<Utc>,
}
