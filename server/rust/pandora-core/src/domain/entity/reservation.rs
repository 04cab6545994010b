use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 予約 ID の最大長。
pub const MAX_RESERVATION_ID_LEN: usize = 128;

/// Reservation は Environment×Service のクォータ1単位の仮押さえ。
/// 存在している間、その1単位は既に `available_request` から差し引かれている。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: String,
    pub environment_id: String,
    pub service_id: String,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    pub fn new(environment_id: String, service_id: String) -> Self {
        Self {
            id: format!("rsv_{}", uuid::Uuid::new_v4().simple()),
            environment_id,
            service_id,
            created_at: Utc::now(),
        }
    }
}

/// validate_reservation_id はストレージに触れる前に予約 ID の形式を検証する。
pub fn validate_reservation_id(id: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err("reservation id is required".to_string());
    }
    if id.chars().count() > MAX_RESERVATION_ID_LEN {
        return Err(format!(
            "reservation id must be at most {MAX_RESERVATION_ID_LEN} characters"
        ));
    }
    if id.trim() != id {
        return Err("reservation id must not have surrounding whitespace".to_string());
    }
    if id.chars().any(char::is_control) {
        return Err("reservation id must not contain control characters".to_string());
    }
    Ok(())
}
