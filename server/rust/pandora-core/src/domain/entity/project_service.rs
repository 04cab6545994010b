use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::service::reset_schedule;

/// リクエスト数無制限を表す値。
pub const UNLIMITED: i64 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetFrequency {
    None,
    Daily,
    Weekly,
    Biweekly,
    Monthly,
}

impl ResetFrequency {
    pub fn as_str(&self) -> &str {
        match self {
            ResetFrequency::None => "none",
            ResetFrequency::Daily => "daily",
            ResetFrequency::Weekly => "weekly",
            ResetFrequency::Biweekly => "biweekly",
            ResetFrequency::Monthly => "monthly",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "none" => Some(ResetFrequency::None),
            "daily" => Some(ResetFrequency::Daily),
            "weekly" => Some(ResetFrequency::Weekly),
            "biweekly" => Some(ResetFrequency::Biweekly),
            "monthly" => Some(ResetFrequency::Monthly),
            _ => None,
        }
    }
}

/// ProjectServiceError はクォータポリシーの不変条件違反を表す。
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ProjectServiceError {
    #[error("max_requests must be >= 0 or -1 (unlimited), got {0}")]
    InvalidMaxRequests(i64),

    #[error("reset frequency must be 'none' iff max_requests is unlimited (max_requests={max_requests}, frequency={frequency})")]
    FrequencyMismatch { max_requests: i64, frequency: String },
}

/// ProjectService はプロジェクト単位のクォータポリシー。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectService {
    pub service_id: String,
    pub max_requests: i64,
    pub reset_frequency: ResetFrequency,
    pub next_reset: Option<DateTime<Utc>>,
    pub assigned_at: DateTime<Utc>,
}

impl ProjectService {
    /// サービスをプロジェクトに割り当てた時点のポリシーを作成し、
    /// 初回のリセット日を即座に算出する。
    pub fn new(
        service_id: String,
        max_requests: i64,
        reset_frequency: ResetFrequency,
        assigned_at: DateTime<Utc>,
    ) -> Result<Self, ProjectServiceError> {
        if max_requests < UNLIMITED {
            return Err(ProjectServiceError::InvalidMaxRequests(max_requests));
        }
        let unlimited = max_requests == UNLIMITED;
        if unlimited != (reset_frequency == ResetFrequency::None) {
            return Err(ProjectServiceError::FrequencyMismatch {
                max_requests,
                frequency: reset_frequency.as_str().to_string(),
            });
        }

        let next_reset = reset_schedule::next_reset(&reset_frequency, assigned_at);
        Ok(Self {
            service_id,
            max_requests,
            reset_frequency,
            next_reset,
            assigned_at,
        })
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_requests == UNLIMITED
    }

    /// today 時点でリセット対象かどうか。
    pub fn is_due(&self, today: DateTime<Utc>) -> bool {
        self.next_reset.is_some_and(|next| next <= today)
    }
}

/// Project はクォータリセット処理で扱うプロジェクト集約。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub status: String,
    pub services: Vec<ProjectService>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn assigned() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 14, 10, 30, 0).unwrap()
    }

    #[test]
    fn test_reset_frequency_roundtrip() {
        for s in ["none", "daily", "weekly", "biweekly", "monthly"] {
            assert_eq!(ResetFrequency::from_str(s).unwrap().as_str(), s);
        }
        assert_eq!(ResetFrequency::from_str("hourly"), None);
    }

    #[test]
    fn test_new_computes_next_reset() {
        let ps = ProjectService::new(
            "svc-1".to_string(),
            1000,
            ResetFrequency::Daily,
            assigned(),
        )
        .unwrap();
        assert_eq!(
            ps.next_reset,
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap())
        );
        assert!(!ps.is_unlimited());
    }

    #[test]
    fn test_new_unlimited_has_no_next_reset() {
        let ps = ProjectService::new(
            "svc-1".to_string(),
            UNLIMITED,
            ResetFrequency::None,
            assigned(),
        )
        .unwrap();
        assert!(ps.is_unlimited());
        assert!(ps.next_reset.is_none());
        assert!(!ps.is_due(assigned()));
    }

    #[test]
    fn test_new_rejects_frequency_mismatch() {
        let err = ProjectService::new(
            "svc-1".to_string(),
            UNLIMITED,
            ResetFrequency::Daily,
            assigned(),
        )
        .unwrap_err();
        assert!(matches!(err, ProjectServiceError::FrequencyMismatch { .. }));

        let err = ProjectService::new("svc-1".to_string(), 10, ResetFrequency::None, assigned())
            .unwrap_err();
        assert!(matches!(err, ProjectServiceError::FrequencyMismatch { .. }));
    }

    #[test]
    fn test_new_rejects_negative_max_requests() {
        let err = ProjectService::new("svc-1".to_string(), -5, ResetFrequency::Daily, assigned())
            .unwrap_err();
        assert_eq!(err, ProjectServiceError::InvalidMaxRequests(-5));
    }

    #[test]
    fn test_is_due() {
        let ps = ProjectService::new(
            "svc-1".to_string(),
            10,
            ResetFrequency::Weekly,
            assigned(),
        )
        .unwrap();
        let next = ps.next_reset.unwrap();
        assert!(ps.is_due(next));
        assert!(!ps.is_due(next - chrono::Duration::days(1)));
    }
}
