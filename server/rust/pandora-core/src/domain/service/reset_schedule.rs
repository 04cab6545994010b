//! クォータリセット日の算出。
//!
//! リセット日は常に UTC 0 時に揃える。次回日は「前回のリセット予定日」を
//! 起点に進めるため、スケジューラの実行が遅れても日付の格子はずれない。

use chrono::{DateTime, Days, Months, NaiveDate, NaiveTime, Utc};

use crate::domain::entity::project_service::ResetFrequency;

/// frequency に従って anchor の次のリセット日を返す。
/// `ResetFrequency::None`（無制限）の場合は `None`。
pub fn next_reset(frequency: &ResetFrequency, anchor: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let date = anchor.date_naive();
    let next = match frequency {
        ResetFrequency::None => return None,
        ResetFrequency::Daily => date.checked_add_days(Days::new(1)),
        ResetFrequency::Weekly => date.checked_add_days(Days::new(7)),
        ResetFrequency::Biweekly => date.checked_add_days(Days::new(14)),
        // 月末日は翌月の末日に丸められる（1/31 -> 2/29）
        ResetFrequency::Monthly => date.checked_add_months(Months::new(1)),
    }?;
    Some(start_of_day(next))
}

/// previous から格子上で進め、today より厳密に後になる最初のリセット日を返す。
pub fn next_reset_after(
    frequency: &ResetFrequency,
    previous: DateTime<Utc>,
    today: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let today = truncate_to_midnight(today);
    let mut candidate = next_reset(frequency, previous)?;
    while candidate <= today {
        candidate = next_reset(frequency, candidate)?;
    }
    Some(candidate)
}

/// 時刻を切り捨てて UTC 0 時にする。
pub fn truncate_to_midnight(at: DateTime<Utc>) -> DateTime<Utc> {
    start_of_day(at.date_naive())
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}
