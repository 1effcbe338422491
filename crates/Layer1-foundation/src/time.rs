//! Clock helpers - Unix 초 단위 타임스탬프

use chrono::{DateTime, TimeZone, Utc};

/// 현재 Unix 타임스탬프 (초)
pub fn now() -> i64 {
    Utc::now().timestamp()
}

/// `seconds`초 전의 타임스탬프 (i64 범위를 넘으면 포화)
pub fn seconds_ago(seconds: u64) -> i64 {
    now().saturating_sub(i64::try_from(seconds).unwrap_or(i64::MAX))
}

/// Unix 타임스탬프를 `DateTime<Utc>`로 변환 (범위 밖이면 epoch)
pub fn to_datetime(timestamp: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(timestamp, 0).single().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_timestamp() {
        let ts = 1_700_000_000;
        assert_eq!(to_datetime(ts).timestamp(), ts);
    }

    #[test]
    fn test_seconds_ago_saturates() {
        assert!(seconds_ago(60) <= now() - 60);
        assert!(seconds_ago(u64::MAX) < 0);
        assert!(seconds_ago(i64::MAX as u64 + 1) < 0);
    }

    #[test]
    fn test_now_is_recent() {
        assert!(now() > 1_600_000_000);
    }
}
