use crate::error::{Result, SyncError};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// The timestamp every bookkeeping entry starts from, older than any
/// upstream modification time.
pub fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::default()
}

/// Parse a persisted timestamp. RFC 3339 is what we write; the legacy
/// space-separated form is accepted for artifacts written by older tooling.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let trimmed = value.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }

    Err(SyncError::InvalidFormat(format!(
        "Invalid timestamp: '{}'",
        value
    )))
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_epoch_is_unix_zero() {
        assert_eq!(epoch().timestamp(), 0);
    }

    #[test]
    fn test_timestamp_round_trip() {
        let ts = Utc.with_ymd_and_hms(2016, 6, 1, 12, 30, 0).unwrap();
        let text = format_timestamp(&ts);
        assert_eq!(text, "2016-06-01T12:30:00Z");
        assert_eq!(parse_timestamp(&text).unwrap(), ts);
    }

    #[test]
    fn test_legacy_timestamps() {
        let ts = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("1970-01-01 00:00:00").unwrap(), ts);
        assert_eq!(parse_timestamp("1970-01-01 00:00").unwrap(), ts);
        assert!(parse_timestamp("yesterday").is_err());
    }
}
