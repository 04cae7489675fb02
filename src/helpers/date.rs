//! Date helper functions

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};

/// Parse a front-matter timestamp in the formats Decap and hand-written
/// files use. Naive values are taken as UTC.
///
/// # Examples
/// ```ignore
/// parse_date("2024-01-15T10:30:00.000Z") // -> Some(2024-01-15 10:30:00 UTC)
/// parse_date("2024/01/15")               // -> Some(2024-01-15 00:00:00 UTC)
/// ```
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    // RFC 3339 / ISO 8601 with offset (what Decap's datetime widget writes)
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    let datetime_formats = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%Y/%m/%d %H:%M",
    ];
    for fmt in datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0)?));
        }
    }

    // "2024-01-15 10:30:00 +0800"
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S %z") {
        return Some(dt.with_timezone(&Utc));
    }

    None
}

/// Ordering key for a timestamp field: unparsable or absent is the epoch
pub fn sort_key(s: Option<&str>) -> DateTime<Utc> {
    s.and_then(parse_date).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Format in ISO 8601 with milliseconds, matching `Date.toISOString()`
pub fn date_iso(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}
