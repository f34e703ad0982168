// Timestamp normalization to canonical epoch milliseconds
use super::telemetry::RawTimestamp;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Numbers below this magnitude are epoch seconds.
pub const SECONDS_THRESHOLD: f64 = 1e12;
/// Numbers above this magnitude are overscaled (microseconds) and divided by 1000.
pub const OVERSCALE_THRESHOLD: f64 = 1e14;

/// Normalize any raw timestamp to epoch milliseconds.
///
/// Returns `None` for anything unusable; never panics.
pub fn normalize(raw: &RawTimestamp) -> Option<i64> {
    let millis = match raw {
        RawTimestamp::EpochMillis(ms) => correct_overscale(*ms),
        RawTimestamp::EpochSeconds(seconds) => seconds * 1000.0,
        RawTimestamp::Numeric(n) => infer_scale(*n),
        RawTimestamp::Text(text) => return normalize_text(text),
        RawTimestamp::DateTime(dt) => dt.timestamp_millis() as f64,
        RawTimestamp::Structured { seconds, nanos } => {
            let millis = *seconds as f64 * 1000.0 + (*nanos as f64 / 1e6).floor();
            correct_overscale(millis)
        }
    };

    to_millis(millis)
}

/// Normalize an optional timestamp; absence normalizes to `None`.
pub fn normalize_opt(raw: Option<&RawTimestamp>) -> Option<i64> {
    raw.and_then(normalize)
}

fn correct_overscale(value: f64) -> f64 {
    if value.abs() > OVERSCALE_THRESHOLD {
        (value / 1000.0).floor()
    } else {
        value
    }
}

fn infer_scale(value: f64) -> f64 {
    if value.abs() > OVERSCALE_THRESHOLD {
        (value / 1000.0).floor()
    } else if value.abs() < SECONDS_THRESHOLD {
        value * 1000.0
    } else {
        value
    }
}

/// Inclusive calendar-day range check in UTC; the end day runs to 23:59:59.999.
/// An undated instant only passes when there are no bounds at all.
pub fn within_days(time_ms: Option<i64>, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    if start.is_none() && end.is_none() {
        return true;
    }
    let Some(time_ms) = time_ms else {
        return false;
    };

    let after_start = start
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map_or(true, |start| time_ms >= start.and_utc().timestamp_millis());
    let before_end = end
        .and_then(|d| d.and_hms_milli_opt(23, 59, 59, 999))
        .map_or(true, |end| time_ms <= end.and_utc().timestamp_millis());

    after_start && before_end
}

/// Milliseconds only when they name a representable date.
fn to_millis(value: f64) -> Option<i64> {
    if !value.is_finite() || value.abs() >= i64::MAX as f64 {
        return None;
    }
    let millis = value.round() as i64;
    DateTime::<Utc>::from_timestamp_millis(millis).map(|_| millis)
}

fn normalize_text(text: &str) -> Option<i64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if is_plain_number(trimmed) {
        let numeric = trimmed.parse::<f64>().ok()?;
        return to_millis(infer_scale(numeric));
    }

    parse_date(trimmed)
}

/// `[+-]?digits(.digits)?`
fn is_plain_number(text: &str) -> bool {
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (unsigned, None),
    };

    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    all_digits(int_part) && frac_part.is_none_or(all_digits)
}

fn parse_date(text: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.timestamp_millis());
    }

    // Zone-less forms are read as UTC
    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp_millis())
}
