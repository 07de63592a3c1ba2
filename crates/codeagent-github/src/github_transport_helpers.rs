use std::time::Duration;

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};

const RETRY_DELAY_CAP_MS: u64 = 30_000;

/// Return true for GitHub statuses worth retrying (rate limits and server errors).
pub fn is_retryable_github_status(status: u16) -> bool {
    status == 429 || status >= 500
}

pub fn is_retryable_transport_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request()
}

/// Parse a `Retry-After` header expressed in whole seconds.
pub fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    let raw = headers.get("retry-after")?.to_str().ok()?;
    let seconds = raw.trim().parse::<u64>().ok()?;
    Some(Duration::from_secs(seconds))
}

/// Exponential backoff; an explicit `Retry-After` takes precedence. Both are
/// capped at 30s.
pub fn retry_delay(base_delay_ms: u64, attempt: usize, retry_after: Option<Duration>) -> Duration {
    if let Some(delay) = retry_after {
        return delay
            .max(Duration::from_millis(base_delay_ms))
            .min(Duration::from_millis(RETRY_DELAY_CAP_MS));
    }
    let exponent = attempt.saturating_sub(1).min(10) as u32;
    let scaled = base_delay_ms.saturating_mul(2_u64.saturating_pow(exponent));
    Duration::from_millis(scaled.min(RETRY_DELAY_CAP_MS))
}

/// Start of a lookback window, or `None` when it falls outside the representable range.
pub fn window_start(now: DateTime<Utc>, window_days: u32) -> Option<DateTime<Utc>> {
    let window = TimeDelta::try_days(i64::from(window_days))?;
    now.checked_sub_signed(window)
}

/// ISO 8601 timestamp in the form GitHub expects for `since` filters.
pub fn format_github_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}
