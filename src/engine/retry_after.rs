//! Parsing of the `Retry-After` response header.
//!
//! The header is either a positive integer number of seconds or an HTTP-date.
//! Anything else yields `None` and the caller falls back to the per-process
//! default delay (which grows on every fallback use).

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Convert a `Retry-After` header value to a delay, if it carries one.
pub fn parse(raw: &str) -> Option<Duration> {
    let value = raw.trim();
    if let Ok(seconds) = value.parse::<i64>() {
        if seconds > 0 {
            return Some(Duration::from_secs(seconds as u64));
        }
        return None;
    }

    let date = DateTime::parse_from_rfc2822(value).ok()?;
    let delta = date.with_timezone(&Utc) - Utc::now();
    let millis = delta.num_milliseconds();
    if millis > 0 {
        Some(Duration::from_millis(millis as u64))
    } else {
        None
    }
}
