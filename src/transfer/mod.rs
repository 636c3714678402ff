//! Per-mode transfers driven by the dispatcher.
//!
//! A transfer never propagates an error out of itself; it reports what the
//! engine should do with the queue entry instead.

pub mod fetch;
pub mod progress;
pub mod progress_stream;
pub mod put;

use reqwest::header::HeaderName;

/// What a finished transfer asks the engine to do with its queue entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Dequeue; the path is done.
    Complete,

    /// The server rejected the path for good; dequeue into the failed set.
    PermanentFailure,

    /// 429/503: install a pause barrier and move the entry to the end.
    /// No failure is recorded.
    Overloaded { retry_after: Option<String> },

    /// Move to the end without counting a failure (504).
    RetryWithoutCount,

    /// Transient failure: count it and move the entry to the end.
    RetryCounted,

    /// Reading local state failed; abandon the run and fail the entry.
    Fatal,
}

pub(crate) fn header_string(response: &reqwest::Response, name: HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}
