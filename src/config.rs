//! Run configuration shared by the backup and restore binaries.
//!
//! Everything here is immutable for the lifetime of a run; the engine only
//! reads it.

use std::path::PathBuf;
use std::time::Duration;

use crate::digest::EtagAlgorithm;

/// Origin advertised on every request, matching the registered client.
pub const CLIENT_ORIGIN: &str = "https://adaptive-backup.dev";

/// Initial fallback delay when the server rate-limits without a usable
/// `Retry-After` header.
pub const DEFAULT_RETRY_AFTER_MS: u64 = 1500;

/// Default concurrency caps per mode.
pub const DEFAULT_BACKUP_SIMULTANEOUS: usize = 9;
pub const DEFAULT_RESTORE_SIMULTANEOUS: usize = 10;

#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Base storage endpoint; always ends with `/`.
    pub endpoint: String,

    /// Bearer token for the `Authorization` header.
    pub token: String,

    /// Value of the `Origin` header.
    pub origin: String,

    /// Local root of the mirror.
    pub backup_dir: PathBuf,

    /// Optional top-level category, already stripped of slashes.
    pub category: Option<String>,

    /// Also process `/public/<category>/` when a category is given.
    pub include_public: bool,

    /// Upper bound on concurrently executing transfers.
    pub simultaneous: usize,

    /// Digest algorithm for upload entity tags (restore only). `None` falls
    /// back to the ETag saved in the folder description.
    pub etag_algorithm: Option<EtagAlgorithm>,

    /// Starting value of the fallback retry delay.
    pub initial_retry_after: Duration,
}

impl RunConfig {
    pub fn user_agent() -> String {
        format!("AdaptiveBackup/{}", env!("CARGO_PKG_VERSION"))
    }
}

/// Ensure the endpoint ends with `/` so encoded paths append cleanly.
pub fn normalize_endpoint(mut endpoint: String) -> String {
    if !endpoint.ends_with('/') {
        endpoint.push('/');
    }
    endpoint
}

/// Categories are single top-level names; any slashes are stripped.
pub fn normalize_category(raw: &str) -> Option<String> {
    let cleaned: String = raw.chars().filter(|&c| c != '/').collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_gains_a_trailing_slash() {
        assert_eq!(
            normalize_endpoint("https://host/storage/alice".into()),
            "https://host/storage/alice/"
        );
        assert_eq!(
            normalize_endpoint("https://host/storage/alice/".into()),
            "https://host/storage/alice/"
        );
    }

    #[test]
    fn category_slashes_are_stripped() {
        assert_eq!(normalize_category("documents"), Some("documents".into()));
        assert_eq!(normalize_category("/documents/"), Some("documents".into()));
        assert_eq!(normalize_category("///"), None);
        assert_eq!(normalize_category(""), None);
    }

    #[test]
    fn user_agent_carries_the_crate_version() {
        let agent = RunConfig::user_agent();
        assert!(agent.starts_with("AdaptiveBackup/"));
    }
}
