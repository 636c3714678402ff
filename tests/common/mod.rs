use std::path::PathBuf;
use std::time::Duration;

use adaptive_backup::config::{RunConfig, CLIENT_ORIGIN};

/// Run configuration pointed at a mock server. The fallback retry delay is
/// shortened so rate-limit tests stay fast.
pub fn run_config(endpoint: &str, backup_dir: PathBuf) -> RunConfig {
    RunConfig {
        endpoint: format!("{}/", endpoint.trim_end_matches('/')),
        token: "test-token".into(),
        origin: CLIENT_ORIGIN.into(),
        backup_dir,
        category: None,
        include_public: false,
        simultaneous: 4,
        etag_algorithm: None,
        initial_retry_after: Duration::from_millis(40),
    }
}
