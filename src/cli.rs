//! Command-line surface shared by the backup and restore binaries.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Args;

use crate::config::{self, RunConfig, CLIENT_ORIGIN, DEFAULT_RETRY_AFTER_MS};
use crate::digest::EtagAlgorithm;
use crate::discovery;

#[derive(Debug, Args)]
pub struct CommonArgs {
    /// Local root of the mirror
    #[arg(short = 'o', long, value_name = "PATH")]
    pub backup_dir: PathBuf,

    /// user@host address for WebFinger discovery of the storage endpoint
    #[arg(short = 'u', long, value_name = "ADDR")]
    pub user_address: Option<String>,

    /// Bearer token; without one the run aborts before any transfer
    #[arg(short = 't', long, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Storage endpoint, bypassing discovery
    #[arg(short = 'e', long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Single top-level category (slashes are stripped); empty means the whole tree
    #[arg(short = 'c', long, value_name = "NAME")]
    pub category: Option<String>,

    /// Also process /public/<category>/ when a category is given
    #[arg(short = 'p', long)]
    pub include_public: bool,

    /// Cap on concurrently executing transfers
    #[arg(short = 's', long, value_name = "N")]
    pub simultaneous: Option<usize>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG overrides
    #[arg(short = 'l', long, default_value = "info")]
    pub log_level: String,
}

/// Turn parsed arguments into the immutable run configuration. Errors here
/// (missing token, failed discovery) map to exit status 1.
pub async fn resolve_config(
    args: &CommonArgs,
    default_simultaneous: usize,
    etag_algorithm: Option<EtagAlgorithm>,
) -> anyhow::Result<RunConfig> {
    let token = args.token.clone().ok_or_else(|| {
        anyhow::anyhow!(
            "no token supplied; pass --token <bearer> (interactive authorization is not supported)"
        )
    })?;

    let endpoint = match (&args.endpoint, &args.user_address) {
        (Some(endpoint), _) => config::normalize_endpoint(endpoint.clone()),
        (None, Some(address)) => discovery::discover_endpoint(address)
            .await
            .with_context(|| format!("discovering the storage endpoint for {address}"))?,
        (None, None) => bail!("either --endpoint or --user-address is required"),
    };

    Ok(RunConfig {
        endpoint,
        token,
        origin: CLIENT_ORIGIN.to_string(),
        backup_dir: args.backup_dir.clone(),
        category: args.category.as_deref().and_then(config::normalize_category),
        include_public: args.include_public,
        simultaneous: args.simultaneous.unwrap_or(default_simultaneous).max(1),
        etag_algorithm,
        initial_retry_after: Duration::from_millis(DEFAULT_RETRY_AFTER_MS),
    })
}
