//! Logging setup using tracing.

use tracing_subscriber::EnvFilter;

/// Install the log subscriber. `RUST_LOG` wins over the command-line level;
/// an unparsable directive falls back to `info`.
pub fn init(level: &str) -> anyhow::Result<()> {
    let directives =
        std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| level.to_string());
    let filter = EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| anyhow::anyhow!("cannot install the log subscriber: {err}"))?;

    tracing::debug!("log filter: {}", directives);
    Ok(())
}
