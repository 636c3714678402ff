//! Restore tool - uploads a local mirror back to remote storage.

use adaptive_backup::cli::{self, CommonArgs};
use adaptive_backup::config::DEFAULT_RESTORE_SIMULTANEOUS;
use adaptive_backup::daemon::shutdown;
use adaptive_backup::digest::EtagAlgorithm;
use adaptive_backup::engine::{Engine, Mode};
use adaptive_backup::utils::logger;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "adaptive-restore",
    version,
    about = "Upload a local backup mirror back to remote storage"
)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Digest for upload entity tags: md5, sha256, or none to reuse saved tags
    #[arg(long, value_name = "NAME", default_value = "md5")]
    etag_algorithm: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = logger::init(&cli.common.log_level) {
        eprintln!("failed to initialize logging: {err:#}");
        std::process::exit(1);
    }

    let etag_algorithm = match EtagAlgorithm::parse_flag(&cli.etag_algorithm) {
        Ok(algorithm) => algorithm,
        Err(message) => {
            tracing::error!("{}", message);
            std::process::exit(1);
        }
    };

    let config =
        match cli::resolve_config(&cli.common, DEFAULT_RESTORE_SIMULTANEOUS, etag_algorithm).await {
            Ok(config) => config,
            Err(err) => {
                tracing::error!("{:#}", err);
                std::process::exit(1);
            }
        };

    let engine = match Engine::new(config, Mode::Restore) {
        Ok(engine) => engine,
        Err(err) => {
            tracing::error!("cannot initialize the transfer engine: {}", err);
            std::process::exit(1);
        }
    };

    shutdown::install(engine.clone(), false);

    match engine.run().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            tracing::error!("startup failed: {}", err);
            std::process::exit(1);
        }
    }
}
