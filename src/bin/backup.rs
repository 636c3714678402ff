//! Backup tool - mirrors a remote storage tree into a local directory.

use adaptive_backup::cli::{self, CommonArgs};
use adaptive_backup::config::DEFAULT_BACKUP_SIMULTANEOUS;
use adaptive_backup::daemon::shutdown;
use adaptive_backup::engine::{Engine, Mode};
use adaptive_backup::utils::logger;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "adaptive-backup",
    version,
    about = "Mirror a remote storage tree into a local directory"
)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = logger::init(&cli.common.log_level) {
        eprintln!("failed to initialize logging: {err:#}");
        std::process::exit(1);
    }

    let config = match cli::resolve_config(&cli.common, DEFAULT_BACKUP_SIMULTANEOUS, None).await {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("{:#}", err);
            std::process::exit(1);
        }
    };

    let engine = match Engine::new(config, Mode::Backup) {
        Ok(engine) => engine,
        Err(err) => {
            tracing::error!("cannot initialize the transfer engine: {}", err);
            std::process::exit(1);
        }
    };

    shutdown::install(engine.clone(), true);

    match engine.run().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            tracing::error!("startup failed: {}", err);
            std::process::exit(1);
        }
    }
}
