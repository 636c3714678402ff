//! Graceful abandonment on fatal signals.
//!
//! Ensures that:
//! - In-flight transfers are allowed to finish
//! - Everything still waiting is recorded as failed
//! - A stuck backup run is forced down after a deadline

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, warn};

use crate::engine::Engine;

/// Delay between the first fatal signal and the hard exit (backup only).
const HARD_EXIT_DELAY: Duration = Duration::from_secs(10);

/// Install the signal watcher. SIGINT/SIGTERM/SIGQUIT/SIGHUP abandon the run
/// gracefully; with `hard_exit` a timer later forces the process down with
/// status 3, listing whatever was still pending.
pub fn install(engine: Arc<Engine>, hard_exit: bool) {
    tokio::spawn(async move {
        wait_for_signal().await;
        warn!("fatal signal received, abandoning gracefully...");
        engine.abandon_gracefully();

        if hard_exit {
            tokio::time::sleep(HARD_EXIT_DELAY).await;
            let remaining = engine.queued_paths();
            error!(
                "{} transfers still pending {}s after the signal; exiting hard: {:?}",
                remaining.len(),
                HARD_EXIT_DELAY.as_secs(),
                remaining
            );
            std::process::exit(3);
        }
    });
}

async fn wait_for_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate =
            signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");
        let mut quit = signal(SignalKind::quit()).expect("Failed to install SIGQUIT handler");
        let mut hangup = signal(SignalKind::hangup()).expect("Failed to install SIGHUP handler");

        tokio::select! {
            _ = ctrl_c => {}
            _ = terminate.recv() => {}
            _ = quit.recv() => {}
            _ = hangup.recv() => {}
        }
    }

    #[cfg(not(unix))]
    ctrl_c.await;
}
