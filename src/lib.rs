//! Adaptive throttled backup and restore for remote HTTP storage.
//!
//! Backup mirrors a remote folder tree into a local directory; restore
//! uploads a mirror back. Both directions run on the same transfer engine:
//! an insertion-ordered work queue, a bounded-concurrency dispatcher, a
//! global pause barrier honouring server rate limiting, and per-path
//! failure accounting with graceful abandonment.

pub mod cli;
pub mod config;
pub mod content_type;
pub mod daemon;
pub mod digest;
pub mod discovery;
pub mod engine;
pub mod fs;
pub mod transfer;
pub mod utils;

// Re-export commonly used types
pub use config::RunConfig;
pub use engine::{Engine, Mode};
pub use utils::errors::BackupError;
pub type Result<T> = std::result::Result<T, BackupError>;
