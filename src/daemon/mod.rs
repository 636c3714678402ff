//! Process-level concerns: signal handling and the hard-exit timer.

pub mod shutdown;
