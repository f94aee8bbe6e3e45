//! Debug channel setup.
//!
//! Decode failures, empty polls and batch delete results are reported through
//! `tracing` on stderr, separate from the maillog lines on stdout. Nothing is
//! shown unless `SES_TAILER_LOG` selects it, e.g. `SES_TAILER_LOG=sqs=debug`
//! for the queue targets (`sqs::receive`, `sqs::batch_delete`) or
//! `SES_TAILER_LOG=ses_tailer=debug` for decoding notes.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_ENV_VAR: &str = "SES_TAILER_LOG";

/// Installs the global subscriber. Calling it again is a no-op.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("off"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
