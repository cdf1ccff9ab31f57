//! Process-wide diagnostics for the in-process server.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the `tracing` filter directive
pub const LOG_ENV_VAR: &str = "REPLAY_VOICE_LOG";

static INIT: Once = Once::new();

/// Install the stderr subscriber once per process.
///
/// Leaves an already installed global subscriber in place; the host process
/// may have set one.
pub fn init() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("info"));
        let installed = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init()
            .is_ok();

        if installed {
            tracing::debug!("Replay voice logging initialized");
        }
    });
}
