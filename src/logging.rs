use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Environment variable holding the tracing filter directive.
pub const LOG_ENV: &str = "LUMEN_LOG";

/// Install the fmt subscriber for host binaries. Safe to call repeatedly;
/// only the first call has any effect.
///
/// Hosts render diagnostics themselves, so the default filter only lets
/// `error` events through; `LUMEN_LOG=debug` shows calls and class layouts.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("error"));
        let _ = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true),
            )
            .with(filter)
            .try_init();
    });
}
