//! Compact stderr logging for the helper.

use std::io;

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

static LOGGING_GUARD: OnceCell<()> = OnceCell::new();

/// Installs a compact subscriber filtered at `filter` on first use.
///
/// `RUST_LOG` takes precedence over the filter chosen by `--verbose` and
/// `--debug`. A subscriber installed elsewhere is left in place.
pub(crate) fn initialise(filter: &str) {
    LOGGING_GUARD.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
        let installed = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .with_target(false)
            .without_time()
            .compact()
            .try_init();
        if installed.is_err() {
            tracing::debug!("keeping the existing tracing subscriber");
        }
    });
}
