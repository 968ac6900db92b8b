//! Shared configuration for the Hermes URI dispatch server and its helper.
//!
//! [`Config`] is assembled by `ortho_config` from built-in defaults, an
//! optional TOML file, `HERMES_*` environment variables, and command-line
//! flags, in increasing order of precedence. [`RuntimePaths`] turns the
//! resolved configuration into the on-disk layout both binaries agree on.

mod defaults;
mod logging;
mod runtime;
mod scheme;

use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_TICK_INTERVAL_MS, FALLBACK_SCHEME, HELPER_EXECUTABLE,
    MAX_MESSAGE_SIZE, PATH_PLACEHOLDER, default_config_dir, default_helper_path,
    default_log_filter, default_log_filter_string, default_log_format, default_runtime_dir,
    default_state_path,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use runtime::{RuntimePaths, RuntimePathsError, create_private_dir};
pub use scheme::{is_valid_scheme, sanitize_scheme};

/// Resolved configuration shared by the host binary and the helper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "HERMES")]
#[serde(default)]
pub struct Config {
    /// Scheme bound when no preference source names one. Empty selects
    /// [`FALLBACK_SCHEME`].
    pub default_scheme: String,
    /// Project name used to derive branch replacement prefixes.
    pub project_name: Option<String>,
    /// Source-control branch; enables the branch-derived scheme preference.
    pub branch_name: Option<String>,
    /// Location of the helper executable.
    pub helper_path: Option<Utf8PathBuf>,
    /// Registers schemes so the helper logs activations at debug level.
    pub register_with_debugging: bool,
    /// Directory holding the channel sockets.
    pub runtime_dir: Option<Utf8PathBuf>,
    /// File persisting the last bound scheme.
    pub state_path: Option<Utf8PathBuf>,
    /// One-shot path dispatched on the first tick.
    pub dispatch_path: Option<String>,
    /// Cadence of the reference host's tick loop, in milliseconds.
    pub tick_interval_ms: u64,
    /// `tracing` filter expression.
    pub log_filter: String,
    /// Output format of the log subscriber.
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_scheme: String::new(),
            project_name: None,
            branch_name: None,
            helper_path: None,
            register_with_debugging: false,
            runtime_dir: None,
            state_path: None,
            dispatch_path: None,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// The configured default scheme, verbatim (possibly empty).
    #[must_use]
    pub fn default_scheme(&self) -> &str {
        &self.default_scheme
    }

    /// The default scheme with the empty value replaced by [`FALLBACK_SCHEME`].
    #[must_use]
    pub fn effective_default_scheme(&self) -> &str {
        if self.default_scheme.trim().is_empty() {
            FALLBACK_SCHEME
        } else {
            self.default_scheme.trim()
        }
    }

    /// Helper executable path, defaulting to a sibling of the current binary.
    #[must_use]
    pub fn helper_path(&self) -> Utf8PathBuf {
        self.helper_path.clone().unwrap_or_else(default_helper_path)
    }

    /// Runtime directory holding channel sockets.
    #[must_use]
    pub fn runtime_dir(&self) -> Utf8PathBuf {
        self.runtime_dir.clone().unwrap_or_else(default_runtime_dir)
    }

    /// File persisting the last bound scheme.
    #[must_use]
    pub fn state_path(&self) -> Utf8PathBuf {
        self.state_path.clone().unwrap_or_else(default_state_path)
    }

    /// Interval between host ticks; never zero.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    /// Configured log filter.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Configured log format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
