use std::env;
use std::path::PathBuf;

use camino::Utf8PathBuf;

#[cfg(unix)]
use libc::geteuid;

#[cfg(unix)]
use dirs::runtime_dir;

/// Scheme used when neither a preference source nor the configuration names one.
pub const FALLBACK_SCHEME: &str = "hue4";

/// File name of the helper executable performing OS scheme (un)registration.
pub const HELPER_EXECUTABLE: &str = "hermes-urls";

/// Largest message a channel accepts, in bytes: a maximal path plus room for
/// the scheme, host and query.
pub const MAX_MESSAGE_SIZE: usize = 32 * 1024 + 256;

/// Placeholder in a registered command line that the helper replaces with
/// the activated path.
pub const PATH_PLACEHOLDER: &str = "%1";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default cadence of the reference host's tick loop.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 50;

/// Default log filter expression used by the binaries.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

/// Directory holding the per-user channel sockets.
///
/// Prefers the session runtime directory; otherwise falls back to a
/// uid-namespaced directory beneath the system temporary directory.
pub fn default_runtime_dir() -> Utf8PathBuf {
    default_runtime_dir_inner()
}

#[cfg(unix)]
fn default_runtime_dir_inner() -> Utf8PathBuf {
    let (mut base, apply_namespace) = match runtime_dir().and_then(utf8) {
        Some(dir) => (dir, false),
        None => (fallback_base_directory(), true),
    };

    base.push("hermes");
    if apply_namespace {
        base.push(user_namespace());
    }
    base
}

#[cfg(unix)]
fn user_namespace() -> String {
    let uid = unsafe { geteuid() };
    format!("uid-{uid}")
}

#[cfg(not(unix))]
fn default_runtime_dir_inner() -> Utf8PathBuf {
    let mut base = fallback_base_directory();
    base.push("hermes");
    base
}

/// Per-user configuration directory holding persisted state and associations.
pub fn default_config_dir() -> Utf8PathBuf {
    let mut base = dirs::config_dir()
        .and_then(utf8)
        .unwrap_or_else(fallback_base_directory);
    base.push("hermes");
    base
}

/// File persisting the last bound scheme between runs.
pub fn default_state_path() -> Utf8PathBuf {
    default_config_dir().join("state.json")
}

/// Helper executable expected to sit next to the running binary.
pub fn default_helper_path() -> Utf8PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(helper_file_name())))
        .and_then(utf8)
        .unwrap_or_else(|| Utf8PathBuf::from(helper_file_name()))
}

fn helper_file_name() -> String {
    format!("{HELPER_EXECUTABLE}{}", env::consts::EXE_SUFFIX)
}

fn fallback_base_directory() -> Utf8PathBuf {
    utf8(env::temp_dir()).unwrap_or_else(|| Utf8PathBuf::from("/tmp"))
}

fn utf8(path: PathBuf) -> Option<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path).ok()
}
