//! Integration tests for configuration layer precedence.

use std::ffi::{OsStr, OsString};
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::Lazy;
use ortho_config::OrthoConfig;
use rstest::rstest;

use hermes_config::{Config, FALLBACK_SCHEME, LogFormat};

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

struct EnvOverride {
    key: &'static str,
    previous: Option<OsString>,
    guard: Option<MutexGuard<'static, ()>>,
}

impl EnvOverride {
    fn lock() -> MutexGuard<'static, ()> {
        ENV_MUTEX
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn set_var(key: &'static str, value: &OsStr) -> Self {
        let guard = Self::lock();
        let previous = std::env::var_os(key);
        // Environment mutation is `unsafe` on the 2024 edition; the guard keeps
        // tests in this binary from racing and `Drop` restores the old value.
        unsafe { std::env::set_var(key, value) };
        Self {
            key,
            previous,
            guard: Some(guard),
        }
    }
}

impl Drop for EnvOverride {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(value) => unsafe { std::env::set_var(self.key, value) },
            None => unsafe { std::env::remove_var(self.key) },
        }
        drop(self.guard.take());
    }
}

fn args(extra: &[&str]) -> Vec<OsString> {
    std::iter::once("hermes-host")
        .chain(extra.iter().copied())
        .map(OsString::from)
        .collect()
}

#[test]
fn loads_built_in_defaults() {
    let _guard = EnvOverride::lock();
    let config = Config::load_from_iter(args(&[])).expect("defaults should load");
    assert_eq!(config.effective_default_scheme(), FALLBACK_SCHEME);
    assert_eq!(config.log_format(), LogFormat::Json);
    assert!(config.dispatch_path.is_none());
}

#[test]
fn environment_overrides_default_scheme() {
    let _env = EnvOverride::set_var("HERMES_DEFAULT_SCHEME", OsStr::new("fromenv"));
    let config = Config::load_from_iter(args(&[])).expect("config should load");
    assert_eq!(config.default_scheme(), "fromenv");
}

#[test]
fn cli_takes_precedence_over_environment() {
    let _env = EnvOverride::set_var("HERMES_DEFAULT_SCHEME", OsStr::new("fromenv"));
    let config = Config::load_from_iter(args(&["--default-scheme", "fromcli"]))
        .expect("config should load");
    assert_eq!(config.default_scheme(), "fromcli");
}

#[rstest]
#[case("/content/Game/Spells/Fireball?edit")]
#[case("/echo/hello")]
fn dispatch_path_is_accepted_from_the_command_line(#[case] path: &str) {
    let _guard = EnvOverride::lock();
    let config =
        Config::load_from_iter(args(&["--dispatch-path", path])).expect("config should load");
    assert_eq!(config.dispatch_path.as_deref(), Some(path));
}
