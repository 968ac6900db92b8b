//! Reference host binary: binds the configured scheme and serves the echo
//! endpoint until interrupted.

use std::io::{self, Write};
use std::process::ExitCode;

use hermes_config::Config;
use hermes_server::{run_host, telemetry};
use ortho_config::OrthoConfig;

fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(error) => {
            return fail(&format!("failed to load configuration: {error}"));
        }
    };
    if let Err(error) = telemetry::initialise(&config) {
        return fail(&error.to_string());
    }

    match run_host(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(
                target: concat!(env!("CARGO_PKG_NAME"), "::host"),
                error = %error,
                "host failed"
            );
            ExitCode::FAILURE
        }
    }
}

/// Reports a failure that happened before logging was available.
fn fail(message: &str) -> ExitCode {
    writeln!(io::stderr().lock(), "hermes-host: {message}").ok();
    ExitCode::FAILURE
}
