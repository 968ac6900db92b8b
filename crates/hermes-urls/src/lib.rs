//! Helper runtime for Hermes scheme associations.
//!
//! The host spawns this helper to record which command line handles a scheme
//! (`register`) and to forget it again (`unregister`). Activating a URL
//! (`open`) forwards its dispatch path to the host listening on that scheme,
//! or launches the registered command line when no host is running.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use ortho_config::OrthoConfig;
use tracing::{debug, info};

use hermes_config::{Config, RuntimePaths, is_valid_scheme};

mod activation;
mod associations;
mod cli;
mod errors;
mod logging;

use activation::{Activation, deliver, launch};
use associations::AssociationTable;
use cli::{Cli, HelperCommand};
use errors::HelperError;

const HELPER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::helper");

/// Runs the helper with `args`, writing help to `stdout` and failures to
/// `stderr`. Exits with status 1 on any failure.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) if !error.use_stderr() => {
            return match write!(stdout, "{error}") {
                Ok(()) => ExitCode::SUCCESS,
                Err(_) => ExitCode::FAILURE,
            };
        }
        Err(error) => return report(stderr, &HelperError::CliUsage(error)),
    };

    match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => report(stderr, &error),
    }
}

fn report<E: Write>(stderr: &mut E, error: &HelperError) -> ExitCode {
    if writeln!(stderr, "hermes-urls: {error}").is_err() {
        tracing::error!(target: HELPER_TARGET, error = %error, "helper failed");
    }
    ExitCode::FAILURE
}

fn execute(cli: &Cli) -> Result<(), HelperError> {
    let config = load_config(cli)?;
    let paths = RuntimePaths::derive(&config)?;
    match &cli.command {
        HelperCommand::Register {
            register_with_debugging,
            scheme,
            command,
        } => {
            logging::initialise(cli.log_filter());
            register(&paths, scheme, command, *register_with_debugging)
        }
        HelperCommand::Unregister { scheme } => {
            logging::initialise(cli.log_filter());
            unregister(&paths, scheme)
        }
        HelperCommand::Open { url } => open(cli, &paths, url),
    }
}

fn load_config(cli: &Cli) -> Result<Config, HelperError> {
    let mut args = vec![OsString::from(env!("CARGO_PKG_NAME"))];
    if let Some(path) = cli.config_path.as_ref() {
        args.push(OsString::from("--config-path"));
        args.push(OsString::from(path.as_str()));
    }
    Config::load_from_iter(args).map_err(HelperError::LoadConfiguration)
}

fn register(
    paths: &RuntimePaths,
    scheme: &str,
    command: &[String],
    debugging: bool,
) -> Result<(), HelperError> {
    let scheme = normalise_scheme(scheme)?;
    let mut table = AssociationTable::load(paths.associations_path())?;
    if table.insert(&scheme, command.to_vec(), debugging).is_some() {
        debug!(target: HELPER_TARGET, scheme = %scheme, "replacing existing association");
    }
    table.save(paths.associations_path())?;
    info!(
        target: HELPER_TARGET,
        scheme = %scheme,
        command = ?command,
        debugging,
        "scheme registered"
    );
    Ok(())
}

fn unregister(paths: &RuntimePaths, scheme: &str) -> Result<(), HelperError> {
    let scheme = normalise_scheme(scheme)?;
    let mut table = AssociationTable::load(paths.associations_path())?;
    if !table.remove(&scheme) {
        debug!(target: HELPER_TARGET, scheme = %scheme, "scheme was not registered");
        return Ok(());
    }
    table.save(paths.associations_path())?;
    info!(target: HELPER_TARGET, scheme = %scheme, "scheme unregistered");
    Ok(())
}

/// Activations of a scheme registered with debugging log at debug level,
/// whatever flags the OS passed.
fn open(cli: &Cli, paths: &RuntimePaths, url: &str) -> Result<(), HelperError> {
    let activation = Activation::parse(url)?;
    let table = AssociationTable::load(paths.associations_path());
    let debugging = table
        .as_ref()
        .is_ok_and(|loaded| loaded.debugging(&activation.scheme));
    logging::initialise(if debugging { "debug" } else { cli.log_filter() });
    debug!(target: HELPER_TARGET, url, "opening URL");

    let socket = paths.channel_path(&activation.scheme);
    if deliver(&socket, &activation.path)? {
        info!(
            target: HELPER_TARGET,
            scheme = %activation.scheme,
            path = %activation.path,
            "delivered to running host"
        );
        return Ok(());
    }

    let associations = table?;
    let command = associations
        .command(&activation.scheme)
        .ok_or_else(|| HelperError::NotRegistered {
            scheme: activation.scheme.clone(),
        })?;
    let child = launch(command, &activation.path)?;
    info!(
        target: HELPER_TARGET,
        scheme = %activation.scheme,
        path = %activation.path,
        pid = child.id(),
        "launched registered command"
    );
    Ok(())
}

/// Lower-cases `scheme` and checks it against the scheme syntax the host
/// sanitizes to, rejecting rather than repairing malformed input.
fn normalise_scheme(scheme: &str) -> Result<String, HelperError> {
    let lowered = scheme.to_ascii_lowercase();
    if is_valid_scheme(&lowered) {
        Ok(lowered)
    } else {
        Err(HelperError::InvalidScheme {
            scheme: scheme.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("hue4", Some("hue4"))]
    #[case("MyGame-Main", Some("mygame-main"))]
    #[case("a+b.c", Some("a+b.c"))]
    #[case("", None)]
    #[case("4hue", None)]
    #[case("hue 4", None)]
    fn validates_schemes(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(normalise_scheme(raw).ok().as_deref(), expected);
    }

    #[test]
    fn help_goes_to_stdout() {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let code = run(
            ["hermes-urls", "--help"].map(OsString::from),
            &mut stdout,
            &mut stderr,
        );
        assert_eq!(code, ExitCode::SUCCESS);
        assert!(String::from_utf8_lossy(&stdout).contains("register"));
        assert!(stderr.is_empty());
    }

    #[test]
    fn usage_errors_fail() {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let code = run(
            ["hermes-urls", "frobnicate"].map(OsString::from),
            &mut stdout,
            &mut stderr,
        );
        assert_eq!(code, ExitCode::FAILURE);
        assert!(String::from_utf8_lossy(&stderr).starts_with("hermes-urls: "));
    }
}
