//! Reference host: wires the server to the platform channel and ticks it
//! until a termination signal arrives.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::flag;
use thiserror::Error;
use tracing::info;

use hermes_config::{Config, RuntimePaths, RuntimePathsError};

use crate::path::QueryParams;
use crate::preference::BranchPreference;
use crate::reporter::{DispatchReporter, StructuredReporter};
use crate::scheme::Scheme;
use crate::server::DispatchServer;
use crate::state::FileStateStore;
use crate::transport::{SchemeRegistrar, platform_channel};

const HOST_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::host");

/// Endpoint the reference host registers for smoke testing.
pub const ECHO_ENDPOINT: &str = "echo";

/// Errors surfaced while running the reference host.
#[derive(Debug, Error)]
pub enum HostError {
    /// The runtime or state paths could not be prepared.
    #[error("failed to prepare runtime paths: {0}")]
    Paths(#[from] RuntimePathsError),
    /// The host's own executable path is unknown.
    #[error("failed to resolve the current executable: {source}")]
    CurrentExe {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Registering the termination signal flags failed.
    #[error("failed to install signal handlers: {source}")]
    Signals {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Runs the host until SIGTERM, SIGINT, SIGQUIT or SIGHUP.
///
/// # Errors
///
/// Returns [`HostError`] when signal handlers or the runtime directory cannot
/// be set up.
pub fn run_host(config: &Config) -> Result<(), HostError> {
    let shutdown = Arc::new(AtomicBool::new(false));
    for signal in [SIGTERM, SIGINT, SIGQUIT, SIGHUP] {
        flag::register(signal, Arc::clone(&shutdown))
            .map_err(|source| HostError::Signals { source })?;
    }

    let mut server = build_server(config, Arc::new(StructuredReporter::new()))?;
    run_until(&mut server, config.tick_interval(), &shutdown);
    server.shutdown();
    info!(target: HOST_TARGET, "host stopped");
    Ok(())
}

/// Assembles a server from configuration with the echo endpoint registered.
///
/// # Errors
///
/// Returns [`HostError`] when the runtime directory or the current
/// executable cannot be resolved.
pub fn build_server(
    config: &Config,
    reporter: Arc<dyn DispatchReporter>,
) -> Result<DispatchServer, HostError> {
    let paths = RuntimePaths::from_config(config)?;
    let registrar = SchemeRegistrar::for_current_exe(config.helper_path())
        .map_err(|source| HostError::CurrentExe { source })?
        .with_debugging(config.register_with_debugging);
    let transport = platform_channel(paths.clone(), registrar, Arc::clone(&reporter));

    let mut builder = DispatchServer::builder(transport)
        .state_store(Box::new(FileStateStore::new(paths.state_path().to_owned())))
        .reporter(reporter)
        .default_scheme(config.effective_default_scheme())
        .launch_path(config.dispatch_path.clone());
    if let Some(branch) = config.branch_name.as_deref() {
        builder = builder.preference_source(Box::new(BranchPreference::with_default_replacements(
            branch,
            config.project_name.as_deref(),
        )));
    }

    let mut server = builder.build();
    server.register(ECHO_ENDPOINT, echo);
    Ok(server)
}

/// Starts `server` and ticks it every `interval` until `shutdown` is set.
pub fn run_until(server: &mut DispatchServer, interval: Duration, shutdown: &AtomicBool) {
    server.start();
    info!(
        target: HOST_TARGET,
        scheme = server.bound_scheme().map_or("", Scheme::as_str),
        example = %server.get_uri(ECHO_ENDPOINT, "hello"),
        "host running"
    );
    while !shutdown.load(Ordering::Relaxed) {
        server.on_tick();
        thread::sleep(interval);
    }
}

fn echo(path: &str, query: &QueryParams) {
    info!(
        target: HOST_TARGET,
        endpoint = ECHO_ENDPOINT,
        path,
        query = ?query,
        "echo"
    );
}
