//! Drives the external helper that (un)registers schemes with the OS.
//!
//! Registration runs asynchronously: the helper is spawned on bind and reaped
//! from the tick loop. Unregistration runs to completion because the next
//! bind may target the same association.

use std::ffi::OsString;
use std::io;
use std::process::{Child, Command, ExitStatus, Stdio};

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

use crate::scheme::Scheme;

use super::errors::TransportError;

pub use hermes_config::PATH_PLACEHOLDER;

/// Why a helper invocation failed.
#[derive(Debug, Error)]
pub enum HelperFailure {
    /// The helper exited with a non-zero code.
    #[error("helper exited with code {0}")]
    ExitCode(i32),
    /// The helper was terminated without an exit code.
    #[error("helper was terminated by a signal")]
    Terminated,
    /// The helper could not be launched or awaited.
    #[error("helper could not run: {0}")]
    Io(#[source] io::Error),
}

impl HelperFailure {
    fn from_status(status: ExitStatus) -> Option<Self> {
        if status.success() {
            None
        } else {
            Some(status.code().map_or(Self::Terminated, Self::ExitCode))
        }
    }
}

/// Builds helper command lines for a scheme.
#[derive(Debug, Clone)]
pub struct SchemeRegistrar {
    helper: Utf8PathBuf,
    launch_command: Vec<String>,
    debugging: bool,
}

impl SchemeRegistrar {
    /// Builds a registrar invoking `helper`. `launch_command` is the command
    /// the OS runs when a link is activated; it should contain
    /// [`PATH_PLACEHOLDER`].
    #[must_use]
    pub fn new(helper: impl Into<Utf8PathBuf>, launch_command: Vec<String>) -> Self {
        Self {
            helper: helper.into(),
            launch_command,
            debugging: false,
        }
    }

    /// Asks the helper to log at debug level, both while registering and
    /// whenever the registered scheme is activated.
    #[must_use]
    pub fn with_debugging(mut self, enabled: bool) -> Self {
        self.debugging = enabled;
        self
    }

    /// Builds a registrar whose launch command re-runs the current executable
    /// with `--dispatch-path %1`.
    ///
    /// # Errors
    ///
    /// Returns an error when the current executable cannot be resolved.
    pub fn for_current_exe(helper: impl Into<Utf8PathBuf>) -> io::Result<Self> {
        let exe = std::env::current_exe()?;
        let launch_command = vec![
            exe.to_string_lossy().into_owned(),
            "--dispatch-path".to_owned(),
            PATH_PLACEHOLDER.to_owned(),
        ];
        Ok(Self::new(helper, launch_command))
    }

    /// Helper executable path.
    #[must_use]
    pub fn helper(&self) -> &Utf8Path {
        &self.helper
    }

    /// Arguments registering `scheme`.
    #[must_use]
    pub fn register_args(&self, scheme: &Scheme) -> Vec<OsString> {
        let mut args: Vec<OsString> = if self.debugging {
            vec![
                "--debug".into(),
                "register".into(),
                "--register-with-debugging".into(),
            ]
        } else {
            vec!["register".into()]
        };
        args.extend(["--".into(), scheme.as_str().into()]);
        args.extend(self.launch_command.iter().map(OsString::from));
        args
    }

    /// Arguments unregistering `scheme`.
    #[must_use]
    pub fn unregister_args(scheme: &Scheme) -> Vec<OsString> {
        vec!["unregister".into(), "--".into(), scheme.as_str().into()]
    }

    /// Launches registration of `scheme` without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::SpawnHelper`] when the helper cannot start.
    pub fn spawn_register(&self, scheme: &Scheme) -> Result<PendingRegistration, TransportError> {
        let child = self
            .command(self.register_args(scheme))
            .spawn()
            .map_err(|source| TransportError::SpawnHelper {
                helper: self.helper.clone(),
                source,
            })?;
        Ok(PendingRegistration {
            scheme: scheme.clone(),
            child,
        })
    }

    /// Runs unregistration of `scheme` to completion.
    ///
    /// # Errors
    ///
    /// Returns the failure when the helper cannot run or exits unsuccessfully.
    pub fn run_unregister(&self, scheme: &Scheme) -> Result<(), HelperFailure> {
        let status = self
            .command(Self::unregister_args(scheme))
            .status()
            .map_err(HelperFailure::Io)?;
        HelperFailure::from_status(status).map_or(Ok(()), Err)
    }

    fn command(&self, args: Vec<OsString>) -> Command {
        let mut command = Command::new(self.helper.as_std_path());
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit());
        command
    }
}

/// A registration helper that has been launched but not yet reaped.
#[derive(Debug)]
pub struct PendingRegistration {
    scheme: Scheme,
    child: Child,
}

impl PendingRegistration {
    /// Scheme being registered.
    #[must_use]
    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    /// Checks for completion without blocking. Returns `None` while the
    /// helper is still running.
    pub fn try_finish(&mut self) -> Option<Result<(), HelperFailure>> {
        match self.child.try_wait() {
            Ok(Some(status)) => Some(HelperFailure::from_status(status).map_or(Ok(()), Err)),
            Ok(None) => None,
            Err(error) => Some(Err(HelperFailure::Io(error))),
        }
    }

    /// Blocks until the helper exits.
    pub fn wait(mut self) -> Result<(), HelperFailure> {
        let status = self.child.wait().map_err(HelperFailure::Io)?;
        HelperFailure::from_status(status).map_or(Ok(()), Err)
    }
}
