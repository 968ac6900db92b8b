//! Derives the filesystem locations shared by the server and the helper.
//!
//! The runtime directory houses one datagram socket per bound scheme. The
//! configuration directory keeps the persisted "last scheme" state and the
//! helper's association table. Both binaries must agree on this layout so the
//! helper can find the channel a running server is reading from.

use std::fs::DirBuilder;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

use crate::Config;

/// Canonical paths for the artefacts shared between server and helper.
#[derive(Debug, Clone)]
pub struct RuntimePaths {
    runtime_dir: Utf8PathBuf,
    state_path: Utf8PathBuf,
    associations_path: Utf8PathBuf,
}

impl RuntimePaths {
    /// Derives the paths from configuration and creates the runtime directory.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimePathsError`] when the state path has no parent or the
    /// runtime directory cannot be created.
    pub fn from_config(config: &Config) -> Result<Self, RuntimePathsError> {
        let paths = Self::derive(config)?;
        create_private_dir(&paths.runtime_dir)?;
        Ok(paths)
    }

    /// Derives the paths without touching the filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimePathsError::MissingStateParent`] when the configured
    /// state path has no parent directory.
    pub fn derive(config: &Config) -> Result<Self, RuntimePathsError> {
        let state_path = config.state_path();
        let associations_path = match state_path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
        {
            Some(parent) => parent.join("associations.json"),
            None => {
                return Err(RuntimePathsError::MissingStateParent {
                    path: state_path.to_string(),
                });
            }
        };
        Ok(Self {
            runtime_dir: config.runtime_dir(),
            state_path,
            associations_path,
        })
    }

    /// Directory holding the channel sockets.
    #[must_use]
    pub fn runtime_dir(&self) -> &Utf8Path {
        &self.runtime_dir
    }

    /// Socket path of the channel owned by `scheme`.
    #[must_use]
    pub fn channel_path(&self, scheme: &str) -> Utf8PathBuf {
        self.runtime_dir.join(format!("{scheme}.sock"))
    }

    /// Path of the persisted server state.
    #[must_use]
    pub fn state_path(&self) -> &Utf8Path {
        &self.state_path
    }

    /// Path of the helper's scheme association table.
    #[must_use]
    pub fn associations_path(&self) -> &Utf8Path {
        &self.associations_path
    }
}

/// Creates `path` (and its ancestors) readable only by the current user.
///
/// # Errors
///
/// Returns [`RuntimePathsError::CreateDirectory`] when creation fails for any
/// reason other than the directory already existing.
pub fn create_private_dir(path: &Utf8Path) -> Result<(), RuntimePathsError> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }

    if let Err(source) = builder.create(path.as_std_path())
        && source.kind() != io::ErrorKind::AlreadyExists
    {
        return Err(RuntimePathsError::CreateDirectory {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}

/// Errors raised while deriving runtime paths.
#[derive(Debug, Error)]
pub enum RuntimePathsError {
    /// The state path lacked a parent directory.
    #[error("state path '{path}' has no parent directory")]
    MissingStateParent {
        /// State path as configured.
        path: String,
    },
    /// Creating a directory failed.
    #[error("failed to prepare directory '{path}': {source}")]
    CreateDirectory {
        /// Directory that could not be created or restricted.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}
