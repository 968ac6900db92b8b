//! Persistence of the "last scheme" value across runs.

use std::fs;
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Key/value persistence used by the scheme arbiter.
pub trait StateStore {
    /// Returns the persisted last scheme, if any.
    fn last_scheme(&self) -> Result<Option<String>, StateStoreError>;

    /// Persists `scheme` as the last scheme.
    fn set_last_scheme(&mut self, scheme: &str) -> Result<(), StateStoreError>;

    /// Clears the persisted last scheme.
    fn clear_last_scheme(&mut self) -> Result<(), StateStoreError>;
}

/// Errors raised while reading or writing persisted state.
#[derive(Debug, Error)]
pub enum StateStoreError {
    /// The state file exists but could not be read.
    #[error("failed to read state file {path}: {source}")]
    Read {
        /// State file path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The state file is not valid JSON.
    #[error("failed to parse state file {path}: {source}")]
    Parse {
        /// State file path.
        path: Utf8PathBuf,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },
    /// Writing or replacing the state file failed.
    #[error("failed to write state file {path}: {source}")]
    Write {
        /// State file path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The state could not be serialised.
    #[error("failed to encode state: {source}")]
    Encode {
        /// Encoder error.
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_scheme: Option<String>,
}

/// JSON file backed store. A missing file reads as empty state.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: Utf8PathBuf,
}

impl FileStateStore {
    /// Builds a store persisting to `path`. Nothing is touched until the first
    /// write.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the state file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn read(&self) -> Result<PersistedState, StateStoreError> {
        match fs::read_to_string(self.path.as_std_path()) {
            Ok(text) => serde_json::from_str(&text).map_err(|source| StateStoreError::Parse {
                path: self.path.clone(),
                source,
            }),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(PersistedState::default()),
            Err(source) => Err(StateStoreError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write(&self, state: &PersistedState) -> Result<(), StateStoreError> {
        let encoded =
            serde_json::to_vec_pretty(state).map_err(|source| StateStoreError::Encode { source })?;
        let write_error = |source: io::Error| StateStoreError::Write {
            path: self.path.clone(),
            source,
        };
        let parent = self
            .path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        fs::create_dir_all(parent.as_std_path()).map_err(write_error)?;

        // Replaced atomically.
        let mut staged = tempfile::NamedTempFile::new_in(parent.as_std_path()).map_err(write_error)?;
        staged.write_all(&encoded).map_err(write_error)?;
        staged
            .persist(self.path.as_std_path())
            .map_err(|error| write_error(error.error))?;
        Ok(())
    }
}

impl StateStore for FileStateStore {
    fn last_scheme(&self) -> Result<Option<String>, StateStoreError> {
        Ok(self.read()?.last_scheme)
    }

    fn set_last_scheme(&mut self, scheme: &str) -> Result<(), StateStoreError> {
        let mut state = self.read()?;
        state.last_scheme = Some(scheme.to_owned());
        self.write(&state)
    }

    fn clear_last_scheme(&mut self) -> Result<(), StateStoreError> {
        if !self.path.as_std_path().exists() {
            return Ok(());
        }
        let mut state = self.read()?;
        state.last_scheme = None;
        self.write(&state)
    }
}

/// In-process store used by embedders without persistence and by tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStateStore {
    last_scheme: Option<String>,
}

impl MemoryStateStore {
    /// Builds a store seeded with `scheme`.
    #[must_use]
    pub fn with_last_scheme(scheme: impl Into<String>) -> Self {
        Self {
            last_scheme: Some(scheme.into()),
        }
    }
}

impl StateStore for MemoryStateStore {
    fn last_scheme(&self) -> Result<Option<String>, StateStoreError> {
        Ok(self.last_scheme.clone())
    }

    fn set_last_scheme(&mut self, scheme: &str) -> Result<(), StateStoreError> {
        self.last_scheme = Some(scheme.to_owned());
        Ok(())
    }

    fn clear_last_scheme(&mut self) -> Result<(), StateStoreError> {
        self.last_scheme = None;
        Ok(())
    }
}
