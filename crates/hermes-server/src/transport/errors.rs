//! Error types for channel binding and polling.

use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;

use hermes_config::RuntimePathsError;

/// Errors surfaced while binding or reading a scheme channel.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The runtime directory holding the sockets could not be created.
    #[error("failed to prepare runtime directory: {0}")]
    RuntimeDirectory(#[from] RuntimePathsError),

    /// Inspecting an existing file at the channel path failed.
    #[error("failed to read metadata for channel {path}: {source}")]
    Metadata {
        /// Channel path that was inspected.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Something other than a socket occupies the channel path.
    #[error("channel path {path} exists and is not a socket")]
    NotSocket {
        /// Occupied channel path.
        path: Utf8PathBuf,
    },

    /// Another live process already reads from the channel.
    #[error("channel {path} is already owned by another reader")]
    InUse {
        /// Channel path with a live reader.
        path: Utf8PathBuf,
    },

    /// Probing an existing socket for a live reader failed.
    #[error("failed to probe existing channel {path}: {source}")]
    Probe {
        /// Channel path that was probed.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A stale socket could not be removed.
    #[error("failed to remove stale channel {path}: {source}")]
    Cleanup {
        /// Stale socket path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Binding the socket failed.
    #[error("failed to create channel {path}: {source}")]
    Create {
        /// Socket path that could not be bound.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Restricting the socket to its owner failed.
    #[error("failed to restrict access to channel {path}: {source}")]
    Permissions {
        /// Socket whose mode or owner could not be changed.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Switching the socket to non-blocking reads failed.
    #[error("failed to enable non-blocking reads on channel {path}: {source}")]
    NonBlocking {
        /// Affected socket path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The registration helper could not be started.
    #[error("failed to launch helper {helper}: {source}")]
    SpawnHelper {
        /// Helper executable.
        helper: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Receiving from the socket failed.
    #[error("failed to read from channel: {source}")]
    Read {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A message exceeded the channel size and was discarded.
    #[error("discarded a message longer than {limit} bytes")]
    Oversized {
        /// Largest accepted message, in bytes.
        limit: usize,
    },

    /// This platform has no channel implementation.
    #[error("scheme channels are unsupported on this platform (scheme {scheme})")]
    Unsupported {
        /// Scheme that could not be bound.
        scheme: String,
    },
}
