//! Error types surfaced by the helper.

use std::io;
use std::sync::Arc;

use camino::Utf8PathBuf;
use hermes_config::RuntimePathsError;
use thiserror::Error;

/// Failures reported by a helper invocation; each exits with status 1.
#[derive(Debug, Error)]
pub(crate) enum HelperError {
    /// The command line did not parse.
    #[error("{0}")]
    CliUsage(clap::Error),
    /// The layered configuration could not be loaded.
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    /// The runtime or state directories could not be prepared.
    #[error("failed to derive runtime paths: {0}")]
    Paths(#[from] RuntimePathsError),
    /// The scheme argument is not RFC 3986 scheme syntax.
    #[error("scheme '{scheme}' is not a valid URI scheme")]
    InvalidScheme {
        /// Scheme as given on the command line.
        scheme: String,
    },
    /// The association table exists but could not be read.
    #[error("failed to read associations from {path}: {source}")]
    ReadAssociations {
        /// Association table path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The association table is not valid JSON.
    #[error("failed to parse associations in {path}: {source}")]
    ParseAssociations {
        /// Association table path.
        path: Utf8PathBuf,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },
    /// The association table could not be serialised.
    #[error("failed to encode associations: {0}")]
    EncodeAssociations(#[source] serde_json::Error),
    /// Writing or replacing the association table failed.
    #[error("failed to write associations to {path}: {source}")]
    WriteAssociations {
        /// Association table path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The activated URL did not parse.
    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        /// URL as given on the command line.
        url: String,
        /// Parser error.
        #[source]
        source: url::ParseError,
    },
    /// The dispatch path does not fit in one channel message.
    #[error("dispatch path is {length} bytes; channels accept at most {limit}")]
    MessageTooLarge {
        /// Encoded path length, in bytes.
        length: usize,
        /// Largest accepted message, in bytes.
        limit: usize,
    },
    /// A listening host was found but the send failed.
    #[error("failed to deliver to channel {path}: {source}")]
    Deliver {
        /// Channel socket path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// No host is listening and nothing is registered for the scheme.
    #[error("no host is listening for '{scheme}' and no command is registered for it")]
    NotRegistered {
        /// Scheme of the activated URL.
        scheme: String,
    },
    /// The registered command line could not be started.
    #[error("failed to launch '{program}': {source}")]
    Launch {
        /// Program named by the registered command line.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}
