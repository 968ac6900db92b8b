//! Turns an activated URL into a dispatch path and hands it to the host.
//!
//! A running host owns one datagram socket per bound scheme; the path is sent
//! there as a single message. Without a live socket the registered command
//! line is launched instead, with [`PATH_PLACEHOLDER`] replaced by the path.

use std::io;
use std::process::{Child, Command, Stdio};

use camino::Utf8Path;
use url::Url;

use hermes_config::{MAX_MESSAGE_SIZE, PATH_PLACEHOLDER};

use crate::errors::HelperError;

/// A URL reduced to what the host needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Activation {
    /// Lower-case scheme naming the channel.
    pub(crate) scheme: String,
    /// `/<endpoint>/<subpath>[?<query>]`, still percent-encoded.
    pub(crate) path: String,
}

impl Activation {
    /// Parses `raw` and rebuilds the dispatch path from its host, path and
    /// query. Fragments are dropped.
    pub(crate) fn parse(raw: &str) -> Result<Self, HelperError> {
        let url = Url::parse(raw).map_err(|source| HelperError::InvalidUrl {
            url: raw.to_owned(),
            source,
        })?;

        let mut path = String::from("/");
        match url.host_str() {
            Some(host) => {
                path.push_str(host);
                path.push_str(url.path());
            }
            // `scheme:endpoint/sub` carries the endpoint in the path.
            None => path.push_str(url.path().strip_prefix('/').unwrap_or(url.path())),
        }
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }

        Ok(Self {
            scheme: url.scheme().to_owned(),
            path,
        })
    }
}

/// Sends `path` to the channel at `socket`.
///
/// Returns `Ok(false)` when no host is listening there.
pub(crate) fn deliver(socket: &Utf8Path, path: &str) -> Result<bool, HelperError> {
    if path.len() > MAX_MESSAGE_SIZE {
        return Err(HelperError::MessageTooLarge {
            length: path.len(),
            limit: MAX_MESSAGE_SIZE,
        });
    }
    send_datagram(socket, path.as_bytes())
}

#[cfg(unix)]
fn send_datagram(socket: &Utf8Path, payload: &[u8]) -> Result<bool, HelperError> {
    use std::os::unix::net::UnixDatagram;

    let deliver_error = |source: io::Error| HelperError::Deliver {
        path: socket.to_path_buf(),
        source,
    };
    let sender = UnixDatagram::unbound().map_err(deliver_error)?;
    match sender.send_to(payload, socket.as_std_path()) {
        Ok(_) => Ok(true),
        Err(error) if is_not_listening(&error) => Ok(false),
        Err(source) => Err(deliver_error(source)),
    }
}

#[cfg(not(unix))]
fn send_datagram(_socket: &Utf8Path, _payload: &[u8]) -> Result<bool, HelperError> {
    Ok(false)
}

#[cfg(unix)]
fn is_not_listening(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused
    )
}

/// Launches `command` with every placeholder replaced by `path`.
pub(crate) fn launch(command: &[String], path: &str) -> Result<Child, HelperError> {
    let Some((program, args)) = command.split_first() else {
        return Err(HelperError::Launch {
            program: String::new(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "empty command line"),
        });
    };
    Command::new(program)
        .args(args.iter().map(|arg| arg.replace(PATH_PLACEHOLDER, path)))
        .stdin(Stdio::null())
        .spawn()
        .map_err(|source| HelperError::Launch {
            program: program.clone(),
            source,
        })
}
