//! Local channel carrying activated paths into the server.
//!
//! A [`TransportChannel`] is bound to exactly one scheme at a time. Binding
//! opens a channel only the current user can write to and launches the helper
//! that associates the scheme with this program; polling never blocks.

mod errors;
mod registrar;
mod unsupported;

#[cfg(unix)]
mod datagram;

use std::sync::Arc;

use hermes_config::RuntimePaths;

use crate::reporter::DispatchReporter;
use crate::scheme::Scheme;

#[cfg(unix)]
pub use datagram::DatagramChannel;
pub use errors::TransportError;
pub use registrar::{HelperFailure, PATH_PLACEHOLDER, PendingRegistration, SchemeRegistrar};
pub use unsupported::UnsupportedChannel;

pub use hermes_config::MAX_MESSAGE_SIZE;

pub(crate) const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");

/// A single-reader channel bound to one scheme.
pub trait TransportChannel {
    /// Opens the channel for `scheme` and starts OS registration.
    ///
    /// On failure the channel stays unbound.
    fn bind(&mut self, scheme: &Scheme) -> Result<(), TransportError>;

    /// Removes the OS registration for `scheme`, closing the channel first
    /// when it is bound to `scheme`. Also used for a scheme registered by an
    /// earlier run that this channel never bound. Failures are reported,
    /// never returned.
    fn unbind(&mut self, scheme: &Scheme);

    /// Returns at most one pending message without blocking.
    fn poll(&mut self) -> Result<Option<Vec<u8>>, TransportError>;

    /// Releases the channel while leaving the OS registration in place.
    fn shutdown(&mut self) {}
}

impl<T> TransportChannel for Box<T>
where
    T: TransportChannel + ?Sized,
{
    fn bind(&mut self, scheme: &Scheme) -> Result<(), TransportError> {
        (**self).bind(scheme)
    }

    fn unbind(&mut self, scheme: &Scheme) {
        (**self).unbind(scheme);
    }

    fn poll(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        (**self).poll()
    }

    fn shutdown(&mut self) {
        (**self).shutdown();
    }
}

/// Builds the channel implementation for the current platform.
#[cfg(unix)]
#[must_use]
pub fn platform_channel(
    paths: RuntimePaths,
    registrar: SchemeRegistrar,
    reporter: Arc<dyn DispatchReporter>,
) -> Box<dyn TransportChannel> {
    Box::new(DatagramChannel::new(paths, registrar, reporter))
}

/// Builds the channel implementation for the current platform.
#[cfg(not(unix))]
#[must_use]
pub fn platform_channel(
    _paths: RuntimePaths,
    _registrar: SchemeRegistrar,
    _reporter: Arc<dyn DispatchReporter>,
) -> Box<dyn TransportChannel> {
    Box::new(UnsupportedChannel)
}
