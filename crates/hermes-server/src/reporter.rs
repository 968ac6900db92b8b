//! Structured reporting for dispatch and scheme lifecycle events.

use std::sync::Arc;

use crate::arbiter::SchemeOrigin;
use crate::path::DispatchPath;
use crate::scheme::Scheme;
use crate::state::StateStoreError;
use crate::transport::{HelperFailure, TransportError};

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
const SCHEME_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::scheme");

/// Observer trait used to surface server events to telemetry sinks.
pub trait DispatchReporter: Send + Sync {
    /// A handler was registered under a new name.
    fn endpoint_registered(&self, endpoint: &str);

    /// A handler replaced an existing registration.
    fn duplicate_endpoint(&self, endpoint: &str);

    /// A handler was removed.
    fn endpoint_unregistered(&self, endpoint: &str);

    /// Removal was requested for a name with no handler.
    fn missing_endpoint(&self, endpoint: &str);

    /// A path arrived and was decomposed.
    fn path_dispatched(&self, raw: &str, parsed: &DispatchPath);

    /// A path named an endpoint with no handler and was dropped.
    fn endpoint_not_found(&self, raw: &str, endpoint: &str);

    /// A routed request was queued behind the closed readiness gate.
    fn request_deferred(&self, parsed: &DispatchPath);

    /// Queued requests were released after the gate opened.
    fn pending_drained(&self, count: usize);

    /// The transport was bound to `scheme`.
    fn scheme_bound(&self, scheme: &Scheme, origin: SchemeOrigin);

    /// The transport released `scheme`.
    fn scheme_unbound(&self, scheme: &Scheme);

    /// Binding `scheme` failed; the server stays unbound.
    fn scheme_bind_failed(&self, scheme: &Scheme, error: &TransportError);

    /// Polling the transport failed.
    fn transport_read_failed(&self, error: &TransportError);

    /// The helper finished registering `scheme` with the OS.
    fn registration_succeeded(&self, scheme: &Scheme);

    /// The helper failed to register `scheme`.
    fn registration_failed(&self, scheme: &Scheme, failure: &HelperFailure);

    /// The helper failed to unregister `scheme`.
    fn unregistration_failed(&self, scheme: &Scheme, failure: &HelperFailure);

    /// Reading or writing persisted state failed.
    fn state_store_failed(&self, error: &StateStoreError);
}

impl<T> DispatchReporter for Arc<T>
where
    T: DispatchReporter + ?Sized,
{
    fn endpoint_registered(&self, endpoint: &str) {
        (**self).endpoint_registered(endpoint);
    }

    fn duplicate_endpoint(&self, endpoint: &str) {
        (**self).duplicate_endpoint(endpoint);
    }

    fn endpoint_unregistered(&self, endpoint: &str) {
        (**self).endpoint_unregistered(endpoint);
    }

    fn missing_endpoint(&self, endpoint: &str) {
        (**self).missing_endpoint(endpoint);
    }

    fn path_dispatched(&self, raw: &str, parsed: &DispatchPath) {
        (**self).path_dispatched(raw, parsed);
    }

    fn endpoint_not_found(&self, raw: &str, endpoint: &str) {
        (**self).endpoint_not_found(raw, endpoint);
    }

    fn request_deferred(&self, parsed: &DispatchPath) {
        (**self).request_deferred(parsed);
    }

    fn pending_drained(&self, count: usize) {
        (**self).pending_drained(count);
    }

    fn scheme_bound(&self, scheme: &Scheme, origin: SchemeOrigin) {
        (**self).scheme_bound(scheme, origin);
    }

    fn scheme_unbound(&self, scheme: &Scheme) {
        (**self).scheme_unbound(scheme);
    }

    fn scheme_bind_failed(&self, scheme: &Scheme, error: &TransportError) {
        (**self).scheme_bind_failed(scheme, error);
    }

    fn transport_read_failed(&self, error: &TransportError) {
        (**self).transport_read_failed(error);
    }

    fn registration_succeeded(&self, scheme: &Scheme) {
        (**self).registration_succeeded(scheme);
    }

    fn registration_failed(&self, scheme: &Scheme, failure: &HelperFailure) {
        (**self).registration_failed(scheme, failure);
    }

    fn unregistration_failed(&self, scheme: &Scheme, failure: &HelperFailure) {
        (**self).unregistration_failed(scheme, failure);
    }

    fn state_store_failed(&self, error: &StateStoreError) {
        (**self).state_store_failed(error);
    }
}

/// Default reporter that records events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredReporter;

impl StructuredReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl DispatchReporter for StructuredReporter {
    fn endpoint_registered(&self, endpoint: &str) {
        tracing::debug!(
            target: DISPATCH_TARGET,
            event = "endpoint_registered",
            endpoint,
            "endpoint registered"
        );
    }

    fn duplicate_endpoint(&self, endpoint: &str) {
        tracing::warn!(
            target: DISPATCH_TARGET,
            event = "duplicate_endpoint",
            endpoint,
            "endpoint was already registered; replacing its handler"
        );
    }

    fn endpoint_unregistered(&self, endpoint: &str) {
        tracing::debug!(
            target: DISPATCH_TARGET,
            event = "endpoint_unregistered",
            endpoint,
            "endpoint unregistered"
        );
    }

    fn missing_endpoint(&self, endpoint: &str) {
        tracing::warn!(
            target: DISPATCH_TARGET,
            event = "missing_endpoint",
            endpoint,
            "cannot unregister unknown endpoint"
        );
    }

    fn path_dispatched(&self, raw: &str, parsed: &DispatchPath) {
        tracing::info!(
            target: DISPATCH_TARGET,
            event = "path_dispatched",
            path = raw,
            "handling path"
        );
        tracing::debug!(
            target: DISPATCH_TARGET,
            event = "path_parsed",
            endpoint = %parsed.endpoint,
            subpath = %parsed.path,
            query = ?parsed.query,
            "path decomposed"
        );
    }

    fn endpoint_not_found(&self, raw: &str, endpoint: &str) {
        tracing::error!(
            target: DISPATCH_TARGET,
            event = "endpoint_not_found",
            path = raw,
            endpoint,
            "no endpoint registered for path"
        );
    }

    fn request_deferred(&self, parsed: &DispatchPath) {
        tracing::info!(
            target: DISPATCH_TARGET,
            event = "request_deferred",
            endpoint = %parsed.endpoint,
            subpath = %parsed.path,
            "server not ready; deferring request"
        );
    }

    fn pending_drained(&self, count: usize) {
        tracing::info!(
            target: DISPATCH_TARGET,
            event = "pending_drained",
            count,
            "dispatching deferred requests"
        );
    }

    fn scheme_bound(&self, scheme: &Scheme, origin: SchemeOrigin) {
        tracing::info!(
            target: SCHEME_TARGET,
            event = "scheme_bound",
            scheme = %scheme,
            origin = ?origin,
            "listening for scheme"
        );
    }

    fn scheme_unbound(&self, scheme: &Scheme) {
        tracing::info!(
            target: SCHEME_TARGET,
            event = "scheme_unbound",
            scheme = %scheme,
            "stopped listening for scheme"
        );
    }

    fn scheme_bind_failed(&self, scheme: &Scheme, error: &TransportError) {
        tracing::error!(
            target: SCHEME_TARGET,
            event = "scheme_bind_failed",
            scheme = %scheme,
            error = %error,
            "failed to bind scheme"
        );
    }

    fn transport_read_failed(&self, error: &TransportError) {
        tracing::error!(
            target: DISPATCH_TARGET,
            event = "transport_read_failed",
            error = %error,
            "failed to read from channel"
        );
    }

    fn registration_succeeded(&self, scheme: &Scheme) {
        tracing::info!(
            target: SCHEME_TARGET,
            event = "registration_succeeded",
            scheme = %scheme,
            "scheme registered with the operating system"
        );
    }

    fn registration_failed(&self, scheme: &Scheme, failure: &HelperFailure) {
        tracing::error!(
            target: SCHEME_TARGET,
            event = "registration_failed",
            scheme = %scheme,
            failure = %failure,
            "failed to register scheme"
        );
    }

    fn unregistration_failed(&self, scheme: &Scheme, failure: &HelperFailure) {
        tracing::warn!(
            target: SCHEME_TARGET,
            event = "unregistration_failed",
            scheme = %scheme,
            failure = %failure,
            "failed to unregister scheme"
        );
    }

    fn state_store_failed(&self, error: &StateStoreError) {
        tracing::warn!(
            target: SCHEME_TARGET,
            event = "state_store_failed",
            error = %error,
            "failed to access persisted scheme state"
        );
    }
}
