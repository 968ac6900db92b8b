//! Test double for [`DispatchReporter`] that records events for assertions.

use std::sync::Mutex;

use crate::arbiter::SchemeOrigin;
use crate::path::DispatchPath;
use crate::reporter::DispatchReporter;
use crate::scheme::Scheme;
use crate::state::StateStoreError;
use crate::transport::{HelperFailure, TransportError};

/// Events tracked during tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchEvent {
    EndpointRegistered(String),
    DuplicateEndpoint(String),
    EndpointUnregistered(String),
    MissingEndpoint(String),
    PathDispatched(String),
    EndpointNotFound(String),
    RequestDeferred(String),
    PendingDrained(usize),
    SchemeBound(String, SchemeOrigin),
    SchemeUnbound(String),
    SchemeBindFailed(String),
    TransportReadFailed,
    RegistrationSucceeded(String),
    RegistrationFailed(String),
    UnregistrationFailed(String),
    StateStoreFailed,
}

/// Records dispatch events for assertions.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<DispatchEvent>>,
}

impl RecordingReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<DispatchEvent> {
        self.events
            .lock()
            .expect("dispatch reporter mutex poisoned")
            .clone()
    }

    /// Number of paths dropped because their endpoint was unknown.
    #[must_use]
    pub fn routing_errors(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, DispatchEvent::EndpointNotFound(_)))
            .count()
    }

    /// Number of duplicate or missing endpoint anomalies.
    #[must_use]
    pub fn registry_anomalies(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| {
                matches!(
                    event,
                    DispatchEvent::DuplicateEndpoint(_) | DispatchEvent::MissingEndpoint(_)
                )
            })
            .count()
    }

    fn record(&self, event: DispatchEvent) {
        self.events
            .lock()
            .expect("dispatch reporter mutex poisoned")
            .push(event);
    }
}

impl DispatchReporter for RecordingReporter {
    fn endpoint_registered(&self, endpoint: &str) {
        self.record(DispatchEvent::EndpointRegistered(endpoint.to_owned()));
    }

    fn duplicate_endpoint(&self, endpoint: &str) {
        self.record(DispatchEvent::DuplicateEndpoint(endpoint.to_owned()));
    }

    fn endpoint_unregistered(&self, endpoint: &str) {
        self.record(DispatchEvent::EndpointUnregistered(endpoint.to_owned()));
    }

    fn missing_endpoint(&self, endpoint: &str) {
        self.record(DispatchEvent::MissingEndpoint(endpoint.to_owned()));
    }

    fn path_dispatched(&self, raw: &str, _parsed: &DispatchPath) {
        self.record(DispatchEvent::PathDispatched(raw.to_owned()));
    }

    fn endpoint_not_found(&self, _raw: &str, endpoint: &str) {
        self.record(DispatchEvent::EndpointNotFound(endpoint.to_owned()));
    }

    fn request_deferred(&self, parsed: &DispatchPath) {
        self.record(DispatchEvent::RequestDeferred(parsed.endpoint.clone()));
    }

    fn pending_drained(&self, count: usize) {
        self.record(DispatchEvent::PendingDrained(count));
    }

    fn scheme_bound(&self, scheme: &Scheme, origin: SchemeOrigin) {
        self.record(DispatchEvent::SchemeBound(scheme.to_string(), origin));
    }

    fn scheme_unbound(&self, scheme: &Scheme) {
        self.record(DispatchEvent::SchemeUnbound(scheme.to_string()));
    }

    fn scheme_bind_failed(&self, scheme: &Scheme, _error: &TransportError) {
        self.record(DispatchEvent::SchemeBindFailed(scheme.to_string()));
    }

    fn transport_read_failed(&self, _error: &TransportError) {
        self.record(DispatchEvent::TransportReadFailed);
    }

    fn registration_succeeded(&self, scheme: &Scheme) {
        self.record(DispatchEvent::RegistrationSucceeded(scheme.to_string()));
    }

    fn registration_failed(&self, scheme: &Scheme, _failure: &HelperFailure) {
        self.record(DispatchEvent::RegistrationFailed(scheme.to_string()));
    }

    fn unregistration_failed(&self, scheme: &Scheme, _failure: &HelperFailure) {
        self.record(DispatchEvent::UnregistrationFailed(scheme.to_string()));
    }

    fn state_store_failed(&self, _error: &StateStoreError) {
        self.record(DispatchEvent::StateStoreFailed);
    }
}
