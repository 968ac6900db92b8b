//! Name-to-handler table consulted for every inbound path.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::path::QueryParams;

/// Receives the decoded sub-path and query of a routed request.
pub trait EndpointHandler {
    /// Handles one request addressed to this endpoint.
    fn handle(&mut self, path: &str, query: &QueryParams);
}

impl<F> EndpointHandler for F
where
    F: FnMut(&str, &QueryParams),
{
    fn handle(&mut self, path: &str, query: &QueryParams) {
        self(path, query);
    }
}

/// Outcome of [`EndpointRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The endpoint name was free.
    Inserted,
    /// An existing handler was replaced.
    Replaced,
}

/// Errors surfaced by registry mutations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// No handler was registered under the requested name.
    #[error("no endpoint registered under '{endpoint}'")]
    NotRegistered {
        /// Requested endpoint name.
        endpoint: String,
    },
}

/// Endpoint handlers keyed by exact, case-sensitive name.
#[derive(Default)]
pub struct EndpointRegistry {
    endpoints: HashMap<String, Box<dyn EndpointHandler>>,
}

impl EndpointRegistry {
    /// Builds an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates `handler` with `endpoint`, replacing any previous handler.
    pub fn register(
        &mut self,
        endpoint: impl Into<String>,
        handler: Box<dyn EndpointHandler>,
    ) -> Registration {
        match self.endpoints.insert(endpoint.into(), handler) {
            Some(_) => Registration::Replaced,
            None => Registration::Inserted,
        }
    }

    /// Removes the handler registered under `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotRegistered`] when no handler exists; the
    /// registry is left unchanged.
    pub fn unregister(&mut self, endpoint: &str) -> Result<(), RegistryError> {
        self.endpoints
            .remove(endpoint)
            .map(drop)
            .ok_or_else(|| RegistryError::NotRegistered {
                endpoint: endpoint.to_owned(),
            })
    }

    /// Returns the handler registered under `endpoint`.
    pub fn lookup_mut(&mut self, endpoint: &str) -> Option<&mut (dyn EndpointHandler + 'static)> {
        self.endpoints.get_mut(endpoint).map(Box::as_mut)
    }

    /// Reports whether `endpoint` has a handler.
    #[must_use]
    pub fn contains(&self, endpoint: &str) -> bool {
        self.endpoints.contains_key(endpoint)
    }

    /// Registered endpoint names in arbitrary order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.endpoints.keys().map(String::as_str)
    }

    /// Number of registered endpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Reports whether no endpoints are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

impl fmt::Debug for EndpointRegistry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        formatter
            .debug_struct("EndpointRegistry")
            .field("endpoints", &names)
            .finish()
    }
}
