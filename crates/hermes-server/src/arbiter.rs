//! Chooses which scheme the server listens on.
//!
//! Precedence, highest first:
//!
//! 1. the first preference source naming a usable scheme,
//! 2. the persisted last scheme, only before the first full tick,
//! 3. the configured default scheme.
//!
//! Whichever scheme wins is persisted once it binds, so the next launch can
//! bind it before its preference sources exist. When the winner moves away
//! from the persisted scheme, the persisted scheme's OS association is
//! removed even if this run never bound it. If the winner then fails to
//! bind, the persisted value is cleared rather than left naming a scheme
//! that is no longer registered.

use tracing::debug;

use crate::preference::{PreferenceSources, SchemePreference, SourceChange, SourceId};
use crate::reporter::DispatchReporter;
use crate::scheme::Scheme;
use crate::state::StateStore;
use crate::transport::TransportChannel;

const ARBITER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::arbiter");

/// Where the winning scheme came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeOrigin {
    /// A registered preference source.
    Preference,
    /// The value persisted by a previous run.
    LastScheme,
    /// The configured default.
    Default,
}

/// Binding lifecycle of the arbiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArbiterState {
    /// No scheme is bound.
    Uninitialized,
    /// Bound before the first full tick; the persisted scheme may be in use.
    EarlyBound(Scheme),
    /// Bound after the first full tick.
    FullyBound(Scheme),
}

/// Owns preference sources and the persisted state, and keeps the transport
/// bound to the winning scheme.
pub struct SchemeArbiter {
    sources: PreferenceSources,
    store: Box<dyn StateStore>,
    default_scheme: Scheme,
    bound: Option<Scheme>,
    fully_initialized: bool,
}

impl SchemeArbiter {
    /// Builds an arbiter. An unusable `default_scheme` falls back to
    /// [`Scheme::fallback`].
    #[must_use]
    pub fn new(store: Box<dyn StateStore>, default_scheme: &str) -> Self {
        let default_scheme = Scheme::sanitize(default_scheme).unwrap_or_else(Scheme::fallback);
        Self {
            sources: PreferenceSources::new(),
            store,
            default_scheme,
            bound: None,
            fully_initialized: false,
        }
    }

    /// Installs the callback notified after preference sources change.
    pub fn on_sources_changed(&mut self, callback: impl FnMut(SourceChange) + 'static) {
        self.sources.set_change_callback(callback);
    }

    /// Registers a preference source. Call [`Self::refresh`] afterwards.
    pub fn add_source(&mut self, source: Box<dyn SchemePreference>) -> SourceId {
        self.sources.add(source)
    }

    /// Removes a preference source. Returns whether it was registered.
    pub fn remove_source(&mut self, id: SourceId) -> bool {
        self.sources.remove(id)
    }

    /// Scheme currently bound, if any.
    #[must_use]
    pub fn bound(&self) -> Option<&Scheme> {
        self.bound.as_ref()
    }

    /// The sanitized default scheme.
    #[must_use]
    pub fn default_scheme(&self) -> &Scheme {
        &self.default_scheme
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ArbiterState {
        match (&self.bound, self.fully_initialized) {
            (None, _) => ArbiterState::Uninitialized,
            (Some(scheme), false) => ArbiterState::EarlyBound(scheme.clone()),
            (Some(scheme), true) => ArbiterState::FullyBound(scheme.clone()),
        }
    }

    /// Reports whether the first full tick has happened.
    #[must_use]
    pub fn is_fully_initialized(&self) -> bool {
        self.fully_initialized
    }

    /// Stops honouring the persisted last scheme from now on.
    pub fn mark_fully_initialized(&mut self) {
        self.fully_initialized = true;
    }

    /// Persisted state backing the arbiter.
    #[must_use]
    pub fn store(&self) -> &dyn StateStore {
        &*self.store
    }

    /// Recomputes the winning scheme and rebinds `transport` when it changed.
    ///
    /// Returns the scheme bound afterwards. A failed bind leaves nothing
    /// bound; the next refresh retries.
    pub fn refresh(
        &mut self,
        transport: &mut dyn TransportChannel,
        reporter: &dyn DispatchReporter,
    ) -> Option<&Scheme> {
        let persisted = match self.store.last_scheme() {
            Ok(persisted) => persisted,
            Err(error) => {
                reporter.state_store_failed(&error);
                None
            }
        };
        let (winner, origin) = self.select(persisted.as_deref());
        debug!(
            target: ARBITER_TARGET,
            scheme = %winner,
            origin = ?origin,
            "selected scheme"
        );

        let superseded = persisted
            .as_deref()
            .and_then(Scheme::sanitize)
            .filter(|previous| *previous != winner);
        if let Some(previous) = superseded.as_ref()
            && self.bound.as_ref() != Some(previous)
        {
            debug!(
                target: ARBITER_TARGET,
                scheme = %previous,
                "unregistering scheme persisted by a previous run"
            );
            transport.unbind(previous);
        }

        self.rebind(&winner, origin, transport, reporter);

        let stored = if self.bound.as_ref() == Some(&winner) {
            if persisted.as_deref() == Some(winner.as_str()) {
                Ok(())
            } else {
                self.store.set_last_scheme(winner.as_str())
            }
        } else if superseded.is_some() {
            self.store.clear_last_scheme()
        } else {
            Ok(())
        };
        if let Err(error) = stored {
            reporter.state_store_failed(&error);
        }
        self.bound.as_ref()
    }

    /// Unbinds the current scheme, removing its OS registration.
    pub fn unbind(&mut self, transport: &mut dyn TransportChannel, reporter: &dyn DispatchReporter) {
        if let Some(previous) = self.bound.take() {
            transport.unbind(&previous);
            reporter.scheme_unbound(&previous);
        }
    }

    /// Forgets the bound scheme after the transport was shut down.
    pub fn release(&mut self) -> Option<Scheme> {
        self.bound.take()
    }

    fn select(&self, persisted: Option<&str>) -> (Scheme, SchemeOrigin) {
        if let Some(preferred) = self.sources.first_preference() {
            return (preferred, SchemeOrigin::Preference);
        }
        if !self.fully_initialized
            && let Some(last) = persisted.and_then(Scheme::sanitize)
        {
            return (last, SchemeOrigin::LastScheme);
        }
        (self.default_scheme.clone(), SchemeOrigin::Default)
    }

    fn rebind(
        &mut self,
        winner: &Scheme,
        origin: SchemeOrigin,
        transport: &mut dyn TransportChannel,
        reporter: &dyn DispatchReporter,
    ) {
        if self.bound.as_ref() == Some(winner) {
            return;
        }
        self.unbind(transport, reporter);
        match transport.bind(winner) {
            Ok(()) => {
                reporter.scheme_bound(winner, origin);
                self.bound = Some(winner.clone());
            }
            Err(error) => reporter.scheme_bind_failed(winner, &error),
        }
    }
}
