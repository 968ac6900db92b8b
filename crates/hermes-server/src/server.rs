//! Tick-driven dispatch server tying the registry, arbiter and transport
//! together.
//!
//! The server is single-threaded: the host calls [`DispatchServer::on_tick`]
//! from its main loop and every handler runs on that thread. Paths arrive
//! from the transport, from the one-shot launch path, or from direct calls to
//! [`DispatchServer::handle_path`].

use std::cell::Cell;
use std::collections::VecDeque;
use std::ffi::OsStr;
use std::rc::Rc;
use std::sync::Arc;

use crate::arbiter::{ArbiterState, SchemeArbiter};
use crate::path::DispatchPath;
use crate::preference::{SchemePreference, SourceId};
use crate::registry::{EndpointHandler, EndpointRegistry, Registration};
use crate::reporter::{DispatchReporter, StructuredReporter};
use crate::scheme::Scheme;
use crate::state::{MemoryStateStore, StateStore};
use crate::transport::TransportChannel;

/// Command-line flag carrying a path to dispatch at startup.
pub const DISPATCH_PATH_FLAG: &str = "--dispatch-path";

/// Extracts the value of `--dispatch-path` from process arguments.
///
/// Accepts both `--dispatch-path <path>` and `--dispatch-path=<path>`; the
/// first occurrence wins.
#[must_use]
pub fn launch_path_from_args<I, S>(args: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        let arg = arg.as_ref().to_string_lossy();
        if arg == DISPATCH_PATH_FLAG {
            return args
                .next()
                .map(|value| value.as_ref().to_string_lossy().into_owned());
        }
        if let Some(value) = arg
            .strip_prefix(DISPATCH_PATH_FLAG)
            .and_then(|rest| rest.strip_prefix('='))
        {
            return Some(value.to_owned());
        }
    }
    None
}

/// Builder for [`DispatchServer`].
pub struct DispatchServerBuilder {
    transport: Box<dyn TransportChannel>,
    store: Box<dyn StateStore>,
    reporter: Arc<dyn DispatchReporter>,
    default_scheme: String,
    launch_path: Option<String>,
    sources: Vec<Box<dyn SchemePreference>>,
    gate_open: bool,
}

impl DispatchServerBuilder {
    /// Persists the last scheme through `store`. Defaults to an in-memory
    /// store.
    #[must_use]
    pub fn state_store(mut self, store: Box<dyn StateStore>) -> Self {
        self.store = store;
        self
    }

    /// Routes events to `reporter`. Defaults to [`StructuredReporter`].
    #[must_use]
    pub fn reporter(mut self, reporter: Arc<dyn DispatchReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Scheme bound when no preference source names one.
    #[must_use]
    pub fn default_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.default_scheme = scheme.into();
        self
    }

    /// Path dispatched once on the first full tick.
    #[must_use]
    pub fn launch_path(mut self, path: Option<String>) -> Self {
        self.launch_path = path;
        self
    }

    /// Registers a preference source before the first refresh.
    #[must_use]
    pub fn preference_source(mut self, source: Box<dyn SchemePreference>) -> Self {
        self.sources.push(source);
        self
    }

    /// Starts with the readiness gate closed so routed requests queue until
    /// [`DispatchServer::open_gate`].
    #[must_use]
    pub fn gate_closed(mut self) -> Self {
        self.gate_open = false;
        self
    }

    /// Assembles the server. No scheme is bound until
    /// [`DispatchServer::start`] or the first tick.
    #[must_use]
    pub fn build(self) -> DispatchServer {
        let mut arbiter = SchemeArbiter::new(self.store, &self.default_scheme);
        for source in self.sources {
            arbiter.add_source(source);
        }
        let sources_changed = Rc::new(Cell::new(false));
        let flag = Rc::clone(&sources_changed);
        arbiter.on_sources_changed(move |_| flag.set(true));
        DispatchServer {
            registry: EndpointRegistry::new(),
            arbiter,
            transport: self.transport,
            reporter: self.reporter,
            pending: VecDeque::new(),
            gate_open: self.gate_open,
            launch_path: self.launch_path,
            started: false,
            sources_changed,
        }
    }
}

/// Routes inbound paths to registered endpoint handlers.
pub struct DispatchServer {
    registry: EndpointRegistry,
    arbiter: SchemeArbiter,
    transport: Box<dyn TransportChannel>,
    reporter: Arc<dyn DispatchReporter>,
    pending: VecDeque<DispatchPath>,
    gate_open: bool,
    launch_path: Option<String>,
    started: bool,
    sources_changed: Rc<Cell<bool>>,
}

impl DispatchServer {
    /// Starts building a server reading from `transport`.
    #[must_use]
    pub fn builder(transport: Box<dyn TransportChannel>) -> DispatchServerBuilder {
        DispatchServerBuilder {
            transport,
            store: Box::new(MemoryStateStore::default()),
            reporter: Arc::new(StructuredReporter::new()),
            default_scheme: String::new(),
            launch_path: None,
            sources: Vec::new(),
            gate_open: true,
        }
    }

    /// Performs the startup refresh, which may bind the persisted last
    /// scheme. Calling it again has no effect.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        self.refresh();
    }

    /// Advances the server by one step.
    ///
    /// The first tick finishes initialisation: the persisted scheme stops
    /// being honoured, the scheme is re-arbitrated and the launch path is
    /// dispatched. Every tick then reads at most one message from the
    /// transport.
    pub fn on_tick(&mut self) {
        self.start();
        if !self.arbiter.is_fully_initialized() {
            self.arbiter.mark_fully_initialized();
            self.refresh();
            if let Some(path) = self.launch_path.take() {
                self.handle_path(&path);
            }
        }

        match self.transport.poll() {
            Ok(Some(message)) => {
                let raw = String::from_utf8_lossy(&message);
                self.handle_path(&raw);
            }
            Ok(None) => {}
            Err(error) => self.reporter.transport_read_failed(&error),
        }
    }

    /// Registers `handler` under `endpoint`, replacing any existing handler.
    pub fn register<H>(&mut self, endpoint: impl Into<String>, handler: H)
    where
        H: EndpointHandler + 'static,
    {
        let endpoint = endpoint.into();
        match self.registry.register(endpoint.clone(), Box::new(handler)) {
            Registration::Inserted => self.reporter.endpoint_registered(&endpoint),
            Registration::Replaced => self.reporter.duplicate_endpoint(&endpoint),
        }
    }

    /// Removes the handler registered under `endpoint`. Unknown names are
    /// reported and otherwise ignored.
    pub fn unregister(&mut self, endpoint: &str) {
        match self.registry.unregister(endpoint) {
            Ok(()) => self.reporter.endpoint_unregistered(endpoint),
            Err(_) => self.reporter.missing_endpoint(endpoint),
        }
    }

    /// Parses `raw` and routes it to its endpoint.
    ///
    /// Paths naming an unknown endpoint are dropped. Routed paths are queued
    /// while the readiness gate is closed.
    pub fn handle_path(&mut self, raw: &str) {
        let request = DispatchPath::parse(raw);
        self.reporter.path_dispatched(raw, &request);
        if !self.registry.contains(&request.endpoint) {
            self.reporter.endpoint_not_found(raw, &request.endpoint);
            return;
        }
        if !self.gate_open {
            self.reporter.request_deferred(&request);
            self.pending.push_back(request);
            return;
        }
        self.invoke(&request);
    }

    /// Builds the URI addressing `path` under `endpoint` for the bound
    /// scheme, or an empty string while nothing is bound.
    #[must_use]
    pub fn get_uri(&self, endpoint: &str, path: &str) -> String {
        match self.arbiter.bound() {
            Some(scheme) => {
                let path = path.strip_prefix('/').unwrap_or(path);
                format!("{scheme}://{endpoint}/{path}")
            }
            None => String::new(),
        }
    }

    /// Adds a preference source and re-arbitrates the scheme.
    pub fn add_preference_source(&mut self, source: Box<dyn SchemePreference>) -> SourceId {
        let id = self.arbiter.add_source(source);
        self.refresh_if_sources_changed();
        id
    }

    /// Removes a preference source and re-arbitrates the scheme. Returns
    /// whether the source was registered.
    pub fn remove_preference_source(&mut self, id: SourceId) -> bool {
        let removed = self.arbiter.remove_source(id);
        self.refresh_if_sources_changed();
        removed
    }

    /// Re-arbitrates the scheme, for example after a preference source
    /// changed its answer.
    pub fn refresh(&mut self) -> Option<&Scheme> {
        self.sources_changed.set(false);
        self.arbiter.refresh(&mut *self.transport, &*self.reporter)
    }

    // Before start() the change is picked up by the startup refresh.
    fn refresh_if_sources_changed(&mut self) {
        if self.started && self.sources_changed.get() {
            self.refresh();
        }
    }

    /// Queues routed requests until [`Self::open_gate`].
    pub fn close_gate(&mut self) {
        self.gate_open = false;
    }

    /// Opens the readiness gate and dispatches queued requests in arrival
    /// order.
    pub fn open_gate(&mut self) {
        self.gate_open = true;
        if self.pending.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut self.pending);
        self.reporter.pending_drained(pending.len());
        for request in pending {
            if self.registry.contains(&request.endpoint) {
                self.invoke(&request);
            } else {
                let raw = format!("/{}/{}", request.endpoint, request.path);
                self.reporter.endpoint_not_found(&raw, &request.endpoint);
            }
        }
    }

    /// Reports whether routed requests are dispatched immediately.
    #[must_use]
    pub fn is_gate_open(&self) -> bool {
        self.gate_open
    }

    /// Number of requests waiting for the readiness gate.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Scheme currently bound, if any.
    #[must_use]
    pub fn bound_scheme(&self) -> Option<&Scheme> {
        self.arbiter.bound()
    }

    /// Binding lifecycle state.
    #[must_use]
    pub fn arbiter_state(&self) -> ArbiterState {
        self.arbiter.state()
    }

    /// Persisted state backing the arbiter.
    #[must_use]
    pub fn state_store(&self) -> &dyn StateStore {
        self.arbiter.store()
    }

    /// Registered endpoints.
    #[must_use]
    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    /// Closes the channel. The OS registration is left in place so later
    /// activations relaunch the host with `--dispatch-path`.
    pub fn shutdown(&mut self) {
        self.transport.shutdown();
        if let Some(scheme) = self.arbiter.release() {
            self.reporter.scheme_unbound(&scheme);
        }
    }

    fn invoke(&mut self, request: &DispatchPath) {
        if let Some(handler) = self.registry.lookup_mut(&request.endpoint) {
            handler.handle(&request.path, &request.query);
        }
    }
}
