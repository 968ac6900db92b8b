//! URI scheme dispatch core for the Hermes host.
//!
//! Activating a link such as `mygame://content/Game/Spells/Fireball?edit`
//! delivers `/content/Game/Spells/Fireball?edit` to the running host over a
//! local channel. The [`DispatchServer`] splits the path, looks up the
//! `content` endpoint and hands it the decoded sub-path and query.
//!
//! Which scheme the host answers to is decided by the [`SchemeArbiter`]:
//! registered preference sources win, then the scheme persisted by the
//! previous run (until the first full tick), then the configured default.
//! Binding a scheme opens the channel and asks the `hermes-urls` helper to
//! associate the scheme with this executable, so links also work while the
//! host is not running.
//!
//! Everything runs on the caller's thread; the host drives the server by
//! calling [`DispatchServer::on_tick`] from its main loop.

mod arbiter;
mod host;
mod path;
mod preference;
mod registry;
mod reporter;
mod scheme;
mod server;
mod state;
pub mod telemetry;
pub mod transport;

pub use arbiter::{ArbiterState, SchemeArbiter, SchemeOrigin};
pub use host::{ECHO_ENDPOINT, HostError, build_server, run_host, run_until};
pub use path::{DispatchPath, QueryParams};
pub use preference::{
    BranchPreference, FixedPreference, PreferenceSources, SchemePreference, SourceChange,
    SourceId, TokenReplacement,
};
pub use registry::{EndpointHandler, EndpointRegistry, Registration, RegistryError};
pub use reporter::{DispatchReporter, StructuredReporter};
pub use scheme::{Scheme, sanitize_scheme};
pub use server::{
    DISPATCH_PATH_FLAG, DispatchServer, DispatchServerBuilder, launch_path_from_args,
};
pub use state::{FileStateStore, MemoryStateStore, StateStore, StateStoreError};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::{TransportChannel, TransportError};

#[cfg(test)]
mod tests;
