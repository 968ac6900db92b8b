//! Test doubles shared by the unit and behavioural suites.

mod handlers;
mod reporter;
mod transport;

pub use handlers::{HandledRequest, HandlerLog, recording_handler};
pub use reporter::{DispatchEvent, RecordingReporter};
pub use transport::RecordingTransport;
