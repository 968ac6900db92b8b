//! Endpoint handlers that record the requests they receive.

use std::cell::RefCell;
use std::rc::Rc;

use crate::path::QueryParams;

/// One request observed by a recording handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandledRequest {
    pub endpoint: String,
    pub path: String,
    pub query: QueryParams,
}

/// Shared log of handled requests, in invocation order.
pub type HandlerLog = Rc<RefCell<Vec<HandledRequest>>>;

/// Builds a handler appending to `log` under the name `endpoint`.
pub fn recording_handler(
    endpoint: &str,
    log: &HandlerLog,
) -> impl FnMut(&str, &QueryParams) + 'static {
    let endpoint = endpoint.to_owned();
    let log = Rc::clone(log);
    move |path: &str, query: &QueryParams| {
        log.borrow_mut().push(HandledRequest {
            endpoint: endpoint.clone(),
            path: path.to_owned(),
            query: query.clone(),
        });
    }
}
