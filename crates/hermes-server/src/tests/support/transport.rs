//! In-memory [`TransportChannel`] recording binds and serving queued messages.

use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::io;
use std::rc::Rc;

use crate::scheme::Scheme;
use crate::transport::{TransportChannel, TransportError};

#[derive(Debug, Default)]
struct TransportLog {
    binds: Vec<String>,
    unbinds: Vec<String>,
    shutdowns: usize,
    current: Option<String>,
    inbox: VecDeque<Vec<u8>>,
    failing: HashSet<String>,
    fail_next_read: bool,
}

/// Cloneable handle; clones share one log so tests can inspect a transport
/// after handing it to the server.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    log: Rc<RefCell<TransportLog>>,
}

impl RecordingTransport {
    /// Queues `path` as one inbound message.
    pub fn deliver(&self, path: &str) {
        self.deliver_bytes(path.as_bytes());
    }

    /// Queues raw bytes as one inbound message.
    pub fn deliver_bytes(&self, bytes: &[u8]) {
        self.log.borrow_mut().inbox.push_back(bytes.to_vec());
    }

    /// Makes every bind of `scheme` fail.
    pub fn fail_binds_for(&self, scheme: &str) {
        self.log.borrow_mut().failing.insert(scheme.to_owned());
    }

    /// Makes the next poll fail.
    pub fn fail_next_read(&self) {
        self.log.borrow_mut().fail_next_read = true;
    }

    pub fn binds(&self) -> Vec<String> {
        self.log.borrow().binds.clone()
    }

    pub fn unbinds(&self) -> Vec<String> {
        self.log.borrow().unbinds.clone()
    }

    pub fn shutdowns(&self) -> usize {
        self.log.borrow().shutdowns
    }

    /// Scheme the channel is currently bound to.
    pub fn current(&self) -> Option<String> {
        self.log.borrow().current.clone()
    }

    pub fn queued(&self) -> usize {
        self.log.borrow().inbox.len()
    }
}

impl TransportChannel for RecordingTransport {
    fn bind(&mut self, scheme: &Scheme) -> Result<(), TransportError> {
        let mut log = self.log.borrow_mut();
        if log.failing.contains(scheme.as_str()) {
            return Err(TransportError::Unsupported {
                scheme: scheme.to_string(),
            });
        }
        log.binds.push(scheme.to_string());
        log.current = Some(scheme.to_string());
        Ok(())
    }

    fn unbind(&mut self, scheme: &Scheme) {
        let mut log = self.log.borrow_mut();
        log.unbinds.push(scheme.to_string());
        if log.current.as_deref() == Some(scheme.as_str()) {
            log.current = None;
        }
    }

    fn poll(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut log = self.log.borrow_mut();
        if log.current.is_none() {
            return Ok(None);
        }
        if std::mem::take(&mut log.fail_next_read) {
            return Err(TransportError::Read {
                source: io::Error::other("simulated read failure"),
            });
        }
        Ok(log.inbox.pop_front())
    }

    fn shutdown(&mut self) {
        let mut log = self.log.borrow_mut();
        log.shutdowns += 1;
        log.current = None;
    }
}
