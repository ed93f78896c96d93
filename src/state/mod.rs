//! World state access
//!
//! The token logic never owns storage. Every read, write, prefix scan, event and
//! cross-ledger call goes through a [`StateAccessor`] handed in per invocation.
//!
//! - [`composite`]: composite key encoding and the typed allowance key
//! - [`memory`]: in-memory ledger store and the staging transaction context

pub mod composite;
pub mod memory;

pub use composite::{split_composite_key, AllowanceKey, CompositeKey, APPROVAL_NAMESPACE};
pub use memory::{EventRecord, LedgerInvoker, LedgerStore, TxChanges, TxContext};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// State accessor errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("Invalid key: {0}")]
    InvalidKey(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Ledger busy: {0} is already executing")]
    Busy(String),
}

/// A raw key/value pair produced by a range scan
pub type KeyValue = (String, Vec<u8>);

/// Result of an invocation, as seen by the dispatch layer and by remote callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    pub message: String,
    pub payload: Vec<u8>,
}

impl Response {
    pub const OK: u16 = 200;
    pub const BAD_REQUEST: u16 = 400;
    pub const NOT_FOUND: u16 = 404;
    pub const CONFLICT: u16 = 409;
    pub const INTERNAL_ERROR: u16 = 500;

    /// Successful response carrying a payload
    pub fn success(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            status: Self::OK,
            message: String::new(),
            payload: payload.into(),
        }
    }

    /// Failed response with a human-readable message
    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            payload: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status < 400
    }

    /// Payload as text (lossy)
    pub fn payload_str(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// A live prefix scan as produced by a state backend
pub trait StateIterator: Iterator<Item = Result<KeyValue, StateError>> {
    /// Release the scan
    fn close(&mut self) -> Result<(), StateError>;
}

/// Handle over an open prefix scan.
///
/// Closing is explicit via [`RangeScan::close`]; a scan dropped without being
/// closed (early return, `?`) is released on drop.
pub struct RangeScan<'a> {
    inner: Box<dyn StateIterator + 'a>,
    closed: bool,
}

impl<'a> RangeScan<'a> {
    pub fn new(inner: Box<dyn StateIterator + 'a>) -> Self {
        Self {
            inner,
            closed: false,
        }
    }

    /// Close the scan and report any release failure
    pub fn close(mut self) -> Result<(), StateError> {
        self.closed = true;
        self.inner.close()
    }
}

impl Iterator for RangeScan<'_> {
    type Item = Result<KeyValue, StateError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.closed {
            return None;
        }
        self.inner.next()
    }
}

impl Drop for RangeScan<'_> {
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            if let Err(e) = self.inner.close() {
                log::warn!("Failed to release range scan: {}", e);
            }
        }
    }
}

/// Capability the token logic is written against.
///
/// One accessor instance corresponds to one invocation. Reads are only valid
/// for the duration of that invocation.
pub trait StateAccessor {
    /// Read a key; `None` when absent
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StateError>;

    /// Write a key
    fn put_state(&mut self, key: &str, value: &[u8]) -> Result<(), StateError>;

    /// Scan all composite keys under `namespace` whose leading parts equal `prefix`
    fn range_by_prefix(&self, namespace: &str, prefix: &[&str])
        -> Result<RangeScan<'_>, StateError>;

    /// Publish a named event
    fn emit_event(&mut self, name: &str, payload: &[u8]) -> Result<(), StateError>;

    /// Call another ledger by name. `args[0]` is the function name.
    fn invoke_other(&mut self, ledger: &str, args: &[String], scope: &str) -> Response;

    /// Scope (channel) this invocation runs in
    fn scope(&self) -> &str;
}
