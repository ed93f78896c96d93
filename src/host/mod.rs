//! Ledger host
//!
//! Holds every deployed token ledger and runs invocations against them. Each
//! invocation gets its own [`TxContext`]; its staged writes and events are
//! committed in one step when the token logic succeeds and dropped otherwise.
//! Cross-ledger calls made through `invokeOther` come back here.

use crate::state::{
    EventRecord, LedgerInvoker, LedgerStore, Response, StateError, TxChanges, TxContext,
};
use crate::token::dispatch::dispatch;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Default invocation scope (channel)
pub const DEFAULT_SCOPE: &str = "default";

/// Host errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("Ledger not found: {0}")]
    LedgerNotFound(String),
    #[error("Ledger already deployed: {0}")]
    AlreadyDeployed(String),
    #[error("Invalid ledger name: {0}")]
    InvalidName(String),
}

/// Host configuration
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Scope forwarded on, and required of, cross-ledger calls
    pub scope: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            scope: DEFAULT_SCOPE.to_string(),
        }
    }
}

/// Serializable snapshot of all ledgers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldState {
    pub ledgers: BTreeMap<String, LedgerStore>,
    /// Transaction counter feeding tx id generation
    pub nonce: u64,
}

/// Runs invocations against named ledgers
pub struct LedgerHost {
    config: HostConfig,
    ledgers: BTreeMap<String, RefCell<LedgerStore>>,
    /// Ledgers with an invocation in flight
    executing: RefCell<BTreeSet<String>>,
    nonce: Cell<u64>,
}

impl LedgerHost {
    /// Create an empty host
    pub fn new(config: HostConfig) -> Self {
        Self::from_world(config, WorldState::default())
    }

    /// Restore a host from a persisted snapshot
    pub fn from_world(config: HostConfig, world: WorldState) -> Self {
        Self {
            config,
            ledgers: world
                .ledgers
                .into_iter()
                .map(|(name, store)| (name, RefCell::new(store)))
                .collect(),
            executing: RefCell::new(BTreeSet::new()),
            nonce: Cell::new(world.nonce),
        }
    }

    /// Snapshot all ledgers for persistence
    pub fn to_world(&self) -> WorldState {
        WorldState {
            ledgers: self
                .ledgers
                .iter()
                .map(|(name, cell)| (name.clone(), cell.borrow().clone()))
                .collect(),
            nonce: self.nonce.get(),
        }
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Deploy a new, empty ledger
    pub fn deploy(&mut self, name: &str) -> Result<(), HostError> {
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(HostError::InvalidName(name.to_string()));
        }
        if self.ledgers.contains_key(name) {
            return Err(HostError::AlreadyDeployed(name.to_string()));
        }

        self.ledgers
            .insert(name.to_string(), RefCell::new(LedgerStore::new()));
        log::info!("Ledger deployed: {}", name);
        Ok(())
    }

    /// Names of all deployed ledgers
    pub fn ledgers(&self) -> Vec<&str> {
        self.ledgers.keys().map(String::as_str).collect()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.ledgers.contains_key(name)
    }

    /// Committed events of a ledger, oldest first
    pub fn events(&self, ledger: &str) -> Result<Vec<EventRecord>, HostError> {
        let cell = self
            .ledgers
            .get(ledger)
            .ok_or_else(|| HostError::LedgerNotFound(ledger.to_string()))?;
        let events = cell.borrow().events().to_vec();
        Ok(events)
    }

    /// Run a function and commit its effects if it succeeds
    pub fn invoke(&self, ledger: &str, function: &str, params: &[String]) -> Response {
        self.run(ledger, function, params, true)
    }

    /// Run a function without committing anything
    pub fn query(&self, ledger: &str, function: &str, params: &[String]) -> Response {
        self.run(ledger, function, params, false)
    }

    fn run(&self, ledger: &str, function: &str, params: &[String], commit: bool) -> Response {
        let cell = match self.ledgers.get(ledger) {
            Some(cell) => cell,
            None => {
                return Response::error(
                    Response::NOT_FOUND,
                    HostError::LedgerNotFound(ledger.to_string()).to_string(),
                )
            }
        };

        if !self.executing.borrow_mut().insert(ledger.to_string()) {
            log::warn!("Re-entrant invocation of {} refused", ledger);
            return Response::error(
                Response::INTERNAL_ERROR,
                StateError::Busy(ledger.to_string()).to_string(),
            );
        }

        let tx_id = self.next_tx_id(ledger, function, params);
        let nested = NestedCalls { host: self, commit };
        let (response, changes) = {
            let store = cell.borrow();
            let mut ctx = TxContext::new(&store, tx_id.as_str())
                .with_scope(self.config.scope.as_str())
                .with_invoker(&nested);
            let response = dispatch(&mut ctx, function, params);
            (response, ctx.into_changes())
        };

        self.executing.borrow_mut().remove(ledger);

        if commit && response.is_success() {
            self.commit(ledger, cell, &tx_id, changes);
        } else {
            log::debug!("{} on {}: nothing committed (tx {})", function, ledger, short(&tx_id));
        }
        response
    }

    fn commit(&self, ledger: &str, cell: &RefCell<LedgerStore>, tx_id: &str, changes: TxChanges) {
        if changes.is_empty() {
            return;
        }
        let writes = changes.writes.len();
        let events = changes.events.len();
        cell.borrow_mut().apply(changes);
        log::debug!(
            "Committed tx {} on {}: {} writes, {} events",
            short(tx_id),
            ledger,
            writes,
            events
        );
    }

    fn next_tx_id(&self, ledger: &str, function: &str, params: &[String]) -> String {
        let nonce = self.nonce.get();
        self.nonce.set(nonce + 1);

        let input = format!("{}:{}:{}:{}", ledger, function, params.join(","), nonce);
        hex::encode(Sha256::digest(input.as_bytes()))
    }
}

impl Default for LedgerHost {
    fn default() -> Self {
        Self::new(HostConfig::default())
    }
}

impl LedgerHost {
    fn invoke_nested(&self, ledger: &str, args: &[String], scope: &str, commit: bool) -> Response {
        if scope != self.config.scope {
            return Response::error(
                Response::NOT_FOUND,
                format!("unknown scope {} (host serves {})", scope, self.config.scope),
            );
        }

        match args.split_first() {
            Some((function, params)) => self.run(ledger, function, params, commit),
            None => Response::error(Response::BAD_REQUEST, "missing function name"),
        }
    }
}

/// External callers always commit on success
impl LedgerInvoker for LedgerHost {
    fn invoke_ledger(&self, ledger: &str, args: &[String], scope: &str) -> Response {
        self.invoke_nested(ledger, args, scope, true)
    }
}

/// Invoker handed to one invocation; callees inherit its commit mode
struct NestedCalls<'h> {
    host: &'h LedgerHost,
    commit: bool,
}

impl LedgerInvoker for NestedCalls<'_> {
    fn invoke_ledger(&self, ledger: &str, args: &[String], scope: &str) -> Response {
        self.host.invoke_nested(ledger, args, scope, self.commit)
    }
}

fn short(tx_id: &str) -> &str {
    &tx_id[..tx_id.len().min(16)]
}
