//! In-memory world state
//!
//! [`LedgerStore`] holds the committed state of one ledger. [`TxContext`] is the
//! per-invocation view over it: writes and events are staged and only reach the
//! store through [`LedgerStore::apply`] once the whole invocation succeeded.

use super::{
    composite::CompositeKey, KeyValue, RangeScan, Response, StateAccessor, StateError,
    StateIterator,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::rc::Rc;

/// An event published by a committed invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub tx_id: String,
    pub name: String,
    /// JSON payload
    pub payload: String,
    pub timestamp: DateTime<Utc>,
}

/// Committed state of a single ledger
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerStore {
    #[serde(with = "hex_values")]
    state: BTreeMap<String, Vec<u8>>,
    events: Vec<EventRecord>,
}

impl LedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.state.get(key).map(Vec::as_slice)
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Event log, oldest first
    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    /// Apply the changes of a successful invocation
    pub fn apply(&mut self, changes: TxChanges) {
        self.state.extend(changes.writes);
        self.events.extend(changes.events);
    }

    fn range<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a String, &'a Vec<u8>)> {
        prefix_range(&self.state, prefix)
    }
}

fn prefix_range<'a>(
    map: &'a BTreeMap<String, Vec<u8>>,
    prefix: &'a str,
) -> impl Iterator<Item = (&'a String, &'a Vec<u8>)> {
    map.range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
        .take_while(move |(k, _)| k.starts_with(prefix))
}

/// Staged output of one invocation
#[derive(Debug, Clone, Default)]
pub struct TxChanges {
    pub writes: BTreeMap<String, Vec<u8>>,
    pub events: Vec<EventRecord>,
}

impl TxChanges {
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty() && self.events.is_empty()
    }
}

/// Something able to run an invocation on another ledger
pub trait LedgerInvoker {
    fn invoke_ledger(&self, ledger: &str, args: &[String], scope: &str) -> Response;
}

/// Per-invocation state accessor over a [`LedgerStore`]
pub struct TxContext<'a> {
    tx_id: String,
    scope: String,
    store: &'a LedgerStore,
    writes: BTreeMap<String, Vec<u8>>,
    events: Vec<EventRecord>,
    invoker: Option<&'a dyn LedgerInvoker>,
    open_scans: Rc<Cell<usize>>,
}

impl<'a> TxContext<'a> {
    pub fn new(store: &'a LedgerStore, tx_id: impl Into<String>) -> Self {
        Self {
            tx_id: tx_id.into(),
            scope: "default".to_string(),
            store,
            writes: BTreeMap::new(),
            events: Vec::new(),
            invoker: None,
            open_scans: Rc::new(Cell::new(0)),
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_invoker(mut self, invoker: &'a dyn LedgerInvoker) -> Self {
        self.invoker = Some(invoker);
        self
    }

    pub fn tx_id(&self) -> &str {
        &self.tx_id
    }

    /// Events staged so far
    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    /// Number of range scans not yet released
    pub fn open_scans(&self) -> usize {
        self.open_scans.get()
    }

    /// Consume the context, yielding its staged writes and events
    pub fn into_changes(self) -> TxChanges {
        TxChanges {
            writes: self.writes,
            events: self.events,
        }
    }
}

impl StateAccessor for TxContext<'_> {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StateError> {
        if let Some(value) = self.writes.get(key) {
            return Ok(Some(value.clone()));
        }
        Ok(self.store.get(key).map(<[u8]>::to_vec))
    }

    fn put_state(&mut self, key: &str, value: &[u8]) -> Result<(), StateError> {
        if key.is_empty() {
            return Err(StateError::InvalidKey("key cannot be empty".to_string()));
        }
        self.writes.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn range_by_prefix(
        &self,
        namespace: &str,
        prefix: &[&str],
    ) -> Result<RangeScan<'_>, StateError> {
        let prefix = CompositeKey::new(namespace, prefix)?.into_string();

        // Staged writes shadow committed values
        let mut merged: BTreeMap<String, Vec<u8>> = self
            .store
            .range(&prefix)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        merged.extend(
            prefix_range(&self.writes, &prefix).map(|(k, v)| (k.clone(), v.clone())),
        );

        Ok(RangeScan::new(Box::new(MemoryScan::open(
            merged.into_iter().collect(),
            Rc::clone(&self.open_scans),
        ))))
    }

    fn emit_event(&mut self, name: &str, payload: &[u8]) -> Result<(), StateError> {
        if name.is_empty() {
            return Err(StateError::InvalidKey("event name cannot be empty".to_string()));
        }
        let payload = String::from_utf8(payload.to_vec())
            .map_err(|e| StateError::Serialization(e.to_string()))?;

        self.events.push(EventRecord {
            tx_id: self.tx_id.clone(),
            name: name.to_string(),
            payload,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    fn invoke_other(&mut self, ledger: &str, args: &[String], scope: &str) -> Response {
        match self.invoker {
            Some(invoker) => invoker.invoke_ledger(ledger, args, scope),
            None => Response::error(
                Response::NOT_FOUND,
                format!("ledger not reachable from this context: {}", ledger),
            ),
        }
    }

    fn scope(&self) -> &str {
        &self.scope
    }
}

/// Snapshot scan over merged committed and staged keys
struct MemoryScan {
    items: std::vec::IntoIter<KeyValue>,
    open_scans: Rc<Cell<usize>>,
    released: bool,
}

impl MemoryScan {
    fn open(items: Vec<KeyValue>, open_scans: Rc<Cell<usize>>) -> Self {
        open_scans.set(open_scans.get() + 1);
        Self {
            items: items.into_iter(),
            open_scans,
            released: false,
        }
    }
}

impl Iterator for MemoryScan {
    type Item = Result<KeyValue, StateError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.items.next().map(Ok)
    }
}

impl StateIterator for MemoryScan {
    fn close(&mut self) -> Result<(), StateError> {
        if !self.released {
            self.released = true;
            self.open_scans.set(self.open_scans.get().saturating_sub(1));
        }
        Ok(())
    }
}

/// Values are stored hex-encoded so the persisted JSON stays readable
mod hex_values {
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<String, Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut out = serializer.serialize_map(Some(map.len()))?;
        for (key, value) in map {
            out.serialize_entry(key, &hex::encode(value))?;
        }
        out.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, Vec<u8>>, D::Error> {
        let encoded = BTreeMap::<String, String>::deserialize(deserializer)?;
        encoded
            .into_iter()
            .map(|(key, value)| {
                hex::decode(&value)
                    .map(|bytes| (key, bytes))
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }
}
