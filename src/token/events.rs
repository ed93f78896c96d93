//! Transfer and approval notifications
//!
//! Events are side-channel records: published through the accessor, never read
//! back by the ledger itself.

use crate::state::{StateAccessor, StateError};
use crate::token::error::{LedgerError, LedgerResult};
use serde::{Deserialize, Serialize};

pub const TRANSFER_EVENT: &str = "transferEvent";
pub const APPROVAL_EVENT: &str = "approvalEvent";

/// Sender recorded for newly minted tokens, and recipient for burned ones
pub const ADMIN_ADDRESS: &str = "admin";

/// Emitted when tokens move
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransferEvent {
    pub sender: String,
    pub recipient: String,
    pub amount: u64,
}

impl TransferEvent {
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>, amount: u64) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
        }
    }
}

/// Emitted when an allowance is set
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApprovalEvent {
    pub owner: String,
    pub spender: String,
    pub allowance: u64,
}

impl ApprovalEvent {
    pub fn new(owner: impl Into<String>, spender: impl Into<String>, allowance: u64) -> Self {
        Self {
            owner: owner.into(),
            spender: spender.into(),
            allowance,
        }
    }
}

fn emit<T: Serialize>(state: &mut dyn StateAccessor, name: &str, event: &T) -> LedgerResult<()> {
    let payload = serde_json::to_vec(event).map_err(|e| LedgerError::Store {
        context: format!("encode {}", name),
        source: StateError::Serialization(e.to_string()),
    })?;

    state
        .emit_event(name, &payload)
        .map_err(LedgerError::store(format!("emit {}", name)))
}

pub fn emit_transfer(state: &mut dyn StateAccessor, event: &TransferEvent) -> LedgerResult<()> {
    emit(state, TRANSFER_EVENT, event)
}

pub fn emit_approval(state: &mut dyn StateAccessor, event: &ApprovalEvent) -> LedgerResult<()> {
    emit(state, APPROVAL_EVENT, event)
}
