//! Owner/spender allowances
//!
//! Each allowance is stored under `approval/{owner}/{spender}` so a single owner
//! prefix scan enumerates every spender that owner approved.

use crate::state::{AllowanceKey, StateAccessor, APPROVAL_NAMESPACE};
use crate::token::error::{LedgerError, LedgerResult};
use crate::token::params::{decode_amount, encode_amount};
use serde::{Deserialize, Serialize};

/// One entry of an owner's approval list
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Approval {
    pub spender: String,
    pub owner: String,
    pub allowance: u64,
}

fn key_for(owner: &str, spender: &str) -> LedgerResult<String> {
    AllowanceKey::new(owner, spender)
        .to_key()
        .map(|key| key.into_string())
        .map_err(|e| LedgerError::InvalidArgument(e.to_string()))
}

/// Current allowance of `spender` over `owner`'s tokens, zero when never approved
pub fn get(state: &dyn StateAccessor, owner: &str, spender: &str) -> LedgerResult<u64> {
    let key = key_for(owner, spender)?;
    let bytes = state
        .get_state(&key)
        .map_err(LedgerError::store(format!("read allowance {}/{}", owner, spender)))?;

    match bytes {
        Some(bytes) => decode_amount(&format!("allowance {}/{}", owner, spender), &bytes),
        None => Ok(0),
    }
}

/// Overwrite the allowance
pub fn set(
    state: &mut dyn StateAccessor,
    owner: &str,
    spender: &str,
    amount: u64,
) -> LedgerResult<()> {
    let key = key_for(owner, spender)?;
    state
        .put_state(&key, &encode_amount(amount))
        .map_err(LedgerError::store(format!("write allowance {}/{}", owner, spender)))
}

/// All allowances granted by `owner`, in store key order
pub fn list_by_owner(state: &dyn StateAccessor, owner: &str) -> LedgerResult<Vec<Approval>> {
    let mut scan = state
        .range_by_prefix(APPROVAL_NAMESPACE, &[owner])
        .map_err(LedgerError::store(format!("scan approvals of {}", owner)))?;

    let mut approvals = Vec::new();
    for entry in scan.by_ref() {
        let (key, value) =
            entry.map_err(LedgerError::store(format!("scan approvals of {}", owner)))?;

        let decoded = AllowanceKey::decode(&key)
            .map_err(|e| LedgerError::deserialization("approval key", e))?;
        let allowance = decode_amount(&format!("allowance {}", decoded.spender), &value)?;

        approvals.push(Approval {
            spender: decoded.spender,
            owner: decoded.owner,
            allowance,
        });
    }

    scan.close()
        .map_err(LedgerError::store(format!("release approval scan of {}", owner)))?;
    Ok(approvals)
}
