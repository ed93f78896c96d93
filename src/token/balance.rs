//! Per-address balances
//!
//! Balances live under the plain address key as decimal text.

use crate::state::StateAccessor;
use crate::token::error::{LedgerError, LedgerResult};
use crate::token::params::{checked_add, decode_amount, encode_amount};

/// Read the balance of `address`.
///
/// A missing entry is zero when `treat_missing_as_zero` is set, `NotFound` otherwise.
/// A token name is not an address: its key holds the JSON metadata record.
pub fn get_balance(
    state: &dyn StateAccessor,
    address: &str,
    treat_missing_as_zero: bool,
) -> LedgerResult<u64> {
    let bytes = state
        .get_state(address)
        .map_err(LedgerError::store(format!("read balance of {}", address)))?;

    match bytes {
        Some(bytes) if bytes.first() == Some(&b'{') => Err(LedgerError::InvalidArgument(format!(
            "{} is a token name, not an address",
            address
        ))),
        Some(bytes) => decode_amount(&format!("balance of {}", address), &bytes),
        None if treat_missing_as_zero => Ok(0),
        None => Err(LedgerError::NotFound(format!("balance of {}", address))),
    }
}

/// Write the balance of `address`. Callers check sufficiency beforehand.
pub fn set_balance(state: &mut dyn StateAccessor, address: &str, amount: u64) -> LedgerResult<()> {
    state
        .put_state(address, &encode_amount(amount))
        .map_err(LedgerError::store(format!("write balance of {}", address)))
}

/// Add to a balance, creating it on first credit. Returns the new balance.
pub fn credit(state: &mut dyn StateAccessor, address: &str, amount: u64) -> LedgerResult<u64> {
    let current = get_balance(state, address, true)?;
    let updated = checked_add(&format!("balance of {}", address), current, amount)?;
    set_balance(state, address, updated)?;
    Ok(updated)
}

/// Subtract from a balance. Returns the new balance.
pub fn debit(
    state: &mut dyn StateAccessor,
    address: &str,
    amount: u64,
    treat_missing_as_zero: bool,
) -> LedgerResult<u64> {
    let current = get_balance(state, address, treat_missing_as_zero)?;
    if current < amount {
        return Err(LedgerError::InsufficientFunds {
            what: "balance",
            have: current,
            need: amount,
        });
    }
    let updated = current - amount;
    set_balance(state, address, updated)?;
    Ok(updated)
}
