//! Parameter validation
//!
//! Amounts travel as base-10 ASCII everywhere: in call parameters and in stored
//! balance/allowance values. All conversions go through this module.

use crate::state::composite::is_composite_key;
use crate::token::error::{LedgerError, LedgerResult};

/// Check the exact number of parameters an operation takes
pub fn expect_arity(operation: &str, params: &[String], expected: usize) -> LedgerResult<()> {
    if params.len() != expected {
        return Err(LedgerError::InvalidArgument(format!(
            "{} takes {} parameters, got {}",
            operation,
            expected,
            params.len()
        )));
    }
    Ok(())
}

/// Parse a non-negative integer amount
pub fn parse_non_negative(field: &str, value: &str) -> LedgerResult<u64> {
    if let Ok(amount) = value.parse::<u64>() {
        return Ok(amount);
    }

    let negative = value
        .strip_prefix('-')
        .map(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false);

    if negative {
        Err(LedgerError::InvalidArgument(format!(
            "{} cannot be negative",
            field
        )))
    } else {
        Err(LedgerError::InvalidArgument(format!(
            "{} must be an integer, got {:?}",
            field, value
        )))
    }
}

/// Parse an amount that must be strictly greater than zero
pub fn parse_positive(field: &str, value: &str) -> LedgerResult<u64> {
    let amount = parse_non_negative(field, value)?;
    ensure_positive(field, amount)?;
    Ok(amount)
}

pub fn ensure_positive(field: &str, amount: u64) -> LedgerResult<()> {
    if amount == 0 {
        return Err(LedgerError::InvalidArgument(format!(
            "{} must be positive",
            field
        )));
    }
    Ok(())
}

/// Decode an amount read back from the store
pub fn decode_amount(what: &str, bytes: &[u8]) -> LedgerResult<u64> {
    std::str::from_utf8(bytes)
        .map_err(|e| LedgerError::deserialization(what, e))?
        .parse::<u64>()
        .map_err(|e| LedgerError::deserialization(what, e))
}

/// Canonical stored form of an amount
pub fn encode_amount(amount: u64) -> Vec<u8> {
    amount.to_string().into_bytes()
}

/// Addresses and token names are plain keys; they must not collide with the
/// composite key space.
pub fn validate_address(field: &str, address: &str) -> LedgerResult<()> {
    if address.is_empty() {
        return Err(LedgerError::InvalidArgument(format!(
            "{} cannot be empty",
            field
        )));
    }
    if is_composite_key(address) {
        return Err(LedgerError::InvalidArgument(format!(
            "{} cannot start with a NUL character",
            field
        )));
    }
    Ok(())
}

pub fn checked_add(what: &str, current: u64, delta: u64) -> LedgerResult<u64> {
    current
        .checked_add(delta)
        .ok_or_else(|| LedgerError::InvalidArgument(format!("{} would overflow", what)))
}
