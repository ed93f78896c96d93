//! String-parameter surface of the token
//!
//! Maps a function name and its ordered string parameters onto [`Erc20`].
//! Arity is checked first, then numeric syntax, then sign, before any state is
//! touched.

use crate::state::{Response, StateAccessor, StateError};
use crate::token::contract::Erc20;
use crate::token::error::{LedgerError, LedgerResult};
use crate::token::metadata::TokenMetadata;
use crate::token::params::{encode_amount, expect_arity, parse_non_negative, parse_positive};

/// Every function name the dispatcher accepts
pub const FUNCTIONS: [&str; 13] = [
    "init",
    "totalSupply",
    "balanceOf",
    "transfer",
    "allowance",
    "approve",
    "transferFrom",
    "increaseAllowance",
    "decreaseAllowance",
    "approvalList",
    "transferOtherToken",
    "mint",
    "burn",
];

/// Run one function and turn the outcome into a [`Response`]
pub fn dispatch(state: &mut dyn StateAccessor, function: &str, params: &[String]) -> Response {
    match execute(state, function, params) {
        Ok(payload) => Response::success(payload),
        Err(e) => {
            log::warn!("{} rejected: {}", function, e);
            e.into()
        }
    }
}

/// Run one function, returning its payload
pub fn execute(
    state: &mut dyn StateAccessor,
    function: &str,
    params: &[String],
) -> LedgerResult<Vec<u8>> {
    let mut token = Erc20::new(state);

    match function {
        "init" => {
            expect_arity(function, params, 4)?;
            let amount = parse_non_negative("amount", &params[3])?;
            let metadata = TokenMetadata::new(&params[0], &params[1], &params[2], amount)?;
            token.init(&metadata)?;
            Ok(Vec::new())
        }
        "totalSupply" => {
            expect_arity(function, params, 1)?;
            to_json(&token.total_supply(&params[0])?)
        }
        "balanceOf" => {
            expect_arity(function, params, 1)?;
            Ok(encode_amount(token.balance_of(&params[0])?))
        }
        "transfer" => {
            expect_arity(function, params, 3)?;
            let amount = parse_positive("transfer amount", &params[2])?;
            token.transfer(&params[0], &params[1], amount)?;
            Ok(b"transfer success".to_vec())
        }
        "allowance" => {
            expect_arity(function, params, 2)?;
            Ok(encode_amount(token.allowance(&params[0], &params[1])?))
        }
        "approve" => {
            expect_arity(function, params, 3)?;
            let amount = parse_positive("allowance amount", &params[2])?;
            token.approve(&params[0], &params[1], amount)?;
            Ok(b"approve success".to_vec())
        }
        "transferFrom" => {
            expect_arity(function, params, 4)?;
            let amount = parse_positive("transfer amount", &params[3])?;
            token.transfer_from(&params[0], &params[1], &params[2], amount)?;
            Ok(b"transferFrom success".to_vec())
        }
        "increaseAllowance" => {
            expect_arity(function, params, 3)?;
            let delta = parse_non_negative("increase amount", &params[2])?;
            token.increase_allowance(&params[0], &params[1], delta)?;
            Ok(b"increaseAllowance success".to_vec())
        }
        "decreaseAllowance" => {
            expect_arity(function, params, 3)?;
            let delta = parse_non_negative("decrease amount", &params[2])?;
            token.decrease_allowance(&params[0], &params[1], delta)?;
            Ok(b"decreaseAllowance success".to_vec())
        }
        "approvalList" => {
            expect_arity(function, params, 1)?;
            to_json(&token.approval_list(&params[0])?)
        }
        "transferOtherToken" => {
            expect_arity(function, params, 4)?;
            let amount = parse_positive("transfer amount", &params[3])?;
            token.transfer_other_token(&params[0], &params[1], &params[2], amount)?;
            Ok(b"transfer other token success".to_vec())
        }
        "mint" => {
            expect_arity(function, params, 3)?;
            let amount = parse_positive("mint amount", &params[2])?;
            token.mint(&params[0], &params[1], amount)?;
            Ok(b"mint success".to_vec())
        }
        "burn" => {
            expect_arity(function, params, 3)?;
            let amount = parse_positive("burn amount", &params[2])?;
            token.burn(&params[0], &params[1], amount)?;
            Ok(b"burn success".to_vec())
        }
        other => Err(LedgerError::UnknownFunction(other.to_string())),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> LedgerResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| LedgerError::Store {
        context: "encode response payload".to_string(),
        source: StateError::Serialization(e.to_string()),
    })
}
