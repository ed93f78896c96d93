//! Ledger error taxonomy

use crate::state::{Response, StateError};
use thiserror::Error;

/// Token ledger errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Insufficient {what}: have {have}, need {need}")]
    InsufficientFunds {
        what: &'static str,
        have: u64,
        need: u64,
    },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Token already initialized: {0}")]
    AlreadyInitialized(String),
    #[error("Failed to decode {what}: {reason}")]
    Deserialization { what: String, reason: String },
    #[error("Failed to {context}: {source}")]
    Store {
        context: String,
        #[source]
        source: StateError,
    },
    #[error("Failed to transfer on {ledger}: {message}")]
    Remote { ledger: String, message: String },
    #[error("Unknown function: {0}")]
    UnknownFunction(String),
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

impl LedgerError {
    /// `map_err` adapter wrapping an accessor failure with what was being done
    pub fn store(context: impl Into<String>) -> impl FnOnce(StateError) -> Self {
        let context = context.into();
        move |source| LedgerError::Store { context, source }
    }

    pub fn deserialization(what: impl Into<String>, reason: impl ToString) -> Self {
        LedgerError::Deserialization {
            what: what.into(),
            reason: reason.to_string(),
        }
    }

    /// Status code reported to the dispatch layer
    pub fn status(&self) -> u16 {
        match self {
            LedgerError::InvalidArgument(_) => Response::BAD_REQUEST,
            LedgerError::UnknownFunction(_) | LedgerError::NotFound(_) => Response::NOT_FOUND,
            LedgerError::AlreadyInitialized(_) => Response::CONFLICT,
            LedgerError::InsufficientFunds { .. }
            | LedgerError::Deserialization { .. }
            | LedgerError::Store { .. }
            | LedgerError::Remote { .. } => Response::INTERNAL_ERROR,
        }
    }
}

impl From<LedgerError> for Response {
    fn from(err: LedgerError) -> Self {
        Response::error(err.status(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_context_in_message() {
        let err = LedgerError::store("put balance of alice")(StateError::Io("disk full".into()));
        assert_eq!(
            err.to_string(),
            "Failed to put balance of alice: IO error: disk full"
        );
        assert_eq!(err.status(), Response::INTERNAL_ERROR);
    }

    #[test]
    fn test_into_response() {
        let res: Response = LedgerError::InvalidArgument("amount must be positive".into()).into();
        assert_eq!(res.status, Response::BAD_REQUEST);
        assert_eq!(res.message, "Invalid argument: amount must be positive");
    }
}
