//! ERC-20 style fungible token ledger
//!
//! Provides the accounting logic run on every invocation:
//! - Token metadata and total supply
//! - Balances per address
//! - Allowances for delegated transfers, enumerable per owner
//! - Transfer and approval events
//!
//! # Example
//!
//! ```rust
//! use erc20_ledger::state::{LedgerStore, TxContext};
//! use erc20_ledger::token::{Erc20, TokenMetadata};
//!
//! let store = LedgerStore::new();
//! let mut ctx = TxContext::new(&store, "tx-1");
//! let mut token = Erc20::new(&mut ctx);
//!
//! let metadata = TokenMetadata::new("Dapp Token", "DT", "alice", 1_000).unwrap();
//! token.init(&metadata).unwrap();
//!
//! token.transfer("alice", "bob", 250).unwrap();
//! assert_eq!(token.balance_of("bob").unwrap(), 250);
//! ```

pub mod allowance;
pub mod balance;
pub mod contract;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod metadata;
pub mod params;

pub use allowance::Approval;
pub use contract::Erc20;
pub use dispatch::{dispatch, execute, FUNCTIONS};
pub use error::{LedgerError, LedgerResult};
pub use events::{ApprovalEvent, TransferEvent};
pub use metadata::TokenMetadata;
