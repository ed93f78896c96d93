//! ERC-20 Ledger: fungible token accounting over a key-value world state
//!
//! This crate provides:
//! - ERC-20 style token logic (init, transfer, approve, transferFrom, mint, burn)
//! - Allowances stored under composite keys, enumerable per owner
//! - Transfer and approval events
//! - A state accessor abstraction with an in-memory, staging implementation
//! - A host running named ledgers with cross-ledger transfers
//! - JSON persistence with backups
//!
//! # Example
//!
//! ```rust
//! use erc20_ledger::host::LedgerHost;
//!
//! let mut host = LedgerHost::default();
//! host.deploy("dapp").unwrap();
//!
//! let args = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
//! host.invoke("dapp", "init", &args(&["dapp", "DT", "alice", "1000"]));
//! host.invoke("dapp", "transfer", &args(&["alice", "bob", "250"]));
//!
//! let res = host.query("dapp", "balanceOf", &args(&["bob"]));
//! assert_eq!(res.payload_str(), "250");
//! ```

pub mod cli;
pub mod host;
pub mod state;
pub mod storage;
pub mod token;

// Re-export commonly used types
pub use host::{HostConfig, LedgerHost, WorldState};
pub use state::{LedgerStore, Response, StateAccessor, StateError, TxContext};
pub use storage::{Storage, StorageConfig, StorageError};
pub use token::{Erc20, LedgerError, TokenMetadata};
