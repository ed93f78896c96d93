//! Token metadata
//!
//! One [`TokenMetadata`] record per token, stored as JSON under the token name.

use crate::state::StateAccessor;
use crate::token::balance;
use crate::token::error::{LedgerError, LedgerResult};
use crate::token::params::validate_address;
use serde::{Deserialize, Serialize};

/// Token identity and supply
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenMetadata {
    /// Token name, also the storage key of this record
    pub name: String,
    pub symbol: String,
    /// Address that received the initial supply
    pub owner: String,
    pub total_supply: u64,
}

impl TokenMetadata {
    /// Create metadata with validation
    pub fn new(
        name: impl Into<String>,
        symbol: impl Into<String>,
        owner: impl Into<String>,
        total_supply: u64,
    ) -> LedgerResult<Self> {
        let metadata = Self {
            name: name.into(),
            symbol: symbol.into(),
            owner: owner.into(),
            total_supply,
        };

        validate_address("token name", &metadata.name)?;
        if metadata.symbol.is_empty() {
            return Err(LedgerError::InvalidArgument(
                "symbol cannot be empty".to_string(),
            ));
        }
        validate_address("owner", &metadata.owner)?;
        if metadata.owner == metadata.name {
            return Err(LedgerError::InvalidArgument(
                "owner cannot share the token name key".to_string(),
            ));
        }

        Ok(metadata)
    }
}

/// Create the metadata record and seed the owner's balance with the initial supply.
///
/// A token can only be initialized once.
pub fn initialize(state: &mut dyn StateAccessor, metadata: &TokenMetadata) -> LedgerResult<()> {
    let existing = state
        .get_state(&metadata.name)
        .map_err(LedgerError::store(format!("read metadata of {}", metadata.name)))?;
    if existing.is_some() {
        return Err(LedgerError::AlreadyInitialized(metadata.name.clone()));
    }

    save(state, metadata)?;
    balance::set_balance(state, &metadata.owner, metadata.total_supply)?;

    log::info!(
        "Token initialized: {} ({}) with supply {} held by {}",
        metadata.name,
        metadata.symbol,
        metadata.total_supply,
        metadata.owner
    );
    Ok(())
}

/// Load the metadata record of a token
pub fn load(state: &dyn StateAccessor, name: &str) -> LedgerResult<TokenMetadata> {
    let bytes = state
        .get_state(name)
        .map_err(LedgerError::store(format!("read metadata of {}", name)))?
        .ok_or_else(|| LedgerError::NotFound(format!("token {}", name)))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| LedgerError::deserialization(format!("metadata of {}", name), e))
}

/// Write the metadata record wholesale
pub fn save(state: &mut dyn StateAccessor, metadata: &TokenMetadata) -> LedgerResult<()> {
    let bytes = serde_json::to_vec(metadata).map_err(|e| LedgerError::Store {
        context: format!("encode metadata of {}", metadata.name),
        source: crate::state::StateError::Serialization(e.to_string()),
    })?;

    state
        .put_state(&metadata.name, &bytes)
        .map_err(LedgerError::store(format!("write metadata of {}", metadata.name)))
}

pub fn total_supply(state: &dyn StateAccessor, name: &str) -> LedgerResult<u64> {
    Ok(load(state, name)?.total_supply)
}

/// Rewrite the supply, keeping name, symbol and owner
pub fn set_total_supply(
    state: &mut dyn StateAccessor,
    name: &str,
    new_supply: u64,
) -> LedgerResult<TokenMetadata> {
    let mut metadata = load(state, name)?;
    metadata.total_supply = new_supply;
    save(state, &metadata)?;
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{LedgerStore, TxContext};

    #[test]
    fn test_metadata_validation() {
        assert!(TokenMetadata::new("T", "t", "alice", 0).is_ok());
        assert!(TokenMetadata::new("", "t", "alice", 1).is_err());
        assert!(TokenMetadata::new("T", "", "alice", 1).is_err());
        assert!(TokenMetadata::new("T", "t", "", 1).is_err());
        assert!(TokenMetadata::new("T", "t", "T", 1).is_err());
    }

    #[test]
    fn test_json_field_names() {
        let metadata = TokenMetadata::new("T", "t", "alice", 1000).unwrap();
        let json = serde_json::to_string(&metadata).unwrap();
        assert_eq!(
            json,
            r#"{"name":"T","symbol":"t","owner":"alice","totalSupply":1000}"#
        );
    }

    #[test]
    fn test_initialize_and_read_back() {
        let store = LedgerStore::new();
        let mut ctx = TxContext::new(&store, "tx1");
        let metadata = TokenMetadata::new("T", "t", "alice", 1000).unwrap();

        initialize(&mut ctx, &metadata).unwrap();

        assert_eq!(total_supply(&ctx, "T").unwrap(), 1000);
        assert_eq!(balance::get_balance(&ctx, "alice", false).unwrap(), 1000);
        assert_eq!(load(&ctx, "T").unwrap(), metadata);
    }

    #[test]
    fn test_reinitialize_rejected() {
        let store = LedgerStore::new();
        let mut ctx = TxContext::new(&store, "tx1");
        let metadata = TokenMetadata::new("T", "t", "alice", 1000).unwrap();
        initialize(&mut ctx, &metadata).unwrap();

        let again = TokenMetadata::new("T", "t", "mallory", 5).unwrap();
        assert_eq!(
            initialize(&mut ctx, &again),
            Err(LedgerError::AlreadyInitialized("T".to_string()))
        );
        assert_eq!(balance::get_balance(&ctx, "mallory", true).unwrap(), 0);
    }

    #[test]
    fn test_set_total_supply_keeps_identity() {
        let store = LedgerStore::new();
        let mut ctx = TxContext::new(&store, "tx1");
        initialize(&mut ctx, &TokenMetadata::new("T", "t", "alice", 10).unwrap()).unwrap();

        let updated = set_total_supply(&mut ctx, "T", 25).unwrap();
        assert_eq!(updated.symbol, "t");
        assert_eq!(updated.owner, "alice");
        assert_eq!(total_supply(&ctx, "T").unwrap(), 25);
    }

    #[test]
    fn test_missing_and_malformed_metadata() {
        let store = LedgerStore::new();
        let mut ctx = TxContext::new(&store, "tx1");

        assert!(matches!(
            total_supply(&ctx, "T"),
            Err(LedgerError::NotFound(_))
        ));

        ctx.put_state("T", b"not json").unwrap();
        assert!(matches!(
            total_supply(&ctx, "T"),
            Err(LedgerError::Deserialization { .. })
        ));
    }
}
