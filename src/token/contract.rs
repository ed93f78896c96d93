//! ERC-20 style token operations
//!
//! [`Erc20`] composes metadata, balances, allowances and events over a borrowed
//! [`StateAccessor`]. It holds nothing across invocations: every operation reads
//! its inputs fresh through the accessor and writes its outputs back.

use crate::state::StateAccessor;
use crate::token::allowance::{self, Approval};
use crate::token::balance;
use crate::token::error::{LedgerError, LedgerResult};
use crate::token::events::{self, ApprovalEvent, TransferEvent, ADMIN_ADDRESS};
use crate::token::metadata::{self, TokenMetadata};
use crate::token::params::{checked_add, ensure_positive, validate_address};

/// Token operations bound to one invocation's state
pub struct Erc20<'s> {
    state: &'s mut dyn StateAccessor,
}

impl<'s> Erc20<'s> {
    pub fn new(state: &'s mut dyn StateAccessor) -> Self {
        Self { state }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn total_supply(&self, name: &str) -> LedgerResult<u64> {
        metadata::total_supply(&*self.state, name)
    }

    /// Balance of an address, zero if it never held tokens
    pub fn balance_of(&self, address: &str) -> LedgerResult<u64> {
        balance::get_balance(&*self.state, address, true)
    }

    pub fn allowance(&self, owner: &str, spender: &str) -> LedgerResult<u64> {
        allowance::get(&*self.state, owner, spender)
    }

    pub fn approval_list(&self, owner: &str) -> LedgerResult<Vec<Approval>> {
        allowance::list_by_owner(&*self.state, owner)
    }

    // =========================================================================
    // State-changing operations
    // =========================================================================

    /// Create the token and credit the initial supply to its owner
    pub fn init(&mut self, token: &TokenMetadata) -> LedgerResult<()> {
        metadata::initialize(self.state, token)
    }

    /// Move `amount` from `from` to `to`
    ///
    /// # Arguments
    /// * `from` - Sender address, must hold at least `amount`
    /// * `to` - Recipient address
    /// * `amount` - Amount to move, greater than zero
    pub fn transfer(&mut self, from: &str, to: &str, amount: u64) -> LedgerResult<TransferEvent> {
        ensure_positive("transfer amount", amount)?;
        validate_address("sender", from)?;
        validate_address("recipient", to)?;

        let from_balance = balance::get_balance(&*self.state, from, true)?;
        if from_balance < amount {
            return Err(LedgerError::InsufficientFunds {
                what: "balance",
                have: from_balance,
                need: amount,
            });
        }

        // Both sides are computed before anything is written
        if from != to {
            let to_balance = balance::get_balance(&*self.state, to, true)?;
            let credited = checked_add(&format!("balance of {}", to), to_balance, amount)?;

            balance::set_balance(self.state, from, from_balance - amount)?;
            balance::set_balance(self.state, to, credited)?;
        }

        let event = TransferEvent::new(from, to, amount);
        events::emit_transfer(self.state, &event)?;

        log::info!("{} sent {} to {}", from, amount, to);
        Ok(event)
    }

    /// Set the allowance of `spender` over `owner`'s tokens, replacing any previous value
    pub fn approve(&mut self, owner: &str, spender: &str, amount: u64) -> LedgerResult<ApprovalEvent> {
        ensure_positive("allowance amount", amount)?;
        self.write_approval(owner, spender, amount)
    }

    /// Raise an allowance by `delta` (zero allowed)
    pub fn increase_allowance(
        &mut self,
        owner: &str,
        spender: &str,
        delta: u64,
    ) -> LedgerResult<ApprovalEvent> {
        let current = allowance::get(&*self.state, owner, spender)?;
        let updated = checked_add(&format!("allowance {}/{}", owner, spender), current, delta)?;
        self.write_approval(owner, spender, updated)
    }

    /// Lower an allowance by `delta` (zero allowed); it may reach zero but not go below
    pub fn decrease_allowance(
        &mut self,
        owner: &str,
        spender: &str,
        delta: u64,
    ) -> LedgerResult<ApprovalEvent> {
        let current = allowance::get(&*self.state, owner, spender)?;
        if delta > current {
            return Err(LedgerError::InsufficientFunds {
                what: "allowance",
                have: current,
                need: delta,
            });
        }
        self.write_approval(owner, spender, current - delta)
    }

    /// Spend part of an allowance: move `amount` from `owner` to `recipient`
    /// on behalf of `spender` and reduce the allowance by the same amount.
    ///
    /// Allowance and balance are both checked before the first write. A failure
    /// after that point fails the whole invocation, which the host then discards.
    pub fn transfer_from(
        &mut self,
        owner: &str,
        spender: &str,
        recipient: &str,
        amount: u64,
    ) -> LedgerResult<(TransferEvent, ApprovalEvent)> {
        ensure_positive("transfer amount", amount)?;

        let allowed = allowance::get(&*self.state, owner, spender)?;
        if amount > allowed {
            return Err(LedgerError::InsufficientFunds {
                what: "allowance",
                have: allowed,
                need: amount,
            });
        }

        let transfer = self.transfer(owner, recipient, amount)?;

        // Re-read rather than reuse `allowed`
        let current = allowance::get(&*self.state, owner, spender)?;
        let remaining = current
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientFunds {
                what: "allowance",
                have: current,
                need: amount,
            })?;
        let approval = self.write_approval(owner, spender, remaining)?;

        log::info!(
            "{} spent {} of {}'s allowance, {} left",
            spender,
            amount,
            owner,
            remaining
        );
        Ok((transfer, approval))
    }

    /// Create `amount` new tokens for `recipient`, increasing the total supply
    pub fn mint(&mut self, name: &str, recipient: &str, amount: u64) -> LedgerResult<TransferEvent> {
        ensure_positive("mint amount", amount)?;
        validate_address("recipient", recipient)?;
        if recipient == name {
            return Err(LedgerError::InvalidArgument(
                "recipient cannot share the token name key".to_string(),
            ));
        }

        let token = metadata::load(&*self.state, name)?;
        let supply = checked_add(&format!("total supply of {}", name), token.total_supply, amount)?;
        let current = balance::get_balance(&*self.state, recipient, true)?;
        let credited = checked_add(&format!("balance of {}", recipient), current, amount)?;

        metadata::set_total_supply(self.state, name, supply)?;
        balance::set_balance(self.state, recipient, credited)?;

        let event = TransferEvent::new(ADMIN_ADDRESS, name, amount);
        events::emit_transfer(self.state, &event)?;

        log::info!("Minted {} {} to {}, supply now {}", amount, name, recipient, supply);
        Ok(event)
    }

    /// Destroy `amount` tokens held by `holder`, decreasing the total supply
    pub fn burn(&mut self, name: &str, holder: &str, amount: u64) -> LedgerResult<TransferEvent> {
        ensure_positive("burn amount", amount)?;
        validate_address("holder", holder)?;

        let token = metadata::load(&*self.state, name)?;
        let held = balance::get_balance(&*self.state, holder, false)?;
        if held < amount {
            return Err(LedgerError::InsufficientFunds {
                what: "balance",
                have: held,
                need: amount,
            });
        }
        let supply = token
            .total_supply
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientFunds {
                what: "total supply",
                have: token.total_supply,
                need: amount,
            })?;

        metadata::set_total_supply(self.state, name, supply)?;
        balance::set_balance(self.state, holder, held - amount)?;

        let event = TransferEvent::new(holder, ADMIN_ADDRESS, amount);
        events::emit_transfer(self.state, &event)?;

        log::info!("Burned {} {} from {}, supply now {}", amount, name, holder, supply);
        Ok(event)
    }

    /// Forward a `transfer` to another token ledger, returning its payload
    pub fn transfer_other_token(
        &mut self,
        ledger: &str,
        from: &str,
        to: &str,
        amount: u64,
    ) -> LedgerResult<Vec<u8>> {
        if ledger.is_empty() {
            return Err(LedgerError::InvalidArgument(
                "ledger name cannot be empty".to_string(),
            ));
        }

        let args = vec![
            "transfer".to_string(),
            from.to_string(),
            to.to_string(),
            amount.to_string(),
        ];
        let scope = self.state.scope().to_string();
        let response = self.state.invoke_other(ledger, &args, &scope);

        if !response.is_success() {
            return Err(LedgerError::Remote {
                ledger: ledger.to_string(),
                message: response.message,
            });
        }

        log::info!("{} sent {} to {} on {}", from, amount, to, ledger);
        Ok(response.payload)
    }

    fn write_approval(
        &mut self,
        owner: &str,
        spender: &str,
        amount: u64,
    ) -> LedgerResult<ApprovalEvent> {
        validate_address("owner", owner)?;
        validate_address("spender", spender)?;

        allowance::set(self.state, owner, spender, amount)?;
        let event = ApprovalEvent::new(owner, spender, amount);
        events::emit_approval(self.state, &event)?;

        log::debug!("Allowance {}/{} set to {}", owner, spender, amount);
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{LedgerStore, RangeScan, Response, StateError, TxContext};
    use crate::token::events::{APPROVAL_EVENT, TRANSFER_EVENT};

    /// Accessor that fails every allowance write
    struct RejectApprovalWrites<'a, 'b>(&'a mut TxContext<'b>);

    impl StateAccessor for RejectApprovalWrites<'_, '_> {
        fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StateError> {
            self.0.get_state(key)
        }

        fn put_state(&mut self, key: &str, value: &[u8]) -> Result<(), StateError> {
            if key.starts_with("\u{0}approval") {
                return Err(StateError::Io("disk full".to_string()));
            }
            self.0.put_state(key, value)
        }

        fn range_by_prefix(
            &self,
            namespace: &str,
            prefix: &[&str],
        ) -> Result<RangeScan<'_>, StateError> {
            self.0.range_by_prefix(namespace, prefix)
        }

        fn emit_event(&mut self, name: &str, payload: &[u8]) -> Result<(), StateError> {
            self.0.emit_event(name, payload)
        }

        fn invoke_other(&mut self, ledger: &str, args: &[String], scope: &str) -> Response {
            self.0.invoke_other(ledger, args, scope)
        }

        fn scope(&self) -> &str {
            self.0.scope()
        }
    }

    fn init_token(ctx: &mut TxContext<'_>, supply: u64) {
        let metadata = TokenMetadata::new("T", "t", "alice", supply).unwrap();
        Erc20::new(ctx).init(&metadata).unwrap();
    }

    #[test]
    fn test_init_sets_supply_and_owner_balance() {
        let store = LedgerStore::new();
        let mut ctx = TxContext::new(&store, "tx1");
        init_token(&mut ctx, 1000);

        let token = Erc20::new(&mut ctx);
        assert_eq!(token.total_supply("T").unwrap(), 1000);
        assert_eq!(token.balance_of("alice").unwrap(), 1000);
    }

    #[test]
    fn test_init_zero_supply() {
        let store = LedgerStore::new();
        let mut ctx = TxContext::new(&store, "tx1");
        init_token(&mut ctx, 0);

        let token = Erc20::new(&mut ctx);
        assert_eq!(token.total_supply("T").unwrap(), 0);
        assert_eq!(token.balance_of("alice").unwrap(), 0);
    }

    #[test]
    fn test_transfer_conserves_balances() {
        let store = LedgerStore::new();
        let mut ctx = TxContext::new(&store, "tx1");
        init_token(&mut ctx, 1000);

        let mut token = Erc20::new(&mut ctx);
        let event = token.transfer("alice", "bob", 400).unwrap();
        assert_eq!(event, TransferEvent::new("alice", "bob", 400));

        let alice = token.balance_of("alice").unwrap();
        let bob = token.balance_of("bob").unwrap();
        assert_eq!((alice, bob), (600, 400));
        assert_eq!(alice + bob, 1000);
    }

    #[test]
    fn test_transfer_insufficient_funds_changes_nothing() {
        let store = LedgerStore::new();
        let mut ctx = TxContext::new(&store, "tx1");
        init_token(&mut ctx, 100);

        let err = Erc20::new(&mut ctx).transfer("alice", "bob", 101).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                what: "balance",
                have: 100,
                need: 101
            }
        );

        assert!(ctx.events().is_empty());
        let token = Erc20::new(&mut ctx);
        assert_eq!(token.balance_of("alice").unwrap(), 100);
        assert_eq!(token.balance_of("bob").unwrap(), 0);
    }

    #[test]
    fn test_transfer_from_unknown_sender() {
        let store = LedgerStore::new();
        let mut ctx = TxContext::new(&store, "tx1");

        assert!(matches!(
            Erc20::new(&mut ctx).transfer("nobody", "bob", 1),
            Err(LedgerError::InsufficientFunds { have: 0, .. })
        ));
    }

    #[test]
    fn test_transfer_rejects_zero() {
        let store = LedgerStore::new();
        let mut ctx = TxContext::new(&store, "tx1");
        init_token(&mut ctx, 100);

        assert!(matches!(
            Erc20::new(&mut ctx).transfer("alice", "bob", 0),
            Err(LedgerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_self_transfer_keeps_balance() {
        let store = LedgerStore::new();
        let mut ctx = TxContext::new(&store, "tx1");
        init_token(&mut ctx, 100);

        let mut token = Erc20::new(&mut ctx);
        token.transfer("alice", "alice", 60).unwrap();
        assert_eq!(token.balance_of("alice").unwrap(), 100);
    }

    #[test]
    fn test_approve_overwrites() {
        let store = LedgerStore::new();
        let mut ctx = TxContext::new(&store, "tx1");

        let mut token = Erc20::new(&mut ctx);
        token.approve("alice", "bob", 300).unwrap();
        token.approve("alice", "bob", 120).unwrap();
        assert_eq!(token.allowance("alice", "bob").unwrap(), 120);

        assert!(matches!(
            token.approve("alice", "bob", 0),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert_eq!(token.allowance("alice", "bob").unwrap(), 120);
    }

    #[test]
    fn test_increase_and_decrease_allowance() {
        let store = LedgerStore::new();
        let mut ctx = TxContext::new(&store, "tx1");

        let mut token = Erc20::new(&mut ctx);
        token.increase_allowance("alice", "bob", 0).unwrap();
        assert_eq!(token.allowance("alice", "bob").unwrap(), 0);

        token.increase_allowance("alice", "bob", 50).unwrap();
        token.increase_allowance("alice", "bob", 25).unwrap();
        assert_eq!(token.allowance("alice", "bob").unwrap(), 75);

        let event = token.decrease_allowance("alice", "bob", 75).unwrap();
        assert_eq!(event, ApprovalEvent::new("alice", "bob", 0));

        assert_eq!(
            token.decrease_allowance("alice", "bob", 1),
            Err(LedgerError::InsufficientFunds {
                what: "allowance",
                have: 0,
                need: 1
            })
        );
    }

    #[test]
    fn test_transfer_from_spends_allowance() {
        let store = LedgerStore::new();
        let mut ctx = TxContext::new(&store, "tx1");
        init_token(&mut ctx, 1000);

        {
            let mut token = Erc20::new(&mut ctx);
            token.approve("alice", "bob", 300).unwrap();
            let (transfer, approval) = token.transfer_from("alice", "bob", "carol", 300).unwrap();
            assert_eq!(transfer, TransferEvent::new("alice", "carol", 300));
            assert_eq!(approval, ApprovalEvent::new("alice", "bob", 0));

            assert_eq!(token.balance_of("alice").unwrap(), 700);
            assert_eq!(token.balance_of("carol").unwrap(), 300);
            assert_eq!(token.allowance("alice", "bob").unwrap(), 0);
        }

        let names: Vec<&str> = ctx.events().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec![APPROVAL_EVENT, TRANSFER_EVENT, APPROVAL_EVENT]);
    }

    #[test]
    fn test_transfer_from_over_allowance() {
        let store = LedgerStore::new();
        let mut ctx = TxContext::new(&store, "tx1");
        init_token(&mut ctx, 1000);

        let mut token = Erc20::new(&mut ctx);
        token.approve("alice", "bob", 10).unwrap();
        assert_eq!(
            token.transfer_from("alice", "bob", "carol", 11),
            Err(LedgerError::InsufficientFunds {
                what: "allowance",
                have: 10,
                need: 11
            })
        );
        assert_eq!(token.balance_of("alice").unwrap(), 1000);
        assert_eq!(token.allowance("alice", "bob").unwrap(), 10);
    }

    #[test]
    fn test_transfer_from_over_balance() {
        let store = LedgerStore::new();
        let mut ctx = TxContext::new(&store, "tx1");
        init_token(&mut ctx, 5);

        let mut token = Erc20::new(&mut ctx);
        token.approve("alice", "bob", 10).unwrap();
        assert!(matches!(
            token.transfer_from("alice", "bob", "carol", 6),
            Err(LedgerError::InsufficientFunds { what: "balance", .. })
        ));
        assert_eq!(token.allowance("alice", "bob").unwrap(), 10);
    }

    #[test]
    fn test_transfer_from_store_failure_is_reported_with_context() {
        let store = LedgerStore::new();
        let mut ctx = TxContext::new(&store, "tx1");
        init_token(&mut ctx, 1000);
        Erc20::new(&mut ctx).approve("alice", "bob", 100).unwrap();

        let mut failing = RejectApprovalWrites(&mut ctx);
        let err = Erc20::new(&mut failing)
            .transfer_from("alice", "bob", "carol", 40)
            .unwrap_err();

        match err {
            LedgerError::Store { context, source } => {
                assert_eq!(context, "write allowance alice/bob");
                assert_eq!(source, StateError::Io("disk full".to_string()));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_failed_transfer_from_leaves_committed_state_untouched() {
        let mut store = LedgerStore::new();
        let setup = {
            let mut ctx = TxContext::new(&store, "tx1");
            init_token(&mut ctx, 1000);
            Erc20::new(&mut ctx).approve("alice", "bob", 100).unwrap();
            ctx.into_changes()
        };
        store.apply(setup);
        let events_before = store.events().len();

        let (result, changes) = {
            let mut ctx = TxContext::new(&store, "tx2");
            let result = Erc20::new(&mut RejectApprovalWrites(&mut ctx))
                .transfer_from("alice", "bob", "carol", 40);
            (result, ctx.into_changes())
        };

        // The transfer step had already been staged when the allowance write failed
        assert!(result.is_err());
        assert_eq!(changes.writes.get("carol"), Some(&b"40".to_vec()));
        if result.is_ok() {
            store.apply(changes);
        }

        let mut ctx = TxContext::new(&store, "tx3");
        let token = Erc20::new(&mut ctx);
        assert_eq!(token.balance_of("alice").unwrap(), 1000);
        assert_eq!(token.balance_of("carol").unwrap(), 0);
        assert_eq!(token.allowance("alice", "bob").unwrap(), 100);
        assert_eq!(store.events().len(), events_before);
    }

    #[test]
    fn test_transfer_involving_token_name_is_rejected() {
        let store = LedgerStore::new();
        let mut ctx = TxContext::new(&store, "tx1");
        init_token(&mut ctx, 1000);

        let mut token = Erc20::new(&mut ctx);
        assert!(matches!(
            token.transfer("alice", "T", 5),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert!(matches!(
            token.transfer("T", "alice", 5),
            Err(LedgerError::InvalidArgument(_))
        ));
        token.approve("alice", "bob", 10).unwrap();
        assert!(matches!(
            token.transfer_from("alice", "bob", "T", 5),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert_eq!(token.balance_of("alice").unwrap(), 1000);
    }

    #[test]
    fn test_mint() {
        let store = LedgerStore::new();
        let mut ctx = TxContext::new(&store, "tx1");
        init_token(&mut ctx, 1000);

        {
            let mut token = Erc20::new(&mut ctx);
            let event = token.mint("T", "dave", 250).unwrap();
            assert_eq!(event, TransferEvent::new("admin", "T", 250));
            assert_eq!(token.total_supply("T").unwrap(), 1250);
            assert_eq!(token.balance_of("dave").unwrap(), 250);
        }

        let last = ctx.events().last().unwrap();
        assert_eq!(last.name, TRANSFER_EVENT);
        assert!(last.payload.contains(r#""sender":"admin""#));
    }

    #[test]
    fn test_mint_unknown_token() {
        let store = LedgerStore::new();
        let mut ctx = TxContext::new(&store, "tx1");

        assert!(matches!(
            Erc20::new(&mut ctx).mint("T", "alice", 1),
            Err(LedgerError::NotFound(_))
        ));
        assert_eq!(Erc20::new(&mut ctx).balance_of("alice").unwrap(), 0);
    }

    #[test]
    fn test_burn() {
        let store = LedgerStore::new();
        let mut ctx = TxContext::new(&store, "tx1");
        init_token(&mut ctx, 1000);

        let mut token = Erc20::new(&mut ctx);
        let event = token.burn("T", "alice", 400).unwrap();
        assert_eq!(event, TransferEvent::new("alice", "admin", 400));
        assert_eq!(token.total_supply("T").unwrap(), 600);
        assert_eq!(token.balance_of("alice").unwrap(), 600);

        assert!(matches!(
            token.burn("T", "alice", 601),
            Err(LedgerError::InsufficientFunds { .. })
        ));
        assert!(matches!(
            token.burn("T", "nobody", 1),
            Err(LedgerError::NotFound(_))
        ));
    }

    #[test]
    fn test_transfer_other_token_without_host() {
        let store = LedgerStore::new();
        let mut ctx = TxContext::new(&store, "tx1");

        let err = Erc20::new(&mut ctx)
            .transfer_other_token("other", "alice", "bob", 1)
            .unwrap_err();
        assert!(matches!(err, LedgerError::Remote { ref ledger, .. } if ledger == "other"));
        assert_eq!(err.status(), Response::INTERNAL_ERROR);
    }

    #[test]
    fn test_end_to_end_scenario() {
        let store = LedgerStore::new();
        let mut ctx = TxContext::new(&store, "tx1");
        init_token(&mut ctx, 1000);

        let mut token = Erc20::new(&mut ctx);
        token.mint("T", "alice", 500).unwrap();
        assert_eq!(token.total_supply("T").unwrap(), 1500);
        assert_eq!(token.balance_of("alice").unwrap(), 1500);

        token.approve("alice", "bob", 300).unwrap();
        assert_eq!(token.allowance("alice", "bob").unwrap(), 300);
        token.decrease_allowance("alice", "bob", 100).unwrap();
        assert_eq!(token.allowance("alice", "bob").unwrap(), 200);

        token.transfer_from("alice", "bob", "carol", 150).unwrap();
        assert_eq!(token.balance_of("alice").unwrap(), 1350);
        assert_eq!(token.balance_of("carol").unwrap(), 150);
        assert_eq!(token.allowance("alice", "bob").unwrap(), 50);

        let approvals = token.approval_list("alice").unwrap();
        assert_eq!(approvals.len(), 1);
        assert_eq!(approvals[0].allowance, 50);
    }
}
