//! The execution environment.
//!
//! [`Chain`] serializes every externally visible operation. Each one runs in
//! [`Chain::transact`]: every write is journaled, and on error the journal
//! is replayed backwards, so a failed operation leaves no trace. `&mut self`
//! gives the total order; there is nothing to lock.
//!
//! ```text
//!   transact(f)
//!     ├─ f(&mut state)          writes journaled per key
//!     │    ├─ Ok  → state.commit(), height += 1, receipt
//!     │    └─ Err → state.rollback()
//! ```
//!
//! A transaction costs time in what it writes, not in the size of the world.

use packmint_assets::{AssetBook, FungibleToken, NativeLedger};
use packmint_registry::{AllowlistMinter, PackageRegistry, RegistryBook};
use packmint_types::{
    Address, Capability, EngineConfig, JournalBook, JournalCell, Journaled, Order, OrderHash,
    OrderSignature, Package, PackmintError, Receipt, ReceiptType, RegistryConfig, Result, TokenId,
};
use rust_decimal::Decimal;

use crate::engine::{Host, SettlementEngine};

/// Everything the environment holds.
#[derive(Debug, Clone, Default)]
pub struct WorldState {
    pub native: NativeLedger,
    pub assets: AssetBook,
    pub registries: RegistryBook,
    pub engines: JournalBook<SettlementEngine>,
    pub minters: JournalBook<AllowlistMinter>,
    /// Deployment counter; feeds contract address derivation.
    nonce: JournalCell<u64>,
}

impl WorldState {
    /// # Errors
    /// Returns `ContractNotFound` for an unknown address.
    pub fn engine(&self, address: &Address) -> Result<&SettlementEngine> {
        self.engines
            .get(address)
            .ok_or(PackmintError::ContractNotFound(*address))
    }

    /// # Errors
    /// Returns `ContractNotFound` for an unknown address.
    pub fn minter(&self, address: &Address) -> Result<&AllowlistMinter> {
        self.minters
            .get(address)
            .ok_or(PackmintError::ContractNotFound(*address))
    }

    fn minter_mut(&mut self, address: &Address) -> Result<&mut AllowlistMinter> {
        self.minters
            .get_mut(address)
            .ok_or(PackmintError::ContractNotFound(*address))
    }

    fn engine_mut(&mut self, address: &Address) -> Result<&mut SettlementEngine> {
        self.engines
            .get_mut(address)
            .ok_or(PackmintError::ContractNotFound(*address))
    }

    /// Supply conservation across the native ledger and every token.
    ///
    /// # Errors
    /// Returns `SupplyInvariantViolation` on the first imbalance.
    pub fn verify_supply(&self) -> Result<()> {
        self.native.verify_supply()?;
        self.assets.verify_supply()
    }

    fn next_address(&mut self, kind: &str) -> Address {
        let nonce = self.nonce.get_mut();
        *nonce += 1;
        Address::derive(&format!("{kind}:{nonce}"))
    }
}

impl Journaled for WorldState {
    fn commit(&mut self) {
        self.native.commit();
        self.assets.commit();
        self.registries.commit();
        self.engines.commit();
        self.minters.commit();
        self.nonce.commit();
    }

    fn rollback(&mut self) {
        self.native.rollback();
        self.assets.rollback();
        self.registries.rollback();
        self.engines.rollback();
        self.minters.rollback();
        self.nonce.rollback();
    }
}

/// Serialized, atomic execution environment.
#[derive(Debug, Default)]
pub struct Chain {
    state: WorldState,
    height: u64,
    receipts: Vec<Receipt>,
}

impl Chain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` as one atomic transaction.
    ///
    /// # Errors
    /// Whatever `f` returns; the state is then exactly as before the call.
    pub fn transact<T>(&mut self, f: impl FnOnce(&mut WorldState) -> Result<T>) -> Result<T> {
        match f(&mut self.state) {
            Ok(value) => {
                self.state.commit();
                self.height += 1;
                tracing::debug!(height = self.height, "Transaction committed");
                Ok(value)
            }
            Err(err) => {
                self.state.rollback();
                tracing::warn!(
                    height = self.height,
                    status = err.status(),
                    error = %err,
                    "Transaction rolled back"
                );
                Err(err)
            }
        }
    }

    fn record(
        &mut self,
        receipt_type: ReceiptType,
        caller: Address,
        order_hash: Option<OrderHash>,
        token_id: Option<TokenId>,
    ) {
        self.receipts.push(Receipt::new(
            self.height,
            receipt_type,
            caller,
            order_hash,
            token_id,
        ));
    }

    // ─── Genesis & deployment ─────────────────────────────────────────

    /// Credit `to` with new native value.
    ///
    /// # Errors
    /// Returns `InvalidOrder` for a negative amount, `AmountOverflow` if the
    /// balance or total issuance would overflow.
    pub fn fund(&mut self, to: Address, amount: Decimal) -> Result<()> {
        self.transact(|s| s.native.mint(to, amount))?;
        self.record(ReceiptType::ValueIssued, to, None, None);
        Ok(())
    }

    /// Deploy a fungible token with its whole supply held by `caller`.
    ///
    /// # Errors
    /// Returns `Configuration` for a negative supply or an address collision.
    pub fn deploy_token(&mut self, caller: Address, symbol: &str, supply: Decimal) -> Result<Address> {
        let address = self.transact(|s| {
            if supply < Decimal::ZERO {
                return Err(PackmintError::Configuration(format!(
                    "token {symbol}: negative supply {supply}"
                )));
            }
            let address = s.next_address("token");
            s.assets
                .deploy(FungibleToken::new(address, symbol, supply, caller))
        })?;
        self.record(ReceiptType::Deployed, caller, None, None);
        Ok(address)
    }

    /// Deploy a registry owned by `caller`.
    ///
    /// # Errors
    /// Returns `Configuration` on an address collision.
    pub fn deploy_registry(&mut self, caller: Address, name: &str, symbol: &str) -> Result<Address> {
        let address = self.transact(|s| {
            let address = s.next_address("registry");
            s.registries
                .deploy(PackageRegistry::new(address, name, symbol, caller))
        })?;
        self.record(ReceiptType::Deployed, caller, None, None);
        Ok(address)
    }

    /// Deploy a settlement engine administered by `caller`.
    ///
    /// # Errors
    /// Returns `Configuration` if `config` is invalid.
    pub fn deploy_engine(&mut self, caller: Address, config: EngineConfig) -> Result<Address> {
        let address = self.transact(|s| {
            let address = s.next_address("engine");
            let engine = SettlementEngine::new(address, caller, config)?;
            if !s.engines.deploy(address, engine) {
                return Err(PackmintError::Configuration(format!(
                    "engine address {address} already in use"
                )));
            }
            tracing::info!(engine = %address.short(), admin = %caller.short(), "Engine deployed");
            Ok(address)
        })?;
        self.record(ReceiptType::Deployed, caller, None, None);
        Ok(address)
    }

    /// Deploy an allowlist minter owned by `caller`.
    ///
    /// # Errors
    /// Returns `Configuration` on an address collision.
    pub fn deploy_allowlist_minter(&mut self, caller: Address) -> Result<Address> {
        let address = self.transact(|s| {
            let address = s.next_address("allowlist");
            if !s.minters.deploy(address, AllowlistMinter::new(address, caller)) {
                return Err(PackmintError::Configuration(format!(
                    "minter address {address} already in use"
                )));
            }
            tracing::info!(minter = %address.short(), owner = %caller.short(), "Allowlist minter deployed");
            Ok(address)
        })?;
        self.record(ReceiptType::Deployed, caller, None, None);
        Ok(address)
    }

    // ─── Settlement ───────────────────────────────────────────────────

    /// Settle a signed order through `engine`, attaching `attached` native value.
    ///
    /// Supply conservation is checked before commit.
    ///
    /// # Errors
    /// Any settlement failure; the transaction is rolled back.
    pub fn settle(
        &mut self,
        engine: &Address,
        caller: Address,
        order: &Order,
        signature: &OrderSignature,
        attached: Decimal,
    ) -> Result<TokenId> {
        let (hash, token_id) = self.transact(|s| {
            let WorldState {
                native,
                assets,
                registries,
                engines,
                ..
            } = &mut *s;
            let engine = engines
                .get_mut(engine)
                .ok_or(PackmintError::ContractNotFound(*engine))?;
            let host = Host {
                native,
                assets,
                registries,
            };
            let token_id = engine.mint(host, caller, order, signature, attached)?;
            let hash = engine.hash_order(order, &caller);
            s.verify_supply()?;
            Ok((hash, token_id))
        })?;
        self.record(ReceiptType::OrderSettled, caller, Some(hash), Some(token_id));
        Ok(token_id)
    }

    /// Mint through an allowlist minter, without payment.
    ///
    /// # Errors
    /// `ContractNotFound`, `Forbidden`, or any registry `mint_to` failure.
    pub fn mint_via_allowlist(
        &mut self,
        minter: &Address,
        caller: Address,
        registry: &Address,
        recipient: Address,
        package: &str,
        uri: &str,
    ) -> Result<TokenId> {
        let token_id = self.transact(|s| {
            let WorldState {
                registries,
                minters,
                ..
            } = s;
            let minter = minters
                .get(minter)
                .ok_or(PackmintError::ContractNotFound(*minter))?;
            minter.mint(&caller, registries, registry, recipient, package, uri)
        })?;
        self.record(ReceiptType::AllowlistMinted, caller, None, Some(token_id));
        Ok(token_id)
    }

    // ─── Registry administration ──────────────────────────────────────

    /// # Errors
    /// `RegistryNotFound`, `Forbidden`, or `PackageLocked`.
    pub fn set_package(&mut self, registry: &Address, caller: Address, package: Package) -> Result<()> {
        self.transact(|s| s.registries.get_mut(registry)?.set_package(&caller, package))?;
        self.record(ReceiptType::PackageDefined, caller, None, None);
        Ok(())
    }

    /// # Errors
    /// `RegistryNotFound` or `Forbidden`.
    pub fn set_registry_config(
        &mut self,
        registry: &Address,
        caller: Address,
        config: RegistryConfig,
    ) -> Result<()> {
        self.transact(|s| s.registries.get_mut(registry)?.set_config(&caller, config))?;
        self.record(ReceiptType::ConfigChanged, caller, None, None);
        Ok(())
    }

    /// # Errors
    /// `RegistryNotFound` or `Forbidden`.
    pub fn grant_registry_capability(
        &mut self,
        registry: &Address,
        caller: Address,
        who: Address,
        cap: Capability,
    ) -> Result<()> {
        self.transact(|s| {
            s.registries
                .get_mut(registry)?
                .grant_capability(&caller, who, cap)
        })?;
        self.record(ReceiptType::AccessChanged, caller, None, None);
        Ok(())
    }

    /// # Errors
    /// `RegistryNotFound` or `Forbidden`.
    pub fn revoke_registry_capability(
        &mut self,
        registry: &Address,
        caller: Address,
        who: Address,
        cap: Capability,
    ) -> Result<()> {
        self.transact(|s| {
            s.registries
                .get_mut(registry)?
                .revoke_capability(&caller, &who, cap)
        })?;
        self.record(ReceiptType::AccessChanged, caller, None, None);
        Ok(())
    }

    // ─── Engine administration ────────────────────────────────────────

    /// # Errors
    /// `ContractNotFound` or `Forbidden`.
    pub fn set_project_recipient(
        &mut self,
        engine: &Address,
        caller: Address,
        registry: Address,
        recipient: Address,
    ) -> Result<()> {
        self.transact(|s| {
            s.engine_mut(engine)?
                .set_project_recipient(&caller, registry, recipient)
        })?;
        self.record(ReceiptType::ConfigChanged, caller, None, None);
        Ok(())
    }

    /// # Errors
    /// `ContractNotFound` or `Forbidden`.
    pub fn set_fee_recipient(
        &mut self,
        engine: &Address,
        caller: Address,
        recipient: Option<Address>,
    ) -> Result<()> {
        self.transact(|s| s.engine_mut(engine)?.set_fee_recipient(&caller, recipient))?;
        self.record(ReceiptType::ConfigChanged, caller, None, None);
        Ok(())
    }

    /// # Errors
    /// `ContractNotFound`, `Forbidden`, or `Configuration`.
    pub fn set_verifier(&mut self, engine: &Address, caller: Address, verifier: Address) -> Result<()> {
        self.transact(|s| s.engine_mut(engine)?.set_verifier(&caller, verifier))?;
        self.record(ReceiptType::ConfigChanged, caller, None, None);
        Ok(())
    }

    // ─── Allowlist administration ─────────────────────────────────────

    /// # Errors
    /// `ContractNotFound` or `Forbidden`.
    pub fn set_allowlist_minters(
        &mut self,
        minter: &Address,
        caller: Address,
        who: &[Address],
    ) -> Result<()> {
        self.transact(|s| s.minter_mut(minter)?.set_minters(&caller, who))?;
        self.record(ReceiptType::AccessChanged, caller, None, None);
        Ok(())
    }

    /// # Errors
    /// `ContractNotFound` or `Forbidden`.
    pub fn revoke_allowlist_minters(
        &mut self,
        minter: &Address,
        caller: Address,
        who: &[Address],
    ) -> Result<()> {
        self.transact(|s| s.minter_mut(minter)?.revoke_minters(&caller, who))?;
        self.record(ReceiptType::AccessChanged, caller, None, None);
        Ok(())
    }

    // ─── Fungible tokens ──────────────────────────────────────────────

    /// # Errors
    /// `UnsupportedAsset` or `PaymentFailed`.
    pub fn approve(
        &mut self,
        token: &Address,
        owner: Address,
        spender: Address,
        amount: Decimal,
    ) -> Result<()> {
        self.transact(|s| s.assets.fungible_mut(token)?.approve(owner, spender, amount))?;
        self.record(ReceiptType::AllowanceSet, owner, None, None);
        Ok(())
    }

    /// # Errors
    /// `UnsupportedAsset`, `PaymentFailed` or `AmountOverflow`.
    pub fn transfer_token(
        &mut self,
        token: &Address,
        from: Address,
        to: Address,
        amount: Decimal,
    ) -> Result<()> {
        self.transact(|s| s.assets.fungible_mut(token)?.transfer(from, to, amount))?;
        self.record(ReceiptType::TokenTransferred, from, None, None);
        Ok(())
    }

    // ─── Reads ────────────────────────────────────────────────────────

    #[must_use]
    pub fn state(&self) -> &WorldState {
        &self.state
    }

    /// Number of committed transactions.
    #[must_use]
    pub fn height(&self) -> u64 {
        self.height
    }

    #[must_use]
    pub fn receipts(&self) -> &[Receipt] {
        &self.receipts
    }

    /// # Errors
    /// Returns `RegistryNotFound` for an unknown address.
    pub fn registry(&self, address: &Address) -> Result<&PackageRegistry> {
        self.state.registries.get(address)
    }

    /// # Errors
    /// Returns `ContractNotFound` for an unknown address.
    pub fn engine(&self, address: &Address) -> Result<&SettlementEngine> {
        self.state.engine(address)
    }

    #[must_use]
    pub fn native_balance(&self, who: &Address) -> Decimal {
        self.state.native.balance(who)
    }

    /// # Errors
    /// Returns `UnsupportedAsset` if `token` is not a token contract.
    pub fn token_balance(&self, token: &Address, who: &Address) -> Result<Decimal> {
        Ok(self.state.assets.fungible(token)?.balance_of(who))
    }

    /// # Errors
    /// Returns `ContractNotFound` for an unknown engine.
    pub fn finalized(&self, engine: &Address, hash: &OrderHash) -> Result<bool> {
        Ok(self.state.engine(engine)?.finalized(hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_transaction_leaves_no_trace() {
        let mut chain = Chain::new();
        let alice = Address::derive("alice");
        chain.fund(alice, Decimal::new(5, 0)).unwrap();
        let height = chain.height();

        let err = chain
            .transact(|s| {
                s.native.transfer(alice, Address::derive("bob"), Decimal::ONE)?;
                Err::<(), _>(PackmintError::Internal("abort".into()))
            })
            .unwrap_err();

        assert_eq!(err.status(), "500");
        assert_eq!(chain.native_balance(&alice), Decimal::new(5, 0));
        assert_eq!(chain.height(), height);
    }

    #[test]
    fn deployments_get_distinct_addresses() {
        let mut chain = Chain::new();
        let owner = Address::derive("owner");
        let a = chain.deploy_registry(owner, "A", "A").unwrap();
        let b = chain.deploy_registry(owner, "B", "B").unwrap();
        assert_ne!(a, b);
        assert_eq!(chain.registry(&a).unwrap().owner(), owner);
        assert_eq!(chain.receipts().len(), 2);
        assert!(chain.receipts().iter().all(Receipt::verify));
    }

    #[test]
    fn unknown_engine_is_not_found() {
        let chain = Chain::new();
        let err = chain
            .finalized(&Address::derive("ghost"), &OrderHash([0; 32]))
            .unwrap_err();
        assert_eq!(err.status(), "404");
    }

    #[test]
    fn rejected_engine_config_rolls_back_nonce() {
        let mut chain = Chain::new();
        let admin = Address::derive("admin");
        assert!(
            chain
                .deploy_engine(admin, EngineConfig::new(Address::ZERO))
                .is_err()
        );
        let engine = chain
            .deploy_engine(admin, EngineConfig::new(Address::derive("v")))
            .unwrap();
        assert_eq!(engine, Address::derive("engine:1"));
    }

    #[test]
    fn funding_past_decimal_max_is_an_error() {
        let mut chain = Chain::new();
        let alice = Address::derive("alice");
        chain.fund(alice, Decimal::MAX).unwrap();
        let height = chain.height();

        let err = chain.fund(alice, Decimal::ONE).unwrap_err();

        assert!(matches!(err, PackmintError::AmountOverflow { .. }));
        assert_eq!(chain.native_balance(&alice), Decimal::MAX);
        assert_eq!(chain.height(), height);
        chain.state().verify_supply().unwrap();
    }

    #[test]
    fn value_movements_leave_receipts() {
        let mut chain = Chain::new();
        let holder = Address::derive("holder");
        let spender = Address::derive("spender");
        chain.fund(holder, Decimal::ONE).unwrap();
        let token = chain.deploy_token(holder, "USD", Decimal::TEN).unwrap();
        chain.approve(&token, holder, spender, Decimal::ONE).unwrap();
        chain
            .transfer_token(&token, holder, spender, Decimal::ONE)
            .unwrap();

        let kinds: Vec<ReceiptType> = chain.receipts().iter().map(|r| r.receipt_type).collect();
        assert_eq!(
            kinds,
            vec![
                ReceiptType::ValueIssued,
                ReceiptType::Deployed,
                ReceiptType::AllowanceSet,
                ReceiptType::TokenTransferred,
            ]
        );
        assert_eq!(chain.receipts().last().unwrap().height, chain.height());
    }

    #[test]
    fn rolled_back_deployment_is_removed() {
        let mut chain = Chain::new();
        let owner = Address::derive("owner");
        let err = chain
            .transact(|s| {
                let address = s.next_address("registry");
                s.registries
                    .deploy(PackageRegistry::new(address, "R", "R", owner))?;
                Err::<(), _>(PackmintError::Internal("abort".into()))
            })
            .unwrap_err();
        assert_eq!(err.status(), "500");
        assert!(chain.registry(&Address::derive("registry:1")).is_err());
        assert!(chain.state().registries.is_empty());
    }
}
