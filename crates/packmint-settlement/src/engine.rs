//! Order Settlement Engine.
//!
//! ```text
//! caller ─▶ mint(order, sig, attached)
//!             1. validate      fee <= amount, attached covers amount
//!             2. authorize     signature over hash_order_to_sign == verifier
//!             3. finalize      hash_order into the replay set
//!             4. pay out       project leg, fee leg, refund
//!             5. deliver       registry.mint_to(recipient, package, uri)
//! ```
//!
//! Preconditions are checked in that order and the first failure wins.
//! Finalization happens strictly before any transfer. Rollback of a failure
//! in steps 4-5 (including the finalization) is the job of the enclosing
//! transaction, see [`crate::Chain::transact`].

use packmint_assets::{AssetBook, NativeLedger};
use packmint_registry::RegistryBook;
use packmint_types::{
    AccessTable, Address, Capability, EngineConfig, ExcessPaymentPolicy, JournalCell, Journaled,
    Order, OrderHash, OrderSignature, PackmintError, PaymentAsset, Result, TokenId,
    UnroutedFeePolicy,
};
use rust_decimal::Decimal;

use crate::finalized::FinalizedOrderSet;
use crate::payout::{PayoutPlan, PayoutRole};

/// The state an engine reaches into while settling: payment rails and the
/// registries it mints through.
pub(crate) struct Host<'a> {
    pub native: &'a mut NativeLedger,
    pub assets: &'a mut AssetBook,
    pub registries: &'a mut RegistryBook,
}

/// A settlement engine deployed at `address`.
#[derive(Debug, Clone)]
pub struct SettlementEngine {
    address: Address,
    admin: AccessTable,
    config: JournalCell<EngineConfig>,
    finalized: FinalizedOrderSet,
}

impl SettlementEngine {
    /// Create an engine administered by `admin`.
    ///
    /// # Errors
    /// Returns `Configuration` if `config` is invalid.
    pub fn new(address: Address, admin: Address, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            address,
            admin: AccessTable::with_owner(admin, &[]),
            config: JournalCell::new(config),
            finalized: FinalizedOrderSet::new(),
        })
    }

    // ─── Digests ──────────────────────────────────────────────────────

    /// Digest identifying `order` as submitted by `caller`. Keys the
    /// finalized-order set.
    #[must_use]
    pub fn hash_order(&self, order: &Order, caller: &Address) -> OrderHash {
        let hash = order.digest(caller);
        tracing::debug!(order_hash = %hash.short(), caller = %caller.short(), "Order hashed");
        hash
    }

    /// Digest the verifier signs to endorse `order` for `caller`.
    #[must_use]
    pub fn hash_order_to_sign(&self, order: &Order, caller: &Address) -> OrderHash {
        order.signing_digest(caller)
    }

    /// Whether `hash` has been settled.
    #[must_use]
    pub fn finalized(&self, hash: &OrderHash) -> bool {
        self.finalized.contains(hash)
    }

    // ─── Settlement ───────────────────────────────────────────────────

    /// Settle `order` for `caller` and mint its token.
    ///
    /// `attached` is the native value sent along with the call. It must be
    /// zero for fungible-asset orders.
    ///
    /// # Errors
    /// `InvalidOrder`, `UnauthorizedSignature`, `OrderAlreadyFinalized`,
    /// `UnsupportedAsset`, `PaymentFailed`, `RegistryNotFound`, or whatever
    /// the registry's `mint_to` rejects with.
    pub(crate) fn mint(
        &mut self,
        host: Host<'_>,
        caller: Address,
        order: &Order,
        signature: &OrderSignature,
        attached: Decimal,
    ) -> Result<TokenId> {
        let Host {
            native,
            assets,
            registries,
        } = host;
        self.validate(order, attached)?;

        let hash = self.hash_order(order, &caller);
        self.authorize(order, &caller, signature)?;

        if let Err(e) = self.finalized.finalize(hash) {
            tracing::warn!(order_hash = %hash.short(), caller = %caller.short(), "Replay rejected");
            return Err(e);
        }

        let project = match self.config.get().project_recipients.get(&order.registry) {
            Some(recipient) => *recipient,
            None => registries.get(&order.registry)?.owner(),
        };
        let plan = PayoutPlan::compute(order, project, self.config.get().fee_recipient);
        if plan.fee_folded {
            tracing::warn!(
                order_hash = %hash.short(),
                fee = %order.fee,
                "No fee recipient configured, fee folded into project payout"
            );
        }

        match order.payment_asset {
            PaymentAsset::Native => self.pay_native(native, caller, order, &plan, attached)?,
            PaymentAsset::Fungible(token) => {
                let token = assets.fungible_mut(&token)?;
                for leg in &plan.legs {
                    token.transfer_from(self.address, caller, leg.to, leg.amount)?;
                }
            }
        }

        let token_id = registries.get_mut(&order.registry)?.mint_to(
            &self.address,
            order.recipient,
            &order.package_name,
            &order.uri_override,
        )?;

        tracing::info!(
            engine = %self.address.short(),
            order_hash = %hash.short(),
            asset = %order.payment_asset,
            amount = %order.amount,
            project_payout = %plan.amount_for(PayoutRole::Project),
            fee = %plan.amount_for(PayoutRole::Fee),
            token_id = %token_id,
            "Order settled"
        );
        Ok(token_id)
    }

    fn validate(&self, order: &Order, attached: Decimal) -> Result<()> {
        order.validate()?;

        if order.fee > Decimal::ZERO
            && self.config.get().fee_recipient.is_none()
            && self.config.get().unrouted_fee == UnroutedFeePolicy::Reject
        {
            return Err(PackmintError::InvalidOrder {
                reason: format!("fee {} set but no fee recipient is configured", order.fee),
            });
        }

        match order.payment_asset {
            PaymentAsset::Native => {
                if attached < order.amount {
                    return Err(PackmintError::InvalidOrder {
                        reason: format!(
                            "attached payment {attached} below amount {}",
                            order.amount
                        ),
                    });
                }
                if attached > order.amount
                    && self.config.get().excess_payment == ExcessPaymentPolicy::Reject
                {
                    return Err(PackmintError::InvalidOrder {
                        reason: format!(
                            "attached payment {attached} exceeds amount {}",
                            order.amount
                        ),
                    });
                }
            }
            PaymentAsset::Fungible(_) => {
                if !attached.is_zero() {
                    return Err(PackmintError::InvalidOrder {
                        reason: format!("native value {attached} attached to a token-priced order"),
                    });
                }
            }
        }
        Ok(())
    }

    fn authorize(&self, order: &Order, caller: &Address, signature: &OrderSignature) -> Result<()> {
        let digest = self.hash_order_to_sign(order, caller);
        let signer = signature.recover(&digest).inspect_err(|_| {
            tracing::warn!(caller = %caller.short(), "Order signature does not verify");
        })?;
        if signer != self.config.get().verifier {
            tracing::warn!(
                caller = %caller.short(),
                signer = %signer.short(),
                "Order signed by someone other than the verifier"
            );
            return Err(PackmintError::UnauthorizedSignature {
                reason: format!("signer {} is not the verifier", signer.short()),
            });
        }
        Ok(())
    }

    /// Pull the attached value into the engine, pay every leg from there and
    /// refund the excess.
    fn pay_native(
        &self,
        native: &mut NativeLedger,
        caller: Address,
        order: &Order,
        plan: &PayoutPlan,
        attached: Decimal,
    ) -> Result<()> {
        native.transfer(caller, self.address, attached)?;
        for leg in &plan.legs {
            native.transfer(self.address, leg.to, leg.amount)?;
        }
        let excess = attached - order.amount;
        if excess > Decimal::ZERO {
            tracing::debug!(caller = %caller.short(), %excess, "Refunding excess payment");
            native.transfer(self.address, caller, excess)?;
        }
        Ok(())
    }

    // ─── Administration ───────────────────────────────────────────────

    /// Route payouts for orders against `registry` to `recipient`.
    ///
    /// # Errors
    /// Returns `Forbidden` unless `caller` is an administrator.
    pub fn set_project_recipient(
        &mut self,
        caller: &Address,
        registry: Address,
        recipient: Address,
    ) -> Result<()> {
        self.require_admin(caller, "set_project_recipient")?;
        self.config.get_mut().project_recipients.insert(registry, recipient);
        self.bump_version("project_recipient");
        Ok(())
    }

    /// Set or clear the fee recipient.
    ///
    /// # Errors
    /// Returns `Forbidden` unless `caller` is an administrator.
    pub fn set_fee_recipient(&mut self, caller: &Address, recipient: Option<Address>) -> Result<()> {
        self.require_admin(caller, "set_fee_recipient")?;
        self.config.get_mut().fee_recipient = recipient;
        self.bump_version("fee_recipient");
        Ok(())
    }

    /// Replace the trusted verifier.
    ///
    /// # Errors
    /// `Forbidden` unless `caller` is an administrator, `Configuration` for
    /// the zero address.
    pub fn set_verifier(&mut self, caller: &Address, verifier: Address) -> Result<()> {
        self.require_admin(caller, "set_verifier")?;
        if verifier.is_zero() {
            return Err(PackmintError::Configuration(
                "verifier must not be the zero address".into(),
            ));
        }
        self.config.get_mut().verifier = verifier;
        self.bump_version("verifier");
        Ok(())
    }

    /// # Errors
    /// Returns `Forbidden` unless `caller` is an administrator.
    pub fn set_policies(
        &mut self,
        caller: &Address,
        excess_payment: ExcessPaymentPolicy,
        unrouted_fee: UnroutedFeePolicy,
    ) -> Result<()> {
        self.require_admin(caller, "set_policies")?;
        self.config.get_mut().excess_payment = excess_payment;
        self.config.get_mut().unrouted_fee = unrouted_fee;
        self.bump_version("policies");
        Ok(())
    }

    /// # Errors
    /// Returns `Forbidden` unless `caller` is an administrator.
    pub fn grant_admin(&mut self, caller: &Address, who: Address) -> Result<()> {
        self.admin.grant(caller, who, Capability::Owner)
    }

    /// # Errors
    /// Returns `Forbidden` unless `caller` is an administrator, or if `who`
    /// is the last one.
    pub fn revoke_admin(&mut self, caller: &Address, who: &Address) -> Result<()> {
        self.admin.revoke(caller, who, Capability::Owner)
    }

    fn require_admin(&self, caller: &Address, action: &str) -> Result<()> {
        self.admin
            .require(caller, Capability::Owner, action)
            .inspect_err(|_| {
                tracing::warn!(caller = %caller.short(), action, "Admin operation rejected");
            })
    }

    fn bump_version(&mut self, field: &str) {
        self.config.get_mut().version += 1;
        tracing::info!(
            engine = %self.address.short(),
            field,
            version = self.config.get().version,
            "Engine config updated"
        );
    }

    // ─── Reads ────────────────────────────────────────────────────────

    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        self.config.get()
    }

    #[must_use]
    pub fn is_admin(&self, who: &Address) -> bool {
        self.admin.has(who, Capability::Owner)
    }

    /// Configured payout override for `registry`, if any.
    #[must_use]
    pub fn project_recipient(&self, registry: &Address) -> Option<Address> {
        self.config.get().project_recipients.get(registry).copied()
    }

    /// Number of orders settled so far.
    #[must_use]
    pub fn settled_count(&self) -> usize {
        self.finalized.len()
    }
}

impl Journaled for SettlementEngine {
    fn commit(&mut self) {
        self.admin.commit();
        self.config.commit();
        self.finalized.commit();
    }

    fn rollback(&mut self) {
        self.admin.rollback();
        self.config.rollback();
        self.finalized.rollback();
    }
}
