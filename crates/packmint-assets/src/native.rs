//! Native-asset ledger.
//!
//! Per-identity balances of the environment's base asset. All mutations are
//! atomic: either the full transfer succeeds or no balance changes.

use packmint_types::{Address, JournalMap, Journaled, PackmintError, PaymentAsset, Result};
use rust_decimal::Decimal;

use crate::supply_conservation::{SupplyConservation, checked_add};

/// Source of truth for native balances.
#[derive(Debug, Clone, Default)]
pub struct NativeLedger {
    balances: JournalMap<Address, Decimal>,
    supply: SupplyConservation,
}

impl NativeLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Genesis funding: new value enters circulation at `to`.
    ///
    /// # Errors
    /// - `InvalidOrder` for a negative amount
    /// - `AmountOverflow` if the balance or total issuance would overflow
    pub fn mint(&mut self, to: Address, amount: Decimal) -> Result<()> {
        if amount < Decimal::ZERO {
            return Err(PackmintError::InvalidOrder {
                reason: format!("cannot mint negative native amount {amount}"),
            });
        }
        let credited = checked_add(self.balance(&to), amount)?;
        self.supply.record_issue(PaymentAsset::Native, amount)?;
        self.balances.insert(to, credited);
        Ok(())
    }

    /// Move `amount` from `from` to `to`.
    ///
    /// # Errors
    /// Returns `PaymentFailed` if `from` holds less than `amount` or the
    /// amount is negative, `AmountOverflow` if `to` cannot hold it.
    pub fn transfer(&mut self, from: Address, to: Address, amount: Decimal) -> Result<()> {
        if amount < Decimal::ZERO {
            return Err(PackmintError::PaymentFailed {
                reason: format!("negative native transfer {amount}"),
            });
        }
        if amount.is_zero() || from == to {
            return self.require_balance(&from, amount);
        }
        self.require_balance(&from, amount)?;
        let credited = checked_add(self.balance(&to), amount)?;

        let debited = self.balance(&from) - amount;
        self.balances.insert(from, debited);
        self.balances.insert(to, credited);

        tracing::debug!(
            from = %from.short(),
            to = %to.short(),
            %amount,
            "Native transfer"
        );
        Ok(())
    }

    #[must_use]
    pub fn balance(&self, who: &Address) -> Decimal {
        self.balances.get(who).copied().unwrap_or(Decimal::ZERO)
    }

    /// Sum of all balances.
    #[must_use]
    pub fn total_supply(&self) -> Decimal {
        self.balances.values().copied().sum()
    }

    /// # Errors
    /// Returns `SupplyInvariantViolation` if balances do not sum to issuance.
    pub fn verify_supply(&self) -> Result<()> {
        self.supply.verify(PaymentAsset::Native, self.total_supply())
    }

    fn require_balance(&self, who: &Address, amount: Decimal) -> Result<()> {
        let available = self.balance(who);
        if available < amount {
            return Err(PackmintError::PaymentFailed {
                reason: format!("insufficient native balance: need {amount}, have {available}"),
            });
        }
        Ok(())
    }
}

impl Journaled for NativeLedger {
    fn commit(&mut self) {
        self.balances.commit();
        self.supply.commit();
    }

    fn rollback(&mut self) {
        self.balances.rollback();
        self.supply.rollback();
    }
}
