//! Fungible-token contract.
//!
//! Balances plus owner → spender allowances. The settlement engine pulls
//! payment with [`FungibleToken::transfer_from`], spending the allowance the
//! buyer granted it beforehand.

use packmint_types::{Address, JournalMap, Journaled, PackmintError, PaymentAsset, Result};
use rust_decimal::Decimal;

use crate::supply_conservation::{SupplyConservation, checked_add};

/// A fungible-token contract deployed at `address`.
#[derive(Debug, Clone)]
pub struct FungibleToken {
    address: Address,
    symbol: String,
    balances: JournalMap<Address, Decimal>,
    /// (owner, spender) → remaining allowance.
    allowances: JournalMap<(Address, Address), Decimal>,
    supply: SupplyConservation,
}

impl FungibleToken {
    /// Deploy a token whose entire `initial_supply` is held by `holder`.
    #[must_use]
    pub fn new(
        address: Address,
        symbol: impl Into<String>,
        initial_supply: Decimal,
        holder: Address,
    ) -> Self {
        Self {
            address,
            symbol: symbol.into(),
            balances: [(holder, initial_supply)].into_iter().collect(),
            allowances: JournalMap::new(),
            supply: SupplyConservation::genesis(PaymentAsset::Fungible(address), initial_supply),
        }
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[must_use]
    pub fn balance_of(&self, who: &Address) -> Decimal {
        self.balances.get(who).copied().unwrap_or(Decimal::ZERO)
    }

    #[must_use]
    pub fn allowance(&self, owner: &Address, spender: &Address) -> Decimal {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Set `spender`'s allowance over `owner`'s balance, replacing any prior value.
    ///
    /// # Errors
    /// Returns `PaymentFailed` for a negative amount.
    pub fn approve(&mut self, owner: Address, spender: Address, amount: Decimal) -> Result<()> {
        if amount < Decimal::ZERO {
            return Err(PackmintError::PaymentFailed {
                reason: format!("{}: negative approval {amount}", self.symbol),
            });
        }
        self.allowances.insert((owner, spender), amount);
        Ok(())
    }

    /// Direct transfer by the holder.
    ///
    /// # Errors
    /// Returns `PaymentFailed` if `from` holds less than `amount`,
    /// `AmountOverflow` if `to` cannot hold it.
    pub fn transfer(&mut self, from: Address, to: Address, amount: Decimal) -> Result<()> {
        self.move_balance(from, to, amount)
    }

    /// Allowance-gated pull of `amount` from `from` to `to`, spent by `spender`.
    /// The allowance is checked before the balance.
    ///
    /// # Errors
    /// Returns `PaymentFailed` if the allowance or the balance is short,
    /// `AmountOverflow` if `to` cannot hold the amount.
    pub fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Decimal,
    ) -> Result<()> {
        let allowed = self.allowance(&from, &spender);
        if allowed < amount {
            return Err(PackmintError::PaymentFailed {
                reason: format!(
                    "{}: transfer amount exceeds allowance ({amount} > {allowed})",
                    self.symbol
                ),
            });
        }
        self.move_balance(from, to, amount)?;
        self.allowances.insert((from, spender), allowed - amount);
        Ok(())
    }

    /// Sum of all balances.
    #[must_use]
    pub fn total_supply(&self) -> Decimal {
        self.balances.values().copied().sum()
    }

    /// # Errors
    /// Returns `SupplyInvariantViolation` if balances do not sum to issuance.
    pub fn verify_supply(&self) -> Result<()> {
        self.supply
            .verify(PaymentAsset::Fungible(self.address), self.total_supply())
    }

    fn move_balance(&mut self, from: Address, to: Address, amount: Decimal) -> Result<()> {
        if amount < Decimal::ZERO {
            return Err(PackmintError::PaymentFailed {
                reason: format!("{}: negative transfer {amount}", self.symbol),
            });
        }
        let available = self.balance_of(&from);
        if available < amount {
            return Err(PackmintError::PaymentFailed {
                reason: format!(
                    "{}: transfer amount exceeds balance ({amount} > {available})",
                    self.symbol
                ),
            });
        }
        if amount.is_zero() || from == to {
            return Ok(());
        }
        let credited = checked_add(self.balance_of(&to), amount)?;
        self.balances.insert(from, available - amount);
        self.balances.insert(to, credited);

        tracing::debug!(
            token = %self.symbol,
            from = %from.short(),
            to = %to.short(),
            %amount,
            "Fungible transfer"
        );
        Ok(())
    }
}

impl Journaled for FungibleToken {
    fn commit(&mut self) {
        self.balances.commit();
        self.allowances.commit();
        self.supply.commit();
    }

    fn rollback(&mut self) {
        self.balances.rollback();
        self.allowances.rollback();
        self.supply.rollback();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    fn setup() -> (FungibleToken, Address, Address, Address) {
        let holder = Address::derive("holder");
        let buyer = Address::derive("buyer");
        let engine = Address::derive("engine");
        let mut token = FungibleToken::new(Address::derive("usd"), "USD", dec(100), holder);
        token.transfer(holder, buyer, dec(50)).unwrap();
        (token, holder, buyer, engine)
    }

    #[test]
    fn initial_supply_held_by_holder() {
        let token = FungibleToken::new(Address::derive("t"), "T", dec(100), Address::derive("h"));
        assert_eq!(token.balance_of(&Address::derive("h")), dec(100));
        token.verify_supply().unwrap();
    }

    #[test]
    fn transfer_from_spends_allowance() {
        let (mut token, holder, buyer, engine) = setup();
        token.approve(buyer, engine, dec(20)).unwrap();
        token.transfer_from(engine, buyer, holder, dec(15)).unwrap();
        assert_eq!(token.balance_of(&buyer), dec(35));
        assert_eq!(token.balance_of(&holder), dec(65));
        assert_eq!(token.allowance(&buyer, &engine), dec(5));
        token.verify_supply().unwrap();
    }

    #[test]
    fn transfer_from_exceeding_allowance_fails() {
        let (mut token, holder, buyer, engine) = setup();
        token.approve(buyer, engine, Decimal::new(74, 2)).unwrap();
        let err = token
            .transfer_from(engine, buyer, holder, Decimal::new(75, 2))
            .unwrap_err();
        assert_eq!(err.status(), "402");
        assert!(format!("{err}").contains("exceeds allowance"));
        assert_eq!(token.balance_of(&buyer), dec(50));
    }

    #[test]
    fn transfer_from_exceeding_balance_fails() {
        let (mut token, holder, buyer, engine) = setup();
        token.approve(buyer, engine, dec(1000)).unwrap();
        let err = token
            .transfer_from(engine, buyer, holder, dec(51))
            .unwrap_err();
        assert!(format!("{err}").contains("exceeds balance"));
        assert_eq!(token.allowance(&buyer, &engine), dec(1000));
    }

    #[test]
    fn rollback_restores_balances_and_allowance() {
        let (mut token, holder, buyer, engine) = setup();
        token.approve(buyer, engine, dec(10)).unwrap();
        token.commit();

        token.transfer_from(engine, buyer, holder, dec(10)).unwrap();
        token.rollback();

        assert_eq!(token.balance_of(&buyer), dec(50));
        assert_eq!(token.allowance(&buyer, &engine), dec(10));
        token.verify_supply().unwrap();
    }
}
