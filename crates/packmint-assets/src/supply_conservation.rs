//! Supply conservation invariant checker.
//!
//! Invariant enforced after every settlement:
//! ```text
//! ∀ asset: Σ(balances) == Σ(issued)
//! ```
//!
//! Value only enters through issuance (genesis funding of the native ledger,
//! initial supply of a token contract). Settlement moves it around. If the
//! sum of balances ever drifts from issuance, value was created or lost.

use packmint_types::{JournalMap, Journaled, PackmintError, PaymentAsset, Result};
use rust_decimal::Decimal;

/// `lhs + rhs`, or `AmountOverflow` past `Decimal::MAX`.
pub(crate) fn checked_add(lhs: Decimal, rhs: Decimal) -> Result<Decimal> {
    lhs.checked_add(rhs)
        .ok_or(PackmintError::AmountOverflow { lhs, rhs })
}

/// Tracks per-asset issuance and validates conservation.
#[derive(Debug, Clone, Default)]
pub struct SupplyConservation {
    issued: JournalMap<PaymentAsset, Decimal>,
}

impl SupplyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker whose only issuance is `amount` of `asset`.
    #[must_use]
    pub fn genesis(asset: PaymentAsset, amount: Decimal) -> Self {
        Self {
            issued: [(asset, amount)].into_iter().collect(),
        }
    }

    /// Record new value entering circulation.
    ///
    /// # Errors
    /// Returns `AmountOverflow` if total issuance would pass `Decimal::MAX`;
    /// nothing is recorded then.
    pub fn record_issue(&mut self, asset: PaymentAsset, amount: Decimal) -> Result<()> {
        let total = checked_add(self.expected_supply(asset), amount)?;
        self.issued.insert(asset, total);
        Ok(())
    }

    /// Total issued for `asset` since genesis.
    #[must_use]
    pub fn expected_supply(&self, asset: PaymentAsset) -> Decimal {
        self.issued.get(&asset).copied().unwrap_or(Decimal::ZERO)
    }

    /// Verify the sum of balances matches issuance.
    ///
    /// # Errors
    /// Returns [`PackmintError::SupplyInvariantViolation`] if actual ≠ expected.
    pub fn verify(&self, asset: PaymentAsset, actual_supply: Decimal) -> Result<()> {
        let expected = self.expected_supply(asset);
        if actual_supply != expected {
            tracing::error!(
                %asset,
                %actual_supply,
                %expected,
                "Supply conservation violated"
            );
            return Err(PackmintError::SupplyInvariantViolation {
                reason: format!("asset {asset}: actual supply {actual_supply} != issued {expected}"),
            });
        }
        Ok(())
    }

    /// Every asset with recorded issuance.
    #[must_use]
    pub fn tracked_assets(&self) -> Vec<PaymentAsset> {
        self.issued.keys().copied().collect()
    }
}

impl Journaled for SupplyConservation {
    fn commit(&mut self) {
        self.issued.commit();
    }

    fn rollback(&mut self) {
        self.issued.rollback();
    }
}

#[cfg(test)]
mod tests {
    use packmint_types::Address;

    use super::*;

    #[test]
    fn empty_supply_is_zero() {
        let sc = SupplyConservation::new();
        assert_eq!(sc.expected_supply(PaymentAsset::Native), Decimal::ZERO);
        assert!(sc.verify(PaymentAsset::Native, Decimal::ZERO).is_ok());
    }

    #[test]
    fn issuance_accumulates() {
        let mut sc = SupplyConservation::new();
        sc.record_issue(PaymentAsset::Native, Decimal::new(1000, 0))
            .unwrap();
        sc.record_issue(PaymentAsset::Native, Decimal::new(500, 0))
            .unwrap();
        assert_eq!(
            sc.expected_supply(PaymentAsset::Native),
            Decimal::new(1500, 0)
        );
    }

    #[test]
    fn verify_fails_when_imbalanced() {
        let mut sc = SupplyConservation::new();
        sc.record_issue(PaymentAsset::Native, Decimal::new(10, 0))
            .unwrap();
        let err = sc
            .verify(PaymentAsset::Native, Decimal::new(11, 0))
            .unwrap_err();
        assert!(matches!(
            err,
            PackmintError::SupplyInvariantViolation { .. }
        ));
    }

    #[test]
    fn assets_tracked_independently() {
        let token = PaymentAsset::Fungible(Address::derive("usd"));
        let mut sc = SupplyConservation::new();
        sc.record_issue(PaymentAsset::Native, Decimal::new(5, 0))
            .unwrap();
        sc.record_issue(token, Decimal::new(100, 0)).unwrap();
        assert!(sc.verify(PaymentAsset::Native, Decimal::new(5, 0)).is_ok());
        assert!(sc.verify(token, Decimal::new(100, 0)).is_ok());
        assert_eq!(sc.tracked_assets().len(), 2);
    }

    #[test]
    fn issuance_overflow_is_an_error() {
        let mut sc = SupplyConservation::genesis(PaymentAsset::Native, Decimal::MAX);
        let err = sc
            .record_issue(PaymentAsset::Native, Decimal::ONE)
            .unwrap_err();
        assert!(matches!(err, PackmintError::AmountOverflow { .. }));
        assert_eq!(sc.expected_supply(PaymentAsset::Native), Decimal::MAX);
    }
}
