//! Payout split.
//!
//! An order's `amount` is split into a project leg (`amount - fee`) and a fee
//! leg (`fee`). With no fee recipient configured the fee folds into the
//! project leg. Legs always sum to exactly `amount`; zero legs are dropped.

use packmint_types::{Address, Order};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayoutRole {
    Project,
    Fee,
}

/// One transfer out of the buyer's payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutLeg {
    pub role: PayoutRole,
    pub to: Address,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PayoutPlan {
    pub legs: Vec<PayoutLeg>,
    /// The fee was routed to the project for lack of a fee recipient.
    pub fee_folded: bool,
}

impl PayoutPlan {
    /// Split `order.amount` between `project` and `fee_recipient`.
    ///
    /// Assumes the order already passed [`Order::validate`].
    #[must_use]
    pub fn compute(order: &Order, project: Address, fee_recipient: Option<Address>) -> Self {
        let (project_amount, fee_leg, fee_folded) = match fee_recipient {
            Some(to) if order.fee > Decimal::ZERO => (
                order.project_payout(),
                Some(PayoutLeg {
                    role: PayoutRole::Fee,
                    to,
                    amount: order.fee,
                }),
                false,
            ),
            Some(_) => (order.amount, None, false),
            None => (order.amount, None, order.fee > Decimal::ZERO),
        };

        let mut legs = Vec::with_capacity(2);
        if project_amount > Decimal::ZERO {
            legs.push(PayoutLeg {
                role: PayoutRole::Project,
                to: project,
                amount: project_amount,
            });
        }
        legs.extend(fee_leg);

        Self { legs, fee_folded }
    }

    /// Sum of every leg.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.legs.iter().map(|l| l.amount).sum()
    }

    /// Amount paid to `role`, zero if it has no leg.
    #[must_use]
    pub fn amount_for(&self, role: PayoutRole) -> Decimal {
        self.legs
            .iter()
            .filter(|l| l.role == role)
            .map(|l| l.amount)
            .sum()
    }
}
