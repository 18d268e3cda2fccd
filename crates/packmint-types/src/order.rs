//! Purchase orders.
//!
//! An [`Order`] is the caller's intent to buy one token from one package.
//! It is never persisted; only its [`OrderHash`] is, once settled.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Address, OrderHash, PackmintError, Result, constants};

/// What the buyer pays with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum PaymentAsset {
    /// The environment's base asset, attached to the call.
    Native,
    /// A fungible-token contract, pulled via allowance.
    Fungible(Address),
}

impl PaymentAsset {
    fn tag(self) -> (u8, Address) {
        match self {
            Self::Native => (0, Address::ZERO),
            Self::Fungible(addr) => (1, addr),
        }
    }
}

impl std::fmt::Display for PaymentAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native => write!(f, "NATIVE"),
            Self::Fungible(addr) => write!(f, "FUNGIBLE:{}", addr.short()),
        }
    }
}

/// A signed purchase intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Caller-chosen uniquifier.
    pub salt: u64,
    pub payment_asset: PaymentAsset,
    /// Total price in the payment asset.
    pub amount: Decimal,
    /// Portion of `amount` routed to the fee recipient.
    pub fee: Decimal,
    /// Target package registry.
    pub registry: Address,
    /// Who receives the minted token.
    pub recipient: Address,
    pub package_name: String,
    /// Explicit token URI. Empty means "resolve via registry rules".
    #[serde(default)]
    pub uri_override: String,
}

impl Order {
    /// Structural checks that need no external state: non-negative amounts
    /// and `fee <= amount`.
    ///
    /// # Errors
    /// Returns [`PackmintError::InvalidOrder`] on the first violation.
    pub fn validate(&self) -> Result<()> {
        if self.amount < Decimal::ZERO {
            return Err(PackmintError::InvalidOrder {
                reason: format!("amount {} is negative", self.amount),
            });
        }
        if self.fee < Decimal::ZERO {
            return Err(PackmintError::InvalidOrder {
                reason: format!("fee {} is negative", self.fee),
            });
        }
        if self.fee > self.amount {
            return Err(PackmintError::InvalidOrder {
                reason: format!("fee {} exceeds amount {}", self.fee, self.amount),
            });
        }
        Ok(())
    }

    /// Amount routed to the project once the fee is carved out.
    #[must_use]
    pub fn project_payout(&self) -> Decimal {
        self.amount - self.fee
    }

    /// Canonical digest of this order as submitted by `submitter`.
    ///
    /// `SHA-256(domain || submitter || salt || asset || amount || fee ||
    /// registry || recipient || uri_override || package_name)` with
    /// variable-length fields length-prefixed and decimals normalized, so
    /// signer and verifier reproduce it bit for bit.
    #[must_use]
    pub fn digest(&self, submitter: &Address) -> OrderHash {
        let (asset_tag, asset_addr) = self.payment_asset.tag();

        let mut hasher = Sha256::new();
        hasher.update(constants::ORDER_DOMAIN);
        hasher.update(submitter.as_bytes());
        hasher.update(self.salt.to_le_bytes());
        hasher.update([asset_tag]);
        hasher.update(asset_addr.as_bytes());
        update_prefixed(&mut hasher, self.amount.normalize().to_string().as_bytes());
        update_prefixed(&mut hasher, self.fee.normalize().to_string().as_bytes());
        hasher.update(self.registry.as_bytes());
        hasher.update(self.recipient.as_bytes());
        update_prefixed(&mut hasher, self.uri_override.as_bytes());
        update_prefixed(&mut hasher, self.package_name.as_bytes());
        OrderHash(hasher.finalize().into())
    }

    /// The digest the verifier actually signs: `SHA-256(envelope || digest)`.
    #[must_use]
    pub fn signing_digest(&self, submitter: &Address) -> OrderHash {
        let digest = self.digest(submitter);
        let mut hasher = Sha256::new();
        hasher.update(constants::SIGNED_ORDER_DOMAIN);
        hasher.update(digest.as_bytes());
        OrderHash(hasher.finalize().into())
    }
}

#[allow(clippy::cast_possible_truncation)]
fn update_prefixed(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u32).to_le_bytes());
    hasher.update(bytes);
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Order {
    /// A native-asset order for package `name` on `registry`.
    pub fn dummy_native(registry: Address, recipient: Address, name: &str, amount: Decimal) -> Self {
        Self {
            salt: rand::random::<u64>(),
            payment_asset: PaymentAsset::Native,
            amount,
            fee: Decimal::ZERO,
            registry,
            recipient,
            package_name: name.to_string(),
            uri_override: String::new(),
        }
    }
}
