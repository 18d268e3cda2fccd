//! Receipts for committed transactions.
//!
//! Every committed state change produces a [`Receipt`] naming what happened
//! and carrying a SHA-256 hash of its payload, forming an append-only
//! audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Address, OrderHash, TokenId, TxId, constants};

/// The type of action this receipt proves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReceiptType {
    /// A signed order was settled and its token delivered.
    OrderSettled,
    /// A token was minted through the allowlist minter.
    AllowlistMinted,
    /// A package was defined or redefined.
    PackageDefined,
    /// Engine or registry configuration changed.
    ConfigChanged,
    /// A capability was granted or revoked.
    AccessChanged,
    /// A contract was deployed into the environment.
    Deployed,
    /// New native value entered circulation.
    ValueIssued,
    /// Fungible tokens moved directly between holders.
    TokenTransferred,
    /// A fungible-token allowance was set.
    AllowanceSet,
}

impl std::fmt::Display for ReceiptType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OrderSettled => write!(f, "ORDER_SETTLED"),
            Self::AllowlistMinted => write!(f, "ALLOWLIST_MINTED"),
            Self::PackageDefined => write!(f, "PACKAGE_DEFINED"),
            Self::ConfigChanged => write!(f, "CONFIG_CHANGED"),
            Self::AccessChanged => write!(f, "ACCESS_CHANGED"),
            Self::Deployed => write!(f, "DEPLOYED"),
            Self::ValueIssued => write!(f, "VALUE_ISSUED"),
            Self::TokenTransferred => write!(f, "TOKEN_TRANSFERRED"),
            Self::AllowanceSet => write!(f, "ALLOWANCE_SET"),
        }
    }
}

/// Proof that a transaction committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_id: TxId,
    /// Position in the environment's total order (1-based).
    pub height: u64,
    pub receipt_type: ReceiptType,
    /// Who submitted the transaction.
    pub caller: Address,
    /// Settled order, when applicable.
    pub order_hash: Option<OrderHash>,
    /// Minted token, when applicable.
    pub token_id: Option<TokenId>,
    /// SHA-256 over the domain tag, height, type and caller.
    pub payload_hash: [u8; 32],
    pub issued_at: DateTime<Utc>,
}

impl Receipt {
    #[must_use]
    pub fn new(
        height: u64,
        receipt_type: ReceiptType,
        caller: Address,
        order_hash: Option<OrderHash>,
        token_id: Option<TokenId>,
    ) -> Self {
        let payload_hash = Self::compute_hash(height, receipt_type, &caller, order_hash, token_id);
        Self {
            tx_id: TxId::new(),
            height,
            receipt_type,
            caller,
            order_hash,
            token_id,
            payload_hash,
            issued_at: Utc::now(),
        }
    }

    fn compute_hash(
        height: u64,
        receipt_type: ReceiptType,
        caller: &Address,
        order_hash: Option<OrderHash>,
        token_id: Option<TokenId>,
    ) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(constants::RECEIPT_DOMAIN);
        hasher.update(height.to_le_bytes());
        hasher.update(receipt_type.to_string().as_bytes());
        hasher.update(caller.as_bytes());
        hasher.update(order_hash.map_or([0u8; 32], |h| h.0));
        hasher.update(token_id.map_or(0, |t| t.0).to_le_bytes());
        hasher.finalize().into()
    }

    /// Recompute the payload hash and compare.
    #[must_use]
    pub fn verify(&self) -> bool {
        Self::compute_hash(
            self.height,
            self.receipt_type,
            &self.caller,
            self.order_hash,
            self.token_id,
        ) == self.payload_hash
    }
}
