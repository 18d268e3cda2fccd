//! Error types for Packmint.
//!
//! Every message carries a `PM_ERR_<status>` prefix for easy grepping in
//! logs. The status is a short HTTP-flavoured code shared by the settlement
//! engine and the registry:
//! - 400: malformed order, or package locked against redefinition
//! - 401: order signature not from the trusted verifier
//! - 402: payment transfer failed (balance / allowance)
//! - 403: order replayed, or caller lacks the capability
//! - 404: unknown package, token or registry
//! - 415: payment asset is not a fungible-token contract
//! - 429: package capacity exhausted
//! - 500: invariant breach, configuration or internal errors

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{Address, OrderHash, TokenId};

/// Error taxonomy. Lets callers branch on the class of failure without
/// matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or inconsistent order.
    Validation,
    /// Bad signature, missing role or ownership.
    Authorization,
    /// Order hash already finalized.
    Replay,
    /// Package full.
    Capacity,
    /// Package locked against redefinition.
    State,
    /// Payment asset misbehaves or a transfer failed.
    Asset,
    /// Referenced entity does not exist.
    NotFound,
    /// Invariant breach or environment failure.
    Internal,
}

/// Central error enum for all Packmint operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackmintError {
    // =================================================================
    // Order errors
    // =================================================================
    /// The order failed validation (fee above amount, short payment, ...).
    #[error("PM_ERR_400: Invalid order: {reason}")]
    InvalidOrder { reason: String },

    /// The signature did not verify, or came from someone other than the verifier.
    #[error("PM_ERR_401: Unauthorized signature: {reason}")]
    UnauthorizedSignature { reason: String },

    /// The order hash was settled before (replay).
    #[error("PM_ERR_403: Order already finalized: {0}")]
    OrderAlreadyFinalized(OrderHash),

    // =================================================================
    // Payment errors
    // =================================================================
    /// The payment asset is not a fungible-token contract.
    #[error("PM_ERR_415: Unsupported payment asset: {0}")]
    UnsupportedAsset(Address),

    /// A transfer failed for balance or allowance reasons.
    #[error("PM_ERR_402: Payment failed: {reason}")]
    PaymentFailed { reason: String },

    // =================================================================
    // Access errors
    // =================================================================
    /// Caller lacks the capability required for `action`.
    #[error("PM_ERR_403: Forbidden: {action}")]
    Forbidden { action: String },

    // =================================================================
    // Registry errors
    // =================================================================
    /// Package already has issued tokens and cannot be redefined.
    #[error("PM_ERR_400: Package {package} is locked ({issued} issued)")]
    PackageLocked { package: String, issued: u64 },

    /// No package with this name exists.
    #[error("PM_ERR_404: Package not found: {0}")]
    PackageNotFound(String),

    /// No token with this id exists.
    #[error("PM_ERR_404: Token not found: {0}")]
    TokenNotFound(TokenId),

    /// No registry is deployed at this address.
    #[error("PM_ERR_404: Registry not found: {0}")]
    RegistryNotFound(Address),

    /// No engine or minter is deployed at this address.
    #[error("PM_ERR_404: Contract not found: {0}")]
    ContractNotFound(Address),

    /// Package has issued its full capacity.
    #[error("PM_ERR_429: Package {package} capacity exhausted ({capacity})")]
    CapacityExceeded { package: String, capacity: u64 },

    // =================================================================
    // Internal
    // =================================================================
    /// Supply conservation invariant violated. Critical.
    #[error("PM_ERR_500: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    /// Configuration error (bad config document, missing fields, ...).
    #[error("PM_ERR_500: Configuration error: {0}")]
    Configuration(String),

    /// Serialization / deserialization error.
    #[error("PM_ERR_500: Serialization error: {0}")]
    Serialization(String),

    /// Unrecoverable internal error.
    #[error("PM_ERR_500: Internal error: {0}")]
    Internal(String),

    /// Arithmetic overflowed while moving value.
    #[error("PM_ERR_500: Amount overflow: {lhs} + {rhs}")]
    AmountOverflow { lhs: Decimal, rhs: Decimal },
}

impl PackmintError {
    /// Short status code reported to callers ("400", "403", "429", ...).
    #[must_use]
    pub fn status(&self) -> &'static str {
        match self {
            Self::InvalidOrder { .. } | Self::PackageLocked { .. } => "400",
            Self::UnauthorizedSignature { .. } => "401",
            Self::PaymentFailed { .. } => "402",
            Self::OrderAlreadyFinalized(_) | Self::Forbidden { .. } => "403",
            Self::PackageNotFound(_)
            | Self::TokenNotFound(_)
            | Self::RegistryNotFound(_)
            | Self::ContractNotFound(_) => "404",
            Self::UnsupportedAsset(_) => "415",
            Self::CapacityExceeded { .. } => "429",
            Self::SupplyInvariantViolation { .. }
            | Self::Configuration(_)
            | Self::Serialization(_)
            | Self::Internal(_)
            | Self::AmountOverflow { .. } => "500",
        }
    }

    /// Failure class of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidOrder { .. } => ErrorKind::Validation,
            Self::UnauthorizedSignature { .. } | Self::Forbidden { .. } => {
                ErrorKind::Authorization
            }
            Self::OrderAlreadyFinalized(_) => ErrorKind::Replay,
            Self::CapacityExceeded { .. } => ErrorKind::Capacity,
            Self::PackageLocked { .. } => ErrorKind::State,
            Self::UnsupportedAsset(_) | Self::PaymentFailed { .. } => ErrorKind::Asset,
            Self::PackageNotFound(_)
            | Self::TokenNotFound(_)
            | Self::RegistryNotFound(_)
            | Self::ContractNotFound(_) => ErrorKind::NotFound,
            Self::SupplyInvariantViolation { .. }
            | Self::Configuration(_)
            | Self::Serialization(_)
            | Self::Internal(_)
            | Self::AmountOverflow { .. } => ErrorKind::Internal,
        }
    }

    /// Shorthand for [`PackmintError::Forbidden`].
    pub fn forbidden(action: impl Into<String>) -> Self {
        Self::Forbidden {
            action: action.into(),
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, PackmintError>;

impl From<serde_json::Error> for PackmintError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
