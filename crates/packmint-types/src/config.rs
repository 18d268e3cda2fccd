//! Configuration records for settlement engines and registries.
//!
//! Both records are versioned: every administrator mutation bumps
//! `version`, so logs and receipts can name the configuration an order was
//! settled under.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Address, PackmintError, Result};

/// What to do when more native value is attached than the order's amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExcessPaymentPolicy {
    /// Return the excess to the caller inside the same transaction.
    #[default]
    Refund,
    /// Treat any excess as a malformed order.
    Reject,
}

/// What to do with a non-zero fee when no fee recipient is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnroutedFeePolicy {
    /// The fee is paid to the project recipient along with the payout.
    #[default]
    FoldIntoProject,
    /// Treat the order as malformed.
    Reject,
}

/// Settlement engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// The only identity whose signatures authorize orders.
    pub verifier: Address,
    /// Where fees go. `None` means fees follow [`UnroutedFeePolicy`].
    #[serde(default)]
    pub fee_recipient: Option<Address>,
    /// Registry → payout address. Unlisted registries pay their owner.
    #[serde(default)]
    pub project_recipients: BTreeMap<Address, Address>,
    #[serde(default)]
    pub excess_payment: ExcessPaymentPolicy,
    #[serde(default)]
    pub unrouted_fee: UnroutedFeePolicy,
    #[serde(default)]
    pub version: u64,
}

impl EngineConfig {
    /// Default configuration trusting `verifier`.
    #[must_use]
    pub fn new(verifier: Address) -> Self {
        Self {
            verifier,
            fee_recipient: None,
            project_recipients: BTreeMap::new(),
            excess_payment: ExcessPaymentPolicy::default(),
            unrouted_fee: UnroutedFeePolicy::default(),
            version: 0,
        }
    }

    /// Parse and validate a JSON configuration document.
    ///
    /// # Errors
    /// Returns [`PackmintError::Configuration`] on malformed JSON or a zero verifier.
    pub fn from_json(raw: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(raw)
            .map_err(|e| PackmintError::Configuration(format!("engine config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// # Errors
    /// Returns [`PackmintError::Configuration`] if the verifier is the zero address.
    pub fn validate(&self) -> Result<()> {
        if self.verifier.is_zero() {
            return Err(PackmintError::Configuration(
                "verifier must not be the zero address".into(),
            ));
        }
        Ok(())
    }
}

/// Package registry configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Prefix for token URIs. Empty means "not configured".
    #[serde(default)]
    pub base_uri: String,
    #[serde(default)]
    pub version: u64,
}

impl RegistryConfig {
    #[must_use]
    pub fn with_base_uri(base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            version: 0,
        }
    }

    /// # Errors
    /// Returns [`PackmintError::Configuration`] on malformed JSON.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| PackmintError::Configuration(format!("registry config: {e}")))
    }

    /// Configured base URI, if any.
    #[must_use]
    pub fn base_uri(&self) -> Option<&str> {
        (!self.base_uri.is_empty()).then_some(self.base_uri.as_str())
    }
}
