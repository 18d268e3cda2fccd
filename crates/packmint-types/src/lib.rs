//! # packmint-types
//!
//! Shared types, errors, and configuration for **Packmint**.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`Address`], [`OrderHash`], [`TokenId`], [`TxId`]
//! - **Order model**: [`Order`], [`PaymentAsset`]
//! - **Package model**: [`Package`], [`PackageState`], [`Cover`]
//! - **Access control**: [`Capability`], [`AccessTable`]
//! - **Journaled state**: [`JournalMap`], [`JournalSet`], [`JournalCell`], [`JournalBook`]
//! - **Signatures**: [`OrderSignature`], [`OrderSigner`]
//! - **Configuration**: [`EngineConfig`], [`RegistryConfig`], and the policy enums
//! - **Receipts**: [`Receipt`], [`ReceiptType`]
//! - **Errors**: [`PackmintError`] with `PM_ERR_` prefixed messages
//! - **Constants**: domain separators and descriptor layout

pub mod access;
pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod journal;
pub mod order;
pub mod package;
pub mod receipt;
pub mod signature;

// Re-export all primary types at crate root for ergonomic imports:
//   use packmint_types::{Order, Address, PackmintError, ...};

pub use access::*;
pub use config::*;
pub use error::*;
pub use ids::*;
pub use journal::*;
pub use order::*;
pub use package::*;
pub use receipt::*;
pub use signature::*;

// Constants are accessed via `packmint_types::constants::FOO`
// (not re-exported to avoid name collisions).
