//! # packmint-assets
//!
//! **Payment rails** the settlement engine moves value over.
//!
//! ## Components
//!
//! 1. **NativeLedger**: per-identity balances of the environment's base asset
//! 2. **FungibleToken**: a fungible-token contract with allowance-gated pulls
//! 3. **AssetBook**: address → fungible-token contract lookup
//! 4. **SupplyConservation**: per-asset issuance tracking and the invariant
//!    `Σ balances == Σ issued`
//!
//! Settlement only moves value between identities; it never creates or
//! destroys it. `verify_supply` after every settled order must hold.

pub mod book;
pub mod fungible;
pub mod native;
pub mod supply_conservation;

pub use book::AssetBook;
pub use fungible::FungibleToken;
pub use native::NativeLedger;
pub use supply_conservation::SupplyConservation;
