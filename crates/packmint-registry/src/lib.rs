//! # packmint-registry
//!
//! **Package Capacity Registry**: named packages with a fixed issuable
//! supply, and the tokens minted against them.
//!
//! ## Invariants
//!
//! - `issued(name) <= capacity(name)` for every package, always.
//! - Once a package has issued a token its definition is frozen.
//! - Token ids are global within a registry, monotonic, 1-based.
//!
//! ## Components
//!
//! - [`PackageRegistry`]: definitions, issuance counters, token table, URI resolution
//! - [`metadata`]: self-contained token descriptor synthesis
//! - [`RegistryBook`]: every registry deployed in the environment
//! - [`AllowlistMinter`]: payment-free minting for an owner-managed allowlist

pub mod allowlist;
pub mod book;
pub mod metadata;
pub mod registry;

pub use allowlist::AllowlistMinter;
pub use book::RegistryBook;
pub use registry::PackageRegistry;
