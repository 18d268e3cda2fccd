//! Package definitions.
//!
//! A package is a named, capacity-bounded issuance line within a registry.
//!
//! ## State Machine
//!
//! ```text
//!   ┌───────────┐ set_package ┌─────────┐ first mint ┌────────┐
//!   │ UNDEFINED ├────────────▶│ DEFINED ├───────────▶│ LOCKED │
//!   └───────────┘             └──┬──────┘            └────────┘
//!                                │ set_package (upsert)
//!                                └──────▶ DEFINED
//! ```
//!
//! Once `LOCKED` only issuance moves; the definition is immutable.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a package name within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PackageState {
    Undefined,
    /// Defined with no tokens issued. Redefinition allowed.
    Defined,
    /// At least one token issued. Definition frozen.
    Locked,
}

impl PackageState {
    /// State of a package given whether it is defined and how many tokens it issued.
    #[must_use]
    pub fn of(defined: bool, issued: u64) -> Self {
        match (defined, issued) {
            (false, _) => Self::Undefined,
            (true, 0) => Self::Defined,
            (true, _) => Self::Locked,
        }
    }

    /// Whether `set_package` may (re)define a package in this state.
    #[must_use]
    pub fn accepts_definition(&self) -> bool {
        !matches!(self, Self::Locked)
    }
}

impl std::fmt::Display for PackageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Undefined => write!(f, "UNDEFINED"),
            Self::Defined => write!(f, "DEFINED"),
            Self::Locked => write!(f, "LOCKED"),
        }
    }
}

/// A package definition as supplied by the registry owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// Unique key within the registry.
    pub name: String,
    pub description: String,
    /// Maximum number of tokens ever issuable.
    pub capacity: u64,
    /// Colour (`#09f`) or asset reference used as the token image.
    pub cover: String,
}

impl Package {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        capacity: u64,
        cover: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            capacity,
            cover: cover.into(),
        }
    }

    #[must_use]
    pub fn cover(&self) -> Cover<'_> {
        Cover::parse(&self.cover)
    }
}

/// Interpretation of a package's `cover` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cover<'a> {
    /// Fill colour for the generated card. May be empty.
    Color(&'a str),
    /// Image reference used verbatim.
    Reference(&'a str),
}

impl<'a> Cover<'a> {
    /// Empty or `#`-prefixed values are colours, anything else is a reference.
    #[must_use]
    pub fn parse(raw: &'a str) -> Self {
        if raw.is_empty() || raw.starts_with('#') {
            Self::Color(raw)
        } else {
            Self::Reference(raw)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_follows_issuance() {
        assert_eq!(PackageState::of(false, 0), PackageState::Undefined);
        assert_eq!(PackageState::of(true, 0), PackageState::Defined);
        assert_eq!(PackageState::of(true, 3), PackageState::Locked);
    }

    #[test]
    fn locked_rejects_definition() {
        assert!(PackageState::Undefined.accepts_definition());
        assert!(PackageState::Defined.accepts_definition());
        assert!(!PackageState::Locked.accepts_definition());
    }

    #[test]
    fn cover_parsing() {
        assert_eq!(Cover::parse("#09f"), Cover::Color("#09f"));
        assert_eq!(Cover::parse(""), Cover::Color(""));
        assert_eq!(
            Cover::parse("ipfs://cover.png"),
            Cover::Reference("ipfs://cover.png")
        );
    }

    #[test]
    fn serde_roundtrip() {
        let pkg = Package::new("P1", "PD1", 2, "#09f");
        let json = serde_json::to_string(&pkg).unwrap();
        let back: Package = serde_json::from_str(&json).unwrap();
        assert_eq!(pkg, back);
    }
}
