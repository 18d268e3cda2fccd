//! Package Capacity Registry.
//!
//! Owns package definitions, per-package issuance counters and the token
//! table. The only way in for value-bearing callers is [`PackageRegistry::mint_to`],
//! gated on the `Minter` capability.
//!
//! ## Token URI resolution
//!
//! First match wins:
//! 1. explicit per-token URI stored at mint time
//! 2. configured base URI + id
//! 3. self-contained descriptor synthesized from the package ([`crate::metadata`])

use packmint_types::constants::FIRST_TOKEN_ID;
use packmint_types::{
    AccessTable, Address, Capability, JournalCell, JournalMap, Journaled, Package, PackageState,
    PackmintError, RegistryConfig, Result, TokenId,
};
use serde::{Deserialize, Serialize};

use crate::metadata;

/// A package definition plus how many tokens it has issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageEntry {
    pub package: Package,
    pub issued: u64,
}

impl PackageEntry {
    #[must_use]
    pub fn state(&self) -> PackageState {
        PackageState::of(true, self.issued)
    }

    fn has_room(&self) -> bool {
        self.issued < self.package.capacity
    }
}

/// One issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub package: String,
    pub owner: Address,
    /// Explicit URI supplied at mint time, if any.
    pub uri: Option<String>,
}

/// A package registry deployed at `address`.
#[derive(Debug, Clone)]
pub struct PackageRegistry {
    address: Address,
    name: String,
    symbol: String,
    /// Creator; the default payout address for orders against this registry.
    owner: Address,
    access: AccessTable,
    config: JournalCell<RegistryConfig>,
    packages: JournalMap<String, PackageEntry>,
    tokens: JournalMap<TokenId, TokenRecord>,
    balances: JournalMap<Address, u64>,
    next_id: JournalCell<TokenId>,
}

impl PackageRegistry {
    /// Create a registry. `owner` holds `{Owner, Minter}`.
    #[must_use]
    pub fn new(
        address: Address,
        name: impl Into<String>,
        symbol: impl Into<String>,
        owner: Address,
    ) -> Self {
        Self {
            address,
            name: name.into(),
            symbol: symbol.into(),
            owner,
            access: AccessTable::with_owner(owner, &[Capability::Minter]),
            config: JournalCell::default(),
            packages: JournalMap::new(),
            tokens: JournalMap::new(),
            balances: JournalMap::new(),
            next_id: JournalCell::new(TokenId(FIRST_TOKEN_ID)),
        }
    }

    // ─── Owner operations ─────────────────────────────────────────────

    /// Create or fully replace a package definition.
    ///
    /// # Errors
    /// - `Forbidden` if `caller` is not an owner
    /// - `PackageLocked` if the package already issued a token
    pub fn set_package(&mut self, caller: &Address, package: Package) -> Result<()> {
        self.access
            .require(caller, Capability::Owner, "set_package")?;

        let state = self.package_state(&package.name);
        if !state.accepts_definition() {
            let issued = self.package_token_count(&package.name);
            tracing::warn!(
                registry = %self.address.short(),
                package = %package.name,
                issued,
                "Redefinition of locked package rejected"
            );
            return Err(PackmintError::PackageLocked {
                package: package.name,
                issued,
            });
        }

        tracing::info!(
            registry = %self.address.short(),
            package = %package.name,
            capacity = package.capacity,
            "Package defined"
        );
        self.packages.insert(
            package.name.clone(),
            PackageEntry { package, issued: 0 },
        );
        Ok(())
    }

    /// Replace the registry configuration. Bumps the version.
    ///
    /// # Errors
    /// Returns `Forbidden` if `caller` is not an owner.
    pub fn set_config(&mut self, caller: &Address, config: RegistryConfig) -> Result<()> {
        self.access.require(caller, Capability::Owner, "set_config")?;
        let version = self.config.get().version + 1;
        self.config.set(RegistryConfig { version, ..config });
        tracing::info!(
            registry = %self.address.short(),
            version,
            base_uri = self.config.get().base_uri().unwrap_or("-"),
            "Registry config updated"
        );
        Ok(())
    }

    /// # Errors
    /// Returns `Forbidden` if `caller` is not an owner.
    pub fn grant_capability(
        &mut self,
        caller: &Address,
        who: Address,
        cap: Capability,
    ) -> Result<()> {
        self.access.grant(caller, who, cap)?;
        tracing::info!(registry = %self.address.short(), who = %who.short(), %cap, "Capability granted");
        Ok(())
    }

    /// # Errors
    /// Returns `Forbidden` if `caller` is not an owner, or if this would
    /// remove the last owner.
    pub fn revoke_capability(
        &mut self,
        caller: &Address,
        who: &Address,
        cap: Capability,
    ) -> Result<()> {
        self.access.revoke(caller, who, cap)?;
        tracing::info!(registry = %self.address.short(), who = %who.short(), %cap, "Capability revoked");
        Ok(())
    }

    // ─── Minting ──────────────────────────────────────────────────────

    /// Issue the next token of package `name` to `recipient`.
    ///
    /// A non-empty `uri_override` is stored and wins URI resolution.
    ///
    /// # Errors
    /// - `Forbidden` if `caller` lacks `Minter`
    /// - `PackageNotFound` if `name` is undefined
    /// - `CapacityExceeded` if the package is full
    pub fn mint_to(
        &mut self,
        caller: &Address,
        recipient: Address,
        name: &str,
        uri_override: &str,
    ) -> Result<TokenId> {
        if let Err(e) = self.access.require(caller, Capability::Minter, "mint_to") {
            tracing::warn!(
                registry = %self.address.short(),
                caller = %caller.short(),
                "Mint by non-minter rejected"
            );
            return Err(e);
        }

        let entry = self
            .packages
            .get(name)
            .ok_or_else(|| PackmintError::PackageNotFound(name.to_owned()))?;
        if !entry.has_room() {
            return Err(PackmintError::CapacityExceeded {
                package: name.to_owned(),
                capacity: entry.package.capacity,
            });
        }
        let issued = PackageEntry {
            issued: entry.issued + 1,
            ..entry.clone()
        };
        self.packages.insert(name.to_owned(), issued);

        let id = *self.next_id.get();
        self.next_id.set(id.next());
        self.tokens.insert(
            id,
            TokenRecord {
                package: name.to_owned(),
                owner: recipient,
                uri: (!uri_override.is_empty()).then(|| uri_override.to_owned()),
            },
        );
        *self.balances.get_or_default(recipient) += 1;

        tracing::info!(
            registry = %self.address.short(),
            package = name,
            token_id = %id,
            recipient = %recipient.short(),
            "Token minted"
        );
        Ok(id)
    }

    // ─── Reads ────────────────────────────────────────────────────────

    /// Resolve the URI of token `id`.
    ///
    /// # Errors
    /// Returns `TokenNotFound` for an unknown id.
    pub fn token_uri(&self, id: TokenId) -> Result<String> {
        let token = self.tokens.get(&id).ok_or(PackmintError::TokenNotFound(id))?;

        if let Some(uri) = &token.uri {
            return Ok(uri.clone());
        }
        if let Some(base) = self.config.get().base_uri() {
            return Ok(format!("{base}{id}"));
        }
        let entry = self
            .packages
            .get(&token.package)
            .ok_or_else(|| PackmintError::Internal(format!("token {id} has no package")))?;
        metadata::descriptor_uri(id, &entry.package)
    }

    /// Definition of package `name`.
    #[must_use]
    pub fn package(&self, name: &str) -> Option<&Package> {
        self.packages.get(name).map(|e| &e.package)
    }

    /// Tokens issued so far against `name`. Zero for unknown packages.
    #[must_use]
    pub fn package_token_count(&self, name: &str) -> u64 {
        self.packages.get(name).map_or(0, |e| e.issued)
    }

    #[must_use]
    pub fn package_state(&self, name: &str) -> PackageState {
        self.packages
            .get(name)
            .map_or(PackageState::Undefined, PackageEntry::state)
    }

    /// Package a token was minted against. `None` for unknown ids.
    #[must_use]
    pub fn token_package(&self, id: TokenId) -> Option<&str> {
        self.tokens.get(&id).map(|t| t.package.as_str())
    }

    #[must_use]
    pub fn owner_of(&self, id: TokenId) -> Option<Address> {
        self.tokens.get(&id).map(|t| t.owner)
    }

    #[must_use]
    pub fn balance_of(&self, who: &Address) -> u64 {
        self.balances.get(who).copied().unwrap_or(0)
    }

    /// Total tokens issued across all packages.
    #[must_use]
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn has_capability(&self, who: &Address, cap: Capability) -> bool {
        self.access.has(who, cap)
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    #[must_use]
    pub fn owner(&self) -> Address {
        self.owner
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        self.config.get()
    }
}

impl Journaled for PackageRegistry {
    fn commit(&mut self) {
        self.access.commit();
        self.config.commit();
        self.packages.commit();
        self.tokens.commit();
        self.balances.commit();
        self.next_id.commit();
    }

    fn rollback(&mut self) {
        self.access.rollback();
        self.config.rollback();
        self.packages.rollback();
        self.tokens.rollback();
        self.balances.rollback();
        self.next_id.rollback();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P1_DESCRIPTOR: &str = "data:application/json;base64,eyJuYW1lIjoiIzEiLCJkZXNjcmlwdGlvbiI6IlBEMSIsImltYWdlIjoiZGF0YTppbWFnZS9zdmcreG1sO2Jhc2U2NCxQSE4yWnlCM2FXUjBhRDBpTnpBd0lpQm9aV2xuYUhROUlqTXdNQ0lnZUcxc2JuTTlJbWgwZEhBNkx5OTNkM2N1ZHpNdWIzSm5Mekl3TURBdmMzWm5JajQ4Y21WamRDQjNhV1IwYUQwaU1UQXdKU0lnYUdWcFoyaDBQU0l4TURBbElpQnpkSGxzWlQwaVptbHNiRG9qTURsbUlpOCtQR2NnYzNSNWJHVTlJbVJ2YldsdVlXNTBMV0poYzJWc2FXNWxPbTFwWkdSc1pUdDBaWGgwTFdGdVkyaHZjanB0YVdSa2JHVTdabTl1ZEMxemFYcGxPakl3TUR0bWIyNTBMWGRsYVdkb2REcGliMnhrT3lJK1BHUmxabk0rUEdacGJIUmxjaUJwWkQwaWMyaGhaRzkzSWo0OFptVkhZWFZ6YzJsaGJrSnNkWElnYzNSa1JHVjJhV0YwYVc5dVBTSXlJRElpSUhKbGMzVnNkRDBpYzJoaFpHOTNJaTgrUEdabFQyWm1jMlYwSUdSNFBTSTJJaUJrZVQwaU5pSXZQand2Wm1sc2RHVnlQand2WkdWbWN6NDhkR1Y0ZENCNFBTSTFNQ1VpSUhrOUlqVTBKU0lnYzNSNWJHVTlJbVpwYkhSbGNqcDFjbXdvSTNOb1lXUnZkeWs3Wm1sc2JEcGliR0ZqYXlJK01Ud3ZkR1Y0ZEQ0OGRHVjRkQ0I0UFNJMU1DVWlJSGs5SWpVMEpTSWdjM1I1YkdVOUltWnBiR3c2ZDJocGRHVWlQakU4TDNSbGVIUStQQzluUGp3dmMzWm5QZz09IiwiYXR0cmlidXRlcyI6W3sidHJhaXRfdHlwZSI6InBhY2thZ2UiLCJ2YWx1ZSI6IlAxIn1dfQ==";

    fn owner() -> Address {
        Address::derive("owner")
    }

    fn alice() -> Address {
        Address::derive("alice")
    }

    fn registry() -> PackageRegistry {
        let mut reg = PackageRegistry::new(Address::derive("registry"), "Packs", "PK", owner());
        reg.set_package(&owner(), Package::new("P1", "PD1", 10, "#09f"))
            .unwrap();
        reg
    }

    #[test]
    fn owner_holds_owner_and_minter() {
        let reg = registry();
        assert!(reg.has_capability(&owner(), Capability::Owner));
        assert!(reg.has_capability(&owner(), Capability::Minter));
        assert!(!reg.has_capability(&alice(), Capability::Minter));
    }

    #[test]
    fn untouched_package_can_be_redefined() {
        let mut reg = registry();
        reg.set_package(&owner(), Package::new("P1", "other", 3, "#fff"))
            .unwrap();
        let p = reg.package("P1").unwrap();
        assert_eq!(p.capacity, 3);
        assert_eq!(p.description, "other");
        assert_eq!(reg.package_state("P1"), PackageState::Defined);
    }

    #[test]
    fn minted_package_is_locked() {
        let mut reg = registry();
        reg.mint_to(&owner(), alice(), "P1", "").unwrap();
        let err = reg
            .set_package(&owner(), Package::new("P1", "PD1", 10, "#09f"))
            .unwrap_err();
        assert_eq!(err.status(), "400");
        assert!(matches!(err, PackmintError::PackageLocked { issued: 1, .. }));
        assert_eq!(reg.package_state("P1"), PackageState::Locked);
    }

    #[test]
    fn non_owner_cannot_define() {
        let mut reg = registry();
        let err = reg
            .set_package(&alice(), Package::new("P2", "", 1, ""))
            .unwrap_err();
        assert_eq!(err.status(), "403");
        assert!(reg.package("P2").is_none());
    }

    #[test]
    fn capacity_is_enforced() {
        let mut reg = registry();
        reg.set_package(&owner(), Package::new("P1", "PD1", 1, "#09f"))
            .unwrap();
        reg.mint_to(&owner(), alice(), "P1", "").unwrap();
        let err = reg.mint_to(&owner(), alice(), "P1", "").unwrap_err();
        assert_eq!(err.status(), "429");
        assert_eq!(reg.package_token_count("P1"), 1);
    }

    #[test]
    fn non_minter_rejected() {
        let mut reg = registry();
        let err = reg.mint_to(&alice(), alice(), "P1", "").unwrap_err();
        assert_eq!(err.status(), "403");
        assert_eq!(reg.token_count(), 0);
    }

    #[test]
    fn granted_minter_can_mint_until_revoked() {
        let mut reg = registry();
        let minter = Address::derive("minter");
        reg.grant_capability(&owner(), minter, Capability::Minter)
            .unwrap();
        reg.mint_to(&minter, alice(), "P1", "").unwrap();
        reg.revoke_capability(&owner(), &minter, Capability::Minter)
            .unwrap();
        assert!(reg.mint_to(&minter, alice(), "P1", "").is_err());
    }

    #[test]
    fn unknown_package_not_found() {
        let mut reg = registry();
        let err = reg.mint_to(&owner(), alice(), "nope", "").unwrap_err();
        assert_eq!(err.status(), "404");
    }

    #[test]
    fn ids_are_global_and_monotonic() {
        let mut reg = registry();
        reg.set_package(&owner(), Package::new("P2", "PD2", 5, "#000"))
            .unwrap();
        assert_eq!(reg.mint_to(&owner(), alice(), "P1", "").unwrap(), TokenId(1));
        assert_eq!(reg.mint_to(&owner(), alice(), "P2", "").unwrap(), TokenId(2));
        assert_eq!(reg.mint_to(&owner(), alice(), "P1", "").unwrap(), TokenId(3));
        assert_eq!(reg.token_package(TokenId(2)), Some("P2"));
        assert_eq!(reg.owner_of(TokenId(3)), Some(alice()));
        assert_eq!(reg.balance_of(&alice()), 3);
        assert_eq!(reg.package_token_count("P1"), 2);
    }

    #[test]
    fn read_accessors_on_empty_state() {
        let reg = registry();
        assert_eq!(reg.package_token_count("P1"), 0);
        assert_eq!(reg.token_package(TokenId(1)), None);
        assert!(matches!(
            reg.token_uri(TokenId(1)),
            Err(PackmintError::TokenNotFound(TokenId(1)))
        ));
    }

    #[test]
    fn descriptor_matches_reference_bytes() {
        let mut reg = registry();
        let id = reg.mint_to(&owner(), alice(), "P1", "").unwrap();
        assert_eq!(reg.token_uri(id).unwrap(), P1_DESCRIPTOR);
    }

    #[test]
    fn base_uri_then_override() {
        let mut reg = registry();
        reg.set_config(&owner(), RegistryConfig::with_base_uri("/uri/"))
            .unwrap();
        let plain = reg.mint_to(&owner(), alice(), "P1", "").unwrap();
        let explicit = reg.mint_to(&owner(), alice(), "P1", "/uri/99").unwrap();
        assert_eq!(reg.token_uri(plain).unwrap(), "/uri/1");
        assert_eq!(reg.token_uri(explicit).unwrap(), "/uri/99");
        assert_eq!(reg.config().version, 1);
    }

    #[test]
    fn set_config_is_owner_only() {
        let mut reg = registry();
        let err = reg
            .set_config(&alice(), RegistryConfig::with_base_uri("/x/"))
            .unwrap_err();
        assert_eq!(err.status(), "403");
        assert!(reg.config().base_uri().is_none());
    }

    #[test]
    fn rollback_unwinds_mints_and_locks() {
        let mut reg = registry();
        reg.mint_to(&owner(), alice(), "P1", "").unwrap();
        reg.commit();

        reg.mint_to(&owner(), alice(), "P1", "/a").unwrap();
        reg.set_config(&owner(), RegistryConfig::with_base_uri("/x/"))
            .unwrap();
        reg.rollback();

        assert_eq!(reg.package_token_count("P1"), 1);
        assert_eq!(reg.token_count(), 1);
        assert_eq!(reg.balance_of(&alice()), 1);
        assert!(reg.config().base_uri().is_none());
        assert_eq!(reg.mint_to(&owner(), alice(), "P1", "").unwrap(), TokenId(2));
    }

    #[test]
    fn sole_owner_cannot_revoke_itself() {
        let mut reg = registry();
        let err = reg
            .revoke_capability(&owner(), &owner(), Capability::Owner)
            .unwrap_err();
        assert_eq!(err.status(), "403");
        reg.set_package(&owner(), Package::new("P2", "PD2", 1, ""))
            .unwrap();
    }
}
