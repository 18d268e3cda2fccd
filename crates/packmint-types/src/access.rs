//! Flat capability table.
//!
//! Each identity holds a set of [`Capability`]s. Gated operations call
//! [`AccessTable::require`] first thing; there is no role hierarchy. The
//! last `Owner` cannot be revoked, so a table is never left unadministered.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{Address, JournalMap, Journaled, PackmintError, Result};

/// A named permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Capability {
    /// Administers the instance and grants/revokes capabilities.
    Owner,
    /// May issue tokens from a registry.
    Minter,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Owner => write!(f, "OWNER"),
            Self::Minter => write!(f, "MINTER"),
        }
    }
}

/// Identity → capability set.
#[derive(Debug, Clone, Default)]
pub struct AccessTable {
    grants: JournalMap<Address, BTreeSet<Capability>>,
}

impl AccessTable {
    /// Table with `owner` holding every listed capability.
    #[must_use]
    pub fn with_owner(owner: Address, extra: &[Capability]) -> Self {
        let mut set: BTreeSet<Capability> = extra.iter().copied().collect();
        set.insert(Capability::Owner);
        Self {
            grants: [(owner, set)].into_iter().collect(),
        }
    }

    #[must_use]
    pub fn has(&self, who: &Address, cap: Capability) -> bool {
        self.grants.get(who).is_some_and(|set| set.contains(&cap))
    }

    /// Fail with `Forbidden` unless `who` holds `cap`.
    ///
    /// # Errors
    /// Returns [`PackmintError::Forbidden`] naming `action`.
    pub fn require(&self, who: &Address, cap: Capability, action: &str) -> Result<()> {
        if self.has(who, cap) {
            Ok(())
        } else {
            Err(PackmintError::forbidden(format!(
                "{action} requires {cap} (caller {})",
                who.short()
            )))
        }
    }

    /// Grant `cap` to `who`. Only an owner may grant.
    ///
    /// # Errors
    /// Returns [`PackmintError::Forbidden`] if `caller` is not an owner.
    pub fn grant(&mut self, caller: &Address, who: Address, cap: Capability) -> Result<()> {
        self.require(caller, Capability::Owner, "grant")?;
        if !self.has(&who, cap) {
            self.grants.get_or_default(who).insert(cap);
        }
        Ok(())
    }

    /// Revoke `cap` from `who`. Only an owner may revoke.
    ///
    /// # Errors
    /// - [`PackmintError::Forbidden`] if `caller` is not an owner
    /// - [`PackmintError::Forbidden`] if `who` is the last owner
    pub fn revoke(&mut self, caller: &Address, who: &Address, cap: Capability) -> Result<()> {
        self.require(caller, Capability::Owner, "revoke")?;
        if !self.has(who, cap) {
            return Ok(());
        }
        if cap == Capability::Owner && self.holders(Capability::Owner).len() == 1 {
            return Err(PackmintError::forbidden(format!(
                "revoke of the last {cap} ({})",
                who.short()
            )));
        }
        let now_empty = self.grants.get_mut(who).is_some_and(|set| {
            set.remove(&cap);
            set.is_empty()
        });
        if now_empty {
            self.grants.remove(who);
        }
        Ok(())
    }

    /// Capabilities currently held by `who`.
    #[must_use]
    pub fn capabilities(&self, who: &Address) -> BTreeSet<Capability> {
        self.grants.get(who).cloned().unwrap_or_default()
    }

    /// Every identity holding `cap`.
    #[must_use]
    pub fn holders(&self, cap: Capability) -> Vec<Address> {
        self.grants
            .iter()
            .filter(|(_, set)| set.contains(&cap))
            .map(|(addr, _)| *addr)
            .collect()
    }
}

impl Journaled for AccessTable {
    fn commit(&mut self) {
        self.grants.commit();
    }

    fn rollback(&mut self) {
        self.grants.rollback();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Address {
        Address::derive("owner")
    }

    #[test]
    fn owner_holds_requested_capabilities() {
        let table = AccessTable::with_owner(owner(), &[Capability::Minter]);
        assert!(table.has(&owner(), Capability::Owner));
        assert!(table.has(&owner(), Capability::Minter));
        assert!(!table.has(&Address::derive("x"), Capability::Minter));
    }

    #[test]
    fn require_reports_forbidden() {
        let table = AccessTable::with_owner(owner(), &[]);
        let err = table
            .require(&Address::derive("x"), Capability::Minter, "mint_to")
            .unwrap_err();
        assert_eq!(err.status(), "403");
        assert!(format!("{err}").contains("mint_to"));
    }

    #[test]
    fn grant_and_revoke() {
        let mut table = AccessTable::with_owner(owner(), &[]);
        let minter = Address::derive("minter");
        table.grant(&owner(), minter, Capability::Minter).unwrap();
        assert!(table.has(&minter, Capability::Minter));
        assert_eq!(table.holders(Capability::Minter), vec![minter]);

        table.revoke(&owner(), &minter, Capability::Minter).unwrap();
        assert!(!table.has(&minter, Capability::Minter));
        assert!(table.capabilities(&minter).is_empty());
    }

    #[test]
    fn non_owner_cannot_grant() {
        let mut table = AccessTable::with_owner(owner(), &[]);
        let intruder = Address::derive("intruder");
        let err = table
            .grant(&intruder, intruder, Capability::Minter)
            .unwrap_err();
        assert!(matches!(err, PackmintError::Forbidden { .. }));
        assert!(!table.has(&intruder, Capability::Minter));
    }

    #[test]
    fn last_owner_cannot_be_revoked() {
        let mut table = AccessTable::with_owner(owner(), &[Capability::Minter]);
        let err = table
            .revoke(&owner(), &owner(), Capability::Owner)
            .unwrap_err();
        assert_eq!(err.status(), "403");
        assert!(table.has(&owner(), Capability::Owner));

        table.revoke(&owner(), &owner(), Capability::Minter).unwrap();
        assert!(!table.has(&owner(), Capability::Minter));
    }

    #[test]
    fn owner_can_hand_over_then_step_down() {
        let mut table = AccessTable::with_owner(owner(), &[]);
        let successor = Address::derive("successor");
        table.grant(&owner(), successor, Capability::Owner).unwrap();
        table.revoke(&owner(), &owner(), Capability::Owner).unwrap();
        assert_eq!(table.holders(Capability::Owner), vec![successor]);
        assert!(table.revoke(&successor, &successor, Capability::Owner).is_err());
    }

    #[test]
    fn rollback_undoes_grants() {
        let mut table = AccessTable::with_owner(owner(), &[]);
        let minter = Address::derive("minter");
        table.grant(&owner(), minter, Capability::Minter).unwrap();
        table.rollback();
        assert!(!table.has(&minter, Capability::Minter));
        assert!(table.has(&owner(), Capability::Owner));
    }
}
