//! Allowlist minter.
//!
//! Mints directly through [`PackageRegistry::mint_to`] for identities on an
//! owner-managed allowlist, with no payment. The registry sees the minter's
//! own address as the caller, so it must have been granted `Minter` there.

use packmint_types::{Address, JournalSet, Journaled, PackmintError, Result, TokenId};

use crate::book::RegistryBook;

#[derive(Debug, Clone)]
pub struct AllowlistMinter {
    address: Address,
    owner: Address,
    minters: JournalSet<Address>,
}

impl AllowlistMinter {
    /// The owner is allowlisted from construction.
    #[must_use]
    pub fn new(address: Address, owner: Address) -> Self {
        Self {
            address,
            owner,
            minters: [owner].into_iter().collect(),
        }
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
    pub fn is_minter(&self, who: &Address) -> bool {
        self.minters.contains(who)
    }

    /// # Errors
    /// Returns `Forbidden` if `caller` is not the owner.
    pub fn set_minter(&mut self, caller: &Address, who: Address) -> Result<()> {
        self.set_minters(caller, &[who])
    }

    /// # Errors
    /// Returns `Forbidden` if `caller` is not the owner.
    pub fn set_minters(&mut self, caller: &Address, who: &[Address]) -> Result<()> {
        self.require_owner(caller, "set_minters")?;
        for addr in who {
            self.minters.insert(*addr);
        }
        tracing::info!(minter = %self.address.short(), added = who.len(), "Allowlist extended");
        Ok(())
    }

    /// # Errors
    /// Returns `Forbidden` if `caller` is not the owner.
    pub fn revoke_minter(&mut self, caller: &Address, who: &Address) -> Result<()> {
        self.revoke_minters(caller, std::slice::from_ref(who))
    }

    /// # Errors
    /// Returns `Forbidden` if `caller` is not the owner.
    pub fn revoke_minters(&mut self, caller: &Address, who: &[Address]) -> Result<()> {
        self.require_owner(caller, "revoke_minters")?;
        for addr in who {
            self.minters.remove(addr);
        }
        tracing::info!(minter = %self.address.short(), removed = who.len(), "Allowlist reduced");
        Ok(())
    }

    /// Mint one token of `package` on `registry` to `recipient`.
    ///
    /// # Errors
    /// - `Forbidden` if `caller` is not allowlisted
    /// - `RegistryNotFound` for an unknown registry
    /// - anything [`PackageRegistry::mint_to`](crate::PackageRegistry::mint_to) returns
    pub fn mint(
        &self,
        caller: &Address,
        registries: &mut RegistryBook,
        registry: &Address,
        recipient: Address,
        package: &str,
        uri: &str,
    ) -> Result<TokenId> {
        if !self.is_minter(caller) {
            tracing::warn!(caller = %caller.short(), "Allowlist mint by unlisted caller");
            return Err(PackmintError::forbidden(format!(
                "allowlist mint (caller {})",
                caller.short()
            )));
        }
        registries
            .get_mut(registry)?
            .mint_to(&self.address, recipient, package, uri)
    }

    fn require_owner(&self, caller: &Address, action: &str) -> Result<()> {
        if *caller == self.owner {
            Ok(())
        } else {
            Err(PackmintError::forbidden(format!(
                "{action} requires the allowlist owner (caller {})",
                caller.short()
            )))
        }
    }
}

impl Journaled for AllowlistMinter {
    fn commit(&mut self) {
        self.minters.commit();
    }

    fn rollback(&mut self) {
        self.minters.rollback();
    }
}
