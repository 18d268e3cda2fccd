//! Address → registry lookup for the execution environment.

use packmint_types::{Address, JournalBook, Journaled, PackmintError, Result};

use crate::registry::PackageRegistry;

#[derive(Debug, Clone, Default)]
pub struct RegistryBook {
    registries: JournalBook<PackageRegistry>,
}

impl RegistryBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `registry` at its own address.
    ///
    /// # Errors
    /// Returns `Configuration` if the address is already taken.
    pub fn deploy(&mut self, registry: PackageRegistry) -> Result<Address> {
        let address = registry.address();
        let owner = registry.owner();
        let name = registry.name().to_owned();
        if !self.registries.deploy(address, registry) {
            return Err(PackmintError::Configuration(format!(
                "registry address {address} already in use"
            )));
        }
        tracing::info!(
            registry = %address.short(),
            name = %name,
            owner = %owner.short(),
            "Registry deployed"
        );
        Ok(address)
    }

    /// # Errors
    /// Returns `RegistryNotFound` for an unknown address.
    pub fn get(&self, address: &Address) -> Result<&PackageRegistry> {
        self.registries
            .get(address)
            .ok_or(PackmintError::RegistryNotFound(*address))
    }

    /// # Errors
    /// Returns `RegistryNotFound` for an unknown address.
    pub fn get_mut(&mut self, address: &Address) -> Result<&mut PackageRegistry> {
        self.registries
            .get_mut(address)
            .ok_or(PackmintError::RegistryNotFound(*address))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.registries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registries.is_empty()
    }
}

impl Journaled for RegistryBook {
    fn commit(&mut self) {
        self.registries.commit();
    }

    fn rollback(&mut self) {
        self.registries.rollback();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deploy_then_lookup() {
        let mut book = RegistryBook::new();
        let owner = Address::derive("owner");
        let addr = book
            .deploy(PackageRegistry::new(Address::derive("r1"), "R1", "R", owner))
            .unwrap();
        assert_eq!(book.get(&addr).unwrap().owner(), owner);
        assert!(book.get_mut(&addr).is_ok());
    }

    #[test]
    fn unknown_registry_not_found() {
        let book = RegistryBook::new();
        let err = book.get(&Address::derive("ghost")).unwrap_err();
        assert_eq!(err.status(), "404");
    }

    #[test]
    fn duplicate_address_rejected() {
        let mut book = RegistryBook::new();
        let owner = Address::derive("owner");
        book.deploy(PackageRegistry::new(Address::derive("r"), "A", "A", owner))
            .unwrap();
        assert!(
            book.deploy(PackageRegistry::new(Address::derive("r"), "B", "B", owner))
                .is_err()
        );
        assert_eq!(book.get(&Address::derive("r")).unwrap().name(), "A");
    }
}
