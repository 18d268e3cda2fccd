//! Address → fungible-token contract lookup.

use packmint_types::{Address, JournalBook, Journaled, PackmintError, Result};

use crate::fungible::FungibleToken;

/// Every fungible-token contract deployed in the environment.
#[derive(Debug, Clone, Default)]
pub struct AssetBook {
    tokens: JournalBook<FungibleToken>,
}

impl AssetBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token contract at its own address.
    ///
    /// # Errors
    /// Returns `Configuration` if the address is already taken.
    pub fn deploy(&mut self, token: FungibleToken) -> Result<Address> {
        let address = token.address();
        let symbol = token.symbol().to_owned();
        if !self.tokens.deploy(address, token) {
            return Err(PackmintError::Configuration(format!(
                "token address {address} already in use"
            )));
        }
        tracing::info!(token = %symbol, address = %address.short(), "Fungible token deployed");
        Ok(address)
    }

    /// # Errors
    /// Returns `UnsupportedAsset` if nothing fungible lives at `address`.
    pub fn fungible(&self, address: &Address) -> Result<&FungibleToken> {
        self.tokens
            .get(address)
            .ok_or(PackmintError::UnsupportedAsset(*address))
    }

    /// # Errors
    /// Returns `UnsupportedAsset` if nothing fungible lives at `address`.
    pub fn fungible_mut(&mut self, address: &Address) -> Result<&mut FungibleToken> {
        self.tokens
            .get_mut(address)
            .ok_or(PackmintError::UnsupportedAsset(*address))
    }

    /// # Errors
    /// Returns the first `SupplyInvariantViolation` across all tokens.
    pub fn verify_supply(&self) -> Result<()> {
        self.tokens.values().try_for_each(FungibleToken::verify_supply)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Journaled for AssetBook {
    fn commit(&mut self) {
        self.tokens.commit();
    }

    fn rollback(&mut self) {
        self.tokens.rollback();
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn unknown_address_is_unsupported() {
        let book = AssetBook::new();
        let stranger = Address::derive("plain-account");
        let err = book.fungible(&stranger).unwrap_err();
        assert!(matches!(err, PackmintError::UnsupportedAsset(a) if a == stranger));
    }

    #[test]
    fn deployed_token_is_found() {
        let mut book = AssetBook::new();
        let addr = book
            .deploy(FungibleToken::new(
                Address::derive("usd"),
                "USD",
                Decimal::ONE,
                Address::derive("holder"),
            ))
            .unwrap();
        assert_eq!(book.fungible(&addr).unwrap().symbol(), "USD");
        assert_eq!(book.len(), 1);
        book.verify_supply().unwrap();
    }

    #[test]
    fn duplicate_address_rejected() {
        let mut book = AssetBook::new();
        let holder = Address::derive("holder");
        book.deploy(FungibleToken::new(Address::derive("usd"), "USD", Decimal::ONE, holder))
            .unwrap();
        let err = book
            .deploy(FungibleToken::new(Address::derive("usd"), "FAKE", Decimal::TEN, holder))
            .unwrap_err();
        assert_eq!(err.status(), "500");
        assert_eq!(book.fungible(&Address::derive("usd")).unwrap().symbol(), "USD");
    }
}
