//! Order endorsement signatures.
//!
//! The issuer signs the 32-byte [`OrderHash`] with ed25519. Because an
//! [`Address`] is the raw public key, "recovering" the signer means verifying
//! the signature against the claimed key and, on success, returning it.

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Address, OrderHash, PackmintError, Result};

/// An ed25519 signature over an order digest plus the claimed signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSignature {
    /// Claimed signer. Only trusted after [`OrderSignature::recover`].
    pub signer: Address,
    /// Raw 64-byte signature, hex in serialized form.
    #[serde(with = "hex_sig")]
    pub bytes: [u8; 64],
}

impl OrderSignature {
    /// Verify over `digest` and return the signer identity.
    ///
    /// # Errors
    /// Returns [`PackmintError::UnauthorizedSignature`] if the claimed key is
    /// not a valid ed25519 point or the signature does not verify.
    pub fn recover(&self, digest: &OrderHash) -> Result<Address> {
        let key = VerifyingKey::from_bytes(self.signer.as_bytes()).map_err(|e| {
            PackmintError::UnauthorizedSignature {
                reason: format!("malformed signer key: {e}"),
            }
        })?;
        let signature = Signature::from_bytes(&self.bytes);
        key.verify_strict(digest.as_bytes(), &signature)
            .map_err(|_| PackmintError::UnauthorizedSignature {
                reason: format!("signature does not verify for {}", self.signer.short()),
            })?;
        Ok(self.signer)
    }
}

/// Issuer-side key. Does not implement `Serialize`; the private key never
/// leaves this struct.
pub struct OrderSigner {
    signing_key: SigningKey,
}

impl OrderSigner {
    /// Deterministic signer from a 32-byte seed.
    #[must_use]
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// Fresh signer from the operating system RNG.
    #[cfg(any(test, feature = "test-helpers"))]
    #[must_use]
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut rand::rngs::OsRng),
        }
    }

    /// Identity of this signer.
    #[must_use]
    pub fn address(&self) -> Address {
        Address(self.signing_key.verifying_key().to_bytes())
    }

    /// Endorse an order digest.
    #[must_use]
    pub fn sign(&self, digest: &OrderHash) -> OrderSignature {
        OrderSignature {
            signer: self.address(),
            bytes: self.signing_key.sign(digest.as_bytes()).to_bytes(),
        }
    }
}

impl std::fmt::Debug for OrderSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderSigner({})", self.address().short())
    }
}

mod hex_sig {
    use super::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(bytes: &[u8; 64], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 64], D::Error> {
        let raw = String::deserialize(d)?;
        let bytes = hex::decode(raw.trim_start_matches("0x")).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|v: Vec<u8>| serde::de::Error::custom(format!("expected 64 bytes, got {}", v.len())))
    }
}
