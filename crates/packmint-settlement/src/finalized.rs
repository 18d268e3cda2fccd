//! Finalized-order set: the replay guard.
//!
//! Each order hash settles at most once. Unlike a bounded cache this set
//! never evicts: an evicted hash could be replayed.

use packmint_types::{JournalSet, Journaled, OrderHash, PackmintError, Result};

#[derive(Debug, Clone, Default)]
pub struct FinalizedOrderSet {
    hashes: JournalSet<OrderHash>,
}

impl FinalizedOrderSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `hash` as settled.
    ///
    /// # Errors
    /// Returns [`PackmintError::OrderAlreadyFinalized`] if it already was.
    pub fn finalize(&mut self, hash: OrderHash) -> Result<()> {
        if !self.hashes.insert(hash) {
            return Err(PackmintError::OrderAlreadyFinalized(hash));
        }
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, hash: &OrderHash) -> bool {
        self.hashes.contains(hash)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

impl Journaled for FinalizedOrderSet {
    fn commit(&mut self) {
        self.hashes.commit();
    }

    fn rollback(&mut self) {
        self.hashes.rollback();
    }
}
