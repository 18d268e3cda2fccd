//! Undo-journaled state.
//!
//! Every write to a journaled collection records the prior value of the key
//! it touches. [`Journaled::commit`] forgets those records and
//! [`Journaled::rollback`] replays them backwards. Both cost time in the
//! number of writes since the last commit, never in the size of the state.
//!
//! ```text
//!   write(k, v)  ─▶ undo.push((k, old(k)))   ─▶ inner[k] = v
//!   commit()     ─▶ undo.clear()
//!   rollback()   ─▶ while let Some((k, old)) = undo.pop() { inner[k] = old }
//! ```
//!
//! State owned outside an execution environment must be committed after each
//! operation, otherwise the journal keeps growing.

use std::borrow::Borrow;
use std::collections::BTreeMap;

use crate::Address;

/// State that can settle or discard every write since the last commit.
pub trait Journaled {
    /// Keep all writes since the last commit.
    fn commit(&mut self);
    /// Discard all writes since the last commit.
    fn rollback(&mut self);
}

// ─── JournalMap ───────────────────────────────────────────────────────

/// An ordered map whose writes can be rolled back.
#[derive(Debug, Clone)]
pub struct JournalMap<K, V> {
    inner: BTreeMap<K, V>,
    undo: Vec<(K, Option<V>)>,
}

impl<K, V> Default for JournalMap<K, V> {
    fn default() -> Self {
        Self {
            inner: BTreeMap::new(),
            undo: Vec::new(),
        }
    }
}

impl<K: Ord + Clone, V: Clone> JournalMap<K, V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.inner.get(key)
    }

    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.inner.contains_key(key)
    }

    /// Insert `value`, returning the previous one.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let prev = self.inner.insert(key.clone(), value);
        self.undo.push((key, prev.clone()));
        prev
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ToOwned<Owned = K> + ?Sized,
    {
        let prev = self.inner.remove(key)?;
        self.undo.push((key.to_owned(), Some(prev.clone())));
        Some(prev)
    }

    /// Mutable access to an existing value. The value is journaled whether
    /// or not the caller changes it.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ToOwned<Owned = K> + ?Sized,
    {
        let value = self.inner.get_mut(key)?;
        self.undo.push((key.to_owned(), Some(value.clone())));
        Some(value)
    }

    /// Mutable access, inserting `V::default()` first if absent.
    pub fn get_or_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        let prev = self.inner.get(&key).cloned();
        self.undo.push((key.clone(), prev));
        self.inner.entry(key).or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.inner.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.inner.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.inner.values()
    }

    /// Writes recorded since the last commit.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.undo.len()
    }
}

impl<K: Ord + Clone, V: Clone> Journaled for JournalMap<K, V> {
    fn commit(&mut self) {
        self.undo.clear();
    }

    fn rollback(&mut self) {
        while let Some((key, prev)) = self.undo.pop() {
            match prev {
                Some(value) => {
                    self.inner.insert(key, value);
                }
                None => {
                    self.inner.remove(&key);
                }
            }
        }
    }
}

/// Builds an already-committed map.
impl<K: Ord, V> FromIterator<(K, V)> for JournalMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
            undo: Vec::new(),
        }
    }
}

// ─── JournalSet ───────────────────────────────────────────────────────

/// An ordered set whose writes can be rolled back.
#[derive(Debug, Clone)]
pub struct JournalSet<T> {
    map: JournalMap<T, ()>,
}

impl<T> Default for JournalSet<T> {
    fn default() -> Self {
        Self {
            map: JournalMap::default(),
        }
    }
}

impl<T: Ord + Clone> JournalSet<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `false` if `value` was already present; nothing is journaled then.
    pub fn insert(&mut self, value: T) -> bool {
        if self.map.contains_key(&value) {
            return false;
        }
        self.map.insert(value, ());
        true
    }

    pub fn remove(&mut self, value: &T) -> bool {
        self.map.remove(value).is_some()
    }

    #[must_use]
    pub fn contains(&self, value: &T) -> bool {
        self.map.contains_key(value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.map.keys()
    }
}

impl<T: Ord + Clone> Journaled for JournalSet<T> {
    fn commit(&mut self) {
        self.map.commit();
    }

    fn rollback(&mut self) {
        self.map.rollback();
    }
}

impl<T: Ord> FromIterator<T> for JournalSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().map(|v| (v, ())).collect(),
        }
    }
}

// ─── JournalCell ──────────────────────────────────────────────────────

/// A single value whose writes can be rolled back. The first mutable borrow
/// after a commit saves a copy.
#[derive(Debug, Clone, Default)]
pub struct JournalCell<T> {
    value: T,
    saved: Option<T>,
}

impl<T: Clone> JournalCell<T> {
    #[must_use]
    pub fn new(value: T) -> Self {
        Self { value, saved: None }
    }

    #[must_use]
    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn get_mut(&mut self) -> &mut T {
        if self.saved.is_none() {
            self.saved = Some(self.value.clone());
        }
        &mut self.value
    }

    pub fn set(&mut self, value: T) {
        *self.get_mut() = value;
    }
}

impl<T: Clone> Journaled for JournalCell<T> {
    fn commit(&mut self) {
        self.saved = None;
    }

    fn rollback(&mut self) {
        if let Some(value) = self.saved.take() {
            self.value = value;
        }
    }
}

// ─── JournalBook ──────────────────────────────────────────────────────

/// Contracts keyed by address. Only contracts borrowed mutably since the
/// last commit are committed or rolled back; contracts deployed since then
/// are removed again on rollback.
#[derive(Debug, Clone)]
pub struct JournalBook<C> {
    entries: BTreeMap<Address, C>,
    touched: Vec<Address>,
    deployed: Vec<Address>,
}

impl<C> Default for JournalBook<C> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            touched: Vec::new(),
            deployed: Vec::new(),
        }
    }
}

impl<C: Journaled> JournalBook<C> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `contract` at `address`. Returns `false`, leaving the book
    /// untouched, if the address is taken.
    pub fn deploy(&mut self, address: Address, contract: C) -> bool {
        if self.entries.contains_key(&address) {
            return false;
        }
        self.entries.insert(address, contract);
        self.deployed.push(address);
        true
    }

    #[must_use]
    pub fn get(&self, address: &Address) -> Option<&C> {
        self.entries.get(address)
    }

    pub fn get_mut(&mut self, address: &Address) -> Option<&mut C> {
        let contract = self.entries.get_mut(address)?;
        self.touched.push(*address);
        Some(contract)
    }

    #[must_use]
    pub fn contains(&self, address: &Address) -> bool {
        self.entries.contains_key(address)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &C> {
        self.entries.values()
    }
}

impl<C: Journaled> Journaled for JournalBook<C> {
    fn commit(&mut self) {
        for address in self.touched.drain(..) {
            if let Some(contract) = self.entries.get_mut(&address) {
                contract.commit();
            }
        }
        self.deployed.clear();
    }

    fn rollback(&mut self) {
        for address in self.touched.drain(..) {
            if let Some(contract) = self.entries.get_mut(&address) {
                contract.rollback();
            }
        }
        for address in self.deployed.drain(..) {
            self.entries.remove(&address);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_rollback_restores_prior_values() {
        let mut map: JournalMap<u8, &str> = [(1, "one")].into_iter().collect();
        map.insert(1, "uno");
        map.insert(2, "two");
        map.remove(&1);
        map.insert(1, "eins");
        assert_eq!(map.pending(), 4);

        map.rollback();
        assert_eq!(map.get(&1), Some(&"one"));
        assert!(!map.contains_key(&2));
        assert_eq!(map.pending(), 0);
    }

    #[test]
    fn map_commit_keeps_writes() {
        let mut map = JournalMap::new();
        *map.get_or_default(7u8) += 5u64;
        map.commit();
        *map.get_or_default(7) += 1;
        map.rollback();
        assert_eq!(map.get(&7), Some(&5));
    }

    #[test]
    fn get_mut_on_missing_key_records_nothing() {
        let mut map: JournalMap<u8, u8> = JournalMap::new();
        assert!(map.get_mut(&1).is_none());
        assert!(map.remove(&1).is_none());
        assert_eq!(map.pending(), 0);
    }

    #[test]
    fn set_duplicate_insert_is_not_journaled() {
        let mut set: JournalSet<u8> = [1].into_iter().collect();
        assert!(!set.insert(1));
        assert!(set.insert(2));
        set.rollback();
        assert!(set.contains(&1));
        assert!(!set.contains(&2));
    }

    #[test]
    fn cell_saves_on_first_write_only() {
        let mut cell = JournalCell::new(1u64);
        *cell.get_mut() += 1;
        cell.set(10);
        cell.rollback();
        assert_eq!(*cell.get(), 1);

        cell.set(3);
        cell.commit();
        cell.rollback();
        assert_eq!(*cell.get(), 3);
    }

    #[test]
    fn book_rollback_removes_fresh_deployments() {
        let mut book: JournalBook<JournalCell<u8>> = JournalBook::new();
        let a = Address::derive("a");
        let b = Address::derive("b");
        assert!(book.deploy(a, JournalCell::new(1)));
        book.commit();

        book.get_mut(&a).unwrap().set(2);
        assert!(book.deploy(b, JournalCell::new(9)));
        assert!(!book.deploy(a, JournalCell::new(0)));
        book.rollback();

        assert_eq!(*book.get(&a).unwrap().get(), 1);
        assert!(!book.contains(&b));
        assert_eq!(book.len(), 1);
    }
}
