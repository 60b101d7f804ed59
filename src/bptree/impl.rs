use crate::internals::bptree::cursor::SuperBlock;
pub use crate::internals::bptree::iter::{Iter, KeyIter, ValueIter};
use std::fmt;
use std::iter::FromIterator;

/// An in-memory B+Tree index from `i64` keys to values of type `V`.
///
/// This structure can be used in locations where you would otherwise use
/// `RwLock<BTreeMap<i64, V>>`. All records live in the leaves, which are
/// linked in ascending key order, so a full ordered scan never has to revisit
/// a branch.
///
/// The tree is guarded by a single readers-writer lock. Lookups take it in
/// shared mode, and changes take it exclusively. The convenience methods on
/// the tree take the lock once per call. To perform several operations under
/// the same lock, open a [read](Self::read) or [write](Self::write) guard.
///
/// Each node holds at most `order` records (leaves) or children (branches).
/// Every node other than the root holds at least `ceil(order / 2)`.
pub struct BPTree<V> {
    inner: RwLock<SuperBlock<V>>,
    order: usize,
    min_occupancy: usize,
}

/// Shared access to a [BPTree]. The content of the tree can not change while
/// this guard exists.
pub struct BPTreeReadGuard<'a, V> {
    inner: RwLockReadGuard<'a, SuperBlock<V>>,
}

/// Exclusive access to a [BPTree]. Changes made through this guard are
/// visible to the next reader as soon as they are made.
pub struct BPTreeWriteGuard<'a, V> {
    inner: RwLockWriteGuard<'a, SuperBlock<V>>,
}

impl<V> Default for BPTree<V> {
    fn default() -> Self {
        Self::new(crate::internals::bptree::constants::DEFAULT_ORDER)
    }
}

impl<V> BPTree<V> {
    /// Construct a new, empty tree of `order`. An order smaller than
    /// [MIN_ORDER](crate::bptree::MIN_ORDER) is raised to it.
    pub fn new(order: usize) -> Self {
        Self::from_sblock(SuperBlock::new(order))
    }

    fn from_sblock(sblock: SuperBlock<V>) -> Self {
        let order = sblock.order();
        let min_occupancy = sblock.min_occupancy();
        BPTree {
            inner: RwLock::new(sblock),
            order,
            min_occupancy,
        }
    }

    /// The maximum number of records in a leaf, or children in a branch.
    pub fn order(&self) -> usize {
        self.order
    }

    /// The minimum number of records or children of every node except the root.
    pub fn min_occupancy(&self) -> usize {
        self.min_occupancy
    }

    /// Consume the tree, returning every record in ascending key order.
    pub fn into_records(self) -> Vec<(i64, V)>
    where
        V: Clone,
    {
        let sblock = self.inner.into_inner();
        sblock.kv_iter().map(|(k, v)| (*k, v.clone())).collect()
    }
}

impl<V> FromIterator<(i64, V)> for BPTree<V> {
    fn from_iter<I: IntoIterator<Item = (i64, V)>>(iter: I) -> Self {
        let mut sblock = SuperBlock::new(crate::internals::bptree::constants::DEFAULT_ORDER);
        sblock.extend(iter);
        Self::from_sblock(sblock)
    }
}

impl<V> Extend<(i64, V)> for BPTreeWriteGuard<'_, V> {
    fn extend<I: IntoIterator<Item = (i64, V)>>(&mut self, iter: I) {
        self.inner.extend(iter);
    }
}

impl<V> BPTreeWriteGuard<'_, V> {
    // == RO methods

    /// Retrieve a value from the tree. If the value exists, a reference is returned
    /// as `Some(&V)`, otherwise if not present `None` is returned.
    pub fn get(&self, k: i64) -> Option<&V> {
        self.inner.search(k)
    }

    /// Assert if a key exists in the tree.
    pub fn contains_key(&self, k: i64) -> bool {
        self.inner.contains_key(k)
    }

    /// Returns the current number of records in the tree
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Determine if the tree is currently empty
    pub fn is_empty(&self) -> bool {
        self.inner.len() == 0
    }

    /// Iterator over `(&i64, &V)` in ascending key order
    pub fn iter(&self) -> Iter<'_, V> {
        self.inner.kv_iter()
    }

    /// Iterator over &V in ascending key order
    pub fn values(&self) -> ValueIter<'_, V> {
        self.inner.v_iter()
    }

    /// Iterator over &i64 in ascending order
    pub fn keys(&self) -> KeyIter<'_, V> {
        self.inner.k_iter()
    }

    /// Retrieve the first (minimum) key-value pair from the tree if it exists.
    pub fn first_key_value(&self) -> Option<(&i64, &V)> {
        self.inner.first_key_value()
    }

    /// Retrieve the last (maximum) key-value pair from the tree if it exists.
    pub fn last_key_value(&self) -> Option<(&i64, &V)> {
        self.inner.last_key_value()
    }

    /// Export the current shape of the tree. See [TreeData](crate::bptree::TreeData).
    pub fn get_data(&self) -> crate::bptree::TreeData<V>
    where
        V: Clone,
    {
        self.inner.get_data()
    }

    /// Check every structural property of the tree. This walks the whole tree
    /// and is intended for tests and debugging.
    pub fn verify(&self) -> bool {
        self.inner.verify()
    }

    // == RW methods

    /// Reset this tree to an empty state.
    pub fn clear(&mut self) {
        self.inner.clear()
    }

    /// Insert or update a value by key. If the value previously existed it is returned
    /// as `Some(V)`. If the value did not previously exist this returns `None`.
    pub fn insert(&mut self, k: i64, v: V) -> Option<V> {
        self.inner.insert(k, v)
    }

    /// An alias of [insert](Self::insert).
    pub fn set(&mut self, k: i64, v: V) -> Option<V> {
        self.inner.insert(k, v)
    }

    /// Remove a key if it exists in the tree. If the value exists, we return it as `Some(V)`,
    /// and if it did not exist, we return `None`
    pub fn remove(&mut self, k: i64) -> Option<V> {
        self.inner.remove(k)
    }

    /// Get a mutable reference to a value in the tree.
    pub fn get_mut(&mut self, k: i64) -> Option<&mut V> {
        self.inner.get_mut_ref(k)
    }
}

impl<V> BPTreeReadGuard<'_, V> {
    /// Retrieve a value from the tree. If the value exists, a reference is returned
    /// as `Some(&V)`, otherwise if not present `None` is returned.
    pub fn get(&self, k: i64) -> Option<&V> {
        self.inner.search(k)
    }

    /// Assert if a key exists in the tree.
    pub fn contains_key(&self, k: i64) -> bool {
        self.inner.contains_key(k)
    }

    /// Returns the current number of records in the tree
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Determine if the tree is currently empty
    pub fn is_empty(&self) -> bool {
        self.inner.len() == 0
    }

    /// Iterator over `(&i64, &V)` in ascending key order
    pub fn iter(&self) -> Iter<'_, V> {
        self.inner.kv_iter()
    }

    /// Iterator over &V in ascending key order
    pub fn values(&self) -> ValueIter<'_, V> {
        self.inner.v_iter()
    }

    /// Iterator over &i64 in ascending order
    pub fn keys(&self) -> KeyIter<'_, V> {
        self.inner.k_iter()
    }

    /// Retrieve the first (minimum) key-value pair from the tree if it exists.
    pub fn first_key_value(&self) -> Option<(&i64, &V)> {
        self.inner.first_key_value()
    }

    /// Retrieve the last (maximum) key-value pair from the tree if it exists.
    pub fn last_key_value(&self) -> Option<(&i64, &V)> {
        self.inner.last_key_value()
    }

    /// Export the current shape of the tree. See [TreeData](crate::bptree::TreeData).
    pub fn get_data(&self) -> crate::bptree::TreeData<V>
    where
        V: Clone,
    {
        self.inner.get_data()
    }

    /// Check every structural property of the tree. This walks the whole tree
    /// and is intended for tests and debugging.
    pub fn verify(&self) -> bool {
        self.inner.verify()
    }
}

impl<'a, V> IntoIterator for &'a BPTreeReadGuard<'_, V> {
    type Item = (&'a i64, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, V> IntoIterator for &'a BPTreeWriteGuard<'_, V> {
    type Item = (&'a i64, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<V> fmt::Display for BPTreeReadGuard<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.inner.fmt_levels(f)
    }
}

impl<V> fmt::Display for BPTreeWriteGuard<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.inner.fmt_levels(f)
    }
}

impl<V> fmt::Debug for BPTreeReadGuard<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

impl<V> fmt::Debug for BPTreeWriteGuard<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}
