//! Async `BPTree` - See the documentation for the sync `BPTree`
//!
//! Acquiring the lock is a suspension point, so many tasks can wait on the
//! tree without blocking their executor threads. Once a guard is held, every
//! operation on it completes without awaiting.

#[cfg(feature = "serde")]
use serde::{
    de::{Deserialize, Deserializer},
    ser::{Error, Serialize, SerializeMap, Serializer},
};

#[cfg(feature = "serde")]
use crate::utils::MapCollector;

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub use super::TreeData;

include!("impl.rs");

impl<V> BPTree<V> {
    /// Take the lock in shared mode, concurrent to any other readers.
    pub async fn read<'x>(&'x self) -> BPTreeReadGuard<'x, V> {
        let inner = self.inner.read().await;
        BPTreeReadGuard { inner }
    }

    /// Take the lock in exclusive mode. This waits for existing readers and
    /// writers to complete.
    pub async fn write<'x>(&'x self) -> BPTreeWriteGuard<'x, V> {
        let inner = self.inner.write().await;
        BPTreeWriteGuard { inner }
    }

    /// Attempt to take the lock in shared mode, returns None if a writer
    /// currently holds it.
    pub fn try_read(&self) -> Option<BPTreeReadGuard<'_, V>> {
        self.inner
            .try_read()
            .ok()
            .map(|inner| BPTreeReadGuard { inner })
    }

    /// Retrieve a clone of the value for `k`, or `None` if the key is not present.
    pub async fn get(&self, k: i64) -> Option<V>
    where
        V: Clone,
    {
        self.read().await.get(k).cloned()
    }

    /// Assert if a key exists in the tree.
    pub async fn contains_key(&self, k: i64) -> bool {
        self.read().await.contains_key(k)
    }

    /// Insert or update a value by key, returning the prior value if there was one.
    pub async fn set(&self, k: i64, v: V) -> Option<V> {
        self.write().await.insert(k, v)
    }

    /// An alias of [set](Self::set).
    pub async fn insert(&self, k: i64, v: V) -> Option<V> {
        self.write().await.insert(k, v)
    }

    /// Remove a key if it exists in the tree, returning its value. Removing a
    /// missing key does nothing.
    pub async fn remove(&self, k: i64) -> Option<V> {
        self.write().await.remove(k)
    }

    /// Returns the current number of records in the tree
    pub async fn len(&self) -> usize {
        self.read().await.len()
    }

    /// Determine if the tree is currently empty
    pub async fn is_empty(&self) -> bool {
        self.read().await.is_empty()
    }

    /// Reset the tree to a single empty leaf.
    pub async fn clear(&self) {
        self.write().await.clear()
    }

    /// Export the current shape of the tree. See [TreeData].
    pub async fn get_data(&self) -> TreeData<V>
    where
        V: Clone,
    {
        self.read().await.get_data()
    }
}

#[cfg(feature = "serde")]
impl<V> Serialize for BPTreeReadGuard<'_, V>
where
    V: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_map(Some(self.len()))?;

        for (key, val) in self.iter() {
            state.serialize_entry(key, val)?;
        }

        state.end()
    }
}

#[cfg(feature = "serde")]
impl<V> Serialize for BPTree<V>
where
    V: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Serialisation can't await, so it fails rather than waiting on a writer.
        match self.try_read() {
            Some(guard) => guard.serialize(serializer),
            None => Err(S::Error::custom("tree is locked for writing")),
        }
    }
}

#[cfg(feature = "serde")]
impl<'de, V> Deserialize<'de> for BPTree<V>
where
    V: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(MapCollector::<Self, i64, V>::new())
    }
}
