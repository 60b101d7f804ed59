//! See the documentation for [BPTree]

#[cfg(feature = "asynch")]
pub mod asynch;

mod data;

#[cfg(feature = "serde")]
use serde::{
    de::{Deserialize, Deserializer},
    ser::{Serialize, SerializeMap, Serializer},
};

#[cfg(feature = "serde")]
use crate::utils::MapCollector;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub use self::data::TreeData;
pub use crate::internals::bptree::constants::{DEFAULT_ORDER, MIN_ORDER};

include!("impl.rs");

impl<V> BPTree<V> {
    /// Take the lock in shared mode, concurrent to any other readers.
    pub fn read(&self) -> BPTreeReadGuard<'_, V> {
        let inner = self.inner.read();
        BPTreeReadGuard { inner }
    }

    /// Take the lock in exclusive mode. This waits for existing readers and
    /// writers to complete.
    pub fn write(&self) -> BPTreeWriteGuard<'_, V> {
        let inner = self.inner.write();
        BPTreeWriteGuard { inner }
    }

    /// Retrieve a clone of the value for `k`, or `None` if the key is not present.
    pub fn get(&self, k: i64) -> Option<V>
    where
        V: Clone,
    {
        self.read().get(k).cloned()
    }

    /// Assert if a key exists in the tree.
    pub fn contains_key(&self, k: i64) -> bool {
        self.read().contains_key(k)
    }

    /// Insert or update a value by key, returning the prior value if there was one.
    pub fn set(&self, k: i64, v: V) -> Option<V> {
        self.write().insert(k, v)
    }

    /// An alias of [set](Self::set).
    pub fn insert(&self, k: i64, v: V) -> Option<V> {
        self.write().insert(k, v)
    }

    /// Remove a key if it exists in the tree, returning its value. Removing a
    /// missing key does nothing.
    pub fn remove(&self, k: i64) -> Option<V> {
        self.write().remove(k)
    }

    /// Returns the current number of records in the tree
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Determine if the tree is currently empty
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Reset the tree to a single empty leaf.
    pub fn clear(&self) {
        self.write().clear()
    }

    /// Export the current shape of the tree. See [TreeData].
    pub fn get_data(&self) -> TreeData<V>
    where
        V: Clone,
    {
        self.read().get_data()
    }
}

/// Writes one line per level of the tree, from the root down. The keys of
/// each node are listed in order, and nodes are separated by `|`. For a branch
/// the keys are the max key of each child.
impl<V> fmt::Display for BPTree<V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.read(), f)
    }
}

impl<V> fmt::Debug for BPTree<V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&self.read(), f)
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
        self.read().serialize(serializer)
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

#[cfg(test)]
mod tests {
    use super::{BPTree, TreeData, DEFAULT_ORDER};
    use rand::seq::SliceRandom;
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_bptree_map_basic_write() {
        let _ = tracing_subscriber::fmt::try_init();
        let bptree: BPTree<usize> = BPTree::new(4);
        {
            let mut bpwrite = bptree.write();
            // We should be able to insert.
            bpwrite.insert(0, 0);
            bpwrite.insert(1, 1);
            assert!(bpwrite.get(0) == Some(&0));
            assert!(bpwrite.get(1) == Some(&1));
            bpwrite.insert(2, 2);
        }
        {
            let bpread = bptree.read();
            assert!(bpread.len() == 3);
            assert!(bpread.get(2) == Some(&2));
            assert!(bpread.verify());
        }
        bptree.clear();
        assert!(bptree.is_empty());
        assert!(bptree.get(0).is_none());
    }

    #[test]
    fn test_bptree_map_basic_scenario() {
        let bptree: BPTree<i32> = BPTree::new(4);
        for k in [10, 23, 33, 35, 15] {
            bptree.set(k, 1);
        }
        bptree.remove(23);

        assert!(bptree.get(10) == Some(1));
        assert!(bptree.get(15) == Some(1));
        assert!(bptree.get(23).is_none());
        assert!(bptree.get(20).is_none());

        let r = bptree.read();
        assert!(r.keys().copied().collect::<Vec<_>>() == vec![10, 15, 33, 35]);
        assert!(r.verify());
    }

    #[test]
    fn test_bptree_map_overwrite() {
        let bptree: BPTree<&str> = BPTree::new(3);
        assert!(bptree.set(5, "a").is_none());
        assert!(bptree.set(5, "b") == Some("a"));
        assert!(bptree.len() == 1);
        assert!(bptree.get(5) == Some("b"));
    }

    #[test]
    fn test_bptree_map_remove_missing() {
        let bptree: BPTree<i64> = BPTree::new(4);
        assert!(bptree.remove(1).is_none());
        bptree.set(1, 1);
        assert!(bptree.remove(2).is_none());
        assert!(bptree.remove(1) == Some(1));
        assert!(bptree.remove(1).is_none());
        assert!(bptree.read().verify());
    }

    #[test]
    fn test_bptree_map_order_clamp() {
        let bptree: BPTree<()> = BPTree::new(1);
        assert!(bptree.order() == 3);
        assert!(bptree.min_occupancy() == 2);

        let bptree: BPTree<()> = BPTree::default();
        assert!(bptree.order() == DEFAULT_ORDER);
        assert!(bptree.min_occupancy() == DEFAULT_ORDER.div_ceil(2));
    }

    #[test]
    fn test_bptree_map_get_mut() {
        let bptree: BPTree<usize> = BPTree::new(3);
        bptree.set(0, 0);
        {
            let mut w = bptree.write();
            if let Some(v) = w.get_mut(0) {
                *v = 1;
            }
            assert!(w.get_mut(1).is_none());
        }
        assert!(bptree.get(0) == Some(1));
    }

    #[test]
    fn test_bptree_map_from_iter() {
        let mut rng = rand::rng();
        let mut ins: Vec<i64> = (0..512).collect();
        ins.shuffle(&mut rng);

        let map: BPTree<i64> = ins.iter().map(|v| (*v, *v)).collect();
        let r = map.read();
        assert!(r.verify());
        assert!(r.len() == 512);
        assert!(r.first_key_value() == Some((&0, &0)));
        assert!(r.last_key_value() == Some((&511, &511)));
        assert!(r.iter().map(|(k, _)| *k).eq(0..512));
        assert!(r.values().copied().eq(0..512));
    }

    #[test]
    fn test_bptree_map_extend() {
        let map: BPTree<i64> = BPTree::new(5);
        {
            let mut w = map.write();
            w.extend((0..100).map(|v| (v, v)));
            // Overwrites must not change the length.
            w.extend((0..50).map(|v| (v, v * 2)));
            assert!(w.len() == 100);
            assert!(w.verify());
        }
        assert!(map.get(49) == Some(98));
        assert!(map.get(50) == Some(50));
        assert!(map.into_records().len() == 100);
    }

    #[test]
    fn test_bptree_map_merge_trigger() {
        let map: BPTree<i64> = BPTree::new(4);
        for k in 1..=8 {
            map.set(k, k);
        }
        let leaves_before = match map.get_data() {
            TreeData::Branch(children) => children.len(),
            TreeData::Leaf(_) => panic!(),
        };
        assert!(leaves_before == 3);
        map.remove(1);
        match map.get_data() {
            TreeData::Branch(children) => {
                assert!(children.len() == 2);
            }
            TreeData::Leaf(_) => panic!(),
        }
        assert!(map.len() == 7);
        assert!(map.read().verify());
    }

    #[test]
    fn test_bptree_map_bulk_random() {
        let mut rng = rand::rng();
        let mut uniq = BTreeSet::new();
        while uniq.len() < 1000 {
            uniq.insert(rand::random::<i64>());
        }
        let mut ins: Vec<i64> = uniq.into_iter().collect();
        ins.shuffle(&mut rng);

        let map: BPTree<i64> = BPTree::new(4);
        for k in ins.iter() {
            map.set(*k, *k);
        }
        for k in ins.iter() {
            assert!(map.get(*k) == Some(*k));
        }
        {
            let r = map.read();
            assert!(r.verify());
            let keys: Vec<i64> = r.keys().copied().collect();
            assert!(keys.windows(2).all(|w| w[0] < w[1]));
        }

        ins.shuffle(&mut rng);
        for k in ins.iter() {
            assert!(map.remove(*k) == Some(*k));
        }
        assert!(map.is_empty());
        assert!(map.get_data() == TreeData::Leaf(Default::default()));
        assert!(map.read().verify());
    }

    #[test]
    fn test_bptree_map_display() {
        let map: BPTree<i64> = BPTree::new(4);
        for k in [10, 23, 33, 35, 15] {
            map.set(k, k);
        }
        assert_eq!(format!("{}", map), " 15 35\n 10 15 | 23 33 35\n");
        assert_eq!(format!("{}", map.read()), format!("{}", map));
    }

    fn bptree_map_basic_concurrency(lower: i64, upper: i64) {
        let map: Arc<BPTree<i64>> = Arc::new(BPTree::new(8));
        map.write().extend((0..lower).map(|v| (v, v)));

        // Readers and a writer interleave, readers only ever see whole changes.
        let writer = {
            let map = map.clone();
            thread::spawn(move || {
                for v in lower..upper {
                    map.set(v, v);
                }
            })
        };
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let map = map.clone();
                thread::spawn(move || {
                    for i in 0..lower {
                        assert!(map.get(i) == Some(i));
                    }
                    let r = map.read();
                    assert!(r.len() >= lower as usize);
                    assert!(r.verify());
                })
            })
            .collect();

        assert!(writer.join().is_ok());
        for r in readers {
            assert!(r.join().is_ok());
        }

        assert!(map.len() == upper as usize);
        for i in 0..upper {
            assert!(map.remove(i).is_some());
        }
        assert!(map.is_empty());
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_bptree_map_basic_concurrency_small() {
        bptree_map_basic_concurrency(100, 200)
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_bptree_map_basic_concurrency_large() {
        bptree_map_basic_concurrency(10_000, 20_000)
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_bptree_map_serialize_deserialize() {
        let map: BPTree<i64> = vec![(10, 11), (15, 16), (20, 21)].into_iter().collect();

        let value = serde_json::to_value(&map).unwrap();
        assert_eq!(value, serde_json::json!({ "10": 11, "15": 16, "20": 21 }));

        let map: BPTree<i64> = serde_json::from_value(value).unwrap();
        let mut vec: Vec<(i64, i64)> = map.read().iter().map(|(k, v)| (*k, *v)).collect();
        vec.sort_unstable();
        assert_eq!(vec, [(10, 11), (15, 16), (20, 21)]);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_bptree_map_serialize_tree_data() {
        let map: BPTree<i64> = BPTree::new(4);
        for k in [10, 23, 33, 35, 15] {
            map.set(k, k);
        }
        let value = serde_json::to_value(map.get_data()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "15": { "10": 10, "15": 15 },
                "35": { "23": 23, "33": 33, "35": 35 }
            })
        );
    }
}
