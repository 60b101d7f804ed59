#[cfg(feature = "serde")]
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;

/// A snapshot of the shape of a tree, as returned by
/// [BPTree::get_data](crate::bptree::BPTree::get_data).
///
/// Each branch maps the max key of every child subtree to that child's export,
/// and each leaf maps its keys to (cloned) values. This mirrors the real layout
/// of the tree, so it is mostly useful for debugging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeData<V> {
    /// An internal node, keyed by the max key of each child.
    Branch(BTreeMap<i64, TreeData<V>>),
    /// A leaf node with its records.
    Leaf(BTreeMap<i64, V>),
}

impl<V> TreeData<V> {
    /// The number of levels in this export, where a lone leaf has a depth of 1.
    pub fn depth(&self) -> usize {
        match self {
            TreeData::Leaf(_) => 1,
            TreeData::Branch(children) => {
                1 + children.values().map(|c| c.depth()).max().unwrap_or(0)
            }
        }
    }

    /// The number of records held across every leaf of this export.
    pub fn records(&self) -> usize {
        match self {
            TreeData::Leaf(records) => records.len(),
            TreeData::Branch(children) => children.values().map(|c| c.records()).sum(),
        }
    }
}

#[cfg(feature = "serde")]
impl<V> Serialize for TreeData<V>
where
    V: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Both kinds are plain maps, so that the export reads as nested objects.
        match self {
            TreeData::Branch(children) => {
                let mut state = serializer.serialize_map(Some(children.len()))?;
                for (key, child) in children.iter() {
                    state.serialize_entry(key, child)?;
                }
                state.end()
            }
            TreeData::Leaf(records) => {
                let mut state = serializer.serialize_map(Some(records.len()))?;
                for (key, val) in records.iter() {
                    state.serialize_entry(key, val)?;
                }
                state.end()
            }
        }
    }
}
